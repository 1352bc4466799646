use thiserror::Error;

/// Query-level failures. Any of these aborts the whole analysis for a query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no YouTube API keys configured (set youtube.api_keys or VPI_YOUTUBE_API_KEYS)")]
    NoCredentialsConfigured,

    #[error("all YouTube API keys have exhausted their quota")]
    AllCredentialsExhausted,

    #[error("YouTube API error: {0}")]
    Api(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed API response: {0}")]
    MalformedResponse(String),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
