//! Single-call access to the YouTube Data API.
//!
//! An [`EndpointClient`] issues exactly one request with the credential it
//! is given and classifies the result into a [`CallOutcome`]. It never
//! retries and never rotates keys; that policy lives in
//! [`Dispatcher`](crate::dispatcher::Dispatcher).
//!
//! # Classification
//!
//! | Response | Outcome |
//! |----------|---------|
//! | 2xx with a JSON body | `Ok(body)` |
//! | non-2xx whose `error.errors[].reason` contains `quotaExceeded` | `QuotaExceeded` |
//! | any other non-2xx | `OtherApiError(error.message or status)` |
//! | 2xx whose body is not JSON | `MalformedBody` |
//! | connect failure, timeout, body read failure | `TransportError` |
//!
//! A bare 403 is *not* quota exhaustion: YouTube also returns 403 for
//! disabled APIs and forbidden resources.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::YoutubeConfig;
use crate::credentials::Credential;

/// Reason code YouTube puts in `error.errors[].reason` when a key's daily
/// quota is spent.
pub const QUOTA_EXCEEDED_REASON: &str = "quotaExceeded";

/// The three remote resources the pipeline reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Search,
    Videos,
    Channels,
}

impl Resource {
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Search => "search",
            Resource::Videos => "videos",
            Resource::Channels => "channels",
        }
    }

    /// Quota units charged per call.
    pub fn quota_cost(&self) -> u64 {
        match self {
            Resource::Search => 100,
            Resource::Videos | Resource::Channels => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Ok(Value),
    QuotaExceeded,
    OtherApiError(String),
    /// 2xx whose body is not JSON.
    MalformedBody(String),
    TransportError(String),
}

/// Transport seam for the dispatcher. Tests substitute scripted fakes.
#[async_trait]
pub trait EndpointClient: Send + Sync {
    async fn call(
        &self,
        resource: Resource,
        params: &[(String, String)],
        credential: &Credential,
    ) -> CallOutcome;
}

/// [`EndpointClient`] backed by `reqwest`, one shared connection pool.
pub struct HttpEndpointClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEndpointClient {
    pub fn new(config: &YoutubeConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl EndpointClient for HttpEndpointClient {
    async fn call(
        &self,
        resource: Resource,
        params: &[(String, String)],
        credential: &Credential,
    ) -> CallOutcome {
        let url = format!("{}/{}", self.base_url, resource.path());
        debug!(resource = resource.path(), key = %credential, "calling YouTube API");

        let resp = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", credential.expose())])
            .send()
            .await;

        let response = match resp {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return CallOutcome::TransportError(format!("request to {} timed out", url))
            }
            Err(e) => return CallOutcome::TransportError(e.to_string()),
        };

        let status = response.status();
        let body_text = match response.text().await {
            Ok(t) => t,
            Err(e) => return CallOutcome::TransportError(e.to_string()),
        };

        classify(status, &body_text)
    }
}

/// Map a raw status + body to a [`CallOutcome`].
pub fn classify(status: StatusCode, body: &str) -> CallOutcome {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    if status.is_success() {
        return match parsed {
            Some(json) => CallOutcome::Ok(json),
            None => CallOutcome::MalformedBody(format!(
                "{} response body is not JSON",
                status.as_u16()
            )),
        };
    }

    let error = parsed.as_ref().and_then(|v| v.get("error"));

    let is_quota = error
        .and_then(|e| e.get("errors"))
        .and_then(|e| e.as_array())
        .map(|errors| {
            errors.iter().any(|e| {
                e.get("reason").and_then(|r| r.as_str()) == Some(QUOTA_EXCEEDED_REASON)
            })
        })
        .unwrap_or(false);

    if is_quota {
        return CallOutcome::QuotaExceeded;
    }

    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(|m| m.to_string())
        .unwrap_or_else(|| format!("HTTP {}", status));

    CallOutcome::OtherApiError(message)
}
