//! Core data models used throughout the analyzer.
//!
//! The wire-facing types mirror the YouTube Data API v3 JSON shapes
//! (camelCase, counts as decimal strings). Everything here is transient:
//! it lives for one query's processing, except when an [`EnrichedRecord`]
//! list is written to search history.

use serde::{Deserialize, Serialize};

/// `{ "items": [...] }` envelope shared by all three list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thumbnail {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thumbnails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Thumbnail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<Thumbnail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<Thumbnail>,
}

/// Descriptive fields of a video. Search hits and video details each
/// carry a partial snippet; [`Snippet::merged_over`] combines them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnails: Option<Thumbnails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
}

impl Snippet {
    /// Field-wise merge where `self` wins and `fallback` fills the gaps.
    pub fn merged_over(self, fallback: Snippet) -> Snippet {
        Snippet {
            title: self.title.or(fallback.title),
            description: self.description.or(fallback.description),
            published_at: self.published_at.or(fallback.published_at),
            channel_id: self.channel_id.or(fallback.channel_id),
            channel_title: self.channel_title.or(fallback.channel_title),
            thumbnails: self.thumbnails.or(fallback.thumbnails),
            tags: self.tags.or(fallback.tags),
            category_id: self.category_id.or(fallback.category_id),
        }
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        let thumbs = self.thumbnails.as_ref()?;
        thumbs
            .medium
            .as_ref()
            .or(thumbs.default.as_ref())
            .or(thumbs.high.as_ref())
            .map(|t| t.url.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHitId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

/// One row of a `search.list` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub id: SearchHitId,
    #[serde(default)]
    pub snippet: Snippet,
}

impl SearchHit {
    /// `None` for non-video rows (channels, playlists).
    pub fn video_id(&self) -> Option<&str> {
        self.id.video_id.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

/// One row of a `videos.list` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail {
    pub id: String,
    #[serde(default)]
    pub snippet: Snippet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Statistics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_details: Option<ContentDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStatistics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriber_count: Option<String>,
}

/// One row of a `channels.list` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDetail {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<GroupStatistics>,
}

impl GroupDetail {
    /// Stand-in for a channel the detail call did not return.
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            statistics: Some(GroupStatistics {
                subscriber_count: Some("0".to_string()),
            }),
        }
    }

    pub fn subscriber_count(&self) -> Option<&str> {
        self.statistics.as_ref()?.subscriber_count.as_deref()
    }
}

/// A video joined with its search hit and its channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRecord {
    pub id: String,
    pub snippet: Snippet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Statistics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_details: Option<ContentDetails>,
    pub channel: GroupDetail,
}

impl EnrichedRecord {
    pub fn view_count(&self) -> Option<u64> {
        parse_count(self.statistics.as_ref()?.view_count.as_deref()?)
    }

    pub fn like_count(&self) -> Option<u64> {
        parse_count(self.statistics.as_ref()?.like_count.as_deref()?)
    }

    pub fn subscriber_count(&self) -> Option<u64> {
        parse_count(self.channel.subscriber_count()?)
    }

    pub fn url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }
}

/// Counts arrive as decimal strings; tolerate surrounding whitespace.
pub fn parse_count(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

/// Inputs to the view prediction model, derived per record at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionFeatures {
    pub is_short: bool,
    pub elapsed_days: f64,
    pub member_count: u64,
    pub like_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    High,
    Mid,
    Low,
}

impl Band {
    pub fn as_str(&self) -> &'static str {
        match self {
            Band::High => "high",
            Band::Mid => "mid",
            Band::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VpiScore {
    pub actual_views: u64,
    pub predicted_views: u64,
    /// `actual / predicted` rounded to 2 decimals; 0 when nothing was predicted.
    pub ratio: f64,
}

/// Per-record outcome of validation, prediction and scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordStatus {
    Scored { score: VpiScore, band: Band },
    Invalid { reason: String },
    PredictionError { message: String },
}

impl RecordStatus {
    pub fn score(&self) -> Option<&VpiScore> {
        match self {
            RecordStatus::Scored { score, .. } => Some(score),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    pub record: EnrichedRecord,
    #[serde(flatten)]
    pub status: RecordStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_hit_from_api_json() {
        let hit: SearchHit = serde_json::from_value(json!({
            "kind": "youtube#searchResult",
            "id": { "kind": "youtube#video", "videoId": "abc123" },
            "snippet": {
                "publishedAt": "2024-05-01T12:00:00Z",
                "channelId": "UC1",
                "title": "Hello",
                "thumbnails": { "medium": { "url": "https://i.ytimg.com/m.jpg" } },
                "channelTitle": "Chan"
            }
        }))
        .unwrap();
        assert_eq!(hit.video_id(), Some("abc123"));
        assert_eq!(hit.snippet.channel_id.as_deref(), Some("UC1"));
        assert_eq!(hit.snippet.thumbnail_url(), Some("https://i.ytimg.com/m.jpg"));
    }

    #[test]
    fn test_channel_hit_has_no_video_id() {
        let hit: SearchHit = serde_json::from_value(json!({
            "id": { "kind": "youtube#channel", "channelId": "UC1" },
            "snippet": {}
        }))
        .unwrap();
        assert_eq!(hit.video_id(), None);
    }

    #[test]
    fn test_merge_prefers_primary() {
        let detail = Snippet {
            title: Some("detail title".into()),
            tags: Some(vec!["rust".into()]),
            ..Default::default()
        };
        let search = Snippet {
            title: Some("search title".into()),
            description: Some("from search".into()),
            ..Default::default()
        };
        let merged = detail.merged_over(search);
        assert_eq!(merged.title.as_deref(), Some("detail title"));
        assert_eq!(merged.description.as_deref(), Some("from search"));
        assert_eq!(merged.tags, Some(vec!["rust".to_string()]));
    }

    #[test]
    fn test_placeholder_channel_has_zero_subscribers() {
        let channel = GroupDetail::placeholder("UC9");
        assert_eq!(channel.subscriber_count(), Some("0"));
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1200"), Some(1200));
        assert_eq!(parse_count(" 7 "), Some(7));
        assert_eq!(parse_count("n/a"), None);
        assert_eq!(parse_count("-1"), None);
    }

    #[test]
    fn test_scored_record_json_shape() {
        let record = EnrichedRecord {
            id: "v1".into(),
            snippet: Snippet::default(),
            statistics: None,
            content_details: None,
            channel: GroupDetail::placeholder("UC1"),
        };
        let scored = ScoredRecord {
            record,
            status: RecordStatus::Invalid {
                reason: "missing item statistics".into(),
            },
        };
        let value = serde_json::to_value(&scored).unwrap();
        assert_eq!(value["status"], "invalid");
        assert_eq!(value["reason"], "missing item statistics");
        assert_eq!(value["record"]["id"], "v1");
    }
}
