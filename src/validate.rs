//! Pre-flight checks before a record is sent for prediction.
//!
//! Checks run in a fixed order and stop at the first failure, so the
//! reason shown for a record always names its first missing dependency.

use crate::models::EnrichedRecord;

pub const MISSING_GROUP_STATISTICS: &str = "missing group statistics";
pub const MISSING_ITEM_STATISTICS: &str = "missing item statistics";
pub const MISSING_PUBLISH_DATE: &str = "missing publish date";
pub const MISSING_DURATION: &str = "missing duration";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(&'static str),
}

pub fn validate(record: &EnrichedRecord) -> Validation {
    if record.channel.subscriber_count().is_none() {
        return Validation::Invalid(MISSING_GROUP_STATISTICS);
    }

    let has_likes = record
        .statistics
        .as_ref()
        .is_some_and(|s| s.like_count.is_some());
    if !has_likes {
        return Validation::Invalid(MISSING_ITEM_STATISTICS);
    }

    if record.snippet.published_at.is_none() {
        return Validation::Invalid(MISSING_PUBLISH_DATE);
    }

    let has_duration = record
        .content_details
        .as_ref()
        .is_some_and(|c| c.duration.is_some());
    if !has_duration {
        return Validation::Invalid(MISSING_DURATION);
    }

    Validation::Valid
}
