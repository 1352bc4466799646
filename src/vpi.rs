//! View Prediction Index: feature derivation, scoring and banding.
//!
//! ```text
//! ratio = round(actual_views / predicted_views, 2)   if predicted_views > 0
//!       = 0                                          otherwise
//!
//! high  ratio >= 1.2
//! mid   0.8 <= ratio < 1.2
//! low   ratio < 0.8
//! ```

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

use crate::models::{Band, EnrichedRecord, PredictionFeatures, VpiScore};

/// Videos at or under this length count as shorts.
pub const SHORT_MAX_SECONDS: u64 = 60;

pub const HIGH_THRESHOLD: f64 = 1.2;
pub const MID_THRESHOLD: f64 = 0.8;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
        .expect("duration pattern is valid")
});

/// Length in seconds of an ISO-8601 duration such as `PT4M13S`.
/// Missing components count as zero. `None` if the text is not a duration
/// or its length does not fit in a `u64`.
pub fn parse_duration_secs(raw: &str) -> Option<u64> {
    let caps = DURATION_RE.captures(raw.trim())?;
    let part = |i: usize, unit: u64| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse::<u64>().ok()?.checked_mul(unit),
            None => Some(0),
        }
    };
    part(1, 86_400)?
        .checked_add(part(2, 3_600)?)?
        .checked_add(part(3, 60)?)?
        .checked_add(part(4, 1)?)
}

/// Derive model inputs from a validated record.
///
/// `now` is taken per evaluation, so scoring the same record later yields a
/// larger `elapsed_days`. Returns the reason text when a present field
/// cannot be interpreted.
pub fn derive_features(
    record: &EnrichedRecord,
    now: DateTime<Utc>,
) -> Result<PredictionFeatures, String> {
    let duration = record
        .content_details
        .as_ref()
        .and_then(|c| c.duration.as_deref())
        .ok_or("missing duration")?;
    let seconds = parse_duration_secs(duration).ok_or("malformed duration")?;

    let published = record
        .snippet
        .published_at
        .as_deref()
        .ok_or("missing publish date")?;
    let published = DateTime::parse_from_rfc3339(published)
        .map_err(|_| "malformed publish date")?
        .with_timezone(&Utc);

    let member_count = record
        .subscriber_count()
        .ok_or("malformed group statistics")?;
    let like_count = record.like_count().ok_or("malformed item statistics")?;

    Ok(PredictionFeatures {
        is_short: seconds <= SHORT_MAX_SECONDS,
        elapsed_days: elapsed_days(published, now),
        member_count,
        like_count,
    })
}

/// Fractional days between `published` and `now`, floored at zero for
/// scheduled premieres.
pub fn elapsed_days(published: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - published).num_milliseconds().max(0);
    millis as f64 / 86_400_000.0
}

pub fn score(record: &EnrichedRecord, predicted_views: u64) -> VpiScore {
    let actual_views = record.view_count().unwrap_or(0);
    let ratio = if predicted_views > 0 {
        round2(actual_views as f64 / predicted_views as f64)
    } else {
        0.0
    };
    VpiScore {
        actual_views,
        predicted_views,
        ratio,
    }
}

pub fn band(ratio: f64) -> Band {
    if ratio >= HIGH_THRESHOLD {
        Band::High
    } else if ratio >= MID_THRESHOLD {
        Band::Mid
    } else {
        Band::Low
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
