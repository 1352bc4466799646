//! Query analysis: enrichment followed by per-record VPI scoring.
//!
//! # Flow
//!
//! ```text
//! query ──▶ enrich() ──▶ [record, record, ...]
//!                          │  (bounded concurrency, order preserved)
//!                          ▼
//!            validate ─▶ derive features ─▶ predict ─▶ score
//!                          │
//!                          ▼
//!               AnalysisReport { records: [ScoredRecord] }
//! ```
//!
//! Enrichment failures abort the query. Validation and prediction failures
//! only mark the affected record.
//!
//! Each call to [`Analyzer::analyze`] starts a new query generation. When a
//! newer query has started by the time an older one finishes, the older
//! result is dropped and `Ok(None)` is returned so callers never merge a
//! stale result into a fresh one.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::credentials::CredentialRotator;
use crate::db;
use crate::dispatcher::Dispatcher;
use crate::endpoint::{EndpointClient, HttpEndpointClient};
use crate::error::Result;
use crate::history;
use crate::migrate;
use crate::models::{EnrichedRecord, RecordStatus, ScoredRecord};
use crate::pipeline;
use crate::prediction::{HttpPredictionClient, Predictor};
use crate::validate::{validate, Validation};
use crate::vpi;
use crate::youtube::YoutubeApi;

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub query: String,
    pub records: Vec<ScoredRecord>,
    /// YouTube quota units charged while answering this query.
    pub units_consumed: u64,
}

/// Hands out query generations; only the latest one is current.
#[derive(Debug, Default)]
pub struct QueryGate {
    latest: AtomicU64,
}

impl QueryGate {
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, AtomicOrdering::SeqCst) + 1
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.latest.load(AtomicOrdering::SeqCst) == generation
    }
}

pub struct Analyzer {
    api: YoutubeApi,
    predictor: Arc<dyn Predictor>,
    concurrency: usize,
    gate: QueryGate,
}

impl Analyzer {
    pub fn new(api: YoutubeApi, predictor: Arc<dyn Predictor>, concurrency: usize) -> Self {
        Self {
            api,
            predictor,
            concurrency: concurrency.max(1),
            gate: QueryGate::default(),
        }
    }

    /// Build an analyzer wired to the real YouTube and prediction endpoints.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let rotator = CredentialRotator::new(config.youtube.api_keys.clone())?;
        let client: Arc<dyn EndpointClient> = Arc::new(HttpEndpointClient::new(&config.youtube)?);
        let dispatcher = Dispatcher::new(client, Arc::new(rotator));
        let api = YoutubeApi::new(Arc::new(dispatcher), config.youtube.page_size);
        let predictor = Arc::new(HttpPredictionClient::new(&config.prediction)?);
        Ok(Self::new(api, predictor, config.prediction.concurrency))
    }

    pub fn api(&self) -> &YoutubeApi {
        &self.api
    }

    /// Analyze `query`. `Ok(None)` means a newer query superseded this one,
    /// whether this one would have succeeded or failed.
    pub async fn analyze(&self, query: &str) -> Result<Option<AnalysisReport>> {
        let generation = self.gate.begin();

        let enriched = pipeline::enrich(&self.api, query).await;
        if self.superseded(query, generation) {
            return Ok(None);
        }
        let enrichment = enriched?;

        let records = self.score_all(enrichment.records).await;
        if self.superseded(query, generation) {
            return Ok(None);
        }

        Ok(Some(AnalysisReport {
            query: query.to_string(),
            records,
            units_consumed: enrichment.units_consumed,
        }))
    }

    fn superseded(&self, query: &str, generation: u64) -> bool {
        if self.gate.is_current(generation) {
            return false;
        }
        info!(query, generation, "discarding superseded analysis result");
        true
    }

    /// Score every record concurrently, keeping input order.
    pub async fn score_all(&self, records: Vec<EnrichedRecord>) -> Vec<ScoredRecord> {
        stream::iter(records)
            .map(|record| async move {
                let status = self.score_record(&record).await;
                ScoredRecord { record, status }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    pub async fn score_record(&self, record: &EnrichedRecord) -> RecordStatus {
        if let Validation::Invalid(reason) = validate(record) {
            return RecordStatus::Invalid {
                reason: reason.to_string(),
            };
        }

        let features = match vpi::derive_features(record, Utc::now()) {
            Ok(f) => f,
            Err(reason) => return RecordStatus::Invalid { reason },
        };

        match self.predictor.predict(&features).await {
            Ok(predicted) => {
                let score = vpi::score(record, predicted);
                RecordStatus::Scored {
                    band: vpi::band(score.ratio),
                    score,
                }
            }
            Err(e) => {
                warn!(video = %record.id, error = %e, "prediction failed");
                RecordStatus::PredictionError { message: e.0 }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Vpi,
    Subscribers,
    Views,
    Date,
}

/// Consumer-side ordering, e.g. `vpi_desc` or `date_asc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (field, order) = s
            .split_once('_')
            .ok_or_else(|| format!("invalid sort key '{}': expected <field>_<asc|desc>", s))?;
        let field = match field {
            "vpi" => SortField::Vpi,
            "subscribers" => SortField::Subscribers,
            "views" => SortField::Views,
            "date" => SortField::Date,
            other => return Err(format!("unknown sort field '{}'", other)),
        };
        let descending = match order {
            "desc" => true,
            "asc" => false,
            other => return Err(format!("unknown sort order '{}'", other)),
        };
        Ok(Self { field, descending })
    }
}

/// Stable sort; records lacking the sort value go last in either direction.
pub fn sort_records(records: &mut [ScoredRecord], key: SortKey) {
    records.sort_by(|a, b| {
        match (sort_value(a, key.field), sort_value(b, key.field)) {
            (Some(x), Some(y)) => {
                let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
                if key.descending {
                    ord.reverse()
                } else {
                    ord
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

fn sort_value(scored: &ScoredRecord, field: SortField) -> Option<f64> {
    let record = &scored.record;
    match field {
        SortField::Vpi => scored.status.score().map(|s| s.ratio),
        SortField::Subscribers => record.subscriber_count().map(|v| v as f64),
        SortField::Views => record.view_count().map(|v| v as f64),
        SortField::Date => record
            .snippet
            .published_at
            .as_deref()
            .and_then(|p| chrono::DateTime::parse_from_rfc3339(p).ok())
            .map(|d| d.timestamp_millis() as f64),
    }
}

/// CLI entry point for `vpi analyze`. Queries with no results are not
/// saved to history.
pub async fn run_analyze(
    config: &Config,
    query: &str,
    sort: Option<SortKey>,
    json: bool,
    save: bool,
) -> anyhow::Result<()> {
    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("query must not be empty");
    }

    let analyzer = Analyzer::from_config(config)?;
    let Some(mut report) = analyzer.analyze(query).await? else {
        return Ok(());
    };

    if save && !report.records.is_empty() {
        let enriched: Vec<EnrichedRecord> =
            report.records.iter().map(|s| s.record.clone()).collect();
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;
        history::save(&pool, &config.history.user, query, &enriched).await?;
        pool.close().await;
    }

    if let Some(key) = sort {
        sort_records(&mut report.records, key);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &AnalysisReport) {
    println!(
        "{} results for \"{}\" (API units used: {})",
        report.records.len(),
        report.query,
        report.units_consumed
    );
    if report.records.is_empty() {
        return;
    }
    println!();
    println!(
        "{:<12} {:>12} {:>12} {:<28} TITLE",
        "VIDEO", "VIEWS", "SUBSCRIBERS", "VPI"
    );
    for scored in &report.records {
        let r = &scored.record;
        let vpi = match &scored.status {
            RecordStatus::Scored { score, band } => format!("{:.2} ({})", score.ratio, band.as_str()),
            RecordStatus::Invalid { reason } => format!("n/a: {}", reason),
            RecordStatus::PredictionError { message } => format!("error: {}", message),
        };
        println!(
            "{:<12} {:>12} {:>12} {:<28} {}",
            r.id,
            r.view_count().map(|v| v.to_string()).unwrap_or_else(|| "-".into()),
            r.subscriber_count().map(|v| v.to_string()).unwrap_or_else(|| "-".into()),
            vpi,
            r.snippet.title.as_deref().unwrap_or("(untitled)")
        );
    }
}
