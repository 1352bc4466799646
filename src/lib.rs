//! # VPI Analyzer
//!
//! Quota-aware YouTube search enrichment and View Prediction Index scoring.
//!
//! A query is searched on the YouTube Data API, the hits are enriched with
//! video and channel statistics, and every video is scored against an
//! external view prediction service. The VPI is the ratio of actual to
//! predicted views, banded into `high`, `mid` and `low`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Credential  │──▶│  Dispatcher  │──▶│   Endpoint   │──▶ YouTube API
//! │   Rotator    │   │ (quota loop) │   │    Client    │
//! └──────────────┘   └──────┬───────┘   └──────────────┘
//!                           │
//!                    ┌──────▼───────┐
//!                    │   Pipeline   │  search → videos → channels → join
//!                    └──────┬───────┘
//!                           │ records
//!          ┌────────────────┼─────────────────┐
//!          ▼                ▼                 ▼
//!     ┌──────────┐   ┌────────────┐    ┌──────────┐
//!     │ Validate │──▶│ Prediction │───▶│   VPI    │   (per record, concurrent)
//!     └──────────┘   └────────────┘    └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export VPI_YOUTUBE_API_KEYS=key-one,key-two
//! vpi init
//! vpi analyze "rust tutorial" --sort vpi_desc
//! vpi history list
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | API and result data types |
//! | [`credentials`] | API key rotation |
//! | [`endpoint`] | Single YouTube API call and response classification |
//! | [`dispatcher`] | Retry on quota exhaustion across keys |
//! | [`youtube`] | Typed list endpoint wrappers |
//! | [`pipeline`] | Search/video/channel enrichment and join |
//! | [`validate`] | Pre-prediction record checks |
//! | [`prediction`] | View prediction service client |
//! | [`vpi`] | Feature derivation, scoring and banding |
//! | [`analyze`] | Query orchestration and result ordering |
//! | [`history`] | Search history persistence |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod analyze;
pub mod config;
pub mod credentials;
pub mod db;
pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod history;
pub mod migrate;
pub mod models;
pub mod pipeline;
pub mod prediction;
pub mod validate;
pub mod vpi;
pub mod youtube;
