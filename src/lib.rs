//! Filter, aggregate and report pipeline for manufacturing test results.
//!
//! ```text
//!  file ──► data::loader ──► Table ──► data::filter ──► FilteredView
//!                                                     │
//!                          ┌──────────────────────────┼───────────────┐
//!                          ▼                          ▼               ▼
//!                      metrics                     chart           report
//!                  (MetricsSnapshot)             (ChartSpec)   (ReportDocument)
//! ```
//!
//! The library holds no UI or plotting code; [`state::AppState`] ties the
//! stages together for an interactive front end.

pub mod chart;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod report;
pub mod state;
