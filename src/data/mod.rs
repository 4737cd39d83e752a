//! Result tables: decoding, normalisation and filtering.
//!
//! ```text
//!  bytes ──loader──► RawTable ──Table::from_raw──► Table ──filter──► FilteredView
//!        (xlsx/csv/json/parquet)   (schema checks)           (row indices)
//! ```
//!
//! A [`model::Table`] is read-only once built; every view borrows it.

pub mod filter;
pub mod loader;
pub mod model;
