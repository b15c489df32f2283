//! Store Module
//!
//! Persists normalized samples into a SQLite table, one row per sample,
//! and answers range queries over station, channel and time.

pub mod query;
pub mod schema;
mod sample_store;

pub use query::{RangeQuery, SampleRow, StationIndex, TimeRange};
pub use sample_store::{LoadSummary, SampleStore, StoreOptions};
