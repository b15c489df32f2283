//! Query types
//!
//! Sample rows and range filters shared by the store and its consumers.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::waveform::{epoch_seconds, StreamSet};

/// One persisted sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    pub id: i64,
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
    /// Epoch seconds
    pub timestamp: f64,
    pub amplitude: f64,
}

/// Inclusive epoch-second interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn between(start: &DateTime<Utc>, end: &DateTime<Utc>) -> Self {
        Self::new(epoch_seconds(start), epoch_seconds(end))
    }

    pub fn contains(&self, timestamp: f64) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

/// Filter for `range_query`; `None` fields match everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeQuery {
    pub stations: Option<BTreeSet<String>>,
    pub time_range: Option<TimeRange>,
    pub limit: Option<usize>,
}

impl RangeQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn stations<I, S>(mut self, stations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stations = Some(stations.into_iter().map(Into::into).collect());
        self
    }

    pub fn time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Source of the distinct station codes a map pass needs
///
/// Implemented both by the store and by in-memory streams, so rendering
/// never has to wait for persistence.
pub trait StationIndex {
    fn list_distinct_stations(&self) -> Result<BTreeSet<String>>;
}

impl StationIndex for StreamSet {
    fn list_distinct_stations(&self) -> Result<BTreeSet<String>> {
        Ok(self.distinct_stations())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_range_contains_endpoints() {
        let range = TimeRange::new(10.0, 20.0);
        assert!(range.contains(10.0));
        assert!(range.contains(20.0));
        assert!(!range.contains(20.5));
    }

    #[test]
    fn test_range_between_datetimes() {
        let start = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 10).unwrap();
        let end = Utc.with_ymd_and_hms(1970, 1, 1, 0, 1, 0).unwrap();
        assert_eq!(TimeRange::between(&start, &end), TimeRange::new(10.0, 60.0));
    }

    #[test]
    fn test_query_builder() {
        let query = RangeQuery::all().stations(["ABC", "DEF"]).limit(5);
        assert_eq!(query.stations.as_ref().map(BTreeSet::len), Some(2));
        assert_eq!(query.limit, Some(5));
        assert!(query.time_range.is_none());
    }

    #[test]
    fn test_empty_stream_set_has_no_stations() {
        let streams = StreamSet::new();
        assert!(streams.list_distinct_stations().unwrap().is_empty());
    }
}
