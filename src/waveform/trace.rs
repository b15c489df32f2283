//! Trace and Stream types
//!
//! A [`Trace`] is one continuous, uniformly sampled channel recording. Its
//! timing (start + sample rate) is fixed at construction; processing stages
//! only ever see the sample slice, so amplitude rewrites can never shift
//! the time axis.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SeismicError};

/// Identity and timing metadata of a trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStats {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
    /// Time of the first sample
    pub starttime: DateTime<Utc>,
    /// Samples per second
    pub sampling_rate: f64,
}

impl TraceStats {
    pub fn new(
        network: impl Into<String>,
        station: impl Into<String>,
        location: impl Into<String>,
        channel: impl Into<String>,
        starttime: DateTime<Utc>,
        sampling_rate: f64,
    ) -> Self {
        Self {
            network: network.into(),
            station: station.into(),
            location: location.into(),
            channel: channel.into(),
            starttime,
            sampling_rate,
        }
    }

    /// SEED identifier, `NET.STA.LOC.CHA`
    pub fn id(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.network, self.station, self.location, self.channel
        )
    }

    /// Whether two stats describe the same channel (NSLC and rate)
    pub fn same_channel(&self, other: &TraceStats) -> bool {
        self.network == other.network
            && self.station == other.station
            && self.location == other.location
            && self.channel == other.channel
            && (self.sampling_rate - other.sampling_rate).abs() <= self.sampling_rate * 1e-6
    }
}

/// Convert a UTC instant to epoch seconds
pub fn epoch_seconds(time: &DateTime<Utc>) -> f64 {
    time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) * 1e-9
}

/// One continuous, uniformly sampled channel recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub stats: TraceStats,
    data: Vec<f64>,
}

impl Trace {
    /// Create a trace, rejecting empty data and non-positive sample rates
    pub fn new(stats: TraceStats, data: Vec<f64>) -> Result<Self> {
        if data.is_empty() {
            return Err(SeismicError::InvalidTrace {
                id: stats.id(),
                reason: "trace has no samples".to_string(),
            });
        }
        if !(stats.sampling_rate.is_finite() && stats.sampling_rate > 0.0) {
            return Err(SeismicError::InvalidTrace {
                id: stats.id(),
                reason: format!("sample rate must be positive, got {}", stats.sampling_rate),
            });
        }
        Ok(Self { stats, data })
    }

    pub fn id(&self) -> String {
        self.stats.id()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false for a constructed trace; kept for API symmetry
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable access to amplitudes. The length cannot change through a slice.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Seconds between consecutive samples
    pub fn delta(&self) -> f64 {
        1.0 / self.stats.sampling_rate
    }

    /// Start time as epoch seconds
    pub fn start_epoch(&self) -> f64 {
        epoch_seconds(&self.stats.starttime)
    }

    /// Epoch-second timestamp of sample `index`: `start + index / rate`
    pub fn timestamp(&self, index: usize) -> f64 {
        self.start_epoch() + index as f64 / self.stats.sampling_rate
    }

    /// Timestamps of every sample, in order
    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        let start = self.start_epoch();
        let rate = self.stats.sampling_rate;
        (0..self.data.len()).map(move |i| start + i as f64 / rate)
    }

    /// Time of the last sample
    pub fn endtime(&self) -> DateTime<Utc> {
        let span_secs = (self.data.len() - 1) as f64 / self.stats.sampling_rate;
        self.stats.starttime + Duration::nanoseconds((span_secs * 1e9).round() as i64)
    }

    /// Epoch time at which the next contiguous sample would fall
    pub(crate) fn next_sample_epoch(&self) -> f64 {
        self.timestamp(self.data.len())
    }

    pub(crate) fn extend(&mut self, samples: &[f64]) {
        self.data.extend_from_slice(samples);
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} - {} | {} Hz, {} samples",
            self.id(),
            self.stats.starttime.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
            self.endtime().format("%Y-%m-%dT%H:%M:%S%.6fZ"),
            self.stats.sampling_rate,
            self.data.len()
        )
    }
}

/// The traces decoded from one source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    /// Source file name; an opaque grouping key
    pub name: String,
    pub traces: Vec<Trace>,
}

impl Stream {
    pub fn new(name: impl Into<String>, traces: Vec<Trace>) -> Self {
        Self {
            name: name.into(),
            traces,
        }
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trace> {
        self.traces.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Trace> {
        self.traces.iter_mut()
    }

    pub fn total_samples(&self) -> usize {
        self.traces.iter().map(Trace::len).sum()
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Trace(s) in Stream:", self.traces.len())?;
        for trace in &self.traces {
            write!(f, "\n{}", trace)?;
        }
        Ok(())
    }
}

/// Streams keyed by file name, always iterated in file-name order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSet {
    streams: BTreeMap<String, Stream>,
}

impl StreamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a stream under its own name, returning any stream it replaced
    pub fn insert(&mut self, stream: Stream) -> Option<Stream> {
        self.streams.insert(stream.name.clone(), stream)
    }

    pub fn get(&self, name: &str) -> Option<&Stream> {
        self.streams.get(name)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Streams in file-name order
    pub fn iter(&self) -> impl Iterator<Item = &Stream> {
        self.streams.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Stream> {
        self.streams.values_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.streams.keys().map(String::as_str)
    }

    /// Every trace, streams in file-name order
    pub fn traces(&self) -> impl Iterator<Item = &Trace> {
        self.streams.values().flat_map(|s| s.traces.iter())
    }

    pub fn total_traces(&self) -> usize {
        self.streams.values().map(Stream::len).sum()
    }

    pub fn total_samples(&self) -> usize {
        self.streams.values().map(Stream::total_samples).sum()
    }

    /// Distinct station codes, derived without touching storage
    pub fn distinct_stations(&self) -> BTreeSet<String> {
        self.traces().map(|t| t.stats.station.clone()).collect()
    }
}

impl FromIterator<Stream> for StreamSet {
    fn from_iter<I: IntoIterator<Item = Stream>>(iter: I) -> Self {
        let mut set = StreamSet::new();
        for stream in iter {
            set.insert(stream);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn stats(station: &str, rate: f64) -> TraceStats {
        let start = Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap();
        TraceStats::new("XX", station, "", "HHZ", start, rate)
    }

    #[test]
    fn test_trace_rejects_empty_data() {
        let err = Trace::new(stats("ABC", 1.0), vec![]).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_TRACE");
    }

    #[test]
    fn test_trace_rejects_bad_rate() {
        assert!(Trace::new(stats("ABC", 0.0), vec![1.0]).is_err());
        assert!(Trace::new(stats("ABC", -5.0), vec![1.0]).is_err());
        assert!(Trace::new(stats("ABC", f64::NAN), vec![1.0]).is_err());
    }

    #[test]
    fn test_timestamps_follow_rate() {
        let trace = Trace::new(stats("ABC", 4.0), vec![0.0; 9]).unwrap();
        let t0 = trace.start_epoch();

        assert_relative_eq!(trace.timestamp(0), t0);
        assert_relative_eq!(trace.timestamp(8), t0 + 2.0);

        let times: Vec<f64> = trace.times().collect();
        assert_eq!(times.len(), 9);
        assert!(times.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(trace.endtime(), trace.stats.starttime + Duration::seconds(2));
    }

    #[test]
    fn test_stream_set_iterates_by_name() {
        let trace = Trace::new(stats("ABC", 1.0), vec![1.0]).unwrap();
        let set: StreamSet = ["c.mseed", "a.mseed", "b.mseed"]
            .iter()
            .map(|n| Stream::new(*n, vec![trace.clone()]))
            .collect();

        let names: Vec<&str> = set.names().collect();
        assert_eq!(names, vec!["a.mseed", "b.mseed", "c.mseed"]);
        assert_eq!(set.total_traces(), 3);
    }

    #[test]
    fn test_distinct_stations_from_memory() {
        let a = Trace::new(stats("ABC", 1.0), vec![1.0]).unwrap();
        let b = Trace::new(stats("DEF", 1.0), vec![1.0]).unwrap();
        let set: StreamSet = vec![
            Stream::new("1.mseed", vec![a.clone(), b]),
            Stream::new("2.mseed", vec![a]),
        ]
        .into_iter()
        .collect();

        let stations: Vec<String> = set.distinct_stations().into_iter().collect();
        assert_eq!(stations, vec!["ABC".to_string(), "DEF".to_string()]);
    }

    #[test]
    fn test_trace_display_names_id() {
        let trace = Trace::new(stats("ABC", 100.0), vec![0.0; 10]).unwrap();
        let text = trace.to_string();
        assert!(text.starts_with("XX.ABC..HHZ | 2024-09-01T12:00:00"));
        assert!(text.ends_with("100 Hz, 10 samples"));
    }
}
