//! Synthetic waveform generation
//!
//! Produces deterministic traces with a DC offset, a linear drift and a
//! couple of sinusoids, so detrending and tapering have visible work to do.

use std::f64::consts::PI;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::waveform::{Trace, TraceStats};

/// DC offset of generated traces, in counts
const OFFSET: f64 = 1_000.0;
/// Drift per sample, in counts
const DRIFT: f64 = 0.5;

/// Generate a test trace of `num_samples` samples
pub fn generate_test_trace(
    network: &str,
    station: &str,
    channel: &str,
    start: DateTime<Utc>,
    sampling_rate: f64,
    num_samples: usize,
) -> Result<Trace> {
    // Station code seeds the phase so different stations don't overlap exactly
    let phase = station.bytes().map(f64::from).sum::<f64>() % (2.0 * PI);
    let data = (0..num_samples)
        .map(|i| {
            let t = i as f64 / sampling_rate;
            OFFSET
                + DRIFT * i as f64
                + 400.0 * (2.0 * PI * 0.2 * t + phase).sin()
                + 120.0 * (2.0 * PI * 1.3 * t).sin()
        })
        .collect();

    Trace::new(
        TraceStats::new(network, station, "", channel, start, sampling_rate),
        data,
    )
}
