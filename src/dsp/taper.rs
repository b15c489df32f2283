//! Hann Taper
//!
//! Ramps amplitudes from 0 at the first and last sample to 1 in the
//! interior. Both edges are cut from one symmetric Hann window of length
//! `2w + 1` (or `2w` when the edges meet), so when the tapered regions
//! cover the whole trace the result is exactly a single Hann window.

use std::f64::consts::PI;

use crate::dsp::processor::TraceProcessor;

/// Fraction of the trace tapered in total, split evenly between both edges
pub const DEFAULT_TAPER_FRACTION: f64 = 0.05;

/// Symmetric Hann taper applied to both edges of a trace
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HannTaper {
    fraction: f64,
}

impl Default for HannTaper {
    fn default() -> Self {
        Self::new(DEFAULT_TAPER_FRACTION)
    }
}

impl HannTaper {
    /// Create a taper covering `fraction` of the trace (clamped to 0..=1)
    pub fn new(fraction: f64) -> Self {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            DEFAULT_TAPER_FRACTION
        };
        Self { fraction }
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// Number of tapered samples at each edge of an `n`-sample trace
    pub fn half_width(&self, n: usize) -> usize {
        let per_edge = (self.fraction / 2.0 * n as f64).floor() as usize;
        per_edge.min(n / 2)
    }

    /// Taper weight of the `m`-th sample from either edge (`m < half_width`)
    fn ramp(&self, n: usize, m: usize) -> f64 {
        let w = self.half_width(n);
        let window_len = if 2 * w == n { 2 * w } else { 2 * w + 1 };
        0.5 - 0.5 * (2.0 * PI * m as f64 / (window_len - 1) as f64).cos()
    }

    /// Weight applied to sample `index` of an `n`-sample trace
    pub fn weight(&self, n: usize, index: usize) -> f64 {
        let w = self.half_width(n);
        if index >= n {
            return 0.0;
        }
        let from_edge = index.min(n - 1 - index);
        if from_edge < w {
            self.ramp(n, from_edge)
        } else {
            1.0
        }
    }

    /// Full weight vector for an `n`-sample trace
    pub fn weights(&self, n: usize) -> Vec<f64> {
        (0..n).map(|i| self.weight(n, i)).collect()
    }
}

impl TraceProcessor for HannTaper {
    fn process(&self, samples: &mut [f64]) {
        let n = samples.len();
        let w = self.half_width(n);
        for m in 0..w {
            let factor = self.ramp(n, m);
            samples[m] *= factor;
            samples[n - 1 - m] *= factor;
        }
    }

    fn processor_type(&self) -> &'static str {
        "taper"
    }

    fn box_clone(&self) -> Box<dyn TraceProcessor> {
        Box::new(*self)
    }
}
