//! Linear Detrend
//!
//! Fits `y = intercept + slope * i` by ordinary least squares over sample
//! index and subtracts the fitted line.

use crate::dsp::processor::TraceProcessor;

/// Least-squares line through `(i, samples[i])`
///
/// Returns `(slope, intercept)`, or `None` for fewer than two samples where
/// the slope is undefined.
pub fn linear_fit(samples: &[f64]) -> Option<(f64, f64)> {
    let n = samples.len();
    if n < 2 {
        return None;
    }

    let n_f = n as f64;
    let x_mean = (n_f - 1.0) / 2.0;
    let y_mean = samples.iter().sum::<f64>() / n_f;

    let (mut sxy, mut sxx) = (0.0_f64, 0.0_f64);
    for (i, &y) in samples.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }

    let slope = sxy / sxx;
    Some((slope, y_mean - slope * x_mean))
}

/// Subtract the least-squares line from `samples`. No-op below two samples.
pub fn detrend_linear(samples: &mut [f64]) {
    let Some((slope, intercept)) = linear_fit(samples) else {
        return;
    };
    for (i, y) in samples.iter_mut().enumerate() {
        *y -= intercept + slope * i as f64;
    }
}

/// Linear trend removal stage
#[derive(Debug, Clone, Copy, Default)]
pub struct Detrend;

impl Detrend {
    pub fn new() -> Self {
        Self
    }
}

impl TraceProcessor for Detrend {
    fn process(&self, samples: &mut [f64]) {
        detrend_linear(samples);
    }

    fn processor_type(&self) -> &'static str {
        "detrend"
    }

    fn box_clone(&self) -> Box<dyn TraceProcessor> {
        Box::new(*self)
    }
}
