//! Signal conditioning
//!
//! Amplitude-only stages applied to every trace before storage.
//! All stages implement the `TraceProcessor` trait.

mod chain;
mod detrend;
mod processor;
mod taper;

pub use chain::Normalizer;
pub use detrend::{detrend_linear, linear_fit, Detrend};
pub use processor::TraceProcessor;
pub use taper::{HannTaper, DEFAULT_TAPER_FRACTION};
