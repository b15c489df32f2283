//! Waveform decoder trait
//!
//! The reader never parses binary formats itself; it hands file bytes to a
//! `WaveformDecoder` and receives typed traces back.

use std::path::Path;

use crate::error::Result;
use crate::waveform::Trace;

/// Turns the bytes of one recording file into traces
pub trait WaveformDecoder {
    /// Human-readable format name
    fn name(&self) -> &str;

    /// Whether `path` looks like a file this decoder understands
    fn handles(&self, path: &Path) -> bool;

    /// Decode `bytes` read from `path`. `path` is only used for messages.
    fn decode(&self, path: &Path, bytes: &[u8]) -> Result<Vec<Trace>>;
}
