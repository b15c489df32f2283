//! Waveform Module
//!
//! Everything between a directory of recordings and normalized traces:
//! - Trace / Stream data model
//! - Decoder trait and the miniSEED implementation
//! - Directory reader
//! - Synthetic trace generation

pub mod decoder;
pub mod mseed;
pub mod reader;
pub mod synthetic;
pub mod trace;

pub use decoder::WaveformDecoder;
pub use mseed::{MiniSeedDecoder, MiniSeedWriter};
pub use reader::{ReadOutcome, SkippedFile, SourceFile, SourceReader};
pub use synthetic::generate_test_trace;
pub use trace::{epoch_seconds, Stream, StreamSet, Trace, TraceStats};
