//! miniSEED decoding and encoding
//!
//! Records of the same channel that follow each other without a gap (at
//! most half a sample off) are joined into one trace. A gap, overlap or
//! rate change starts a new trace.

mod record;
mod steim;
mod writer;

use std::path::Path;

pub use record::{ByteOrder, Encoding, RecordHeader};
pub use writer::{MiniSeedWriter, DEFAULT_RECORD_EXPONENT};

use record::{decode_samples, parse_header, RecordError, FIXED_HEADER_LEN};

use crate::error::{Result, SeismicError};
use crate::waveform::decoder::WaveformDecoder;
use crate::waveform::trace::epoch_seconds;
use crate::waveform::{Trace, TraceStats};

/// Default file extension recognized as miniSEED
pub const MSEED_EXTENSION: &str = "mseed";

/// Decoder for SEED 2.4 data records
#[derive(Debug, Clone)]
pub struct MiniSeedDecoder {
    extensions: Vec<String>,
}

impl Default for MiniSeedDecoder {
    fn default() -> Self {
        Self {
            extensions: vec![MSEED_EXTENSION.to_string()],
        }
    }
}

impl MiniSeedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recognize files by the given extensions (without the dot)
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }
}

impl WaveformDecoder for MiniSeedDecoder {
    fn name(&self) -> &str {
        "miniSEED"
    }

    fn handles(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|known| known == ext))
    }

    fn decode(&self, path: &Path, bytes: &[u8]) -> Result<Vec<Trace>> {
        decode_records(path, bytes)
    }
}

fn record_error(path: &Path, offset: usize, err: RecordError) -> SeismicError {
    match err {
        RecordError::Malformed(reason) => SeismicError::Decode {
            path: path.to_path_buf(),
            reason: format!("record at byte {offset}: {reason}"),
        },
        RecordError::UnsupportedEncoding(encoding) => SeismicError::UnsupportedEncoding {
            path: path.to_path_buf(),
            encoding,
        },
    }
}

/// Decode every data record in `bytes` into traces, in record order
pub fn decode_records(path: &Path, bytes: &[u8]) -> Result<Vec<Trace>> {
    if bytes.is_empty() {
        return Err(SeismicError::Decode {
            path: path.to_path_buf(),
            reason: "file is empty".to_string(),
        });
    }

    let mut traces: Vec<Trace> = Vec::new();
    let mut offset = 0usize;

    while offset < bytes.len() {
        let rest = &bytes[offset..];
        if rest.len() < FIXED_HEADER_LEN && rest.iter().all(|b| *b == 0) {
            // zero padding after the last record
            break;
        }

        let header = parse_header(rest).map_err(|e| record_error(path, offset, e))?;
        if rest.len() < header.record_length {
            return Err(SeismicError::Decode {
                path: path.to_path_buf(),
                reason: format!(
                    "record at byte {offset} declares {} bytes, only {} remain",
                    header.record_length,
                    rest.len()
                ),
            });
        }

        let record = &rest[..header.record_length];
        if let Some(samples) =
            decode_samples(&header, record).map_err(|e| record_error(path, offset, e))?
        {
            append_record(&mut traces, &header, samples)?;
        }

        offset += header.record_length;
    }

    Ok(traces)
}

fn append_record(traces: &mut Vec<Trace>, header: &RecordHeader, samples: Vec<f64>) -> Result<()> {
    let stats = TraceStats::new(
        header.network.clone(),
        header.station.clone(),
        header.location.clone(),
        header.channel.clone(),
        header.starttime,
        header.sample_rate,
    );

    let record_start = epoch_seconds(&header.starttime);
    let tolerance = 0.5 / header.sample_rate;

    if let Some(trace) = traces.iter_mut().rev().find(|t| t.stats.same_channel(&stats)) {
        if (trace.next_sample_epoch() - record_start).abs() <= tolerance {
            trace.extend(&samples);
            return Ok(());
        }
    }

    traces.push(Trace::new(stats, samples)?);
    Ok(())
}
