//! miniSEED record writer
//!
//! Writes traces as big-endian FLOAT64 data records. Used to produce demo
//! datasets and test fixtures; the ingest path only reads.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

use super::record::{Encoding, FIXED_HEADER_LEN};
use crate::error::{Result, SeismicError};
use crate::waveform::Trace;

/// Default record length exponent (2^9 = 512 bytes)
pub const DEFAULT_RECORD_EXPONENT: u8 = 9;

const BLOCKETTE_1000_LEN: usize = 8;
const BLOCKETTE_1001_LEN: usize = 8;
const BLOCKETTE_100_LEN: usize = 12;
const SAMPLE_WIDTH: usize = 8;

/// Writer configuration
#[derive(Debug, Clone)]
pub struct MiniSeedWriter {
    record_exponent: u8,
}

impl Default for MiniSeedWriter {
    fn default() -> Self {
        Self {
            record_exponent: DEFAULT_RECORD_EXPONENT,
        }
    }
}

/// Header factor/multiplier for a rate, and whether it is exact
fn factor_for_rate(rate: f64) -> (i16, i16, bool) {
    let is_whole = |v: f64| (v - v.round()).abs() < 1e-9 && v >= 1.0 && v <= f64::from(i16::MAX);
    if is_whole(rate) {
        (rate.round() as i16, 1, true)
    } else if is_whole(1.0 / rate) {
        (-((1.0 / rate).round() as i16), 1, true)
    } else {
        ((rate.round() as i16).max(1), 1, false)
    }
}

fn check_code(trace: &Trace, field: &str, value: &str, width: usize) -> Result<()> {
    if value.len() > width || !value.is_ascii() {
        return Err(SeismicError::InvalidTrace {
            id: trace.id(),
            reason: format!("{field} code {value:?} does not fit {width} ASCII characters"),
        });
    }
    Ok(())
}

fn put_padded(buf: &mut [u8], at: usize, width: usize, value: &str) {
    for (i, slot) in buf[at..at + width].iter_mut().enumerate() {
        *slot = value.as_bytes().get(i).copied().unwrap_or(b' ');
    }
}

fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_be_bytes());
}

impl MiniSeedWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use records of `2^exponent` bytes (8..=16)
    pub fn with_record_exponent(exponent: u8) -> Result<Self> {
        if !(8..=16).contains(&exponent) {
            return Err(SeismicError::InvalidConfig {
                reason: format!("record length exponent {exponent} must be within 8..=16"),
            });
        }
        Ok(Self {
            record_exponent: exponent,
        })
    }

    pub fn record_length(&self) -> usize {
        1usize << self.record_exponent
    }

    /// Encode traces into a sequence of data records
    pub fn encode(&self, traces: &[Trace]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut sequence = 1u32;
        for trace in traces {
            check_code(trace, "network", &trace.stats.network, 2)?;
            check_code(trace, "station", &trace.stats.station, 5)?;
            check_code(trace, "location", &trace.stats.location, 2)?;
            check_code(trace, "channel", &trace.stats.channel, 3)?;

            let (factor, multiplier, exact) = factor_for_rate(trace.stats.sampling_rate);
            let blockettes_len = BLOCKETTE_1000_LEN
                + BLOCKETTE_1001_LEN
                + if exact { 0 } else { BLOCKETTE_100_LEN };
            let data_offset = (FIXED_HEADER_LEN + blockettes_len).next_multiple_of(SAMPLE_WIDTH);
            let per_record = (self.record_length() - data_offset) / SAMPLE_WIDTH;

            for (chunk_index, chunk) in trace.data().chunks(per_record).enumerate() {
                let offset_secs = (chunk_index * per_record) as f64 / trace.stats.sampling_rate;
                let start = trace.stats.starttime
                    + Duration::nanoseconds((offset_secs * 1e9).round() as i64);

                let mut record = vec![0u8; self.record_length()];
                self.write_header(&mut record, trace, sequence, start, chunk.len(), data_offset);
                put_u16(&mut record, 32, factor as u16);
                put_u16(&mut record, 34, multiplier as u16);
                self.write_blockettes(&mut record, &start, exact, trace.stats.sampling_rate);

                for (i, sample) in chunk.iter().enumerate() {
                    let at = data_offset + i * SAMPLE_WIDTH;
                    record[at..at + SAMPLE_WIDTH].copy_from_slice(&sample.to_be_bytes());
                }

                out.extend_from_slice(&record);
                sequence = if sequence >= 999_999 { 1 } else { sequence + 1 };
            }
        }
        Ok(out)
    }

    /// Encode traces and write them to `path`
    pub fn write_file(&self, path: &Path, traces: &[Trace]) -> Result<()> {
        let bytes = self.encode(traces)?;
        fs::write(path, bytes).map_err(|e| SeismicError::OutputWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn write_header(
        &self,
        record: &mut [u8],
        trace: &Trace,
        sequence: u32,
        start: DateTime<Utc>,
        num_samples: usize,
        data_offset: usize,
    ) {
        record[..6].copy_from_slice(format!("{sequence:06}").as_bytes());
        record[6] = b'D';
        record[7] = b' ';
        put_padded(record, 8, 5, &trace.stats.station);
        put_padded(record, 13, 2, &trace.stats.location);
        put_padded(record, 15, 3, &trace.stats.channel);
        put_padded(record, 18, 2, &trace.stats.network);

        put_u16(record, 20, start.year() as u16);
        put_u16(record, 22, start.ordinal() as u16);
        record[24] = start.hour() as u8;
        record[25] = start.minute() as u8;
        record[26] = start.second() as u8;
        let micros = (start.nanosecond() % 1_000_000_000) / 1_000;
        put_u16(record, 28, (micros / 100) as u16);

        put_u16(record, 30, num_samples as u16);
        record[39] = if data_offset > FIXED_HEADER_LEN + BLOCKETTE_1000_LEN + BLOCKETTE_1001_LEN {
            3
        } else {
            2
        };
        put_u16(record, 44, data_offset as u16);
        put_u16(record, 46, FIXED_HEADER_LEN as u16);
    }

    fn write_blockettes(&self, record: &mut [u8], start: &DateTime<Utc>, exact: bool, rate: f64) {
        let b1000 = FIXED_HEADER_LEN;
        let b1001 = b1000 + BLOCKETTE_1000_LEN;
        let b100 = b1001 + BLOCKETTE_1001_LEN;

        put_u16(record, b1000, 1000);
        put_u16(record, b1000 + 2, b1001 as u16);
        record[b1000 + 4] = Encoding::Float64.code();
        record[b1000 + 5] = 1;
        record[b1000 + 6] = self.record_exponent;

        put_u16(record, b1001, 1001);
        put_u16(record, b1001 + 2, if exact { 0 } else { b100 as u16 });
        let micros = (start.nanosecond() % 1_000_000_000) / 1_000;
        record[b1001 + 5] = (micros % 100) as u8;

        if !exact {
            put_u16(record, b100, 100);
            put_u16(record, b100 + 2, 0);
            record[b100 + 4..b100 + 8].copy_from_slice(&(rate as f32).to_be_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(100.0, (100, 1, true) ; "whole rate")]
    #[test_case(0.1, (-10, 1, true) ; "whole period")]
    #[test_case(1.0, (1, 1, true) ; "one hertz")]
    #[test_case(2.5, (3, 1, false) ; "fractional rate needs blockette 100")]
    fn test_factor_for_rate(rate: f64, expected: (i16, i16, bool)) {
        assert_eq!(factor_for_rate(rate), expected);
    }

    #[test]
    fn test_record_exponent_bounds() {
        assert!(MiniSeedWriter::with_record_exponent(7).is_err());
        assert!(MiniSeedWriter::with_record_exponent(17).is_err());
        assert_eq!(
            MiniSeedWriter::with_record_exponent(12).unwrap().record_length(),
            4096
        );
    }
}
