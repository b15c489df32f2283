//! miniSEED (SEED 2.4) data record parsing
//!
//! A record is a 48-byte fixed header, a chain of blockettes, then the
//! encoded samples. The record length and data encoding come from
//! blockette 1000, which is required.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use num_traits::AsPrimitive;

use super::steim::{decode_steim1, decode_steim2};

pub(crate) const FIXED_HEADER_LEN: usize = 48;

/// Smallest and largest record lengths accepted, as powers of two
const MIN_RECORD_EXPONENT: u8 = 7;
const MAX_RECORD_EXPONENT: u8 = 16;

/// Activity flag bit: header time correction already applied
const TIME_CORRECTION_APPLIED: u8 = 0x02;

/// Byte order of header fields or sample words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

macro_rules! read_at {
    ($name:ident, $ty:ty, $len:expr) => {
        pub(crate) fn $name(self, buf: &[u8], offset: usize) -> Option<$ty> {
            let bytes: [u8; $len] = buf.get(offset..offset + $len)?.try_into().ok()?;
            Some(match self {
                ByteOrder::Big => <$ty>::from_be_bytes(bytes),
                ByteOrder::Little => <$ty>::from_le_bytes(bytes),
            })
        }
    };
}

impl ByteOrder {
    read_at!(u16_at, u16, 2);
    read_at!(i16_at, i16, 2);
    read_at!(u32_at, u32, 4);
    read_at!(i32_at, i32, 4);
    read_at!(f32_at, f32, 4);
    read_at!(f64_at, f64, 8);
}

/// Sample encodings understood by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Ascii,
    Int16,
    Int32,
    Float32,
    Float64,
    Steim1,
    Steim2,
}

impl Encoding {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Encoding::Ascii),
            1 => Some(Encoding::Int16),
            3 => Some(Encoding::Int32),
            4 => Some(Encoding::Float32),
            5 => Some(Encoding::Float64),
            10 => Some(Encoding::Steim1),
            11 => Some(Encoding::Steim2),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Encoding::Ascii => 0,
            Encoding::Int16 => 1,
            Encoding::Int32 => 3,
            Encoding::Float32 => 4,
            Encoding::Float64 => 5,
            Encoding::Steim1 => 10,
            Encoding::Steim2 => 11,
        }
    }
}

/// Parsed header of one data record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordHeader {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
    pub quality: char,
    pub starttime: DateTime<Utc>,
    pub num_samples: usize,
    pub sample_rate: f64,
    pub encoding_code: u8,
    pub record_length: usize,
    pub data_offset: usize,
    pub data_order: ByteOrder,
}

/// Errors while parsing a record. The caller adds the file path.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RecordError {
    Malformed(String),
    UnsupportedEncoding(u8),
}

impl From<String> for RecordError {
    fn from(reason: String) -> Self {
        RecordError::Malformed(reason)
    }
}

fn truncated(field: &str) -> RecordError {
    RecordError::Malformed(format!("record truncated reading {field}"))
}

fn ascii_field(buf: &[u8], start: usize, len: usize) -> String {
    buf.get(start..start + len)
        .map(|b| String::from_utf8_lossy(b).trim().to_string())
        .unwrap_or_default()
}

/// Header byte order, detected from a plausible year
fn detect_order(buf: &[u8]) -> Result<ByteOrder, RecordError> {
    for order in [ByteOrder::Big, ByteOrder::Little] {
        let year = order.u16_at(buf, 20).ok_or_else(|| truncated("start year"))?;
        if (1900..=2100).contains(&year) {
            return Ok(order);
        }
    }
    Err(RecordError::Malformed(
        "start year out of range, not a miniSEED record".to_string(),
    ))
}

/// Nominal sample rate from the header factor and multiplier
pub(crate) fn rate_from_factor(factor: i16, multiplier: i16) -> f64 {
    let (f, m) = (f64::from(factor), f64::from(multiplier));
    match (factor.signum(), multiplier.signum()) {
        (0, _) | (_, 0) => 0.0,
        (1, 1) => f * m,
        (1, _) => -f / m,
        (_, 1) => -m / f,
        _ => 1.0 / (f * m),
    }
}

fn parse_btime(
    buf: &[u8],
    order: ByteOrder,
    offset: usize,
) -> Result<DateTime<Utc>, RecordError> {
    let year = order.u16_at(buf, offset).ok_or_else(|| truncated("year"))?;
    let day = order.u16_at(buf, offset + 2).ok_or_else(|| truncated("day"))?;
    let hour = *buf.get(offset + 4).ok_or_else(|| truncated("hour"))?;
    let minute = *buf.get(offset + 5).ok_or_else(|| truncated("minute"))?;
    let second = *buf.get(offset + 6).ok_or_else(|| truncated("second"))?;
    let fract = order.u16_at(buf, offset + 8).ok_or_else(|| truncated("fraction"))?;

    // A leap second is carried as the next minute
    let (second, leap) = if second == 60 { (59, 1) } else { (second, 0) };
    let naive = NaiveDate::from_yo_opt(i32::from(year), u32::from(day))
        .and_then(|d| d.and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second)))
        .ok_or_else(|| {
            RecordError::Malformed(format!(
                "invalid start time {year}-{day:03} {hour:02}:{minute:02}:{second:02}"
            ))
        })?;

    Ok(naive.and_utc() + Duration::seconds(leap) + Duration::microseconds(i64::from(fract) * 100))
}

/// Parse the fixed header and blockettes of the record starting at `buf[0]`
pub(crate) fn parse_header(buf: &[u8]) -> Result<RecordHeader, RecordError> {
    if buf.len() < FIXED_HEADER_LEN {
        return Err(truncated("fixed header"));
    }

    let quality = buf[6] as char;
    if !matches!(quality, 'D' | 'R' | 'Q' | 'M') {
        return Err(RecordError::Malformed(format!(
            "invalid data quality indicator {:?}, not a miniSEED data record",
            quality
        )));
    }

    let order = detect_order(buf)?;
    let mut starttime = parse_btime(buf, order, 20)?;

    let num_samples = order.u16_at(buf, 30).ok_or_else(|| truncated("sample count"))?;
    let factor = order.i16_at(buf, 32).ok_or_else(|| truncated("rate factor"))?;
    let multiplier = order.i16_at(buf, 34).ok_or_else(|| truncated("rate multiplier"))?;
    let activity = buf[36];
    let num_blockettes = buf[39];
    let correction = order.i32_at(buf, 40).ok_or_else(|| truncated("time correction"))?;
    let data_offset = order.u16_at(buf, 44).ok_or_else(|| truncated("data offset"))?;
    let mut next = order.u16_at(buf, 46).ok_or_else(|| truncated("blockette offset"))?;

    let mut sample_rate = rate_from_factor(factor, multiplier);
    let mut encoding_code = None;
    let mut data_order = order;
    let mut record_exponent = None;
    let mut microseconds = 0i64;

    let mut seen = 0u8;
    while next != 0 && seen < num_blockettes {
        let offset = usize::from(next);
        let kind = order.u16_at(buf, offset).ok_or_else(|| truncated("blockette type"))?;
        let following = order
            .u16_at(buf, offset + 2)
            .ok_or_else(|| truncated("blockette chain"))?;

        match kind {
            100 => {
                let rate = order.f32_at(buf, offset + 4).ok_or_else(|| truncated("blockette 100"))?;
                sample_rate = f64::from(rate);
            }
            1000 => {
                let fields = buf.get(offset + 4..offset + 7).ok_or_else(|| truncated("blockette 1000"))?;
                encoding_code = Some(fields[0]);
                data_order = if fields[1] == 0 { ByteOrder::Little } else { ByteOrder::Big };
                record_exponent = Some(fields[2]);
            }
            1001 => {
                let usec = *buf.get(offset + 5).ok_or_else(|| truncated("blockette 1001"))?;
                microseconds = i64::from(usec as i8);
            }
            _ => {}
        }

        seen += 1;
        if following != 0 && following <= next {
            return Err(RecordError::Malformed("blockette chain loops backwards".to_string()));
        }
        next = following;
    }

    let exponent = record_exponent.ok_or_else(|| {
        RecordError::Malformed("record has no blockette 1000, record length unknown".to_string())
    })?;
    if !(MIN_RECORD_EXPONENT..=MAX_RECORD_EXPONENT).contains(&exponent) {
        return Err(RecordError::Malformed(format!(
            "record length 2^{exponent} out of range"
        )));
    }
    let record_length = 1usize << exponent;

    starttime += Duration::microseconds(microseconds);
    if activity & TIME_CORRECTION_APPLIED == 0 && correction != 0 {
        starttime += Duration::microseconds(i64::from(correction) * 100);
    }

    let data_offset = usize::from(data_offset);
    if num_samples > 0 && (data_offset < FIXED_HEADER_LEN || data_offset >= record_length) {
        return Err(RecordError::Malformed(format!(
            "data offset {data_offset} outside record of {record_length} bytes"
        )));
    }

    Ok(RecordHeader {
        network: ascii_field(buf, 18, 2),
        station: ascii_field(buf, 8, 5),
        location: ascii_field(buf, 13, 2),
        channel: ascii_field(buf, 15, 3),
        quality,
        starttime,
        num_samples: usize::from(num_samples),
        sample_rate,
        encoding_code: encoding_code.unwrap_or_default(),
        record_length,
        data_offset,
        data_order,
    })
}

fn widen<T: AsPrimitive<f64>>(
    data: &[u8],
    count: usize,
    width: usize,
    read: impl Fn(&[u8], usize) -> Option<T>,
) -> Result<Vec<f64>, RecordError> {
    (0..count)
        .map(|i| {
            read(data, i * width)
                .map(|value: T| -> f64 { value.as_() })
                .ok_or_else(|| truncated("samples"))
        })
        .collect()
}

/// Decode the samples of a record. `None` for records without waveform
/// data (ASCII log records, zero sample count, zero rate).
pub(crate) fn decode_samples(
    header: &RecordHeader,
    record: &[u8],
) -> Result<Option<Vec<f64>>, RecordError> {
    let encoding = Encoding::from_code(header.encoding_code)
        .ok_or(RecordError::UnsupportedEncoding(header.encoding_code))?;
    if encoding == Encoding::Ascii || header.num_samples == 0 {
        return Ok(None);
    }
    if !(header.sample_rate.is_finite() && header.sample_rate > 0.0) {
        return Err(RecordError::Malformed(format!(
            "{} samples with unusable sample rate {}",
            header.num_samples, header.sample_rate
        )));
    }

    let data = record
        .get(header.data_offset..header.record_length)
        .ok_or_else(|| truncated("data section"))?;
    let n = header.num_samples;
    let order = header.data_order;

    let samples = match encoding {
        Encoding::Int16 => widen(data, n, 2, |b, o| order.i16_at(b, o))?,
        Encoding::Int32 => widen(data, n, 4, |b, o| order.i32_at(b, o))?,
        Encoding::Float32 => widen(data, n, 4, |b, o| order.f32_at(b, o))?,
        Encoding::Float64 => widen(data, n, 8, |b, o| order.f64_at(b, o))?,
        Encoding::Steim1 => decode_steim1(data, n, order)?
            .into_iter()
            .map(f64::from)
            .collect(),
        Encoding::Steim2 => decode_steim2(data, n, order)?
            .into_iter()
            .map(f64::from)
            .collect(),
        Encoding::Ascii => return Ok(None),
    };
    Ok(Some(samples))
}
