//! Steim-1 and Steim-2 difference decompression
//!
//! Data is a run of 64-byte frames of sixteen 32-bit words. Word 0 of every
//! frame packs a 2-bit control code per word. In the first frame, words 1
//! and 2 hold the forward and reverse integration constants.

use super::record::ByteOrder;

const FRAME_LEN: usize = 64;
const WORDS_PER_FRAME: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Steim1,
    Steim2,
}

/// Decode Steim-1 compressed frames into `num_samples` integers
pub(crate) fn decode_steim1(
    data: &[u8],
    num_samples: usize,
    order: ByteOrder,
) -> Result<Vec<i32>, String> {
    decode_frames(data, num_samples, order, Flavor::Steim1)
}

/// Decode Steim-2 compressed frames into `num_samples` integers
pub(crate) fn decode_steim2(
    data: &[u8],
    num_samples: usize,
    order: ByteOrder,
) -> Result<Vec<i32>, String> {
    decode_frames(data, num_samples, order, Flavor::Steim2)
}

fn decode_frames(
    data: &[u8],
    num_samples: usize,
    order: ByteOrder,
    flavor: Flavor,
) -> Result<Vec<i32>, String> {
    if num_samples == 0 {
        return Ok(Vec::new());
    }

    let mut diffs: Vec<i32> = Vec::with_capacity(num_samples);
    let mut x0: Option<i32> = None;

    'frames: for (frame_index, frame) in data.chunks_exact(FRAME_LEN).enumerate() {
        let word = |i: usize| order.u32_at(frame, i * 4).unwrap_or(0);
        let nibbles = word(0);

        let first_data_word = if frame_index == 0 {
            x0 = Some(word(1) as i32);
            3
        } else {
            1
        };

        for w in first_data_word..WORDS_PER_FRAME {
            let code = (nibbles >> (30 - 2 * w as u32)) & 0b11;
            let value = word(w);
            match (flavor, code) {
                (_, 0) => {}
                (_, 1) => unpack(value, 8, 4, &mut diffs),
                (Flavor::Steim1, 2) => unpack(value, 16, 2, &mut diffs),
                (Flavor::Steim1, _) => diffs.push(value as i32),
                (Flavor::Steim2, 2) => match value >> 30 {
                    1 => unpack(value, 30, 1, &mut diffs),
                    2 => unpack(value, 15, 2, &mut diffs),
                    3 => unpack(value, 10, 3, &mut diffs),
                    _ => {
                        return Err(format!(
                            "invalid Steim-2 sub-code 0 in frame {frame_index}, word {w}"
                        ))
                    }
                },
                (Flavor::Steim2, _) => match value >> 30 {
                    0 => unpack(value, 6, 5, &mut diffs),
                    1 => unpack(value, 5, 6, &mut diffs),
                    2 => unpack(value, 4, 7, &mut diffs),
                    _ => {
                        return Err(format!(
                            "invalid Steim-2 sub-code 3 in frame {frame_index}, word {w}"
                        ))
                    }
                },
            }
            if diffs.len() >= num_samples {
                break 'frames;
            }
        }
    }

    let x0 = x0.ok_or_else(|| "no Steim frames in record".to_string())?;
    integrate(x0, &diffs, num_samples)
}

/// Split the low `bits * count` bits of `word` into `count` signed values,
/// most significant first
fn unpack(word: u32, bits: u32, count: u32, out: &mut Vec<i32>) {
    let mask = (1u32 << bits) - 1;
    for k in 0..count {
        let shift = (count - 1 - k) * bits;
        out.push(sign_extend((word >> shift) & mask, bits));
    }
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// First sample is the integration constant; the first difference refers
/// to the previous record and is ignored.
fn integrate(x0: i32, diffs: &[i32], num_samples: usize) -> Result<Vec<i32>, String> {
    if diffs.len() < num_samples {
        return Err(format!(
            "expected {} samples, frames hold {}",
            num_samples,
            diffs.len()
        ));
    }

    let mut samples = Vec::with_capacity(num_samples);
    samples.push(x0);
    for diff in &diffs[1..num_samples] {
        let previous = samples[samples.len() - 1];
        samples.push(previous.wrapping_add(*diff));
    }
    Ok(samples)
}
