//! miniSEED v2 record decoding and encoding.
//!
//! Each record is a 48-byte fixed header, a chain of blockettes, and a data
//! section. Blockette 1000 is required: it carries the encoding, the data
//! word order, and the record length. Blockette 100 (exact sample rate) and
//! blockette 1001 (microsecond offset) are honored when present.
//!
//! Supported encodings: INT16, INT32, FLOAT32, FLOAT64, Steim1, Steim2.
//!
//! ```text
//!  0      6  7  8      13   15    18   20          30     32      34     36
//!  | seq  |Q |  | STA  | LOC | CHA | NET | BTIME     | nsamp | factor | mult | ...
//!  39: blockette count   40: time correction   44: data offset   46: first blockette
//! ```

use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use seisgram_core::{StreamId, WaveformChunk, add_seconds};
use thiserror::Error;

const FIXED_HEADER_LEN: usize = 48;
const STEIM_FRAME_LEN: usize = 64;
const MAX_BLOCKETTES: usize = 32;

/// Record length exponent written by [`encode_chunk`] (4096 bytes).
const ENCODE_RECORD_EXP: u8 = 12;
/// Data offset written by [`encode_chunk`]; leaves room for blockettes 1000 and 100.
const ENCODE_DATA_OFFSET: usize = 128;

/// miniSEED decoding failure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MseedError {
    /// Fewer bytes than the record or field requires.
    #[error("record at byte {offset} is truncated: needs {needed} bytes, {available} available")]
    Truncated {
        /// Record start offset in the buffer.
        offset: usize,
        /// Bytes required.
        needed: usize,
        /// Bytes present.
        available: usize,
    },

    /// Neither byte order yields a plausible start year.
    #[error("record at byte {offset} has no valid start time")]
    InvalidTime {
        /// Record start offset in the buffer.
        offset: usize,
    },

    /// The record carries no blockette 1000.
    #[error("record at byte {offset} has no blockette 1000")]
    MissingBlockette1000 {
        /// Record start offset in the buffer.
        offset: usize,
    },

    /// Record length exponent outside 7..=20.
    #[error("invalid record length exponent {0}")]
    InvalidRecordLength(u8),

    /// Encoding code not supported.
    #[error("unsupported data encoding {0}")]
    UnsupportedEncoding(u8),

    /// A Steim frame contains an invalid control code.
    #[error("invalid Steim{version} control code in frame {frame}")]
    InvalidSteimCode {
        /// 1 or 2.
        version: u8,
        /// Frame index inside the record.
        frame: usize,
    },

    /// The data section decodes to fewer samples than the header announces.
    #[error("expected {expected} samples, decoded {decoded}")]
    SampleCount {
        /// Samples announced in the header.
        expected: usize,
        /// Samples recovered.
        decoded: usize,
    },
}

/// Sample encoding of a record's data section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// 16-bit integers.
    Int16,
    /// 32-bit integers.
    Int32,
    /// IEEE single precision.
    Float32,
    /// IEEE double precision.
    Float64,
    /// Steim1 first-difference compression.
    Steim1,
    /// Steim2 first-difference compression.
    Steim2,
}

impl Encoding {
    /// Parse a SEED encoding code.
    pub fn from_code(code: u8) -> Result<Self, MseedError> {
        match code {
            1 => Ok(Self::Int16),
            3 => Ok(Self::Int32),
            4 => Ok(Self::Float32),
            5 => Ok(Self::Float64),
            10 => Ok(Self::Steim1),
            11 => Ok(Self::Steim2),
            other => Err(MseedError::UnsupportedEncoding(other)),
        }
    }

    /// SEED encoding code.
    pub fn code(self) -> u8 {
        match self {
            Self::Int16 => 1,
            Self::Int32 => 3,
            Self::Float32 => 4,
            Self::Float64 => 5,
            Self::Steim1 => 10,
            Self::Steim2 => 11,
        }
    }
}

/// One decoded record.
#[derive(Debug, Clone, PartialEq)]
pub struct MseedRecord {
    /// Concrete stream identity.
    pub stream: StreamId,
    /// Instant of the first sample.
    pub start: DateTime<Utc>,
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Encoding the samples were stored with.
    pub encoding: Encoding,
    /// Decoded samples.
    pub samples: Vec<f64>,
}

impl MseedRecord {
    /// Instant just past the last sample.
    pub fn end(&self) -> DateTime<Utc> {
        if self.sample_rate > 0.0 {
            add_seconds(self.start, self.samples.len() as f64 / self.sample_rate)
        } else {
            self.start
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    fn u16(self, b: &[u8], at: usize) -> u16 {
        let bytes = [b[at], b[at + 1]];
        match self {
            Self::Big => u16::from_be_bytes(bytes),
            Self::Little => u16::from_le_bytes(bytes),
        }
    }

    fn i16(self, b: &[u8], at: usize) -> i16 {
        self.u16(b, at) as i16
    }

    fn u32(self, b: &[u8], at: usize) -> u32 {
        let bytes = [b[at], b[at + 1], b[at + 2], b[at + 3]];
        match self {
            Self::Big => u32::from_be_bytes(bytes),
            Self::Little => u32::from_le_bytes(bytes),
        }
    }

    fn i32(self, b: &[u8], at: usize) -> i32 {
        self.u32(b, at) as i32
    }

    fn f32(self, b: &[u8], at: usize) -> f32 {
        f32::from_bits(self.u32(b, at))
    }

    fn f64(self, b: &[u8], at: usize) -> f64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&b[at..at + 8]);
        match self {
            Self::Big => f64::from_be_bytes(bytes),
            Self::Little => f64::from_le_bytes(bytes),
        }
    }
}

/// Decode every record in a buffer.
///
/// Trailing zero padding is ignored. Records without samples (for example
/// log or timing records) are returned with an empty sample vector.
pub fn decode_records(bytes: &[u8]) -> Result<Vec<MseedRecord>, MseedError> {
    let mut records = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let rest = &bytes[offset..];
        if rest.iter().all(|&b| b == 0) {
            break;
        }
        let (record, len) = decode_record(rest).map_err(|e| rebase(e, offset))?;
        records.push(record);
        offset += len;
    }

    Ok(records)
}

fn rebase(err: MseedError, base: usize) -> MseedError {
    match err {
        MseedError::Truncated {
            offset,
            needed,
            available,
        } => MseedError::Truncated {
            offset: offset + base,
            needed,
            available,
        },
        MseedError::InvalidTime { offset } => MseedError::InvalidTime {
            offset: offset + base,
        },
        MseedError::MissingBlockette1000 { offset } => MseedError::MissingBlockette1000 {
            offset: offset + base,
        },
        other => other,
    }
}

/// Decode the record at the start of `buf`, returning it and its length in bytes.
pub fn decode_record(buf: &[u8]) -> Result<(MseedRecord, usize), MseedError> {
    if buf.len() < FIXED_HEADER_LEN {
        return Err(MseedError::Truncated {
            offset: 0,
            needed: FIXED_HEADER_LEN,
            available: buf.len(),
        });
    }

    let order = header_order(buf).ok_or(MseedError::InvalidTime { offset: 0 })?;
    let stream = StreamId::new(
        ascii_field(&buf[18..20]),
        ascii_field(&buf[8..13]),
        ascii_field(&buf[13..15]),
        ascii_field(&buf[15..18]),
    );

    let mut start = btime(buf, order).ok_or(MseedError::InvalidTime { offset: 0 })?;
    let num_samples = order.u16(buf, 30) as usize;
    let rate_factor = order.i16(buf, 32);
    let rate_multiplier = order.i16(buf, 34);
    let activity_flags = buf[36];
    let num_blockettes = buf[39] as usize;
    let time_correction = order.i32(buf, 40);
    let data_offset = order.u16(buf, 44) as usize;
    let first_blockette = order.u16(buf, 46) as usize;

    let mut b1000 = None;
    let mut b100_rate = None;
    let mut next = first_blockette;
    for _ in 0..num_blockettes.min(MAX_BLOCKETTES) {
        if next == 0 || next + 4 > buf.len() {
            break;
        }
        let kind = order.u16(buf, next);
        let following = order.u16(buf, next + 2) as usize;
        match kind {
            1000 if next + 8 <= buf.len() => {
                b1000 = Some((buf[next + 4], buf[next + 5], buf[next + 6]));
            }
            100 if next + 8 <= buf.len() => {
                b100_rate = Some(f64::from(order.f32(buf, next + 4)));
            }
            1001 if next + 6 <= buf.len() => {
                start += Duration::microseconds(i64::from(buf[next + 5] as i8));
            }
            _ => {}
        }
        if following <= next {
            break;
        }
        next = following;
    }

    let (encoding_code, word_order, exponent) =
        b1000.ok_or(MseedError::MissingBlockette1000 { offset: 0 })?;
    if !(7..=20).contains(&exponent) {
        return Err(MseedError::InvalidRecordLength(exponent));
    }
    let record_len = 1usize << exponent;
    if buf.len() < record_len {
        return Err(MseedError::Truncated {
            offset: 0,
            needed: record_len,
            available: buf.len(),
        });
    }
    if data_offset > record_len || (num_samples > 0 && data_offset < FIXED_HEADER_LEN) {
        return Err(MseedError::Truncated {
            offset: 0,
            needed: data_offset,
            available: record_len,
        });
    }

    // Bit 1 of the activity flags: correction already applied to BTIME.
    if activity_flags & 0x02 == 0 && time_correction != 0 {
        start += Duration::microseconds(i64::from(time_correction) * 100);
    }

    let sample_rate = match b100_rate {
        Some(rate) if rate > 0.0 => rate,
        _ => nominal_rate(rate_factor, rate_multiplier),
    };

    let encoding = Encoding::from_code(encoding_code)?;
    let data_order = if word_order == 0 {
        ByteOrder::Little
    } else {
        ByteOrder::Big
    };
    let samples = if num_samples == 0 {
        Vec::new()
    } else {
        decode_samples(&buf[data_offset..record_len], encoding, data_order, num_samples)?
    };

    Ok((
        MseedRecord {
            stream,
            start,
            sample_rate,
            encoding,
            samples,
        },
        record_len,
    ))
}

fn header_order(buf: &[u8]) -> Option<ByteOrder> {
    [ByteOrder::Big, ByteOrder::Little]
        .into_iter()
        .find(|order| (1900..=2100).contains(&order.u16(buf, 20)))
}

fn ascii_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

fn btime(buf: &[u8], order: ByteOrder) -> Option<DateTime<Utc>> {
    let year = i32::from(order.u16(buf, 20));
    let day_of_year = u32::from(order.u16(buf, 22));
    let (hour, minute, second) = (buf[24], buf[25], buf[26]);
    let ticks = i64::from(order.u16(buf, 28));

    // Leap seconds are folded into the following minute.
    let leap = i64::from(second.saturating_sub(59));
    let naive = NaiveDate::from_yo_opt(year, day_of_year)?.and_hms_opt(
        u32::from(hour),
        u32::from(minute),
        u32::from(second.min(59)),
    )?;
    Some(naive.and_utc() + Duration::seconds(leap) + Duration::microseconds(ticks * 100))
}

/// Sample rate from the SEED factor/multiplier pair.
fn nominal_rate(factor: i16, multiplier: i16) -> f64 {
    let f = f64::from(factor);
    let m = f64::from(multiplier);
    match (factor.signum(), multiplier.signum()) {
        (0, _) | (_, 0) => 0.0,
        (1, 1) => f * m,
        (1, _) => -f / m,
        (_, 1) => -m / f,
        _ => 1.0 / (f * m),
    }
}

fn decode_samples(
    data: &[u8],
    encoding: Encoding,
    order: ByteOrder,
    num_samples: usize,
) -> Result<Vec<f64>, MseedError> {
    let fixed_width = |width: usize| -> Result<(), MseedError> {
        let needed = width * num_samples;
        if needed > data.len() {
            Err(MseedError::Truncated {
                offset: 0,
                needed,
                available: data.len(),
            })
        } else {
            Ok(())
        }
    };

    match encoding {
        Encoding::Int16 => {
            fixed_width(2)?;
            Ok((0..num_samples)
                .map(|i| f64::from(order.i16(data, i * 2)))
                .collect())
        }
        Encoding::Int32 => {
            fixed_width(4)?;
            Ok((0..num_samples)
                .map(|i| f64::from(order.i32(data, i * 4)))
                .collect())
        }
        Encoding::Float32 => {
            fixed_width(4)?;
            Ok((0..num_samples)
                .map(|i| f64::from(order.f32(data, i * 4)))
                .collect())
        }
        Encoding::Float64 => {
            fixed_width(8)?;
            Ok((0..num_samples).map(|i| order.f64(data, i * 8)).collect())
        }
        Encoding::Steim1 => decode_steim(data, order, num_samples, 1),
        Encoding::Steim2 => decode_steim(data, order, num_samples, 2),
    }
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// Unpack `count` fields of `bits` width, most significant first.
fn unpack(word: u32, bits: u32, count: u32, out: &mut Vec<i32>) {
    let mask = (1u32 << bits) - 1;
    for k in (0..count).rev() {
        out.push(sign_extend((word >> (k * bits)) & mask, bits));
    }
}

fn decode_steim(
    data: &[u8],
    order: ByteOrder,
    num_samples: usize,
    version: u8,
) -> Result<Vec<f64>, MseedError> {
    let mut diffs: Vec<i32> = Vec::with_capacity(num_samples + 7);
    let mut first = None;
    let mut last = None;

    for (frame_idx, frame) in data.chunks_exact(STEIM_FRAME_LEN).enumerate() {
        let controls = order.u32(frame, 0);
        for word_idx in 1..16 {
            let word = order.u32(frame, word_idx * 4);
            if frame_idx == 0 && word_idx == 1 {
                first = Some(word as i32);
                continue;
            }
            if frame_idx == 0 && word_idx == 2 {
                last = Some(word as i32);
                continue;
            }

            let code = (controls >> (30 - 2 * word_idx)) & 0b11;
            let invalid = MseedError::InvalidSteimCode {
                version,
                frame: frame_idx,
            };
            match (version, code) {
                (_, 0) => {}
                (_, 1) => unpack(word, 8, 4, &mut diffs),
                (1, 2) => unpack(word, 16, 2, &mut diffs),
                (1, 3) => diffs.push(word as i32),
                (2, 2) => match word >> 30 {
                    1 => unpack(word, 30, 1, &mut diffs),
                    2 => unpack(word, 15, 2, &mut diffs),
                    3 => unpack(word, 10, 3, &mut diffs),
                    _ => return Err(invalid),
                },
                (2, 3) => match word >> 30 {
                    0 => unpack(word, 6, 5, &mut diffs),
                    1 => unpack(word, 5, 6, &mut diffs),
                    2 => unpack(word, 4, 7, &mut diffs),
                    _ => return Err(invalid),
                },
                _ => return Err(invalid),
            }
        }
        if diffs.len() >= num_samples {
            break;
        }
    }

    let Some(first) = first else {
        return Err(MseedError::SampleCount {
            expected: num_samples,
            decoded: 0,
        });
    };
    if diffs.len() < num_samples {
        return Err(MseedError::SampleCount {
            expected: num_samples,
            decoded: diffs.len(),
        });
    }

    // The first difference refers to the previous record and is ignored.
    let mut samples = Vec::with_capacity(num_samples);
    let mut current = i64::from(first);
    samples.push(current as f64);
    for &d in &diffs[1..num_samples] {
        current += i64::from(d);
        samples.push(current as f64);
    }

    if let Some(last) = last {
        if current != i64::from(last) {
            tracing::warn!(
                expected = last,
                decoded = current,
                "Steim reverse integration constant mismatch"
            );
        }
    }

    Ok(samples)
}

/// SEED factor/multiplier approximating a rate; blockette 100 carries the exact value.
fn rate_factors(rate: f64) -> (i16, i16) {
    if (1.0..=f64::from(i16::MAX)).contains(&rate) {
        (rate.round() as i16, 1)
    } else if rate > 0.0 && rate < 1.0 {
        (-((1.0 / rate).round().min(f64::from(i16::MAX)) as i16), 1)
    } else {
        (0, 0)
    }
}

fn put_code(record: &mut [u8], at: usize, width: usize, code: &str) {
    let field = &mut record[at..at + width];
    field.fill(b' ');
    for (slot, byte) in field.iter_mut().zip(code.bytes()) {
        *slot = if byte == b'*' || byte == b'?' { b' ' } else { byte };
    }
}

/// Encode a chunk as big-endian FLOAT64 records of 4096 bytes.
///
/// Every record carries blockette 1000 and blockette 100 so the exact rate
/// survives. Start times are stored at the format's 100 µs resolution.
pub fn encode_chunk(chunk: &WaveformChunk) -> Vec<u8> {
    let record_len = 1usize << ENCODE_RECORD_EXP;
    let per_record = (record_len - ENCODE_DATA_OFFSET) / 8;
    let (factor, multiplier) = rate_factors(chunk.sample_rate);
    let mut out = Vec::with_capacity(chunk.len().div_ceil(per_record) * record_len);

    for (index, samples) in chunk.samples.chunks(per_record).enumerate() {
        let start = add_seconds(
            chunk.start,
            (index * per_record) as f64 / chunk.sample_rate,
        );
        let mut record = vec![0u8; record_len];

        let sequence = format!("{:06}", (index + 1) % 1_000_000);
        record[0..6].copy_from_slice(sequence.as_bytes());
        record[6] = b'D';
        record[7] = b' ';
        put_code(&mut record, 8, 5, &chunk.stream.station);
        put_code(&mut record, 13, 2, &chunk.stream.location);
        put_code(&mut record, 15, 3, &chunk.stream.channel);
        put_code(&mut record, 18, 2, &chunk.stream.network);

        record[20..22].copy_from_slice(&(start.year() as u16).to_be_bytes());
        record[22..24].copy_from_slice(&(start.ordinal() as u16).to_be_bytes());
        record[24] = start.hour() as u8;
        record[25] = start.minute() as u8;
        record[26] = start.second() as u8;
        let ticks = (start.nanosecond() % 1_000_000_000) / 100_000;
        record[28..30].copy_from_slice(&(ticks as u16).to_be_bytes());

        record[30..32].copy_from_slice(&(samples.len() as u16).to_be_bytes());
        record[32..34].copy_from_slice(&factor.to_be_bytes());
        record[34..36].copy_from_slice(&multiplier.to_be_bytes());
        record[39] = 2;
        record[44..46].copy_from_slice(&(ENCODE_DATA_OFFSET as u16).to_be_bytes());
        record[46..48].copy_from_slice(&(FIXED_HEADER_LEN as u16).to_be_bytes());

        // Blockette 1000
        record[48..50].copy_from_slice(&1000u16.to_be_bytes());
        record[50..52].copy_from_slice(&56u16.to_be_bytes());
        record[52] = Encoding::Float64.code();
        record[53] = 1;
        record[54] = ENCODE_RECORD_EXP;

        // Blockette 100
        record[56..58].copy_from_slice(&100u16.to_be_bytes());
        record[60..64].copy_from_slice(&(chunk.sample_rate as f32).to_be_bytes());

        for (i, &sample) in samples.iter().enumerate() {
            let at = ENCODE_DATA_OFFSET + i * 8;
            record[at..at + 8].copy_from_slice(&sample.to_be_bytes());
        }

        out.extend_from_slice(&record);
    }

    out
}
