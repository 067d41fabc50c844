//! Wire formats for time-tag streams
//!
//! Input records come straight from the time tagger; output records are the
//! layout the downstream analysis tools read.
//!
//! ```text
//! Input record (16 bytes, little endian)
//! ┌──────────────────────────────┬──────────────────────────────┐
//! │ upper: u64                   │ lower: u64                   │
//! │  bits 56-63 overflow/epoch   │  timestamp                   │
//! │  bits 32-39 channel (1..8)   │                              │
//! └──────────────────────────────┴──────────────────────────────┘
//!
//! Output record (16 bytes, little endian)
//! ┌──────────────┬──────────────┬──────────────────────────────┐
//! │ overflow u32 │ channel u32  │ time u64                     │
//! └──────────────┴──────────────┴──────────────────────────────┘
//! ```

pub mod io;

pub use io::{RecordReader, RecordWriter};

/// Size of one input record in bytes
pub const RAW_RECORD_SIZE: usize = 16;

/// Size of one output record in bytes
pub const OUTPUT_RECORD_SIZE: usize = 16;

/// Default number of records pulled per read call
pub const DEFAULT_BATCH_SIZE: usize = 8192;

mod constants {
    pub const OVERFLOW_SHIFT: u32 = 56;
    pub const CHANNEL_SHIFT: u32 = 32;
    pub const CHANNEL_MASK: u64 = 0xFF;
}

/// Raw record as produced by the time tagger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawRecord {
    /// Most significant word: overflow and channel fields
    pub upper: u64,
    /// Least significant word: timestamp
    pub lower: u64,
}

impl RawRecord {
    /// Build a record from its fields
    ///
    /// Only the low 8 bits of `overflow` and `channel` are representable.
    pub fn new(overflow: u8, channel: u8, time: u64) -> Self {
        Self {
            upper: ((overflow as u64) << constants::OVERFLOW_SHIFT)
                | ((channel as u64) << constants::CHANNEL_SHIFT),
            lower: time,
        }
    }

    /// Decode a record from its 16-byte wire form
    pub fn from_bytes(data: &[u8; RAW_RECORD_SIZE]) -> Self {
        let mut upper = [0u8; 8];
        let mut lower = [0u8; 8];
        upper.copy_from_slice(&data[0..8]);
        lower.copy_from_slice(&data[8..16]);
        Self {
            upper: u64::from_le_bytes(upper),
            lower: u64::from_le_bytes(lower),
        }
    }

    /// Encode the record to its 16-byte wire form
    pub fn to_bytes(&self) -> [u8; RAW_RECORD_SIZE] {
        let mut buf = [0u8; RAW_RECORD_SIZE];
        buf[0..8].copy_from_slice(&self.upper.to_le_bytes());
        buf[8..16].copy_from_slice(&self.lower.to_le_bytes());
        buf
    }

    /// Overflow/epoch counter (top byte of `upper`)
    #[inline]
    pub fn overflow(&self) -> u32 {
        (self.upper >> constants::OVERFLOW_SHIFT) as u32
    }

    /// Channel field (bits 32-39 of `upper`), not validated
    #[inline]
    pub fn channel(&self) -> u32 {
        ((self.upper >> constants::CHANNEL_SHIFT) & constants::CHANNEL_MASK) as u32
    }

    /// Timestamp
    #[inline]
    pub fn time(&self) -> u64 {
        self.lower
    }
}

/// Record as written to the output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputRecord {
    /// Overflow/epoch marker (0 for replayed events)
    pub overflow: u32,
    /// Channel (1-based)
    pub channel: u32,
    /// Timestamp, delayed for replayed events
    pub time: u64,
}

impl OutputRecord {
    pub fn new(overflow: u32, channel: u32, time: u64) -> Self {
        Self {
            overflow,
            channel,
            time,
        }
    }

    /// Record replayed from the delay buffer
    pub fn replayed(channel: u32, time: u64) -> Self {
        Self::new(0, channel, time)
    }

    /// Serialize to the fixed 16-byte layout
    pub fn to_bytes(&self) -> [u8; OUTPUT_RECORD_SIZE] {
        let mut buf = [0u8; OUTPUT_RECORD_SIZE];
        buf[0..4].copy_from_slice(&self.overflow.to_le_bytes());
        buf[4..8].copy_from_slice(&self.channel.to_le_bytes());
        buf[8..16].copy_from_slice(&self.time.to_le_bytes());
        buf
    }

    /// Deserialize from the fixed 16-byte layout
    pub fn from_bytes(data: &[u8; OUTPUT_RECORD_SIZE]) -> Self {
        Self {
            overflow: u32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            channel: u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
            time: u64::from_le_bytes([
                data[8], data[9], data[10], data[11], data[12], data[13], data[14], data[15],
            ]),
        }
    }
}

impl std::fmt::Display for OutputRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:>10} {:>3} {:>20}", self.overflow, self.channel, self.time)
    }
}
