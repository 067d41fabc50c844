//! Coded error type for the delay filter
//!
//! # Design Principles (KISS)
//! - One enum for every fatal condition the filter can hit
//! - Each variant carries the numeric code the tool exits with
//! - Use thiserror for ergonomic error handling

use thiserror::Error;

/// Fatal filter errors
///
/// Every variant maps to a fixed code (see [`DelayError::code`]). The binary
/// prints the message and exits with the negated code.
#[derive(Error, Debug)]
pub enum DelayError {
    /// `-i` was given but could not be interpreted as a path
    #[error("error parsing input file name")]
    InputFileName,

    /// `-o` was given but could not be interpreted as a path
    #[error("error parsing output file name")]
    OutputFileName,

    /// Input file could not be opened
    #[error("cannot open input file {path}: {source}")]
    InputOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed or inconsistent `START:STOP` pattern
    #[error("error reading pattern: {0}")]
    Pattern(String),

    /// Output file could not be created
    #[error("error opening output file {path}: {source}")]
    OutputOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Ring buffer arrays could not be allocated
    #[error("cannot allocate ring buffer ({entries} entries)")]
    Allocation { entries: usize },

    /// Delay is not a positive integer
    #[error("delay (-d) needs a positive integer as argument, got {0:?}")]
    Delay(String),

    /// Decoded channel outside 1-8
    #[error("channel {channel} out of range (1-8) at record {record}")]
    ChannelRange { channel: u32, record: u64 },

    /// More matched events outstanding than the ring can hold
    #[error("ring buffer overflow: {capacity} delayed events outstanding without a trigger")]
    RingBufferOverflow { capacity: usize },

    /// `time + delay` does not fit in 64 bits
    #[error("time overflow applying delay {delay} to timestamp {time}")]
    TimeOverflow { time: u64, delay: u64 },

    /// Read or write failure while streaming
    #[error("I/O error while streaming: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file unreadable or invalid
    #[error("configuration file error: {0}")]
    Config(String),

    /// Batch size or ring order out of range
    #[error("invalid batch size or ring order: {0}")]
    Tuning(String),
}

impl DelayError {
    /// Numeric code of this error
    ///
    /// Codes 2-19 keep the numbering of the instrument's command-line tools;
    /// 21 and above cover checks those tools never made.
    pub fn code(&self) -> i32 {
        match self {
            Self::InputFileName => 2,
            Self::OutputFileName => 3,
            Self::InputOpen { .. } => 5,
            Self::Pattern(_) => 6,
            Self::OutputOpen { .. } => 7,
            Self::Allocation { .. } => 10,
            Self::Delay(_) => 19,
            Self::ChannelRange { .. } => 21,
            Self::RingBufferOverflow { .. } => 22,
            Self::TimeOverflow { .. } => 23,
            Self::Io(_) => 24,
            Self::Config(_) => 25,
            Self::Tuning(_) => 26,
        }
    }

    /// Process exit status for this error (negated code)
    pub fn exit_status(&self) -> i32 {
        -self.code()
    }

    /// Create a pattern error
    pub fn pattern(msg: impl Into<String>) -> Self {
        Self::Pattern(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a tuning error
    pub fn tuning(msg: impl Into<String>) -> Self {
        Self::Tuning(msg.into())
    }
}

/// Result type alias using DelayError
pub type DelayResult<T> = Result<T, DelayError>;
