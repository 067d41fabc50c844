//! Channel pattern classification
//!
//! Each channel `c` (1..8) owns one bit of an 8-bit pattern, `1 << (c - 1)`.
//! A record is delayed when its bit is set in the start (delay) mask.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::common::DelayError;
use crate::format::RawRecord;

/// Highest valid channel number
pub const MAX_CHANNEL: u32 = 8;

/// 8-bit channel mask (never empty)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMask(u8);

impl ChannelMask {
    /// Mask from raw bits; `None` for an empty mask
    pub fn from_bits(bits: u8) -> Option<Self> {
        (bits != 0).then_some(Self(bits))
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Complement of this mask, `None` when it covers all channels
    pub fn complement(&self) -> Option<Self> {
        Self::from_bits(!self.0)
    }

    /// Whether `pattern` shares a bit with this mask
    #[inline]
    pub fn matches(&self, pattern: u8) -> bool {
        pattern & self.0 != 0
    }

    /// Channels selected by this mask, ascending
    pub fn channels(&self) -> Vec<u32> {
        (1..=MAX_CHANNEL).filter(|c| self.0 & (1 << (c - 1)) != 0).collect()
    }
}

impl fmt::Display for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.0)
    }
}

/// Bit pattern of a channel, `None` outside 1..8
#[inline]
pub fn pattern_of(channel: u32) -> Option<u8> {
    if (1..=MAX_CHANNEL).contains(&channel) {
        Some(1u8 << (channel - 1))
    } else {
        None
    }
}

/// Start (delayed) and stop channel masks, written `XX:YY` in hex
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternSpec {
    /// Channels to delay
    pub start: ChannelMask,
    /// Channels counted as stop events
    pub stop: ChannelMask,
}

impl PatternSpec {
    pub fn new(start: ChannelMask, stop: ChannelMask) -> Result<Self, DelayError> {
        if start.bits() & stop.bits() != 0 {
            return Err(DelayError::pattern(format!(
                "start {} and stop {} masks overlap",
                start, stop
            )));
        }
        Ok(Self { start, stop })
    }
}

impl Default for PatternSpec {
    fn default() -> Self {
        Self {
            start: ChannelMask(0x01),
            stop: ChannelMask(0xFE),
        }
    }
}

impl fmt::Display for PatternSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.stop)
    }
}

fn parse_mask(text: &str) -> Result<ChannelMask, DelayError> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(DelayError::pattern(format!("empty mask in {:?}", text)));
    }
    let bits = u8::from_str_radix(digits, 16)
        .map_err(|_| DelayError::pattern(format!("{:?} is not an 8-bit hex mask", text)))?;
    ChannelMask::from_bits(bits)
        .ok_or_else(|| DelayError::pattern(format!("mask {:?} selects no channel", text)))
}

impl FromStr for PatternSpec {
    type Err = DelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((start, stop)) => Self::new(parse_mask(start)?, parse_mask(stop)?),
            None => {
                let start = parse_mask(s)?;
                let stop = start.complement().ok_or_else(|| {
                    DelayError::pattern("start mask covers every channel, give a stop mask")
                })?;
                Self::new(start, stop)
            }
        }
    }
}

/// What to do with records whose channel is outside 1..8
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelPolicy {
    /// Abort the run
    #[default]
    Reject,
    /// Emit the record live, never delayed
    PassThrough,
}

/// Routing decision for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// Matched the start mask: buffer with delay
    Delayed,
    /// Not matched: flush older buffered events, then emit
    Live,
    /// Invalid channel let through by [`ChannelPolicy::PassThrough`]
    PassedThrough,
}

/// Decoded and classified record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub overflow: u32,
    pub channel: u32,
    pub time: u64,
    pub kind: TagKind,
    /// Channel is in the stop mask
    pub stop: bool,
}

/// Channel outside 1..8 under [`ChannelPolicy::Reject`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidChannel(pub u32);

/// Pure classifier over a fixed pattern and policy
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    pattern: PatternSpec,
    policy: ChannelPolicy,
}

impl Classifier {
    pub fn new(pattern: PatternSpec, policy: ChannelPolicy) -> Self {
        Self { pattern, policy }
    }

    pub fn pattern(&self) -> PatternSpec {
        self.pattern
    }

    pub fn classify(&self, record: &RawRecord) -> Result<Classified, InvalidChannel> {
        let overflow = record.overflow();
        let channel = record.channel();
        let time = record.time();

        let Some(pattern) = pattern_of(channel) else {
            return match self.policy {
                ChannelPolicy::Reject => Err(InvalidChannel(channel)),
                ChannelPolicy::PassThrough => Ok(Classified {
                    overflow,
                    channel,
                    time,
                    kind: TagKind::PassedThrough,
                    stop: false,
                }),
            };
        };

        let kind = if self.pattern.start.matches(pattern) {
            TagKind::Delayed
        } else {
            TagKind::Live
        };

        Ok(Classified {
            overflow,
            channel,
            time,
            kind,
            stop: self.pattern.stop.matches(pattern),
        })
    }
}
