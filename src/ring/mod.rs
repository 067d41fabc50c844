//! Bounded FIFO of delayed events
//!
//! Two parallel arrays (times, channels) of power-of-two length, indexed by
//! monotonic write/read counters masked to the capacity. Entries leave in
//! insertion order; the ring never sorts by time.

use crate::common::{DelayError, DelayResult};

/// Default capacity exponent (2^20 entries)
pub const DEFAULT_RING_ORDER: u32 = 20;

/// Largest accepted capacity exponent
pub const MAX_RING_ORDER: u32 = 28;

/// One buffered event, time already delayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferedEvent {
    pub time: u64,
    pub channel: u32,
}

/// Fixed-capacity ring buffer of delayed events
#[derive(Debug)]
pub struct DelayRing {
    times: Vec<u64>,
    channels: Vec<u32>,
    mask: u64,
    write_index: u64,
    read_index: u64,
    high_water: usize,
}

impl DelayRing {
    /// Allocate a ring of `2^order` entries
    pub fn with_order(order: u32) -> DelayResult<Self> {
        if order > MAX_RING_ORDER {
            return Err(DelayError::tuning(format!(
                "ring order {} exceeds maximum {}",
                order, MAX_RING_ORDER
            )));
        }
        let capacity = 1usize << order;

        let mut times = Vec::new();
        let mut channels = Vec::new();
        times
            .try_reserve_exact(capacity)
            .map_err(|_| DelayError::Allocation { entries: capacity })?;
        channels
            .try_reserve_exact(capacity)
            .map_err(|_| DelayError::Allocation { entries: capacity })?;
        times.resize(capacity, 0);
        channels.resize(capacity, 0);

        Ok(Self {
            times,
            channels,
            mask: (capacity - 1) as u64,
            write_index: 0,
            read_index: 0,
            high_water: 0,
        })
    }

    /// Allocate a ring of the default capacity
    pub fn new() -> DelayResult<Self> {
        Self::with_order(DEFAULT_RING_ORDER)
    }

    pub fn capacity(&self) -> usize {
        self.times.len()
    }

    /// Number of outstanding entries
    #[inline]
    pub fn len(&self) -> usize {
        (self.write_index - self.read_index) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.read_index == self.write_index
    }

    /// Largest number of entries outstanding at any time
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Total entries ever enqueued
    pub fn total_enqueued(&self) -> u64 {
        self.write_index
    }

    /// Append an entry; fails without modifying the ring when full
    pub fn enqueue(&mut self, time: u64, channel: u32) -> DelayResult<()> {
        if self.len() >= self.capacity() {
            return Err(DelayError::RingBufferOverflow {
                capacity: self.capacity(),
            });
        }
        let slot = (self.write_index & self.mask) as usize;
        self.times[slot] = time;
        self.channels[slot] = channel;
        self.write_index += 1;
        self.high_water = self.high_water.max(self.len());
        Ok(())
    }

    /// Oldest outstanding entry
    #[inline]
    pub fn peek_oldest(&self) -> Option<BufferedEvent> {
        if self.is_empty() {
            return None;
        }
        let slot = (self.read_index & self.mask) as usize;
        Some(BufferedEvent {
            time: self.times[slot],
            channel: self.channels[slot],
        })
    }

    /// Remove and return the oldest outstanding entry
    #[inline]
    pub fn dequeue_oldest(&mut self) -> Option<BufferedEvent> {
        let event = self.peek_oldest()?;
        self.read_index += 1;
        Some(event)
    }
}
