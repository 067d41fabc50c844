//! Delay/re-merge engine
//!
//! Matched records are buffered with the delay applied. Every live record
//! first flushes all buffered events whose delayed time is not later than
//! its own (buffered events win ties), then is emitted itself. At end of
//! stream the remaining buffer is drained in FIFO order.
//!
//! The output is time ordered as long as the input is time ordered and no
//! two live records straddle a buffered event's delayed time; the engine
//! does not sort buffered events among themselves.

use std::io::{self, Write};

use serde::Serialize;
use tracing::debug;

use crate::classifier::{Classified, Classifier, InvalidChannel, TagKind};
use crate::common::{DelayError, DelayResult};
use crate::format::{OutputRecord, RawRecord, RecordWriter};
use crate::ring::DelayRing;

/// Destination for output records
pub trait RecordSink {
    fn emit(&mut self, record: OutputRecord) -> io::Result<()>;
}

impl<W: Write> RecordSink for RecordWriter<W> {
    #[inline]
    fn emit(&mut self, record: OutputRecord) -> io::Result<()> {
        self.write_record(&record)
    }
}

impl RecordSink for Vec<OutputRecord> {
    fn emit(&mut self, record: OutputRecord) -> io::Result<()> {
        self.push(record);
        Ok(())
    }
}

/// Per-run record counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeCounters {
    /// Records pushed into the engine
    pub records_in: u64,
    /// Records emitted (live + replayed + drained)
    pub records_out: u64,
    /// Records buffered for delay
    pub delayed: u64,
    /// Records emitted directly
    pub live: u64,
    /// Buffered events flushed by a later live record
    pub replayed: u64,
    /// Buffered events drained at end of stream
    pub drained: u64,
    /// Records on stop-mask channels
    pub stop_events: u64,
    /// Records with invalid channels let through
    pub passed_through: u64,
}

/// Delay/re-merge engine over one stream
pub struct DelayMerger {
    classifier: Classifier,
    ring: DelayRing,
    delay: u64,
    counters: MergeCounters,
}

impl DelayMerger {
    pub fn new(classifier: Classifier, ring: DelayRing, delay: u64) -> Self {
        Self {
            classifier,
            ring,
            delay,
            counters: MergeCounters::default(),
        }
    }

    pub fn delay(&self) -> u64 {
        self.delay
    }

    pub fn counters(&self) -> MergeCounters {
        self.counters
    }

    /// Read-only view of the delay buffer
    pub fn ring(&self) -> &DelayRing {
        &self.ring
    }

    /// Process one input record
    pub fn push<S: RecordSink>(&mut self, record: &RawRecord, sink: &mut S) -> DelayResult<()> {
        let tag = self
            .classifier
            .classify(record)
            .map_err(|InvalidChannel(channel)| DelayError::ChannelRange {
                channel,
                record: self.counters.records_in,
            })?;
        self.counters.records_in += 1;
        if tag.stop {
            self.counters.stop_events += 1;
        }

        match tag.kind {
            TagKind::Delayed => self.buffer(&tag),
            TagKind::Live => self.emit_live(&tag, sink),
            TagKind::PassedThrough => {
                self.counters.passed_through += 1;
                self.emit_live(&tag, sink)
            }
        }
    }

    /// Process a batch of input records in order
    pub fn push_batch<S: RecordSink>(
        &mut self,
        records: &[RawRecord],
        sink: &mut S,
    ) -> DelayResult<()> {
        for record in records {
            self.push(record, sink)?;
        }
        Ok(())
    }

    /// Drain every buffered event in FIFO order, regardless of time
    pub fn finish<S: RecordSink>(&mut self, sink: &mut S) -> DelayResult<()> {
        let outstanding = self.ring.len();
        while let Some(event) = self.ring.dequeue_oldest() {
            sink.emit(OutputRecord::replayed(event.channel, event.time))?;
            self.counters.drained += 1;
            self.counters.records_out += 1;
        }
        debug!(drained = outstanding, "Drained delay buffer at end of stream");
        Ok(())
    }

    fn buffer(&mut self, tag: &Classified) -> DelayResult<()> {
        let delayed = tag
            .time
            .checked_add(self.delay)
            .ok_or(DelayError::TimeOverflow {
                time: tag.time,
                delay: self.delay,
            })?;
        self.ring.enqueue(delayed, tag.channel)?;
        self.counters.delayed += 1;
        Ok(())
    }

    fn emit_live<S: RecordSink>(&mut self, tag: &Classified, sink: &mut S) -> DelayResult<()> {
        while let Some(oldest) = self.ring.peek_oldest() {
            if tag.time < oldest.time {
                break;
            }
            self.ring.dequeue_oldest();
            sink.emit(OutputRecord::replayed(oldest.channel, oldest.time))?;
            self.counters.replayed += 1;
            self.counters.records_out += 1;
        }

        sink.emit(OutputRecord::new(tag.overflow, tag.channel, tag.time))?;
        self.counters.live += 1;
        self.counters.records_out += 1;
        Ok(())
    }
}
