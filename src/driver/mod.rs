//! Stream driver: owns the handles and pumps batches through the merger

use std::fs::File;
use std::io::{self, Read, Write};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classifier::Classifier;
use crate::common::{DelayError, DelayResult};
use crate::config::DelayConfig;
use crate::format::{RecordReader, RecordWriter};
use crate::merger::{DelayMerger, MergeCounters};
use crate::ring::DelayRing;

/// Summary of one filter run
#[derive(Debug, Clone, Serialize)]
pub struct FilterStats {
    #[serde(flatten)]
    pub counters: MergeCounters,
    /// Batches read from the input
    pub batches: u64,
    /// Ring buffer capacity in entries
    pub ring_capacity: usize,
    /// Largest number of delayed events outstanding at once
    pub ring_high_water: usize,
    /// Bytes of an incomplete final record that were dropped
    pub trailing_bytes: usize,
    pub pattern: String,
    pub delay_ps: u64,
    pub elapsed_secs: f64,
}

impl FilterStats {
    /// Input throughput in records per second
    pub fn record_rate(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.counters.records_in as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }

    /// Emit the run summary through tracing
    pub fn log(&self) {
        let c = &self.counters;
        info!(
            records_in = c.records_in,
            records_out = c.records_out,
            delayed = c.delayed,
            live = c.live,
            replayed = c.replayed,
            drained = c.drained,
            stop_events = c.stop_events,
            "Delay filter finished"
        );
        info!(
            high_water = self.ring_high_water,
            capacity = self.ring_capacity,
            batches = self.batches,
            elapsed_secs = self.elapsed_secs,
            records_per_sec = self.record_rate().round(),
            "Ring usage"
        );
        if c.passed_through > 0 {
            warn!(
                count = c.passed_through,
                "Records with channels outside 1-8 were passed through"
            );
        }
        if self.ring_high_water * 10 >= self.ring_capacity * 9 {
            warn!(
                high_water = self.ring_high_water,
                capacity = self.ring_capacity,
                "Delay buffer came within 10% of its capacity"
            );
        }
    }
}

/// Open the configured input and output and filter the whole stream
///
/// Missing paths select stdin / stdout. Both handles are closed when this
/// returns, on success and on every error path.
pub fn run(config: &DelayConfig) -> DelayResult<FilterStats> {
    let input: Box<dyn Read> = match &config.input {
        Some(path) => Box::new(File::open(path).map_err(|source| DelayError::InputOpen {
            path: path.display().to_string(),
            source,
        })?),
        None => Box::new(io::stdin().lock()),
    };

    let output: Box<dyn Write> = match &config.output {
        Some(path) => Box::new(File::create(path).map_err(|source| DelayError::OutputOpen {
            path: path.display().to_string(),
            source,
        })?),
        None => Box::new(io::stdout().lock()),
    };

    info!(
        input = %config.input.as_ref().map_or("<stdin>".into(), |p| p.display().to_string()),
        output = %config.output.as_ref().map_or("<stdout>".into(), |p| p.display().to_string()),
        pattern = %config.pattern,
        delay_ps = config.delay_ps,
        "Starting delay filter"
    );

    filter_stream(input, output, config)
}

/// Filter records from `input` to `output` until end of stream
pub fn filter_stream<R: Read, W: Write>(
    input: R,
    output: W,
    config: &DelayConfig,
) -> DelayResult<FilterStats> {
    let started = Instant::now();

    let ring = DelayRing::with_order(config.ring_order)?;
    let ring_capacity = ring.capacity();
    debug!(capacity = ring_capacity, "Allocated delay ring");

    let classifier = Classifier::new(config.pattern, config.channel_policy);
    let mut merger = DelayMerger::new(classifier, ring, config.delay_ps);
    let mut reader = RecordReader::with_batch_size(input, config.batch_size);
    let mut writer = RecordWriter::new(output);

    let mut batch = Vec::with_capacity(reader.batch_size());
    let mut batches = 0u64;
    while reader.next_batch(&mut batch)? > 0 {
        merger.push_batch(&batch, &mut writer)?;
        batches += 1;
    }

    merger.finish(&mut writer)?;
    writer.finish()?.flush()?;

    Ok(FilterStats {
        counters: merger.counters(),
        batches,
        ring_capacity,
        ring_high_water: merger.ring().high_water(),
        trailing_bytes: reader.trailing_bytes(),
        pattern: config.pattern.to_string(),
        delay_ps: config.delay_ps,
        elapsed_secs: started.elapsed().as_secs_f64(),
    })
}

/// Write run statistics as pretty JSON
pub fn write_stats<W: Write>(stats: &FilterStats, mut writer: W) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, stats)?;
    writeln!(writer)
}
