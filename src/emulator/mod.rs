//! Synthetic time-tag stream generator
//!
//! Produces a time-ordered raw stream: one trigger per period on the trigger
//! channel, followed by Poisson-distributed clicks on each click channel
//! whose delay after the trigger decays exponentially. Useful for exercising
//! the filter without an instrument attached.

use std::io::{self, Write};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp, Poisson};
use thiserror::Error;

use crate::classifier::MAX_CHANNEL;
use crate::format::RawRecord;

/// Emulator errors
#[derive(Error, Debug)]
pub enum EmulatorError {
    #[error("invalid emulator setting: {0}")]
    InvalidSetting(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Emulator configuration
#[derive(Debug, Clone)]
pub struct EmulatorConfig {
    /// Trigger channel (1-8)
    pub trigger_channel: u8,
    /// Trigger period in ps
    pub period_ps: u64,
    /// Click channels (1-8)
    pub click_channels: Vec<u8>,
    /// Mean clicks per channel per period
    pub rate: f64,
    /// Mean click delay after the trigger in ps
    pub lifetime_ps: f64,
    pub seed: u64,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            trigger_channel: 5,
            period_ps: 12_500, // 80 MHz laser
            click_channels: vec![1, 2, 3, 4],
            rate: 0.2,
            lifetime_ps: 2_000.0,
            seed: 42,
        }
    }
}

impl EmulatorConfig {
    pub fn validate(&self) -> Result<(), EmulatorError> {
        let valid = |c: u8| (1..=MAX_CHANNEL).contains(&(c as u32));
        if !valid(self.trigger_channel) {
            return Err(EmulatorError::InvalidSetting(format!(
                "trigger channel {} not in 1-8",
                self.trigger_channel
            )));
        }
        if let Some(c) = self.click_channels.iter().find(|c| !valid(**c)) {
            return Err(EmulatorError::InvalidSetting(format!(
                "click channel {} not in 1-8",
                c
            )));
        }
        if self.click_channels.contains(&self.trigger_channel) {
            return Err(EmulatorError::InvalidSetting(
                "trigger channel is also a click channel".to_string(),
            ));
        }
        if self.period_ps < 2 {
            return Err(EmulatorError::InvalidSetting("period must be >= 2 ps".to_string()));
        }
        if !(self.rate.is_finite() && self.rate >= 0.0) {
            return Err(EmulatorError::InvalidSetting(format!("rate {}", self.rate)));
        }
        if !(self.lifetime_ps.is_finite() && self.lifetime_ps > 0.0) {
            return Err(EmulatorError::InvalidSetting(format!(
                "lifetime {}",
                self.lifetime_ps
            )));
        }
        Ok(())
    }
}

/// Seeded generator of raw records, one trigger period at a time
pub struct TagEmulator {
    config: EmulatorConfig,
    rng: StdRng,
    clicks: Option<Poisson<f64>>,
    decay: Exp<f64>,
    period_index: u64,
}

impl TagEmulator {
    pub fn new(config: EmulatorConfig) -> Result<Self, EmulatorError> {
        config.validate()?;
        let clicks = if config.rate > 0.0 {
            Some(
                Poisson::new(config.rate)
                    .map_err(|e| EmulatorError::InvalidSetting(e.to_string()))?,
            )
        } else {
            None
        };
        let decay = Exp::new(1.0 / config.lifetime_ps)
            .map_err(|e| EmulatorError::InvalidSetting(e.to_string()))?;
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            clicks,
            decay,
            period_index: 0,
        })
    }

    /// Periods generated so far
    pub fn periods(&self) -> u64 {
        self.period_index
    }

    /// Append the records of the next trigger period to `out`, time ordered
    pub fn next_period(&mut self, out: &mut Vec<RawRecord>) {
        let start = self.period_index * self.config.period_ps;
        let first = out.len();
        out.push(RawRecord::new(0, self.config.trigger_channel, start));

        if let Some(clicks) = &self.clicks {
            for &channel in &self.config.click_channels {
                let n = clicks.sample(&mut self.rng) as u64;
                for _ in 0..n {
                    let delay = self.decay.sample(&mut self.rng) as u64;
                    // clicks stay inside their own period
                    let offset = delay.min(self.config.period_ps - 1).max(1);
                    out.push(RawRecord::new(0, channel, start + offset));
                }
            }
        }

        out[first..].sort_by_key(|r| r.time());
        self.period_index += 1;
    }

    /// Write `periods` trigger periods to `writer`; returns records written
    pub fn write_stream<W: Write>(&mut self, periods: u64, mut writer: W) -> io::Result<u64> {
        let mut batch = Vec::new();
        let mut written = 0u64;
        for _ in 0..periods {
            batch.clear();
            self.next_period(&mut batch);
            for record in &batch {
                writer.write_all(&record.to_bytes())?;
            }
            written += batch.len() as u64;
        }
        writer.flush()?;
        Ok(written)
    }
}
