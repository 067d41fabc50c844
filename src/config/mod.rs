//! Run configuration for the delay filter
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! command-line flags.
//!
//! # Example
//! ```toml
//! [filter]
//! input = "C:/Data/run_3.dump"
//! output = "C:/Data/shifted.dump"
//! pattern = "01:FE"
//! delay_ps = 54000
//! batch_size = 8192
//! ring_order = 20
//! channel_policy = "reject"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::classifier::{ChannelPolicy, PatternSpec};
use crate::common::{DelayArgs, DelayError, DelayResult};
use crate::format::DEFAULT_BATCH_SIZE;
use crate::ring::{DEFAULT_RING_ORDER, MAX_RING_ORDER};

/// Default delay applied to start-pattern channels (ps)
pub const DEFAULT_DELAY_PS: u64 = 54_000;

/// Largest accepted batch size in records
pub const MAX_BATCH_SIZE: usize = 1 << 24;

/// TOML file layout
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DelayFileConfig {
    #[serde(default)]
    pub filter: FilterFileConfig,
}

/// `[filter]` table; every field optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterFileConfig {
    pub input: Option<String>,
    pub output: Option<String>,
    pub pattern: Option<String>,
    pub delay_ps: Option<i64>,
    pub batch_size: Option<usize>,
    pub ring_order: Option<u32>,
    pub channel_policy: Option<ChannelPolicy>,
}

impl DelayFileConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> DelayResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DelayError::config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn from_toml(content: &str) -> DelayResult<Self> {
        toml::from_str(content).map_err(|e| DelayError::config(e.to_string()))
    }
}

/// Fully resolved filter configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayConfig {
    /// Input path, `None` for stdin
    pub input: Option<PathBuf>,
    /// Output path, `None` for stdout
    pub output: Option<PathBuf>,
    pub pattern: PatternSpec,
    /// Offset added to start-pattern records (ps)
    pub delay_ps: u64,
    /// Records per read call
    pub batch_size: usize,
    /// Ring capacity exponent
    pub ring_order: u32,
    pub channel_policy: ChannelPolicy,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            pattern: PatternSpec::default(),
            delay_ps: DEFAULT_DELAY_PS,
            batch_size: DEFAULT_BATCH_SIZE,
            ring_order: DEFAULT_RING_ORDER,
            channel_policy: ChannelPolicy::Reject,
        }
    }
}

impl DelayConfig {
    /// Resolve configuration from parsed arguments (and the file they name)
    pub fn from_args(args: &DelayArgs) -> DelayResult<Self> {
        let file = match &args.config_file {
            Some(path) => DelayFileConfig::load(path)?,
            None => DelayFileConfig::default(),
        };
        let mut config = Self::default();
        config.apply_file(&file.filter)?;
        config.apply_args(args)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from the `[filter]` table
    pub fn apply_file(&mut self, file: &FilterFileConfig) -> DelayResult<()> {
        if let Some(input) = &file.input {
            self.input = parse_path(input, DelayError::InputFileName)?;
        }
        if let Some(output) = &file.output {
            self.output = parse_path(output, DelayError::OutputFileName)?;
        }
        if let Some(pattern) = &file.pattern {
            self.pattern = pattern.parse()?;
        }
        if let Some(delay) = file.delay_ps {
            self.delay_ps = u64::try_from(delay)
                .ok()
                .filter(|d| *d > 0)
                .ok_or_else(|| DelayError::Delay(delay.to_string()))?;
        }
        if let Some(batch_size) = file.batch_size {
            self.batch_size = batch_size;
        }
        if let Some(order) = file.ring_order {
            self.ring_order = order;
        }
        if let Some(policy) = file.channel_policy {
            self.channel_policy = policy;
        }
        Ok(())
    }

    /// Overlay values given on the command line
    pub fn apply_args(&mut self, args: &DelayArgs) -> DelayResult<()> {
        if let Some(input) = &args.input {
            self.input = parse_path(input, DelayError::InputFileName)?;
        }
        if let Some(output) = &args.output {
            self.output = parse_path(output, DelayError::OutputFileName)?;
        }
        if let Some(pattern) = &args.pattern {
            self.pattern = pattern.parse()?;
        }
        if let Some(delay) = &args.delay {
            self.delay_ps = parse_delay(delay)?;
        }
        if let Some(batch_size) = args.batch_size {
            self.batch_size = batch_size;
        }
        if let Some(order) = args.ring_order {
            self.ring_order = order;
        }
        if args.pass_invalid_channels {
            self.channel_policy = ChannelPolicy::PassThrough;
        }
        Ok(())
    }

    /// Check tuning values
    pub fn validate(&self) -> DelayResult<()> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(DelayError::tuning(format!(
                "batch size {} not in 1..={}",
                self.batch_size, MAX_BATCH_SIZE
            )));
        }
        if self.ring_order > MAX_RING_ORDER {
            return Err(DelayError::tuning(format!(
                "ring order {} not in 0..={}",
                self.ring_order, MAX_RING_ORDER
            )));
        }
        Ok(())
    }

    /// Ring buffer capacity in entries
    pub fn ring_capacity(&self) -> usize {
        1usize << self.ring_order
    }
}

/// Parse a file argument; `-` selects the standard stream
fn parse_path(text: &str, err: DelayError) -> DelayResult<Option<PathBuf>> {
    match text.trim() {
        "" => Err(err),
        "-" => Ok(None),
        path => Ok(Some(PathBuf::from(path))),
    }
}

/// Parse a positive integer delay in ps
pub fn parse_delay(text: &str) -> DelayResult<u64> {
    text.trim()
        .parse::<u64>()
        .ok()
        .filter(|d| *d > 0)
        .ok_or_else(|| DelayError::Delay(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(argv: &[&str]) -> DelayArgs {
        let mut full = vec!["tagdelay"];
        full.extend_from_slice(argv);
        DelayArgs::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = DelayConfig::from_args(&args(&[])).unwrap();
        assert_eq!(config.input, None);
        assert_eq!(config.output, None);
        assert_eq!(config.pattern.to_string(), "01:FE");
        assert_eq!(config.delay_ps, DEFAULT_DELAY_PS);
        assert_eq!(config.batch_size, 8192);
        assert_eq!(config.ring_capacity(), 1 << 20);
        assert_eq!(config.channel_policy, ChannelPolicy::Reject);
    }

    #[test]
    fn test_cli_values() {
        let config = DelayConfig::from_args(&args(&[
            "-i", "in.dump", "-o", "-", "-p", "02:01", "-d", "1200",
        ]))
        .unwrap();
        assert_eq!(config.input, Some(PathBuf::from("in.dump")));
        assert_eq!(config.output, None);
        assert_eq!(config.pattern.start.bits(), 0x02);
        assert_eq!(config.delay_ps, 1200);
    }

    #[test]
    fn test_delay_must_be_positive_integer() {
        for bad in ["0", "-5", "12.5", "abc", ""] {
            let err = DelayConfig::from_args(&args(&["-d", bad])).unwrap_err();
            assert_eq!(err.code(), 19, "delay {:?}", bad);
        }
    }

    #[test]
    fn test_empty_paths_rejected() {
        let err = DelayConfig::from_args(&args(&["-i", ""])).unwrap_err();
        assert_eq!(err.code(), 2);
        let err = DelayConfig::from_args(&args(&["-o", " "])).unwrap_err();
        assert_eq!(err.code(), 3);
    }

    #[test]
    fn test_bad_pattern_code() {
        let err = DelayConfig::from_args(&args(&["-p", "xyz"])).unwrap_err();
        assert_eq!(err.code(), 6);
    }

    #[test]
    fn test_file_config_parse() {
        let file = DelayFileConfig::from_toml(
            r#"
            [filter]
            input = "run.dump"
            pattern = "03:04"
            delay_ps = 250
            ring_order = 12
            channel_policy = "pass_through"
            "#,
        )
        .unwrap();
        let mut config = DelayConfig::default();
        config.apply_file(&file.filter).unwrap();
        assert_eq!(config.input, Some(PathBuf::from("run.dump")));
        assert_eq!(config.pattern.start.channels(), vec![1, 2]);
        assert_eq!(config.delay_ps, 250);
        assert_eq!(config.ring_order, 12);
        assert_eq!(config.channel_policy, ChannelPolicy::PassThrough);
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = DelayFileConfig::from_toml(
            r#"
            [filter]
            delay_ps = 250
            output = "from_file.dump"
            "#,
        )
        .unwrap();
        let mut config = DelayConfig::default();
        config.apply_file(&file.filter).unwrap();
        config.apply_args(&args(&["-d", "999"])).unwrap();
        assert_eq!(config.delay_ps, 999);
        assert_eq!(config.output, Some(PathBuf::from("from_file.dump")));
    }

    #[test]
    fn test_file_negative_delay_rejected() {
        let file = DelayFileConfig::from_toml("[filter]\ndelay_ps = -3\n").unwrap();
        let err = DelayConfig::default().apply_file(&file.filter).unwrap_err();
        assert_eq!(err.code(), 19);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = DelayFileConfig::from_toml("[filter\n").unwrap_err();
        assert_eq!(err.code(), 25);
        let err = DelayFileConfig::from_toml("[filter]\nchannel_policy = \"maybe\"\n").unwrap_err();
        assert_eq!(err.code(), 25);
    }

    #[test]
    fn test_missing_config_file() {
        let err = DelayConfig::from_args(&args(&["-c", "/nonexistent/tagdelay.toml"])).unwrap_err();
        assert_eq!(err.code(), 25);
    }

    #[test]
    fn test_tuning_limits() {
        let err = DelayConfig::from_args(&args(&["--batch-size", "0"])).unwrap_err();
        assert_eq!(err.code(), 26);
        let err = DelayConfig::from_args(&args(&["--ring-order", "40"])).unwrap_err();
        assert_eq!(err.code(), 26);
    }
}
