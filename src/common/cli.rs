//! CLI argument parsing for the tagdelay tools
//!
//! # Design Principles (KISS)
//! - Use clap's derive macro for declarative argument definition
//! - Values that carry their own error codes (paths, pattern, delay) stay
//!   strings here and are validated in [`crate::config`]
//! - Each binary has its own Args struct

use std::path::PathBuf;

use clap::Parser;

/// Arguments for the delay filter
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "tagdelay")]
#[command(about = "Delay selected time-tagger channels and re-merge the stream in time order")]
#[command(version)]
pub struct DelayArgs {
    /// Input file (if not given read from stdin)
    #[arg(short = 'i', long = "input")]
    pub input: Option<String>,

    /// Output file (if not given write to stdout)
    #[arg(short = 'o', long = "output")]
    pub output: Option<String>,

    /// Start and stop pattern as hex channel masks, XX:YY (start is delayed)
    #[arg(short = 'p', long = "pattern")]
    pub pattern: Option<String>,

    /// Delay start-pattern channels by this many ps (positive integer)
    #[arg(short = 'd', long = "delay", allow_hyphen_values = true)]
    pub delay: Option<String>,

    /// Path to TOML configuration file
    #[arg(short = 'c', long = "config")]
    pub config_file: Option<String>,

    /// Records pulled per read call
    #[arg(long = "batch-size")]
    pub batch_size: Option<usize>,

    /// Ring buffer capacity exponent (capacity = 2^order)
    #[arg(long = "ring-order")]
    pub ring_order: Option<u32>,

    /// Emit records with channels outside 1-8 instead of aborting
    #[arg(long = "pass-invalid-channels")]
    pub pass_invalid_channels: bool,

    /// Write run statistics as JSON to this file
    #[arg(long = "stats")]
    pub stats_file: Option<PathBuf>,
}

/// Arguments for the synthetic stream generator
#[derive(Parser, Debug, Clone)]
#[command(name = "tag_emulator")]
#[command(about = "Write a synthetic raw time-tag stream")]
pub struct EmulatorArgs {
    /// Output file (if not given write to stdout)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Number of trigger periods to generate
    #[arg(short = 'n', long = "periods", default_value = "1000")]
    pub periods: u64,

    /// Trigger channel
    #[arg(short = 't', long = "trigger-channel", default_value = "5")]
    pub trigger_channel: u8,

    /// Trigger period in ps
    #[arg(long = "period", default_value = "12500")]
    pub period_ps: u64,

    /// Click channels (repeatable)
    #[arg(short = 'c', long = "channel", action = clap::ArgAction::Append)]
    pub channels: Vec<u8>,

    /// Mean click rate per channel, in clicks per trigger period
    #[arg(short = 'r', long = "rate", default_value = "0.2")]
    pub rate: f64,

    /// Mean click delay after its trigger in ps (exponential decay)
    #[arg(long = "lifetime", default_value = "2000.0")]
    pub lifetime_ps: f64,

    /// RNG seed
    #[arg(short = 's', long = "seed", default_value = "42")]
    pub seed: u64,
}

/// Arguments for the record dumper
#[derive(Parser, Debug, Clone)]
#[command(name = "tagdump")]
#[command(about = "Print time-tag records as text")]
pub struct DumpArgs {
    /// File to dump (stdin if not given)
    pub file: Option<PathBuf>,

    /// Treat input as raw time-tagger records instead of filter output
    #[arg(long)]
    pub raw: bool,

    /// Stop after this many records
    #[arg(short = 'n', long = "limit")]
    pub limit: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_args_default() {
        let args = DelayArgs::try_parse_from(["tagdelay"]).unwrap();
        assert_eq!(args.input, None);
        assert_eq!(args.output, None);
        assert_eq!(args.pattern, None);
        assert_eq!(args.delay, None);
        assert!(!args.pass_invalid_channels);
    }

    #[test]
    fn test_delay_args_short_flags() {
        let args = DelayArgs::try_parse_from([
            "tagdelay", "-i", "in.dump", "-o", "out.dump", "-p", "01:02", "-d", "54000",
        ])
        .unwrap();
        assert_eq!(args.input.as_deref(), Some("in.dump"));
        assert_eq!(args.output.as_deref(), Some("out.dump"));
        assert_eq!(args.pattern.as_deref(), Some("01:02"));
        assert_eq!(args.delay.as_deref(), Some("54000"));
    }

    #[test]
    fn test_delay_args_negative_delay_reaches_validation() {
        let args = DelayArgs::try_parse_from(["tagdelay", "-d", "-100"]).unwrap();
        assert_eq!(args.delay.as_deref(), Some("-100"));
    }

    #[test]
    fn test_delay_args_tuning() {
        let args = DelayArgs::try_parse_from([
            "tagdelay",
            "--batch-size",
            "1024",
            "--ring-order",
            "16",
            "--pass-invalid-channels",
            "--stats",
            "stats.json",
        ])
        .unwrap();
        assert_eq!(args.batch_size, Some(1024));
        assert_eq!(args.ring_order, Some(16));
        assert!(args.pass_invalid_channels);
        assert_eq!(args.stats_file, Some(PathBuf::from("stats.json")));
    }

    #[test]
    fn test_help_is_display_help() {
        let err = DelayArgs::try_parse_from(["tagdelay", "-h"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_emulator_args_defaults() {
        let args = EmulatorArgs::try_parse_from(["tag_emulator"]).unwrap();
        assert_eq!(args.periods, 1000);
        assert_eq!(args.trigger_channel, 5);
        assert!(args.channels.is_empty());
        assert_eq!(args.seed, 42);
    }

    #[test]
    fn test_emulator_args_multiple_channels() {
        let args =
            EmulatorArgs::try_parse_from(["tag_emulator", "-c", "1", "-c", "4", "-n", "10"]).unwrap();
        assert_eq!(args.channels, vec![1, 4]);
        assert_eq!(args.periods, 10);
    }

    #[test]
    fn test_dump_args() {
        let args = DumpArgs::try_parse_from(["tagdump", "--raw", "-n", "5", "x.dump"]).unwrap();
        assert!(args.raw);
        assert_eq!(args.limit, Some(5));
        assert_eq!(args.file, Some(PathBuf::from("x.dump")));
    }
}
