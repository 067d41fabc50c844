//! tag_emulator - write a synthetic raw time-tag stream
//!
//! Usage:
//!   tag_emulator -n 100000 -c 1 -c 2 -o synthetic.dump
//!   tag_emulator --rate 0.5 --lifetime 3000 | tagdelay -d 5000 > shifted.dump

use std::fs::File;
use std::io::{self, BufWriter, Write};

use clap::Parser;
use tagdelay::common::EmulatorArgs;
use tagdelay::emulator::{EmulatorConfig, TagEmulator};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize tracing (logging); stdout may carry record data
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tagdelay=info".parse()?))
        .with_writer(std::io::stderr)
        .init();
    let args = EmulatorArgs::parse();

    let defaults = EmulatorConfig::default();
    let config = EmulatorConfig {
        trigger_channel: args.trigger_channel,
        period_ps: args.period_ps,
        click_channels: if args.channels.is_empty() {
            defaults.click_channels
        } else {
            args.channels.clone()
        },
        rate: args.rate,
        lifetime_ps: args.lifetime_ps,
        seed: args.seed,
    };
    let mut emulator = TagEmulator::new(config.clone())?;

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    let written = emulator.write_stream(args.periods, BufWriter::new(writer))?;

    info!(
        periods = args.periods,
        records = written,
        trigger_channel = config.trigger_channel,
        click_channels = ?config.click_channels,
        "Synthetic stream written"
    );
    Ok(())
}
