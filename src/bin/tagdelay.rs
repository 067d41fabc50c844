//! tagdelay - delay start-pattern channels of a time-tag stream
//!
//! Usage:
//!   tagdelay -i run.dump -o shifted.dump -p 01:FE -d 54000
//!   tag_emulator -n 10000 | tagdelay -d 3000 | tagdump
//!   tagdelay --config delay.toml

use std::fs::File;

use clap::Parser;
use tagdelay::common::{DelayArgs, DelayError};
use tagdelay::config::DelayConfig;
use tagdelay::driver;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize tracing (logging); stdout may carry record data
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tagdelay=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    // -h prints usage and exits 0; unknown flags exit through clap
    let args = DelayArgs::parse();

    if let Err(e) = run(&args) {
        eprintln!("{}", e);
        error!(code = e.code(), "Delay filter aborted");
        std::process::exit(e.exit_status());
    }
    Ok(())
}

fn run(args: &DelayArgs) -> Result<(), DelayError> {
    let config = DelayConfig::from_args(args)?;
    let stats = driver::run(&config)?;
    stats.log();

    if let Some(path) = &args.stats_file {
        let file = File::create(path)?;
        driver::write_stats(&stats, file)?;
        info!(path = %path.display(), "Wrote run statistics");
    }
    Ok(())
}
