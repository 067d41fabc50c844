//! tagdump - print time-tag records as text
//!
//! Usage:
//!   tagdump shifted.dump            # filter output: overflow channel time
//!   tagdump --raw run.dump -n 20    # raw time-tagger records

use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Read, Write};

use clap::Parser;
use tagdelay::common::DumpArgs;
use tagdelay::format::{OutputRecord, RecordReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize tracing (logging); stdout may carry record data
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tagdelay=info".parse()?))
        .with_writer(std::io::stderr)
        .init();
    let args = DumpArgs::parse();

    let input: Box<dyn Read> = match &args.file {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(io::stdin().lock()),
    };
    let mut out = BufWriter::new(io::stdout().lock());

    match dump(input, &mut out, &args) {
        // downstream `head` closed the pipe
        Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
        result => result.map_err(Into::into),
    }
}

fn dump<R: Read, W: Write>(input: R, out: &mut W, args: &DumpArgs) -> io::Result<()> {
    let limit = args.limit.unwrap_or(u64::MAX);
    let mut printed = 0u64;

    // Both layouts are 16 bytes, so the raw reader frames either
    let mut reader = RecordReader::new(input);
    let mut batch = Vec::new();

    writeln!(out, "{:>10} {:>3} {:>20}", "overflow", "ch", "time")?;

    'outer: while reader.next_batch(&mut batch)? > 0 {
        for record in &batch {
            if printed >= limit {
                break 'outer;
            }
            if args.raw {
                writeln!(
                    out,
                    "{:>10} {:>3} {:>20}",
                    record.overflow(),
                    record.channel(),
                    record.time()
                )?;
            } else {
                let output = OutputRecord::from_bytes(&record.to_bytes());
                writeln!(out, "{}", output)?;
            }
            printed += 1;
        }
    }

    if reader.trailing_bytes() > 0 {
        warn!(bytes = reader.trailing_bytes(), "Ignored incomplete final record");
    }
    out.flush()
}
