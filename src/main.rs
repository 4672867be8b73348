//! acl-walker - Parallel Directory Walker with ACL Extraction
//!
//! Entry point for the CLI application.

use acl_walker::progress::{print_summary, ProgressReporter};
use acl_walker::{enumerate, enumerate_paths, CliArgs, EnumerateOptions};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{BufWriter, Write};
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    setup_logging(args.verbose)?;

    let options = EnumerateOptions::from_args(&args).context("Invalid configuration")?;

    // Ctrl-C winds the walk down cooperatively; entries already in flight
    // are still delivered before end-of-stream
    let cancel = options.cancellation.clone();
    ctrlc::set_handler(move || cancel.cancel()).context("Failed to install signal handler")?;

    let start = Instant::now();
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if args.paths_only {
        let paths = enumerate_paths(&args.root, options)?;
        for path in paths {
            writeln!(out, "{}", path)?;
        }
        out.flush()?;
        return Ok(());
    }

    let stream = enumerate(&args.root, options)?;

    // Progress display polls the walk counters from a side thread
    let reporter = if !args.quiet {
        let monitor = stream.monitor();
        let reporter = std::sync::Arc::new(ProgressReporter::new());
        let display = std::sync::Arc::clone(&reporter);
        thread::spawn(move || {
            while !monitor.is_finished() {
                display.update(&monitor.progress());
                thread::sleep(Duration::from_millis(100));
            }
        });
        Some(reporter)
    } else {
        None
    };

    let mut printed = 0u64;
    let stats = {
        let mut stream = stream;
        for entry in &mut stream {
            writeln!(out, "{}", entry.render_line())?;
            printed += 1;
        }
        stream.stats()
    };
    out.flush()?;

    if let Some(reporter) = reporter {
        reporter.finish();
    }

    tracing::info!(printed, "Output complete");
    print_summary(&stats, start.elapsed());

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("acl_walker={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
