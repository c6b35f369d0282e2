//! # gpx2csv
//!
//! Turns GPS track files into a CSV table for photo geotagging tools such as
//! exiftool's `-csv` import. The table goes to stdout, progress and
//! diagnostics to stderr.
//!
//! ```bash
//! gpx2csv morning.gpx afternoon.gpx > geotags.csv
//! ```

use std::fmt::Display;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::TimeZone;
use clap::Parser;
use log::info;

use gpx2csv::convert_files;
use gpx2csv::converter::{CsvEmitter, RowFormatter};
use gpx2csv::diagnostics::LogReporter;
use gpx2csv::options::{ConvertOptions, DEFAULT_SOURCE_EXTENSION, DEFAULT_SOURCE_PREFIX};

/// Convert GPX tracks to a geotagging CSV
#[derive(Parser)]
#[command(name = "gpx2csv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// GPX files, converted in the order given
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Prefix of the derived SourceFile path
    #[arg(long, default_value = DEFAULT_SOURCE_PREFIX)]
    prefix: String,

    /// Extension of the derived SourceFile path
    #[arg(long, default_value = DEFAULT_SOURCE_EXTENSION)]
    extension: String,

    /// Keep timestamps in UTC instead of the local timezone
    #[arg(long)]
    utc: bool,

    /// Exit with an error if any input file was skipped
    #[arg(long)]
    strict: bool,

    /// Verbosity level (-v for debug)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if cli.utc {
        run(&cli, chrono::Utc)
    } else {
        run(&cli, chrono::Local)
    }
}

fn run<Tz>(cli: &Cli, tz: Tz) -> Result<()>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let options = ConvertOptions {
        source_prefix: cli.prefix.clone(),
        source_extension: cli.extension.clone(),
    };
    let formatter = RowFormatter::new(tz, options);

    let mut emitter = CsvEmitter::new(io::stdout().lock(), formatter, LogReporter)
        .context("Failed to write CSV header")?;
    let summary = convert_files(&cli.files, &mut emitter).context("Failed to write CSV output")?;
    let (_stdout, _reporter) = emitter.finish().context("Failed to flush CSV output")?;

    info!(
        "{} rows from {} of {} files",
        summary.rows_written,
        summary.files_converted,
        cli.files.len()
    );

    if cli.strict && summary.files_skipped > 0 {
        bail!("{} of {} input files were skipped", summary.files_skipped, cli.files.len());
    }

    Ok(())
}
