//! cinema-augment: add a value histogram to every image's metadata in a
//! Cinema database.
//!
//! Reads `<root>/image/info.json`, visits every parameter combination,
//! and writes `variables.histogram` into the metadata document next to
//! each image. Other metadata fields are preserved.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin cinema-augment -- [OPTIONS] [ROOT]
//! ```
//!
//! Logging goes to stderr and honors `RUST_LOG`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use cinema_io::{Database, Driver, ErrorPolicy, RunOptions};
use cinema_pipeline::{HistogramConfig, Normalization};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Histogram augmentation for Cinema image databases.
///
/// Decodes every 24-bit value image in the database, reduces it to a
/// normalized histogram, and merges the result into the image's JSON
/// metadata document.
#[derive(Parser)]
#[command(name = "cinema-augment", version)]
struct Cli {
    /// Database root (the directory containing `image/info.json`).
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Number of histogram buckets over [0, 1].
    #[arg(long, default_value_t = HistogramConfig::DEFAULT_BUCKET_COUNT, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    bucket_count: usize,

    /// Normalize by valid pixels only instead of all pixels.
    #[arg(long)]
    valid_only: bool,

    /// Skip images that fail and continue with the rest.
    #[arg(long)]
    keep_going: bool,

    /// Worker threads (1 processes images in order).
    #[arg(short, long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    jobs: usize,

    /// List image and metadata paths without reading or writing anything.
    #[arg(long)]
    dry_run: bool,

    /// Print the run report (or dry-run plan) as JSON.
    #[arg(long)]
    json: bool,

    /// Log per-image detail.
    #[arg(short, long)]
    verbose: bool,
}

/// Build [`RunOptions`] from CLI arguments.
fn options_from_cli(cli: &Cli) -> RunOptions {
    RunOptions {
        histogram: HistogramConfig {
            bucket_count: cli.bucket_count,
            normalization: if cli.valid_only {
                Normalization::ValidPixels
            } else {
                Normalization::TotalPixels
            },
        },
        policy: if cli.keep_going {
            ErrorPolicy::Tolerant
        } else {
            ErrorPolicy::FailFast
        },
        jobs: cli.jobs,
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let database = match Database::open(&cli.root) {
        Ok(database) => database,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.dry_run {
        return print_plan(&database, cli.json);
    }

    let options = options_from_cli(&cli);
    tracing::debug!(?options, "run options");

    let report = match Driver::new(&database, options).run() {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing report: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", report.report());
    }

    if report.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Print every combination's image and metadata path.
fn print_plan(database: &Database, json: bool) -> ExitCode {
    let descriptor = database.descriptor();

    if json {
        let plan: Vec<serde_json::Value> = database
            .plan()
            .map(|(combination, paths)| {
                serde_json::json!({
                    "combination": descriptor.describe(&combination),
                    "image_path": paths.image_path,
                    "metadata_path": paths.metadata_path,
                })
            })
            .collect();
        match serde_json::to_string_pretty(&plan) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing plan: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        for (combination, paths) in database.plan() {
            println!(
                "[{}] {} -> {}",
                descriptor.describe(&combination),
                paths.image_path.display(),
                paths.metadata_path.display(),
            );
        }
        eprintln!("{} combinations", descriptor.combination_count());
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["cinema-augment"]).unwrap();
        assert_eq!(cli.root, PathBuf::from("."));
        assert_eq!(options_from_cli(&cli), RunOptions::default());
    }

    #[test]
    fn flags_map_to_options() {
        let cli = Cli::try_parse_from([
            "cinema-augment",
            "/data/db",
            "--bucket-count",
            "16",
            "--valid-only",
            "--keep-going",
            "-j",
            "4",
        ])
        .unwrap();
        let options = options_from_cli(&cli);
        assert_eq!(cli.root, PathBuf::from("/data/db"));
        assert_eq!(options.histogram.bucket_count, 16);
        assert_eq!(options.histogram.normalization, Normalization::ValidPixels);
        assert_eq!(options.policy, ErrorPolicy::Tolerant);
        assert_eq!(options.jobs, 4);
    }

    #[test]
    fn zero_buckets_and_jobs_are_rejected() {
        assert!(Cli::try_parse_from(["cinema-augment", "--bucket-count", "0"]).is_err());
        assert!(Cli::try_parse_from(["cinema-augment", "--jobs", "0"]).is_err());
    }
}
