//! CLI entry point for harvest
//!
//! Parses command line arguments, runs one batch and prints its summary as
//! JSON on stdout. Logs go to stderr.

use clap::{Parser, Subcommand};
use harvest::{parse_identifiers, Pipeline, Stage};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// harvest - download audio and normalize it into tagged MP3 files
#[derive(Parser, Debug)]
#[command(name = "harvest")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file; defaults are used when it does not exist
    #[arg(short, long, default_value = "harvest.toml", global = true)]
    config: PathBuf,

    /// Skip the tool availability checks
    #[arg(long, default_value = "false", global = true)]
    skip_checks: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download audio for each identifier into the download folder
    ///
    /// Identifiers come from the arguments and --file; with neither, they are
    /// read from stdin, one per line.
    Download {
        /// Media URLs or identifiers
        urls: Vec<String>,

        /// File with one identifier per line
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Normalize every audio file in the input folder into the output folder
    Convert {
        /// Input folder (defaults to paths.input_folder)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output folder (defaults to paths.output_folder)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    ShowConfig,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("harvest=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Gather identifiers from arguments and an optional file, falling back to stdin.
fn read_identifiers(urls: &[String], file: Option<&Path>) -> std::io::Result<Vec<String>> {
    let mut identifiers: Vec<String> = urls
        .iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty())
        .map(String::from)
        .collect();

    if let Some(path) = file {
        identifiers.extend(parse_identifiers(&std::fs::read_to_string(path)?));
    }

    if urls.is_empty() && file.is_none() {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        identifiers.extend(parse_identifiers(&text));
    }

    Ok(identifiers)
}

fn print_json<T: Serialize>(value: &T) -> bool {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            true
        }
        Err(e) => {
            error!(error = %e, "could not render summary");
            false
        }
    }
}

fn check_stage(pipeline: &Pipeline, stage: Stage, skip: bool) -> bool {
    if skip {
        warn!("skipping startup checks (--skip-checks enabled)");
        return true;
    }
    match pipeline.check(stage) {
        Ok(()) => true,
        Err(e) => {
            error!(error = %e, "startup check failed");
            false
        }
    }
}

/// An empty batch never runs the extractor, so it needs no check.
fn check_download(pipeline: &Pipeline, identifiers: &[String], skip: bool) -> bool {
    if identifiers.is_empty() {
        warn!("no identifiers given");
        return true;
    }
    check_stage(pipeline, Stage::Acquire, skip)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging();

    let pipeline = match Pipeline::load(&args.config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!(error = %e, "failed to initialize");
            return ExitCode::FAILURE;
        }
    };

    match args.command {
        Command::Download { urls, file } => {
            let identifiers = match read_identifiers(&urls, file.as_deref()) {
                Ok(ids) => ids,
                Err(e) => {
                    error!(error = %e, "could not read identifiers");
                    return ExitCode::FAILURE;
                }
            };
            if !check_download(&pipeline, &identifiers, args.skip_checks) {
                return ExitCode::FAILURE;
            }

            let plan = pipeline.acquisition_plan();
            info!(
                items = identifiers.len(),
                workers = plan.max_workers,
                retries = plan.max_retries,
                folder = %plan.download_folder.display(),
                "downloading"
            );

            let batch = pipeline.acquire(identifiers).await;
            if !print_json(&batch) || batch.summary.failed > 0 {
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }

        Command::Convert { input, output } => {
            if !check_stage(&pipeline, Stage::Convert, args.skip_checks) {
                return ExitCode::FAILURE;
            }

            let summary = match pipeline.convert(input, output).await {
                Ok(summary) => summary,
                Err(e) => {
                    error!(error = %e, "conversion batch failed");
                    return ExitCode::FAILURE;
                }
            };
            if !print_json(&summary) || !summary.errors.is_empty() {
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }

        Command::ShowConfig => match pipeline.config.to_toml_string() {
            Ok(toml) => {
                print!("{}", toml);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "could not render configuration");
                ExitCode::FAILURE
            }
        },
    }
}
