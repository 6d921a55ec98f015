use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use osu_loader::{LoadOptions, LoadReport};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod simulate;
mod source;

#[derive(Debug, Parser)]
#[command(name = "osu")]
#[command(about = "osu!mania beatmap loader CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load a beatmap set and write it as JSON
    Inspect {
        /// Beatmap directory or .osu file
        input: PathBuf,
        /// Output path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Parse difficulties in parallel
        #[arg(long)]
        parallel: bool,
        /// Read only the header sections (no timing points, hit objects or playfield)
        #[arg(long)]
        meta_only: bool,
    },
    /// Print the event timeline of one difficulty
    Simulate {
        input: PathBuf,
        /// Index of the difficulty in the loaded set
        #[arg(short, long, default_value_t = 0)]
        difficulty: usize,
        /// Maximum number of rows to print
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("osu_loader=warn,osu_cli=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Inspect {
            input,
            output,
            parallel,
            meta_only,
        } => {
            let report = load(&input, &LoadOptions { parallel, meta_only })?;
            let json = serde_json::to_string_pretty(&report.beatmap)
                .context("failed to serialize beatmap")?;
            match output {
                Some(out_path) => {
                    fs::write(&out_path, json)
                        .with_context(|| format!("failed to write: {}", out_path.display()))?;
                    info!("wrote {}", out_path.display());
                }
                None => println!("{json}"),
            }
        }
        Command::Simulate {
            input,
            difficulty,
            limit,
        } => {
            let report = load(&input, &LoadOptions::default())?;
            let count = report.beatmap.difficulties.len();
            let d = report
                .beatmap
                .difficulties
                .get(difficulty)
                .with_context(|| format!("difficulty index {difficulty} out of range (set has {count})"))?;
            simulate::run_simulation(d, limit)?;
        }
    }

    Ok(())
}

fn load(input: &Path, options: &LoadOptions) -> anyhow::Result<LoadReport> {
    let files = source::read_chart_files(input)
        .with_context(|| format!("load failed: {}", input.display()))?;
    let report = osu_loader::load_beatmapset_with_options(files, options)
        .map_err(|e| anyhow::anyhow!(e.to_string()))
        .with_context(|| format!("load failed: {}", input.display()))?;

    for rejected in &report.rejected {
        warn!("skipped difficulty: {rejected}");
    }
    Ok(report)
}
