#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the tourist safety toolchain.
//!
//! `tourist_safety generate` builds a synthetic training dataset and
//! `tourist_safety area` evaluates live area risk for one coordinate.
//! Without a subcommand an interactive menu is shown.
//!
//! Uses `indicatif-log-bridge` (via [`tourist_safety_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod area;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use dialoguer::{Input, Select};
use tourist_safety_cli_utils::{IndicatifProgress, MultiProgress};
use tourist_safety_generate::{GenerateConfig, output_dir};

#[derive(Parser)]
#[command(
    name = "tourist_safety",
    about = "Tourist trajectory simulation and safety scoring toolchain"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic training dataset
    Generate {
        /// Number of subjects to simulate (overrides the config file)
        #[arg(long)]
        num_subjects: Option<usize>,

        /// Run seed (overrides the config file)
        #[arg(long)]
        seed: Option<u64>,

        /// TOML config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory to write the dataset into
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Print the live area risk of a coordinate as JSON
    Area {
        /// Latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        /// `GeoJSON` zone file (defaults to the embedded zones)
        #[arg(long)]
        zones: Option<PathBuf>,
    },
}

/// Interactive menu entries.
enum Tool {
    Generate,
    Area,
}

impl Tool {
    const ALL: &[Self] = &[Self::Generate, Self::Area];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Generate => "Generate training dataset",
            Self::Area => "Evaluate area risk",
        }
    }
}

fn generate(
    multi: &MultiProgress,
    num_subjects: Option<usize>,
    seed: Option<u64>,
    config_path: Option<&Path>,
    dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => GenerateConfig::load(path)?,
        None => GenerateConfig::default(),
    };
    if let Some(n) = num_subjects {
        config.num_subjects = n;
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }
    let dir = dir.unwrap_or_else(output_dir);

    let progress = IndicatifProgress::batch_bar(multi, "Generating subjects");
    let summary = tourist_safety_generate::run(&config, &dir, &progress)?;

    log::info!(
        "Train {} rows / {} subjects, val {} / {}, test {} / {}",
        summary.train_size,
        summary.train_subjects,
        summary.val_size,
        summary.val_subjects,
        summary.test_size,
        summary.test_subjects
    );
    Ok(())
}

fn interactive(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    println!("Tourist Safety Toolchain");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::Generate => {
            let progress = IndicatifProgress::batch_bar(multi, "Generating subjects");
            tourist_safety_generate::interactive::run_interactive(&progress)?;
        }
        Tool::Area => {
            let lat: f64 = Input::new().with_prompt("Latitude").interact_text()?;
            let lng: f64 = Input::new().with_prompt("Longitude").interact_text()?;
            area::run(lat, lng, None)?;
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = tourist_safety_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Generate {
            num_subjects,
            seed,
            config,
            output_dir,
        }) => generate(&multi, num_subjects, seed, config.as_deref(), output_dir)?,
        Some(Commands::Area { lat, lng, zones }) => area::run(lat, lng, zones.as_deref())?,
        None => interactive(&multi)?,
    }

    Ok(())
}
