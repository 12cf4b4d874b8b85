//! Interactive menu for dataset generation.
//!
//! Prompts for the handful of settings people usually change, using
//! `dialoguer`, so a dataset can be produced without memorizing flags.

use std::path::PathBuf;
use std::sync::Arc;

use dialoguer::{Confirm, Input};

use crate::config::GenerateConfig;
use crate::progress::ProgressCallback;
use crate::{output_dir, run};

/// Runs the interactive generation prompts.
///
/// # Errors
///
/// Returns an error if user input, config loading, or generation fails.
pub fn run_interactive(
    progress: &Arc<dyn ProgressCallback>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config_path: String = Input::new()
        .with_prompt("Config file (leave empty for defaults)")
        .allow_empty(true)
        .interact_text()?;

    let mut config = if config_path.trim().is_empty() {
        GenerateConfig::default()
    } else {
        GenerateConfig::load(&PathBuf::from(config_path.trim()))?
    };

    config.num_subjects = Input::new()
        .with_prompt("Number of subjects")
        .default(config.num_subjects)
        .interact_text()?;

    config.seed = Input::new()
        .with_prompt("Seed")
        .default(config.seed)
        .interact_text()?;

    config.simulation.inject_anomalies = Confirm::new()
        .with_prompt("Inject anomalies?")
        .default(config.simulation.inject_anomalies)
        .interact()?;

    let dir_str: String = Input::new()
        .with_prompt("Output directory")
        .default(output_dir().display().to_string())
        .interact_text()?;

    let summary = run(&config, &PathBuf::from(dir_str.trim()), progress)?;

    println!(
        "Generated {} subjects ({} rows: train {}, val {}, test {})",
        summary.num_subjects,
        summary.num_rows,
        summary.train_size,
        summary.val_size,
        summary.test_size
    );

    Ok(())
}
