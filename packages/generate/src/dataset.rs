//! Per-subject generation, the subject-level split, and dataset statistics.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::SeedableRng as _;
use rand::rngs::StdRng;
use rand::seq::SliceRandom as _;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tourist_safety_features::{SyntheticSignals, derive_features};
use tourist_safety_features_models::{FeatureVector, SafetyLabel};
use tourist_safety_scoring::LabelSynthesizer;
use tourist_safety_simulation::{SimulatedSubject, simulate_subject, subject_rng};
use tourist_safety_spatial::{AreaRiskEvaluator, SyntheticRiskEvaluator, registry};
use tourist_safety_trajectory_models::{LocationSample, SubjectProfile};

use crate::GenerateError;
use crate::config::{GenerateConfig, SplitConfig};
use crate::progress::ProgressCallback;

/// Mixed into the run seed to derive the split shuffle stream.
const SPLIT_STREAM: u64 = 0xD1B5_4A32_D192_ED03;

/// A feature vector joined with its label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    /// Model inputs and identifiers.
    #[serde(flatten)]
    pub features: FeatureVector,
    /// Safety score in `[0, 100]`.
    pub safety_label: u8,
    /// Whether a near-term incident is recorded.
    pub incident_within_24h: bool,
}

impl TrainingRow {
    /// Joins a feature vector with the label synthesized from it.
    #[must_use]
    pub fn new(features: FeatureVector, label: &SafetyLabel) -> Self {
        Self {
            features,
            safety_label: label.safety_label,
            incident_within_24h: label.incident_within_24h,
        }
    }
}

/// Everything generated for one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSubject {
    /// Profile, anomaly modes, and trajectory.
    pub subject: SimulatedSubject,
    /// One training row per sample, in timestamp order.
    pub rows: Vec<TrainingRow>,
}

/// Subject ids assigned to each split.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSplit {
    /// Training subjects.
    pub train: Vec<String>,
    /// Validation subjects.
    pub val: Vec<String>,
    /// Test subjects.
    pub test: Vec<String>,
}

/// How many subjects received each anomaly mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyModeCounts {
    /// Subjects with the route-deviation mode.
    pub route_deviation: usize,
    /// Subjects with the sudden-dropout mode.
    pub sudden_dropout: usize,
    /// Subjects with the prolonged-inactivity mode.
    pub prolonged_inactivity: usize,
}

/// Counts and label statistics of a generated dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    /// The configuration that produced the dataset.
    pub config: GenerateConfig,
    /// Number of simulated subjects.
    pub num_subjects: usize,
    /// Number of emitted location samples.
    pub num_samples: usize,
    /// Number of training rows (one per sample).
    pub num_rows: usize,
    /// Rows in the training split.
    pub train_size: usize,
    /// Rows in the validation split.
    pub val_size: usize,
    /// Rows in the test split.
    pub test_size: usize,
    /// Subjects in the training split.
    pub train_subjects: usize,
    /// Subjects in the validation split.
    pub val_subjects: usize,
    /// Subjects in the test split.
    pub test_subjects: usize,
    /// Anomaly-mode assignment counts.
    pub anomaly_modes: AnomalyModeCounts,
    /// Mean safety label over all rows; `0` when there are none.
    pub mean_safety_label: f64,
    /// Rows with `incident_within_24h` set.
    pub incident_count: usize,
}

/// A generated dataset ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Every subject profile, in subject-index order.
    pub profiles: Vec<SubjectProfile>,
    /// Every location sample, grouped by subject in subject-index order.
    pub samples: Vec<LocationSample>,
    /// Training rows.
    pub train: Vec<TrainingRow>,
    /// Validation rows.
    pub val: Vec<TrainingRow>,
    /// Test rows.
    pub test: Vec<TrainingRow>,
    /// Subject ids per split.
    pub split: SubjectSplit,
    /// Counts and statistics.
    pub summary: DatasetSummary,
}

/// Shared per-run samplers. Built once and borrowed by every worker.
struct Samplers {
    evaluator: AreaRiskEvaluator,
    signals: SyntheticSignals,
    labels: LabelSynthesizer,
}

impl Samplers {
    fn new(config: &GenerateConfig) -> Result<Self, GenerateError> {
        let evaluator = AreaRiskEvaluator::Synthetic(SyntheticRiskEvaluator::new(
            config.simulation.destinations.clone(),
            registry::default_zones(),
            config.synthetic_risk,
        )?);

        Ok(Self {
            evaluator,
            signals: SyntheticSignals::new(config.signals)?,
            labels: LabelSynthesizer::new(config.labels)?,
        })
    }
}

/// Generates one subject from its own RNG stream: simulation, then
/// feature derivation, then labelling.
fn generate_subject(
    config: &GenerateConfig,
    samplers: &Samplers,
    index: usize,
) -> Result<GeneratedSubject, GenerateError> {
    let mut rng = subject_rng(config.seed, index);

    let subject = simulate_subject(&config.simulation, &mut rng)?;
    let features = derive_features(
        &subject.profile,
        &subject.samples,
        &samplers.evaluator,
        &samplers.signals,
        &mut rng,
    )?;
    let labels = samplers.labels.synthesize_labels(&features, &mut rng);

    let rows = features
        .into_iter()
        .zip(&labels)
        .map(|(features, label)| TrainingRow::new(features, label))
        .collect();

    Ok(GeneratedSubject { subject, rows })
}

/// Shuffles `subject_ids` with a stream derived from `seed` and cuts it
/// into train, validation, and test.
///
/// Split sizes are `floor(n * train_fraction)` and
/// `floor(n * val_fraction)`; the test split takes the rest.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn split_subjects(subject_ids: &[String], config: &SplitConfig, seed: u64) -> SubjectSplit {
    let mut shuffled = subject_ids.to_vec();
    shuffled.shuffle(&mut StdRng::seed_from_u64(seed ^ SPLIT_STREAM));

    let n = shuffled.len() as f64;
    let n_train = ((n * config.train_fraction).floor() as usize).min(shuffled.len());
    let n_val = ((n * config.val_fraction).floor() as usize).min(shuffled.len() - n_train);

    let test = shuffled.split_off(n_train + n_val);
    let val = shuffled.split_off(n_train);

    SubjectSplit {
        train: shuffled,
        val,
        test,
    }
}

/// Runs the whole pipeline: subjects in parallel, then the split and the
/// summary.
///
/// Output is identical for a given configuration regardless of thread
/// count, since each subject owns an RNG stream derived from the run seed
/// and its index, and results are collected in index order.
///
/// # Errors
///
/// Returns [`GenerateError`] if the configuration is invalid.
pub fn generate_dataset(
    config: &GenerateConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Dataset, GenerateError> {
    config.validate()?;
    let samplers = Samplers::new(config)?;

    progress.set_message("Simulating subjects".to_string());
    progress.set_total(config.num_subjects as u64);

    let subjects = (0..config.num_subjects)
        .into_par_iter()
        .map(|index| {
            let subject = generate_subject(config, &samplers, index);
            progress.inc(1);
            subject
        })
        .collect::<Result<Vec<_>, _>>()?;

    progress.finish(format!("Simulated {} subjects", subjects.len()));

    Ok(assemble(config, subjects))
}

fn assemble(config: &GenerateConfig, subjects: Vec<GeneratedSubject>) -> Dataset {
    let mut anomaly_modes = AnomalyModeCounts::default();
    let mut profiles = Vec::with_capacity(subjects.len());
    let mut samples = Vec::new();
    let mut rows = Vec::new();
    let mut with_rows = Vec::new();

    for generated in subjects {
        let GeneratedSubject { subject, rows: subject_rows } = generated;
        let modes = subject.anomaly_modes;
        anomaly_modes.route_deviation += usize::from(modes.route_deviation);
        anomaly_modes.sudden_dropout += usize::from(modes.sudden_dropout);
        anomaly_modes.prolonged_inactivity += usize::from(modes.prolonged_inactivity);

        if !subject_rows.is_empty() {
            with_rows.push(subject.profile.subject_id.clone());
        }
        profiles.push(subject.profile);
        samples.extend(subject.samples);
        rows.extend(subject_rows);
    }

    let split = split_subjects(&with_rows, &config.split, config.seed);
    let (train, val, test) = partition_rows(&rows, &split);

    let summary = DatasetSummary {
        config: config.clone(),
        num_subjects: profiles.len(),
        num_samples: samples.len(),
        num_rows: rows.len(),
        train_size: train.len(),
        val_size: val.len(),
        test_size: test.len(),
        train_subjects: split.train.len(),
        val_subjects: split.val.len(),
        test_subjects: split.test.len(),
        anomaly_modes,
        mean_safety_label: mean_label(&rows),
        incident_count: rows.iter().filter(|r| r.incident_within_24h).count(),
    };

    log::info!(
        "Generated {} subjects, {} samples, {} rows",
        summary.num_subjects,
        summary.num_samples,
        summary.num_rows
    );
    log::info!(
        "Split rows: train {}, val {}, test {}",
        summary.train_size,
        summary.val_size,
        summary.test_size
    );

    Dataset {
        profiles,
        samples,
        train,
        val,
        test,
        split,
        summary,
    }
}

#[derive(Clone, Copy)]
enum Part {
    Train,
    Val,
    Test,
}

/// Assigns every row to its subject's split, preserving row order.
fn partition_rows(
    rows: &[TrainingRow],
    split: &SubjectSplit,
) -> (Vec<TrainingRow>, Vec<TrainingRow>, Vec<TrainingRow>) {
    let mut assignment: BTreeMap<&str, Part> = BTreeMap::new();
    for (ids, part) in [
        (&split.train, Part::Train),
        (&split.val, Part::Val),
        (&split.test, Part::Test),
    ] {
        for id in ids {
            assignment.insert(id.as_str(), part);
        }
    }

    let mut train = Vec::new();
    let mut val = Vec::new();
    let mut test = Vec::new();
    for row in rows {
        match assignment.get(row.features.subject_id.as_str()) {
            Some(Part::Train) => train.push(row.clone()),
            Some(Part::Val) => val.push(row.clone()),
            Some(Part::Test) => test.push(row.clone()),
            None => log::warn!("Row for unsplit subject {}", row.features.subject_id),
        }
    }
    (train, val, test)
}

#[allow(clippy::cast_precision_loss)]
fn mean_label(rows: &[TrainingRow]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|r| f64::from(r.safety_label)).sum::<f64>() / rows.len() as f64
}
