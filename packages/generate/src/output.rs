//! Dataset file writers.
//!
//! Writes JSON Lines and CSV for every table plus a `metadata.json`
//! summary. CSV rows use flat row structs since the `csv` serializer does
//! not handle nested or flattened fields.

use std::io::{BufWriter, Write as _};
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;
use tourist_safety_features_models::TimeOfDayBucket;
use tourist_safety_trajectory_models::{DeviceStatus, LocationSample, Provider};

use crate::GenerateError;
use crate::dataset::{Dataset, DatasetSummary, TrainingRow};

/// File name of the profiles table.
pub const PROFILES_FILE: &str = "profiles.jsonl";
/// File name of the dataset summary.
pub const METADATA_FILE: &str = "metadata.json";

#[derive(Serialize)]
struct SampleCsvRow<'a> {
    tourist_id: &'a str,
    timestamp: NaiveDateTime,
    latitude: f64,
    longitude: f64,
    speed_m_s: f64,
    accuracy_m: f64,
    provider: Provider,
    battery_pct: u8,
    device_status: DeviceStatus,
}

impl<'a> From<&'a LocationSample> for SampleCsvRow<'a> {
    fn from(sample: &'a LocationSample) -> Self {
        Self {
            tourist_id: &sample.subject_id,
            timestamp: sample.timestamp,
            latitude: sample.coordinate.latitude(),
            longitude: sample.coordinate.longitude(),
            speed_m_s: sample.speed_m_s,
            accuracy_m: sample.accuracy_m,
            provider: sample.provider,
            battery_pct: sample.battery_pct,
            device_status: sample.device_status,
        }
    }
}

#[derive(Serialize)]
struct TrainingCsvRow<'a> {
    tourist_id: &'a str,
    timestamp: NaiveDateTime,
    time_of_day_bucket: TimeOfDayBucket,
    distance_from_itinerary: f64,
    time_since_last_fix: f64,
    avg_speed_last_15min: f64,
    area_risk_score: f64,
    prior_incidents_count: u32,
    days_into_trip: i64,
    is_in_restricted_zone: bool,
    sos_flag: bool,
    age: u8,
    sex_encoded: u8,
    days_trip_duration: i64,
    safety_label: u8,
    incident_within_24h: bool,
}

impl<'a> From<&'a TrainingRow> for TrainingCsvRow<'a> {
    fn from(row: &'a TrainingRow) -> Self {
        let f = &row.features;
        Self {
            tourist_id: &f.subject_id,
            timestamp: f.timestamp,
            time_of_day_bucket: f.time_of_day_bucket,
            distance_from_itinerary: f.distance_from_itinerary,
            time_since_last_fix: f.time_since_last_fix,
            avg_speed_last_15min: f.avg_speed_last_15min,
            area_risk_score: f.area_risk_score,
            prior_incidents_count: f.prior_incidents_count,
            days_into_trip: f.days_into_trip,
            is_in_restricted_zone: f.is_in_restricted_zone,
            sos_flag: f.sos_flag,
            age: f.age,
            sex_encoded: f.sex_encoded,
            days_trip_duration: f.days_trip_duration,
            safety_label: row.safety_label,
            incident_within_24h: row.incident_within_24h,
        }
    }
}

#[derive(Serialize)]
struct Metadata<'a> {
    generated_at: String,
    #[serde(flatten)]
    summary: &'a DatasetSummary,
}

fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<(), GenerateError> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    for item in items {
        serde_json::to_writer(&mut writer, item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn write_csv<T: Serialize>(
    path: &Path,
    rows: impl IntoIterator<Item = T>,
) -> Result<(), GenerateError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_metadata(dir: &Path, summary: &DatasetSummary) -> Result<(), GenerateError> {
    let metadata = Metadata {
        generated_at: chrono::Utc::now().to_rfc3339(),
        summary,
    };

    let path = dir.join(METADATA_FILE);
    let tmp_path = dir.join(format!("{METADATA_FILE}.tmp"));
    let contents = serde_json::to_string_pretty(&metadata)?;
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// Writes every table of `dataset` into `dir`, creating it if needed.
///
/// Produces `profiles.jsonl`, `samples.{jsonl,csv}`,
/// `{train,val,test}.{jsonl,csv}`, and `metadata.json`.
///
/// # Errors
///
/// Returns [`GenerateError`] if any file cannot be written.
pub fn write_dataset(dataset: &Dataset, dir: &Path) -> Result<(), GenerateError> {
    std::fs::create_dir_all(dir)?;

    write_jsonl(&dir.join(PROFILES_FILE), &dataset.profiles)?;
    write_jsonl(&dir.join("samples.jsonl"), &dataset.samples)?;
    write_csv(
        &dir.join("samples.csv"),
        dataset.samples.iter().map(SampleCsvRow::from),
    )?;

    for (name, rows) in [
        ("train", &dataset.train),
        ("val", &dataset.val),
        ("test", &dataset.test),
    ] {
        write_jsonl(&dir.join(format!("{name}.jsonl")), rows)?;
        write_csv(
            &dir.join(format!("{name}.csv")),
            rows.iter().map(TrainingCsvRow::from),
        )?;
        log::debug!("Wrote {} {name} rows", rows.len());
    }

    write_metadata(dir, &dataset.summary)?;

    log::info!("Dataset written to {}", dir.display());
    Ok(())
}
