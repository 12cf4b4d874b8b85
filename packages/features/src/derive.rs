//! Feature derivation over a subject's ordered sample history.
//!
//! Every feature for sample `i` reads only samples `0..=i`, so deriving a
//! whole trajectory at once and deriving each sample as it arrives give the
//! same vectors.

use chrono::NaiveDateTime;
use rand::Rng;
use tourist_safety_features_models::{FeatureVector, TimeOfDayBucket};
use tourist_safety_spatial::{
    AreaRisk, AreaRiskEvaluator, LiveRiskEvaluator, great_circle_distance,
};
use tourist_safety_trajectory_models::{Coordinate, LocationSample, SubjectProfile};

use crate::FeatureError;
use crate::signals::{IncidentSignals, SyntheticSignals};

/// Length of the trailing speed window in seconds.
pub const TRAILING_WINDOW_SECS: i64 = 900;

/// Static subject attributes and itinerary that features are computed
/// against.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileContext {
    /// Subject identity; every sample must carry it.
    pub subject_id: String,
    /// Subject age in years.
    pub age: u8,
    /// Encoded sex category.
    pub sex_encoded: u8,
    /// Trip start (local time).
    pub trip_start: NaiveDateTime,
    /// Whole days between trip start and trip end.
    pub days_trip_duration: i64,
    /// Planned waypoint coordinates.
    pub waypoints: Vec<Coordinate>,
}

impl ProfileContext {
    /// Extracts the context from a full profile.
    #[must_use]
    pub fn from_profile(profile: &SubjectProfile) -> Self {
        Self {
            subject_id: profile.subject_id.clone(),
            age: profile.age,
            sex_encoded: profile.sex.encoded(),
            trip_start: profile.trip_start,
            days_trip_duration: profile.trip_duration_days(),
            waypoints: profile.itinerary.iter().map(|w| w.coordinate).collect(),
        }
    }

    /// Meters from `coordinate` to the nearest waypoint, `0` when the
    /// itinerary is empty.
    #[must_use]
    pub fn distance_from_itinerary(&self, coordinate: &Coordinate) -> f64 {
        self.waypoints
            .iter()
            .map(|w| great_circle_distance(coordinate, w))
            .reduce(f64::min)
            .unwrap_or(0.0)
    }
}

/// Derives one feature vector per sample for training data.
///
/// For each sample, in order, the area risk is evaluated first and then
/// the synthetic incident signals are drawn, so the draw sequence is fixed
/// for a given history.
///
/// # Errors
///
/// Returns [`FeatureError`] if the samples are not strictly increasing in
/// time or belong to a different subject.
pub fn derive_features<R: Rng + ?Sized>(
    profile: &SubjectProfile,
    samples: &[LocationSample],
    evaluator: &AreaRiskEvaluator,
    signals: &SyntheticSignals,
    rng: &mut R,
) -> Result<Vec<FeatureVector>, FeatureError> {
    let context = ProfileContext::from_profile(profile);
    validate_history(&context, samples)?;

    let features = samples
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let area = evaluator.evaluate(&sample.coordinate, rng);
            let incidents = signals.draw(rng);
            compute(&context, samples, i, area, incidents)
        })
        .collect::<Vec<_>>();

    log::trace!(
        "Derived {} feature vectors for subject {}",
        features.len(),
        context.subject_id
    );

    Ok(features)
}

/// Derives the feature vector for the last sample of `history` at
/// inference time.
///
/// Area risk comes from the live evaluator; incident signals are supplied
/// by the caller. No randomness is involved.
///
/// # Errors
///
/// Returns [`FeatureError`] if the history is empty, out of order, or
/// belongs to a different subject.
pub fn derive_features_for_sample(
    context: &ProfileContext,
    history: &[LocationSample],
    evaluator: &LiveRiskEvaluator,
    incidents: IncidentSignals,
) -> Result<FeatureVector, FeatureError> {
    let index = history.len().checked_sub(1).ok_or(FeatureError::EmptyHistory)?;
    validate_history(context, history)?;

    let area = evaluator.evaluate(&history[index].coordinate);
    Ok(compute(context, history, index, area, incidents))
}

/// Computes features for `samples[index]` from a validated history.
fn compute(
    context: &ProfileContext,
    samples: &[LocationSample],
    index: usize,
    area: AreaRisk,
    incidents: IncidentSignals,
) -> FeatureVector {
    let current = &samples[index];
    let time_since_last_fix = index.checked_sub(1).map_or(0.0, |previous| {
        seconds_between(samples[previous].timestamp, current.timestamp)
    });

    FeatureVector {
        subject_id: context.subject_id.clone(),
        timestamp: current.timestamp,
        time_of_day_bucket: TimeOfDayBucket::from_timestamp(&current.timestamp),
        distance_from_itinerary: context.distance_from_itinerary(&current.coordinate),
        time_since_last_fix,
        avg_speed_last_15min: trailing_mean_speed(&samples[..=index]),
        area_risk_score: area.risk_score,
        prior_incidents_count: incidents.prior_incidents_count,
        days_into_trip: (current.timestamp - context.trip_start).num_days().max(0),
        is_in_restricted_zone: area.in_restricted_zone,
        sos_flag: incidents.sos_flag,
        age: context.age,
        sex_encoded: context.sex_encoded,
        days_trip_duration: context.days_trip_duration,
    }
}

/// Mean speed of every sample in `(t - 900 s, t]`, where `t` is the last
/// sample's timestamp. Always includes the last sample.
#[must_use]
pub fn trailing_mean_speed(history: &[LocationSample]) -> f64 {
    let Some(current) = history.last() else {
        return 0.0;
    };

    let window = history
        .iter()
        .rev()
        .take_while(|s| (current.timestamp - s.timestamp).num_seconds() < TRAILING_WINDOW_SECS);

    let (sum, count) = window.fold((0.0, 0_u32), |(sum, count), s| {
        (sum + s.speed_m_s, count + 1)
    });
    sum / f64::from(count)
}

#[allow(clippy::cast_precision_loss)]
fn seconds_between(earlier: NaiveDateTime, later: NaiveDateTime) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 1000.0
}

fn validate_history(
    context: &ProfileContext,
    history: &[LocationSample],
) -> Result<(), FeatureError> {
    for (index, sample) in history.iter().enumerate() {
        if sample.subject_id != context.subject_id {
            return Err(FeatureError::SubjectMismatch {
                index,
                expected: context.subject_id.clone(),
                found: sample.subject_id.clone(),
            });
        }
        if index > 0 && sample.timestamp <= history[index - 1].timestamp {
            return Err(FeatureError::OutOfOrder { index });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use rand::SeedableRng as _;
    use rand::rngs::StdRng;
    use tourist_safety_simulation::{SimulationConfig, simulate_subject, subject_rng};
    use tourist_safety_spatial::{
        LiveRiskConfig, SyntheticRiskConfig, SyntheticRiskEvaluator, ZoneIndex, registry,
    };
    use tourist_safety_trajectory_models::{DeviceStatus, Provider};

    use crate::signals::SyntheticSignalConfig;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn sample(offset_secs: i64, speed: f64, lat: f64, lon: f64) -> LocationSample {
        LocationSample {
            subject_id: "t1".to_string(),
            timestamp: start() + Duration::seconds(offset_secs),
            coordinate: Coordinate::new(lat, lon).unwrap(),
            speed_m_s: speed,
            accuracy_m: 10.0,
            provider: Provider::Gps,
            battery_pct: 90,
            device_status: DeviceStatus::Active,
        }
    }

    fn context() -> ProfileContext {
        ProfileContext {
            subject_id: "t1".to_string(),
            age: 40,
            sex_encoded: 1,
            trip_start: start() - Duration::days(2),
            days_trip_duration: 7,
            waypoints: vec![
                Coordinate::new(12.3051, 76.6551).unwrap(),
                Coordinate::new(12.2724, 76.6731).unwrap(),
            ],
        }
    }

    fn live() -> LiveRiskEvaluator {
        LiveRiskEvaluator::new(ZoneIndex::empty(), LiveRiskConfig::default())
    }

    #[test]
    fn trailing_mean_over_window() {
        let history = vec![
            sample(0, 2.0, 12.3, 76.65),
            sample(300, 4.0, 12.3, 76.65),
            sample(600, 6.0, 12.3, 76.65),
        ];
        assert!((trailing_mean_speed(&history) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn trailing_window_excludes_exactly_900s_back() {
        let history = vec![sample(0, 100.0, 12.3, 76.65), sample(900, 2.0, 12.3, 76.65)];
        assert!((trailing_mean_speed(&history) - 2.0).abs() < 1e-12);

        let history = vec![sample(1, 100.0, 12.3, 76.65), sample(900, 2.0, 12.3, 76.65)];
        assert!((trailing_mean_speed(&history) - 51.0).abs() < 1e-12);
    }

    #[test]
    fn live_features_for_last_sample() {
        let history = vec![
            sample(0, 2.0, 12.3051, 76.6551),
            sample(300, 4.0, 12.3051, 76.6551),
            sample(600, 6.0, 12.3051, 76.6551),
        ];
        let fv = derive_features_for_sample(
            &context(),
            &history,
            &live(),
            IncidentSignals {
                prior_incidents_count: 2,
                sos_flag: false,
            },
        )
        .unwrap();

        assert_eq!(fv.subject_id, "t1");
        assert_eq!(fv.timestamp, history[2].timestamp);
        assert_eq!(fv.time_of_day_bucket, TimeOfDayBucket::Morning);
        assert!(fv.distance_from_itinerary < 1.0);
        assert!((fv.time_since_last_fix - 300.0).abs() < 1e-12);
        assert!((fv.avg_speed_last_15min - 4.0).abs() < 1e-12);
        assert!((fv.area_risk_score - 0.2).abs() < 1e-12);
        assert_eq!(fv.prior_incidents_count, 2);
        assert_eq!(fv.days_into_trip, 2);
        assert_eq!(fv.days_trip_duration, 7);
        assert_eq!(fv.age, 40);
        assert_eq!(fv.sex_encoded, 1);
    }

    #[test]
    fn distance_uses_nearest_of_all_waypoints() {
        let ctx = context();
        let near_second = Coordinate::new(12.2724, 76.6731).unwrap();
        assert!(ctx.distance_from_itinerary(&near_second) < 1.0);
    }

    #[test]
    fn first_sample_has_zero_gap() {
        let history = vec![sample(0, 3.0, 12.3, 76.65)];
        let fv =
            derive_features_for_sample(&context(), &history, &live(), IncidentSignals::default())
                .unwrap();
        assert!(fv.time_since_last_fix.abs() < f64::EPSILON);
        assert!((fv.avg_speed_last_15min - 3.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_empty_out_of_order_and_foreign_samples() {
        let ctx = context();
        assert!(matches!(
            derive_features_for_sample(&ctx, &[], &live(), IncidentSignals::default()),
            Err(FeatureError::EmptyHistory)
        ));

        let unordered = vec![sample(300, 1.0, 12.3, 76.65), sample(300, 1.0, 12.3, 76.65)];
        assert!(matches!(
            derive_features_for_sample(&ctx, &unordered, &live(), IncidentSignals::default()),
            Err(FeatureError::OutOfOrder { index: 1 })
        ));

        let mut foreign = sample(0, 1.0, 12.3, 76.65);
        foreign.subject_id = "other".to_string();
        assert!(matches!(
            derive_features_for_sample(&ctx, &[foreign], &live(), IncidentSignals::default()),
            Err(FeatureError::SubjectMismatch { index: 0, .. })
        ));
    }

    fn synthetic() -> AreaRiskEvaluator {
        AreaRiskEvaluator::Synthetic(
            SyntheticRiskEvaluator::new(
                registry::default_anchors(),
                registry::default_zones(),
                SyntheticRiskConfig::default(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn rederiving_is_identical() {
        let subject =
            simulate_subject(&SimulationConfig::default(), &mut subject_rng(9, 0)).unwrap();
        let evaluator = synthetic();
        let signals = SyntheticSignals::new(SyntheticSignalConfig::default()).unwrap();

        let a = derive_features(
            &subject.profile,
            &subject.samples,
            &evaluator,
            &signals,
            &mut StdRng::seed_from_u64(5),
        )
        .unwrap();
        let b = derive_features(
            &subject.profile,
            &subject.samples,
            &evaluator,
            &signals,
            &mut StdRng::seed_from_u64(5),
        )
        .unwrap();

        assert_eq!(a.len(), subject.samples.len());
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn whole_trajectory_matches_incremental_live_derivation() {
        let subject =
            simulate_subject(&SimulationConfig::default(), &mut subject_rng(3, 1)).unwrap();
        let evaluator = live();
        let signals = SyntheticSignals::new(SyntheticSignalConfig {
            prior_incident_rate: 0.0,
            sos_probability: 0.0,
        })
        .unwrap();

        let batch = derive_features(
            &subject.profile,
            &subject.samples,
            &AreaRiskEvaluator::Live(evaluator.clone()),
            &signals,
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();

        let ctx = ProfileContext::from_profile(&subject.profile);
        for (i, expected) in batch.iter().enumerate() {
            let incremental = derive_features_for_sample(
                &ctx,
                &subject.samples[..=i],
                &evaluator,
                IncidentSignals::default(),
            )
            .unwrap();
            assert_eq!(&incremental, expected, "sample {i}");
        }
    }
}
