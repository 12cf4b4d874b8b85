//! Synthetic subject profiles and itineraries.

use chrono::Duration;
use rand::Rng;
use rand::distributions::WeightedIndex;
use rand::seq::{SliceRandom as _, index};
use rand_distr::{Distribution as _, Normal};
use tourist_safety_trajectory_models::{Coordinate, SexCategory, SubjectProfile, Waypoint};

use crate::{ConfigError, SimulationError, config::SimulationConfig};

/// Generates one subject profile with a chronologically ordered itinerary.
///
/// Destinations are drawn without replacement from
/// [`SimulationConfig::destinations`], each jittered by Gaussian noise.
/// Waypoints whose planned arrival would fall after the trip end are
/// dropped.
///
/// # Errors
///
/// Returns [`SimulationError`] if the configuration is invalid or the
/// generated profile fails [`SubjectProfile::validate`].
pub fn generate_profile<R: Rng + ?Sized>(
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<SubjectProfile, SimulationError> {
    config.validate()?;

    let profile_config = &config.profile;
    let sex_dist = WeightedIndex::new(profile_config.sex_weights)
        .map_err(|e| ConfigError::new(format!("invalid sex_weights: {e}")))?;
    let jitter = Normal::new(0.0, profile_config.waypoint_jitter_deg)
        .map_err(|e| ConfigError::new(format!("invalid waypoint_jitter_deg: {e}")))?;

    let mut id_bytes = [0u8; 16];
    rng.fill_bytes(&mut id_bytes);
    let subject_id = uuid::Builder::from_random_bytes(id_bytes)
        .into_uuid()
        .to_string();

    let age = rng.gen_range(profile_config.age_min..profile_config.age_max);
    let sex = SexCategory::all()[sex_dist.sample(rng)];
    let nationality = profile_config
        .nationalities
        .choose(rng)
        .cloned()
        .ok_or_else(|| ConfigError::new("nationalities must not be empty"))?;

    let trip_days = rng.gen_range(profile_config.trip_days_min..=profile_config.trip_days_max);
    let start_offset = rng.gen_range(0..profile_config.start_offset_days_max);
    let trip_start = profile_config.reference_time - Duration::days(start_offset);
    let trip_end = trip_start + Duration::days(trip_days);

    let count = rng
        .gen_range(profile_config.destinations_min..=profile_config.destinations_max)
        .min(config.destinations.len());

    let mut itinerary = Vec::with_capacity(count);
    let mut arrival = trip_start;
    for i in index::sample(rng, config.destinations.len(), count) {
        let destination = &config.destinations[i];
        let coordinate = Coordinate::wrapped(
            destination.coordinate.latitude() + jitter.sample(rng),
            destination.coordinate.longitude() + jitter.sample(rng),
        );
        arrival += Duration::hours(rng.gen_range(
            profile_config.arrival_gap_hours_min..profile_config.arrival_gap_hours_max,
        ));
        if arrival > trip_end {
            break;
        }
        itinerary.push(Waypoint {
            coordinate,
            planned_arrival: arrival,
            label: destination.name.clone(),
        });
    }

    let profile = SubjectProfile {
        subject_id,
        age,
        sex,
        nationality,
        trip_start,
        trip_end,
        itinerary,
        emergency_contact_hash: format!("hash_{:016x}", rng.next_u64()),
    };
    profile.validate()?;

    log::trace!(
        "Generated profile {} with {} waypoints over {trip_days} days",
        profile.subject_id,
        profile.itinerary.len()
    );

    Ok(profile)
}
