#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Subject, itinerary, and location sample types.
//!
//! These are the raw inputs of the tourist safety pipeline: a simulated
//! (or live) subject with a planned itinerary, and the time-ordered
//! location samples reported by that subject's device. Feature vectors,
//! labels, and alerts are derived from these in downstream crates.
//!
//! All timestamps are [`NaiveDateTime`] values interpreted as local
//! wall-clock time at the subject's location.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Errors produced when a coordinate falls outside the valid WGS84 range.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    /// Latitude is not within `[-90, 90]` (or is not a number).
    #[error("latitude {0} out of range [-90, 90]")]
    Latitude(f64),

    /// Longitude is not within `[-180, 180]` (or is not a number).
    #[error("longitude {0} out of range [-180, 180]")]
    Longitude(f64),
}

/// A validated `(latitude, longitude)` pair in degrees.
///
/// Construction through [`Coordinate::new`] or deserialization rejects
/// out-of-range values, so any `Coordinate` in the system is valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Creates a coordinate, validating both components.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] if latitude is outside `[-90, 90]` or
    /// longitude is outside `[-180, 180]`.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Creates a coordinate by clamping latitude to `[-90, 90]` and
    /// wrapping longitude into `[-180, 180)`.
    ///
    /// Used by the simulator after applying noise and displacement, which
    /// must never produce an invalid coordinate. Inputs must be finite.
    #[must_use]
    pub fn wrapped(latitude: f64, longitude: f64) -> Self {
        let longitude = if (-180.0..=180.0).contains(&longitude) {
            longitude
        } else {
            (longitude + 180.0).rem_euclid(360.0) - 180.0
        };
        Self {
            latitude: latitude.clamp(-90.0, 90.0),
            longitude,
        }
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Self-reported sex category of a subject.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum SexCategory {
    /// Male
    #[serde(rename = "M")]
    #[strum(serialize = "M")]
    Male,
    /// Female
    #[serde(rename = "F")]
    #[strum(serialize = "F")]
    Female,
    /// Any other or undisclosed category
    Other,
}

impl SexCategory {
    /// Integer encoding used in feature vectors (`M=0`, `F=1`, `Other=2`).
    #[must_use]
    pub const fn encoded(self) -> u8 {
        match self {
            Self::Male => 0,
            Self::Female => 1,
            Self::Other => 2,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Male, Self::Female, Self::Other]
    }
}

/// Positioning source that produced a location fix.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Provider {
    /// Satellite positioning
    #[default]
    Gps,
    /// Wi-Fi access point triangulation
    Wifi,
    /// Cell tower triangulation
    Cell,
}

impl Provider {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Gps, Self::Wifi, Self::Cell]
    }
}

/// Device state at the moment a location fix was reported.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceStatus {
    /// Normal operation
    #[default]
    Active,
    /// Screen off, app backgrounded
    ScreenOff,
    /// Transient loss of network connectivity
    NoSignal,
    /// Battery saver engaged
    LowPower,
}

/// A planned destination on a subject's itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Planned location.
    pub coordinate: Coordinate,
    /// When the subject is expected to arrive.
    pub planned_arrival: NaiveDateTime,
    /// Human-readable destination name.
    pub label: String,
}

/// Errors produced when a [`SubjectProfile`] violates its invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    /// Trip end is not strictly after trip start.
    #[error("trip end {end} is not after trip start {start}")]
    TripWindow {
        /// Trip start instant.
        start: NaiveDateTime,
        /// Trip end instant.
        end: NaiveDateTime,
    },

    /// A waypoint's planned arrival is not after the previous waypoint's.
    #[error("itinerary arrival at index {index} is not strictly increasing")]
    ArrivalOrder {
        /// Index of the offending waypoint.
        index: usize,
    },

    /// A waypoint's planned arrival lies outside the trip window.
    #[error("itinerary arrival at index {index} lies outside the trip window")]
    ArrivalOutsideTrip {
        /// Index of the offending waypoint.
        index: usize,
    },
}

/// A simulated (or registered) tourist and their planned trip.
///
/// Immutable once created; location samples reference it by
/// [`SubjectProfile::subject_id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectProfile {
    /// Unique subject identifier.
    #[serde(rename = "tourist_id")]
    pub subject_id: String,
    /// Age in years.
    pub age: u8,
    /// Sex category.
    pub sex: SexCategory,
    /// Nationality label.
    pub nationality: String,
    /// Trip start (local time).
    pub trip_start: NaiveDateTime,
    /// Trip end (local time), strictly after `trip_start`.
    pub trip_end: NaiveDateTime,
    /// Planned destinations, ordered by strictly increasing arrival.
    pub itinerary: Vec<Waypoint>,
    /// Opaque hash standing in for the emergency contact.
    pub emergency_contact_hash: String,
}

impl SubjectProfile {
    /// Checks the trip window and itinerary ordering invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError`] describing the first violated invariant.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.trip_end <= self.trip_start {
            return Err(ProfileError::TripWindow {
                start: self.trip_start,
                end: self.trip_end,
            });
        }

        let mut previous: Option<NaiveDateTime> = None;
        for (index, waypoint) in self.itinerary.iter().enumerate() {
            if waypoint.planned_arrival < self.trip_start
                || waypoint.planned_arrival > self.trip_end
            {
                return Err(ProfileError::ArrivalOutsideTrip { index });
            }
            if previous.is_some_and(|prev| waypoint.planned_arrival <= prev) {
                return Err(ProfileError::ArrivalOrder { index });
            }
            previous = Some(waypoint.planned_arrival);
        }

        Ok(())
    }

    /// Whole days between trip start and trip end.
    #[must_use]
    pub fn trip_duration_days(&self) -> i64 {
        (self.trip_end - self.trip_start).num_days()
    }
}

/// A single location fix reported by a subject's device.
///
/// Samples for one subject form an append-only sequence with strictly
/// increasing timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    /// Subject this fix belongs to.
    #[serde(rename = "tourist_id")]
    pub subject_id: String,
    /// When the fix was taken (local time).
    pub timestamp: NaiveDateTime,
    /// Reported position.
    pub coordinate: Coordinate,
    /// Instantaneous speed in m/s (non-negative).
    pub speed_m_s: f64,
    /// Horizontal accuracy radius in meters (positive).
    pub accuracy_m: f64,
    /// Positioning source.
    pub provider: Provider,
    /// Battery charge, 0-100.
    pub battery_pct: u8,
    /// Device state.
    pub device_status: DeviceStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn waypoint(arrival: NaiveDateTime) -> Waypoint {
        Waypoint {
            coordinate: Coordinate::new(12.3, 76.6).unwrap(),
            planned_arrival: arrival,
            label: "Palace".to_string(),
        }
    }

    fn profile(itinerary: Vec<Waypoint>) -> SubjectProfile {
        SubjectProfile {
            subject_id: "s-1".to_string(),
            age: 30,
            sex: SexCategory::Female,
            nationality: "Indian".to_string(),
            trip_start: at(0),
            trip_end: at(0) + Duration::days(2),
            itinerary,
            emergency_contact_hash: "hash_0".to_string(),
        }
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert_eq!(
            Coordinate::new(90.5, 0.0),
            Err(CoordinateError::Latitude(90.5))
        );
        assert_eq!(
            Coordinate::new(0.0, -180.1),
            Err(CoordinateError::Longitude(-180.1))
        );
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn deserialization_validates_range() {
        let ok: Coordinate = serde_json::from_str(r#"{"latitude":12.3,"longitude":76.6}"#).unwrap();
        assert!((ok.latitude() - 12.3).abs() < f64::EPSILON);

        let bad = serde_json::from_str::<Coordinate>(r#"{"latitude":123.0,"longitude":76.6}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn wrapped_clamps_latitude_and_wraps_longitude() {
        let c = Coordinate::wrapped(91.0, 190.0);
        assert!((c.latitude() - 90.0).abs() < f64::EPSILON);
        assert!((c.longitude() - -170.0).abs() < 1e-9);

        let c = Coordinate::wrapped(-12.0, -200.0);
        assert!((c.longitude() - 160.0).abs() < 1e-9);
    }

    #[test]
    fn sex_encoding_is_stable() {
        assert_eq!(SexCategory::Male.encoded(), 0);
        assert_eq!(SexCategory::Female.encoded(), 1);
        assert_eq!(SexCategory::Other.encoded(), 2);
        assert_eq!(SexCategory::Male.to_string(), "M");
        assert_eq!("Other".parse::<SexCategory>().unwrap(), SexCategory::Other);
    }

    #[test]
    fn device_status_uses_snake_case() {
        assert_eq!(DeviceStatus::ScreenOff.as_ref(), "screen_off");
        assert_eq!(
            serde_json::to_string(&DeviceStatus::LowPower).unwrap(),
            "\"low_power\""
        );
    }

    #[test]
    fn valid_profile_passes() {
        let p = profile(vec![waypoint(at(3)), waypoint(at(9))]);
        assert_eq!(p.validate(), Ok(()));
        assert_eq!(p.trip_duration_days(), 2);
    }

    #[test]
    fn rejects_inverted_trip_window() {
        let mut p = profile(vec![]);
        p.trip_end = p.trip_start;
        assert!(matches!(p.validate(), Err(ProfileError::TripWindow { .. })));
    }

    #[test]
    fn rejects_non_increasing_arrivals() {
        let p = profile(vec![waypoint(at(9)), waypoint(at(9))]);
        assert_eq!(p.validate(), Err(ProfileError::ArrivalOrder { index: 1 }));
    }

    #[test]
    fn rejects_arrival_after_trip_end() {
        let p = profile(vec![waypoint(at(0) + Duration::days(3))]);
        assert_eq!(
            p.validate(),
            Err(ProfileError::ArrivalOutsideTrip { index: 0 })
        );
    }

    #[test]
    fn subject_id_serializes_as_tourist_id() {
        let json = serde_json::to_value(profile(vec![])).unwrap();
        assert_eq!(json["tourist_id"], "s-1");
        assert_eq!(json["sex"], "F");
    }
}
