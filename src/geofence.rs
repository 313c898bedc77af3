//! Geofenced attendance gating: Haversine distance to the office
//! anchor plus fake-GPS heuristics on the reported position sample.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

const EARTH_RADIUS_KM: f64 = 6371.0;
const MAX_ACCURACY_M: f64 = 50.0;
const MAX_SAMPLE_AGE_MS: i64 = 60_000;
const MAX_SAMPLE_FUTURE_MS: i64 = 5_000;

/// Process-wide office location, loaded once from config.
#[derive(Debug, Clone, Copy)]
pub struct OfficeAnchor {
    pub latitude: f64,
    pub longitude: f64,
    pub allowed_radius_km: f64,
}

/// A client-reported coordinate: the parsed value plus the text it
/// arrived as. Trailing zeros in the text are a spoofing signal that
/// the parsed float cannot preserve, so the raw form is kept.
#[derive(Debug, Clone)]
pub struct Coordinate {
    value: f64,
    text: String,
}

impl Coordinate {
    /// Parse a wire-format coordinate, keeping the original text.
    pub fn parse(text: &str) -> Result<Self, std::num::ParseFloatError> {
        let trimmed = text.trim();
        Ok(Self {
            value: trimmed.parse()?,
            text: trimmed.to_string(),
        })
    }

    /// Build from a value alone, for callers that never saw wire text.
    pub fn from_value(value: f64) -> Self {
        Self {
            value,
            text: value.to_string(),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Full geolocation sample from the client, when available. Mirrors
/// the browser GeolocationPosition fields the frontend forwards.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LocationSample {
    /// Reported accuracy in meters.
    pub accuracy: Option<f64>,
    pub altitude: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    /// Sample time as unix epoch milliseconds.
    pub timestamp_ms: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GeofenceResult {
    pub is_valid: bool,
    /// Rounded to 2 decimals for display.
    #[schema(example = 0.12)]
    pub distance_km: f64,
    #[schema(example = 0.5)]
    pub max_allowed_km: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum GeofenceError {
    #[error("Invalid coordinates (0,0). Make sure GPS has a real fix and try again")]
    InvalidCoordinates,
    #[error(
        "Location is too far from the office. Distance: {distance_km:.2}km (maximum: {max_allowed_km:.2}km)"
    )]
    OutOfRange { distance_km: f64, max_allowed_km: f64 },
    #[error("GPS accuracy is too low ({accuracy:.2}m). Wait for a better signal and try again")]
    LowAccuracy { accuracy: f64 },
    #[error("Fake GPS usage detected. Use your real location for attendance")]
    SuspectedSpoofedLocation,
}

pub struct GeofenceValidator {
    anchor: OfficeAnchor,
}

impl GeofenceValidator {
    pub fn new(anchor: OfficeAnchor) -> Self {
        Self { anchor }
    }

    pub fn anchor(&self) -> &OfficeAnchor {
        &self.anchor
    }

    /// Decide whether the reported coordinates are an acceptable
    /// attendance location.
    ///
    /// A poor fix (`LowAccuracy`) is rejected before the spoofing
    /// heuristics run; a weak signal is a different failure than a
    /// fabricated one. Without a position sample spoof detection is
    /// skipped entirely, which is a known gap, so it is logged rather
    /// than silently ignored.
    pub fn validate(
        &self,
        latitude: &Coordinate,
        longitude: &Coordinate,
        sample: Option<&LocationSample>,
    ) -> Result<GeofenceResult, GeofenceError> {
        if latitude.value == 0.0 && longitude.value == 0.0 {
            return Err(GeofenceError::InvalidCoordinates);
        }

        match sample {
            Some(sample) => {
                if let Some(accuracy) = sample.accuracy {
                    if accuracy > MAX_ACCURACY_M {
                        return Err(GeofenceError::LowAccuracy { accuracy });
                    }
                }
                if looks_spoofed(latitude, longitude, sample, Utc::now().timestamp_millis()) {
                    return Err(GeofenceError::SuspectedSpoofedLocation);
                }
            }
            None => {
                tracing::warn!("position sample not provided; fake GPS detection skipped");
            }
        }

        let distance = haversine_km(
            self.anchor.latitude,
            self.anchor.longitude,
            latitude.value,
            longitude.value,
        );

        if distance > self.anchor.allowed_radius_km {
            return Err(GeofenceError::OutOfRange {
                distance_km: round2(distance),
                max_allowed_km: self.anchor.allowed_radius_km,
            });
        }

        Ok(GeofenceResult {
            is_valid: true,
            distance_km: round2(distance),
            max_allowed_km: self.anchor.allowed_radius_km,
        })
    }
}

/// Great-circle distance in kilometers on a spherical earth.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Heuristic signals that a GPS reading was fabricated rather than
/// sensor-derived. Any single signal is enough.
fn looks_spoofed(
    latitude: &Coordinate,
    longitude: &Coordinate,
    sample: &LocationSample,
    now_ms: i64,
) -> bool {
    let accuracy = sample.accuracy.unwrap_or(0.0);

    // implausibly perfect fix
    if accuracy == 0.0 || accuracy < 3.0 {
        return true;
    }

    if synthetic_precision(&latitude.text) || synthetic_precision(&longitude.text) {
        return true;
    }

    // suspiciously round altitude paired with a tight accuracy claim
    if let Some(altitude) = sample.altitude {
        if altitude != 0.0 && altitude % 1.0 == 0.0 && accuracy < 10.0 {
            return true;
        }
    }

    // real receivers rarely report exact zero for both at once
    if let (Some(speed), Some(heading)) = (sample.speed, sample.heading) {
        if speed == 0.0 && heading == 0.0 && accuracy < 20.0 {
            return true;
        }
    }

    match sample.timestamp_ms {
        None => true,
        Some(ts) => (now_ms - ts).abs() > MAX_SAMPLE_AGE_MS || ts - now_ms > MAX_SAMPLE_FUTURE_MS,
    }
}

/// Coordinate text carrying more decimal digits than any receiver
/// emits, or a long run of trailing 0000/9999, points at a synthetic
/// value. Runs on the wire text: trailing zeros do not survive a
/// round-trip through f64.
fn synthetic_precision(text: &str) -> bool {
    let Some((_, frac)) = text.split_once('.') else {
        return false;
    };
    frac.len() > 7 || (frac.len() > 5 && (frac.ends_with("0000") || frac.ends_with("9999")))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFICE: OfficeAnchor = OfficeAnchor {
        latitude: -6.2088,
        longitude: 106.8456,
        allowed_radius_km: 0.5,
    };

    fn honest_sample(now_ms: i64) -> LocationSample {
        LocationSample {
            accuracy: Some(12.5),
            altitude: Some(23.4),
            speed: Some(0.3),
            heading: Some(112.0),
            timestamp_ms: Some(now_ms - 2_000),
        }
    }

    fn coord(value: f64) -> Coordinate {
        Coordinate::from_value(value)
    }

    #[test]
    fn anchor_itself_is_distance_zero_and_valid() {
        let v = GeofenceValidator::new(OFFICE);
        let result = v
            .validate(&coord(OFFICE.latitude), &coord(OFFICE.longitude), None)
            .unwrap();
        assert!(result.is_valid);
        assert_eq!(result.distance_km, 0.0);
        assert_eq!(result.max_allowed_km, 0.5);
    }

    #[test]
    fn haversine_is_symmetric() {
        let d1 = haversine_km(-6.2088, 106.8456, -6.1751, 106.8650);
        let d2 = haversine_km(-6.1751, 106.8650, -6.2088, 106.8456);
        assert_eq!(d1, d2);
        assert!(d1 > 0.0);
    }

    #[test]
    fn boundary_radius_is_inclusive() {
        let (lat, lon) = (-6.2125, 106.8456);
        let distance = haversine_km(OFFICE.latitude, OFFICE.longitude, lat, lon);

        let at_radius = GeofenceValidator::new(OfficeAnchor {
            allowed_radius_km: distance,
            ..OFFICE
        });
        assert!(
            at_radius
                .validate(&coord(lat), &coord(lon), None)
                .unwrap()
                .is_valid
        );

        let radius_just_short = GeofenceValidator::new(OfficeAnchor {
            allowed_radius_km: distance - 1e-9,
            ..OFFICE
        });
        match radius_just_short
            .validate(&coord(lat), &coord(lon), None)
            .unwrap_err()
        {
            GeofenceError::OutOfRange {
                distance_km,
                max_allowed_km,
            } => {
                assert_eq!(distance_km, round2(distance));
                assert_eq!(max_allowed_km, distance - 1e-9);
            }
            other => panic!("expected OutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn zero_zero_always_fails_regardless_of_anchor() {
        let near_null_island = GeofenceValidator::new(OfficeAnchor {
            latitude: 0.001,
            longitude: 0.001,
            allowed_radius_km: 100.0,
        });
        assert_eq!(
            near_null_island
                .validate(&coord(0.0), &coord(0.0), None)
                .unwrap_err(),
            GeofenceError::InvalidCoordinates
        );
    }

    #[test]
    fn out_of_range_message_carries_rounded_distance() {
        let v = GeofenceValidator::new(OFFICE);
        let err = v
            .validate(&coord(-6.3000), &coord(106.8456), None)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("km"), "message should include distance: {msg}");
        assert!(msg.contains("0.50km"), "message should include maximum: {msg}");
    }

    #[test]
    fn low_accuracy_rejected_before_spoof_checks() {
        let v = GeofenceValidator::new(OFFICE);
        let sample = LocationSample {
            accuracy: Some(80.0),
            // would also trip the zero speed/heading heuristic
            altitude: None,
            speed: Some(0.0),
            heading: Some(0.0),
            timestamp_ms: None,
        };
        assert_eq!(
            v.validate(
                &coord(OFFICE.latitude),
                &coord(OFFICE.longitude),
                Some(&sample)
            )
            .unwrap_err(),
            GeofenceError::LowAccuracy { accuracy: 80.0 }
        );
    }

    #[test]
    fn honest_sample_passes() {
        let now_ms = Utc::now().timestamp_millis();
        let v = GeofenceValidator::new(OFFICE);
        let result = v
            .validate(
                &coord(OFFICE.latitude),
                &coord(OFFICE.longitude),
                Some(&honest_sample(now_ms)),
            )
            .unwrap();
        assert!(result.is_valid);
    }

    #[test]
    fn perfect_accuracy_is_spoofed() {
        let now_ms = 1_700_000_000_000;
        let mut sample = honest_sample(now_ms);
        sample.accuracy = Some(0.0);
        assert!(looks_spoofed(&coord(-6.2088), &coord(106.8456), &sample, now_ms));
        sample.accuracy = Some(2.9);
        assert!(looks_spoofed(&coord(-6.2088), &coord(106.8456), &sample, now_ms));
    }

    #[test]
    fn synthetic_precision_patterns() {
        assert!(synthetic_precision("-6.123456789"));
        assert!(synthetic_precision("-6.210000"));
        assert!(synthetic_precision("106.129999"));
        assert!(!synthetic_precision("-6.2088"));
        assert!(!synthetic_precision("106.0"));
        assert!(!synthetic_precision("106"));
    }

    #[test]
    fn trailing_zero_wire_text_is_spoofed() {
        // "-6.210000" parses to the same f64 as "-6.21"; only the
        // preserved wire text makes the zero padding visible.
        let now_ms = Utc::now().timestamp_millis();
        let latitude = Coordinate::parse("-6.210000").unwrap();
        let longitude = Coordinate::parse("106.8456").unwrap();
        assert_eq!(latitude.value(), -6.21);

        let v = GeofenceValidator::new(OFFICE);
        assert_eq!(
            v.validate(&latitude, &longitude, Some(&honest_sample(now_ms)))
                .unwrap_err(),
            GeofenceError::SuspectedSpoofedLocation
        );
    }

    #[test]
    fn integral_altitude_with_tight_accuracy_is_spoofed() {
        let now_ms = 1_700_000_000_000;
        let mut sample = honest_sample(now_ms);
        sample.accuracy = Some(8.0);
        sample.altitude = Some(25.0);
        assert!(looks_spoofed(&coord(-6.2088), &coord(106.8456), &sample, now_ms));

        // same altitude but a looser accuracy claim passes
        sample.accuracy = Some(15.0);
        sample.speed = Some(0.5);
        assert!(!looks_spoofed(&coord(-6.2088), &coord(106.8456), &sample, now_ms));
    }

    #[test]
    fn zero_speed_and_heading_with_good_fix_is_spoofed() {
        let now_ms = 1_700_000_000_000;
        let mut sample = honest_sample(now_ms);
        sample.speed = Some(0.0);
        sample.heading = Some(0.0);
        assert!(looks_spoofed(&coord(-6.2088), &coord(106.8456), &sample, now_ms));
    }

    #[test]
    fn stale_missing_or_future_timestamps_are_spoofed() {
        let now_ms = 1_700_000_000_000;
        let lat = coord(-6.2088);
        let lon = coord(106.8456);
        let mut sample = honest_sample(now_ms);

        sample.timestamp_ms = None;
        assert!(looks_spoofed(&lat, &lon, &sample, now_ms));

        sample.timestamp_ms = Some(now_ms - 61_000);
        assert!(looks_spoofed(&lat, &lon, &sample, now_ms));

        sample.timestamp_ms = Some(now_ms + 6_000);
        assert!(looks_spoofed(&lat, &lon, &sample, now_ms));

        sample.timestamp_ms = Some(now_ms + 4_000);
        assert!(!looks_spoofed(&lat, &lon, &sample, now_ms));
    }
}
