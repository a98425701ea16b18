//! Great-circle distance and geofence matching.
//!
//! Consumer GPS at a ~7 m fence radius is noisy, so matching is graduated
//! rather than binary: a reading is scored against every fence using the
//! effective distance (haversine minus reported accuracy, the best case
//! position inside the accuracy circle) and the winner is classified as
//! confident, likely, or unknown. Callers auto-approve confident matches,
//! confirm likely ones, and fall back to manual shop selection otherwise.

use serde::{Deserialize, Serialize};

use crate::catalog::VendorKey;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Accuracy ceiling (meters) above which a match is never confident.
const CONFIDENT_MAX_ACCURACY: f64 = 75.0;

/// Score penalty pushing out-of-fence candidates after every in-fence one
/// while keeping them ordered by distance for diagnostics.
const OUT_OF_FENCE_PENALTY: f64 = 1e11;

/// Haversine great-circle distance in meters between two lat/lng points.
pub fn distance_meters(a_lat: f64, a_lng: f64, b_lat: f64, b_lng: f64) -> f64 {
    let d_lat = (b_lat - a_lat).to_radians();
    let d_lng = (b_lng - a_lng).to_radians();
    let s1 = (d_lat / 2.0).sin();
    let s2 = (d_lng / 2.0).sin();
    let a = s1 * s1 + a_lat.to_radians().cos() * b_lat.to_radians().cos() * s2 * s2;
    2.0 * EARTH_RADIUS_METERS * a.sqrt().asin()
}

/// A single client-reported location fix with its uncertainty radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoReading {
    pub lat: f64,
    pub lng: f64,
    /// Reported uncertainty radius in meters. Absent on the wire means zero.
    #[serde(default)]
    pub accuracy: f64,
}

/// Circular boundary around one vendor location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub vendor: VendorKey,
    pub lat: f64,
    pub lng: f64,
    pub radius_meters: f64,
}

impl Geofence {
    /// Best-case proximity: measured distance minus the reading's accuracy.
    pub fn effective_distance(&self, reading: &GeoReading) -> f64 {
        distance_meters(reading.lat, reading.lng, self.lat, self.lng) - reading.accuracy
    }

    /// Single source of truth for the in-fence test used by both matching
    /// and redemption validation.
    pub fn contains(&self, reading: &GeoReading) -> bool {
        self.effective_distance(reading) <= self.radius_meters
    }
}

/// Confidence tier for a geofence match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchConfidence {
    Confident,
    Likely,
    Unknown,
}

/// Best-ranked fence for a reading, reported even at unknown confidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub vendor: VendorKey,
    pub distance_meters: f64,
    pub effective_distance: f64,
}

/// Outcome of ranking a reading against the configured fences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub candidate: Option<MatchCandidate>,
    pub confidence: MatchConfidence,
}

impl MatchResult {
    fn unknown() -> Self {
        Self {
            candidate: None,
            confidence: MatchConfidence::Unknown,
        }
    }
}

/// Ordered, immutable set of vendor geofences loaded at startup.
///
/// Iteration order is the configured order; score ties resolve to the first
/// fence, making the tie-break explicit and stable.
#[derive(Debug, Clone, Default)]
pub struct GeofenceSet {
    fences: Vec<Geofence>,
}

impl GeofenceSet {
    pub fn new(fences: Vec<Geofence>) -> Self {
        Self { fences }
    }

    pub fn is_empty(&self) -> bool {
        self.fences.is_empty()
    }

    pub fn fence_for(&self, vendor: &VendorKey) -> Option<&Geofence> {
        self.fences.iter().find(|fence| &fence.vendor == vendor)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Geofence> {
        self.fences.iter()
    }

    /// Rank every fence for the reading and classify the winner.
    pub fn evaluate(&self, reading: Option<&GeoReading>) -> MatchResult {
        let reading = match reading {
            Some(reading) => reading,
            None => return MatchResult::unknown(),
        };

        let mut best: Option<(&Geofence, f64, f64)> = None;
        for fence in &self.fences {
            let effective = fence.effective_distance(reading);
            let score = if effective <= fence.radius_meters {
                effective
            } else {
                OUT_OF_FENCE_PENALTY + effective
            };
            let beats = match &best {
                Some((_, _, best_score)) => score < *best_score,
                None => true,
            };
            if beats {
                best = Some((fence, effective, score));
            }
        }

        let (fence, effective, _) = match best {
            Some(found) => found,
            None => return MatchResult::unknown(),
        };

        let confidence = if effective <= fence.radius_meters / 2.0
            && reading.accuracy <= CONFIDENT_MAX_ACCURACY
        {
            MatchConfidence::Confident
        } else if effective <= fence.radius_meters {
            MatchConfidence::Likely
        } else {
            MatchConfidence::Unknown
        };

        MatchResult {
            candidate: Some(MatchCandidate {
                vendor: fence.vendor.clone(),
                distance_meters: effective + reading.accuracy,
                effective_distance: effective,
            }),
            confidence,
        }
    }
}
