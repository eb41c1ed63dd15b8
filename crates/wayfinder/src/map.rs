//! GPS resolution and map projection.
//!
//! Turns a family's location list into map markers and a center point.
//! How unresolved locations affect the center is a [`CentroidPolicy`]
//! choice; see its variants.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::{GpsCoordinate, Location};

/// Number of hex characters kept from the label digest.
const HASH_HEX_LEN: usize = 32;

/// Stable marker key for a location label.
///
/// BLAKE3 of the label bytes, hex encoded and truncated. The same label
/// always yields the same key, across calls and restarts.
#[must_use]
pub fn location_hash(label: &str) -> String {
    let mut hex = blake3::hash(label.as_bytes()).to_hex().to_string();
    hex.truncate(HASH_HEX_LEN);
    hex
}

/// How locations without a coordinate contribute to the map center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentroidPolicy {
    /// Average resolved coordinates only; unresolved ones are counted
    /// separately.
    #[default]
    ResolvedOnly,
    /// Average over every location, treating unresolved ones as `(0, 0)`.
    Naive,
}

impl fmt::Display for CentroidPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResolvedOnly => write!(f, "resolved_only"),
            Self::Naive => write!(f, "naive"),
        }
    }
}

/// One resolved location on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMarker {
    /// Stable key from [`location_hash`].
    pub location_hash: String,
    /// Location label.
    pub label: String,
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
}

/// Markers and center for a family's locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapProjection {
    /// Resolved locations, sorted by label.
    pub markers: Vec<MapMarker>,
    /// Map center, `None` when there is nothing to center on.
    pub center: Option<GpsCoordinate>,
    /// Locations that had no coordinate.
    pub unresolved: usize,
    /// All locations considered.
    pub total_locations: usize,
    /// Policy used for `center`.
    pub policy: CentroidPolicy,
}

impl MapProjection {
    /// The projection of zero locations.
    #[must_use]
    pub fn empty(policy: CentroidPolicy) -> Self {
        Self {
            markers: Vec::new(),
            center: None,
            unresolved: 0,
            total_locations: 0,
            policy,
        }
    }

    /// Project a family's full location set.
    #[must_use]
    pub fn project(locations: &[Location], policy: CentroidPolicy) -> Self {
        if locations.is_empty() {
            return Self::empty(policy);
        }

        let mut markers: Vec<MapMarker> = locations
            .iter()
            .filter_map(|location| {
                location.gps.map(|gps| MapMarker {
                    location_hash: location_hash(&location.label),
                    label: location.label.clone(),
                    latitude: gps.latitude,
                    longitude: gps.longitude,
                })
            })
            .collect();
        markers.sort_by(|a, b| a.label.cmp(&b.label));

        let total_locations = locations.len();
        let unresolved = total_locations - markers.len();

        let divisor = match policy {
            CentroidPolicy::ResolvedOnly => markers.len(),
            CentroidPolicy::Naive => total_locations,
        };
        let center = mean_of(&markers, divisor);

        Self {
            markers,
            center,
            unresolved,
            total_locations,
            policy,
        }
    }

    /// Whether there is nothing to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Sum of marker coordinates divided by `divisor`; `None` when it is zero.
#[allow(clippy::cast_precision_loss)]
fn mean_of(markers: &[MapMarker], divisor: usize) -> Option<GpsCoordinate> {
    if divisor == 0 {
        return None;
    }
    let (lat, lon) = markers
        .iter()
        .fold((0.0, 0.0), |(lat, lon), m| (lat + m.latitude, lon + m.longitude));
    let n = divisor as f64;
    Some(GpsCoordinate::new(lat / n, lon / n))
}
