//! Typed view models handed to renderers.
//!
//! A [`ViewEnvelope`] carries either data or an error message, never both.
//! Renderers (JSON over HTTP, text in the CLI) work from these structs alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::efficacy::EfficacyReport;
use crate::error::Error;
use crate::family::FamilyName;
use crate::map::MapProjection;
use crate::record::GpsCoordinate;
use crate::status::{DeviceSighting, DeviceStatus};

/// Dashboard content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    /// Lookback used for the data below.
    pub window_minutes: i64,
    /// Devices, most recently seen first.
    pub devices: Vec<DeviceStatus>,
    /// Classifier accuracy over the window.
    pub efficacy: EfficacyReport,
}

/// Map content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    /// Markers and center.
    pub projection: MapProjection,
}

/// One entry of a family's location list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSummary {
    /// Location label.
    pub label: String,
    /// Same key the map uses for this label.
    pub location_hash: String,
    /// Coordinate, if the location is resolved.
    pub gps: Option<GpsCoordinate>,
}

/// Every location a family knows, sorted by label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationsView {
    /// The locations.
    pub locations: Vec<LocationSummary>,
    /// How many of them have no coordinate.
    pub unresolved: usize,
}

/// One device's recent history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceView {
    /// Lookback used for the data below.
    pub window_minutes: i64,
    /// Summary row, as on the dashboard.
    pub status: DeviceStatus,
    /// Records inside the window, newest first.
    pub sightings: Vec<DeviceSighting>,
}

/// A rendered-or-failed view for one family.
///
/// When `error` is set it is authoritative, whatever transport status
/// accompanies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewEnvelope<T> {
    /// Normalized family name.
    pub family: String,
    /// When the view was assembled.
    pub generated_at: DateTime<Utc>,
    /// Human-readable failure, if the view could not be built.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// View content on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ViewEnvelope<T> {
    /// A successful view.
    #[must_use]
    pub fn ok(family: &FamilyName, generated_at: DateTime<Utc>, data: T) -> Self {
        Self {
            family: family.to_string(),
            generated_at,
            error: None,
            data: Some(data),
        }
    }

    /// A failed view.
    #[must_use]
    pub fn failed(family: impl Into<String>, generated_at: DateTime<Utc>, error: &Error) -> Self {
        Self {
            family: family.into(),
            generated_at,
            error: Some(error.to_string()),
            data: None,
        }
    }

    /// Whether the view carries data.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Dashboard envelope.
pub type DashboardEnvelope = ViewEnvelope<DashboardView>;

/// Map envelope.
pub type MapEnvelope = ViewEnvelope<MapView>;

/// Location list envelope.
pub type LocationsEnvelope = ViewEnvelope<LocationsView>;

/// Single-device envelope.
pub type DeviceEnvelope = ViewEnvelope<DeviceView>;
