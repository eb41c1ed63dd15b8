//! Core record types for wayfinder.
//!
//! These are the rows the tenant store hands back: classified sensor
//! readings and the location labels they refer to.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque signal fingerprint: sensor type, then emitter id, then reading.
///
/// The analytics layer never looks inside; it is stored and returned as-is.
pub type Fingerprint = BTreeMap<String, BTreeMap<String, f64>>;

/// A single timestamped sensor reading from one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    /// Opaque device identifier.
    pub device: String,

    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,

    /// Raw signal data the classifier worked from.
    #[serde(default)]
    pub fingerprint: Fingerprint,

    /// Location label the classifier predicted (or the user supplied).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classified_location: Option<String>,

    /// Classifier confidence for `classified_location`, 0-100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,

    /// Ground truth for calibration records: whether the prediction matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
}

impl SensorRecord {
    /// Create an unclassified record.
    #[must_use]
    pub fn new(device: impl Into<String>, timestamp: i64) -> Self {
        Self {
            device: device.into(),
            timestamp,
            fingerprint: Fingerprint::new(),
            classified_location: None,
            confidence: None,
            correct: None,
        }
    }

    /// Attach a classification result.
    #[must_use]
    pub fn classified(mut self, location: impl Into<String>, confidence: u8) -> Self {
        self.classified_location = Some(location.into());
        self.confidence = Some(confidence.min(100));
        self
    }

    /// Mark this record as calibration data with the given outcome.
    #[must_use]
    pub fn calibrated(mut self, correct: bool) -> Self {
        self.correct = Some(correct);
        self
    }

    /// Add one reading to the fingerprint.
    #[must_use]
    pub fn with_reading(
        mut self,
        sensor: impl Into<String>,
        emitter: impl Into<String>,
        value: f64,
    ) -> Self {
        self.fingerprint
            .entry(sensor.into())
            .or_default()
            .insert(emitter.into(), value);
        self
    }

    /// Whether this record carries calibration ground truth.
    #[must_use]
    pub fn is_calibration(&self) -> bool {
        self.correct.is_some()
    }

    /// The record timestamp as a UTC datetime, if representable.
    #[must_use]
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoordinate {
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
}

impl GpsCoordinate {
    /// Create a coordinate.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A named place within a family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Unique label within the family.
    pub label: String,

    /// Geographic position, absent for indoor-only locations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps: Option<GpsCoordinate>,
}

impl Location {
    /// A location without a coordinate.
    #[must_use]
    pub fn unresolved(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            gps: None,
        }
    }

    /// A location at the given coordinate.
    #[must_use]
    pub fn at(label: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            label: label.into(),
            gps: Some(GpsCoordinate::new(latitude, longitude)),
        }
    }
}
