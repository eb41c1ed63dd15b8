//! Sensor window aggregation.
//!
//! Pulls the records a family reported within a lookback window and groups
//! them by device. Everything downstream (efficacy, device status) reads
//! from the [`SensorWindow`] built here.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::gateway::FamilyHandle;
use crate::record::SensorRecord;

/// A positive lookback duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Window {
    minutes: i64,
}

impl Window {
    /// Window used by the dashboard when nothing else is configured.
    pub const DEFAULT_MINUTES: i64 = 60;

    /// Create a window of the given length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWindow`] unless `minutes` is positive.
    pub fn from_minutes(minutes: i64) -> Result<Self> {
        // Upper bound keeps `minutes * 60_000` inside i64.
        if minutes <= 0 || minutes > i64::MAX / 60_000 {
            return Err(Error::InvalidWindow { minutes });
        }
        Ok(Self { minutes })
    }

    /// Window length in minutes.
    #[must_use]
    pub fn minutes(&self) -> i64 {
        self.minutes
    }

    /// Window length as a duration.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::minutes(self.minutes)
    }

    /// Earliest timestamp (ms) inside the window ending at `now`.
    #[must_use]
    pub fn cutoff_ms(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp_millis()
            .saturating_sub(self.minutes * 60_000)
    }
}

impl Default for Window {
    fn default() -> Self {
        Self {
            minutes: Self::DEFAULT_MINUTES,
        }
    }
}

impl TryFrom<i64> for Window {
    type Error = Error;

    fn try_from(minutes: i64) -> Result<Self> {
        Self::from_minutes(minutes)
    }
}

impl From<Window> for i64 {
    fn from(window: Window) -> Self {
        window.minutes
    }
}

/// The records one family reported inside a window.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorWindow {
    /// The window that was read.
    pub window: Window,
    /// Inclusive lower bound on record timestamps (ms).
    pub cutoff_ms: i64,
    /// Records in gateway order, oldest first.
    pub records: Vec<SensorRecord>,
    /// Distinct devices seen in `records`.
    pub devices: BTreeSet<String>,
}

impl SensorWindow {
    /// Build a window from records that were already read.
    #[must_use]
    pub fn from_records(window: Window, cutoff_ms: i64, records: Vec<SensorRecord>) -> Self {
        let devices = records.iter().map(|r| r.device.clone()).collect();
        Self {
            window,
            cutoff_ms,
            records,
            devices,
        }
    }

    /// Read the window ending at `now` from an open family.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors unchanged.
    pub fn read<H: FamilyHandle>(handle: &H, window: Window, now: DateTime<Utc>) -> Result<Self> {
        let started = std::time::Instant::now();
        let cutoff_ms = window.cutoff_ms(now);
        let records = handle.read_sensors_since(cutoff_ms)?;
        debug!(
            "[{}] got {} sensor records since {} in {:?}",
            handle.family(),
            records.len(),
            cutoff_ms,
            started.elapsed()
        );

        let sensor_window = Self::from_records(window, cutoff_ms, records);
        debug!(
            "[{}] found {} devices to check",
            handle.family(),
            sensor_window.devices.len()
        );
        Ok(sensor_window)
    }

    /// Records grouped per device, each group in gateway order.
    #[must_use]
    pub fn by_device(&self) -> BTreeMap<&str, Vec<&SensorRecord>> {
        let mut groups: BTreeMap<&str, Vec<&SensorRecord>> = BTreeMap::new();
        for record in &self.records {
            groups.entry(record.device.as_str()).or_default().push(record);
        }
        groups
    }

    /// One device's records, in gateway order.
    #[must_use]
    pub fn for_device(&self, device: &str) -> Vec<&SensorRecord> {
        self.records.iter().filter(|r| r.device == device).collect()
    }

    /// Records carrying calibration ground truth.
    pub fn calibration_records(&self) -> impl Iterator<Item = &SensorRecord> {
        self.records.iter().filter(|r| r.is_calibration())
    }

    /// Whether the window holds no records at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::FamilyName;
    use crate::storage::FamilyStore;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
    }

    fn minutes_before_now(minutes: i64) -> i64 {
        (fixed_now() - Duration::minutes(minutes)).timestamp_millis()
    }

    #[test]
    fn test_window_rejects_non_positive() {
        assert!(matches!(
            Window::from_minutes(0),
            Err(Error::InvalidWindow { minutes: 0 })
        ));
        assert!(Window::from_minutes(-1).is_err());
        assert!(Window::from_minutes(i64::MAX).is_err());
    }

    #[test]
    fn test_window_default_is_an_hour() {
        let window = Window::default();
        assert_eq!(window.minutes(), 60);
        assert_eq!(window.duration(), Duration::hours(1));
    }

    #[test]
    fn test_window_cutoff() {
        let window = Window::from_minutes(60).unwrap();
        assert_eq!(window.cutoff_ms(fixed_now()), minutes_before_now(60));
    }

    #[test]
    fn test_window_deserialize_validates() {
        let window: Window = serde_json::from_str("15").unwrap();
        assert_eq!(window.minutes(), 15);
        assert!(serde_json::from_str::<Window>("0").is_err());
    }

    #[test]
    fn test_distinct_devices_collapse_duplicates() {
        let records = vec![
            SensorRecord::new("A1", 1),
            SensorRecord::new("B2", 2),
            SensorRecord::new("A1", 3),
        ];
        let window = SensorWindow::from_records(Window::default(), 0, records);

        let devices: Vec<&str> = window.devices.iter().map(String::as_str).collect();
        assert_eq!(devices, vec!["A1", "B2"]);
    }

    #[test]
    fn test_by_device_preserves_order() {
        let records = vec![
            SensorRecord::new("A1", 1),
            SensorRecord::new("B2", 2),
            SensorRecord::new("A1", 3),
        ];
        let window = SensorWindow::from_records(Window::default(), 0, records);
        let groups = window.by_device();

        let a1: Vec<i64> = groups["A1"].iter().map(|r| r.timestamp).collect();
        assert_eq!(a1, vec![1, 3]);
        assert_eq!(groups["B2"].len(), 1);
    }

    #[test]
    fn test_for_device_filters() {
        let records = vec![
            SensorRecord::new("A1", 1),
            SensorRecord::new("B2", 2),
            SensorRecord::new("A1", 3),
        ];
        let window = SensorWindow::from_records(Window::default(), 0, records);

        let a1: Vec<i64> = window.for_device("A1").iter().map(|r| r.timestamp).collect();
        assert_eq!(a1, vec![1, 3]);
        assert!(window.for_device("C3").is_empty());
    }

    #[test]
    fn test_read_applies_cutoff() {
        let store = FamilyStore::open_in_memory(FamilyName::parse("office").unwrap()).unwrap();
        store
            .insert_sensor(&SensorRecord::new("old", minutes_before_now(61)))
            .unwrap();
        store
            .insert_sensor(&SensorRecord::new("edge", minutes_before_now(60)))
            .unwrap();
        store
            .insert_sensor(&SensorRecord::new("fresh", minutes_before_now(5)))
            .unwrap();

        let window = SensorWindow::read(&store, Window::default(), fixed_now()).unwrap();

        assert_eq!(window.records.len(), 2);
        assert!(!window.devices.contains("old"));
        assert!(window.devices.contains("edge"));
        assert!(window.devices.contains("fresh"));
    }

    #[test]
    fn test_empty_window() {
        let store = FamilyStore::open_in_memory(FamilyName::parse("office").unwrap()).unwrap();
        let window = SensorWindow::read(&store, Window::default(), fixed_now()).unwrap();
        assert!(window.is_empty());
        assert!(window.devices.is_empty());
        assert!(window.by_device().is_empty());
    }

    #[test]
    fn test_calibration_records_filter() {
        let records = vec![
            SensorRecord::new("A1", 1).calibrated(true),
            SensorRecord::new("A1", 2),
        ];
        let window = SensorWindow::from_records(Window::default(), 0, records);
        assert_eq!(window.calibration_records().count(), 1);
    }
}
