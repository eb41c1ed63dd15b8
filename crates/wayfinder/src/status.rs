//! Per-device status for the dashboard table.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::SensorWindow;
use crate::record::SensorRecord;

/// Where a device was last seen and for how long it has been reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// Device identifier.
    pub device: String,
    /// Location of the newest record, if it was classified.
    pub last_location: Option<String>,
    /// Timestamp (ms) of the newest record.
    pub last_seen: i64,
    /// Classifier confidence of the newest record, 0-100.
    pub confidence: u8,
    /// Newest minus oldest record timestamp within the window (ms).
    pub active_time_ms: i64,
}

impl DeviceStatus {
    /// Project one device's records, or `None` if there are none.
    ///
    /// Among records sharing the newest timestamp the last one read wins.
    #[must_use]
    pub fn from_records(device: &str, records: &[&SensorRecord]) -> Option<Self> {
        let latest = records.iter().max_by_key(|r| r.timestamp)?;
        let earliest = records.iter().map(|r| r.timestamp).min()?;

        Some(Self {
            device: device.to_string(),
            last_location: latest.classified_location.clone(),
            last_seen: latest.timestamp,
            confidence: latest.confidence.unwrap_or(0),
            active_time_ms: latest.timestamp.saturating_sub(earliest),
        })
    }

    /// Active time as a duration.
    #[must_use]
    pub fn active_time(&self) -> Duration {
        Duration::milliseconds(self.active_time_ms)
    }

    /// Last-seen time as a UTC datetime, if representable.
    #[must_use]
    pub fn last_seen_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.last_seen)
    }
}

/// One record of a device, as shown in its history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSighting {
    /// Record timestamp (ms).
    pub timestamp: i64,
    /// Classified location, if any.
    pub location: Option<String>,
    /// Classifier confidence, 0-100.
    pub confidence: u8,
}

impl From<&SensorRecord> for DeviceSighting {
    fn from(record: &SensorRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            location: record.classified_location.clone(),
            confidence: record.confidence.unwrap_or(0),
        }
    }
}

/// A device's records as sightings, newest first.
///
/// Records sharing a timestamp keep the later-read one first, matching
/// which record [`DeviceStatus::from_records`] treats as latest.
#[must_use]
pub fn sightings(records: &[&SensorRecord]) -> Vec<DeviceSighting> {
    let mut sightings: Vec<DeviceSighting> = records
        .iter()
        .rev()
        .map(|record| DeviceSighting::from(*record))
        .collect();
    sightings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sightings
}

/// Status of every device in the window, most recently seen first.
///
/// Devices seen at the same instant are ordered by id so the list is stable
/// across identical inputs.
#[must_use]
pub fn project(window: &SensorWindow) -> Vec<DeviceStatus> {
    let mut statuses: Vec<DeviceStatus> = window
        .by_device()
        .into_iter()
        .filter_map(|(device, records)| DeviceStatus::from_records(device, &records))
        .collect();

    statuses.sort_by(|a, b| {
        b.last_seen
            .cmp(&a.last_seen)
            .then_with(|| a.device.cmp(&b.device))
    });
    statuses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Window;

    fn window_of(records: Vec<SensorRecord>) -> SensorWindow {
        SensorWindow::from_records(Window::default(), 0, records)
    }

    #[test]
    fn test_single_record_has_zero_active_time() {
        let window = window_of(vec![SensorRecord::new("A1", 500).classified("kitchen", 70)]);
        let statuses = project(&window);

        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].active_time_ms, 0);
        assert_eq!(statuses[0].active_time(), Duration::zero());
        assert_eq!(statuses[0].last_seen, 500);
    }

    #[test]
    fn test_latest_record_wins() {
        let window = window_of(vec![
            SensorRecord::new("A1", 1_000).classified("kitchen", 70),
            SensorRecord::new("A1", 9_000).classified("lobby", 42),
            SensorRecord::new("A1", 4_000).classified("attic", 99),
        ]);
        let status = &project(&window)[0];

        assert_eq!(status.last_location.as_deref(), Some("lobby"));
        assert_eq!(status.confidence, 42);
        assert_eq!(status.last_seen, 9_000);
        assert_eq!(status.active_time_ms, 8_000);
    }

    #[test]
    fn test_tied_timestamps_take_last_read() {
        let window = window_of(vec![
            SensorRecord::new("A1", 5).classified("kitchen", 10),
            SensorRecord::new("A1", 5).classified("lobby", 20),
        ]);
        assert_eq!(project(&window)[0].last_location.as_deref(), Some("lobby"));
    }

    #[test]
    fn test_unclassified_latest_record() {
        let window = window_of(vec![
            SensorRecord::new("A1", 1).classified("kitchen", 70),
            SensorRecord::new("A1", 2),
        ]);
        let status = &project(&window)[0];
        assert!(status.last_location.is_none());
        assert_eq!(status.confidence, 0);
    }

    #[test]
    fn test_sorted_by_last_seen_descending() {
        let window = window_of(vec![
            SensorRecord::new("old", 100),
            SensorRecord::new("new", 300),
            SensorRecord::new("mid", 200),
            SensorRecord::new("old", 150),
        ]);
        let devices: Vec<String> = project(&window).into_iter().map(|s| s.device).collect();
        assert_eq!(devices, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_ties_ordered_by_device_and_stable() {
        let records = vec![
            SensorRecord::new("zed", 100),
            SensorRecord::new("amy", 100),
            SensorRecord::new("kit", 100),
        ];
        let first = project(&window_of(records.clone()));
        let mut reversed = records;
        reversed.reverse();
        let second = project(&window_of(reversed));

        let devices: Vec<&str> = first.iter().map(|s| s.device.as_str()).collect();
        assert_eq!(devices, vec!["amy", "kit", "zed"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_window_has_no_devices() {
        assert!(project(&window_of(Vec::new())).is_empty());
    }

    #[test]
    fn test_from_records_empty_is_none() {
        assert!(DeviceStatus::from_records("A1", &[]).is_none());
    }

    #[test]
    fn test_active_time_does_not_overflow() {
        let early = SensorRecord::new("A1", i64::MIN + 1);
        let late = SensorRecord::new("A1", i64::MAX);
        let status = DeviceStatus::from_records("A1", &[&early, &late]).unwrap();
        assert_eq!(status.active_time_ms, i64::MAX);
    }

    #[test]
    fn test_sightings_newest_first() {
        let a = SensorRecord::new("A1", 1_000).classified("kitchen", 70);
        let b = SensorRecord::new("A1", 3_000).classified("lobby", 40);
        let c = SensorRecord::new("A1", 3_000).classified("attic", 90);
        let d = SensorRecord::new("A1", 2_000);

        let list = sightings(&[&a, &b, &c, &d]);
        let order: Vec<(i64, Option<&str>)> = list
            .iter()
            .map(|s| (s.timestamp, s.location.as_deref()))
            .collect();
        assert_eq!(
            order,
            vec![
                (3_000, Some("attic")),
                (3_000, Some("lobby")),
                (2_000, None),
                (1_000, Some("kitchen")),
            ]
        );
        assert_eq!(list[2].confidence, 0);
    }

    #[test]
    fn test_last_seen_at() {
        let status = DeviceStatus::from_records("A1", &[&SensorRecord::new("A1", 60_000)]).unwrap();
        assert_eq!(status.last_seen_at().unwrap().timestamp(), 60);
    }
}
