//! Classification accuracy over calibration records.
//!
//! Percentages use integer floor division everywhere, and the aggregate is
//! computed from summed counts rather than averaged per-location figures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::SensorWindow;
use crate::record::SensorRecord;

/// Label used for calibration records the classifier left unlabeled.
pub const UNKNOWN_LOCATION: &str = "unknown";

/// Accuracy for one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationEfficacy {
    /// Location label.
    pub name: String,
    /// Calibration records classified to this location.
    pub total_count: u64,
    /// Share of those that were correct, 0-100, rounded down.
    pub percent_correct: u64,
}

/// Accuracy across a window.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EfficacyReport {
    /// Per-location breakdown, sorted by name.
    pub per_location: Vec<LocationEfficacy>,
    /// Calibration records considered.
    pub total_count: u64,
    /// Overall share correct, 0-100, rounded down. 0 when `total_count` is 0.
    pub percent_correct: u64,
    /// Newest calibration timestamp (ms), if any.
    pub last_calibration_time: Option<i64>,
}

impl EfficacyReport {
    /// Compute the report for a window.
    #[must_use]
    pub fn from_window(window: &SensorWindow) -> Self {
        Self::from_records(window.calibration_records())
    }

    /// Compute the report from calibration records.
    ///
    /// Records without a `correct` flag are skipped.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a SensorRecord>) -> Self {
        // label -> (total, correct)
        let mut groups: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
        let mut last_calibration_time: Option<i64> = None;

        for record in records {
            let Some(correct) = record.correct else {
                continue;
            };
            let label = record
                .classified_location
                .as_deref()
                .unwrap_or(UNKNOWN_LOCATION);
            let entry = groups.entry(label).or_default();
            entry.0 += 1;
            if correct {
                entry.1 += 1;
            }
            last_calibration_time = Some(
                last_calibration_time.map_or(record.timestamp, |t| t.max(record.timestamp)),
            );
        }

        let mut total_count = 0;
        let mut total_correct = 0;
        let per_location = groups
            .into_iter()
            .map(|(name, (total, correct))| {
                total_count += total;
                total_correct += correct;
                LocationEfficacy {
                    name: name.to_string(),
                    total_count: total,
                    percent_correct: percent(correct, total),
                }
            })
            .collect();

        Self {
            per_location,
            total_count,
            percent_correct: percent(total_correct, total_count),
            last_calibration_time,
        }
    }

    /// Whether any calibration data backed this report.
    #[must_use]
    pub fn has_calibration_data(&self) -> bool {
        self.total_count > 0
    }
}

/// `100 * part / whole`, rounded down, with 0 for an empty whole.
fn percent(part: u64, whole: u64) -> u64 {
    if whole == 0 {
        0
    } else {
        part.saturating_mul(100) / whole
    }
}
