//! The tenant store seam.
//!
//! The analytics pipeline only ever talks to a family dataset through these
//! two traits. [`crate::storage::SqliteGateway`] is the bundled
//! implementation; tests and alternative backends can supply their own.

use crate::error::Result;
use crate::family::FamilyName;
use crate::record::{Location, SensorRecord};

/// Opens per-family datasets.
pub trait Gateway: Send + Sync {
    /// The open dataset. Dropping it closes the family.
    type Handle: FamilyHandle;

    /// Open an existing family.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FamilyNotFound`] if the family has never been
    /// written to, or a store error if the dataset cannot be opened.
    fn open_family(&self, family: &FamilyName) -> Result<Self::Handle>;

    /// Delete a family and everything it owns.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FamilyNotFound`] if the family does not exist.
    fn delete_family(&self, family: &FamilyName) -> Result<()>;
}

/// Read access to one open family.
pub trait FamilyHandle {
    /// The family this handle was opened for.
    fn family(&self) -> &FamilyName;

    /// All sensor records with `timestamp >= cutoff_ms`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    fn read_sensors_since(&self, cutoff_ms: i64) -> Result<Vec<SensorRecord>>;

    /// Every location the family knows about, resolved or not.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    fn list_locations(&self) -> Result<Vec<Location>>;

    /// Remove one location and the sensor records classified to it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LocationNotFound`] if the label is unknown.
    fn delete_location(&self, label: &str) -> Result<()>;
}
