//! The analytics pipeline.
//!
//! [`Analytics`] owns a [`Gateway`] and the configured defaults. Each call
//! opens the family, reads what it needs, releases the handle and derives
//! the view. Nothing is kept between calls.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::aggregate::{SensorWindow, Window};
use crate::config::Config;
use crate::efficacy::EfficacyReport;
use crate::error::{Error, Result};
use crate::family::FamilyName;
use crate::gateway::{FamilyHandle, Gateway};
use crate::map::{location_hash, CentroidPolicy, MapProjection};
use crate::status::{self, DeviceStatus};
use crate::storage::SqliteGateway;
use crate::view::{
    DashboardEnvelope, DashboardView, DeviceEnvelope, DeviceView, LocationSummary,
    LocationsEnvelope, LocationsView, MapEnvelope, MapView, ViewEnvelope,
};

/// Dashboard and map assembly over a tenant gateway.
#[derive(Debug, Clone)]
pub struct Analytics<G> {
    gateway: G,
    window: Window,
    policy: CentroidPolicy,
}

impl Analytics<SqliteGateway> {
    /// Build the pipeline described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured window is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let gateway = SqliteGateway::new(config.data_dir()).with_busy_timeout(config.busy_timeout());
        Ok(Self::new(gateway, config.window()?, config.map.centroid_policy))
    }
}

impl<G: Gateway> Analytics<G> {
    /// Create a pipeline with explicit defaults.
    #[must_use]
    pub fn new(gateway: G, window: Window, policy: CentroidPolicy) -> Self {
        Self {
            gateway,
            window,
            policy,
        }
    }

    /// The underlying gateway.
    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// The default dashboard window.
    #[must_use]
    pub fn window(&self) -> Window {
        self.window
    }

    /// The centroid policy used for maps.
    #[must_use]
    pub fn policy(&self) -> CentroidPolicy {
        self.policy
    }

    /// Assemble the dashboard for `family` as of `now`.
    ///
    /// Uses the configured window unless `window` is given.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors: [`Error::FamilyNotFound`] for unknown
    /// families, store errors otherwise.
    pub fn dashboard(
        &self,
        family: &FamilyName,
        window: Option<Window>,
        now: DateTime<Utc>,
    ) -> Result<DashboardView> {
        let started = std::time::Instant::now();
        let window = window.unwrap_or(self.window);

        let sensors = {
            let handle = self.gateway.open_family(family)?;
            SensorWindow::read(&handle, window, now)?
        };

        let efficacy = EfficacyReport::from_window(&sensors);
        let devices = status::project(&sensors);
        debug!(
            "[{}] dashboard with {} devices built in {:?}",
            family,
            devices.len(),
            started.elapsed()
        );

        Ok(DashboardView {
            window_minutes: window.minutes(),
            devices,
            efficacy,
        })
    }

    /// Project the map for `family`.
    ///
    /// A family with no locations yields the empty projection, not an error.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors.
    pub fn map(&self, family: &FamilyName) -> Result<MapView> {
        let locations = {
            let handle = self.gateway.open_family(family)?;
            handle.list_locations()?
        };
        debug!("[{}] projecting {} locations", family, locations.len());

        Ok(MapView {
            projection: MapProjection::project(&locations, self.policy),
        })
    }

    /// Every location `family` knows, with the same hash the map uses.
    ///
    /// An empty list is a valid answer.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors.
    pub fn locations(&self, family: &FamilyName) -> Result<LocationsView> {
        let locations = {
            let handle = self.gateway.open_family(family)?;
            handle.list_locations()?
        };

        let locations: Vec<LocationSummary> = locations
            .into_iter()
            .map(|location| LocationSummary {
                location_hash: location_hash(&location.label),
                label: location.label,
                gps: location.gps,
            })
            .collect();
        let unresolved = locations.iter().filter(|l| l.gps.is_none()).count();

        Ok(LocationsView {
            locations,
            unresolved,
        })
    }

    /// Status and recent sightings of one device.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors, and returns [`Error::EmptyResult`] when
    /// the device has no records inside the window.
    pub fn device(
        &self,
        family: &FamilyName,
        device: &str,
        window: Option<Window>,
        now: DateTime<Utc>,
    ) -> Result<DeviceView> {
        let window = window.unwrap_or(self.window);
        let sensors = {
            let handle = self.gateway.open_family(family)?;
            SensorWindow::read(&handle, window, now)?
        };

        let records = sensors.for_device(device);
        let summary = DeviceStatus::from_records(device, &records).ok_or_else(|| {
            Error::empty_result(format!(
                "no data for device '{device}' in family '{family}' in the last {} minutes",
                window.minutes()
            ))
        })?;

        Ok(DeviceView {
            window_minutes: window.minutes(),
            status: summary,
            sightings: status::sightings(&records),
        })
    }

    /// The dashboard wrapped for presentation, with failures as messages.
    #[must_use]
    pub fn dashboard_view(
        &self,
        family: &FamilyName,
        window: Option<Window>,
        now: DateTime<Utc>,
    ) -> DashboardEnvelope {
        match self.dashboard(family, window, now) {
            Ok(view) => ViewEnvelope::ok(family, now, view),
            Err(e) => {
                warn!("[{}] dashboard failed: {}", family, e);
                ViewEnvelope::failed(family.as_str(), now, &e)
            }
        }
    }

    /// The map wrapped for presentation.
    ///
    /// A projection with no markers is reported through the error field so
    /// the renderer shows an explanation instead of an empty map.
    #[must_use]
    pub fn map_view(&self, family: &FamilyName, now: DateTime<Utc>) -> MapEnvelope {
        let result = self.map(family).and_then(|view| {
            if view.projection.is_empty() {
                Err(Error::empty_result(format!(
                    "no GPS data for family '{family}'"
                )))
            } else {
                Ok(view)
            }
        });

        match result {
            Ok(view) => ViewEnvelope::ok(family, now, view),
            Err(e) => {
                warn!("[{}] map failed: {}", family, e);
                ViewEnvelope::failed(family.as_str(), now, &e)
            }
        }
    }

    /// The location list wrapped for presentation.
    #[must_use]
    pub fn locations_view(&self, family: &FamilyName, now: DateTime<Utc>) -> LocationsEnvelope {
        match self.locations(family) {
            Ok(view) => ViewEnvelope::ok(family, now, view),
            Err(e) => {
                warn!("[{}] location list failed: {}", family, e);
                ViewEnvelope::failed(family.as_str(), now, &e)
            }
        }
    }

    /// The device view wrapped for presentation.
    #[must_use]
    pub fn device_view(
        &self,
        family: &FamilyName,
        device: &str,
        window: Option<Window>,
        now: DateTime<Utc>,
    ) -> DeviceEnvelope {
        match self.device(family, device, window, now) {
            Ok(view) => ViewEnvelope::ok(family, now, view),
            Err(e) => {
                warn!("[{}] device '{}' failed: {}", family, device, e);
                ViewEnvelope::failed(family.as_str(), now, &e)
            }
        }
    }

    /// Delete a family and all of its data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FamilyNotFound`] if the family does not exist.
    pub fn delete_family(&self, family: &FamilyName) -> Result<()> {
        self.gateway.delete_family(family)
    }

    /// Delete one location from a family.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the family or location does not exist.
    pub fn delete_location(&self, family: &FamilyName, label: &str) -> Result<()> {
        let handle = self.gateway.open_family(family)?;
        handle.delete_location(label)
    }
}
