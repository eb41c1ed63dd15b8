//! `wayfinder` - Dashboard and map analytics for indoor location tracking
//!
//! This library reads per-family sensor records and location metadata and
//! derives the two presentation views of a tracking backend: a dashboard
//! with classifier efficacy and device status, and a map of GPS-resolved
//! locations with their centroid.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod efficacy;
pub mod error;
pub mod family;
pub mod gateway;
pub mod logging;
pub mod map;
pub mod record;
pub mod render;
pub mod server;
pub mod service;
pub mod status;
pub mod storage;
pub mod view;

pub use aggregate::{SensorWindow, Window};
pub use config::Config;
pub use efficacy::{EfficacyReport, LocationEfficacy};
pub use error::{Error, ErrorKind, Result};
pub use family::FamilyName;
pub use gateway::{FamilyHandle, Gateway};
pub use logging::init_logging;
pub use map::{location_hash, CentroidPolicy, MapMarker, MapProjection};
pub use record::{Fingerprint, GpsCoordinate, Location, SensorRecord};
pub use service::Analytics;
pub use status::{DeviceSighting, DeviceStatus};
pub use storage::{FamilyStore, SqliteGateway};
pub use view::{
    DashboardEnvelope, DashboardView, DeviceEnvelope, DeviceView, LocationSummary,
    LocationsEnvelope, LocationsView, MapEnvelope, MapView, ViewEnvelope,
};
