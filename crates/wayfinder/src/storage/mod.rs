//! Storage layer for wayfinder.
//!
//! Each family is one `SQLite` database file under the data directory,
//! named `<family>.sqlite3.db`. A [`FamilyStore`] wraps an open connection to
//! one of those files; [`SqliteGateway`] maps family names to files.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, types::Type, Connection, OpenFlags};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::family::FamilyName;
use crate::gateway::{FamilyHandle, Gateway};
use crate::record::{Fingerprint, GpsCoordinate, Location, SensorRecord};

/// Suffix of every family database file.
const DATABASE_SUFFIX: &str = ".sqlite3.db";

/// Default time a connection waits on a locked database.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// An open family database.
///
/// The connection is closed when the store is dropped, so holding a
/// `FamilyStore` is holding the family open.
#[derive(Debug)]
pub struct FamilyStore {
    family: FamilyName,
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl FamilyStore {
    fn from_connection(family: FamilyName, path: PathBuf, conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;
        Ok(Self { family, path, conn })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory(family: FamilyName) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            family,
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store a sensor record.
    ///
    /// A classified location label is registered in the locations table
    /// (without coordinates) the first time it is seen.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_sensor(&self, record: &SensorRecord) -> Result<i64> {
        let fingerprint = serde_json::to_string(&record.fingerprint)?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r"
            INSERT INTO sensors (timestamp, device, fingerprint, location, confidence, correct)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                record.timestamp,
                record.device,
                fingerprint,
                record.classified_location,
                record.confidence,
                record.correct,
            ],
        )?;
        let id = tx.last_insert_rowid();

        if let Some(label) = &record.classified_location {
            tx.execute(
                "INSERT OR IGNORE INTO locations (label) VALUES (?1)",
                [label],
            )?;
        }
        tx.commit()?;

        debug!("[{}] inserted sensor record {}", self.family, id);
        Ok(id)
    }

    /// Insert a location or replace its coordinate.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn set_location(&self, location: &Location) -> Result<()> {
        let (latitude, longitude) = location
            .gps
            .map_or((None, None), |gps| (Some(gps.latitude), Some(gps.longitude)));

        self.conn.execute(
            r"
            INSERT INTO locations (label, latitude, longitude) VALUES (?1, ?2, ?3)
            ON CONFLICT(label) DO UPDATE SET
                latitude = excluded.latitude,
                longitude = excluded.longitude
            ",
            params![location.label, latitude, longitude],
        )?;
        Ok(())
    }

    /// Count stored sensor records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_sensors(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sensors", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Remove every sensor record and location, or nothing.
    fn purge(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch("DELETE FROM sensors; DELETE FROM locations;")?;
        tx.commit()?;
        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<SensorRecord> {
        let timestamp: i64 = row.get(0)?;
        let device: String = row.get(1)?;
        let fingerprint_json: String = row.get(2)?;
        let classified_location: Option<String> = row.get(3)?;
        let confidence: Option<i64> = row.get(4)?;
        let correct: Option<bool> = row.get(5)?;

        let fingerprint: Fingerprint = serde_json::from_str(&fingerprint_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

        let confidence = confidence.and_then(|c| u8::try_from(c.clamp(0, 100)).ok());

        Ok(SensorRecord {
            device,
            timestamp,
            fingerprint,
            classified_location,
            confidence,
            correct,
        })
    }
}

impl FamilyHandle for FamilyStore {
    fn family(&self) -> &FamilyName {
        &self.family
    }

    fn read_sensors_since(&self, cutoff_ms: i64) -> Result<Vec<SensorRecord>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT timestamp, device, fingerprint, location, confidence, correct
            FROM sensors WHERE timestamp >= ?1
            ORDER BY timestamp ASC, id ASC
            ",
        )?;

        let records = stmt
            .query_map([cutoff_ms], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn list_locations(&self) -> Result<Vec<Location>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT label, latitude, longitude FROM locations ORDER BY label ASC
            ",
        )?;

        let locations = stmt
            .query_map([], |row| {
                let label: String = row.get(0)?;
                let latitude: Option<f64> = row.get(1)?;
                let longitude: Option<f64> = row.get(2)?;
                let gps = match (latitude, longitude) {
                    (Some(lat), Some(lon)) => Some(GpsCoordinate::new(lat, lon)),
                    _ => None,
                };
                Ok(Location { label, gps })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(locations)
    }

    fn delete_location(&self, label: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let locations = tx.execute("DELETE FROM locations WHERE label = ?1", [label])?;
        let sensors = tx.execute("DELETE FROM sensors WHERE location = ?1", [label])?;

        if locations == 0 && sensors == 0 {
            return Err(Error::LocationNotFound {
                family: self.family.to_string(),
                location: label.to_string(),
            });
        }
        tx.commit()?;

        info!(
            "[{}] deleted location '{}' and {} sensor records",
            self.family, label, sensors
        );
        Ok(())
    }
}

impl Drop for FamilyStore {
    fn drop(&mut self) {
        debug!("[{}] closing family database", self.family);
    }
}

/// Gateway over a directory of per-family `SQLite` databases.
#[derive(Debug, Clone)]
pub struct SqliteGateway {
    data_dir: PathBuf,
    busy_timeout: Duration,
}

impl SqliteGateway {
    /// Create a gateway rooted at `data_dir`.
    ///
    /// The directory is created lazily on the first write.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Set how long a connection waits on a locked database.
    #[must_use]
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    /// The directory holding family databases.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the database file for `family`.
    #[must_use]
    pub fn family_path(&self, family: &FamilyName) -> PathBuf {
        self.data_dir.join(format!("{family}{DATABASE_SUFFIX}"))
    }

    /// Write to a family, creating it if this is its first write.
    ///
    /// A family comes into existence only when a write succeeds: if `write`
    /// fails against a family that did not exist before, the new database
    /// file is removed again.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or `write` fails.
    pub fn write<T>(
        &self,
        family: &FamilyName,
        write: impl FnOnce(&FamilyStore) -> Result<T>,
    ) -> Result<T> {
        let path = self.family_path(family);
        let existed = path.exists();
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir).map_err(|source| Error::DirectoryCreate {
                path: self.data_dir.clone(),
                source,
            })?;
        }

        let result = self
            .connect(family, OpenFlags::default())
            .and_then(|store| write(&store));
        if result.is_err() && !existed {
            debug!("[{}] first write failed, removing new database", family);
            remove_database_files(&path)?;
        }
        result
    }

    /// List the families that currently have a database.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory exists but cannot be read.
    pub fn list_families(&self) -> Result<Vec<FamilyName>> {
        if !self.data_dir.exists() {
            return Ok(Vec::new());
        }

        let mut families = Vec::new();
        for entry in std::fs::read_dir(&self.data_dir)? {
            let file_name = entry?.file_name();
            let Some(stem) = file_name
                .to_str()
                .and_then(|name| name.strip_suffix(DATABASE_SUFFIX))
            else {
                continue;
            };
            match FamilyName::parse(stem) {
                Ok(family) => families.push(family),
                Err(e) => warn!("Skipping unrecognized database file: {}", e),
            }
        }
        families.sort();
        Ok(families)
    }

    fn connect(&self, family: &FamilyName, flags: OpenFlags) -> Result<FamilyStore> {
        let path = self.family_path(family);
        debug!("Opening database at {}", path.display());

        let conn =
            Connection::open_with_flags(&path, flags).map_err(|source| Error::DatabaseOpen {
                path: path.clone(),
                source,
            })?;
        conn.busy_timeout(self.busy_timeout)?;

        FamilyStore::from_connection(family.clone(), path, conn)
    }
}

impl Gateway for SqliteGateway {
    type Handle = FamilyStore;

    fn open_family(&self, family: &FamilyName) -> Result<FamilyStore> {
        if !self.family_path(family).exists() {
            return Err(Error::family_not_found(family.as_str()));
        }
        self.connect(
            family,
            OpenFlags::default().difference(OpenFlags::SQLITE_OPEN_CREATE),
        )
    }

    fn delete_family(&self, family: &FamilyName) -> Result<()> {
        let store = self.open_family(family)?;
        store.purge()?;
        let path = store.path().to_path_buf();
        drop(store);

        remove_database_files(&path)?;

        info!("Deleted family '{}'", family);
        Ok(())
    }
}

/// Remove a database file and its WAL sidecars, ignoring absent ones.
fn remove_database_files(path: &Path) -> Result<()> {
    let sidecars = ["db-wal", "db-shm"].map(|ext| path.with_extension(ext));
    for file in std::iter::once(path.to_path_buf()).chain(sidecars) {
        match std::fs::remove_file(&file) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
