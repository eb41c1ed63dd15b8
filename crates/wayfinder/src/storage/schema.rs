//! `SQLite` schema definitions for a family database.
//!
//! Each family lives in its own database file, so no table carries a
//! family column.

/// SQL statement to create the sensors table.
pub const CREATE_SENSORS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS sensors (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp INTEGER NOT NULL,
    device TEXT NOT NULL,
    fingerprint TEXT NOT NULL DEFAULT '{}',
    location TEXT,
    confidence INTEGER,
    correct INTEGER
)
";

/// Index for window queries.
pub const CREATE_TIMESTAMP_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_sensors_timestamp ON sensors(timestamp)
";

/// Index for per-device lookups.
pub const CREATE_DEVICE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_sensors_device ON sensors(device)
";

/// SQL statement to create the locations table.
pub const CREATE_LOCATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS locations (
    label TEXT PRIMARY KEY,
    latitude REAL,
    longitude REAL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_SENSORS_TABLE,
    CREATE_TIMESTAMP_INDEX,
    CREATE_DEVICE_INDEX,
    CREATE_LOCATIONS_TABLE,
    CREATE_METADATA_TABLE,
];
