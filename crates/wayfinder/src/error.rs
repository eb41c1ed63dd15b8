//! Error types for wayfinder.
//!
//! Every failure the analytics pipeline can surface is a variant of [`Error`].
//! Variants are grouped into the coarse [`ErrorKind`] taxonomy that the view
//! layer and HTTP boundary reason about.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for wayfinder operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Tenant Errors ===
    /// The requested family has no dataset.
    #[error("family '{family}' does not exist")]
    FamilyNotFound {
        /// The normalized family name.
        family: String,
    },

    /// The requested location is not known to the family.
    #[error("location '{location}' not found for family '{family}'")]
    LocationNotFound {
        /// The normalized family name.
        family: String,
        /// The location label.
        location: String,
    },

    /// A family name failed validation at the boundary.
    #[error("invalid family name '{name}': {reason}")]
    InvalidFamilyName {
        /// The name as supplied by the caller.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A valid query matched nothing the view can show.
    #[error("{what}")]
    EmptyResult {
        /// Human-readable description of the missing data.
        what: String,
    },

    /// A lookback window was not a positive duration.
    #[error("window must be a positive duration, got {minutes} minutes")]
    InvalidWindow {
        /// The rejected window length.
        minutes: i64,
    },

    /// A request parameter could not be parsed.
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// Description of the rejected parameter.
        message: String,
    },

    // === Storage Errors ===
    /// Failed to open or create a family database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// The TLS certificate or key could not be loaded.
    #[error("failed to load TLS certificate {cert_path} with key {key_path}: {source}")]
    TlsLoad {
        /// Certificate chain path.
        cert_path: PathBuf,
        /// Private key path.
        key_path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for wayfinder operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Family or location absent.
    NotFound,
    /// The tenant store could not serve the request.
    StoreUnavailable,
    /// The query was valid but matched no rows.
    EmptyResult,
    /// Caller-supplied input or configuration was rejected.
    Invalid,
    /// A bug or an unexpected serialization failure.
    Internal,
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a family-not-found error.
    #[must_use]
    pub fn family_not_found(family: impl Into<String>) -> Self {
        Self::FamilyNotFound {
            family: family.into(),
        }
    }

    /// Create an empty-result error.
    #[must_use]
    pub fn empty_result(what: impl Into<String>) -> Self {
        Self::EmptyResult { what: what.into() }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FamilyNotFound { .. } | Self::LocationNotFound { .. } => ErrorKind::NotFound,
            Self::DatabaseOpen { .. }
            | Self::DatabaseQuery(_)
            | Self::DatabaseMigration { .. }
            | Self::Io(_)
            | Self::DirectoryCreate { .. } => ErrorKind::StoreUnavailable,
            Self::EmptyResult { .. } => ErrorKind::EmptyResult,
            Self::InvalidFamilyName { .. }
            | Self::InvalidWindow { .. }
            | Self::InvalidQuery { .. }
            | Self::ConfigLoad(_)
            | Self::ConfigValidation { .. }
            | Self::TlsLoad { .. } => ErrorKind::Invalid,
            Self::Json(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if this error means the family or location does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
