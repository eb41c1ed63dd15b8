//! Configuration management for wayfinder.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::aggregate::Window;
use crate::error::{Error, Result};
use crate::map::CentroidPolicy;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "wayfinder";

/// Subdirectory of the data directory holding family databases.
const FAMILIES_DIR_NAME: &str = "families";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `WAYFINDER_`, sections separated by `__`)
/// 2. TOML config file at `~/.config/wayfinder/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Dashboard configuration.
    pub dashboard: DashboardConfig,
    /// Map configuration.
    pub map: MapConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Origins allowed by CORS. `"*"` allows any.
    pub cors_allowed_origins: Vec<String>,
    /// Gzip responses.
    pub compression: bool,
    /// Serve HTTPS with this certificate instead of plain HTTP.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
}

/// PEM files for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Certificate chain, leaf first.
    pub cert_path: PathBuf,
    /// Private key for the leaf certificate.
    pub key_path: PathBuf,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one database per family.
    /// Defaults to `~/.local/share/wayfinder/families`
    pub data_dir: Option<PathBuf>,
    /// How long to wait on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,
}

/// Dashboard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Lookback window in minutes.
    pub window_minutes: i64,
}

/// Map configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// How unresolved locations affect the map center.
    pub centroid_policy: CentroidPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8003,
            cors_allowed_origins: vec!["*".to_string()],
            compression: true,
            tls: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None, // Will be resolved to default at runtime
            busy_timeout_ms: 5_000,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            window_minutes: Window::DEFAULT_MINUTES,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("WAYFINDER_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
            .join(FAMILIES_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.dashboard.window_minutes <= 0 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "window_minutes must be greater than 0, got {}",
                    self.dashboard.window_minutes
                ),
            });
        }

        if self.server.host.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "server host must not be empty".to_string(),
            });
        }

        if self
            .server
            .cors_allowed_origins
            .iter()
            .any(|origin| origin.trim().is_empty())
        {
            return Err(Error::ConfigValidation {
                message: "cors_allowed_origins must not contain empty entries".to_string(),
            });
        }

        if let Some(tls) = &self.server.tls {
            if tls.cert_path.as_os_str().is_empty() || tls.key_path.as_os_str().is_empty() {
                return Err(Error::ConfigValidation {
                    message: "server.tls needs both cert_path and key_path".to_string(),
                });
            }
        }

        self.bind_addr()?;
        Ok(())
    }

    /// Get the data directory, resolving defaults if not set.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// The dashboard lookback window.
    ///
    /// # Errors
    ///
    /// Returns an error if `window_minutes` is not positive.
    pub fn window(&self) -> Result<Window> {
        Window::from_minutes(self.dashboard.window_minutes)
    }

    /// Get the busy timeout as a Duration.
    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.storage.busy_timeout_ms)
    }

    /// The socket address the server binds.
    ///
    /// # Errors
    ///
    /// Returns an error if `host:port` is not a valid socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|_| Error::ConfigValidation {
                message: format!(
                    "invalid bind address {}:{}",
                    self.server.host, self.server.port
                ),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.port, 8003);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.server.compression);
        assert_eq!(config.dashboard.window_minutes, 60);
        assert_eq!(config.map.centroid_policy, CentroidPolicy::ResolvedOnly);
        assert!(config.storage.data_dir.is_none());
        assert!(config.server.tls.is_none());
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_window() {
        let mut config = Config::default();
        config.dashboard.window_minutes = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("window_minutes"));
    }

    #[test]
    fn test_validate_empty_host() {
        let mut config = Config::default();
        config.server.host = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("host"));
    }

    #[test]
    fn test_validate_bad_host() {
        let mut config = Config::default();
        config.server.host = "not a host".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("invalid bind address"));
    }

    #[test]
    fn test_validate_empty_origin() {
        let mut config = Config::default();
        config.server.cors_allowed_origins = vec![String::new()];

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_from_config() {
        let mut config = Config::default();
        config.dashboard.window_minutes = 15;
        assert_eq!(config.window().unwrap().minutes(), 15);
    }

    #[test]
    fn test_bind_addr() {
        let addr = Config::default().bind_addr().unwrap();
        assert_eq!(addr.port(), 8003);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn test_busy_timeout() {
        assert_eq!(Config::default().busy_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_data_dir_default() {
        let path = Config::default().data_dir();
        assert!(path.to_string_lossy().contains("wayfinder"));
        assert!(path.ends_with("families"));
    }

    #[test]
    fn test_data_dir_custom() {
        let mut config = Config::default();
        config.storage.data_dir = Some(PathBuf::from("/srv/wayfinder"));
        assert_eq!(config.data_dir(), PathBuf::from("/srv/wayfinder"));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("wayfinder"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!(
            "wayfinder_config_test_{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"
            [server]
            port = 9100

            [dashboard]
            window_minutes = 30

            [map]
            centroid_policy = "naive"
            "#,
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.dashboard.window_minutes, 30);
        assert_eq!(config.map.centroid_policy, CentroidPolicy::Naive);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_load_tls_section() {
        let path = std::env::temp_dir().join(format!(
            "wayfinder_config_tls_{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"
            [server.tls]
            cert_path = "/etc/ssl/fullchain.pem"
            key_path = "/etc/ssl/privkey.pem"
            "#,
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        let _ = std::fs::remove_file(&path);

        let tls = config.server.tls.unwrap();
        assert_eq!(tls.cert_path, PathBuf::from("/etc/ssl/fullchain.pem"));
        assert_eq!(tls.key_path, PathBuf::from("/etc/ssl/privkey.pem"));
        assert_eq!(config.server.port, 8003);
    }

    #[test]
    fn test_validate_tls_needs_both_paths() {
        let mut config = Config::default();
        config.server.tls = Some(TlsConfig {
            cert_path: PathBuf::from("/etc/ssl/fullchain.pem"),
            key_path: PathBuf::new(),
        });

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("server.tls"));
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!(
            "wayfinder_config_invalid_{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[dashboard]\nwindow_minutes = -3\n").unwrap();

        let result = Config::load_from(Some(path.clone()));
        let _ = std::fs::remove_file(&path);

        assert!(result.is_err());
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("window_minutes"));
        assert!(json.contains("resolved_only"));
        assert!(!json.contains("tls"));
    }

    #[test]
    fn test_dashboard_config_deserialize() {
        let json = r#"{"window_minutes": 5}"#;
        let dashboard: DashboardConfig = serde_json::from_str(json).unwrap();
        assert_eq!(dashboard.window_minutes, 5);
    }
}
