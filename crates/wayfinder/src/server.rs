//! HTTP surface.
//!
//! Every logical outcome is answered with status 200. Failures travel in the
//! body: the envelope's `error` field for views, `success: false` for
//! mutations. Family names are parsed here and nowhere else.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get};
use axum::{Json, Router};
use axum_server::tls_rustls::RustlsConfig;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::aggregate::Window;
use crate::config::{Config, ServerConfig, TlsConfig};
use crate::error::{Error, Result};
use crate::family::FamilyName;
use crate::service::Analytics;
use crate::storage::SqliteGateway;
use crate::view::{
    DashboardEnvelope, DeviceEnvelope, LocationsEnvelope, MapEnvelope, ViewEnvelope,
};

type AppState = Arc<Analytics<SqliteGateway>>;

/// How long open connections get to finish after a shutdown request.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Query parameters accepted by the dashboard and device routes.
#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    /// Lookback override in minutes.
    pub minutes: Option<i64>,
}

/// Outcome of a mutation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    /// Whether the mutation happened.
    pub success: bool,
    /// What happened, or why not.
    pub message: String,
}

impl ActionResponse {
    fn from_result(result: Result<String>) -> Self {
        match result {
            Ok(message) => Self {
                success: true,
                message,
            },
            Err(e) => Self {
                success: false,
                message: e.to_string(),
            },
        }
    }
}

/// Build the application router.
///
/// # Errors
///
/// Returns an error if a configured CORS origin is not a valid header value.
pub fn router(analytics: AppState, config: &ServerConfig) -> Result<Router> {
    let mut app = Router::new()
        .route("/", get(uptime))
        .route("/dashboard/:family", get(dashboard))
        .route("/map/:family", get(map))
        .route("/analysis/:family", get(locations))
        .route("/location/:family/:device", get(device))
        .route("/api/v1/database/:family", delete(delete_family))
        .route("/api/v1/location/:family/:location", delete(delete_location))
        .layer(cors_layer(&config.cors_allowed_origins)?)
        .with_state(analytics);

    if config.compression {
        app = app.layer(CompressionLayer::new());
    }
    Ok(app.layer(TraceLayer::new_for_http()))
}

fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::DELETE])
        .allow_headers(Any);

    if origins.iter().any(|origin| origin == "*") {
        return Ok(layer.allow_origin(Any));
    }

    let values = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|_| Error::ConfigValidation {
                message: format!("invalid CORS origin '{origin}'"),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(values)))
}

/// Bind the configured address and serve until interrupted.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the listener fails.
pub async fn serve(config: &Config) -> Result<()> {
    let addr = config.bind_addr()?;
    let analytics = Analytics::from_config(config)?;

    match analytics.gateway().list_families() {
        Ok(families) => info!(
            "Serving {} families from {}",
            families.len(),
            analytics.gateway().data_dir().display()
        ),
        Err(e) => warn!("Could not list families: {}", e),
    }

    let app = router(Arc::new(analytics), &config.server)?;
    match &config.server.tls {
        Some(tls) => serve_tls(app, addr, tls).await?,
        None => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("Listening on http://{}", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }
    info!("Server stopped");
    Ok(())
}

async fn serve_tls(app: Router, addr: SocketAddr, tls: &TlsConfig) -> Result<()> {
    let rustls = load_tls(tls).await?;

    let handle = axum_server::Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    info!("Listening on https://{}", addr);
    axum_server::bind_rustls(addr, rustls)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

/// Read the PEM certificate chain and key named by `tls`.
///
/// # Errors
///
/// Returns [`Error::TlsLoad`] if either file is missing or not valid PEM.
pub async fn load_tls(tls: &TlsConfig) -> Result<RustlsConfig> {
    RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .map_err(|source| Error::TlsLoad {
            cert_path: tls.cert_path.clone(),
            key_path: tls.key_path.clone(),
            source,
        })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[allow(clippy::unused_async)]
async fn uptime() -> &'static str {
    "OK"
}

async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::internal(format!("worker task failed: {e}")))?
}

async fn dashboard(
    State(analytics): State<AppState>,
    Path(raw): Path<String>,
    query: std::result::Result<Query<WindowQuery>, QueryRejection>,
) -> Json<DashboardEnvelope> {
    let now = Utc::now();
    let request = FamilyName::parse(&raw).and_then(|family| Ok((family, window_from(query)?)));

    let (family, window) = match request {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Rejected dashboard request for '{}': {}", raw, e);
            return Json(ViewEnvelope::failed(raw, now, &e));
        }
    };

    let name = family.to_string();
    let result = blocking(move || Ok(analytics.dashboard_view(&family, window, now))).await;
    Json(result.unwrap_or_else(|e| ViewEnvelope::failed(name, now, &e)))
}

async fn map(State(analytics): State<AppState>, Path(raw): Path<String>) -> Json<MapEnvelope> {
    let now = Utc::now();
    let family = match FamilyName::parse(&raw) {
        Ok(family) => family,
        Err(e) => {
            warn!("Rejected map request for '{}': {}", raw, e);
            return Json(ViewEnvelope::failed(raw, now, &e));
        }
    };

    let name = family.to_string();
    let result = blocking(move || Ok(analytics.map_view(&family, now))).await;
    Json(result.unwrap_or_else(|e| ViewEnvelope::failed(name, now, &e)))
}

async fn locations(
    State(analytics): State<AppState>,
    Path(raw): Path<String>,
) -> Json<LocationsEnvelope> {
    let now = Utc::now();
    let family = match FamilyName::parse(&raw) {
        Ok(family) => family,
        Err(e) => {
            warn!("Rejected location list request for '{}': {}", raw, e);
            return Json(ViewEnvelope::failed(raw, now, &e));
        }
    };

    let name = family.to_string();
    let result = blocking(move || Ok(analytics.locations_view(&family, now))).await;
    Json(result.unwrap_or_else(|e| ViewEnvelope::failed(name, now, &e)))
}

async fn device(
    State(analytics): State<AppState>,
    Path((raw, device_id)): Path<(String, String)>,
    query: std::result::Result<Query<WindowQuery>, QueryRejection>,
) -> Json<DeviceEnvelope> {
    let now = Utc::now();
    let request = FamilyName::parse(&raw).and_then(|family| Ok((family, window_from(query)?)));

    let (family, window) = match request {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Rejected device request for '{}': {}", raw, e);
            return Json(ViewEnvelope::failed(raw, now, &e));
        }
    };

    let name = family.to_string();
    let result =
        blocking(move || Ok(analytics.device_view(&family, &device_id, window, now))).await;
    Json(result.unwrap_or_else(|e| ViewEnvelope::failed(name, now, &e)))
}

fn window_from(
    query: std::result::Result<Query<WindowQuery>, QueryRejection>,
) -> Result<Option<Window>> {
    let Query(query) = query.map_err(|rejection| Error::InvalidQuery {
        message: rejection.body_text(),
    })?;
    query.minutes.map(Window::from_minutes).transpose()
}

async fn delete_family(
    State(analytics): State<AppState>,
    Path(raw): Path<String>,
) -> Json<ActionResponse> {
    let result = match FamilyName::parse(&raw) {
        Ok(family) => {
            blocking(move || {
                analytics.delete_family(&family)?;
                Ok(format!("deleted {family}"))
            })
            .await
        }
        Err(e) => Err(e),
    };
    if let Err(e) = &result {
        warn!("Could not delete family '{}': {}", raw, e);
    }
    Json(ActionResponse::from_result(result))
}

async fn delete_location(
    State(analytics): State<AppState>,
    Path((raw, location)): Path<(String, String)>,
) -> Json<ActionResponse> {
    let result = match FamilyName::parse(&raw) {
        Ok(family) => {
            let label = location.clone();
            blocking(move || {
                analytics.delete_location(&family, &label)?;
                Ok(format!("deleted location '{label}' for {family}"))
            })
            .await
        }
        Err(e) => Err(e),
    };
    if let Err(e) = &result {
        warn!("Could not delete location '{}' for '{}': {}", location, raw, e);
    }
    Json(ActionResponse::from_result(result))
}
