//! Logging setup.
//!
//! Output goes to stderr so `--format json` output on stdout stays parseable.
//! `RUST_LOG`, when set, replaces the verbosity flags entirely.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Info and above.
    #[default]
    Normal,
    /// Debug and above.
    Verbose,
    /// Everything.
    Trace,
}

impl Verbosity {
    /// Level applied to this crate and the HTTP layer.
    #[must_use]
    pub fn level_filter(self) -> LevelFilter {
        match self {
            Self::Quiet => LevelFilter::ERROR,
            Self::Normal => LevelFilter::INFO,
            Self::Verbose => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

/// Build the filter from a `RUST_LOG` value and the CLI verbosity.
///
/// Without usable `RUST_LOG` directives, wayfinder and `tower_http` log at
/// the verbosity's level and every other target at warn (error when quiet).
#[must_use]
pub fn build_filter(rust_log: Option<&str>, verbosity: Verbosity) -> EnvFilter {
    let level = verbosity.level_filter();
    let builder = EnvFilter::builder().with_default_directive(level.min(LevelFilter::WARN).into());

    match rust_log.map(str::trim).filter(|directives| !directives.is_empty()) {
        Some(directives) => builder.parse_lossy(directives),
        None => builder.parse_lossy(format!(
            "{}={level},tower_http={level}",
            env!("CARGO_CRATE_NAME")
        )),
    }
}

/// Install the global subscriber. Later calls are no-ops.
///
/// ```no_run
/// use wayfinder::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    let _ = tracing_subscriber::registry()
        .with(build_filter(rust_log.as_deref(), verbosity))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init();
}

/// Initialize logging for tests.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
