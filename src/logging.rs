// src/logging.rs

//! Logging setup for `procrun` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `PROCRUN_LOG` environment variable, in `EnvFilter` syntax
//!    (e.g. `debug` or `procrun::exec=trace,info`)
//! 3. default to `info`
//!
//! Logs are sent to STDERR so that child stdout stays clean.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

const LOG_ENV: &str = "PROCRUN_LOG";

/// Initialise global logging subscriber.
///
/// Fails if `PROCRUN_LOG` is not a valid filter or a global subscriber is
/// already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_spec = std::env::var(LOG_ENV).ok();
    let filter = build_filter(cli_level, env_spec.as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))?;

    Ok(())
}

fn build_filter(cli_level: Option<LogLevel>, env_spec: Option<&str>) -> Result<EnvFilter> {
    if let Some(lvl) = cli_level {
        return Ok(EnvFilter::new(lvl.as_str()));
    }
    match env_spec.map(str::trim).filter(|s| !s.is_empty()) {
        Some(spec) => EnvFilter::try_new(spec)
            .with_context(|| format!("invalid {LOG_ENV} filter '{spec}'")),
        None => Ok(EnvFilter::new("info")),
    }
}
