//! Configuration loader for the `seattle-crime-dashboard` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
//!
use std::{env, net::SocketAddr, path::PathBuf};

use anyhow::{anyhow, Result};

/// Default location of the SPD crime export, relative to the working directory.
pub const DEFAULT_CRIME_DATA_PATH: &str = "SPD_Crime_Data__2008-Present_20241122.csv";

/// Seattle open-data Call Data endpoint.
pub const DEFAULT_CALLS_API_URL: &str = "https://data.seattle.gov/resource/33kz-ixgy.json";

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read an optional string environment variable with a default value.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Path of the local crime incident CSV.
    pub crime_data_path: PathBuf,

    /// Call Data API endpoint.
    pub calls_api_url: String,

    /// `$limit` sent with every Call Data request.
    pub calls_fetch_limit: u32,

    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
}

/// Load configuration from environment variables with defaults.
///
/// Optional:
/// - `CRIME_DATA_PATH` – incident CSV (default: the SPD export file name)
/// - `CALLS_API_URL` – Call Data endpoint (default: data.seattle.gov)
/// - `CALLS_FETCH_LIMIT` – records requested per page load (default: 50000)
/// - `BIND_ADDR` – listen address (default: `0.0.0.0:8080`)
///
/// Returns an error if any variable is present but invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let crime_data_path = PathBuf::from(env_or!("CRIME_DATA_PATH", DEFAULT_CRIME_DATA_PATH));
    let calls_api_url = env_or!("CALLS_API_URL", DEFAULT_CALLS_API_URL);
    let calls_fetch_limit = parse_env_u32!("CALLS_FETCH_LIMIT", 50_000);

    let bind_addr = env_or!("BIND_ADDR", "0.0.0.0:8080");
    let bind_addr = bind_addr
        .parse::<SocketAddr>()
        .map_err(|e| anyhow!("Invalid BIND_ADDR '{}': {}", bind_addr, e))?;

    Ok(Config {
        crime_data_path,
        calls_api_url,
        calls_fetch_limit,
        bind_addr,
    })
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  CRIME_DATA_PATH   : {}", self.crime_data_path.display());
        tracing::info!("  CALLS_API_URL     : {}", self.calls_api_url);
        tracing::info!("  CALLS_FETCH_LIMIT : {}", self.calls_fetch_limit);
        tracing::info!("  BIND_ADDR         : {}", self.bind_addr);
    }
}
