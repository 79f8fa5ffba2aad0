use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "pantry-scan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const ENV_PREFIX: &str = "PANTRY_SCAN_";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8780";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_VISION_MODEL: &str = "gemma3:4b";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
/// Idle scan sessions are dropped after this long: 30 minutes.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 1800;

/// Get the application data directory.
/// Platform data dir (e.g. ~/.local/share/pantry-scan), else the working directory.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> String {
    "pantry_scan_lib=info,pantry_scan=info,tower_http=warn".to_string()
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Runtime settings, read from `PANTRY_SCAN_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub ollama_url: String,
    pub vision_model: String,
    /// `None` disables the timeout on collaborator calls.
    pub http_timeout: Option<Duration>,
    pub entity_endpoint: Option<String>,
    pub entity_token: Option<String>,
    pub max_upload_bytes: usize,
    /// Sessions with no activity for this long are evicted.
    pub session_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Keys are given without the prefix.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let data_dir = app_data_dir();

        let bind_addr = parse_value("BIND_ADDR", get("BIND_ADDR"), DEFAULT_BIND_ADDR)?;
        let timeout_secs: u64 = parse_value(
            "HTTP_TIMEOUT_SECS",
            get("HTTP_TIMEOUT_SECS"),
            &DEFAULT_HTTP_TIMEOUT_SECS.to_string(),
        )?;
        let max_upload_bytes: usize = parse_value(
            "MAX_UPLOAD_BYTES",
            get("MAX_UPLOAD_BYTES"),
            &DEFAULT_MAX_UPLOAD_BYTES.to_string(),
        )?;
        if max_upload_bytes == 0 {
            return Err(invalid("MAX_UPLOAD_BYTES", "0", "must be greater than zero"));
        }

        let session_ttl_secs: u64 = parse_value(
            "SESSION_TTL_SECS",
            get("SESSION_TTL_SECS"),
            &DEFAULT_SESSION_TTL_SECS.to_string(),
        )?;
        if session_ttl_secs == 0 {
            return Err(invalid("SESSION_TTL_SECS", "0", "must be greater than zero"));
        }

        let ollama_url = get("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        if !ollama_url.starts_with("http://") && !ollama_url.starts_with("https://") {
            return Err(invalid("OLLAMA_URL", &ollama_url, "must be an http(s) URL"));
        }

        Ok(Self {
            bind_addr,
            db_path: get("DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("pantry.db")),
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("uploads")),
            ollama_url,
            vision_model: get("VISION_MODEL").unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
            http_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            entity_endpoint: get("ENTITY_ENDPOINT"),
            entity_token: get("ENTITY_TOKEN"),
            max_upload_bytes,
            session_ttl: Duration::from_secs(session_ttl_secs),
        })
    }
}

fn parse_value<T>(name: &str, raw: Option<String>, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value = raw.unwrap_or_else(|| default.to_string());
    value
        .parse::<T>()
        .map_err(|e| invalid(name, &value, &e.to_string()))
}

fn invalid(name: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: format!("{ENV_PREFIX}{name}"),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
