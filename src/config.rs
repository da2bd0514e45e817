use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "NeuroSense";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the session cookie issued at login.
pub const SESSION_COOKIE: &str = "neurosense_session";

const DEFAULT_BIND: &str = "127.0.0.1:5000";
const DEFAULT_SESSION_TTL_SECS: u64 = 8 * 60 * 60;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Cannot determine home directory; set NEUROSENSE_DATA_DIR")]
    NoHomeDir,
}

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,neurosense_lib=debug"
    } else {
        "info"
    }
}

/// Get the application data directory.
/// ~/NeuroSense/ on all platforms.
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(APP_NAME))
}

/// Runtime configuration of the portal, resolved once at startup.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub models_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub session_ttl_secs: u64,
    pub max_upload_bytes: usize,
}

impl PortalConfig {
    /// Resolve configuration from `NEUROSENSE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary key lookup (env in production,
    /// a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_raw = lookup("NEUROSENSE_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidValue {
                key: "NEUROSENSE_BIND",
                value: bind_raw.clone(),
            })?;

        let data_dir = match lookup("NEUROSENSE_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => app_data_dir()?,
        };

        let db_path = lookup("NEUROSENSE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("neurosense.db"));
        let models_dir = lookup("NEUROSENSE_MODELS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("models"));
        let uploads_dir = lookup("NEUROSENSE_UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("uploads"));

        let session_ttl_secs = parse_or(
            &lookup,
            "NEUROSENSE_SESSION_TTL_SECS",
            DEFAULT_SESSION_TTL_SECS,
        )?;
        let max_upload_bytes = parse_or(
            &lookup,
            "NEUROSENSE_MAX_UPLOAD_BYTES",
            DEFAULT_MAX_UPLOAD_BYTES,
        )?;

        Ok(Self {
            bind_addr,
            data_dir,
            db_path,
            models_dir,
            uploads_dir,
            session_ttl_secs,
            max_upload_bytes,
        })
    }

    /// Configuration rooted at a single directory (tests, local demos).
    pub fn rooted_at(dir: impl Into<PathBuf>) -> Self {
        let data_dir = dir.into();
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            db_path: data_dir.join("neurosense.db"),
            models_dir: data_dir.join("models"),
            uploads_dir: data_dir.join("uploads"),
            data_dir,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_derived_from_data_dir() {
        let config =
            PortalConfig::from_lookup(lookup_from(&[("NEUROSENSE_DATA_DIR", "/srv/neuro")]))
                .unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:5000");
        assert_eq!(config.db_path, PathBuf::from("/srv/neuro/neurosense.db"));
        assert_eq!(config.models_dir, PathBuf::from("/srv/neuro/models"));
        assert_eq!(config.uploads_dir, PathBuf::from("/srv/neuro/uploads"));
        assert_eq!(config.session_ttl_secs, DEFAULT_SESSION_TTL_SECS);
    }

    #[test]
    fn explicit_paths_override_defaults() {
        let config = PortalConfig::from_lookup(lookup_from(&[
            ("NEUROSENSE_DATA_DIR", "/srv/neuro"),
            ("NEUROSENSE_MODELS_DIR", "/opt/models"),
            ("NEUROSENSE_BIND", "0.0.0.0:8080"),
        ]))
        .unwrap();
        assert_eq!(config.models_dir, PathBuf::from("/opt/models"));
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn invalid_bind_is_rejected() {
        let err = PortalConfig::from_lookup(lookup_from(&[
            ("NEUROSENSE_DATA_DIR", "/srv/neuro"),
            ("NEUROSENSE_BIND", "not-an-addr"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "NEUROSENSE_BIND", .. }));
    }

    #[test]
    fn invalid_ttl_is_rejected() {
        let err = PortalConfig::from_lookup(lookup_from(&[
            ("NEUROSENSE_DATA_DIR", "/srv/neuro"),
            ("NEUROSENSE_SESSION_TTL_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("NEUROSENSE_SESSION_TTL_SECS"));
    }

    #[test]
    fn app_name_is_neurosense() {
        assert_eq!(APP_NAME, "NeuroSense");
    }
}
