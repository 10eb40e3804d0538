//! Process settings.
//!
//! Resolved in layers, later ones winning: built-in defaults, an optional
//! TOML file (`--config` or `LETTERBOX_CONFIG`), environment variables,
//! then command-line flags. The database location has no default; a
//! server without one refuses to start.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use warp::http::Uri;

pub const CONFIG_ENV: &str = "LETTERBOX_CONFIG";
pub const HOST_ENV: &str = "LETTERBOX_HOST";
pub const PORT_ENV: &str = "LETTERBOX_PORT";
/// Honoured when `LETTERBOX_PORT` is unset, for hosting platforms.
pub const PLATFORM_PORT_ENV: &str = "PORT";
pub const ORIGINS_ENV: &str = "LETTERBOX_ALLOWED_ORIGINS";
pub const DATABASE_ENV: &str = "LETTERBOX_DATABASE";
pub const SESSION_TTL_ENV: &str = "LETTERBOX_SESSION_TTL_MINUTES";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS. Empty or `*` allows any origin.
    pub allowed_origins: Vec<String>,
    /// SQLite file holding game snapshots
    pub database: Option<PathBuf>,
    /// Idle minutes before a game is evicted from memory
    pub session_ttl_minutes: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            allowed_origins: Vec::new(),
            database: None,
            session_ttl_minutes: 30,
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub allowed_origins: Vec<String>,
    pub database: Option<PathBuf>,
    pub session_ttl_minutes: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    allowed_origins: Option<Vec<String>>,
    #[serde(default)]
    database: Option<PathBuf>,
    #[serde(default)]
    session_ttl_minutes: Option<u64>,
}

impl ServerSettings {
    /// Resolve from the process environment.
    pub fn load(overrides: &SettingsOverrides) -> Result<Self, SettingsError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::resolve(&env, overrides)
    }

    pub fn resolve(
        env: &HashMap<String, String>,
        overrides: &SettingsOverrides,
    ) -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        let config = overrides
            .config
            .clone()
            .or_else(|| env_value(env, CONFIG_ENV).map(PathBuf::from));
        if let Some(path) = config {
            settings.apply_file(&path)?;
        }
        settings.apply_env(env)?;
        settings.apply_overrides(overrides);

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        match &self.database {
            Some(path) if !path.as_os_str().is_empty() => {}
            _ => return Err(SettingsError::MissingDatabase),
        }

        if self.host.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "host cannot be empty".to_string(),
            ));
        }

        if self.session_ttl_minutes == 0 {
            return Err(SettingsError::InvalidValue(
                "session_ttl_minutes must be greater than 0".to_string(),
            ));
        }

        for origin in &self.allowed_origins {
            if origin != "*" && !is_origin(origin) {
                return Err(SettingsError::InvalidValue(format!(
                    "allowed origin `{origin}` must look like https://host[:port]"
                )));
            }
        }

        Ok(())
    }

    pub fn database_path(&self) -> Result<&Path, SettingsError> {
        self.database
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(SettingsError::MissingDatabase)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_minutes.saturating_mul(60))
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: FileSettings = toml::from_str(&raw)?;

        if let Some(v) = file.host {
            self.host = v;
        }
        if let Some(v) = file.port {
            self.port = v;
        }
        if let Some(v) = file.allowed_origins {
            self.allowed_origins = v;
        }
        if let Some(v) = file.database {
            self.database = Some(v);
        }
        if let Some(v) = file.session_ttl_minutes {
            self.session_ttl_minutes = v;
        }
        Ok(())
    }

    fn apply_env(&mut self, env: &HashMap<String, String>) -> Result<(), SettingsError> {
        if let Some(v) = env_value(env, HOST_ENV) {
            self.host = v.to_string();
        }
        if let Some(v) = env_value(env, PORT_ENV).or_else(|| env_value(env, PLATFORM_PORT_ENV)) {
            self.port = v
                .parse()
                .map_err(|_| SettingsError::InvalidValue(format!("invalid port `{v}`")))?;
        }
        if let Some(v) = env_value(env, ORIGINS_ENV) {
            self.allowed_origins = v
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = env_value(env, DATABASE_ENV) {
            self.database = Some(PathBuf::from(v));
        }
        if let Some(v) = env_value(env, SESSION_TTL_ENV) {
            self.session_ttl_minutes = v.parse().map_err(|_| {
                SettingsError::InvalidValue(format!("invalid session TTL `{v}`"))
            })?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &SettingsOverrides) {
        if let Some(v) = &overrides.host {
            self.host = v.clone();
        }
        if let Some(v) = overrides.port {
            self.port = v;
        }
        if !overrides.allowed_origins.is_empty() {
            self.allowed_origins = overrides.allowed_origins.clone();
        }
        if let Some(v) = &overrides.database {
            self.database = Some(v.clone());
        }
        if let Some(v) = overrides.session_ttl_minutes {
            self.session_ttl_minutes = v;
        }
    }
}

fn env_value<'a>(env: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn is_origin(origin: &str) -> bool {
    match origin.parse::<Uri>() {
        Ok(uri) => {
            matches!(uri.scheme_str(), Some("http") | Some("https"))
                && uri.authority().is_some()
                && matches!(uri.path(), "" | "/")
                && !origin.ends_with('/')
                && uri.query().is_none()
        }
        Err(_) => false,
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("No database configured; set LETTERBOX_DATABASE or pass --database")]
    MissingDatabase,
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),
}
