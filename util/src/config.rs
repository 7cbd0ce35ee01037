//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from `.env` and environment variables. It
//! provides thread-safe access, plus per-field setters so tests can override
//! values without touching the process environment.
//!
//! Every value has a default. A variable that is present but cannot be parsed
//! falls back to its default and logs a warning instead of aborting start-up.

use std::env;
use std::str::FromStr;
use std::sync::{OnceLock, RwLock, RwLockReadGuard};

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    /// Base URL of the attendance backend, without a trailing slash.
    pub attendance_api_url: String,
    pub check_in_path: String,
    pub check_out_path: String,
    pub http_timeout_secs: u64,
    pub location_timeout_ms: u64,
    pub location_high_accuracy: bool,
    pub camera_start_timeout_ms: u64,
    /// JSON file holding the signed-in user and bearer token.
    pub session_store_path: String,
    /// Fixed coordinates for a stationary desk or kiosk. Both must be set for
    /// a fixed location to be used.
    pub station_latitude: Option<f64>,
    pub station_longitude: Option<f64>,
    pub station_accuracy: Option<f64>,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("{key}={raw:?} is not valid, using default");
            default
        }),
        Err(_) => default,
    }
}

fn parsed_opt<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("{key}={raw:?} is not valid, ignoring");
            None
        }
    }
}

fn flag_or(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: var_or("APP_ENV", "development"),
            project_name: var_or("PROJECT_NAME", "attend"),
            log_level: var_or("LOG_LEVEL", "info"),
            log_file: var_or("LOG_FILE", "attend.log"),
            log_to_stdout: flag_or("LOG_TO_STDOUT", false),
            attendance_api_url: var_or("ATTENDANCE_API_URL", "http://127.0.0.1:3000/api")
                .trim_end_matches('/')
                .to_string(),
            check_in_path: var_or("CHECK_IN_PATH", "/attendance/check-in"),
            check_out_path: var_or("CHECK_OUT_PATH", "/attendance/check-out"),
            http_timeout_secs: parsed_or("HTTP_TIMEOUT_SECS", 15),
            location_timeout_ms: parsed_or("LOCATION_TIMEOUT_MS", 10_000),
            location_high_accuracy: flag_or("LOCATION_HIGH_ACCURACY", true),
            camera_start_timeout_ms: parsed_or("CAMERA_START_TIMEOUT_MS", 15_000),
            session_store_path: var_or("SESSION_STORE_PATH", "session.json"),
            station_latitude: parsed_opt("STATION_LATITUDE"),
            station_longitude: parsed_opt("STATION_LONGITUDE"),
            station_accuracy: parsed_opt("STATION_ACCURACY"),
        }
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// A poisoned lock is recovered, since the config is plain data.
    pub fn global() -> RwLockReadGuard<'static, AppConfig> {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            let mut guard = lock.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            *guard = AppConfig::from_env();
        }
    }

    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        let mut guard = lock.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_log_level(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.log_level = value.into());
    }

    pub fn set_log_file(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.log_file = value.into());
    }

    pub fn set_log_to_stdout(value: bool) {
        AppConfig::set_field(|cfg| cfg.log_to_stdout = value);
    }

    pub fn set_attendance_api_url(value: impl Into<String>) {
        let value = value.into();
        AppConfig::set_field(|cfg| cfg.attendance_api_url = value.trim_end_matches('/').into());
    }

    pub fn set_http_timeout_secs(value: u64) {
        AppConfig::set_field(|cfg| cfg.http_timeout_secs = value);
    }

    pub fn set_location_timeout_ms(value: u64) {
        AppConfig::set_field(|cfg| cfg.location_timeout_ms = value);
    }

    pub fn set_camera_start_timeout_ms(value: u64) {
        AppConfig::set_field(|cfg| cfg.camera_start_timeout_ms = value);
    }

    pub fn set_session_store_path(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.session_store_path = value.into());
    }

    pub fn set_station_location(latitude: f64, longitude: f64, accuracy: Option<f64>) {
        AppConfig::set_field(|cfg| {
            cfg.station_latitude = Some(latitude);
            cfg.station_longitude = Some(longitude);
            cfg.station_accuracy = accuracy;
        });
    }
}

// --- Getters below ---

pub fn env() -> String {
    AppConfig::global().env.clone()
}

pub fn project_name() -> String {
    AppConfig::global().project_name.clone()
}

pub fn log_level() -> String {
    AppConfig::global().log_level.clone()
}

pub fn log_file() -> String {
    AppConfig::global().log_file.clone()
}

pub fn log_to_stdout() -> bool {
    AppConfig::global().log_to_stdout
}

pub fn attendance_api_url() -> String {
    AppConfig::global().attendance_api_url.clone()
}

pub fn check_in_path() -> String {
    AppConfig::global().check_in_path.clone()
}

pub fn check_out_path() -> String {
    AppConfig::global().check_out_path.clone()
}

pub fn http_timeout_secs() -> u64 {
    AppConfig::global().http_timeout_secs
}

pub fn location_timeout_ms() -> u64 {
    AppConfig::global().location_timeout_ms
}

pub fn location_high_accuracy() -> bool {
    AppConfig::global().location_high_accuracy
}

pub fn camera_start_timeout_ms() -> u64 {
    AppConfig::global().camera_start_timeout_ms
}

pub fn session_store_path() -> String {
    AppConfig::global().session_store_path.clone()
}

/// Returns `(latitude, longitude, accuracy)` when a station location is configured.
pub fn station_location() -> Option<(f64, f64, Option<f64>)> {
    let cfg = AppConfig::global();
    match (cfg.station_latitude, cfg.station_longitude) {
        (Some(lat), Some(lon)) => Some((lat, lon, cfg.station_accuracy)),
        _ => None,
    }
}
