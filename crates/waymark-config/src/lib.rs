//! Configuration for the waymark dashboard.
//!
//! TOML file + `WAYMARK_`-prefixed environment overrides, merged with
//! figment and translated to `waymark_core::TrackerConfig`. The TUI is
//! the only consumer today, but the shapes here stay UI-agnostic.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use waymark_core::{GeoPoint, TrackerConfig, DEFAULT_CENTER, DEFAULT_ZOOM};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub map: MapConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// Backend endpoints and socket tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// WebSocket URL of the realtime feed.
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    /// Base URL of the HTTP API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Lookup request timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            api_url: default_api_url(),
            timeout: default_timeout(),
        }
    }
}

fn default_feed_url() -> String {
    "ws://localhost:5000/feed".into()
}
fn default_api_url() -> String {
    "http://localhost:5000/".into()
}
fn default_timeout() -> u64 {
    5
}

/// Initial map view and camera behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MapConfig {
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,

    #[serde(default = "default_center_lng")]
    pub center_lng: f64,

    #[serde(default = "default_zoom")]
    pub zoom: u8,

    /// Start in satellite rendering.
    #[serde(default)]
    pub satellite: bool,

    /// Snap the camera back to the home view when a device is
    /// deselected. Off by default: the camera stays where the user
    /// put it.
    #[serde(default)]
    pub reset_camera_on_deselect: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: default_center_lat(),
            center_lng: default_center_lng(),
            zoom: default_zoom(),
            satellite: false,
            reset_camera_on_deselect: false,
        }
    }
}

fn default_center_lat() -> f64 {
    DEFAULT_CENTER.lat
}
fn default_center_lng() -> f64 {
    DEFAULT_CENTER.lng
}
fn default_zoom() -> u8 {
    DEFAULT_ZOOM
}

impl MapConfig {
    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lat: self.center_lat,
            lng: self.center_lng,
        }
    }
}

/// Registry persistence location.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Override for the accessory registry file. When unset the
    /// platform data directory is used.
    pub registry_path: Option<PathBuf>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "waymark", "waymark").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("waymark");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full [`Config`] from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file (the `--config` flag).
pub fn load_config_from(path: &std::path::Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("WAYMARK_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, falling back to defaults on any failure.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a [`TrackerConfig`] from the loaded configuration.
pub fn to_tracker_config(cfg: &Config) -> Result<TrackerConfig, ConfigError> {
    let feed_url: url::Url =
        cfg.server
            .feed_url
            .parse()
            .map_err(|_| ConfigError::Validation {
                field: "server.feed_url".into(),
                reason: format!("invalid URL: {}", cfg.server.feed_url),
            })?;

    let api_url: url::Url = cfg
        .server
        .api_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "server.api_url".into(),
            reason: format!("invalid URL: {}", cfg.server.api_url),
        })?;

    let mut tracker = TrackerConfig::new(feed_url, api_url);
    tracker.request_timeout = Duration::from_secs(cfg.server.timeout);
    tracker.reset_camera_on_deselect = cfg.map.reset_camera_on_deselect;
    Ok(tracker)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_point_at_local_backend() {
        let cfg = Config::default();
        assert_eq!(cfg.server.feed_url, "ws://localhost:5000/feed");
        assert_eq!(cfg.map.zoom, DEFAULT_ZOOM);
        assert!(!cfg.map.reset_camera_on_deselect);
        assert!(cfg.storage.registry_path.is_none());
    }

    #[test]
    fn toml_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "waymark.toml",
                r#"
                    [server]
                    feed_url = "ws://tracker.lan:5000/feed"

                    [map]
                    reset_camera_on_deselect = true
                "#,
            )?;

            let cfg = load_config_from(std::path::Path::new("waymark.toml")).unwrap();
            assert_eq!(cfg.server.feed_url, "ws://tracker.lan:5000/feed");
            assert!(cfg.map.reset_camera_on_deselect);
            // Untouched sections keep their defaults.
            assert_eq!(cfg.server.timeout, 5);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("waymark.toml", "[server]\ntimeout = 9\n")?;
            jail.set_env("WAYMARK_SERVER_TIMEOUT", "3");

            let cfg = load_config_from(std::path::Path::new("waymark.toml")).unwrap();
            assert_eq!(cfg.server.timeout, 3);
            Ok(())
        });
    }

    #[test]
    fn invalid_feed_url_is_a_validation_error() {
        let mut cfg = Config::default();
        cfg.server.feed_url = "not a url".into();

        let err = to_tracker_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "server.feed_url"));
    }

    #[test]
    fn tracker_config_carries_map_behavior() {
        let mut cfg = Config::default();
        cfg.map.reset_camera_on_deselect = true;
        cfg.server.timeout = 7;

        let tracker = to_tracker_config(&cfg).unwrap();
        assert!(tracker.reset_camera_on_deselect);
        assert_eq!(tracker.request_timeout, Duration::from_secs(7));
    }
}
