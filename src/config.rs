//! Application configuration loaded from environment variables.
//!
//! Everything has a default, so the server starts with no environment at
//! all; a `.env` file is read first when present.

use crate::models::{LatLng, MapType};
use crate::services::editor::EditorOptions;
use crate::services::session::SessionDefaults;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default map center when nothing else is known.
pub const DEFAULT_CENTER: LatLng = LatLng::new(27.342860470286933, 75.79046143662488);
pub const DEFAULT_ZOOM: u8 = 15;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    pub default_center: LatLng,
    pub default_zoom: u8,
    pub default_map_type: MapType,
    /// Behavior switches applied to every new editor.
    pub editor_options: EditorOptions,
    /// Upper bound on concurrently open editor sessions.
    pub max_sessions: usize,
    /// Sessions untouched for this long are dropped when a new one is created.
    pub session_idle_ttl: Duration,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            default_center: DEFAULT_CENTER,
            default_zoom: DEFAULT_ZOOM,
            default_map_type: MapType::Hybrid,
            editor_options: EditorOptions::default(),
            max_sessions: 1000,
            session_idle_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();
        let default_center = LatLng::new(
            parse_var("DEFAULT_CENTER_LAT", defaults.default_center.lat)?,
            parse_var("DEFAULT_CENTER_LNG", defaults.default_center.lng)?,
        );
        if !default_center.is_valid() {
            return Err(ConfigError::Invalid {
                name: "DEFAULT_CENTER_LAT/DEFAULT_CENTER_LNG",
                value: format!("{},{}", default_center.lat, default_center.lng),
            });
        }

        let default_zoom: u8 = parse_var("DEFAULT_ZOOM", defaults.default_zoom)?;
        if default_zoom > crate::services::viewport::MAX_ZOOM {
            return Err(ConfigError::Invalid {
                name: "DEFAULT_ZOOM",
                value: default_zoom.to_string(),
            });
        }

        let idle_ttl_secs: u64 =
            parse_var("SESSION_IDLE_TTL", defaults.session_idle_ttl.as_secs())?;
        if idle_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "SESSION_IDLE_TTL",
                value: idle_ttl_secs.to_string(),
            });
        }

        Ok(Self {
            port: parse_var("PORT", defaults.port)?,
            frontend_url: env::var("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            default_center,
            default_zoom,
            default_map_type: parse_var("DEFAULT_MAP_TYPE", defaults.default_map_type)?,
            editor_options: EditorOptions {
                auto_close_on_new_field: parse_flag(
                    "AUTO_CLOSE_ON_NEW_FIELD",
                    defaults.editor_options.auto_close_on_new_field,
                )?,
                edge_insertion: parse_flag(
                    "EDGE_INSERTION",
                    defaults.editor_options.edge_insertion,
                )?,
                editable_labels: parse_flag(
                    "EDITABLE_LABELS",
                    defaults.editor_options.editable_labels,
                )?,
            },
            max_sessions: parse_var("MAX_SESSIONS", defaults.max_sessions)?,
            session_idle_ttl: Duration::from_secs(idle_ttl_secs),
        })
    }

    /// Starting state for every new editor session.
    pub fn session_defaults(&self) -> SessionDefaults {
        SessionDefaults {
            center: self.default_center,
            zoom: self.default_zoom,
            map_type: self.default_map_type,
            options: self.editor_options,
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn parse_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value }),
        },
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
