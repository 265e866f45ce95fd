// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! Application configuration management.
//!
//! Persistent settings are stored in TOML via `confy`. The map access token can
//! also come from the `MAPBOX_ACCESS_TOKEN` environment variable, which wins over
//! the file.

use std::path::PathBuf;
use std::time::Duration;

use campus_map::{
    CameraConfig, LngLat, MapOptions, MarkerConfig, ReconcileStrategy, SessionConfig,
    TransitionPolicy,
};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "campus-atlas";
const CONFIG_NAME: &str = "config";

/// Environment variable holding the map access token
pub const ACCESS_TOKEN_ENV: &str = "MAPBOX_ACCESS_TOKEN";

/// Default backend serving `/api/open-classrooms`
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";

/// Where the building list comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Built-in campus table
    #[default]
    Static,
    /// JSON file at `data_file`
    File,
    /// Open-classrooms backend at `backend_url`
    Http,
}

/// How the user's position is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    /// Never locate; the list keeps provider order
    Disabled,
    /// Use `override_latitude` / `override_longitude`
    Fixed,
    /// IP-based lookup
    #[default]
    Ip,
}

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Building data source
    #[serde(default)]
    pub data_source: DataSource,

    /// Path of the JSON building list when `data_source = "file"`
    #[serde(default)]
    pub data_file: Option<PathBuf>,

    /// Backend base URL when `data_source = "http"`
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Map access token (optional, env var takes precedence)
    #[serde(default)]
    pub access_token: Option<String>,

    /// Map style URL
    #[serde(default = "default_style_url")]
    pub style_url: String,

    /// Camera policy: "distance_based" or "always_animate"
    #[serde(default)]
    pub camera_policy: TransitionPolicy,

    /// Per-axis degree delta beyond which the camera jumps instead of flying
    #[serde(default = "default_far_threshold")]
    pub far_threshold_deg: f64,

    /// Zoom used when focusing a building (15.0 - 18.0)
    #[serde(default = "default_focus_zoom")]
    pub focus_zoom: f64,

    /// Pitch used when focusing a building, in degrees
    #[serde(default = "default_focus_pitch")]
    pub focus_pitch: f64,

    /// Fly animation duration in milliseconds
    #[serde(default = "default_fly_duration_ms")]
    pub fly_duration_ms: u64,

    /// Marker reconciliation: "rebuild" or "diff"
    #[serde(default)]
    pub marker_strategy: ReconcileStrategy,

    /// Position source
    #[serde(default)]
    pub location_source: LocationSource,

    /// Override latitude (for `location_source = "fixed"`)
    #[serde(default)]
    pub override_latitude: Option<f64>,

    /// Override longitude (for `location_source = "fixed"`)
    #[serde(default)]
    pub override_longitude: Option<f64>,

    /// Upper bound for a position lookup in seconds
    #[serde(default = "default_location_timeout_secs")]
    pub location_timeout_secs: u64,
}

// Default value functions for serde
fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_style_url() -> String {
    MapOptions::default().style_url
}

fn default_far_threshold() -> f64 {
    campus_map::camera::DEFAULT_FAR_THRESHOLD_DEG
}

fn default_focus_zoom() -> f64 {
    18.0
}

fn default_focus_pitch() -> f64 {
    60.0
}

fn default_fly_duration_ms() -> u64 {
    2000
}

fn default_location_timeout_secs() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_source: DataSource::default(),
            data_file: None,
            backend_url: default_backend_url(),
            access_token: None,
            style_url: default_style_url(),
            camera_policy: TransitionPolicy::default(),
            far_threshold_deg: default_far_threshold(),
            focus_zoom: default_focus_zoom(),
            focus_pitch: default_focus_pitch(),
            fly_duration_ms: default_fly_duration_ms(),
            marker_strategy: ReconcileStrategy::default(),
            location_source: LocationSource::default(),
            override_latitude: None,
            override_longitude: None,
            location_timeout_secs: default_location_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Resolve the access token from environment variable or config
    #[must_use]
    pub fn resolve_access_token(&self) -> Option<String> {
        Self::resolve_access_token_from(
            std::env::var(ACCESS_TOKEN_ENV).ok(),
            self.access_token.as_deref(),
        )
    }

    fn resolve_access_token_from(
        env_token: Option<String>,
        config_token: Option<&str>,
    ) -> Option<String> {
        // Check environment variable first
        if let Some(token) = env_token.filter(|t| !t.is_empty()) {
            return Some(token);
        }

        // Fall back to config
        config_token.map(str::to_owned).filter(|t| !t.is_empty())
    }

    /// The configured override position, if both coordinates are set
    #[must_use]
    pub fn override_position(&self) -> Option<LngLat> {
        match (self.override_latitude, self.override_longitude) {
            (Some(lat), Some(lng)) => Some(LngLat::new(lng, lat)),
            _ => None,
        }
    }

    /// Build the engine session configuration
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        let defaults = CameraConfig::default();
        SessionConfig {
            map: MapOptions {
                access_token: self.resolve_access_token(),
                style_url: self.style_url.clone(),
                ..MapOptions::default()
            },
            camera: CameraConfig {
                policy: self.camera_policy,
                far_threshold_deg: self.far_threshold_deg,
                target_zoom: self.focus_zoom,
                target_pitch: self.focus_pitch,
                fly_duration: Duration::from_millis(self.fly_duration_ms),
                ..defaults
            },
            markers: MarkerConfig {
                strategy: self.marker_strategy,
            },
            geolocation_timeout: Duration::from_secs(self.location_timeout_secs),
            ..SessionConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_defaults() {
        let config = AppConfig::default();
        let session = config.session_config();

        assert_eq!(config.data_source, DataSource::Static);
        assert_eq!(config.location_source, LocationSource::Ip);
        assert_eq!(session.camera.policy, TransitionPolicy::DistanceBased);
        assert!((session.camera.far_threshold_deg - 0.02).abs() < f64::EPSILON);
        assert_eq!(session.camera.fly_duration, Duration::from_millis(2000));
        assert_eq!(session.markers.strategy, ReconcileStrategy::Rebuild);
        assert_eq!(session.geolocation_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_env_token_takes_precedence() {
        assert_eq!(
            AppConfig::resolve_access_token_from(Some("pk.env".into()), Some("pk.file")),
            Some("pk.env".to_string())
        );
        assert_eq!(
            AppConfig::resolve_access_token_from(Some(String::new()), Some("pk.file")),
            Some("pk.file".to_string())
        );
        assert_eq!(AppConfig::resolve_access_token_from(None, Some("")), None);
        assert_eq!(AppConfig::resolve_access_token_from(None, None), None);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = from_json(serde_json::json!({
            "data_source": "http",
            "camera_policy": "always_animate",
            "marker_strategy": "diff",
        }));

        assert_eq!(config.data_source, DataSource::Http);
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.camera_policy, TransitionPolicy::AlwaysAnimate);
        assert_eq!(config.marker_strategy, ReconcileStrategy::Diff);
        assert_eq!(config.fly_duration_ms, 2000);
    }

    #[test]
    fn test_override_position_needs_both_coordinates() {
        let mut config = AppConfig {
            override_latitude: Some(47.92),
            ..Default::default()
        };
        assert_eq!(config.override_position(), None);

        config.override_longitude = Some(106.92);
        assert_eq!(config.override_position(), Some(LngLat::new(106.92, 47.92)));
    }

    fn from_json(value: serde_json::Value) -> AppConfig {
        serde_json::from_value(value).unwrap()
    }
}
