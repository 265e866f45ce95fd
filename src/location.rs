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


//! IP-based position lookup.

use campus_map::{Geolocation, GeolocationError, LngLat};
use log::{debug, info, warn};
use serde_json::Value;
use thiserror::Error;

/// Why a single lookup service failed
#[derive(Debug, Error)]
enum LookupError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no usable coordinates in response from {0}")]
    MissingCoordinates(&'static str),
}

/// A lookup service and the JSON fields holding its coordinates
#[derive(Debug, Clone)]
struct LookupService {
    url: &'static str,
    lat_field: &'static str,
    lng_field: &'static str,
}

const SERVICES: [LookupService; 2] = [
    LookupService {
        url: "https://ipapi.co/json/",
        lat_field: "latitude",
        lng_field: "longitude",
    },
    // Fallback, no API key needed
    LookupService {
        url: "http://ip-api.com/json/",
        lat_field: "lat",
        lng_field: "lon",
    },
];

impl LookupService {
    fn extract(&self, value: &Value) -> Option<LngLat> {
        let lat = value.get(self.lat_field).and_then(Value::as_f64)?;
        let lng = value.get(self.lng_field).and_then(Value::as_f64)?;
        let position = LngLat::new(lng, lat);
        position.is_valid().then_some(position)
    }

    async fn query(&self, client: &reqwest::Client) -> Result<LngLat, LookupError> {
        let response = client.get(self.url).send().await?.error_for_status()?;
        let value: Value = response.json().await?;
        self.extract(&value).ok_or(LookupError::MissingCoordinates(self.url))
    }
}

/// Locates the user from their public IP address
#[derive(Debug, Clone, Default)]
pub struct IpGeolocation {
    client: reqwest::Client,
}

impl IpGeolocation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Geolocation for IpGeolocation {
    async fn request_position(&self) -> Result<LngLat, GeolocationError> {
        let mut last_error = None;
        for service in &SERVICES {
            debug!("Requesting IP location from {}", service.url);
            match service.query(&self.client).await {
                Ok(position) => {
                    info!("Location found via {}: {}", service.url, position);
                    return Ok(position);
                }
                Err(e) => {
                    warn!("IP location lookup via {} failed: {}", service.url, e);
                    last_error = Some(e);
                }
            }
        }
        Err(GeolocationError::Unavailable(last_error.map_or_else(
            || "no lookup service configured".to_string(),
            |e| e.to_string(),
        )))
    }
}
