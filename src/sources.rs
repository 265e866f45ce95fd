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


//! Resolves the configured data and location sources.

use campus_map::{
    Building, DataProvider, FixedPosition, Geolocation, GeolocationError, JsonFileProvider,
    LngLat, NoGeolocation, ProviderError, StaticProvider,
};
use log::warn;

use crate::backend::HttpProvider;
use crate::config::{AppConfig, DataSource, LocationSource};
use crate::location::IpGeolocation;

/// The building provider selected by configuration
#[derive(Debug)]
pub enum ConfiguredProvider {
    Static(StaticProvider),
    File(JsonFileProvider),
    Http(HttpProvider),
}

impl ConfiguredProvider {
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        Ok(match config.data_source {
            DataSource::Static => Self::Static(StaticProvider::campus()),
            DataSource::File => {
                let path = config.data_file.as_ref().ok_or_else(|| {
                    ProviderError::Backend("data_source = \"file\" needs data_file".to_string())
                })?;
                Self::File(JsonFileProvider::new(path))
            }
            DataSource::Http => Self::Http(HttpProvider::new(&config.backend_url)),
        })
    }
}

impl DataProvider for ConfiguredProvider {
    async fn get_buildings(&self) -> Result<Vec<Building>, ProviderError> {
        match self {
            Self::Static(p) => p.get_buildings().await,
            Self::File(p) => p.get_buildings().await,
            Self::Http(p) => p.get_buildings().await,
        }
    }

    async fn get_buildings_near(&self, position: LngLat) -> Result<Vec<Building>, ProviderError> {
        match self {
            Self::Static(p) => p.get_buildings_near(position).await,
            Self::File(p) => p.get_buildings_near(position).await,
            Self::Http(p) => p.get_buildings_near(position).await,
        }
    }
}

/// The position source selected by configuration
#[derive(Debug)]
pub enum ConfiguredLocation {
    Disabled(NoGeolocation),
    Fixed(FixedPosition),
    Ip(IpGeolocation),
}

impl ConfiguredLocation {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        match config.location_source {
            LocationSource::Disabled => Self::Disabled(NoGeolocation),
            LocationSource::Fixed => match config.override_position() {
                Some(position) => Self::Fixed(FixedPosition(position)),
                None => {
                    warn!("location_source = \"fixed\" without override coordinates");
                    Self::Disabled(NoGeolocation)
                }
            },
            LocationSource::Ip => Self::Ip(IpGeolocation::new()),
        }
    }
}

impl Geolocation for ConfiguredLocation {
    async fn request_position(&self) -> Result<LngLat, GeolocationError> {
        match self {
            Self::Disabled(g) => g.request_position().await,
            Self::Fixed(g) => g.request_position().await,
            Self::Ip(g) => g.request_position().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_source_requires_path() {
        let config = AppConfig {
            data_source: DataSource::File,
            ..Default::default()
        };
        assert!(matches!(
            ConfiguredProvider::from_config(&config),
            Err(ProviderError::Backend(_))
        ));
    }

    #[test]
    fn test_fixed_source_without_override_is_disabled() {
        let config = AppConfig {
            location_source: LocationSource::Fixed,
            ..Default::default()
        };
        assert!(matches!(
            ConfiguredLocation::from_config(&config),
            ConfiguredLocation::Disabled(_)
        ));
    }

    #[tokio::test]
    async fn test_fixed_source_reports_override() {
        let config = AppConfig {
            location_source: LocationSource::Fixed,
            override_latitude: Some(47.918),
            override_longitude: Some(106.917),
            ..Default::default()
        };
        let location = ConfiguredLocation::from_config(&config);
        assert_eq!(
            location.request_position().await.unwrap(),
            LngLat::new(106.917, 47.918)
        );
    }

    #[tokio::test]
    async fn test_static_source_serves_campus() {
        let provider = ConfiguredProvider::from_config(&AppConfig::default()).unwrap();
        let buildings = provider.get_buildings().await.unwrap();
        assert_eq!(buildings.len(), 4);
        assert_eq!(buildings[0].id, "MB");
    }
}
