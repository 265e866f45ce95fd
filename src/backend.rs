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


//! HTTP data provider for the open-classrooms backend.
//!
//! `GET /api/open-classrooms` returns buildings in backend order; `POST` with
//! `{"lat", "lng"}` returns them sorted by distance with `distance` in km.

use campus_map::{Availability, Building, DataProvider, LngLat, ProviderError, Room, Slot};
use log::{debug, info};
use serde::{Deserialize, Serialize};

const OPEN_CLASSROOMS_PATH: &str = "/api/open-classrooms";

/// One building as served by the backend
#[derive(Debug, Deserialize)]
struct WireBuilding {
    building: String,
    building_code: String,
    #[serde(default)]
    building_status: Availability,
    #[serde(default)]
    rooms: serde_json::Map<String, serde_json::Value>,
    coords: LngLat,
    #[serde(default)]
    distance: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct WireRoom {
    #[serde(default)]
    slots: Vec<Slot>,
}

#[derive(Debug, Serialize)]
struct PositionBody {
    lat: f64,
    lng: f64,
}

impl WireBuilding {
    fn into_building(self) -> Result<Building, ProviderError> {
        let mut rooms = Vec::with_capacity(self.rooms.len());
        for (number, value) in self.rooms {
            let wire: WireRoom = serde_json::from_value(value)?;
            // The backend carries no floor or room type
            let mut room = Room::new(number, 0, "");
            room.slots = wire.slots;
            rooms.push(room);
        }

        let mut building = Building::new(self.building_code, self.building, self.coords)
            .with_rooms(rooms)
            .with_status(self.building_status);
        // A zero distance means the request carried no position
        building.distance_km = self.distance.filter(|d| *d > 0.0);
        Ok(building)
    }
}

fn parse_buildings(body: &str) -> Result<Vec<Building>, ProviderError> {
    let wire: Vec<WireBuilding> = serde_json::from_str(body)?;
    wire.into_iter().map(WireBuilding::into_building).collect()
}

/// Provider backed by the open-classrooms HTTP API
#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpProvider {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}{OPEN_CLASSROOMS_PATH}", base_url.trim_end_matches('/')),
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Vec<Building>, ProviderError> {
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Backend(format!(
                "{} returned HTTP {status}",
                self.endpoint
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Backend(e.to_string()))?;
        let buildings = parse_buildings(&body)?;
        info!("Fetched {} buildings from {}", buildings.len(), self.endpoint);
        Ok(buildings)
    }
}

impl DataProvider for HttpProvider {
    async fn get_buildings(&self) -> Result<Vec<Building>, ProviderError> {
        debug!("GET {}", self.endpoint);
        self.send(self.client.get(&self.endpoint)).await
    }

    async fn get_buildings_near(&self, position: LngLat) -> Result<Vec<Building>, ProviderError> {
        debug!("POST {} with position {}", self.endpoint, position);
        let body = PositionBody {
            lat: position.lat,
            lng: position.lng,
        };
        self.send(self.client.post(&self.endpoint).json(&body)).await
    }
}
