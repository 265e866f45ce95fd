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

//! Geographic data model for the campus map.
//!
//! Buildings, rooms and coordinates are loaded once per session and treated as
//! immutable afterwards. Filtering and distance ordering always produce new
//! sequences instead of mutating the loaded data in place.

use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres, used for great-circle distances.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Accepted clock formats for room slot boundaries.
const SLOT_TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

/// A geographic coordinate in degrees, longitude first.
///
/// Serialized as a `[lng, lat]` pair to match the map engine convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    /// Longitude in degrees, east positive.
    pub lng: f64,
    /// Latitude in degrees, north positive.
    pub lat: f64,
}

impl LngLat {
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Whether both components are finite and inside the WGS84 ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lng.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lng)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// Great-circle distance to `other` in kilometres (haversine).
    #[must_use]
    pub fn distance_km(&self, other: &Self) -> f64 {
        haversine_km(self.lat, self.lng, other.lat, other.lng)
    }
}

impl From<[f64; 2]> for LngLat {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(p: LngLat) -> Self {
        [p.lng, p.lat]
    }
}

impl fmt::Display for LngLat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lng, self.lat)
    }
}

/// Calculate distance between two lat/lon points using the haversine formula (in km).
fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Availability of a building or a room slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    #[default]
    Available,
    Unavailable,
    Upcoming,
    /// Any status string the data source sends that we do not recognise.
    #[serde(other)]
    Unknown,
}

impl Availability {
    /// Marker style class for this status.
    #[must_use]
    pub fn style_class(self) -> &'static str {
        match self {
            Self::Available => "status-available",
            Self::Unavailable => "status-unavailable",
            Self::Upcoming => "status-upcoming",
            Self::Unknown => "status-unknown",
        }
    }
}

/// A bookable time window for a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    #[serde(rename = "StartTime")]
    pub start: String,
    #[serde(rename = "EndTime")]
    pub end: String,
    #[serde(rename = "Status", default)]
    pub status: Availability,
}

impl Slot {
    /// Whether `time` falls in `[start, end)`.
    ///
    /// Slots with unparseable boundaries never cover anything.
    #[must_use]
    pub fn covers(&self, time: NaiveTime) -> bool {
        match (parse_clock(&self.start), parse_clock(&self.end)) {
            (Some(start), Some(end)) => start <= time && time < end,
            _ => false,
        }
    }
}

fn parse_clock(value: &str) -> Option<NaiveTime> {
    SLOT_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(value.trim(), fmt).ok())
}

/// A room inside a building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Display label, e.g. `"101"`.
    pub number: String,
    #[serde(default)]
    pub floor: u32,
    /// Free-text category such as `"Lab"`, display only.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slots: Vec<Slot>,
}

impl Room {
    #[must_use]
    pub fn new(number: impl Into<String>, floor: u32, kind: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            floor,
            kind: kind.into(),
            slots: Vec::new(),
        }
    }

    /// Whether any available slot covers `time`.
    #[must_use]
    pub fn is_open_at(&self, time: NaiveTime) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.status == Availability::Available && slot.covers(time))
    }
}

/// A mapped campus building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    /// Stable identifier shared by markers, list entries and selection state.
    pub id: String,
    pub name: String,
    pub coords: LngLat,
    /// Rooms in display order.
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub status: Availability,
    /// Distance from the user in km, set when the list was ordered by proximity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl Building {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, coords: LngLat) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            coords,
            rooms: Vec::new(),
            status: Availability::default(),
            distance_km: None,
        }
    }

    #[must_use]
    pub fn with_rooms(mut self, rooms: Vec<Room>) -> Self {
        self.rooms = rooms;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: Availability) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn has_valid_coords(&self) -> bool {
        self.coords.is_valid()
    }
}

/// Return a copy of `buildings` ordered by distance from `from`, nearest first.
///
/// Each building gets its `distance_km` filled in. Buildings with invalid
/// coordinates sort last and keep `distance_km` unset. The sort is stable, so
/// equal distances keep provider order.
#[must_use]
pub fn sort_by_distance(buildings: &[Building], from: LngLat) -> Vec<Building> {
    let mut sorted: Vec<Building> = buildings
        .iter()
        .cloned()
        .map(|mut b| {
            b.distance_km = b.has_valid_coords().then(|| from.distance_km(&b.coords));
            b
        })
        .collect();

    sorted.sort_by(|a, b| match (a.distance_km, b.distance_km) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    sorted
}
