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

//! Map-view synchronization engine for interactive campus maps.
//!
//! This library keeps a single long-lived map viewport, its building markers
//! and a searchable building list in sync. It is organized in layers that can
//! be used independently or composed through [`CampusMap`]:
//!
//! - **Geo layer**: buildings, rooms, coordinates and distance ordering
//! - **Search layer**: pure room-number filtering of the building list
//! - **Engine layer**: the [`MapEngine`] trait, a shared [`MapHandle`] and an
//!   in-memory [`HeadlessMap`]
//! - **Camera layer**: distance-aware jump/fly transitions
//! - **Marker layer**: marker reconciliation against the effective list
//! - **Selection layer**: the active building / search state machine
//!
//! # Quick Start
//!
//! ```
//! use campus_map::{CampusMap, HeadlessMap, MapOptions, NoGeolocation, SessionConfig, StaticProvider};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut session = CampusMap::<HeadlessMap>::mount(SessionConfig {
//!         map: MapOptions {
//!             access_token: Some("pk.example".to_string()),
//!             ..Default::default()
//!         },
//!         ..Default::default()
//!     });
//!     session.load(&StaticProvider::campus(), &NoGeolocation).await;
//!
//!     session.on_search_input("20");
//!     for building in session.snapshot().effective_buildings.iter() {
//!         println!("{}: {} matching rooms", building.name, building.rooms.len());
//!     }
//! }
//! ```
//!
//! # Using Individual Layers
//!
//! ## Search Only
//!
//! ```
//! use campus_map::{filter_buildings, Building, LngLat, Room};
//!
//! let buildings = vec![Building::new("MB", "Main Building", LngLat::new(106.919, 47.9227))
//!     .with_rooms(vec![Room::new("101", 1, "Lecture Hall"), Room::new("202", 2, "Lab")])];
//!
//! let result = filter_buildings(&buildings, "20");
//! assert_eq!(result[0].rooms.len(), 1);
//! assert_eq!(result[0].rooms[0].number, "202");
//! ```
//!
//! ## Camera Only
//!
//! ```
//! use campus_map::{CameraConfig, CameraController, HeadlessMap, LngLat, MapHandle, MapOptions, Transition};
//!
//! let map = MapHandle::<HeadlessMap>::acquire(&MapOptions {
//!     access_token: Some("pk.example".to_string()),
//!     ..Default::default()
//! })
//! .unwrap();
//! let camera = CameraController::new(map, CameraConfig::default());
//!
//! // A short hop from the default campus center animates.
//! let transition = camera.move_to(LngLat::new(106.9200, 47.9220)).unwrap();
//! assert!(matches!(transition, Transition::Fly(_)));
//! ```

pub mod camera;
pub mod engine;
pub mod error;
pub mod geo;
pub mod geolocation;
pub mod markers;
pub mod provider;
pub mod search;
pub mod selection;
pub mod session;

pub use camera::{
    CameraConfig, CameraController, CameraError, MoveDistance, Transition, TransitionPolicy,
};
pub use engine::{
    Bounds, ClickHandler, HeadlessMap, MapEngine, MapError, MapHandle, MapOptions, MarkerId,
    MarkerKind, MarkerSpec, Viewport,
};
pub use error::CampusError;
pub use geo::{sort_by_distance, Availability, Building, LngLat, Room, Slot};
pub use geolocation::{FixedPosition, Geolocation, GeolocationError, NoGeolocation};
pub use markers::{MarkerConfig, MarkerEvent, MarkerManager, ReconcileReport, ReconcileStrategy};
pub use provider::{DataProvider, JsonFileProvider, ProviderError, StaticProvider};
pub use search::{filter_buildings, match_count};
pub use selection::{
    SelectionConfig, SelectionCoordinator, SelectionEvent, SelectionMode, SelectionState,
};
pub use session::{CampusMap, SessionConfig, Snapshot};
