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

//! Selection coordinator.
//!
//! Single source of truth for which building is active and what the user is
//! searching for. Marker clicks, list selections and search input all come
//! through here and are turned into camera moves and [`SelectionEvent`]s that
//! the presentation layer observes (for example to scroll a list entry into
//! view).
//!
//! Search and single selection are mutually exclusive: a non-empty query
//! always clears the active building.

use std::borrow::Cow;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::broadcast;

use crate::camera::{CameraController, Transition};
use crate::engine::MapEngine;
use crate::error::CampusError;
use crate::geo::Building;
use crate::search::filter_buildings;

/// The coordinator's observable state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub active_building_id: Option<String>,
    pub search_query: String,
}

/// Which of the three modes the state is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode<'a> {
    Idle,
    BuildingSelected(&'a str),
    Searching(&'a str),
}

impl SelectionState {
    #[must_use]
    pub fn mode(&self) -> SelectionMode<'_> {
        match (&self.active_building_id, self.search_query.as_str()) {
            (_, q) if !q.is_empty() => SelectionMode::Searching(q),
            (Some(id), _) => SelectionMode::BuildingSelected(id),
            (None, _) => SelectionMode::Idle,
        }
    }
}

/// Events for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    /// The active building changed; `Some` entries should be opened and
    /// scrolled into view.
    SelectionChanged(Option<String>),
    /// The search query changed.
    QueryChanged(String),
}

/// What a coordinator call changed, for the caller to act on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    /// The effective building list differs from before the call.
    pub effective_changed: bool,
    /// The camera transition that was started, if any.
    pub transition: Option<Transition>,
}

/// Options for the coordinator.
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    pub event_channel_capacity: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: 64,
        }
    }
}

/// Coordinates selection state, camera moves and selection events.
#[derive(Debug)]
pub struct SelectionCoordinator<E: MapEngine> {
    state: SelectionState,
    buildings: Arc<[Building]>,
    camera: Option<CameraController<E>>,
    event_tx: broadcast::Sender<SelectionEvent>,
}

impl<E: MapEngine> SelectionCoordinator<E> {
    /// Create a coordinator in the idle state.
    ///
    /// `camera` is `None` when no map surface is available; selection and
    /// search keep working without camera moves.
    #[must_use]
    pub fn new(
        buildings: Arc<[Building]>,
        camera: Option<CameraController<E>>,
        config: SelectionConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity.max(1));
        Self {
            state: SelectionState::default(),
            buildings,
            camera,
            event_tx,
        }
    }

    #[must_use]
    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    #[must_use]
    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    /// Replace the dataset. Resets to idle when the active building vanished.
    pub fn set_buildings(&mut self, buildings: Arc<[Building]>) {
        self.buildings = buildings;
        if let Some(id) = self.state.active_building_id.clone() {
            if self.find(&id).is_none() {
                self.set_active(None);
            }
        }
    }

    #[must_use]
    pub fn camera(&self) -> Option<&CameraController<E>> {
        self.camera.as_ref()
    }

    /// The full list, or its search-filtered subset while a query is active.
    #[must_use]
    pub fn effective_buildings(&self) -> Cow<'_, [Building]> {
        filter_buildings(&self.buildings, &self.state.search_query)
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SelectionEvent> {
        self.event_tx.subscribe()
    }

    /// A building marker was clicked.
    ///
    /// Any active search is cleared so the selected building is never
    /// filtered out of the list.
    pub fn on_marker_click(&mut self, building_id: &str) -> Result<Outcome, CampusError> {
        self.require(building_id)?;
        let effective_changed = self.leave_search();
        if self.state.active_building_id.as_deref() == Some(building_id) {
            // Already active: still ask the list to scroll back to it.
            let _ = self
                .event_tx
                .send(SelectionEvent::SelectionChanged(Some(building_id.to_string())));
        } else {
            self.set_active(Some(building_id.to_string()));
        }
        info!("Marker clicked: {}", building_id);
        Ok(Outcome {
            effective_changed,
            transition: None,
        })
    }

    /// A list entry was opened: select it and move the camera there.
    pub fn on_list_select(&mut self, building_id: &str) -> Result<Outcome, CampusError> {
        let target = self.require(building_id)?.coords;
        let effective_changed = self.leave_search();
        self.set_active(Some(building_id.to_string()));
        Ok(Outcome {
            effective_changed,
            transition: self.move_camera(target),
        })
    }

    /// The open list entry was collapsed.
    pub fn clear_selection(&mut self) -> Outcome {
        self.set_active(None);
        Outcome::default()
    }

    /// The search box changed.
    pub fn on_search_input(&mut self, query: &str) -> Outcome {
        if query == self.state.search_query {
            return Outcome::default();
        }
        self.set_query(query.to_string());
        if !query.is_empty() {
            self.set_active(None);
        }
        Outcome {
            effective_changed: true,
            transition: None,
        }
    }

    /// A room in the search results was clicked: fly there, keep the results.
    pub fn on_room_result_click(&mut self, building_id: &str) -> Result<Outcome, CampusError> {
        let target = self.require(building_id)?.coords;
        Ok(Outcome {
            effective_changed: false,
            transition: self.move_camera(target),
        })
    }

    fn leave_search(&mut self) -> bool {
        if self.state.search_query.is_empty() {
            return false;
        }
        self.set_query(String::new());
        true
    }

    fn find(&self, building_id: &str) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == building_id)
    }

    fn require(&self, building_id: &str) -> Result<&Building, CampusError> {
        self.find(building_id)
            .ok_or_else(|| CampusError::UnknownBuilding(building_id.to_string()))
    }

    fn move_camera(&self, target: crate::geo::LngLat) -> Option<Transition> {
        let camera = self.camera.as_ref()?;
        match camera.move_to(target) {
            Ok(transition) => Some(transition),
            Err(e) => {
                warn!("Camera move to {} failed: {}", target, e);
                None
            }
        }
    }

    fn set_active(&mut self, id: Option<String>) {
        if self.state.active_building_id == id {
            return;
        }
        debug!("Active building: {:?} -> {:?}", self.state.active_building_id, id);
        self.state.active_building_id.clone_from(&id);
        let _ = self.event_tx.send(SelectionEvent::SelectionChanged(id));
    }

    fn set_query(&mut self, query: String) {
        self.state.search_query.clone_from(&query);
        let _ = self.event_tx.send(SelectionEvent::QueryChanged(query));
    }
}
