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

//! Campus map session.
//!
//! Wires the map engine, data provider, geolocation, selection coordinator
//! and marker manager into one mounted view. The presentation layer reads a
//! [`Snapshot`] and calls the `on_*` hooks on user gestures.

use std::borrow::Cow;
use std::time::Duration;

use log::{error, info, warn};
use tokio::sync::{broadcast, mpsc};

use crate::camera::{CameraConfig, CameraController, Transition};
use crate::engine::{MapEngine, MapHandle, MapOptions};
use crate::error::CampusError;
use crate::geo::{sort_by_distance, Building, LngLat};
use crate::geolocation::{locate_once, Geolocation};
use crate::markers::{MarkerConfig, MarkerEvent, MarkerManager};
use crate::provider::DataProvider;
use crate::selection::{Outcome, SelectionConfig, SelectionCoordinator, SelectionEvent};

/// Configuration for a campus map session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub map: MapOptions,
    pub camera: CameraConfig,
    pub markers: MarkerConfig,
    pub selection: SelectionConfig,
    /// Upper bound for the one-shot position request.
    pub geolocation_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            map: MapOptions::default(),
            camera: CameraConfig::default(),
            markers: MarkerConfig::default(),
            selection: SelectionConfig::default(),
            geolocation_timeout: Duration::from_secs(10),
        }
    }
}

/// Read-only view of the session for rendering.
#[derive(Debug)]
pub struct Snapshot<'a> {
    pub effective_buildings: Cow<'a, [Building]>,
    pub active_building_id: Option<&'a str>,
    pub search_query: &'a str,
    /// Data has not arrived yet.
    pub loading: bool,
    /// Whether a map surface is rendered at all.
    pub map_available: bool,
    pub user_position: Option<LngLat>,
    pub load_error: Option<&'a str>,
}

impl Snapshot<'_> {
    /// A search is active and nothing matched.
    #[must_use]
    pub fn no_results(&self) -> bool {
        !self.loading && !self.search_query.is_empty() && self.effective_buildings.is_empty()
    }
}

/// A mounted campus map view.
///
/// Dropping the session releases the map engine along with every marker
/// and listener it added.
#[derive(Debug)]
pub struct CampusMap<E: MapEngine> {
    map: Option<MapHandle<E>>,
    coordinator: SelectionCoordinator<E>,
    markers: Option<MarkerManager<E>>,
    click_rx: mpsc::UnboundedReceiver<MarkerEvent>,
    user_position: Option<LngLat>,
    geolocation_timeout: Duration,
    loading: bool,
    load_error: Option<String>,
}

impl<E: MapEngine> CampusMap<E> {
    /// Mount the view: acquire the map surface and start in the loading state.
    ///
    /// A map that cannot be created (missing token, bad options) is logged
    /// and the session runs without a map surface; search and the building
    /// list keep working.
    #[must_use]
    pub fn mount(config: SessionConfig) -> Self {
        let map = match MapHandle::<E>::acquire(&config.map) {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Map surface not rendered: {}", e);
                None
            }
        };
        Self::with_map(map, config)
    }

    /// Mount on an already created map handle.
    #[must_use]
    pub fn with_map(map: Option<MapHandle<E>>, config: SessionConfig) -> Self {
        let (click_tx, click_rx) = mpsc::unbounded_channel();
        let camera = map
            .clone()
            .map(|handle| CameraController::new(handle, config.camera.clone()));
        let markers = map
            .clone()
            .map(|handle| MarkerManager::new(handle, config.markers.clone(), click_tx));

        Self {
            map,
            coordinator: SelectionCoordinator::new(
                Vec::<Building>::new().into(),
                camera,
                config.selection,
            ),
            markers,
            click_rx,
            user_position: None,
            geolocation_timeout: config.geolocation_timeout,
            loading: true,
            load_error: None,
        }
    }

    /// Locate the user once, then load the building list.
    ///
    /// With a position the list is ordered nearest first; without one the
    /// provider order is kept. A provider failure leaves an empty list and a
    /// `load_error` in the snapshot.
    pub async fn load<P, G>(&mut self, provider: &P, geolocation: &G)
    where
        P: DataProvider,
        G: Geolocation,
    {
        let position = locate_once(geolocation, self.geolocation_timeout).await;

        let result = match position {
            Some(p) => provider.get_buildings_near(p).await,
            None => provider.get_buildings().await,
        };
        match result {
            Ok(buildings) => {
                let buildings = match position {
                    Some(p) => sort_by_distance(&buildings, p),
                    None => buildings,
                };
                info!("Loaded {} buildings", buildings.len());
                self.coordinator.set_buildings(buildings.into());
                self.load_error = None;
            }
            Err(e) => {
                error!("Failed to load building data: {}", e);
                self.load_error = Some(e.to_string());
            }
        }
        self.loading = false;
        self.set_user_position(position);
    }

    /// Current state for the presentation layer.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<'_> {
        let state = self.coordinator.state();
        Snapshot {
            effective_buildings: self.coordinator.effective_buildings(),
            active_building_id: state.active_building_id.as_deref(),
            search_query: &state.search_query,
            loading: self.loading,
            map_available: self.map.as_ref().is_some_and(|m| !m.is_released()),
            user_position: self.user_position,
            load_error: self.load_error.as_deref(),
        }
    }

    /// Subscribe to selection changes (scroll-into-view, query updates).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SelectionEvent> {
        self.coordinator.subscribe()
    }

    pub fn on_marker_click(&mut self, building_id: &str) -> Result<(), CampusError> {
        let outcome = self.coordinator.on_marker_click(building_id)?;
        self.apply(outcome);
        Ok(())
    }

    pub fn on_list_select(&mut self, building_id: &str) -> Result<Option<Transition>, CampusError> {
        let outcome = self.coordinator.on_list_select(building_id)?;
        self.apply(outcome);
        Ok(outcome.transition)
    }

    pub fn on_search_input(&mut self, query: &str) {
        let outcome = self.coordinator.on_search_input(query);
        self.apply(outcome);
    }

    pub fn on_room_result_click(
        &mut self,
        building_id: &str,
    ) -> Result<Option<Transition>, CampusError> {
        let outcome = self.coordinator.on_room_result_click(building_id)?;
        self.apply(outcome);
        Ok(outcome.transition)
    }

    pub fn clear_selection(&mut self) {
        let outcome = self.coordinator.clear_selection();
        self.apply(outcome);
    }

    /// Handle every marker click delivered since the last call.
    ///
    /// Returns the number of clicks processed.
    pub fn process_clicks(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(MarkerEvent::Clicked(id)) = self.click_rx.try_recv() {
            if let Err(e) = self.on_marker_click(&id) {
                warn!("Ignoring marker click: {}", e);
            }
            handled += 1;
        }
        handled
    }

    /// Update the user position indicator and re-reconcile the markers.
    pub fn set_user_position(&mut self, position: Option<LngLat>) {
        self.user_position = position.filter(LngLat::is_valid);
        if let Some(markers) = self.markers.as_mut() {
            markers.set_user_position(self.user_position);
        }
        self.refresh_markers();
    }

    #[must_use]
    pub fn map(&self) -> Option<&MapHandle<E>> {
        self.map.as_ref()
    }

    #[must_use]
    pub fn markers(&self) -> Option<&MarkerManager<E>> {
        self.markers.as_ref()
    }

    #[must_use]
    pub fn coordinator(&self) -> &SelectionCoordinator<E> {
        &self.coordinator
    }

    /// Remove all markers and release the map. Safe to call more than once.
    pub fn unmount(&mut self) {
        if let Some(markers) = self.markers.as_mut() {
            markers.clear();
        }
        if let Some(map) = self.map.take() {
            map.release();
        }
        self.markers = None;
    }

    fn apply(&mut self, outcome: Outcome) {
        if outcome.effective_changed {
            self.refresh_markers();
        }
    }

    fn refresh_markers(&mut self) {
        let Some(markers) = self.markers.as_mut() else {
            return;
        };
        let effective = self.coordinator.effective_buildings();
        markers.reconcile(&effective);
    }
}

impl<E: MapEngine> Drop for CampusMap<E> {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::HeadlessMap;
    use crate::geolocation::{FixedPosition, NoGeolocation};
    use crate::provider::{JsonFileProvider, StaticProvider};

    fn config() -> SessionConfig {
        SessionConfig {
            map: MapOptions {
                access_token: Some("pk.test".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_loading_then_loaded() {
        let mut session = CampusMap::<HeadlessMap>::mount(config());
        assert!(session.snapshot().loading);
        assert!(session.snapshot().effective_buildings.is_empty());

        session.load(&StaticProvider::campus(), &NoGeolocation).await;
        let snap = session.snapshot();
        assert!(!snap.loading);
        assert!(snap.map_available);
        assert_eq!(snap.effective_buildings.len(), 4);
        assert_eq!(snap.effective_buildings[0].id, "MB");
        assert_eq!(session.markers().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_geolocated_list_sorted_by_distance() {
        let mut session = CampusMap::<HeadlessMap>::mount(config());
        let at_library = FixedPosition(LngLat::new(106.917, 47.918));
        session.load(&StaticProvider::campus(), &at_library).await;

        let snap = session.snapshot();
        assert_eq!(snap.effective_buildings[0].id, "LIB");
        assert_eq!(snap.user_position, Some(LngLat::new(106.917, 47.918)));
        // Four buildings plus the self marker.
        assert_eq!(session.map().unwrap().with(HeadlessMap::marker_count), Some(5));
    }

    #[tokio::test]
    async fn test_missing_token_runs_without_map() {
        let mut session = CampusMap::<HeadlessMap>::mount(SessionConfig::default());
        session.load(&StaticProvider::campus(), &NoGeolocation).await;

        assert!(!session.snapshot().map_available);
        assert_eq!(session.on_list_select("MB").unwrap(), None);
        assert_eq!(session.snapshot().active_building_id, Some("MB"));
        session.on_search_input("215");
        assert_eq!(session.snapshot().effective_buildings.len(), 1);
        assert_eq!(session.snapshot().active_building_id, None);
    }

    #[tokio::test]
    async fn test_provider_failure_is_degraded_state() {
        let mut session = CampusMap::<HeadlessMap>::mount(config());
        session
            .load(&JsonFileProvider::new("/nonexistent/campus.json"), &NoGeolocation)
            .await;
        let snap = session.snapshot();
        assert!(!snap.loading);
        assert!(snap.load_error.is_some());
        assert!(snap.effective_buildings.is_empty());
    }

    #[tokio::test]
    async fn test_search_rebuilds_markers() {
        let mut session = CampusMap::<HeadlessMap>::mount(config());
        session.load(&StaticProvider::campus(), &NoGeolocation).await;

        session.on_search_input("305");
        assert_eq!(session.markers().unwrap().len(), 1);
        assert_eq!(session.map().unwrap().with(HeadlessMap::marker_count), Some(1));

        session.on_search_input("nothing");
        assert!(session.snapshot().no_results());
        assert_eq!(session.map().unwrap().with(HeadlessMap::marker_count), Some(0));

        session.on_search_input("");
        assert_eq!(session.markers().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_marker_click_flows_through_channel() {
        let mut session = CampusMap::<HeadlessMap>::mount(config());
        session.load(&StaticProvider::campus(), &NoGeolocation).await;
        let mut events = session.subscribe();

        let marker = session.markers().unwrap().marker_for("LEAB").unwrap();
        assert!(session.map().unwrap().with(|m| m.click(marker)).unwrap());
        assert_eq!(session.process_clicks(), 1);

        assert_eq!(session.snapshot().active_building_id, Some("LEAB"));
        assert_eq!(
            events.try_recv().unwrap(),
            SelectionEvent::SelectionChanged(Some("LEAB".to_string()))
        );
    }

    #[tokio::test]
    async fn test_unmount_releases_everything() {
        let mut session = CampusMap::<HeadlessMap>::mount(config());
        session
            .load(&StaticProvider::campus(), &FixedPosition(LngLat::new(106.918, 47.92)))
            .await;
        let map = session.map().unwrap().clone();
        assert_eq!(map.with(HeadlessMap::marker_count), Some(5));

        session.unmount();
        assert!(map.is_released());
        assert!(!session.snapshot().map_available);
        session.unmount();
        drop(session);
        assert!(map.is_released());
    }

    #[tokio::test]
    async fn test_drop_releases_map() {
        let map = {
            let mut session = CampusMap::<HeadlessMap>::mount(config());
            session.load(&StaticProvider::campus(), &NoGeolocation).await;
            session.map().unwrap().clone()
        };
        assert!(map.is_released());
    }
}
