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

//! Marker lifecycle management.
//!
//! Keeps the building markers on the map consistent with the effective
//! building list. The default strategy tears every marker down and rebuilds
//! the set, which is simple and correct for the tens of buildings a campus
//! has. An id-keyed diff is available for larger or fast-changing sets.
//!
//! The self marker for the user's position is tracked separately and is never
//! part of a reconciliation pass.

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::engine::{ClickHandler, MapEngine, MapHandle, MarkerId, MarkerKind, MarkerSpec};
use crate::geo::{Building, LngLat};

/// Label used for the user's own marker.
const SELF_MARKER_LABEL: &str = "You are here";

/// How a reconciliation pass updates the marker set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStrategy {
    /// Remove every marker, then add one per building.
    #[default]
    Rebuild,
    /// Add new ids, remove stale ids, move changed ones, leave the rest.
    Diff,
}

/// Configuration for the marker manager.
#[derive(Debug, Clone, Default)]
pub struct MarkerConfig {
    pub strategy: ReconcileStrategy,
}

/// Events produced by marker click handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerEvent {
    /// A building marker was clicked.
    Clicked(String),
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: usize,
    pub removed: usize,
    pub moved: usize,
    pub kept: usize,
    /// Buildings skipped for malformed coordinates or duplicate ids.
    pub skipped: usize,
}

#[derive(Debug, Clone)]
struct PlacedMarker {
    building_id: String,
    marker: MarkerId,
    position: LngLat,
    spec_kind: MarkerKind,
    label: String,
}

/// Owns the building markers and the self marker on a shared map.
#[derive(Debug)]
pub struct MarkerManager<E: MapEngine> {
    map: MapHandle<E>,
    config: MarkerConfig,
    placed: Vec<PlacedMarker>,
    self_marker: Option<(MarkerId, LngLat)>,
    click_tx: mpsc::UnboundedSender<MarkerEvent>,
}

impl<E: MapEngine> MarkerManager<E> {
    /// Create a manager whose marker clicks are delivered to `click_tx`.
    #[must_use]
    pub fn new(
        map: MapHandle<E>,
        config: MarkerConfig,
        click_tx: mpsc::UnboundedSender<MarkerEvent>,
    ) -> Self {
        Self {
            map,
            config,
            placed: Vec::new(),
            self_marker: None,
            click_tx,
        }
    }

    /// Bring the building markers in line with `buildings`.
    ///
    /// Buildings with malformed coordinates are skipped with a warning.
    /// Running the same list twice leaves the same markers in place.
    pub fn reconcile(&mut self, buildings: &[Building]) -> ReconcileReport {
        let wanted = self.wanted(buildings);
        let mut report = ReconcileReport {
            skipped: buildings.len() - wanted.len(),
            ..Default::default()
        };

        if self.map.is_released() {
            warn!("Map released, skipping marker reconciliation");
            self.placed.clear();
            return report;
        }

        match self.config.strategy {
            ReconcileStrategy::Rebuild => self.rebuild(&wanted, &mut report),
            ReconcileStrategy::Diff => self.diff(&wanted, &mut report),
        }

        debug!(
            "Reconciled markers: +{} -{} ~{} ={} skipped {}",
            report.added, report.removed, report.moved, report.kept, report.skipped
        );
        report
    }

    /// Place, move or remove the self marker.
    ///
    /// Repeated updates move the existing marker instead of adding another.
    pub fn set_user_position(&mut self, position: Option<LngLat>) {
        match (position, self.self_marker) {
            (Some(p), _) if !p.is_valid() => {
                warn!("Ignoring invalid user position {}", p);
            }
            (Some(p), Some((id, old))) => {
                if p == old {
                    return;
                }
                let moved = self
                    .map
                    .with_mut(|engine| engine.set_marker_position(id, p))
                    .unwrap_or(false);
                if moved {
                    self.self_marker = Some((id, p));
                } else {
                    self.self_marker = None;
                    self.place_self(p);
                }
            }
            (Some(p), None) => self.place_self(p),
            (None, Some((id, _))) => {
                self.map.with_mut(|engine| engine.remove_marker(id));
                self.self_marker = None;
            }
            (None, None) => {}
        }
    }

    /// Remove every marker this manager added, including the self marker.
    pub fn clear(&mut self) {
        let mut ids: Vec<MarkerId> = self.placed.drain(..).map(|p| p.marker).collect();
        if let Some((id, _)) = self.self_marker.take() {
            ids.push(id);
        }
        self.map.with_mut(|engine| {
            for id in ids {
                engine.remove_marker(id);
            }
        });
    }

    /// Number of building markers currently placed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.placed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    #[must_use]
    pub fn marker_for(&self, building_id: &str) -> Option<MarkerId> {
        self.placed
            .iter()
            .find(|p| p.building_id == building_id)
            .map(|p| p.marker)
    }

    #[must_use]
    pub fn self_marker(&self) -> Option<MarkerId> {
        self.self_marker.map(|(id, _)| id)
    }

    /// Building ids with markers, in list order.
    pub fn building_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.placed.iter().map(|p| p.building_id.as_str())
    }

    fn wanted(&self, buildings: &[Building]) -> Vec<PlacedMarker> {
        let mut seen = HashSet::new();
        buildings
            .iter()
            .filter(|b| {
                if !b.has_valid_coords() {
                    warn!(
                        "Skipping marker for building {}: malformed coordinate {}",
                        b.id, b.coords
                    );
                    return false;
                }
                if !seen.insert(b.id.as_str()) {
                    warn!("Skipping duplicate marker for building {}", b.id);
                    return false;
                }
                true
            })
            .map(|b| PlacedMarker {
                building_id: b.id.clone(),
                marker: MarkerId(0),
                position: b.coords,
                spec_kind: MarkerKind::Building(b.status),
                label: b.name.clone(),
            })
            .collect()
    }

    fn spec_for(&self, placed: &PlacedMarker) -> MarkerSpec {
        let tx = self.click_tx.clone();
        let building_id = placed.building_id.clone();
        MarkerSpec {
            position: placed.position,
            label: placed.label.clone(),
            kind: placed.spec_kind,
            on_click: Some(ClickHandler::new(move || {
                if tx.send(MarkerEvent::Clicked(building_id.clone())).is_err() {
                    debug!("Marker click for {} dropped, session gone", building_id);
                }
            })),
        }
    }

    fn rebuild(&mut self, wanted: &[PlacedMarker], report: &mut ReconcileReport) {
        let old: Vec<MarkerId> = self.placed.drain(..).map(|p| p.marker).collect();
        let specs: Vec<MarkerSpec> = wanted.iter().map(|w| self.spec_for(w)).collect();

        let ids = self.map.with_mut(|engine| {
            for id in &old {
                engine.remove_marker(*id);
            }
            specs
                .into_iter()
                .map(|spec| engine.add_marker(spec))
                .collect::<Vec<_>>()
        });

        let Some(ids) = ids else {
            warn!("Map released during marker rebuild");
            return;
        };
        report.removed = old.len();
        report.added = ids.len();
        self.placed = wanted
            .iter()
            .cloned()
            .zip(ids)
            .map(|(mut p, id)| {
                p.marker = id;
                p
            })
            .collect();
    }

    fn diff(&mut self, wanted: &[PlacedMarker], report: &mut ReconcileReport) {
        let mut current: HashMap<String, PlacedMarker> = self
            .placed
            .drain(..)
            .map(|p| (p.building_id.clone(), p))
            .collect();

        let mut next: Vec<Option<PlacedMarker>> = Vec::with_capacity(wanted.len());
        let mut stale = Vec::new();
        let mut moves = Vec::new();
        let mut to_add = Vec::new();
        for (index, w) in wanted.iter().enumerate() {
            match current.remove(&w.building_id) {
                Some(existing) if existing.spec_kind == w.spec_kind && existing.label == w.label => {
                    if existing.position != w.position {
                        moves.push((existing.marker, w.position));
                    }
                    next.push(Some(PlacedMarker {
                        marker: existing.marker,
                        ..w.clone()
                    }));
                }
                Some(existing) => {
                    // Style or label changed, so the marker is replaced.
                    stale.push(existing.marker);
                    to_add.push(index);
                    next.push(None);
                }
                None => {
                    to_add.push(index);
                    next.push(None);
                }
            }
        }
        stale.extend(current.into_values().map(|p| p.marker));

        let specs: Vec<(usize, MarkerSpec)> = to_add
            .iter()
            .map(|&i| (i, self.spec_for(&wanted[i])))
            .collect();

        let added = self.map.with_mut(|engine| {
            for id in &stale {
                engine.remove_marker(*id);
            }
            for (id, position) in &moves {
                engine.set_marker_position(*id, *position);
            }
            specs
                .into_iter()
                .map(|(i, spec)| (i, engine.add_marker(spec)))
                .collect::<Vec<_>>()
        });

        let Some(added) = added else {
            warn!("Map released during marker diff");
            return;
        };
        report.removed = stale.len();
        report.moved = moves.len();
        report.added = added.len();
        report.kept = next.iter().flatten().count() - moves.len();

        for (index, id) in added {
            next[index] = Some(PlacedMarker {
                marker: id,
                ..wanted[index].clone()
            });
        }
        self.placed = next.into_iter().flatten().collect();
    }

    fn place_self(&mut self, position: LngLat) {
        let spec = MarkerSpec {
            position,
            label: SELF_MARKER_LABEL.to_string(),
            kind: MarkerKind::SelfPosition,
            on_click: None,
        };
        if let Some(id) = self.map.with_mut(|engine| engine.add_marker(spec)) {
            info!("User position marker placed at {}", position);
            self.self_marker = Some((id, position));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{HeadlessMap, MapOptions};
    use crate::geo::{Availability, Room};

    fn map() -> MapHandle<HeadlessMap> {
        MapHandle::acquire(&MapOptions {
            access_token: Some("pk.test".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    fn campus() -> Vec<Building> {
        vec![
            Building::new("MB", "Main Building", LngLat::new(106.919, 47.9227))
                .with_rooms(vec![Room::new("101", 1, "Lecture Hall")]),
            Building::new("LEAB", "Engineering Building", LngLat::new(106.9185, 47.919)),
            Building::new("LIB", "Library", LngLat::new(106.917, 47.918)),
        ]
    }

    fn positions(map: &MapHandle<HeadlessMap>) -> Vec<(String, LngLat)> {
        let mut out: Vec<(String, LngLat)> = map
            .with(|m| {
                m.markers()
                    .map(|(_, spec)| (spec.label.clone(), spec.position))
                    .collect()
            })
            .unwrap();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    #[test]
    fn test_one_marker_per_building() {
        let map = map();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut markers = MarkerManager::new(map.clone(), MarkerConfig::default(), tx);

        let report = markers.reconcile(&campus());
        assert_eq!(report.added, 3);
        assert_eq!(markers.len(), 3);
        assert_eq!(map.with(HeadlessMap::marker_count), Some(3));
        let ids: Vec<&str> = markers.building_ids().collect();
        assert_eq!(ids, vec!["MB", "LEAB", "LIB"]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let map = map();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut markers = MarkerManager::new(map.clone(), MarkerConfig::default(), tx);

        markers.reconcile(&campus());
        let once = positions(&map);
        let report = markers.reconcile(&campus());
        assert_eq!(report.removed, 3);
        assert_eq!(report.added, 3);
        assert_eq!(positions(&map), once);
        assert_eq!(map.with(HeadlessMap::marker_count), Some(3));
    }

    #[test]
    fn test_shrinking_list_leaves_no_stale_markers() {
        let map = map();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut markers = MarkerManager::new(map.clone(), MarkerConfig::default(), tx);

        markers.reconcile(&campus());
        markers.reconcile(&campus()[..1]);
        assert_eq!(map.with(HeadlessMap::marker_count), Some(1));
        assert!(markers.marker_for("LIB").is_none());
        markers.reconcile(&[]);
        assert_eq!(map.with(HeadlessMap::marker_count), Some(0));
    }

    #[test]
    fn test_malformed_coordinate_skipped() {
        let map = map();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut markers = MarkerManager::new(map.clone(), MarkerConfig::default(), tx);

        let mut list = campus();
        list.insert(1, Building::new("BAD", "Broken", LngLat::new(f64::NAN, 47.9)));
        list.push(Building::new("MB", "Main Building again", LngLat::new(106.92, 47.92)));

        let report = markers.reconcile(&list);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.added, 3);
        assert!(markers.marker_for("BAD").is_none());
    }

    #[test]
    fn test_click_routes_building_id() {
        let map = map();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut markers = MarkerManager::new(map.clone(), MarkerConfig::default(), tx);
        markers.reconcile(&campus());

        let id = markers.marker_for("LEAB").unwrap();
        assert!(map.with(|m| m.click(id)).unwrap());
        assert_eq!(rx.try_recv().unwrap(), MarkerEvent::Clicked("LEAB".to_string()));
    }

    #[test]
    fn test_self_marker_tracked_independently() {
        let map = map();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut markers = MarkerManager::new(map.clone(), MarkerConfig::default(), tx);

        markers.set_user_position(Some(LngLat::new(106.918, 47.92)));
        markers.set_user_position(Some(LngLat::new(106.9181, 47.9201)));
        markers.set_user_position(Some(LngLat::new(106.9181, 47.9201)));
        assert_eq!(map.with(HeadlessMap::marker_count), Some(1));

        markers.reconcile(&campus());
        markers.reconcile(&campus());
        assert_eq!(map.with(HeadlessMap::marker_count), Some(4));
        let self_id = markers.self_marker().unwrap();
        assert_eq!(
            map.with(|m| m.marker(self_id).map(|s| (s.kind, s.position))).unwrap(),
            Some((MarkerKind::SelfPosition, LngLat::new(106.9181, 47.9201)))
        );

        markers.set_user_position(None);
        assert_eq!(map.with(HeadlessMap::marker_count), Some(3));
        markers.clear();
        assert_eq!(map.with(HeadlessMap::marker_count), Some(0));
    }

    #[test]
    fn test_diff_keeps_unchanged_markers() {
        let map = map();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut markers = MarkerManager::new(
            map.clone(),
            MarkerConfig {
                strategy: ReconcileStrategy::Diff,
            },
            tx,
        );

        markers.reconcile(&campus());
        let mb = markers.marker_for("MB").unwrap();

        let mut next = campus();
        next.remove(2);
        next[1].coords = LngLat::new(106.9186, 47.9191);
        next[0] = next[0].clone().with_status(Availability::Unavailable);
        next.push(Building::new("lit", "lite", LngLat::new(106.916_565, 47.919_294)));

        let report = markers.reconcile(&next);
        assert_eq!(
            report,
            ReconcileReport {
                added: 2,
                removed: 2,
                moved: 1,
                kept: 0,
                skipped: 0,
            }
        );
        assert_ne!(markers.marker_for("MB"), Some(mb));
        assert_eq!(map.with(HeadlessMap::marker_count), Some(3));

        let again = markers.reconcile(&next);
        assert_eq!(again.kept, 3);
        assert_eq!(again.added + again.removed + again.moved, 0);
    }

    #[test]
    fn test_released_map_is_not_fatal() {
        let map = map();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut markers = MarkerManager::new(map.clone(), MarkerConfig::default(), tx);
        markers.reconcile(&campus());

        map.release();
        let report = markers.reconcile(&campus());
        assert_eq!(report.added, 0);
        assert!(markers.is_empty());
        markers.set_user_position(Some(LngLat::new(106.918, 47.92)));
        assert!(markers.self_marker().is_none());
    }
}
