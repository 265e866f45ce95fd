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

//! End-to-end behaviour of the campus map engine.

use std::borrow::Cow;
use std::time::Duration;

use campus_map::{
    filter_buildings, Building, CameraConfig, CameraController, CampusMap, FixedPosition,
    HeadlessMap, LngLat, MapEngine, MapHandle, MapOptions, MarkerConfig, MarkerManager,
    NoGeolocation, Room, SessionConfig, StaticProvider, Transition, Viewport,
};

fn session_config() -> SessionConfig {
    SessionConfig {
        map: MapOptions {
            access_token: Some("pk.integration".to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn sample() -> Vec<Building> {
    vec![
        Building::new("MB", "Main Building", LngLat::new(106.919, 47.9227))
            .with_rooms(vec![Room::new("101", 1, "Lecture Hall"), Room::new("202", 2, "Lab")]),
        Building::new("LEAB", "Engineering Building", LngLat::new(106.9185, 47.919)).with_rooms(
            vec![
                Room::new("120", 1, "Physics Lab"),
                Room::new("215", 2, "Computer Lab"),
                Room::new("301", 3, "Dean Office"),
            ],
        ),
        Building::new("LIB", "Library", LngLat::new(106.917, 47.918)),
    ]
}

#[test]
fn filter_scenario_single_matching_room() {
    let buildings = vec![Building::new("MB", "Main Building", LngLat::new(106.919, 47.9227))
        .with_rooms(vec![Room::new("101", 1, ""), Room::new("202", 2, "")])];

    let result = filter_buildings(&buildings, "20");
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].id, "MB");
    let rooms: Vec<&str> = result[0].rooms.iter().map(|r| r.number.as_str()).collect();
    assert_eq!(rooms, vec!["202"]);
}

#[test]
fn filter_scenario_empty_query_returns_input() {
    let buildings = sample();
    let result = filter_buildings(&buildings, "");
    assert!(matches!(result, Cow::Borrowed(_)));
    assert_eq!(&*result, buildings.as_slice());
}

#[test]
fn filter_results_are_correct_and_ordered() {
    let buildings = sample();
    for query in ["1", "20", "0", "3", "x", "  ", "21"] {
        let result = filter_buildings(&buildings, query);
        let needle = query.to_lowercase();

        // Every kept building has at least one room, all of which match.
        for b in result.iter() {
            assert!(!b.rooms.is_empty());
            assert!(b.rooms.iter().all(|r| r.number.to_lowercase().contains(&needle)));
        }
        // Every building with a match is kept.
        for b in &buildings {
            let has_match = b.rooms.iter().any(|r| r.number.to_lowercase().contains(&needle));
            assert_eq!(has_match, result.iter().any(|k| k.id == b.id), "{query:?} {}", b.id);
        }
        // Buildings and rooms appear in original relative order.
        let positions: Vec<usize> = result
            .iter()
            .map(|k| buildings.iter().position(|b| b.id == k.id).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        for k in result.iter() {
            let original = &buildings.iter().find(|b| b.id == k.id).unwrap().rooms;
            let idx: Vec<usize> = k
                .rooms
                .iter()
                .map(|r| original.iter().position(|o| o.number == r.number).unwrap())
                .collect();
            assert!(idx.windows(2).all(|w| w[0] < w[1]));
        }
        // Same inputs, same output.
        assert_eq!(result, filter_buildings(&buildings, query));
    }
}

#[test]
fn camera_threshold_scenarios() {
    let options = MapOptions {
        access_token: Some("pk.integration".to_string()),
        max_bounds: None,
        initial: Viewport {
            center: LngLat::new(106.9200, 47.9200),
            zoom: 17.0,
            pitch: 52.0,
            bearing: 0.0,
        },
        ..Default::default()
    };

    let far = CameraController::new(
        MapHandle::<HeadlessMap>::acquire(&options).unwrap(),
        CameraConfig::default(),
    );
    assert_eq!(far.move_to(LngLat::new(106.9600, 47.9200)).unwrap(), Transition::Jump);

    let near = CameraController::new(
        MapHandle::<HeadlessMap>::acquire(&options).unwrap(),
        CameraConfig::default(),
    );
    assert_eq!(
        near.move_to(LngLat::new(106.9205, 47.9200)).unwrap(),
        Transition::Fly(Duration::from_millis(2000))
    );
}

#[test]
fn marker_reconciliation_is_idempotent() {
    let map = MapHandle::<HeadlessMap>::acquire(&session_config().map).unwrap();
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    let mut markers = MarkerManager::new(map.clone(), MarkerConfig::default(), tx);

    markers.reconcile(&sample());
    let first: Vec<LngLat> = map
        .with(|m| m.markers().map(|(_, s)| s.position).collect())
        .unwrap();
    markers.reconcile(&sample());
    let second: Vec<LngLat> = map
        .with(|m| m.markers().map(|(_, s)| s.position).collect())
        .unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
    assert_eq!(map.with(MapEngine::marker_count), Some(3));
}

#[tokio::test]
async fn marker_click_then_search_scenario() {
    let mut session = CampusMap::<HeadlessMap>::mount(session_config());
    session
        .load(&StaticProvider::new(sample()), &NoGeolocation)
        .await;

    session.on_marker_click("MB").unwrap();
    session.on_search_input("9");

    let snap = session.snapshot();
    assert_eq!(snap.active_building_id, None);
    assert_eq!(snap.search_query, "9");
    assert!(snap.no_results());
}

#[tokio::test]
async fn list_select_then_room_click_flow() {
    let mut session = CampusMap::<HeadlessMap>::mount(session_config());
    session
        .load(
            &StaticProvider::campus(),
            &FixedPosition(LngLat::new(106.9185, 47.919)),
        )
        .await;
    assert_eq!(session.snapshot().effective_buildings[0].id, "LEAB");

    let transition = session.on_list_select("MB").unwrap();
    assert!(matches!(transition, Some(Transition::Fly(_))));

    session.on_search_input("305");
    let transition = session.on_room_result_click("MB").unwrap();
    assert!(transition.is_some());
    assert_eq!(session.snapshot().search_query, "305");
    assert_eq!(session.snapshot().effective_buildings.len(), 1);

    let map = session.map().unwrap().clone();
    map.with_mut(|m| m.advance(Duration::from_secs(3)));
    let center = map.with(MapEngine::camera).unwrap().center;
    assert!((center.lng - 106.919_000_736_241).abs() < 1e-9);
    assert!((center.lat - 47.922_694_530_673_02).abs() < 1e-9);
}

#[tokio::test]
async fn repeated_mount_unmount_does_not_leak() {
    for _ in 0..5 {
        let mut session = CampusMap::<HeadlessMap>::mount(session_config());
        session.load(&StaticProvider::campus(), &NoGeolocation).await;
        session.on_search_input("1");
        session.on_search_input("");
        let map = session.map().unwrap().clone();
        assert_eq!(map.with(MapEngine::marker_count), Some(4));
        drop(session);
        assert!(map.is_released());
        assert!(map.with(MapEngine::marker_count).is_none());
    }
}
