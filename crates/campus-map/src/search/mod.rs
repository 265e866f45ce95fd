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

//! Search and filter engine.
//!
//! Narrows the building list to the buildings that contain a room whose
//! number matches a free-text query. Filtering is a pure function of its
//! inputs, so the presentation layer can call it on every keystroke.

use std::borrow::Cow;

use crate::geo::{Building, Room};

/// Filter `buildings` by room number.
///
/// An empty query returns the input unchanged as [`Cow::Borrowed`]. Any other
/// query, including whitespace-only ones, is matched literally as a
/// case-insensitive substring of each room number. Matching buildings carry
/// only their matching rooms; buildings with no match are dropped. Building
/// order and room order are preserved.
#[must_use]
pub fn filter_buildings<'a>(buildings: &'a [Building], query: &str) -> Cow<'a, [Building]> {
    if query.is_empty() {
        return Cow::Borrowed(buildings);
    }

    let needle = query.to_lowercase();
    let filtered = buildings
        .iter()
        .filter_map(|building| {
            let rooms: Vec<Room> = building
                .rooms
                .iter()
                .filter(|room| room_matches(room, &needle))
                .cloned()
                .collect();
            if rooms.is_empty() {
                None
            } else {
                Some(Building {
                    rooms,
                    ..building.clone()
                })
            }
        })
        .collect();

    Cow::Owned(filtered)
}

/// Number of rooms across all buildings that match `query`.
#[must_use]
pub fn match_count(buildings: &[Building], query: &str) -> usize {
    if query.is_empty() {
        return buildings.iter().map(|b| b.rooms.len()).sum();
    }
    let needle = query.to_lowercase();
    buildings
        .iter()
        .flat_map(|b| &b.rooms)
        .filter(|room| room_matches(room, &needle))
        .count()
}

fn room_matches(room: &Room, lowered_needle: &str) -> bool {
    room.number.to_lowercase().contains(lowered_needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::LngLat;

    fn campus() -> Vec<Building> {
        vec![
            Building::new("MB", "Main Building", LngLat::new(106.919, 47.9227)).with_rooms(vec![
                Room::new("101", 1, "Lecture Hall"),
                Room::new("202", 2, "Lab"),
                Room::new("A-20b", 2, "Office"),
            ]),
            Building::new("EMPTY", "Annex", LngLat::new(106.918, 47.921)),
            Building::new("LIB", "Library", LngLat::new(106.917, 47.918)).with_rooms(vec![
                Room::new("120", 1, "Reading Hall"),
                Room::new("201", 2, "Quiet Zone"),
            ]),
        ]
    }

    fn ids(list: &[Building]) -> Vec<&str> {
        list.iter().map(|b| b.id.as_str()).collect()
    }

    fn rooms(b: &Building) -> Vec<&str> {
        b.rooms.iter().map(|r| r.number.as_str()).collect()
    }

    #[test]
    fn test_empty_query_is_identity() {
        let data = campus();
        let result = filter_buildings(&data, "");
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result.as_ref(), data.as_slice());
        assert!(std::ptr::eq(result.as_ptr(), data.as_ptr()));
    }

    #[test]
    fn test_only_matching_rooms_kept() {
        let data = campus();
        let result = filter_buildings(&data, "20");
        assert_eq!(ids(&result), vec!["MB", "LIB"]);
        assert_eq!(rooms(&result[0]), vec!["202", "A-20b"]);
        assert_eq!(rooms(&result[1]), vec!["120", "201"]);
    }

    #[test]
    fn test_case_insensitive() {
        let data = campus();
        let upper = filter_buildings(&data, "A-20B");
        let lower = filter_buildings(&data, "a-20b");
        assert_eq!(upper, lower);
        assert_eq!(ids(&upper), vec!["MB"]);
        assert_eq!(rooms(&upper[0]), vec!["A-20b"]);
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let data = campus();
        assert!(filter_buildings(&data, "999").is_empty());
    }

    #[test]
    fn test_whitespace_matched_literally() {
        let data = campus();
        assert!(filter_buildings(&data, " ").is_empty());
        assert!(filter_buildings(&data, " 101").is_empty());

        let spaced = vec![Building::new("X", "X", LngLat::new(0.0, 0.0))
            .with_rooms(vec![Room::new("Room 7", 0, "")])];
        assert_eq!(filter_buildings(&spaced, " ").len(), 1);
    }

    #[test]
    fn test_filter_is_pure() {
        let data = campus();
        let first = filter_buildings(&data, "0").into_owned();
        let second = filter_buildings(&data, "0").into_owned();
        assert_eq!(first, second);
        assert_eq!(data, campus());
    }

    #[test]
    fn test_match_count() {
        let data = campus();
        assert_eq!(match_count(&data, ""), 5);
        assert_eq!(match_count(&data, "20"), 4);
        assert_eq!(match_count(&data, "zzz"), 0);
    }
}
