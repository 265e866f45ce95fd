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

//! Built-in campus dataset for the National University of Mongolia.

use crate::geo::{Building, LngLat, Room};

/// The four campus buildings with their rooms, in display order.
#[must_use]
pub fn campus_buildings() -> Vec<Building> {
    vec![
        Building::new(
            "MB",
            "Main Building",
            LngLat::new(106.919_000_736_241, 47.922_694_530_673_02),
        )
        .with_rooms(vec![
            Room::new("101", 1, "Lecture Hall"),
            Room::new("102", 1, "Office"),
            Room::new("201", 2, "Classroom"),
            Room::new("202", 2, "Lab"),
            Room::new("305", 3, "Seminar"),
        ]),
        Building::new("LEAB", "Engineering Building", LngLat::new(106.9185, 47.919)).with_rooms(
            vec![
                Room::new("120", 1, "Physics Lab"),
                Room::new("215", 2, "Computer Lab"),
                Room::new("301", 3, "Dean Office"),
            ],
        ),
        Building::new("LIB", "Library", LngLat::new(106.917, 47.918)).with_rooms(vec![
            Room::new("101", 1, "Reading Hall"),
            Room::new("201", 2, "Quiet Zone"),
        ]),
        Building::new(
            "lit",
            "lite",
            LngLat::new(106.916_565_491_296_3, 47.919_294_677_234_32),
        )
        .with_rooms(vec![
            Room::new("101", 1, "Reading Hall"),
            Room::new("201", 2, "Quiet Zone"),
        ]),
    ]
}
