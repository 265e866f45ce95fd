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

//! Session-level errors.

use thiserror::Error;

use crate::camera::CameraError;
use crate::engine::MapError;
use crate::geolocation::GeolocationError;
use crate::provider::ProviderError;

/// Errors surfaced by the campus map session.
///
/// None of these are fatal to a session: callers log them and fall back to a
/// degraded display state.
#[derive(Debug, Error)]
pub enum CampusError {
    #[error("unknown building: {0}")]
    UnknownBuilding(String),

    #[error("map unavailable: {0}")]
    Map(#[from] MapError),

    #[error("camera: {0}")]
    Camera(#[from] CameraError),

    #[error("data provider: {0}")]
    Provider(#[from] ProviderError),

    #[error("geolocation: {0}")]
    Geolocation(#[from] GeolocationError),
}
