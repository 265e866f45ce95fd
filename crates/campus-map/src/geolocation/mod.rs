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

//! One-shot user geolocation.
//!
//! A position request has exactly two outcomes: a coordinate, or a failure.
//! Failures are never retried; the session falls back to the ungeolocated
//! view for its remaining lifetime.

use std::future::Future;
use std::time::Duration;

use log::{info, warn};
use thiserror::Error;

use crate::geo::LngLat;

/// Why a position could not be determined.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("location access denied")]
    Denied,

    #[error("location request timed out after {0:?}")]
    Timeout(Duration),

    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// A source of the user's current position.
pub trait Geolocation {
    fn request_position(&self) -> impl Future<Output = Result<LngLat, GeolocationError>> + Send;
}

/// Always reports the same position, e.g. a configured override.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub LngLat);

impl Geolocation for FixedPosition {
    async fn request_position(&self) -> Result<LngLat, GeolocationError> {
        if self.0.is_valid() {
            Ok(self.0)
        } else {
            Err(GeolocationError::Unavailable(format!(
                "configured position {} is not a valid coordinate",
                self.0
            )))
        }
    }
}

/// Location disabled: every request is denied.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocation;

impl Geolocation for NoGeolocation {
    async fn request_position(&self) -> Result<LngLat, GeolocationError> {
        Err(GeolocationError::Denied)
    }
}

/// Issue a single position request bounded by `timeout`.
///
/// Returns `None` on any failure, after logging it.
pub async fn locate_once<G: Geolocation>(source: &G, timeout: Duration) -> Option<LngLat> {
    let result = match tokio::time::timeout(timeout, source.request_position()).await {
        Ok(result) => result,
        Err(_elapsed) => Err(GeolocationError::Timeout(timeout)),
    };
    match result {
        Ok(position) if position.is_valid() => {
            info!("User located at {}", position);
            Some(position)
        }
        Ok(position) => {
            warn!("Geolocation returned invalid coordinate {}, ignoring", position);
            None
        }
        Err(e) => {
            warn!("Location access denied/error: {}, using ungeolocated view", e);
            None
        }
    }
}
