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

//! Camera controller.
//!
//! Decides how the viewport travels to a target coordinate. Short hops are
//! animated so the user keeps their bearings; long jumps teleport, because a
//! multi-second pan across the campus is disorienting. Every call reads the
//! live camera from the engine, so user drags are always taken into account.

use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{MapEngine, MapError, MapHandle, Viewport};
use crate::geo::LngLat;

/// Per-axis distance in degrees above which a move is considered far.
/// 0.02 degrees is roughly 1.5 to 2 km at campus latitudes.
pub const DEFAULT_FAR_THRESHOLD_DEG: f64 = 0.02;

/// Tolerance for treating the camera as already at the target.
const SAME_TARGET_EPSILON: f64 = 1e-9;

/// Errors from camera operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CameraError {
    #[error("invalid camera target {0}")]
    InvalidTarget(LngLat),

    #[error(transparent)]
    Map(#[from] MapError),
}

/// How the controller chooses between jumping and flying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Teleport when the target is beyond the far threshold, fly otherwise.
    #[default]
    DistanceBased,
    /// Always fly, whatever the distance.
    AlwaysAnimate,
}

/// Camera controller configuration.
#[derive(Debug, Clone)]
pub struct CameraConfig {
    pub policy: TransitionPolicy,
    pub far_threshold_deg: f64,
    pub target_zoom: f64,
    pub target_pitch: f64,
    pub target_bearing: f64,
    pub fly_duration: Duration,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            policy: TransitionPolicy::default(),
            far_threshold_deg: DEFAULT_FAR_THRESHOLD_DEG,
            target_zoom: 18.0,
            target_pitch: 60.0,
            target_bearing: 0.0,
            fly_duration: Duration::from_millis(2000),
        }
    }
}

/// Distance class of a requested move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDistance {
    Near,
    Far,
}

/// Classify a move by the larger of its longitude and latitude deltas.
#[must_use]
pub fn classify(current: LngLat, target: LngLat, threshold_deg: f64) -> MoveDistance {
    let d_lng = (target.lng - current.lng).abs();
    let d_lat = (target.lat - current.lat).abs();
    if d_lng > threshold_deg || d_lat > threshold_deg {
        MoveDistance::Far
    } else {
        MoveDistance::Near
    }
}

/// The strategy a `move_to` call executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Instant relocation.
    Jump,
    /// Animated relocation over the given duration.
    Fly(Duration),
    /// Already at the target; nothing to do.
    Stay,
}

/// Drives viewport transitions on a shared map engine.
#[derive(Debug)]
pub struct CameraController<E: MapEngine> {
    map: MapHandle<E>,
    config: CameraConfig,
}

impl<E: MapEngine> CameraController<E> {
    #[must_use]
    pub fn new(map: MapHandle<E>, config: CameraConfig) -> Self {
        Self { map, config }
    }

    #[must_use]
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// The viewport a move to `center` ends in.
    #[must_use]
    pub fn target_viewport(&self, center: LngLat) -> Viewport {
        Viewport {
            center,
            zoom: self.config.target_zoom,
            pitch: self.config.target_pitch,
            bearing: self.config.target_bearing,
        }
    }

    /// Decide the strategy for a move from `current` without executing it.
    #[must_use]
    pub fn plan(&self, current: &Viewport, target: LngLat) -> Transition {
        let goal = self.target_viewport(target);
        if viewport_eq(current, &goal) {
            return Transition::Stay;
        }
        match self.config.policy {
            TransitionPolicy::AlwaysAnimate => Transition::Fly(self.config.fly_duration),
            TransitionPolicy::DistanceBased => {
                match classify(current.center, target, self.config.far_threshold_deg) {
                    MoveDistance::Far => Transition::Jump,
                    MoveDistance::Near => Transition::Fly(self.config.fly_duration),
                }
            }
        }
    }

    /// Move the camera to `target`, jumping or flying per the configured policy.
    ///
    /// Any in-flight animation is superseded; the latest call always wins.
    pub fn move_to(&self, target: LngLat) -> Result<Transition, CameraError> {
        if !target.is_valid() {
            warn!("Refusing camera move to invalid coordinate {}", target);
            return Err(CameraError::InvalidTarget(target));
        }
        let goal = self.target_viewport(target);
        let transition = self.map.try_with_mut(|engine| {
            let current = engine.camera();
            let transition = self.plan(&current, target);
            match transition {
                Transition::Jump => engine.jump_to(goal),
                Transition::Fly(duration) => engine.fly_to(goal, duration),
                Transition::Stay => {
                    if engine.is_moving() {
                        engine.stop();
                    }
                }
            }
            transition
        })?;
        debug!("Camera move to {}: {:?}", target, transition);
        Ok(transition)
    }

    /// Teleport to `target` regardless of policy.
    pub fn jump_to(&self, target: LngLat) -> Result<(), CameraError> {
        if !target.is_valid() {
            return Err(CameraError::InvalidTarget(target));
        }
        let goal = self.target_viewport(target);
        self.map.try_with_mut(|engine| engine.jump_to(goal))?;
        Ok(())
    }

    /// Animate to `target` regardless of policy.
    pub fn fly_to(&self, target: LngLat) -> Result<(), CameraError> {
        if !target.is_valid() {
            return Err(CameraError::InvalidTarget(target));
        }
        let goal = self.target_viewport(target);
        let duration = self.config.fly_duration;
        self.map.try_with_mut(|engine| engine.fly_to(goal, duration))?;
        Ok(())
    }

    /// The live camera, or `None` once the map is released.
    #[must_use]
    pub fn viewport(&self) -> Option<Viewport> {
        self.map.with(MapEngine::camera)
    }
}

fn viewport_eq(a: &Viewport, b: &Viewport) -> bool {
    (a.center.lng - b.center.lng).abs() < SAME_TARGET_EPSILON
        && (a.center.lat - b.center.lat).abs() < SAME_TARGET_EPSILON
        && (a.zoom - b.zoom).abs() < SAME_TARGET_EPSILON
        && (a.pitch - b.pitch).abs() < SAME_TARGET_EPSILON
        && (a.bearing - b.bearing).abs() < SAME_TARGET_EPSILON
}
