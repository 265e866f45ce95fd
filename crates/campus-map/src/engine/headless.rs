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

//! In-memory map engine.
//!
//! Keeps camera and marker state without drawing anything. Animations are
//! advanced explicitly with [`HeadlessMap::advance`], which makes the engine
//! usable both from a UI tick loop and from deterministic tests.

use std::collections::BTreeMap;
use std::time::Duration;

use log::debug;

use super::{MapEngine, MapError, MapOptions, MarkerId, MarkerSpec, Viewport};
use crate::geo::LngLat;

#[derive(Debug, Clone, Copy)]
struct Animation {
    from: Viewport,
    to: Viewport,
    duration: Duration,
    elapsed: Duration,
}

impl Animation {
    fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    fn current(&self) -> Viewport {
        interpolate(&self.from, &self.to, ease_out_cubic(self.progress()))
    }
}

fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn interpolate(from: &Viewport, to: &Viewport, t: f64) -> Viewport {
    // Rotate through the shorter arc.
    let bearing_delta = (to.bearing - from.bearing + 540.0).rem_euclid(360.0) - 180.0;
    Viewport {
        center: LngLat::new(
            lerp(from.center.lng, to.center.lng, t),
            lerp(from.center.lat, to.center.lat, t),
        ),
        zoom: lerp(from.zoom, to.zoom, t),
        pitch: lerp(from.pitch, to.pitch, t),
        bearing: (from.bearing + bearing_delta * t).rem_euclid(360.0),
    }
}

/// A map engine that keeps its state in memory.
#[derive(Debug)]
pub struct HeadlessMap {
    options: MapOptions,
    viewport: Viewport,
    animation: Option<Animation>,
    markers: BTreeMap<MarkerId, MarkerSpec>,
    next_marker_id: u64,
    interrupted: u64,
}

impl HeadlessMap {
    /// Create an engine without credential checks.
    #[must_use]
    pub fn new(options: MapOptions) -> Self {
        let viewport = options.constrain(options.initial);
        Self {
            options,
            viewport,
            animation: None,
            markers: BTreeMap::new(),
            next_marker_id: 1,
            interrupted: 0,
        }
    }

    /// Progress the in-flight animation by `dt`.
    ///
    /// Returns `true` while an animation is still running.
    pub fn advance(&mut self, dt: Duration) -> bool {
        let Some(animation) = self.animation.as_mut() else {
            return false;
        };
        animation.elapsed += dt;
        self.viewport = animation.current();
        if animation.progress() >= 1.0 {
            self.viewport = animation.to;
            self.animation = None;
            debug!("Fly animation finished at {}", self.viewport.center);
            return false;
        }
        true
    }

    /// Simulate a user drag: cancels any animation and shifts the center.
    pub fn pan_by(&mut self, d_lng: f64, d_lat: f64) {
        self.interrupt();
        let mut next = self.viewport;
        next.center = LngLat::new(next.center.lng + d_lng, next.center.lat + d_lat);
        self.viewport = self.options.constrain(next);
    }

    /// Deliver a click to a marker. Returns `false` if the marker is gone or
    /// has no click handler.
    pub fn click(&self, id: MarkerId) -> bool {
        match self.markers.get(&id).and_then(|m| m.on_click.as_ref()) {
            Some(handler) => {
                handler.on_click();
                true
            }
            None => false,
        }
    }

    pub fn markers(&self) -> impl Iterator<Item = (MarkerId, &MarkerSpec)> + '_ {
        self.markers.iter().map(|(id, spec)| (*id, spec))
    }

    #[must_use]
    pub fn marker(&self, id: MarkerId) -> Option<&MarkerSpec> {
        self.markers.get(&id)
    }

    /// How many animations were cut short by a later camera call.
    #[must_use]
    pub fn interrupted_animations(&self) -> u64 {
        self.interrupted
    }

    #[must_use]
    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    fn interrupt(&mut self) {
        if self.animation.take().is_some() {
            self.interrupted += 1;
        }
    }
}

impl MapEngine for HeadlessMap {
    fn create(options: &MapOptions) -> Result<Self, MapError> {
        Ok(Self::new(options.clone()))
    }

    fn camera(&self) -> Viewport {
        self.viewport
    }

    fn is_moving(&self) -> bool {
        self.animation.is_some()
    }

    fn jump_to(&mut self, target: Viewport) {
        self.interrupt();
        self.viewport = self.options.constrain(target);
    }

    fn fly_to(&mut self, target: Viewport, duration: Duration) {
        self.interrupt();
        let to = self.options.constrain(target);
        if duration.is_zero() {
            self.viewport = to;
            return;
        }
        self.animation = Some(Animation {
            from: self.viewport,
            to,
            duration,
            elapsed: Duration::ZERO,
        });
    }

    fn stop(&mut self) {
        self.interrupt();
    }

    fn add_marker(&mut self, spec: MarkerSpec) -> MarkerId {
        let id = MarkerId(self.next_marker_id);
        self.next_marker_id += 1;
        self.markers.insert(id, spec);
        id
    }

    fn set_marker_position(&mut self, id: MarkerId, position: LngLat) -> bool {
        match self.markers.get_mut(&id) {
            Some(spec) => {
                spec.position = position;
                true
            }
            None => false,
        }
    }

    fn remove_marker(&mut self, id: MarkerId) -> bool {
        self.markers.remove(&id).is_some()
    }

    fn marker_count(&self) -> usize {
        self.markers.len()
    }

    fn remove(&mut self) {
        self.animation = None;
        self.markers.clear();
    }
}
