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

//! Map engine abstraction.
//!
//! The engine is the rendering surface: it owns the live camera and the
//! markers drawn on top of it. The rest of the crate only talks to it through
//! the [`MapEngine`] trait and a shared [`MapHandle`] that is acquired once at
//! mount and released at unmount.

mod headless;

pub use headless::HeadlessMap;

use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;

use crate::geo::{Availability, LngLat};

/// Highest pitch the engine accepts, in degrees.
pub const MAX_PITCH: f64 = 85.0;

/// Errors raised while acquiring or using the map engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MapError {
    #[error("map access token is not defined")]
    MissingAccessToken,

    #[error("invalid map options: {0}")]
    InvalidOptions(String),

    #[error("map engine has been released")]
    Released,
}

/// Camera state: where the map looks and from which angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: LngLat,
    pub zoom: f64,
    /// Tilt away from straight down, in degrees.
    pub pitch: f64,
    /// Rotation from north, in degrees.
    pub bearing: f64,
}

/// Geographic rectangle the camera center is confined to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south_west: LngLat,
    pub north_east: LngLat,
}

impl Bounds {
    #[must_use]
    pub const fn new(south_west: LngLat, north_east: LngLat) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    #[must_use]
    pub fn contains(&self, p: LngLat) -> bool {
        (self.south_west.lng..=self.north_east.lng).contains(&p.lng)
            && (self.south_west.lat..=self.north_east.lat).contains(&p.lat)
    }

    /// Closest point inside the bounds.
    #[must_use]
    pub fn clamp(&self, p: LngLat) -> LngLat {
        LngLat::new(
            p.lng.clamp(self.south_west.lng, self.north_east.lng),
            p.lat.clamp(self.south_west.lat, self.north_east.lat),
        )
    }
}

/// Options used to create the map surface.
#[derive(Debug, Clone)]
pub struct MapOptions {
    /// Credential for the tile/style service.
    pub access_token: Option<String>,
    pub style_url: String,
    pub initial: Viewport,
    pub max_bounds: Option<Bounds>,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            access_token: None,
            style_url: "mapbox://styles/mapbox/streets-v12".to_string(),
            initial: Viewport {
                center: LngLat::new(106.920_315, 47.922_527),
                zoom: 17.0,
                pitch: 52.0,
                bearing: 0.0,
            },
            max_bounds: Some(Bounds::new(
                LngLat::new(106.91, 47.91),
                LngLat::new(106.925, 47.925),
            )),
            min_zoom: 15.0,
            max_zoom: 18.0,
        }
    }
}

impl MapOptions {
    /// Check credentials and camera constraints before creating a surface.
    pub fn validate(&self) -> Result<(), MapError> {
        match self.access_token.as_deref().map(str::trim) {
            None | Some("") => return Err(MapError::MissingAccessToken),
            Some(_) => {}
        }
        if !self.initial.center.is_valid() {
            return Err(MapError::InvalidOptions(format!(
                "initial center {} is not a valid coordinate",
                self.initial.center
            )));
        }
        if !(self.min_zoom.is_finite() && self.max_zoom.is_finite()) || self.min_zoom > self.max_zoom
        {
            return Err(MapError::InvalidOptions(format!(
                "zoom range {}..={} is empty",
                self.min_zoom, self.max_zoom
            )));
        }
        if let Some(bounds) = self.max_bounds {
            if !bounds.south_west.is_valid()
                || !bounds.north_east.is_valid()
                || bounds.south_west.lng > bounds.north_east.lng
                || bounds.south_west.lat > bounds.north_east.lat
            {
                return Err(MapError::InvalidOptions("max bounds are inverted or invalid".to_string()));
            }
        }
        Ok(())
    }

    /// Apply the bounds and zoom/pitch limits to a requested viewport.
    #[must_use]
    pub fn constrain(&self, mut viewport: Viewport) -> Viewport {
        if let Some(bounds) = self.max_bounds {
            viewport.center = bounds.clamp(viewport.center);
        }
        viewport.zoom = viewport.zoom.clamp(self.min_zoom, self.max_zoom);
        viewport.pitch = viewport.pitch.clamp(0.0, MAX_PITCH);
        viewport.bearing = viewport.bearing.rem_euclid(360.0);
        viewport
    }
}

/// Opaque identifier of a marker on the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

/// Visual variant of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// A building pin styled by its availability.
    Building(Availability),
    /// The user's own position.
    SelfPosition,
}

/// Click capability attached to a rendered marker.
///
/// The presentation layer invokes it when the user taps the marker; what
/// happens next is decided by whoever built the handler.
#[derive(Clone)]
pub struct ClickHandler(Arc<dyn Fn() + Send + Sync>);

impl ClickHandler {
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn on_click(&self) {
        (self.0)();
    }
}

impl fmt::Debug for ClickHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClickHandler").finish_non_exhaustive()
    }
}

/// Everything the engine needs to draw a marker.
#[derive(Debug, Clone)]
pub struct MarkerSpec {
    pub position: LngLat,
    pub label: String,
    pub kind: MarkerKind,
    pub on_click: Option<ClickHandler>,
}

/// A map rendering surface.
///
/// Implementations own the live camera. Animations are asynchronous: a call
/// to [`fly_to`](MapEngine::fly_to) returns immediately, and any later camera
/// call interrupts it.
pub trait MapEngine {
    /// Create a surface from validated options.
    fn create(options: &MapOptions) -> Result<Self, MapError>
    where
        Self: Sized;

    /// The live camera, including any in-flight animation progress or user drag.
    fn camera(&self) -> Viewport;

    fn is_moving(&self) -> bool;

    /// Move the camera instantly.
    fn jump_to(&mut self, target: Viewport);

    /// Animate the camera to `target` over `duration`.
    fn fly_to(&mut self, target: Viewport, duration: Duration);

    /// Halt any in-flight animation where it is.
    fn stop(&mut self);

    fn add_marker(&mut self, spec: MarkerSpec) -> MarkerId;

    /// Move an existing marker. Returns `false` for unknown ids.
    fn set_marker_position(&mut self, id: MarkerId, position: LngLat) -> bool;

    /// Returns `false` for unknown ids.
    fn remove_marker(&mut self, id: MarkerId) -> bool;

    fn marker_count(&self) -> usize;

    /// Tear down the surface, dropping every marker and listener.
    fn remove(&mut self);
}

struct Shared<E: MapEngine> {
    engine: RwLock<Option<E>>,
}

impl<E: MapEngine> Drop for Shared<E> {
    fn drop(&mut self) {
        let engine = match self.engine.get_mut() {
            Ok(engine) => engine,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(mut engine) = engine.take() {
            debug!("Releasing map engine on drop");
            engine.remove();
        }
    }
}

/// Shared handle to the single map engine of a session.
///
/// Cloning the handle shares the same engine. The engine is torn down by
/// [`release`](MapHandle::release) or when the last handle is dropped,
/// whichever comes first. After release every operation is a logged no-op.
pub struct MapHandle<E: MapEngine> {
    shared: Arc<Shared<E>>,
}

impl<E: MapEngine> Clone for MapHandle<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: MapEngine> fmt::Debug for MapHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapHandle")
            .field("released", &self.is_released())
            .field("handles", &Arc::strong_count(&self.shared))
            .finish()
    }
}

impl<E: MapEngine> MapHandle<E> {
    /// Validate `options` and create the engine.
    pub fn acquire(options: &MapOptions) -> Result<Self, MapError> {
        options.validate()?;
        let engine = E::create(options)?;
        info!(
            "Map engine acquired at {} (zoom {:.1})",
            options.initial.center, options.initial.zoom
        );
        Ok(Self::from_engine(engine))
    }

    /// Wrap an engine that was created elsewhere.
    #[must_use]
    pub fn from_engine(engine: E) -> Self {
        Self {
            shared: Arc::new(Shared {
                engine: RwLock::new(Some(engine)),
            }),
        }
    }

    /// Run `f` against the engine. Returns `None` once released.
    pub fn with<R>(&self, f: impl FnOnce(&E) -> R) -> Option<R> {
        let guard = self.shared.engine.read().ok()?;
        guard.as_ref().map(f)
    }

    /// Run `f` against the engine mutably. Returns `None` once released.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut E) -> R) -> Option<R> {
        let mut guard = self.shared.engine.write().ok()?;
        guard.as_mut().map(f)
    }

    /// Like [`with_mut`](Self::with_mut) but reports a released engine as an error.
    pub fn try_with_mut<R>(&self, f: impl FnOnce(&mut E) -> R) -> Result<R, MapError> {
        self.with_mut(f).ok_or(MapError::Released)
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.shared
            .engine
            .read()
            .map(|guard| guard.is_none())
            .unwrap_or(true)
    }

    /// Tear the engine down. Safe to call more than once.
    pub fn release(&self) {
        let Ok(mut guard) = self.shared.engine.write() else {
            warn!("Map engine lock poisoned, cannot release");
            return;
        };
        match guard.take() {
            Some(mut engine) => {
                engine.remove();
                info!("Map engine released");
            }
            None => debug!("Map engine already released"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> MapOptions {
        MapOptions {
            access_token: Some("pk.test".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_token_fails_closed() {
        let err = MapHandle::<HeadlessMap>::acquire(&MapOptions::default()).unwrap_err();
        assert_eq!(err, MapError::MissingAccessToken);

        let blank = MapOptions {
            access_token: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            MapHandle::<HeadlessMap>::acquire(&blank).unwrap_err(),
            MapError::MissingAccessToken
        );
    }

    #[test]
    fn test_invalid_zoom_range_rejected() {
        let opts = MapOptions {
            min_zoom: 19.0,
            max_zoom: 15.0,
            ..options()
        };
        assert!(matches!(opts.validate(), Err(MapError::InvalidOptions(_))));
    }

    #[test]
    fn test_constrain_clamps_to_bounds_and_zoom() {
        let opts = options();
        let v = opts.constrain(Viewport {
            center: LngLat::new(107.5, 47.0),
            zoom: 22.0,
            pitch: 120.0,
            bearing: -90.0,
        });
        assert_eq!(v.center, LngLat::new(106.925, 47.91));
        assert!((v.zoom - 18.0).abs() < f64::EPSILON);
        assert!((v.pitch - MAX_PITCH).abs() < f64::EPSILON);
        assert!((v.bearing - 270.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_release_is_idempotent_and_fails_closed() {
        let handle = MapHandle::<HeadlessMap>::acquire(&options()).unwrap();
        let other = handle.clone();
        assert!(!handle.is_released());

        handle.release();
        handle.release();
        assert!(other.is_released());
        assert!(other.with(HeadlessMap::marker_count).is_none());
        assert_eq!(
            other.try_with_mut(|m| m.marker_count()).unwrap_err(),
            MapError::Released
        );
    }

    #[test]
    fn test_click_handler_invokes_callback() {
        let hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handler = ClickHandler::new(move || {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });
        handler.on_click();
        handler.clone().on_click();
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
