// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Map viewport adapter.
//!
//! Owns the viewport (center, zoom, size) and its Web Mercator projection,
//! translates raw pointer events in screen pixels into editor events with
//! geographic payloads, and carries the pass-through map chrome: basemap
//! type, fullscreen, place focus and the geolocation outcome.

use crate::models::{LatLng, MapType, ScreenPoint};
use crate::services::editor::{EditorEvent, PointerTarget};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Side of one Web Mercator tile in pixels at zoom 0.
pub const TILE_SIZE: f64 = 256.0;
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 22;
/// Zoom used when focusing on a searched place or the user's location.
pub const FOCUS_ZOOM: u8 = 18;

const LOCATION_DENIED_ALERT: &str =
    "Unable to get your location. Please check your location permissions.";
const LOCATION_UNSUPPORTED_ALERT: &str = "Geolocation is not supported by your browser";

/// Pixel <-> geographic conversion supplied by the map surface.
pub trait Projection {
    fn to_screen(&self, p: LatLng) -> ScreenPoint;
    fn to_geo(&self, s: ScreenPoint) -> LatLng;
}

/// Visible map window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: u8,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(center: LatLng, zoom: u8, width: f64, height: f64) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width,
            height,
        }
    }

    fn scale(&self) -> f64 {
        f64::from(1u32 << self.zoom)
    }

    fn world(p: LatLng) -> (f64, f64) {
        // Clamp to keep the projection finite near the poles.
        let sin_lat = p.lat.to_radians().sin().clamp(-0.9999, 0.9999);
        let x = TILE_SIZE * (0.5 + p.lng / 360.0);
        let y = TILE_SIZE * (0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI));
        (x, y)
    }

    fn unworld(x: f64, y: f64) -> LatLng {
        let lng = (x / TILE_SIZE - 0.5) * 360.0;
        let lat = (PI * (1.0 - 2.0 * y / TILE_SIZE)).sinh().atan().to_degrees();
        LatLng::new(lat, lng)
    }
}

impl Projection for Viewport {
    fn to_screen(&self, p: LatLng) -> ScreenPoint {
        let (cx, cy) = Self::world(self.center);
        let (px, py) = Self::world(p);
        let scale = self.scale();
        ScreenPoint::new(
            (px - cx) * scale + self.width / 2.0,
            (py - cy) * scale + self.height / 2.0,
        )
    }

    fn to_geo(&self, s: ScreenPoint) -> LatLng {
        let (cx, cy) = Self::world(self.center);
        let scale = self.scale();
        Self::unworld(
            (s.x - self.width / 2.0) / scale + cx,
            (s.y - self.height / 2.0) / scale + cy,
        )
    }
}

/// Kind of raw pointer/input event delivered by the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum PointerKind {
    Click,
    DoubleClick,
    DragStart,
    Drag,
    DragEnd,
    /// Input `change` on an editable distance label.
    Change,
}

/// Raw event from the map surface, in viewport pixels.
#[derive(Debug, Clone, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub target: PointerTarget,
    /// Input text for `change` events.
    #[serde(default)]
    #[validate(length(max = 32))]
    pub value: Option<String>,
}

/// Viewport command issued by the map chrome.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ViewportCommand {
    ZoomIn,
    ZoomOut,
    CycleMapType,
    ToggleFullscreen,
    PanTo { lat: f64, lng: f64 },
    /// Selected search result: pan and zoom in close.
    FocusPlace { lat: f64, lng: f64 },
    Resize { width: f64, height: f64 },
}

/// Result of a browser geolocation request.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum LocationOutcome {
    Found { lat: f64, lng: f64 },
    Denied,
    Unsupported,
}

/// Viewport plus the map chrome state that rides along with it.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MapAdapter {
    viewport: Viewport,
    map_type: MapType,
    fullscreen: bool,
    locating: bool,
    user_location: Option<LatLng>,
    /// User-visible alert from the last failed geolocation attempt.
    alert: Option<String>,
}

impl MapAdapter {
    pub fn new(viewport: Viewport, map_type: MapType) -> Self {
        Self {
            viewport,
            map_type,
            fullscreen: false,
            locating: false,
            user_location: None,
            alert: None,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn map_type(&self) -> MapType {
        self.map_type
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn is_locating(&self) -> bool {
        self.locating
    }

    pub fn user_location(&self) -> Option<LatLng> {
        self.user_location
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    /// Convert a raw pointer event into an editor event.
    ///
    /// `change` events only make sense on labels; anything else is dropped.
    pub fn translate(&self, event: PointerEvent) -> Option<EditorEvent> {
        let at = self.viewport.to_geo(ScreenPoint::new(event.x, event.y));
        let target = event.target;
        let translated = match event.kind {
            PointerKind::Click => EditorEvent::Click { target, at },
            PointerKind::DoubleClick => EditorEvent::DoubleClick { target, at },
            PointerKind::DragStart => EditorEvent::DragStart { target, at },
            PointerKind::Drag => EditorEvent::Drag { target, at },
            PointerKind::DragEnd => EditorEvent::DragEnd { target, at },
            PointerKind::Change => match target {
                PointerTarget::Label { owner, edge } => EditorEvent::LabelCommit {
                    owner,
                    edge,
                    value: event.value.unwrap_or_default(),
                },
                _ => {
                    tracing::debug!(?target, "Ignoring change event outside a label");
                    return None;
                }
            },
        };
        Some(translated)
    }

    /// Apply a viewport command. Returns `true` when the projection changed
    /// and overlays need to be redrawn.
    pub fn apply(&mut self, command: ViewportCommand) -> bool {
        match command {
            ViewportCommand::ZoomIn => self.set_zoom(self.viewport.zoom.saturating_add(1)),
            ViewportCommand::ZoomOut => self.set_zoom(self.viewport.zoom.saturating_sub(1)),
            ViewportCommand::CycleMapType => {
                self.map_type = self.map_type.next();
                tracing::debug!(map_type = self.map_type.as_str(), "Map type changed");
                false
            }
            ViewportCommand::ToggleFullscreen => {
                self.fullscreen = !self.fullscreen;
                false
            }
            ViewportCommand::PanTo { lat, lng } => self.pan_to(LatLng::new(lat, lng)),
            ViewportCommand::FocusPlace { lat, lng } => {
                let moved = self.pan_to(LatLng::new(lat, lng));
                self.set_zoom(FOCUS_ZOOM) || moved
            }
            ViewportCommand::Resize { width, height } => {
                if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
                    return false;
                }
                self.viewport.width = width;
                self.viewport.height = height;
                true
            }
        }
    }

    /// Mark a geolocation request as in flight.
    pub fn begin_locate(&mut self) {
        self.locating = true;
        self.alert = None;
    }

    /// Record the geolocation result. Returns `true` when the viewport moved.
    pub fn finish_locate(&mut self, outcome: LocationOutcome) -> bool {
        self.locating = false;
        match outcome {
            LocationOutcome::Found { lat, lng } => {
                let location = LatLng::new(lat, lng);
                if !location.is_valid() {
                    tracing::warn!(lat, lng, "Discarding invalid location");
                    return false;
                }
                self.user_location = Some(location);
                self.alert = None;
                let moved = self.pan_to(location);
                self.set_zoom(FOCUS_ZOOM) || moved
            }
            LocationOutcome::Denied => {
                tracing::info!("Geolocation denied");
                self.alert = Some(LOCATION_DENIED_ALERT.to_string());
                false
            }
            LocationOutcome::Unsupported => {
                self.alert = Some(LOCATION_UNSUPPORTED_ALERT.to_string());
                false
            }
        }
    }

    fn set_zoom(&mut self, zoom: u8) -> bool {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let changed = zoom != self.viewport.zoom;
        self.viewport.zoom = zoom;
        changed
    }

    fn pan_to(&mut self, center: LatLng) -> bool {
        if !center.is_valid() {
            tracing::debug!(?center, "Ignoring pan to invalid coordinate");
            return false;
        }
        let changed = center != self.viewport.center;
        self.viewport.center = center;
        changed
    }
}
