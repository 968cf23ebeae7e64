// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Distance label shown above an edge midpoint.
//!
//! The label is anchored to a geographic point but positioned in screen
//! space, so it must be redrawn through the viewport projection on every
//! pan or zoom. When interactive it doubles as a numeric input: committing
//! a value yields the new edge length in meters. The label never touches
//! the ring itself; the caller rescales the edge.

use crate::models::{LatLng, ScreenPoint};
use crate::services::geometry::{self, METERS_PER_KILOMETER};
use crate::services::viewport::Projection;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Unit the label displays (and therefore the unit typed input is read in).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum LengthUnit {
    #[serde(rename = "m")]
    Meters,
    #[serde(rename = "km")]
    Kilometers,
}

impl LengthUnit {
    fn for_distance(meters: f64) -> Self {
        if meters < METERS_PER_KILOMETER {
            LengthUnit::Meters
        } else {
            LengthUnit::Kilometers
        }
    }

    pub fn to_meters(self, value: f64) -> f64 {
        match self {
            LengthUnit::Meters => value,
            LengthUnit::Kilometers => value * METERS_PER_KILOMETER,
        }
    }

    /// Input step: whole meters, or hundredths of a kilometer.
    pub fn step(self) -> f64 {
        match self {
            LengthUnit::Meters => 1.0,
            LengthUnit::Kilometers => 0.01,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DistanceLabel {
    anchor: LatLng,
    distance_meters: f64,
    text: String,
    /// Numeric part of `text`, prefilled into the input.
    value: f64,
    unit: LengthUnit,
    interactive: bool,
    /// Last projected position; `None` while detached from the map.
    screen: Option<ScreenPoint>,
}

impl DistanceLabel {
    pub fn new(anchor: LatLng, distance_meters: f64) -> Self {
        let text = geometry::format_length(distance_meters);
        let unit = LengthUnit::for_distance(distance_meters);
        let value = text
            .trim_end_matches(char::is_alphabetic)
            .parse()
            .unwrap_or(0.0);
        Self {
            anchor,
            distance_meters,
            text,
            value,
            unit,
            interactive: false,
            screen: None,
        }
    }

    pub fn anchor(&self) -> LatLng {
        self.anchor
    }

    pub fn distance_meters(&self) -> f64 {
        self.distance_meters
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> LengthUnit {
        self.unit
    }

    pub fn screen(&self) -> Option<ScreenPoint> {
        self.screen
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    /// Re-project the anchor after a viewport change.
    pub fn draw(&mut self, projection: &dyn Projection) {
        self.screen = Some(projection.to_screen(self.anchor));
    }

    pub fn remove(&mut self) {
        self.screen = None;
    }

    /// Parse a committed input value into a target length in meters.
    ///
    /// Returns `None` for non-interactive labels, unparsable input, and
    /// lengths that are not strictly positive.
    pub fn commit(&self, raw: &str) -> Option<f64> {
        if !self.interactive {
            return None;
        }
        let value: f64 = raw.trim().parse().ok()?;
        if !value.is_finite() || value <= 0.0 {
            return None;
        }
        Some(self.unit.to_meters(value))
    }
}
