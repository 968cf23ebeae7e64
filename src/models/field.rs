// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Field (closed polygon) model and its derived measurements.

use crate::models::LatLng;
use crate::services::geometry;
use crate::services::overlay::{RingOverlay, RingOwner};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Fill and stroke color of field polygons.
pub const POLYGON_COLOR: &str = "#00C853";
pub const POLYGON_FILL_OPACITY: f64 = 0.3;
pub const STROKE_WEIGHT: u32 = 2;
/// Selected fields are drawn with a thicker outline.
pub const SELECTED_STROKE_WEIGHT: u32 = STROKE_WEIGHT * 2;

/// Identifier of a closed field, unique within one editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/", type = "number")
)]
pub struct FieldId(pub u64);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field-{}", self.0)
    }
}

/// Whether a closed field is showing its edit handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum FieldMode {
    #[default]
    ReadOnly,
    Editing,
}

/// Measurements derived from a field's ring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FieldMetrics {
    pub area_hectares: f64,
    pub perimeter_meters: f64,
    /// One entry per edge, in edge index order.
    pub edge_lengths: Vec<f64>,
}

impl FieldMetrics {
    pub fn from_ring(ring: &[LatLng]) -> Self {
        let edge_lengths = geometry::edge_lengths(ring);
        Self {
            area_hectares: geometry::area_hectares(ring),
            perimeter_meters: edge_lengths.iter().sum(),
            edge_lengths,
        }
    }
}

/// A closed polygon drawn by the user.
#[derive(Debug)]
pub struct Field {
    id: FieldId,
    overlay: RingOverlay,
    mode: FieldMode,
    selected: bool,
    metrics: FieldMetrics,
    created_at: DateTime<Utc>,
}

impl Field {
    /// Build a field from a drawing overlay. Handles start hidden.
    pub(crate) fn new(id: FieldId, mut overlay: RingOverlay) -> Self {
        overlay.clear_affordances();
        overlay.hide();
        overlay.set_labels_editable(false);
        overlay.rebind(RingOwner::Field(id));
        let metrics = FieldMetrics::from_ring(overlay.ring());
        Self {
            id,
            overlay,
            mode: FieldMode::ReadOnly,
            selected: false,
            metrics,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn ring(&self) -> &[LatLng] {
        self.overlay.ring()
    }

    pub fn overlay(&self) -> &RingOverlay {
        &self.overlay
    }

    pub(crate) fn overlay_mut(&mut self) -> &mut RingOverlay {
        &mut self.overlay
    }

    pub fn mode(&self) -> FieldMode {
        self.mode
    }

    pub fn is_editing(&self) -> bool {
        self.mode == FieldMode::Editing
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn metrics(&self) -> &FieldMetrics {
        &self.metrics
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn stroke_weight(&self) -> u32 {
        if self.selected {
            SELECTED_STROKE_WEIGHT
        } else {
            STROKE_WEIGHT
        }
    }

    /// Rendered outline: the ring with its first point repeated at the end.
    pub fn path(&self) -> Vec<LatLng> {
        geometry::closed_path(self.ring())
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub(crate) fn enter_edit_mode(&mut self, labels_editable: bool) {
        self.mode = FieldMode::Editing;
        self.overlay.set_labels_editable(labels_editable);
        self.overlay.show();
    }

    pub(crate) fn leave_edit_mode(&mut self) {
        self.mode = FieldMode::ReadOnly;
        self.overlay.clear_affordances();
        self.overlay.set_labels_editable(false);
        self.overlay.hide();
    }

    /// Recompute area, perimeter and edge lengths from the current ring.
    pub(crate) fn refresh_metrics(&mut self) {
        self.metrics = FieldMetrics::from_ring(self.overlay.ring());
    }
}
