// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Field drawing and editing state machine.
//!
//! One [`FieldEditor`] owns every closed field, the optional drawing
//! session and the single active handle. All mutation happens
//! synchronously inside [`FieldEditor::handle`] or one of the command
//! methods, so a drag gesture (start, drag*, end) is applied in order and
//! run to completion per event.
//!
//! ```text
//! Idle --start--> Drawing --dblclick (>= 3 points)--> Closed(read-only)
//!                 Drawing --start (>= 3 points)--> Closed + Drawing(new)
//! Closed(read-only) <--dblclick--> Closed(editing)
//! ```
//!
//! At most one field is in edit mode; entering edit mode on one field
//! leaves it on every other field in the same call. Any active drag
//! affordance is torn down before focus moves.

use crate::models::{Field, FieldId, LatLng};
use crate::services::aggregator::{AreaAggregator, AreaListener, AreaReport};
use crate::services::geometry;
use crate::services::overlay::{HandleRef, RingOverlay, RingOwner};
use crate::services::viewport::Projection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A ring needs three points before it can close into a field.
pub const MIN_FIELD_VERTICES: usize = 3;

/// Behavior switches for the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorOptions {
    /// Starting a new field closes an unfinished one with enough points
    /// instead of discarding it.
    pub auto_close_on_new_field: bool,
    /// Dragging an edge handle inserts a vertex.
    pub edge_insertion: bool,
    /// Distance labels of the field in edit mode accept typed lengths.
    pub editable_labels: bool,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            auto_close_on_new_field: true,
            edge_insertion: true,
            editable_labels: true,
        }
    }
}

/// Coarse editor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "field", rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum EditorState {
    Idle,
    Drawing,
    Editing(FieldId),
}

/// What a pointer event hit on the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum PointerTarget {
    /// Bare map, outside any field.
    #[default]
    Map,
    Field {
        id: FieldId,
    },
    Handle {
        owner: RingOwner,
        handle: HandleRef,
    },
    Label {
        owner: RingOwner,
        edge: usize,
    },
}

/// Input to the state machine, with geographic positions.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    Click { target: PointerTarget, at: LatLng },
    DoubleClick { target: PointerTarget, at: LatLng },
    DragStart { target: PointerTarget, at: LatLng },
    Drag { target: PointerTarget, at: LatLng },
    DragEnd { target: PointerTarget, at: LatLng },
    /// Typed value committed on an edge's distance label.
    LabelCommit {
        owner: RingOwner,
        edge: usize,
        value: String,
    },
}

impl EditorEvent {
    fn position(&self) -> Option<LatLng> {
        match self {
            EditorEvent::Click { at, .. }
            | EditorEvent::DoubleClick { at, .. }
            | EditorEvent::DragStart { at, .. }
            | EditorEvent::Drag { at, .. }
            | EditorEvent::DragEnd { at, .. } => Some(*at),
            EditorEvent::LabelCommit { .. } => None,
        }
    }
}

/// Whether the map surface should still see the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Propagation {
    Continue,
    Stop,
}

/// Errors from editor commands. Pointer events never fail; invalid or
/// stale events are ignored.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditorError {
    #[error("Unknown field: {0}")]
    UnknownField(FieldId),

    #[error("Edge {edge} out of range for a ring of {vertices} vertices")]
    EdgeOutOfRange { edge: usize, vertices: usize },

    #[error("Edge {0} has zero length and cannot be rescaled")]
    DegenerateEdge(usize),

    #[error("Invalid edge length: {0}")]
    InvalidLength(f64),

    #[error("Cannot edit a field while another is being drawn")]
    DrawingInProgress,
}

/// Points being placed for a field that is not closed yet.
#[derive(Debug)]
pub struct DrawingSession {
    overlay: RingOverlay,
    started_at: DateTime<Utc>,
}

impl DrawingSession {
    fn new() -> Self {
        Self {
            overlay: RingOverlay::new(RingOwner::Drawing),
            started_at: Utc::now(),
        }
    }

    pub fn ring(&self) -> &[LatLng] {
        self.overlay.ring()
    }

    pub fn len(&self) -> usize {
        self.overlay.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlay.is_empty()
    }

    pub fn overlay(&self) -> &RingOverlay {
        &self.overlay
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Preview outline, closed once three points exist.
    pub fn path(&self) -> Vec<LatLng> {
        self.overlay.path()
    }
}

#[derive(Debug, Clone, Copy)]
struct FieldDrag {
    id: FieldId,
    last: LatLng,
}

#[derive(Debug, Default)]
pub struct FieldEditor {
    options: EditorOptions,
    fields: BTreeMap<FieldId, Field>,
    session: Option<DrawingSession>,
    /// Owner of the overlay holding the single active handle.
    active: Option<RingOwner>,
    field_drag: Option<FieldDrag>,
    next_field_id: u64,
    aggregator: AreaAggregator,
}

impl FieldEditor {
    pub fn new(options: EditorOptions) -> Self {
        Self {
            options,
            next_field_id: 1,
            ..Default::default()
        }
    }

    pub fn options(&self) -> EditorOptions {
        self.options
    }

    /// Register a callback for total-area changes.
    pub fn subscribe(&mut self, listener: AreaListener) {
        self.aggregator.subscribe(listener);
    }

    pub fn state(&self) -> EditorState {
        if self.session.is_some() {
            EditorState::Drawing
        } else if let Some(id) = self.editing_field() {
            EditorState::Editing(id)
        } else {
            EditorState::Idle
        }
    }

    pub fn editing_field(&self) -> Option<FieldId> {
        self.fields.values().find(|f| f.is_editing()).map(Field::id)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.fields.get(&id)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn drawing(&self) -> Option<&DrawingSession> {
        self.session.as_ref()
    }

    pub fn report(&self) -> AreaReport {
        AreaReport::from_fields(self.fields.values())
    }

    /// The single active handle, if any.
    pub fn active_handle(&self) -> Option<(RingOwner, HandleRef)> {
        let owner = self.active?;
        self.overlay(owner)?.active().map(|h| (owner, h))
    }

    // ─── Commands ────────────────────────────────────────────────

    /// Begin drawing a new field.
    ///
    /// An unfinished drawing with at least three points is closed first
    /// (when enabled); a shorter one is discarded. Returns the id of a
    /// field closed this way.
    pub fn start_drawing_new_field(&mut self) -> Option<FieldId> {
        self.release_active();
        self.field_drag = None;
        for field in self.fields.values_mut() {
            if field.is_editing() {
                field.leave_edit_mode();
            }
        }

        let closed = match self.session.take() {
            Some(session)
                if session.len() >= MIN_FIELD_VERTICES && self.options.auto_close_on_new_field =>
            {
                Some(self.close_session(session))
            }
            Some(session) => {
                tracing::debug!(vertices = session.len(), "Discarding unfinished drawing");
                None
            }
            None => None,
        };

        self.session = Some(DrawingSession::new());
        tracing::info!(closed = ?closed, fields = self.fields.len(), "Drawing new field");
        closed
    }

    /// Close the drawing session into a field if it has enough points.
    pub fn finish_drawing(&mut self) -> Option<FieldId> {
        if self.session.as_ref()?.len() < MIN_FIELD_VERTICES {
            return None;
        }
        let session = self.session.take()?;
        Some(self.close_session(session))
    }

    /// Drop the drawing session. Returns `false` if none was active.
    pub fn cancel_drawing(&mut self) -> bool {
        if self.active == Some(RingOwner::Drawing) {
            self.release_active();
        }
        match self.session.take() {
            Some(session) => {
                tracing::debug!(vertices = session.len(), "Drawing cancelled");
                true
            }
            None => false,
        }
    }

    /// Turn edit mode on or off for one field. Enabling it turns it off on
    /// every other field in the same call.
    pub fn set_edit_mode(&mut self, id: FieldId, enabled: bool) -> Result<(), EditorError> {
        if !self.fields.contains_key(&id) {
            return Err(EditorError::UnknownField(id));
        }
        if enabled && self.session.is_some() {
            return Err(EditorError::DrawingInProgress);
        }

        if enabled || self.active == Some(RingOwner::Field(id)) {
            self.release_active();
        }
        if self.field_drag.is_some_and(|d| enabled || d.id == id) {
            self.field_drag = None;
        }

        let labels_editable = self.options.editable_labels;
        for field in self.fields.values_mut() {
            if field.id() == id {
                if enabled {
                    field.enter_edit_mode(labels_editable);
                } else {
                    field.leave_edit_mode();
                }
            } else if enabled && field.is_editing() {
                field.leave_edit_mode();
            }
        }

        tracing::debug!(field_id = %id, enabled, "Edit mode changed");
        Ok(())
    }

    /// Rescale edge `edge` of a field to `meters` by moving its far
    /// endpoint along the current direction. Returns the new far endpoint.
    pub fn set_field_edge_length(
        &mut self,
        id: FieldId,
        edge: usize,
        meters: f64,
    ) -> Result<LatLng, EditorError> {
        if !(meters.is_finite() && meters > 0.0) {
            return Err(EditorError::InvalidLength(meters));
        }
        let field = self
            .fields
            .get_mut(&id)
            .ok_or(EditorError::UnknownField(id))?;

        let vertices = field.ring().len();
        if edge >= vertices {
            return Err(EditorError::EdgeOutOfRange { edge, vertices });
        }
        let far = (edge + 1) % vertices;
        let (near_point, far_point) = (field.ring()[edge], field.ring()[far]);
        let target = geometry::extend_segment(near_point, far_point, meters)
            .ok_or(EditorError::DegenerateEdge(edge))?;
        // Long rescales can overshoot a pole or the antimeridian.
        if !target.is_valid() {
            return Err(EditorError::InvalidLength(meters));
        }

        field.overlay_mut().move_vertex(far, target);
        field.refresh_metrics();
        tracing::info!(
            field_id = %id,
            edge,
            meters,
            area_hectares = field.metrics().area_hectares,
            "Edge length set"
        );
        self.refresh_report();
        Ok(target)
    }

    /// Delete a closed field.
    pub fn remove_field(&mut self, id: FieldId) -> Result<(), EditorError> {
        if self.active == Some(RingOwner::Field(id)) {
            self.active = None;
        }
        if self.field_drag.is_some_and(|d| d.id == id) {
            self.field_drag = None;
        }
        self.fields
            .remove(&id)
            .ok_or(EditorError::UnknownField(id))?;
        tracing::info!(field_id = %id, "Field removed");
        self.refresh_report();
        Ok(())
    }

    /// Re-project every visible handle and label after a viewport change.
    pub fn draw(&mut self, projection: &dyn Projection) {
        for field in self.fields.values_mut() {
            field.overlay_mut().draw(projection);
        }
        if let Some(session) = self.session.as_mut() {
            session.overlay.draw(projection);
        }
    }

    // ─── Events ──────────────────────────────────────────────────

    pub fn handle(&mut self, event: EditorEvent) -> Propagation {
        if let Some(at) = event.position().filter(|p| !p.is_valid()) {
            tracing::debug!(?at, "Ignoring event with invalid position");
            return Propagation::Stop;
        }
        match event {
            EditorEvent::Click { target, at } => self.on_click(target, at),
            EditorEvent::DoubleClick { target, .. } => self.on_double_click(target),
            EditorEvent::DragStart { target, at } => self.on_drag_start(target, at),
            EditorEvent::Drag { target, at } => self.on_drag(target, at),
            EditorEvent::DragEnd { target, at } => self.on_drag_end(target, at),
            EditorEvent::LabelCommit { owner, edge, value } => {
                self.on_label_commit(owner, edge, &value)
            }
        }
    }

    fn on_click(&mut self, target: PointerTarget, at: LatLng) -> Propagation {
        match target {
            // Fields under the pointer do not block vertex placement.
            PointerTarget::Map | PointerTarget::Field { .. } if self.session.is_some() => {
                if let Some(session) = self.session.as_mut() {
                    session.overlay.add_vertex(at);
                    tracing::debug!(vertices = session.len(), "Vertex placed");
                }
                Propagation::Stop
            }
            PointerTarget::Map => {
                self.defocus();
                Propagation::Continue
            }
            PointerTarget::Field { id } => {
                self.select_field(id);
                Propagation::Stop
            }
            PointerTarget::Handle {
                owner,
                handle: handle @ HandleRef::Vertex(_),
            } => {
                if self.is_focused(owner) {
                    self.activate(owner, handle);
                } else {
                    tracing::debug!(?owner, "Ignoring click on stale handle");
                }
                Propagation::Stop
            }
            PointerTarget::Handle { .. } | PointerTarget::Label { .. } => Propagation::Stop,
        }
    }

    fn on_double_click(&mut self, target: PointerTarget) -> Propagation {
        match target {
            PointerTarget::Map | PointerTarget::Field { .. } if self.session.is_some() => {
                if self.finish_drawing().is_none() {
                    tracing::debug!("Double click with too few points to close");
                }
                Propagation::Stop
            }
            PointerTarget::Map => Propagation::Continue,
            PointerTarget::Field { id } => {
                let editing = self.fields.get(&id).is_some_and(Field::is_editing);
                if let Err(e) = self.set_edit_mode(id, !editing) {
                    tracing::debug!(error = %e, "Edit mode toggle ignored");
                }
                Propagation::Stop
            }
            PointerTarget::Handle { .. } | PointerTarget::Label { .. } => Propagation::Stop,
        }
    }

    fn on_drag_start(&mut self, target: PointerTarget, at: LatLng) -> Propagation {
        match target {
            PointerTarget::Handle { owner, handle } => {
                if !self.is_focused(owner) {
                    tracing::debug!(?owner, ?handle, "Ignoring drag on stale handle");
                    return Propagation::Stop;
                }
                match handle {
                    HandleRef::Vertex(_) => {
                        self.activate(owner, handle);
                    }
                    HandleRef::Edge(edge) if self.options.edge_insertion => {
                        self.begin_edge_drag(owner, edge);
                    }
                    HandleRef::Edge(_) => {}
                }
                Propagation::Stop
            }
            PointerTarget::Field { id } => {
                if self.fields.get(&id).is_some_and(Field::is_editing) {
                    self.release_active();
                    self.field_drag = Some(FieldDrag { id, last: at });
                }
                Propagation::Stop
            }
            PointerTarget::Label { .. } => Propagation::Stop,
            PointerTarget::Map => Propagation::Continue,
        }
    }

    fn on_drag(&mut self, target: PointerTarget, at: LatLng) -> Propagation {
        match target {
            PointerTarget::Handle { owner, handle } => {
                if !self.is_focused(owner) {
                    tracing::debug!(?owner, ?handle, "Ignoring drag on stale handle");
                    return Propagation::Stop;
                }
                let at = at.rounded();
                match handle {
                    HandleRef::Vertex(index) => {
                        if self.active_handle() != Some((owner, handle))
                            && !self.activate(owner, handle)
                        {
                            return Propagation::Stop;
                        }
                        if let Some(overlay) = self.overlay_mut(owner) {
                            overlay.move_vertex(index, at);
                        }
                        self.after_ring_change(owner);
                    }
                    HandleRef::Edge(edge) => {
                        if !self.options.edge_insertion {
                            return Propagation::Stop;
                        }
                        let in_progress = self
                            .overlay(owner)
                            .is_some_and(|o| o.edge_drag_in_progress(edge));
                        if !in_progress && !self.begin_edge_drag(owner, edge) {
                            return Propagation::Stop;
                        }
                        let moved = self.overlay_mut(owner).and_then(|o| o.drag_edge(at));
                        if moved.is_some() {
                            self.after_ring_change(owner);
                        }
                    }
                }
                Propagation::Stop
            }
            PointerTarget::Field { id } => {
                let Some(drag) = self.field_drag.as_mut().filter(|d| d.id == id) else {
                    return Propagation::Stop;
                };
                let (d_lat, d_lng) = (at.lat - drag.last.lat, at.lng - drag.last.lng);
                drag.last = at;
                match self.fields.get_mut(&id).filter(|f| f.is_editing()) {
                    Some(field) => field.overlay_mut().translate(d_lat, d_lng),
                    None => {
                        self.field_drag = None;
                        return Propagation::Stop;
                    }
                }
                self.after_ring_change(RingOwner::Field(id));
                Propagation::Stop
            }
            PointerTarget::Label { .. } => Propagation::Stop,
            PointerTarget::Map => Propagation::Continue,
        }
    }

    fn on_drag_end(&mut self, target: PointerTarget, at: LatLng) -> Propagation {
        match target {
            PointerTarget::Handle { owner, handle } => {
                if !self.is_focused(owner) {
                    return Propagation::Stop;
                }
                match handle {
                    HandleRef::Vertex(index) => {
                        if self.active_handle() == Some((owner, handle)) {
                            if let Some(overlay) = self.overlay_mut(owner) {
                                overlay.move_vertex(index, at.rounded());
                            }
                            self.after_ring_change(owner);
                        }
                    }
                    HandleRef::Edge(_) => {
                        let inserted = self.overlay_mut(owner).and_then(|o| o.end_edge_drag());
                        tracing::debug!(?owner, ?inserted, "Edge drag finished");
                    }
                }
                if self.active == Some(owner) {
                    self.release_active();
                }
                Propagation::Stop
            }
            PointerTarget::Field { id } => {
                if self.field_drag.is_some_and(|d| d.id == id) {
                    self.field_drag = None;
                }
                Propagation::Stop
            }
            PointerTarget::Label { .. } => Propagation::Stop,
            PointerTarget::Map => Propagation::Continue,
        }
    }

    fn on_label_commit(&mut self, owner: RingOwner, edge: usize, value: &str) -> Propagation {
        let RingOwner::Field(id) = owner else {
            tracing::debug!("Distance labels are read-only while drawing");
            return Propagation::Stop;
        };
        if !self.is_focused(owner) {
            tracing::debug!(field_id = %id, "Ignoring label commit on stale field");
            return Propagation::Stop;
        }
        let meters = self
            .fields
            .get(&id)
            .and_then(|f| f.overlay().edge_handles().get(edge))
            .and_then(|e| e.label.commit(value));
        let Some(meters) = meters else {
            tracing::debug!(field_id = %id, edge, value, "Rejected label input");
            return Propagation::Stop;
        };
        if let Err(e) = self.set_field_edge_length(id, edge, meters) {
            tracing::warn!(field_id = %id, edge, error = %e, "Failed to apply label input");
        }
        Propagation::Stop
    }

    // ─── Internals ───────────────────────────────────────────────

    fn close_session(&mut self, session: DrawingSession) -> FieldId {
        if self.active == Some(RingOwner::Drawing) {
            self.active = None;
        }
        let id = FieldId(self.next_field_id.max(1));
        self.next_field_id = id.0 + 1;

        let field = Field::new(id, session.overlay);
        tracing::info!(
            field_id = %id,
            vertices = field.ring().len(),
            area_hectares = field.metrics().area_hectares,
            perimeter_meters = field.metrics().perimeter_meters,
            "Field closed"
        );
        self.fields.insert(id, field);
        self.refresh_report();
        id
    }

    fn defocus(&mut self) {
        self.release_active();
        self.field_drag = None;
        for field in self.fields.values_mut() {
            if field.is_editing() {
                field.leave_edit_mode();
            }
            field.set_selected(false);
        }
    }

    fn select_field(&mut self, id: FieldId) {
        if !self.fields.contains_key(&id) {
            tracing::debug!(field_id = %id, "Ignoring click on unknown field");
            return;
        }
        if self.active.is_some_and(|owner| owner != RingOwner::Field(id)) {
            self.release_active();
        }
        for field in self.fields.values_mut() {
            if field.id() == id {
                field.set_selected(true);
            } else {
                field.set_selected(false);
                if field.is_editing() {
                    field.leave_edit_mode();
                }
            }
        }
    }

    /// Whether `owner` currently holds edit focus, i.e. its handles accept input.
    fn is_focused(&self, owner: RingOwner) -> bool {
        match owner {
            RingOwner::Drawing => self.session.is_some(),
            RingOwner::Field(id) => self.fields.get(&id).is_some_and(Field::is_editing),
        }
    }

    fn overlay(&self, owner: RingOwner) -> Option<&RingOverlay> {
        match owner {
            RingOwner::Drawing => self.session.as_ref().map(|s| &s.overlay),
            RingOwner::Field(id) => self.fields.get(&id).map(Field::overlay),
        }
    }

    fn overlay_mut(&mut self, owner: RingOwner) -> Option<&mut RingOverlay> {
        match owner {
            RingOwner::Drawing => self.session.as_mut().map(|s| &mut s.overlay),
            RingOwner::Field(id) => self.fields.get_mut(&id).map(Field::overlay_mut),
        }
    }

    /// Make `handle` the one active handle across the editor.
    fn activate(&mut self, owner: RingOwner, handle: HandleRef) -> bool {
        if !self.overlay(owner).is_some_and(|o| o.has_handle(handle)) {
            return false;
        }
        if let Some(previous) = self.active.filter(|p| *p != owner) {
            if let Some(overlay) = self.overlay_mut(previous) {
                overlay.clear_affordances();
            }
        }
        if let Some(overlay) = self.overlay_mut(owner) {
            overlay.set_active(Some(handle));
        }
        self.active = Some(owner);
        true
    }

    fn begin_edge_drag(&mut self, owner: RingOwner, edge: usize) -> bool {
        if !self.activate(owner, HandleRef::Edge(edge)) {
            return false;
        }
        self.overlay_mut(owner)
            .is_some_and(|o| o.begin_edge_drag(edge))
    }

    /// Remove the active handle's drag affordance and any edge gesture.
    fn release_active(&mut self) {
        if let Some(owner) = self.active.take() {
            if let Some(overlay) = self.overlay_mut(owner) {
                overlay.clear_affordances();
            }
        }
    }

    fn after_ring_change(&mut self, owner: RingOwner) {
        if let RingOwner::Field(id) = owner {
            if let Some(field) = self.fields.get_mut(&id) {
                field.refresh_metrics();
            }
            self.refresh_report();
        }
    }

    fn refresh_report(&mut self) {
        self.aggregator.refresh(self.fields.values());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const SQUARE: [(f64, f64); 4] = [(0.0, 0.0), (0.0, 0.001), (0.001, 0.001), (0.001, 0.0)];

    fn click(at: LatLng) -> EditorEvent {
        EditorEvent::Click {
            target: PointerTarget::Map,
            at,
        }
    }

    fn dblclick() -> EditorEvent {
        EditorEvent::DoubleClick {
            target: PointerTarget::Map,
            at: LatLng::new(0.0, 0.0),
        }
    }

    fn handle_target(owner: RingOwner, handle: HandleRef) -> PointerTarget {
        PointerTarget::Handle { owner, handle }
    }

    fn draw(editor: &mut FieldEditor, points: &[(f64, f64)]) -> Option<FieldId> {
        editor.start_drawing_new_field();
        for &(lat, lng) in points {
            editor.handle(click(LatLng::new(lat, lng)));
        }
        editor.handle(dblclick());
        editor.fields().map(Field::id).max()
    }

    fn active_count(editor: &FieldEditor) -> usize {
        let count = |o: &RingOverlay| {
            o.vertex_handles().iter().filter(|h| h.is_active).count()
                + o.edge_handles().iter().filter(|h| h.is_active).count()
        };
        editor.fields().map(|f| count(f.overlay())).sum::<usize>()
            + editor.drawing().map_or(0, |s| count(s.overlay()))
    }

    #[test]
    fn test_square_closes_into_field() {
        let mut editor = FieldEditor::default();
        assert_eq!(editor.state(), EditorState::Idle);
        let id = draw(&mut editor, &SQUARE).expect("field closed");

        assert_eq!(editor.state(), EditorState::Idle);
        let field = editor.field(id).unwrap();
        assert_eq!(field.ring().len(), 4);
        assert_eq!(field.path().len(), 5);
        assert_eq!(field.path()[0], field.path()[4]);
        assert_eq!(field.overlay().edge_handles().len(), 4);
        assert!(!field.overlay().is_attached());

        let side = geometry::distance_meters(LatLng::new(0.0, 0.0), LatLng::new(0.0, 0.001));
        assert!((field.metrics().perimeter_meters - 4.0 * side).abs() < 0.01);
        assert!(field.metrics().area_hectares > 0.0);
    }

    #[test]
    fn test_double_click_with_two_points_keeps_drawing() {
        let mut editor = FieldEditor::default();
        editor.start_drawing_new_field();
        editor.handle(click(LatLng::new(0.0, 0.0)));
        editor.handle(click(LatLng::new(0.0, 0.001)));
        editor.handle(dblclick());
        assert_eq!(editor.state(), EditorState::Drawing);
        assert_eq!(editor.field_count(), 0);
        assert_eq!(editor.drawing().unwrap().len(), 2);
    }

    #[test]
    fn test_new_field_discards_short_drawing() {
        let mut editor = FieldEditor::default();
        editor.start_drawing_new_field();
        editor.handle(click(LatLng::new(0.0, 0.0)));
        editor.handle(click(LatLng::new(0.0, 0.001)));

        assert_eq!(editor.start_drawing_new_field(), None);
        assert_eq!(editor.field_count(), 0);
        assert!(editor.drawing().unwrap().is_empty());
    }

    #[test]
    fn test_new_field_auto_closes_drawing() {
        let mut editor = FieldEditor::default();
        editor.start_drawing_new_field();
        for &(lat, lng) in &SQUARE[..3] {
            editor.handle(click(LatLng::new(lat, lng)));
        }
        let closed = editor.start_drawing_new_field().expect("auto-closed");
        assert_eq!(editor.field(closed).unwrap().ring().len(), 3);
        assert!(editor.drawing().unwrap().is_empty());
        assert_eq!(editor.state(), EditorState::Drawing);
    }

    #[test]
    fn test_auto_close_can_be_disabled() {
        let mut editor = FieldEditor::new(EditorOptions {
            auto_close_on_new_field: false,
            ..EditorOptions::default()
        });
        editor.start_drawing_new_field();
        for &(lat, lng) in &SQUARE[..3] {
            editor.handle(click(LatLng::new(lat, lng)));
        }
        assert_eq!(editor.start_drawing_new_field(), None);
        assert_eq!(editor.field_count(), 0);
    }

    #[test]
    fn test_cancel_drawing() {
        let mut editor = FieldEditor::default();
        assert!(!editor.cancel_drawing());
        editor.start_drawing_new_field();
        editor.handle(click(LatLng::new(0.0, 0.0)));
        assert!(editor.cancel_drawing());
        assert_eq!(editor.state(), EditorState::Idle);
        assert_eq!(editor.field_count(), 0);
    }

    #[test]
    fn test_edit_mode_is_exclusive() {
        let mut editor = FieldEditor::default();
        let a = draw(&mut editor, &SQUARE).unwrap();
        let shifted: Vec<_> = SQUARE.iter().map(|&(lat, lng)| (lat + 0.01, lng)).collect();
        let b = draw(&mut editor, &shifted).unwrap();

        editor.set_edit_mode(a, true).unwrap();
        assert_eq!(editor.state(), EditorState::Editing(a));
        assert!(editor.field(a).unwrap().overlay().is_attached());

        editor.set_edit_mode(b, true).unwrap();
        assert!(!editor.field(a).unwrap().is_editing());
        assert!(!editor.field(a).unwrap().overlay().is_attached());
        assert!(editor.field(b).unwrap().is_editing());
        assert!(editor.field(b).unwrap().overlay().is_attached());
        assert_eq!(editor.fields().filter(|f| f.is_editing()).count(), 1);
    }

    #[test]
    fn test_double_click_toggles_edit_mode() {
        let mut editor = FieldEditor::default();
        let id = draw(&mut editor, &SQUARE).unwrap();
        let target = PointerTarget::Field { id };
        let at = LatLng::new(0.0005, 0.0005);

        assert_eq!(
            editor.handle(EditorEvent::DoubleClick { target, at }),
            Propagation::Stop
        );
        assert_eq!(editor.state(), EditorState::Editing(id));
        editor.handle(EditorEvent::DoubleClick { target, at });
        assert_eq!(editor.state(), EditorState::Idle);
        assert_eq!(editor.field(id).unwrap().ring().len(), 4);
    }

    #[test]
    fn test_click_selects_and_map_click_defocuses() {
        let mut editor = FieldEditor::default();
        let a = draw(&mut editor, &SQUARE).unwrap();
        let shifted: Vec<_> = SQUARE.iter().map(|&(lat, lng)| (lat + 0.01, lng)).collect();
        let b = draw(&mut editor, &shifted).unwrap();
        editor.set_edit_mode(a, true).unwrap();

        editor.handle(EditorEvent::Click {
            target: PointerTarget::Field { id: b },
            at: LatLng::new(0.0105, 0.0005),
        });
        assert!(editor.field(b).unwrap().is_selected());
        assert!(!editor.field(b).unwrap().is_editing());
        assert!(!editor.field(a).unwrap().is_editing());
        assert!(!editor.field(a).unwrap().is_selected());

        editor.set_edit_mode(b, true).unwrap();
        assert_eq!(
            editor.handle(click(LatLng::new(1.0, 1.0))),
            Propagation::Continue
        );
        assert_eq!(editor.state(), EditorState::Idle);
        assert!(editor.fields().all(|f| !f.is_selected()));
    }

    #[test]
    fn test_edit_mode_rejected_while_drawing() {
        let mut editor = FieldEditor::default();
        let id = draw(&mut editor, &SQUARE).unwrap();
        editor.start_drawing_new_field();
        assert_eq!(
            editor.set_edit_mode(id, true),
            Err(EditorError::DrawingInProgress)
        );
        assert_eq!(
            editor.set_edit_mode(FieldId(99), false),
            Err(EditorError::UnknownField(FieldId(99)))
        );
    }

    #[test]
    fn test_vertex_drag_gesture() {
        let mut editor = FieldEditor::default();
        let id = draw(&mut editor, &SQUARE).unwrap();
        editor.set_edit_mode(id, true).unwrap();
        let owner = RingOwner::Field(id);
        let target = handle_target(owner, HandleRef::Vertex(2));
        let before = editor.field(id).unwrap().metrics().area_hectares;

        editor.handle(EditorEvent::DragStart {
            target,
            at: LatLng::new(0.001, 0.001),
        });
        assert_eq!(editor.active_handle(), Some((owner, HandleRef::Vertex(2))));
        assert!(editor.field(id).unwrap().overlay().vertex_handles()[2].has_drag_handle);

        editor.handle(EditorEvent::Drag {
            target,
            at: LatLng::new(0.0015, 0.0015),
        });
        let end = LatLng::new(0.002, 0.002);
        editor.handle(EditorEvent::DragEnd { target, at: end });

        let field = editor.field(id).unwrap();
        assert_eq!(field.ring()[2], end);
        assert!(field.metrics().area_hectares > before);
        assert!(editor.active_handle().is_none());
        assert!(field.overlay().drag_handle().is_none());
    }

    #[test]
    fn test_drag_on_stale_field_is_ignored() {
        let mut editor = FieldEditor::default();
        let id = draw(&mut editor, &SQUARE).unwrap();
        let target = handle_target(RingOwner::Field(id), HandleRef::Vertex(0));
        editor.handle(EditorEvent::Drag {
            target,
            at: LatLng::new(-0.5, -0.5),
        });
        assert_eq!(editor.field(id).unwrap().ring()[0], LatLng::new(0.0, 0.0));
    }

    #[test]
    fn test_edge_drag_inserts_single_vertex() {
        let mut editor = FieldEditor::default();
        let id = draw(&mut editor, &SQUARE[..3]).unwrap();
        editor.set_edit_mode(id, true).unwrap();
        let before = editor.field(id).unwrap().metrics().area_hectares;
        let target = handle_target(RingOwner::Field(id), HandleRef::Edge(0));

        editor.handle(EditorEvent::DragStart {
            target,
            at: LatLng::new(0.0, 0.0005),
        });
        for step in 1..=5 {
            editor.handle(EditorEvent::Drag {
                target,
                at: LatLng::new(-0.0001 * step as f64, 0.0005),
            });
        }
        editor.handle(EditorEvent::DragEnd {
            target,
            at: LatLng::new(-0.0005, 0.0005),
        });

        let field = editor.field(id).unwrap();
        assert_eq!(field.ring().len(), 4);
        assert_eq!(field.ring()[1], LatLng::new(-0.0005, 0.0005));
        assert_eq!(field.overlay().edge_handles().len(), 4);
        assert_eq!(field.metrics().edge_lengths.len(), 4);
        assert!(field.metrics().area_hectares > before);
        assert!(editor.active_handle().is_none());
    }

    #[test]
    fn test_edge_insertion_can_be_disabled() {
        let mut editor = FieldEditor::new(EditorOptions {
            edge_insertion: false,
            ..EditorOptions::default()
        });
        let id = draw(&mut editor, &SQUARE[..3]).unwrap();
        editor.set_edit_mode(id, true).unwrap();
        let target = handle_target(RingOwner::Field(id), HandleRef::Edge(0));
        editor.handle(EditorEvent::Drag {
            target,
            at: LatLng::new(-0.0005, 0.0005),
        });
        assert_eq!(editor.field(id).unwrap().ring().len(), 3);
    }

    #[test]
    fn test_edge_drag_while_drawing() {
        let mut editor = FieldEditor::default();
        editor.start_drawing_new_field();
        for &(lat, lng) in &SQUARE[..3] {
            editor.handle(click(LatLng::new(lat, lng)));
        }
        let target = handle_target(RingOwner::Drawing, HandleRef::Edge(2));
        editor.handle(EditorEvent::Drag {
            target,
            at: LatLng::new(0.0005, -0.0005),
        });
        editor.handle(EditorEvent::Drag {
            target,
            at: LatLng::new(0.0006, -0.0006),
        });
        editor.handle(EditorEvent::DragEnd {
            target,
            at: LatLng::new(0.0006, -0.0006),
        });
        let session = editor.drawing().unwrap();
        assert_eq!(session.len(), 4);
        assert_eq!(session.ring()[3], LatLng::new(0.0006, -0.0006));
    }

    #[test]
    fn test_single_active_vertex_across_fields() {
        let mut editor = FieldEditor::default();
        let a = draw(&mut editor, &SQUARE).unwrap();
        editor.set_edit_mode(a, true).unwrap();
        editor.handle(EditorEvent::Click {
            target: handle_target(RingOwner::Field(a), HandleRef::Vertex(0)),
            at: LatLng::new(0.0, 0.0),
        });
        editor.handle(EditorEvent::Click {
            target: handle_target(RingOwner::Field(a), HandleRef::Vertex(1)),
            at: LatLng::new(0.0, 0.001),
        });
        assert_eq!(active_count(&editor), 1);
        assert_eq!(
            editor.active_handle(),
            Some((RingOwner::Field(a), HandleRef::Vertex(1)))
        );

        // Starting a new drawing tears down the affordance.
        editor.start_drawing_new_field();
        assert_eq!(active_count(&editor), 0);
        assert!(editor.field(a).unwrap().overlay().drag_handle().is_none());

        editor.handle(click(LatLng::new(1.0, 1.0)));
        editor.handle(EditorEvent::Click {
            target: handle_target(RingOwner::Drawing, HandleRef::Vertex(0)),
            at: LatLng::new(1.0, 1.0),
        });
        assert_eq!(active_count(&editor), 1);
    }

    #[test]
    fn test_switching_edit_focus_clears_active_vertex() {
        let mut editor = FieldEditor::default();
        let a = draw(&mut editor, &SQUARE).unwrap();
        let shifted: Vec<_> = SQUARE.iter().map(|&(lat, lng)| (lat + 0.01, lng)).collect();
        let b = draw(&mut editor, &shifted).unwrap();
        editor.set_edit_mode(a, true).unwrap();
        editor.handle(EditorEvent::DragStart {
            target: handle_target(RingOwner::Field(a), HandleRef::Vertex(3)),
            at: LatLng::new(0.001, 0.0),
        });
        editor.set_edit_mode(b, true).unwrap();
        assert_eq!(active_count(&editor), 0);
        assert!(editor.active_handle().is_none());
    }

    #[test]
    fn test_label_commit_rescales_edge() {
        let mut editor = FieldEditor::default();
        let near = LatLng::new(27.3428, 75.7904);
        let id = draw(
            &mut editor,
            &[
                (27.3428, 75.7904),
                (27.34325, 75.7904),
                (27.34325, 75.7910),
                (27.3428, 75.7910),
            ],
        )
        .unwrap();
        assert_eq!(
            editor.field(id).unwrap().overlay().edge_handles()[0]
                .label
                .text(),
            "50m"
        );

        // Read-only fields ignore label input.
        let owner = RingOwner::Field(id);
        let commit = EditorEvent::LabelCommit {
            owner,
            edge: 0,
            value: "100".to_string(),
        };
        editor.handle(commit.clone());
        assert_eq!(editor.field(id).unwrap().ring()[1], LatLng::new(27.34325, 75.7904));

        editor.set_edit_mode(id, true).unwrap();
        assert_eq!(editor.handle(commit), Propagation::Stop);
        let far = editor.field(id).unwrap().ring()[1];
        assert!((geometry::distance_meters(near, far) - 100.0).abs() < 0.01);
        assert!((far.lng - near.lng).abs() < 1e-12);
        assert_eq!(
            editor.field(id).unwrap().overlay().edge_handles()[0]
                .label
                .text(),
            "100m"
        );
    }

    #[test]
    fn test_set_field_edge_length_errors() {
        let mut editor = FieldEditor::default();
        let id = draw(&mut editor, &SQUARE).unwrap();
        assert_eq!(
            editor.set_field_edge_length(id, 4, 10.0),
            Err(EditorError::EdgeOutOfRange {
                edge: 4,
                vertices: 4
            })
        );
        assert_eq!(
            editor.set_field_edge_length(id, 0, 0.0),
            Err(EditorError::InvalidLength(0.0))
        );
        assert_eq!(
            editor.set_field_edge_length(FieldId(42), 0, 10.0),
            Err(EditorError::UnknownField(FieldId(42)))
        );
    }

    #[test]
    fn test_degenerate_edge_is_rejected() {
        let mut editor = FieldEditor::default();
        let id = draw(&mut editor, &[(0.0, 0.0), (0.0, 0.0), (0.001, 0.0)]).unwrap();
        assert_eq!(
            editor.set_field_edge_length(id, 0, 10.0),
            Err(EditorError::DegenerateEdge(0))
        );
    }

    #[test]
    fn test_rescale_past_pole_is_rejected() {
        let mut editor = FieldEditor::default();
        let id = draw(&mut editor, &[(89.0, 0.0), (89.001, 0.0), (89.001, 0.001)]).unwrap();
        let before = editor.field(id).unwrap().ring().to_vec();
        assert_eq!(
            editor.set_field_edge_length(id, 0, 1.0e6),
            Err(EditorError::InvalidLength(1.0e6))
        );
        assert_eq!(editor.field(id).unwrap().ring(), before.as_slice());
    }

    #[test]
    fn test_label_gestures_do_not_reach_map() {
        let mut editor = FieldEditor::default();
        let id = draw(&mut editor, &SQUARE).unwrap();
        editor.set_edit_mode(id, true).unwrap();
        let target = PointerTarget::Label {
            owner: RingOwner::Field(id),
            edge: 0,
        };
        let at = LatLng::new(0.0, 0.0005);
        for event in [
            EditorEvent::DragStart { target, at },
            EditorEvent::Drag { target, at },
            EditorEvent::DragEnd { target, at },
        ] {
            assert_eq!(editor.handle(event), Propagation::Stop);
        }
        assert_eq!(editor.field(id).unwrap().ring().len(), 4);
        assert_eq!(
            editor.handle(EditorEvent::Drag {
                target: PointerTarget::Map,
                at
            }),
            Propagation::Continue
        );
    }

    #[test]
    fn test_closing_edge_rescale_moves_first_vertex() {
        let mut editor = FieldEditor::default();
        let id = draw(&mut editor, &SQUARE).unwrap();
        let ring = editor.field(id).unwrap().ring().to_vec();
        let d = geometry::distance_meters(ring[3], ring[0]);
        let moved = editor.set_field_edge_length(id, 3, 2.0 * d).unwrap();
        assert_eq!(editor.field(id).unwrap().ring()[0], moved);
        assert!((geometry::distance_meters(ring[3], moved) - 2.0 * d).abs() < 0.01);
    }

    #[test]
    fn test_field_drag_translates_ring() {
        let mut editor = FieldEditor::default();
        let id = draw(&mut editor, &SQUARE).unwrap();
        let target = PointerTarget::Field { id };
        let area = editor.field(id).unwrap().metrics().area_hectares;

        // Not in edit mode: no movement.
        editor.handle(EditorEvent::DragStart {
            target,
            at: LatLng::new(0.0005, 0.0005),
        });
        editor.handle(EditorEvent::Drag {
            target,
            at: LatLng::new(0.0015, 0.0005),
        });
        assert_eq!(editor.field(id).unwrap().ring()[0], LatLng::new(0.0, 0.0));

        editor.set_edit_mode(id, true).unwrap();
        editor.handle(EditorEvent::DragStart {
            target,
            at: LatLng::new(0.0005, 0.0005),
        });
        editor.handle(EditorEvent::Drag {
            target,
            at: LatLng::new(0.0015, 0.0005),
        });
        editor.handle(EditorEvent::DragEnd {
            target,
            at: LatLng::new(0.0015, 0.0005),
        });
        let field = editor.field(id).unwrap();
        assert!((field.ring()[0].lat - 0.001).abs() < 1e-12);
        assert!((field.metrics().area_hectares - area).abs() < 1e-3);
    }

    #[test]
    fn test_remove_field() {
        let mut editor = FieldEditor::default();
        let id = draw(&mut editor, &SQUARE).unwrap();
        editor.remove_field(id).unwrap();
        assert_eq!(editor.field_count(), 0);
        assert_eq!(editor.report().total_hectares, 0.0);
        assert_eq!(
            editor.remove_field(id),
            Err(EditorError::UnknownField(id))
        );
    }

    #[test]
    fn test_area_listener_notified() {
        let totals = Arc::new(Mutex::new(Vec::new()));
        let mut editor = FieldEditor::default();
        let sink = totals.clone();
        editor.subscribe(Box::new(move |report| {
            sink.lock().unwrap().push(report.total_hectares);
        }));

        let id = draw(&mut editor, &SQUARE).unwrap();
        let ring = editor.field(id).unwrap().ring().to_vec();
        let d = geometry::distance_meters(ring[0], ring[1]);
        editor.set_field_edge_length(id, 0, 2.0 * d).unwrap();

        let totals = totals.lock().unwrap();
        assert_eq!(totals.len(), 2);
        assert!(totals[1] > totals[0]);
    }

    #[test]
    fn test_clicks_on_fields_place_vertices_while_drawing() {
        let mut editor = FieldEditor::default();
        let id = draw(&mut editor, &SQUARE).unwrap();
        editor.start_drawing_new_field();
        editor.handle(EditorEvent::Click {
            target: PointerTarget::Field { id },
            at: LatLng::new(0.0005, 0.0005),
        });
        assert_eq!(editor.drawing().unwrap().len(), 1);
        assert!(!editor.field(id).unwrap().is_selected());
    }

    #[test]
    fn test_invalid_positions_are_ignored() {
        let mut editor = FieldEditor::default();
        editor.start_drawing_new_field();
        editor.handle(click(LatLng::new(f64::NAN, 0.0)));
        editor.handle(click(LatLng::new(95.0, 0.0)));
        assert!(editor.drawing().unwrap().is_empty());
    }
}
