// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vertex and edge handles for one editable ring.
//!
//! A [`RingOverlay`] owns the ordered points of either the drawing session
//! or a closed field, one vertex handle per point and one edge handle per
//! edge (at the edge midpoint, carrying a distance label). Handles of
//! fields that lose edit focus are hidden, never destroyed, so focus can
//! come back without losing anything.
//!
//! Invariants:
//! - `vertex_handles[i].index == i` and sits at `ring[i]`.
//! - `edge_handles.len() == ring.len()` once the ring has two points.
//! - At most one handle of the overlay is active; only the active handle
//!   may carry a drag handle.

use crate::models::{FieldId, LatLng, ScreenPoint};
use crate::services::geometry;
use crate::services::label::DistanceLabel;
use crate::services::viewport::Projection;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Owner of a ring: the in-progress drawing session or a closed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum RingOwner {
    Drawing,
    Field(FieldId),
}

/// Which handle of a ring an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum HandleRef {
    Vertex(usize),
    Edge(usize),
}

/// Secondary, more precise drag affordance shown for the active handle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DragHandle {
    pub target: HandleRef,
    pub position: LatLng,
    pub screen: Option<ScreenPoint>,
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VertexHandle {
    pub index: usize,
    pub owner: RingOwner,
    pub position: LatLng,
    /// 1-based ordinal shown on the handle.
    pub label: String,
    pub is_active: bool,
    pub has_drag_handle: bool,
    pub screen: Option<ScreenPoint>,
}

impl VertexHandle {
    fn new(index: usize, owner: RingOwner, position: LatLng) -> Self {
        Self {
            index,
            owner,
            position,
            label: (index + 1).to_string(),
            is_active: false,
            has_drag_handle: false,
            screen: None,
        }
    }

    fn renumber(&mut self, index: usize) {
        self.index = index;
        self.label = (index + 1).to_string();
    }
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EdgeHandle {
    pub index: usize,
    pub owner: RingOwner,
    pub midpoint: LatLng,
    pub distance_meters: f64,
    pub label: DistanceLabel,
    pub is_active: bool,
    pub screen: Option<ScreenPoint>,
}

/// In-flight drag of an edge handle. The first drag event inserts a
/// vertex; later events in the same gesture move that vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EdgeGesture {
    edge_index: usize,
    inserted_at: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct RingOverlay {
    owner: RingOwner,
    ring: Vec<LatLng>,
    vertex_handles: Vec<VertexHandle>,
    edge_handles: Vec<EdgeHandle>,
    attached: bool,
    labels_editable: bool,
    active: Option<HandleRef>,
    drag_handle: Option<DragHandle>,
    edge_gesture: Option<EdgeGesture>,
}

impl RingOverlay {
    /// Empty overlay, attached to the map.
    pub fn new(owner: RingOwner) -> Self {
        Self {
            owner,
            ring: Vec::new(),
            vertex_handles: Vec::new(),
            edge_handles: Vec::new(),
            attached: true,
            labels_editable: false,
            active: None,
            drag_handle: None,
            edge_gesture: None,
        }
    }

    pub fn owner(&self) -> RingOwner {
        self.owner
    }

    pub fn ring(&self) -> &[LatLng] {
        &self.ring
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn vertex_handles(&self) -> &[VertexHandle] {
        &self.vertex_handles
    }

    pub fn edge_handles(&self) -> &[EdgeHandle] {
        &self.edge_handles
    }

    pub fn active(&self) -> Option<HandleRef> {
        self.active
    }

    pub fn active_vertex(&self) -> Option<usize> {
        match self.active {
            Some(HandleRef::Vertex(i)) => Some(i),
            _ => None,
        }
    }

    pub fn drag_handle(&self) -> Option<&DragHandle> {
        self.drag_handle.as_ref()
    }

    /// Whether an edge drag has already inserted its vertex.
    pub fn edge_drag_inserted(&self) -> Option<usize> {
        self.edge_gesture.and_then(|g| g.inserted_at)
    }

    pub fn has_handle(&self, handle: HandleRef) -> bool {
        match handle {
            HandleRef::Vertex(i) => i < self.vertex_handles.len(),
            HandleRef::Edge(i) => i < self.edge_handles.len(),
        }
    }

    /// Append a point and its handle; edges (including the closing edge)
    /// are recomputed.
    pub fn add_vertex(&mut self, p: LatLng) {
        let index = self.ring.len();
        self.ring.push(p);
        self.vertex_handles
            .push(VertexHandle::new(index, self.owner, p));
        self.rebuild_edges();
    }

    /// Replace `ring[index]`. Returns `false` if the index is out of range.
    pub fn move_vertex(&mut self, index: usize, p: LatLng) -> bool {
        let Some(slot) = self.ring.get_mut(index) else {
            return false;
        };
        *slot = p;
        self.vertex_handles[index].position = p;
        if let Some(drag) = self
            .drag_handle
            .as_mut()
            .filter(|d| d.target == HandleRef::Vertex(index))
        {
            drag.position = p;
        }
        self.rebuild_edges();
        true
    }

    /// Split edge `edge_index` by inserting `p` at `edge_index + 1`.
    ///
    /// Later vertex handles shift up by one and are renumbered. Returns the
    /// index of the new vertex, or `None` if the edge does not exist.
    pub fn insert_at_edge(&mut self, edge_index: usize, p: LatLng) -> Option<usize> {
        if edge_index >= self.edge_handles.len() {
            return None;
        }
        let at = edge_index + 1;
        self.ring.insert(at, p);
        self.vertex_handles
            .insert(at, VertexHandle::new(at, self.owner, p));
        for (i, handle) in self.vertex_handles.iter_mut().enumerate().skip(at + 1) {
            handle.renumber(i);
        }
        if let Some(HandleRef::Vertex(i)) = self.active {
            if i >= at {
                self.set_active(Some(HandleRef::Vertex(i + 1)));
            }
        }
        self.rebuild_edges();
        Some(at)
    }

    /// Move every vertex by the same lat/lng delta.
    pub fn translate(&mut self, d_lat: f64, d_lng: f64) {
        for (p, handle) in self.ring.iter_mut().zip(self.vertex_handles.iter_mut()) {
            *p = p.offset(d_lat, d_lng);
            handle.position = *p;
        }
        if let Some(drag) = self.drag_handle.as_mut() {
            drag.position = drag.position.offset(d_lat, d_lng);
        }
        self.rebuild_edges();
    }

    /// Make `handle` the single active handle of this overlay.
    ///
    /// The previously active handle loses its flag and drag handle first.
    /// Returns `false` if nothing changed or the handle does not exist.
    pub fn set_active(&mut self, handle: Option<HandleRef>) -> bool {
        if handle == self.active {
            return false;
        }
        if let Some(h) = handle {
            if !self.has_handle(h) {
                return false;
            }
        }

        if let Some(prev) = self.active.take() {
            self.set_handle_flags(prev, false);
        }
        self.drag_handle = None;

        if let Some(h) = handle {
            self.set_handle_flags(h, true);
            let position = match h {
                HandleRef::Vertex(i) => self.ring[i],
                HandleRef::Edge(i) => self.edge_handles[i].midpoint,
            };
            self.drag_handle = Some(DragHandle {
                target: h,
                position,
                screen: None,
            });
            self.active = Some(h);
        }
        true
    }

    pub fn set_active_vertex(&mut self, index: Option<usize>) -> bool {
        self.set_active(index.map(HandleRef::Vertex))
    }

    /// Move the drag handle along with the pointer.
    pub fn move_drag_handle(&mut self, p: LatLng) {
        if let Some(drag) = self.drag_handle.as_mut() {
            drag.position = p;
        }
    }

    /// Start dragging edge `edge_index`. Activates its handle.
    pub fn begin_edge_drag(&mut self, edge_index: usize) -> bool {
        if edge_index >= self.edge_handles.len() {
            return false;
        }
        self.set_active(Some(HandleRef::Edge(edge_index)));
        self.edge_gesture = Some(EdgeGesture {
            edge_index,
            inserted_at: None,
        });
        true
    }

    pub fn edge_drag_in_progress(&self, edge_index: usize) -> bool {
        self.edge_gesture
            .is_some_and(|g| g.edge_index == edge_index)
    }

    /// Apply one drag event of the current edge gesture.
    ///
    /// The first call inserts a vertex at the pointer; subsequent calls move
    /// that same vertex. Returns the index of the affected vertex.
    pub fn drag_edge(&mut self, p: LatLng) -> Option<usize> {
        let mut gesture = self.edge_gesture?;
        let index = match gesture.inserted_at {
            Some(index) => {
                self.move_vertex(index, p);
                index
            }
            None => {
                let index = self.insert_at_edge(gesture.edge_index, p)?;
                gesture.inserted_at = Some(index);
                self.edge_gesture = Some(gesture);
                tracing::debug!(
                    owner = ?self.owner,
                    edge_index = gesture.edge_index,
                    vertex = index,
                    "Inserted vertex from edge drag"
                );
                index
            }
        };
        self.move_drag_handle(p);
        Some(index)
    }

    /// Finish the edge gesture. The inserted vertex stays.
    pub fn end_edge_drag(&mut self) -> Option<usize> {
        let gesture = self.edge_gesture.take()?;
        self.set_active(None);
        gesture.inserted_at
    }

    /// Drop the active handle, its drag handle and any edge gesture.
    pub fn clear_affordances(&mut self) {
        self.set_active(None);
        self.drag_handle = None;
        self.edge_gesture = None;
    }

    /// Attach handles and labels to the map surface.
    pub fn show(&mut self) {
        self.attached = true;
    }

    /// Detach handles and labels without discarding them.
    pub fn hide(&mut self) {
        self.attached = false;
        for handle in &mut self.vertex_handles {
            handle.screen = None;
        }
        for edge in &mut self.edge_handles {
            edge.screen = None;
            edge.label.remove();
        }
        if let Some(drag) = self.drag_handle.as_mut() {
            drag.screen = None;
        }
    }

    pub fn set_labels_editable(&mut self, editable: bool) {
        self.labels_editable = editable;
        for edge in &mut self.edge_handles {
            edge.label.set_interactive(editable);
        }
    }

    pub(crate) fn rebind(&mut self, owner: RingOwner) {
        self.owner = owner;
        for handle in &mut self.vertex_handles {
            handle.owner = owner;
        }
        for edge in &mut self.edge_handles {
            edge.owner = owner;
        }
    }

    /// Re-project every attached handle and label.
    pub fn draw(&mut self, projection: &dyn Projection) {
        if !self.attached {
            return;
        }
        for handle in &mut self.vertex_handles {
            handle.screen = Some(projection.to_screen(handle.position));
        }
        for edge in &mut self.edge_handles {
            edge.screen = Some(projection.to_screen(edge.midpoint));
            edge.label.draw(projection);
        }
        if let Some(drag) = self.drag_handle.as_mut() {
            drag.screen = Some(projection.to_screen(drag.position));
        }
    }

    /// Outline for rendering: open while fewer than three points, closed after.
    pub fn path(&self) -> Vec<LatLng> {
        geometry::closed_path(&self.ring)
    }

    fn set_handle_flags(&mut self, handle: HandleRef, on: bool) {
        match handle {
            HandleRef::Vertex(i) => {
                if let Some(h) = self.vertex_handles.get_mut(i) {
                    h.is_active = on;
                    h.has_drag_handle = on;
                }
            }
            HandleRef::Edge(i) => {
                if let Some(h) = self.edge_handles.get_mut(i) {
                    h.is_active = on;
                }
            }
        }
    }

    fn rebuild_edges(&mut self) {
        let n = self.ring.len();
        self.edge_handles.clear();
        if n < 2 {
            return;
        }
        for i in 0..n {
            let (a, b) = (self.ring[i], self.ring[(i + 1) % n]);
            let midpoint = geometry::midpoint(a, b);
            let distance_meters = geometry::distance_meters(a, b);
            let mut label = DistanceLabel::new(midpoint, distance_meters);
            label.set_interactive(self.labels_editable);
            self.edge_handles.push(EdgeHandle {
                index: i,
                owner: self.owner,
                midpoint,
                distance_meters,
                label,
                is_active: self.active == Some(HandleRef::Edge(i)),
                screen: None,
            });
        }
    }
}
