// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Render-ready views of an editor session.
//!
//! The front end draws the map from a [`SceneSnapshot`]; closed fields are
//! also exported as a GeoJSON FeatureCollection.

use crate::models::field::{
    POLYGON_COLOR, POLYGON_FILL_OPACITY, SELECTED_STROKE_WEIGHT, STROKE_WEIGHT,
};
use crate::models::{Field, FieldId, FieldMetrics, FieldMode, LatLng};
use crate::services::aggregator::AreaReport;
use crate::services::editor::{DrawingSession, EditorState, FieldEditor};
use crate::services::overlay::{
    DragHandle, EdgeHandle, HandleRef, RingOverlay, RingOwner, VertexHandle,
};
use crate::services::viewport::MapAdapter;
use geo::{LineString, Polygon};
use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Styling shared by every field polygon.
#[derive(Debug, Clone, Copy, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PolygonStyle {
    pub color: &'static str,
    pub fill_opacity: f64,
    pub stroke_weight: u32,
    pub selected_stroke_weight: u32,
}

pub const POLYGON_STYLE: PolygonStyle = PolygonStyle {
    color: POLYGON_COLOR,
    fill_opacity: POLYGON_FILL_OPACITY,
    stroke_weight: STROKE_WEIGHT,
    selected_stroke_weight: SELECTED_STROKE_WEIGHT,
};

/// Handles and labels currently attached to the map for one ring.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HandlesView {
    pub vertices: Vec<VertexHandle>,
    pub edges: Vec<EdgeHandle>,
    pub drag_handle: Option<DragHandle>,
}

impl HandlesView {
    /// `None` while the overlay is detached.
    fn from_overlay(overlay: &RingOverlay) -> Option<Self> {
        overlay.is_attached().then(|| Self {
            vertices: overlay.vertex_handles().to_vec(),
            edges: overlay.edge_handles().to_vec(),
            drag_handle: overlay.drag_handle().copied(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FieldView {
    pub id: FieldId,
    pub mode: FieldMode,
    pub selected: bool,
    pub stroke_weight: u32,
    /// Closed outline, first point repeated at the end.
    pub path: Vec<LatLng>,
    pub metrics: FieldMetrics,
    pub handles: Option<HandlesView>,
    pub created_at: String,
}

impl From<&Field> for FieldView {
    fn from(field: &Field) -> Self {
        Self {
            id: field.id(),
            mode: field.mode(),
            selected: field.is_selected(),
            stroke_weight: field.stroke_weight(),
            path: field.path(),
            metrics: field.metrics().clone(),
            handles: HandlesView::from_overlay(field.overlay()),
            created_at: field.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DrawingView {
    /// Preview outline; closed once three points exist.
    pub path: Vec<LatLng>,
    pub vertex_count: usize,
    pub can_close: bool,
    pub handles: Option<HandlesView>,
    pub started_at: String,
}

impl From<&DrawingSession> for DrawingView {
    fn from(session: &DrawingSession) -> Self {
        Self {
            path: session.path(),
            vertex_count: session.len(),
            can_close: session.len() >= crate::services::editor::MIN_FIELD_VERTICES,
            handles: HandlesView::from_overlay(session.overlay()),
            started_at: session.started_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActiveHandle {
    pub owner: RingOwner,
    pub handle: HandleRef,
}

/// Everything the front end needs to render one session.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SceneSnapshot {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub session_id: u64,
    pub state: EditorState,
    pub fields: Vec<FieldView>,
    pub drawing: Option<DrawingView>,
    pub active: Option<ActiveHandle>,
    pub report: AreaReport,
    pub map: MapAdapter,
    pub style: PolygonStyle,
}

impl SceneSnapshot {
    pub fn capture(session_id: u64, editor: &FieldEditor, map: &MapAdapter) -> Self {
        Self {
            session_id,
            state: editor.state(),
            fields: editor.fields().map(FieldView::from).collect(),
            drawing: editor.drawing().map(DrawingView::from),
            active: editor
                .active_handle()
                .map(|(owner, handle)| ActiveHandle { owner, handle }),
            report: editor.report(),
            map: map.clone(),
            style: POLYGON_STYLE,
        }
    }
}

// ─── GeoJSON ─────────────────────────────────────────────────

/// Closed fields as a FeatureCollection of polygons with their measurements
/// as properties.
pub fn fields_feature_collection<'a>(
    fields: impl IntoIterator<Item = &'a Field>,
) -> FeatureCollection {
    let features = fields.into_iter().map(field_feature).collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn field_feature(field: &Field) -> Feature {
    let exterior: LineString<f64> = field
        .ring()
        .iter()
        .map(|&p| geo::Coord::from(p))
        .collect();
    let polygon = Polygon::new(exterior, vec![]);

    let metrics = field.metrics();
    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), field.id().to_string().into());
    properties.insert("area_hectares".to_string(), metrics.area_hectares.into());
    properties.insert(
        "perimeter_meters".to_string(),
        metrics.perimeter_meters.into(),
    );
    properties.insert(
        "edge_lengths".to_string(),
        metrics.edge_lengths.clone().into(),
    );
    properties.insert(
        "created_at".to_string(),
        field.created_at().to_rfc3339().into(),
    );

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&polygon))),
        id: Some(Id::Number(field.id().0.into())),
        properties: Some(properties),
        foreign_members: None,
    }
}
