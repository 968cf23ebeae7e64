// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Editor session API.
//!
//! Every mutating endpoint returns the session's new scene so the front end
//! can re-render without a second round trip.

use crate::error::{AppError, Result};
use crate::models::{FieldId, LatLng};
use crate::services::editor::Propagation;
use crate::services::scene::{fields_feature_collection, SceneSnapshot};
use crate::services::session::EditorSession;
use crate::services::viewport::{LocationOutcome, PointerEvent, ViewportCommand};
use crate::AppState;
use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Media type for GeoJSON documents (RFC 7946).
const GEOJSON_CONTENT_TYPE: &str = "application/geo+json";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/sessions/{id}/fields.geojson", get(get_fields_geojson))
        .route("/api/sessions/{id}/events", post(post_event))
        .route("/api/sessions/{id}/fields/new", post(new_field))
        .route("/api/sessions/{id}/drawing/finish", post(finish_drawing))
        .route("/api/sessions/{id}/drawing/cancel", post(cancel_drawing))
        .route("/api/sessions/{id}/fields/{field_id}", delete(delete_field))
        .route(
            "/api/sessions/{id}/fields/{field_id}/edit-mode",
            put(set_edit_mode),
        )
        .route(
            "/api/sessions/{id}/fields/{field_id}/edges/{edge}",
            put(set_edge_length),
        )
        .route("/api/sessions/{id}/viewport", post(viewport_command))
        .route("/api/sessions/{id}/location/request", post(request_location))
        .route("/api/sessions/{id}/location", post(report_location))
}

/// Run `f` against one session, mapping a missing session to 404.
fn with_session<R>(
    state: &AppState,
    id: u64,
    f: impl FnOnce(&mut EditorSession) -> Result<R>,
) -> Result<R> {
    state
        .sessions
        .with_session(id, f)
        .unwrap_or_else(|| Err(AppError::session_not_found(id)))
}

// ─── Sessions ────────────────────────────────────────────────

async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SceneSnapshot>)> {
    let snapshot = state.sessions.create()?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<SceneSnapshot>> {
    state
        .sessions
        .snapshot(id)
        .map(Json)
        .ok_or_else(|| AppError::session_not_found(id))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<StatusCode> {
    if state.sessions.remove(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::session_not_found(id))
    }
}

/// Closed fields as a GeoJSON FeatureCollection.
async fn get_fields_geojson(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse> {
    let collection = with_session(&state, id, |session| {
        Ok(fields_feature_collection(session.editor().fields()))
    })?;
    let body = serde_json::to_string(&collection).context("Failed to serialize fields")?;
    Ok(([(header::CONTENT_TYPE, GEOJSON_CONTENT_TYPE)], body))
}

// ─── Pointer Events ──────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EventResponse {
    /// Whether the map surface should still apply its default handling.
    pub propagation: Propagation,
    pub scene: SceneSnapshot,
}

async fn post_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(event): Json<PointerEvent>,
) -> Result<Json<EventResponse>> {
    event.validate()?;
    if !(event.x.is_finite() && event.y.is_finite()) {
        return Err(AppError::BadRequest("Pointer position must be finite".into()));
    }
    with_session(&state, id, |session| {
        let propagation = session.dispatch(event);
        Ok(Json(EventResponse {
            propagation,
            scene: session.snapshot(),
        }))
    })
}

// ─── Field Commands ──────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NewFieldResponse {
    /// Field closed automatically because the previous drawing was long enough.
    pub closed_field: Option<FieldId>,
    pub scene: SceneSnapshot,
}

async fn new_field(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<NewFieldResponse>> {
    with_session(&state, id, |session| {
        let closed_field = session.editor_mut().start_drawing_new_field();
        session.redraw();
        Ok(Json(NewFieldResponse {
            closed_field,
            scene: session.snapshot(),
        }))
    })
}

async fn finish_drawing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<NewFieldResponse>> {
    with_session(&state, id, |session| {
        let closed_field = session.editor_mut().finish_drawing();
        if closed_field.is_none() {
            return Err(AppError::BadRequest(
                "A field needs at least 3 points to close".into(),
            ));
        }
        session.redraw();
        Ok(Json(NewFieldResponse {
            closed_field,
            scene: session.snapshot(),
        }))
    })
}

async fn cancel_drawing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<SceneSnapshot>> {
    with_session(&state, id, |session| {
        if !session.editor_mut().cancel_drawing() {
            tracing::debug!(session_id = id, "No drawing to cancel");
        }
        Ok(Json(session.snapshot()))
    })
}

#[derive(Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EditModeRequest {
    pub enabled: bool,
}

async fn set_edit_mode(
    State(state): State<Arc<AppState>>,
    Path((id, field_id)): Path<(u64, u64)>,
    Json(request): Json<EditModeRequest>,
) -> Result<Json<SceneSnapshot>> {
    with_session(&state, id, |session| {
        session
            .editor_mut()
            .set_edit_mode(FieldId(field_id), request.enabled)?;
        session.redraw();
        Ok(Json(session.snapshot()))
    })
}

#[derive(Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EdgeLengthRequest {
    #[validate(range(exclusive_min = 0.0, max = 1.0e7))]
    pub meters: f64,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EdgeLengthResponse {
    /// New position of the edge's far endpoint.
    pub moved_to: LatLng,
    pub scene: SceneSnapshot,
}

async fn set_edge_length(
    State(state): State<Arc<AppState>>,
    Path((id, field_id, edge)): Path<(u64, u64, usize)>,
    Json(request): Json<EdgeLengthRequest>,
) -> Result<Json<EdgeLengthResponse>> {
    request.validate()?;
    with_session(&state, id, |session| {
        let moved_to =
            session
                .editor_mut()
                .set_field_edge_length(FieldId(field_id), edge, request.meters)?;
        session.redraw();
        Ok(Json(EdgeLengthResponse {
            moved_to,
            scene: session.snapshot(),
        }))
    })
}

async fn delete_field(
    State(state): State<Arc<AppState>>,
    Path((id, field_id)): Path<(u64, u64)>,
) -> Result<Json<SceneSnapshot>> {
    with_session(&state, id, |session| {
        session.editor_mut().remove_field(FieldId(field_id))?;
        Ok(Json(session.snapshot()))
    })
}

// ─── Map Chrome ──────────────────────────────────────────────

fn require_valid(lat: f64, lng: f64) -> Result<()> {
    if LatLng::new(lat, lng).is_valid() {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "Coordinate out of range: {lat}, {lng}"
        )))
    }
}

async fn viewport_command(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(command): Json<ViewportCommand>,
) -> Result<Json<SceneSnapshot>> {
    match command {
        ViewportCommand::PanTo { lat, lng } | ViewportCommand::FocusPlace { lat, lng } => {
            require_valid(lat, lng)?
        }
        ViewportCommand::Resize { width, height } => {
            if !(width > 0.0 && height > 0.0) {
                return Err(AppError::BadRequest(
                    "Viewport size must be positive".into(),
                ));
            }
        }
        _ => {}
    }
    with_session(&state, id, |session| {
        session.apply_viewport(command);
        Ok(Json(session.snapshot()))
    })
}

async fn request_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<SceneSnapshot>> {
    with_session(&state, id, |session| {
        session.begin_locate();
        Ok(Json(session.snapshot()))
    })
}

async fn report_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(outcome): Json<LocationOutcome>,
) -> Result<Json<SceneSnapshot>> {
    if let LocationOutcome::Found { lat, lng } = outcome {
        require_valid(lat, lng)?;
    }
    with_session(&state, id, |session| {
        session.finish_locate(outcome);
        Ok(Json(session.snapshot()))
    })
}
