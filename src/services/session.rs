// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory editor sessions for the HTTP host.
//!
//! Each browser tab gets one [`EditorSession`]: a field editor plus the map
//! adapter that translates its pointer events. Sessions are never persisted.

use crate::models::{LatLng, MapType};
use crate::services::editor::{EditorOptions, FieldEditor, Propagation};
use crate::services::scene::SceneSnapshot;
use crate::services::viewport::{
    LocationOutcome, MapAdapter, PointerEvent, Viewport, ViewportCommand,
};
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Viewport size assumed until the front end reports its own.
pub const DEFAULT_VIEWPORT_WIDTH: f64 = 1280.0;
pub const DEFAULT_VIEWPORT_HEIGHT: f64 = 800.0;

/// Starting state for new sessions.
#[derive(Debug, Clone, Copy)]
pub struct SessionDefaults {
    pub center: LatLng,
    pub zoom: u8,
    pub map_type: MapType,
    pub options: EditorOptions,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session limit of {0} reached")]
    LimitReached(usize),
}

#[derive(Debug)]
pub struct EditorSession {
    id: u64,
    editor: FieldEditor,
    map: MapAdapter,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EditorSession {
    pub fn new(id: u64, defaults: &SessionDefaults) -> Self {
        let mut editor = FieldEditor::new(defaults.options);
        editor.subscribe(Box::new(move |report| {
            tracing::info!(
                session_id = id,
                total_hectares = report.total_hectares,
                fields = report.fields.len(),
                "Area updated"
            );
        }));
        let viewport = Viewport::new(
            defaults.center,
            defaults.zoom,
            DEFAULT_VIEWPORT_WIDTH,
            DEFAULT_VIEWPORT_HEIGHT,
        );
        let now = Utc::now();
        Self {
            id,
            editor,
            map: MapAdapter::new(viewport, defaults.map_type),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn editor(&self) -> &FieldEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut FieldEditor {
        self.touch();
        &mut self.editor
    }

    pub fn map(&self) -> &MapAdapter {
        &self.map
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Feed one raw pointer event through the map adapter into the editor.
    pub fn dispatch(&mut self, event: PointerEvent) -> Propagation {
        self.touch();
        let Some(event) = self.map.translate(event) else {
            return Propagation::Continue;
        };
        let propagation = self.editor.handle(event);
        self.redraw();
        propagation
    }

    /// Apply a viewport command, re-projecting overlays when it moved the map.
    pub fn apply_viewport(&mut self, command: ViewportCommand) -> bool {
        self.touch();
        let moved = self.map.apply(command);
        if moved {
            self.redraw();
        }
        moved
    }

    pub fn begin_locate(&mut self) {
        self.touch();
        self.map.begin_locate();
    }

    pub fn finish_locate(&mut self, outcome: LocationOutcome) -> bool {
        self.touch();
        let moved = self.map.finish_locate(outcome);
        if moved {
            self.redraw();
        }
        moved
    }

    /// Re-project every attached handle and label.
    pub fn redraw(&mut self) {
        self.editor.draw(self.map.viewport());
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot::capture(self.id, &self.editor, &self.map)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Concurrent map of live sessions.
///
/// `live` counts reserved slots, so the limit holds under concurrent creates
/// even though the map itself has no global lock.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<u64, EditorSession>,
    next_id: AtomicU64,
    live: AtomicUsize,
    max_sessions: usize,
    idle_ttl: TimeDelta,
    defaults: SessionDefaults,
}

impl SessionStore {
    pub fn new(defaults: SessionDefaults, max_sessions: usize, idle_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
            live: AtomicUsize::new(0),
            max_sessions,
            idle_ttl: TimeDelta::from_std(idle_ttl).unwrap_or(TimeDelta::MAX),
            defaults,
        }
    }

    pub fn defaults(&self) -> &SessionDefaults {
        &self.defaults
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Create a session and return its first snapshot. Idle sessions are
    /// evicted first so abandoned tabs do not hold slots forever.
    pub fn create(&self) -> Result<SceneSnapshot, SessionError> {
        self.evict_idle();
        self.reserve_slot()?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut session = EditorSession::new(id, &self.defaults);
        session.redraw();
        let snapshot = session.snapshot();
        self.sessions.insert(id, session);
        tracing::info!(session_id = id, sessions = self.sessions.len(), "Session created");
        Ok(snapshot)
    }

    /// Drop every session not touched within the idle TTL. Returns how many
    /// were removed.
    pub fn evict_idle(&self) -> usize {
        let cutoff = Utc::now() - self.idle_ttl;
        let mut evicted = 0;
        self.sessions.retain(|&id, session| {
            let keep = session.updated_at() > cutoff;
            if !keep {
                tracing::info!(
                    session_id = id,
                    updated_at = %session.updated_at(),
                    "Evicting idle session"
                );
                evicted += 1;
            }
            keep
        });
        if evicted > 0 {
            self.live.fetch_sub(evicted, Ordering::AcqRel);
            tracing::info!(evicted, sessions = self.sessions.len(), "Idle sessions evicted");
        }
        evicted
    }

    fn reserve_slot(&self) -> Result<(), SessionError> {
        self.live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                (live < self.max_sessions).then_some(live + 1)
            })
            .map(|_| ())
            .map_err(|_| {
                tracing::warn!(max_sessions = self.max_sessions, "Session limit reached");
                SessionError::LimitReached(self.max_sessions)
            })
    }

    /// Run `f` with exclusive access to one session.
    pub fn with_session<R>(&self, id: u64, f: impl FnOnce(&mut EditorSession) -> R) -> Option<R> {
        self.sessions.get_mut(&id).map(|mut session| f(&mut session))
    }

    pub fn snapshot(&self, id: u64) -> Option<SceneSnapshot> {
        self.sessions.get(&id).map(|session| session.snapshot())
    }

    pub fn remove(&self, id: u64) -> bool {
        let removed = self.sessions.remove(&id).is_some();
        if removed {
            self.live.fetch_sub(1, Ordering::AcqRel);
            tracing::info!(session_id = id, "Session removed");
        }
        removed
    }
}
