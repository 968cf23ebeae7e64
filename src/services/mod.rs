// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - editor logic layer.

pub mod aggregator;
pub mod editor;
pub mod geometry;
pub mod label;
pub mod overlay;
pub mod scene;
pub mod session;
pub mod viewport;

pub use aggregator::{AreaAggregator, AreaReport};
pub use editor::{EditorError, EditorEvent, EditorOptions, FieldEditor, PointerTarget};
pub use overlay::{HandleRef, RingOverlay, RingOwner};
pub use scene::SceneSnapshot;
pub use session::{SessionDefaults, SessionStore};
pub use viewport::{MapAdapter, Projection, Viewport};
