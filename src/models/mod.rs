// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the editor.

pub mod field;
pub mod map;
pub mod point;

pub use field::{Field, FieldId, FieldMetrics, FieldMode};
pub use map::MapType;
pub use point::{LatLng, ScreenPoint};
