// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Field Mapper: draw and edit field boundaries on a map
//!
//! This crate provides the polygon editor (drawing, vertex and edge
//! handles, editable distance labels, area totals) and a small HTTP API
//! that lets a browser map front end drive it.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use services::SessionStore;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let sessions = SessionStore::new(
            config.session_defaults(),
            config.max_sessions,
            config.session_idle_ttl,
        );
        Self { config, sessions }
    }
}
