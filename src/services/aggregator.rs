// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Area/perimeter aggregation across all fields.
//!
//! Reports are recomputed from scratch on every change; field counts and
//! vertex counts are small enough that nothing is cached.

use crate::models::{Field, FieldId};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Callback invoked with the new report whenever the total area changes.
pub type AreaListener = Box<dyn Fn(&AreaReport) + Send + Sync>;

/// Measurements of one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FieldReport {
    pub id: FieldId,
    pub area_hectares: f64,
    pub perimeter_meters: f64,
    pub edge_lengths: Vec<f64>,
}

/// Aggregate measurements reported to the hosting application.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AreaReport {
    pub total_hectares: f64,
    pub fields: Vec<FieldReport>,
}

impl AreaReport {
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = &'a Field>) -> Self {
        let fields: Vec<FieldReport> = fields
            .into_iter()
            .map(|field| {
                let metrics = field.metrics();
                FieldReport {
                    id: field.id(),
                    area_hectares: metrics.area_hectares,
                    perimeter_meters: metrics.perimeter_meters,
                    edge_lengths: metrics.edge_lengths.clone(),
                }
            })
            .collect();
        Self {
            total_hectares: fields.iter().map(|f| f.area_hectares).sum(),
            fields,
        }
    }
}

#[derive(Default)]
pub struct AreaAggregator {
    listeners: Vec<AreaListener>,
    last_total: f64,
}

impl AreaAggregator {
    pub fn subscribe(&mut self, listener: AreaListener) {
        self.listeners.push(listener);
    }

    pub fn last_total(&self) -> f64 {
        self.last_total
    }

    /// Rebuild the report and notify listeners if the total area moved.
    pub fn refresh<'a>(&mut self, fields: impl IntoIterator<Item = &'a Field>) -> AreaReport {
        let report = AreaReport::from_fields(fields);
        if report.total_hectares != self.last_total {
            self.last_total = report.total_hectares;
            tracing::debug!(
                total_hectares = report.total_hectares,
                fields = report.fields.len(),
                "Total area changed"
            );
            for listener in &self.listeners {
                listener(&report);
            }
        }
        report
    }
}

impl std::fmt::Debug for AreaAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AreaAggregator")
            .field("listeners", &self.listeners.len())
            .field("last_total", &self.last_total)
            .finish()
    }
}
