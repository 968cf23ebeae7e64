// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Basemap settings passed through to the map surface.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Basemap imagery type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum MapType {
    #[default]
    Hybrid,
    Satellite,
    Roadmap,
    Terrain,
}

impl MapType {
    /// Next type in the toggle cycle (hybrid, satellite, roadmap, terrain).
    pub fn next(self) -> Self {
        match self {
            MapType::Hybrid => MapType::Satellite,
            MapType::Satellite => MapType::Roadmap,
            MapType::Roadmap => MapType::Terrain,
            MapType::Terrain => MapType::Hybrid,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MapType::Hybrid => "hybrid",
            MapType::Satellite => "satellite",
            MapType::Roadmap => "roadmap",
            MapType::Terrain => "terrain",
        }
    }
}

impl FromStr for MapType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hybrid" => Ok(MapType::Hybrid),
            "satellite" => Ok(MapType::Satellite),
            "roadmap" => Ok(MapType::Roadmap),
            "terrain" => Ok(MapType::Terrain),
            other => Err(format!("unknown map type '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_returns_to_start() {
        let mut t = MapType::Hybrid;
        let mut seen = vec![];
        for _ in 0..4 {
            t = t.next();
            seen.push(t);
        }
        assert_eq!(
            seen,
            vec![
                MapType::Satellite,
                MapType::Roadmap,
                MapType::Terrain,
                MapType::Hybrid
            ]
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!("Roadmap".parse::<MapType>(), Ok(MapType::Roadmap));
        assert!("mars".parse::<MapType>().is_err());
    }
}
