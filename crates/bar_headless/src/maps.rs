//! Map data and its conversion to simulation parameters.
//!
//! A [`MapData`] describes a whole map: wind range, extractor spots with
//! positions, start positions, geothermal vents and reclaim. The simulation
//! only needs one player's share of it, which [`map_data_to_map_config`]
//! derives by assigning every extractor spot to its nearest start position.
//!
//! # Example RON
//!
//! ```ron
//! MapData(
//!     name: "Delta Siege Dry",
//!     wind_min: 5.0,
//!     wind_max: 20.0,
//!     max_metal: 2.0,
//!     start_positions: [(x: 1000.0, z: 1000.0, team_id: 0), (x: 7000.0, z: 7000.0, team_id: 1)],
//!     mex_spots: [(x: 1100.0, z: 900.0), (x: 6900.0, z: 7100.0)],
//! )
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use bar_core::build_order::MapConfig;

/// Extractor count used when a map lists no spots.
pub const FALLBACK_MEX_SPOTS: u32 = 6;

/// Errors that can occur when loading map data.
#[derive(Debug, Error)]
pub enum MapDataError {
    /// Map file not found.
    #[error("Map file not found: {0}")]
    FileNotFound(String),

    /// Map directory not found.
    #[error("Map directory not found: {0}")]
    DirectoryNotFound(String),

    /// Failed to read a map file.
    #[error("Failed to read map file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse a map file.
    #[error("Failed to parse map data: {0}")]
    ParseError(#[from] ron::error::SpannedError),
}

fn default_spot_metal() -> f64 {
    2.0
}

/// A metal extractor spot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MexSpot {
    /// X coordinate.
    pub x: f64,
    /// Z coordinate.
    pub z: f64,
    /// Metal per second of an extractor here.
    #[serde(default = "default_spot_metal")]
    pub metal: f64,
}

/// A geothermal vent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoVent {
    /// X coordinate.
    pub x: f64,
    /// Z coordinate.
    pub z: f64,
}

/// A team's start position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartPosition {
    /// X coordinate.
    pub x: f64,
    /// Z coordinate.
    pub z: f64,
    /// Team that starts here.
    #[serde(default)]
    pub team_id: u32,
}

impl StartPosition {
    fn distance_sq(&self, spot: &MexSpot) -> f64 {
        let dx = self.x - spot.x;
        let dz = self.z - spot.z;
        dx * dx + dz * dz
    }
}

/// Static data for one map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapData {
    /// Display name.
    pub name: String,
    /// Minimum wind speed.
    pub wind_min: f64,
    /// Maximum wind speed.
    pub wind_max: f64,
    /// Energy per tidal generator.
    pub tidal_strength: f64,
    /// Metal per second of a standard extractor.
    pub max_metal: f64,
    /// Start positions, in team order.
    pub start_positions: Vec<StartPosition>,
    /// Extractor spots.
    pub mex_spots: Vec<MexSpot>,
    /// Geothermal vents.
    pub geo_vents: Vec<GeoVent>,
    /// Reclaimable metal on the whole map.
    pub total_reclaim_metal: f64,
    /// Map author.
    pub author: String,
}

impl Default for MapData {
    fn default() -> Self {
        Self {
            name: String::new(),
            wind_min: 0.0,
            wind_max: 25.0,
            tidal_strength: 0.0,
            max_metal: 2.0,
            start_positions: Vec::new(),
            mex_spots: Vec::new(),
            geo_vents: Vec::new(),
            total_reclaim_metal: 0.0,
            author: String::new(),
        }
    }
}

impl MapData {
    /// Load map data from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MapDataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MapDataError::FileNotFound(path.display().to_string()));
        }
        let contents = fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Parse map data from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, MapDataError> {
        let data: Self = ron::from_str(ron)?;
        Ok(data)
    }
}

/// Extractor spots closer to `player_team`'s start than to any other start,
/// nearest first.
///
/// With no start positions every spot is returned in input order. If no
/// start belongs to `player_team` the first start stands in for it.
#[must_use]
pub fn assign_mex_spots<'a>(
    spots: &'a [MexSpot],
    starts: &[StartPosition],
    player_team: u32,
) -> Vec<&'a MexSpot> {
    let Some(first) = starts.first() else {
        return spots.iter().collect();
    };
    let player = starts
        .iter()
        .find(|s| s.team_id == player_team)
        .unwrap_or(first);

    let mut mine: Vec<&MexSpot> = spots
        .iter()
        .filter(|spot| {
            starts
                .iter()
                .min_by(|a, b| a.distance_sq(spot).total_cmp(&b.distance_sq(spot)))
                .is_some_and(|nearest| nearest.team_id == player.team_id)
        })
        .collect();
    mine.sort_by(|a, b| player.distance_sq(a).total_cmp(&player.distance_sq(b)));
    mine
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Derive one player's [`MapConfig`] from whole-map data.
///
/// Only the first `num_players` start positions take part in the spot
/// assignment. Without start positions the spots are split evenly; without
/// spots [`FALLBACK_MEX_SPOTS`] is used.
#[must_use]
pub fn map_data_to_map_config(data: &MapData, player_team: u32, num_players: u32) -> MapConfig {
    let players = num_players.max(1);
    let mex_spots = if !data.mex_spots.is_empty() && !data.start_positions.is_empty() {
        let active = &data.start_positions[..data.start_positions.len().min(players as usize)];
        assign_mex_spots(&data.mex_spots, active, player_team).len() as u32
    } else if !data.mex_spots.is_empty() {
        data.mex_spots.len() as u32 / players
    } else {
        FALLBACK_MEX_SPOTS
    };

    MapConfig {
        avg_wind: round_tenth((data.wind_min + data.wind_max) / 2.0),
        wind_variance: round_tenth((data.wind_max - data.wind_min) / 2.0),
        mex_value: data.max_metal,
        mex_spots,
        has_geo: !data.geo_vents.is_empty(),
        tidal_value: data.tidal_strength,
        reclaim_metal: data.total_reclaim_metal / f64::from(players),
    }
}

/// Named map presets loaded from a directory of RON files.
#[derive(Debug, Clone, Default)]
pub struct MapRegistry {
    maps: BTreeMap<String, MapData>,
}

impl MapRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register map data under `key`.
    pub fn insert(&mut self, key: &str, data: MapData) {
        self.maps.insert(normalize(key), data);
    }

    /// Load one map file, keyed by its file stem.
    pub fn load_file(&mut self, path: &Path) -> Result<String, MapDataError> {
        let data = MapData::load(path)?;
        let key = path
            .file_stem()
            .map_or_else(|| data.name.clone(), |s| s.to_string_lossy().into_owned());
        self.insert(&key, data);
        Ok(normalize(&key))
    }

    /// Load every `.ron` file in `dir`. Files that fail to parse are
    /// skipped with a warning.
    pub fn load_from_directory(&mut self, dir: &Path) -> Result<Vec<String>, MapDataError> {
        if !dir.is_dir() {
            return Err(MapDataError::DirectoryNotFound(dir.display().to_string()));
        }

        let mut paths: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|e| e == "ron"))
            .collect();
        paths.sort();

        let mut loaded = Vec::new();
        for path in paths {
            match self.load_file(&path) {
                Ok(key) => loaded.push(key),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping map file"),
            }
        }
        debug!(count = loaded.len(), dir = %dir.display(), "Loaded map presets");
        Ok(loaded)
    }

    /// Look up a map by key or display name, ignoring case, spaces and dashes.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MapData> {
        let key = normalize(name);
        self.maps
            .get(&key)
            .or_else(|| self.maps.values().find(|m| normalize(&m.name) == key))
    }

    /// The [`MapConfig`] for a named map in a two-player game.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<MapConfig> {
        self.get(name).map(|data| map_data_to_map_config(data, 0, 2))
    }

    /// Registered keys, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.maps.keys().map(String::as_str)
    }

    /// Number of registered maps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    /// Returns true if no maps are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

/// Find the map preset directory.
///
/// `BAR_MAPS_DIR` wins if it points at an existing directory; otherwise the
/// usual locations relative to the working directory are tried.
#[must_use]
pub fn default_maps_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("BAR_MAPS_DIR") {
        let path = PathBuf::from(dir);
        if path.is_dir() {
            return Some(path);
        }
    }

    let candidates = ["data/maps", "crates/bar_headless/data/maps", "../bar_headless/data/maps"];
    candidates
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_dir())
}

fn normalize(name: &str) -> String {
    name.trim()
        .to_ascii_lowercase()
        .replace([' ', '-'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spot(x: f64, z: f64) -> MexSpot {
        MexSpot { x, z, metal: 2.0 }
    }

    fn start(x: f64, z: f64, team_id: u32) -> StartPosition {
        StartPosition { x, z, team_id }
    }

    fn two_player_map() -> MapData {
        MapData {
            name: "Test Map".into(),
            wind_min: 4.0,
            wind_max: 17.0,
            max_metal: 1.8,
            start_positions: vec![start(0.0, 0.0, 0), start(100.0, 0.0, 1), start(50.0, 90.0, 2)],
            mex_spots: vec![
                spot(10.0, 0.0),
                spot(5.0, 5.0),
                spot(90.0, 0.0),
                spot(45.0, 0.0),
                spot(60.0, 0.0),
                spot(40.0, 60.0),
            ],
            total_reclaim_metal: 1000.0,
            ..MapData::default()
        }
    }

    #[test]
    fn test_voronoi_assignment_sorted_by_distance() {
        let map = two_player_map();
        let mine = assign_mex_spots(&map.mex_spots, &map.start_positions[..2], 0);
        let xs: Vec<f64> = mine.iter().map(|s| s.x).collect();
        assert_eq!(xs, vec![5.0, 10.0, 45.0, 40.0]);
    }

    #[test]
    fn test_conversion_uses_active_players_only() {
        let config = map_data_to_map_config(&two_player_map(), 0, 2);
        assert_eq!(config.mex_spots, 4);
        assert_eq!(config.avg_wind, 10.5);
        assert_eq!(config.wind_variance, 6.5);
        assert_eq!(config.mex_value, 1.8);
        assert_eq!(config.reclaim_metal, 500.0);
        assert!(!config.has_geo);

        let three = map_data_to_map_config(&two_player_map(), 0, 3);
        assert_eq!(three.mex_spots, 3);
    }

    #[test]
    fn test_conversion_fallbacks() {
        let mut map = two_player_map();
        map.start_positions.clear();
        assert_eq!(map_data_to_map_config(&map, 0, 2).mex_spots, 3);

        map.mex_spots.clear();
        map.geo_vents.push(GeoVent { x: 1.0, z: 1.0 });
        let config = map_data_to_map_config(&map, 0, 0);
        assert_eq!(config.mex_spots, FALLBACK_MEX_SPOTS);
        assert!(config.has_geo);
    }

    #[test]
    fn test_unknown_team_uses_first_start() {
        let map = two_player_map();
        let mine = assign_mex_spots(&map.mex_spots, &map.start_positions[..2], 7);
        assert_eq!(mine.len(), 4);
    }

    #[test]
    fn test_registry_lookup_normalizes_names() {
        let mut registry = MapRegistry::new();
        registry.insert("delta_siege", two_player_map());
        assert!(registry.get("Delta-Siege").is_some());
        assert!(registry.get("test map").is_some());
        assert!(registry.get("nowhere").is_none());
        assert_eq!(registry.resolve("delta siege").map(|c| c.mex_spots), Some(4));
    }

    #[test]
    fn test_parse_with_defaults() {
        let data = MapData::from_ron_str(
            r#"(name: "Tiny", mex_spots: [(x: 1.0, z: 2.0)], geo_vents: [(x: 0.0, z: 0.0)])"#,
        )
        .unwrap();
        assert_eq!(data.wind_max, 25.0);
        assert_eq!(data.mex_spots[0].metal, 2.0);
        assert_eq!(data.geo_vents.len(), 1);
    }
}
