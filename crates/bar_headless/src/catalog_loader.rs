//! Unit catalog loading with an explicit per-faction cache.
//!
//! Catalog files are RON documents named after the faction key
//! (`armada.ron`, `cortex.ron`) inside a data directory. A faction without
//! a file gets the built-in table.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use bar_core::catalog::{UnitCatalog, UnitSpec};
use bar_core::error::SimError;
use bar_core::factions::Faction;

/// Errors that can occur when loading a unit catalog.
#[derive(Debug, Error)]
pub enum CatalogLoadError {
    /// Catalog file not found.
    #[error("Catalog file not found: {0}")]
    FileNotFound(String),

    /// Failed to read a catalog file.
    #[error("Failed to read catalog file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse a catalog file.
    #[error("Failed to parse catalog: {0}")]
    ParseError(#[from] ron::error::SpannedError),

    /// A unit entry failed validation.
    #[error("Invalid catalog entry: {0}")]
    Invalid(#[from] SimError),

    /// The file lists no units.
    #[error("Catalog {0} has no units")]
    Empty(String),
}

/// On-disk catalog layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDocument {
    /// Faction the units belong to.
    #[serde(default)]
    pub faction: Faction,
    /// Unit specs.
    pub units: Vec<UnitSpec>,
}

/// Parse a catalog from a RON string.
pub fn catalog_from_ron_str(ron: &str) -> Result<UnitCatalog, CatalogLoadError> {
    let doc: CatalogDocument = ron::from_str(ron)?;
    let catalog = UnitCatalog::from_units(doc.faction, doc.units)?;
    Ok(catalog)
}

/// Load a catalog file. Empty catalogs are rejected here so the failure
/// surfaces at load time rather than when a simulation starts.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<UnitCatalog, CatalogLoadError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CatalogLoadError::FileNotFound(path.display().to_string()));
    }
    let contents = fs::read_to_string(path)?;
    let catalog = catalog_from_ron_str(&contents)?;
    if catalog.is_empty() {
        return Err(CatalogLoadError::Empty(path.display().to_string()));
    }
    debug!(path = %path.display(), units = catalog.len(), "Loaded unit catalog");
    Ok(catalog)
}

/// Loaded catalogs keyed by faction.
///
/// Runs hold their own `Arc`, so switching or invalidating never affects a
/// simulation already in progress.
#[derive(Debug, Default)]
pub struct CatalogCache {
    data_dir: Option<PathBuf>,
    catalogs: BTreeMap<Faction, Arc<UnitCatalog>>,
    active: Faction,
}

impl CatalogCache {
    /// A cache serving the built-in tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache that prefers `<dir>/<faction>.ron` over the built-in table.
    #[must_use]
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    /// Faction served by [`CatalogCache::active`].
    #[must_use]
    pub fn active_faction(&self) -> Faction {
        self.active
    }

    /// Catalog for `faction`, loading it on first use.
    pub fn get(&mut self, faction: Faction) -> Result<Arc<UnitCatalog>, CatalogLoadError> {
        if let Some(catalog) = self.catalogs.get(&faction) {
            return Ok(Arc::clone(catalog));
        }

        let file = self
            .data_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.ron", faction.key())))
            .filter(|p| p.exists());
        let catalog = match file {
            Some(path) => load_catalog(&path)?,
            None => UnitCatalog::standard_for(faction),
        };

        let catalog = Arc::new(catalog);
        self.catalogs.insert(faction, Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Catalog for the active faction.
    pub fn active(&mut self) -> Result<Arc<UnitCatalog>, CatalogLoadError> {
        self.get(self.active)
    }

    /// Make `faction` active and return its catalog.
    pub fn switch_faction(&mut self, faction: Faction) -> Result<Arc<UnitCatalog>, CatalogLoadError> {
        if faction != self.active {
            info!(from = %self.active, to = %faction, "Switching faction");
        }
        self.active = faction;
        self.get(faction)
    }

    /// Whether `faction` is already loaded.
    #[must_use]
    pub fn is_cached(&self, faction: Faction) -> bool {
        self.catalogs.contains_key(&faction)
    }

    /// Drop every cached catalog; the next access reloads.
    pub fn invalidate(&mut self) {
        self.catalogs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY: &str = r#"(
        faction: Cortex,
        units: [
            (id: "commander", name: "Commander", metal_cost: 0.0, energy_cost: 0.0, build_time: 1.0, build_power: 300.0),
            (id: "mex", name: "Metal Extractor", metal_cost: 50.0, energy_cost: 500.0, build_time: 1800.0, energy_upkeep: 3.0),
        ],
    )"#;

    #[test]
    fn test_parse_catalog() {
        let catalog = catalog_from_ron_str(TINY).unwrap();
        assert_eq!(catalog.faction, Faction::Cortex);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.metal_cost("mex"), 50.0);
    }

    #[test]
    fn test_negative_cost_rejected() {
        let bad = r#"(units: [(id: "x", name: "X", metal_cost: -1.0, energy_cost: 0.0, build_time: 1.0)])"#;
        assert!(matches!(catalog_from_ron_str(bad), Err(CatalogLoadError::Invalid(_))));
    }

    #[test]
    fn test_cache_shares_arcs_until_invalidated() {
        let mut cache = CatalogCache::new();
        let a = cache.active().unwrap();
        let b = cache.get(Faction::Armada).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(cache.is_cached(Faction::Armada));

        let cortex = cache.switch_faction(Faction::Cortex).unwrap();
        assert_eq!(cortex.faction, Faction::Cortex);
        assert_eq!(cache.active_faction(), Faction::Cortex);

        cache.invalidate();
        assert!(!cache.is_cached(Faction::Armada));
        let c = cache.get(Faction::Armada).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(*a, *c);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_catalog("/nonexistent/armada.ron"),
            Err(CatalogLoadError::FileNotFound(_))
        ));
    }
}
