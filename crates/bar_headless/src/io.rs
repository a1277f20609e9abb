//! Build-order files.
//!
//! On disk a build order is a RON document whose queues are plain lists of
//! unit keys. The action kind of each entry follows from the queue it sits
//! in: factory queues produce units, the commander and constructor queues
//! place structures. Two keys are reserved: `assist` and `reclaim`. A
//! `*N` suffix repeats an entry, e.g. `"grunt*3"`.
//!
//! ```ron
//! (
//!     name: "Standard Bot Opening",
//!     map: (avg_wind: 12.0, mex_spots: 6),
//!     commander_queue: ["mex", "mex", "wind*2", "bot_lab"],
//!     factory_queues: { "factory_0": ["tick", "grunt*3", "con_bot"] },
//!     constructor_queues: { "con_1": ["mex", "wind", "nano"] },
//! )
//! ```
//!
//! A `map_name` is resolved against a [`MapRegistry`] when one is given;
//! otherwise the inline `map` block is used.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use bar_core::build_order::{ActionKind, BuildAction, BuildOrder, MapConfig};
use bar_core::result::SimResult;
use bar_core::strategy::StrategyConfig;

use crate::maps::MapRegistry;

/// Reserved key for an assist entry.
pub const ASSIST_KEY: &str = "assist";
/// Reserved key for a reclaim entry.
pub const RECLAIM_KEY: &str = "reclaim";

/// Errors that can occur when reading or writing build-order files.
#[derive(Debug, Error)]
pub enum BuildOrderIoError {
    /// Build-order file not found.
    #[error("Build order file not found: {0}")]
    FileNotFound(String),

    /// Failed to read or write a file.
    #[error("Failed to access build order file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse a RON document.
    #[error("Failed to parse build order: {0}")]
    ParseError(#[from] ron::error::SpannedError),

    /// Failed to render a RON document.
    #[error("Failed to serialize build order: {0}")]
    SerializeError(#[from] ron::Error),

    /// Failed to render JSON.
    #[error("Failed to export JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A queue entry is malformed.
    #[error("Invalid queue entry '{0}'")]
    InvalidEntry(String),
}

/// The on-disk shape of a build order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOrderDocument {
    /// Name; the file stem is used when empty.
    pub name: String,
    /// Description.
    pub description: String,
    /// Named map to resolve.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_name: Option<String>,
    /// Inline map parameters.
    pub map: MapConfig,
    /// Commander queue.
    pub commander_queue: Vec<String>,
    /// Factory queues by builder id.
    pub factory_queues: BTreeMap<String, Vec<String>>,
    /// Constructor queues by builder id.
    pub constructor_queues: BTreeMap<String, Vec<String>>,
    /// Strategy block; enables strategy mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyConfig>,
}

/// Parse one queue entry, inferring its kind from the queue's default.
///
/// Entries carry only a unit key and repeat count, so the kind is never
/// read from the file: `assist` and `reclaim` map to their own kinds and
/// everything else takes `default_kind`. An action whose kind differs from
/// its queue's default (a structure in a factory queue, say) comes back
/// with the queue's kind after a save and load.
pub fn parse_entry(entry: &str, default_kind: ActionKind) -> Result<BuildAction, BuildOrderIoError> {
    let invalid = || BuildOrderIoError::InvalidEntry(entry.to_string());
    let (unit, repeat) = match entry.split_once('*') {
        Some((unit, count)) => {
            let count: u32 = count.trim().parse().map_err(|_| invalid())?;
            if count == 0 {
                return Err(invalid());
            }
            (unit.trim(), count)
        }
        None => (entry.trim(), 1),
    };
    if unit.is_empty() {
        return Err(invalid());
    }

    let kind = match unit {
        ASSIST_KEY => ActionKind::Assist,
        RECLAIM_KEY => ActionKind::Reclaim,
        _ => default_kind,
    };
    Ok(BuildAction::new(unit, kind).times(repeat))
}

/// Render one action as a queue entry.
#[must_use]
pub fn format_entry(action: &BuildAction) -> String {
    if action.repeat > 1 {
        format!("{}*{}", action.unit, action.repeat)
    } else {
        action.unit.clone()
    }
}

fn parse_queue(
    entries: &[String],
    kind: ActionKind,
) -> Result<Vec<BuildAction>, BuildOrderIoError> {
    entries.iter().map(|e| parse_entry(e, kind)).collect()
}

fn parse_queues(
    queues: &BTreeMap<String, Vec<String>>,
    kind: ActionKind,
) -> Result<BTreeMap<String, Vec<BuildAction>>, BuildOrderIoError> {
    queues
        .iter()
        .map(|(id, entries)| Ok((id.clone(), parse_queue(entries, kind)?)))
        .collect()
}

fn format_queues(queues: &BTreeMap<String, Vec<BuildAction>>) -> BTreeMap<String, Vec<String>> {
    queues
        .iter()
        .map(|(id, q)| (id.clone(), q.iter().map(format_entry).collect()))
        .collect()
}

impl BuildOrderDocument {
    /// Convert into a [`BuildOrder`], resolving `map_name` if possible.
    pub fn into_build_order(
        self,
        maps: Option<&MapRegistry>,
    ) -> Result<BuildOrder, BuildOrderIoError> {
        let map = match (&self.map_name, maps) {
            (Some(name), Some(registry)) => match registry.resolve(name) {
                Some(config) => {
                    debug!(map = %name, "Resolved map from registry");
                    config
                }
                None => {
                    warn!(map = %name, "Unknown map, using inline parameters");
                    self.map.clone()
                }
            },
            _ => self.map.clone(),
        };

        Ok(BuildOrder {
            commander_queue: parse_queue(&self.commander_queue, ActionKind::BuildStructure)?,
            factory_queues: parse_queues(&self.factory_queues, ActionKind::ProduceUnit)?,
            constructor_queues: parse_queues(&self.constructor_queues, ActionKind::BuildStructure)?,
            name: self.name,
            description: self.description,
            map,
            map_name: self.map_name,
            strategy: self.strategy,
        })
    }

    /// The document for a [`BuildOrder`].
    #[must_use]
    pub fn from_build_order(order: &BuildOrder) -> Self {
        Self {
            name: order.name.clone(),
            description: order.description.clone(),
            map_name: order.map_name.clone(),
            map: order.map.clone(),
            commander_queue: order.commander_queue.iter().map(format_entry).collect(),
            factory_queues: format_queues(&order.factory_queues),
            constructor_queues: format_queues(&order.constructor_queues),
            strategy: order.strategy.clone(),
        }
    }
}

/// Parse a build order from a RON string.
pub fn build_order_from_ron_str(
    ron: &str,
    maps: Option<&MapRegistry>,
) -> Result<BuildOrder, BuildOrderIoError> {
    let doc: BuildOrderDocument = ron::from_str(ron)?;
    doc.into_build_order(maps)
}

/// Load a build order from a RON file.
pub fn load_build_order<P: AsRef<Path>>(
    path: P,
    maps: Option<&MapRegistry>,
) -> Result<BuildOrder, BuildOrderIoError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(BuildOrderIoError::FileNotFound(path.display().to_string()));
    }
    let contents = fs::read_to_string(path)?;
    let mut order = build_order_from_ron_str(&contents, maps)?;
    if order.name.is_empty() {
        order.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    debug!(name = %order.name, actions = order.len(), "Loaded build order");
    Ok(order)
}

/// Render a build order as a RON document.
pub fn build_order_to_ron_string(order: &BuildOrder) -> Result<String, BuildOrderIoError> {
    let doc = BuildOrderDocument::from_build_order(order);
    Ok(ron::ser::to_string_pretty(
        &doc,
        ron::ser::PrettyConfig::default(),
    )?)
}

fn write_creating_parent(path: &Path, contents: &str) -> Result<(), BuildOrderIoError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

/// Save a build order as a RON file, creating parent directories.
pub fn save_build_order<P: AsRef<Path>>(order: &BuildOrder, path: P) -> Result<(), BuildOrderIoError> {
    let ron = build_order_to_ron_string(order)?;
    write_creating_parent(path.as_ref(), &ron)
}

/// Export a build order as pretty JSON for external tooling.
pub fn export_build_order_json<P: AsRef<Path>>(
    order: &BuildOrder,
    path: P,
) -> Result<(), BuildOrderIoError> {
    let json = serde_json::to_string_pretty(&BuildOrderDocument::from_build_order(order))?;
    write_creating_parent(path.as_ref(), &json)
}

/// Export a simulation result as pretty JSON.
pub fn export_result_json<P: AsRef<Path>>(
    result: &SimResult,
    path: P,
) -> Result<(), BuildOrderIoError> {
    let json = serde_json::to_string_pretty(result)?;
    write_creating_parent(path.as_ref(), &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::MapData;

    const DOC: &str = r#"(
        name: "Doc",
        map: (avg_wind: 9.0, mex_spots: 4),
        commander_queue: ["mex", "wind*2", "bot_lab", "assist"],
        factory_queues: { "factory_0": ["tick", "grunt*3"] },
        constructor_queues: { "con_1": ["mex", "reclaim"] },
        strategy: Some((role: eco)),
    )"#;

    #[test]
    fn test_kinds_follow_queue() {
        let order = build_order_from_ron_str(DOC, None).unwrap();
        assert_eq!(order.commander_queue[0].kind, ActionKind::BuildStructure);
        assert_eq!(order.commander_queue[1].repeat, 2);
        assert_eq!(order.commander_queue[3].kind, ActionKind::Assist);
        assert_eq!(order.factory_queues["factory_0"][1].kind, ActionKind::ProduceUnit);
        assert_eq!(order.factory_queues["factory_0"][1].repeat, 3);
        assert_eq!(order.constructor_queues["con_1"][1].kind, ActionKind::Reclaim);
        assert_eq!(order.map.avg_wind, 9.0);
        assert_eq!(order.map.wind_variance, 3.0);
        assert_eq!(
            order.strategy.as_ref().map(|s| s.role),
            Some(bar_core::strategy::Role::Eco)
        );
    }

    #[test]
    fn test_bad_entries_rejected() {
        for entry in ["", "*2", "grunt*0", "grunt*x"] {
            assert!(
                matches!(
                    parse_entry(entry, ActionKind::ProduceUnit),
                    Err(BuildOrderIoError::InvalidEntry(_))
                ),
                "{entry:?}"
            );
        }
    }

    #[test]
    fn test_document_round_trip() {
        let order = build_order_from_ron_str(DOC, None).unwrap();
        let ron = build_order_to_ron_string(&order).unwrap();
        assert!(ron.contains("wind*2"));
        assert_eq!(build_order_from_ron_str(&ron, None).unwrap(), order);
    }

    #[test]
    fn test_kind_is_taken_from_queue_on_reload() {
        let mut order = BuildOrder::new("Mixed").with_commander(&["bot_lab"]);
        order
            .factory_queues
            .insert("factory_0".into(), vec![BuildAction::structure("wind")]);
        let ron = build_order_to_ron_string(&order).unwrap();
        let reloaded = build_order_from_ron_str(&ron, None).unwrap();

        assert_eq!(reloaded.factory_queues["factory_0"][0].unit, "wind");
        assert_eq!(reloaded.factory_queues["factory_0"][0].kind, ActionKind::ProduceUnit);
    }

    #[test]
    fn test_map_name_resolves_through_registry() {
        let mut registry = MapRegistry::new();
        registry.insert(
            "calm",
            MapData {
                wind_min: 0.0,
                wind_max: 4.0,
                ..MapData::default()
            },
        );
        let doc = r#"(name: "x", map_name: Some("calm"), commander_queue: ["mex"])"#;

        let resolved = build_order_from_ron_str(doc, Some(&registry)).unwrap();
        assert_eq!(resolved.map.avg_wind, 2.0);
        assert_eq!(resolved.map_name.as_deref(), Some("calm"));

        let inline = build_order_from_ron_str(doc, None).unwrap();
        assert_eq!(inline.map, MapConfig::default());
    }
}
