//! Build orders: per-builder action queues plus map parameters.
//!
//! A [`BuildOrder`] is plain data. Loaders, the optimizer and tests build
//! and mutate it; the simulation engine only reads it, keeping a private
//! cursor per builder.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::keys;
use crate::strategy::StrategyConfig;

/// What a builder does with the unit named in a [`BuildAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActionKind {
    /// Place a structure (commander and constructors).
    #[default]
    BuildStructure,
    /// Produce a mobile unit (factories).
    ProduceUnit,
    /// Lend build power to the first active factory's current job.
    Assist,
    /// Reclaim wreckage. Not modeled: the action is consumed and ignored.
    Reclaim,
}

impl ActionKind {
    /// Stable lowercase name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::BuildStructure => "build_structure",
            Self::ProduceUnit => "produce_unit",
            Self::Assist => "assist",
            Self::Reclaim => "reclaim",
        }
    }
}

fn default_repeat() -> u32 {
    1
}

/// One queued intention: a unit key, what to do with it, and how many times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildAction {
    /// Unit key in the catalog.
    pub unit: String,
    /// Action kind.
    #[serde(default)]
    pub kind: ActionKind,
    /// Number of times the action is issued before the cursor advances.
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl BuildAction {
    /// Create an action with a repeat count of one.
    #[must_use]
    pub fn new(unit: &str, kind: ActionKind) -> Self {
        Self {
            unit: unit.to_string(),
            kind,
            repeat: 1,
        }
    }

    /// A structure placement.
    #[must_use]
    pub fn structure(unit: &str) -> Self {
        Self::new(unit, ActionKind::BuildStructure)
    }

    /// A factory production order.
    #[must_use]
    pub fn produce(unit: &str) -> Self {
        Self::new(unit, ActionKind::ProduceUnit)
    }

    /// Set the repeat count.
    pub fn times(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self
    }

    /// Effective repeat count (zero is treated as one).
    #[must_use]
    pub fn issues(&self) -> u32 {
        self.repeat.max(1)
    }
}

/// Map parameters that drive income formulas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Average wind speed.
    pub avg_wind: f64,
    /// Amplitude of the wind oscillation.
    pub wind_variance: f64,
    /// Metal per second produced by one extractor.
    pub mex_value: f64,
    /// Number of extractor spots available to the player.
    pub mex_spots: u32,
    /// Whether a geothermal vent is available.
    pub has_geo: bool,
    /// Energy per second produced by one tidal generator.
    pub tidal_value: f64,
    /// Total reclaimable metal.
    pub reclaim_metal: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            avg_wind: 12.0,
            wind_variance: 3.0,
            mex_value: 2.0,
            mex_spots: 6,
            has_geo: false,
            tidal_value: 0.0,
            reclaim_metal: 0.0,
        }
    }
}

impl MapConfig {
    /// Set the wind parameters.
    pub fn with_wind(mut self, avg: f64, variance: f64) -> Self {
        self.avg_wind = avg;
        self.wind_variance = variance;
        self
    }

    /// Set the extractor parameters.
    pub fn with_mex(mut self, value: f64, spots: u32) -> Self {
        self.mex_value = value;
        self.mex_spots = spots;
        self
    }

    /// Set geothermal availability.
    pub fn with_geo(mut self, has_geo: bool) -> Self {
        self.has_geo = has_geo;
        self
    }
}

/// Identifies one queue inside a [`BuildOrder`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueueSlot {
    /// The commander queue.
    Commander,
    /// A factory queue by builder id.
    Factory(String),
    /// A constructor queue by builder id.
    Constructor(String),
}

impl QueueSlot {
    /// Action kind appropriate for new entries in this queue.
    #[must_use]
    pub const fn default_kind(&self) -> ActionKind {
        match self {
            Self::Factory(_) => ActionKind::ProduceUnit,
            Self::Commander | Self::Constructor(_) => ActionKind::BuildStructure,
        }
    }
}

/// A named build order.
///
/// Factory queues are keyed `factory_0`, `factory_1`, ... in completion
/// order; constructor queues are keyed `con_1`, `con_2`, ... When a builder
/// has no queue of its own it falls back to `factory_0` or `con_1`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BuildOrder {
    /// Name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Map parameters.
    #[serde(default)]
    pub map: MapConfig,
    /// Named map used to resolve `map` at the loader boundary.
    #[serde(default)]
    pub map_name: Option<String>,
    /// Commander queue.
    #[serde(default)]
    pub commander_queue: Vec<BuildAction>,
    /// Factory queues by builder id.
    #[serde(default)]
    pub factory_queues: BTreeMap<String, Vec<BuildAction>>,
    /// Constructor queues by builder id.
    #[serde(default)]
    pub constructor_queues: BTreeMap<String, Vec<BuildAction>>,
    /// Enables strategy mode when present.
    #[serde(default)]
    pub strategy: Option<StrategyConfig>,
}

/// Builder id of the first factory.
pub const FIRST_FACTORY_ID: &str = "factory_0";
/// Builder id of the first constructor.
pub const FIRST_CONSTRUCTOR_ID: &str = "con_1";

impl BuildOrder {
    /// Create an empty build order on the default map.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Set the map parameters.
    pub fn with_map(mut self, map: MapConfig) -> Self {
        self.map = map;
        self
    }

    /// Append structures to the commander queue.
    pub fn with_commander(mut self, units: &[&str]) -> Self {
        self.commander_queue
            .extend(units.iter().map(|u| BuildAction::structure(u)));
        self
    }

    /// Append production orders to a factory queue.
    pub fn with_factory(mut self, factory_id: &str, units: &[&str]) -> Self {
        self.factory_queues
            .entry(factory_id.to_string())
            .or_default()
            .extend(units.iter().map(|u| BuildAction::produce(u)));
        self
    }

    /// Append structures to a constructor queue.
    pub fn with_constructor(mut self, con_id: &str, units: &[&str]) -> Self {
        self.constructor_queues
            .entry(con_id.to_string())
            .or_default()
            .extend(units.iter().map(|u| BuildAction::structure(u)));
        self
    }

    /// Enable strategy mode.
    pub fn with_strategy(mut self, strategy: StrategyConfig) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Every queue slot, commander first, then factories and constructors in key order.
    #[must_use]
    pub fn slots(&self) -> Vec<QueueSlot> {
        std::iter::once(QueueSlot::Commander)
            .chain(self.factory_queues.keys().cloned().map(QueueSlot::Factory))
            .chain(
                self.constructor_queues
                    .keys()
                    .cloned()
                    .map(QueueSlot::Constructor),
            )
            .collect()
    }

    /// Borrow a queue.
    #[must_use]
    pub fn queue(&self, slot: &QueueSlot) -> Option<&Vec<BuildAction>> {
        match slot {
            QueueSlot::Commander => Some(&self.commander_queue),
            QueueSlot::Factory(id) => self.factory_queues.get(id),
            QueueSlot::Constructor(id) => self.constructor_queues.get(id),
        }
    }

    /// Mutably borrow a queue.
    pub fn queue_mut(&mut self, slot: &QueueSlot) -> Option<&mut Vec<BuildAction>> {
        match slot {
            QueueSlot::Commander => Some(&mut self.commander_queue),
            QueueSlot::Factory(id) => self.factory_queues.get_mut(id),
            QueueSlot::Constructor(id) => self.constructor_queues.get_mut(id),
        }
    }

    /// Count queued actions for a unit across every queue, honoring repeats.
    #[must_use]
    pub fn count_unit(&self, unit: &str) -> u32 {
        self.slots()
            .iter()
            .filter_map(|slot| self.queue(slot))
            .flatten()
            .filter(|a| a.unit == unit)
            .map(BuildAction::issues)
            .sum()
    }

    /// Number of queued metal extractors.
    #[must_use]
    pub fn mex_count(&self) -> u32 {
        self.count_unit(keys::MEX)
    }

    /// Total number of queued actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commander_queue.len()
            + self.factory_queues.values().map(Vec::len).sum::<usize>()
            + self.constructor_queues.values().map(Vec::len).sum::<usize>()
    }

    /// Returns true if no queue has any action.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Static queue for a newly completed factory.
    #[must_use]
    pub fn factory_queue_for(&self, factory_id: &str) -> Vec<BuildAction> {
        self.factory_queues
            .get(factory_id)
            .or_else(|| self.factory_queues.get(FIRST_FACTORY_ID))
            .cloned()
            .unwrap_or_default()
    }

    /// Static queue for a newly produced constructor.
    #[must_use]
    pub fn constructor_queue_for(&self, con_id: &str) -> Vec<BuildAction> {
        self.constructor_queues
            .get(con_id)
            .or_else(|| self.constructor_queues.get(FIRST_CONSTRUCTOR_ID))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_methods_fill_queues() {
        let bo = BuildOrder::new("test")
            .with_commander(&["mex", "mex", "wind"])
            .with_factory("factory_0", &["tick"])
            .with_constructor("con_1", &["mex"]);

        assert_eq!(bo.commander_queue.len(), 3);
        assert_eq!(bo.factory_queues["factory_0"][0].kind, ActionKind::ProduceUnit);
        assert_eq!(bo.mex_count(), 3);
        assert_eq!(bo.len(), 5);
    }

    #[test]
    fn test_count_honors_repeat() {
        let mut bo = BuildOrder::new("repeat");
        bo.commander_queue.push(BuildAction::structure("wind").times(4));
        assert_eq!(bo.count_unit("wind"), 4);
    }

    #[test]
    fn test_queue_fallbacks() {
        let bo = BuildOrder::new("fallback")
            .with_factory("factory_0", &["grunt"])
            .with_constructor("con_1", &["solar"]);

        assert_eq!(bo.factory_queue_for("factory_3")[0].unit, "grunt");
        assert_eq!(bo.constructor_queue_for("con_2")[0].unit, "solar");
        assert!(BuildOrder::new("empty").factory_queue_for("factory_0").is_empty());
    }

    #[test]
    fn test_slots_order() {
        let bo = BuildOrder::new("slots")
            .with_constructor("con_1", &["mex"])
            .with_factory("factory_0", &["tick"]);
        assert_eq!(
            bo.slots(),
            vec![
                QueueSlot::Commander,
                QueueSlot::Factory("factory_0".into()),
                QueueSlot::Constructor("con_1".into()),
            ]
        );
    }
}
