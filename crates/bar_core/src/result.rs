//! Simulation output: milestones, stall events, completions, snapshots.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::economy::EconState;
use crate::error::{Result, SimError};
use crate::goals::GoalCompletion;
use crate::strategy::UnitRole;

/// Ticks between periodic snapshots.
pub const SNAPSHOT_INTERVAL: u32 = 30;

/// Key events, each recorded at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    /// First factory completed.
    FirstFactory,
    /// First mobile constructor produced.
    FirstConstructor,
    /// First construction turret completed.
    FirstNano,
    /// First tech-2 factory completed.
    FirstT2Lab,
}

impl MilestoneKind {
    /// Stable event key, e.g. `first_factory`.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::FirstFactory => "first_factory",
            Self::FirstConstructor => "first_constructor",
            Self::FirstNano => "first_nano",
            Self::FirstT2Lab => "first_t2_lab",
        }
    }
}

/// A milestone event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Tick of the event.
    pub tick: u32,
    /// Event kind.
    pub kind: MilestoneKind,
    /// Human-readable description.
    pub description: String,
    /// Metal income at the time.
    pub metal_income: f64,
    /// Energy income at the time.
    pub energy_income: f64,
}

/// The two resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Metal.
    Metal,
    /// Energy.
    Energy,
}

impl Resource {
    /// Stable lowercase name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Metal => "metal",
            Self::Energy => "energy",
        }
    }
}

/// A contiguous run of ticks with the effective stall factor below threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StallEvent {
    /// First stalled tick.
    pub start_tick: u32,
    /// Last stalled tick.
    pub end_tick: u32,
    /// Deficient resource when the event opened.
    pub resource: Resource,
    /// Worst `1 - stall_factor` seen during the event.
    pub severity: f64,
}

impl StallEvent {
    /// Length of the event in ticks.
    #[must_use]
    pub const fn duration(&self) -> u32 {
        self.end_tick.saturating_sub(self.start_tick) + 1
    }
}

/// One completion log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEntry {
    /// Tick of completion.
    pub tick: u32,
    /// Unit key completed.
    pub unit: String,
    /// Builder that owned the task.
    pub builder: String,
}

/// Headline metrics at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Tick.
    pub tick: u32,
    /// Metal income (including converter output).
    pub metal_income: f64,
    /// Energy income.
    pub energy_income: f64,
    /// Metal in storage.
    pub metal_stored: f64,
    /// Energy in storage.
    pub energy_stored: f64,
    /// Requested metal drain.
    pub metal_expenditure: f64,
    /// Requested energy drain.
    pub energy_expenditure: f64,
    /// Total active build power.
    pub build_power: f64,
    /// Metal value of produced combat units so far.
    pub army_value_metal: f64,
    /// Effective stall factor.
    pub stall_factor: f64,
    /// Completed structures and produced units.
    pub unit_counts: BTreeMap<String, u32>,
    /// Produced units per role (strategy mode).
    pub army_by_role: BTreeMap<UnitRole, u32>,
    /// Economy classification (strategy mode).
    pub econ_state: EconState,
}

/// Complete output of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimResult {
    /// Name of the simulated build order.
    pub build_order_name: String,
    /// Ticks simulated.
    pub total_ticks: u32,
    /// Wind seed.
    pub seed: u64,
    /// Milestones in chronological order.
    pub milestones: Vec<Milestone>,
    /// Stall events in chronological order.
    pub stall_events: Vec<StallEvent>,
    /// Completions in chronological order.
    pub completion_log: Vec<CompletionEntry>,
    /// Snapshots at tick 0 and every [`SNAPSHOT_INTERVAL`] ticks.
    pub snapshots: Vec<Snapshot>,
    /// Tick of the first factory.
    pub time_to_first_factory: Option<u32>,
    /// Tick of the first constructor.
    pub time_to_first_constructor: Option<u32>,
    /// Tick of the first nano.
    pub time_to_first_nano: Option<u32>,
    /// Tick of the first tech-2 factory.
    pub time_to_t2_lab: Option<u32>,
    /// Tick of the first metal extractor.
    pub time_to_first_mex: Option<u32>,
    /// Highest metal income seen.
    pub peak_metal_income: f64,
    /// Highest energy income seen.
    pub peak_energy_income: f64,
    /// Stalled ticks attributed to metal.
    pub metal_stall_seconds: u32,
    /// Stalled ticks attributed to energy.
    pub energy_stall_seconds: u32,
    /// Metal cost of every produced non-constructor unit.
    pub total_army_metal_value: f64,
    /// Final units per role (strategy mode).
    pub army_composition_final: BTreeMap<UnitRole, u32>,
    /// Goal completion log (strategy mode).
    pub goal_completions: Vec<GoalCompletion>,
    /// Strategy summary (strategy mode).
    pub strategy_used: Option<String>,
}

impl SimResult {
    /// Create an empty result.
    #[must_use]
    pub fn new(build_order_name: &str, total_ticks: u32, seed: u64) -> Self {
        Self {
            build_order_name: build_order_name.to_string(),
            total_ticks,
            seed,
            milestones: Vec::new(),
            stall_events: Vec::new(),
            completion_log: Vec::new(),
            snapshots: Vec::new(),
            time_to_first_factory: None,
            time_to_first_constructor: None,
            time_to_first_nano: None,
            time_to_t2_lab: None,
            time_to_first_mex: None,
            peak_metal_income: 0.0,
            peak_energy_income: 0.0,
            metal_stall_seconds: 0,
            energy_stall_seconds: 0,
            total_army_metal_value: 0.0,
            army_composition_final: BTreeMap::new(),
            goal_completions: Vec::new(),
            strategy_used: None,
        }
    }

    /// Total stalled ticks over both resources.
    #[must_use]
    pub const fn total_stall_seconds(&self) -> u32 {
        self.metal_stall_seconds + self.energy_stall_seconds
    }

    /// Milestone of a kind, if it happened.
    #[must_use]
    pub fn milestone(&self, kind: MilestoneKind) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.kind == kind)
    }

    /// Latest snapshot taken at or before `tick`.
    #[must_use]
    pub fn snapshot_at(&self, tick: u32) -> Option<&Snapshot> {
        self.snapshots.iter().rev().find(|s| s.tick <= tick)
    }

    /// Last snapshot of the run.
    #[must_use]
    pub fn final_snapshot(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    /// Tick of the first completion of `unit`.
    #[must_use]
    pub fn first_completion(&self, unit: &str) -> Option<u32> {
        self.completion_log
            .iter()
            .find(|c| c.unit == unit)
            .map(|c| c.tick)
    }

    /// Serialize to a compact binary encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| SimError::InvalidState(format!("Serialization failed: {e}")))
    }

    /// Deserialize from [`Self::to_bytes`] output.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| SimError::InvalidState(format!("Deserialization failed: {e}")))
    }

    /// Hash of the binary encoding, for determinism checks.
    ///
    /// Two runs with the same inputs must produce the same hash.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        match self.to_bytes() {
            Ok(bytes) => bytes.hash(&mut hasher),
            Err(_) => self.build_order_name.hash(&mut hasher),
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(tick: u32) -> Snapshot {
        Snapshot {
            tick,
            metal_income: 0.0,
            energy_income: 0.0,
            metal_stored: 0.0,
            energy_stored: 0.0,
            metal_expenditure: 0.0,
            energy_expenditure: 0.0,
            build_power: 0.0,
            army_value_metal: 0.0,
            stall_factor: 1.0,
            unit_counts: BTreeMap::new(),
            army_by_role: BTreeMap::new(),
            econ_state: EconState::Balanced,
        }
    }

    #[test]
    fn test_snapshot_at_picks_latest_before() {
        let mut result = SimResult::new("test", 90, 42);
        result.snapshots = vec![snapshot(0), snapshot(30), snapshot(60), snapshot(90)];
        assert_eq!(result.snapshot_at(45).unwrap().tick, 30);
        assert_eq!(result.snapshot_at(60).unwrap().tick, 60);
        assert_eq!(result.snapshot_at(1000).unwrap().tick, 90);
    }

    #[test]
    fn test_bytes_roundtrip_and_hash() {
        let mut result = SimResult::new("hash", 30, 7);
        result.snapshots.push(snapshot(0));
        result.stall_events.push(StallEvent {
            start_tick: 3,
            end_tick: 5,
            resource: Resource::Energy,
            severity: 0.4,
        });

        let bytes = result.to_bytes().unwrap();
        let restored = SimResult::from_bytes(&bytes).unwrap();
        assert_eq!(restored, result);
        assert_eq!(restored.state_hash(), result.state_hash());
    }

    #[test]
    fn test_hash_changes_with_content() {
        let a = SimResult::new("a", 30, 7);
        let mut b = a.clone();
        b.peak_metal_income = 1.0;
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_stall_event_duration() {
        let event = StallEvent {
            start_tick: 10,
            end_tick: 10,
            resource: Resource::Metal,
            severity: 0.1,
        };
        assert_eq!(event.duration(), 1);
    }
}
