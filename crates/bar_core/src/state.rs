//! The mutable aggregate advanced every tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::builders::{BuildTask, Builder, TaskId};
use crate::economy::{EconState, ResourcePool, STARTING_ENERGY, STARTING_METAL};
use crate::strategy::UnitRole;

/// Complete simulation state.
///
/// Builders are kept in creation order; every phase that walks them does
/// so in that order. Tasks are referenced by [`TaskId`] so that a nano and
/// its factory can share one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimState {
    /// Current tick.
    pub tick: u32,
    /// Metal pool.
    pub metal: ResourcePool,
    /// Energy pool.
    pub energy: ResourcePool,
    /// `min(metal.stall_factor, energy.stall_factor)`.
    pub effective_stall_factor: f64,
    /// Completed structures by unit key.
    pub buildings: BTreeMap<String, u32>,
    /// Produced mobile units by unit key.
    pub units: BTreeMap<String, u32>,
    /// Builder registry in creation order.
    pub builders: Vec<Builder>,
    /// Tasks in progress, in creation order.
    pub active_tasks: Vec<BuildTask>,
    /// Finished tasks, in completion order.
    pub completed_tasks: Vec<BuildTask>,
    /// Active T1 converters this tick.
    pub active_converters_t1: u32,
    /// Active T2 converters this tick.
    pub active_converters_t2: u32,
    /// Wind speed this tick.
    pub current_wind: f64,
    /// Produced units per role (strategy mode).
    pub army_by_role: BTreeMap<UnitRole, u32>,
    /// Economy classification (strategy mode).
    pub econ_state: EconState,
    /// Whether an emergency is active this tick.
    pub emergency_active: bool,
    /// First tick the emergency was observed active.
    pub emergency_started_at: Option<u32>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            tick: 0,
            metal: ResourcePool::new(STARTING_METAL),
            energy: ResourcePool::new(STARTING_ENERGY),
            effective_stall_factor: 1.0,
            buildings: BTreeMap::new(),
            units: BTreeMap::new(),
            builders: Vec::new(),
            active_tasks: Vec::new(),
            completed_tasks: Vec::new(),
            active_converters_t1: 0,
            active_converters_t2: 0,
            current_wind: 0.0,
            army_by_role: BTreeMap::new(),
            econ_state: EconState::Balanced,
            emergency_active: false,
            emergency_started_at: None,
        }
    }
}

impl SimState {
    /// Completed structures of a type.
    #[must_use]
    pub fn building_count(&self, unit: &str) -> u32 {
        self.buildings.get(unit).copied().unwrap_or(0)
    }

    /// Produced units of a type.
    #[must_use]
    pub fn unit_count(&self, unit: &str) -> u32 {
        self.units.get(unit).copied().unwrap_or(0)
    }

    /// Sum of build power over active builders.
    #[must_use]
    pub fn total_build_power(&self) -> f64 {
        self.builders
            .iter()
            .filter(|b| b.is_active)
            .map(|b| b.build_power)
            .sum()
    }

    /// Find a builder by id.
    #[must_use]
    pub fn builder(&self, id: &str) -> Option<&Builder> {
        self.builders.iter().find(|b| b.id == id)
    }

    /// Find a builder by id, mutably.
    pub fn builder_mut(&mut self, id: &str) -> Option<&mut Builder> {
        self.builders.iter_mut().find(|b| b.id == id)
    }

    /// Find an active task by id.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&BuildTask> {
        self.active_tasks.iter().find(|t| t.id == id)
    }

    /// Find an active task by id, mutably.
    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut BuildTask> {
        self.active_tasks.iter_mut().find(|t| t.id == id)
    }

    /// Building and unit counts merged into one map.
    #[must_use]
    pub fn unit_counts(&self) -> BTreeMap<String, u32> {
        let mut counts = self.buildings.clone();
        for (unit, n) in &self.units {
            *counts.entry(unit.clone()).or_insert(0) += n;
        }
        counts
    }
}
