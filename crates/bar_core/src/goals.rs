//! Goal queue: ordered objectives that steer the dynamic controllers.
//!
//! Goals complete strictly in FIFO order. The first goal that is not yet
//! completed is the active one; it flips from pending to active the first
//! time the queue is inspected. Goals are never reordered or removed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::is_t2_factory;
use crate::econ_controller::EconOverride;
use crate::error::{Result, SimError};

/// Metal banked while an economy-target goal is active.
pub const ECONOMY_RESERVE_METAL: f64 = 200.0;

/// Metal banked while a tech-transition goal is active.
pub const TECH_RESERVE_METAL: f64 = 500.0;

/// What a goal asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GoalKind {
    /// Produce `count` units of `unit`.
    UnitProduction {
        /// Unit key.
        unit: String,
        /// Target count.
        count: u32,
    },
    /// Build `count` structures of `unit`.
    StructureBuild {
        /// Unit key.
        unit: String,
        /// Target count.
        count: u32,
    },
    /// Reach a metal income.
    EconomyTarget {
        /// Metal per second.
        metal_income: f64,
    },
    /// Get any tech-2 factory online.
    TechTransition,
    /// Reach a total build power.
    BuildPowerTarget {
        /// Build power.
        build_power: f64,
    },
}

impl GoalKind {
    /// Stable lowercase type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::UnitProduction { .. } => "unit_production",
            Self::StructureBuild { .. } => "structure_build",
            Self::EconomyTarget { .. } => "economy_target",
            Self::TechTransition => "tech_transition",
            Self::BuildPowerTarget { .. } => "buildpower_target",
        }
    }

    /// Default human-readable description.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::UnitProduction { unit, count } | Self::StructureBuild { unit, count } => {
                format!("{}: {unit} x{count}", self.type_name())
            }
            Self::EconomyTarget { metal_income: v } | Self::BuildPowerTarget { build_power: v } => {
                format!("{}: {v}", self.type_name())
            }
            Self::TechTransition => "Tech transition to T2".to_string(),
        }
    }
}

/// A validated goal definition, ready to enqueue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalSpec {
    /// What the goal asks for.
    pub kind: GoalKind,
    /// Description used in completion logs.
    pub description: String,
}

impl GoalSpec {
    /// Validate and wrap a goal kind with its default description.
    pub fn new(kind: GoalKind) -> Result<Self> {
        match &kind {
            GoalKind::UnitProduction { unit, count } | GoalKind::StructureBuild { unit, count } => {
                if unit.is_empty() {
                    return Err(SimError::InvalidGoal(format!(
                        "{} needs a unit",
                        kind.type_name()
                    )));
                }
                if *count == 0 {
                    return Err(SimError::InvalidGoal(format!(
                        "{} needs a count above zero",
                        kind.type_name()
                    )));
                }
            }
            GoalKind::EconomyTarget { metal_income: v } | GoalKind::BuildPowerTarget { build_power: v } => {
                if !v.is_finite() || *v < 0.0 {
                    return Err(SimError::InvalidGoal(format!(
                        "{} needs a non-negative target, got {v}",
                        kind.type_name()
                    )));
                }
            }
            GoalKind::TechTransition => {}
        }
        Ok(Self {
            description: kind.describe(),
            kind,
        })
    }

    /// Replace the description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// Goal lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalStatus {
    /// Waiting behind earlier goals.
    Pending,
    /// The goal currently steering the controllers.
    Active,
    /// Done.
    Completed,
}

/// A goal in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Sequential id starting at 1.
    pub id: u32,
    /// Definition.
    pub spec: GoalSpec,
    /// Status.
    pub status: GoalStatus,
    /// Tick the goal was first ticked while active.
    pub started_at: Option<u32>,
    /// Tick the goal completed.
    pub completed_at: Option<u32>,
    /// Progress fraction in `[0, 1]`.
    pub progress: f64,
}

/// What the goal queue can see each tick.
#[derive(Debug, Clone, Copy)]
pub struct GoalView<'a> {
    /// Current tick.
    pub tick: u32,
    /// Completed structures.
    pub buildings: &'a BTreeMap<String, u32>,
    /// Produced units by key.
    pub army_by_unit: &'a BTreeMap<String, u32>,
    /// Metal income this tick.
    pub metal_income: f64,
    /// Total active build power.
    pub total_build_power: f64,
}

impl GoalView<'_> {
    fn count(map: &BTreeMap<String, u32>, unit: &str) -> u32 {
        map.get(unit).copied().unwrap_or(0)
    }

    fn is_complete(&self, kind: &GoalKind) -> bool {
        match kind {
            GoalKind::UnitProduction { unit, count } => Self::count(self.army_by_unit, unit) >= *count,
            GoalKind::StructureBuild { unit, count } => Self::count(self.buildings, unit) >= *count,
            GoalKind::EconomyTarget { metal_income } => self.metal_income >= *metal_income,
            GoalKind::TechTransition => self
                .buildings
                .iter()
                .any(|(unit, n)| *n > 0 && is_t2_factory(unit)),
            GoalKind::BuildPowerTarget { build_power } => self.total_build_power >= *build_power,
        }
    }

    fn progress(&self, kind: &GoalKind) -> f64 {
        let ratio = |have: f64, want: f64| if want > 0.0 { (have / want).min(1.0) } else { 0.0 };
        match kind {
            GoalKind::UnitProduction { unit, count } => {
                ratio(f64::from(Self::count(self.army_by_unit, unit)), f64::from(*count))
            }
            GoalKind::StructureBuild { unit, count } => {
                ratio(f64::from(Self::count(self.buildings, unit)), f64::from(*count))
            }
            GoalKind::EconomyTarget { metal_income } => ratio(self.metal_income, *metal_income),
            GoalKind::TechTransition => {
                if self.is_complete(kind) {
                    1.0
                } else {
                    0.0
                }
            }
            GoalKind::BuildPowerTarget { build_power } => ratio(self.total_build_power, *build_power),
        }
    }
}

/// A completed goal, as logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalCompletion {
    /// Tick of completion.
    pub tick: u32,
    /// Goal description.
    pub description: String,
}

/// FIFO of goals with exactly one active at a time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalQueue {
    goals: Vec<Goal>,
    next_id: u32,
    completions: Vec<GoalCompletion>,
}

impl GoalQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            goals: Vec::new(),
            next_id: 1,
            completions: Vec::new(),
        }
    }

    /// Append a goal; returns its id.
    pub fn add(&mut self, spec: GoalSpec) -> u32 {
        if self.next_id == 0 {
            self.next_id = 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.goals.push(Goal {
            id,
            spec,
            status: GoalStatus::Pending,
            started_at: None,
            completed_at: None,
            progress: 0.0,
        });
        id
    }

    /// All goals in order.
    #[must_use]
    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    /// Completion log.
    #[must_use]
    pub fn completions(&self) -> &[GoalCompletion] {
        &self.completions
    }

    /// Returns true if no goals were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    fn active_index(&mut self) -> Option<usize> {
        let index = self
            .goals
            .iter()
            .position(|g| g.status != GoalStatus::Completed)?;
        let goal = &mut self.goals[index];
        if goal.status == GoalStatus::Pending {
            goal.status = GoalStatus::Active;
        }
        Some(index)
    }

    /// The active goal, activating the first pending one if needed.
    pub fn active(&mut self) -> Option<&Goal> {
        let index = self.active_index()?;
        Some(&self.goals[index])
    }

    /// Check the active goal; on completion log it and return it.
    pub fn tick(&mut self, view: &GoalView<'_>) -> Option<&Goal> {
        let index = self.active_index()?;
        let goal = &mut self.goals[index];
        if goal.started_at.is_none() {
            goal.started_at = Some(view.tick);
        }

        if view.is_complete(&goal.spec.kind) {
            goal.status = GoalStatus::Completed;
            goal.completed_at = Some(view.tick);
            goal.progress = 1.0;
            tracing::debug!(
                tick = view.tick,
                goal = %goal.spec.description,
                "Goal completed"
            );
            self.completions.push(GoalCompletion {
                tick: view.tick,
                description: goal.spec.description.clone(),
            });
            return Some(&self.goals[index]);
        }

        goal.progress = view.progress(&goal.spec.kind);
        None
    }

    /// Controller overrides derived from the active goal: economy override
    /// and forced factory unit.
    pub fn overrides(&mut self) -> (EconOverride, Option<String>) {
        let mut econ = EconOverride::default();
        let Some(goal) = self.active() else {
            return (econ, None);
        };

        let mut production = None;
        match &goal.spec.kind {
            GoalKind::UnitProduction { unit, .. } => production = Some(unit.clone()),
            GoalKind::StructureBuild { unit, .. } => econ.force_build = Some(unit.clone()),
            GoalKind::EconomyTarget { .. } => econ.reserve_metal = ECONOMY_RESERVE_METAL,
            GoalKind::TechTransition => econ.reserve_metal = TECH_RESERVE_METAL,
            GoalKind::BuildPowerTarget { .. } => {}
        }
        (econ, production)
    }
}
