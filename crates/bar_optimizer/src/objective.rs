//! Scalar objectives over a simulation result.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use bar_core::result::{SimResult, Snapshot};

use crate::error::OptimizerError;

/// Default tick at which snapshot-based objectives are scored.
pub const DEFAULT_TARGET_TICK: u32 = 300;

/// Score given to a milestone that never happened.
pub const MISSING_MILESTONE_SCORE: f64 = 9999.0;

/// Number of distinct roles that earns the full diversity bonus.
const FULL_DIVERSITY_ROLES: f64 = 6.0;

/// What is being scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    /// Metal income at the target tick.
    MaxMetal,
    /// Energy income at the target tick.
    MaxEnergy,
    /// Army metal value at the target tick.
    MaxArmy,
    /// Tick of the first factory.
    FastestFactory,
    /// Tick of the first tech-2 factory.
    FastestT2,
    /// Total stalled ticks.
    MinStall,
    /// `10*metal + 0.5*energy + 0.1*army - 2*stall` at the target tick.
    Balanced,
    /// Army value scaled by role diversity at the target tick.
    BestComposition,
    /// Tick of the first goal completion.
    FastestGoal,
    /// Metal income at the target tick, for strategy searches.
    MaxEcoStrat,
}

impl ObjectiveKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::MaxMetal,
        Self::MaxEnergy,
        Self::MaxArmy,
        Self::FastestFactory,
        Self::FastestT2,
        Self::MinStall,
        Self::Balanced,
        Self::BestComposition,
        Self::FastestGoal,
        Self::MaxEcoStrat,
    ];

    /// Kinds meant for build-order searches.
    pub const BUILD_ORDER: [Self; 7] = [
        Self::MaxMetal,
        Self::MaxEnergy,
        Self::MaxArmy,
        Self::FastestFactory,
        Self::FastestT2,
        Self::MinStall,
        Self::Balanced,
    ];

    /// Kinds meant for strategy searches.
    pub const STRATEGY: [Self; 3] = [Self::BestComposition, Self::FastestGoal, Self::MaxEcoStrat];

    /// Stable name, e.g. `fastest_factory`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MaxMetal => "max_metal",
            Self::MaxEnergy => "max_energy",
            Self::MaxArmy => "max_army",
            Self::FastestFactory => "fastest_factory",
            Self::FastestT2 => "fastest_t2",
            Self::MinStall => "min_stall",
            Self::Balanced => "balanced",
            Self::BestComposition => "best_composition",
            Self::FastestGoal => "fastest_goal",
            Self::MaxEcoStrat => "max_eco_strat",
        }
    }

    /// Find a kind by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }

    /// Whether larger scores are better.
    #[must_use]
    pub const fn higher_is_better(&self) -> bool {
        !matches!(
            self,
            Self::FastestFactory | Self::FastestT2 | Self::MinStall | Self::FastestGoal
        )
    }
}

/// A named scoring function plus its direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    /// What is scored.
    pub kind: ObjectiveKind,
    /// Tick used by snapshot-based kinds.
    pub target_tick: u32,
}

impl Objective {
    /// Create an objective scored at [`DEFAULT_TARGET_TICK`].
    #[must_use]
    pub const fn new(kind: ObjectiveKind) -> Self {
        Self {
            kind,
            target_tick: DEFAULT_TARGET_TICK,
        }
    }

    /// Look up an objective by name.
    #[must_use]
    pub fn from_name(name: &str, target_tick: u32) -> Option<Self> {
        ObjectiveKind::from_name(name).map(|kind| Self { kind, target_tick })
    }

    /// Like [`Objective::from_name`], but unknown names are an error.
    pub fn parse(name: &str, target_tick: u32) -> crate::error::Result<Self> {
        Self::from_name(name, target_tick)
            .ok_or_else(|| OptimizerError::UnknownObjective(name.to_string()))
    }

    /// Set the target tick.
    pub fn with_target_tick(mut self, target_tick: u32) -> Self {
        self.target_tick = target_tick;
        self
    }

    /// Stable name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Whether larger scores are better.
    #[must_use]
    pub const fn higher_is_better(&self) -> bool {
        self.kind.higher_is_better()
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> String {
        let t = self.target_tick;
        match self.kind {
            ObjectiveKind::MaxMetal => format!("Maximize metal income at {t}s"),
            ObjectiveKind::MaxEnergy => format!("Maximize energy income at {t}s"),
            ObjectiveKind::MaxArmy => format!("Maximize army metal value at {t}s"),
            ObjectiveKind::FastestFactory => "Minimize time to first factory".to_string(),
            ObjectiveKind::FastestT2 => "Minimize time to T2 lab".to_string(),
            ObjectiveKind::MinStall => "Minimize total stall seconds".to_string(),
            ObjectiveKind::Balanced => {
                format!("Balanced score (eco + army - stalls) at {t}s")
            }
            ObjectiveKind::BestComposition => {
                format!("Maximize army value * role diversity at {t}s")
            }
            ObjectiveKind::FastestGoal => "Minimize tick to complete first goal".to_string(),
            ObjectiveKind::MaxEcoStrat => {
                format!("Maximize metal income at {t}s via strategy")
            }
        }
    }

    /// Score a simulation result.
    #[must_use]
    pub fn score(&self, result: &SimResult) -> f64 {
        let snap = result.snapshot_at(self.target_tick);
        match self.kind {
            ObjectiveKind::MaxMetal | ObjectiveKind::MaxEcoStrat => {
                snap.map_or(0.0, |s| s.metal_income)
            }
            ObjectiveKind::MaxEnergy => snap.map_or(0.0, |s| s.energy_income),
            ObjectiveKind::MaxArmy => snap.map_or(0.0, |s| s.army_value_metal),
            ObjectiveKind::FastestFactory => milestone_score(result.time_to_first_factory),
            ObjectiveKind::FastestT2 => milestone_score(result.time_to_t2_lab),
            ObjectiveKind::MinStall => f64::from(result.total_stall_seconds()),
            ObjectiveKind::Balanced => snap.map_or(0.0, |s| balanced_score(s, result)),
            ObjectiveKind::BestComposition => snap.map_or(0.0, composition_score),
            ObjectiveKind::FastestGoal => {
                milestone_score(result.goal_completions.first().map(|g| g.tick))
            }
        }
    }

    /// Whether score `a` is strictly better than `b`.
    #[must_use]
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        if self.higher_is_better() {
            a > b
        } else {
            a < b
        }
    }

    /// Score assigned to individuals whose evaluation failed.
    #[must_use]
    pub const fn worst_score(&self) -> f64 {
        if self.higher_is_better() {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        }
    }

    /// Ordering that puts better scores first.
    #[must_use]
    pub fn rank(&self, a: f64, b: f64) -> Ordering {
        if self.higher_is_better() {
            b.total_cmp(&a)
        } else {
            a.total_cmp(&b)
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn milestone_score(tick: Option<u32>) -> f64 {
    tick.map_or(MISSING_MILESTONE_SCORE, f64::from)
}

fn balanced_score(snap: &Snapshot, result: &SimResult) -> f64 {
    let stall = f64::from(result.total_stall_seconds());
    snap.metal_income * 10.0 + snap.energy_income * 0.5 + snap.army_value_metal * 0.1
        - stall * 2.0
}

fn composition_score(snap: &Snapshot) -> f64 {
    let distinct = snap.army_by_role.values().filter(|&&n| n > 0).count() as f64;
    let diversity = (distinct / FULL_DIVERSITY_ROLES).min(1.0);
    snap.army_value_metal * (1.0 + diversity * 0.5)
}
