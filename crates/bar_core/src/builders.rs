//! Builders and in-flight construction tasks.

use serde::{Deserialize, Serialize};

use crate::build_order::{ActionKind, BuildAction};

/// Identifier for a [`BuildTask`], unique within one simulation run.
pub type TaskId = u32;

/// Ticks a mobile builder spends walking to a new build site.
pub const WALK_TIME: u32 = 3;

/// Build power of a construction turret.
pub const NANO_BUILD_POWER: f64 = 200.0;

/// Kinds of builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuilderKind {
    /// The starting commander.
    Commander,
    /// A stationary factory.
    Factory,
    /// A mobile constructor.
    Constructor,
    /// A stationary assist turret mirroring a factory's job.
    Nano,
}

impl BuilderKind {
    /// Ticks of walking before a newly assigned job can progress.
    #[must_use]
    pub const fn walk_delay(&self) -> u32 {
        match self {
            Self::Commander | Self::Constructor => WALK_TIME,
            Self::Factory | Self::Nano => 0,
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Commander => "commander",
            Self::Factory => "factory",
            Self::Constructor => "constructor",
            Self::Nano => "nano",
        }
    }
}

/// Anything that contributes build power.
///
/// Builders are never destroyed during a run. The static queue is a copy
/// taken when the builder comes online; the cursor walks it once, issuing
/// each action `repeat` times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Builder {
    /// Builder id, e.g. `commander`, `factory_0`, `con_1`, `nano_0`.
    pub id: String,
    /// Unit key this builder was built from.
    pub unit: String,
    /// Builder kind.
    pub kind: BuilderKind,
    /// Build power.
    pub build_power: f64,
    /// Current task, at most one.
    pub current_task: Option<TaskId>,
    /// Static action queue.
    pub queue: Vec<BuildAction>,
    /// Index of the next action in `queue`.
    pub queue_index: usize,
    /// Issues already made for the action at `queue_index`.
    pub issued: u32,
    /// Inactive builders contribute nothing and take no work.
    pub is_active: bool,
    /// Tick the builder came online.
    pub activated_at: u32,
    /// Factory a nano assists, fixed once chosen.
    pub assist_target: Option<String>,
}

impl Builder {
    /// Create an active, idle builder.
    #[must_use]
    pub fn new(id: &str, unit: &str, kind: BuilderKind, build_power: f64, tick: u32) -> Self {
        Self {
            id: id.to_string(),
            unit: unit.to_string(),
            kind,
            build_power,
            current_task: None,
            queue: Vec::new(),
            queue_index: 0,
            issued: 0,
            is_active: true,
            activated_at: tick,
            assist_target: None,
        }
    }

    /// Attach a static queue.
    pub fn with_queue(mut self, queue: Vec<BuildAction>) -> Self {
        self.queue = queue;
        self
    }

    /// Whether the builder has no current task.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.current_task.is_none()
    }

    /// Whether every static action has been issued.
    #[must_use]
    pub fn queue_exhausted(&self) -> bool {
        self.queue_index >= self.queue.len()
    }

    /// Take the next static action, advancing the cursor past fully issued repeats.
    pub fn next_action(&mut self) -> Option<BuildAction> {
        let action = self.queue.get(self.queue_index)?.clone();
        self.issued += 1;
        if self.issued >= action.issues() {
            self.queue_index += 1;
            self.issued = 0;
        }
        Some(action)
    }
}

/// An in-flight construction job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildTask {
    /// Task id.
    pub id: TaskId,
    /// Unit being built.
    pub unit: String,
    /// Action kind that created the task.
    pub kind: ActionKind,
    /// Total work in build-power-seconds.
    pub total_work: f64,
    /// Metal cost of the unit.
    pub metal_cost: f64,
    /// Energy cost of the unit.
    pub energy_cost: f64,
    /// Work applied so far.
    pub work_done: f64,
    /// Metal spent so far.
    pub metal_spent: f64,
    /// Energy spent so far.
    pub energy_spent: f64,
    /// Ticks remaining before work can apply.
    pub walk_delay: u32,
    /// Builders working on the task; the first is the owner.
    pub assigned: Vec<String>,
    /// Tick the task was created.
    pub started_at: u32,
    /// Tick the task completed.
    pub completed_at: Option<u32>,
    /// Build power applied this tick before throttling.
    pub pending_bp: f64,
    /// Metal drain this tick before throttling.
    pub pending_metal: f64,
    /// Energy drain this tick before throttling.
    pub pending_energy: f64,
}

impl BuildTask {
    /// Whether accumulated work has reached the total.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.work_done >= self.total_work
    }

    /// Fraction complete in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.total_work > 0.0 {
            (self.work_done / self.total_work).min(1.0)
        } else {
            1.0
        }
    }

    /// Clear the per-tick drain.
    pub fn clear_pending(&mut self) {
        self.pending_bp = 0.0;
        self.pending_metal = 0.0;
        self.pending_energy = 0.0;
    }

    /// Owning builder id.
    #[must_use]
    pub fn owner(&self) -> &str {
        self.assigned.first().map_or("unknown", String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_action_honors_repeat() {
        let mut builder = Builder::new("commander", "commander", BuilderKind::Commander, 300.0, 0)
            .with_queue(vec![
                BuildAction::structure("wind").times(2),
                BuildAction::structure("mex"),
            ]);

        assert_eq!(builder.next_action().unwrap().unit, "wind");
        assert_eq!(builder.next_action().unwrap().unit, "wind");
        assert_eq!(builder.next_action().unwrap().unit, "mex");
        assert!(builder.next_action().is_none());
        assert!(builder.queue_exhausted());
    }

    #[test]
    fn test_walk_delay_by_kind() {
        assert_eq!(BuilderKind::Commander.walk_delay(), WALK_TIME);
        assert_eq!(BuilderKind::Constructor.walk_delay(), WALK_TIME);
        assert_eq!(BuilderKind::Factory.walk_delay(), 0);
        assert_eq!(BuilderKind::Nano.walk_delay(), 0);
    }

    #[test]
    fn test_zero_work_task_is_complete() {
        let task = BuildTask {
            id: 1,
            unit: "free".into(),
            kind: ActionKind::BuildStructure,
            total_work: 0.0,
            metal_cost: 0.0,
            energy_cost: 0.0,
            work_done: 0.0,
            metal_spent: 0.0,
            energy_spent: 0.0,
            walk_delay: 0,
            assigned: vec![],
            started_at: 0,
            completed_at: None,
            pending_bp: 0.0,
            pending_metal: 0.0,
            pending_energy: 0.0,
        };
        assert!(task.is_complete());
        assert_eq!(task.progress(), 1.0);
        assert_eq!(task.owner(), "unknown");
    }
}
