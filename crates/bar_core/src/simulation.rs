//! Core simulation loop.
//!
//! The engine advances a [`BuildOrder`] one second per tick for a fixed
//! number of ticks and records everything of interest into a
//! [`SimResult`]. Runs never fail part-way: unknown units are skipped,
//! resource shortfalls only slow construction down.
//!
//! # Determinism
//!
//! Every run is fully deterministic:
//! - One seeded [`ChaCha8Rng`] per engine, used only for wind noise
//! - Builders and tasks are walked in creation order
//! - All keyed collections are `BTreeMap`s
//! - Same build order, duration and seed always produce the same result
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use bar_core::build_order::BuildOrder;
//! use bar_core::catalog::UnitCatalog;
//! use bar_core::simulation::simulate;
//!
//! let order = BuildOrder::new("two mex")
//!     .with_commander(&["mex", "mex", "wind", "bot_lab"]);
//! let catalog = Arc::new(UnitCatalog::standard());
//!
//! let result = simulate(&order, catalog, 300, 42).unwrap();
//! assert!(result.time_to_first_factory.is_some());
//! ```

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::build_order::{ActionKind, BuildAction, BuildOrder};
use crate::builders::{BuildTask, Builder, BuilderKind, TaskId, NANO_BUILD_POWER};
use crate::catalog::{is_constructor, is_factory, is_t2_factory, keys, UnitCatalog};
use crate::econ_controller::{choose_econ_build, EconContext};
use crate::economy::classify_state;
use crate::error::{Result, SimError};
use crate::goals::{GoalQueue, GoalSpec, GoalView};
use crate::production::{choose_factory_production, ArmyComposition, ProductionContext};
use crate::result::{
    CompletionEntry, Milestone, MilestoneKind, Resource, SimResult, Snapshot, SNAPSHOT_INTERVAL,
};
use crate::state::SimState;
use crate::strategy::{EmergencyMode, StrategyConfig};
use crate::systems::{
    construction_system, converter_system, expenditure_system, income_system, resource_system,
    stall_system, wind_system, StallTracker,
};

/// Default run length in ticks (ten minutes).
pub const DEFAULT_DURATION: u32 = 600;

/// Default wind seed.
pub const DEFAULT_SEED: u64 = 42;

/// Commander build power when the catalog has no commander.
pub const DEFAULT_COMMANDER_BP: f64 = 300.0;

/// Commander energy output when the catalog has no commander.
pub const DEFAULT_COMMANDER_ENERGY: f64 = 30.0;

/// Factory build power when the catalog lacks the factory.
pub const DEFAULT_FACTORY_BP: f64 = 150.0;

/// Constructor build power when the catalog lacks the constructor.
pub const DEFAULT_CONSTRUCTOR_BP: f64 = 100.0;

/// Metal capacity added by a metal storage.
pub const METAL_STORAGE_BONUS: f64 = 3000.0;

/// Energy capacity added by an energy storage.
pub const ENERGY_STORAGE_BONUS: f64 = 6000.0;

/// Capacity of each resource added by every constructor.
pub const CONSTRUCTOR_STORAGE_BONUS: f64 = 50.0;

/// Simulate a build order to completion.
///
/// # Errors
///
/// Returns [`SimError::EmptyCatalog`] if the catalog has no units.
pub fn simulate(
    build_order: &BuildOrder,
    catalog: Arc<UnitCatalog>,
    duration: u32,
    seed: u64,
) -> Result<SimResult> {
    Ok(SimulationEngine::new(build_order, catalog, duration, seed)?.run())
}

/// One simulation run.
///
/// Goals can be queued between [`SimulationEngine::new`] and
/// [`SimulationEngine::run`]; they only steer anything in strategy mode.
#[derive(Debug, Clone)]
pub struct SimulationEngine {
    build_order: BuildOrder,
    catalog: Arc<UnitCatalog>,
    duration: u32,
    rng: ChaCha8Rng,
    state: SimState,
    result: SimResult,
    strategy: Option<StrategyConfig>,
    army: ArmyComposition,
    goals: GoalQueue,
    stall: StallTracker,
    commander_energy: f64,
    next_task_id: TaskId,
    factories_built: u32,
    constructors_built: u32,
    nanos_built: u32,
    mex_built: u32,
    army_value: f64,
}

impl SimulationEngine {
    /// Prepare a run: commander online with its queue, tick 0 snapshot taken.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EmptyCatalog`] if the catalog has no units.
    pub fn new(
        build_order: &BuildOrder,
        catalog: Arc<UnitCatalog>,
        duration: u32,
        seed: u64,
    ) -> Result<Self> {
        if catalog.is_empty() {
            return Err(SimError::EmptyCatalog);
        }

        let (commander_bp, commander_energy) = catalog.lookup(keys::COMMANDER).map_or(
            (DEFAULT_COMMANDER_BP, DEFAULT_COMMANDER_ENERGY),
            |spec| (spec.build_power, spec.energy_production),
        );

        let strategy = build_order.strategy.clone();
        let mut commander_queue = build_order.commander_queue.clone();
        if let Some(strategy) = &strategy {
            if commander_queue.is_empty() {
                commander_queue = strategy.generate_opening();
            }
        }

        let mut state = SimState::default();
        state.builders.push(
            Builder::new(
                keys::COMMANDER,
                keys::COMMANDER,
                BuilderKind::Commander,
                commander_bp,
                0,
            )
            .with_queue(commander_queue),
        );

        let mut engine = Self {
            build_order: build_order.clone(),
            catalog,
            duration,
            rng: ChaCha8Rng::seed_from_u64(seed),
            state,
            result: SimResult::new(&build_order.name, duration, seed),
            strategy,
            army: ArmyComposition::default(),
            goals: GoalQueue::new(),
            stall: StallTracker::new(),
            commander_energy,
            next_task_id: 0,
            factories_built: 0,
            constructors_built: 0,
            nanos_built: 0,
            mex_built: 0,
            army_value: 0.0,
        };
        engine.record_snapshot();
        Ok(engine)
    }

    /// Queue a goal.
    pub fn add_goal(&mut self, goal: GoalSpec) -> u32 {
        self.goals.add(goal)
    }

    /// The goal queue.
    #[must_use]
    pub fn goals(&self) -> &GoalQueue {
        &self.goals
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &SimState {
        &self.state
    }

    /// Whether strategy mode is enabled.
    #[must_use]
    pub fn is_strategy_mode(&self) -> bool {
        self.strategy.is_some()
    }

    /// Whether every tick has been simulated.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.tick >= self.duration
    }

    /// Run all remaining ticks and finalize.
    #[must_use]
    pub fn run(mut self) -> SimResult {
        while !self.is_finished() {
            self.step();
        }
        self.finish()
    }

    /// Advance one tick.
    ///
    /// Phases run in a fixed order; each reads what the earlier ones wrote.
    pub fn step(&mut self) {
        self.state.tick += 1;
        let tick = self.state.tick;

        // 1. Wind
        wind_system(&mut self.state, &self.build_order.map, &mut self.rng);

        // 2. Idle builders pick up work
        self.assign_idle_builders();
        if self.strategy.is_some() {
            self.update_emergency();
            self.state.econ_state = classify_state(&self.state.metal, &self.state.energy);
        }

        // 3-8. Economy
        income_system(
            &mut self.state,
            &self.build_order.map,
            &self.catalog,
            self.commander_energy,
        );
        expenditure_system(&mut self.state);
        stall_system(&mut self.state);
        construction_system(&mut self.state);
        resource_system(&mut self.state);
        converter_system(&mut self.state);

        // 9. Completions
        self.process_completions();

        // 10. Goals
        if self.strategy.is_some() {
            let view = GoalView {
                tick,
                buildings: &self.state.buildings,
                army_by_unit: &self.army.counts_by_unit,
                metal_income: self.state.metal.income,
                total_build_power: self.state.total_build_power(),
            };
            self.goals.tick(&view);
        }

        // 11. Stall events
        self.track_stall();

        // 12. Peaks
        self.result.peak_metal_income = self.result.peak_metal_income.max(self.state.metal.income);
        self.result.peak_energy_income =
            self.result.peak_energy_income.max(self.state.energy.income);

        #[cfg(feature = "debug-validation")]
        self.validate_state();

        if tick % SNAPSHOT_INTERVAL == 0 {
            self.record_snapshot();
        }
    }

    /// Close open bookkeeping and return the result.
    #[must_use]
    pub fn finish(mut self) -> SimResult {
        if let Some(event) = self.stall.finish(self.state.tick) {
            self.result.stall_events.push(event);
        }
        self.result.total_ticks = self.state.tick;
        self.result.total_army_metal_value = self.army_value;

        if let Some(strategy) = &self.strategy {
            self.result.army_composition_final = self.army.counts_by_role.clone();
            self.result.goal_completions = self.goals.completions().to_vec();
            self.result.strategy_used = Some(strategy.summary());
        }

        debug!(
            build_order = %self.result.build_order_name,
            ticks = self.result.total_ticks,
            completions = self.result.completion_log.len(),
            stall_events = self.result.stall_events.len(),
            "Simulation finished"
        );
        self.result
    }

    /// Emergency mode in effect this tick, if any.
    fn effective_emergency(&self) -> Option<EmergencyMode> {
        let plan = self.strategy.as_ref()?.emergency?;
        plan.is_active(self.state.tick).then_some(plan.mode)
    }

    fn update_emergency(&mut self) {
        let tick = self.state.tick;
        let Some(strategy) = self.strategy.as_mut() else {
            return;
        };
        let Some(plan) = strategy.emergency else {
            self.state.emergency_active = false;
            return;
        };

        if plan.has_expired(tick) {
            strategy.emergency = None;
            self.state.emergency_active = false;
        } else if plan.is_active(tick) {
            self.state.emergency_active = true;
            self.state.emergency_started_at.get_or_insert(tick);
        } else {
            self.state.emergency_active = false;
        }
    }

    fn assign_idle_builders(&mut self) {
        let emergency = self.effective_emergency();

        for index in 0..self.state.builders.len() {
            let builder = &self.state.builders[index];
            if !builder.is_active || !builder.is_idle() {
                continue;
            }
            if builder.kind == BuilderKind::Nano {
                self.assign_nano(index);
                continue;
            }

            let action = if builder.queue_exhausted() {
                self.dynamic_action(index, emergency)
            } else {
                self.state.builders[index].next_action()
            };
            if let Some(action) = action {
                self.start_task(index, &action);
            }
        }
    }

    /// Ask the controllers what an idle builder with an empty queue does next.
    fn dynamic_action(
        &mut self,
        index: usize,
        emergency: Option<EmergencyMode>,
    ) -> Option<BuildAction> {
        let strategy = self.strategy.as_ref()?;
        let (econ_override, production_override) = self.goals.overrides();
        let builder = &self.state.builders[index];

        match builder.kind {
            BuilderKind::Factory => {
                let ctx = ProductionContext {
                    strategy,
                    emergency,
                    army: &self.army,
                    factory: &builder.unit,
                    catalog: &self.catalog,
                };
                choose_factory_production(&ctx, production_override.as_deref())
            }
            BuilderKind::Commander | BuilderKind::Constructor => {
                let ctx = EconContext {
                    strategy,
                    emergency,
                    econ_state: self.state.econ_state,
                    metal_stored: self.state.metal.stored,
                    energy_stored: self.state.energy.stored,
                    remaining_mex: self.build_order.map.mex_spots.saturating_sub(self.mex_built),
                };
                choose_econ_build(&ctx, &econ_override)
            }
            BuilderKind::Nano => None,
        }
    }

    fn start_task(&mut self, index: usize, action: &BuildAction) {
        match action.kind {
            ActionKind::Reclaim => return,
            ActionKind::Assist => {
                if let Some(task_id) = self.first_factory_task() {
                    self.join_task(index, task_id);
                }
                return;
            }
            ActionKind::BuildStructure | ActionKind::ProduceUnit => {}
        }

        let Some((total_work, metal_cost, energy_cost)) = self
            .catalog
            .lookup(&action.unit)
            .map(|spec| (spec.build_time, spec.metal_cost, spec.energy_cost))
        else {
            debug!(unit = %action.unit, "Skipping unknown unit");
            return;
        };

        self.next_task_id += 1;
        let id = self.next_task_id;
        let tick = self.state.tick;
        let builder = &mut self.state.builders[index];
        builder.current_task = Some(id);
        let task = BuildTask {
            id,
            unit: action.unit.clone(),
            kind: action.kind,
            total_work,
            metal_cost,
            energy_cost,
            work_done: 0.0,
            metal_spent: 0.0,
            energy_spent: 0.0,
            walk_delay: builder.kind.walk_delay(),
            assigned: vec![builder.id.clone()],
            started_at: tick,
            completed_at: None,
            pending_bp: 0.0,
            pending_metal: 0.0,
            pending_energy: 0.0,
        };
        self.state.active_tasks.push(task);
    }

    /// Current task of the first active factory that has one.
    fn first_factory_task(&self) -> Option<TaskId> {
        self.state
            .builders
            .iter()
            .filter(|b| b.kind == BuilderKind::Factory && b.is_active)
            .find_map(|b| b.current_task)
    }

    fn assign_nano(&mut self, index: usize) {
        if self.state.builders[index].assist_target.is_none() {
            let target = self
                .state
                .builders
                .iter()
                .find(|b| b.kind == BuilderKind::Factory && b.is_active)
                .map(|b| b.id.clone());
            self.state.builders[index].assist_target = target;
        }

        let task_id = self.state.builders[index]
            .assist_target
            .as_deref()
            .and_then(|target| self.state.builder(target))
            .and_then(|factory| factory.current_task);
        if let Some(task_id) = task_id {
            self.join_task(index, task_id);
        }
    }

    fn join_task(&mut self, index: usize, task_id: TaskId) {
        let id = self.state.builders[index].id.clone();
        let joined = match self.state.task_mut(task_id) {
            Some(task) => {
                if !task.assigned.contains(&id) {
                    task.assigned.push(id);
                }
                true
            }
            None => false,
        };
        if joined {
            self.state.builders[index].current_task = Some(task_id);
        }
    }

    fn process_completions(&mut self) {
        let tick = self.state.tick;
        let (done, active): (Vec<BuildTask>, Vec<BuildTask>) =
            std::mem::take(&mut self.state.active_tasks)
                .into_iter()
                .partition(BuildTask::is_complete);
        self.state.active_tasks = active;

        for mut task in done {
            task.completed_at = Some(tick);
            self.on_complete(&task);
            self.state.completed_tasks.push(task);
        }
    }

    fn on_complete(&mut self, task: &BuildTask) {
        self.result.completion_log.push(CompletionEntry {
            tick: self.state.tick,
            unit: task.unit.clone(),
            builder: task.owner().to_string(),
        });

        match task.kind {
            ActionKind::BuildStructure => {
                *self.state.buildings.entry(task.unit.clone()).or_insert(0) += 1;
                self.on_building_complete(&task.unit);
            }
            ActionKind::ProduceUnit => {
                *self.state.units.entry(task.unit.clone()).or_insert(0) += 1;
                self.on_unit_produced(&task.unit);
            }
            ActionKind::Assist | ActionKind::Reclaim => {}
        }

        for id in &task.assigned {
            if let Some(builder) = self.state.builder_mut(id) {
                if builder.current_task == Some(task.id) {
                    builder.current_task = None;
                }
            }
        }
    }

    fn display_name(&self, key: &str) -> String {
        self.catalog
            .lookup(key)
            .map_or_else(|| key.to_string(), |spec| spec.name.clone())
    }

    fn on_building_complete(&mut self, key: &str) {
        let tick = self.state.tick;

        if is_factory(key) {
            let id = format!("factory_{}", self.factories_built);
            self.factories_built += 1;
            let bp = self
                .catalog
                .lookup(key)
                .map_or(DEFAULT_FACTORY_BP, |spec| spec.build_power);
            let queue = if self.strategy.is_some() {
                Vec::new()
            } else {
                self.build_order.factory_queue_for(&id)
            };
            self.state
                .builders
                .push(Builder::new(&id, key, BuilderKind::Factory, bp, tick).with_queue(queue));

            let description = format!("{} online", self.display_name(key));
            if is_t2_factory(key) {
                self.milestone(MilestoneKind::FirstT2Lab, &description);
            }
            self.milestone(MilestoneKind::FirstFactory, &description);
        }

        match key {
            keys::NANO => {
                let id = format!("nano_{}", self.nanos_built);
                self.nanos_built += 1;
                self.state.builders.push(Builder::new(
                    &id,
                    key,
                    BuilderKind::Nano,
                    NANO_BUILD_POWER,
                    tick,
                ));
                self.milestone(MilestoneKind::FirstNano, "Nano turret online");
            }
            keys::MEX => {
                self.mex_built += 1;
                self.result.time_to_first_mex.get_or_insert(tick);
            }
            keys::METAL_STORAGE => self.state.metal.capacity += METAL_STORAGE_BONUS,
            keys::ENERGY_STORAGE => self.state.energy.capacity += ENERGY_STORAGE_BONUS,
            _ => {}
        }
    }

    fn on_unit_produced(&mut self, key: &str) {
        let tick = self.state.tick;
        let metal_cost = self.catalog.metal_cost(key);

        if is_constructor(key) {
            self.constructors_built += 1;
            let id = format!("con_{}", self.constructors_built);
            let bp = self
                .catalog
                .lookup(key)
                .map_or(DEFAULT_CONSTRUCTOR_BP, |spec| spec.build_power);
            let queue = if self.strategy.is_some() {
                Vec::new()
            } else {
                self.build_order.constructor_queue_for(&id)
            };
            self.state.builders.push(
                Builder::new(&id, key, BuilderKind::Constructor, bp, tick).with_queue(queue),
            );
            self.state.metal.capacity += CONSTRUCTOR_STORAGE_BONUS;
            self.state.energy.capacity += CONSTRUCTOR_STORAGE_BONUS;

            let description = format!("{} produced", self.display_name(key));
            self.milestone(MilestoneKind::FirstConstructor, &description);
        } else {
            self.army_value += metal_cost;
        }

        if self.strategy.is_some() {
            self.army.record_unit(key, metal_cost);
            self.state.army_by_role = self.army.counts_by_role.clone();
        }
    }

    fn milestone(&mut self, kind: MilestoneKind, description: &str) {
        if self.result.milestone(kind).is_some() {
            return;
        }
        let tick = self.state.tick;
        self.result.milestones.push(Milestone {
            tick,
            kind,
            description: description.to_string(),
            metal_income: self.state.metal.income,
            energy_income: self.state.energy.income,
        });

        let slot = match kind {
            MilestoneKind::FirstFactory => &mut self.result.time_to_first_factory,
            MilestoneKind::FirstConstructor => &mut self.result.time_to_first_constructor,
            MilestoneKind::FirstNano => &mut self.result.time_to_first_nano,
            MilestoneKind::FirstT2Lab => &mut self.result.time_to_t2_lab,
        };
        *slot = Some(tick);
    }

    fn track_stall(&mut self) {
        let (stalled, closed) = self.stall.observe(
            self.state.tick,
            self.state.metal.stall_factor,
            self.state.energy.stall_factor,
            self.state.effective_stall_factor,
        );
        match stalled {
            Some(Resource::Metal) => self.result.metal_stall_seconds += 1,
            Some(Resource::Energy) => self.result.energy_stall_seconds += 1,
            None => {}
        }
        if let Some(event) = closed {
            self.result.stall_events.push(event);
        }
    }

    fn record_snapshot(&mut self) {
        let s = &self.state;
        self.result.snapshots.push(Snapshot {
            tick: s.tick,
            metal_income: s.metal.income,
            energy_income: s.energy.income,
            metal_stored: s.metal.stored,
            energy_stored: s.energy.stored,
            metal_expenditure: s.metal.expenditure,
            energy_expenditure: s.energy.expenditure,
            build_power: s.total_build_power(),
            army_value_metal: self.army_value,
            stall_factor: s.effective_stall_factor,
            unit_counts: s.unit_counts(),
            army_by_role: s.army_by_role.clone(),
            econ_state: s.econ_state,
        });
    }

    #[cfg(feature = "debug-validation")]
    fn validate_state(&self) {
        let s = &self.state;
        debug_assert!(
            (0.0..=s.metal.capacity).contains(&s.metal.stored),
            "metal {} outside [0, {}] at tick {}",
            s.metal.stored,
            s.metal.capacity,
            s.tick
        );
        debug_assert!(
            (0.0..=s.energy.capacity).contains(&s.energy.stored),
            "energy {} outside [0, {}] at tick {}",
            s.energy.stored,
            s.energy.capacity,
            s.tick
        );
        debug_assert!(
            (0.0..=1.0).contains(&s.effective_stall_factor),
            "stall factor {} out of range",
            s.effective_stall_factor
        );
    }
}
