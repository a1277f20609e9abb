//! Per-tick economy systems.
//!
//! Each system does one phase of the tick pipeline and reads the values
//! written by the phases before it. The engine calls them in a fixed order;
//! see [`crate::simulation`].

use rand::Rng;

use crate::build_order::MapConfig;
use crate::catalog::{keys, UnitCatalog};
use crate::economy::STALL_EVENT_THRESHOLD;
use crate::result::{Resource, StallEvent};
use crate::state::SimState;

/// Upper bound for wind speed.
pub const MAX_WIND: f64 = 25.0;

/// Angular frequency of the wind oscillation, per tick.
pub const WIND_FREQUENCY: f64 = 0.05;

/// Noise amplitude as a fraction of the wind variance.
pub const WIND_NOISE: f64 = 0.3;

/// Energy storage fill ratio at which converters switch on.
pub const CONVERTER_ACTIVATION: f64 = 0.8;

/// Energy drawn by one T1 converter per tick.
pub const CONVERTER_T1_ENERGY: f64 = 70.0;

/// Metal produced by one T1 converter per tick.
pub const CONVERTER_T1_METAL: f64 = 1.0;

/// Energy drawn by one T2 converter per tick.
pub const CONVERTER_T2_ENERGY: f64 = 600.0;

/// Metal produced by one T2 converter per tick.
pub const CONVERTER_T2_METAL: f64 = 10.3;

/// Extractor output multiplier of an advanced extractor.
pub const MOHO_MULTIPLIER: f64 = 4.0;

/// Wind speed at `tick`: a sine around the map average plus bounded noise.
///
/// The noise draw is the only consumer of the engine's random stream.
pub fn wind_speed<R: Rng>(map: &MapConfig, tick: u32, rng: &mut R) -> f64 {
    let base = map.avg_wind + map.wind_variance * (f64::from(tick) * WIND_FREQUENCY).sin();
    let spread = map.wind_variance * WIND_NOISE;
    let noise = if spread > 0.0 {
        rng.gen_range(-spread..=spread)
    } else {
        0.0
    };
    (base + noise).clamp(0.0, MAX_WIND)
}

/// Updates the current wind speed.
pub fn wind_system<R: Rng>(state: &mut SimState, map: &MapConfig, rng: &mut R) {
    state.current_wind = wind_speed(map, state.tick, rng);
}

/// Computes this tick's metal and energy income.
///
/// Converter upkeep is left out here; [`converter_system`] charges it only
/// for converters that are actually running.
///
/// # Arguments
/// * `state` - Simulation state; building and unit counts are read
/// * `map` - Map parameters for extractor, wind and tidal output
/// * `catalog` - Unit specs for fixed producers, upkeep and unit output
/// * `commander_energy` - Baseline energy from the commander
pub fn income_system(
    state: &mut SimState,
    map: &MapConfig,
    catalog: &UnitCatalog,
    commander_energy: f64,
) {
    let mex = f64::from(state.building_count(keys::MEX));
    let moho = f64::from(state.building_count(keys::MOHO));
    let metal = mex * map.mex_value + moho * map.mex_value * MOHO_MULTIPLIER;

    let mut energy = commander_energy;
    energy += f64::from(state.building_count(keys::WIND)) * state.current_wind;
    for key in keys::FIXED_ENERGY_PRODUCERS {
        let count = state.building_count(key);
        if count > 0 {
            if let Some(spec) = catalog.lookup(key) {
                energy += f64::from(count) * spec.energy_production;
            }
        }
    }
    energy += f64::from(state.building_count(keys::TIDAL)) * map.tidal_value;

    for (key, count) in &state.buildings {
        if *count == 0 || keys::CONVERTERS.contains(&key.as_str()) {
            continue;
        }
        if let Some(spec) = catalog.lookup(key) {
            energy -= f64::from(*count) * spec.energy_upkeep;
        }
    }

    for (key, count) in &state.units {
        if let Some(spec) = catalog.lookup(key) {
            energy += f64::from(*count) * spec.energy_production;
        }
    }

    state.metal.income = metal;
    state.energy.income = energy;
}

/// Computes each task's requested drain and the total expenditure.
///
/// A task still walking, or with no active build power assigned, requests
/// nothing this tick and makes no progress.
pub fn expenditure_system(state: &mut SimState) {
    let SimState {
        active_tasks,
        builders,
        metal,
        energy,
        ..
    } = state;

    let mut total_metal = 0.0;
    let mut total_energy = 0.0;

    for task in active_tasks.iter_mut() {
        task.clear_pending();
        if task.walk_delay > 0 || task.total_work <= 0.0 {
            continue;
        }

        let bp: f64 = task
            .assigned
            .iter()
            .filter_map(|id| builders.iter().find(|b| &b.id == id))
            .filter(|b| b.is_active)
            .map(|b| b.build_power)
            .sum();
        if bp <= 0.0 {
            continue;
        }

        task.pending_bp = bp;
        task.pending_metal = task.metal_cost * bp / task.total_work;
        task.pending_energy = task.energy_cost * bp / task.total_work;
        total_metal += task.pending_metal;
        total_energy += task.pending_energy;
    }

    metal.expenditure = total_metal;
    energy.expenditure = total_energy;
}

/// Computes both stall factors and the effective factor.
///
/// Returns the effective stall factor.
pub fn stall_system(state: &mut SimState) -> f64 {
    let metal = state.metal.update_stall_factor();
    let energy = state.energy.update_stall_factor();
    state.effective_stall_factor = metal.min(energy);
    state.effective_stall_factor
}

/// Applies throttled work and drain to every task past its walk delay.
///
/// Tasks still walking lose one tick of delay instead.
pub fn construction_system(state: &mut SimState) {
    let stall = state.effective_stall_factor;
    let SimState {
        active_tasks,
        metal,
        energy,
        ..
    } = state;

    for task in active_tasks.iter_mut() {
        if task.walk_delay > 0 {
            task.walk_delay -= 1;
            continue;
        }

        let metal_drain = task.pending_metal * stall;
        let energy_drain = task.pending_energy * stall;
        task.work_done += task.pending_bp * stall;
        task.metal_spent += metal_drain;
        task.energy_spent += energy_drain;
        metal.spend(metal_drain);
        energy.spend(energy_drain);
    }
}

/// Adds income to storage and clamps both pools to capacity.
pub fn resource_system(state: &mut SimState) {
    state.metal.settle();
    state.energy.settle();
}

/// Runs energy converters when energy storage is nearly full.
///
/// Converters only spend energy above half capacity; T2 units are filled
/// first. Converted metal is stored immediately and reported as income.
pub fn converter_system(state: &mut SimState) {
    let t1 = state.building_count(keys::CONVERTER_T1);
    let t2 = state.building_count(keys::CONVERTER_T2);

    if (t1 == 0 && t2 == 0) || state.energy.fill() < CONVERTER_ACTIVATION {
        state.active_converters_t1 = 0;
        state.active_converters_t2 = 0;
        return;
    }

    let mut available = state.energy.stored - state.energy.capacity * 0.5;
    let t2_active = runnable(t2, available, CONVERTER_T2_ENERGY);
    available -= f64::from(t2_active) * CONVERTER_T2_ENERGY;
    let t1_active = runnable(t1, available, CONVERTER_T1_ENERGY);

    state.active_converters_t1 = t1_active;
    state.active_converters_t2 = t2_active;

    let metal = f64::from(t1_active) * CONVERTER_T1_METAL + f64::from(t2_active) * CONVERTER_T2_METAL;
    let energy =
        f64::from(t1_active) * CONVERTER_T1_ENERGY + f64::from(t2_active) * CONVERTER_T2_ENERGY;

    state.metal.stored += metal;
    state.metal.income += metal;
    state.energy.stored -= energy;
    state.metal.clamp();
}

fn runnable(count: u32, available: f64, per_unit: f64) -> u32 {
    if available <= 0.0 {
        return 0;
    }
    let affordable = (available / per_unit).floor();
    if affordable >= f64::from(count) {
        count
    } else {
        affordable as u32
    }
}

/// Tracks the stall event currently open, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StallTracker {
    current: Option<StallEvent>,
}

impl StallTracker {
    /// Create a tracker with no open event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe one tick.
    ///
    /// Returns the deficient resource if the tick stalled, and any event
    /// that closed on this tick.
    pub fn observe(
        &mut self,
        tick: u32,
        metal_factor: f64,
        energy_factor: f64,
        effective: f64,
    ) -> (Option<Resource>, Option<StallEvent>) {
        if effective >= STALL_EVENT_THRESHOLD {
            let closed = self.current.take().map(|mut event| {
                event.end_tick = tick.saturating_sub(1).max(event.start_tick);
                event
            });
            return (None, closed);
        }

        let resource = if metal_factor < energy_factor {
            Resource::Metal
        } else {
            Resource::Energy
        };
        let severity = 1.0 - effective;

        match &mut self.current {
            Some(event) => {
                event.end_tick = tick;
                event.severity = event.severity.max(severity);
            }
            None => {
                self.current = Some(StallEvent {
                    start_tick: tick,
                    end_tick: tick,
                    resource,
                    severity,
                });
            }
        }
        (Some(resource), None)
    }

    /// Whether an event is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Close any open event at `tick`.
    pub fn finish(&mut self, tick: u32) -> Option<StallEvent> {
        self.current.take().map(|mut event| {
            event.end_tick = tick;
            event
        })
    }
}
