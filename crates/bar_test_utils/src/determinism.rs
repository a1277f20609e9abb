//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Optimizer scores are only comparable if every run of the same build
//! order is bit-identical. Sources of non-determinism include:
//!
//! - **Randomness**: the engine owns exactly one seeded stream, consumed
//!   only by wind noise. Nothing may call an unseeded generator.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Every keyed collection in state and results is a `BTreeMap`.
//!
//! - **Iteration over builders and tasks**: always creation order.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual systems (income, stall, converters)
//! 2. **Property tests**: random build orders must still be reproducible
//! 3. **Integration tests**: full scenarios are reproducible
//! 4. **Parallel tests**: N runs on N threads all match

use std::sync::Arc;
use std::thread;

use bar_core::build_order::BuildOrder;
use bar_core::catalog::UnitCatalog;
use bar_core::error::Result;
use bar_core::simulation::{simulate, SimulationEngine};

/// `state_hash` of every run of one build order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHashes {
    /// Build order name, for failure messages.
    pub build_order: String,
    /// Simulated duration of each run.
    pub duration: u32,
    /// One hash per run, in run order.
    pub hashes: Vec<u64>,
}

impl RunHashes {
    /// True when every run hashed the same.
    #[must_use]
    pub fn all_match(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// # Panics
    ///
    /// Panics with the hashes of every run if any two differ.
    pub fn assert_deterministic(&self) {
        assert!(
            self.all_match(),
            "'{}' is non-deterministic over {} ticks: {:?}",
            self.build_order,
            self.duration,
            self.hashes
        );
    }
}

/// Simulate a build order `runs` times in sequence.
///
/// # Example
///
/// ```
/// use bar_test_utils::determinism::verify_build_order_determinism;
/// use bar_test_utils::fixtures::{standard_catalog, standard_opening};
///
/// let runs =
///     verify_build_order_determinism(&standard_opening(), &standard_catalog(), 300, 42, 3)
///         .unwrap();
/// runs.assert_deterministic();
/// ```
pub fn verify_build_order_determinism(
    order: &BuildOrder,
    catalog: &Arc<UnitCatalog>,
    duration: u32,
    seed: u64,
    runs: usize,
) -> Result<RunHashes> {
    let hashes = (0..runs)
        .map(|_| simulate(order, Arc::clone(catalog), duration, seed).map(|r| r.state_hash()))
        .collect::<Result<Vec<_>>>()?;
    Ok(RunHashes {
        build_order: order.name.clone(),
        duration,
        hashes,
    })
}

/// Simulate the same build order on `num_sims` scoped threads.
///
/// A run that fails to start contributes a hash of zero, which will
/// not match any successful run.
pub fn run_parallel_simulations(
    order: &BuildOrder,
    catalog: &Arc<UnitCatalog>,
    num_sims: usize,
    duration: u32,
    seed: u64,
) -> RunHashes {
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                let catalog = Arc::clone(catalog);
                s.spawn(move || {
                    simulate(order, catalog, duration, seed).map_or(0, |r| r.state_hash())
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or(0))
            .collect()
    });

    RunHashes {
        build_order: order.name.clone(),
        duration,
        hashes,
    }
}

/// Step two engines side by side and report the first tick whose states
/// differ.
///
/// Returns `Ok(None)` if the runs never diverge.
pub fn find_first_divergence(
    order: &BuildOrder,
    catalog: &Arc<UnitCatalog>,
    duration: u32,
    seed: u64,
) -> Result<Option<u32>> {
    let mut a = SimulationEngine::new(order, Arc::clone(catalog), duration, seed)?;
    let mut b = SimulationEngine::new(order, Arc::clone(catalog), duration, seed)?;

    if a.state() != b.state() {
        return Ok(Some(0));
    }
    while !a.is_finished() {
        a.step();
        b.step();
        if a.state() != b.state() {
            let tick = a.state().tick;
            tracing::warn!(tick, build_order = %order.name, "Simulation runs diverged");
            return Ok(Some(tick));
        }
    }
    Ok(None)
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of the engine.
pub mod strategies {
    use proptest::prelude::*;

    use bar_core::build_order::{BuildAction, BuildOrder, MapConfig};
    use bar_core::strategy::{StrategyConfig, StrategyOption, UnitComposition};

    /// Structures a commander or constructor might queue, including one
    /// key the catalog does not know.
    pub const STRUCTURE_KEYS: &[&str] = &[
        "mex",
        "wind",
        "solar",
        "bot_lab",
        "vehicle_plant",
        "nano",
        "radar",
        "llt",
        "energy_storage",
        "metal_storage",
        "converter_t1",
        "adv_solar",
        "not_a_unit",
    ];

    /// Units a factory might queue.
    pub const PRODUCIBLE_KEYS: &[&str] =
        &["tick", "pawn", "grunt", "rocketer", "con_bot", "flash", "con_vehicle"];

    /// Generate a structure key.
    pub fn arb_structure() -> impl Strategy<Value = &'static str> {
        proptest::sample::select(STRUCTURE_KEYS)
    }

    /// Generate a producible unit key.
    pub fn arb_producible() -> impl Strategy<Value = &'static str> {
        proptest::sample::select(PRODUCIBLE_KEYS)
    }

    /// Generate map parameters in plausible ranges.
    pub fn arb_map_config() -> impl Strategy<Value = MapConfig> {
        (0.0f64..20.0, 0.0f64..6.0, 0.5f64..3.5, 0u32..12, any::<bool>()).prop_map(
            |(wind, variance, mex_value, spots, geo)| {
                MapConfig::default()
                    .with_wind(wind, variance)
                    .with_mex(mex_value, spots)
                    .with_geo(geo)
            },
        )
    }

    /// Generate a static build order with commander, factory and
    /// constructor queues.
    pub fn arb_build_order() -> impl Strategy<Value = BuildOrder> {
        (
            prop::collection::vec(arb_structure(), 0..14),
            prop::collection::vec(arb_producible(), 0..10),
            prop::collection::vec(arb_structure(), 0..8),
            arb_map_config(),
        )
            .prop_map(|(commander, factory, constructor, map)| {
                let mut order = BuildOrder::new("proptest").with_map(map);
                order.commander_queue = commander.into_iter().map(BuildAction::structure).collect();
                order
                    .factory_queues
                    .insert("factory_0".into(), factory.into_iter().map(BuildAction::produce).collect());
                order.constructor_queues.insert(
                    "con_1".into(),
                    constructor.into_iter().map(BuildAction::structure).collect(),
                );
                order
            })
    }

    /// Generate a strategy configuration.
    pub fn arb_strategy_config() -> impl Strategy<Value = StrategyConfig> {
        (1u32..=4, 0usize..3, 0usize..4, 0u32..=100).prop_map(|(mex, comp, role, balance)| {
            StrategyConfig {
                opening_mex_count: mex,
                unit_composition: UnitComposition::from_index(comp),
                role: StrategyOption::from_index(role),
                econ_army_balance: balance,
                ..Default::default()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{standard_catalog, standard_opening};

    #[test]
    #[should_panic(expected = "non-deterministic")]
    fn test_mismatched_hashes_panic() {
        RunHashes {
            build_order: "x".into(),
            duration: 5,
            hashes: vec![1, 2],
        }
        .assert_deterministic();
    }

    #[test]
    fn test_sequential_runs_record_name() {
        let runs =
            verify_build_order_determinism(&standard_opening(), &standard_catalog(), 60, 3, 2)
                .unwrap();
        assert_eq!(runs.build_order, "Standard Bot Opening");
        assert_eq!(runs.hashes.len(), 2);
        assert!(runs.all_match());
    }
}
