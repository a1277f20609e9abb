//! What the GA evolves.
//!
//! The search loop in [`crate::ga`] is generic over [`Genome`]. Build orders
//! implement it directly; strategy searches use
//! [`crate::strategy_genome::StrategyGenome`].

use std::sync::Arc;

use rand::Rng;

use bar_core::build_order::{BuildOrder, MapConfig};
use bar_core::catalog::UnitCatalog;
use bar_core::error::Result;
use bar_core::goals::GoalSpec;
use bar_core::result::SimResult;
use bar_core::simulation::{SimulationEngine, DEFAULT_DURATION, DEFAULT_SEED};

use crate::constraints::repair;
use crate::operators::{mutate_n, Crossover};
use crate::seeds::{greedy_seed, random_seed};

/// Most variants of the anchor individual seeded into a population.
const MAX_ANCHOR_VARIANTS: usize = 5;

/// Everything an individual needs to be simulated.
#[derive(Debug, Clone)]
pub struct EvalContext {
    /// Unit catalog shared by every run.
    pub catalog: Arc<UnitCatalog>,
    /// Map every candidate is played on.
    pub map: MapConfig,
    /// Ticks per run.
    pub duration: u32,
    /// Wind seed of every run, so scores are comparable.
    pub sim_seed: u64,
    /// Goals queued before each run (strategy mode only).
    pub goals: Vec<GoalSpec>,
}

impl EvalContext {
    /// Context with default duration and wind seed.
    #[must_use]
    pub fn new(catalog: Arc<UnitCatalog>, map: MapConfig) -> Self {
        Self {
            catalog,
            map,
            duration: DEFAULT_DURATION,
            sim_seed: DEFAULT_SEED,
            goals: Vec::new(),
        }
    }

    /// Set ticks per run.
    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    /// Queue a goal before every run.
    pub fn with_goal(mut self, goal: GoalSpec) -> Self {
        self.goals.push(goal);
        self
    }

    /// Simulate `order` under this context.
    pub fn run(&self, order: &BuildOrder) -> Result<SimResult> {
        let mut engine =
            SimulationEngine::new(order, Arc::clone(&self.catalog), self.duration, self.sim_seed)?;
        for goal in &self.goals {
            engine.add_goal(goal.clone());
        }
        Ok(engine.run())
    }
}

/// An individual the GA can breed and score.
pub trait Genome: Clone + Send + Sync {
    /// Build an initial population of `size`, optionally centered on `anchor`.
    fn seed_population<R: Rng + ?Sized>(
        ctx: &EvalContext,
        rng: &mut R,
        size: usize,
        anchor: Option<&Self>,
    ) -> Vec<Self>;

    /// Recombine two parents into two children.
    fn crossover<R: Rng + ?Sized>(&self, other: &Self, rng: &mut R) -> (Self, Self);

    /// Apply one random mutation.
    fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R);

    /// Make the individual feasible on `map`.
    fn repair(&mut self, map: &MapConfig);

    /// Run the simulation this individual describes.
    fn simulate(&self, ctx: &EvalContext) -> Result<SimResult>;
}

impl Genome for BuildOrder {
    /// One third greedy seeds (the first unmutated, the rest lightly
    /// mutated), the anchor and a few mutated variants of it, then random
    /// openings.
    fn seed_population<R: Rng + ?Sized>(
        ctx: &EvalContext,
        rng: &mut R,
        size: usize,
        anchor: Option<&Self>,
    ) -> Vec<Self> {
        let mut population = Vec::with_capacity(size);

        for i in 0..size / 3 {
            let mut order = greedy_seed(&ctx.map);
            if i > 0 {
                let count = rng.gen_range(0..=3);
                mutate_n(&mut order, count, rng);
            }
            repair(&mut order, &ctx.map);
            population.push(order);
        }

        if let Some(anchor) = anchor {
            let mut base = anchor.clone();
            repair(&mut base, &ctx.map);
            population.push(base);

            for _ in 0..MAX_ANCHOR_VARIANTS.min(size / 6) {
                let mut variant = anchor.clone();
                let count = rng.gen_range(1..=4);
                mutate_n(&mut variant, count, rng);
                repair(&mut variant, &ctx.map);
                population.push(variant);
            }
        }

        while population.len() < size {
            let mut order = random_seed(&ctx.map, rng);
            repair(&mut order, &ctx.map);
            population.push(order);
        }

        population.truncate(size);
        population
    }

    fn crossover<R: Rng + ?Sized>(&self, other: &Self, rng: &mut R) -> (Self, Self) {
        Crossover::random(rng).apply(self, other, rng)
    }

    fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        mutate_n(self, 1, rng);
    }

    fn repair(&mut self, map: &MapConfig) {
        repair(self, map);
    }

    fn simulate(&self, ctx: &EvalContext) -> Result<SimResult> {
        ctx.run(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::has_factory;
    use bar_core::build_order::BuildAction;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ctx() -> EvalContext {
        EvalContext::new(Arc::new(UnitCatalog::standard()), MapConfig::default())
    }

    #[test]
    fn test_population_is_repaired_and_sized() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let ctx = ctx();
        let population = BuildOrder::seed_population(&ctx, &mut rng, 30, None);
        assert_eq!(population.len(), 30);
        for order in &population {
            assert!(has_factory(order));
            assert!(order.mex_count() <= ctx.map.mex_spots);
        }
    }

    #[test]
    fn test_first_individual_is_repaired_greedy_seed() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let ctx = ctx();
        let population = BuildOrder::seed_population(&ctx, &mut rng, 12, None);
        let mut expected = greedy_seed(&ctx.map);
        repair(&mut expected, &ctx.map);
        assert_eq!(population[0], expected);
    }

    #[test]
    fn test_anchor_is_included() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let ctx = ctx();
        let anchor = BuildOrder::new("Mine").with_commander(&["mex", "solar", "vehicle_plant"]);
        let population = BuildOrder::seed_population(&ctx, &mut rng, 12, Some(&anchor));
        assert_eq!(population[4], anchor);
    }

    #[test]
    fn test_repeated_mex_anchor_is_capped() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let ctx = ctx();
        let mut anchor = BuildOrder::new("Greedy");
        anchor.commander_queue = vec![
            BuildAction::structure("mex").times(8),
            BuildAction::structure("bot_lab"),
        ];
        let population = BuildOrder::seed_population(&ctx, &mut rng, 12, Some(&anchor));

        assert_eq!(population[4].mex_count(), ctx.map.mex_spots);
        for order in &population {
            assert!(order.mex_count() <= ctx.map.mex_spots);
        }
    }

    #[test]
    fn test_context_runs_goals() {
        let ctx = ctx()
            .with_duration(120)
            .with_goal(GoalSpec::new(bar_core::goals::GoalKind::TechTransition).unwrap());
        let result = ctx.run(&greedy_seed(&MapConfig::default())).unwrap();
        assert_eq!(result.total_ticks, 120);
    }
}
