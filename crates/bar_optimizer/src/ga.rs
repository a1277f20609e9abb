//! The genetic algorithm.
//!
//! Children are bred sequentially from one seeded generator, then scored in
//! parallel with rayon. Scores depend only on the individual, so a run is
//! reproducible for a given seed regardless of thread count.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use bar_core::build_order::{BuildOrder, MapConfig};
use bar_core::catalog::UnitCatalog;

use crate::error::{OptimizerError, Result};
use crate::genome::{EvalContext, Genome};
use crate::objective::Objective;
use crate::strategy_genome::StrategyGenome;

/// Mutation rate never decays below this.
pub const MUTATION_FLOOR: f64 = 0.05;

/// Rates at or above this apply one to three mutations instead of one.
const MULTI_MUTATION_RATE: f64 = 0.6;

/// Generations between progress log lines.
const PROGRESS_INTERVAL: u32 = 10;

/// GA hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaParams {
    /// Individuals per generation.
    pub population_size: usize,
    /// Generations to run.
    pub generations: u32,
    /// Top individuals carried over unchanged (capped at half the population).
    pub elitism: usize,
    /// Individuals sampled per tournament.
    pub tournament_size: usize,
    /// Starting mutation probability.
    pub mutation_rate: f64,
    /// Per-generation decay factor of the mutation probability.
    pub mutation_decay: f64,
    /// Probability that two parents are recombined.
    pub crossover_rate: f64,
    /// Stagnant generations before hyper-mutation.
    pub stagnation_limit: u32,
    /// Stagnant generations before a catastrophic restart.
    pub catastrophe_limit: u32,
    /// Mutation probability during hyper-mutation.
    pub hyper_mutation_rate: f64,
    /// Ticks each candidate is simulated for.
    pub duration: u32,
    /// Seed of the GA's own random stream.
    pub seed: u64,
}

impl Default for GaParams {
    fn default() -> Self {
        Self {
            population_size: 60,
            generations: 200,
            elitism: 4,
            tournament_size: 5,
            mutation_rate: 0.4,
            mutation_decay: 0.995,
            crossover_rate: 0.7,
            stagnation_limit: 25,
            catastrophe_limit: 50,
            hyper_mutation_rate: 0.9,
            duration: 600,
            seed: 42,
        }
    }
}

impl GaParams {
    /// Defaults for strategy searches: smaller population, always cross,
    /// constant mutation probability.
    #[must_use]
    pub fn strategy_defaults() -> Self {
        Self {
            population_size: 40,
            generations: 80,
            elitism: 2,
            crossover_rate: 1.0,
            mutation_rate: 0.5,
            mutation_decay: 1.0,
            ..Self::default()
        }
    }

    /// Load parameters from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(OptimizerError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Parse parameters from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let params: Self = ron::from_str(ron)?;
        Ok(params)
    }

    /// Set population size.
    pub fn with_population(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    /// Set generation count.
    pub fn with_generations(mut self, generations: u32) -> Self {
        self.generations = generations;
        self
    }

    /// Set the GA seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the simulated duration.
    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    /// Reject parameters the loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.population_size < 2 {
            return Err(OptimizerError::InvalidParams(format!(
                "population_size must be at least 2, got {}",
                self.population_size
            )));
        }
        if self.tournament_size == 0 {
            return Err(OptimizerError::InvalidParams(
                "tournament_size must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("mutation_rate", self.mutation_rate),
            ("crossover_rate", self.crossover_rate),
            ("hyper_mutation_rate", self.hyper_mutation_rate),
            ("mutation_decay", self.mutation_decay),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(OptimizerError::InvalidParams(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }

    fn effective_elitism(&self) -> usize {
        self.elitism.min(self.population_size / 2)
    }

    fn effective_tournament(&self) -> usize {
        self.tournament_size.min(self.population_size)
    }
}

/// Cooperative cancellation, checked once per generation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// An individual and its score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scored<G> {
    /// Objective value.
    pub score: f64,
    /// The individual.
    pub genome: G,
}

/// What a GA run returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationOutcome<G> {
    /// Best individual seen in any generation.
    pub best: G,
    /// Its score.
    pub best_score: f64,
    /// Best score after initialization and after each generation.
    pub history: Vec<f64>,
    /// Catastrophic restarts performed.
    pub catastrophes: u32,
    /// Generations completed.
    pub generations_run: u32,
    /// Whether the run stopped on a cancel request.
    pub cancelled: bool,
    /// Last population, best first.
    pub ranked: Vec<Scored<G>>,
}

impl<G> OptimizationOutcome<G> {
    /// The `n` best individuals of the last population.
    #[must_use]
    pub fn top(&self, n: usize) -> &[Scored<G>] {
        &self.ranked[..n.min(self.ranked.len())]
    }
}

fn evaluate<G: Genome>(genome: &G, ctx: &EvalContext, objective: &Objective) -> f64 {
    match genome.simulate(ctx) {
        Ok(result) => objective.score(&result),
        Err(e) => {
            warn!(error = %e, "Evaluation failed, scoring as worst");
            objective.worst_score()
        }
    }
}

fn evaluate_all<G: Genome>(
    genomes: Vec<G>,
    ctx: &EvalContext,
    objective: &Objective,
) -> Vec<Scored<G>> {
    genomes
        .into_par_iter()
        .map(|genome| Scored {
            score: evaluate(&genome, ctx, objective),
            genome,
        })
        .collect()
}

fn sort_population<G>(population: &mut [Scored<G>], objective: &Objective) {
    population.sort_by(|a, b| objective.rank(a.score, b.score));
}

fn tournament<'a, G, R: Rng + ?Sized>(
    population: &'a [Scored<G>],
    size: usize,
    objective: &Objective,
    rng: &mut R,
) -> Option<&'a G> {
    population
        .choose_multiple(rng, size)
        .min_by(|a, b| objective.rank(a.score, b.score))
        .map(|s| &s.genome)
}

/// Run the GA over any genome type.
///
/// The returned best is the best individual seen in any generation, so
/// `history` never gets worse.
pub fn run_ga<G: Genome>(
    objective: &Objective,
    ctx: &EvalContext,
    params: &GaParams,
    anchor: Option<&G>,
    cancel: &CancelToken,
) -> Result<OptimizationOutcome<G>> {
    params.validate()?;
    let size = params.population_size;
    let elitism = params.effective_elitism();
    let tournament_size = params.effective_tournament();
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);

    info!(
        objective = %objective,
        population = size,
        generations = params.generations,
        elitism,
        tournament = tournament_size,
        "Starting optimization"
    );

    let mut population = evaluate_all(G::seed_population(ctx, &mut rng, size, anchor), ctx, objective);
    sort_population(&mut population, objective);
    let Some(first) = population.first() else {
        return Err(OptimizerError::InvalidParams("empty initial population".to_string()));
    };
    let mut best = first.genome.clone();
    let mut best_score = first.score;
    let mut history = vec![best_score];
    info!(best = best_score, "Initial population evaluated");

    let mut mutation_rate = params.mutation_rate;
    let mut stagnation = 0u32;
    let mut catastrophes = 0u32;
    let mut generations_run = 0u32;
    let mut cancelled = false;

    for generation in 1..=params.generations {
        if cancel.is_cancelled() {
            info!(generation, "Optimization cancelled");
            cancelled = true;
            break;
        }

        mutation_rate = if stagnation >= params.stagnation_limit {
            params.hyper_mutation_rate
        } else {
            (mutation_rate * params.mutation_decay).max(MUTATION_FLOOR)
        };

        let mut next: Vec<Scored<G>> = population.iter().take(elitism).cloned().collect();
        let mut children = Vec::with_capacity(size - next.len());

        while next.len() + children.len() < size {
            let (Some(p1), Some(p2)) = (
                tournament(&population, tournament_size, objective, &mut rng),
                tournament(&population, tournament_size, objective, &mut rng),
            ) else {
                break;
            };

            let (c1, c2) = if rng.gen::<f64>() < params.crossover_rate {
                p1.crossover(p2, &mut rng)
            } else {
                (p1.clone(), p2.clone())
            };

            for mut child in [c1, c2] {
                if next.len() + children.len() >= size {
                    break;
                }
                if rng.gen::<f64>() < mutation_rate {
                    let count = if mutation_rate < MULTI_MUTATION_RATE {
                        1
                    } else {
                        rng.gen_range(1..=3)
                    };
                    for _ in 0..count {
                        child.mutate(&mut rng);
                    }
                }
                child.repair(&ctx.map);
                children.push(child);
            }
        }

        next.extend(evaluate_all(children, ctx, objective));
        population = next;
        sort_population(&mut population, objective);

        let generation_best = population[0].score;
        if objective.is_better(generation_best, best_score) {
            best_score = generation_best;
            best = population[0].genome.clone();
            stagnation = 0;
            info!(generation, best = best_score, "New best");
        } else {
            stagnation += 1;
        }
        history.push(best_score);
        generations_run = generation;

        if generation % PROGRESS_INTERVAL == 0 {
            debug!(
                generation,
                best = best_score,
                generation_best,
                mutation_rate,
                stagnation,
                "Generation complete"
            );
        }

        if stagnation >= params.catastrophe_limit {
            catastrophes += 1;
            info!(generation, stagnation, catastrophes, "Catastrophic restart");
            population = evaluate_all(
                G::seed_population(ctx, &mut rng, size, Some(&best)),
                ctx,
                objective,
            );
            sort_population(&mut population, objective);
            mutation_rate = params.mutation_rate;
            stagnation = 0;
        }
    }

    info!(
        best = best_score,
        generations = generations_run,
        catastrophes,
        "Optimization finished"
    );

    Ok(OptimizationOutcome {
        best,
        best_score,
        history,
        catastrophes,
        generations_run,
        cancelled,
        ranked: population,
    })
}

/// Search build orders for `objective` on `map`.
///
/// `anchor` seeds the population with a user build order and variants of
/// it. The best order is renamed `Optimized (<objective>)`.
pub fn optimize(
    objective: &Objective,
    catalog: Arc<UnitCatalog>,
    map: &MapConfig,
    params: &GaParams,
    anchor: Option<&BuildOrder>,
    cancel: &CancelToken,
) -> Result<OptimizationOutcome<BuildOrder>> {
    let ctx = EvalContext::new(catalog, map.clone()).with_duration(params.duration);
    let mut outcome = run_ga(objective, &ctx, params, anchor, cancel)?;
    outcome.best.name = format!("Optimized ({objective})");
    outcome.best.map = map.clone();
    Ok(outcome)
}

/// Search strategy configurations for `objective` on `map`.
///
/// Goals in `ctx` are queued before every run, which is what
/// [`crate::objective::ObjectiveKind::FastestGoal`] measures.
pub fn optimize_strategy(
    objective: &Objective,
    ctx: &EvalContext,
    params: &GaParams,
    anchor: Option<&StrategyGenome>,
    cancel: &CancelToken,
) -> Result<OptimizationOutcome<StrategyGenome>> {
    let ctx = ctx.clone().with_duration(params.duration);
    run_ga(objective, &ctx, params, anchor, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::ObjectiveKind;

    fn catalog() -> Arc<UnitCatalog> {
        Arc::new(UnitCatalog::standard())
    }

    fn small() -> GaParams {
        GaParams::default()
            .with_population(8)
            .with_generations(4)
            .with_duration(300)
    }

    #[test]
    fn test_params_validation() {
        assert!(GaParams::default().validate().is_ok());
        assert!(GaParams::default().with_population(1).validate().is_err());
        let zero_tournament = GaParams {
            tournament_size: 0,
            ..GaParams::default()
        };
        assert!(zero_tournament.validate().is_err());
        let bad_rate = GaParams {
            mutation_rate: 1.5,
            ..GaParams::default()
        };
        assert!(matches!(bad_rate.validate(), Err(OptimizerError::InvalidParams(_))));
    }

    #[test]
    fn test_params_from_ron_fill_defaults() {
        let params = GaParams::from_ron_str("(population_size: 12, generations: 3)").unwrap();
        assert_eq!(params.population_size, 12);
        assert_eq!(params.generations, 3);
        assert_eq!(params.tournament_size, 5);
    }

    #[test]
    fn test_effective_caps() {
        let params = GaParams {
            elitism: 10,
            tournament_size: 50,
            ..GaParams::default().with_population(6)
        };
        assert_eq!(params.effective_elitism(), 3);
        assert_eq!(params.effective_tournament(), 6);
    }

    #[test]
    fn test_cancel_before_first_generation() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = optimize(
            &Objective::new(ObjectiveKind::MaxMetal),
            catalog(),
            &MapConfig::default(),
            &small(),
            None,
            &cancel,
        )
        .unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.generations_run, 0);
        assert_eq!(outcome.history.len(), 1);
    }

    #[test]
    fn test_small_run_history_and_naming() {
        let outcome = optimize(
            &Objective::new(ObjectiveKind::Balanced),
            catalog(),
            &MapConfig::default(),
            &small(),
            None,
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(outcome.best.name, "Optimized (balanced)");
        assert_eq!(outcome.history.len(), 5);
        assert!(outcome.history.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(outcome.ranked.len(), 8);
        assert_eq!(outcome.top(3).len(), 3);
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let run = || {
            optimize(
                &Objective::new(ObjectiveKind::MaxMetal),
                catalog(),
                &MapConfig::default(),
                &small(),
                None,
                &CancelToken::new(),
            )
            .unwrap()
        };
        let a = run();
        let b = run();
        assert_eq!(a.best, b.best);
        assert_eq!(a.history, b.history);
    }

    #[test]
    fn test_strategy_search_runs() {
        let ctx = EvalContext::new(catalog(), MapConfig::default());
        let params = GaParams::strategy_defaults()
            .with_population(6)
            .with_generations(2)
            .with_duration(240);
        let outcome = optimize_strategy(
            &Objective::new(ObjectiveKind::MaxEcoStrat).with_target_tick(240),
            &ctx,
            &params,
            None,
            &CancelToken::new(),
        )
        .unwrap();
        assert!(outcome.best.to_config().validate().is_ok());
        assert_eq!(outcome.history.len(), 3);
    }
}
