//! End-to-end optimizer tests: real simulations, small populations.

use bar_core::prelude::*;
use bar_optimizer::constraints::{has_factory, repair};
use bar_optimizer::operators::mutate_n;
use bar_optimizer::prelude::*;
use bar_test_utils::determinism::strategies::{arb_build_order, arb_map_config};
use bar_test_utils::fixtures::{calm_map, default_map, standard_catalog, standard_opening};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const DURATION: u32 = 300;

fn params() -> GaParams {
    GaParams::default()
        .with_population(12)
        .with_generations(6)
        .with_duration(DURATION)
}

fn greedy_baseline(objective: &Objective, map: &MapConfig) -> f64 {
    let mut seed = greedy_seed(map);
    repair(&mut seed, map);
    let ctx = EvalContext::new(standard_catalog(), map.clone()).with_duration(DURATION);
    objective.score(&ctx.run(&seed).unwrap())
}

// =============================================================================
// Build-order search
// =============================================================================

#[test]
fn test_fastest_factory_never_worse_than_greedy() {
    let objective = Objective::new(ObjectiveKind::FastestFactory);
    for map in [default_map(), calm_map()] {
        let baseline = greedy_baseline(&objective, &map);
        let outcome = optimize(
            &objective,
            standard_catalog(),
            &map,
            &params(),
            None,
            &CancelToken::new(),
        )
        .unwrap();

        assert!(
            outcome.best_score <= baseline,
            "GA {} worse than greedy {}",
            outcome.best_score,
            baseline
        );
        assert!(has_factory(&outcome.best));
    }
}

#[test]
#[ignore = "Full-size search, slow in debug builds"]
fn test_full_size_search_matches_greedy_factory_time() {
    let map = default_map();
    let mut greedy = greedy_seed(&map);
    repair(&mut greedy, &map);
    let ctx = EvalContext::new(standard_catalog(), map.clone()).with_duration(DURATION);
    let greedy_factory = ctx.run(&greedy).unwrap().time_to_first_factory;
    assert!(greedy_factory.is_some());

    let params = GaParams::default()
        .with_population(60)
        .with_generations(100)
        .with_duration(DURATION)
        .with_seed(42);
    let outcome = optimize(
        &Objective::new(ObjectiveKind::FastestFactory),
        standard_catalog(),
        &map,
        &params,
        None,
        &CancelToken::new(),
    )
    .unwrap();

    let best_factory = ctx.run(&outcome.best).unwrap().time_to_first_factory;
    assert!(best_factory.is_some());
    assert!(best_factory <= greedy_factory);
    assert_eq!(outcome.history.len(), 101);
}

#[test]
fn test_history_is_monotonic_for_minimizing_objective() {
    let outcome = optimize(
        &Objective::new(ObjectiveKind::MinStall),
        standard_catalog(),
        &default_map(),
        &params(),
        None,
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(outcome.history.len(), 7);
    assert!(outcome.history.windows(2).all(|w| w[1] <= w[0]));
    assert_eq!(outcome.history.last().copied(), Some(outcome.best_score));
}

#[test]
fn test_ranked_population_is_sorted_best_first() {
    let objective = Objective::new(ObjectiveKind::MaxMetal);
    let outcome = optimize(
        &objective,
        standard_catalog(),
        &default_map(),
        &params(),
        None,
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(outcome.ranked.len(), 12);
    assert!(outcome
        .ranked
        .windows(2)
        .all(|w| objective.rank(w[0].score, w[1].score) != std::cmp::Ordering::Greater));
    assert!(outcome.best_score >= outcome.ranked[0].score);
}

#[test]
fn test_anchor_order_is_kept_in_play() {
    let objective = Objective::new(ObjectiveKind::MaxArmy);
    let anchor = standard_opening();
    let ctx = EvalContext::new(standard_catalog(), default_map()).with_duration(DURATION);
    let mut repaired = anchor.clone();
    repair(&mut repaired, &default_map());
    let anchor_score = objective.score(&ctx.run(&repaired).unwrap());

    let outcome = optimize(
        &objective,
        standard_catalog(),
        &default_map(),
        &params(),
        Some(&anchor),
        &CancelToken::new(),
    )
    .unwrap();

    assert!(outcome.best_score >= anchor_score);
    assert_eq!(outcome.best.name, "Optimized (max_army)");
}

#[test]
fn test_same_seed_reproduces_run() {
    let run = |seed| {
        optimize(
            &Objective::new(ObjectiveKind::Balanced),
            standard_catalog(),
            &default_map(),
            &params().with_seed(seed),
            None,
            &CancelToken::new(),
        )
        .unwrap()
    };
    let a = run(7);
    let b = run(7);
    assert_eq!(a.best, b.best);
    assert_eq!(a.history, b.history);
    assert_eq!(a.catastrophes, b.catastrophes);
}

#[test]
fn test_catastrophe_fires_when_stagnant() {
    let params = GaParams {
        stagnation_limit: 1,
        catastrophe_limit: 2,
        ..params().with_generations(8)
    };
    let outcome = optimize(
        &Objective::new(ObjectiveKind::FastestFactory),
        standard_catalog(),
        &default_map(),
        &params,
        None,
        &CancelToken::new(),
    )
    .unwrap();

    // Only eight strict improvements in a row avoid a restart.
    assert!(outcome.catastrophes >= 1 || outcome.history.windows(2).all(|w| w[1] < w[0]));
}

#[test]
fn test_invalid_params_are_rejected() {
    let result = optimize(
        &Objective::new(ObjectiveKind::MaxMetal),
        standard_catalog(),
        &default_map(),
        &GaParams::default().with_population(1),
        None,
        &CancelToken::new(),
    );
    assert!(matches!(result, Err(OptimizerError::InvalidParams(_))));
}

#[test]
fn test_cancelled_token_returns_initial_best() {
    let cancel = CancelToken::new();
    let clone = cancel.clone();
    clone.cancel();
    assert!(cancel.is_cancelled());

    let outcome = optimize(
        &Objective::new(ObjectiveKind::MaxMetal),
        standard_catalog(),
        &default_map(),
        &params(),
        None,
        &cancel,
    )
    .unwrap();
    assert!(outcome.cancelled);
    assert_eq!(outcome.generations_run, 0);
    assert_eq!(outcome.history, vec![outcome.best_score]);
}

// =============================================================================
// Strategy search
// =============================================================================

#[test]
fn test_strategy_search_reaches_goal() {
    let goal = GoalSpec::new(GoalKind::StructureBuild {
        unit: "mex".to_string(),
        count: 2,
    })
    .unwrap();
    let ctx = EvalContext::new(standard_catalog(), default_map()).with_goal(goal);
    let params = GaParams::strategy_defaults()
        .with_population(8)
        .with_generations(3)
        .with_duration(600);

    let outcome = optimize_strategy(
        &Objective::new(ObjectiveKind::FastestGoal),
        &ctx,
        &params,
        Some(&StrategyGenome::from_config(&StrategyConfig::default())),
        &CancelToken::new(),
    )
    .unwrap();

    assert!(outcome.best_score < 9999.0, "goal never completed");
    assert!(outcome.best.to_config().validate().is_ok());
}

#[test]
fn test_strategy_search_is_reproducible() {
    let ctx = EvalContext::new(standard_catalog(), calm_map());
    let params = GaParams::strategy_defaults()
        .with_population(6)
        .with_generations(2)
        .with_duration(240);
    let objective = Objective::new(ObjectiveKind::BestComposition).with_target_tick(240);

    let a = optimize_strategy(&objective, &ctx, &params, None, &CancelToken::new()).unwrap();
    let b = optimize_strategy(&objective, &ctx, &params, None, &CancelToken::new()).unwrap();
    assert_eq!(a.best, b.best);
    assert_eq!(a.history, b.history);
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Repair always yields a factory and respects the spot count.
    #[test]
    fn prop_repair_makes_orders_feasible(
        order in arb_build_order(),
        map in arb_map_config(),
        mutations in 0usize..20,
        seed in any::<u64>(),
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut order = order;
        mutate_n(&mut order, mutations, &mut rng);
        repair(&mut order, &map);

        prop_assert!(has_factory(&order));
        prop_assert!(order.mex_count() <= map.mex_spots);
        if !map.has_geo {
            prop_assert!(order.commander_queue.iter().all(|a| a.unit != keys::GEO));
        }
    }

    /// Repairing twice changes nothing.
    #[test]
    fn prop_repair_is_idempotent(order in arb_build_order(), map in arb_map_config()) {
        let mut once = order;
        repair(&mut once, &map);
        let mut twice = once.clone();
        repair(&mut twice, &map);
        prop_assert_eq!(once, twice);
    }

    /// Strategy genomes always decode to valid configurations.
    #[test]
    fn prop_strategy_genomes_decode_valid(genes in proptest::array::uniform8(-50i32..150)) {
        let genome = StrategyGenome { genes };
        prop_assert!(genome.to_config().validate().is_ok());
    }
}
