//! Build-order simulator command line.
//!
//! Reports go to stdout, logs to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Simulate a build order for ten minutes
//! bar_sim simulate data/build_orders/standard_opening.ron
//!
//! # Strategy mode with goals
//! bar_sim simulate opening.ron --strategy "role=aggro,composition=vehicles" --goal unit:grunt:10
//!
//! # Compare build orders side by side
//! bar_sim compare a.ron b.ron c.ron --duration 420
//!
//! # Search build orders
//! bar_sim optimize --objective max_metal --target-time 300 --map comet_catcher --output best.ron
//!
//! # Search strategies for a goal
//! bar_sim optimize-strategy --objective fastest_goal --goal structure:mex:6
//!
//! # Check that repeated runs agree
//! bar_sim verify opening.ron --runs 8
//! ```

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bar_core::build_order::{BuildOrder, MapConfig};
use bar_core::catalog::UnitCatalog;
use bar_core::factions::Faction;
use bar_core::goals::GoalSpec;
use bar_core::result::SimResult;
use bar_core::simulation::{simulate, SimulationEngine, DEFAULT_DURATION, DEFAULT_SEED};
use bar_optimizer::ga::{optimize, optimize_strategy, CancelToken, GaParams};
use bar_optimizer::genome::EvalContext;
use bar_optimizer::objective::Objective;

use bar_headless::{
    catalog_loader::CatalogCache,
    compare::compare_report,
    io::{
        export_build_order_json, export_result_json, format_entry, load_build_order,
        save_build_order,
    },
    maps::{default_maps_dir, MapRegistry},
    parse::{parse_goal_spec, parse_strategy},
    report::{fmt_rate, fmt_time, full_report},
};

/// Generations when neither a parameter file nor `--generations` says otherwise.
const DEFAULT_GENERATIONS: u32 = 100;

#[derive(Parser)]
#[command(name = "bar_sim")]
#[command(about = "Build-order economy simulator and optimizer")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Faction whose unit catalog is used (armada or cortex)
    #[arg(long, global = true, default_value = "armada")]
    faction: String,

    /// Directory with per-faction catalog files (<faction>.ron)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory with map presets
    #[arg(long, global = true)]
    maps_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate one build order and print a report
    Simulate {
        /// Build-order file
        file: PathBuf,

        /// Ticks to simulate
        #[arg(short, long, default_value_t = DEFAULT_DURATION)]
        duration: u32,

        /// Map preset overriding the file's map
        #[arg(short, long)]
        map: Option<String>,

        /// Strategy as key=value pairs, enables strategy mode
        #[arg(short, long)]
        strategy: Option<String>,

        /// Goal such as unit:grunt:10 (repeatable, enables strategy mode)
        #[arg(short, long)]
        goal: Vec<String>,

        /// Write the full result as JSON
        #[arg(long)]
        export_json: Option<PathBuf>,

        /// Wind seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
    },

    /// Simulate several build orders and compare them
    Compare {
        /// Build-order files
        #[arg(num_args = 2.., required = true)]
        files: Vec<PathBuf>,

        /// Ticks to simulate
        #[arg(short, long, default_value_t = DEFAULT_DURATION)]
        duration: u32,

        /// Wind seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
    },

    /// Search build orders with a genetic algorithm
    Optimize(OptimizeArgs),

    /// Search strategy configurations with a genetic algorithm
    OptimizeStrategy(StrategyArgs),

    /// Run a build order repeatedly and check the results agree
    Verify {
        /// Build-order file
        file: PathBuf,

        /// Number of runs
        #[arg(short, long, default_value = "4")]
        runs: u32,

        /// Ticks to simulate
        #[arg(short, long, default_value_t = DEFAULT_DURATION)]
        duration: u32,

        /// Wind seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
    },

    /// List the units of the active faction
    Catalog,

    /// List the available map presets
    Maps,
}

/// Map selection shared by both optimizers.
#[derive(Args)]
struct MapArgs {
    /// Map preset; overrides the inline map parameters
    #[arg(short, long)]
    map: Option<String>,

    /// Average wind speed
    #[arg(long, default_value = "12")]
    wind: f64,

    /// Metal per extractor
    #[arg(long, default_value = "2")]
    mex_value: f64,

    /// Extractor spots available
    #[arg(long, default_value = "6")]
    mex_spots: u32,

    /// A geothermal vent is available
    #[arg(long)]
    has_geo: bool,
}

/// GA knobs shared by both optimizers. Unset values come from `--params`
/// or the built-in defaults.
#[derive(Args)]
struct GaArgs {
    /// GA parameter file (RON)
    #[arg(long)]
    params: Option<PathBuf>,

    /// Generations to run
    #[arg(short, long)]
    generations: Option<u32>,

    /// Population size
    #[arg(short, long)]
    pop_size: Option<usize>,

    /// Ticks simulated per candidate
    #[arg(short, long)]
    duration: Option<u32>,

    /// GA seed
    #[arg(long)]
    seed: Option<u64>,

    /// How many of the best candidates to list
    #[arg(long, default_value = "1")]
    top: usize,
}

#[derive(Args)]
struct OptimizeArgs {
    /// Objective name, e.g. max_metal or fastest_factory
    #[arg(short, long, default_value = "balanced")]
    objective: String,

    /// Tick at which snapshot-based objectives are scored
    #[arg(short, long, default_value = "300")]
    target_time: u32,

    #[command(flatten)]
    map: MapArgs,

    #[command(flatten)]
    ga: GaArgs,

    /// Build order to seed the population with
    #[arg(long)]
    start_from: Option<PathBuf>,

    /// Save the best build order here (RON)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Save the best build order here (JSON)
    #[arg(long)]
    export_json: Option<PathBuf>,
}

#[derive(Args)]
struct StrategyArgs {
    /// Objective name: best_composition, fastest_goal or max_eco_strat
    #[arg(short, long, default_value = "best_composition")]
    objective: String,

    /// Tick at which snapshot-based objectives are scored
    #[arg(short, long, default_value = "300")]
    target_time: u32,

    /// Goal queued before every run (repeatable)
    #[arg(long)]
    goal: Vec<String>,

    /// Strategy to seed the population with
    #[arg(long)]
    start_from: Option<String>,

    #[command(flatten)]
    map: MapArgs,

    #[command(flatten)]
    ga: GaArgs,

    /// Save the best strategy build order here (RON)
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Shared state built from the global options.
struct Context {
    catalogs: CatalogCache,
    maps: MapRegistry,
}

impl Context {
    fn new(cli: &Cli) -> Self {
        let Some(faction) = Faction::from_key(&cli.faction) else {
            fail(format!("Unknown faction '{}' (expected armada or cortex)", cli.faction));
        };

        let mut catalogs = match &cli.data_dir {
            Some(dir) => CatalogCache::with_data_dir(dir),
            None => CatalogCache::new(),
        };
        or_exit(catalogs.switch_faction(faction), "Failed to load unit catalog");

        let mut maps = MapRegistry::new();
        match cli.maps_dir.clone().or_else(default_maps_dir) {
            Some(dir) => {
                if let Err(e) = maps.load_from_directory(&dir) {
                    warn!(dir = %dir.display(), error = %e, "Map presets unavailable");
                }
            }
            None => info!("No map preset directory found"),
        }

        Self { catalogs, maps }
    }

    fn catalog(&mut self) -> Arc<UnitCatalog> {
        or_exit(self.catalogs.active(), "Failed to load unit catalog")
    }

    fn map_config(&self, args: &MapArgs) -> MapConfig {
        match &args.map {
            Some(name) => self
                .maps
                .resolve(name)
                .unwrap_or_else(|| fail(format!("Unknown map '{name}'"))),
            None => MapConfig {
                avg_wind: args.wind,
                mex_value: args.mex_value,
                mex_spots: args.mex_spots,
                has_geo: args.has_geo,
                ..MapConfig::default()
            },
        }
    }

    fn load(&self, file: &Path) -> BuildOrder {
        or_exit(load_build_order(file, Some(&self.maps)), "Failed to load build order")
    }
}

fn fail(message: impl Display) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn or_exit<T, E: Display>(result: Result<T, E>, context: &str) -> T {
    result.unwrap_or_else(|e| fail(format!("{context}: {e}")))
}

fn ga_params(args: &GaArgs, base: GaParams) -> GaParams {
    let mut params = match &args.params {
        Some(path) => or_exit(GaParams::load(path), "Failed to load GA parameters"),
        None => base,
    };
    if let Some(generations) = args.generations {
        params.generations = generations;
    }
    if let Some(size) = args.pop_size {
        params.population_size = size;
    }
    if let Some(duration) = args.duration {
        params.duration = duration;
    }
    if let Some(seed) = args.seed {
        params.seed = seed;
    }
    params
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for reports)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let mut ctx = Context::new(&cli);

    match cli.command {
        Commands::Simulate {
            file,
            duration,
            map,
            strategy,
            goal,
            export_json,
            seed,
        } => {
            cmd_simulate(&mut ctx, &file, duration, map, strategy, &goal, export_json, seed);
        }
        Commands::Compare {
            files,
            duration,
            seed,
        } => cmd_compare(&mut ctx, &files, duration, seed),
        Commands::Optimize(args) => cmd_optimize(&mut ctx, &args),
        Commands::OptimizeStrategy(args) => cmd_optimize_strategy(&mut ctx, &args),
        Commands::Verify {
            file,
            runs,
            duration,
            seed,
        } => cmd_verify(&mut ctx, &file, runs, duration, seed),
        Commands::Catalog => cmd_catalog(&mut ctx),
        Commands::Maps => cmd_maps(&ctx),
    }
}

fn cmd_simulate(
    ctx: &mut Context,
    file: &Path,
    duration: u32,
    map: Option<String>,
    strategy: Option<String>,
    goals: &[String],
    export_json: Option<PathBuf>,
    seed: u64,
) {
    let mut order = ctx.load(file);

    if let Some(name) = map {
        match ctx.maps.resolve(&name) {
            Some(config) => {
                order.map = config;
                order.map_name = Some(name);
            }
            None => fail(format!("Unknown map '{name}'")),
        }
    }
    if let Some(text) = strategy {
        order.strategy = Some(or_exit(parse_strategy(&text), "Invalid strategy"));
    }
    let goals: Vec<GoalSpec> = goals
        .iter()
        .map(|g| or_exit(parse_goal_spec(g), "Invalid goal"))
        .collect();
    if !goals.is_empty() && order.strategy.is_none() {
        info!("Goals given, enabling strategy mode with defaults");
        order.strategy = Some(Default::default());
    }

    let catalog = ctx.catalog();
    let mut engine = or_exit(
        SimulationEngine::new(&order, Arc::clone(&catalog), duration, seed),
        "Simulation failed",
    );
    for goal in goals {
        engine.add_goal(goal);
    }
    let result = engine.run();

    println!("{}", full_report(&result, &catalog));

    if let Some(path) = export_json {
        or_exit(export_result_json(&result, &path), "Failed to export result");
        eprintln!("Result saved to: {}", path.display());
    }
}

fn cmd_compare(ctx: &mut Context, files: &[PathBuf], duration: u32, seed: u64) {
    let orders: Vec<BuildOrder> = files.iter().map(|f| ctx.load(f)).collect();
    let catalog = ctx.catalog();

    let results: Result<Vec<SimResult>, _> = orders
        .par_iter()
        .map(|order| simulate(order, Arc::clone(&catalog), duration, seed))
        .collect();
    let results = or_exit(results, "Simulation failed");

    println!("{}", compare_report(&results));
}

fn print_banner(title: &str, objective: &Objective, map: &MapConfig, params: &GaParams) {
    let rule = "=".repeat(60);
    println!("{rule}");
    println!("  {title}");
    println!("  Objective:   {}", objective.description());
    println!(
        "  Map:         wind {:.1}, {} mex x {:.1}{}",
        map.avg_wind,
        map.mex_spots,
        map.mex_value,
        if map.has_geo { ", geo" } else { "" }
    );
    println!(
        "  GA:          {} generations x {} candidates, {} ticks each",
        params.generations, params.population_size, params.duration
    );
    println!("{rule}");
}

fn print_queues(order: &BuildOrder) {
    let join = |q: &[bar_core::build_order::BuildAction]| {
        q.iter().map(format_entry).collect::<Vec<_>>().join(", ")
    };
    println!("\n--- BEST BUILD ORDER ---");
    println!(" commander: {}", join(&order.commander_queue));
    for (id, queue) in order.factory_queues.iter().chain(&order.constructor_queues) {
        println!(" {id}: {}", join(queue));
    }
}

fn cmd_optimize(ctx: &mut Context, args: &OptimizeArgs) {
    let objective = or_exit(Objective::parse(&args.objective, args.target_time), "Invalid objective");
    let map = ctx.map_config(&args.map);
    let params = ga_params(
        &args.ga,
        GaParams::default().with_generations(DEFAULT_GENERATIONS),
    );
    let anchor = args.start_from.as_ref().map(|f| ctx.load(f));
    let catalog = ctx.catalog();

    print_banner("BUILD ORDER OPTIMIZER", &objective, &map, &params);

    let outcome = or_exit(
        optimize(
            &objective,
            Arc::clone(&catalog),
            &map,
            &params,
            anchor.as_ref(),
            &CancelToken::new(),
        ),
        "Optimization failed",
    );
    info!(
        score = outcome.best_score,
        generations = outcome.generations_run,
        catastrophes = outcome.catastrophes,
        "Optimization finished"
    );

    println!("\nBest score: {:.2}", outcome.best_score);
    print_queues(&outcome.best);

    let best = or_exit(
        simulate(&outcome.best, Arc::clone(&catalog), params.duration, DEFAULT_SEED),
        "Simulation failed",
    );
    println!("{}", full_report(&best, &catalog));

    if args.ga.top > 1 {
        let top = outcome.top(args.ga.top);
        let rows: Vec<(f64, Option<u32>, f64)> = top
            .par_iter()
            .map(|scored| {
                let result = simulate(&scored.genome, Arc::clone(&catalog), params.duration, DEFAULT_SEED).ok();
                let factory = result.as_ref().and_then(|r| r.time_to_first_factory);
                let metal = result
                    .as_ref()
                    .and_then(|r| r.snapshot_at(objective.target_tick))
                    .map_or(0.0, |s| s.metal_income);
                (scored.score, factory, metal)
            })
            .collect();

        println!("\n--- TOP {} ---", rows.len());
        println!(
            " {:>3} {:>10} {:>8} {:>11}",
            "#",
            "Score",
            "Factory",
            format!("M @{}", fmt_time(objective.target_tick))
        );
        for (i, (score, factory, metal)) in rows.iter().enumerate() {
            println!(
                " {:>3} {score:>10.2} {:>8} {:>11}",
                i + 1,
                factory.map_or_else(|| "-".to_string(), fmt_time),
                fmt_rate(*metal)
            );
        }
    }

    if let Some(path) = &args.output {
        or_exit(save_build_order(&outcome.best, path), "Failed to save build order");
        eprintln!("Build order saved to: {}", path.display());
    }
    if let Some(path) = &args.export_json {
        or_exit(export_build_order_json(&outcome.best, path), "Failed to export build order");
        eprintln!("Build order exported to: {}", path.display());
    }
}

fn cmd_optimize_strategy(ctx: &mut Context, args: &StrategyArgs) {
    let objective = or_exit(Objective::parse(&args.objective, args.target_time), "Invalid objective");
    let map = ctx.map_config(&args.map);
    let params = ga_params(&args.ga, GaParams::strategy_defaults());
    let anchor = args.start_from.as_ref().map(|s| {
        let config = or_exit(parse_strategy(s), "Invalid strategy");
        bar_optimizer::strategy_genome::StrategyGenome::from_config(&config)
    });

    let mut eval = EvalContext::new(ctx.catalog(), map.clone());
    for goal in &args.goal {
        eval = eval.with_goal(or_exit(parse_goal_spec(goal), "Invalid goal"));
    }

    print_banner("STRATEGY OPTIMIZER", &objective, &map, &params);
    for goal in &eval.goals {
        println!("  Goal:        {}", goal.description);
    }

    let outcome = or_exit(
        optimize_strategy(&objective, &eval, &params, anchor.as_ref(), &CancelToken::new()),
        "Optimization failed",
    );
    info!(
        score = outcome.best_score,
        generations = outcome.generations_run,
        "Strategy search finished"
    );

    let config = outcome.best.to_config();
    println!("\nBest score: {:.2}", outcome.best_score);
    println!("Best strategy: {}", config.summary());

    let mut order = outcome.best.build_order(&map);
    order.name = format!("Strategy ({objective})");
    let eval = eval.with_duration(params.duration);
    let result = or_exit(eval.run(&order), "Simulation failed");
    println!("{}", full_report(&result, &eval.catalog));

    if args.ga.top > 1 {
        println!("\n--- TOP {} ---", args.ga.top.min(outcome.ranked.len()));
        for (i, scored) in outcome.top(args.ga.top).iter().enumerate() {
            println!(" {:>3} {:>10.2}  {}", i + 1, scored.score, scored.genome.to_config().summary());
        }
    }

    if let Some(path) = &args.output {
        or_exit(save_build_order(&order, path), "Failed to save build order");
        eprintln!("Strategy saved to: {}", path.display());
    }
}

fn cmd_verify(ctx: &mut Context, file: &Path, runs: u32, duration: u32, seed: u64) {
    let order = ctx.load(file);
    let catalog = ctx.catalog();

    let hashes: Result<Vec<u64>, _> = (0..runs.max(1))
        .into_par_iter()
        .map(|_| simulate(&order, Arc::clone(&catalog), duration, seed).map(|r| r.state_hash()))
        .collect();
    let hashes = or_exit(hashes, "Simulation failed");

    let first = hashes[0];
    if let Some(run) = hashes.iter().position(|h| *h != first) {
        fail(format!(
            "Run {run} diverged: {:016x} != {first:016x}",
            hashes[run]
        ));
    }
    println!(
        "Deterministic: {} runs of '{}' agree on {first:016x}",
        hashes.len(),
        order.name
    );
}

fn cmd_catalog(ctx: &mut Context) {
    let catalog = ctx.catalog();
    println!("{} ({} units)", catalog.faction, catalog.len());
    println!(
        " {:<16} {:<28} {:>7} {:>8} {:>8} {:>6}",
        "Key", "Name", "Metal", "Energy", "Time", "BP"
    );
    for unit in catalog.iter() {
        println!(
            " {:<16} {:<28} {:>7.0} {:>8.0} {:>8.0} {:>6.0}",
            unit.id, unit.name, unit.metal_cost, unit.energy_cost, unit.build_time, unit.build_power
        );
    }
}

fn cmd_maps(ctx: &Context) {
    if ctx.maps.is_empty() {
        println!("No map presets loaded");
        return;
    }
    for name in ctx.maps.names() {
        if let Some(map) = ctx.maps.resolve(name) {
            println!(
                " {name:<24} wind {:>4.1} +/- {:<4.1} mex {:>2} x {:.1}{}",
                map.avg_wind,
                map.wind_variance,
                map.mex_spots,
                map.mex_value,
                if map.has_geo { "  geo" } else { "" }
            );
        }
    }
}
