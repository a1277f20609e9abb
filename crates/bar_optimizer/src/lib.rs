//! # BAR Optimizer
//!
//! Genetic search over build orders and strategy configurations, scored by
//! running the deterministic simulation in [`bar_core`].
//!
//! ## Crate Structure
//!
//! - [`objective`] - Scalar objectives over a simulation result
//! - [`operators`] - Mutation and crossover of build orders
//! - [`constraints`] - Feasibility repair
//! - [`seeds`] - Greedy and random initial individuals
//! - [`genome`] - The [`genome::Genome`] trait and evaluation context
//! - [`strategy_genome`] - Strategy configurations as integer genomes
//! - [`ga`] - The generation loop
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bar_core::prelude::*;
//! use bar_optimizer::prelude::*;
//!
//! let objective = Objective::new(ObjectiveKind::FastestFactory);
//! let params = GaParams::default().with_generations(50);
//! let outcome = optimize(
//!     &objective,
//!     Arc::new(UnitCatalog::standard()),
//!     &MapConfig::default(),
//!     &params,
//!     None,
//!     &CancelToken::new(),
//! )?;
//! println!("{} -> {}", outcome.best.name, outcome.best_score);
//! # Ok::<(), bar_optimizer::error::OptimizerError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod constraints;
pub mod error;
pub mod ga;
pub mod genome;
pub mod objective;
pub mod operators;
pub mod seeds;
pub mod strategy_genome;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{OptimizerError, Result};
    pub use crate::ga::{
        optimize, optimize_strategy, run_ga, CancelToken, GaParams, OptimizationOutcome, Scored,
    };
    pub use crate::genome::{EvalContext, Genome};
    pub use crate::objective::{Objective, ObjectiveKind};
    pub use crate::seeds::greedy_seed;
    pub use crate::strategy_genome::StrategyGenome;
}
