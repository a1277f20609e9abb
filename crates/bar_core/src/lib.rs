//! # BAR Core
//!
//! Deterministic build-order economy simulation for Beyond All Reason
//! openings.
//!
//! This crate contains **only** deterministic logic:
//! - No IO
//! - No ambient global state (catalogs are passed explicitly)
//! - No system randomness (one seeded stream per run)
//!
//! This separation enables:
//! - Parallel evaluation of many build orders
//! - Optimizer search with reproducible scores
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`catalog`] - Unit specs and the immutable unit catalog
//! - [`build_order`] - Build orders, actions and map parameters
//! - [`strategy`] - Strategy enums, role tables and the opening generator
//! - [`econ_controller`] - Dynamic structure choice for commanders and constructors
//! - [`production`] - Dynamic unit choice for factories
//! - [`goals`] - FIFO goal queue
//! - [`systems`] - Per-tick economy systems
//! - [`simulation`] - The tick loop
//! - [`result`] - Simulation output

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod build_order;
pub mod builders;
pub mod catalog;
pub mod econ_controller;
pub mod economy;
pub mod error;
pub mod factions;
pub mod goals;
pub mod production;
pub mod result;
pub mod simulation;
pub mod state;
pub mod strategy;
pub mod systems;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::build_order::{
        ActionKind, BuildAction, BuildOrder, MapConfig, QueueSlot, FIRST_CONSTRUCTOR_ID,
        FIRST_FACTORY_ID,
    };
    pub use crate::catalog::{keys, UnitCatalog, UnitSpec};
    pub use crate::economy::{classify_state, EconState, ResourcePool};
    pub use crate::error::{Result, SimError};
    pub use crate::factions::Faction;
    pub use crate::goals::{GoalKind, GoalQueue, GoalSpec};
    pub use crate::result::{Milestone, MilestoneKind, Resource, SimResult, Snapshot, StallEvent};
    pub use crate::simulation::{simulate, SimulationEngine, DEFAULT_DURATION, DEFAULT_SEED};
    pub use crate::strategy::{
        AttackStrategy, EmergencyMode, EmergencyPlan, EnergyStrategy, Posture, Role,
        StrategyConfig, StrategyOption, T2Timing, UnitComposition, UnitRole,
    };
}
