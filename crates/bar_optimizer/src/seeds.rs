//! Initial individuals: a hand-tuned greedy opening and random openings.

use rand::seq::SliceRandom;
use rand::Rng;

use bar_core::build_order::{BuildAction, BuildOrder, MapConfig, FIRST_CONSTRUCTOR_ID, FIRST_FACTORY_ID};
use bar_core::catalog::keys;

use crate::operators::{CON_POOL, COMMANDER_POOL, FACTORY_PRODUCIBLE};

/// Commander queue length of the greedy seed.
pub const GREEDY_COMMANDER_LEN: usize = 15;
/// Factory queue length of the greedy seed.
pub const GREEDY_FACTORY_LEN: usize = 12;
/// Constructor queue length of the greedy seed.
pub const GREEDY_CONSTRUCTOR_LEN: usize = 8;

/// Average wind at which wind turbines beat solar collectors.
const WIND_THRESHOLD: f64 = 7.0;

/// Extractors the greedy constructor queue claims.
const GREEDY_CONSTRUCTOR_MEX: u32 = 3;

/// Cheapest energy building for `map`.
#[must_use]
pub fn energy_key(map: &MapConfig) -> &'static str {
    if map.avg_wind >= WIND_THRESHOLD {
        keys::WIND
    } else {
        keys::SOLAR
    }
}

/// A reasonable opening built from economic rules of thumb.
#[must_use]
pub fn greedy_seed(map: &MapConfig) -> BuildOrder {
    let energy = energy_key(map);
    let mut commander: Vec<&str> = vec![
        keys::MEX,
        keys::MEX,
        energy,
        energy,
        keys::BOT_LAB,
        keys::MEX,
        energy,
        energy,
        keys::RADAR,
    ];

    let mut mex_placed = 3;
    let remaining = GREEDY_COMMANDER_LEN - commander.len();
    for i in 0..remaining {
        if mex_placed < map.mex_spots && i % 3 == 0 {
            commander.push(keys::MEX);
            mex_placed += 1;
        } else if i == remaining - 1 {
            commander.push(keys::NANO);
        } else {
            commander.push(energy);
        }
    }

    let mut factory = vec!["tick", "grunt", "grunt", "con_bot"];
    factory.resize(GREEDY_FACTORY_LEN, "grunt");

    let mut con_mex = 0;
    let constructor: Vec<&str> = (0..GREEDY_CONSTRUCTOR_LEN)
        .map(|i| {
            if con_mex < GREEDY_CONSTRUCTOR_MEX && i % 2 == 0 {
                con_mex += 1;
                keys::MEX
            } else {
                energy
            }
        })
        .collect();

    BuildOrder::new("Greedy Seed")
        .with_map(map.clone())
        .with_commander(&commander)
        .with_factory(FIRST_FACTORY_ID, &factory)
        .with_constructor(FIRST_CONSTRUCTOR_ID, &constructor)
}

/// A random opening for population diversity.
///
/// The commander always starts with two extractors and places at most one
/// factory; repair adds one if none was rolled.
pub fn random_seed<R: Rng + ?Sized>(map: &MapConfig, rng: &mut R) -> BuildOrder {
    let energy = energy_key(map);

    let mut commander = vec![BuildAction::structure(keys::MEX), BuildAction::structure(keys::MEX)];
    let mut factory_placed = false;
    for _ in 0..rng.gen_range(8..=GREEDY_COMMANDER_LEN) {
        let roll: f64 = rng.gen();
        let unit = if !factory_placed && roll < 0.15 {
            factory_placed = true;
            if rng.gen::<bool>() {
                keys::BOT_LAB
            } else {
                keys::VEHICLE_PLANT
            }
        } else if roll < 0.5 {
            energy
        } else if roll < 0.7 {
            keys::MEX
        } else {
            COMMANDER_POOL.choose(rng).copied().unwrap_or(energy)
        };
        commander.push(BuildAction::structure(unit));
    }

    let mut factory = vec![BuildAction::produce("tick")];
    for _ in 0..rng.gen_range(6..=GREEDY_FACTORY_LEN) {
        if let Some(unit) = FACTORY_PRODUCIBLE.choose(rng) {
            factory.push(BuildAction::produce(unit));
        }
    }

    let mut constructor = Vec::new();
    for _ in 0..rng.gen_range(4..=GREEDY_CONSTRUCTOR_LEN) {
        if let Some(unit) = CON_POOL.choose(rng) {
            constructor.push(BuildAction::structure(unit));
        }
    }

    let mut order = BuildOrder::new("Random Seed").with_map(map.clone());
    order.commander_queue = commander;
    order.factory_queues.insert(FIRST_FACTORY_ID.to_string(), factory);
    order
        .constructor_queues
        .insert(FIRST_CONSTRUCTOR_ID.to_string(), constructor);
    order
}
