//! Test fixtures and helpers.
//!
//! Pre-built maps, catalogs and build orders for consistent testing.

use std::sync::Arc;

use bar_core::build_order::{BuildOrder, MapConfig};
use bar_core::catalog::{UnitCatalog, UnitSpec};
use bar_core::factions::Faction;
use bar_core::strategy::StrategyConfig;

/// The built-in unit table behind an `Arc`.
#[must_use]
pub fn standard_catalog() -> Arc<UnitCatalog> {
    Arc::new(UnitCatalog::standard())
}

/// A tiny catalog with only the commander, one extractor and one generator.
///
/// Useful when a test needs exact arithmetic without the full table.
#[must_use]
pub fn minimal_catalog() -> Arc<UnitCatalog> {
    let catalog = UnitCatalog::new(Faction::Armada)
        .with_unit(
            UnitSpec::new("commander", 0.0, 0.0, 0.0)
                .with_build_power(300.0)
                .with_energy_production(30.0),
        )
        .with_unit(UnitSpec::new("mex", 50.0, 500.0, 1200.0))
        .with_unit(UnitSpec::new("solar", 150.0, 0.0, 2100.0).with_energy_production(20.0));
    Arc::new(catalog)
}

/// Default map: wind 12 +/- 3, mex value 2.0, six spots.
#[must_use]
pub fn default_map() -> MapConfig {
    MapConfig::default()
}

/// A windy map with plenty of extractor spots.
#[must_use]
pub fn windy_map() -> MapConfig {
    MapConfig::default().with_wind(18.0, 4.0).with_mex(2.0, 10)
}

/// A low-wind map where solar beats wind.
#[must_use]
pub fn calm_map() -> MapConfig {
    MapConfig::default().with_wind(4.0, 2.0).with_mex(1.8, 6)
}

/// A map with a geothermal vent.
#[must_use]
pub fn geo_map() -> MapConfig {
    MapConfig::default().with_geo(true)
}

/// Commander builds a single extractor and nothing else.
#[must_use]
pub fn single_mex_order() -> BuildOrder {
    BuildOrder::new("Single Mex")
        .with_map(MapConfig::default().with_mex(2.0, 6))
        .with_commander(&["mex"])
}

/// Three expensive energy buildings and no income to pay for them.
#[must_use]
pub fn solar_stall_order() -> BuildOrder {
    BuildOrder::new("Solar Stall").with_commander(&["adv_solar", "adv_solar", "adv_solar"])
}

/// A conventional bot opening with factory and constructor queues.
#[must_use]
pub fn standard_opening() -> BuildOrder {
    BuildOrder::new("Standard Bot Opening")
        .with_commander(&[
            "mex", "mex", "wind", "wind", "bot_lab", "mex", "wind", "wind", "radar",
        ])
        .with_factory(
            "factory_0",
            &["tick", "grunt", "grunt", "con_bot", "grunt", "grunt", "grunt"],
        )
        .with_constructor("con_1", &["mex", "mex", "wind", "wind", "solar", "nano"])
}

/// A vehicle opening, for comparisons against [`standard_opening`].
#[must_use]
pub fn vehicle_opening() -> BuildOrder {
    BuildOrder::new("Vehicle Opening")
        .with_commander(&[
            "mex", "mex", "solar", "vehicle_plant", "mex", "wind", "wind",
        ])
        .with_factory("factory_0", &["con_vehicle", "flash", "flash", "stumpy"])
        .with_constructor("con_1", &["mex", "mex", "solar", "solar"])
}

/// An empty build order running on a strategy.
#[must_use]
pub fn strategy_order(strategy: StrategyConfig) -> BuildOrder {
    BuildOrder::new("Strategy").with_strategy(strategy)
}

/// The standard opening as a RON document.
pub const STANDARD_OPENING_RON: &str = r#"(
    name: "Standard Bot Opening",
    description: "Two mex, two wind, bot lab",
    map: (avg_wind: 12.0, wind_variance: 3.0, mex_value: 2.0, mex_spots: 6),
    commander_queue: [
        (unit: "mex"),
        (unit: "mex"),
        (unit: "wind", repeat: 2),
        (unit: "bot_lab"),
    ],
    factory_queues: {
        "factory_0": [
            (unit: "tick", kind: ProduceUnit),
            (unit: "grunt", kind: ProduceUnit, repeat: 3),
        ],
    },
)"#;

/// Parse a RON build order, panicking with the parse error on failure.
///
/// # Panics
///
/// Panics if `source` is not a valid build order.
#[must_use]
pub fn build_order_from_ron(source: &str) -> BuildOrder {
    match ron::from_str(source) {
        Ok(order) => order,
        Err(e) => panic!("invalid build order fixture: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ron_fixture_parses() {
        let order = build_order_from_ron(STANDARD_OPENING_RON);
        assert_eq!(order.commander_queue.len(), 4);
        assert_eq!(order.commander_queue[2].repeat, 2);
        assert_eq!(order.factory_queues["factory_0"].len(), 2);
        assert!(order.strategy.is_none());
    }

    #[test]
    fn test_minimal_catalog() {
        let catalog = minimal_catalog();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.lookup("commander").unwrap().build_power, 300.0);
    }
}
