//! Unit catalog: static economic attributes per unit key.
//!
//! The catalog is an immutable value passed explicitly into every
//! simulation run. Switching factions means building a different catalog
//! and handing it to new runs; runs already in flight keep the `Arc` they
//! were started with.
//!
//! **Note:** This module contains no IO. Loading catalogs from RON files is
//! handled by `bar_headless`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::factions::Faction;

/// Well-known unit keys the engine and controllers reason about.
pub mod keys {
    /// Commander (starting builder).
    pub const COMMANDER: &str = "commander";
    /// Metal extractor.
    pub const MEX: &str = "mex";
    /// Advanced metal extractor.
    pub const MOHO: &str = "moho";
    /// Wind turbine.
    pub const WIND: &str = "wind";
    /// Solar collector.
    pub const SOLAR: &str = "solar";
    /// Tidal generator.
    pub const TIDAL: &str = "tidal";
    /// Geothermal plant.
    pub const GEO: &str = "geo_t1";
    /// T1 energy converter.
    pub const CONVERTER_T1: &str = "converter_t1";
    /// T2 energy converter.
    pub const CONVERTER_T2: &str = "converter_t2";
    /// Construction turret.
    pub const NANO: &str = "nano";
    /// Metal storage.
    pub const METAL_STORAGE: &str = "metal_storage";
    /// Energy storage.
    pub const ENERGY_STORAGE: &str = "energy_storage";
    /// Radar tower.
    pub const RADAR: &str = "radar";
    /// Light laser tower.
    pub const LLT: &str = "llt";
    /// Bot lab.
    pub const BOT_LAB: &str = "bot_lab";
    /// Vehicle plant.
    pub const VEHICLE_PLANT: &str = "vehicle_plant";

    /// Every factory type.
    pub const FACTORIES: &[&str] = &[
        "bot_lab",
        "vehicle_plant",
        "aircraft_plant",
        "adv_bot_lab",
        "adv_vehicle_plant",
        "adv_aircraft_plant",
    ];

    /// Tech-2 factory types.
    pub const T2_FACTORIES: &[&str] = &["adv_bot_lab", "adv_vehicle_plant", "adv_aircraft_plant"];

    /// Mobile constructor types.
    pub const CONSTRUCTORS: &[&str] = &["con_bot", "con_vehicle", "adv_con_bot", "adv_con_vehicle"];

    /// Buildings whose energy output comes from their catalog entry.
    pub const FIXED_ENERGY_PRODUCERS: &[&str] = &["solar", "adv_solar", "geo_t1", "fusion"];

    /// Converters; their energy draw is applied by the converter phase.
    pub const CONVERTERS: &[&str] = &["converter_t1", "converter_t2"];
}

/// Returns true if `key` is a factory type.
#[must_use]
pub fn is_factory(key: &str) -> bool {
    keys::FACTORIES.contains(&key)
}

/// Returns true if `key` is a tech-2 factory type.
#[must_use]
pub fn is_t2_factory(key: &str) -> bool {
    keys::T2_FACTORIES.contains(&key)
}

/// Returns true if `key` is a mobile constructor type.
#[must_use]
pub fn is_constructor(key: &str) -> bool {
    keys::CONSTRUCTORS.contains(&key)
}

/// Static attributes of one unit type.
///
/// Build work is expressed in build-power-seconds: a builder with 300 BP
/// finishes 1200 units of work in four seconds.
///
/// # Example RON
///
/// ```ron
/// UnitSpec(
///     id: "mex",
///     name: "Metal Extractor",
///     metal_cost: 50.0,
///     energy_cost: 500.0,
///     build_time: 1200.0,
///     energy_upkeep: 3.0,
///     health: 270,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Short identifier, e.g. `"mex"`.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Metal cost.
    pub metal_cost: f64,

    /// Energy cost.
    pub energy_cost: f64,

    /// Total build work in build-power-seconds.
    pub build_time: f64,

    /// Build power granted if this unit is itself a builder.
    #[serde(default)]
    pub build_power: f64,

    /// Metal produced per second.
    #[serde(default)]
    pub metal_production: f64,

    /// Energy produced per second.
    #[serde(default)]
    pub energy_production: f64,

    /// Energy consumed per second while the unit exists.
    #[serde(default)]
    pub energy_upkeep: f64,

    /// Maximum health.
    #[serde(default)]
    pub health: u32,

    /// Free-text notes.
    #[serde(default)]
    pub notes: String,
}

impl UnitSpec {
    /// Create a spec with costs and build work; all other fields zeroed.
    #[must_use]
    pub fn new(id: &str, metal_cost: f64, energy_cost: f64, build_time: f64) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            metal_cost,
            energy_cost,
            build_time,
            build_power: 0.0,
            metal_production: 0.0,
            energy_production: 0.0,
            energy_upkeep: 0.0,
            health: 0,
            notes: String::new(),
        }
    }

    /// Set the build power.
    pub fn with_build_power(mut self, bp: f64) -> Self {
        self.build_power = bp;
        self
    }

    /// Set the energy production.
    pub fn with_energy_production(mut self, energy: f64) -> Self {
        self.energy_production = energy;
        self
    }

    /// Check the non-negativity invariants.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("metal_cost", self.metal_cost),
            ("energy_cost", self.energy_cost),
            ("build_time", self.build_time),
            ("build_power", self.build_power),
        ];
        for (field, value) in fields {
            if value.is_nan() || value < 0.0 {
                return Err(SimError::InvalidState(format!(
                    "unit '{}' has negative or NaN {field}: {value}",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// Immutable lookup table from unit key to [`UnitSpec`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitCatalog {
    /// Faction this catalog describes.
    #[serde(default)]
    pub faction: Faction,
    units: BTreeMap<String, UnitSpec>,
}

impl UnitCatalog {
    /// Create an empty catalog for a faction.
    #[must_use]
    pub fn new(faction: Faction) -> Self {
        Self {
            faction,
            units: BTreeMap::new(),
        }
    }

    /// Build a catalog from a list of specs. Later duplicates replace earlier ones.
    pub fn from_units(faction: Faction, units: impl IntoIterator<Item = UnitSpec>) -> Result<Self> {
        let mut catalog = Self::new(faction);
        for unit in units {
            unit.validate()?;
            catalog.units.insert(unit.id.clone(), unit);
        }
        Ok(catalog)
    }

    /// The built-in table shared by both factions.
    #[must_use]
    pub fn standard() -> Self {
        Self::standard_for(Faction::Armada)
    }

    /// The built-in table tagged with a specific faction.
    #[must_use]
    pub fn standard_for(faction: Faction) -> Self {
        let units = STANDARD_UNITS
            .iter()
            .map(|row| {
                (
                    row.0.to_string(),
                    UnitSpec {
                        id: row.0.to_string(),
                        name: row.1.to_string(),
                        metal_cost: row.2,
                        energy_cost: row.3,
                        build_time: row.4,
                        build_power: row.5,
                        metal_production: row.6,
                        energy_production: row.7,
                        energy_upkeep: row.8,
                        health: row.9,
                        notes: row.10.to_string(),
                    },
                )
            })
            .collect();
        Self { faction, units }
    }

    /// Insert or replace a spec, returning the updated catalog.
    pub fn with_unit(mut self, unit: UnitSpec) -> Self {
        self.units.insert(unit.id.clone(), unit);
        self
    }

    /// Look up a unit by key.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&UnitSpec> {
        self.units.get(key)
    }

    /// Look up a unit, failing if absent.
    pub fn require(&self, key: &str) -> Result<&UnitSpec> {
        self.lookup(key)
            .ok_or_else(|| SimError::UnknownUnit(key.to_string()))
    }

    /// Returns true if the key is known.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.units.contains_key(key)
    }

    /// Number of units in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if the catalog has no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Iterate specs in key order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitSpec> {
        self.units.values()
    }

    /// Metal cost of a unit, or zero when unknown.
    #[must_use]
    pub fn metal_cost(&self, key: &str) -> f64 {
        self.lookup(key).map_or(0.0, |u| u.metal_cost)
    }
}

type Row = (
    &'static str,
    &'static str,
    f64,
    f64,
    f64,
    f64,
    f64,
    f64,
    f64,
    u32,
    &'static str,
);

// id, name, metal, energy, build_time, bp, metal_prod, energy_prod, upkeep, health, notes
const STANDARD_UNITS: &[Row] = &[
    ("solar", "Solar Collector", 150.0, 0.0, 2100.0, 0.0, 0.0, 20.0, 0.0, 280, "Constant 20 E/s."),
    ("wind", "Wind Turbine", 40.0, 175.0, 1050.0, 0.0, 0.0, 0.0, 0.0, 196, "Output varies with wind (0-25)."),
    ("tidal", "Tidal Generator", 175.0, 1750.0, 3500.0, 0.0, 0.0, 0.0, 0.0, 330, "Stable output, water-only."),
    ("geo_t1", "Geothermal Powerplant", 350.0, 3500.0, 7500.0, 0.0, 0.0, 300.0, 0.0, 1600, "Requires geo vent."),
    ("adv_solar", "Advanced Solar Collector", 280.0, 2800.0, 5600.0, 0.0, 0.0, 75.0, 0.0, 480, ""),
    ("fusion", "Fusion Reactor", 3500.0, 16000.0, 30000.0, 0.0, 0.0, 1000.0, 0.0, 4500, "T2."),
    ("mex", "Metal Extractor", 50.0, 500.0, 1200.0, 0.0, 0.0, 0.0, 3.0, 270, "Output depends on metal spot value."),
    ("moho", "Advanced Metal Extractor", 550.0, 6600.0, 14000.0, 0.0, 0.0, 0.0, 15.0, 2400, "Produces 4x base mex."),
    ("converter_t1", "Energy Converter", 1.0, 1150.0, 2500.0, 0.0, 1.0, 0.0, 70.0, 167, "70 E/s into 1 M/s when active."),
    ("converter_t2", "Advanced Energy Converter", 200.0, 6000.0, 12000.0, 0.0, 10.3, 0.0, 600.0, 500, "600 E/s into 10.3 M/s when active."),
    ("nano", "Construction Turret", 200.0, 4000.0, 6000.0, 200.0, 0.0, 0.0, 0.0, 550, "Stationary assist."),
    ("naval_nano", "Naval Construction Turret", 230.0, 4600.0, 7000.0, 250.0, 0.0, 0.0, 0.0, 550, "Water-only."),
    ("radar", "Radar Tower", 50.0, 500.0, 1500.0, 0.0, 0.0, 0.0, 15.0, 150, ""),
    ("energy_storage", "Energy Storage", 175.0, 1750.0, 3500.0, 0.0, 0.0, 0.0, 0.0, 800, "Adds 6000 energy storage."),
    ("metal_storage", "Metal Storage", 200.0, 0.0, 2500.0, 0.0, 0.0, 0.0, 0.0, 1000, "Adds 3000 metal storage."),
    ("bot_lab", "Bot Lab", 650.0, 1300.0, 7000.0, 100.0, 0.0, 0.0, 0.0, 2700, "T1 bots."),
    ("vehicle_plant", "Vehicle Plant", 700.0, 1400.0, 7500.0, 100.0, 0.0, 0.0, 0.0, 3000, "T1 vehicles."),
    ("aircraft_plant", "Aircraft Plant", 800.0, 2800.0, 8000.0, 100.0, 0.0, 0.0, 0.0, 2500, "T1 aircraft."),
    ("adv_bot_lab", "Advanced Bot Lab", 2200.0, 12000.0, 25000.0, 300.0, 0.0, 0.0, 0.0, 5000, "T2 bots."),
    ("adv_vehicle_plant", "Advanced Vehicle Plant", 2400.0, 14000.0, 28000.0, 300.0, 0.0, 0.0, 0.0, 5500, "T2 vehicles."),
    ("adv_aircraft_plant", "Advanced Aircraft Plant", 2800.0, 16000.0, 30000.0, 300.0, 0.0, 0.0, 0.0, 4200, "T2 aircraft."),
    ("tick", "Tick", 25.0, 300.0, 1100.0, 0.0, 0.0, 0.0, 0.0, 55, "Fast scout."),
    ("pawn", "Pawn", 35.0, 700.0, 1500.0, 0.0, 0.0, 0.0, 0.0, 200, "Fast infantry bot."),
    ("grunt", "Grunt", 55.0, 800.0, 2000.0, 0.0, 0.0, 0.0, 0.0, 400, "Light plasma bot."),
    ("rocketer", "Rocketer", 150.0, 2000.0, 4000.0, 0.0, 0.0, 0.0, 0.0, 400, "Rocket bot."),
    ("con_bot", "Construction Bot", 100.0, 1000.0, 3000.0, 100.0, 0.0, 3.0, 0.0, 400, "T1 constructor."),
    ("rez_bot", "Resurrection Bot", 130.0, 2600.0, 4500.0, 150.0, 0.0, 0.0, 0.0, 500, ""),
    ("adv_con_bot", "Advanced Construction Bot", 400.0, 4000.0, 10000.0, 200.0, 0.0, 7.0, 0.0, 800, "T2 constructor."),
    ("flash", "Flash", 55.0, 800.0, 2100.0, 0.0, 0.0, 0.0, 0.0, 400, "Fast raider."),
    ("stumpy", "Stumpy", 120.0, 1400.0, 3500.0, 0.0, 0.0, 0.0, 0.0, 900, "Medium assault tank."),
    ("con_vehicle", "Construction Vehicle", 130.0, 1300.0, 4000.0, 100.0, 0.0, 5.0, 0.0, 600, "T1 constructor."),
    ("adv_con_vehicle", "Advanced Construction Vehicle", 550.0, 6800.0, 12000.0, 300.0, 0.0, 10.0, 0.0, 1200, "T2 constructor."),
    ("llt", "Light Laser Tower", 85.0, 850.0, 2800.0, 0.0, 0.0, 0.0, 0.0, 650, ""),
    ("hlt", "Heavy Laser Tower", 350.0, 3500.0, 8000.0, 0.0, 0.0, 0.0, 0.0, 2200, ""),
    ("commander", "Commander", 0.0, 0.0, 0.0, 300.0, 0.0, 30.0, 0.0, 3500, "Starting builder."),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_is_valid() {
        let catalog = UnitCatalog::standard();
        assert!(!catalog.is_empty());
        for unit in catalog.iter() {
            unit.validate().unwrap();
        }
    }

    #[test]
    fn test_every_factory_and_constructor_is_a_builder() {
        let catalog = UnitCatalog::standard();
        for key in keys::FACTORIES.iter().chain(keys::CONSTRUCTORS) {
            let unit = catalog.require(key).unwrap();
            assert!(unit.build_power > 0.0, "{key} has no build power");
        }
    }

    #[test]
    fn test_lookup_unknown_is_absent() {
        let catalog = UnitCatalog::standard();
        assert!(catalog.lookup("battleship").is_none());
        assert!(matches!(
            catalog.require("battleship"),
            Err(SimError::UnknownUnit(_))
        ));
    }

    #[test]
    fn test_from_units_rejects_negative_cost() {
        let bad = UnitSpec::new("bad", -1.0, 0.0, 10.0);
        assert!(UnitCatalog::from_units(Faction::Armada, [bad]).is_err());
    }

    #[test]
    fn test_classification_helpers() {
        assert!(is_factory("bot_lab"));
        assert!(is_t2_factory("adv_bot_lab"));
        assert!(!is_t2_factory("bot_lab"));
        assert!(is_constructor("con_vehicle"));
        assert!(!is_constructor("grunt"));
    }
}
