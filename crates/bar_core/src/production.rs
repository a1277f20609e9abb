//! Production controller: what a factory produces once its static queue
//! runs out.
//!
//! Output is chosen by role deficit. The composition archetype gives each
//! role a target share of the combat force; the role with the largest gap
//! between target and actual count wins, and the factory builds its most
//! expensive unit for that role.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::build_order::BuildAction;
use crate::catalog::UnitCatalog;
use crate::strategy::{
    apply_role_adjustments, composition_weights, factory_buildlist, unit_role, EmergencyMode,
    StrategyConfig, UnitRole,
};

/// Minimum army size used when computing desired role counts.
pub const MIN_ARMY_BASIS: u32 = 10;

/// Running tally of produced units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmyComposition {
    /// Units per role.
    pub counts_by_role: BTreeMap<UnitRole, u32>,
    /// Units per unit key.
    pub counts_by_unit: BTreeMap<String, u32>,
    /// Units in combat roles.
    pub total_combat: u32,
    /// Metal value of combat units.
    pub total_value: f64,
    /// Every produced unit.
    pub units_produced: u32,
}

impl ArmyComposition {
    /// Record a produced unit.
    pub fn record_unit(&mut self, unit: &str, metal_cost: f64) {
        *self.counts_by_unit.entry(unit.to_string()).or_insert(0) += 1;
        self.units_produced += 1;

        if let Some(role) = unit_role(unit) {
            *self.counts_by_role.entry(role).or_insert(0) += 1;
            if role.is_combat() {
                self.total_combat += 1;
                self.total_value += metal_cost;
            }
        }
    }

    /// Units produced in a role.
    #[must_use]
    pub fn role_count(&self, role: UnitRole) -> u32 {
        self.counts_by_role.get(&role).copied().unwrap_or(0)
    }

    /// Units produced of a type.
    #[must_use]
    pub fn unit_count(&self, unit: &str) -> u32 {
        self.counts_by_unit.get(unit).copied().unwrap_or(0)
    }
}

/// Cheapest combat unit a factory can build.
#[must_use]
pub fn cheapest_combat_unit(factory: &str, catalog: &UnitCatalog) -> Option<&'static str> {
    factory_buildlist(factory)
        .iter()
        .copied()
        .filter(|u| unit_role(u).is_some_and(|r| r.is_combat()))
        .map(|u| (u, catalog.lookup(u).map_or(f64::INFINITY, |s| s.metal_cost)))
        .fold(None, |best: Option<(&'static str, f64)>, (u, cost)| match best {
            Some((_, best_cost)) if best_cost <= cost => best,
            _ => Some((u, cost)),
        })
        .map(|(u, _)| u)
}

/// Most expensive unit in `buildlist` with `role`; the first one wins ties.
#[must_use]
pub fn best_unit_for_role(
    buildlist: &[&'static str],
    role: UnitRole,
    catalog: &UnitCatalog,
) -> Option<&'static str> {
    buildlist
        .iter()
        .copied()
        .filter(|u| unit_role(u) == Some(role))
        .map(|u| (u, catalog.metal_cost(u)))
        .fold(None, |best: Option<(&'static str, f64)>, (u, cost)| match best {
            Some((_, best_cost)) if best_cost >= cost => best,
            _ => Some((u, cost)),
        })
        .map(|(u, _)| u)
}

/// Inputs to one production decision.
#[derive(Debug, Clone, Copy)]
pub struct ProductionContext<'a> {
    /// Active strategy.
    pub strategy: &'a StrategyConfig,
    /// Emergency in effect this tick, if any.
    pub emergency: Option<EmergencyMode>,
    /// Army so far.
    pub army: &'a ArmyComposition,
    /// Unit key of the factory deciding.
    pub factory: &'a str,
    /// Catalog for unit costs.
    pub catalog: &'a UnitCatalog,
}

/// Choose the next unit for a factory.
///
/// A forced unit wins if the factory can build it. Mobilization pumps the
/// cheapest combat unit. Otherwise the role with the greatest deficit among
/// roles this factory can serve is chosen. When every buildable role is at
/// or above target the least saturated one still wins, so production never
/// deadlocks on an exactly balanced army.
#[must_use]
pub fn choose_factory_production(
    ctx: &ProductionContext<'_>,
    forced: Option<&str>,
) -> Option<BuildAction> {
    let buildlist = factory_buildlist(ctx.factory);
    if buildlist.is_empty() {
        return None;
    }

    if let Some(unit) = forced {
        if buildlist.contains(&unit) {
            return Some(BuildAction::produce(unit));
        }
    }

    if ctx.emergency == Some(EmergencyMode::Mobilization) {
        return cheapest_combat_unit(ctx.factory, ctx.catalog).map(BuildAction::produce);
    }

    let weights = apply_role_adjustments(
        &composition_weights(ctx.strategy.unit_composition),
        ctx.strategy.role,
    );
    let basis = f64::from(ctx.army.total_combat.max(MIN_ARMY_BASIS));

    let mut best: Option<(&'static str, f64)> = None;
    for (role, weight) in weights {
        let deficit = weight * basis - f64::from(ctx.army.role_count(role));
        if best.is_some_and(|(_, d)| deficit <= d) {
            continue;
        }
        if let Some(unit) = best_unit_for_role(buildlist, role, ctx.catalog) {
            best = Some((unit, deficit));
        }
    }
    best.map(|(unit, _)| BuildAction::produce(unit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{Role, UnitComposition};

    fn ctx<'a>(
        strategy: &'a StrategyConfig,
        army: &'a ArmyComposition,
        factory: &'a str,
        catalog: &'a UnitCatalog,
    ) -> ProductionContext<'a> {
        ProductionContext {
            strategy,
            emergency: None,
            army,
            factory,
            catalog,
        }
    }

    #[test]
    fn test_record_unit_tracks_roles() {
        let mut army = ArmyComposition::default();
        army.record_unit("grunt", 55.0);
        army.record_unit("con_bot", 100.0);
        army.record_unit("mystery", 10.0);

        assert_eq!(army.units_produced, 3);
        assert_eq!(army.total_combat, 1);
        assert_eq!(army.total_value, 55.0);
        assert_eq!(army.role_count(UnitRole::Constructor), 1);
        assert_eq!(army.unit_count("mystery"), 1);
    }

    #[test]
    fn test_empty_army_bots_builds_raider() {
        let catalog = UnitCatalog::standard();
        let strategy = StrategyConfig::default();
        let army = ArmyComposition::default();
        let choice = choose_factory_production(&ctx(&strategy, &army, "bot_lab", &catalog), None);
        assert_eq!(choice.unwrap().unit, "pawn");
    }

    #[test]
    fn test_deficit_moves_to_next_role() {
        let catalog = UnitCatalog::standard();
        let strategy = StrategyConfig::default();
        let mut army = ArmyComposition::default();
        for _ in 0..4 {
            army.record_unit("pawn", 35.0);
        }
        // raider deficit 0, assault 3, skirmisher 2
        let choice = choose_factory_production(&ctx(&strategy, &army, "bot_lab", &catalog), None);
        assert_eq!(choice.unwrap().unit, "grunt");
    }

    #[test]
    fn test_forced_unit_must_be_buildable() {
        let catalog = UnitCatalog::standard();
        let strategy = StrategyConfig::default();
        let army = ArmyComposition::default();
        let c = ctx(&strategy, &army, "bot_lab", &catalog);

        assert_eq!(
            choose_factory_production(&c, Some("rocketer")).unwrap().unit,
            "rocketer"
        );
        // stumpy is not in the bot lab list, fall through to deficit logic
        assert_eq!(choose_factory_production(&c, Some("stumpy")).unwrap().unit, "pawn");
    }

    #[test]
    fn test_mobilization_builds_cheapest_combat() {
        let catalog = UnitCatalog::standard();
        let strategy = StrategyConfig::default();
        let army = ArmyComposition::default();
        let mut c = ctx(&strategy, &army, "bot_lab", &catalog);
        c.emergency = Some(EmergencyMode::Mobilization);
        assert_eq!(choose_factory_production(&c, None).unwrap().unit, "tick");
    }

    #[test]
    fn test_unknown_factory_produces_nothing() {
        let catalog = UnitCatalog::standard();
        let strategy = StrategyConfig::default();
        let army = ArmyComposition::default();
        let c = ctx(&strategy, &army, "aircraft_plant", &catalog);
        assert!(choose_factory_production(&c, Some("tick")).is_none());
    }

    #[test]
    fn test_vehicle_plant_mixed_eco() {
        let catalog = UnitCatalog::standard();
        let strategy = StrategyConfig {
            unit_composition: UnitComposition::Mixed,
            role: Role::Eco,
            ..Default::default()
        };
        let army = ArmyComposition::default();
        // raider 2.5 vs light tank 2.0 vs constructor 1.5: flash wins
        let choice =
            choose_factory_production(&ctx(&strategy, &army, "vehicle_plant", &catalog), None);
        assert_eq!(choice.unwrap().unit, "flash");
    }

    #[test]
    fn test_best_unit_prefers_expensive() {
        let catalog = UnitCatalog::standard();
        let list: &[&'static str] = &["con_bot", "adv_con_bot"];
        assert_eq!(
            best_unit_for_role(list, UnitRole::Constructor, &catalog),
            Some("adv_con_bot")
        );
    }
}
