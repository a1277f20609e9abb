//! Economy controller: what a commander or constructor builds next once its
//! static queue runs out.
//!
//! Decisions walk a fixed precedence: emergencies, goal overrides, the eco
//! role's extractor bias, then [`ECON_PRIORITIES`], then the support role's
//! radar fallback.

use serde::{Deserialize, Serialize};

use crate::build_order::BuildAction;
use crate::catalog::keys;
use crate::economy::EconState;
use crate::strategy::{EmergencyMode, Role, StrategyConfig};

/// When a priority rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Always applies.
    Always,
    /// Applies in one economy state.
    When(EconState),
}

impl Trigger {
    /// Whether the rule fires for `state`.
    #[must_use]
    pub fn matches(&self, state: EconState) -> bool {
        match self {
            Self::Always => true,
            Self::When(s) => *s == state,
        }
    }
}

/// One row of the priority table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityRule {
    /// Unit to build.
    pub unit: &'static str,
    /// Condition.
    pub trigger: Trigger,
    /// Priority; the table is already sorted by it.
    pub priority: u32,
}

/// Economy rules, highest priority first.
pub const ECON_PRIORITIES: &[PriorityRule] = &[
    PriorityRule {
        unit: keys::MEX,
        trigger: Trigger::When(EconState::MetalStall),
        priority: 100,
    },
    PriorityRule {
        unit: keys::WIND,
        trigger: Trigger::When(EconState::EnergyStall),
        priority: 90,
    },
    PriorityRule {
        unit: keys::SOLAR,
        trigger: Trigger::When(EconState::EnergyStall),
        priority: 85,
    },
    PriorityRule {
        unit: keys::MEX,
        trigger: Trigger::Always,
        priority: 70,
    },
    PriorityRule {
        unit: keys::WIND,
        trigger: Trigger::Always,
        priority: 50,
    },
    PriorityRule {
        unit: keys::CONVERTER_T1,
        trigger: Trigger::When(EconState::EnergyFloat),
        priority: 40,
    },
];

/// Economy adjustments requested by the active goal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EconOverride {
    /// Build this unit instead of consulting the table.
    pub force_build: Option<String>,
    /// Build nothing.
    pub suppress_econ: bool,
    /// While stored metal is below this, a metal float reads as balanced.
    pub reserve_metal: f64,
    /// While stored energy is below this, an energy float reads as balanced.
    pub reserve_energy: f64,
}

impl EconOverride {
    /// Mask float states while banking toward a reserve.
    #[must_use]
    pub fn adjust(&self, state: EconState, metal_stored: f64, energy_stored: f64) -> EconState {
        match state {
            EconState::MetalFloat if self.reserve_metal > 0.0 && metal_stored < self.reserve_metal => {
                EconState::Balanced
            }
            EconState::EnergyFloat
                if self.reserve_energy > 0.0 && energy_stored < self.reserve_energy =>
            {
                EconState::Balanced
            }
            other => other,
        }
    }
}

/// Inputs to one economy decision.
#[derive(Debug, Clone, Copy)]
pub struct EconContext<'a> {
    /// Active strategy.
    pub strategy: &'a StrategyConfig,
    /// Emergency in effect this tick, if any.
    pub emergency: Option<EmergencyMode>,
    /// Classified economy state.
    pub econ_state: EconState,
    /// Metal in storage.
    pub metal_stored: f64,
    /// Energy in storage.
    pub energy_stored: f64,
    /// Extractor spots not yet built on.
    pub remaining_mex: u32,
}

/// Choose the next structure for a commander or constructor.
///
/// Returns `None` when the builder should stay idle this tick.
#[must_use]
pub fn choose_econ_build(ctx: &EconContext<'_>, overrides: &EconOverride) -> Option<BuildAction> {
    match ctx.emergency {
        Some(EmergencyMode::DefendBase) => return Some(BuildAction::structure(keys::LLT)),
        Some(EmergencyMode::Mobilization) => return None,
        None => {}
    }

    if overrides.suppress_econ {
        return None;
    }
    if let Some(unit) = &overrides.force_build {
        return Some(BuildAction::structure(unit));
    }

    let econ_state = overrides.adjust(ctx.econ_state, ctx.metal_stored, ctx.energy_stored);

    if ctx.strategy.role == Role::Eco && ctx.remaining_mex > 0 {
        return Some(BuildAction::structure(keys::MEX));
    }

    let rule = ECON_PRIORITIES.iter().find(|rule| {
        rule.trigger.matches(econ_state) && (rule.unit != keys::MEX || ctx.remaining_mex > 0)
    });
    if let Some(rule) = rule {
        return Some(BuildAction::structure(rule.unit));
    }

    if ctx.strategy.role == Role::Support {
        return Some(BuildAction::structure(keys::RADAR));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(strategy: &StrategyConfig, econ_state: EconState, remaining_mex: u32) -> EconContext<'_> {
        EconContext {
            strategy,
            emergency: None,
            econ_state,
            metal_stored: 250.0,
            energy_stored: 500.0,
            remaining_mex,
        }
    }

    fn unit(action: Option<BuildAction>) -> Option<String> {
        action.map(|a| a.unit)
    }

    #[test]
    fn test_priority_table_is_sorted() {
        assert!(ECON_PRIORITIES
            .windows(2)
            .all(|w| w[0].priority > w[1].priority));
    }

    #[test]
    fn test_metal_stall_builds_mex() {
        let strategy = StrategyConfig::default();
        let choice = choose_econ_build(&ctx(&strategy, EconState::MetalStall, 3), &EconOverride::default());
        assert_eq!(unit(choice).as_deref(), Some("mex"));
    }

    #[test]
    fn test_no_spots_skips_mex() {
        let strategy = StrategyConfig::default();
        let choice = choose_econ_build(&ctx(&strategy, EconState::MetalStall, 0), &EconOverride::default());
        assert_eq!(unit(choice).as_deref(), Some("wind"));
    }

    #[test]
    fn test_energy_stall_builds_wind() {
        let strategy = StrategyConfig::default();
        let choice = choose_econ_build(&ctx(&strategy, EconState::EnergyStall, 0), &EconOverride::default());
        assert_eq!(unit(choice).as_deref(), Some("wind"));
    }

    #[test]
    fn test_defend_base_beats_everything() {
        let strategy = StrategyConfig::default();
        let mut c = ctx(&strategy, EconState::MetalStall, 3);
        c.emergency = Some(EmergencyMode::DefendBase);
        let overrides = EconOverride {
            force_build: Some("nano".into()),
            ..Default::default()
        };
        assert_eq!(unit(choose_econ_build(&c, &overrides)).as_deref(), Some("llt"));

        c.emergency = Some(EmergencyMode::Mobilization);
        assert!(choose_econ_build(&c, &overrides).is_none());
    }

    #[test]
    fn test_goal_overrides() {
        let strategy = StrategyConfig::default();
        let c = ctx(&strategy, EconState::Balanced, 3);

        let suppress = EconOverride {
            suppress_econ: true,
            ..Default::default()
        };
        assert!(choose_econ_build(&c, &suppress).is_none());

        let force = EconOverride {
            force_build: Some("nano".into()),
            ..Default::default()
        };
        assert_eq!(unit(choose_econ_build(&c, &force)).as_deref(), Some("nano"));
    }

    #[test]
    fn test_reserve_masks_float() {
        let overrides = EconOverride {
            reserve_metal: 500.0,
            ..Default::default()
        };
        assert_eq!(
            overrides.adjust(EconState::MetalFloat, 450.0, 0.0),
            EconState::Balanced
        );
        assert_eq!(
            overrides.adjust(EconState::MetalFloat, 550.0, 0.0),
            EconState::MetalFloat
        );
        // Energy float is untouched by a metal reserve
        assert_eq!(
            overrides.adjust(EconState::EnergyFloat, 0.0, 0.0),
            EconState::EnergyFloat
        );
    }

    #[test]
    fn test_eco_role_prefers_mex() {
        let strategy = StrategyConfig {
            role: Role::Eco,
            ..Default::default()
        };
        let choice = choose_econ_build(&ctx(&strategy, EconState::EnergyStall, 1), &EconOverride::default());
        assert_eq!(unit(choice).as_deref(), Some("mex"));
    }

    #[test]
    fn test_wind_always_applies_before_support_fallback() {
        let strategy = StrategyConfig {
            role: Role::Support,
            ..Default::default()
        };
        let choice = choose_econ_build(&ctx(&strategy, EconState::Balanced, 0), &EconOverride::default());
        assert_eq!(unit(choice).as_deref(), Some("wind"));
    }
}
