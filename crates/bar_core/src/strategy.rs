//! Strategy configuration and the static tables the controllers consult.
//!
//! A [`StrategyConfig`] is pure configuration. The economy and production
//! controllers read it together with the composition, build-list and role
//! tables defined here.

use serde::{Deserialize, Serialize};

use crate::build_order::BuildAction;
use crate::catalog::keys;
use crate::error::{Result, SimError};

/// A closed set of named variants.
pub trait StrategyOption: Sized + Copy + PartialEq + 'static {
    /// Every variant, in declaration order.
    const ALL: &'static [Self];

    /// Stable lowercase name.
    fn name(&self) -> &'static str;

    /// Find a variant by its name.
    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.name() == name)
    }

    /// Position of this variant in [`Self::ALL`].
    fn index(&self) -> usize {
        Self::ALL.iter().position(|v| v == self).unwrap_or(0)
    }

    /// Variant at `index`, wrapping around.
    fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }
}

/// Declares a unit-only enum with its [`StrategyOption`] names.
macro_rules! strategy_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl StrategyOption for $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

strategy_enum! {
    /// Preferred energy source for the opening.
    EnergyStrategy {
        /// Pick from map conditions (opens on wind).
        Auto => "auto",
        /// Wind only.
        WindOnly => "wind_only",
        /// Solar only.
        SolarOnly => "solar_only",
        /// Wind and solar.
        Mixed => "mixed",
    }
}

strategy_enum! {
    /// Desired army archetype.
    UnitComposition {
        /// Bot lab army.
        Bots => "bots",
        /// Vehicle plant army.
        Vehicles => "vehicles",
        /// Mixed army.
        Mixed => "mixed",
    }
}

strategy_enum! {
    /// Overall stance.
    Posture {
        /// Defensive.
        Defensive => "defensive",
        /// Balanced.
        Balanced => "balanced",
        /// Aggressive.
        Aggressive => "aggressive",
    }
}

strategy_enum! {
    /// When to transition to tech 2.
    T2Timing {
        /// Early.
        Early => "early",
        /// Standard.
        Standard => "standard",
        /// Late.
        Late => "late",
    }
}

strategy_enum! {
    /// Role archetype; biases composition weights and economy choices.
    Role {
        /// No bias.
        Balanced => "balanced",
        /// Extractor-first economy, more constructors.
        Eco => "eco",
        /// More raiders and assault, no constructors.
        Aggro => "aggro",
        /// More constructors and utility, radar fallback.
        Support => "support",
    }
}

strategy_enum! {
    /// Attack pattern.
    AttackStrategy {
        /// No attack.
        None => "none",
        /// Creeping advance.
        Creeping => "creeping",
        /// Piercing push.
        Piercing => "piercing",
        /// Fake retreat.
        FakeRetreat => "fake_retreat",
        /// Raid anti-air.
        AntiAaRaid => "anti_aa_raid",
    }
}

strategy_enum! {
    /// Emergency behavior while an [`EmergencyPlan`] is active.
    EmergencyMode {
        /// Builders place point defense.
        DefendBase => "defend_base",
        /// Builders idle, factories pump the cheapest combat unit.
        Mobilization => "mobilization",
    }
}

strategy_enum! {
    /// Battlefield role of a produced unit.
    UnitRole {
        /// Scout.
        Scout => "scout",
        /// Raider.
        Raider => "raider",
        /// Assault.
        Assault => "assault",
        /// Skirmisher.
        Skirmisher => "skirmisher",
        /// Light tank.
        LightTank => "light_tank",
        /// Heavy tank.
        HeavyTank => "heavy_tank",
        /// Artillery.
        Artillery => "artillery",
        /// Anti-air.
        Aa => "aa",
        /// Constructor.
        Constructor => "constructor",
        /// Utility.
        Utility => "utility",
        /// Aircraft.
        Aircraft => "aircraft",
    }
}

impl UnitRole {
    /// Combat roles count toward army size and value.
    #[must_use]
    pub const fn is_combat(&self) -> bool {
        !matches!(self, Self::Constructor | Self::Utility)
    }
}

/// Role of a producible unit, if it has one.
#[must_use]
pub fn unit_role(unit: &str) -> Option<UnitRole> {
    let role = match unit {
        "tick" => UnitRole::Scout,
        "pawn" | "flash" => UnitRole::Raider,
        "grunt" => UnitRole::Assault,
        "rocketer" => UnitRole::Skirmisher,
        "stumpy" => UnitRole::LightTank,
        "rez_bot" => UnitRole::Utility,
        "con_bot" | "adv_con_bot" | "con_vehicle" | "adv_con_vehicle" => UnitRole::Constructor,
        _ => return None,
    };
    Some(role)
}

/// Units a factory type can produce.
#[must_use]
pub fn factory_buildlist(factory: &str) -> &'static [&'static str] {
    match factory {
        "bot_lab" => &["tick", "pawn", "grunt", "rocketer", "con_bot", "rez_bot"],
        "vehicle_plant" => &["flash", "stumpy", "con_vehicle"],
        "adv_bot_lab" => &["adv_con_bot"],
        "adv_vehicle_plant" => &["adv_con_vehicle"],
        _ => &[],
    }
}

/// Target army fractions for a composition archetype, in decision order.
#[must_use]
pub fn composition_weights(composition: UnitComposition) -> Vec<(UnitRole, f64)> {
    match composition {
        UnitComposition::Bots => vec![
            (UnitRole::Raider, 0.40),
            (UnitRole::Assault, 0.30),
            (UnitRole::Skirmisher, 0.20),
            (UnitRole::Aa, 0.10),
        ],
        UnitComposition::Vehicles => vec![
            (UnitRole::Scout, 0.10),
            (UnitRole::LightTank, 0.30),
            (UnitRole::HeavyTank, 0.30),
            (UnitRole::Artillery, 0.20),
            (UnitRole::Aa, 0.10),
        ],
        UnitComposition::Mixed => vec![
            (UnitRole::Raider, 0.25),
            (UnitRole::Assault, 0.25),
            (UnitRole::LightTank, 0.20),
            (UnitRole::Skirmisher, 0.15),
            (UnitRole::Aa, 0.10),
            (UnitRole::Constructor, 0.05),
        ],
    }
}

/// Bias composition weights for a role. Roles absent from the table stay absent.
#[must_use]
pub fn apply_role_adjustments(weights: &[(UnitRole, f64)], role: Role) -> Vec<(UnitRole, f64)> {
    weights
        .iter()
        .map(|&(unit_role, w)| {
            let adjusted = match (role, unit_role) {
                (Role::Aggro, UnitRole::Raider | UnitRole::Assault) => w + 0.10,
                (Role::Aggro, UnitRole::Constructor) => 0.0,
                (Role::Eco, UnitRole::Constructor) => 0.15,
                (Role::Support, UnitRole::Constructor | UnitRole::Utility) => w + 0.05,
                _ => w,
            };
            (unit_role, adjusted)
        })
        .collect()
}

fn default_emergency_duration() -> u32 {
    60
}

/// A time-boxed emergency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyPlan {
    /// Emergency behavior.
    pub mode: EmergencyMode,
    /// First tick the emergency is active.
    pub start_tick: u32,
    /// Number of ticks the emergency lasts.
    #[serde(default = "default_emergency_duration")]
    pub duration: u32,
}

impl EmergencyPlan {
    /// Whether the emergency is active at `tick`.
    #[must_use]
    pub const fn is_active(&self, tick: u32) -> bool {
        tick >= self.start_tick && tick < self.start_tick.saturating_add(self.duration)
    }

    /// Whether the emergency is over at `tick`.
    #[must_use]
    pub const fn has_expired(&self, tick: u32) -> bool {
        tick >= self.start_tick.saturating_add(self.duration)
    }
}

/// Policy bundle consumed by the dynamic controllers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Extractors in the opening (1-4).
    pub opening_mex_count: u32,
    /// Energy source preference.
    pub energy_strategy: EnergyStrategy,
    /// Army archetype.
    pub unit_composition: UnitComposition,
    /// Stance.
    pub posture: Posture,
    /// Tech-2 timing.
    pub t2_timing: T2Timing,
    /// 0 = all army, 100 = all economy.
    pub econ_army_balance: u32,
    /// Role archetype.
    pub role: Role,
    /// Attack pattern.
    pub attack_strategy: AttackStrategy,
    /// Optional emergency.
    pub emergency: Option<EmergencyPlan>,
    /// Army size that triggers a rally.
    pub rally_threshold: u32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            opening_mex_count: 2,
            energy_strategy: EnergyStrategy::Auto,
            unit_composition: UnitComposition::Bots,
            posture: Posture::Balanced,
            t2_timing: T2Timing::Standard,
            econ_army_balance: 50,
            role: Role::Balanced,
            attack_strategy: AttackStrategy::None,
            emergency: None,
            rally_threshold: 5,
        }
    }
}

impl StrategyConfig {
    /// Check numeric field ranges.
    pub fn validate(&self) -> Result<()> {
        if !(1..=4).contains(&self.opening_mex_count) {
            return Err(SimError::InvalidStrategyValue {
                field: "opening_mex_count".into(),
                value: self.opening_mex_count.to_string(),
            });
        }
        if self.econ_army_balance > 100 {
            return Err(SimError::InvalidStrategyValue {
                field: "econ_army_balance".into(),
                value: self.econ_army_balance.to_string(),
            });
        }
        Ok(())
    }

    /// One-line summary, e.g. `role=eco, comp=bots, posture=balanced`.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("role={}", self.role),
            format!("comp={}", self.unit_composition),
            format!("posture={}", self.posture),
        ];
        if self.energy_strategy != EnergyStrategy::Auto {
            parts.push(format!("energy={}", self.energy_strategy));
        }
        if let Some(plan) = &self.emergency {
            parts.push(format!("emergency={}", plan.mode));
        }
        parts.join(", ")
    }

    /// Factory the opening builds for this composition.
    #[must_use]
    pub const fn opening_factory(&self) -> &'static str {
        match self.unit_composition {
            UnitComposition::Vehicles => keys::VEHICLE_PLANT,
            UnitComposition::Bots | UnitComposition::Mixed => keys::BOT_LAB,
        }
    }

    /// Commander opening: extractors, energy, factory, two wind, one extractor.
    #[must_use]
    pub fn generate_opening(&self) -> Vec<BuildAction> {
        let mut actions: Vec<BuildAction> = (0..self.opening_mex_count)
            .map(|_| BuildAction::structure(keys::MEX))
            .collect();

        let energy: &[&str] = match self.energy_strategy {
            EnergyStrategy::Auto | EnergyStrategy::WindOnly => &[keys::WIND, keys::WIND],
            EnergyStrategy::SolarOnly => &[keys::SOLAR],
            EnergyStrategy::Mixed => &[keys::WIND, keys::SOLAR],
        };
        actions.extend(energy.iter().map(|k| BuildAction::structure(k)));

        actions.push(BuildAction::structure(self.opening_factory()));
        actions.push(BuildAction::structure(keys::WIND));
        actions.push(BuildAction::structure(keys::WIND));
        actions.push(BuildAction::structure(keys::MEX));
        actions
    }
}
