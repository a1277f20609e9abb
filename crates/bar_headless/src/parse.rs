//! Command-line string parsers for goals and strategies.

use thiserror::Error;

use bar_core::goals::{GoalKind, GoalSpec};
use bar_core::strategy::{
    AttackStrategy, EmergencyMode, EmergencyPlan, EnergyStrategy, Posture, Role, StrategyConfig,
    StrategyOption, T2Timing, UnitComposition,
};

/// Errors from goal and strategy strings.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The goal type is not recognized.
    #[error("Unknown goal type '{0}'")]
    UnknownGoal(String),

    /// A strategy key is not recognized.
    #[error("Unknown strategy field '{0}'")]
    UnknownField(String),

    /// A value could not be parsed for its field.
    #[error("Invalid value '{value}' for '{field}'")]
    InvalidValue {
        /// Field or goal part.
        field: String,
        /// Rejected value.
        value: String,
    },

    /// A strategy part has no `=`.
    #[error("Expected key=value, got '{0}'")]
    MissingEquals(String),

    /// The core rejected the parsed value.
    #[error(transparent)]
    Sim(#[from] bar_core::error::SimError),
}

fn invalid(field: &str, value: &str) -> ParseError {
    ParseError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn number<T: std::str::FromStr>(field: &str, value: Option<&str>) -> Result<T, ParseError> {
    let value = value.unwrap_or("").trim();
    value.parse().map_err(|_| invalid(field, value))
}

/// Parse a goal string.
///
/// | Form | Goal |
/// |------|------|
/// | `unit:grunt:10` | produce ten grunts (count defaults to 1) |
/// | `structure:mex:6` | build six extractors |
/// | `economy:20` | reach 20 metal/s |
/// | `tech` | get a tech-2 factory online |
/// | `buildpower:600` | reach 600 build power |
///
/// The long type names (`unit_production`, `structure_build`,
/// `economy_target`, `tech_transition`, `buildpower_target`) work too.
pub fn parse_goal_spec(input: &str) -> Result<GoalSpec, ParseError> {
    let mut parts = input.trim().split(':');
    let kind_name = parts.next().unwrap_or("").trim().to_ascii_lowercase();

    let kind = match kind_name.as_str() {
        "unit" | "unit_production" | "structure" | "structure_build" => {
            let unit = parts.next().unwrap_or("").trim().to_string();
            let count = match parts.next() {
                Some(c) => number("count", Some(c))?,
                None => 1,
            };
            if kind_name.starts_with("unit") {
                GoalKind::UnitProduction { unit, count }
            } else {
                GoalKind::StructureBuild { unit, count }
            }
        }
        "economy" | "economy_target" => GoalKind::EconomyTarget {
            metal_income: number("metal_income", parts.next())?,
        },
        "tech" | "tech_transition" => GoalKind::TechTransition,
        "buildpower" | "buildpower_target" => GoalKind::BuildPowerTarget {
            build_power: number("build_power", parts.next())?,
        },
        other => return Err(ParseError::UnknownGoal(other.to_string())),
    };
    Ok(GoalSpec::new(kind)?)
}

fn option<T: StrategyOption>(field: &str, value: &str) -> Result<T, ParseError> {
    T::from_name(value).ok_or_else(|| invalid(field, value))
}

/// Parse `key=value` pairs separated by commas into a [`StrategyConfig`].
///
/// Unlisted fields keep their defaults. Accepted aliases: `composition`
/// for `unit_composition`, `energy` for `energy_strategy`, `attack` for
/// `attack_strategy`, `emergency` for `emergency_mode`. An emergency
/// starts at `emergency_start_tick` (default 0) and lasts
/// `emergency_duration` ticks (default 60).
pub fn parse_strategy(input: &str) -> Result<StrategyConfig, ParseError> {
    let mut config = StrategyConfig::default();
    let mut emergency_mode: Option<EmergencyMode> = None;
    let mut emergency_start = 0;
    let mut emergency_duration = 60;

    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| ParseError::MissingEquals(part.to_string()))?;
        let key = key.trim();
        let value = value.trim();

        match key {
            "role" => config.role = option::<Role>(key, value)?,
            "composition" | "unit_composition" | "comp" => {
                config.unit_composition = option::<UnitComposition>(key, value)?;
            }
            "energy" | "energy_strategy" => {
                config.energy_strategy = option::<EnergyStrategy>(key, value)?;
            }
            "posture" => config.posture = option::<Posture>(key, value)?,
            "t2_timing" | "t2" => config.t2_timing = option::<T2Timing>(key, value)?,
            "attack" | "attack_strategy" => {
                config.attack_strategy = option::<AttackStrategy>(key, value)?;
            }
            "emergency" | "emergency_mode" => {
                emergency_mode = Some(option::<EmergencyMode>(key, value)?);
            }
            "emergency_start_tick" => emergency_start = number(key, Some(value))?,
            "emergency_duration" => emergency_duration = number(key, Some(value))?,
            "opening_mex_count" | "mex" => config.opening_mex_count = number(key, Some(value))?,
            "econ_army_balance" | "balance" => {
                config.econ_army_balance = number(key, Some(value))?;
            }
            "rally_threshold" => config.rally_threshold = number(key, Some(value))?,
            other => return Err(ParseError::UnknownField(other.to_string())),
        }
    }

    config.emergency = emergency_mode.map(|mode| EmergencyPlan {
        mode,
        start_tick: emergency_start,
        duration: emergency_duration,
    });
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_forms() {
        let unit = parse_goal_spec("unit:grunt:10").unwrap();
        assert_eq!(
            unit.kind,
            GoalKind::UnitProduction {
                unit: "grunt".into(),
                count: 10
            }
        );
        assert_eq!(
            parse_goal_spec("structure_build:mex:6").unwrap().kind,
            GoalKind::StructureBuild {
                unit: "mex".into(),
                count: 6
            }
        );
        assert_eq!(
            parse_goal_spec("economy:20").unwrap().kind,
            GoalKind::EconomyTarget { metal_income: 20.0 }
        );
        assert_eq!(parse_goal_spec("tech").unwrap().kind, GoalKind::TechTransition);
        assert_eq!(
            parse_goal_spec(" buildpower:600 ").unwrap().kind,
            GoalKind::BuildPowerTarget { build_power: 600.0 }
        );
        assert_eq!(
            parse_goal_spec("unit:tick").unwrap().kind,
            GoalKind::UnitProduction {
                unit: "tick".into(),
                count: 1
            }
        );
    }

    #[test]
    fn test_goal_errors() {
        assert!(matches!(parse_goal_spec("win"), Err(ParseError::UnknownGoal(_))));
        assert!(matches!(parse_goal_spec("economy:lots"), Err(ParseError::InvalidValue { .. })));
        assert!(matches!(parse_goal_spec("economy"), Err(ParseError::InvalidValue { .. })));
        assert!(matches!(parse_goal_spec("unit::3"), Err(ParseError::Sim(_))));
        assert!(matches!(parse_goal_spec("unit:grunt:0"), Err(ParseError::Sim(_))));
    }

    #[test]
    fn test_strategy_with_aliases() {
        let config = parse_strategy(
            "role=aggro, composition=vehicles, posture=aggressive, energy=solar_only, attack=piercing",
        )
        .unwrap();
        assert_eq!(config.role, Role::Aggro);
        assert_eq!(config.unit_composition, UnitComposition::Vehicles);
        assert_eq!(config.posture, Posture::Aggressive);
        assert_eq!(config.energy_strategy, EnergyStrategy::SolarOnly);
        assert_eq!(config.attack_strategy, AttackStrategy::Piercing);
        assert_eq!(config.summary(), "role=aggro, comp=vehicles, posture=aggressive, energy=solar_only");
    }

    #[test]
    fn test_strategy_emergency_window() {
        let config =
            parse_strategy("emergency=defend_base,emergency_start_tick=120,emergency_duration=30")
                .unwrap();
        let plan = config.emergency.unwrap();
        assert_eq!(plan.mode, EmergencyMode::DefendBase);
        assert!(plan.is_active(149));
        assert!(!plan.is_active(150));
    }

    #[test]
    fn test_strategy_errors() {
        assert_eq!(parse_strategy("").unwrap(), StrategyConfig::default());
        assert!(matches!(parse_strategy("role=wizard"), Err(ParseError::InvalidValue { .. })));
        assert!(matches!(parse_strategy("colour=red"), Err(ParseError::UnknownField(_))));
        assert!(matches!(parse_strategy("role"), Err(ParseError::MissingEquals(_))));
        assert!(matches!(parse_strategy("mex=9"), Err(ParseError::Sim(_))));
    }
}
