//! Strategy configurations as fixed-length integer genomes.
//!
//! Gene layout:
//!
//! | Gene | Field | Range |
//! |------|-------|-------|
//! | 0 | opening mex count | 1-4 |
//! | 1 | energy strategy | index, wraps |
//! | 2 | unit composition | index, wraps |
//! | 3 | posture | index, wraps |
//! | 4 | T2 timing | index, wraps |
//! | 5 | econ/army balance | 0-100 |
//! | 6 | role | index, wraps |
//! | 7 | attack strategy | index, wraps |

use rand::Rng;
use serde::{Deserialize, Serialize};

use bar_core::build_order::{BuildOrder, MapConfig};
use bar_core::error::Result;
use bar_core::result::SimResult;
use bar_core::strategy::{
    AttackStrategy, EnergyStrategy, Posture, Role, StrategyConfig, StrategyOption, T2Timing,
    UnitComposition,
};

use crate::genome::{EvalContext, Genome};

/// Number of genes.
pub const GENE_COUNT: usize = 8;

const MEX_GENE: usize = 0;
const BALANCE_GENE: usize = 5;

/// Largest step of a balance mutation.
const BALANCE_STEP: i32 = 15;

/// A strategy configuration flattened to integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrategyGenome {
    /// Raw genes; decoding clamps or wraps each one.
    pub genes: [i32; GENE_COUNT],
}

impl StrategyGenome {
    /// Encode a configuration.
    #[must_use]
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            genes: [
                config.opening_mex_count as i32,
                config.energy_strategy.index() as i32,
                config.unit_composition.index() as i32,
                config.posture.index() as i32,
                config.t2_timing.index() as i32,
                config.econ_army_balance as i32,
                config.role.index() as i32,
                config.attack_strategy.index() as i32,
            ],
        }
    }

    /// A uniformly random genome.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            genes: [
                rng.gen_range(1..=4),
                rng.gen_range(0..=3),
                rng.gen_range(0..=2),
                rng.gen_range(0..=2),
                rng.gen_range(0..=2),
                rng.gen_range(10..=90),
                rng.gen_range(0..=3),
                rng.gen_range(0..=4),
            ],
        }
    }

    /// Decode into a configuration. Out-of-range genes are clamped or wrapped.
    #[must_use]
    pub fn to_config(&self) -> StrategyConfig {
        let g = &self.genes;
        StrategyConfig {
            opening_mex_count: g[MEX_GENE].clamp(1, 4) as u32,
            energy_strategy: EnergyStrategy::from_index(wrap(g[1])),
            unit_composition: UnitComposition::from_index(wrap(g[2])),
            posture: Posture::from_index(wrap(g[3])),
            t2_timing: T2Timing::from_index(wrap(g[4])),
            econ_army_balance: g[BALANCE_GENE].clamp(0, 100) as u32,
            role: Role::from_index(wrap(g[6])),
            attack_strategy: AttackStrategy::from_index(wrap(g[7])),
            ..StrategyConfig::default()
        }
    }

    /// The build order a run of this genome simulates: an empty static
    /// queue with the decoded strategy driving every builder.
    #[must_use]
    pub fn build_order(&self, map: &MapConfig) -> BuildOrder {
        BuildOrder::new("StratOpt")
            .with_map(map.clone())
            .with_strategy(self.to_config())
    }
}

fn wrap(gene: i32) -> usize {
    gene.unsigned_abs() as usize
}

impl Genome for StrategyGenome {
    fn seed_population<R: Rng + ?Sized>(
        _ctx: &EvalContext,
        rng: &mut R,
        size: usize,
        anchor: Option<&Self>,
    ) -> Vec<Self> {
        let mut population: Vec<Self> = anchor.copied().into_iter().collect();
        while population.len() < size {
            population.push(Self::random(rng));
        }
        population.truncate(size);
        population
    }

    /// Uniform per-gene crossover; the second child takes the other pick.
    fn crossover<R: Rng + ?Sized>(&self, other: &Self, rng: &mut R) -> (Self, Self) {
        let mut a = *self;
        let mut b = *other;
        for i in 0..GENE_COUNT {
            if rng.gen::<f64>() >= 0.5 {
                std::mem::swap(&mut a.genes[i], &mut b.genes[i]);
            }
        }
        (a, b)
    }

    fn mutate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let i = rng.gen_range(0..GENE_COUNT);
        self.genes[i] = match i {
            MEX_GENE => rng.gen_range(1..=4),
            BALANCE_GENE => {
                (self.genes[i] + rng.gen_range(-BALANCE_STEP..=BALANCE_STEP)).clamp(0, 100)
            }
            _ => rng.gen_range(0..=10),
        };
    }

    fn repair(&mut self, _map: &MapConfig) {}

    fn simulate(&self, ctx: &EvalContext) -> Result<SimResult> {
        ctx.run(&self.build_order(&ctx.map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_config_round_trip() {
        let config = StrategyConfig {
            opening_mex_count: 3,
            energy_strategy: EnergyStrategy::SolarOnly,
            unit_composition: UnitComposition::Vehicles,
            posture: Posture::Aggressive,
            t2_timing: T2Timing::Late,
            econ_army_balance: 70,
            role: Role::Support,
            attack_strategy: AttackStrategy::Piercing,
            ..StrategyConfig::default()
        };
        let decoded = StrategyGenome::from_config(&config).to_config();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_decode_clamps_and_wraps() {
        let genome = StrategyGenome {
            genes: [9, 5, 10, -1, 3, 140, 4, 10],
        };
        let config = genome.to_config();
        assert_eq!(config.opening_mex_count, 4);
        assert_eq!(config.energy_strategy, EnergyStrategy::WindOnly);
        assert_eq!(config.unit_composition, UnitComposition::Vehicles);
        assert_eq!(config.posture, Posture::Balanced);
        assert_eq!(config.t2_timing, T2Timing::Early);
        assert_eq!(config.econ_army_balance, 100);
        assert_eq!(config.role, Role::Balanced);
        assert_eq!(config.attack_strategy, AttackStrategy::None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mutation_changes_at_most_one_gene() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..100 {
            let before = StrategyGenome::random(&mut rng);
            let mut after = before;
            after.mutate(&mut rng);
            let changed = before
                .genes
                .iter()
                .zip(after.genes.iter())
                .filter(|(a, b)| a != b)
                .count();
            assert!(changed <= 1);
            assert!((0..=100).contains(&after.genes[BALANCE_GENE]));
            assert!((1..=4).contains(&after.genes[MEX_GENE]));
        }
    }

    #[test]
    fn test_uniform_crossover_conserves_genes() {
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let a = StrategyGenome { genes: [1; 8] };
        let b = StrategyGenome { genes: [2; 8] };
        let (c1, c2) = a.crossover(&b, &mut rng);
        for i in 0..GENE_COUNT {
            assert_eq!(c1.genes[i] + c2.genes[i], 3);
        }
    }

    #[test]
    fn test_build_order_is_strategy_driven() {
        let genome = StrategyGenome::from_config(&StrategyConfig::default());
        let order = genome.build_order(&MapConfig::default());
        assert!(order.commander_queue.is_empty());
        assert_eq!(order.strategy, Some(StrategyConfig::default()));
    }
}
