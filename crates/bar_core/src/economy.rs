//! Resource pools and economy-state classification.
//!
//! Two resources exist: metal and energy. Each is tracked by a
//! [`ResourcePool`] holding storage, capacity, this tick's income and
//! expenditure, and the stall factor derived from them.

use serde::{Deserialize, Serialize};

/// Fill ratio below which a resource counts as stalling.
pub const STALL_THRESHOLD: f64 = 0.05;

/// Fill ratio above which a resource counts as floating.
pub const FLOAT_THRESHOLD: f64 = 0.80;

/// Effective stall factor below which a stall event is tracked.
pub const STALL_EVENT_THRESHOLD: f64 = 0.95;

/// Starting metal in storage and starting metal capacity.
pub const STARTING_METAL: f64 = 500.0;

/// Starting energy in storage and starting energy capacity.
pub const STARTING_ENERGY: f64 = 1000.0;

/// One resource's storage and flow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourcePool {
    /// Amount in storage.
    pub stored: f64,
    /// Storage capacity.
    pub capacity: f64,
    /// Income this tick (may be negative for energy).
    pub income: f64,
    /// Unthrottled construction drain this tick.
    pub expenditure: f64,
    /// Fraction of requested drain that can be funded this tick.
    pub stall_factor: f64,
}

impl ResourcePool {
    /// Create a pool with full storage.
    #[must_use]
    pub const fn new(amount: f64) -> Self {
        Self {
            stored: amount,
            capacity: amount,
            income: 0.0,
            expenditure: 0.0,
            stall_factor: 1.0,
        }
    }

    /// Storage fill ratio; zero when capacity is zero.
    #[must_use]
    pub fn fill(&self) -> f64 {
        if self.capacity > 0.0 {
            self.stored / self.capacity
        } else {
            0.0
        }
    }

    /// Recompute the stall factor from income, storage and expenditure.
    ///
    /// With no expenditure the factor is exactly one. Otherwise it is the
    /// funded fraction, clamped to `[0, 1]`.
    pub fn update_stall_factor(&mut self) -> f64 {
        self.stall_factor = if self.expenditure > 0.0 {
            ((self.income + self.stored) / self.expenditure).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.stall_factor
    }

    /// Remove spent resources from storage.
    pub fn spend(&mut self, amount: f64) {
        self.stored -= amount;
    }

    /// Add this tick's income and clamp storage to `[0, capacity]`.
    pub fn settle(&mut self) {
        self.stored = (self.stored + self.income).clamp(0.0, self.capacity.max(0.0));
    }

    /// Clamp storage without adding income.
    pub fn clamp(&mut self) {
        self.stored = self.stored.clamp(0.0, self.capacity.max(0.0));
    }
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Economy state label used by the dynamic controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EconState {
    /// Metal storage nearly empty.
    MetalStall,
    /// Energy storage nearly empty.
    EnergyStall,
    /// Metal storage nearly full.
    MetalFloat,
    /// Energy storage nearly full.
    EnergyFloat,
    /// Neither stalling nor floating.
    #[default]
    Balanced,
}

impl EconState {
    /// Stable lowercase name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MetalStall => "metal_stall",
            Self::EnergyStall => "energy_stall",
            Self::MetalFloat => "metal_float",
            Self::EnergyFloat => "energy_float",
            Self::Balanced => "balanced",
        }
    }
}

impl std::fmt::Display for EconState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify fill ratios. Stalls are checked before floats, metal before energy.
#[must_use]
pub fn classify_fill(metal_fill: f64, energy_fill: f64) -> EconState {
    if metal_fill < STALL_THRESHOLD {
        EconState::MetalStall
    } else if energy_fill < STALL_THRESHOLD {
        EconState::EnergyStall
    } else if metal_fill > FLOAT_THRESHOLD {
        EconState::MetalFloat
    } else if energy_fill > FLOAT_THRESHOLD {
        EconState::EnergyFloat
    } else {
        EconState::Balanced
    }
}

/// Classify the state of two resource pools.
#[must_use]
pub fn classify_state(metal: &ResourcePool, energy: &ResourcePool) -> EconState {
    classify_fill(metal.fill(), energy.fill())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(stored: f64, capacity: f64) -> ResourcePool {
        ResourcePool {
            stored,
            capacity,
            ..ResourcePool::default()
        }
    }

    #[test]
    fn test_classify_metal_stall() {
        let state = classify_state(&pool(10.0, 500.0), &pool(500.0, 1000.0));
        assert_eq!(state, EconState::MetalStall);
    }

    #[test]
    fn test_classify_order() {
        // Both stalling: metal wins
        assert_eq!(classify_fill(0.0, 0.0), EconState::MetalStall);
        // Energy stall beats metal float
        assert_eq!(classify_fill(0.9, 0.01), EconState::EnergyStall);
        assert_eq!(classify_fill(0.9, 0.9), EconState::MetalFloat);
        assert_eq!(classify_fill(0.5, 0.85), EconState::EnergyFloat);
        assert_eq!(classify_fill(0.5, 0.5), EconState::Balanced);
    }

    #[test]
    fn test_zero_capacity_counts_as_empty() {
        assert_eq!(pool(100.0, 0.0).fill(), 0.0);
    }

    #[test]
    fn test_stall_factor_no_expenditure() {
        let mut p = pool(0.0, 500.0);
        assert_eq!(p.update_stall_factor(), 1.0);
    }

    #[test]
    fn test_stall_factor_underfunded() {
        let mut p = pool(10.0, 500.0);
        p.income = 5.0;
        p.expenditure = 30.0;
        assert!((p.update_stall_factor() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_stall_factor_never_negative() {
        let mut p = pool(0.0, 1000.0);
        p.income = -20.0;
        p.expenditure = 10.0;
        assert_eq!(p.update_stall_factor(), 0.0);
    }

    #[test]
    fn test_settle_clamps() {
        let mut p = pool(490.0, 500.0);
        p.income = 50.0;
        p.settle();
        assert_eq!(p.stored, 500.0);

        p.stored = -3.0;
        p.income = 0.0;
        p.settle();
        assert_eq!(p.stored, 0.0);
    }
}
