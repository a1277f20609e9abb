//! Genetic operators over build orders.
//!
//! Mutations pick one non-empty queue at random and edit it in place.
//! Crossovers pair up queues with the same slot in both parents.

use rand::seq::SliceRandom;
use rand::Rng;

use bar_core::build_order::{BuildAction, BuildOrder, QueueSlot};

/// Structures the commander may be asked to build.
pub const COMMANDER_POOL: &[&str] = &[
    "mex",
    "wind",
    "solar",
    "bot_lab",
    "vehicle_plant",
    "radar",
    "llt",
    "nano",
    "energy_storage",
    "metal_storage",
    "adv_bot_lab",
    "adv_vehicle_plant",
    "geo_t1",
    "hlt",
];

/// Units factories may be asked to produce.
pub const FACTORY_PRODUCIBLE: &[&str] = &[
    "tick",
    "pawn",
    "grunt",
    "rocketer",
    "flash",
    "stumpy",
    "con_bot",
    "con_vehicle",
    "rez_bot",
];

/// Structures mobile constructors may be asked to build.
pub const CON_POOL: &[&str] = &[
    "mex",
    "wind",
    "solar",
    "radar",
    "llt",
    "nano",
    "energy_storage",
    "metal_storage",
    "hlt",
    "adv_solar",
];

/// Replacement pool for entries of a queue slot.
#[must_use]
pub const fn pool_for(slot: &QueueSlot) -> &'static [&'static str] {
    match slot {
        QueueSlot::Commander => COMMANDER_POOL,
        QueueSlot::Factory(_) => FACTORY_PRODUCIBLE,
        QueueSlot::Constructor(_) => CON_POOL,
    }
}

/// Probability of one-point over uniform crossover.
const ONE_POINT_SHARE: f64 = 0.7;

/// Queues shorter than or equal to this are never shrunk.
const MIN_REMOVE_LEN: usize = 3;

/// The five mutation operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Swap two adjacent entries.
    Swap,
    /// Replace one entry with a same-pool alternative, keeping its kind.
    Replace,
    /// Insert a new pool entry at a random position.
    Insert,
    /// Remove one entry from a queue longer than three.
    Remove,
    /// Shuffle a contiguous segment of two to four entries.
    ShuffleSegment,
}

impl Mutation {
    /// Every operator.
    pub const ALL: [Self; 5] = [
        Self::Swap,
        Self::Replace,
        Self::Insert,
        Self::Remove,
        Self::ShuffleSegment,
    ];

    /// Pick an operator uniformly.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    /// Apply this operator to a random non-empty queue of `order`.
    ///
    /// Does nothing when the chosen queue is too short for the operator.
    pub fn apply<R: Rng + ?Sized>(self, order: &mut BuildOrder, rng: &mut R) {
        let slots: Vec<QueueSlot> = order
            .slots()
            .into_iter()
            .filter(|slot| order.queue(slot).is_some_and(|q| !q.is_empty()))
            .collect();
        let Some(slot) = slots.choose(rng).cloned() else {
            return;
        };
        let pool = pool_for(&slot);
        let kind = slot.default_kind();
        let Some(queue) = order.queue_mut(&slot) else {
            return;
        };

        match self {
            Self::Swap => {
                if queue.len() < 2 {
                    return;
                }
                let i = rng.gen_range(0..queue.len() - 1);
                queue.swap(i, i + 1);
            }
            Self::Replace => {
                let i = rng.gen_range(0..queue.len());
                if let Some(unit) = pool.choose(rng) {
                    let old_kind = queue[i].kind;
                    queue[i] = BuildAction::new(unit, old_kind);
                }
            }
            Self::Insert => {
                if let Some(unit) = pool.choose(rng) {
                    let pos = rng.gen_range(0..=queue.len());
                    queue.insert(pos, BuildAction::new(unit, kind));
                }
            }
            Self::Remove => {
                if queue.len() <= MIN_REMOVE_LEN {
                    return;
                }
                let i = rng.gen_range(0..queue.len());
                queue.remove(i);
            }
            Self::ShuffleSegment => {
                if queue.len() < 3 {
                    return;
                }
                let len = rng.gen_range(2..=queue.len().min(4));
                let start = rng.gen_range(0..=queue.len() - len);
                queue[start..start + len].shuffle(rng);
            }
        }
    }
}

/// Apply `count` random mutations in sequence.
pub fn mutate_n<R: Rng + ?Sized>(order: &mut BuildOrder, count: usize, rng: &mut R) {
    for _ in 0..count {
        Mutation::random(rng).apply(order, rng);
    }
}

/// The two crossover operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossover {
    /// Exchange the tails after one cut point.
    OnePoint,
    /// Exchange each aligned position with probability one half.
    Uniform,
}

impl Crossover {
    /// Pick one-point 70% of the time, uniform otherwise.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen::<f64>() < ONE_POINT_SHARE {
            Self::OnePoint
        } else {
            Self::Uniform
        }
    }

    /// Produce two children, crossing every queue slot the parents share.
    pub fn apply<R: Rng + ?Sized>(
        self,
        a: &BuildOrder,
        b: &BuildOrder,
        rng: &mut R,
    ) -> (BuildOrder, BuildOrder) {
        let mut c1 = a.clone();
        let mut c2 = b.clone();

        self.cross(&mut c1.commander_queue, &mut c2.commander_queue, rng);

        let factory_ids: Vec<String> = c1.factory_queues.keys().cloned().collect();
        for id in factory_ids {
            if let (Some(q1), Some(q2)) = (c1.factory_queues.get_mut(&id), c2.factory_queues.get_mut(&id)) {
                if !q1.is_empty() && !q2.is_empty() {
                    self.cross(q1, q2, rng);
                }
            }
        }

        let con_ids: Vec<String> = c1.constructor_queues.keys().cloned().collect();
        for id in con_ids {
            if let (Some(q1), Some(q2)) = (
                c1.constructor_queues.get_mut(&id),
                c2.constructor_queues.get_mut(&id),
            ) {
                if !q1.is_empty() && !q2.is_empty() {
                    self.cross(q1, q2, rng);
                }
            }
        }

        (c1, c2)
    }

    fn cross<R: Rng + ?Sized>(
        self,
        q1: &mut Vec<BuildAction>,
        q2: &mut Vec<BuildAction>,
        rng: &mut R,
    ) {
        match self {
            Self::OnePoint => {
                if q1.len() < 2 || q2.len() < 2 {
                    return;
                }
                let point = rng.gen_range(1..q1.len().min(q2.len()));
                let tail1 = q1.split_off(point);
                let tail2 = q2.split_off(point);
                q1.extend(tail2);
                q2.extend(tail1);
            }
            Self::Uniform => {
                for i in 0..q1.len().min(q2.len()) {
                    if rng.gen::<f64>() < 0.5 {
                        std::mem::swap(&mut q1[i], &mut q2[i]);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bar_core::build_order::ActionKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn order() -> BuildOrder {
        BuildOrder::new("ops")
            .with_commander(&["mex", "mex", "wind", "wind", "bot_lab", "mex"])
            .with_factory("factory_0", &["tick", "grunt", "grunt", "con_bot"])
            .with_constructor("con_1", &["mex", "wind", "solar", "nano"])
    }

    fn units(queue: &[BuildAction]) -> Vec<&str> {
        queue.iter().map(|a| a.unit.as_str()).collect()
    }

    #[test]
    fn test_mutations_keep_factory_entries_producing() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut o = order();
        for _ in 0..300 {
            mutate_n(&mut o, 1, &mut rng);
        }
        for action in &o.factory_queues["factory_0"] {
            assert_eq!(action.kind, ActionKind::ProduceUnit, "{}", action.unit);
        }
        for action in o.commander_queue.iter().chain(&o.constructor_queues["con_1"]) {
            assert_eq!(action.kind, ActionKind::BuildStructure);
        }
    }

    #[test]
    fn test_remove_never_shrinks_short_queues() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut o = BuildOrder::new("short").with_commander(&["mex", "wind", "bot_lab"]);
        for _ in 0..50 {
            Mutation::Remove.apply(&mut o, &mut rng);
        }
        assert_eq!(o.commander_queue.len(), 3);
    }

    #[test]
    fn test_swap_and_shuffle_preserve_multiset() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let before = order();
        let mut after = before.clone();
        for _ in 0..40 {
            Mutation::Swap.apply(&mut after, &mut rng);
            Mutation::ShuffleSegment.apply(&mut after, &mut rng);
        }
        let mut a = units(&before.commander_queue);
        let mut b = units(&after.commander_queue);
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }

    #[test]
    fn test_insert_grows_by_one() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut o = order();
        let before = o.len();
        Mutation::Insert.apply(&mut o, &mut rng);
        assert_eq!(o.len(), before + 1);
    }

    #[test]
    fn test_mutation_on_empty_order_is_noop() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut o = BuildOrder::new("empty");
        mutate_n(&mut o, 10, &mut rng);
        assert!(o.is_empty());
    }

    #[test]
    fn test_one_point_crossover_exchanges_tails() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let a = BuildOrder::new("a").with_commander(&["mex", "mex", "mex", "mex"]);
        let b = BuildOrder::new("b").with_commander(&["wind", "wind", "wind", "wind"]);
        let (c1, c2) = Crossover::OnePoint.apply(&a, &b, &mut rng);

        assert_eq!(c1.commander_queue.len(), 4);
        assert_eq!(c1.commander_queue[0].unit, "mex");
        assert_eq!(c1.commander_queue[3].unit, "wind");
        assert_eq!(c2.commander_queue[0].unit, "wind");
        assert_eq!(c2.commander_queue[3].unit, "mex");
    }

    #[test]
    fn test_uniform_crossover_keeps_positions_paired() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let a = BuildOrder::new("a").with_commander(&["mex"; 8]);
        let b = BuildOrder::new("b").with_commander(&["wind"; 6]);
        let (c1, c2) = Crossover::Uniform.apply(&a, &b, &mut rng);

        assert_eq!(c1.commander_queue.len(), 8);
        assert_eq!(c2.commander_queue.len(), 6);
        for i in 0..6 {
            assert_ne!(c1.commander_queue[i].unit, c2.commander_queue[i].unit);
        }
        assert_eq!(c1.commander_queue[7].unit, "mex");
    }

    #[test]
    fn test_crossover_skips_unshared_slots() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let a = order();
        let b = BuildOrder::new("b").with_commander(&["solar", "solar"]);
        let (c1, c2) = Crossover::OnePoint.apply(&a, &b, &mut rng);
        assert_eq!(c1.factory_queues, a.factory_queues);
        assert!(c2.factory_queues.is_empty());
    }
}
