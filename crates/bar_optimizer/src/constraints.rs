//! Constraint repair applied to every candidate before evaluation.

use bar_core::build_order::{BuildAction, BuildOrder, MapConfig};
use bar_core::catalog::{is_factory, keys};

/// Latest commander queue position for an inserted factory.
const FACTORY_INSERT_POSITION: usize = 4;

/// Whether the commander queue contains a factory.
#[must_use]
pub fn has_factory(order: &BuildOrder) -> bool {
    order.commander_queue.iter().any(|a| is_factory(&a.unit))
}

/// Make `order` feasible on `map`.
///
/// 1. A bot lab is inserted into the commander queue if it has no factory.
/// 2. Excess extractors beyond the map's spots are removed from the end of
///    constructor queues, then from the end of the commander queue. Repeat
///    counts are lowered before whole entries are dropped.
/// 3. Geothermal plants are stripped when the map has no vent.
pub fn repair(order: &mut BuildOrder, map: &MapConfig) {
    if !has_factory(order) {
        let pos = FACTORY_INSERT_POSITION.min(order.commander_queue.len());
        order
            .commander_queue
            .insert(pos, BuildAction::structure(keys::BOT_LAB));
    }

    let total = order.mex_count();
    if total > map.mex_spots {
        let mut excess = total - map.mex_spots;
        for queue in order.constructor_queues.values_mut() {
            excess = trim_from_end(queue, keys::MEX, excess);
        }
        excess = trim_from_end(&mut order.commander_queue, keys::MEX, excess);
        for queue in order.factory_queues.values_mut() {
            excess = trim_from_end(queue, keys::MEX, excess);
        }
    }

    if !map.has_geo {
        order.commander_queue.retain(|a| a.unit != keys::GEO);
        for queue in order
            .factory_queues
            .values_mut()
            .chain(order.constructor_queues.values_mut())
        {
            queue.retain(|a| a.unit != keys::GEO);
        }
    }
}

/// Remove up to `limit` issues of `unit`, last first. An entry is dropped
/// only once its repeat count reaches zero. Returns what is left of `limit`.
fn trim_from_end(queue: &mut Vec<BuildAction>, unit: &str, mut limit: u32) -> u32 {
    let mut i = queue.len();
    while limit > 0 && i > 0 {
        i -= 1;
        if queue[i].unit != unit {
            continue;
        }
        let issues = queue[i].issues();
        if issues > limit {
            queue[i].repeat = issues - limit;
            limit = 0;
        } else {
            queue.remove(i);
            limit -= issues;
        }
    }
    limit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(queue: &[BuildAction]) -> Vec<&str> {
        queue.iter().map(|a| a.unit.as_str()).collect()
    }

    #[test]
    fn test_inserts_bot_lab_when_factoryless() {
        let mut order = BuildOrder::new("t").with_commander(&["mex", "mex", "wind", "wind", "wind", "wind"]);
        repair(&mut order, &MapConfig::default());
        assert_eq!(order.commander_queue[4].unit, "bot_lab");
        assert!(has_factory(&order));

        let mut short = BuildOrder::new("t").with_commander(&["mex"]);
        repair(&mut short, &MapConfig::default());
        assert_eq!(units(&short.commander_queue), vec!["mex", "bot_lab"]);
    }

    #[test]
    fn test_trims_constructor_mex_first() {
        let map = MapConfig::default().with_mex(2.0, 2);
        let mut order = BuildOrder::new("t")
            .with_commander(&["mex", "mex", "bot_lab", "mex"])
            .with_constructor("con_1", &["mex", "wind"]);
        repair(&mut order, &map);

        assert_eq!(order.mex_count(), 2);
        assert_eq!(units(&order.constructor_queues["con_1"]), vec!["wind"]);
        assert_eq!(units(&order.commander_queue), vec!["mex", "mex", "bot_lab"]);
    }

    #[test]
    fn test_trims_repeated_mex_entries() {
        let map = MapConfig::default();
        let mut order = BuildOrder::new("t");
        order.commander_queue = vec![
            BuildAction::structure("mex").times(8),
            BuildAction::structure("bot_lab"),
        ];
        repair(&mut order, &map);

        assert_eq!(order.mex_count(), map.mex_spots);
        assert_eq!(order.commander_queue[0].repeat, map.mex_spots);
        assert_eq!(units(&order.commander_queue), vec!["mex", "bot_lab"]);
    }

    #[test]
    fn test_drops_repeated_entry_when_fully_trimmed() {
        let map = MapConfig::default().with_mex(2.0, 2);
        let mut order = BuildOrder::new("t").with_commander(&["mex", "mex", "bot_lab"]);
        order
            .constructor_queues
            .insert("con_1".into(), vec![BuildAction::structure("wind"), BuildAction::structure("mex").times(3)]);
        repair(&mut order, &map);

        assert_eq!(order.mex_count(), 2);
        assert_eq!(units(&order.constructor_queues["con_1"]), vec!["wind"]);
        assert_eq!(units(&order.commander_queue), vec!["mex", "mex", "bot_lab"]);
    }

    #[test]
    fn test_strips_geo_without_vent() {
        let mut order = BuildOrder::new("t")
            .with_commander(&["mex", "geo_t1", "bot_lab"])
            .with_constructor("con_1", &["geo_t1", "wind"]);
        let mut with_vent = order.clone();

        repair(&mut order, &MapConfig::default());
        assert_eq!(units(&order.commander_queue), vec!["mex", "bot_lab"]);
        assert_eq!(units(&order.constructor_queues["con_1"]), vec!["wind"]);

        repair(&mut with_vent, &MapConfig::default().with_geo(true));
        assert_eq!(with_vent.count_unit("geo_t1"), 2);
    }

    #[test]
    fn test_repair_is_idempotent() {
        let map = MapConfig::default().with_mex(2.0, 2);
        let mut order = BuildOrder::new("t").with_commander(&["mex", "mex", "mex", "geo_t1"]);
        repair(&mut order, &map);
        let once = order.clone();
        repair(&mut order, &map);
        assert_eq!(order, once);
    }
}
