//! Side-by-side comparison of simulation results.

use std::fmt::Write;

use bar_core::result::{MilestoneKind, SimResult};
use bar_core::strategy::UnitRole;

use crate::report::{fmt_rate, fmt_time};

/// Ticks at which economies are compared.
pub const ECONOMY_CHECKPOINTS: [u32; 3] = [180, 300, 420];

/// Checkpoint used for the economy and army categories.
const WINNER_CHECKPOINT: u32 = 300;

const MIN_COLUMN_WIDTH: usize = 20;

/// Winner of one comparison category.
#[derive(Debug, Clone, PartialEq)]
pub struct Winner {
    /// Category label.
    pub category: &'static str,
    /// Index of the winning result.
    pub index: usize,
    /// Winning value.
    pub value: f64,
}

fn first_factory(result: &SimResult) -> f64 {
    result
        .time_to_first_factory
        .map_or(f64::INFINITY, f64::from)
}

fn income_at(result: &SimResult, tick: u32) -> f64 {
    result.snapshot_at(tick).map_or(0.0, |s| s.metal_income)
}

fn army_at(result: &SimResult, tick: u32) -> f64 {
    result.snapshot_at(tick).map_or(0.0, |s| s.army_value_metal)
}

fn total_stall(result: &SimResult) -> f64 {
    f64::from(result.total_stall_seconds())
}

fn pick(
    results: &[SimResult],
    category: &'static str,
    metric: impl Fn(&SimResult) -> f64,
    lower_is_better: bool,
) -> Option<Winner> {
    let mut best: Option<(usize, f64)> = None;
    for (index, value) in results.iter().map(&metric).enumerate() {
        let better = match best {
            None => true,
            Some((_, current)) if lower_is_better => value < current,
            Some((_, current)) => value > current,
        };
        if better {
            best = Some((index, value));
        }
    }
    best.filter(|(_, value)| value.is_finite())
        .map(|(index, value)| Winner {
            category,
            index,
            value,
        })
}

/// Category winners. Ties go to the earlier result; a category where
/// nobody has a finite value is left out.
#[must_use]
pub fn winners(results: &[SimResult]) -> Vec<Winner> {
    [
        pick(results, "Fastest Factory", first_factory, true),
        pick(results, "Best 5:00 eco", |r| income_at(r, WINNER_CHECKPOINT), false),
        pick(results, "Best 5:00 army", |r| army_at(r, WINNER_CHECKPOINT), false),
        pick(results, "Least stalling", total_stall, true),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn row(out: &mut String, label: &str, width: usize, cells: impl IntoIterator<Item = String>) {
    let _ = write!(out, " {label:<22}");
    for cell in cells {
        let _ = write!(out, "{cell:>width$}");
    }
    let _ = writeln!(out);
}

fn opt_time(tick: Option<u32>) -> String {
    tick.map_or_else(|| "-".to_string(), fmt_time)
}

/// Render a comparison table for two or more results.
#[must_use]
pub fn compare_report(results: &[SimResult]) -> String {
    let mut out = String::new();
    let width = results
        .iter()
        .map(|r| r.build_order_name.len() + 2)
        .max()
        .unwrap_or(0)
        .max(MIN_COLUMN_WIDTH);
    let rule = "=".repeat(23 + width * results.len());

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "  BUILD ORDER COMPARISON");
    let _ = writeln!(out, "{rule}");
    row(&mut out, "", width, results.iter().map(|r| r.build_order_name.clone()));

    let _ = writeln!(out, "\n--- MILESTONES ---");
    let milestones = [
        MilestoneKind::FirstFactory,
        MilestoneKind::FirstConstructor,
        MilestoneKind::FirstNano,
        MilestoneKind::FirstT2Lab,
    ];
    for kind in milestones {
        row(
            &mut out,
            kind.key(),
            width,
            results.iter().map(|r| opt_time(r.milestone(kind).map(|m| m.tick))),
        );
    }

    for tick in ECONOMY_CHECKPOINTS {
        let _ = writeln!(out, "\n--- ECONOMY @ {} ---", fmt_time(tick));
        let snaps: Vec<_> = results.iter().map(|r| r.snapshot_at(tick)).collect();
        let cell = |f: fn(&bar_core::result::Snapshot) -> String| {
            snaps
                .iter()
                .map(move |s| s.map_or_else(|| "-".to_string(), f))
                .collect::<Vec<_>>()
        };
        row(&mut out, "M/s", width, cell(|s| fmt_rate(s.metal_income)));
        row(&mut out, "E/s", width, cell(|s| fmt_rate(s.energy_income)));
        row(&mut out, "Stored M", width, cell(|s| format!("{:.0}", s.metal_stored)));
        row(&mut out, "Army Value", width, cell(|s| format!("{:.0}", s.army_value_metal)));
    }

    if results.iter().any(|r| !r.army_composition_final.is_empty()) {
        let _ = writeln!(out, "\n--- ARMY COMPOSITION ---");
        let mut roles: Vec<UnitRole> = results
            .iter()
            .flat_map(|r| r.army_composition_final.keys().copied())
            .collect();
        roles.sort();
        roles.dedup();
        for role in roles {
            row(
                &mut out,
                &role.to_string(),
                width,
                results.iter().map(|r| {
                    r.army_composition_final
                        .get(&role)
                        .copied()
                        .unwrap_or(0)
                        .to_string()
                }),
            );
        }
    }

    let _ = writeln!(out, "\n--- STALLING ---");
    row(
        &mut out,
        "Metal stall (s)",
        width,
        results.iter().map(|r| r.metal_stall_seconds.to_string()),
    );
    row(
        &mut out,
        "Energy stall (s)",
        width,
        results.iter().map(|r| r.energy_stall_seconds.to_string()),
    );

    let _ = writeln!(out, "\n--- WINNER BY CATEGORY ---");
    for winner in winners(results) {
        let _ = writeln!(
            out,
            " {:<22} {}",
            winner.category, results[winner.index].build_order_name
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bar_core::build_order::BuildOrder;
    use bar_core::catalog::UnitCatalog;
    use bar_core::simulation::simulate;
    use std::sync::Arc;

    fn run(order: &BuildOrder) -> SimResult {
        simulate(order, Arc::new(UnitCatalog::standard()), 420, 7).unwrap()
    }

    #[test]
    fn test_fastest_factory_wins() {
        let quick = run(&BuildOrder::new("Quick Lab").with_commander(&["bot_lab", "mex", "mex"]));
        let slow = run(&BuildOrder::new("Slow Lab").with_commander(&["mex", "mex", "mex", "solar", "bot_lab"]));
        let results = [slow, quick];

        let w = winners(&results);
        let factory = w.iter().find(|w| w.category == "Fastest Factory").unwrap();
        assert_eq!(factory.index, 1);
    }

    #[test]
    fn test_no_factory_category_skipped() {
        let a = SimResult::new("a", 60, 0);
        let b = SimResult::new("b", 60, 0);
        let w = winners(&[a, b]);
        assert!(w.iter().all(|w| w.category != "Fastest Factory"));
        let stall = w.iter().find(|w| w.category == "Least stalling").unwrap();
        assert_eq!(stall.index, 0);
    }

    #[test]
    fn test_report_layout() {
        let a = run(&BuildOrder::new("Alpha").with_commander(&["mex", "mex", "bot_lab"]));
        let b = run(&BuildOrder::new("A Much Longer Build Order Name").with_commander(&["mex", "solar"]));
        let report = compare_report(&[a, b]);

        assert!(report.contains("--- MILESTONES ---"));
        assert!(report.contains("first_factory"));
        assert!(report.contains("--- ECONOMY @ 3:00 ---"));
        assert!(report.contains("--- ECONOMY @ 7:00 ---"));
        assert!(report.contains("--- WINNER BY CATEGORY ---"));
        assert!(report.contains("Fastest Factory        Alpha"));
        assert!(!report.contains("ARMY COMPOSITION"));
    }
}
