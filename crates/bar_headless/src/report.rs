//! Human-readable simulation reports.
//!
//! Reports are rendered into a `String` so the binary decides where they
//! go (stdout) and tests can inspect them.

use std::fmt::Write;

use bar_core::catalog::UnitCatalog;
use bar_core::result::SimResult;

const RULE_WIDTH: usize = 70;

/// Stall factors at or above this are not shown in the snapshot table.
const STALL_DISPLAY_THRESHOLD: f64 = 0.95;

/// `m:ss`.
#[must_use]
pub fn fmt_time(tick: u32) -> String {
    format!("{}:{:02}", tick / 60, tick % 60)
}

/// One decimal below 1000, none above.
#[must_use]
pub fn fmt_rate(value: f64) -> String {
    if value >= 1000.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n--- {title} ---");
}

/// The full report: header, timeline, milestones, snapshots, stalls, army
/// composition, goals and summary.
#[must_use]
pub fn full_report(result: &SimResult, catalog: &UnitCatalog) -> String {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "  BAR BUILD ORDER SIMULATOR");
    let _ = writeln!(out, "  Build Order: {}", result.build_order_name);
    if let Some(strategy) = &result.strategy_used {
        let _ = writeln!(out, "  Strategy: {strategy}");
    }
    let _ = writeln!(out, "  Duration: {}", fmt_time(result.total_ticks));
    let _ = writeln!(out, "{rule}");

    timeline(&mut out, result, catalog);
    milestones(&mut out, result);
    snapshots(&mut out, result);
    stalls(&mut out, result);
    army(&mut out, result);
    goals(&mut out, result);
    summary(&mut out, result);
    out
}

fn timeline(out: &mut String, result: &SimResult, catalog: &UnitCatalog) {
    section(out, "CONSTRUCTION TIMELINE");
    let _ = writeln!(
        out,
        " {:>6}  {:<14} {:<24} {:>6} {:>7}",
        "Time", "Builder", "Completed", "M/s", "E/s"
    );
    for entry in &result.completion_log {
        let (metal, energy) = result
            .milestones
            .iter()
            .find(|m| m.tick == entry.tick)
            .map(|m| (m.metal_income, m.energy_income))
            .or_else(|| {
                result
                    .snapshot_at(entry.tick)
                    .map(|s| (s.metal_income, s.energy_income))
            })
            .unwrap_or((0.0, 0.0));
        let name = catalog
            .lookup(&entry.unit)
            .map_or(entry.unit.as_str(), |u| u.name.as_str());
        let _ = writeln!(
            out,
            " {:>6}  {:<14} {:<24} {:>6} {:>7}",
            fmt_time(entry.tick),
            entry.builder,
            name,
            fmt_rate(metal),
            fmt_rate(energy)
        );
    }
}

fn milestones(out: &mut String, result: &SimResult) {
    if result.milestones.is_empty() {
        return;
    }
    section(out, "MILESTONES");
    let mut sorted: Vec<_> = result.milestones.iter().collect();
    sorted.sort_by_key(|m| m.tick);
    for m in sorted {
        let _ = writeln!(
            out,
            " {:<22} {:>6}  (M: {}/s, E: {}/s)",
            m.kind.key(),
            fmt_time(m.tick),
            fmt_rate(m.metal_income),
            fmt_rate(m.energy_income)
        );
    }
}

fn snapshots(out: &mut String, result: &SimResult) {
    section(out, "ECONOMY SNAPSHOTS");
    let _ = writeln!(
        out,
        " {:>6} {:>6} {:>7} {:>8} {:>8} {:>5} {:>8} {:>6}",
        "Time", "M/s", "E/s", "M strd", "E strd", "BP", "Army M", "Stall"
    );
    for s in &result.snapshots {
        let stall = if s.stall_factor >= STALL_DISPLAY_THRESHOLD {
            String::new()
        } else {
            format!("{:.0}%", s.stall_factor * 100.0)
        };
        let _ = writeln!(
            out,
            " {:>6} {:>6} {:>7} {:>8.0} {:>8.0} {:>5.0} {:>8.0} {:>6}",
            fmt_time(s.tick),
            fmt_rate(s.metal_income),
            fmt_rate(s.energy_income),
            s.metal_stored,
            s.energy_stored,
            s.build_power,
            s.army_value_metal,
            stall
        );
    }
}

fn stalls(out: &mut String, result: &SimResult) {
    section(out, "STALL EVENTS");
    if result.stall_events.is_empty() {
        let _ = writeln!(out, " None! (clean build order)");
        return;
    }
    for e in &result.stall_events {
        let _ = writeln!(
            out,
            " {}-{} {:<8} {:>3}s  severity: {:.0}%",
            fmt_time(e.start_tick),
            fmt_time(e.end_tick),
            e.resource.name(),
            e.duration(),
            e.severity * 100.0
        );
    }
}

fn army(out: &mut String, result: &SimResult) {
    let total: u32 = result.army_composition_final.values().sum();
    if total == 0 {
        return;
    }
    section(out, "ARMY COMPOSITION");
    let _ = writeln!(out, " {:<16} {:>6} {:>6}", "Role", "Count", "%");
    for (role, count) in &result.army_composition_final {
        let pct = f64::from(*count) / f64::from(total) * 100.0;
        let _ = writeln!(out, " {:<16} {count:>6} {pct:>5.1}%", role.to_string());
    }
    let _ = writeln!(out, " {:<16} {total:>6}", "TOTAL");
}

fn goals(out: &mut String, result: &SimResult) {
    if result.goal_completions.is_empty() {
        return;
    }
    section(out, "GOAL COMPLETIONS");
    for g in &result.goal_completions {
        let _ = writeln!(out, " {:>6}  {}", fmt_time(g.tick), g.description);
    }
}

fn summary(out: &mut String, result: &SimResult) {
    section(out, "SUMMARY");
    let _ = writeln!(out, " Total army value:     {:.0} metal", result.total_army_metal_value);
    let _ = writeln!(out, " Peak M/s:             {}", fmt_rate(result.peak_metal_income));
    let _ = writeln!(out, " Peak E/s:             {}", fmt_rate(result.peak_energy_income));
    let _ = writeln!(out, " Metal stall seconds:  {}", result.metal_stall_seconds);
    let _ = writeln!(out, " Energy stall seconds: {}", result.energy_stall_seconds);
    let firsts = [
        ("First mex:", result.time_to_first_mex),
        ("First factory:", result.time_to_first_factory),
        ("First constructor:", result.time_to_first_constructor),
        ("First nano:", result.time_to_first_nano),
        ("First T2 lab:", result.time_to_t2_lab),
    ];
    for (label, tick) in firsts {
        if let Some(tick) = tick {
            let _ = writeln!(out, " {label:<21} {}", fmt_time(tick));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bar_core::build_order::BuildOrder;
    use bar_core::simulation::simulate;
    use std::sync::Arc;

    #[test]
    fn test_time_and_rate_formats() {
        assert_eq!(fmt_time(0), "0:00");
        assert_eq!(fmt_time(65), "1:05");
        assert_eq!(fmt_time(600), "10:00");
        assert_eq!(fmt_rate(12.34), "12.3");
        assert_eq!(fmt_rate(999.96), "1000.0");
        assert_eq!(fmt_rate(1234.5), "1234");
    }

    #[test]
    fn test_report_sections() {
        let catalog = Arc::new(UnitCatalog::standard());
        let order = BuildOrder::new("Report").with_commander(&["mex", "mex", "solar", "bot_lab"]);
        let result = simulate(&order, Arc::clone(&catalog), 120, 1).unwrap();
        let report = full_report(&result, &catalog);

        assert!(report.contains("Build Order: Report"));
        assert!(report.contains("Duration: 2:00"));
        assert!(report.contains("--- CONSTRUCTION TIMELINE ---"));
        assert!(report.contains("--- ECONOMY SNAPSHOTS ---"));
        assert!(report.contains("--- SUMMARY ---"));
        assert!(report.contains("commander"));
        assert!(!report.contains("GOAL COMPLETIONS"));
    }

    #[test]
    fn test_stall_free_and_goal_sections() {
        let catalog = UnitCatalog::standard();
        let mut result = SimResult::new("Empty", 60, 0);
        let report = full_report(&result, &catalog);
        assert!(report.contains("None! (clean build order)"));
        assert!(!report.contains("ARMY COMPOSITION"));

        result.goal_completions.push(bar_core::goals::GoalCompletion {
            tick: 95,
            description: "Build 2x mex".into(),
        });
        let report = full_report(&result, &catalog);
        assert!(report.contains("--- GOAL COMPLETIONS ---"));
        assert!(report.contains("1:35  Build 2x mex"));
    }
}
