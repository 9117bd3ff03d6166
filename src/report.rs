//! Report shaping and the human-readable text format
//!
//! The text layout follows the classic profiler summary: one table per
//! category, percentage first, then samples, symbol and location.

use crate::aggregate::{AggregatedCost, Category, CallFrameCost, CostReport};
use crate::capture::Capture;
use crate::correlate::NodeCost;
use std::fmt;

/// Which tables a report shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategorySelection {
    pub lines: bool,
    pub loops: bool,
    pub procedures: bool,
    pub call_graph: bool,
}

impl CategorySelection {
    pub fn all() -> Self {
        Self {
            lines: true,
            loops: true,
            procedures: true,
            call_graph: true,
        }
    }

    /// A single merged category
    pub fn only(category: Category) -> Self {
        Self {
            lines: category == Category::Line,
            loops: category == Category::Loop,
            procedures: category == Category::Procedure,
            call_graph: false,
        }
    }

    pub fn call_graph_only() -> Self {
        Self {
            lines: false,
            loops: false,
            procedures: false,
            call_graph: true,
        }
    }

    pub fn includes(&self, category: Category) -> bool {
        match category {
            Category::Line => self.lines,
            Category::Loop => self.loops,
            Category::Procedure => self.procedures,
        }
    }
}

impl Default for CategorySelection {
    fn default() -> Self {
        Self::all()
    }
}

/// Drop rows below `min_ratio` and keep at most `top` rows of every merged
/// category; call-graph frames are only subject to `min_ratio`
pub fn limit(report: &mut CostReport, top: Option<usize>, min_ratio: f64) {
    for category in [Category::Line, Category::Loop, Category::Procedure] {
        let costs = report.category_mut(category);
        costs.retain(|c| c.ratio >= min_ratio);
        if let Some(top) = top {
            costs.truncate(top);
        }
    }
    report.call_graph.retain(|f| f.ratio >= min_ratio);
}

/// Text rendering of one capture's report
pub struct TextReport<'a> {
    pub path: &'a str,
    pub capture: &'a Capture,
    pub report: &'a CostReport,
    pub selection: CategorySelection,
    pub node_costs: Option<&'a [NodeCost]>,
}

impl TextReport<'_> {
    fn write_costs(&self, f: &mut fmt::Formatter<'_>, category: Category) -> fmt::Result {
        let costs = self.report.category(category);
        writeln!(f)?;
        writeln!(f, "{} costs:", category)?;
        if costs.is_empty() {
            return writeln!(f, "  (none)");
        }
        writeln!(f, "% cost      samples symbol                         location")?;
        writeln!(f, "------ ------------ ------------------------------ --------------------")?;
        for cost in costs {
            write_cost_row(f, cost)?;
        }
        Ok(())
    }

    fn write_call_graph(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "call graph:")?;
        if self.report.call_graph.is_empty() {
            return writeln!(f, "  (none)");
        }
        let mut thread = None;
        for frame in &self.report.call_graph {
            if thread != Some(frame.thread) {
                writeln!(f, "  thread {}:", frame.thread)?;
                thread = Some(frame.thread);
            }
            write_frame_row(f, frame)?;
        }
        Ok(())
    }
}

fn write_cost_row(f: &mut fmt::Formatter<'_>, cost: &AggregatedCost) -> fmt::Result {
    write!(
        f,
        "{:6.2} {:>12} {:<30} {}",
        cost.ratio * 100.0,
        cost.samples,
        cost.symbol,
        cost.location
    )?;
    if let Some(nest) = cost.nest {
        write!(f, " [nest {nest}]")?;
    }
    writeln!(f)
}

fn write_frame_row(f: &mut fmt::Formatter<'_>, frame: &CallFrameCost) -> fmt::Result {
    let depth = usize::try_from(frame.nest).unwrap_or(0);
    writeln!(
        f,
        "  {:6.2} {:>10} {:>10} {}{}",
        frame.ratio * 100.0,
        frame.samples,
        frame.cumulative,
        "  ".repeat(depth),
        frame.symbol
    )
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let capture = self.capture;
        writeln!(
            f,
            "{}: {} capture, {} thread(s), sampling interval {}s",
            self.path,
            capture.format,
            capture.thread_count(),
            capture.header.sampling_interval
        )?;
        if !capture.header.measured_at.is_empty() {
            writeln!(f, "measured at {}", capture.header.measured_at)?;
        }
        for section in &capture.early_stops {
            writeln!(f, "note: {section} section ended early at a section boundary")?;
        }

        for category in [Category::Procedure, Category::Loop, Category::Line] {
            if self.selection.includes(category) {
                self.write_costs(f, category)?;
            }
        }
        if self.selection.call_graph && capture.header.has_call_graph() {
            self.write_call_graph(f)?;
        }

        if !self.report.event_counters.is_empty() {
            writeln!(f)?;
            writeln!(f, "event counters:")?;
            for region in &self.report.event_counters {
                writeln!(
                    f,
                    "  thread {} {}: {} call(s), elapsed {:.6}s user {:.6}s system {:.6}s",
                    region.thread,
                    region.group,
                    region.calls,
                    region.elapsed,
                    region.user,
                    region.system
                )?;
            }
        }

        if let Some(node_costs) = self.node_costs {
            writeln!(f)?;
            writeln!(f, "tree nodes:")?;
            if node_costs.is_empty() {
                writeln!(f, "  (no cost matched the tree)")?;
            }
            for cost in node_costs {
                writeln!(
                    f,
                    "  {:6.2} {:<9} {} {}",
                    cost.ratio * 100.0,
                    cost.category,
                    cost.namespace,
                    cost.node_id
                )?;
            }
        }
        Ok(())
    }
}
