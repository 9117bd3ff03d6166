//! CSV output format for cost reports
//!
//! Provides spreadsheet-friendly output: one row per merged cost, followed
//! by call-graph frames when they are selected.

use crate::aggregate::{AggregatedCost, CallFrameCost, CostLocation, CostReport};
use crate::report::CategorySelection;

/// CSV rendering of one or more capture reports
#[derive(Debug, Default)]
pub struct CsvOutput {
    cost_rows: Vec<String>,
    frame_rows: Vec<String>,
}

impl CsvOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the selected tables of a capture's report
    pub fn add_report(&mut self, capture: &str, report: &CostReport, shown: &CategorySelection) {
        for cost in report.costs().filter(|c| shown.includes(c.category)) {
            self.cost_rows.push(self.format_cost(capture, cost));
        }
        if shown.call_graph {
            for frame in &report.call_graph {
                self.frame_rows.push(self.format_frame(capture, frame));
            }
        }
    }

    fn cost_header(&self) -> &'static str {
        "capture,category,symbol,file,start_line,end_line,resolved,samples,ratio,nest"
    }

    fn frame_header(&self) -> &'static str {
        "capture,thread,nest,symbol,samples,cumulative,ratio"
    }

    /// Quote a field containing a comma, quote or newline
    fn escape_field(&self, field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn format_cost(&self, capture: &str, cost: &AggregatedCost) -> String {
        let (file, resolved) = match &cost.location {
            CostLocation::Resolved(loc) => (loc.file().display().to_string(), true),
            CostLocation::Unresolved { file, .. } => (file.clone().unwrap_or_default(), false),
        };
        let (start, end) = cost.location.lines();
        format!(
            "{},{},{},{},{},{},{},{},{:.6},{}",
            self.escape_field(capture),
            cost.category,
            self.escape_field(&cost.symbol),
            self.escape_field(&file),
            start,
            end,
            resolved,
            cost.samples,
            cost.ratio,
            cost.nest.map(|n| n.to_string()).unwrap_or_default()
        )
    }

    fn format_frame(&self, capture: &str, frame: &CallFrameCost) -> String {
        format!(
            "{},{},{},{},{},{},{:.6}",
            self.escape_field(capture),
            frame.thread,
            frame.nest,
            self.escape_field(&frame.symbol),
            frame.samples,
            frame.cumulative,
            frame.ratio
        )
    }

    /// Costs table, then a blank line and the frames table when any frame
    /// was added
    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str(self.cost_header());
        output.push('\n');
        for row in &self.cost_rows {
            output.push_str(row);
            output.push('\n');
        }

        if !self.frame_rows.is_empty() {
            output.push('\n');
            output.push_str(self.frame_header());
            output.push('\n');
            for row in &self.frame_rows {
                output.push_str(row);
                output.push('\n');
            }
        }

        output
    }
}
