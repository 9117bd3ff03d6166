//! Symbol filtering for --filter expressions
//!
//! A filter is a regular expression matched (unanchored) against the
//! symbol of every merged cost and call-graph frame.

use crate::aggregate::CostReport;
use anyhow::{bail, Context, Result};
use regex::Regex;

/// Decides which symbols appear in a report
#[derive(Debug, Clone)]
pub struct SymbolFilter {
    /// Pattern a symbol must match (None = all symbols)
    include: Option<Regex>,
}

impl SymbolFilter {
    /// Create a filter that keeps every symbol
    pub fn all() -> Self {
        Self { include: None }
    }

    /// Build a filter from a regular expression
    pub fn from_pattern(pattern: &str) -> Result<Self> {
        if pattern.trim().is_empty() {
            bail!("Invalid filter expression: pattern is empty");
        }
        let regex = Regex::new(pattern)
            .with_context(|| format!("Invalid filter expression: {pattern}"))?;
        Ok(Self {
            include: Some(regex),
        })
    }

    pub fn should_show(&self, symbol: &str) -> bool {
        match &self.include {
            None => true,
            Some(regex) => regex.is_match(symbol),
        }
    }

    /// Drop every cost and frame whose symbol does not match; ratios are
    /// left relative to the unfiltered totals
    pub fn apply(&self, report: &mut CostReport) {
        if self.include.is_none() {
            return;
        }
        report.lines.retain(|c| self.should_show(&c.symbol));
        report.loops.retain(|c| self.should_show(&c.symbol));
        report.procedures.retain(|c| self.should_show(&c.symbol));
        report.call_graph.retain(|f| self.should_show(&f.symbol));
    }
}
