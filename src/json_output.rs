//! JSON output format for cost reports
//!
//! Provides machine-readable output of every analyzed capture, with the
//! ranked cost tables and, when a structural tree was supplied, the costs
//! placed on tree nodes.

use crate::aggregate::{AggregatedCost, CallFrameCost, CostLocation, CostReport};
use crate::capture::{Capture, EventCounterSample};
use crate::correlate::NodeCost;
use crate::report::CategorySelection;
use serde::Serialize;

/// One merged cost row
#[derive(Debug, Clone, Serialize)]
pub struct JsonCost {
    /// Merged sample count
    pub samples: f64,
    /// Share of the category total
    pub ratio: f64,
    /// Symbol the samples were attributed to
    pub symbol: String,
    /// Source file (project path when resolved, recorded name otherwise)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
    /// Whether the file was mapped onto a project file
    pub resolved: bool,
    /// Loop nesting level (loops only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nest: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_kind: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_kind: Option<i16>,
}

impl From<&AggregatedCost> for JsonCost {
    fn from(cost: &AggregatedCost) -> Self {
        let (start_line, end_line) = cost.location.lines();
        let (file, resolved) = match &cost.location {
            CostLocation::Resolved(loc) => (Some(loc.file().display().to_string()), true),
            CostLocation::Unresolved { file, .. } => (file.clone(), false),
        };
        Self {
            samples: cost.samples,
            ratio: cost.ratio,
            symbol: cost.symbol.clone(),
            file,
            start_line,
            end_line,
            resolved,
            nest: cost.nest,
            loop_kind: cost.loop_kind,
            parallel_kind: cost.parallel_kind,
        }
    }
}

/// Capture-level facts
#[derive(Debug, Clone, Serialize)]
pub struct JsonCaptureInfo {
    /// Path the capture was read from
    pub path: String,
    /// "dprf" or "eprf"
    pub format: String,
    /// "big" or "little"
    pub byte_order: String,
    pub threads: usize,
    /// Sampling interval recorded in the header
    pub sampling_interval: f32,
    /// Sections that ended at a section boundary before every thread was read
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub early_stops: Vec<String>,
}

impl JsonCaptureInfo {
    pub fn from_capture(path: &str, capture: &Capture) -> Self {
        Self {
            path: path.to_string(),
            format: format!("{:?}", capture.format).to_lowercase(),
            byte_order: format!("{:?}", capture.byte_order).to_lowercase(),
            threads: capture.thread_count(),
            sampling_interval: capture.header.sampling_interval,
            early_stops: capture.early_stops.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// An event-counter region located in the structural tree
#[derive(Debug, Clone, Serialize)]
pub struct JsonMeasurementArea {
    /// Counter group the region measures
    pub group: String,
    /// Node ID of the start call (or of the main program for "all")
    pub start: String,
    /// Node ID of the matching stop call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,
}

/// Analysis result of a single capture
#[derive(Debug, Clone, Serialize)]
pub struct JsonCaptureReport {
    pub capture: JsonCaptureInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<JsonCost>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loops: Option<Vec<JsonCost>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub procedures: Option<Vec<JsonCost>>,
    /// Call-graph frames in recorded order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_graph: Option<Vec<CallFrameCost>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub event_counters: Vec<EventCounterSample>,
    /// Costs placed on structural tree nodes (if --tree given)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_costs: Option<Vec<NodeCost>>,
}

/// Complete JSON output
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    pub captures: Vec<JsonCaptureReport>,
    /// Event-counter regions found in the tree (if --tree given)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub measurement_areas: Vec<JsonMeasurementArea>,
}

impl JsonOutput {
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "costscope-json-v1".to_string(),
            captures: Vec::new(),
            measurement_areas: Vec::new(),
        }
    }

    /// Add a capture's report; the category tables present in `shown`
    /// are included, the others omitted
    pub fn add_capture(
        &mut self,
        info: JsonCaptureInfo,
        report: &CostReport,
        shown: &CategorySelection,
        node_costs: Option<Vec<NodeCost>>,
    ) {
        let table = |costs: &[AggregatedCost]| costs.iter().map(JsonCost::from).collect();
        self.captures.push(JsonCaptureReport {
            capture: info,
            lines: shown.lines.then(|| table(&report.lines)),
            loops: shown.loops.then(|| table(&report.loops)),
            procedures: shown.procedures.then(|| table(&report.procedures)),
            call_graph: shown.call_graph.then(|| report.call_graph.clone()),
            event_counters: report.event_counters.clone(),
            node_costs,
        });
    }

    pub fn add_measurement_area(&mut self, area: JsonMeasurementArea) {
        self.measurement_areas.push(area);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}
