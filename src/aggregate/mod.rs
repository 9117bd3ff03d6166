//! Merging per-thread samples into ranked cost tables
//!
//! Line, loop and procedure samples are merged per category on
//! (location, symbol); the call graph is kept per frame with a per-thread
//! ratio. Recorded file names are reconciled against the project before the
//! merge key is built, so two recorded paths naming the same project file
//! land in one record.

mod reconcile;

pub use reconcile::PathReconciler;

use crate::capture::{EventCounterSample, ProfilerSample, SampleSet};
use crate::source_location::SourceLocation;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Merged cost category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Line,
    Loop,
    Procedure,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::Line => "line",
            Category::Loop => "loop",
            Category::Procedure => "procedure",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a merged cost belongs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CostLocation {
    /// Recorded file mapped onto a project file
    Resolved(SourceLocation),
    /// Kept as recorded; `file` is `None` when the capture named no file
    Unresolved {
        file: Option<String>,
        start_line: u32,
        end_line: u32,
    },
}

impl CostLocation {
    pub fn resolved(&self) -> Option<&SourceLocation> {
        match self {
            CostLocation::Resolved(loc) => Some(loc),
            CostLocation::Unresolved { .. } => None,
        }
    }

    pub fn lines(&self) -> (u32, u32) {
        match self {
            CostLocation::Resolved(loc) => (loc.start_line, loc.end_line),
            CostLocation::Unresolved {
                start_line,
                end_line,
                ..
            } => (*start_line, *end_line),
        }
    }
}

impl fmt::Display for CostLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostLocation::Resolved(loc) => write!(f, "{loc}"),
            CostLocation::Unresolved {
                file,
                start_line,
                end_line,
            } => {
                let file = file.as_deref().unwrap_or("?");
                if start_line == end_line {
                    write!(f, "{file}:{start_line} (unresolved)")
                } else {
                    write!(f, "{file}:{start_line}-{end_line} (unresolved)")
                }
            }
        }
    }
}

/// One merged row of a cost table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedCost {
    pub category: Category,
    pub location: CostLocation,
    pub symbol: String,
    pub samples: f64,
    /// Share of the category total, `0.0` when the total is zero
    pub ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nest: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_kind: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_kind: Option<i16>,
}

/// One call-graph frame with its share of the thread
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallFrameCost {
    pub thread: usize,
    pub nest: i32,
    pub symbol: String,
    pub samples: f64,
    pub cumulative: f64,
    pub ratio: f64,
}

/// Everything a capture contributes, ranked
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostReport {
    pub lines: Vec<AggregatedCost>,
    pub loops: Vec<AggregatedCost>,
    pub procedures: Vec<AggregatedCost>,
    pub call_graph: Vec<CallFrameCost>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub event_counters: Vec<EventCounterSample>,
}

impl CostReport {
    pub fn category(&self, category: Category) -> &[AggregatedCost] {
        match category {
            Category::Line => &self.lines,
            Category::Loop => &self.loops,
            Category::Procedure => &self.procedures,
        }
    }

    pub fn category_mut(&mut self, category: Category) -> &mut Vec<AggregatedCost> {
        match category {
            Category::Line => &mut self.lines,
            Category::Loop => &mut self.loops,
            Category::Procedure => &mut self.procedures,
        }
    }

    /// Costs of all three categories
    pub fn costs(&self) -> impl Iterator<Item = &AggregatedCost> {
        self.lines
            .iter()
            .chain(self.loops.iter())
            .chain(self.procedures.iter())
    }
}

/// Merges sample sets, reconciling recorded file names on the way
#[derive(Debug, Default)]
pub struct SampleAggregator {
    reconciler: Option<PathReconciler>,
    resolved: HashMap<String, Option<PathBuf>>,
}

type MergeKey = (CostLocation, String);

impl SampleAggregator {
    /// Aggregator that leaves every location unresolved
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reconciler(reconciler: PathReconciler) -> Self {
        Self {
            reconciler: Some(reconciler),
            resolved: HashMap::new(),
        }
    }

    pub fn aggregate(&mut self, set: &SampleSet) -> CostReport {
        CostReport {
            lines: self.merge(Category::Line, &set.lines),
            loops: self.merge(Category::Loop, &set.loops),
            procedures: self.merge(Category::Procedure, &set.procedures),
            call_graph: call_graph_costs(&set.call_graph),
            event_counters: set.event_counters.clone(),
        }
    }

    /// Sum samples per (location, symbol), then rank by count
    pub fn merge(&mut self, category: Category, samples: &[ProfilerSample]) -> Vec<AggregatedCost> {
        let mut index: HashMap<MergeKey, usize> = HashMap::new();
        let mut merged: Vec<AggregatedCost> = Vec::new();

        for sample in samples {
            let location = self.locate(sample);
            let key = (location, sample.symbol.clone());
            match index.get(&key) {
                Some(&i) => merged[i].samples += sample.samples,
                None => {
                    index.insert(key.clone(), merged.len());
                    merged.push(AggregatedCost {
                        category,
                        location: key.0,
                        symbol: key.1,
                        samples: sample.samples,
                        ratio: 0.0,
                        nest: sample.nest,
                        loop_kind: sample.loop_kind,
                        parallel_kind: sample.parallel_kind,
                    });
                }
            }
        }

        rank(&mut merged);
        merged
    }

    fn locate(&mut self, sample: &ProfilerSample) -> CostLocation {
        let unresolved = || CostLocation::Unresolved {
            file: sample.file.clone(),
            start_line: sample.start_line,
            end_line: sample.end_line,
        };
        let (Some(recorded), Some(reconciler)) = (&sample.file, &self.reconciler) else {
            return unresolved();
        };

        let project_file = self
            .resolved
            .entry(recorded.clone())
            .or_insert_with(|| reconciler.resolve(recorded).map(PathBuf::from));

        match project_file {
            Some(path) => CostLocation::Resolved(SourceLocation::new(
                path.clone(),
                sample.start_line,
                sample.end_line,
            )),
            None => unresolved(),
        }
    }
}

/// Assign ratios from the merged total and sort descending, keeping
/// first-encounter order among equal counts
fn rank(costs: &mut [AggregatedCost]) {
    let total: f64 = costs.iter().map(|c| c.samples).sum();
    for cost in costs.iter_mut() {
        cost.ratio = if total > 0.0 {
            cost.samples / total
        } else {
            0.0
        };
    }
    costs.sort_by(|a, b| b.samples.total_cmp(&a.samples));
}

/// Per-frame costs; the ratio divides by the sum of the own samples of the
/// frame's thread
pub fn call_graph_costs(frames: &[ProfilerSample]) -> Vec<CallFrameCost> {
    let mut thread_sums: HashMap<usize, f64> = HashMap::new();
    for frame in frames {
        *thread_sums.entry(frame.thread).or_insert(0.0) += frame.samples;
    }

    frames
        .iter()
        .map(|frame| {
            let sum = thread_sums.get(&frame.thread).copied().unwrap_or(0.0);
            CallFrameCost {
                thread: frame.thread,
                nest: frame.nest.unwrap_or(0),
                symbol: frame.symbol.clone(),
                samples: frame.samples,
                cumulative: frame.cumulative.unwrap_or(0.0),
                ratio: if sum > 0.0 { frame.samples / sum } else { 0.0 },
            }
        })
        .collect()
}
