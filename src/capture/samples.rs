//! Flattening decoded sections into per-thread sample records

use super::Capture;
use serde::Serialize;

/// What a sample measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    Line,
    Loop,
    Procedure,
    CallFrame,
}

/// One per-thread measurement with table indices resolved to names
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfilerSample {
    pub kind: SampleKind,
    pub samples: f64,
    pub symbol: String,
    /// File name exactly as recorded by the profiler
    pub file: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
    pub nest: Option<i32>,
    pub loop_kind: Option<i16>,
    pub parallel_kind: Option<i16>,
    pub thread: usize,
    /// Cumulative (inclusive) samples of a call frame
    pub cumulative: Option<f64>,
}

/// One event-counter region measured on one thread
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventCounterSample {
    pub group: String,
    pub thread: usize,
    pub calls: i32,
    pub elapsed: f64,
    pub user: f64,
    pub system: f64,
    pub counters: Vec<f64>,
}

/// Everything a capture contributes to aggregation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SampleSet {
    pub lines: Vec<ProfilerSample>,
    pub loops: Vec<ProfilerSample>,
    pub procedures: Vec<ProfilerSample>,
    pub call_graph: Vec<ProfilerSample>,
    pub event_counters: Vec<EventCounterSample>,
}

fn line_number(raw: i32) -> u32 {
    u32::try_from(raw).unwrap_or(0)
}

impl Capture {
    fn file_name(&self, index: i32) -> Option<String> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.files.get(i))
            .cloned()
    }

    fn symbol_name(&self, thread: usize, index: i32) -> String {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.symbols.get(thread)?.get(i))
            .map(|s| s.name.clone())
            .unwrap_or_default()
    }

    /// Per-thread samples for every category
    pub fn samples(&self) -> SampleSet {
        let mut set = SampleSet::default();

        for (thread, records) in self.symbols.iter().enumerate() {
            for sym in records {
                set.procedures.push(ProfilerSample {
                    kind: SampleKind::Procedure,
                    samples: f64::from(sym.samples),
                    symbol: sym.name.clone(),
                    file: self.file_name(sym.file),
                    start_line: line_number(sym.start_line),
                    end_line: line_number(sym.end_line),
                    nest: None,
                    loop_kind: None,
                    parallel_kind: None,
                    thread,
                    cumulative: None,
                });
            }
        }

        for (thread, records) in self.lines.iter().enumerate() {
            for rec in records {
                set.lines.push(ProfilerSample {
                    kind: SampleKind::Line,
                    samples: f64::from(rec.samples),
                    symbol: self.symbol_name(thread, rec.symbol),
                    file: self.file_name(rec.file),
                    start_line: line_number(rec.line),
                    end_line: line_number(rec.line),
                    nest: None,
                    loop_kind: None,
                    parallel_kind: None,
                    thread,
                    cumulative: None,
                });
            }
        }

        for (thread, records) in self.loops.iter().enumerate() {
            for rec in records {
                set.loops.push(ProfilerSample {
                    kind: SampleKind::Loop,
                    samples: f64::from(rec.samples),
                    symbol: self.symbol_name(thread, rec.symbol),
                    file: self.file_name(rec.file),
                    start_line: line_number(rec.start_line),
                    end_line: line_number(rec.end_line),
                    nest: Some(rec.nest),
                    loop_kind: Some(rec.loop_kind),
                    parallel_kind: Some(rec.parallel_kind),
                    thread,
                    cumulative: None,
                });
            }
        }

        for (thread, graph) in self.call_graph.iter().enumerate() {
            for frame in &graph.frames {
                set.call_graph.push(ProfilerSample {
                    kind: SampleKind::CallFrame,
                    samples: f64::from(frame.samples),
                    symbol: frame.name.clone(),
                    file: None,
                    start_line: 0,
                    end_line: 0,
                    nest: Some(frame.nest),
                    loop_kind: None,
                    parallel_kind: None,
                    thread,
                    cumulative: Some(f64::from(frame.cumulative)),
                });
            }
        }

        for (thread, records) in self.event_counters.iter().enumerate() {
            for rec in records {
                set.event_counters.push(EventCounterSample {
                    group: rec.group.clone(),
                    thread,
                    calls: rec.calls,
                    elapsed: f64::from(rec.elapsed),
                    user: f64::from(rec.user),
                    system: f64::from(rec.system),
                    counters: rec.counters.clone(),
                });
            }
        }

        set
    }
}
