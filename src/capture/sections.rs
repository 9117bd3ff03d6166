//! Offset table and the per-thread record sections

use super::cursor::Cursor;
use super::Result;
use serde::Serialize;

/// Absolute byte offsets of the optional sections; `<= 0` means absent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SectionOffsets {
    pub line: i32,
    pub loops: i32,
    pub call_graph: i32,
    /// MPI timing in sampling captures, event counters in counter captures
    pub reserved: i32,
    pub file: i32,
    pub symbol: i32,
}

impl SectionOffsets {
    pub(crate) fn read(cursor: &mut Cursor<'_>) -> Result<Self> {
        Ok(Self {
            line: cursor.i32("line_offset")?,
            loops: cursor.i32("loop_offset")?,
            call_graph: cursor.i32("call_graph_offset")?,
            reserved: cursor.i32("reserved_offset")?,
            file: cursor.i32("file_offset")?,
            symbol: cursor.i32("symbol_offset")?,
        })
    }

    fn all(&self) -> [i32; 6] {
        [
            self.line,
            self.loops,
            self.call_graph,
            self.reserved,
            self.file,
            self.symbol,
        ]
    }

    /// Smallest positive offset strictly after `position`
    pub fn next_boundary(&self, position: usize) -> Option<usize> {
        self.all()
            .into_iter()
            .filter_map(|o| usize::try_from(o).ok())
            .filter(|&o| o > 0 && o > position)
            .min()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolRecord {
    pub samples: f32,
    pub barrier_wait: f32,
    pub mpi_cost: f32,
    pub start_line: i32,
    pub end_line: i32,
    /// Index into the file table; negative means no file
    pub file: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineRecord {
    pub samples: f32,
    pub line: i32,
    /// Index into the same thread's symbol list
    pub symbol: i32,
    pub file: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopRecord {
    pub samples: f32,
    pub barrier_wait: f32,
    pub mpi_cost: f32,
    pub start_line: i32,
    pub end_line: i32,
    pub nest: i32,
    pub loop_kind: i16,
    pub parallel_kind: i16,
    pub symbol: i32,
    pub file: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallFrame {
    pub nest: i32,
    pub samples: f32,
    pub cumulative: f32,
    pub name: String,
}

/// One thread's call-graph section
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThreadCallGraph {
    /// Total recorded by the profiler; informational only
    pub total: f32,
    pub frames: Vec<CallFrame>,
}

/// Event-counter measurement of one named region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventCounterRecord {
    pub group: String,
    pub calls: i32,
    pub elapsed: f32,
    pub user: f32,
    pub system: f32,
    pub counters: Vec<f64>,
}

/// Outcome of a guarded per-thread section read
pub(crate) struct Guarded<T> {
    pub threads: Vec<Vec<T>>,
    pub stopped_early: bool,
}

pub(crate) fn read_files(cursor: &mut Cursor<'_>) -> Result<Vec<String>> {
    let count = cursor.count("file_count")?;
    let mut files = Vec::with_capacity(count.min(cursor.remaining() / 4));
    for _ in 0..count {
        files.push(cursor.string("file_name")?);
    }
    Ok(files)
}

/// Read `threads` count-prefixed record lists, stopping once the cursor
/// reaches `boundary`
pub(crate) fn read_guarded<T>(
    cursor: &mut Cursor<'_>,
    threads: usize,
    boundary: Option<usize>,
    section: &'static str,
    mut read_record: impl FnMut(&mut Cursor<'_>) -> Result<T>,
) -> Result<Guarded<T>> {
    let reached = |cursor: &Cursor<'_>| boundary.is_some_and(|b| cursor.position() >= b);
    let mut out = Vec::with_capacity(threads);

    for thread in 0..threads {
        if reached(cursor) {
            tracing::debug!(
                "{} section reached offset {:?} before thread {}; remaining threads skipped",
                section,
                boundary,
                thread
            );
            return Ok(Guarded {
                threads: out,
                stopped_early: true,
            });
        }

        let count = cursor.count(section)?;
        let mut records = Vec::with_capacity(count.min(cursor.remaining()));
        for index in 0..count {
            if reached(cursor) {
                tracing::debug!(
                    "{} section reached offset {:?} at record {} of thread {}",
                    section,
                    boundary,
                    index,
                    thread
                );
                out.push(records);
                return Ok(Guarded {
                    threads: out,
                    stopped_early: true,
                });
            }
            records.push(read_record(cursor)?);
        }
        out.push(records);
    }

    Ok(Guarded {
        threads: out,
        stopped_early: false,
    })
}

pub(crate) fn read_symbol(cursor: &mut Cursor<'_>) -> Result<SymbolRecord> {
    Ok(SymbolRecord {
        samples: cursor.f32("symbol_samples")?,
        barrier_wait: cursor.f32("symbol_barrier_wait")?,
        mpi_cost: cursor.f32("symbol_mpi_cost")?,
        start_line: cursor.i32("symbol_start_line")?,
        end_line: cursor.i32("symbol_end_line")?,
        file: cursor.i32("symbol_file")?,
        name: cursor.string("symbol_name")?,
    })
}

pub(crate) fn read_line(cursor: &mut Cursor<'_>) -> Result<LineRecord> {
    Ok(LineRecord {
        samples: cursor.f32("line_samples")?,
        line: cursor.i32("line_number")?,
        symbol: cursor.i32("line_symbol")?,
        file: cursor.i32("line_file")?,
    })
}

pub(crate) fn read_loop(cursor: &mut Cursor<'_>) -> Result<LoopRecord> {
    Ok(LoopRecord {
        samples: cursor.f32("loop_samples")?,
        barrier_wait: cursor.f32("loop_barrier_wait")?,
        mpi_cost: cursor.f32("loop_mpi_cost")?,
        start_line: cursor.i32("loop_start_line")?,
        end_line: cursor.i32("loop_end_line")?,
        nest: cursor.i32("loop_nest")?,
        loop_kind: cursor.i16("loop_kind")?,
        parallel_kind: cursor.i16("loop_parallel_kind")?,
        symbol: cursor.i32("loop_symbol")?,
        file: cursor.i32("loop_file")?,
    })
}

pub(crate) fn read_event_counter(
    cursor: &mut Cursor<'_>,
    counter_width: usize,
) -> Result<EventCounterRecord> {
    let mut record = EventCounterRecord {
        group: cursor.string("event_group")?,
        calls: cursor.i32("event_calls")?,
        elapsed: cursor.f32("event_elapsed")?,
        user: cursor.f32("event_user")?,
        system: cursor.f32("event_system")?,
        counters: Vec::with_capacity(counter_width),
    };
    for _ in 0..counter_width {
        record.counters.push(cursor.f64("event_counter")?);
    }
    Ok(record)
}

/// Call-graph section; stops when fewer than 4 bytes remain
pub(crate) fn read_call_graph(
    cursor: &mut Cursor<'_>,
    threads: usize,
) -> Result<(Vec<ThreadCallGraph>, bool)> {
    let mut graphs = Vec::with_capacity(threads);

    for thread in 0..threads {
        if cursor.remaining() < 4 {
            tracing::debug!(
                "call graph data ends before thread {}; remaining threads skipped",
                thread
            );
            return Ok((graphs, true));
        }
        let total = cursor.f32("call_graph_total")?;
        let count = cursor.count("call_graph_count")?;
        let mut graph = ThreadCallGraph {
            total,
            frames: Vec::with_capacity(count.min(cursor.remaining())),
        };

        for index in 0..count {
            if cursor.remaining() < 4 {
                tracing::debug!(
                    "call graph data ends at frame {} of thread {}",
                    index,
                    thread
                );
                graphs.push(graph);
                return Ok((graphs, true));
            }
            graph.frames.push(CallFrame {
                nest: cursor.i32("frame_nest")?,
                samples: cursor.f32("frame_samples")?,
                cumulative: cursor.f32("frame_cumulative")?,
                name: cursor.string("frame_name")?,
            });
        }
        graphs.push(graph);
    }

    Ok((graphs, false))
}
