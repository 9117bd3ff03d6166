//! Capture writer for fixtures, benchmarks and fuzz seeds
//!
//! Produces byte-exact captures in either byte order. Sections are laid out
//! as header, thread records, offset table, files, symbols, then the
//! seekable line / loop / call-graph / event-counter sections.

use super::header::{CounterDescriptor, MEASURED_AT_LEN, OPT_CALL_GRAPH, OPT_COUNTERS};
use super::{
    ByteOrder, CallFrame, CaptureHeader, CounterGroup, EventCounterRecord, Format, LineRecord,
    LoopRecord, SymbolRecord, ThreadCallGraph, ThreadInfo,
};
use std::collections::{HashMap, HashSet};

/// Sections whose layout the encoder can alter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Symbol,
    Line,
    Loop,
    CallGraph,
    EventCounter,
}

#[derive(Debug, Clone)]
pub struct CaptureEncoder {
    format: Format,
    order: ByteOrder,
    header: CaptureHeader,
    counter_name: Option<String>,
    threads: Vec<ThreadInfo>,
    files: Vec<String>,
    symbols: Vec<Vec<SymbolRecord>>,
    lines: Vec<Vec<LineRecord>>,
    loops: Vec<Vec<LoopRecord>>,
    call_graph: Vec<ThreadCallGraph>,
    event_counters: Vec<Vec<EventCounterRecord>>,
    omitted: HashSet<Section>,
    written_threads: HashMap<Section, usize>,
}

impl CaptureEncoder {
    /// Empty single-thread big-endian capture
    pub fn new(format: Format) -> Self {
        let mut encoder = Self {
            format,
            order: ByteOrder::Big,
            header: CaptureHeader {
                version: format.version(),
                thread_count: 0,
                ..CaptureHeader::default()
            },
            counter_name: None,
            threads: Vec::new(),
            files: Vec::new(),
            symbols: Vec::new(),
            lines: Vec::new(),
            loops: Vec::new(),
            call_graph: Vec::new(),
            event_counters: Vec::new(),
            omitted: HashSet::new(),
            written_threads: HashMap::new(),
        };
        encoder.ensure_thread(0);
        encoder
    }

    pub fn byte_order(&mut self, order: ByteOrder) -> &mut Self {
        self.order = order;
        self
    }

    /// Grow to at least `count` threads
    pub fn threads(&mut self, count: usize) -> &mut Self {
        if count > 0 {
            self.ensure_thread(count - 1);
        }
        self
    }

    pub fn header_mut(&mut self) -> &mut CaptureHeader {
        &mut self.header
    }

    pub fn thread_info_mut(&mut self, thread: usize) -> &mut ThreadInfo {
        self.ensure_thread(thread);
        &mut self.threads[thread]
    }

    pub fn counter_group(&mut self, group: CounterGroup) -> &mut Self {
        self.counter_group_name(group.name())
    }

    /// Record an arbitrary counter group name, known or not
    pub fn counter_group_name(&mut self, name: &str) -> &mut Self {
        self.header.measure_options |= OPT_COUNTERS;
        self.counter_name = Some(name.to_string());
        self
    }

    pub fn with_call_graph(&mut self) -> &mut Self {
        self.header.measure_options |= OPT_CALL_GRAPH;
        self
    }

    /// Write the section with a zero offset and no content
    pub fn omit(&mut self, section: Section) -> &mut Self {
        self.omitted.insert(section);
        self
    }

    /// Write only the first `threads` thread lists of a section
    pub fn write_threads(&mut self, section: Section, threads: usize) -> &mut Self {
        self.written_threads.insert(section, threads);
        self
    }

    /// Add a file name; returns its table index
    pub fn add_file(&mut self, name: &str) -> i32 {
        self.files.push(name.to_string());
        (self.files.len() - 1) as i32
    }

    /// Add a procedure record; returns its index in the thread's symbol list
    pub fn add_symbol(&mut self, thread: usize, record: SymbolRecord) -> i32 {
        self.ensure_thread(thread);
        self.symbols[thread].push(record);
        (self.symbols[thread].len() - 1) as i32
    }

    pub fn add_line(&mut self, thread: usize, record: LineRecord) -> &mut Self {
        self.ensure_thread(thread);
        self.lines[thread].push(record);
        self
    }

    pub fn add_loop(&mut self, thread: usize, record: LoopRecord) -> &mut Self {
        self.ensure_thread(thread);
        self.loops[thread].push(record);
        self
    }

    pub fn add_frame(&mut self, thread: usize, frame: CallFrame) -> &mut Self {
        self.ensure_thread(thread);
        self.call_graph[thread].frames.push(frame);
        self
    }

    pub fn call_graph_total(&mut self, thread: usize, total: f32) -> &mut Self {
        self.ensure_thread(thread);
        self.call_graph[thread].total = total;
        self
    }

    pub fn add_event_counter(&mut self, thread: usize, record: EventCounterRecord) -> &mut Self {
        self.ensure_thread(thread);
        self.event_counters[thread].push(record);
        self
    }

    fn ensure_thread(&mut self, thread: usize) {
        let needed = thread + 1;
        if self.threads.len() < needed {
            for t in self.threads.len()..needed {
                self.threads.push(ThreadInfo {
                    thread_no: t as i32,
                    ..ThreadInfo::default()
                });
            }
            self.symbols.resize_with(needed, Vec::new);
            self.lines.resize_with(needed, Vec::new);
            self.loops.resize_with(needed, Vec::new);
            self.call_graph.resize_with(needed, ThreadCallGraph::default);
            self.event_counters.resize_with(needed, Vec::new);
        }
        let count = i16::try_from(needed).unwrap_or(i16::MAX);
        self.header.thread_count = self.header.thread_count.max(count);
    }

    fn thread_limit(&self, section: Section) -> usize {
        let all = self.threads.len();
        self.written_threads
            .get(&section)
            .map_or(all, |&n| n.min(all))
    }

    fn included(&self, section: Section) -> bool {
        !self.omitted.contains(&section)
    }

    fn counter_width(&self) -> usize {
        self.counter_name
            .as_deref()
            .and_then(CounterGroup::from_name)
            .map_or(0, CounterGroup::value_count)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer {
            bytes: Vec::with_capacity(1024),
            order: self.order,
        };
        let h = &self.header;
        let width = self.counter_width();

        let magic = self.format.magic();
        match self.order {
            ByteOrder::Big => w.bytes.extend_from_slice(magic),
            ByteOrder::Little => w.bytes.extend(magic.iter().rev()),
        }
        w.i16(h.mode);
        w.i16(h.version);
        w.i32(h.process_count);
        w.i32(h.measure_options);
        w.i16(h.run_style);
        w.i16(h.thread_count);
        w.i32(h.cpu_clock);
        w.fixed(&h.measured_at, MEASURED_AT_LEN);
        w.i32(h.recommended_memory);
        w.f32(h.sampling_interval);
        w.i32(h.logical_dimension);
        for &v in h
            .logical_shape
            .iter()
            .chain(&h.logical_coord)
            .chain(&h.physical_shape)
            .chain(&h.physical_coord)
        {
            w.i32(v);
        }

        if h.has_counters() {
            let descriptor = h.counters.map(|c| c.descriptor).unwrap_or(CounterDescriptor {
                cpu: 1,
                event_nbr: 8,
                pa_version: 1,
                reserved: 0,
            });
            w.i16(descriptor.cpu);
            w.i16(descriptor.event_nbr);
            w.i16(descriptor.pa_version);
            w.i16(descriptor.reserved);
            w.string(self.counter_name.as_deref().unwrap_or(""));
        }

        for info in &self.threads {
            w.i32(info.thread_no);
            for v in [
                info.elapsed,
                info.user,
                info.system,
                info.total_samples,
                info.barrier_wait,
                info.mpi_lib_cost,
                info.mpi_elapsed,
            ] {
                w.f32(v);
            }
            w.counters(&info.counters, width);
        }

        let offsets_at = w.bytes.len();
        for _ in 0..6 {
            w.i32(0);
        }
        let mut offsets = [0i32; 6];

        offsets[4] = w.position();
        w.i32(self.files.len() as i32);
        for name in &self.files {
            w.string(name);
        }

        offsets[5] = w.position();
        for records in self.symbols.iter().take(self.thread_limit(Section::Symbol)) {
            w.i32(records.len() as i32);
            for s in records {
                w.f32(s.samples);
                w.f32(s.barrier_wait);
                w.f32(s.mpi_cost);
                w.i32(s.start_line);
                w.i32(s.end_line);
                w.i32(s.file);
                w.string(&s.name);
            }
        }

        if self.included(Section::Line) {
            offsets[0] = w.position();
            for records in self.lines.iter().take(self.thread_limit(Section::Line)) {
                w.i32(records.len() as i32);
                for r in records {
                    w.f32(r.samples);
                    w.i32(r.line);
                    w.i32(r.symbol);
                    w.i32(r.file);
                }
            }
        }

        if self.included(Section::Loop) {
            offsets[1] = w.position();
            for records in self.loops.iter().take(self.thread_limit(Section::Loop)) {
                w.i32(records.len() as i32);
                for r in records {
                    w.f32(r.samples);
                    w.f32(r.barrier_wait);
                    w.f32(r.mpi_cost);
                    w.i32(r.start_line);
                    w.i32(r.end_line);
                    w.i32(r.nest);
                    w.i16(r.loop_kind);
                    w.i16(r.parallel_kind);
                    w.i32(r.symbol);
                    w.i32(r.file);
                }
            }
        }

        if h.has_call_graph() && self.included(Section::CallGraph) {
            offsets[2] = w.position();
            for graph in self
                .call_graph
                .iter()
                .take(self.thread_limit(Section::CallGraph))
            {
                w.f32(graph.total);
                w.i32(graph.frames.len() as i32);
                for f in &graph.frames {
                    w.i32(f.nest);
                    w.f32(f.samples);
                    w.f32(f.cumulative);
                    w.string(&f.name);
                }
            }
        }

        if self.format == Format::Eprf && self.included(Section::EventCounter) {
            offsets[3] = w.position();
            for records in self
                .event_counters
                .iter()
                .take(self.thread_limit(Section::EventCounter))
            {
                w.i32(records.len() as i32);
                for r in records {
                    w.string(&r.group);
                    w.i32(r.calls);
                    w.f32(r.elapsed);
                    w.f32(r.user);
                    w.f32(r.system);
                    w.counters(&r.counters, width);
                }
            }
        }

        let order = self.order;
        for (slot, value) in offsets.iter().enumerate() {
            let at = offsets_at + slot * 4;
            let raw = match order {
                ByteOrder::Big => value.to_be_bytes(),
                ByteOrder::Little => value.to_le_bytes(),
            };
            w.bytes[at..at + 4].copy_from_slice(&raw);
        }

        w.bytes
    }
}

struct Writer {
    bytes: Vec<u8>,
    order: ByteOrder,
}

impl Writer {
    fn position(&self) -> i32 {
        self.bytes.len() as i32
    }

    fn i16(&mut self, v: i16) {
        match self.order {
            ByteOrder::Big => self.bytes.extend_from_slice(&v.to_be_bytes()),
            ByteOrder::Little => self.bytes.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn i32(&mut self, v: i32) {
        match self.order {
            ByteOrder::Big => self.bytes.extend_from_slice(&v.to_be_bytes()),
            ByteOrder::Little => self.bytes.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn f32(&mut self, v: f32) {
        match self.order {
            ByteOrder::Big => self.bytes.extend_from_slice(&v.to_be_bytes()),
            ByteOrder::Little => self.bytes.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn f64(&mut self, v: f64) {
        match self.order {
            ByteOrder::Big => self.bytes.extend_from_slice(&v.to_be_bytes()),
            ByteOrder::Little => self.bytes.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn string(&mut self, s: &str) {
        self.i32(s.len() as i32);
        self.bytes.extend_from_slice(s.as_bytes());
    }

    fn fixed(&mut self, s: &str, width: usize) {
        let raw = s.as_bytes();
        let n = raw.len().min(width);
        self.bytes.extend_from_slice(&raw[..n]);
        self.bytes.resize(self.bytes.len() + (width - n), 0);
    }

    /// Exactly `width` values, zero-padded
    fn counters(&mut self, values: &[f64], width: usize) {
        for i in 0..width {
            self.f64(values.get(i).copied().unwrap_or(0.0));
        }
    }
}
