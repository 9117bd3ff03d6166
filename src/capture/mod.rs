//! Profiler capture decoding
//!
//! Two capture families share one layout: sampling captures (`DPRF`) and
//! event-counter captures (`EPRF`, which additionally fill the reserved
//! section with per-region counter records). The magic also fixes the byte
//! order: a forward match means big-endian, a byte-reversed match means
//! little-endian.
//!
//! Decoding is all-or-nothing. The only tolerated irregularities are the
//! two early stops described on [`Capture::decode`].

mod cursor;
mod encoder;
mod header;
mod samples;
mod sections;

pub use encoder::{CaptureEncoder, Section};
pub use header::{
    CaptureHeader, CounterDescriptor, CounterGroup, CounterSetup, ThreadInfo, MEASURED_AT_LEN,
    OPT_CALL_GRAPH, OPT_COUNTERS,
};
pub use samples::{EventCounterSample, ProfilerSample, SampleKind, SampleSet};
pub use sections::{
    CallFrame, EventCounterRecord, LineRecord, LoopRecord, SectionOffsets, SymbolRecord,
    ThreadCallGraph,
};

use cursor::Cursor;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Capture decoding errors; all of them are fatal
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Unrecognized capture format (magic {0:02x?})")]
    UnrecognizedFormat(Vec<u8>),

    #[error("Incompatible {format} version: found {found:#06x}, expected {expected:#06x}")]
    IncompatibleVersion {
        format: Format,
        found: i16,
        expected: i16,
    },

    #[error("Unknown counter group '{0}'")]
    UnknownCounterGroup(String),

    #[error("Negative {field} ({value}) at offset {offset}")]
    NegativeLength {
        field: &'static str,
        value: i32,
        offset: usize,
    },

    #[error("Dangling {table} index {index} in thread {thread} ({len} entries)")]
    DanglingIndex {
        table: &'static str,
        index: i32,
        thread: usize,
        len: usize,
    },

    #[error("{section} offset {offset} lies outside the capture ({len} bytes)")]
    BadOffset {
        section: &'static str,
        offset: i32,
        len: usize,
    },

    #[error("Truncated capture: {field} at offset {offset} needs {needed} bytes, {available} available")]
    Truncated {
        field: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Failed to read capture {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CaptureError {
    /// True for the insufficient-data family, false for format violations
    pub fn is_truncation(&self) -> bool {
        matches!(self, CaptureError::Truncated { .. })
    }
}

/// Result type for capture decoding
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Capture family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Format {
    /// Sampling profile
    Dprf,
    /// Event-counter profile
    Eprf,
}

impl Format {
    pub fn magic(self) -> &'static [u8; 4] {
        match self {
            Format::Dprf => b"DPRF",
            Format::Eprf => b"EPRF",
        }
    }

    pub fn version(self) -> i16 {
        match self {
            Format::Dprf => 0x0412,
            Format::Eprf => 0x0413,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Dprf => f.write_str("DPRF"),
            Format::Eprf => f.write_str("EPRF"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ByteOrder {
    Big,
    Little,
}

/// Identify family and byte order from the first four bytes
pub fn detect_format(bytes: &[u8]) -> Result<(Format, ByteOrder)> {
    let Some(magic) = bytes.get(..4) else {
        return Err(CaptureError::UnrecognizedFormat(bytes.to_vec()));
    };

    for format in [Format::Dprf, Format::Eprf] {
        let token = format.magic();
        if magic.eq_ignore_ascii_case(token) {
            return Ok((format, ByteOrder::Big));
        }
        let reversed: Vec<u8> = token.iter().rev().copied().collect();
        if magic.eq_ignore_ascii_case(&reversed) {
            return Ok((format, ByteOrder::Little));
        }
    }

    Err(CaptureError::UnrecognizedFormat(magic.to_vec()))
}

/// A fully decoded capture
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Capture {
    pub format: Format,
    pub byte_order: ByteOrder,
    pub header: CaptureHeader,
    pub threads: Vec<ThreadInfo>,
    pub offsets: SectionOffsets,
    pub files: Vec<String>,
    /// Procedure table, one list per thread
    pub symbols: Vec<Vec<SymbolRecord>>,
    pub lines: Vec<Vec<LineRecord>>,
    pub loops: Vec<Vec<LoopRecord>>,
    pub call_graph: Vec<ThreadCallGraph>,
    pub event_counters: Vec<Vec<EventCounterRecord>>,
    /// Sections cut short by an early-stop guard
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub early_stops: Vec<&'static str>,
}

impl Capture {
    /// Decode a fully buffered capture
    ///
    /// Symbol, line, loop and event-counter tables stop (for the current and
    /// all later threads) once the cursor reaches the next positive section
    /// offset. The call-graph table stops when fewer than four bytes remain.
    /// Every other inconsistency fails the whole decode.
    pub fn decode(bytes: &[u8]) -> Result<Capture> {
        let (format, byte_order) = detect_format(bytes)?;
        let mut cursor = Cursor::new(bytes, byte_order);
        cursor.bytes(4, "magic")?;

        let mode = cursor.i16("mode")?;
        let version = cursor.i16("version")?;
        if version != format.version() {
            return Err(CaptureError::IncompatibleVersion {
                format,
                found: version,
                expected: format.version(),
            });
        }

        let header = CaptureHeader::read_body(&mut cursor, mode, version)?;
        let thread_count = header.threads();
        let width = header.counter_width();

        let threads = (0..thread_count)
            .map(|_| ThreadInfo::read(&mut cursor, width))
            .collect::<Result<Vec<_>>>()?;

        let offsets = SectionOffsets::read(&mut cursor)?;
        tracing::debug!(
            "{} capture ({:?}), {} threads, offsets {:?}",
            format,
            byte_order,
            thread_count,
            offsets
        );

        let mut early_stops = Vec::new();
        let files = sections::read_files(&mut cursor)?;

        let boundary = offsets.next_boundary(cursor.position());
        let symbols = sections::read_guarded(
            &mut cursor,
            thread_count,
            boundary,
            "symbol",
            sections::read_symbol,
        )?;
        if symbols.stopped_early {
            early_stops.push("symbol");
        }

        let mut lines = Vec::new();
        if offsets.line > 0 {
            cursor.seek(offsets.line, "line")?;
            let boundary = offsets.next_boundary(cursor.position());
            let read = sections::read_guarded(
                &mut cursor,
                thread_count,
                boundary,
                "line",
                sections::read_line,
            )?;
            if read.stopped_early {
                early_stops.push("line");
            }
            lines = read.threads;
        }

        let mut loops = Vec::new();
        if offsets.loops > 0 {
            cursor.seek(offsets.loops, "loop")?;
            let boundary = offsets.next_boundary(cursor.position());
            let read = sections::read_guarded(
                &mut cursor,
                thread_count,
                boundary,
                "loop",
                sections::read_loop,
            )?;
            if read.stopped_early {
                early_stops.push("loop");
            }
            loops = read.threads;
        }

        let mut call_graph = Vec::new();
        if header.has_call_graph() && offsets.call_graph > 0 {
            cursor.seek(offsets.call_graph, "call_graph")?;
            let (graphs, stopped) = sections::read_call_graph(&mut cursor, thread_count)?;
            if stopped {
                early_stops.push("call_graph");
            }
            call_graph = graphs;
        }

        let mut event_counters = Vec::new();
        if format == Format::Eprf && offsets.reserved > 0 {
            cursor.seek(offsets.reserved, "event_counter")?;
            let boundary = offsets.next_boundary(cursor.position());
            let read = sections::read_guarded(
                &mut cursor,
                thread_count,
                boundary,
                "event_counter",
                |c| sections::read_event_counter(c, width),
            )?;
            if read.stopped_early {
                early_stops.push("event_counter");
            }
            event_counters = read.threads;
        }

        let capture = Capture {
            format,
            byte_order,
            header,
            threads,
            offsets,
            files,
            symbols: symbols.threads,
            lines,
            loops,
            call_graph,
            event_counters,
            early_stops,
        };
        capture.check_indices()?;
        Ok(capture)
    }

    /// Memory-map and decode a capture file
    pub fn from_path(path: &Path) -> Result<Capture> {
        let io_err = |source| CaptureError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_err)?;
        if file.metadata().map_err(io_err)?.len() == 0 {
            return Capture::decode(&[]);
        }
        let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(io_err)?;
        Capture::decode(&mmap)
    }

    pub fn thread_count(&self) -> usize {
        self.header.threads()
    }

    fn check_indices(&self) -> Result<()> {
        let files = self.files.len();
        let check_file = |index: i32, thread: usize| -> Result<()> {
            if index >= 0 && index as usize >= files {
                return Err(CaptureError::DanglingIndex {
                    table: "file",
                    index,
                    thread,
                    len: files,
                });
            }
            Ok(())
        };
        // Threads past a cut symbol section have no procedure table to check
        let symbols_cut = self.early_stops.contains(&"symbol");
        let check_symbol = |index: i32, thread: usize| -> Result<()> {
            let Some(list) = self.symbols.get(thread) else {
                if symbols_cut {
                    return Ok(());
                }
                return Err(CaptureError::DanglingIndex {
                    table: "symbol",
                    index,
                    thread,
                    len: 0,
                });
            };
            let len = list.len();
            if usize::try_from(index).map_or(true, |i| i >= len) {
                return Err(CaptureError::DanglingIndex {
                    table: "symbol",
                    index,
                    thread,
                    len,
                });
            }
            Ok(())
        };

        for (thread, records) in self.symbols.iter().enumerate() {
            for sym in records {
                check_file(sym.file, thread)?;
            }
        }
        for (thread, records) in self.lines.iter().enumerate() {
            for rec in records {
                check_symbol(rec.symbol, thread)?;
                check_file(rec.file, thread)?;
            }
        }
        for (thread, records) in self.loops.iter().enumerate() {
            for rec in records {
                check_symbol(rec.symbol, thread)?;
                check_file(rec.file, thread)?;
            }
        }
        Ok(())
    }
}
