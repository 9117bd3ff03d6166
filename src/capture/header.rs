//! Capture header: run description, counter setup and per-thread totals

use super::cursor::Cursor;
use super::{CaptureError, Result};
use serde::Serialize;
use std::fmt;

/// Width of the measurement timestamp field
pub const MEASURED_AT_LEN: usize = 32;

/// Hardware performance counters were recorded
pub const OPT_COUNTERS: i32 = 0x1;
/// A call-graph section is present
pub const OPT_CALL_GRAPH: i32 = 0x2;

/// Performance-counter group; fixes the number of f64 values per record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CounterGroup {
    Cache,
    Instructions,
    MemAccess,
    Performance,
    Statistics,
}

impl CounterGroup {
    pub const ALL: [CounterGroup; 5] = [
        CounterGroup::Cache,
        CounterGroup::Instructions,
        CounterGroup::MemAccess,
        CounterGroup::Performance,
        CounterGroup::Statistics,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CounterGroup::Cache => "Cache",
            CounterGroup::Instructions => "Instructions",
            CounterGroup::MemAccess => "MEM_access",
            CounterGroup::Performance => "Performance",
            CounterGroup::Statistics => "Statistics",
        }
    }

    pub fn value_count(self) -> usize {
        match self {
            CounterGroup::Instructions => 9,
            CounterGroup::Cache
            | CounterGroup::MemAccess
            | CounterGroup::Performance
            | CounterGroup::Statistics => 10,
        }
    }

    /// Case-insensitive lookup by recorded name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|g| g.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for CounterGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterDescriptor {
    pub cpu: i16,
    pub event_nbr: i16,
    pub pa_version: i16,
    pub reserved: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterSetup {
    pub descriptor: CounterDescriptor,
    pub group: CounterGroup,
}

/// Fixed header fields following the magic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureHeader {
    pub mode: i16,
    pub version: i16,
    pub process_count: i32,
    pub measure_options: i32,
    pub run_style: i16,
    pub thread_count: i16,
    pub cpu_clock: i32,
    pub measured_at: String,
    pub recommended_memory: i32,
    pub sampling_interval: f32,
    pub logical_dimension: i32,
    pub logical_shape: [i32; 3],
    pub logical_coord: [i32; 3],
    pub physical_shape: [i32; 6],
    pub physical_coord: [i32; 6],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counters: Option<CounterSetup>,
}

impl Default for CaptureHeader {
    fn default() -> Self {
        Self {
            mode: 0,
            version: 0,
            process_count: 1,
            measure_options: 0,
            run_style: 0,
            thread_count: 1,
            cpu_clock: 2000,
            measured_at: String::new(),
            recommended_memory: 0,
            sampling_interval: 0.01,
            logical_dimension: 1,
            logical_shape: [1, 1, 1],
            logical_coord: [0; 3],
            physical_shape: [1; 6],
            physical_coord: [0; 6],
            counters: None,
        }
    }
}

impl CaptureHeader {
    pub fn has_counters(&self) -> bool {
        self.measure_options & OPT_COUNTERS != 0
    }

    pub fn has_call_graph(&self) -> bool {
        self.measure_options & OPT_CALL_GRAPH != 0
    }

    /// Number of f64 counter values in every thread and event record
    pub fn counter_width(&self) -> usize {
        self.counters.map_or(0, |c| c.group.value_count())
    }

    pub fn threads(&self) -> usize {
        usize::try_from(self.thread_count).unwrap_or(0)
    }

    /// Read everything after mode/version up to the thread records
    pub(crate) fn read_body(cursor: &mut Cursor<'_>, mode: i16, version: i16) -> Result<Self> {
        let mut header = CaptureHeader {
            mode,
            version,
            process_count: cursor.i32("process_count")?,
            measure_options: cursor.i32("measure_options")?,
            run_style: cursor.i16("run_style")?,
            ..CaptureHeader::default()
        };

        let offset = cursor.position();
        header.thread_count = cursor.i16("thread_count")?;
        if header.thread_count < 0 {
            return Err(CaptureError::NegativeLength {
                field: "thread_count",
                value: i32::from(header.thread_count),
                offset,
            });
        }

        header.cpu_clock = cursor.i32("cpu_clock")?;
        header.measured_at = cursor.fixed_string(MEASURED_AT_LEN, "measured_at")?;
        header.recommended_memory = cursor.i32("recommended_memory")?;
        header.sampling_interval = cursor.f32("sampling_interval")?;
        header.logical_dimension = cursor.i32("logical_dimension")?;
        header.logical_shape = cursor.i32_array("logical_shape")?;
        header.logical_coord = cursor.i32_array("logical_coord")?;
        header.physical_shape = cursor.i32_array("physical_shape")?;
        header.physical_coord = cursor.i32_array("physical_coord")?;

        if header.has_counters() {
            let descriptor = CounterDescriptor {
                cpu: cursor.i16("counter_cpu")?,
                event_nbr: cursor.i16("counter_event_nbr")?,
                pa_version: cursor.i16("counter_pa_version")?,
                reserved: cursor.i16("counter_reserved")?,
            };
            let name = cursor.string("counter_group")?;
            let group =
                CounterGroup::from_name(&name).ok_or(CaptureError::UnknownCounterGroup(name))?;
            header.counters = Some(CounterSetup { descriptor, group });
        }

        Ok(header)
    }
}

/// Per-thread run totals
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThreadInfo {
    pub thread_no: i32,
    pub elapsed: f32,
    pub user: f32,
    pub system: f32,
    pub total_samples: f32,
    pub barrier_wait: f32,
    pub mpi_lib_cost: f32,
    pub mpi_elapsed: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub counters: Vec<f64>,
}

impl ThreadInfo {
    pub(crate) fn read(cursor: &mut Cursor<'_>, counter_width: usize) -> Result<Self> {
        let mut info = ThreadInfo {
            thread_no: cursor.i32("thread_no")?,
            elapsed: cursor.f32("thread_elapsed")?,
            user: cursor.f32("thread_user")?,
            system: cursor.f32("thread_system")?,
            total_samples: cursor.f32("thread_total_samples")?,
            barrier_wait: cursor.f32("thread_barrier_wait")?,
            mpi_lib_cost: cursor.f32("thread_mpi_lib_cost")?,
            mpi_elapsed: cursor.f32("thread_mpi_elapsed")?,
            counters: Vec::with_capacity(counter_width),
        };
        for _ in 0..counter_width {
            info.counters.push(cursor.f64("thread_counter")?);
        }
        Ok(info)
    }
}
