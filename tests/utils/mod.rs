// Integration Test Utilities
//
// Synthetic captures, project directories and tree documents shared by the
// integration suites.

#![allow(dead_code)]

use costscope::capture::{
    CallFrame, CaptureEncoder, CounterGroup, EventCounterRecord, Format, LineRecord, LoopRecord,
    SymbolRecord,
};
use std::fs;
use std::path::{Path, PathBuf};

pub const RECORDED_FILE: &str = "/scratch/job42/src/solver/sim.f90";

pub fn symbol(name: &str, samples: f32, file: i32, start: i32, end: i32) -> SymbolRecord {
    SymbolRecord {
        samples,
        barrier_wait: 0.0,
        mpi_cost: 0.0,
        start_line: start,
        end_line: end,
        file,
        name: name.to_string(),
    }
}

pub fn line(samples: f32, at: i32, symbol: i32, file: i32) -> LineRecord {
    LineRecord {
        samples,
        line: at,
        symbol,
        file,
    }
}

pub fn loop_record(samples: f32, start: i32, end: i32, symbol: i32, file: i32) -> LoopRecord {
    LoopRecord {
        samples,
        barrier_wait: 0.0,
        mpi_cost: 0.0,
        start_line: start,
        end_line: end,
        nest: 1,
        loop_kind: 0,
        parallel_kind: 0,
        symbol,
        file,
    }
}

/// Two threads of a solver run: `compute_` dominates, line 12 is the hot
/// line, the loop over lines 10-14 holds most of the time
pub fn solver_encoder() -> CaptureEncoder {
    let mut enc = CaptureEncoder::new(Format::Dprf);
    enc.threads(2).with_call_graph();
    enc.header_mut().measured_at = "2024/05/01 10:00:00".to_string();
    let file = enc.add_file(RECORDED_FILE);

    for thread in 0..2 {
        let compute = enc.add_symbol(thread, symbol("compute_", 30.0, file, 2, 20));
        let main = enc.add_symbol(thread, symbol("MAIN__", 10.0, file, 1, 30));
        enc.add_line(thread, line(24.0, 12, compute, file));
        enc.add_line(thread, line(6.0, 16, compute, file));
        enc.add_line(thread, line(10.0, 25, main, file));
        enc.add_loop(thread, loop_record(27.0, 10, 14, compute, file));
        enc.call_graph_total(thread, 40.0);
        enc.add_frame(
            thread,
            CallFrame {
                nest: 0,
                samples: 10.0,
                cumulative: 40.0,
                name: "MAIN__".to_string(),
            },
        );
        enc.add_frame(
            thread,
            CallFrame {
                nest: 1,
                samples: 30.0,
                cumulative: 30.0,
                name: "compute_".to_string(),
            },
        );
    }
    enc
}

pub fn solver_capture() -> Vec<u8> {
    solver_encoder().encode()
}

/// Event-counter capture measuring the `solver` region on one thread
pub fn event_counter_capture() -> Vec<u8> {
    let mut enc = CaptureEncoder::new(Format::Eprf);
    enc.counter_group(CounterGroup::Statistics);
    enc.add_event_counter(
        0,
        EventCounterRecord {
            group: "solver".to_string(),
            calls: 3,
            elapsed: 1.5,
            user: 1.25,
            system: 0.125,
            counters: vec![1.0; 10],
        },
    );
    enc.encode()
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, bytes).unwrap();
    path
}

/// Project checkout holding the solver source plus an unrelated file with
/// the same name elsewhere
pub fn write_project(dir: &Path) -> PathBuf {
    let root = dir.join("project");
    write_file(&root, "src/solver/sim.f90", b"program sim\nend program sim\n");
    write_file(&root, "legacy/sim.f90", b"program old\nend program old\n");
    write_file(&root, "README.md", b"solver\n");
    root
}

/// Tree document for `src/solver/sim.f90`
pub const TREE_JSON: &str = r#"{
  "kind": { "type": "program", "name": "sim" },
  "text": "program sim",
  "file": "src/solver/sim.f90",
  "start_line": 1,
  "end_line": 30,
  "children": [
    {
      "kind": { "type": "procedure", "name": "compute" },
      "text": "subroutine compute",
      "file": "src/solver/sim.f90",
      "start_line": 2,
      "end_line": 20,
      "children": [
        {
          "kind": { "type": "procedure_usage", "callee": "fapp_start", "arguments": ["\"solver\"", "1", "0"] },
          "text": "call fapp_start(\"solver\",1,0)",
          "file": "src/solver/sim.f90",
          "start_line": 9
        },
        {
          "kind": { "type": "repetition" },
          "text": "do i=1,n",
          "file": "src/solver/sim.f90",
          "start_line": 10,
          "end_line": 14,
          "children": [
            {
              "kind": { "type": "substitution", "calls": [] },
              "text": "a(i) = b(i) * c",
              "file": "src/solver/sim.f90",
              "start_line": 12
            }
          ]
        },
        {
          "kind": { "type": "procedure_usage", "callee": "fapp_stop", "arguments": ["\"solver\"", "1", "0"] },
          "text": "call fapp_stop(\"solver\",1,0)",
          "file": "src/solver/sim.f90",
          "start_line": 15
        },
        {
          "kind": { "type": "statement" },
          "text": "return",
          "file": "src/solver/sim.f90",
          "start_line": 16
        }
      ]
    },
    {
      "kind": { "type": "procedure", "name": "sim" },
      "text": "program sim",
      "file": "src/solver/sim.f90",
      "start_line": 22,
      "end_line": 30,
      "children": [
        {
          "kind": { "type": "procedure_usage", "callee": "compute", "arguments": [] },
          "text": "call compute",
          "file": "src/solver/sim.f90",
          "start_line": 25
        }
      ]
    }
  ]
}"#;
