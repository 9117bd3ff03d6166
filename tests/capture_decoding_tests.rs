//! Integration tests for capture decoding through the public API

mod utils;

use costscope::capture::{ByteOrder, Capture, CaptureError, Format, SampleKind, Section};
use std::fs;
use tempfile::TempDir;
use utils::{solver_capture, solver_encoder, RECORDED_FILE};

#[test]
fn test_decode_solver_capture() {
    let capture = Capture::decode(&solver_capture()).unwrap();

    assert_eq!(capture.format, Format::Dprf);
    assert_eq!(capture.byte_order, ByteOrder::Big);
    assert_eq!(capture.thread_count(), 2);
    assert!(capture.header.has_call_graph());
    assert!(!capture.header.has_counters());
    assert_eq!(capture.files, vec![RECORDED_FILE.to_string()]);
    assert_eq!(capture.symbols[1][0].name, "compute_");
    assert_eq!(capture.call_graph.len(), 2);
    assert_eq!(capture.call_graph[0].total, 40.0);
    assert_eq!(capture.call_graph[0].frames[1].name, "compute_");
    assert!(capture.early_stops.is_empty());
}

#[test]
fn test_little_endian_decodes_to_same_content() {
    let big = Capture::decode(&solver_capture()).unwrap();
    let mut enc = solver_encoder();
    enc.byte_order(ByteOrder::Little);
    let bytes = enc.encode();
    assert_eq!(&bytes[..4], b"FRPD");

    let little = Capture::decode(&bytes).unwrap();
    assert_eq!(little.byte_order, ByteOrder::Little);
    assert_eq!(little.symbols, big.symbols);
    assert_eq!(little.lines, big.lines);
    assert_eq!(little.call_graph, big.call_graph);
}

#[test]
fn test_samples_resolve_names() {
    let set = Capture::decode(&solver_capture()).unwrap().samples();

    assert_eq!(set.procedures.len(), 4);
    assert_eq!(set.lines.len(), 6);
    assert_eq!(set.loops.len(), 2);
    assert_eq!(set.call_graph.len(), 4);

    let hot = &set.lines[0];
    assert_eq!(hot.kind, SampleKind::Line);
    assert_eq!(hot.symbol, "compute_");
    assert_eq!(hot.file.as_deref(), Some(RECORDED_FILE));
    assert_eq!((hot.start_line, hot.end_line), (12, 12));

    let frame = &set.call_graph[3];
    assert_eq!(frame.thread, 1);
    assert_eq!(frame.nest, Some(1));
    assert_eq!(frame.cumulative, Some(30.0));
}

#[test]
fn test_from_path_reads_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("run.prf");
    fs::write(&path, solver_capture()).unwrap();

    let from_disk = Capture::from_path(&path).unwrap();
    assert_eq!(from_disk, Capture::decode(&solver_capture()).unwrap());
}

#[test]
fn test_from_path_empty_file_is_unrecognized() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.prf");
    fs::write(&path, b"").unwrap();
    assert!(matches!(
        Capture::from_path(&path),
        Err(CaptureError::UnrecognizedFormat(_))
    ));
}

#[test]
fn test_from_path_missing_file() {
    let err = Capture::from_path(std::path::Path::new("/nonexistent/run.prf")).unwrap_err();
    assert!(matches!(err, CaptureError::Io { .. }));
    assert!(err.to_string().contains("/nonexistent/run.prf"));
}

#[test]
fn test_truncated_capture_reports_field() {
    let bytes = solver_capture();
    let err = Capture::decode(&bytes[..bytes.len() / 2]).unwrap_err();
    assert!(err.is_truncation() || matches!(err, CaptureError::BadOffset { .. }));
}

#[test]
fn test_partial_line_section_is_not_an_error() {
    let mut enc = solver_encoder();
    enc.write_threads(Section::Line, 1);
    let capture = Capture::decode(&enc.encode()).unwrap();

    assert_eq!(capture.early_stops, vec!["line"]);
    assert_eq!(capture.lines[0].len(), 3);
    assert_eq!(capture.lines.len(), 1);
    assert_eq!(capture.loops[1].len(), 1);
}

#[test]
fn test_event_counter_capture() {
    let capture = Capture::decode(&utils::event_counter_capture()).unwrap();
    assert_eq!(capture.format, Format::Eprf);
    assert!(capture.header.has_counters());

    let set = capture.samples();
    assert_eq!(set.event_counters.len(), 1);
    assert_eq!(set.event_counters[0].group, "solver");
    assert_eq!(set.event_counters[0].calls, 3);
    assert_eq!(set.event_counters[0].counters.len(), 10);
}
