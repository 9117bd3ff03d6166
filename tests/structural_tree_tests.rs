//! Integration tests for tree documents, identities and queries

mod utils;

use costscope::source_location::SourceLocation;
use costscope::tree::{NodeDocument, NodeKind, StructuralTree};
use std::fs;
use tempfile::TempDir;

fn tree() -> StructuralTree {
    let doc: NodeDocument = serde_json::from_str(utils::TREE_JSON).unwrap();
    StructuralTree::from_document(&doc).unwrap()
}

#[test]
fn test_every_id_finds_its_node() {
    let tree = tree();
    assert_eq!(tree.len(), 9);
    for node in tree.iter() {
        assert_eq!(tree.find_by_id(&node.id()), Some(node.node_id()), "{}", node.id());
    }
}

#[test]
fn test_layout_lookup_is_case_insensitive() {
    let tree = tree();
    let found = tree.find_by_layout_id("PROGRAM$-1:Procedure$0:DO").unwrap();
    assert!(matches!(tree.node(found).unwrap().kind(), NodeKind::Repetition));
    assert_eq!(tree.find_by_layout_id(""), None);
    assert_eq!(tree.find_by_layout_id("program$-1:procedure$3:do"), None);
}

#[test]
fn test_search_code_line_returns_deepest() {
    let tree = tree();
    let hits = tree.search_code_line(
        tree.root(),
        &SourceLocation::line("src/solver/sim.f90", 12),
    );
    assert_eq!(hits.len(), 1);
    assert_eq!(tree.node(hits[0]).unwrap().node().text(), "a(i) = b(i) * c");

    let none = tree.search_code_line(tree.root(), &SourceLocation::line("other.f90", 12));
    assert!(none.is_empty());
}

#[test]
fn test_namespace_and_calls() {
    let tree = tree();
    let call = tree.find_by_layout_id("program$-1:procedure$-1:procedureusage");
    assert!(call.is_some());

    let main = tree.find_procedure("SIM").unwrap();
    assert_eq!(tree.namespace(main), "sim");
    let usage = tree.node(main).unwrap().children().next().unwrap();
    let calls = tree.calls(usage.node_id());
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].callee, "compute");
}

#[test]
fn test_measurement_areas_all_selects_main_program() {
    let tree = tree();
    let areas = tree.measurement_areas("all", "fapp_start", "fapp_stop");
    assert_eq!(areas.len(), 1);
    assert_eq!(Some(areas[0].start), tree.find_procedure("sim"));
    assert_eq!(areas[0].stop, None);
}

#[test]
fn test_load_from_json_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tree.json");
    fs::write(&path, utils::TREE_JSON).unwrap();

    let loaded = StructuralTree::from_json_file(&path).unwrap();
    assert_eq!(loaded.to_document(), tree().to_document());
}

#[test]
fn test_invalid_documents_are_rejected() {
    let dir = TempDir::new().unwrap();

    let garbage = dir.path().join("garbage.json");
    fs::write(&garbage, "{ not json").unwrap();
    let err = StructuralTree::from_json_file(&garbage).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse tree document"));

    let reversed = dir.path().join("reversed.json");
    fs::write(
        &reversed,
        r#"{ "kind": { "type": "statement" }, "text": "x = 1",
             "file": "a.f90", "start_line": 9, "end_line": 3 }"#,
    )
    .unwrap();
    let err = StructuralTree::from_json_file(&reversed).unwrap_err();
    assert!(format!("{err:#}").contains("Invalid tree document"));

    assert!(StructuralTree::from_json_file(&dir.path().join("missing.json")).is_err());
}
