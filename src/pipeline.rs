//! End-to-end analysis: decode captures, aggregate, filter, correlate
//!
//! Captures are independent, so they are decoded on scoped worker threads;
//! aggregation then runs sequentially because it shares the reconciler's
//! resolution cache.

use crate::aggregate::{CostReport, PathReconciler, SampleAggregator};
use crate::capture::{self, Capture};
use crate::config::AnalysisConfig;
use crate::correlate::{self, NodeCost};
use crate::filter::SymbolFilter;
use crate::json_output::JsonMeasurementArea;
use crate::report::{self, CategorySelection};
use crate::tree::{NodeId, StructuralTree};
use anyhow::{anyhow, Result};
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Decode every capture concurrently; results keep the order of `paths`
///
/// At most one worker per available CPU runs at a time.
pub fn decode_all(paths: &[PathBuf]) -> Result<Vec<(PathBuf, capture::Result<Capture>)>> {
    let workers = std::thread::available_parallelism().map_or(4, NonZeroUsize::get);
    decode_batched(paths, workers)
}

fn decode_batched(
    paths: &[PathBuf],
    workers: usize,
) -> Result<Vec<(PathBuf, capture::Result<Capture>)>> {
    let mut decoded = Vec::with_capacity(paths.len());
    for batch in paths.chunks(workers.max(1)) {
        let joined = crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = batch
                .iter()
                .map(|path| scope.spawn(move |_| Capture::from_path(path)))
                .collect();
            handles.into_iter().map(|h| h.join()).collect::<Vec<_>>()
        })
        .map_err(|_| anyhow!("Capture decoder thread panicked"))?;

        for (result, path) in joined.into_iter().zip(batch) {
            let result =
                result.map_err(|_| anyhow!("Decoder for {} panicked", path.display()))?;
            match &result {
                Ok(capture) => tracing::debug!(
                    "Decoded {} ({}, {} threads)",
                    path.display(),
                    capture.format,
                    capture.thread_count()
                ),
                Err(e) => tracing::debug!("Failed to decode {}: {}", path.display(), e),
            }
            decoded.push((path.clone(), result));
        }
    }
    Ok(decoded)
}

/// The analysis of one decoded capture
#[derive(Debug)]
pub struct CaptureAnalysis {
    pub path: PathBuf,
    pub capture: Capture,
    pub report: CostReport,
    /// Costs placed on tree nodes; `None` without a tree
    pub node_costs: Option<Vec<NodeCost>>,
}

/// Shared state for analyzing a batch of captures
pub struct Analysis {
    config: AnalysisConfig,
    filter: SymbolFilter,
    selection: CategorySelection,
    aggregator: SampleAggregator,
    tree: Option<StructuralTree>,
}

impl Analysis {
    /// Scans `config.project_root` when set
    pub fn new(
        config: AnalysisConfig,
        filter: SymbolFilter,
        selection: CategorySelection,
        tree: Option<StructuralTree>,
    ) -> Result<Self> {
        let aggregator = match &config.project_root {
            Some(root) => SampleAggregator::with_reconciler(PathReconciler::scan(
                root,
                &config.source_extensions,
            )?),
            None => SampleAggregator::new(),
        };
        Ok(Self {
            config,
            filter,
            selection,
            aggregator,
            tree,
        })
    }

    pub fn selection(&self) -> CategorySelection {
        self.selection
    }

    pub fn tree(&self) -> Option<&StructuralTree> {
        self.tree.as_ref()
    }

    pub fn analyze(&mut self, path: &Path, capture: Capture) -> CaptureAnalysis {
        let mut report = self.aggregator.aggregate(&capture.samples());
        self.filter.apply(&mut report);
        report::limit(&mut report, self.config.top, self.config.min_ratio);

        let selection = self.selection;
        let node_costs = self.tree.as_mut().map(|tree| {
            let shown = report.costs().filter(|c| selection.includes(c.category));
            let attached = correlate::attach_costs(tree, shown);
            if let Err(e) = tree.clear_annotations(tree.root()) {
                tracing::warn!("Failed to clear annotations: {}", e);
            }
            correlate::annotate(tree, &attached);
            attached
        });

        CaptureAnalysis {
            path: path.to_path_buf(),
            capture,
            report,
            node_costs,
        }
    }

    /// Tree regions bracketed by the event-counter routines, one lookup per
    /// counter group seen in `analyses`
    pub fn measurement_areas(&self, analyses: &[CaptureAnalysis]) -> Vec<JsonMeasurementArea> {
        let Some(tree) = &self.tree else {
            return Vec::new();
        };
        let groups: BTreeSet<&str> = analyses
            .iter()
            .flat_map(|a| a.report.event_counters.iter())
            .map(|e| e.group.as_str())
            .collect();

        let node_id = |id: NodeId| tree.node(id).map(|n| n.id()).unwrap_or_default();
        let routines = &self.config.event_counter;
        let mut areas = Vec::new();
        for group in groups {
            for area in tree.measurement_areas(group, &routines.start, &routines.stop) {
                areas.push(JsonMeasurementArea {
                    group: group.to_string(),
                    start: node_id(area.start),
                    stop: area.stop.map(node_id),
                });
            }
        }
        areas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureEncoder, Format, LineRecord, SymbolRecord};
    use std::fs;
    use tempfile::TempDir;

    fn capture_bytes(samples: f32) -> Vec<u8> {
        let mut encoder = CaptureEncoder::new(Format::Dprf);
        let file = encoder.add_file("/build/src/sim.f90");
        let symbol = encoder.add_symbol(
            0,
            SymbolRecord {
                samples,
                barrier_wait: 0.0,
                mpi_cost: 0.0,
                start_line: 1,
                end_line: 30,
                file,
                name: "compute_".to_string(),
            },
        );
        encoder.add_line(
            0,
            LineRecord {
                samples,
                symbol,
                file,
                line: 12,
            },
        );
        encoder.encode()
    }

    #[test]
    fn test_decode_all_keeps_order_and_errors() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.prf");
        let bad = dir.path().join("bad.prf");
        fs::write(&good, capture_bytes(4.0)).unwrap();
        fs::write(&bad, b"JUNKJUNK").unwrap();
        let missing = dir.path().join("missing.prf");

        let results = decode_all(&[bad.clone(), good.clone(), missing]).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, bad);
        assert!(results[0].1.is_err());
        assert!(results[1].1.is_ok());
        assert!(matches!(
            results[2].1,
            Err(capture::CaptureError::Io { .. })
        ));
    }

    #[test]
    fn test_decode_in_batches_keeps_order() {
        let dir = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = (0..5)
            .map(|i| {
                let path = dir.path().join(format!("run{i}.prf"));
                fs::write(&path, capture_bytes(i as f32 + 1.0)).unwrap();
                path
            })
            .collect();

        let results = decode_batched(&paths, 2).unwrap();
        assert_eq!(results.len(), 5);
        for (i, (path, decoded)) in results.iter().enumerate() {
            assert_eq!(path, &paths[i]);
            let capture = decoded.as_ref().unwrap();
            assert_eq!(capture.lines[0][0].samples, i as f32 + 1.0);
        }
    }

    #[test]
    fn test_analyze_with_project() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/sim.f90"), "program sim\nend\n").unwrap();

        let config = AnalysisConfig {
            project_root: Some(dir.path().to_path_buf()),
            ..AnalysisConfig::default()
        };
        let mut analysis =
            Analysis::new(config, SymbolFilter::all(), CategorySelection::all(), None).unwrap();
        let capture = Capture::decode(&capture_bytes(7.0)).unwrap();
        let result = analysis.analyze(Path::new("run.prf"), capture);

        assert_eq!(result.report.lines.len(), 1);
        let loc = result.report.lines[0].location.resolved().unwrap();
        assert_eq!(loc.file(), dir.path().join("src/sim.f90"));
        assert!(result.node_costs.is_none());
    }

    #[test]
    fn test_missing_project_root_fails() {
        let config = AnalysisConfig {
            project_root: Some(PathBuf::from("/nonexistent/costscope/project")),
            ..AnalysisConfig::default()
        };
        assert!(Analysis::new(config, SymbolFilter::all(), CategorySelection::all(), None).is_err());
    }
}
