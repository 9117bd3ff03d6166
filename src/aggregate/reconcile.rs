//! Mapping capture-recorded file names onto current project files
//!
//! Captures record the path the program was compiled from, which rarely
//! matches the analysis checkout. Candidates are project files with the same
//! file name (case-insensitive); ties between several are broken by counting
//! how many trailing path segments agree.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Default)]
pub struct PathReconciler {
    files: Vec<PathBuf>,
}

fn segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\']).filter(|s| !s.is_empty()).collect()
}

fn file_name(path: &str) -> Option<&str> {
    path.rsplit(['/', '\\']).find(|s| !s.is_empty())
}

/// Aligned trailing segments that agree, ignoring case; a mismatch does not
/// end the count
fn trailing_agreement(recorded: &[&str], candidate: &[&str]) -> usize {
    recorded
        .iter()
        .rev()
        .zip(candidate.iter().rev())
        .filter(|(a, b)| a.eq_ignore_ascii_case(b))
        .count()
}

impl PathReconciler {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    /// Collect project files under `root` with one of `extensions`
    /// (case-insensitive, without the dot); empty means every file
    pub fn scan(root: &Path, extensions: &[String]) -> Result<Self> {
        if !root.is_dir() {
            anyhow::bail!("Project root is not a directory: {}", root.display());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry
                .with_context(|| format!("Failed to scan project root: {}", root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let wanted = extensions.is_empty()
                || entry
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|ext| extensions.iter().any(|w| w.eq_ignore_ascii_case(ext)));
            if wanted {
                files.push(entry.into_path());
            }
        }

        tracing::debug!(
            "Scanned {} source files under {}",
            files.len(),
            root.display()
        );
        Ok(Self { files })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Best project file for a recorded path, or `None` when no project file
    /// shares its file name
    pub fn resolve(&self, recorded: &str) -> Option<&Path> {
        let wanted = file_name(recorded)?;
        let candidates: Vec<&PathBuf> = self
            .files
            .iter()
            .filter(|p| {
                p.to_str()
                    .and_then(file_name)
                    .is_some_and(|name| name.eq_ignore_ascii_case(wanted))
            })
            .collect();

        match candidates.as_slice() {
            [] => {
                tracing::debug!("No project file matches recorded file {}", recorded);
                None
            }
            [only] => Some(only.as_path()),
            many => {
                let recorded_segments = segments(recorded);
                let mut best = many[0];
                let mut best_score = 0;
                let mut tied = false;
                for (i, &candidate) in many.iter().enumerate() {
                    let score = candidate
                        .to_str()
                        .map(|c| trailing_agreement(&recorded_segments, &segments(c)))
                        .unwrap_or(0);
                    if i == 0 || score > best_score {
                        best = candidate;
                        best_score = score;
                        tied = false;
                    } else if score == best_score {
                        tied = true;
                    }
                }
                if tied {
                    tracing::warn!(
                        "Recorded file {} matches {} project files equally; using {}",
                        recorded,
                        many.len(),
                        best.display()
                    );
                }
                Some(best.as_path())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconciler(paths: &[&str]) -> PathReconciler {
        PathReconciler::new(paths.iter().map(PathBuf::from).collect())
    }

    #[test]
    fn test_longest_trailing_match_wins() {
        let r = reconciler(&["/a/b/sim.f90", "/x/sim.f90"]);
        assert_eq!(
            r.resolve("/build/job/b/sim.f90"),
            Some(Path::new("/a/b/sim.f90"))
        );
    }

    #[test]
    fn test_single_candidate_ignores_directories() {
        let r = reconciler(&["/home/me/proj/src/Solver.F90", "/home/me/proj/src/io.f90"]);
        assert_eq!(
            r.resolve("/scratch/other/solver.f90"),
            Some(Path::new("/home/me/proj/src/Solver.F90"))
        );
    }

    #[test]
    fn test_no_candidate_is_unresolved() {
        let r = reconciler(&["/a/b/sim.f90"]);
        assert_eq!(r.resolve("/a/b/main.f90"), None);
        assert_eq!(r.resolve(""), None);
    }

    #[test]
    fn test_first_candidate_wins_ties() {
        let r = reconciler(&["/p/one/sim.f90", "/q/two/sim.f90"]);
        assert_eq!(r.resolve("sim.f90"), Some(Path::new("/p/one/sim.f90")));
    }

    #[test]
    fn test_backslash_separators() {
        let r = reconciler(&["/p/core/sim.f90", "/p/util/sim.f90"]);
        assert_eq!(
            r.resolve("C:\\build\\UTIL\\sim.f90"),
            Some(Path::new("/p/util/sim.f90"))
        );
    }

    #[test]
    fn test_mismatch_does_not_stop_count() {
        // a/x/sim.f90 agrees with z/a/y/sim.f90 on both sim.f90 and a
        let r = reconciler(&["/z/a/y/sim.f90", "/q/b/sim.f90"]);
        assert_eq!(
            r.resolve("/a/x/sim.f90"),
            Some(Path::new("/z/a/y/sim.f90"))
        );
    }
}
