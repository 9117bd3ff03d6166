//! Source locations shared by the structural tree and the cost reports
//!
//! A location is a file plus an inclusive line range. Two locations overlap
//! when they name the same file and their ranges intersect.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A file plus an inclusive `[start_line, end_line]` range
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Source file path
    pub file: PathBuf,
    /// First line (1-indexed, inclusive)
    pub start_line: u32,
    /// Last line (inclusive)
    pub end_line: u32,
}

impl SourceLocation {
    /// Create a location; `start_line` and `end_line` are swapped if reversed
    pub fn new(file: impl Into<PathBuf>, start_line: u32, end_line: u32) -> Self {
        let (start_line, end_line) = if start_line <= end_line {
            (start_line, end_line)
        } else {
            (end_line, start_line)
        };
        Self {
            file: file.into(),
            start_line,
            end_line,
        }
    }

    /// Single-line location
    pub fn line(file: impl Into<PathBuf>, line: u32) -> Self {
        Self::new(file, line, line)
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// True when both locations name the same file and the ranges intersect
    pub fn overlaps(&self, other: &SourceLocation) -> bool {
        self.file == other.file && self.overlaps_lines(other.start_line, other.end_line)
    }

    /// Inclusive range intersection, ignoring the file
    pub fn overlaps_lines(&self, start_line: u32, end_line: u32) -> bool {
        self.start_line <= end_line && start_line <= self.end_line
    }

    /// Span from the start of `self` to the end of `end` (same file as `self`)
    pub fn spanning(&self, end: &SourceLocation) -> SourceLocation {
        SourceLocation::new(
            self.file.clone(),
            self.start_line.min(end.start_line),
            self.end_line.max(end.end_line),
        )
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_line == self.end_line {
            write!(f, "{}:{}", self.file.display(), self.start_line)
        } else {
            write!(
                f,
                "{}:{}-{}",
                self.file.display(),
                self.start_line,
                self.end_line
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_inclusive_bounds() {
        let a = SourceLocation::new("sim.f90", 10, 20);
        assert!(a.overlaps(&SourceLocation::line("sim.f90", 10)));
        assert!(a.overlaps(&SourceLocation::line("sim.f90", 20)));
        assert!(a.overlaps(&SourceLocation::new("sim.f90", 5, 12)));
        assert!(!a.overlaps(&SourceLocation::new("sim.f90", 21, 30)));
        assert!(!a.overlaps(&SourceLocation::line("sim.f90", 9)));
    }

    #[test]
    fn test_overlap_requires_same_file() {
        let a = SourceLocation::new("a/sim.f90", 1, 100);
        let b = SourceLocation::new("b/sim.f90", 1, 100);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_reversed_range_is_normalized() {
        let loc = SourceLocation::new("x.f90", 30, 10);
        assert_eq!(loc.start_line, 10);
        assert_eq!(loc.end_line, 30);
    }

    #[test]
    fn test_display() {
        assert_eq!(SourceLocation::line("x.f90", 7).to_string(), "x.f90:7");
        assert_eq!(SourceLocation::new("x.f90", 7, 9).to_string(), "x.f90:7-9");
    }

    #[test]
    fn test_spanning() {
        let start = SourceLocation::line("x.f90", 3);
        let end = SourceLocation::line("x.f90", 12);
        assert_eq!(start.spanning(&end), SourceLocation::new("x.f90", 3, 12));
    }
}
