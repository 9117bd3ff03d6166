//! CLI argument parsing for costscope

use crate::aggregate::Category;
use crate::report::CategorySelection;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for cost reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

/// Cost tables to report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    Line,
    Loop,
    Procedure,
    CallGraph,
    All,
}

impl CategoryArg {
    pub fn selection(self) -> CategorySelection {
        match self {
            CategoryArg::Line => CategorySelection::only(Category::Line),
            CategoryArg::Loop => CategorySelection::only(Category::Loop),
            CategoryArg::Procedure => CategorySelection::only(Category::Procedure),
            CategoryArg::CallGraph => CategorySelection::call_graph_only(),
            CategoryArg::All => CategorySelection::all(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "costscope")]
#[command(version)]
#[command(about = "Source-level cost attribution for sampling profiler captures", long_about = None)]
pub struct Cli {
    /// Profiler capture files (DPRF or EPRF)
    #[arg(required = true, value_name = "CAPTURE")]
    pub captures: Vec<PathBuf>,

    /// Project root scanned to reconcile recorded source paths
    #[arg(long = "project", value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Structural tree document (JSON) to place costs on
    #[arg(long = "tree", value_name = "FILE")]
    pub tree: Option<PathBuf>,

    /// Analysis configuration file (TOML)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Cost tables to report
    #[arg(long = "category", value_enum, default_value = "all")]
    pub category: CategoryArg,

    /// Only report symbols matching this regular expression
    #[arg(long = "filter", value_name = "REGEX")]
    pub filter: Option<String>,

    /// Rows shown per category
    #[arg(long = "top", value_name = "N")]
    pub top: Option<usize>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
