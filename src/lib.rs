//! costscope - source-level cost attribution for sampling profiler captures
//!
//! This library decodes binary profiler captures, merges their per-thread
//! samples into ranked line, loop and procedure costs, reconciles recorded
//! source paths against a project, and places the costs on a structural
//! tree of the program whose nodes have stable textual identities.

pub mod aggregate;
pub mod capture;
pub mod cli;
pub mod config;
pub mod correlate;
pub mod csv_output;
pub mod filter;
pub mod json_output;
pub mod pipeline;
pub mod report;
pub mod source_location;
pub mod tree;
