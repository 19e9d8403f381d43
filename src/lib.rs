//! obrc-harness - correctness and benchmark harness for 1BRC programs
//!
//! This library drives an external aggregation program as a black box:
//! fixtures are generated and cached on disk, outputs are compared byte for
//! byte with a reference implementation, and validated programs are timed.

pub mod cli;
pub mod commands;
pub mod common;
pub mod harness;

// Re-export commonly used types for tests
pub use common::config::Config;
pub use common::{Error, Result};
pub use harness::{Harness, HarnessReport, Outcome, Stage};
