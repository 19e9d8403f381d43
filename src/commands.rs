//! CLI command definitions

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::common::config::{TimingMethod, TrimPolicy};

/// Options shared by every subcommand
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Configuration file (default: ./obrc-harness.toml, then the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Program under test, overriding the configuration
    #[arg(long, global = true, value_name = "PATH")]
    pub program: Option<PathBuf>,

    /// Fixture directory, overriding the configuration
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

/// Test case selection
#[derive(Args, Debug, Default)]
pub struct CaseArgs {
    /// Only use the test case with this suffix (repeatable)
    #[arg(long = "case", value_name = "SUFFIX")]
    pub cases: Vec<String>,
}

/// Benchmark overrides
#[derive(Args, Debug, Default)]
pub struct BenchArgs {
    /// Number of timed runs
    #[arg(long, short = 'n')]
    pub iterations: Option<u32>,

    /// Samples to discard before summarizing
    #[arg(long, value_enum)]
    pub trim: Option<TrimPolicy>,

    /// How each run is timed
    #[arg(long, value_enum)]
    pub timing: Option<TimingMethod>,

    /// Test case to benchmark (default: the last selected case)
    #[arg(long, value_name = "SUFFIX")]
    pub bench_case: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prepare fixtures, validate every case, then benchmark
    Run {
        #[command(flatten)]
        cases: CaseArgs,

        #[command(flatten)]
        bench: BenchArgs,

        /// Stop after validation
        #[arg(long)]
        no_bench: bool,

        /// Exit with status 2 when a case produces wrong output
        #[arg(long)]
        strict: bool,

        /// Write a JSON report of the run to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Generate missing measurements and expected-output files
    Prepare {
        #[command(flatten)]
        cases: CaseArgs,
    },

    /// Prepare fixtures and check the program's output, without benchmarking
    Validate {
        #[command(flatten)]
        cases: CaseArgs,

        /// Exit with status 2 when a case produces wrong output
        #[arg(long)]
        strict: bool,

        /// Write a JSON report of the run to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config,
}
