//! Correctness and benchmark harness
//!
//! Generates and caches fixtures, checks the output of the program under
//! test byte for byte against a reference implementation, and times repeated
//! runs once every case is correct. One external process runs at a time.

pub mod bench;
pub mod case;
pub mod driver;
pub mod fixture;
pub mod process;
pub mod stats;
pub mod validate;

pub use bench::{BenchSettings, BenchSummary, BenchmarkController, ValidatedCases};
pub use case::TestCase;
pub use driver::{Harness, HarnessReport, Outcome, Stage};
pub use fixture::{Fixture, FixtureStatus, FixtureStore};
pub use process::{ProcessRunner, RunResult, Tool};
pub use stats::Summary;
pub use validate::{validate, Verdict};
