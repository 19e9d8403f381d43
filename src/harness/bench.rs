//! Benchmark controller
//!
//! Runs the program under test repeatedly against an already validated
//! fixture and summarizes the durations. Runs are strictly sequential:
//! overlapping invocations would skew the wall-clock measurements.

use std::collections::HashSet;
use std::io::IsTerminal;
use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::common::config::{BenchConfig, TimingMethod, TrimPolicy};
use crate::common::{Error, Result};

use super::case::TestCase;
use super::process::{ProcessRunner, Tool};
use super::stats::{self, Summary};

/// Proof that every configured case passed correctness validation
///
/// Only the driver creates one, after a validation phase without failures,
/// which keeps the benchmark from ever running against a wrong program.
#[derive(Debug)]
pub struct ValidatedCases {
    suffixes: HashSet<String>,
}

impl ValidatedCases {
    pub(crate) fn new<'a>(cases: impl IntoIterator<Item = &'a TestCase>) -> Self {
        Self {
            suffixes: cases.into_iter().map(|c| c.suffix.clone()).collect(),
        }
    }

    pub fn contains(&self, case: &TestCase) -> bool {
        self.suffixes.contains(&case.suffix)
    }
}

/// Iteration count, trimming and timing technique for one benchmark
#[derive(Debug, Clone)]
pub struct BenchSettings {
    pub iterations: u32,
    pub trim: TrimPolicy,
    pub timing: TimingMethod,
    pub time_utility: PathBuf,
}

impl From<&BenchConfig> for BenchSettings {
    fn from(config: &BenchConfig) -> Self {
        Self {
            iterations: config.iterations,
            trim: config.trim,
            timing: config.timing,
            time_utility: config.time_utility.clone(),
        }
    }
}

/// Result of a benchmark
#[derive(Debug, Clone, Serialize)]
pub struct BenchSummary {
    pub case: String,
    pub iterations: u32,
    pub trim: TrimPolicy,
    pub timing: TimingMethod,
    /// Every collected duration in seconds, before trimming
    pub samples: Vec<f64>,
    #[serde(flatten)]
    pub summary: Summary,
}

/// Drives timed runs of the program under test
pub struct BenchmarkController<'a> {
    runner: &'a ProcessRunner,
    program: &'a Tool,
    settings: BenchSettings,
}

impl<'a> BenchmarkController<'a> {
    pub fn new(runner: &'a ProcessRunner, program: &'a Tool, settings: BenchSettings) -> Self {
        Self {
            runner,
            program,
            settings,
        }
    }

    pub fn settings(&self) -> &BenchSettings {
        &self.settings
    }

    /// Time `iterations` runs against `case` and summarize them
    ///
    /// Any failed run aborts the benchmark; no sample is recorded for it.
    pub async fn benchmark(
        &self,
        validated: &ValidatedCases,
        case: &TestCase,
    ) -> Result<BenchSummary> {
        if !validated.contains(case) {
            return Err(Error::Internal(format!(
                "test case '{}' has not passed validation",
                case.suffix
            )));
        }

        let iterations = self.settings.iterations;
        let progress = progress_bar(iterations);
        let mut samples = Vec::with_capacity(iterations as usize);

        for i in 0..iterations {
            let duration = match self.measure(case).await {
                Ok(duration) => duration,
                Err(e) => {
                    progress.abandon();
                    return Err(e);
                }
            };
            tracing::debug!("Iteration {}/{}: {:.6}s", i + 1, iterations, duration);
            samples.push(duration);
            progress.inc(1);
        }
        progress.finish_and_clear();

        let summary = stats::reduce(&samples, self.settings.trim)?;

        Ok(BenchSummary {
            case: case.suffix.clone(),
            iterations,
            trim: self.settings.trim,
            timing: self.settings.timing,
            samples,
            summary,
        })
    }

    async fn measure(&self, case: &TestCase) -> Result<f64> {
        let args = [case.measurements_path.as_os_str()];
        match self.settings.timing {
            TimingMethod::WallClock => Ok(self.runner.run_timed(self.program, &args).await?.duration),
            TimingMethod::TimeUtility => {
                self.runner
                    .run_with_time_utility(&self.settings.time_utility, self.program, &args)
                    .await
            }
        }
    }
}

fn progress_bar(iterations: u32) -> ProgressBar {
    if !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(u64::from(iterations));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  [{bar:40.cyan/blue}] {pos}/{len} runs ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb
}
