//! Harness driver
//!
//! Preparing → Validating → Benchmarking. Benchmarking is entered only when
//! every case validated; a mismatch ends the run with the failure list. An
//! external process exiting non-zero aborts the whole run with an error.

use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use crate::common::config::Config;
use crate::common::{Error, Result};

use super::bench::{BenchSettings, BenchSummary, BenchmarkController, ValidatedCases};
use super::case::{cases_from_config, TestCase};
use super::fixture::{FixtureStatus, FixtureStore};
use super::process::{ProcessRunner, Tool};
use super::validate::{self, diff_hint, Verdict};

/// How far a harness run goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Fixtures only
    Prepare,
    /// Fixtures and correctness checks
    Validate,
    /// Everything, including the benchmark
    Benchmark,
}

/// Per-case record of a harness run
#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    pub suffix: String,
    pub rows: u64,
    pub fixture: FixtureStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRecord>,
}

/// Verdict and duration of a case's validation run
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRecord {
    #[serde(flatten)]
    pub verdict: Verdict,
    pub duration: f64,
}

/// A case whose output did not match the reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseFailure {
    pub suffix: String,
    pub expected_path: PathBuf,
    pub actual_path: PathBuf,
}

/// Terminal state of a harness run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Stopped after preparing fixtures
    Prepared,
    /// Every case validated; `benchmark` is absent when it was not requested
    AllPassed { benchmark: Option<BenchSummary> },
    /// At least one case mismatched; no benchmark was run
    ValidationFailed { failures: Vec<CaseFailure> },
}

/// Everything a harness run produced
#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    pub cases: Vec<CaseReport>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl HarnessReport {
    pub fn validation_failed(&self) -> bool {
        matches!(self.outcome, Outcome::ValidationFailed { .. })
    }

    pub fn benchmark(&self) -> Option<&BenchSummary> {
        match &self.outcome {
            Outcome::AllPassed { benchmark } => benchmark.as_ref(),
            _ => None,
        }
    }
}

/// Top-level sequence over all configured cases
pub struct Harness {
    config: Config,
    runner: ProcessRunner,
    cases: Vec<TestCase>,
}

impl Harness {
    /// Validate the configuration and resolve the test cases
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let runner = ProcessRunner::new(config.root.clone());
        let cases = cases_from_config(&config);
        Ok(Self {
            config,
            runner,
            cases,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    /// Case the benchmark runs against: the configured one, or the last case
    pub fn bench_case(&self) -> Result<&TestCase> {
        match &self.config.bench.case {
            Some(suffix) => self
                .cases
                .iter()
                .find(|c| &c.suffix == suffix)
                .ok_or_else(|| Error::UnknownCase(suffix.clone())),
            None => self
                .cases
                .last()
                .ok_or_else(|| Error::Config("no test cases configured".to_string())),
        }
    }

    /// Run the harness up to and including `stage`
    pub async fn run(&self, stage: Stage) -> Result<HarnessReport> {
        let mut reports = self.prepare().await?;
        if stage == Stage::Prepare {
            return Ok(HarnessReport {
                cases: reports,
                outcome: Outcome::Prepared,
            });
        }

        let program = Tool::resolve(&self.config.program, &self.config.root)?;
        let failures = self.validate_all(&program, &mut reports).await?;

        if !failures.is_empty() {
            println!(
                "\n{} {} of {} test case(s) produced wrong results:",
                "✗".red().bold(),
                failures.len(),
                self.cases.len()
            );
            for failure in &failures {
                println!("  {} {}", "-".red(), failure.suffix);
                println!(
                    "      {}",
                    diff_hint(&failure.expected_path, &failure.actual_path).dimmed()
                );
            }
            return Ok(HarnessReport {
                cases: reports,
                outcome: Outcome::ValidationFailed { failures },
            });
        }

        if stage == Stage::Validate {
            println!("\n{} {}", "✓".green().bold(), "Passed all the tests".green().bold());
            return Ok(HarnessReport {
                cases: reports,
                outcome: Outcome::AllPassed { benchmark: None },
            });
        }

        // Every case matched, so the benchmark precondition holds.
        let validated = ValidatedCases::new(&self.cases);
        let benchmark = self.run_benchmark(&program, &validated).await?;

        Ok(HarnessReport {
            cases: reports,
            outcome: Outcome::AllPassed {
                benchmark: Some(benchmark),
            },
        })
    }

    async fn prepare(&self) -> Result<Vec<CaseReport>> {
        println!("\n{}", "Preparing fixtures:".cyan());
        let store = FixtureStore::new(
            &self.runner,
            self.config.data_dir(),
            self.config.generator.clone(),
            self.config.reference.clone(),
        );

        let mut reports = Vec::with_capacity(self.cases.len());
        for case in &self.cases {
            let fixture = store.ensure_fixture(case).await?;
            let note = match (
                fixture.status.generated_measurements,
                fixture.status.generated_expected,
            ) {
                (false, false) => "cached",
                (true, false) => "generated measurements",
                (false, true) => "generated expected output",
                (true, true) => "generated",
            };
            println!("  {} {} {}", "✓".green(), case.label(), note.dimmed());

            reports.push(CaseReport {
                suffix: case.suffix.clone(),
                rows: case.rows,
                fixture: fixture.status,
                validation: None,
            });
        }
        Ok(reports)
    }

    async fn validate_all(
        &self,
        program: &Tool,
        reports: &mut [CaseReport],
    ) -> Result<Vec<CaseFailure>> {
        println!("\n{}", "Validating:".cyan());
        let mut failures = Vec::new();

        for (case, report) in self.cases.iter().zip(reports.iter_mut()) {
            let result = self
                .runner
                .run(program, &[case.measurements_path.as_os_str()])
                .await?;

            let verdict = validate::validate(case, &result.stdout)?;
            match &verdict {
                Verdict::Match => println!(
                    "  {} Test for {} ran in {:.3}s, result is valid",
                    "✓".green(),
                    case.label(),
                    result.duration
                ),
                Verdict::Mismatch {
                    expected_path,
                    actual_path,
                } => {
                    println!(
                        "  {} Test for {} has wrong result",
                        "✗".red(),
                        case.label()
                    );
                    failures.push(CaseFailure {
                        suffix: case.suffix.clone(),
                        expected_path: expected_path.clone(),
                        actual_path: actual_path.clone(),
                    });
                }
            }

            report.validation = Some(ValidationRecord {
                verdict,
                duration: result.duration,
            });
        }

        Ok(failures)
    }

    async fn run_benchmark(
        &self,
        program: &Tool,
        validated: &ValidatedCases,
    ) -> Result<BenchSummary> {
        let case = self.bench_case()?;
        let settings = BenchSettings::from(&self.config.bench);
        println!(
            "\n{} {} ({} runs, trim: {:?}, timing: {:?})",
            "Passed all the tests. Benchmarking".cyan(),
            case.label(),
            settings.iterations,
            settings.trim,
            settings.timing
        );

        let controller = BenchmarkController::new(&self.runner, program, settings);
        let result = controller.benchmark(validated, case).await?;

        println!("  Avg time: {:.6}s", result.summary.avg);
        println!("  Min time: {:.6}s", result.summary.min);
        println!("  Max time: {:.6}s", result.summary.max);
        if result.summary.count != result.samples.len() {
            println!(
                "  {}",
                format!(
                    "({} of {} samples kept after trimming)",
                    result.summary.count,
                    result.samples.len()
                )
                .dimmed()
            );
        }

        Ok(result)
    }
}
