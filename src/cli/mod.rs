//! CLI command handling
//!
//! Loads the configuration, applies command line overrides and hands the
//! result to the harness driver.

use std::path::Path;

use crate::commands::{BenchArgs, CaseArgs, Commands, GlobalArgs};
use crate::common::config::Config;
use crate::common::paths::resolve;
use crate::common::{Error, Result};
use crate::harness::{Harness, HarnessReport, Stage};

/// Exit status used by `--strict` when a case produced wrong output
pub const VALIDATION_FAILED_EXIT_CODE: i32 = 2;

/// Dispatch a CLI command, returning the process exit status
pub async fn dispatch(global: &GlobalArgs, command: Commands) -> Result<i32> {
    let mut config = load_config(global)?;

    match command {
        Commands::Run {
            cases,
            bench,
            no_bench,
            strict,
            report,
        } => {
            apply_cases(&mut config, &cases)?;
            apply_bench(&mut config, &bench);
            let stage = if no_bench {
                Stage::Validate
            } else {
                Stage::Benchmark
            };
            let outcome = Harness::new(config)?.run(stage).await?;
            finish(&outcome, report.as_deref(), strict)
        }

        Commands::Prepare { cases } => {
            apply_cases(&mut config, &cases)?;
            Harness::new(config)?.run(Stage::Prepare).await?;
            Ok(0)
        }

        Commands::Validate {
            cases,
            strict,
            report,
        } => {
            apply_cases(&mut config, &cases)?;
            let outcome = Harness::new(config)?.run(Stage::Validate).await?;
            finish(&outcome, report.as_deref(), strict)
        }

        Commands::Config => {
            config.validate()?;
            print!("{}", config.to_toml()?);
            Ok(0)
        }
    }
}

/// Load the configuration file and apply the global overrides
pub fn load_config(global: &GlobalArgs) -> Result<Config> {
    let mut config = Config::load(global.config.as_deref())?;
    let cwd = std::env::current_dir()?;

    // Paths given on the command line are relative to where the user is
    if let Some(program) = &global.program {
        config.program.path = resolve(&cwd, program);
        config.program.args.clear();
    }
    if let Some(data_dir) = &global.data_dir {
        config.data_dir = resolve(&cwd, data_dir);
    }

    Ok(config)
}

/// Restrict the configuration to the selected cases
pub fn apply_cases(config: &mut Config, args: &CaseArgs) -> Result<()> {
    config.select_cases(&args.cases)?;

    // A configured benchmark case that was filtered out falls back to the
    // last selected case.
    if let Some(case) = &config.bench.case {
        if !config.cases.iter().any(|c| &c.suffix == case) {
            tracing::debug!("Benchmark case '{}' not selected, using last case", case);
            config.bench.case = None;
        }
    }
    Ok(())
}

/// Apply benchmark overrides
pub fn apply_bench(config: &mut Config, args: &BenchArgs) {
    if let Some(iterations) = args.iterations {
        config.bench.iterations = iterations;
    }
    if let Some(trim) = args.trim {
        config.bench.trim = trim;
    }
    if let Some(timing) = args.timing {
        config.bench.timing = timing;
    }
    if let Some(case) = &args.bench_case {
        config.bench.case = Some(case.clone());
    }
}

fn finish(report: &HarnessReport, report_path: Option<&Path>, strict: bool) -> Result<i32> {
    if let Some(path) = report_path {
        write_report(path, report)?;
    }
    if strict && report.validation_failed() {
        Ok(VALIDATION_FAILED_EXIT_CODE)
    } else {
        Ok(0)
    }
}

/// Write the report as pretty-printed JSON
pub fn write_report(path: &Path, report: &HarnessReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).map_err(|e| Error::file_write(path, e))?;
    tracing::info!("Report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::{TimingMethod, TrimPolicy};

    #[test]
    fn test_apply_bench_overrides() {
        let mut config = Config::default();
        apply_bench(
            &mut config,
            &BenchArgs {
                iterations: Some(30),
                trim: Some(TrimPolicy::DropFirstLast),
                timing: Some(TimingMethod::TimeUtility),
                bench_case: Some("10k".to_string()),
            },
        );
        assert_eq!(config.bench.iterations, 30);
        assert_eq!(config.bench.trim, TrimPolicy::DropFirstLast);
        assert_eq!(config.bench.timing, TimingMethod::TimeUtility);
        assert_eq!(config.bench.case.as_deref(), Some("10k"));
    }

    #[test]
    fn test_apply_bench_keeps_unset_values() {
        let mut config = Config::default();
        config.bench.trim = TrimPolicy::DropMinMax;
        apply_bench(&mut config, &BenchArgs::default());
        assert_eq!(config.bench.trim, TrimPolicy::DropMinMax);
        assert_eq!(config.bench.iterations, 50);
    }

    #[test]
    fn test_apply_cases_drops_unselected_bench_case() {
        let mut config = Config::default();
        config.bench.case = Some("1bil".to_string());
        apply_cases(
            &mut config,
            &CaseArgs {
                cases: vec!["10k".to_string()],
            },
        )
        .unwrap();
        assert_eq!(config.cases.len(), 1);
        assert_eq!(config.bench.case, None);
    }

    #[test]
    fn test_apply_cases_rejects_unknown_suffix() {
        let mut config = Config::default();
        let err = apply_cases(
            &mut config,
            &CaseArgs {
                cases: vec!["2bil".to_string()],
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownCase(_)));
    }
}
