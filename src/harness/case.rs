//! Test cases and their fixture file names

use std::path::{Path, PathBuf};

use crate::common::config::{CaseConfig, Config, ExpectedPrefix};

/// A test case resolved against the data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Size label, unique per configuration (e.g. "10k")
    pub suffix: String,
    /// Number of rows the generator is asked for
    pub rows: u64,
    /// Generated dataset, `measurements_<suffix>.txt`
    pub measurements_path: PathBuf,
    /// Reference output, `expected_<suffix>.txt` or `baseline_<suffix>.txt`
    pub expected_path: PathBuf,
    /// Output of the latest validation run, `actual_<suffix>.txt`
    pub actual_path: PathBuf,
}

impl TestCase {
    pub fn new(data_dir: &Path, suffix: &str, rows: u64, prefix: ExpectedPrefix) -> Self {
        Self {
            suffix: suffix.to_string(),
            rows,
            measurements_path: data_dir.join(format!("measurements_{}.txt", suffix)),
            expected_path: data_dir.join(format!("{}_{}.txt", prefix.as_str(), suffix)),
            actual_path: data_dir.join(format!("actual_{}.txt", suffix)),
        }
    }

    pub fn from_config(config: &Config, case: &CaseConfig) -> Self {
        Self::new(
            &config.data_dir(),
            &case.suffix,
            case.rows,
            config.expected_prefix,
        )
    }

    /// Human readable label used in progress lines
    pub fn label(&self) -> String {
        format!("{} lines ({})", self.rows, self.suffix)
    }
}

/// Resolve every configured case, in configuration order
pub fn cases_from_config(config: &Config) -> Vec<TestCase> {
    config
        .cases
        .iter()
        .map(|case| TestCase::from_config(config, case))
        .collect()
}
