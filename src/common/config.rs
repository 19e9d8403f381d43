//! Configuration file handling
//!
//! Every directory and executable the harness touches comes from here, so a
//! run can be pointed at a different build or fixture set without relying on
//! where the harness binary lives.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::paths::{self, resolve};
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base directory; every relative path below resolves against it
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Directory holding measurements/expected/actual files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Naming of the reference output files
    #[serde(default)]
    pub expected_prefix: ExpectedPrefix,

    /// Program under test
    #[serde(default = "default_program")]
    pub program: ToolConfig,

    /// Reference implementation producing the expected output
    #[serde(default = "default_reference")]
    pub reference: ToolConfig,

    /// Synthetic measurements generator
    #[serde(default = "default_generator")]
    pub generator: ToolConfig,

    /// Benchmark settings
    #[serde(default)]
    pub bench: BenchConfig,

    /// Test cases, in the order they are prepared and validated
    #[serde(default = "default_cases")]
    pub cases: Vec<CaseConfig>,
}

/// Prefix of the reference output files (`expected_<suffix>.txt` or
/// `baseline_<suffix>.txt`)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedPrefix {
    #[default]
    Expected,
    Baseline,
}

impl ExpectedPrefix {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpectedPrefix::Expected => "expected",
            ExpectedPrefix::Baseline => "baseline",
        }
    }
}

/// An external executable plus the fixed arguments placed before the
/// per-invocation ones
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolConfig {
    /// Path to the executable, or a bare name looked up on PATH
    pub path: PathBuf,

    /// Leading arguments (e.g. the Java source file to run)
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// A configured test case
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseConfig {
    /// Label used in fixture file names (e.g. "10k")
    pub suffix: String,
    /// Number of measurement rows to generate
    pub rows: u64,
}

impl CaseConfig {
    pub fn new(suffix: &str, rows: u64) -> Self {
        Self {
            suffix: suffix.to_string(),
            rows,
        }
    }
}

/// Rule for discarding duration samples before they are summarized
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum TrimPolicy {
    /// Keep every sample
    #[default]
    None,
    /// Drop the first sample (cold file cache)
    DropFirst,
    /// Drop the most recent sample
    DropLast,
    /// Drop the first and the most recent sample
    DropFirstLast,
    /// Drop one occurrence of the global minimum and of the global maximum
    DropMinMax,
}

/// How the duration of a benchmark run is measured
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum TimingMethod {
    /// Wall clock around process start and exit, measured by the harness
    #[default]
    WallClock,
    /// Elapsed seconds reported by an external `time -f %e` wrapper
    TimeUtility,
}

/// Benchmark settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Number of timed runs
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Samples discarded before summarizing
    #[serde(default)]
    pub trim: TrimPolicy,

    /// Duration measurement technique
    #[serde(default)]
    pub timing: TimingMethod,

    /// Timing utility used with `timing = "time_utility"`
    #[serde(default = "default_time_utility")]
    pub time_utility: PathBuf,

    /// Case to benchmark; defaults to the last configured case
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            trim: TrimPolicy::default(),
            timing: TimingMethod::default(),
            time_utility: default_time_utility(),
            case: None,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_program() -> ToolConfig {
    ToolConfig::new("build/bin/obrc")
}

fn default_reference() -> ToolConfig {
    ToolConfig::new("java").with_args(["java/CalculateAverage.java"])
}

fn default_generator() -> ToolConfig {
    ToolConfig::new("java").with_args(["java/CreateMeasurements.java"])
}

fn default_cases() -> Vec<CaseConfig> {
    vec![
        CaseConfig::new("10k", 10_000),
        CaseConfig::new("100k", 100_000),
        CaseConfig::new("1mil", 1_000_000),
        CaseConfig::new("10mil", 10_000_000),
        CaseConfig::new("100mil", 100_000_000),
        CaseConfig::new("1bil", 1_000_000_000),
    ]
}

fn default_iterations() -> u32 {
    50
}

fn default_time_utility() -> PathBuf {
    PathBuf::from("/usr/bin/time")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: default_root(),
            data_dir: default_data_dir(),
            expected_prefix: ExpectedPrefix::default(),
            program: default_program(),
            reference: default_reference(),
            generator: default_generator(),
            bench: BenchConfig::default(),
            cases: default_cases(),
        }
    }
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must exist. Otherwise `./obrc-harness.toml`, then the
    /// user-wide config file, then built-in defaults are used. The returned
    /// `root` is absolute.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir()?;

        let path = match explicit {
            Some(path) => Some(resolve(&cwd, path)),
            None => paths::discover_config(&cwd),
        };

        match path {
            Some(path) => {
                let content =
                    std::fs::read_to_string(&path).map_err(|e| Error::file_read(&path, e))?;
                // The user-wide file is shared between checkouts, so its
                // relative root points at the working directory instead.
                let base = if paths::config_path().as_deref() == Some(path.as_path()) {
                    cwd
                } else {
                    path.parent().map(Path::to_path_buf).unwrap_or(cwd)
                };
                tracing::debug!("Loaded configuration from {}", path.display());
                Self::from_toml_str(&content, &base)
            }
            None => {
                let mut config = Self::default();
                config.root = cwd;
                Ok(config)
            }
        }
    }

    /// Parse configuration text; a relative `root` resolves against `base`
    pub fn from_toml_str(content: &str, base: &Path) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.root = normalize(&resolve(base, &config.root));
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Internal(e.to_string()))
    }

    /// Absolute data directory
    pub fn data_dir(&self) -> PathBuf {
        resolve(&self.root, &self.data_dir)
    }

    /// Check invariants the harness relies on
    pub fn validate(&self) -> Result<()> {
        if self.cases.is_empty() {
            return Err(Error::Config("no test cases configured".to_string()));
        }

        let mut seen = HashSet::new();
        for case in &self.cases {
            validate_suffix(&case.suffix)?;
            if case.rows == 0 {
                return Err(Error::Config(format!(
                    "test case '{}' must have a positive row count",
                    case.suffix
                )));
            }
            if !seen.insert(case.suffix.as_str()) {
                return Err(Error::Config(format!(
                    "test case '{}' is configured more than once",
                    case.suffix
                )));
            }
        }

        if self.bench.iterations == 0 {
            return Err(Error::Config(
                "bench.iterations must be at least 1".to_string(),
            ));
        }

        if let Some(case) = &self.bench.case {
            if !seen.contains(case.as_str()) {
                return Err(Error::UnknownCase(case.clone()));
            }
        }

        Ok(())
    }

    /// Keep only the cases whose suffix is listed, in configuration order
    pub fn select_cases(&mut self, suffixes: &[String]) -> Result<()> {
        if suffixes.is_empty() {
            return Ok(());
        }
        for suffix in suffixes {
            if !self.cases.iter().any(|c| &c.suffix == suffix) {
                return Err(Error::UnknownCase(suffix.clone()));
            }
        }
        self.cases.retain(|c| suffixes.contains(&c.suffix));
        Ok(())
    }
}

fn validate_suffix(suffix: &str) -> Result<()> {
    if suffix.is_empty() {
        return Err(Error::Config("test case suffix must not be empty".to_string()));
    }
    if suffix.contains(['/', '\\']) || suffix == "." || suffix == ".." {
        return Err(Error::Config(format!(
            "test case suffix '{}' must not contain path separators",
            suffix
        )));
    }
    Ok(())
}

/// Drop `.` components so displayed paths stay readable
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect()
}
