//! Error types for the harness
//!
//! Every failure is surfaced to the operator: there is no retry anywhere, so
//! messages name the test case, the program and the files involved.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Unknown test case '{0}'. Check the [[cases]] entries of your configuration")]
    UnknownCase(String),

    // === External Process Errors ===
    #[error("Executable '{name}' not found. Searched: {searched}")]
    ToolNotFound { name: String, searched: String },

    #[error("Failed to start '{program}': {error}")]
    ProcessSpawn {
        program: String,
        #[source]
        error: io::Error,
    },

    #[error("'{program}' exited with {}{}", exit_code_text(.code), stderr_tail(.stderr))]
    ProcessFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to generate {what} for test case '{suffix}': {source}")]
    FixtureGeneration {
        suffix: String,
        what: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("Fixture path '{0}' exists but is not a regular file")]
    FixtureNotAFile(PathBuf),

    // === Measurement Errors ===
    #[error("Could not parse elapsed time from timing utility output: {0:?}")]
    TimeParse(String),

    #[error("Trimming left no samples to summarize ({samples} collected)")]
    NotEnoughSamples { samples: usize },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    #[error("Failed to write file '{path}': {error}")]
    FileWrite { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

fn exit_code_text(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

impl Error {
    /// Create a tool not found error with search locations
    pub fn tool_not_found<S: AsRef<str>>(name: &str, searched: &[S]) -> Self {
        Self::ToolNotFound {
            name: name.to_string(),
            searched: searched
                .iter()
                .map(|s| s.as_ref())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Wrap a generator/reference failure with the test case it belongs to
    pub fn fixture_generation(suffix: &str, what: &'static str, source: Error) -> Self {
        Self::FixtureGeneration {
            suffix: suffix.to_string(),
            what,
            source: Box::new(source),
        }
    }

    /// Create a file read error
    pub fn file_read(path: &std::path::Path, error: io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Create a file write error
    pub fn file_write(path: &std::path::Path, error: io::Error) -> Self {
        Self::FileWrite {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Whether this error came from an external process exiting unsuccessfully
    pub fn is_process_failure(&self) -> bool {
        match self {
            Error::ProcessFailed { .. } => true,
            Error::FixtureGeneration { source, .. } => source.is_process_failure(),
            _ => false,
        }
    }
}
