//! Process runner
//!
//! Runs one external executable at a time and waits for it to exit. A
//! non-zero exit status is always an error, so every result handed back
//! belongs to a successful run.

use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Instant;

use tokio::process::Command;

use crate::common::config::ToolConfig;
use crate::common::{Error, Result};

/// An external executable resolved to a concrete path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    /// Executable to spawn
    pub program: PathBuf,
    /// Arguments placed before the per-invocation arguments
    pub args: Vec<OsString>,
}

impl Tool {
    /// Resolve a configured tool
    ///
    /// Paths with a directory part resolve against `root`. Bare names are
    /// looked up on PATH first, then in `root`.
    pub fn resolve(config: &ToolConfig, root: &Path) -> Result<Self> {
        let args = config.args.iter().map(OsString::from).collect();

        if is_bare_name(&config.path) {
            if let Ok(program) = which::which(&config.path) {
                return Ok(Self { program, args });
            }
            let local = root.join(&config.path);
            if local.is_file() {
                return Ok(Self {
                    program: local,
                    args,
                });
            }
            let name = config.path.display().to_string();
            return Err(Error::tool_not_found(
                &name,
                &["PATH".to_string(), root.display().to_string()],
            ));
        }

        Ok(Self {
            program: crate::common::paths::resolve(root, &config.path),
            args,
        })
    }

    /// Display name used in messages
    pub fn name(&self) -> String {
        self.program.display().to_string()
    }

    fn full_args<'a>(&'a self, extra: &'a [&'a OsStr]) -> impl Iterator<Item = &'a OsStr> {
        self.args
            .iter()
            .map(OsString::as_os_str)
            .chain(extra.iter().copied())
    }
}

fn is_bare_name(path: &Path) -> bool {
    let mut components = path.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Captured standard output (empty when discarded)
    pub stdout: Vec<u8>,
    /// Captured standard error (empty when discarded)
    pub stderr: Vec<u8>,
    /// Wall-clock seconds from spawn to exit
    pub duration: f64,
}

/// Spawns external processes from a fixed working directory
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    working_dir: PathBuf,
}

impl ProcessRunner {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn command(&self, tool: &Tool, extra: &[&OsStr]) -> Command {
        let mut cmd = Command::new(&tool.program);
        cmd.args(tool.full_args(extra))
            .current_dir(&self.working_dir)
            .stdin(Stdio::null());
        cmd
    }

    /// Run `tool` capturing stdout and stderr
    pub async fn run(&self, tool: &Tool, args: &[&OsStr]) -> Result<RunResult> {
        let mut cmd = self.command(tool, args);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        tracing::debug!("Running {} {:?}", tool.name(), args);
        let start = Instant::now();
        let output = cmd.output().await.map_err(|e| spawn_error(tool, e))?;
        let duration = start.elapsed().as_secs_f64();

        check_output(tool, &output)?;
        tracing::debug!(
            "{} finished in {:.3}s ({} bytes of output)",
            tool.name(),
            duration,
            output.stdout.len()
        );

        Ok(RunResult {
            stdout: output.stdout,
            stderr: output.stderr,
            duration,
        })
    }

    /// Run `tool` with stdout and stderr discarded, timing spawn to exit
    pub async fn run_timed(&self, tool: &Tool, args: &[&OsStr]) -> Result<RunResult> {
        let mut cmd = self.command(tool, args);
        cmd.stdout(Stdio::null()).stderr(Stdio::null());

        let start = Instant::now();
        let status = cmd.status().await.map_err(|e| spawn_error(tool, e))?;
        let duration = start.elapsed().as_secs_f64();

        if !status.success() {
            return Err(Error::ProcessFailed {
                program: tool.name(),
                code: status.code(),
                stderr: String::new(),
            });
        }

        Ok(RunResult {
            stdout: Vec::new(),
            stderr: Vec::new(),
            duration,
        })
    }

    /// Run `tool` wrapped in `<time_utility> -f %e` and return the elapsed
    /// seconds it reports
    pub async fn run_with_time_utility(
        &self,
        time_utility: &Path,
        tool: &Tool,
        args: &[&OsStr],
    ) -> Result<f64> {
        let mut cmd = Command::new(time_utility);
        cmd.args(["-f", "%e"])
            .arg(&tool.program)
            .args(tool.full_args(args))
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let output = cmd.output().await.map_err(|e| Error::ProcessSpawn {
            program: time_utility.display().to_string(),
            error: e,
        })?;

        check_output(tool, &output)?;
        parse_elapsed(&String::from_utf8_lossy(&output.stderr))
    }
}

fn spawn_error(tool: &Tool, error: std::io::Error) -> Error {
    Error::ProcessSpawn {
        program: tool.name(),
        error,
    }
}

fn check_output(tool: &Tool, output: &Output) -> Result<()> {
    if output.status.success() {
        Ok(())
    } else {
        Err(Error::ProcessFailed {
            program: tool.name(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Parse the elapsed seconds printed by `time -f %e`
///
/// The program's own stderr shares the stream, so the value is taken from
/// the last non-empty line.
pub fn parse_elapsed(stderr: &str) -> Result<f64> {
    let line = stderr
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .ok_or_else(|| Error::TimeParse(stderr.to_string()))?;

    match line.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs),
        _ => Err(Error::TimeParse(line.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Tool {
        Tool {
            program: PathBuf::from("sh"),
            args: vec![OsString::from("-c"), OsString::from(script)],
        }
    }

    #[test]
    fn test_parse_elapsed() {
        assert_eq!(parse_elapsed("0.52\n").unwrap(), 0.52);
        assert_eq!(parse_elapsed("warming up\n12.07\n\n").unwrap(), 12.07);
    }

    #[test]
    fn test_parse_elapsed_rejects_garbage() {
        assert!(matches!(parse_elapsed(""), Err(Error::TimeParse(_))));
        assert!(matches!(
            parse_elapsed("Command terminated by signal 9\n"),
            Err(Error::TimeParse(_))
        ));
        assert!(matches!(parse_elapsed("-1.0"), Err(Error::TimeParse(_))));
    }

    #[test]
    fn test_bare_name_detection() {
        assert!(is_bare_name(Path::new("java")));
        assert!(!is_bare_name(Path::new("build/bin/obrc")));
        assert!(!is_bare_name(Path::new("./obrc")));
    }

    #[test]
    fn test_resolve_relative_path_against_root() {
        let root = tempfile::tempdir().unwrap();
        let tool = Tool::resolve(&ToolConfig::new("build/bin/obrc"), root.path()).unwrap();
        assert_eq!(tool.program, root.path().join("build/bin/obrc"));
        assert!(tool.args.is_empty());
    }

    #[test]
    fn test_resolve_missing_bare_name() {
        let root = tempfile::tempdir().unwrap();
        let err = Tool::resolve(
            &ToolConfig::new("definitely-not-an-installed-tool-4711"),
            root.path(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_stdout_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new(dir.path());
        let result = runner
            .run(&sh("printf 'Hamburg=12.0\\n'; printf warn >&2"), &[])
            .await
            .unwrap();
        assert_eq!(result.stdout, b"Hamburg=12.0\n");
        assert_eq!(result.stderr, b"warn");
        assert!(result.duration >= 0.0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_passes_leading_and_extra_args() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new(dir.path());
        let tool = sh("printf '%s|%s' \"$0\" \"$1\"");
        let result = runner
            .run(&tool, &[OsStr::new("first"), OsStr::new("second")])
            .await
            .unwrap();
        assert_eq!(result.stdout, b"first|second");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_uses_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let runner = ProcessRunner::new(dir.path());
        let result = runner.run(&sh("cat marker.txt"), &[]).await.unwrap();
        assert_eq!(result.stdout, b"here");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new(dir.path());
        let err = runner
            .run(&sh("echo broken >&2; exit 3"), &[])
            .await
            .unwrap_err();
        match err {
            Error::ProcessFailed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr.trim(), "broken");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = runner.run_timed(&sh("exit 1"), &[]).await.unwrap_err();
        assert!(err.is_process_failure());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_timed_discards_output() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new(dir.path());
        let result = runner.run_timed(&sh("echo ignored"), &[]).await.unwrap();
        assert!(result.stdout.is_empty());
        assert!(result.duration >= 0.0);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new(dir.path());
        let tool = Tool {
            program: dir.path().join("missing-binary"),
            args: Vec::new(),
        };
        let err = runner.run(&tool, &[]).await.unwrap_err();
        assert!(matches!(err, Error::ProcessSpawn { .. }));
    }
}
