//! Fixture store
//!
//! Fixtures are keyed by suffix only. A file that exists is reused as-is;
//! generation happens only for missing files, and existing files are never
//! truncated or deleted.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::common::config::ToolConfig;
use crate::common::{Error, Result};

use super::case::TestCase;
use super::process::{ProcessRunner, Tool};

/// Which fixture files an `ensure_fixture` call had to create
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FixtureStatus {
    pub generated_measurements: bool,
    pub generated_expected: bool,
}

/// Paths of a ready-to-use fixture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub measurements_path: PathBuf,
    pub expected_path: PathBuf,
    pub status: FixtureStatus,
}

/// Creates and caches measurements and expected-output files
///
/// The generator and reference tools are resolved only when a file is
/// missing, so a fully cached data directory needs neither installed.
pub struct FixtureStore<'a> {
    runner: &'a ProcessRunner,
    data_dir: PathBuf,
    generator: ToolConfig,
    reference: ToolConfig,
}

impl<'a> FixtureStore<'a> {
    pub fn new(
        runner: &'a ProcessRunner,
        data_dir: impl Into<PathBuf>,
        generator: ToolConfig,
        reference: ToolConfig,
    ) -> Self {
        Self {
            runner,
            data_dir: data_dir.into(),
            generator,
            reference,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Make sure both fixture files of `case` exist, generating what is missing
    pub async fn ensure_fixture(&self, case: &TestCase) -> Result<Fixture> {
        std::fs::create_dir_all(&self.data_dir)?;

        let mut status = FixtureStatus::default();

        if exists_as_file(&case.measurements_path)? {
            tracing::debug!("Reusing {}", case.measurements_path.display());
        } else {
            tracing::info!(
                "{} does not exist. Generating",
                case.measurements_path.display()
            );
            self.generate_measurements(case).await?;
            status.generated_measurements = true;
        }

        if exists_as_file(&case.expected_path)? {
            tracing::debug!("Reusing {}", case.expected_path.display());
        } else {
            tracing::info!("{} does not exist. Generating", case.expected_path.display());
            self.generate_expected(case).await?;
            status.generated_expected = true;
        }

        Ok(Fixture {
            measurements_path: case.measurements_path.clone(),
            expected_path: case.expected_path.clone(),
            status,
        })
    }

    async fn generate_measurements(&self, case: &TestCase) -> Result<()> {
        let wrap = |e| Error::fixture_generation(&case.suffix, "measurements", e);
        let generator = Tool::resolve(&self.generator, self.runner.working_dir()).map_err(wrap)?;
        let rows = case.rows.to_string();
        let args = [OsStr::new(&rows), case.measurements_path.as_os_str()];

        self.runner.run(&generator, &args).await.map_err(wrap)?;

        if !case.measurements_path.is_file() {
            return Err(Error::fixture_generation(
                &case.suffix,
                "measurements",
                Error::Internal(format!(
                    "'{}' exited successfully but did not create {}",
                    generator.name(),
                    case.measurements_path.display()
                )),
            ));
        }
        Ok(())
    }

    async fn generate_expected(&self, case: &TestCase) -> Result<()> {
        let wrap = |e| Error::fixture_generation(&case.suffix, "expected output", e);
        let reference = Tool::resolve(&self.reference, self.runner.working_dir()).map_err(wrap)?;
        let result = self
            .runner
            .run(&reference, &[case.measurements_path.as_os_str()])
            .await
            .map_err(wrap)?;

        // Write next to the target and rename, so an interrupted write never
        // leaves a file that later runs would trust.
        let partial = case.expected_path.with_extension("txt.partial");
        std::fs::write(&partial, &result.stdout).map_err(|e| Error::file_write(&partial, e))?;
        std::fs::rename(&partial, &case.expected_path)
            .map_err(|e| Error::file_write(&case.expected_path, e))?;
        Ok(())
    }
}

fn exists_as_file(path: &Path) -> Result<bool> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(true),
        Ok(_) => Err(Error::FixtureNotAFile(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::file_read(path, e)),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::common::config::ExpectedPrefix;
    use tempfile::tempdir;

    fn sh(script: &str) -> ToolConfig {
        ToolConfig::new("sh").with_args(["-c", script])
    }

    /// Writes "<rows> rows" into the destination and counts invocations
    fn counting_generator(counter: &Path) -> ToolConfig {
        sh(&format!(
            "echo run >> '{}'; printf '%s rows\\n' \"$0\" > \"$1\"",
            counter.display()
        ))
    }

    /// Echoes the measurements file back, prefixed
    fn reference() -> ToolConfig {
        sh("printf 'ref:'; cat \"$0\"")
    }

    fn invocations(counter: &Path) -> usize {
        std::fs::read_to_string(counter)
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_generates_missing_fixture() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let counter = dir.path().join("generator.count");
        let runner = ProcessRunner::new(dir.path());
        let store = FixtureStore::new(&runner, &data_dir, counting_generator(&counter), reference());
        let case = TestCase::new(&data_dir, "10k", 10_000, ExpectedPrefix::Expected);

        let fixture = store.ensure_fixture(&case).await.unwrap();

        assert_eq!(fixture.measurements_path, data_dir.join("measurements_10k.txt"));
        assert_eq!(fixture.expected_path, data_dir.join("expected_10k.txt"));
        assert!(fixture.status.generated_measurements);
        assert!(fixture.status.generated_expected);
        assert_eq!(
            std::fs::read_to_string(&fixture.measurements_path).unwrap(),
            "10000 rows\n"
        );
        assert_eq!(
            std::fs::read_to_string(&fixture.expected_path).unwrap(),
            "ref:10000 rows\n"
        );
        assert_eq!(invocations(&counter), 1);
    }

    #[tokio::test]
    async fn test_second_call_reuses_files() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let counter = dir.path().join("generator.count");
        let runner = ProcessRunner::new(dir.path());
        let store = FixtureStore::new(&runner, &data_dir, counting_generator(&counter), reference());
        let case = TestCase::new(&data_dir, "10k", 10_000, ExpectedPrefix::Expected);

        store.ensure_fixture(&case).await.unwrap();
        let modified = std::fs::metadata(&case.measurements_path)
            .unwrap()
            .modified()
            .unwrap();
        let expected_before = std::fs::read(&case.expected_path).unwrap();

        let fixture = store.ensure_fixture(&case).await.unwrap();

        assert_eq!(fixture.status, FixtureStatus::default());
        assert_eq!(invocations(&counter), 1);
        assert_eq!(
            std::fs::metadata(&case.measurements_path)
                .unwrap()
                .modified()
                .unwrap(),
            modified
        );
        assert_eq!(std::fs::read(&case.expected_path).unwrap(), expected_before);
    }

    #[tokio::test]
    async fn test_only_missing_expected_is_regenerated() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        let counter = dir.path().join("generator.count");
        let runner = ProcessRunner::new(dir.path());
        let store = FixtureStore::new(&runner, &data_dir, counting_generator(&counter), reference());
        let case = TestCase::new(&data_dir, "10k", 10_000, ExpectedPrefix::Baseline);
        std::fs::write(&case.measurements_path, "hand written\n").unwrap();

        let fixture = store.ensure_fixture(&case).await.unwrap();

        assert!(!fixture.status.generated_measurements);
        assert!(fixture.status.generated_expected);
        assert_eq!(invocations(&counter), 0);
        assert_eq!(
            std::fs::read_to_string(data_dir.join("baseline_10k.txt")).unwrap(),
            "ref:hand written\n"
        );
    }

    #[tokio::test]
    async fn test_generator_failure_is_fatal() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let runner = ProcessRunner::new(dir.path());
        let store = FixtureStore::new(&runner, &data_dir, sh("exit 1"), reference());
        let case = TestCase::new(&data_dir, "10k", 10_000, ExpectedPrefix::Expected);

        let err = store.ensure_fixture(&case).await.unwrap_err();

        assert!(matches!(err, Error::FixtureGeneration { what: "measurements", .. }));
        assert!(err.is_process_failure());
        assert!(!case.expected_path.exists());
    }

    #[tokio::test]
    async fn test_reference_failure_leaves_no_expected_file() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let counter = dir.path().join("generator.count");
        let runner = ProcessRunner::new(dir.path());
        let store = FixtureStore::new(
            &runner,
            &data_dir,
            counting_generator(&counter),
            sh("printf partial; exit 2"),
        );
        let case = TestCase::new(&data_dir, "10k", 10_000, ExpectedPrefix::Expected);

        let err = store.ensure_fixture(&case).await.unwrap_err();

        assert!(matches!(
            err,
            Error::FixtureGeneration {
                what: "expected output",
                ..
            }
        ));
        assert!(case.measurements_path.exists());
        assert!(!case.expected_path.exists());
    }

    #[tokio::test]
    async fn test_generator_that_writes_nothing() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let runner = ProcessRunner::new(dir.path());
        let store = FixtureStore::new(&runner, &data_dir, sh("true"), reference());
        let case = TestCase::new(&data_dir, "10k", 10_000, ExpectedPrefix::Expected);

        let err = store.ensure_fixture(&case).await.unwrap_err();
        assert!(matches!(err, Error::FixtureGeneration { .. }));
        assert!(!err.is_process_failure());
    }

    #[tokio::test]
    async fn test_directory_in_place_of_fixture() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let case = TestCase::new(&data_dir, "10k", 10_000, ExpectedPrefix::Expected);
        std::fs::create_dir_all(&case.measurements_path).unwrap();
        let runner = ProcessRunner::new(dir.path());
        let store = FixtureStore::new(&runner, &data_dir, sh("true"), reference());

        let err = store.ensure_fixture(&case).await.unwrap_err();
        assert!(matches!(err, Error::FixtureNotAFile(_)));
    }
}
