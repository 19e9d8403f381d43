//! Correctness validation
//!
//! The output of the program under test must equal the reference output byte
//! for byte. No whitespace, line ending or ordering normalization happens.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::common::{Error, Result};

use super::case::TestCase;

/// Outcome of comparing one run against the reference output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Match,
    Mismatch {
        expected_path: PathBuf,
        actual_path: PathBuf,
    },
}

impl Verdict {
    pub fn is_match(&self) -> bool {
        matches!(self, Verdict::Match)
    }
}

/// Persist `actual` as the case's actual-output file, then compare it with
/// the expected file
///
/// The actual file is written before comparing so it can be diffed after a
/// failed run.
pub fn validate(case: &TestCase, actual: &[u8]) -> Result<Verdict> {
    std::fs::write(&case.actual_path, actual).map_err(|e| Error::file_write(&case.actual_path, e))?;

    let expected = read_bytes(&case.expected_path)?;
    if expected == actual {
        Ok(Verdict::Match)
    } else {
        tracing::debug!(
            "Output mismatch for {}: expected {} bytes, got {}",
            case.suffix,
            expected.len(),
            actual.len()
        );
        Ok(Verdict::Mismatch {
            expected_path: case.expected_path.clone(),
            actual_path: case.actual_path.clone(),
        })
    }
}

/// Whether two files have identical contents
pub fn compare_files(a: &Path, b: &Path) -> Result<bool> {
    Ok(read_bytes(a)? == read_bytes(b)?)
}

/// Shell command an operator can run to inspect a mismatch
pub fn diff_hint(expected: &Path, actual: &Path) -> String {
    format!("diff {} {}", expected.display(), actual.display())
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| Error::file_read(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::ExpectedPrefix;
    use tempfile::tempdir;

    fn case_in(dir: &Path) -> TestCase {
        TestCase::new(dir, "10k", 10_000, ExpectedPrefix::Expected)
    }

    #[test]
    fn test_exact_match() {
        let dir = tempdir().unwrap();
        let case = case_in(dir.path());
        std::fs::write(&case.expected_path, b"{Abha=-23.0/18.0/59.2}\n").unwrap();

        let verdict = validate(&case, b"{Abha=-23.0/18.0/59.2}\n").unwrap();
        assert!(verdict.is_match());
        assert_eq!(
            std::fs::read(&case.actual_path).unwrap(),
            b"{Abha=-23.0/18.0/59.2}\n"
        );
    }

    #[test]
    fn test_single_byte_difference_is_a_mismatch() {
        let dir = tempdir().unwrap();
        let case = case_in(dir.path());
        std::fs::write(&case.expected_path, b"{Abha=-23.0/18.0/59.2}\n").unwrap();

        let verdict = validate(&case, b"{Abha=-23.0/18.1/59.2}\n").unwrap();
        assert_eq!(
            verdict,
            Verdict::Mismatch {
                expected_path: case.expected_path.clone(),
                actual_path: case.actual_path.clone(),
            }
        );
        assert_eq!(
            std::fs::read(&case.actual_path).unwrap(),
            b"{Abha=-23.0/18.1/59.2}\n"
        );
    }

    #[test]
    fn test_no_line_ending_normalization() {
        let dir = tempdir().unwrap();
        let case = case_in(dir.path());
        std::fs::write(&case.expected_path, b"a=1.0/1.0/1.0\n").unwrap();

        assert!(!validate(&case, b"a=1.0/1.0/1.0\r\n").unwrap().is_match());
        assert!(!validate(&case, b"a=1.0/1.0/1.0").unwrap().is_match());
    }

    #[test]
    fn test_actual_file_overwritten_each_run() {
        let dir = tempdir().unwrap();
        let case = case_in(dir.path());
        std::fs::write(&case.expected_path, b"ok\n").unwrap();

        validate(&case, b"a much longer wrong output\n").unwrap();
        validate(&case, b"ok\n").unwrap();
        assert_eq!(std::fs::read(&case.actual_path).unwrap(), b"ok\n");
    }

    #[test]
    fn test_missing_expected_file() {
        let dir = tempdir().unwrap();
        let case = case_in(dir.path());
        let err = validate(&case, b"anything").unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
        // The actual output is still kept for inspection
        assert!(case.actual_path.exists());
    }

    #[test]
    fn test_compare_files() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, b"same").unwrap();
        std::fs::write(&b, b"same").unwrap();
        assert!(compare_files(&a, &b).unwrap());
        std::fs::write(&b, b"diff").unwrap();
        assert!(!compare_files(&a, &b).unwrap());
    }

    #[test]
    fn test_diff_hint() {
        let hint = diff_hint(Path::new("data/expected_10k.txt"), Path::new("data/actual_10k.txt"));
        assert_eq!(hint, "diff data/expected_10k.txt data/actual_10k.txt");
    }
}
