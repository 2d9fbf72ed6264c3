//! Source-of-truth fixture access: root resolution, candidate-file lookup and
//! JSON loading shared by the validator and the seeder.

pub mod fixtures;
pub mod rules;
pub mod validate;

use crate::errors::FixtureError;
use crate::models::SsotStatus;
use serde_json::Value;
use std::fs;
use std::path::{Component, Path, PathBuf};

const STATUS_ENTRY_LIMIT: usize = 20;

/// Resolved, existing source-of-truth root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsotRoot {
    path: PathBuf,
}

impl SsotRoot {
    /// Resolves `raw` against `base` and requires the result to be a directory.
    pub fn resolve(base: &Path, raw: &str) -> Result<Self, FixtureError> {
        let path = resolve_path(base, raw);
        if !path.exists() {
            return Err(FixtureError::RootMissing(path));
        }
        if !path.is_dir() {
            return Err(FixtureError::RootNotDirectory(path));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dataset_dir<S: AsRef<str>>(&self, subdir: &[S]) -> PathBuf {
        subdir
            .iter()
            .fold(self.path.clone(), |dir, segment| dir.join(segment.as_ref()))
    }
}

/// Lexical equivalent of joining `raw` onto `base` and collapsing `.`/`..`.
pub fn resolve_path(base: &Path, raw: &str) -> PathBuf {
    let joined = base.join(raw);
    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    resolved.push(component.as_os_str());
                }
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    resolved
}

/// Returns the first candidate that exists inside `dir`.
pub fn locate_file<S: AsRef<str>>(
    dir: &Path,
    candidates: &[S],
    description: &str,
) -> Result<PathBuf, FixtureError> {
    if let Some(found) = candidates
        .iter()
        .map(|name| dir.join(name.as_ref()))
        .find(|path| path.is_file())
    {
        return Ok(found);
    }

    match candidates {
        [only] => Err(FixtureError::MissingFile(dir.join(only.as_ref()))),
        _ => Err(FixtureError::NoCandidate {
            description: description.to_string(),
            dir: dir.to_path_buf(),
        }),
    }
}

pub fn read_json(path: &Path) -> Result<Value, FixtureError> {
    if !path.exists() {
        return Err(FixtureError::MissingFile(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path).map_err(|err| FixtureError::Unreadable {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|err| FixtureError::InvalidJson {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

pub fn expect_array(value: Value, name: &str) -> Result<Vec<Value>, FixtureError> {
    match value {
        Value::Array(records) => Ok(records),
        _ => Err(FixtureError::NotArray {
            name: name.to_string(),
        }),
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Reads a file and requires a top-level JSON array.
pub fn read_records(path: &Path) -> Result<Vec<Value>, FixtureError> {
    expect_array(read_json(path)?, &file_name(path))
}

/// Shows `path` relative to `base` when it lives below it.
pub fn display_relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .map(|relative| relative.display().to_string())
        .unwrap_or_else(|_| path.display().to_string())
}

/// Reports the root without failing, for status pages.
pub fn ssot_status(base: &Path, raw: &str) -> SsotStatus {
    let root = resolve_path(base, raw);
    let exists = root.exists();
    let is_dir = exists && root.is_dir();

    let mut entries = Vec::new();
    if is_dir {
        if let Ok(listing) = fs::read_dir(&root) {
            entries = listing
                .filter_map(Result::ok)
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect();
            entries.sort();
            entries.truncate(STATUS_ENTRY_LIMIT);
        }
    }

    SsotStatus {
        root: root.display().to_string(),
        exists,
        is_dir,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::{locate_file, read_records, resolve_path, ssot_status, SsotRoot};
    use crate::errors::FixtureError;
    use std::fs;
    use std::path::{Path, PathBuf};

    #[test]
    fn resolve_path_collapses_parent_segments() {
        let resolved = resolve_path(Path::new("/srv/app/apps/web"), "../../ssot");
        assert_eq!(resolved, PathBuf::from("/srv/app/ssot"));

        let absolute = resolve_path(Path::new("/srv/app"), "/data/./ssot");
        assert_eq!(absolute, PathBuf::from("/data/ssot"));
    }

    #[test]
    fn root_must_exist_and_be_a_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = SsotRoot::resolve(dir.path(), "nope").expect_err("missing root");
        assert!(matches!(missing, FixtureError::RootMissing(_)));

        fs::write(dir.path().join("file.txt"), "x").expect("write");
        let not_dir = SsotRoot::resolve(dir.path(), "file.txt").expect_err("file root");
        assert!(not_dir.to_string().starts_with("SSOT_PATH is not a directory"));

        let root = SsotRoot::resolve(dir.path(), ".").expect("root");
        assert_eq!(
            root.dataset_dir(&["data", "music"]),
            dir.path().join("data").join("music")
        );
    }

    #[test]
    fn first_existing_candidate_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("payroll_slips.json"), "[]").expect("write");
        let found = locate_file(
            dir.path(),
            &["finance_payroll_slips.json", "payroll_slips.json"],
            "payroll slips",
        )
        .expect("fallback candidate");
        assert!(found.ends_with("payroll_slips.json"));

        fs::write(dir.path().join("finance_payroll_slips.json"), "[]").expect("write");
        let found = locate_file(
            dir.path(),
            &["finance_payroll_slips.json", "payroll_slips.json"],
            "payroll slips",
        )
        .expect("primary candidate");
        assert!(found.ends_with("finance_payroll_slips.json"));
    }

    #[test]
    fn missing_candidates_name_the_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = locate_file(dir.path(), &["a.json", "b.json"], "payroll items")
            .expect_err("nothing exists");
        assert!(error.to_string().starts_with("Missing payroll items json in"));

        let single = locate_file(dir.path(), &["music_events.json"], "events")
            .expect_err("nothing exists");
        assert!(single.to_string().contains("Missing file:"));
        assert!(single.to_string().ends_with("music_events.json"));
    }

    #[test]
    fn read_records_reports_parse_and_shape_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let broken = dir.path().join("broken.json");
        fs::write(&broken, "[{").expect("write");
        let error = read_records(&broken).expect_err("invalid json");
        assert!(error.to_string().starts_with("Invalid JSON:"));
        assert!(error.to_string().contains("broken.json"));

        let object = dir.path().join("object.json");
        fs::write(&object, "{}").expect("write");
        assert_eq!(
            read_records(&object).expect_err("object").to_string(),
            "object.json must be an array"
        );
    }

    #[test]
    fn status_lists_sorted_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("data")).expect("mkdir");
        fs::write(dir.path().join("README.md"), "").expect("write");

        let status = ssot_status(dir.path(), ".");
        assert!(status.exists);
        assert!(status.is_dir);
        assert_eq!(status.entries, vec!["README.md".to_string(), "data".to_string()]);

        let missing = ssot_status(dir.path(), "absent");
        assert!(!missing.exists);
        assert!(missing.entries.is_empty());
    }
}
