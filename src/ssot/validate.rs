//! Fail-fast validation of a fixture dataset against its `DatasetRules`.
//!
//! Phases run in a fixed order across all files (locate and parse, array
//! shape, required keys, unique keys, composite keys, references) and the
//! first violation is returned. `locate_all_first` decides whether a missing
//! later file is reported before a malformed earlier one.

use super::rules::{DatasetRules, FileRule};
use super::{expect_array, file_name, locate_file, read_json, SsotRoot};
use crate::errors::FixtureError;
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub label: String,
    pub path: PathBuf,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationSummary {
    pub dataset: String,
    pub root: PathBuf,
    pub files: Vec<FileSummary>,
}

impl ValidationSummary {
    /// `events: 1, items: 1, pending: 0`
    pub fn counts_line(&self) -> String {
        self.files
            .iter()
            .map(|file| format!("{}: {}", file.label, file.count))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn count(&self, label: &str) -> Option<usize> {
        self.files
            .iter()
            .find(|file| file.label == label)
            .map(|file| file.count)
    }
}

struct LoadedFile<'r> {
    rule: &'r FileRule,
    path: PathBuf,
    records: Vec<Value>,
}

pub fn validate_dataset(
    rules: &DatasetRules,
    root: &SsotRoot,
) -> Result<ValidationSummary, FixtureError> {
    rules.check()?;
    let dir = root.dataset_dir(&rules.subdir);

    let mut paths = Vec::with_capacity(rules.files.len());
    let mut documents = Vec::with_capacity(rules.files.len());
    if rules.locate_all_first {
        for rule in &rules.files {
            paths.push(locate_file(&dir, &rule.candidates, &rule.description)?);
        }
        for path in &paths {
            documents.push(read_json(path)?);
        }
    } else {
        for rule in &rules.files {
            let path = locate_file(&dir, &rule.candidates, &rule.description)?;
            documents.push(read_json(&path)?);
            paths.push(path);
        }
    }

    let mut loaded = Vec::with_capacity(documents.len());
    for ((rule, path), document) in rules.files.iter().zip(paths).zip(documents) {
        let records = expect_array(document, &file_name(&path))?;
        loaded.push(LoadedFile { rule, path, records });
    }
    tracing::debug!(dataset = %rules.name, files = loaded.len(), "fixtures loaded");

    for file in &loaded {
        check_required_keys(file)?;
    }
    for file in &loaded {
        for key in &file.rule.unique_keys {
            check_unique(file, key)?;
        }
    }
    for file in &loaded {
        for keys in &file.rule.composite_keys {
            check_unique_composite(file, keys)?;
        }
    }
    for reference in &rules.references {
        let source = find_loaded(&loaded, &reference.from)?;
        let target = find_loaded(&loaded, &reference.to)?;
        let known: HashSet<String> = target
            .records
            .iter()
            .filter_map(|record| record.get(&reference.to_field))
            .map(identity)
            .collect();

        for record in &source.records {
            let value = record.get(&reference.field);
            let resolved = value.map(|value| known.contains(&identity(value)));
            if resolved != Some(true) {
                return Err(FixtureError::DanglingReference {
                    from: reference.from.clone(),
                    field: reference.field.clone(),
                    value: display(value),
                    to: reference.to.clone(),
                });
            }
        }
    }

    Ok(ValidationSummary {
        dataset: rules.name.clone(),
        root: root.path().to_path_buf(),
        files: loaded
            .into_iter()
            .map(|file| FileSummary {
                label: file.rule.label.clone(),
                path: file.path,
                count: file.records.len(),
            })
            .collect(),
    })
}

fn find_loaded<'a, 'r>(
    loaded: &'a [LoadedFile<'r>],
    label: &str,
) -> Result<&'a LoadedFile<'r>, FixtureError> {
    loaded
        .iter()
        .find(|file| file.rule.label == label)
        .ok_or_else(|| FixtureError::Rules(format!("unknown file '{label}'")))
}

fn check_required_keys(file: &LoadedFile<'_>) -> Result<(), FixtureError> {
    for (index, record) in file.records.iter().enumerate() {
        let context = format!("{}[{index}]", file.rule.label);
        let Some(object) = record.as_object() else {
            return Err(FixtureError::NotObject { context });
        };
        if let Some(key) = file
            .rule
            .required_keys
            .iter()
            .find(|key| !object.contains_key(key.as_str()))
        {
            return Err(FixtureError::MissingKey {
                key: key.clone(),
                context,
            });
        }
    }
    Ok(())
}

fn check_unique(file: &LoadedFile<'_>, key: &str) -> Result<(), FixtureError> {
    let name = &file.rule.label;
    let mut seen = HashSet::new();
    for record in &file.records {
        let value = match record.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) if text.is_empty() => None,
            Some(value) => Some(value),
        };
        let Some(value) = value else {
            return Err(FixtureError::EmptyKey {
                name: name.clone(),
                key: key.to_string(),
            });
        };
        if !seen.insert(identity(value)) {
            return Err(FixtureError::DuplicateKey {
                name: name.clone(),
                key: key.to_string(),
                value: display(Some(value)),
            });
        }
    }
    Ok(())
}

fn check_unique_composite(file: &LoadedFile<'_>, keys: &[String]) -> Result<(), FixtureError> {
    let mut seen = HashSet::new();
    for record in &file.records {
        let composite = keys
            .iter()
            .map(|key| display(record.get(key)))
            .collect::<Vec<_>>()
            .join("#");
        if !seen.insert(composite.clone()) {
            return Err(FixtureError::DuplicateCompositeKey {
                name: file.rule.label.clone(),
                keys: keys.join(","),
                value: composite,
            });
        }
    }
    Ok(())
}

/// Identity used for key comparison: the JSON text, so `"1"` and `1` differ.
fn identity(value: &Value) -> String {
    value.to_string()
}

fn display(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
