//! Declarative validation rules. A dataset is described entirely by data, so a
//! new dataset needs a new `DatasetRules` value (or rules file), not new code.

use crate::errors::FixtureError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRules {
    pub name: String,
    /// Prefix used in console output, e.g. `ssot:validate`.
    pub tag: String,
    /// Path segments below the source-of-truth root.
    pub subdir: Vec<String>,
    pub files: Vec<FileRule>,
    #[serde(default)]
    pub references: Vec<ReferenceRule>,
    /// Locate every file before parsing any. Otherwise each file is located
    /// and parsed in turn.
    #[serde(default)]
    pub locate_all_first: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRule {
    pub label: String,
    #[serde(default)]
    pub description: String,
    /// Tried in order; the first existing file wins.
    pub candidates: Vec<String>,
    #[serde(default)]
    pub required_keys: Vec<String>,
    #[serde(default)]
    pub unique_keys: Vec<String>,
    #[serde(default)]
    pub composite_keys: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRule {
    pub from: String,
    pub field: String,
    pub to: String,
    pub to_field: String,
}

impl DatasetRules {
    pub fn file(&self, label: &str) -> Option<&FileRule> {
        self.files.iter().find(|file| file.label == label)
    }

    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let raw = fs::read_to_string(path).map_err(|err| FixtureError::Unreadable {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let rules: Self = serde_yaml::from_str(&raw)
            .map_err(|err| FixtureError::Rules(format!("{}: {err}", path.display())))?;
        rules.check()?;
        Ok(rules)
    }

    /// Rejects rule sets that could never validate anything meaningful.
    pub fn check(&self) -> Result<(), FixtureError> {
        if self.files.is_empty() {
            return Err(FixtureError::Rules(format!(
                "dataset '{}' declares no files",
                self.name
            )));
        }

        let mut labels = HashSet::new();
        for file in &self.files {
            if !labels.insert(file.label.as_str()) {
                return Err(FixtureError::Rules(format!(
                    "duplicate file label '{}'",
                    file.label
                )));
            }
            if file.candidates.is_empty() {
                return Err(FixtureError::Rules(format!(
                    "file '{}' has no candidate names",
                    file.label
                )));
            }
            if let Some(pair) = file.composite_keys.iter().find(|keys| keys.len() < 2) {
                return Err(FixtureError::Rules(format!(
                    "file '{}' has a composite key with fewer than two fields: {pair:?}",
                    file.label
                )));
            }
        }

        for reference in &self.references {
            for label in [&reference.from, &reference.to] {
                if !labels.contains(label.as_str()) {
                    return Err(FixtureError::Rules(format!(
                        "reference {}.{} -> {}.{} names unknown file '{label}'",
                        reference.from, reference.field, reference.to, reference.to_field
                    )));
                }
            }
        }
        Ok(())
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn file_rule(label: &str, description: &str, candidates: &[&str], required: &[&str]) -> FileRule {
    FileRule {
        label: label.to_string(),
        description: description.to_string(),
        candidates: strings(candidates),
        required_keys: strings(required),
        unique_keys: Vec::new(),
        composite_keys: Vec::new(),
    }
}

static MUSIC_RULES: Lazy<DatasetRules> = Lazy::new(|| DatasetRules {
    name: "music".to_string(),
    tag: "ssot:validate".to_string(),
    subdir: strings(&["data", "music"]),
    files: vec![
        FileRule {
            unique_keys: strings(&["event_id"]),
            ..file_rule(
                "events",
                "music events",
                &["music_events.json"],
                &["event_id", "event_date", "planned_count", "decided_count", "status", "note"],
            )
        },
        FileRule {
            unique_keys: strings(&["timeline_index"]),
            ..file_rule(
                "items",
                "music crown items",
                &["music_crown_items.json"],
                &["timeline_index", "event_id", "crown_date", "title", "card_received_date", "note"],
            )
        },
        FileRule {
            unique_keys: strings(&["temp_code"]),
            ..file_rule(
                "pending",
                "music pending list",
                &["music_pending_list.json"],
                &["temp_code", "title", "reason"],
            )
        },
    ],
    references: vec![ReferenceRule {
        from: "items".to_string(),
        field: "event_id".to_string(),
        to: "events".to_string(),
        to_field: "event_id".to_string(),
    }],
    locate_all_first: false,
});

static FINANCE_RULES: Lazy<DatasetRules> = Lazy::new(|| DatasetRules {
    name: "finance".to_string(),
    tag: "finance:validate".to_string(),
    subdir: strings(&["data", "finance"]),
    files: vec![
        FileRule {
            unique_keys: strings(&["slip_id"]),
            ..file_rule(
                "slips",
                "payroll slips",
                &["finance_payroll_slips.json", "payroll_slips.json"],
                &["slip_id", "pay_date", "gross", "deductions", "net", "source_sheet"],
            )
        },
        FileRule {
            composite_keys: vec![strings(&["slip_id", "line_no"])],
            ..file_rule(
                "items",
                "payroll items",
                &["finance_payroll_items.json", "payroll_items.json"],
                &["slip_id", "line_no", "item_name", "amount"],
            )
        },
        file_rule(
            "withholding",
            "withholding certificates",
            &["finance_withholding_certificates.json", "withholding_certificates.json"],
            &["year", "issuer", "income_type", "taxable_income", "tax_withheld", "source_sheet"],
        ),
    ],
    references: vec![ReferenceRule {
        from: "items".to_string(),
        field: "slip_id".to_string(),
        to: "slips".to_string(),
        to_field: "slip_id".to_string(),
    }],
    locate_all_first: true,
});

pub fn music() -> &'static DatasetRules {
    &MUSIC_RULES
}

pub fn finance() -> &'static DatasetRules {
    &FINANCE_RULES
}

pub fn builtin(name: &str) -> Option<&'static DatasetRules> {
    match name {
        "music" => Some(music()),
        "finance" => Some(finance()),
        _ => None,
    }
}
