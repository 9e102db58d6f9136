//! `gcm check` command implementation.
//!
//! Validates the config file and cross-checks a fixture against it:
//! - groups without content relations (the filter will not restrict them)
//! - rows whose subtype no relation declares
//! - relations targeting the content type without a bundle

use anyhow::{Result, bail};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use gcm_core::{FilterConfig, Fixture};

use super::{load_config, load_fixture, resolve_fixture_path};

/// Severity level for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single check finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFinding {
    pub severity: Severity,
    pub message: String,
}

impl CheckFinding {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

pub fn run(config_path: Option<&Path>, fixture_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    println!("[INFO] config ok");

    let Some(fixture_path) = resolve_fixture_path(fixture_path, &config) else {
        return Ok(());
    };
    let fixture = load_fixture(&fixture_path)?;

    let findings = check_fixture(&config.filter, &fixture);
    for finding in &findings {
        println!("[{}] {}", finding.severity, finding.message);
    }

    let errors = findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .count();
    if errors > 0 {
        bail!("{} error(s) in {}", errors, fixture_path.display());
    }
    Ok(())
}

pub fn check_fixture(config: &FilterConfig, fixture: &Fixture) -> Vec<CheckFinding> {
    let mut findings = Vec::new();

    let mut declared: BTreeSet<&str> = BTreeSet::new();
    let all_relations = fixture
        .relations
        .iter()
        .chain(fixture.groups.iter().flat_map(|g| g.relations.iter()));
    for relation in all_relations {
        if relation.entity_type_id != config.content_entity_type {
            continue;
        }
        match &relation.entity_bundle {
            Some(bundle) => {
                declared.insert(bundle.as_str());
            }
            None => findings.push(CheckFinding::new(
                Severity::Warning,
                format!(
                    "relation '{}' targets '{}' without a bundle and is ignored",
                    relation.plugin_id, relation.entity_type_id
                ),
            )),
        }
    }

    let has_global_content = fixture.relations.iter().any(|r| {
        r.entity_type_id == config.content_entity_type && r.entity_bundle.is_some()
    });
    for group in &fixture.groups {
        let has_own_content = group.relations.iter().any(|r| {
            r.entity_type_id == config.content_entity_type && r.entity_bundle.is_some()
        });
        if !has_global_content && !has_own_content {
            findings.push(CheckFinding::new(
                Severity::Info,
                format!("group {} has no content subtypes; its views are not filtered", group.id),
            ));
        }
    }

    let mut seen_groups = BTreeSet::new();
    for group in &fixture.groups {
        if !seen_groups.insert(group.id) {
            findings.push(CheckFinding::new(
                Severity::Error,
                format!("group {} is defined more than once", group.id),
            ));
        }
    }

    for row in &fixture.rows {
        if !declared.contains(row.subtype.as_str()) {
            findings.push(CheckFinding::new(
                Severity::Warning,
                format!(
                    "row {} has subtype '{}' which no relation declares",
                    row.id, row.subtype
                ),
            ));
        }
    }

    findings
}
