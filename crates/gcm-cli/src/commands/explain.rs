//! `gcm explain` command implementation.
//!
//! Runs the visibility filter against a fixture for one user and one set of
//! view arguments, then prints the where expression, its bound values and,
//! on request, the rewritten SQL and the rows the user can see.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use gcm_core::{ArgumentBinding, ContentRow, UserId, ViewArguments};
use gcm_filter::{
    FilterOutcome, ParamValue, Params, RowValues, StatementInjector, UnpublishedVisibilityFilter,
    WhereGroups,
};

use super::{load_config, load_fixture, resolve_fixture_path};

#[derive(Debug, Clone)]
pub struct ExplainOptions {
    pub fixture: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub user: u64,
    pub args: Vec<String>,
    /// Plugin id and position of the group argument binding; `None` binds nothing.
    pub gid: Option<(String, usize)>,
    pub sql: Option<String>,
    pub rows: bool,
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct ExplainReport {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injected: Option<InjectedSql>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_rows: Option<Vec<u64>>,
}

#[derive(Debug, Serialize)]
pub struct InjectedSql {
    pub sql: String,
    pub parameters: Vec<ParamValue>,
}

pub fn run(options: &ExplainOptions) -> Result<()> {
    let report = explain(options)?;
    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

pub fn explain(options: &ExplainOptions) -> Result<ExplainReport> {
    let config = load_config(options.config.as_deref())?;
    let fixture_path = resolve_fixture_path(options.fixture.as_deref(), &config)
        .context("no fixture given: pass --fixture or set fixture_file in the config")?;
    let fixture = load_fixture(&fixture_path)?;
    tracing::debug!(
        fixture = %fixture_path.display(),
        groups = fixture.groups.len(),
        rows = fixture.rows.len(),
        "fixture loaded"
    );

    let filter = UnpublishedVisibilityFilter::new(
        config.filter.clone(),
        Arc::new(fixture.group_storage()),
        Arc::new(fixture.relation_registry()),
    );

    let mut arguments = ViewArguments::new().with_args(options.args.iter().cloned());
    if let Some((plugin_id, position)) = &options.gid {
        arguments = arguments.with_binding(
            &config.filter.argument_name,
            ArgumentBinding::new(plugin_id, *position),
        );
    }
    let user = fixture.user(UserId(options.user));

    let mut sink = WhereGroups::new();
    let outcome = filter.apply(&arguments, &user, &mut sink);
    let combined = sink.render()?;

    let (label, reason) = match &outcome {
        FilterOutcome::BlockAll(reason) => ("block_all", Some(reason.to_string())),
        FilterOutcome::NoOp => ("no_op", None),
        FilterOutcome::Restrict(_) => ("restrict", None),
    };

    let injected = match (&options.sql, &combined) {
        (Some(sql), Some(expression)) => {
            let result = StatementInjector::new()
                .inject(sql, expression)
                .with_context(|| format!("failed to inject into: {}", sql))?;
            Some(InjectedSql {
                sql: result.rewritten_sql,
                parameters: result.parameters,
            })
        }
        (Some(sql), None) => Some(InjectedSql {
            sql: sql.clone(),
            parameters: Vec::new(),
        }),
        (None, _) => None,
    };

    let visible_rows: Option<Vec<u64>> = options.rows.then(|| {
        fixture
            .rows
            .iter()
            .filter(|row| {
                combined
                    .as_ref()
                    .is_none_or(|expression| expression.matches(&row_values(&filter, row)))
            })
            .map(|row| row.id)
            .collect()
    });

    Ok(ExplainReport {
        outcome: label,
        reason,
        expression: combined.as_ref().map(|e| e.template()),
        params: combined.map(|e| e.params),
        injected,
        visible_rows,
    })
}

fn row_values(filter: &UnpublishedVisibilityFilter, row: &ContentRow) -> RowValues {
    RowValues::new()
        .with(filter.owner_column(), row.owner.0 as i64)
        .with(filter.subtype_column(), filter.config().subtype_tag(&row.subtype))
}

fn print_report(report: &ExplainReport) {
    match &report.reason {
        Some(reason) => println!("outcome: {} ({})", report.outcome, reason),
        None => println!("outcome: {}", report.outcome),
    }

    if let Some(expression) = &report.expression {
        println!("expression:\n  {}", expression);
    }

    if let Some(params) = &report.params {
        if !params.is_empty() {
            println!("params:");
            for (name, value) in params.iter() {
                println!("  :{} = {}", name, value);
            }
        }
    }

    if let Some(injected) = &report.injected {
        println!("sql:\n  {}", injected.sql);
        for (i, value) in injected.parameters.iter().enumerate() {
            println!("  ${} = {}", i + 1, value);
        }
    }

    if let Some(rows) = &report.visible_rows {
        let ids: Vec<String> = rows.iter().map(u64::to_string).collect();
        println!("visible rows: [{}]", ids.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const FIXTURE: &str = r#"
groups:
  - id: 5
    members:
      - user: 42
        permissions:
          - view own unpublished group_node:article entity
          - view latest version
    relations:
      - { plugin_id: "group_node:article", entity_type_id: node, entity_bundle: article }
      - { plugin_id: "group_node:page", entity_type_id: node, entity_bundle: page }
  - id: 7
users:
  - id: 42
  - id: 1
    permissions: [bypass node access]
rows:
  - { id: 1, owner: 42, subtype: article }
  - { id: 2, owner: 7, subtype: article }
  - { id: 3, owner: 42, subtype: page }
"#;

    fn options(dir: &tempfile::TempDir, user: u64, args: &[&str]) -> ExplainOptions {
        let path = dir.path().join("fixture.yaml");
        fs::write(&path, FIXTURE).unwrap();
        ExplainOptions {
            fixture: Some(path),
            config: None,
            user,
            args: args.iter().map(|a| a.to_string()).collect(),
            gid: Some(("group_id".to_string(), 0)),
            sql: None,
            rows: true,
            json: false,
        }
    }

    #[test]
    fn test_own_article_rows() {
        let dir = tempfile::tempdir().unwrap();
        let report = explain(&options(&dir, 42, &["5"])).unwrap();

        assert_eq!(report.outcome, "restrict");
        assert_eq!(report.visible_rows, Some(vec![1]));
        let params = report.params.unwrap();
        assert_eq!(params.get("own_unpublished_article"), Some(&ParamValue::Bool(true)));
        assert_eq!(params.get("own_unpublished_page"), Some(&ParamValue::Bool(false)));
    }

    #[test]
    fn test_bypass_user_sees_all_rows() {
        let dir = tempfile::tempdir().unwrap();
        let report = explain(&options(&dir, 1, &["5"])).unwrap();
        assert_eq!(report.visible_rows, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_unknown_group_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let report = explain(&options(&dir, 42, &["9"])).unwrap();

        assert_eq!(report.outcome, "block_all");
        assert_eq!(report.expression.as_deref(), Some("1 != 1"));
        assert_eq!(report.visible_rows, Some(vec![]));
    }

    #[test]
    fn test_group_without_subtypes_is_unfiltered() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(&dir, 42, &["7"]);
        opts.sql = Some("SELECT * FROM node_field_revision".to_string());
        let report = explain(&opts).unwrap();

        assert_eq!(report.outcome, "no_op");
        assert!(report.expression.is_none());
        assert_eq!(report.visible_rows, Some(vec![1, 2, 3]));
        let injected = report.injected.unwrap();
        assert_eq!(injected.sql, "SELECT * FROM node_field_revision");
        assert!(injected.parameters.is_empty());
    }

    #[test]
    fn test_missing_binding_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(&dir, 42, &["5"]);
        opts.gid = None;
        let report = explain(&opts).unwrap();

        assert_eq!(report.outcome, "block_all");
        assert!(report.reason.unwrap().contains("gid"));
    }

    #[test]
    fn test_missing_fixture_is_an_error() {
        let opts = ExplainOptions {
            fixture: None,
            config: None,
            user: 0,
            args: Vec::new(),
            gid: None,
            sql: None,
            rows: false,
            json: false,
        };
        assert!(explain(&opts).is_err());
    }
}
