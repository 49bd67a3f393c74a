//! Non-fatal data-quality findings.
//!
//! Every issue here was resolved with a default, such as a dropped component
//! or a unit assumed canonical, and never blocks the parse.

use crate::classifier::RowRole;
use crate::model::ProjectModel;
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityIssue {
    UnknownUnit {
        project_id: String,
        component_id: Option<String>,
        role: RowRole,
        unit: String,
    },
    AmbiguousCurrencyUnit {
        project_id: String,
        component_id: Option<String>,
        unit: String,
    },
    UnparseableRate {
        project_id: String,
        component_id: Option<String>,
        raw: String,
    },
    NonPositiveRate {
        project_id: String,
        component_id: Option<String>,
        value: f64,
    },
    NonNumericCell {
        project_id: String,
        component_id: Option<String>,
        role: RowRole,
        column: String,
        raw: String,
    },
    DroppedComponent {
        project_id: String,
        component_id: String,
        missing: RowRole,
    },
    DuplicateRows {
        project_id: String,
        component_id: Option<String>,
        role: RowRole,
        ignored: usize,
    },
    IgnoredExpansionRows {
        project_id: String,
        rows: usize,
    },
    SeriesLengthMismatch {
        project_id: String,
        series: String,
        expected: usize,
        actual: usize,
    },
    NonFiniteValue {
        project_id: String,
        series: String,
        period: usize,
    },
}

fn scope(project_id: &str, component_id: &Option<String>) -> String {
    match component_id {
        Some(c) => format!("project {} / component {}", project_id, c),
        None => format!("project {}", project_id),
    }
}

impl fmt::Display for DataQualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQualityIssue::UnknownUnit {
                project_id,
                component_id,
                role,
                unit,
            } => write!(
                f,
                "{}: unknown unit '{}' on {} row, assuming canonical",
                scope(project_id, component_id),
                unit,
                role
            ),
            DataQualityIssue::AmbiguousCurrencyUnit {
                project_id,
                component_id,
                unit,
            } => write!(
                f,
                "{}: currency '{}' starts with M and was read as millions",
                scope(project_id, component_id),
                unit
            ),
            DataQualityIssue::UnparseableRate {
                project_id,
                component_id,
                raw,
            } => write!(
                f,
                "{}: discount rate '{}' is not numeric, treated as absent",
                scope(project_id, component_id),
                raw
            ),
            DataQualityIssue::NonPositiveRate {
                project_id,
                component_id,
                value,
            } => write!(
                f,
                "{}: discount rate {} is not positive, treated as absent",
                scope(project_id, component_id),
                value
            ),
            DataQualityIssue::NonNumericCell {
                project_id,
                component_id,
                role,
                column,
                raw,
            } => write!(
                f,
                "{}: {} row has non-numeric value '{}' in {}, read as 0",
                scope(project_id, component_id),
                role,
                raw,
                column
            ),
            DataQualityIssue::DroppedComponent {
                project_id,
                component_id,
                missing,
            } => write!(
                f,
                "project {} / component {}: missing {} row, component dropped",
                project_id, component_id, missing
            ),
            DataQualityIssue::DuplicateRows {
                project_id,
                component_id,
                role,
                ignored,
            } => write!(
                f,
                "{}: {} duplicate {} row(s) ignored, first row used",
                scope(project_id, component_id),
                ignored,
                role
            ),
            DataQualityIssue::IgnoredExpansionRows { project_id, rows } => write!(
                f,
                "project {}: {} expansion row(s) ignored because the project is built from components",
                project_id, rows
            ),
            DataQualityIssue::SeriesLengthMismatch {
                project_id,
                series,
                expected,
                actual,
            } => write!(
                f,
                "project {}: {} has {} periods, expected {}",
                project_id, series, actual, expected
            ),
            DataQualityIssue::NonFiniteValue {
                project_id,
                series,
                period,
            } => write!(
                f,
                "project {}: {} has a non-finite value at p{}",
                project_id, series, period
            ),
        }
    }
}

/// Collects issues and mirrors each one to the log as it is recorded.
#[derive(Debug, Default)]
pub struct Diagnostics {
    issues: Vec<DataQualityIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: DataQualityIssue) {
        warn!("{}", issue);
        self.issues.push(issue);
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn into_vec(self) -> Vec<DataQualityIssue> {
        self.issues
    }
}

fn check_series(
    project_id: &str,
    name: &str,
    series: &[f64],
    expected: usize,
    out: &mut Vec<DataQualityIssue>,
) {
    if series.len() != expected {
        out.push(DataQualityIssue::SeriesLengthMismatch {
            project_id: project_id.to_string(),
            series: name.to_string(),
            expected,
            actual: series.len(),
        });
    }
    if let Some(period) = series.iter().position(|v| !v.is_finite()) {
        out.push(DataQualityIssue::NonFiniteValue {
            project_id: project_id.to_string(),
            series: name.to_string(),
            period,
        });
    }
}

/// Post-parse consistency checks: every series should span the detected
/// period columns and hold finite values.
pub fn validate_model(model: &ProjectModel) -> Vec<DataQualityIssue> {
    let expected = model.period_columns.len();
    let mut issues = Vec::new();

    for project in &model.projects {
        check_series(&project.id, "cashflow", &project.cashflow, expected, &mut issues);
        check_series(&project.id, "carbon", &project.carbon, expected, &mut issues);
        if let Some(series) = &project.cashflow_expansion {
            check_series(&project.id, "cashflow_expansion", series, expected, &mut issues);
        }
        if let Some(series) = &project.carbon_expansion {
            check_series(&project.id, "carbon_expansion", series, expected, &mut issues);
        }
        for component in &project.components {
            let prefix = format!("component {}", component.id);
            check_series(
                &project.id,
                &format!("{} cashflow", prefix),
                &component.cashflow,
                expected,
                &mut issues,
            );
            check_series(
                &project.id,
                &format!("{} carbon", prefix),
                &component.carbon,
                expected,
                &mut issues,
            );
        }
    }

    issues
}
