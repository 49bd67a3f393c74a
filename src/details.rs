use crate::error::{MatrixModelError, Result};
use crate::model::{Assumption, ProjectModel};
use crate::table::Table;
use log::debug;
use std::collections::BTreeMap;

const ORDER_COLUMNS: &[&str] = &["orden", "order"];

/// Reads a (project_id, key, value[, orden]) table into assumptions per project.
/// Rows keep input order unless an order column is present, in which case rows
/// with an order value come first, ascending.
pub fn parse_details(table: &Table) -> Result<BTreeMap<String, Vec<Assumption>>> {
    let missing = table.missing_columns(&["project_id", "key", "value"]);
    if !missing.is_empty() {
        return Err(MatrixModelError::MissingColumns {
            table: "details".to_string(),
            missing,
        });
    }

    let project_col = table.column_index("project_id");
    let key_col = table.column_index("key");
    let value_col = table.column_index("value");
    let order_col = table.first_column_index(ORDER_COLUMNS);

    let mut entries: Vec<(String, Option<f64>, Assumption)> = (0..table.len())
        .filter_map(|r| {
            let project_id = table.cell_opt(r, project_col).as_text()?;
            let assumption = Assumption {
                key: table.cell_opt(r, key_col).as_text().unwrap_or_default(),
                value: table.cell_opt(r, value_col).as_text().unwrap_or_default(),
            };
            Some((project_id, table.cell_opt(r, order_col).as_f64(), assumption))
        })
        .collect();

    if order_col.is_some() {
        entries.sort_by(|a, b| match (a.1, b.1) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
    }

    let mut details: BTreeMap<String, Vec<Assumption>> = BTreeMap::new();
    for (project_id, _, assumption) in entries {
        details.entry(project_id).or_default().push(assumption);
    }
    Ok(details)
}

impl ProjectModel {
    /// Attaches assumptions from a details table to the matching projects.
    /// Rows for unknown projects are ignored.
    pub fn with_details(mut self, table: &Table) -> Result<Self> {
        let mut details = parse_details(table)?;
        for project in &mut self.projects {
            if let Some(rows) = details.remove(&project.id) {
                project.details = rows;
            }
        }
        if !details.is_empty() {
            debug!(
                "Details ignored for unknown projects: {:?}",
                details.keys().collect::<Vec<_>>()
            );
        }
        Ok(self)
    }
}
