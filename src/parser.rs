//! Matrix parser: one flat table, several rows per project, into the
//! nested project/component model.
//!
//! Each project occupies at least a cashflow row and a carbon row, with one
//! value per period column. Projects may be split into components through
//! the optional `component_id`/`component_title` columns; the project series
//! are then the element-wise sum of the complete components.

use crate::classifier::RowRole;
use crate::diagnostics::{DataQualityIssue, Diagnostics};
use crate::error::{MatrixModelError, Result};
use crate::finance::pad_to;
use crate::model::{Component, Project, ProjectModel, SeriesUnits};
use crate::periods::{detect_period_columns, PeriodColumn};
use crate::table::{parse_decimal, Cell, Table};
use crate::units::{classify_carbon, classify_currency, is_ambiguous_currency, UnitScale};
use log::{debug, info};
use std::collections::HashMap;

pub const PROJECT_ID_COLUMN: &str = "project_id";
pub const PROJECT_TITLE_COLUMN: &str = "project_title";
pub const ROW_LABEL_COLUMN: &str = "row_label";
pub const UNIT_COLUMN: &str = "unit";
pub const NOTES_COLUMN: &str = "notes";
pub const COMPONENT_ID_COLUMN: &str = "component_id";
pub const COMPONENT_TITLE_COLUMN: &str = "component_title";
/// Accepted names for the discount-rate column, in lookup priority.
pub const RATE_COLUMNS: &[&str] = &["tasa", "rate", "discount_rate", "drate"];

struct MatrixColumns {
    project_id: usize,
    project_title: usize,
    row_label: usize,
    unit: Option<usize>,
    notes: Option<usize>,
    rate: Option<usize>,
    components: Option<(usize, usize)>,
    periods: Vec<(usize, PeriodColumn)>,
}

/// Identifies the entity a series or rate belongs to, for diagnostics.
#[derive(Clone, Copy)]
struct Scope<'s> {
    project_id: &'s str,
    component_id: Option<&'s str>,
}

impl Scope<'_> {
    fn component(&self) -> Option<String> {
        self.component_id.map(str::to_string)
    }
}

struct SeriesPair {
    cashflow: Vec<f64>,
    carbon: Vec<f64>,
    units: SeriesUnits,
}

pub struct MatrixParser<'a> {
    table: &'a Table,
    columns: MatrixColumns,
    roles: Vec<RowRole>,
}

impl<'a> MatrixParser<'a> {
    /// Validates the table layout: required columns first, then period columns.
    pub fn new(table: &'a Table) -> Result<Self> {
        let missing =
            table.missing_columns(&[PROJECT_ID_COLUMN, PROJECT_TITLE_COLUMN, ROW_LABEL_COLUMN]);
        if !missing.is_empty() {
            return Err(MatrixModelError::MissingColumns {
                table: "matrix".to_string(),
                missing,
            });
        }

        let periods = detect_period_columns(&table.columns)?
            .into_iter()
            .filter_map(|p| table.column_index(&p.name).map(|idx| (idx, p)))
            .collect();

        let components = match (
            table.column_index(COMPONENT_ID_COLUMN),
            table.column_index(COMPONENT_TITLE_COLUMN),
        ) {
            (Some(id), Some(title)) => Some((id, title)),
            _ => None,
        };

        let columns = MatrixColumns {
            project_id: table.column_index(PROJECT_ID_COLUMN).unwrap_or_default(),
            project_title: table.column_index(PROJECT_TITLE_COLUMN).unwrap_or_default(),
            row_label: table.column_index(ROW_LABEL_COLUMN).unwrap_or_default(),
            unit: table.column_index(UNIT_COLUMN),
            notes: table.column_index(NOTES_COLUMN),
            rate: table.first_column_index(RATE_COLUMNS),
            components,
            periods,
        };

        let roles = (0..table.len())
            .map(|row| {
                let label = table
                    .cell(row, columns.row_label)
                    .as_text()
                    .unwrap_or_default();
                RowRole::classify(&label)
            })
            .collect();

        Ok(Self {
            table,
            columns,
            roles,
        })
    }

    pub fn period_columns(&self) -> Vec<PeriodColumn> {
        self.columns.periods.iter().map(|(_, p)| p.clone()).collect()
    }

    pub fn parse(&self) -> Result<ProjectModel> {
        let mut diagnostics = Diagnostics::new();
        let all_rows: Vec<usize> = (0..self.table.len()).collect();
        let groups = group_rows(self.table, &all_rows, self.columns.project_id);

        let mut projects = Vec::with_capacity(groups.len());
        for (project_id, rows) in &groups {
            let project = self.parse_project(project_id, rows, &mut diagnostics)?;
            debug!(
                "Project {}: {} periods, {} components, rate {:?}",
                project.id,
                project.cashflow.len(),
                project.components.len(),
                project.discount_rate
            );
            projects.push(project);
        }

        info!(
            "Parsed matrix: {} projects over {} periods ({} data-quality issues)",
            projects.len(),
            self.columns.periods.len(),
            diagnostics.len()
        );

        Ok(ProjectModel {
            period_columns: self.period_columns(),
            projects,
            diagnostics: diagnostics.into_vec(),
        })
    }

    fn parse_project(
        &self,
        project_id: &str,
        rows: &[usize],
        diagnostics: &mut Diagnostics,
    ) -> Result<Project> {
        let scope = Scope {
            project_id,
            component_id: None,
        };
        let title = self
            .first_text(rows, Some(self.columns.project_title))
            .unwrap_or_else(|| project_id.to_string());
        let notes = self
            .first_text(rows, self.columns.notes)
            .unwrap_or_default();

        let components = self.parse_components(project_id, rows, diagnostics);

        let (pair, discount_rate, cashflow_expansion, carbon_expansion) = if !components.is_empty()
        {
            let expansion_rows = rows
                .iter()
                .filter(|&&r| self.roles[r].is_expansion())
                .count();
            if expansion_rows > 0 {
                diagnostics.push(DataQualityIssue::IgnoredExpansionRows {
                    project_id: project_id.to_string(),
                    rows: expansion_rows,
                });
            }

            let cashflows: Vec<&[f64]> =
                components.iter().map(|c| c.cashflow.as_slice()).collect();
            let carbons: Vec<&[f64]> = components.iter().map(|c| c.carbon.as_slice()).collect();
            let pair = SeriesPair {
                cashflow: sum_series(&cashflows),
                carbon: sum_series(&carbons),
                units: components[0].units.clone(),
            };
            let rate = components.iter().find_map(|c| c.discount_rate);
            (pair, rate, None, None)
        } else {
            let pair = self
                .series_pair(rows, scope, diagnostics)
                .map_err(|role| MatrixModelError::MissingRequiredRow {
                    project_id: project_id.to_string(),
                    role,
                })?;
            let rate = self.read_rate(rows, scope, diagnostics);
            let cashflow_expansion = self
                .select_row(rows, RowRole::CashflowExpansion, scope, diagnostics)
                .map(|row| {
                    self.read_series(row, RowRole::CashflowExpansion, scope, diagnostics)
                        .0
                });
            let carbon_expansion = self
                .select_row(rows, RowRole::CarbonExpansion, scope, diagnostics)
                .map(|row| {
                    self.read_series(row, RowRole::CarbonExpansion, scope, diagnostics)
                        .0
                });
            (pair, rate, cashflow_expansion, carbon_expansion)
        };

        Ok(Project {
            id: project_id.to_string(),
            title,
            cashflow: pair.cashflow,
            carbon: pair.carbon,
            cashflow_expansion,
            carbon_expansion,
            discount_rate,
            notes,
            units: pair.units,
            components,
            details: Vec::new(),
        })
    }

    fn parse_components(
        &self,
        project_id: &str,
        rows: &[usize],
        diagnostics: &mut Diagnostics,
    ) -> Vec<Component> {
        let Some((id_col, title_col)) = self.columns.components else {
            return Vec::new();
        };

        let mut components = Vec::new();
        for (component_id, component_rows) in group_rows(self.table, rows, id_col) {
            let scope = Scope {
                project_id,
                component_id: Some(&component_id),
            };

            let pair = match self.series_pair(&component_rows, scope, diagnostics) {
                Ok(pair) => pair,
                Err(missing) => {
                    diagnostics.push(DataQualityIssue::DroppedComponent {
                        project_id: project_id.to_string(),
                        component_id: component_id.clone(),
                        missing,
                    });
                    continue;
                }
            };

            let title = self
                .first_text(&component_rows, Some(title_col))
                .unwrap_or_else(|| component_id.clone());
            let discount_rate = self.read_rate(&component_rows, scope, diagnostics);

            components.push(Component {
                id: component_id,
                title,
                cashflow: pair.cashflow,
                carbon: pair.carbon,
                discount_rate,
                units: pair.units,
            });
        }

        components
    }

    /// Reads the base cashflow/carbon pair, or reports which role is missing.
    fn series_pair(
        &self,
        rows: &[usize],
        scope: Scope<'_>,
        diagnostics: &mut Diagnostics,
    ) -> std::result::Result<SeriesPair, RowRole> {
        let cashflow_row = self.find_row(rows, RowRole::Cashflow);
        let carbon_row = self.find_row(rows, RowRole::Carbon);
        let cashflow_row = cashflow_row.ok_or(RowRole::Cashflow)?;
        let carbon_row = carbon_row.ok_or(RowRole::Carbon)?;

        self.report_duplicates(rows, RowRole::Cashflow, scope, diagnostics);
        self.report_duplicates(rows, RowRole::Carbon, scope, diagnostics);

        let (cashflow, currency) =
            self.read_series(cashflow_row, RowRole::Cashflow, scope, diagnostics);
        let (carbon, carbon_unit) =
            self.read_series(carbon_row, RowRole::Carbon, scope, diagnostics);

        Ok(SeriesPair {
            cashflow,
            carbon,
            units: SeriesUnits {
                currency,
                carbon: carbon_unit,
            },
        })
    }

    fn find_row(&self, rows: &[usize], role: RowRole) -> Option<usize> {
        rows.iter().copied().find(|&r| self.roles[r] == role)
    }

    /// First row with the given role; later rows with the same role are reported and ignored.
    fn select_row(
        &self,
        rows: &[usize],
        role: RowRole,
        scope: Scope<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Option<usize> {
        let row = self.find_row(rows, role)?;
        self.report_duplicates(rows, role, scope, diagnostics);
        Some(row)
    }

    fn report_duplicates(
        &self,
        rows: &[usize],
        role: RowRole,
        scope: Scope<'_>,
        diagnostics: &mut Diagnostics,
    ) {
        let count = rows.iter().filter(|&&r| self.roles[r] == role).count();
        if count > 1 {
            diagnostics.push(DataQualityIssue::DuplicateRows {
                project_id: scope.project_id.to_string(),
                component_id: scope.component(),
                role,
                ignored: count - 1,
            });
        }
    }

    /// Reads one row across the period columns and scales it to canonical units.
    /// Returns the series with the raw unit label.
    fn read_series(
        &self,
        row: usize,
        role: RowRole,
        scope: Scope<'_>,
        diagnostics: &mut Diagnostics,
    ) -> (Vec<f64>, String) {
        let unit = self
            .table
            .cell_opt(row, self.columns.unit)
            .as_text()
            .unwrap_or_default();

        let scale = if role.is_currency() {
            classify_currency(&unit)
        } else {
            classify_carbon(&unit)
        };
        if role.is_currency() && is_ambiguous_currency(&unit) {
            diagnostics.push(DataQualityIssue::AmbiguousCurrencyUnit {
                project_id: scope.project_id.to_string(),
                component_id: scope.component(),
                unit: unit.clone(),
            });
        }
        if scale == UnitScale::Unknown {
            diagnostics.push(DataQualityIssue::UnknownUnit {
                project_id: scope.project_id.to_string(),
                component_id: scope.component(),
                role,
                unit: unit.clone(),
            });
        }

        let series = self
            .columns
            .periods
            .iter()
            .map(|(col, period)| {
                let cell = self.table.cell(row, *col);
                let value = match cell.as_f64() {
                    Some(v) => v,
                    None if cell.is_empty() => 0.0,
                    None => {
                        diagnostics.push(DataQualityIssue::NonNumericCell {
                            project_id: scope.project_id.to_string(),
                            component_id: scope.component(),
                            role,
                            column: period.name.clone(),
                            raw: cell.as_text().unwrap_or_default(),
                        });
                        0.0
                    }
                };
                value * scale.factor()
            })
            .collect();

        (series, unit)
    }

    /// First non-missing rate among the rows. Percentages (> 1) are divided by 100.
    fn read_rate(
        &self,
        rows: &[usize],
        scope: Scope<'_>,
        diagnostics: &mut Diagnostics,
    ) -> Option<f64> {
        let col = self.columns.rate?;
        let cell = rows
            .iter()
            .map(|&r| self.table.cell(r, col))
            .find(|c| !c.is_empty())?;

        let parsed = match cell {
            Cell::Number(v) => Some(*v),
            Cell::Text(s) => parse_decimal(&s.replace('%', "")),
            Cell::Empty => None,
        };

        let Some(value) = parsed else {
            diagnostics.push(DataQualityIssue::UnparseableRate {
                project_id: scope.project_id.to_string(),
                component_id: scope.component(),
                raw: cell.as_text().unwrap_or_default(),
            });
            return None;
        };

        if value <= 0.0 {
            diagnostics.push(DataQualityIssue::NonPositiveRate {
                project_id: scope.project_id.to_string(),
                component_id: scope.component(),
                value,
            });
            return None;
        }

        Some(if value > 1.0 { value / 100.0 } else { value })
    }

    fn first_text(&self, rows: &[usize], col: Option<usize>) -> Option<String> {
        rows.iter()
            .find_map(|&r| self.table.cell_opt(r, col).as_text())
    }
}

/// Groups row indices by the text key in `key_col`, keeping first-appearance
/// order of keys and input order within each group. Rows without a key are skipped.
fn group_rows(table: &Table, rows: &[usize], key_col: usize) -> Vec<(String, Vec<usize>)> {
    let mut order: Vec<(String, Vec<usize>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for &row in rows {
        let Some(key) = table.cell(row, key_col).as_text() else {
            continue;
        };
        match positions.get(&key) {
            Some(&pos) => order[pos].1.push(row),
            None => {
                positions.insert(key.clone(), order.len());
                order.push((key, vec![row]));
            }
        }
    }

    order
}

/// Element-wise sum, zero-extending shorter series to the longest one.
pub fn sum_series(series: &[&[f64]]) -> Vec<f64> {
    let len = series.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut acc = vec![0.0; len];
    for s in series {
        for (total, value) in acc.iter_mut().zip(pad_to(s, len)) {
            *total += value;
        }
    }
    acc
}

pub fn parse_matrix(table: &Table) -> Result<ProjectModel> {
    MatrixParser::new(table)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> Table {
        Table::from_csv_reader(csv.as_bytes()).unwrap()
    }

    const SAMPLE: &str = "\
project_id,project_title,row_label,unit,notes,p0,p1,p2,p3
A,Sumideros 2021,CASHFLOW,USD,capex inicial,-2000000,-545540,653058,1306171
A,Sumideros 2021,CO2,tCO2e,,0,109100,208650,398200
B,OMC 2024,CASHFLOW,MUSD,,-300,-264,-225,-184
B,OMC 2024,CO2,MtCO2e,,0,4.0,4.8,5.3
";

    #[test]
    fn test_two_row_project() {
        let model = parse_matrix(&table(SAMPLE)).unwrap();
        assert_eq!(model.project_ids(), vec!["A", "B"]);

        let a = model.project("A").unwrap();
        assert_eq!(a.title, "Sumideros 2021");
        assert_eq!(a.notes, "capex inicial");
        assert_eq!(a.cashflow[0], -2_000_000.0);
        assert!((a.carbon_total() - 715_950.0).abs() < 1e-6);
        assert_eq!(a.discount_rate, None);
        assert!(a.components.is_empty());
        assert!(model.diagnostics.is_empty());
    }

    #[test]
    fn test_units_are_scaled() {
        let model = parse_matrix(&table(SAMPLE)).unwrap();
        let b = model.project("B").unwrap();
        assert_eq!(b.cashflow[0], -300_000_000.0);
        assert!((b.carbon[2] - 4_800_000.0).abs() < 1e-6);
        assert_eq!(b.units.currency, "MUSD");
        assert_eq!(b.units.carbon, "MtCO2e");
    }

    #[test]
    fn test_missing_carbon_row_is_fatal() {
        let csv = "project_id,project_title,row_label,p0\nA,A,CASHFLOW,1\n";
        let err = parse_matrix(&table(csv)).unwrap_err();
        match err {
            MatrixModelError::MissingRequiredRow { project_id, role } => {
                assert_eq!(project_id, "A");
                assert_eq!(role, RowRole::Carbon);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_columns_named() {
        let csv = "project_title,unit,p0\nA,USD,1\n";
        let err = parse_matrix(&table(csv)).unwrap_err();
        match err {
            MatrixModelError::MissingColumns { missing, .. } => {
                assert_eq!(missing, vec!["project_id", "row_label"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_period_columns() {
        let csv = "project_id,project_title,row_label,region\nA,A,CASHFLOW,x\n";
        assert!(matches!(
            parse_matrix(&table(csv)),
            Err(MatrixModelError::NoPeriodColumns)
        ));
    }

    #[test]
    fn test_missing_cells_read_as_zero() {
        let csv = "project_id,project_title,row_label,p0,p1,p2\nA,A,CF,,5,\nA,A,carbono,1,,\n";
        let model = parse_matrix(&table(csv)).unwrap();
        let a = model.project("A").unwrap();
        assert_eq!(a.cashflow, vec![0.0, 5.0, 0.0]);
        assert_eq!(a.carbon, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_rate_formats() {
        let csv = "\
project_id,project_title,row_label,tasa,p0
A,A,CASHFLOW,10%,1
A,A,CO2,,1
B,B,CASHFLOW,,1
B,B,CO2,0.12,1
C,C,CASHFLOW,n/a,1
C,C,CO2,,1
D,D,CASHFLOW,12,1
D,D,CO2,,1
";
        let model = parse_matrix(&table(csv)).unwrap();
        assert!((model.project("A").unwrap().discount_rate.unwrap() - 0.10).abs() < 1e-12);
        assert!((model.project("B").unwrap().discount_rate.unwrap() - 0.12).abs() < 1e-12);
        assert_eq!(model.project("C").unwrap().discount_rate, None);
        assert!((model.project("D").unwrap().discount_rate.unwrap() - 0.12).abs() < 1e-12);
        assert!(model
            .diagnostics
            .iter()
            .any(|d| matches!(d, DataQualityIssue::UnparseableRate { project_id, .. } if project_id == "C")));
    }

    #[test]
    fn test_duplicate_rows_first_wins() {
        let csv = "\
project_id,project_title,row_label,p0
A,A,CASHFLOW,1
A,A,CF,99
A,A,CO2,2
";
        let model = parse_matrix(&table(csv)).unwrap();
        assert_eq!(model.project("A").unwrap().cashflow, vec![1.0]);
        assert!(model.diagnostics.contains(&DataQualityIssue::DuplicateRows {
            project_id: "A".to_string(),
            component_id: None,
            role: RowRole::Cashflow,
            ignored: 1,
        }));
    }

    #[test]
    fn test_expansion_rows() {
        let csv = "\
project_id,project_title,row_label,unit,p0,p1
A,A,CASHFLOW,USD,-10,5
A,A,CO2,tCO2e,0,1
A,A,CF EXP,MUSD,0,2
";
        let model = parse_matrix(&table(csv)).unwrap();
        let a = model.project("A").unwrap();
        assert_eq!(a.cashflow_expansion, Some(vec![0.0, 2_000_000.0]));
        assert_eq!(a.carbon_expansion, None);
    }

    #[test]
    fn test_components_aggregate() {
        let csv = "\
project_id,project_title,component_id,component_title,row_label,rate,p0,p1
P,Portfolio,C1,Manglar,CASHFLOW,,-5,3
P,Portfolio,C1,Manglar,CO2,,0,10
P,Portfolio,C2,Bosque,CASHFLOW,8%,-1,1
P,Portfolio,C2,Bosque,CO2,,0,4
P,Portfolio,C3,Galeria,CASHFLOW,,-2,2
";
        let model = parse_matrix(&table(csv)).unwrap();
        let p = model.project("P").unwrap();
        assert_eq!(p.components.len(), 2);
        assert_eq!(p.cashflow, vec![-6.0, 4.0]);
        assert_eq!(p.carbon, vec![0.0, 14.0]);
        assert!((p.discount_rate.unwrap() - 0.08).abs() < 1e-12);
        assert_eq!(p.component("C2").unwrap().title, "Bosque");
        assert!(model.diagnostics.contains(&DataQualityIssue::DroppedComponent {
            project_id: "P".to_string(),
            component_id: "C3".to_string(),
            missing: RowRole::Carbon,
        }));
    }

    #[test]
    fn test_component_columns_without_values() {
        let csv = "\
project_id,project_title,component_id,component_title,row_label,p0
A,A,,,CASHFLOW,1
A,A,,,CO2,2
";
        let model = parse_matrix(&table(csv)).unwrap();
        let a = model.project("A").unwrap();
        assert!(a.components.is_empty());
        assert_eq!(a.carbon, vec![2.0]);
    }

    #[test]
    fn test_m_prefixed_currency_code_is_reported() {
        let csv = "\
project_id,project_title,row_label,unit,p0
A,A,CASHFLOW,MXN,2
A,A,CO2,tCO2e,1
";
        let model = parse_matrix(&table(csv)).unwrap();
        assert_eq!(model.project("A").unwrap().cashflow, vec![2_000_000.0]);
        assert_eq!(
            model.diagnostics,
            vec![DataQualityIssue::AmbiguousCurrencyUnit {
                project_id: "A".to_string(),
                component_id: None,
                unit: "MXN".to_string(),
            }]
        );
    }

    #[test]
    fn test_leading_zero_ids_stay_distinct() {
        let csv = "\
project_id,project_title,component_id,component_title,row_label,p0
001,Uno,01,K,CASHFLOW,1
001,Uno,01,K,CO2,2
001,Uno,1,K bis,CASHFLOW,5
001,Uno,1,K bis,CO2,6
1,Otro,,,CASHFLOW,3
1,Otro,,,CO2,4
";
        let model = parse_matrix(&table(csv)).unwrap();
        assert_eq!(model.project_ids(), vec!["001", "1"]);

        let first = model.project("001").unwrap();
        let ids: Vec<&str> = first.components.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["01", "1"]);
        assert_eq!(first.cashflow, vec![6.0]);

        assert_eq!(model.project("1").unwrap().cashflow, vec![3.0]);
        assert!(model.diagnostics.is_empty());
    }

    #[test]
    fn test_sum_series_pads() {
        let a: &[f64] = &[1.0, 2.0];
        let b: &[f64] = &[1.0, 1.0, 1.0];
        assert_eq!(sum_series(&[a, b]), vec![2.0, 3.0, 1.0]);
        assert!(sum_series(&[]).is_empty());
    }
}
