//! # Carbon Matrix Model
//!
//! A library for turning a single flat "matrix" table, where every
//! climate-mitigation project occupies a cashflow row and a carbon row, into
//! normalized per-period series, valuations and carbon metrics.
//!
//! ## Core Concepts
//!
//! - **Matrix**: one row per project quantity (`CASHFLOW`, `CO2`, optional expansion rows),
//!   one column per period (`p0`, `p1`, ..., `pN`)
//! - **Canonical units**: base currency units (not millions) and tCO2e (not megatonnes)
//! - **Components**: optional sub-breakdown of a project; the project series are their sum
//! - **Scenario**: a discount rate and a carbon price factor supplied per query, never stored
//!
//! ## Example
//!
//! ```rust,ignore
//! use carbon_matrix_model::*;
//!
//! let csv = "\
//! project_id,project_title,row_label,unit,p0,p1,p2,p3
//! A,Sumideros 2021,CASHFLOW,USD,-2000000,-545540,653058,1306171
//! A,Sumideros 2021,CO2,tCO2e,0,109100,208650,398200
//! ";
//!
//! let table = Table::from_csv_reader(csv.as_bytes()).unwrap();
//! let model = parse_matrix(&table).unwrap();
//!
//! let metrics = evaluate_project(
//!     model.project("A").unwrap(),
//!     &ScenarioParams::new(0.10, 1.0),
//! );
//! println!("NPV {:.0}, horizon {} years", metrics.present_value, metrics.effective_horizon);
//! ```

pub mod classifier;
pub mod details;
pub mod diagnostics;
pub mod error;
pub mod finance;
pub mod model;
pub mod opportunity;
pub mod parser;
pub mod periods;
pub mod scenario;
pub mod table;
pub mod units;

pub use classifier::RowRole;
pub use details::parse_details;
pub use diagnostics::{validate_model, DataQualityIssue};
pub use error::{MatrixModelError, Result};
pub use finance::*;
pub use model::*;
pub use opportunity::{
    slug_ecosystem, EcosystemBreakdown, EcosystemPriority, LevelLabel, LevelShare,
    OpportunityLevel, OpportunityRow, OpportunitySet,
};
pub use parser::{parse_matrix, sum_series, MatrixParser};
pub use periods::{detect_period_columns, PeriodColumn};
pub use scenario::*;
pub use table::{Cell, Table};
pub use units::{normalize_carbon, normalize_currency, UnitScale};

use log::info;

/// Optional side tables that accompany the matrix in the source workbook.
#[derive(Debug, Default)]
pub struct SupplementaryTables<'a> {
    pub details: Option<&'a Table>,
    pub partitions: Option<&'a Table>,
    pub coords: Option<&'a Table>,
}

/// Everything the presentation layer needs from one uploaded dataset.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub model: ProjectModel,
    pub opportunities: Option<OpportunitySet>,
}

pub struct PortfolioProcessor;

impl PortfolioProcessor {
    /// Parses the matrix, runs the post-parse checks and attaches the side tables.
    pub fn process(matrix: &Table, extra: &SupplementaryTables<'_>) -> Result<Portfolio> {
        let mut model = parse_matrix(matrix)?;

        let findings = validate_model(&model);
        for finding in &findings {
            log::warn!("{}", finding);
        }
        model.diagnostics.extend(findings);

        if let Some(details) = extra.details {
            model = model.with_details(details)?;
        }

        let opportunities = match extra.partitions {
            Some(partitions) => {
                let set = OpportunitySet::from_table(partitions)?;
                Some(match extra.coords {
                    Some(coords) => set.attach_coordinates(coords)?,
                    None => set,
                })
            }
            None => None,
        };

        info!(
            "Portfolio ready: {} projects, {} diagnostics, opportunities {}",
            model.projects.len(),
            model.diagnostics.len(),
            if opportunities.is_some() { "attached" } else { "absent" }
        );

        Ok(Portfolio {
            model,
            opportunities,
        })
    }
}

pub fn process_portfolio(matrix: &Table, extra: &SupplementaryTables<'_>) -> Result<Portfolio> {
    PortfolioProcessor::process(matrix, extra)
}
