use crate::diagnostics::DataQualityIssue;
use crate::periods::PeriodColumn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Raw unit labels of the rows a pair of base series was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct SeriesUnits {
    #[schemars(description = "Currency label of the cashflow row (e.g. USD, MUSD)")]
    pub currency: String,
    #[schemars(description = "Carbon-mass label of the CO2 row (e.g. tCO2e, MtCO2e)")]
    pub carbon: String,
}

/// A free-form assumption attached to a project from the details table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Assumption {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Component {
    pub id: String,
    pub title: String,
    #[schemars(description = "Cashflow per period in base currency units; index 0 is period 0")]
    pub cashflow: Vec<f64>,
    #[schemars(description = "Carbon per period in tCO2e; same indexing as cashflow")]
    pub carbon: Vec<f64>,
    #[schemars(description = "Fractional discount rate, when the source row carries one")]
    pub discount_rate: Option<f64>,
    pub units: SeriesUnits,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Project {
    pub id: String,
    pub title: String,
    #[schemars(
        description = "Cashflow per period in base currency units. When components exist this is their element-wise sum."
    )]
    pub cashflow: Vec<f64>,
    #[schemars(
        description = "Carbon per period in tCO2e. When components exist this is their element-wise sum."
    )]
    pub carbon: Vec<f64>,
    #[schemars(description = "Optional alternative scenario overlaid on the cashflow")]
    pub cashflow_expansion: Option<Vec<f64>>,
    #[schemars(description = "Optional alternative scenario overlaid on the carbon series")]
    pub carbon_expansion: Option<Vec<f64>>,
    pub discount_rate: Option<f64>,
    pub notes: String,
    pub units: SeriesUnits,
    pub components: Vec<Component>,
    #[serde(default)]
    pub details: Vec<Assumption>,
}

impl Project {
    pub fn has_components(&self) -> bool {
        !self.components.is_empty()
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn carbon_total(&self) -> f64 {
        self.carbon.iter().sum()
    }
}

/// Parsed matrix: every project in first-appearance order plus the
/// data-quality issues resolved by default while parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProjectModel {
    pub period_columns: Vec<PeriodColumn>,
    pub projects: Vec<Project>,
    #[serde(default)]
    pub diagnostics: Vec<DataQualityIssue>,
}

impl ProjectModel {
    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn project_ids(&self) -> Vec<&str> {
        self.projects.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ProjectModel)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
