use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CASHFLOW_LABELS: &[&str] = &["CASHFLOW", "CF"];
pub const CARBON_LABELS: &[&str] = &["CO2", "CARBON", "CARBONO"];
pub const CASHFLOW_EXPANSION_LABELS: &[&str] = &[
    "CASHFLOW_EXP",
    "CF_EXP",
    "CASHFLOW EXP",
    "CF EXP",
    "CASHFLOW_EXPANSION",
    "CF_EXPANSION",
];
pub const CARBON_EXPANSION_LABELS: &[&str] = &[
    "CO2_EXP",
    "CO₂_EXP",
    "CO2 EXP",
    "CO₂ EXP",
    "CARBON_EXP",
    "CARBONO_EXP",
    "CO2_EXPANSION",
];

/// Semantic role of a matrix row, derived from its free-text label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RowRole {
    Cashflow,
    Carbon,
    CashflowExpansion,
    CarbonExpansion,
    Unknown,
}

impl RowRole {
    /// Classifies a row label (trimmed, upper-cased before matching).
    pub fn classify(label: &str) -> Self {
        let label = label.trim().to_uppercase();
        let is_in = |set: &[&str]| set.iter().any(|alias| *alias == label);

        if is_in(CASHFLOW_LABELS) {
            RowRole::Cashflow
        } else if is_in(CARBON_LABELS) {
            RowRole::Carbon
        } else if is_in(CASHFLOW_EXPANSION_LABELS) {
            RowRole::CashflowExpansion
        } else if is_in(CARBON_EXPANSION_LABELS) {
            RowRole::CarbonExpansion
        } else {
            RowRole::Unknown
        }
    }

    pub fn is_currency(self) -> bool {
        matches!(self, RowRole::Cashflow | RowRole::CashflowExpansion)
    }

    pub fn is_expansion(self) -> bool {
        matches!(self, RowRole::CashflowExpansion | RowRole::CarbonExpansion)
    }
}

impl fmt::Display for RowRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RowRole::Cashflow => "CASHFLOW",
            RowRole::Carbon => "CO2",
            RowRole::CashflowExpansion => "CASHFLOW_EXP",
            RowRole::CarbonExpansion => "CO2_EXP",
            RowRole::Unknown => "unknown",
        };
        f.write_str(label)
    }
}
