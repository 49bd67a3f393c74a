//! Currency and carbon-mass unit scaling.
//!
//! Scaling never fails. Labels the normalizer does not recognize are treated
//! as already canonical, and `classify_*` reports that case so the parser can
//! log it instead of hiding it.

use serde::{Deserialize, Serialize};

pub const MILLION: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitScale {
    /// Value is already in the canonical unit.
    Canonical,
    /// Value is expressed in millions of the canonical unit.
    Millions,
    /// Label not recognized; value is left unchanged.
    Unknown,
}

impl UnitScale {
    pub fn factor(self) -> f64 {
        match self {
            UnitScale::Millions => MILLION,
            UnitScale::Canonical | UnitScale::Unknown => 1.0,
        }
    }
}

/// Any label starting with "M" means millions of currency units. Empty labels
/// and plain currency codes ("USD", "COP", "$") are canonical.
pub fn classify_currency(unit: &str) -> UnitScale {
    let label = unit.trim().to_uppercase();
    if label.is_empty() {
        return UnitScale::Canonical;
    }
    if label.starts_with('M') {
        return UnitScale::Millions;
    }
    let is_code = label.len() == 3 && label.chars().all(|c| c.is_ascii_alphabetic());
    if is_code || label == "$" || label == "US$" {
        UnitScale::Canonical
    } else {
        UnitScale::Unknown
    }
}

/// True for labels that are scaled as millions but also read like an ISO
/// currency code ("MXN", "MZN"). Scaling is unchanged; callers report these.
pub fn is_ambiguous_currency(unit: &str) -> bool {
    let label = unit.trim().to_uppercase();
    label.len() == 3 && label.starts_with('M') && label.chars().all(|c| c.is_ascii_alphabetic())
}

pub fn classify_carbon(unit: &str) -> UnitScale {
    let label: String = unit
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| *c != ' ')
        .collect();
    match label.as_str() {
        "mtco2e" | "mtco₂e" => UnitScale::Millions,
        "" | "tco2e" | "tco₂e" | "tco2" | "tco₂" | "t" => UnitScale::Canonical,
        _ => UnitScale::Unknown,
    }
}

pub fn normalize_currency(value: f64, unit: &str) -> f64 {
    value * classify_currency(unit).factor()
}

pub fn normalize_carbon(value: f64, unit: &str) -> f64 {
    value * classify_carbon(unit).factor()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_millions() {
        assert_eq!(normalize_currency(-300.0, "MUSD"), -300_000_000.0);
        assert_eq!(normalize_currency(2.5, " musd "), 2_500_000.0);
        assert_eq!(normalize_currency(653_058.0, "USD"), 653_058.0);
        assert_eq!(normalize_currency(10.0, ""), 10.0);
    }

    #[test]
    fn test_currency_round_trip() {
        let original = 1.234_567;
        let scaled = normalize_currency(original, "MUSD");
        assert!((scaled / MILLION - original).abs() < 1e-12);
    }

    #[test]
    fn test_carbon_megatonnes() {
        assert_eq!(normalize_carbon(4.0, "MtCO2e"), 4_000_000.0);
        assert_eq!(normalize_carbon(4.0, "Mt CO₂e"), 4_000_000.0);
        assert_eq!(normalize_carbon(109_100.0, "tCO2e"), 109_100.0);
    }

    #[test]
    fn test_unknown_labels_are_identity() {
        assert_eq!(classify_carbon("kg"), UnitScale::Unknown);
        assert_eq!(normalize_carbon(5.0, "kg"), 5.0);
        assert_eq!(classify_currency("pesos"), UnitScale::Unknown);
        assert_eq!(normalize_currency(5.0, "pesos"), 5.0);
    }

    #[test]
    fn test_m_prefixed_iso_codes_are_flagged() {
        assert_eq!(classify_currency("MXN"), UnitScale::Millions);
        assert!(is_ambiguous_currency(" mxn "));
        assert!(is_ambiguous_currency("MZN"));
        assert!(!is_ambiguous_currency("MUSD"));
        assert!(!is_ambiguous_currency("MCOP"));
        assert!(!is_ambiguous_currency("M"));
        assert!(!is_ambiguous_currency("USD"));
    }
}
