use crate::error::{MatrixModelError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PeriodColumn {
    /// Column name as it appears in the table.
    pub name: String,
    /// Numeric suffix: "p7" -> 7.
    pub index: u32,
}

/// Returns the period index for names like "p0" or " P12 ".
pub fn period_index(column: &str) -> Option<u32> {
    let name = column.trim();
    let mut chars = name.chars();
    match chars.next() {
        Some('p') | Some('P') => {}
        _ => return None,
    }
    let digits = chars.as_str();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Selects the period columns and orders them by numeric suffix.
pub fn detect_period_columns<S: AsRef<str>>(columns: &[S]) -> Result<Vec<PeriodColumn>> {
    let mut periods: Vec<PeriodColumn> = columns
        .iter()
        .filter_map(|c| {
            period_index(c.as_ref()).map(|index| PeriodColumn {
                name: c.as_ref().to_string(),
                index,
            })
        })
        .collect();

    if periods.is_empty() {
        return Err(MatrixModelError::NoPeriodColumns);
    }

    periods.sort_by_key(|p| p.index);
    Ok(periods)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignores_unrelated_columns() {
        let cols = ["project_id", "p2", "region", "p0", "p3", "p1"];
        let names: Vec<String> = detect_period_columns(&cols)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["p0", "p1", "p2", "p3"]);
    }

    #[test]
    fn test_numeric_ordering() {
        let cols = ["p10", "p2", "P1"];
        let idx: Vec<u32> = detect_period_columns(&cols)
            .unwrap()
            .iter()
            .map(|p| p.index)
            .collect();
        assert_eq!(idx, vec![1, 2, 10]);
    }

    #[test]
    fn test_rejects_lookalikes() {
        assert_eq!(period_index("p"), None);
        assert_eq!(period_index("project_id"), None);
        assert_eq!(period_index("p1a"), None);
        assert_eq!(period_index("q1"), None);
    }

    #[test]
    fn test_no_period_columns_is_error() {
        let result = detect_period_columns(&["project_id", "region"]);
        assert!(matches!(result, Err(MatrixModelError::NoPeriodColumns)));
    }
}
