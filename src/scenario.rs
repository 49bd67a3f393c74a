use crate::finance::{
    apply_price_factor, carbon_total, effective_horizon, present_value, HORIZON_EPSILON,
};
use crate::model::{Component, Project, ProjectModel};
use log::debug;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

pub const DEFAULT_DISCOUNT_RATE: f64 = 0.10;
pub const RATE_RANGE: RangeInclusive<f64> = 0.02..=0.30;
pub const PRICE_FACTOR_RANGE: RangeInclusive<f64> = 0.50..=2.00;

/// The two control values a render request passes in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParams {
    /// Fallback discount rate for entities that carry none of their own.
    pub discount_rate: f64,
    /// Multiplier for positive (revenue-like) cashflow entries.
    pub price_factor: f64,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            discount_rate: DEFAULT_DISCOUNT_RATE,
            price_factor: 1.0,
        }
    }
}

impl ScenarioParams {
    pub fn new(discount_rate: f64, price_factor: f64) -> Self {
        Self {
            discount_rate,
            price_factor,
        }
    }

    /// Both values clamped to the interactive control ranges.
    pub fn clamped(&self) -> Self {
        Self {
            discount_rate: self
                .discount_rate
                .clamp(*RATE_RANGE.start(), *RATE_RANGE.end()),
            price_factor: self
                .price_factor
                .clamp(*PRICE_FACTOR_RANGE.start(), *PRICE_FACTOR_RANGE.end()),
        }
    }
}

/// Rate actually used for an entity: its own rate when positive (percent
/// values above 1 are divided by 100), otherwise the caller's fallback.
pub fn resolve_discount_rate(entity_rate: Option<f64>, fallback: f64) -> f64 {
    match entity_rate {
        Some(r) if r > 1.0 => r / 100.0,
        Some(r) if r > 0.0 => r,
        _ => fallback,
    }
}

/// Starting value for a project's rate control.
pub fn initial_rate(project: &Project) -> f64 {
    match project.discount_rate {
        Some(r) if r > 0.5 => r / 100.0,
        Some(r) if r > 0.0 => r,
        _ => DEFAULT_DISCOUNT_RATE,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetrics {
    pub project_id: String,
    pub title: String,
    pub rate_used: f64,
    pub present_value: f64,
    pub effective_horizon: usize,
    pub carbon_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMetrics {
    pub component_id: String,
    pub title: String,
    pub rate_used: f64,
    pub present_value: f64,
    pub carbon_total: f64,
}

/// Metrics for a single project at exactly the caller's discount rate. The
/// project's own rate only seeds the control, see [`initial_rate`].
pub fn evaluate_project(project: &Project, params: &ScenarioParams) -> ProjectMetrics {
    project_metrics(project, params.discount_rate, params.price_factor)
}

fn project_metrics(project: &Project, rate_used: f64, price_factor: f64) -> ProjectMetrics {
    let adjusted = apply_price_factor(&project.cashflow, price_factor);

    ProjectMetrics {
        project_id: project.id.clone(),
        title: project.title.clone(),
        rate_used,
        present_value: present_value(rate_used, &adjusted),
        effective_horizon: effective_horizon(&project.cashflow, &project.carbon, HORIZON_EPSILON),
        carbon_total: carbon_total(&project.carbon),
    }
}

fn evaluate_component(component: &Component, params: &ScenarioParams) -> ComponentMetrics {
    let rate_used = resolve_discount_rate(component.discount_rate, params.discount_rate);
    let adjusted = apply_price_factor(&component.cashflow, params.price_factor);

    ComponentMetrics {
        component_id: component.id.clone(),
        title: component.title.clone(),
        rate_used,
        present_value: present_value(rate_used, &adjusted),
        carbon_total: carbon_total(&component.carbon),
    }
}

/// Per-component breakdown. With `selection`, only components whose title is
/// listed are returned.
pub fn evaluate_components(
    project: &Project,
    params: &ScenarioParams,
    selection: Option<&[&str]>,
) -> Vec<ComponentMetrics> {
    project
        .components
        .iter()
        .filter(|c| selection.map_or(true, |titles| titles.contains(&c.title.as_str())))
        .map(|c| evaluate_component(c, params))
        .collect()
}

/// Metrics for each requested project under one shared scenario. A project's
/// own rate overrides the shared one. Unknown ids are skipped.
pub fn compare_projects(
    model: &ProjectModel,
    ids: &[&str],
    params: &ScenarioParams,
) -> Vec<ProjectMetrics> {
    ids.iter()
        .filter_map(|id| {
            let project = model.project(id);
            if project.is_none() {
                debug!("Comparison skipped unknown project {}", id);
            }
            project
        })
        .map(|p| {
            let rate = resolve_discount_rate(p.discount_rate, params.discount_rate);
            project_metrics(p, rate, params.price_factor)
        })
        .collect()
}

/// Each value as a percentage of the total. A zero total returns the values unchanged.
pub fn percent_of_total(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total == 0.0 {
        return values.to_vec();
    }
    values.iter().map(|v| v / total * 100.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SeriesUnits;

    fn component(
        id: &str,
        title: &str,
        cashflow: Vec<f64>,
        carbon: Vec<f64>,
        rate: Option<f64>,
    ) -> Component {
        Component {
            id: id.to_string(),
            title: title.to_string(),
            cashflow,
            carbon,
            discount_rate: rate,
            units: SeriesUnits::default(),
        }
    }

    fn project(rate: Option<f64>) -> Project {
        Project {
            id: "A".to_string(),
            title: "Sumideros".to_string(),
            cashflow: vec![-100.0, 55.0, 60.5, 0.0],
            carbon: vec![0.0, 10.0, 20.0, 0.0],
            cashflow_expansion: None,
            carbon_expansion: None,
            discount_rate: rate,
            notes: String::new(),
            units: SeriesUnits::default(),
            components: vec![
                component("A1", "Manglar", vec![-50.0, 55.0], vec![0.0, 10.0], Some(0.05)),
                component("A2", "Bosque", vec![-50.0, 0.0, 60.5], vec![0.0, 0.0, 20.0], None),
            ],
            details: vec![],
        }
    }

    #[test]
    fn test_resolve_discount_rate() {
        assert_eq!(resolve_discount_rate(None, 0.1), 0.1);
        assert_eq!(resolve_discount_rate(Some(0.0), 0.1), 0.1);
        assert_eq!(resolve_discount_rate(Some(-0.2), 0.1), 0.1);
        assert_eq!(resolve_discount_rate(Some(0.08), 0.1), 0.08);
        assert!((resolve_discount_rate(Some(12.0), 0.1) - 0.12).abs() < 1e-12);
    }

    #[test]
    fn test_initial_rate() {
        assert_eq!(initial_rate(&project(None)), DEFAULT_DISCOUNT_RATE);
        assert_eq!(initial_rate(&project(Some(0.07))), 0.07);
        assert!((initial_rate(&project(Some(0.9))) - 0.009).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_project_uses_fallback_rate() {
        let metrics = evaluate_project(&project(None), &ScenarioParams::new(0.10, 1.0));
        assert_eq!(metrics.rate_used, 0.10);
        assert!((metrics.present_value - 0.0).abs() < 1e-9, "got {}", metrics.present_value);
        assert_eq!(metrics.effective_horizon, 2);
        assert_eq!(metrics.carbon_total, 30.0);
    }

    #[test]
    fn test_evaluate_project_follows_caller_rate() {
        let p = project(Some(0.10));
        let low = evaluate_project(&p, &ScenarioParams::new(0.02, 1.0));
        let high = evaluate_project(&p, &ScenarioParams::new(0.30, 1.0));
        assert_eq!(low.rate_used, 0.02);
        assert_eq!(high.rate_used, 0.30);
        assert!(low.present_value > high.present_value);

        let seeded = evaluate_project(&p, &ScenarioParams::new(initial_rate(&p), 1.0));
        assert_eq!(seeded.rate_used, 0.10);
    }

    #[test]
    fn test_comparison_prefers_project_rate() {
        let model = ProjectModel {
            period_columns: vec![],
            projects: vec![project(Some(0.07)), {
                let mut b = project(None);
                b.id = "B".to_string();
                b
            }],
            diagnostics: vec![],
        };
        let rows = compare_projects(&model, &["B", "A"], &ScenarioParams::new(0.25, 1.0));
        assert_eq!(rows[0].project_id, "B");
        assert_eq!(rows[0].rate_used, 0.25);
        assert_eq!(rows[1].rate_used, 0.07);
    }

    #[test]
    fn test_price_factor_only_moves_revenue() {
        let base = evaluate_project(&project(None), &ScenarioParams::new(0.0, 1.0));
        let doubled = evaluate_project(&project(None), &ScenarioParams::new(0.0, 2.0));
        assert!((base.present_value - 15.5).abs() < 1e-9);
        assert!((doubled.present_value - 131.0).abs() < 1e-9);
        assert_eq!(base.carbon_total, doubled.carbon_total);
    }

    #[test]
    fn test_component_breakdown_and_selection() {
        let p = project(None);
        let params = ScenarioParams::new(0.10, 1.0);
        let all = evaluate_components(&p, &params, None);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].rate_used, 0.05);
        assert_eq!(all[1].rate_used, 0.10);

        let only = evaluate_components(&p, &params, Some(&["Bosque"]));
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].component_id, "A2");
        assert_eq!(only[0].carbon_total, 20.0);
    }

    #[test]
    fn test_percent_of_total() {
        assert_eq!(percent_of_total(&[1.0, 3.0]), vec![25.0, 75.0]);
        assert_eq!(percent_of_total(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_clamped_params() {
        let p = ScenarioParams::new(0.5, 0.1).clamped();
        assert_eq!(p.discount_rate, 0.30);
        assert_eq!(p.price_factor, 0.50);
    }
}
