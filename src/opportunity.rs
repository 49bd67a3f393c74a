//! Opportunity aggregation: partition areas per ecosystem and level, turned
//! into percentage breakdowns for the currently selected ecosystems.

use crate::error::{MatrixModelError, Result};
use crate::table::Table;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const ECOSYSTEM_COLUMNS: &[&str] = &["ecosistema", "ecosystem"];
const LEVEL_COLUMNS: &[&str] = &["nivel", "level"];
const AREA_COLUMNS: &[&str] = &["area_ha", "area"];
const PROJECT_COLUMNS: &[&str] = &["project_id"];
const REGION_COLUMNS: &[&str] = &["region"];
const LAT_COLUMNS: &[&str] = &["lat", "latitud", "latitude"];
const LON_COLUMNS: &[&str] = &["lon", "longitud", "longitude"];
const PRIORITY_COLUMNS: &[&str] = &["priorizacion", "priority"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpportunityLevel {
    /// Area still to be assessed, including restricted zones.
    Restrictions,
    /// Unused potential suitable for scaling.
    UnusedPotential,
    CaseStudy,
}

impl OpportunityLevel {
    pub const ALL: [OpportunityLevel; 3] = [
        OpportunityLevel::Restrictions,
        OpportunityLevel::UnusedPotential,
        OpportunityLevel::CaseStudy,
    ];

    pub fn label(self) -> &'static str {
        match self {
            OpportunityLevel::Restrictions => "Potencial por evaluar + Restricciones",
            OpportunityLevel::UnusedPotential => "Área potencial SNC",
            OpportunityLevel::CaseStudy => "Caso de estudio",
        }
    }

    /// Looks up a free-text level after slug normalization. Both the legacy
    /// spreadsheet labels and the display labels are accepted.
    pub fn from_alias(raw: &str) -> Option<Self> {
        let key = slug_ecosystem(raw);
        match key.as_str() {
            "restricciones" | "restrictions" | "potencial por evaluar + restricciones" => {
                Some(OpportunityLevel::Restrictions)
            }
            "potencial no usado" | "unused potential" | "area potencial snc" => {
                Some(OpportunityLevel::UnusedPotential)
            }
            "caso de estudio" | "case study" => Some(OpportunityLevel::CaseStudy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelLabel {
    Canonical(OpportunityLevel),
    /// Unrecognized label, kept verbatim.
    Other(String),
}

impl LevelLabel {
    pub fn parse(raw: &str) -> Self {
        match OpportunityLevel::from_alias(raw) {
            Some(level) => LevelLabel::Canonical(level),
            None => LevelLabel::Other(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for LevelLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelLabel::Canonical(level) => f.write_str(level.label()),
            LevelLabel::Other(raw) => f.write_str(raw),
        }
    }
}

/// Strips diacritics, lower-cases and collapses whitespace, underscores and
/// hyphens to single spaces: "Bosque_Húmedo-Tropical" -> "bosque humedo tropical".
pub fn slug_ecosystem(raw: &str) -> String {
    let folded: String = raw
        .trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityRow {
    pub project_id: Option<String>,
    pub ecosystem: String,
    pub ecosystem_key: String,
    pub level: LevelLabel,
    pub area_ha: f64,
    pub region: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub priority: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelShare {
    pub level: LevelLabel,
    pub area_ha: f64,
    /// Share of this row within its ecosystem's selected total.
    pub percent: f64,
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcosystemBreakdown {
    pub ecosystem: String,
    pub ecosystem_key: String,
    pub total_ha: f64,
    /// This ecosystem's share of the area across all selected ecosystems.
    pub share_of_selection: f64,
    pub levels: Vec<LevelShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcosystemPriority {
    pub project_id: Option<String>,
    pub ecosystem: String,
    pub priority: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OpportunitySet {
    pub rows: Vec<OpportunityRow>,
}

fn text(table: &Table, row: usize, col: Option<usize>) -> Option<String> {
    table.cell_opt(row, col).as_text()
}

fn number(table: &Table, row: usize, col: Option<usize>) -> Option<f64> {
    table.cell_opt(row, col).as_f64()
}

fn require(
    table: &Table,
    name: &str,
    candidates: &[&str],
    missing: &mut Vec<String>,
) -> Option<usize> {
    let idx = table.first_column_index(candidates);
    if idx.is_none() {
        missing.push(name.to_string());
    }
    idx
}

impl OpportunitySet {
    /// Reads a partitions table. Requires ecosystem, level and area columns;
    /// non-numeric or missing areas count as 0.
    pub fn from_table(table: &Table) -> Result<Self> {
        let mut missing = Vec::new();
        let ecosystem_col = require(table, "ecosistema", ECOSYSTEM_COLUMNS, &mut missing);
        let level_col = require(table, "nivel", LEVEL_COLUMNS, &mut missing);
        let area_col = require(table, "area_ha", AREA_COLUMNS, &mut missing);
        if !missing.is_empty() {
            return Err(MatrixModelError::MissingColumns {
                table: "opportunities".to_string(),
                missing,
            });
        }

        let project_col = table.first_column_index(PROJECT_COLUMNS);
        let region_col = table.first_column_index(REGION_COLUMNS);
        let lat_col = table.first_column_index(LAT_COLUMNS);
        let lon_col = table.first_column_index(LON_COLUMNS);
        let priority_col = table.first_column_index(PRIORITY_COLUMNS);

        let mut rows = Vec::with_capacity(table.len());
        for r in 0..table.len() {
            let ecosystem = text(table, r, ecosystem_col).unwrap_or_default();
            let raw_level = text(table, r, level_col).unwrap_or_default();
            let level = LevelLabel::parse(&raw_level);
            if let LevelLabel::Other(other) = &level {
                warn!("Unrecognized opportunity level '{}' kept as-is", other);
            }

            rows.push(OpportunityRow {
                project_id: text(table, r, project_col),
                ecosystem_key: slug_ecosystem(&ecosystem),
                ecosystem,
                level,
                area_ha: number(table, r, area_col).unwrap_or(0.0),
                region: text(table, r, region_col),
                lat: number(table, r, lat_col),
                lon: number(table, r, lon_col),
                priority: number(table, r, priority_col),
            });
        }

        debug!("Loaded {} opportunity rows", rows.len());
        Ok(Self { rows })
    }

    /// Fills location, region and priority from a coordinates table joined on
    /// (project_id, ecosystem slug). Values already present are kept.
    pub fn attach_coordinates(mut self, coords: &Table) -> Result<Self> {
        let Some(ecosystem_col) = coords.first_column_index(ECOSYSTEM_COLUMNS) else {
            return Err(MatrixModelError::MissingColumns {
                table: "coords".to_string(),
                missing: vec!["ecosistema".to_string()],
            });
        };
        let project_col = coords.first_column_index(PROJECT_COLUMNS);
        let region_col = coords.first_column_index(REGION_COLUMNS);
        let lat_col = coords.first_column_index(LAT_COLUMNS);
        let lon_col = coords.first_column_index(LON_COLUMNS);
        let priority_col = coords.first_column_index(PRIORITY_COLUMNS);

        let mut lookup: HashMap<(Option<String>, String), usize> = HashMap::new();
        for r in 0..coords.len() {
            let key = (
                text(coords, r, project_col),
                slug_ecosystem(&text(coords, r, Some(ecosystem_col)).unwrap_or_default()),
            );
            lookup.entry(key).or_insert(r);
        }

        for row in &mut self.rows {
            let key = (row.project_id.clone(), row.ecosystem_key.clone());
            let Some(&r) = lookup.get(&key) else {
                continue;
            };
            row.lat = row.lat.or_else(|| number(coords, r, lat_col));
            row.lon = row.lon.or_else(|| number(coords, r, lon_col));
            row.region = row.region.take().or_else(|| text(coords, r, region_col));
            row.priority = row.priority.or_else(|| number(coords, r, priority_col));
        }

        Ok(self)
    }

    pub fn for_project(&self, project_id: &str) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|r| r.project_id.as_deref() == Some(project_id))
                .cloned()
                .collect(),
        }
    }

    /// Distinct ecosystems by slug, first spelling seen, in arrival order.
    pub fn ecosystems(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter(|r| seen.insert(r.ecosystem_key.clone()))
            .map(|r| r.ecosystem.clone())
            .collect()
    }

    /// Per-ecosystem totals and shares, restricted to `selection` when given
    /// (names are matched by slug). Percentages are always relative to the
    /// selected rows only.
    pub fn breakdown(&self, selection: Option<&[&str]>) -> Vec<EcosystemBreakdown> {
        let selected: Option<HashSet<String>> =
            selection.map(|names| names.iter().map(|n| slug_ecosystem(n)).collect());

        let mut groups: Vec<EcosystemBreakdown> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for row in &self.rows {
            if let Some(sel) = &selected {
                if !sel.contains(&row.ecosystem_key) {
                    continue;
                }
            }
            let pos = *positions.entry(&row.ecosystem_key).or_insert_with(|| {
                groups.push(EcosystemBreakdown {
                    ecosystem: row.ecosystem.clone(),
                    ecosystem_key: row.ecosystem_key.clone(),
                    total_ha: 0.0,
                    share_of_selection: 0.0,
                    levels: Vec::new(),
                });
                groups.len() - 1
            });
            let group = &mut groups[pos];
            group.total_ha += row.area_ha;
            group.levels.push(LevelShare {
                level: row.level.clone(),
                area_ha: row.area_ha,
                percent: 0.0,
                region: row.region.clone(),
            });
        }

        let grand_total: f64 = groups.iter().map(|g| g.total_ha).sum();
        for group in &mut groups {
            group.share_of_selection = ratio_percent(group.total_ha, grand_total);
            for share in &mut group.levels {
                share.percent = ratio_percent(share.area_ha, group.total_ha);
            }
        }

        groups
    }

    /// One priority score per (project, ecosystem), first occurrence wins.
    pub fn priorities(&self) -> Vec<EcosystemPriority> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter_map(|r| {
                let priority = r.priority?;
                seen.insert((r.project_id.clone(), r.ecosystem_key.clone()))
                    .then(|| EcosystemPriority {
                        project_id: r.project_id.clone(),
                        ecosystem: r.ecosystem.clone(),
                        priority,
                    })
            })
            .collect()
    }
}

/// `part / total * 100`, or 0 when the total is zero.
fn ratio_percent(part: f64, total: f64) -> f64 {
    if total == 0.0 {
        0.0
    } else {
        part / total * 100.0
    }
}
