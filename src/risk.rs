use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{DashboardError, Result};
use crate::metrics;
use crate::models::{EmployeeRecord, GroupCount, HeatmapCell};

pub const YOUNG_AGE: f64 = 30.0;
pub const SHORT_TENURE_MONTHS: f64 = 12.0;
pub const YOUNG_WEIGHT: f64 = 2.0;
pub const ANXIETY_WEIGHT: f64 = 1.5;
pub const SHORT_TENURE_WEIGHT: f64 = 3.0;
pub const HIGH_RISK_QUANTILE: f64 = 0.9;

pub fn risk_score(record: &EmployeeRecord, mean_anxiety: f64) -> f64 {
    let mut score = 0.0;
    if record.age < YOUNG_AGE {
        score += YOUNG_WEIGHT;
    }
    if record.anxiety > mean_anxiety {
        score += ANXIETY_WEIGHT;
    }
    if record.tenure_months < SHORT_TENURE_MONTHS {
        score += SHORT_TENURE_WEIGHT;
    }
    score
}

/// Reference values for scoring, always taken from the full unfiltered
/// table so that filtered views score records the same way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskModel {
    pub mean_anxiety: f64,
    pub threshold: f64,
}

impl RiskModel {
    pub fn from_records(records: &[EmployeeRecord]) -> Result<Self> {
        let mean_anxiety = metrics::mean_anxiety(records).ok_or_else(|| {
            DashboardError::Computation("cannot score risk on an empty table".to_string())
        })?;
        let scores: Vec<f64> = records
            .iter()
            .map(|record| risk_score(record, mean_anxiety))
            .collect();
        let threshold = metrics::quantile(&scores, HIGH_RISK_QUANTILE).ok_or_else(|| {
            DashboardError::Computation("no risk scores to rank".to_string())
        })?;

        Ok(Self {
            mean_anxiety,
            threshold,
        })
    }

    pub fn score(&self, record: &EmployeeRecord) -> f64 {
        risk_score(record, self.mean_anxiety)
    }

    pub fn is_high_risk(&self, record: &EmployeeRecord) -> bool {
        self.score(record) >= self.threshold
    }

    pub fn high_risk_set<'a>(&self, records: &'a [EmployeeRecord]) -> Vec<&'a EmployeeRecord> {
        records
            .iter()
            .filter(|record| self.is_high_risk(record))
            .collect()
    }

    /// Mean score per (profession, industry) pair present in the records.
    pub fn heatmap(&self, records: &[EmployeeRecord]) -> Vec<HeatmapCell> {
        let mut cells: BTreeMap<(&str, &str), (f64, usize)> = BTreeMap::new();
        for record in records {
            let entry = cells
                .entry((record.profession.as_str(), record.industry.as_str()))
                .or_insert((0.0, 0));
            entry.0 += self.score(record);
            entry.1 += 1;
        }

        cells
            .into_iter()
            .map(|((profession, industry), (total, count))| HeatmapCell {
                profession: profession.to_string(),
                industry: industry.to_string(),
                mean_risk: total / count as f64,
            })
            .collect()
    }

    /// High-risk head count per profession, smallest first.
    pub fn high_risk_by_profession(&self, records: &[EmployeeRecord]) -> Vec<GroupCount> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for record in self.high_risk_set(records) {
            *counts.entry(record.profession.as_str()).or_insert(0) += 1;
        }

        let mut values: Vec<GroupCount> = counts
            .into_iter()
            .map(|(profession, count)| GroupCount {
                profession: profession.to_string(),
                industry: None,
                count,
            })
            .collect();
        values.sort_by(|a, b| a.count.cmp(&b.count));
        values
    }

    /// Largest high-risk (profession, industry) groups, largest first.
    pub fn top_high_risk_groups(&self, records: &[EmployeeRecord], limit: usize) -> Vec<GroupCount> {
        let mut counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
        for record in self.high_risk_set(records) {
            *counts
                .entry((record.profession.as_str(), record.industry.as_str()))
                .or_insert(0) += 1;
        }

        let mut values: Vec<GroupCount> = counts
            .into_iter()
            .map(|((profession, industry), count)| GroupCount {
                profession: profession.to_string(),
                industry: Some(industry.to_string()),
                count,
            })
            .collect();
        values.sort_by(|a, b| b.count.cmp(&a.count));
        values.truncate(limit);
        values
    }
}
