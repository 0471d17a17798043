use serde::Serialize;
use tracing::debug;

use crate::context::AppContext;
use crate::error::Result;
use crate::metrics::{self, RecordFilter};
use crate::models::{
    AgeGroupTenure, Distribution, EmployeeRecord, GroupCount, HeatmapCell, ManagementImpact, NumericField,
    PersonalityTrait, TraitCorrelation,
};
use crate::risk::RiskModel;
use crate::survival::{self, SurvivalCurve};

pub const DEFAULT_SURVIVAL_PROFESSIONS: usize = 3;
pub const SURVIVAL_CHECKPOINTS: [f64; 4] = [12.0, 24.0, 36.0, 60.0];
pub const TOP_RISK_GROUPS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Overview,
    Survival,
    Risk,
    Recommendations,
}

impl Page {
    pub fn title(self) -> &'static str {
        match self {
            Page::Overview => "Overview",
            Page::Survival => "Survival Analysis",
            Page::Risk => "Risk Analysis",
            Page::Recommendations => "Recommendations",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewPage {
    pub total_employees: usize,
    pub average_tenure: Option<f64>,
    pub turnover_rate_pct: Option<f64>,
    pub average_age: Option<f64>,
    pub age_by_profession: Vec<Distribution>,
    pub tenure_by_profession: Vec<Distribution>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SurvivalPage {
    pub checkpoints: Vec<f64>,
    pub curves: Vec<SurvivalCurve>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskPage {
    /// Absent when the dataset has no rows to score.
    pub model: Option<RiskModel>,
    pub scored: usize,
    pub high_risk: usize,
    pub heatmap: Vec<HeatmapCell>,
    pub high_risk_by_profession: Vec<GroupCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationCategory {
    pub title: &'static str,
    pub items: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationsPage {
    pub age_groups: Vec<AgeGroupTenure>,
    pub trait_correlations: Vec<TraitCorrelation>,
    pub management_impact: Vec<ManagementImpact>,
    pub top_high_risk_groups: Vec<GroupCount>,
    pub observations: Vec<&'static str>,
    pub recommendations: Vec<RecommendationCategory>,
}

/// Reference values come from the full table; an empty table has none.
fn full_table_model(records: &[EmployeeRecord]) -> Result<Option<RiskModel>> {
    if records.is_empty() {
        return Ok(None);
    }
    RiskModel::from_records(records).map(Some)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn overview(ctx: &AppContext, filter: &RecordFilter) -> Result<OverviewPage> {
    let dataset = ctx.dataset()?;
    let records = filter.apply(&dataset.records);
    debug!(page = Page::Overview.title(), rows = records.len(), "building page");

    Ok(OverviewPage {
        total_employees: metrics::total_count(&records),
        average_tenure: metrics::mean_tenure(&records).map(round1),
        turnover_rate_pct: metrics::turnover_rate(&records).map(|rate| round1(rate * 100.0)),
        average_age: metrics::mean_age(&records).map(round1),
        age_by_profession: metrics::distribution_by_profession(&records, NumericField::Age),
        tenure_by_profession: metrics::distribution_by_profession(&records, NumericField::Tenure),
    })
}

/// Curves for the filter's professions, or the first few professions in file
/// order when none are named.
pub fn survival(ctx: &AppContext, filter: &RecordFilter) -> Result<SurvivalPage> {
    let dataset = ctx.dataset()?;
    let records = filter.apply(&dataset.records);
    let professions: Vec<String> = if filter.professions.is_empty() {
        metrics::distinct_professions(&records)
            .into_iter()
            .take(DEFAULT_SURVIVAL_PROFESSIONS)
            .collect()
    } else {
        filter.professions.clone()
    };
    debug!(page = Page::Survival.title(), professions = ?professions, "building page");

    Ok(SurvivalPage {
        checkpoints: SURVIVAL_CHECKPOINTS.to_vec(),
        curves: survival::curves_by_profession(ctx.estimator(), &records, &professions),
    })
}

pub fn risk(ctx: &AppContext, filter: &RecordFilter) -> Result<RiskPage> {
    let dataset = ctx.dataset()?;
    let model = full_table_model(&dataset.records)?;
    let records = filter.apply(&dataset.records);
    debug!(
        page = Page::Risk.title(),
        rows = records.len(),
        threshold = ?model.map(|m| m.threshold),
        "building page"
    );

    let Some(model) = model else {
        return Ok(RiskPage {
            model: None,
            scored: records.len(),
            high_risk: 0,
            heatmap: Vec::new(),
            high_risk_by_profession: Vec::new(),
        });
    };

    Ok(RiskPage {
        model: Some(model),
        scored: records.len(),
        high_risk: model.high_risk_set(&records).len(),
        heatmap: model.heatmap(&records),
        high_risk_by_profession: model.high_risk_by_profession(&records),
    })
}

pub fn recommendations(ctx: &AppContext, filter: &RecordFilter) -> Result<RecommendationsPage> {
    let dataset = ctx.dataset()?;
    let model = full_table_model(&dataset.records)?;
    let records = filter.apply(&dataset.records);
    debug!(page = Page::Recommendations.title(), rows = records.len(), "building page");

    Ok(RecommendationsPage {
        age_groups: metrics::grouped_tenure_stats(&records),
        trait_correlations: metrics::correlation_with_tenure(&records, &PersonalityTrait::ALL),
        management_impact: metrics::management_impact(&records),
        top_high_risk_groups: model
            .map(|model| model.top_high_risk_groups(&records, TOP_RISK_GROUPS))
            .unwrap_or_default(),
        observations: OBSERVATIONS.to_vec(),
        recommendations: RECOMMENDATIONS
            .iter()
            .map(|&(title, items)| RecommendationCategory {
                title,
                items: items.to_vec(),
            })
            .collect(),
    })
}

const OBSERVATIONS: [&str; 3] = [
    "Banks HR employees tend to stay longer.",
    "Manufacturing HR tend to leave early.",
    "Retail HR and IT can leave after 3 years.",
];

const RECOMMENDATIONS: [(&str, [&str; 3]); 4] = [
    (
        "Age-Based Initiatives",
        [
            "Implement mentorship programs for employees under 30",
            "Create career development paths for mid-career professionals (30-40)",
            "Develop knowledge transfer programs leveraging experienced employees (40+)",
        ],
    ),
    (
        "Personality-Based Strategies",
        [
            "Provide additional support for employees with high anxiety scores",
            "Create autonomous work opportunities for independent personalities",
            "Design team structures that balance different personality types",
        ],
    ),
    (
        "Management Improvements",
        [
            "Expand coaching programs based on positive retention impact",
            "Implement regular feedback sessions",
            "Provide management training focused on retention strategies",
        ],
    ),
    (
        "Industry-Specific Actions",
        [
            "Develop industry-specific retention programs",
            "Address unique challenges in high-turnover industries",
            "Create competitive compensation packages based on industry standards",
        ],
    ),
];
