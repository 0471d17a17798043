use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::context::AppContext;
use crate::error::Result;
use crate::metrics::RecordFilter;
use crate::models::{Distribution, GroupCount};
use crate::pages::{
    self, OverviewPage, Page, RecommendationsPage, RiskPage, SurvivalPage,
};

const BAR_WIDTH: usize = 30;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub scope: String,
    pub overview: OverviewPage,
    pub survival: SurvivalPage,
    pub risk: RiskPage,
    pub recommendations: RecommendationsPage,
}

pub fn build_report(ctx: &AppContext, filter: &RecordFilter) -> Result<Report> {
    let source = ctx.dataset()?.source.display().to_string();
    Ok(Report {
        generated_at: Utc::now(),
        source,
        scope: scope_label(filter),
        overview: pages::overview(ctx, filter)?,
        survival: pages::survival(ctx, filter)?,
        risk: pages::risk(ctx, filter)?,
        recommendations: pages::recommendations(ctx, filter)?,
    })
}

pub fn scope_label(filter: &RecordFilter) -> String {
    if filter.is_empty() {
        return "all employees".to_string();
    }
    let mut parts = Vec::new();
    if !filter.professions.is_empty() {
        parts.push(format!("professions {}", filter.professions.join(", ")));
    }
    if !filter.industries.is_empty() {
        parts.push(format!("industries {}", filter.industries.join(", ")));
    }
    parts.join("; ")
}

pub fn render_report(report: &Report) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Employee Retention Report");
    let _ = writeln!(
        output,
        "Generated {} from {} for {}",
        report.generated_at.format("%Y-%m-%d %H:%M UTC"),
        report.source,
        report.scope
    );
    let _ = writeln!(output);
    output.push_str(&render_overview(&report.overview));
    let _ = writeln!(output);
    output.push_str(&render_survival(&report.survival));
    let _ = writeln!(output);
    output.push_str(&render_risk(&report.risk));
    let _ = writeln!(output);
    output.push_str(&render_recommendations(&report.recommendations));
    output
}

fn optional(value: Option<f64>, suffix: &str) -> String {
    match value {
        Some(value) => format!("{value:.1}{suffix}"),
        None => "n/a".to_string(),
    }
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || !value.is_finite() {
        return String::new();
    }
    let filled = ((value / max) * BAR_WIDTH as f64).round().max(0.0) as usize;
    "█".repeat(filled.min(BAR_WIDTH))
}

fn write_distribution(output: &mut String, heading: &str, rows: &[Distribution]) {
    let _ = writeln!(output, "### {heading}");
    if rows.is_empty() {
        let _ = writeln!(output, "No employees in scope.");
        return;
    }
    let _ = writeln!(output, "| Profession | n | min | Q1 | median | Q3 | max |");
    let _ = writeln!(output, "|---|---:|---:|---:|---:|---:|---:|");
    for row in rows {
        let _ = writeln!(
            output,
            "| {} | {} | {:.1} | {:.1} | {:.1} | {:.1} | {:.1} |",
            row.profession, row.count, row.min, row.q1, row.median, row.q3, row.max
        );
    }
}

pub fn render_overview(page: &OverviewPage) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "## {}", Page::Overview.title());
    let _ = writeln!(output, "- Total Employees: {}", page.total_employees);
    let _ = writeln!(
        output,
        "- Average Tenure (months): {}",
        optional(page.average_tenure, "")
    );
    let _ = writeln!(
        output,
        "- Turnover Rate: {}",
        optional(page.turnover_rate_pct, "%")
    );
    let _ = writeln!(output, "- Avg Employee Age: {}", optional(page.average_age, ""));
    let _ = writeln!(output);
    write_distribution(&mut output, "Age Distribution by Department", &page.age_by_profession);
    let _ = writeln!(output);
    write_distribution(
        &mut output,
        "Tenure Analysis by Department",
        &page.tenure_by_profession,
    );
    output
}

pub fn render_survival(page: &SurvivalPage) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "## {}", Page::Survival.title());
    if page.curves.is_empty() {
        let _ = writeln!(output, "No professions selected.");
        return output;
    }

    let _ = write!(output, "| Profession | n | left |");
    for checkpoint in &page.checkpoints {
        let _ = write!(output, " S({checkpoint:.0}m) |");
    }
    let _ = writeln!(output, " median (months) |");
    let _ = write!(output, "|---|---:|---:|");
    for _ in &page.checkpoints {
        let _ = write!(output, "---:|");
    }
    let _ = writeln!(output, "---:|");

    for curve in &page.curves {
        let _ = write!(
            output,
            "| {} | {} | {} |",
            curve.label, curve.observations, curve.events
        );
        for &checkpoint in &page.checkpoints {
            let _ = write!(output, " {:.3} |", curve.survival_at(checkpoint));
        }
        let median = curve
            .median_survival()
            .map(|time| format!("{time:.1}"))
            .unwrap_or_else(|| "not reached".to_string());
        let _ = writeln!(output, " {median} |");
    }
    output
}

pub fn render_risk(page: &RiskPage) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "## {}", Page::Risk.title());
    match &page.model {
        Some(model) => {
            let _ = writeln!(
                output,
                "Mean anxiety {:.3}, high-risk threshold (90th percentile) {:.2}. {} of {} employees in scope are high risk.",
                model.mean_anxiety, model.threshold, page.high_risk, page.scored
            );
        }
        None => {
            let _ = writeln!(output, "No employees to score.");
        }
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "### Risk Heatmap by Profession and Industry");

    if page.heatmap.is_empty() {
        let _ = writeln!(output, "No employees in scope.");
    } else {
        let industries: BTreeSet<&str> = page
            .heatmap
            .iter()
            .map(|cell| cell.industry.as_str())
            .collect();
        let mut rows: BTreeMap<&str, BTreeMap<&str, f64>> = BTreeMap::new();
        for cell in &page.heatmap {
            rows.entry(cell.profession.as_str())
                .or_default()
                .insert(cell.industry.as_str(), cell.mean_risk);
        }

        let _ = write!(output, "| Profession |");
        for industry in &industries {
            let _ = write!(output, " {industry} |");
        }
        let _ = writeln!(output);
        let _ = write!(output, "|---|");
        for _ in &industries {
            let _ = write!(output, "---:|");
        }
        let _ = writeln!(output);

        for (profession, cells) in &rows {
            let _ = write!(output, "| {profession} |");
            for industry in &industries {
                match cells.get(industry) {
                    Some(value) => {
                        let _ = write!(output, " {value:.2} |");
                    }
                    None => {
                        let _ = write!(output, " - |");
                    }
                }
            }
            let _ = writeln!(output);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "### High-Risk Employees by Profession");
    write_counts(&mut output, &page.high_risk_by_profession);
    output
}

fn write_counts(output: &mut String, counts: &[GroupCount]) {
    if counts.is_empty() {
        let _ = writeln!(output, "No high-risk employees in scope.");
        return;
    }
    let max = counts.iter().map(|group| group.count).max().unwrap_or(0) as f64;
    for group in counts {
        let label = match &group.industry {
            Some(industry) => format!("{} / {}", group.profession, industry),
            None => group.profession.clone(),
        };
        let _ = writeln!(
            output,
            "- {label}: {} {}",
            group.count,
            bar(group.count as f64, max)
        );
    }
}

pub fn render_recommendations(page: &RecommendationsPage) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "## Recommendations Based on Analysis");

    let _ = writeln!(output, "### Age Group Analysis");
    if page.age_groups.is_empty() {
        let _ = writeln!(output, "No employees in scope.");
    } else {
        let _ = writeln!(output, "| Age group | mean tenure | count | std |");
        let _ = writeln!(output, "|---|---:|---:|---:|");
        for group in &page.age_groups {
            let _ = writeln!(
                output,
                "| {} | {:.2} | {} | {:.2} |",
                group.age_group, group.mean, group.count, group.std
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "### Personality Traits Correlation with Tenure");
    for correlation in &page.trait_correlations {
        let magnitude = bar(correlation.correlation.abs(), 1.0);
        let _ = writeln!(
            output,
            "- {}: {:.3} {}",
            correlation.personality_trait.column(),
            correlation.correlation,
            magnitude
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "### Management Style Impact on Tenure");
    if page.management_impact.is_empty() {
        let _ = writeln!(output, "No employees in scope.");
    } else {
        let _ = writeln!(output, "| Head gender | Coach | mean tenure |");
        let _ = writeln!(output, "|---|---|---:|");
        for row in &page.management_impact {
            let _ = writeln!(
                output,
                "| {} | {} | {:.2} |",
                row.head_gender, row.coach, row.mean_tenure
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "### High Risk Groups (Top 10%)");
    write_counts(&mut output, &page.top_high_risk_groups);

    let _ = writeln!(output);
    let _ = writeln!(output, "### Observations Based on Data");
    for observation in &page.observations {
        let _ = writeln!(output, "- {observation}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "### Detailed Recommendations");
    for category in &page.recommendations {
        let _ = writeln!(output, "**{}:**", category.title);
        for item in &category.items {
            let _ = writeln!(output, "- {item}");
        }
    }

    output
}
