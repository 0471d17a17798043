use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::models::{
    AgeGroup, AgeGroupTenure, Distribution, EmployeeRecord, ManagementImpact, NumericField,
    PersonalityTrait, TraitCorrelation,
};

/// Narrows the table to a set of professions and industries. Empty lists
/// accept everything.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub professions: Vec<String>,
    pub industries: Vec<String>,
}

impl RecordFilter {
    pub fn is_empty(&self) -> bool {
        self.professions.is_empty() && self.industries.is_empty()
    }

    pub fn matches(&self, record: &EmployeeRecord) -> bool {
        (self.professions.is_empty() || self.professions.contains(&record.profession))
            && (self.industries.is_empty() || self.industries.contains(&record.industry))
    }

    pub fn apply(&self, records: &[EmployeeRecord]) -> Vec<EmployeeRecord> {
        records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect()
    }
}

pub fn total_count(records: &[EmployeeRecord]) -> usize {
    records.len()
}

pub fn mean_tenure(records: &[EmployeeRecord]) -> Option<f64> {
    mean(records.iter().map(|record| record.tenure_months))
}

pub fn turnover_rate(records: &[EmployeeRecord]) -> Option<f64> {
    mean(records.iter().map(|record| if record.turnover { 1.0 } else { 0.0 }))
}

pub fn mean_age(records: &[EmployeeRecord]) -> Option<f64> {
    mean(records.iter().map(|record| record.age))
}

pub fn mean_anxiety(records: &[EmployeeRecord]) -> Option<f64> {
    mean(records.iter().map(|record| record.anxiety))
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Sample standard deviation (n - 1 denominator). NaN below two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let squares: f64 = values.iter().map(|value| (value - mean).powi(2)).sum();
    (squares / (values.len() - 1) as f64).sqrt()
}

/// Quantile with linear interpolation between the two closest ranks.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(quantile_sorted(&sorted, q))
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let position = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn grouped_tenure_stats(records: &[EmployeeRecord]) -> Vec<AgeGroupTenure> {
    let mut groups: BTreeMap<AgeGroup, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let Some(group) = record.age_group {
            groups.entry(group).or_default().push(record.tenure_months);
        }
    }

    groups
        .into_iter()
        .map(|(age_group, tenures)| AgeGroupTenure {
            age_group,
            mean: round2(tenures.iter().sum::<f64>() / tenures.len() as f64),
            count: tenures.len(),
            std: round2(sample_std(&tenures)),
        })
        .collect()
}

/// Pearson correlation. NaN when either side is constant or fewer than two
/// pairs are given.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return f64::NAN;
    }
    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs[..n].iter().zip(&ys[..n]) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    covariance / (var_x.sqrt() * var_y.sqrt())
}

/// Correlation of each trait against tenure, strongest positive first.
/// Undefined correlations sort last.
pub fn correlation_with_tenure(
    records: &[EmployeeRecord],
    traits: &[PersonalityTrait],
) -> Vec<TraitCorrelation> {
    let tenures: Vec<f64> = records.iter().map(|record| record.tenure_months).collect();

    let mut correlations: Vec<TraitCorrelation> = traits
        .iter()
        .map(|&personality_trait| {
            let values: Vec<f64> = records
                .iter()
                .map(|record| personality_trait.value(record))
                .collect();
            TraitCorrelation {
                personality_trait,
                correlation: pearson(&values, &tenures),
            }
        })
        .collect();

    correlations.sort_by(|a, b| descending_nan_last(a.correlation, b.correlation));
    correlations
}

fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

pub fn management_impact(records: &[EmployeeRecord]) -> Vec<ManagementImpact> {
    let mut groups: BTreeMap<(String, String), (f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = groups
            .entry((record.head_gender.clone(), record.coach.clone()))
            .or_insert((0.0, 0));
        entry.0 += record.tenure_months;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|((head_gender, coach), (total, count))| ManagementImpact {
            head_gender,
            coach,
            mean_tenure: round2(total / count as f64),
        })
        .collect()
}

/// Five-number summary of a field per profession, professions in sorted order.
pub fn distribution_by_profession(
    records: &[EmployeeRecord],
    field: NumericField,
) -> Vec<Distribution> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.profession.as_str())
            .or_default()
            .push(field.value(record));
    }

    groups
        .into_iter()
        .map(|(profession, mut values)| {
            values.sort_by(|a, b| a.total_cmp(b));
            Distribution {
                profession: profession.to_string(),
                count: values.len(),
                min: values[0],
                q1: quantile_sorted(&values, 0.25),
                median: quantile_sorted(&values, 0.5),
                q3: quantile_sorted(&values, 0.75),
                max: values[values.len() - 1],
            }
        })
        .collect()
}

/// Professions in order of first appearance.
pub fn distinct_professions(records: &[EmployeeRecord]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for record in records {
        if !seen.contains(&record.profession) {
            seen.push(record.profession.clone());
        }
    }
    seen
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(age: f64, tenure: f64, anxiety: f64, turnover: bool) -> EmployeeRecord {
        EmployeeRecord {
            tenure_months: tenure,
            turnover,
            age,
            age_group: AgeGroup::from_age(age),
            profession: "HR".to_string(),
            industry: "Banks".to_string(),
            anxiety,
            extraversion: 5.0,
            independence: 5.0,
            self_control: 5.0,
            novelty_seeking: 5.0,
            head_gender: "m".to_string(),
            coach: "no".to_string(),
        }
    }

    pub(crate) fn scenario() -> Vec<EmployeeRecord> {
        vec![
            record(20.0, 5.0, 10.0, true),
            record(32.0, 20.0, 2.0, false),
            record(45.0, 60.0, 2.0, true),
        ]
    }

    #[test]
    fn overview_metrics_on_scenario() {
        let records = scenario();
        assert_eq!(total_count(&records), 3);
        assert!((mean_tenure(&records).unwrap() - 85.0 / 3.0).abs() < 1e-9);
        assert!((turnover_rate(&records).unwrap() - 2.0 / 3.0).abs() < 1e-9);
        assert!((mean_age(&records).unwrap() - 97.0 / 3.0).abs() < 1e-9);
        assert!((mean_anxiety(&records).unwrap() - 4.667).abs() < 1e-3);
    }

    #[test]
    fn means_of_empty_table_are_undefined() {
        assert_eq!(mean_tenure(&[]), None);
        assert_eq!(turnover_rate(&[]), None);
        assert_eq!(total_count(&[]), 0);
    }

    #[test]
    fn turnover_rate_stays_within_unit_interval() {
        let all_left: Vec<_> = (0..4).map(|_| record(30.0, 1.0, 1.0, true)).collect();
        let none_left: Vec<_> = (0..4).map(|_| record(30.0, 1.0, 1.0, false)).collect();
        assert_eq!(turnover_rate(&all_left), Some(1.0));
        assert_eq!(turnover_rate(&none_left), Some(0.0));
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.5), Some(2.5));
        assert!((quantile(&values, 0.9).unwrap() - 3.7).abs() < 1e-12);
        assert_eq!(quantile(&values, 0.0), Some(1.0));
        assert_eq!(quantile(&values, 1.0), Some(4.0));
        assert_eq!(quantile(&[], 0.9), None);
    }

    #[test]
    fn grouped_stats_follow_bucket_order_and_round() {
        let records = vec![
            record(45.0, 10.0, 1.0, false),
            record(22.0, 1.0, 1.0, false),
            record(23.0, 2.0, 1.0, false),
            record(24.0, 4.0, 1.0, false),
            record(150.0, 99.0, 1.0, false),
        ];
        let stats = grouped_tenure_stats(&records);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].age_group, AgeGroup::Under25);
        assert_eq!(stats[0].count, 3);
        assert_eq!(stats[0].mean, 2.33);
        assert_eq!(stats[0].std, 1.53);
        assert_eq!(stats[1].age_group, AgeGroup::Over40);
        assert_eq!(stats[1].count, 1);
        assert!(stats[1].std.is_nan());
    }

    #[test]
    fn empty_filtered_subset_yields_empty_aggregates() {
        let records = scenario();
        let filter = RecordFilter {
            professions: vec!["Astronaut".to_string()],
            industries: Vec::new(),
        };
        let subset = filter.apply(&records);
        assert!(subset.is_empty());
        assert!(grouped_tenure_stats(&subset).is_empty());
        assert!(management_impact(&subset).is_empty());
        assert!(distribution_by_profession(&subset, NumericField::Age).is_empty());
    }

    #[test]
    fn correlations_sort_descending_with_undefined_last() {
        let mut records = scenario();
        for (record, value) in records.iter_mut().zip([1.0, 2.0, 3.0]) {
            record.extraversion = value;
            record.independence = -value;
        }
        let correlations = correlation_with_tenure(&records, &PersonalityTrait::ALL);
        assert_eq!(correlations.len(), 5);
        assert_eq!(
            correlations[0].personality_trait,
            PersonalityTrait::Extraversion
        );
        assert!(correlations[0].correlation > 0.9);

        let defined: Vec<_> = correlations
            .iter()
            .filter(|c| !c.correlation.is_nan())
            .collect();
        let last_defined = defined.last().unwrap();
        assert_eq!(last_defined.personality_trait, PersonalityTrait::Independence);
        // self-control and novelty seeking are constant
        assert!(correlations[3].correlation.is_nan());
        assert!(correlations[4].correlation.is_nan());
    }

    #[test]
    fn pearson_of_perfect_line_is_one() {
        assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 1.0).abs() < 1e-12);
        assert!(pearson(&[1.0, 1.0, 1.0], &[2.0, 4.0, 6.0]).is_nan());
        assert!(pearson(&[1.0], &[2.0]).is_nan());
    }

    #[test]
    fn management_impact_groups_by_gender_and_coach() {
        let mut records = scenario();
        records[0].coach = "yes".to_string();
        records[1].head_gender = "f".to_string();
        let impact = management_impact(&records);
        assert_eq!(
            impact,
            vec![
                ManagementImpact {
                    head_gender: "f".to_string(),
                    coach: "no".to_string(),
                    mean_tenure: 20.0,
                },
                ManagementImpact {
                    head_gender: "m".to_string(),
                    coach: "no".to_string(),
                    mean_tenure: 60.0,
                },
                ManagementImpact {
                    head_gender: "m".to_string(),
                    coach: "yes".to_string(),
                    mean_tenure: 5.0,
                },
            ]
        );
    }

    #[test]
    fn distribution_summarises_each_profession() {
        let mut records = scenario();
        records[2].profession = "IT".to_string();
        let summary = distribution_by_profession(&records, NumericField::Tenure);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].profession, "HR");
        assert_eq!(summary[0].count, 2);
        assert_eq!(summary[0].min, 5.0);
        assert_eq!(summary[0].median, 12.5);
        assert_eq!(summary[0].max, 20.0);
        assert_eq!(summary[1].q1, 60.0);
    }

    #[test]
    fn distinct_professions_keep_first_appearance_order() {
        let mut records = scenario();
        records[0].profession = "IT".to_string();
        records.push(record(30.0, 1.0, 1.0, false));
        assert_eq!(distinct_professions(&records), vec!["IT", "HR"]);
    }
}
