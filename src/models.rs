use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Five fixed age buckets, each closed on the right: (0,25], (25,30], (30,35],
/// (35,40], (40,100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AgeGroup {
    #[serde(rename = "<25")]
    Under25,
    #[serde(rename = "25-30")]
    From25To30,
    #[serde(rename = "30-35")]
    From30To35,
    #[serde(rename = "35-40")]
    From35To40,
    #[serde(rename = "40+")]
    Over40,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 5] = [
        AgeGroup::Under25,
        AgeGroup::From25To30,
        AgeGroup::From30To35,
        AgeGroup::From35To40,
        AgeGroup::Over40,
    ];

    /// Lower (exclusive) and upper (inclusive) bound in years.
    pub fn bounds(self) -> (f64, f64) {
        match self {
            AgeGroup::Under25 => (0.0, 25.0),
            AgeGroup::From25To30 => (25.0, 30.0),
            AgeGroup::From30To35 => (30.0, 35.0),
            AgeGroup::From35To40 => (35.0, 40.0),
            AgeGroup::Over40 => (40.0, 100.0),
        }
    }

    pub fn contains(self, age: f64) -> bool {
        let (lower, upper) = self.bounds();
        age > lower && age <= upper
    }

    /// Ages outside (0, 100], and NaN, are unclassified.
    pub fn from_age(age: f64) -> Option<AgeGroup> {
        AgeGroup::ALL.into_iter().find(|group| group.contains(age))
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeGroup::Under25 => "<25",
            AgeGroup::From25To30 => "25-30",
            AgeGroup::From30To35 => "30-35",
            AgeGroup::From35To40 => "35-40",
            AgeGroup::Over40 => "40+",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeRecord {
    pub tenure_months: f64,
    pub turnover: bool,
    pub age: f64,
    pub age_group: Option<AgeGroup>,
    pub profession: String,
    pub industry: String,
    pub anxiety: f64,
    pub extraversion: f64,
    pub independence: f64,
    pub self_control: f64,
    pub novelty_seeking: f64,
    pub head_gender: String,
    pub coach: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub source: PathBuf,
    pub records: Vec<EmployeeRecord>,
}

/// Personality traits that can be correlated against tenure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalityTrait {
    Extraversion,
    Independence,
    SelfControl,
    Anxiety,
    NoveltySeeking,
}

impl PersonalityTrait {
    pub const ALL: [PersonalityTrait; 5] = [
        PersonalityTrait::Extraversion,
        PersonalityTrait::Independence,
        PersonalityTrait::SelfControl,
        PersonalityTrait::Anxiety,
        PersonalityTrait::NoveltySeeking,
    ];

    pub fn value(self, record: &EmployeeRecord) -> f64 {
        match self {
            PersonalityTrait::Extraversion => record.extraversion,
            PersonalityTrait::Independence => record.independence,
            PersonalityTrait::SelfControl => record.self_control,
            PersonalityTrait::Anxiety => record.anxiety,
            PersonalityTrait::NoveltySeeking => record.novelty_seeking,
        }
    }

    /// Column name in the source file.
    pub fn column(self) -> &'static str {
        match self {
            PersonalityTrait::Extraversion => "extraversion",
            PersonalityTrait::Independence => "independ",
            PersonalityTrait::SelfControl => "selfcontrol",
            PersonalityTrait::Anxiety => "anxiety",
            PersonalityTrait::NoveltySeeking => "novator",
        }
    }
}

/// Numeric field summarised per profession on the overview page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    Age,
    Tenure,
}

impl NumericField {
    pub fn value(self, record: &EmployeeRecord) -> f64 {
        match self {
            NumericField::Age => record.age,
            NumericField::Tenure => record.tenure_months,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeGroupTenure {
    pub age_group: AgeGroup,
    pub mean: f64,
    pub count: usize,
    pub std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraitCorrelation {
    pub personality_trait: PersonalityTrait,
    pub correlation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManagementImpact {
    pub head_gender: String,
    pub coach: String,
    pub mean_tenure: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub profession: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell {
    pub profession: String,
    pub industry: String,
    pub mean_risk: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub profession: String,
    pub industry: Option<String>,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bucket_boundaries_are_right_closed() {
        assert_eq!(AgeGroup::from_age(0.0), None);
        assert_eq!(AgeGroup::from_age(25.0), Some(AgeGroup::Under25));
        assert_eq!(AgeGroup::from_age(25.0001), Some(AgeGroup::From25To30));
        assert_eq!(AgeGroup::from_age(40.0), Some(AgeGroup::From35To40));
        assert_eq!(AgeGroup::from_age(100.0), Some(AgeGroup::Over40));
        assert_eq!(AgeGroup::from_age(101.0), None);
        assert_eq!(AgeGroup::from_age(-3.0), None);
        assert_eq!(AgeGroup::from_age(f64::NAN), None);
    }

    #[test]
    fn labels_match_source_categories() {
        let labels: Vec<&str> = AgeGroup::ALL.iter().map(|g| g.label()).collect();
        assert_eq!(labels, vec!["<25", "25-30", "30-35", "35-40", "40+"]);
        assert_eq!(AgeGroup::From30To35.to_string(), "30-35");
    }

    proptest! {
        #[test]
        fn prop_every_valid_age_lands_in_exactly_one_bucket(age in 0.0001f64..=100.0) {
            let hits = AgeGroup::ALL.iter().filter(|g| g.contains(age)).count();
            prop_assert_eq!(hits, 1);
            prop_assert!(AgeGroup::from_age(age).is_some());
        }

        #[test]
        fn prop_out_of_range_ages_are_unclassified(age in prop_oneof![-500.0f64..=0.0, 100.0001f64..500.0]) {
            prop_assert_eq!(AgeGroup::from_age(age), None);
        }
    }
}
