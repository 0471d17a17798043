//! Survival curves per profession.
//!
//! The estimator sits behind [`SurvivalEstimator`] so the pages only ever see
//! step functions. [`KaplanMeier`] is the product-limit default.

use serde::Serialize;

use crate::models::EmployeeRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurvivalPoint {
    pub time: f64,
    pub survival: f64,
    pub at_risk: usize,
    pub events: usize,
}

/// Right-continuous step function starting at (0, 1.0).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurvivalCurve {
    pub label: String,
    pub observations: usize,
    pub events: usize,
    pub points: Vec<SurvivalPoint>,
}

impl SurvivalCurve {
    pub fn survival_at(&self, time: f64) -> f64 {
        self.points
            .iter()
            .take_while(|point| point.time <= time)
            .last()
            .map(|point| point.survival)
            .unwrap_or(1.0)
    }

    /// First time at which survival drops to one half or below.
    pub fn median_survival(&self) -> Option<f64> {
        self.points
            .iter()
            .find(|point| point.survival <= 0.5)
            .map(|point| point.time)
    }
}

pub trait SurvivalEstimator {
    fn estimate(&self, label: &str, durations: &[f64], observed: &[bool]) -> SurvivalCurve;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KaplanMeier;

impl SurvivalEstimator for KaplanMeier {
    fn estimate(&self, label: &str, durations: &[f64], observed: &[bool]) -> SurvivalCurve {
        let mut data: Vec<(f64, bool)> = durations
            .iter()
            .copied()
            .zip(observed.iter().copied())
            .filter(|(time, _)| !time.is_nan())
            .collect();
        data.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = data.len();
        let total_events = data.iter().filter(|(_, event)| *event).count();
        let mut points = vec![SurvivalPoint {
            time: 0.0,
            survival: 1.0,
            at_risk: n,
            events: 0,
        }];

        let mut survival = 1.0f64;
        let mut i = 0;
        while i < n {
            let time = data[i].0;
            let at_risk = n - i;
            let mut events = 0usize;
            let mut j = i;
            while j < n && data[j].0 == time {
                if data[j].1 {
                    events += 1;
                }
                j += 1;
            }
            survival *= 1.0 - events as f64 / at_risk as f64;

            if time == 0.0 {
                // fold ties at zero into the origin
                points[0] = SurvivalPoint {
                    time,
                    survival,
                    at_risk,
                    events,
                };
            } else {
                points.push(SurvivalPoint {
                    time,
                    survival,
                    at_risk,
                    events,
                });
            }
            i = j;
        }

        SurvivalCurve {
            label: label.to_string(),
            observations: n,
            events: total_events,
            points,
        }
    }
}

/// One curve per profession, in the order given.
pub fn curves_by_profession(
    estimator: &dyn SurvivalEstimator,
    records: &[EmployeeRecord],
    professions: &[String],
) -> Vec<SurvivalCurve> {
    professions
        .iter()
        .map(|profession| {
            let (durations, observed): (Vec<f64>, Vec<bool>) = records
                .iter()
                .filter(|record| &record.profession == profession)
                .map(|record| (record.tenure_months, record.turnover))
                .unzip();
            estimator.estimate(profession, &durations, &observed)
        })
        .collect()
}
