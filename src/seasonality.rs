use crate::schema::CashFlowPoint;
use crate::stats::{group_by, mean};
use chrono::{Datelike, NaiveDate, Weekday};

/// Multiplicative day-of-week factors derived from history: the average for
/// each weekday divided by the overall average. Indexed 0 = Monday through
/// 6 = Sunday.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekdayFactors {
    factors: [f64; 7],
}

impl WeekdayFactors {
    /// Weekdays never observed in history stay at the neutral 1.0, as does
    /// every weekday when the overall average is zero (no meaningful ratio).
    pub fn from_history(points: &[CashFlowPoint]) -> Self {
        let mut factors = [1.0; 7];

        let amounts: Vec<f64> = points.iter().map(|p| p.amount).collect();
        let overall = mean(&amounts);
        if overall == 0.0 {
            return Self { factors };
        }

        for (weekday, group) in group_by(points, |p| p.date.weekday()) {
            let group_amounts: Vec<f64> = group.iter().map(|p| p.amount).collect();
            factors[weekday.num_days_from_monday() as usize] = mean(&group_amounts) / overall;
        }

        Self { factors }
    }

    pub fn neutral() -> Self {
        Self { factors: [1.0; 7] }
    }

    pub fn factor_for(&self, date: NaiveDate) -> f64 {
        self.factors[date.weekday().num_days_from_monday() as usize]
    }

    pub fn factor_for_weekday(&self, weekday: Weekday) -> f64 {
        self.factors[weekday.num_days_from_monday() as usize]
    }
}
