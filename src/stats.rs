use crate::schema::{CashFlowPoint, RegressionModel};
use std::collections::HashMap;
use std::hash::Hash;

/// Arithmetic mean. Empty input yields 0.0.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divide by n, not n-1). Empty input yields 0.0.
pub fn stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Standard score of `value` against a distribution. A zero-variance series
/// has no outliers, so a zero stddev yields exactly 0.0 rather than dividing.
pub fn zscore(value: f64, mean: f64, stddev: f64) -> f64 {
    if stddev == 0.0 {
        return 0.0;
    }
    (value - mean) / stddev
}

/// Least-squares fit of amount against day-offset from the first point's
/// date. Degenerate input (fewer than 2 points, or zero variance in x)
/// yields an all-zero model instead of NaN.
pub fn linear_regression(points: &[CashFlowPoint]) -> RegressionModel {
    let zero = RegressionModel {
        slope: 0.0,
        intercept: 0.0,
        r_squared: 0.0,
    };

    if points.len() < 2 {
        return zero;
    }

    let first_date = points[0].date;
    let xs: Vec<f64> = points
        .iter()
        .map(|p| (p.date - first_date).num_days() as f64)
        .collect();
    let ys: Vec<f64> = points.iter().map(|p| p.amount).collect();

    let n = points.len() as f64;
    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xy: f64 = xs.iter().zip(&ys).map(|(x, y)| x * y).sum();
    let sum_xx: f64 = xs.iter().map(|x| x * x).sum();

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator == 0.0 {
        return zero;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;

    let mean_y = sum_y / n;
    let ss_tot: f64 = ys.iter().map(|y| (y - mean_y).powi(2)).sum();
    let ss_res: f64 = xs
        .iter()
        .zip(&ys)
        .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
        .sum();

    let r_squared = if ss_tot == 0.0 {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    };

    RegressionModel {
        slope,
        intercept,
        r_squared,
    }
}

/// Stable grouping: groups appear in the order their keys are first
/// encountered, and items keep their input order within each group.
pub fn group_by<T, K, F>(items: &[T], key_fn: F) -> Vec<(K, Vec<&T>)>
where
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
{
    let mut order: Vec<(K, Vec<&T>)> = Vec::new();
    let mut index: HashMap<K, usize> = HashMap::new();

    for item in items {
        let key = key_fn(item);
        match index.get(&key) {
            Some(&i) => order[i].1.push(item),
            None => {
                index.insert(key.clone(), order.len());
                order.push((key, vec![item]));
            }
        }
    }

    order
}
