use crate::aggregator::daily_net_cash_flow;
use crate::error::{AnalyticsError, Result};
use crate::schema::{
    AccuracyReport, CashFlowPoint, ForecastPoint, ForecastReport, ForecastSummary,
    PredictionLogEntry, RiskLevel, Scenario, ScenarioAnalysis, ScenarioOutcome, Trend,
};
use crate::seasonality::WeekdayFactors;
use crate::stats::{linear_regression, mean, stddev};
use crate::store::{AnomalyStore, RecordStore};
use chrono::{Duration, NaiveDate, Utc};
use log::{debug, info};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Regression and volatility estimates are unreliable below this many active
/// days of history, so the forecast refuses to run rather than degrade.
pub const MIN_HISTORY_POINTS: usize = 14;

/// Slope beyond which the trend is classified as increasing/decreasing,
/// in currency units per day. Empirically chosen, kept as-is.
pub const TREND_SLOPE_THRESHOLD: f64 = 100.0;

/// Fraction of forecasted days with negative prediction that escalates risk.
pub const HIGH_RISK_NEGATIVE_FRACTION: f64 = 0.5;
pub const MEDIUM_RISK_NEGATIVE_FRACTION: f64 = 0.2;

/// 95% interval multiplier for the error margin.
pub const CONFIDENCE_MARGIN_Z: f64 = 1.96;

/// Below this confidence the report carries a volatility warning.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;

const MULTI_PERIOD_HORIZONS: [u32; 3] = [30, 60, 90];
const SCENARIO_BASE_HORIZON: u32 = 90;

/// Projects net cash flow `horizon_days` past the last historical date by
/// combining the regression trend with day-of-week factors, bounded by a
/// margin derived from historical volatility. Appends one prediction-log
/// entry per successful run.
pub fn forecast_cash_flow(
    records: &dyn RecordStore,
    ledger: &dyn AnomalyStore,
    tenant_id: &str,
    horizon_days: u32,
    as_of: NaiveDate,
) -> Result<ForecastReport> {
    let history_days = (horizon_days * 3).max(90);
    let history = daily_net_cash_flow(records, tenant_id, history_days, as_of)?;

    if history.len() < MIN_HISTORY_POINTS {
        return Err(AnalyticsError::InsufficientHistory {
            available: history.len(),
            required: MIN_HISTORY_POINTS,
        });
    }

    let model = linear_regression(&history);
    let factors = WeekdayFactors::from_history(&history);

    let amounts: Vec<f64> = history.iter().map(|p| p.amount).collect();
    let sd = stddev(&amounts);
    let n = history.len() as f64;
    let margin = CONFIDENCE_MARGIN_Z * sd * (1.0 + 1.0 / n).sqrt();
    let confidence = model.r_squared.clamp(0.0, 1.0);

    // The regression stays anchored to the first historical date; forecast
    // offsets continue the same x axis rather than restarting at day 0.
    let first_date = history[0].date;
    let last_date = history[history.len() - 1].date;

    let mut points = Vec::with_capacity(horizon_days as usize);
    for offset in 1..=i64::from(horizon_days) {
        let date = last_date + Duration::days(offset);
        let x = (date - first_date).num_days() as f64;
        let base = model.slope * x + model.intercept;
        let predicted = base * factors.factor_for(date);

        points.push(ForecastPoint {
            date,
            predicted,
            lower_bound: predicted - margin,
            upper_bound: predicted + margin,
            confidence,
        });
    }

    let summary = summarize(&points, model.slope);
    let recommendations = recommendations_for(&summary);

    debug!(
        "Forecast for tenant {}: {} history points over {} days, slope {:.2}, r² {:.3}",
        tenant_id,
        history.len(),
        history_days,
        model.slope,
        model.r_squared
    );

    let entry = PredictionLogEntry {
        id: Uuid::new_v4(),
        tenant_id: tenant_id.to_string(),
        history_points: history.len(),
        history_days,
        horizon_days,
        forecast_start: points.first().map_or(last_date, |p| p.date),
        forecast_end: points.last().map_or(last_date, |p| p.date),
        expected_total: summary.expected_total,
        confidence: summary.confidence,
        margin,
        created_at: Utc::now(),
    };
    ledger.append_prediction(entry)?;

    Ok(ForecastReport {
        period_days: horizon_days,
        points,
        summary,
        recommendations,
    })
}

fn summarize(points: &[ForecastPoint], slope: f64) -> ForecastSummary {
    let expected_total: f64 = points.iter().map(|p| p.predicted).sum();
    let confidences: Vec<f64> = points.iter().map(|p| p.confidence).collect();
    let confidence = mean(&confidences);

    let trend = if slope > TREND_SLOPE_THRESHOLD {
        Trend::Increasing
    } else if slope < -TREND_SLOPE_THRESHOLD {
        Trend::Decreasing
    } else {
        Trend::Stable
    };

    let negative_fraction = if points.is_empty() {
        0.0
    } else {
        points.iter().filter(|p| p.predicted < 0.0).count() as f64 / points.len() as f64
    };

    let risk = if negative_fraction > HIGH_RISK_NEGATIVE_FRACTION {
        RiskLevel::High
    } else if negative_fraction > MEDIUM_RISK_NEGATIVE_FRACTION {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    ForecastSummary {
        expected_total,
        trend,
        risk,
        confidence,
    }
}

/// Deterministic lookup keyed off the risk/trend/confidence classification.
/// The trigger conditions and message set are fixed; no text is generated.
fn recommendations_for(summary: &ForecastSummary) -> Vec<String> {
    let mut recommendations = Vec::new();

    match summary.risk {
        RiskLevel::High => {
            recommendations.push(
                "Negative cash flow is projected for most of the forecast period. \
                 Accelerate invoicing and receivables collection."
                    .to_string(),
            );
            recommendations
                .push("Defer non-essential spending until cash flow recovers.".to_string());
        }
        RiskLevel::Medium => {
            recommendations.push(
                "Several forecasted days show negative cash flow. Monitor upcoming payables \
                 closely."
                    .to_string(),
            );
        }
        RiskLevel::Low => {}
    }

    if summary.trend == Trend::Decreasing {
        recommendations.push(
            "Cash flow trend is decreasing. Review revenue drivers and cost structure."
                .to_string(),
        );
    }

    if summary.confidence < LOW_CONFIDENCE_THRESHOLD {
        recommendations.push(
            "Forecast confidence is low: historical cash flow is volatile, treat these \
             projections as indicative."
                .to_string(),
        );
    }

    if recommendations.is_empty() {
        recommendations
            .push("Cash flow looks stable over the forecast period. No action needed.".to_string());
    }

    recommendations
}

/// Three independent full forecast runs, each with its own history window,
/// keyed by horizon length in days.
pub fn multi_period_forecast(
    records: &dyn RecordStore,
    ledger: &dyn AnomalyStore,
    tenant_id: &str,
    as_of: NaiveDate,
) -> Result<BTreeMap<u32, ForecastReport>> {
    let mut reports = BTreeMap::new();
    for horizon in MULTI_PERIOD_HORIZONS {
        let report = forecast_cash_flow(records, ledger, tenant_id, horizon, as_of)?;
        reports.insert(horizon, report);
    }
    info!(
        "Generated multi-period forecast for tenant {} ({} horizons)",
        tenant_id,
        reports.len()
    );
    Ok(reports)
}

/// Applies each scenario as a uniform multiplicative shock to the 90-day
/// base forecast. No refit: every predicted value is scaled by
/// `(1 + revenue_change/100) * (1 - expense_change/100)`.
pub fn scenario_analysis(
    records: &dyn RecordStore,
    ledger: &dyn AnomalyStore,
    tenant_id: &str,
    scenarios: &[Scenario],
    as_of: NaiveDate,
) -> Result<ScenarioAnalysis> {
    let base = forecast_cash_flow(records, ledger, tenant_id, SCENARIO_BASE_HORIZON, as_of)?;
    let base_total = base.summary.expected_total;

    let outcomes = scenarios
        .iter()
        .map(|scenario| {
            let factor = (1.0 + scenario.revenue_change_pct / 100.0)
                * (1.0 - scenario.expense_change_pct / 100.0);

            let adjusted: Vec<f64> = base.points.iter().map(|p| p.predicted * factor).collect();
            let total_cash_flow: f64 = adjusted.iter().sum();
            let negative_days = adjusted.iter().filter(|v| **v < 0.0).count();

            let impact = total_cash_flow - base_total;
            let impact_pct = if base_total == 0.0 {
                0.0
            } else {
                impact / base_total * 100.0
            };

            ScenarioOutcome {
                name: scenario.name.clone(),
                total_cash_flow,
                negative_days,
                impact,
                impact_pct,
            }
        })
        .collect();

    Ok(ScenarioAnalysis {
        base_total,
        scenarios: outcomes,
    })
}

/// Scores past forecasts against what actually happened. Only log entries
/// created at least `days` days before `as_of` are evaluated; for each, the
/// actual net cash flow over the logged window is recomputed and compared to
/// the logged expectation.
pub fn forecast_accuracy(
    records: &dyn RecordStore,
    ledger: &dyn AnomalyStore,
    tenant_id: &str,
    days: u32,
    as_of: NaiveDate,
) -> Result<AccuracyReport> {
    let cutoff = as_of - Duration::days(i64::from(days));
    let entries: Vec<PredictionLogEntry> = ledger
        .predictions(tenant_id)?
        .into_iter()
        .filter(|e| e.created_at.date_naive() <= cutoff)
        .collect();

    if entries.is_empty() {
        return Ok(AccuracyReport {
            accuracy: 0.0,
            mae: 0.0,
            mape: 0.0,
            evaluations: 0,
        });
    }

    let mut abs_errors = Vec::with_capacity(entries.len());
    let mut pct_errors = Vec::with_capacity(entries.len());

    for entry in &entries {
        let actual = actual_net_cash_flow(records, tenant_id, entry.forecast_start, entry.forecast_end)?;
        let abs_error = (entry.expected_total - actual).abs();
        // A window with zero actual total has no meaningful percent error.
        let pct_error = if actual == 0.0 {
            0.0
        } else {
            abs_error / actual.abs() * 100.0
        };
        abs_errors.push(abs_error);
        pct_errors.push(pct_error);
    }

    let mae = mean(&abs_errors);
    let mape = mean(&pct_errors);

    Ok(AccuracyReport {
        accuracy: (1.0 - mape / 100.0).max(0.0),
        mae,
        mape,
        evaluations: entries.len(),
    })
}

fn actual_net_cash_flow(
    records: &dyn RecordStore,
    tenant_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<f64> {
    let inflow: f64 = records
        .paid_invoices(tenant_id, from, to)?
        .iter()
        .map(|i| i.total)
        .sum();
    let outflow: f64 = records
        .expenses(tenant_id, from, to)?
        .iter()
        .map(|e| e.amount)
        .sum();
    Ok(inflow - outflow)
}
