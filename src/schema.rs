use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A paid invoice as returned by the record store. Only paid invoices
/// contribute to cash flow, so the query boundary filters on payment status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub id: String,
    pub date: NaiveDate,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub description: String,
    pub vendor: Option<String>,
    pub category: Option<String>,
    pub receipt_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetRecord {
    pub id: String,
    pub category: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub amount: f64,
    pub is_approved: bool,
}

/// One day of net cash activity. Days with no records are absent from the
/// series rather than zero-filled, so an idle week does not dilute the
/// regression fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowPoint {
    pub date: NaiveDate,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionModel {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub expected_total: f64,
    pub trend: Trend,
    pub risk: RiskLevel,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReport {
    pub period_days: u32,
    pub points: Vec<ForecastPoint>,
    pub summary: ForecastSummary,
    pub recommendations: Vec<String>,
}

/// A "what-if" adjustment applied uniformly to a base forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub revenue_change_pct: f64,
    pub expense_change_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub total_cash_flow: f64,
    pub negative_days: usize,
    pub impact: f64,
    pub impact_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioAnalysis {
    pub base_total: f64,
    pub scenarios: Vec<ScenarioOutcome>,
}

/// Append-only log row written once per forecast run, consumed later by
/// retrospective accuracy scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionLogEntry {
    pub id: Uuid,
    pub tenant_id: String,
    pub history_points: usize,
    pub history_days: u32,
    pub horizon_days: u32,
    pub forecast_start: NaiveDate,
    pub forecast_end: NaiveDate,
    pub expected_total: f64,
    pub confidence: f64,
    pub margin: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub accuracy: f64,
    pub mae: f64,
    pub mape: f64,
    pub evaluations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyType {
    DuplicateTransaction,
    UnusualAmount,
    SpendingSpike,
    SuspiciousVendor,
    MissingReceipt,
    BudgetOverrun,
}

impl AnomalyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateTransaction => "DUPLICATE_TRANSACTION",
            Self::UnusualAmount => "UNUSUAL_AMOUNT",
            Self::SpendingSpike => "SPENDING_SPIKE",
            Self::SuspiciousVendor => "SUSPICIOUS_VENDOR",
            Self::MissingReceipt => "MISSING_RECEIPT",
            Self::BudgetOverrun => "BUDGET_OVERRUN",
        }
    }
}

/// Variant order defines escalation order; the ledger sorts unresolved
/// findings by this ordering, most severe first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Urgent,
    Critical,
}

/// Structured payload for `detected_value` / `expected_value`. Each detector
/// constructs the variants that describe its evidence, keeping the record
/// exhaustively typed instead of a free-form JSON blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnomalyValue {
    Transaction {
        id: String,
        description: String,
        amount: f64,
        date: NaiveDate,
    },
    Distribution {
        mean: f64,
        stddev: f64,
        zscore: f64,
    },
    MonthlySpend {
        month: String,
        total: f64,
    },
    Baseline {
        average: f64,
    },
    VendorActivity {
        vendor: String,
        transactions: usize,
        per_day: f64,
    },
    VendorPattern {
        vendor: String,
        round_share: f64,
    },
    Receipt {
        amount: f64,
        has_receipt: bool,
    },
    Threshold {
        amount: f64,
    },
    BudgetUsage {
        category: String,
        budget_amount: f64,
        actual_spent: f64,
        percent_used: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub id: Uuid,
    pub tenant_id: String,
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    /// Logical table the finding points at (e.g. "expenses", "invoices").
    pub resource: String,
    pub resource_id: String,
    pub title: String,
    pub description: String,
    pub detected_value: AnomalyValue,
    pub expected_value: AnomalyValue,
    pub confidence: f64,
    pub is_resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AnomalyRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: &str,
        anomaly_type: AnomalyType,
        severity: Severity,
        resource: &str,
        resource_id: &str,
        title: String,
        description: String,
        detected_value: AnomalyValue,
        expected_value: AnomalyValue,
        confidence: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: tenant_id.to_string(),
            anomaly_type,
            severity,
            resource: resource.to_string(),
            resource_id: resource_id.to_string(),
            title,
            description,
            detected_value,
            expected_value,
            confidence: confidence.clamp(0.0, 1.0),
            is_resolved: false,
            resolved_by: None,
            resolved_at: None,
            resolution_note: None,
            created_at: Utc::now(),
        }
    }
}

/// Per-day anomaly counts for charting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyTrendRow {
    pub date: NaiveDate,
    pub total: usize,
    pub by_type: Vec<(AnomalyType, usize)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyTrends {
    pub trends: Vec<AnomalyTrendRow>,
    pub totals_by_type: Vec<(AnomalyType, usize)>,
}

/// Aggregate result of a full detector-suite run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyScan {
    pub total_anomalies: usize,
    pub by_check: Vec<(String, usize)>,
    pub severity_summary: Vec<(Severity, usize)>,
}
