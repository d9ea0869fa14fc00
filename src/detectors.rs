use crate::error::Result;
use crate::ledger;
use crate::schema::{
    AnomalyRecord, AnomalyScan, AnomalyType, AnomalyValue, ExpenseRecord, Severity,
};
use crate::stats::{group_by, mean, stddev, zscore};
use crate::store::{AnomalyStore, RecordStore};
use chrono::{Duration, NaiveDate};
use log::{debug, info};

/// Fixed regulatory documentation threshold in dollars. Not configurable.
pub const RECEIPT_THRESHOLD: f64 = 75.0;

const DUPLICATE_WINDOW_DAYS: u32 = 90;
const OUTLIER_WINDOW_DAYS: u32 = 90;
const SPIKE_WINDOW_DAYS: u32 = 180;
const VENDOR_WINDOW_DAYS: u32 = 90;
const RECEIPT_WINDOW_DAYS: u32 = 365;

/// Minimum sample sizes below which a check soft-skips (returns no findings
/// rather than erroring, so an aggregate run never fails on thin data).
const MIN_OUTLIER_SAMPLE: usize = 10;
const MIN_SPIKE_MONTHS: usize = 3;

const OUTLIER_ZSCORE: f64 = 3.0;
const SPIKE_RATIO: f64 = 1.5;
const VENDOR_MIN_TRANSACTIONS: usize = 10;
const VENDOR_MAX_PER_DAY: f64 = 1.0;
const ROUND_SHARE_THRESHOLD: f64 = 0.7;
const ROUND_MIN_TRANSACTIONS: usize = 3;
const BUDGET_FLAG_PERCENT: f64 = 90.0;

/// Everything a check needs: injected store handles, the tenant, and the
/// evaluation date. Checks hold no state of their own.
pub struct DetectorContext<'a> {
    pub records: &'a dyn RecordStore,
    pub ledger: &'a dyn AnomalyStore,
    pub tenant_id: &'a str,
    pub as_of: NaiveDate,
}

impl<'a> DetectorContext<'a> {
    fn expenses_within(&self, window_days: u32) -> Result<Vec<ExpenseRecord>> {
        let from = self.as_of - Duration::days(i64::from(window_days));
        self.records.expenses(self.tenant_id, from, self.as_of)
    }
}

pub type CheckFn = fn(&DetectorContext) -> Result<Vec<AnomalyRecord>>;

/// Flat dispatch list of the detector suite. Adding a check means adding a
/// row here; the orchestrator walks the registry and never names checks.
pub fn check_registry() -> Vec<(&'static str, CheckFn)> {
    vec![
        ("duplicate_transactions", duplicate_transactions as CheckFn),
        ("unusual_expense_amounts", unusual_expense_amounts),
        ("unusual_invoice_amounts", unusual_invoice_amounts),
        ("spending_spikes", spending_spikes),
        ("suspicious_vendors", suspicious_vendors),
        ("missing_receipts", missing_receipts),
        ("budget_overruns", budget_overruns),
    ]
}

/// Runs every registered check, persisting findings as each check dictates,
/// and folds the results into a single scan summary with unresolved counts
/// per severity pulled from the ledger.
pub fn run_all_checks(
    records: &dyn RecordStore,
    anomaly_store: &dyn AnomalyStore,
    tenant_id: &str,
    as_of: NaiveDate,
) -> Result<AnomalyScan> {
    let ctx = DetectorContext {
        records,
        ledger: anomaly_store,
        tenant_id,
        as_of,
    };

    let mut by_check = Vec::new();
    let mut total = 0;
    for (name, check) in check_registry() {
        let findings = check(&ctx)?;
        debug!("Check {name} produced {} findings for tenant {tenant_id}", findings.len());
        total += findings.len();
        by_check.push((name.to_string(), findings.len()));
    }

    let severity_summary = [
        Severity::Critical,
        Severity::Urgent,
        Severity::Warning,
        Severity::Info,
    ]
    .into_iter()
    .map(|severity| {
        ledger::count_by_severity(anomaly_store, tenant_id, severity).map(|n| (severity, n))
    })
    .collect::<Result<Vec<_>>>()?;

    info!("Anomaly scan for tenant {tenant_id}: {total} findings across {} checks", by_check.len());

    Ok(AnomalyScan {
        total_anomalies: total,
        by_check,
        severity_summary,
    })
}

fn amount_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

fn transaction_value(id: &str, description: &str, amount: f64, date: NaiveDate) -> AnomalyValue {
    AnomalyValue::Transaction {
        id: id.to_string(),
        description: description.to_string(),
        amount,
        date,
    }
}

/// Flags repeats of `(description, amount, day)`. The first occurrence is
/// the original; every later one is flagged against it.
pub fn duplicate_transactions(ctx: &DetectorContext) -> Result<Vec<AnomalyRecord>> {
    let expenses = ctx.expenses_within(DUPLICATE_WINDOW_DAYS)?;

    let groups = group_by(&expenses, |e| {
        (e.description.clone(), amount_cents(e.amount), e.date)
    });

    let mut findings = Vec::new();
    for (_, group) in groups {
        let original = group[0];
        for duplicate in &group[1..] {
            let record = AnomalyRecord::new(
                ctx.tenant_id,
                AnomalyType::DuplicateTransaction,
                Severity::Warning,
                "expenses",
                &duplicate.id,
                format!("Possible duplicate: {}", duplicate.description),
                format!(
                    "Expense of {:.2} on {} matches an earlier record with the same \
                     description, amount, and date",
                    duplicate.amount, duplicate.date
                ),
                transaction_value(
                    &duplicate.id,
                    &duplicate.description,
                    duplicate.amount,
                    duplicate.date,
                ),
                transaction_value(
                    &original.id,
                    &original.description,
                    original.amount,
                    original.date,
                ),
                0.85,
            );
            ledger::record(ctx.ledger, record.clone())?;
            findings.push(record);
        }
    }

    Ok(findings)
}

struct TxnView {
    id: String,
    description: String,
    amount: f64,
    date: NaiveDate,
}

/// Shared z-score outlier scan over a set of transactions. Soft-skips below
/// the minimum sample size; a zero-variance series produces no outliers.
fn unusual_amounts(
    ctx: &DetectorContext,
    txns: &[TxnView],
    resource: &str,
) -> Result<Vec<AnomalyRecord>> {
    if txns.len() < MIN_OUTLIER_SAMPLE {
        debug!(
            "Skipping unusual-amount check on {resource}: {} records, {MIN_OUTLIER_SAMPLE} needed",
            txns.len()
        );
        return Ok(Vec::new());
    }

    let amounts: Vec<f64> = txns.iter().map(|t| t.amount).collect();
    let m = mean(&amounts);
    let sd = stddev(&amounts);

    let mut findings = Vec::new();
    for txn in txns {
        let z = zscore(txn.amount, m, sd);
        let magnitude = z.abs();
        if magnitude <= OUTLIER_ZSCORE {
            continue;
        }

        let severity = if magnitude > 5.0 {
            Severity::Critical
        } else if magnitude > 4.0 {
            Severity::Warning
        } else {
            Severity::Info
        };
        let confidence = (0.6 + (magnitude - OUTLIER_ZSCORE) * 0.1).min(0.99);

        let record = AnomalyRecord::new(
            ctx.tenant_id,
            AnomalyType::UnusualAmount,
            severity,
            resource,
            &txn.id,
            format!("Unusual amount: {}", txn.description),
            format!(
                "Amount {:.2} is {:.1} standard deviations from the mean of {:.2}",
                txn.amount, magnitude, m
            ),
            transaction_value(&txn.id, &txn.description, txn.amount, txn.date),
            AnomalyValue::Distribution {
                mean: m,
                stddev: sd,
                zscore: z,
            },
            confidence,
        );
        ledger::record(ctx.ledger, record.clone())?;
        findings.push(record);
    }

    Ok(findings)
}

pub fn unusual_expense_amounts(ctx: &DetectorContext) -> Result<Vec<AnomalyRecord>> {
    let txns: Vec<TxnView> = ctx
        .expenses_within(OUTLIER_WINDOW_DAYS)?
        .into_iter()
        .map(|e| TxnView {
            id: e.id,
            description: e.description,
            amount: e.amount,
            date: e.date,
        })
        .collect();
    unusual_amounts(ctx, &txns, "expenses")
}

pub fn unusual_invoice_amounts(ctx: &DetectorContext) -> Result<Vec<AnomalyRecord>> {
    let from = ctx.as_of - Duration::days(i64::from(OUTLIER_WINDOW_DAYS));
    let txns: Vec<TxnView> = ctx
        .records
        .paid_invoices(ctx.tenant_id, from, ctx.as_of)?
        .into_iter()
        .map(|i| TxnView {
            description: format!("Invoice {}", i.id),
            id: i.id,
            amount: i.total,
            date: i.date,
        })
        .collect();
    unusual_amounts(ctx, &txns, "invoices")
}

/// Buckets expenses by calendar month and flags months more than 50% above
/// the cross-month average. Needs at least three months of data.
pub fn spending_spikes(ctx: &DetectorContext) -> Result<Vec<AnomalyRecord>> {
    let expenses = ctx.expenses_within(SPIKE_WINDOW_DAYS)?;

    let months = group_by(&expenses, |e| e.date.format("%Y-%m").to_string());
    if months.len() < MIN_SPIKE_MONTHS {
        debug!(
            "Skipping spending-spike check: {} months of data, {MIN_SPIKE_MONTHS} needed",
            months.len()
        );
        return Ok(Vec::new());
    }

    let totals: Vec<(String, f64)> = months
        .into_iter()
        .map(|(month, group)| (month, group.iter().map(|e| e.amount).sum::<f64>()))
        .collect();
    let average = mean(&totals.iter().map(|(_, t)| *t).collect::<Vec<f64>>());
    if average == 0.0 {
        return Ok(Vec::new());
    }

    let mut findings = Vec::new();
    for (month, total) in totals {
        if total <= average * SPIKE_RATIO {
            continue;
        }
        let increase_pct = (total - average) / average * 100.0;

        let severity = if increase_pct > 100.0 {
            Severity::Critical
        } else if increase_pct > 75.0 {
            Severity::Warning
        } else {
            Severity::Info
        };

        let record = AnomalyRecord::new(
            ctx.tenant_id,
            AnomalyType::SpendingSpike,
            severity,
            "expenses",
            &month,
            format!("Spending spike in {month}"),
            format!(
                "Spending of {total:.2} in {month} is {increase_pct:.0}% above the \
                 monthly average of {average:.2}"
            ),
            AnomalyValue::MonthlySpend {
                month: month.clone(),
                total,
            },
            AnomalyValue::Baseline { average },
            0.9,
        );
        ledger::record(ctx.ledger, record.clone())?;
        findings.push(record);
    }

    Ok(findings)
}

/// Two vendor heuristics. High-frequency vendors (>10 transactions at more
/// than one per day since first seen) are persisted as warnings. Vendors
/// whose amounts are mostly round multiples of 100 or 1000 come back as
/// findings only, with no ledger write.
pub fn suspicious_vendors(ctx: &DetectorContext) -> Result<Vec<AnomalyRecord>> {
    let expenses = ctx.expenses_within(VENDOR_WINDOW_DAYS)?;
    let with_vendor: Vec<&ExpenseRecord> =
        expenses.iter().filter(|e| e.vendor.is_some()).collect();

    let groups = group_by(&with_vendor, |e| {
        e.vendor.clone().unwrap_or_default()
    });

    let mut findings = Vec::new();
    for (vendor, group) in groups {
        let count = group.len();

        if count > VENDOR_MIN_TRANSACTIONS {
            let first_date = group.iter().map(|e| e.date).min().unwrap_or(ctx.as_of);
            let days_active = (ctx.as_of - first_date).num_days().max(1);
            let per_day = count as f64 / days_active as f64;

            if per_day > VENDOR_MAX_PER_DAY {
                let record = AnomalyRecord::new(
                    ctx.tenant_id,
                    AnomalyType::SuspiciousVendor,
                    Severity::Warning,
                    "expenses",
                    &vendor,
                    format!("High transaction frequency: {vendor}"),
                    format!(
                        "{count} transactions with {vendor} over {days_active} days \
                         ({per_day:.1} per day)"
                    ),
                    AnomalyValue::VendorActivity {
                        vendor: vendor.clone(),
                        transactions: count,
                        per_day,
                    },
                    AnomalyValue::Threshold {
                        amount: VENDOR_MAX_PER_DAY,
                    },
                    0.7,
                );
                ledger::record(ctx.ledger, record.clone())?;
                findings.push(record);
            }
        }

        if count >= ROUND_MIN_TRANSACTIONS {
            let round = group
                .iter()
                .filter(|e| {
                    let cents = amount_cents(e.amount);
                    cents != 0 && cents % 10_000 == 0
                })
                .count();
            let round_share = round as f64 / count as f64;

            if round_share >= ROUND_SHARE_THRESHOLD {
                // Finding only: surfaced to the caller, never written to
                // the ledger.
                findings.push(AnomalyRecord::new(
                    ctx.tenant_id,
                    AnomalyType::SuspiciousVendor,
                    Severity::Info,
                    "expenses",
                    &vendor,
                    format!("Round-number amounts: {vendor}"),
                    format!(
                        "{:.0}% of {count} amounts paid to {vendor} are exact multiples \
                         of 100 or 1000",
                        round_share * 100.0
                    ),
                    AnomalyValue::VendorPattern {
                        vendor: vendor.clone(),
                        round_share,
                    },
                    AnomalyValue::Threshold {
                        amount: ROUND_SHARE_THRESHOLD,
                    },
                    0.65,
                ));
            }
        }
    }

    Ok(findings)
}

/// Flags expenses at or above the documentation threshold that carry no
/// receipt. Rule-based, so confidence is fixed at 1.0.
pub fn missing_receipts(ctx: &DetectorContext) -> Result<Vec<AnomalyRecord>> {
    let expenses = ctx.expenses_within(RECEIPT_WINDOW_DAYS)?;

    let mut findings = Vec::new();
    for expense in expenses {
        let has_receipt = expense
            .receipt_url
            .as_deref()
            .is_some_and(|url| !url.is_empty());
        if expense.amount < RECEIPT_THRESHOLD || has_receipt {
            continue;
        }

        let severity = if expense.amount > 1000.0 {
            Severity::Critical
        } else if expense.amount > 500.0 {
            Severity::Warning
        } else {
            Severity::Info
        };

        let record = AnomalyRecord::new(
            ctx.tenant_id,
            AnomalyType::MissingReceipt,
            severity,
            "expenses",
            &expense.id,
            format!("Missing receipt: {}", expense.description),
            format!(
                "Expense of {:.2} on {} has no receipt attached (documentation required \
                 at {RECEIPT_THRESHOLD:.0} and above)",
                expense.amount, expense.date
            ),
            AnomalyValue::Receipt {
                amount: expense.amount,
                has_receipt: false,
            },
            AnomalyValue::Threshold {
                amount: RECEIPT_THRESHOLD,
            },
            1.0,
        );
        ledger::record(ctx.ledger, record.clone())?;
        findings.push(record);
    }

    Ok(findings)
}

/// Compares actual category spend against each approved budget and flags
/// usage above 90%.
pub fn budget_overruns(ctx: &DetectorContext) -> Result<Vec<AnomalyRecord>> {
    let budgets = ctx.records.budgets(ctx.tenant_id)?;

    let mut findings = Vec::new();
    for budget in budgets.iter().filter(|b| b.is_approved) {
        if budget.amount == 0.0 {
            continue;
        }

        let actual_spent: f64 = ctx
            .records
            .expenses(ctx.tenant_id, budget.start_date, budget.end_date)?
            .iter()
            .filter(|e| e.category.as_deref() == Some(budget.category.as_str()))
            .map(|e| e.amount)
            .sum();

        let percent_used = actual_spent / budget.amount * 100.0;
        if percent_used <= BUDGET_FLAG_PERCENT {
            continue;
        }

        let severity = if percent_used > 110.0 {
            Severity::Critical
        } else if percent_used > 100.0 {
            Severity::Urgent
        } else {
            Severity::Warning
        };

        let record = AnomalyRecord::new(
            ctx.tenant_id,
            AnomalyType::BudgetOverrun,
            severity,
            "budgets",
            &budget.id,
            format!("Budget at {percent_used:.0}%: {}", budget.category),
            format!(
                "Spending of {actual_spent:.2} against the {:.2} budget for {} \
                 ({} to {})",
                budget.amount, budget.category, budget.start_date, budget.end_date
            ),
            AnomalyValue::BudgetUsage {
                category: budget.category.clone(),
                budget_amount: budget.amount,
                actual_spent,
                percent_used,
            },
            AnomalyValue::Threshold {
                amount: budget.amount,
            },
            1.0,
        );
        ledger::record(ctx.ledger, record.clone())?;
        findings.push(record);
    }

    Ok(findings)
}
