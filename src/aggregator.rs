use crate::error::Result;
use crate::schema::CashFlowPoint;
use crate::store::RecordStore;
use chrono::{Duration, NaiveDate};
use log::debug;
use std::collections::BTreeMap;

/// Inflow/outflow accumulated for one calendar day.
#[derive(Default)]
struct DayBucket {
    inflow: f64,
    outflow: f64,
}

/// Converts raw dated monetary records into a daily net-cash-flow series for
/// one tenant: paid invoices count positive, expenses negative. Only days
/// with at least one record appear in the output; idle days are absent, not
/// zero, so they never dilute a downstream regression. Recomputed in full on
/// every call.
pub fn daily_net_cash_flow(
    store: &dyn RecordStore,
    tenant_id: &str,
    window_days: u32,
    as_of: NaiveDate,
) -> Result<Vec<CashFlowPoint>> {
    let from = as_of - Duration::days(i64::from(window_days));

    let invoices = store.paid_invoices(tenant_id, from, as_of)?;
    let expenses = store.expenses(tenant_id, from, as_of)?;

    let mut buckets: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();

    for invoice in &invoices {
        buckets.entry(invoice.date).or_default().inflow += invoice.total;
    }
    for expense in &expenses {
        buckets.entry(expense.date).or_default().outflow += expense.amount;
    }

    debug!(
        "Aggregated {} invoices and {} expenses into {} active days for tenant {}",
        invoices.len(),
        expenses.len(),
        buckets.len(),
        tenant_id
    );

    Ok(buckets
        .into_iter()
        .map(|(date, bucket)| CashFlowPoint {
            date,
            amount: bucket.inflow - bucket.outflow,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ExpenseRecord, InvoiceRecord};
    use crate::store::MemoryStore;

    fn expense(id: &str, date: NaiveDate, amount: f64) -> ExpenseRecord {
        ExpenseRecord {
            id: id.to_string(),
            date,
            amount,
            description: "test expense".to_string(),
            vendor: None,
            category: None,
            receipt_url: None,
        }
    }

    #[test]
    fn test_nets_inflow_against_outflow_per_day() {
        let store = MemoryStore::new();
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();

        store.add_invoice(
            "t1",
            InvoiceRecord {
                id: "i-1".to_string(),
                date: day,
                total: 500.0,
            },
        );
        store.add_expense("t1", expense("e-1", day, 120.0));
        store.add_expense("t1", expense("e-2", day, 80.0));

        let series = daily_net_cash_flow(&store, "t1", 90, as_of).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].date, day);
        assert!((series[0].amount - 300.0).abs() < 1e-10);
    }

    #[test]
    fn test_idle_days_are_absent() {
        let store = MemoryStore::new();
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();

        store.add_expense(
            "t1",
            expense("e-1", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 50.0),
        );
        store.add_expense(
            "t1",
            expense("e-2", NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(), 75.0),
        );

        let series = daily_net_cash_flow(&store, "t1", 90, as_of).unwrap();
        assert_eq!(series.len(), 2);
        assert!(series[0].date < series[1].date);
        assert!((series[0].amount + 50.0).abs() < 1e-10);
    }

    #[test]
    fn test_window_excludes_older_records() {
        let store = MemoryStore::new();
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();

        store.add_expense(
            "t1",
            expense("e-old", NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(), 10.0),
        );
        store.add_expense(
            "t1",
            expense("e-new", NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(), 20.0),
        );

        let series = daily_net_cash_flow(&store, "t1", 90, as_of).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(
            series[0].date,
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
        );
    }

    #[test]
    fn test_empty_store_yields_empty_series() {
        let store = MemoryStore::new();
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let series = daily_net_cash_flow(&store, "t1", 90, as_of).unwrap();
        assert!(series.is_empty());
    }
}
