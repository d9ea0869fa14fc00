use crate::error::Result;
use crate::schema::{AnomalyRecord, AnomalyTrendRow, AnomalyTrends, AnomalyType, Severity};
use crate::stats::group_by;
use crate::store::AnomalyStore;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use log::debug;
use uuid::Uuid;

/// Persists a freshly detected finding.
pub fn record(store: &dyn AnomalyStore, finding: AnomalyRecord) -> Result<()> {
    debug!(
        "Recording {} anomaly {} for tenant {} ({:?})",
        finding.anomaly_type.as_str(),
        finding.id,
        finding.tenant_id,
        finding.severity
    );
    store.insert_anomaly(finding)
}

/// Unresolved findings, most severe first, ties broken by recency.
pub fn list_unresolved(
    store: &dyn AnomalyStore,
    tenant_id: &str,
    limit: usize,
) -> Result<Vec<AnomalyRecord>> {
    let mut unresolved: Vec<AnomalyRecord> = store
        .anomalies(tenant_id)?
        .into_iter()
        .filter(|a| !a.is_resolved)
        .collect();

    unresolved.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    unresolved.truncate(limit);

    Ok(unresolved)
}

/// One-way transition to resolved. Resolving an already-resolved record
/// re-stamps it without error; there is no un-resolve.
pub fn resolve(
    store: &dyn AnomalyStore,
    id: Uuid,
    resolved_by: &str,
    note: &str,
    at: DateTime<Utc>,
) -> Result<AnomalyRecord> {
    let record = store.mark_resolved(id, resolved_by, note, at)?;
    debug!("Anomaly {id} resolved by {resolved_by}");
    Ok(record)
}

pub fn count_by_severity(
    store: &dyn AnomalyStore,
    tenant_id: &str,
    severity: Severity,
) -> Result<usize> {
    Ok(store
        .anomalies(tenant_id)?
        .iter()
        .filter(|a| !a.is_resolved && a.severity == severity)
        .count())
}

/// Findings detected within the last `days`, grouped by day and by type for
/// charting, alongside running totals per type.
pub fn trend(store: &dyn AnomalyStore, tenant_id: &str, days: u32) -> Result<AnomalyTrends> {
    let cutoff = (Utc::now() - Duration::days(i64::from(days))).date_naive();
    trend_from(store, tenant_id, cutoff)
}

pub(crate) fn trend_from(
    store: &dyn AnomalyStore,
    tenant_id: &str,
    cutoff: NaiveDate,
) -> Result<AnomalyTrends> {
    let mut recent: Vec<AnomalyRecord> = store
        .anomalies(tenant_id)?
        .into_iter()
        .filter(|a| a.created_at.date_naive() >= cutoff)
        .collect();
    recent.sort_by_key(|a| a.created_at);

    let trends: Vec<AnomalyTrendRow> = group_by(&recent, |a| a.created_at.date_naive())
        .into_iter()
        .map(|(date, group)| {
            let by_type: Vec<(AnomalyType, usize)> =
                group_by(&group, |a| a.anomaly_type)
                    .into_iter()
                    .map(|(anomaly_type, rows)| (anomaly_type, rows.len()))
                    .collect();
            AnomalyTrendRow {
                date,
                total: group.len(),
                by_type,
            }
        })
        .collect();

    let totals_by_type: Vec<(AnomalyType, usize)> = group_by(&recent, |a| a.anomaly_type)
        .into_iter()
        .map(|(anomaly_type, rows)| (anomaly_type, rows.len()))
        .collect();

    Ok(AnomalyTrends {
        trends,
        totals_by_type,
    })
}
