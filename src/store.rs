use crate::error::{AnalyticsError, Result};
use crate::schema::{
    AnomalyRecord, BudgetRecord, ExpenseRecord, InvoiceRecord, PredictionLogEntry,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Read-only boundary to the product's record store. Implementations query
/// by tenant and date range and return plain records; failures surface as
/// [`AnalyticsError::Store`] and propagate unchanged (no retry here).
pub trait RecordStore: Send + Sync {
    /// Invoices marked paid with dates in `[from, to]` inclusive.
    fn paid_invoices(
        &self,
        tenant_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<InvoiceRecord>>;

    fn expenses(
        &self,
        tenant_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExpenseRecord>>;

    /// All budgets for the tenant; callers filter on approval status.
    fn budgets(&self, tenant_id: &str) -> Result<Vec<BudgetRecord>>;
}

/// Persistence boundary for anomaly findings and the forecast log.
pub trait AnomalyStore: Send + Sync {
    fn insert_anomaly(&self, record: AnomalyRecord) -> Result<()>;

    fn fetch_anomaly(&self, id: Uuid) -> Result<Option<AnomalyRecord>>;

    /// Conditional resolve: stamps the resolution fields and returns the
    /// updated record. Resolving an already-resolved record re-stamps it
    /// without error, which keeps the operation idempotent under concurrent
    /// calls. Unknown ids yield [`AnalyticsError::AnomalyNotFound`].
    fn mark_resolved(
        &self,
        id: Uuid,
        resolved_by: &str,
        note: &str,
        at: DateTime<Utc>,
    ) -> Result<AnomalyRecord>;

    fn anomalies(&self, tenant_id: &str) -> Result<Vec<AnomalyRecord>>;

    fn append_prediction(&self, entry: PredictionLogEntry) -> Result<()>;

    fn predictions(&self, tenant_id: &str) -> Result<Vec<PredictionLogEntry>>;
}

#[derive(Default)]
struct MemoryInner {
    expenses: HashMap<String, Vec<ExpenseRecord>>,
    invoices_by_tenant: HashMap<String, Vec<InvoiceRecord>>,
    budgets: HashMap<String, Vec<BudgetRecord>>,
    anomalies: Vec<AnomalyRecord>,
    predictions: Vec<PredictionLogEntry>,
}

/// In-memory implementation of both store traits, used throughout the test
/// suite and as a reference for real backends.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_invoice(&self, tenant_id: &str, invoice: InvoiceRecord) {
        let mut inner = self.lock();
        inner
            .invoices_by_tenant
            .entry(tenant_id.to_string())
            .or_default()
            .push(invoice);
    }

    pub fn add_expense(&self, tenant_id: &str, expense: ExpenseRecord) {
        let mut inner = self.lock();
        inner
            .expenses
            .entry(tenant_id.to_string())
            .or_default()
            .push(expense);
    }

    pub fn add_budget(&self, tenant_id: &str, budget: BudgetRecord) {
        let mut inner = self.lock();
        inner
            .budgets
            .entry(tenant_id.to_string())
            .or_default()
            .push(budget);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        // A poisoned lock means a writer panicked mid-insert; the data is
        // append-only plain records, so continuing with it is sound.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RecordStore for MemoryStore {
    fn paid_invoices(
        &self,
        tenant_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<InvoiceRecord>> {
        let inner = self.lock();
        Ok(inner
            .invoices_by_tenant
            .get(tenant_id)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.date >= from && r.date <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn expenses(
        &self,
        tenant_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExpenseRecord>> {
        let inner = self.lock();
        Ok(inner
            .expenses
            .get(tenant_id)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.date >= from && r.date <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn budgets(&self, tenant_id: &str) -> Result<Vec<BudgetRecord>> {
        let inner = self.lock();
        Ok(inner.budgets.get(tenant_id).cloned().unwrap_or_default())
    }
}

impl AnomalyStore for MemoryStore {
    fn insert_anomaly(&self, record: AnomalyRecord) -> Result<()> {
        self.lock().anomalies.push(record);
        Ok(())
    }

    fn fetch_anomaly(&self, id: Uuid) -> Result<Option<AnomalyRecord>> {
        Ok(self.lock().anomalies.iter().find(|a| a.id == id).cloned())
    }

    fn mark_resolved(
        &self,
        id: Uuid,
        resolved_by: &str,
        note: &str,
        at: DateTime<Utc>,
    ) -> Result<AnomalyRecord> {
        let mut inner = self.lock();
        let record = inner
            .anomalies
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AnalyticsError::AnomalyNotFound(id))?;

        record.is_resolved = true;
        record.resolved_by = Some(resolved_by.to_string());
        record.resolved_at = Some(at);
        record.resolution_note = Some(note.to_string());

        Ok(record.clone())
    }

    fn anomalies(&self, tenant_id: &str) -> Result<Vec<AnomalyRecord>> {
        Ok(self
            .lock()
            .anomalies
            .iter()
            .filter(|a| a.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    fn append_prediction(&self, entry: PredictionLogEntry) -> Result<()> {
        self.lock().predictions.push(entry);
        Ok(())
    }

    fn predictions(&self, tenant_id: &str) -> Result<Vec<PredictionLogEntry>> {
        Ok(self
            .lock()
            .predictions
            .iter()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect())
    }
}
