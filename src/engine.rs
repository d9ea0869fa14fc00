use crate::detectors::run_all_checks;
use crate::error::Result;
use crate::forecast::{
    forecast_cash_flow, forecast_accuracy, multi_period_forecast, scenario_analysis,
};
use crate::ledger;
use crate::schema::{
    AccuracyReport, AnomalyRecord, AnomalyScan, AnomalyTrends, ForecastReport, Scenario,
    ScenarioAnalysis,
};
use crate::store::{AnomalyStore, RecordStore};
use chrono::{Duration, NaiveDate, Utc};
use log::info;
use uuid::Uuid;

/// Facade over the analytics core: forecasting on one side, the anomaly
/// suite and its ledger on the other. Holds no state beyond the injected
/// store handles and the evaluation date, so concurrent engines for
/// different tenants need no coordination.
pub struct AnalyticsEngine<'a> {
    records: &'a dyn RecordStore,
    anomalies: &'a dyn AnomalyStore,
    as_of: NaiveDate,
}

impl<'a> AnalyticsEngine<'a> {
    pub fn new(records: &'a dyn RecordStore, anomalies: &'a dyn AnomalyStore) -> Self {
        Self {
            records,
            anomalies,
            as_of: Utc::now().date_naive(),
        }
    }

    /// Pins the evaluation date, mainly for deterministic tests and
    /// backfills.
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn forecast_cash_flow(&self, tenant_id: &str, horizon_days: u32) -> Result<ForecastReport> {
        info!("Running {horizon_days}-day cash flow forecast for tenant {tenant_id}");
        forecast_cash_flow(self.records, self.anomalies, tenant_id, horizon_days, self.as_of)
    }

    pub fn generate_multi_period_forecast(
        &self,
        tenant_id: &str,
    ) -> Result<std::collections::BTreeMap<u32, ForecastReport>> {
        multi_period_forecast(self.records, self.anomalies, tenant_id, self.as_of)
    }

    pub fn run_scenario_analysis(
        &self,
        tenant_id: &str,
        scenarios: &[Scenario],
    ) -> Result<ScenarioAnalysis> {
        info!(
            "Running scenario analysis for tenant {tenant_id} ({} scenarios)",
            scenarios.len()
        );
        scenario_analysis(self.records, self.anomalies, tenant_id, scenarios, self.as_of)
    }

    pub fn get_forecast_accuracy(&self, tenant_id: &str, days: u32) -> Result<AccuracyReport> {
        forecast_accuracy(self.records, self.anomalies, tenant_id, days, self.as_of)
    }

    pub fn run_all_anomaly_checks(&self, tenant_id: &str) -> Result<AnomalyScan> {
        run_all_checks(self.records, self.anomalies, tenant_id, self.as_of)
    }

    pub fn list_unresolved_anomalies(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> Result<Vec<AnomalyRecord>> {
        ledger::list_unresolved(self.anomalies, tenant_id, limit)
    }

    pub fn resolve_anomaly(
        &self,
        id: Uuid,
        resolved_by: &str,
        note: &str,
    ) -> Result<AnomalyRecord> {
        ledger::resolve(self.anomalies, id, resolved_by, note, Utc::now())
    }

    pub fn get_anomaly_trends(&self, tenant_id: &str, days: u32) -> Result<AnomalyTrends> {
        let cutoff = self.as_of - Duration::days(i64::from(days));
        ledger::trend_from(self.anomalies, tenant_id, cutoff)
    }
}
