//! # Cashflow Analytics
//!
//! The financial analytics core of a multi-tenant accounting platform:
//! cash flow forecasting from historical transaction streams, and detection
//! of anomalous financial records with a resolution lifecycle.
//!
//! ## Core Concepts
//!
//! - **Cash Flow Series**: paid invoices minus expenses, bucketed per
//!   calendar day; idle days are absent, never zero-filled
//! - **Forecast**: linear trend plus day-of-week seasonality, bounded by a
//!   95% margin derived from historical volatility
//! - **Anomaly Checks**: six independent detectors (duplicates, outlier
//!   amounts, spending spikes, suspicious vendors, missing receipts, budget
//!   overruns) dispatched through a flat registry
//! - **Anomaly Ledger**: persistent findings with a one-way
//!   detected → resolved lifecycle
//!
//! The record store and the anomaly ledger are collaborators behind the
//! [`RecordStore`] and [`AnomalyStore`] traits; [`MemoryStore`] implements
//! both for tests and small deployments.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cashflow_analytics::{AnalyticsEngine, MemoryStore};
//!
//! let store = MemoryStore::new();
//! // ... populate via a real RecordStore implementation ...
//!
//! let engine = AnalyticsEngine::new(&store, &store);
//! let report = engine.forecast_cash_flow("tenant-1", 30)?;
//! println!("expected 30-day total: {:.2}", report.summary.expected_total);
//!
//! let scan = engine.run_all_anomaly_checks("tenant-1")?;
//! println!("{} findings", scan.total_anomalies);
//! ```

pub mod aggregator;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod ledger;
pub mod schema;
pub mod seasonality;
pub mod stats;
pub mod store;

pub use aggregator::daily_net_cash_flow;
pub use detectors::{check_registry, run_all_checks, DetectorContext, RECEIPT_THRESHOLD};
pub use engine::AnalyticsEngine;
pub use error::{AnalyticsError, Result};
pub use forecast::{
    forecast_accuracy, forecast_cash_flow, multi_period_forecast, scenario_analysis,
    MIN_HISTORY_POINTS, TREND_SLOPE_THRESHOLD,
};
pub use schema::*;
pub use seasonality::WeekdayFactors;
pub use stats::{group_by, linear_regression, mean, stddev, zscore};
pub use store::{AnomalyStore, MemoryStore, RecordStore};
