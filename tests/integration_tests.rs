use cashflow_analytics::*;
use chrono::{Duration, NaiveDate};

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

fn expense(id: &str, date: NaiveDate, amount: f64, description: &str) -> ExpenseRecord {
    ExpenseRecord {
        id: id.to_string(),
        date,
        amount,
        description: description.to_string(),
        vendor: None,
        category: None,
        receipt_url: Some("https://receipts.example/ok.pdf".to_string()),
    }
}

fn invoice(id: &str, date: NaiveDate, total: f64) -> InvoiceRecord {
    InvoiceRecord {
        id: id.to_string(),
        date,
        total,
    }
}

/// Seeds `days` consecutive active days ending at `as_of()`, with invoice
/// totals moving by `daily_growth` per day against a flat expense base.
fn seed_cash_flow(store: &MemoryStore, tenant: &str, days: i64, daily_growth: f64) {
    for i in 0..days {
        let date = as_of() - Duration::days(days - 1 - i);
        store.add_invoice(
            tenant,
            invoice(&format!("i-{i}"), date, 1200.0 + daily_growth * i as f64),
        );
        store.add_expense(
            tenant,
            expense(&format!("e-{i}"), date, 500.0, &format!("operations {i}")),
        );
    }
}

#[test]
fn forecast_end_to_end() {
    let store = MemoryStore::new();
    seed_cash_flow(&store, "t1", 60, 8.0);
    let engine = AnalyticsEngine::new(&store, &store).with_as_of(as_of());

    let report = engine.forecast_cash_flow("t1", 30).unwrap();

    assert_eq!(report.period_days, 30);
    assert_eq!(report.points.len(), 30);
    for point in &report.points {
        assert!(point.lower_bound <= point.predicted);
        assert!(point.predicted <= point.upper_bound);
        assert!(point.confidence >= 0.0 && point.confidence <= 1.0);
    }

    let total: f64 = report.points.iter().map(|p| p.predicted).sum();
    assert!((total - report.summary.expected_total).abs() < 1e-9);
    assert!(!report.recommendations.is_empty());
}

#[test]
fn forecast_requires_fourteen_history_points() {
    let store = MemoryStore::new();
    seed_cash_flow(&store, "t1", 13, 0.0);
    let engine = AnalyticsEngine::new(&store, &store).with_as_of(as_of());

    let result = engine.forecast_cash_flow("t1", 30);
    assert!(matches!(
        result,
        Err(AnalyticsError::InsufficientHistory {
            available: 13,
            required: 14
        })
    ));
}

#[test]
fn multi_period_forecast_covers_three_horizons() {
    let store = MemoryStore::new();
    seed_cash_flow(&store, "t1", 120, 4.0);
    let engine = AnalyticsEngine::new(&store, &store).with_as_of(as_of());

    let reports = engine.generate_multi_period_forecast("t1").unwrap();
    assert_eq!(reports.len(), 3);
    for horizon in [30u32, 60, 90] {
        assert_eq!(reports[&horizon].points.len(), horizon as usize);
    }
}

#[test]
fn null_scenario_matches_base_forecast() {
    let store = MemoryStore::new();
    seed_cash_flow(&store, "t1", 120, 4.0);
    let engine = AnalyticsEngine::new(&store, &store).with_as_of(as_of());

    let analysis = engine
        .run_scenario_analysis(
            "t1",
            &[
                Scenario {
                    name: "no change".to_string(),
                    revenue_change_pct: 0.0,
                    expense_change_pct: 0.0,
                },
                Scenario {
                    name: "cut expenses".to_string(),
                    revenue_change_pct: 0.0,
                    expense_change_pct: 20.0,
                },
            ],
        )
        .unwrap();

    let unchanged = &analysis.scenarios[0];
    assert!((unchanged.total_cash_flow - analysis.base_total).abs() < 1e-9);
    assert!(unchanged.impact.abs() < 1e-9);
    assert!(unchanged.impact_pct.abs() < 1e-9);

    let cut = &analysis.scenarios[1];
    assert!((cut.total_cash_flow - analysis.base_total * 0.8).abs() < 1e-6);
}

#[test]
fn duplicate_expenses_produce_one_warning_referencing_the_original() {
    let store = MemoryStore::new();
    let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    store.add_expense("t1", expense("e-1", date, 120.0, "Office Supplies"));
    store.add_expense("t1", expense("e-2", date, 120.0, "Office Supplies"));
    let engine = AnalyticsEngine::new(&store, &store).with_as_of(as_of());

    let scan = engine.run_all_anomaly_checks("t1").unwrap();
    assert_eq!(scan.total_anomalies, 1);

    let unresolved = engine.list_unresolved_anomalies("t1", 10).unwrap();
    assert_eq!(unresolved.len(), 1);
    let finding = &unresolved[0];
    assert_eq!(finding.anomaly_type, AnomalyType::DuplicateTransaction);
    assert_eq!(finding.severity, Severity::Warning);
    assert!((finding.confidence - 0.85).abs() < 1e-10);
    match &finding.expected_value {
        AnomalyValue::Transaction { id, .. } => assert_eq!(id, "e-1"),
        other => panic!("expected the original transaction, got {other:?}"),
    }
}

#[test]
fn missing_receipt_respects_fixed_threshold() {
    let store = MemoryStore::new();
    let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

    let mut over = expense("e-over", date, 80.0, "client dinner");
    over.receipt_url = None;
    store.add_expense("t1", over);

    let mut under = expense("e-under", date, 50.0, "parking");
    under.receipt_url = None;
    store.add_expense("t1", under);

    let engine = AnalyticsEngine::new(&store, &store).with_as_of(as_of());
    let scan = engine.run_all_anomaly_checks("t1").unwrap();
    assert_eq!(scan.total_anomalies, 1);

    let unresolved = engine.list_unresolved_anomalies("t1", 10).unwrap();
    assert_eq!(unresolved[0].anomaly_type, AnomalyType::MissingReceipt);
    assert_eq!(unresolved[0].resource_id, "e-over");
}

#[test]
fn budget_overrun_severity_ladder() {
    let store = MemoryStore::new();
    let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();

    store.add_budget(
        "t1",
        BudgetRecord {
            id: "b-warning".to_string(),
            category: "marketing".to_string(),
            start_date: start,
            end_date: end,
            amount: 1000.0,
            is_approved: true,
        },
    );
    store.add_budget(
        "t1",
        BudgetRecord {
            id: "b-critical".to_string(),
            category: "travel".to_string(),
            start_date: start,
            end_date: end,
            amount: 1000.0,
            is_approved: true,
        },
    );

    let mut marketing = expense("e-m", start, 950.0, "campaign");
    marketing.category = Some("marketing".to_string());
    store.add_expense("t1", marketing);

    let mut travel = expense("e-t", start, 1150.0, "conference travel");
    travel.category = Some("travel".to_string());
    store.add_expense("t1", travel);

    let engine = AnalyticsEngine::new(&store, &store).with_as_of(as_of());
    engine.run_all_anomaly_checks("t1").unwrap();

    let unresolved = engine.list_unresolved_anomalies("t1", 10).unwrap();
    let warning = unresolved.iter().find(|a| a.resource_id == "b-warning").unwrap();
    assert_eq!(warning.severity, Severity::Warning);

    let critical = unresolved
        .iter()
        .find(|a| a.resource_id == "b-critical")
        .unwrap();
    assert_eq!(critical.severity, Severity::Critical);

    // Most severe first.
    assert_eq!(unresolved[0].resource_id, "b-critical");
}

#[test]
fn resolving_twice_is_idempotent_and_one_way() {
    let store = MemoryStore::new();
    let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    store.add_expense("t1", expense("e-1", date, 300.0, "Subscription"));
    store.add_expense("t1", expense("e-2", date, 300.0, "Subscription"));

    let engine = AnalyticsEngine::new(&store, &store).with_as_of(as_of());
    engine.run_all_anomaly_checks("t1").unwrap();

    let unresolved = engine.list_unresolved_anomalies("t1", 10).unwrap();
    let id = unresolved[0].id;

    let first = engine.resolve_anomaly(id, "alex", "confirmed duplicate").unwrap();
    assert!(first.is_resolved);
    assert!(first.resolved_at.is_some());

    let second = engine.resolve_anomaly(id, "alex", "still confirmed").unwrap();
    assert!(second.is_resolved);
    assert_eq!(second.resolved_by.as_deref(), Some("alex"));

    assert!(engine.list_unresolved_anomalies("t1", 10).unwrap().is_empty());
}

#[test]
fn resolving_unknown_id_is_not_found() {
    let store = MemoryStore::new();
    let engine = AnalyticsEngine::new(&store, &store).with_as_of(as_of());

    let result = engine.resolve_anomaly(uuid::Uuid::new_v4(), "alex", "nope");
    assert!(matches!(result, Err(AnalyticsError::AnomalyNotFound(_))));
}

#[test]
fn scan_summary_counts_unresolved_by_severity() {
    let store = MemoryStore::new();
    let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

    // One duplicate (WARNING) and one large missing receipt (CRITICAL).
    store.add_expense("t1", expense("e-1", date, 300.0, "Subscription"));
    store.add_expense("t1", expense("e-2", date, 300.0, "Subscription"));
    let mut big = expense("e-3", date, 1500.0, "conference");
    big.receipt_url = None;
    store.add_expense("t1", big);

    let engine = AnalyticsEngine::new(&store, &store).with_as_of(as_of());
    let scan = engine.run_all_anomaly_checks("t1").unwrap();

    assert_eq!(scan.total_anomalies, 2);
    let count_for = |severity: Severity| {
        scan.severity_summary
            .iter()
            .find(|(s, _)| *s == severity)
            .map(|(_, n)| *n)
            .unwrap()
    };
    assert_eq!(count_for(Severity::Critical), 1);
    assert_eq!(count_for(Severity::Warning), 1);
    assert_eq!(count_for(Severity::Urgent), 0);
}

#[test]
fn anomaly_trends_group_by_day_and_type() {
    let store = MemoryStore::new();
    let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    store.add_expense("t1", expense("e-1", date, 300.0, "Subscription"));
    store.add_expense("t1", expense("e-2", date, 300.0, "Subscription"));
    let mut norcpt = expense("e-3", date, 90.0, "lunch");
    norcpt.receipt_url = None;
    store.add_expense("t1", norcpt);

    let engine = AnalyticsEngine::new(&store, &store).with_as_of(as_of());
    engine.run_all_anomaly_checks("t1").unwrap();

    let trends = engine.get_anomaly_trends("t1", 30).unwrap();
    let total: usize = trends.trends.iter().map(|row| row.total).sum();
    assert_eq!(total, 2);

    let by_type: std::collections::HashMap<_, _> =
        trends.totals_by_type.iter().cloned().collect();
    assert_eq!(by_type[&AnomalyType::DuplicateTransaction], 1);
    assert_eq!(by_type[&AnomalyType::MissingReceipt], 1);
}

#[test]
fn accuracy_scoring_over_logged_forecasts() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    seed_cash_flow(&store, "t1", 60, 0.0);
    let engine = AnalyticsEngine::new(&store, &store).with_as_of(as_of());

    // Log a forecast now; nothing is old enough to evaluate yet.
    engine.forecast_cash_flow("t1", 30)?;
    let report = engine.get_forecast_accuracy("t1", 30)?;
    assert_eq!(report.evaluations, 0);
    assert_eq!(report.accuracy, 0.0);

    // The log entry is stamped with wall-clock time, so re-evaluating from
    // a vantage point 90 days past today picks it up.
    let later = AnalyticsEngine::new(&store, &store)
        .with_as_of(chrono::Utc::now().date_naive() + Duration::days(90));
    let report = later.get_forecast_accuracy("t1", 30)?;
    assert_eq!(report.evaluations, 1);
    assert!(report.accuracy >= 0.0 && report.accuracy <= 1.0);
    assert!(report.mae >= 0.0);
    Ok(())
}

#[test]
fn different_tenants_never_mix() {
    let store = MemoryStore::new();
    let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    store.add_expense("t1", expense("e-1", date, 300.0, "Subscription"));
    store.add_expense("t1", expense("e-2", date, 300.0, "Subscription"));

    let engine = AnalyticsEngine::new(&store, &store).with_as_of(as_of());
    engine.run_all_anomaly_checks("t1").unwrap();

    assert!(engine.list_unresolved_anomalies("t2", 10).unwrap().is_empty());
    let scan = engine.run_all_anomaly_checks("t2").unwrap();
    assert_eq!(scan.total_anomalies, 0);
}
