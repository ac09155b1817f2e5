use chrono::Months;
use pretty_assertions::assert_eq;
use sellin_forecast::ensemble::{EnsembleConfig, EnsembleRunner, Parallelism};
use sellin_forecast::models::{ModelKind, ShortHistory};
use sellin_forecast::output::{split_by_model, TargetPeriod};
use sellin_forecast::panel::PanelRow;
use sellin_forecast::period::Period;
use sellin_forecast::ForecastError;

fn p(code: i64) -> Period {
    Period::from_yyyymm(code).unwrap()
}

/// `months` consecutive rows for `entity` ending at 2019-12
fn history(entity: i64, months: u32) -> Vec<PanelRow> {
    let first = p(201912)
        .first_day()
        .checked_sub_months(Months::new(months - 1))
        .map(Period::from_date)
        .unwrap();
    (0..months)
        .map(|i| {
            let value = 100.0 + 15.0 * ((i % 6) as f64) + (entity % 7) as f64 + 0.5 * i as f64;
            PanelRow::new(entity, first.plus_months(i).unwrap(), value)
        })
        .collect()
}

fn config(short_history: ShortHistory) -> EnsembleConfig {
    EnsembleConfig {
        horizon: 2,
        season_length: 6,
        roster: vec![ModelKind::AutoArima, ModelKind::SeasonalNaive],
        parallelism: Parallelism::Threads(4),
        short_history,
        fill_gaps: false,
    }
}

#[test]
fn test_forecast_completeness() {
    let panel: Vec<PanelRow> = [20001, 20002, 20003]
        .iter()
        .flat_map(|&entity| history(entity, 24))
        .collect();

    let output = EnsembleRunner::new(config(ShortHistory::Degrade))
        .run(&panel)
        .unwrap();
    assert!(output.failures.is_empty());
    assert_eq!(output.forecasts.len(), 3 * 2 * 2);

    for record in &output.forecasts {
        let expected = if record.step == 1 { p(202001) } else { p(202002) };
        assert_eq!(record.period, expected);
    }

    let roster = config(ShortHistory::Degrade).roster;
    let outputs = split_by_model(&output, &roster, TargetPeriod::Absolute(p(202002)));
    for model_output in &outputs {
        let ids: Vec<i64> = model_output.rows.iter().map(|r| r.entity_id).collect();
        assert_eq!(ids, vec![20001, 20002, 20003]);
    }
}

#[test]
fn test_output_order_is_product_then_roster_then_step() {
    let panel: Vec<PanelRow> = [5, 3, 9]
        .iter()
        .flat_map(|&entity| history(entity, 24))
        .collect();

    let output = EnsembleRunner::new(config(ShortHistory::Degrade))
        .run(&panel)
        .unwrap();
    let keys: Vec<(i64, ModelKind, usize)> = output
        .forecasts
        .iter()
        .map(|r| (r.entity_id, r.model, r.step))
        .collect();

    let mut expected = Vec::new();
    for entity in [3, 5, 9] {
        for model in [ModelKind::AutoArima, ModelKind::SeasonalNaive] {
            for step in [1, 2] {
                expected.push((entity, model, step));
            }
        }
    }
    assert_eq!(keys, expected);
}

#[test]
fn test_results_do_not_depend_on_worker_count() {
    let panel: Vec<PanelRow> = (1..=8).flat_map(|entity| history(entity, 24)).collect();

    let single = EnsembleRunner::new(EnsembleConfig {
        parallelism: Parallelism::Threads(1),
        ..config(ShortHistory::Degrade)
    })
    .run(&panel)
    .unwrap();
    let many = EnsembleRunner::new(EnsembleConfig {
        parallelism: Parallelism::All,
        ..config(ShortHistory::Degrade)
    })
    .run(&panel)
    .unwrap();

    assert_eq!(single, many);
}

#[test]
fn test_short_series_failure_is_isolated_under_fail() {
    let mut panel = history(20001, 24);
    panel.extend(history(20002, 3));

    let output = EnsembleRunner::new(config(ShortHistory::Fail))
        .run(&panel)
        .unwrap();

    let failed: Vec<(i64, ModelKind)> = output
        .failures
        .iter()
        .map(|f| (f.entity_id, f.model))
        .collect();
    assert_eq!(
        failed,
        vec![(20002, ModelKind::AutoArima), (20002, ModelKind::SeasonalNaive)]
    );
    assert_eq!(output.forecasts.len(), 4);
    assert!(output.forecasts.iter().all(|r| r.entity_id == 20001));
}

#[test]
fn test_short_series_degrades_seasonal_naive() {
    let panel = history(20002, 3);

    let output = EnsembleRunner::new(config(ShortHistory::Degrade))
        .run(&panel)
        .unwrap();

    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].model, ModelKind::AutoArima);
    let values: Vec<f64> = output
        .records_for(ModelKind::SeasonalNaive)
        .map(|r| r.value)
        .collect();
    let first_two: Vec<f64> = panel.iter().take(2).map(|r| r.quantity).collect();
    assert_eq!(values, first_two);
}

#[test]
fn test_duplicate_panel_rows_are_fatal() {
    let mut panel = history(20001, 12);
    panel.push(panel[0]);

    let result = EnsembleRunner::new(config(ShortHistory::Degrade)).run(&panel);
    assert!(matches!(result, Err(ForecastError::ForecastingError(_))));
}
