//! Per-product forecasting with a roster of models
//!
//! Every product is fitted independently on a rayon pool. A model that fails
//! for one product is recorded as a [`SeriesFailure`] and never stops the
//! remaining pairs.

use crate::data::{EntityId, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::models::{ModelKind, ModelSettings, ShortHistory};
use crate::panel::{panel_to_series, PanelRow};
use crate::period::{future_periods, Period};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Size of the worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parallelism {
    /// One worker per hardware thread
    #[default]
    All,
    /// A fixed number of workers
    Threads(usize),
}

impl FromStr for Parallelism {
    type Err = ForecastError;

    /// Accepts `all`, `-1` or a positive worker count
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "all" | "-1" => Ok(Parallelism::All),
            other => other
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .map(Parallelism::Threads)
                .ok_or_else(|| {
                    ForecastError::InvalidParameter(format!(
                        "Parallelism must be 'all' or a positive number, got '{}'",
                        s
                    ))
                }),
        }
    }
}

/// Settings for an ensemble run
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleConfig {
    /// Number of months to forecast
    pub horizon: usize,
    /// Cycle length used by seasonal models
    pub season_length: usize,
    /// Models to fit, in output order
    pub roster: Vec<ModelKind>,
    pub parallelism: Parallelism,
    pub short_history: ShortHistory,
    /// Insert zero sales for months with no rows
    pub fill_gaps: bool,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            horizon: 2,
            season_length: 6,
            roster: vec![ModelKind::AutoArima, ModelKind::SeasonalNaive],
            parallelism: Parallelism::All,
            short_history: ShortHistory::Degrade,
            fill_gaps: false,
        }
    }
}

impl EnsembleConfig {
    /// Check the settings that would make every series fail
    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(ForecastError::ForecastingError(
                "Horizon must be at least one month".to_string(),
            ));
        }
        if self.season_length == 0 {
            return Err(ForecastError::ForecastingError(
                "Season length must be positive".to_string(),
            ));
        }
        if self.roster.is_empty() {
            return Err(ForecastError::ForecastingError(
                "Model roster is empty".to_string(),
            ));
        }
        if let Some(dup) = self
            .roster
            .iter()
            .enumerate()
            .find(|(i, m)| self.roster[..*i].contains(*m))
            .map(|(_, m)| m)
        {
            return Err(ForecastError::ForecastingError(format!(
                "Model {} appears more than once in the roster",
                dup
            )));
        }
        if self.parallelism == Parallelism::Threads(0) {
            return Err(ForecastError::ForecastingError(
                "Worker count must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn settings(&self) -> ModelSettings {
        ModelSettings {
            season_length: self.season_length,
            short_history: self.short_history,
        }
    }
}

/// One forecast value for a product, model and step
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastRecord {
    pub entity_id: EntityId,
    /// 1-based position in the horizon
    pub step: usize,
    pub period: Period,
    pub model: ModelKind,
    pub value: f64,
}

/// A model that could not produce a forecast for one product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesFailure {
    pub entity_id: EntityId,
    pub model: ModelKind,
    pub reason: String,
}

/// Forecasts and isolated failures of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnsembleOutput {
    /// Sorted by product, roster position, then step
    pub forecasts: Vec<ForecastRecord>,
    pub failures: Vec<SeriesFailure>,
}

impl EnsembleOutput {
    /// Forecasts produced by `model`
    pub fn records_for(&self, model: ModelKind) -> impl Iterator<Item = &ForecastRecord> {
        self.forecasts.iter().filter(move |r| r.model == model)
    }

    /// Number of failed products per model
    pub fn failure_counts(&self) -> BTreeMap<ModelKind, usize> {
        let mut counts = BTreeMap::new();
        for failure in &self.failures {
            *counts.entry(failure.model).or_insert(0) += 1;
        }
        counts
    }
}

/// Runs the model roster over every product of a panel
#[derive(Debug, Clone)]
pub struct EnsembleRunner {
    config: EnsembleConfig,
}

impl EnsembleRunner {
    pub fn new(config: EnsembleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// Forecast every product in `panel`
    pub fn run(&self, panel: &[PanelRow]) -> Result<EnsembleOutput> {
        self.config.validate()?;

        let mut series = panel_to_series(panel)?;
        if self.config.fill_gaps {
            series = series
                .iter()
                .map(|s| s.fill_gaps(0.0))
                .collect::<Result<Vec<_>>>()?;
        }

        let threads = match self.config.parallelism {
            Parallelism::All => 0,
            Parallelism::Threads(n) => n,
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| {
                ForecastError::ForecastingError(format!("cannot start worker pool: {}", e))
            })?;

        tracing::info!(
            products = series.len(),
            models = self.config.roster.len(),
            horizon = self.config.horizon,
            workers = pool.current_num_threads(),
            "forecasting"
        );

        // Indexed collect keeps product order regardless of scheduling
        let per_series: Vec<(Vec<ForecastRecord>, Vec<SeriesFailure>)> =
            pool.install(|| series.par_iter().map(|s| self.forecast_series(s)).collect());

        let mut output = EnsembleOutput::default();
        for (records, failures) in per_series {
            output.forecasts.extend(records);
            output.failures.extend(failures);
        }

        let failure_counts = output.failure_counts();
        for model in &self.config.roster {
            let failed = failure_counts.get(model).copied().unwrap_or(0);
            if failed > 0 {
                tracing::warn!(model = %model, failed, "model failed for some products");
            }
        }
        tracing::info!(
            forecasts = output.forecasts.len(),
            failures = output.failures.len(),
            "forecasting finished"
        );
        Ok(output)
    }

    fn forecast_series(&self, series: &TimeSeries) -> (Vec<ForecastRecord>, Vec<SeriesFailure>) {
        let horizon = self.config.horizon;
        let settings = self.config.settings();
        let mut records = Vec::with_capacity(horizon * self.config.roster.len());
        let mut failures = Vec::new();

        let periods = series
            .last_period()
            .ok_or(ForecastError::InsufficientData { needed: 1, got: 0 })
            .and_then(|last| future_periods(last, horizon));

        for &model in &self.config.roster {
            let result = periods.as_ref().map_err(ToString::to_string).and_then(|periods| {
                model
                    .fit_forecast(series, &settings, horizon)
                    .map(|forecast| (periods, forecast))
                    .map_err(|e| e.to_string())
            });

            match result {
                Ok((periods, forecast)) => {
                    records.extend(periods.iter().zip(forecast.values()).enumerate().map(
                        |(i, (&period, &value))| ForecastRecord {
                            entity_id: series.entity_id(),
                            step: i + 1,
                            period,
                            model,
                            value,
                        },
                    ));
                }
                Err(reason) => {
                    tracing::warn!(
                        product = series.entity_id(),
                        model = %model,
                        %reason,
                        "forecast failed"
                    );
                    failures.push(SeriesFailure {
                        entity_id: series.entity_id(),
                        model,
                        reason,
                    });
                }
            }
        }

        (records, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(code: i64) -> Period {
        Period::from_yyyymm(code).unwrap()
    }

    fn naive_config() -> EnsembleConfig {
        EnsembleConfig {
            roster: vec![ModelKind::Naive, ModelKind::SeasonalNaive],
            parallelism: Parallelism::Threads(2),
            ..EnsembleConfig::default()
        }
    }

    #[test]
    fn test_parallelism_parsing() {
        assert_eq!("all".parse::<Parallelism>().unwrap(), Parallelism::All);
        assert_eq!("-1".parse::<Parallelism>().unwrap(), Parallelism::All);
        assert_eq!("4".parse::<Parallelism>().unwrap(), Parallelism::Threads(4));
        assert!("0".parse::<Parallelism>().is_err());
    }

    #[test]
    fn test_invalid_configs_are_fatal() {
        let panel = vec![PanelRow::new(1, p(202001), 1.0)];
        let configs = [
            EnsembleConfig { horizon: 0, ..naive_config() },
            EnsembleConfig { season_length: 0, ..naive_config() },
            EnsembleConfig { roster: Vec::new(), ..naive_config() },
            EnsembleConfig {
                roster: vec![ModelKind::Naive, ModelKind::Naive],
                ..naive_config()
            },
            EnsembleConfig { parallelism: Parallelism::Threads(0), ..naive_config() },
        ];

        for config in configs {
            let result = EnsembleRunner::new(config).run(&panel);
            assert!(matches!(result, Err(ForecastError::ForecastingError(_))));
        }
    }

    #[test]
    fn test_periods_follow_each_product_last_month() {
        let panel = vec![
            PanelRow::new(1, p(201911), 1.0),
            PanelRow::new(1, p(201912), 2.0),
            PanelRow::new(2, p(201910), 5.0),
        ];
        let config = EnsembleConfig {
            roster: vec![ModelKind::Naive],
            ..naive_config()
        };

        let output = EnsembleRunner::new(config).run(&panel).unwrap();
        let summary: Vec<(EntityId, usize, i64, f64)> = output
            .forecasts
            .iter()
            .map(|r| (r.entity_id, r.step, r.period.yyyymm(), r.value))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, 1, 202001, 2.0),
                (1, 2, 202002, 2.0),
                (2, 1, 201911, 5.0),
                (2, 2, 201912, 5.0),
            ]
        );
    }

    #[test]
    fn test_failures_are_isolated_per_model() {
        let panel = vec![
            PanelRow::new(1, p(201910), 1.0),
            PanelRow::new(1, p(201911), 2.0),
            PanelRow::new(1, p(201912), 3.0),
        ];
        let config = EnsembleConfig {
            short_history: ShortHistory::Fail,
            ..naive_config()
        };

        let output = EnsembleRunner::new(config).run(&panel).unwrap();
        assert_eq!(output.records_for(ModelKind::Naive).count(), 2);
        assert_eq!(output.records_for(ModelKind::SeasonalNaive).count(), 0);
        assert_eq!(output.failures.len(), 1);
        assert_eq!(output.failures[0].model, ModelKind::SeasonalNaive);
    }

    #[test]
    fn test_fill_gaps_inserts_zero_months() {
        let panel = vec![
            PanelRow::new(1, p(201910), 4.0),
            PanelRow::new(1, p(201912), 6.0),
        ];
        let config = EnsembleConfig {
            roster: vec![ModelKind::SeasonalNaive],
            season_length: 3,
            fill_gaps: true,
            ..naive_config()
        };

        let output = EnsembleRunner::new(config).run(&panel).unwrap();
        let values: Vec<f64> = output.forecasts.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![4.0, 0.0]);
    }

    #[test]
    fn test_empty_panel_gives_empty_output() {
        let output = EnsembleRunner::new(naive_config()).run(&[]).unwrap();
        assert_eq!(output, EnsembleOutput::default());
    }
}
