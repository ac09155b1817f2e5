//! Forecasting models for monthly sales series

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::str::FromStr;

/// Forecast result containing predicted values
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    /// Forecasted values
    values: Vec<f64>,
    /// Number of periods forecasted
    horizons: usize,
}

impl ForecastResult {
    /// Create a new forecast result
    pub fn new(values: Vec<f64>, horizons: usize) -> Result<Self> {
        if values.len() != horizons {
            return Err(ForecastError::ComputationError(format!(
                "Values length ({}) doesn't match horizons ({})",
                values.len(),
                horizons
            )));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::ComputationError(format!(
                "Forecast step {} is not a finite number",
                pos + 1
            )));
        }

        Ok(Self { values, horizons })
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.horizons
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug {
    /// Generate forecast for future periods
    fn forecast(&self, horizons: usize) -> Result<ForecastResult>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on a series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on a series
    fn train(&self, data: &TimeSeries) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// What a seasonal baseline does with less than one full cycle of history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortHistory {
    /// Report insufficient data
    Fail,
    /// Tile the partial cycle that is available
    #[default]
    Degrade,
}

impl FromStr for ShortHistory {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(ShortHistory::Fail),
            "degrade" => Ok(ShortHistory::Degrade),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown short-history policy '{}'; expected fail or degrade",
                other
            ))),
        }
    }
}

/// Model settings shared by every series in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSettings {
    pub season_length: usize,
    pub short_history: ShortHistory,
}

/// Models that can appear in the roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "AutoARIMA")]
    AutoArima,
    SeasonalNaive,
    Naive,
}

impl ModelKind {
    /// Identifier used in output file names and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::AutoArima => "AutoARIMA",
            ModelKind::SeasonalNaive => "SeasonalNaive",
            ModelKind::Naive => "Naive",
        }
    }

    /// Train this model on `series` and forecast `horizon` steps
    pub fn fit_forecast(
        &self,
        series: &TimeSeries,
        settings: &ModelSettings,
        horizon: usize,
    ) -> Result<ForecastResult> {
        match self {
            ModelKind::AutoArima => {
                let model = auto_arima::AutoArima::seasonal(settings.season_length);
                model.train(series)?.forecast(horizon)
            }
            ModelKind::SeasonalNaive => {
                let model = seasonal_naive::SeasonalNaive::new(settings.season_length)?
                    .with_short_history(settings.short_history);
                model.train(series)?.forecast(horizon)
            }
            ModelKind::Naive => naive::Naive::new().train(series)?.forecast(horizon),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "autoarima" | "auto_arima" | "arima" => Ok(ModelKind::AutoArima),
            "seasonalnaive" | "seasonal_naive" | "snaive" => Ok(ModelKind::SeasonalNaive),
            "naive" => Ok(ModelKind::Naive),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown model '{}'; expected AutoARIMA, SeasonalNaive or Naive",
                other
            ))),
        }
    }
}

pub mod arima;
pub mod auto_arima;
pub mod naive;
pub mod seasonal_naive;
