//! Seasonal naive baseline
//!
//! Each forecast repeats the observation from the same position in the last
//! observed cycle.

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, ShortHistory, TrainedForecastModel};

/// Seasonal naive model
#[derive(Debug, Clone)]
pub struct SeasonalNaive {
    name: String,
    season_length: usize,
    short_history: ShortHistory,
}

/// Seasonal naive model holding its last cycle
#[derive(Debug, Clone)]
pub struct TrainedSeasonalNaive {
    name: String,
    last_cycle: Vec<f64>,
}

impl SeasonalNaive {
    /// Create a model for the given cycle length
    pub fn new(season_length: usize) -> Result<Self> {
        if season_length == 0 {
            return Err(ForecastError::InvalidParameter(
                "Season length must be positive".to_string(),
            ));
        }

        Ok(Self {
            name: "SeasonalNaive".to_string(),
            season_length,
            short_history: ShortHistory::default(),
        })
    }

    /// Choose what happens with less than one cycle of history
    pub fn with_short_history(mut self, policy: ShortHistory) -> Self {
        self.short_history = policy;
        self
    }

    pub fn season_length(&self) -> usize {
        self.season_length
    }
}

impl ForecastModel for SeasonalNaive {
    type Trained = TrainedSeasonalNaive;

    fn train(&self, data: &TimeSeries) -> Result<TrainedSeasonalNaive> {
        let values = data.values();
        let s = self.season_length;

        let last_cycle = if values.len() >= s {
            values[values.len() - s..].to_vec()
        } else {
            match self.short_history {
                ShortHistory::Fail => {
                    return Err(ForecastError::InsufficientData {
                        needed: s,
                        got: values.len(),
                    })
                }
                ShortHistory::Degrade if values.is_empty() => {
                    return Err(ForecastError::InsufficientData { needed: 1, got: 0 })
                }
                ShortHistory::Degrade => values.to_vec(),
            }
        };

        Ok(TrainedSeasonalNaive {
            name: self.name.clone(),
            last_cycle,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for TrainedSeasonalNaive {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let values = self
            .last_cycle
            .iter()
            .copied()
            .cycle()
            .take(horizon)
            .collect();
        ForecastResult::new(values, horizon)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
