//! Last-value baseline

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};

/// Carries the last observation forward
#[derive(Debug, Clone)]
pub struct Naive {
    name: String,
}

#[derive(Debug, Clone)]
pub struct TrainedNaive {
    name: String,
    last: f64,
}

impl Naive {
    pub fn new() -> Self {
        Self {
            name: "Naive".to_string(),
        }
    }
}

impl Default for Naive {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastModel for Naive {
    type Trained = TrainedNaive;

    fn train(&self, data: &TimeSeries) -> Result<TrainedNaive> {
        let last = data
            .values()
            .last()
            .copied()
            .ok_or(ForecastError::InsufficientData { needed: 1, got: 0 })?;

        Ok(TrainedNaive {
            name: self.name.clone(),
            last,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedForecastModel for TrainedNaive {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        ForecastResult::new(vec![self.last; horizon], horizon)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Period;

    #[test]
    fn test_carries_last_value() {
        let series =
            TimeSeries::monthly(1, Period::from_yyyymm(201910).unwrap(), vec![3.0, 8.0, 5.5])
                .unwrap();
        let forecast = Naive::new().train(&series).unwrap().forecast(3).unwrap();
        assert_eq!(forecast.values(), &[5.5, 5.5, 5.5]);
    }

    #[test]
    fn test_empty_series_is_insufficient() {
        let series = TimeSeries::new(1, Vec::new(), Vec::new()).unwrap();
        assert!(matches!(
            Naive::new().train(&series),
            Err(ForecastError::InsufficientData { needed: 1, got: 0 })
        ));
    }
}
