//! Automatic seasonal ARIMA order selection

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::arima::{Sarima, SarimaOrder, TrainedSarima};
use crate::models::ForecastModel;
use forecast_math::differencing::seasonal_difference;
use forecast_math::stationarity::{ndiffs, needs_seasonal_difference};
use std::collections::HashSet;

/// Residuals needed to estimate a mean and a variance with a finite AICc
const WHITE_NOISE_RESIDUALS: usize = 4;

/// Search limits for automatic order selection
#[derive(Debug, Clone)]
pub struct AutoArimaConfig {
    /// Maximum AR order
    pub max_p: usize,
    /// Maximum MA order
    pub max_q: usize,
    /// Maximum regular differencing
    pub max_d: usize,
    /// Maximum seasonal AR order
    pub max_cap_p: usize,
    /// Maximum seasonal MA order
    pub max_cap_q: usize,
    /// Maximum seasonal differencing
    pub max_cap_d: usize,
    /// Maximum of p + q + P + Q in exhaustive search
    pub max_order: usize,
    /// Cycle length; 0 or 1 disables seasonal terms
    pub season_length: usize,
    /// Stepwise search instead of exhaustive
    pub stepwise: bool,
    /// Maximum number of models fitted in a stepwise search
    pub max_models: usize,
}

impl Default for AutoArimaConfig {
    fn default() -> Self {
        Self {
            max_p: 5,
            max_q: 5,
            max_d: 2,
            max_cap_p: 2,
            max_cap_q: 2,
            max_cap_d: 1,
            max_order: 5,
            season_length: 1,
            stepwise: true,
            max_models: 94,
        }
    }
}

impl AutoArimaConfig {
    /// Set the cycle length
    pub fn with_season_length(mut self, season_length: usize) -> Self {
        self.season_length = season_length;
        self
    }

    /// Fit every order combination instead of walking neighbours
    pub fn exhaustive(mut self) -> Self {
        self.stepwise = false;
        self
    }
}

/// ARIMA model whose orders are chosen by AICc
#[derive(Debug, Clone)]
pub struct AutoArima {
    name: String,
    config: AutoArimaConfig,
}

impl AutoArima {
    pub fn with_config(config: AutoArimaConfig) -> Self {
        Self {
            name: "AutoARIMA".to_string(),
            config,
        }
    }

    /// Stepwise search tuned to the given cycle length
    pub fn seasonal(season_length: usize) -> Self {
        Self::with_config(AutoArimaConfig::default().with_season_length(season_length))
    }

    pub fn config(&self) -> &AutoArimaConfig {
        &self.config
    }

    /// Fewest observations accepted before any candidate is tried
    pub fn min_observations(&self) -> usize {
        self.config.season_length.max(3)
    }

    /// Differencing orders (d, D) for `values`
    fn differencing_orders(&self, values: &[f64]) -> (usize, usize) {
        let s = self.config.season_length;
        let cap_d = if s > 1 && self.config.max_cap_d > 0 && needs_seasonal_difference(values, s) {
            1
        } else {
            0
        };
        let seasonally_differenced = seasonal_difference(values, cap_d, s);
        let d = ndiffs(&seasonally_differenced, self.config.max_d);
        (d, cap_d)
    }

    /// Conditioning start shared by every candidate of one search
    ///
    /// Covers the longest AR structure the search may visit, but never more
    /// than half of the differenced series, and always leaves enough residuals
    /// for a white noise model with a mean. Candidates needing more lags than
    /// that are not fitted.
    fn shared_start(&self, differenced_len: usize, seasonal: bool) -> usize {
        let c = &self.config;
        let seasonal_lags = if seasonal {
            c.season_length * c.max_cap_p
        } else {
            0
        };
        (c.max_p + seasonal_lags)
            .min(differenced_len / 2)
            .min(differenced_len.saturating_sub(WHITE_NOISE_RESIDUALS))
    }

    fn within_limits(&self, order: &SarimaOrder) -> bool {
        let c = &self.config;
        order.p <= c.max_p && order.q <= c.max_q && order.cap_p <= c.max_cap_p && order.cap_q <= c.max_cap_q
    }

    fn exhaustive_candidates(&self, d: usize, cap_d: usize, seasonal: bool) -> Vec<SarimaOrder> {
        let c = &self.config;
        let (max_cap_p, max_cap_q) = if seasonal { (c.max_cap_p, c.max_cap_q) } else { (0, 0) };
        let mut orders = Vec::new();
        for p in 0..=c.max_p {
            for q in 0..=c.max_q {
                for cap_p in 0..=max_cap_p {
                    for cap_q in 0..=max_cap_q {
                        if p + q + cap_p + cap_q <= c.max_order {
                            orders.push(SarimaOrder::seasonal(
                                p,
                                d,
                                q,
                                cap_p,
                                cap_d,
                                cap_q,
                                c.season_length,
                            ));
                        }
                    }
                }
            }
        }
        orders
    }

    fn neighbours(order: &SarimaOrder, seasonal: bool) -> Vec<SarimaOrder> {
        let mut moves: Vec<[isize; 4]> = vec![
            [-1, 0, 0, 0],
            [1, 0, 0, 0],
            [0, -1, 0, 0],
            [0, 1, 0, 0],
            [-1, -1, 0, 0],
            [1, 1, 0, 0],
        ];
        if seasonal {
            moves.extend_from_slice(&[
                [0, 0, -1, 0],
                [0, 0, 1, 0],
                [0, 0, 0, -1],
                [0, 0, 0, 1],
                [0, 0, -1, -1],
                [0, 0, 1, 1],
            ]);
        }

        moves
            .into_iter()
            .filter_map(|[dp, dq, dcp, dcq]| {
                Some(SarimaOrder {
                    p: order.p.checked_add_signed(dp)?,
                    q: order.q.checked_add_signed(dq)?,
                    cap_p: order.cap_p.checked_add_signed(dcp)?,
                    cap_q: order.cap_q.checked_add_signed(dcq)?,
                    ..*order
                })
            })
            .collect()
    }
}

/// Fitted candidates and the running best
struct Search<'a> {
    series: &'a TimeSeries,
    start: usize,
    visited: HashSet<SarimaOrder>,
    best: Option<(f64, TrainedSarima)>,
    fitted: usize,
}

impl<'a> Search<'a> {
    fn new(series: &'a TimeSeries, start: usize) -> Self {
        Self {
            series,
            start,
            visited: HashSet::new(),
            best: None,
            fitted: 0,
        }
    }

    /// Fit `order` once; true when it became the new best
    fn try_order(&mut self, order: SarimaOrder) -> bool {
        if !self.visited.insert(order) {
            return false;
        }

        if order.ar_lags() > self.start {
            tracing::trace!(%order, start = self.start, "candidate needs more lags than the shared start");
            return false;
        }
        let trained = match Sarima::new(order)
            .with_conditioning(self.start)
            .train(self.series)
        {
            Ok(trained) => trained,
            Err(e) => {
                tracing::trace!(%order, error = %e, "candidate skipped");
                return false;
            }
        };
        self.fitted += 1;

        let score = trained.aicc();
        if !score.is_finite() {
            return false;
        }
        let improves = self
            .best
            .as_ref()
            .map_or(true, |(best, _)| score < *best);
        if improves {
            self.best = Some((score, trained));
        }
        improves
    }

    fn best_order(&self) -> Option<SarimaOrder> {
        self.best.as_ref().map(|(_, trained)| trained.order())
    }
}

impl ForecastModel for AutoArima {
    type Trained = TrainedSarima;

    fn train(&self, data: &TimeSeries) -> Result<TrainedSarima> {
        let needed = self.min_observations();
        if data.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: data.len(),
            });
        }

        let s = self.config.season_length;
        let (d, cap_d) = self.differencing_orders(data.values());
        let seasonal = s > 1 && data.len() >= 2 * s;
        let differenced_len = data.len().saturating_sub(d + cap_d * s);
        let start = self.shared_start(differenced_len, seasonal);
        let mut search = Search::new(data, start);

        if self.config.stepwise {
            let (sp, sq) = if seasonal { (1, 1) } else { (0, 0) };
            let starts = [(2, 2, sp, sq), (0, 0, 0, 0), (1, 0, sp, 0), (0, 1, 0, sq)];
            for (p, q, cap_p, cap_q) in starts {
                search.try_order(SarimaOrder::seasonal(p, d, q, cap_p, cap_d, cap_q, s));
            }

            'walk: while let Some(current) = search.best_order() {
                for candidate in Self::neighbours(&current, seasonal) {
                    if search.visited.len() >= self.config.max_models {
                        break 'walk;
                    }
                    if self.within_limits(&candidate) && search.try_order(candidate) {
                        continue 'walk;
                    }
                }
                break;
            }
        } else {
            for order in self.exhaustive_candidates(d, cap_d, seasonal) {
                search.try_order(order);
            }
        }

        let fitted = search.fitted;
        let (score, trained) = search.best.ok_or_else(|| {
            ForecastError::ComputationError(format!(
                "no ARIMA candidate could be fitted for product {}",
                data.entity_id()
            ))
        })?;

        tracing::debug!(
            product = data.entity_id(),
            order = %trained.order(),
            aicc = score,
            fitted,
            start,
            "selected ARIMA order"
        );
        Ok(trained)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
