//! Seasonal ARIMA models for time series forecasting

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
use forecast_math::differencing::{apply_polynomial, differencing_polynomial, integrate, poly_mul};
use forecast_math::optimization::{nelder_mead, NelderMeadConfig};
use forecast_math::stats::mean;
use std::fmt;

/// Coefficient bound keeping AR and MA parts away from the unit circle
const COEFFICIENT_BOUND: f64 = 0.99;

/// Orders of an ARIMA(p,d,q)(P,D,Q)[s] model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SarimaOrder {
    /// AR order (p)
    pub p: usize,
    /// Differencing order (d)
    pub d: usize,
    /// MA order (q)
    pub q: usize,
    /// Seasonal AR order (P)
    pub cap_p: usize,
    /// Seasonal differencing order (D)
    pub cap_d: usize,
    /// Seasonal MA order (Q)
    pub cap_q: usize,
    /// Seasonal period (s)
    pub period: usize,
}

impl SarimaOrder {
    /// Non-seasonal ARIMA(p,d,q)
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self::seasonal(p, d, q, 0, 0, 0, 0)
    }

    /// Seasonal ARIMA(p,d,q)(P,D,Q)[period]
    pub fn seasonal(
        p: usize,
        d: usize,
        q: usize,
        cap_p: usize,
        cap_d: usize,
        cap_q: usize,
        period: usize,
    ) -> Self {
        Self {
            p,
            d,
            q,
            cap_p,
            cap_d,
            cap_q,
            period,
        }
    }

    /// Whether any seasonal term is active
    pub fn is_seasonal(&self) -> bool {
        self.period > 1 && (self.cap_p + self.cap_d + self.cap_q) > 0
    }

    /// Number of AR and MA coefficients
    pub fn num_coefficients(&self) -> usize {
        self.p + self.q + self.cap_p + self.cap_q
    }

    /// Highest lag of the expanded AR polynomial
    pub fn ar_lags(&self) -> usize {
        self.p + self.period * self.cap_p
    }

    /// Highest lag of the expanded MA polynomial
    pub fn ma_lags(&self) -> usize {
        self.q + self.period * self.cap_q
    }

    /// Backshift polynomial of the differencing part
    pub fn differencing(&self) -> Vec<f64> {
        differencing_polynomial(self.d, self.cap_d, self.period)
    }
}

impl fmt::Display for SarimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)?;
        if self.is_seasonal() {
            write!(
                f,
                "({},{},{})[{}]",
                self.cap_p, self.cap_d, self.cap_q, self.period
            )?;
        }
        Ok(())
    }
}

/// Seasonal ARIMA model estimated by conditional sum of squares
#[derive(Debug, Clone)]
pub struct Sarima {
    /// Name of the model
    name: String,
    /// Model orders
    order: SarimaOrder,
    /// Estimate a constant (mean, or drift after one difference)
    include_constant: bool,
    /// First differenced observation whose residual enters the likelihood
    conditioning: Option<usize>,
    /// Optimiser settings
    optimizer: NelderMeadConfig,
}

/// Trained seasonal ARIMA model
#[derive(Debug, Clone)]
pub struct TrainedSarima {
    /// Name of the model
    name: String,
    /// Model orders
    order: SarimaOrder,
    /// Constant on the differenced scale
    constant: f64,
    /// Expanded AR coefficients for lags 1..
    ar: Vec<f64>,
    /// Expanded MA coefficients for lags 1..
    ma: Vec<f64>,
    /// Observed series
    history: Vec<f64>,
    /// Differenced series
    differenced: Vec<f64>,
    /// In-sample one-step residuals on the differenced scale
    residuals: Vec<f64>,
    /// Residual variance
    sigma2: f64,
    /// Number of estimated parameters, innovation variance included
    num_params: usize,
    /// Residuals used in the likelihood
    n_effective: usize,
}

impl Sarima {
    /// Create a model; a constant is estimated when `d + D <= 1`
    pub fn new(order: SarimaOrder) -> Self {
        Self {
            name: order.to_string(),
            order,
            include_constant: order.d + order.cap_d <= 1,
            conditioning: None,
            optimizer: NelderMeadConfig::default(),
        }
    }

    /// Force the constant term on or off
    pub fn with_constant(mut self, include_constant: bool) -> Self {
        self.include_constant = include_constant;
        self
    }

    /// Condition the likelihood on the first `start` differenced observations
    ///
    /// Models fitted with the same `start` on the same series are scored over
    /// the same residuals, so their information criteria are comparable.
    /// `start` must cover the AR lags.
    pub fn with_conditioning(mut self, start: usize) -> Self {
        self.conditioning = Some(start);
        self
    }

    pub fn order(&self) -> SarimaOrder {
        self.order
    }

    /// Smallest series length this model can be estimated on
    pub fn min_observations(&self) -> usize {
        let degree = self.order.differencing().len() - 1;
        let start = self.conditioning.unwrap_or(0).max(self.order.ar_lags());
        degree + start + self.num_params() + 2
    }

    fn conditioning_start(&self) -> Result<usize> {
        let lags = self.order.ar_lags();
        match self.conditioning {
            Some(start) if start < lags => Err(ForecastError::InvalidParameter(format!(
                "{} needs {} conditioning observations, got {}",
                self.name, lags, start
            ))),
            Some(start) => Ok(start),
            None => Ok(lags),
        }
    }

    fn num_params(&self) -> usize {
        self.order.num_coefficients() + usize::from(self.include_constant) + 1
    }

    /// Split a flat parameter vector into constant and expanded polynomials
    fn unpack(&self, params: &[f64]) -> (f64, Vec<f64>, Vec<f64>) {
        let o = &self.order;
        let (constant, rest) = if self.include_constant {
            (params[0], &params[1..])
        } else {
            (0.0, params)
        };
        let (phi, rest) = rest.split_at(o.p);
        let (theta, rest) = rest.split_at(o.q);
        let (seasonal_phi, seasonal_theta) = rest.split_at(o.cap_p);

        let ar = expand(phi, seasonal_phi, o.period, -1.0);
        let ma = expand(theta, seasonal_theta, o.period, 1.0);
        (constant, ar, ma)
    }
}

/// Multiply `(1 + sign*sum a_i B^i)(1 + sign*sum A_j B^(s*j))` and return the
/// lag coefficients with the sign convention undone.
fn expand(regular: &[f64], seasonal: &[f64], period: usize, sign: f64) -> Vec<f64> {
    let mut left = vec![1.0];
    left.extend(regular.iter().map(|c| sign * c));

    let mut right = vec![0.0; period * seasonal.len() + 1];
    right[0] = 1.0;
    for (j, c) in seasonal.iter().enumerate() {
        right[period * (j + 1)] = sign * c;
    }

    poly_mul(&left, &right)
        .into_iter()
        .skip(1)
        .map(|c| sign * c)
        .collect()
}

/// One-step residuals of an ARMA recursion on the centred series
///
/// Residuals before `start` are zero; returns the residual vector and the sum
/// of squares over `start..`.
fn css_residuals(centred: &[f64], ar: &[f64], ma: &[f64], start: usize) -> (Vec<f64>, f64) {
    let n = centred.len();
    let mut residuals = vec![0.0; n];
    let mut css = 0.0;

    for t in start..n {
        let mut prediction = 0.0;
        for (k, a) in ar.iter().enumerate() {
            prediction += a * centred[t - 1 - k];
        }
        for (k, b) in ma.iter().enumerate() {
            if t > k {
                prediction += b * residuals[t - 1 - k];
            }
        }
        let error = centred[t] - prediction;
        residuals[t] = error;
        css += error * error;
    }

    (residuals, css)
}

impl ForecastModel for Sarima {
    type Trained = TrainedSarima;

    fn train(&self, data: &TimeSeries) -> Result<TrainedSarima> {
        let start = self.conditioning_start()?;
        let values = data.values();
        let needed = self.min_observations();
        if values.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: values.len(),
            });
        }

        let poly = self.order.differencing();
        let differenced = apply_polynomial(values, &poly);
        let n_effective = differenced.len() - start;

        let centre = mean(&differenced)?;
        let mut initial = Vec::with_capacity(self.num_params());
        let mut bounds = Vec::with_capacity(self.num_params());
        if self.include_constant {
            initial.push(centre);
            bounds.push((f64::NEG_INFINITY, f64::INFINITY));
        }
        for _ in 0..self.order.num_coefficients() {
            initial.push(0.0);
            bounds.push((-COEFFICIENT_BOUND, COEFFICIENT_BOUND));
        }

        let objective = |params: &[f64]| {
            let (constant, ar, ma) = self.unpack(params);
            let centred: Vec<f64> = differenced.iter().map(|w| w - constant).collect();
            css_residuals(&centred, &ar, &ma, start).1
        };
        let solution = nelder_mead(objective, &initial, Some(&bounds), &self.optimizer);
        if !solution.value.is_finite() {
            return Err(ForecastError::ComputationError(format!(
                "{} did not converge to a finite sum of squares",
                self.name
            )));
        }

        let (constant, ar, ma) = self.unpack(&solution.point);
        let centred: Vec<f64> = differenced.iter().map(|w| w - constant).collect();
        let (residuals, css) = css_residuals(&centred, &ar, &ma, start);
        // A perfect fit would give an infinite likelihood
        let sigma2 = (css / n_effective as f64).max(f64::EPSILON);

        tracing::trace!(
            model = %self.name,
            iterations = solution.iterations,
            converged = solution.converged,
            sigma2,
            "estimated ARIMA coefficients"
        );

        Ok(TrainedSarima {
            name: self.name.clone(),
            order: self.order,
            constant,
            ar,
            ma,
            history: values.to_vec(),
            differenced,
            residuals,
            sigma2,
            num_params: self.num_params(),
            n_effective,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedSarima {
    pub fn order(&self) -> SarimaOrder {
        self.order
    }

    /// Estimated constant on the differenced scale
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Expanded AR coefficients, lag 1 first
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    /// Expanded MA coefficients, lag 1 first
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Residuals the likelihood is computed over
    pub fn n_effective(&self) -> usize {
        self.n_effective
    }

    /// Gaussian conditional log-likelihood
    pub fn log_likelihood(&self) -> f64 {
        let n = self.n_effective as f64;
        -0.5 * n * ((2.0 * std::f64::consts::PI * self.sigma2).ln() + 1.0)
    }

    /// Akaike information criterion
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.num_params as f64
    }

    /// Small-sample corrected AIC; infinite when the sample is too small
    pub fn aicc(&self) -> f64 {
        let n = self.n_effective as f64;
        let k = self.num_params as f64;
        if n - k - 1.0 <= 0.0 {
            return f64::INFINITY;
        }
        self.aic() + 2.0 * k * (k + 1.0) / (n - k - 1.0)
    }
}

impl TrainedForecastModel for TrainedSarima {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let mut centred: Vec<f64> = self.differenced.iter().map(|w| w - self.constant).collect();
        let mut shocks = self.residuals.clone();
        let mut future = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let t = centred.len();
            let mut prediction = 0.0;
            for (k, a) in self.ar.iter().enumerate() {
                if t > k {
                    prediction += a * centred[t - 1 - k];
                }
            }
            for (k, b) in self.ma.iter().enumerate() {
                if t > k {
                    prediction += b * shocks[t - 1 - k];
                }
            }
            centred.push(prediction);
            shocks.push(0.0);
            future.push(prediction + self.constant);
        }

        let values = integrate(&future, &self.history, &self.order.differencing())?;
        ForecastResult::new(values, horizon)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
