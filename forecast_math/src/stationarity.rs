//! Stationarity tests used to pick differencing orders

use crate::differencing::{difference, seasonal_difference};
use crate::stats::{mean, population_variance};
use crate::{MathError, Result};

/// KPSS 5% critical value for the level-stationarity null
pub const KPSS_CRITICAL_5PCT: f64 = 0.463;

/// KPSS statistic for level stationarity
///
/// Uses the short Newey-West bandwidth `trunc(4 * (n / 100)^0.25)`. A constant
/// series has no long-run variance and is reported as perfectly stationary.
pub fn kpss_statistic(series: &[f64]) -> Result<f64> {
    let n = series.len();
    if n < 3 {
        return Err(MathError::InsufficientData(format!(
            "KPSS needs at least 3 observations, got {}",
            n
        )));
    }

    let mu = mean(series)?;
    let residuals: Vec<f64> = series.iter().map(|y| y - mu).collect();

    let mut partial = 0.0;
    let mut eta = 0.0;
    for e in &residuals {
        partial += e;
        eta += partial * partial;
    }
    let nf = n as f64;
    eta /= nf * nf;

    let lags = (4.0 * (nf / 100.0).powf(0.25)).trunc() as usize;
    let mut long_run = residuals.iter().map(|e| e * e).sum::<f64>() / nf;
    for j in 1..=lags.min(n - 1) {
        let weight = 1.0 - j as f64 / (lags as f64 + 1.0);
        let cov: f64 = (j..n).map(|t| residuals[t] * residuals[t - j]).sum::<f64>() / nf;
        long_run += 2.0 * weight * cov;
    }

    if long_run <= f64::EPSILON {
        return Ok(0.0);
    }
    Ok(eta / long_run)
}

/// Number of regular differences needed before the KPSS test stops rejecting
pub fn ndiffs(series: &[f64], max_d: usize) -> usize {
    let mut current = series.to_vec();
    let mut d = 0;

    while d < max_d {
        match kpss_statistic(&current) {
            Ok(stat) if stat > KPSS_CRITICAL_5PCT => {
                let next = difference(&current, 1);
                if next.len() < 3 {
                    break;
                }
                current = next;
                d += 1;
            }
            _ => break,
        }
    }

    d
}

/// Whether one seasonal difference removes enough variance to be worth taking
///
/// Needs two full cycles. Seasonal differencing is suggested when it brings the
/// variance under 70% of the original.
pub fn needs_seasonal_difference(series: &[f64], period: usize) -> bool {
    if period < 2 || series.len() < 2 * period {
        return false;
    }

    let original = population_variance(series);
    if original <= f64::EPSILON {
        return false;
    }
    let differenced = population_variance(&seasonal_difference(series, 1, period));
    differenced < 0.7 * original
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_is_not_level_stationary() {
        let trend: Vec<f64> = (0..40).map(|i| 10.0 + 2.0 * i as f64).collect();
        assert!(kpss_statistic(&trend).unwrap() > KPSS_CRITICAL_5PCT);
        assert!(ndiffs(&trend, 2) >= 1);
    }

    #[test]
    fn test_sawtooth_is_stationary() {
        let saw: Vec<f64> = (0..39).map(|i| ((2 * i) % 13) as f64).collect();
        assert!(kpss_statistic(&saw).unwrap() < KPSS_CRITICAL_5PCT);
        assert_eq!(ndiffs(&saw, 2), 0);
    }

    #[test]
    fn test_constant_series_needs_no_difference() {
        let flat = vec![5.0; 20];
        assert_eq!(kpss_statistic(&flat).unwrap(), 0.0);
        assert_eq!(ndiffs(&flat, 2), 0);
    }

    #[test]
    fn test_short_series_is_rejected() {
        assert!(kpss_statistic(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_seasonal_difference_suggestion() {
        let seasonal: Vec<f64> = (0..24)
            .map(|i| [10.0, 20.0, 30.0, 25.0, 15.0, 5.0][i % 6] + 0.1 * i as f64)
            .collect();
        assert!(needs_seasonal_difference(&seasonal, 6));
        assert!(!needs_seasonal_difference(&seasonal[..10], 6));
    }
}
