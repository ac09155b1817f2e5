//! Differencing operators for integrated models
//!
//! Differencing is expressed as a polynomial in the backshift operator `B`,
//! stored lowest power first, so `(1 - B)` is `[1.0, -1.0]`. Applying and
//! inverting the same polynomial keeps the two directions consistent for any
//! combination of regular and seasonal differencing.

use crate::{MathError, Result};

/// Multiply two polynomials given lowest power first
pub fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }

    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Build `(1 - B)^d (1 - B^period)^seasonal_d`
pub fn differencing_polynomial(d: usize, seasonal_d: usize, period: usize) -> Vec<f64> {
    let mut poly = vec![1.0];

    for _ in 0..d {
        poly = poly_mul(&poly, &[1.0, -1.0]);
    }

    if period > 0 {
        let mut seasonal = vec![0.0; period + 1];
        seasonal[0] = 1.0;
        seasonal[period] = -1.0;
        for _ in 0..seasonal_d {
            poly = poly_mul(&poly, &seasonal);
        }
    }

    poly
}

/// Apply a differencing polynomial: `w[t] = sum_k poly[k] * y[t - k]`
///
/// The first `poly.len() - 1` observations are consumed as initial values,
/// so the output is shorter than the input by the polynomial degree.
pub fn apply_polynomial(series: &[f64], poly: &[f64]) -> Vec<f64> {
    let degree = poly.len().saturating_sub(1);
    if series.len() <= degree {
        return Vec::new();
    }

    (degree..series.len())
        .map(|t| {
            poly.iter()
                .enumerate()
                .map(|(k, c)| c * series[t - k])
                .sum()
        })
        .collect()
}

/// Regular differencing of order `d`
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    apply_polynomial(series, &differencing_polynomial(d, 0, 0))
}

/// Seasonal differencing of order `d` at the given period
pub fn seasonal_difference(series: &[f64], d: usize, period: usize) -> Vec<f64> {
    apply_polynomial(series, &differencing_polynomial(0, d, period))
}

/// Undo a differencing polynomial for values that follow `history`
///
/// `differenced` holds future values on the differenced scale; the result
/// holds the matching values on the original scale.
pub fn integrate(differenced: &[f64], history: &[f64], poly: &[f64]) -> Result<Vec<f64>> {
    let degree = poly.len().saturating_sub(1);
    if poly.first().copied() != Some(1.0) {
        return Err(MathError::InvalidInput(
            "Differencing polynomial must be monic".to_string(),
        ));
    }
    if history.len() < degree {
        return Err(MathError::InsufficientData(format!(
            "Integration needs {} past values, got {}",
            degree,
            history.len()
        )));
    }

    let mut extended: Vec<f64> = history[history.len() - degree..].to_vec();
    let mut out = Vec::with_capacity(differenced.len());

    for &w in differenced {
        let t = extended.len();
        let carried: f64 = poly
            .iter()
            .enumerate()
            .skip(1)
            .map(|(k, c)| c * extended[t - k])
            .sum();
        let y = w - carried;
        extended.push(y);
        out.push(y);
    }

    Ok(out)
}
