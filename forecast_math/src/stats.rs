//! Summary statistics over plain slices

use crate::{MathError, Result};
use statrs::statistics::Statistics;

/// Arithmetic mean; fails on an empty slice
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Mean of an empty series".to_string(),
        ));
    }
    Ok(values.iter().mean())
}

/// Population variance, `0.0` for fewer than two values
pub fn population_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.iter().population_variance()
}

/// Sum in ascending order so the result does not depend on input order
pub fn ordered_sum(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_variance() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values).unwrap(), 5.0);
        assert_relative_eq!(population_variance(&values), 4.0);
    }

    #[test]
    fn test_mean_of_empty_slice_fails() {
        assert!(mean(&[]).is_err());
    }

    #[test]
    fn test_ordered_sum_ignores_order() {
        let a = [0.1, 1e16, -1e16, 0.2, 0.3];
        let b = [-1e16, 0.3, 0.1, 1e16, 0.2];
        assert_eq!(ordered_sum(&a).to_bits(), ordered_sum(&b).to_bits());
    }
}
