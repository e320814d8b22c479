//! Descriptive statistics over `f64` slices
//!
//! Variance and standard deviation are the unbiased sample estimators
//! (divisor `n - 1`) unless the name says otherwise.

use serde::{Deserialize, Serialize};

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Unbiased sample variance, `None` for fewer than two values
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

/// Unbiased sample standard deviation, `None` for fewer than two values
pub fn sample_std(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

/// Population variance (divisor `n`), `None` for an empty slice
pub fn population_variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(ss / values.len() as f64)
}

/// Sum of squared deviations from the mean
pub fn total_sum_of_squares(values: &[f64]) -> f64 {
    match mean(values) {
        Some(m) => values.iter().map(|v| (v - m).powi(2)).sum(),
        None => 0.0,
    }
}

/// Five-number style summary of a sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Describe {
    /// Number of observations
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (`NaN` for a single observation)
    pub std: f64,
    /// Smallest observation
    pub min: f64,
    /// Largest observation
    pub max: f64,
}

/// Summarise a sample, `None` for an empty slice
pub fn describe(values: &[f64]) -> Option<Describe> {
    let mean = mean(values)?;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(Describe {
        count: values.len(),
        mean,
        std: sample_std(values).unwrap_or(f64::NAN),
        min,
        max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_variance() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];

        assert_relative_eq!(mean(&values).unwrap(), 5.0);
        assert_relative_eq!(population_variance(&values).unwrap(), 4.0);
        assert_relative_eq!(sample_variance(&values).unwrap(), 32.0 / 7.0);
        assert_relative_eq!(sample_std(&values).unwrap(), (32.0f64 / 7.0).sqrt());
    }

    #[test]
    fn test_degenerate_samples() {
        assert!(mean(&[]).is_none());
        assert!(sample_variance(&[3.0]).is_none());
        assert_eq!(total_sum_of_squares(&[]), 0.0);
    }

    #[test]
    fn test_describe() {
        let summary = describe(&[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(summary.count, 3);
        assert_relative_eq!(summary.mean, 20.0);
        assert_relative_eq!(summary.std, 10.0);
        assert_eq!(summary.min, 10.0);
        assert_eq!(summary.max, 30.0);

        let single = describe(&[4.0]).unwrap();
        assert!(single.std.is_nan());
    }
}
