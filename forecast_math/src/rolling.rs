//! Trailing-window statistics
//!
//! A window of size `w` ending at index `t` covers `values[t + 1 - w..=t]`.
//! The first `w - 1` positions of a series have no complete window and yield
//! `None`.

use crate::stats;
use crate::{MathError, Result};
use std::collections::VecDeque;

/// Trailing-window mean
#[derive(Debug, Clone)]
pub struct RollingMean {
    window: usize,
    values: VecDeque<f64>,
}

impl RollingMean {
    /// Create a rolling mean over `window` observations
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(MathError::InvalidInput(
                "Window must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            window,
            values: VecDeque::with_capacity(window),
        })
    }

    /// Push the next observation into the window
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        if self.values.len() > self.window {
            self.values.pop_front();
        }
    }

    /// Mean of the current window, `None` until the window is full.
    ///
    /// Summed from the window contents so rounding error from earlier
    /// observations does not carry forward.
    pub fn value(&self) -> Option<f64> {
        if self.values.len() < self.window {
            return None;
        }
        let (front, back) = self.values.as_slices();
        let sum: f64 = front.iter().chain(back).sum();
        Some(sum / self.window as f64)
    }

    /// Window length
    pub fn window(&self) -> usize {
        self.window
    }

    /// Clear all observations
    pub fn reset(&mut self) {
        self.values.clear();
    }
}

/// Trailing-window unbiased sample standard deviation
#[derive(Debug, Clone)]
pub struct RollingStd {
    window: usize,
    values: VecDeque<f64>,
}

impl RollingStd {
    /// Create a rolling standard deviation over `window` observations.
    ///
    /// The sample estimator needs at least two observations, so `window`
    /// must be 2 or more.
    pub fn new(window: usize) -> Result<Self> {
        if window < 2 {
            return Err(MathError::InvalidInput(format!(
                "Window for a sample standard deviation must be at least 2, got {}",
                window
            )));
        }

        Ok(Self {
            window,
            values: VecDeque::with_capacity(window),
        })
    }

    /// Push the next observation into the window
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        if self.values.len() > self.window {
            self.values.pop_front();
        }
    }

    /// Standard deviation of the current window, `None` until the window is full
    pub fn value(&self) -> Option<f64> {
        if self.values.len() < self.window {
            return None;
        }
        let (front, back) = self.values.as_slices();
        if back.is_empty() {
            stats::sample_std(front)
        } else {
            let contiguous: Vec<f64> = self.values.iter().copied().collect();
            stats::sample_std(&contiguous)
        }
    }

    /// Window length
    pub fn window(&self) -> usize {
        self.window
    }
}

/// Trailing mean at every position of `values`
pub fn rolling_mean(values: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    let mut mean = RollingMean::new(window)?;
    Ok(values
        .iter()
        .map(|&v| {
            mean.update(v);
            mean.value()
        })
        .collect())
}

/// Trailing sample standard deviation at every position of `values`
pub fn rolling_std(values: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    let mut std = RollingStd::new(window)?;
    Ok(values
        .iter()
        .map(|&v| {
            std.update(v);
            std.value()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rolling_mean_window() {
        let mut mean = RollingMean::new(3).unwrap();

        mean.update(2.0);
        mean.update(4.0);
        // Not a full window yet
        assert!(mean.value().is_none());

        mean.update(6.0);
        assert_relative_eq!(mean.value().unwrap(), 4.0);

        // The window slides, dropping the oldest value
        mean.update(8.0);
        assert_relative_eq!(mean.value().unwrap(), 6.0);
    }

    #[test]
    fn test_rolling_std_is_unbiased() {
        let out = rolling_std(&[10.0, 20.0, 30.0, 30.0], 3).unwrap();

        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        // sqrt(((10-20)^2 + 0 + (30-20)^2) / 2) = 10
        assert_relative_eq!(out[2].unwrap(), 10.0);
        let expected = stats::sample_std(&[20.0, 30.0, 30.0]).unwrap();
        assert_relative_eq!(out[3].unwrap(), expected);
    }

    #[test]
    fn test_rolling_mean_batch_alignment() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0, 5.0], 2).unwrap();
        assert_eq!(out, vec![None, Some(1.5), Some(2.5), Some(3.5), Some(4.5)]);
    }

    #[test]
    fn test_rolling_mean_does_not_carry_rounding_error() {
        let out = rolling_mean(&[0.1, 0.2, 0.3, 0.0, 0.0, 0.0, 0.0], 3).unwrap();

        assert_relative_eq!(out[2].unwrap(), 0.2, epsilon = 1e-12);
        // Windows holding only zeros average to exactly zero
        assert_eq!(out[5], Some(0.0));
        assert_eq!(out[6], Some(0.0));
    }

    #[test]
    fn test_invalid_windows() {
        assert!(RollingMean::new(0).is_err());
        assert!(RollingStd::new(1).is_err());
        assert!(rolling_std(&[1.0, 2.0], 1).is_err());
    }
}
