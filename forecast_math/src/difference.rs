//! Differencing expressed as lag polynomials
//!
//! A polynomial `c` stands for `c[0] + c[1] B + c[2] B^2 + ...` where `B` is
//! the backshift operator. The combined ARIMA differencing operator
//! `(1 - B)^d (1 - B^s)^D` is built with [`differencing_polynomial`], applied
//! with [`apply_polynomial`] and undone for forecasts with
//! [`integrate_forecast`].

use crate::{MathError, Result};

/// Multiply two polynomials given in ascending coefficient order
pub fn polymul(a: &[f64], b: &[f64]) -> Vec<f64> {
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

/// Coefficients of `(1 - B)^d (1 - B^period)^seasonal_d`
pub fn differencing_polynomial(d: usize, seasonal_d: usize, period: usize) -> Result<Vec<f64>> {
    if seasonal_d > 0 && period < 2 {
        return Err(MathError::InvalidInput(format!(
            "Seasonal differencing needs a period of at least 2, got {}",
            period
        )));
    }

    let mut poly = vec![1.0];
    for _ in 0..d {
        poly = polymul(&poly, &[1.0, -1.0]);
    }

    if seasonal_d > 0 {
        let mut seasonal = vec![0.0; period + 1];
        seasonal[0] = 1.0;
        seasonal[period] = -1.0;
        for _ in 0..seasonal_d {
            poly = polymul(&poly, &seasonal);
        }
    }

    Ok(poly)
}

/// Apply a lag polynomial: `w[t] = sum_k poly[k] * values[t - k]`.
///
/// The output starts at the first index with a full set of lags, so it is
/// `poly.len() - 1` shorter than the input.
pub fn apply_polynomial(values: &[f64], poly: &[f64]) -> Vec<f64> {
    let order = poly.len().saturating_sub(1);
    if values.len() <= order {
        return Vec::new();
    }

    (order..values.len())
        .map(|t| {
            poly.iter()
                .enumerate()
                .map(|(k, &c)| c * values[t - k])
                .sum()
        })
        .collect()
}

/// Difference a series `d` times
pub fn difference(values: &[f64], d: usize) -> Vec<f64> {
    let mut out = values.to_vec();
    for _ in 0..d {
        if out.len() <= 1 {
            return Vec::new();
        }
        out = out.windows(2).map(|w| w[1] - w[0]).collect();
    }
    out
}

/// Seasonally difference a series `seasonal_d` times at lag `period`
pub fn seasonal_difference(values: &[f64], seasonal_d: usize, period: usize) -> Vec<f64> {
    let mut out = values.to_vec();
    for _ in 0..seasonal_d {
        if period == 0 || out.len() <= period {
            return Vec::new();
        }
        out = out
            .iter()
            .skip(period)
            .zip(out.iter())
            .map(|(curr, prev)| curr - prev)
            .collect();
    }
    out
}

/// Undo differencing for values forecast on the differenced scale.
///
/// `history` is the original (undifferenced) series; each forecast step
/// solves `poly(B) y[t] = w[t]` for `y[t]` using history and the forecasts
/// already produced.
pub fn integrate_forecast(history: &[f64], differenced: &[f64], poly: &[f64]) -> Result<Vec<f64>> {
    let order = poly.len().saturating_sub(1);
    if history.len() < order {
        return Err(MathError::InsufficientData(format!(
            "Need at least {} observations to integrate, have {}",
            order,
            history.len()
        )));
    }
    if poly.first().copied() != Some(1.0) {
        return Err(MathError::InvalidInput(
            "Differencing polynomial must be monic".to_string(),
        ));
    }

    let mut extended = history.to_vec();
    let mut out = Vec::with_capacity(differenced.len());

    for &w in differenced {
        let t = extended.len();
        let carried: f64 = poly
            .iter()
            .enumerate()
            .skip(1)
            .map(|(k, &c)| c * extended[t - k])
            .sum();
        let y = w - carried;
        extended.push(y);
        out.push(y);
    }

    Ok(out)
}
