//! Seasonal ARIMA estimated by conditional least squares
//!
//! The model is `phi(B) Phi(B^s) (1-B)^d (1-B^s)^D (y_t - mu) = theta(B) Theta(B^s) e_t`
//! with `mu` only present when no differencing is applied. Coefficients are
//! found by minimising the conditional sum of squared residuals with
//! Nelder-Mead, which is the conditional Gaussian maximum likelihood
//! estimate. Multi-step forecasts are produced recursively with future
//! shocks set to zero.

use crate::error::{ForecastError, Result};
use crate::models::{ForecastResult, SeriesForecaster};
use crate::series::DailySeries;
use forecast_math::difference::{apply_polynomial, differencing_polynomial, integrate_forecast, polymul};
use forecast_math::optimize::{nelder_mead, NelderMeadConfig};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::{debug, warn};

const COEF_BOUND: f64 = 0.99;

/// Non-seasonal order `(p, d, q)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

/// Seasonal order `(P, D, Q, s)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub period: usize,
}

impl SeasonalOrder {
    pub fn new(p: usize, d: usize, q: usize, period: usize) -> Self {
        Self { p, d, q, period }
    }

    fn is_active(&self) -> bool {
        self.p + self.d + self.q > 0
    }
}

/// Parameters learned by [`ArimaModel::fit`]
#[derive(Debug, Clone)]
struct FittedArima {
    ar: Vec<f64>,
    ma: Vec<f64>,
    seasonal_ar: Vec<f64>,
    seasonal_ma: Vec<f64>,
    mean: Option<f64>,
    sigma2: f64,
    log_likelihood: f64,
    n_params: usize,
    n_effective: usize,
    history: Vec<f64>,
    differenced: Vec<f64>,
    residuals: Vec<f64>,
    diff_poly: Vec<f64>,
    converged: bool,
}

/// ARIMA model (AutoRegressive Integrated Moving Average)
#[derive(Debug, Clone)]
pub struct ArimaModel {
    name: String,
    order: ArimaOrder,
    seasonal: Option<SeasonalOrder>,
    optimizer: NelderMeadConfig,
    fitted: Option<FittedArima>,
}

impl ArimaModel {
    /// Create a non-seasonal ARIMA(p, d, q) model
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self::with_seasonal(ArimaOrder::new(p, d, q), None)
    }

    /// Create a model with an optional seasonal component
    pub fn with_seasonal(order: ArimaOrder, seasonal: Option<SeasonalOrder>) -> Self {
        let seasonal = seasonal.filter(SeasonalOrder::is_active);
        let name = match seasonal {
            Some(s) => format!(
                "SARIMA({},{},{})({},{},{},{})",
                order.p, order.d, order.q, s.p, s.d, s.q, s.period
            ),
            None => format!("ARIMA({},{},{})", order.p, order.d, order.q),
        };
        Self {
            name,
            order,
            seasonal,
            optimizer: NelderMeadConfig {
                max_iter: 2000,
                ..Default::default()
            },
            fitted: None,
        }
    }

    /// Override the optimiser settings
    pub fn with_optimizer(mut self, config: NelderMeadConfig) -> Self {
        self.optimizer = config;
        self
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn seasonal_order(&self) -> Option<SeasonalOrder> {
        self.seasonal
    }

    fn fitted(&self) -> Result<&FittedArima> {
        self.fitted
            .as_ref()
            .ok_or_else(|| ForecastError::ModelNotFittedError(self.name.clone()))
    }

    pub fn ar_coefficients(&self) -> Result<&[f64]> {
        Ok(&self.fitted()?.ar)
    }

    pub fn ma_coefficients(&self) -> Result<&[f64]> {
        Ok(&self.fitted()?.ma)
    }

    pub fn seasonal_ar_coefficients(&self) -> Result<&[f64]> {
        Ok(&self.fitted()?.seasonal_ar)
    }

    pub fn seasonal_ma_coefficients(&self) -> Result<&[f64]> {
        Ok(&self.fitted()?.seasonal_ma)
    }

    /// Mean of the undifferenced series; `None` when differencing is applied
    pub fn mean_term(&self) -> Result<Option<f64>> {
        Ok(self.fitted()?.mean)
    }

    /// Innovation variance
    pub fn sigma2(&self) -> Result<f64> {
        Ok(self.fitted()?.sigma2)
    }

    /// Conditional Gaussian log-likelihood
    pub fn log_likelihood(&self) -> Result<f64> {
        Ok(self.fitted()?.log_likelihood)
    }

    /// Akaike information criterion
    pub fn aic(&self) -> Result<f64> {
        let f = self.fitted()?;
        Ok(-2.0 * f.log_likelihood + 2.0 * (f.n_params + 1) as f64)
    }

    /// Bayesian information criterion
    pub fn bic(&self) -> Result<f64> {
        let f = self.fitted()?;
        Ok(-2.0 * f.log_likelihood + (f.n_params + 1) as f64 * (f.n_effective as f64).ln())
    }

    /// In-sample residuals on the differenced scale
    pub fn residuals(&self) -> Result<&[f64]> {
        Ok(&self.fitted()?.residuals)
    }

    /// Whether the optimiser met its tolerance
    pub fn converged(&self) -> Result<bool> {
        Ok(self.fitted()?.converged)
    }

    fn period(&self) -> usize {
        self.seasonal.map(|s| s.period).unwrap_or(0)
    }

    /// Forecast with symmetric normal intervals at `confidence_level`
    pub fn predict_with_intervals(
        &self,
        horizon: usize,
        confidence_level: f64,
    ) -> Result<ForecastResult> {
        if !(confidence_level > 0.0 && confidence_level < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Confidence level must be between 0 and 1, got {}",
                confidence_level
            )));
        }

        let fitted = self.fitted()?;
        let point = self.point_forecast(fitted, horizon)?;

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ForecastError::fit_failure(&self.name, e))?;
        let z = normal.inverse_cdf(1.0 - (1.0 - confidence_level) / 2.0);

        let (ar_full, ma_full) = expand(fitted, self.period());
        let integrated_ar = polymul(&ar_full, &fitted.diff_poly);
        let psi = psi_weights(&integrated_ar, &ma_full, horizon);

        let mut cumulative = 0.0;
        let intervals = point
            .iter()
            .zip(psi.iter())
            .map(|(&value, &weight)| {
                cumulative += weight * weight;
                let margin = z * (fitted.sigma2 * cumulative).sqrt();
                (value - margin, value + margin)
            })
            .collect();

        ForecastResult::new_with_intervals(point, horizon, intervals)
    }

    fn point_forecast(&self, fitted: &FittedArima, horizon: usize) -> Result<Vec<f64>> {
        let (ar_full, ma_full) = expand(fitted, self.period());
        let mu = fitted.mean.unwrap_or(0.0);

        let mut z: Vec<f64> = fitted.differenced.iter().map(|w| w - mu).collect();
        let n = z.len();

        for h in 0..horizon {
            let t = n + h;
            let mut value = 0.0;
            for (i, &coef) in ar_full.iter().enumerate().skip(1) {
                if let Some(idx) = t.checked_sub(i) {
                    value -= coef * z[idx];
                }
            }
            for (j, &coef) in ma_full.iter().enumerate().skip(1) {
                if let Some(idx) = t.checked_sub(j) {
                    if idx < n {
                        value += coef * fitted.residuals[idx];
                    }
                }
            }
            z.push(value);
        }

        let w: Vec<f64> = z[n..].iter().map(|v| v + mu).collect();
        integrate_forecast(&fitted.history, &w, &fitted.diff_poly)
            .map_err(|e| ForecastError::fit_failure(&self.name, e))
    }
}

/// Parameter vector layout: `[ar.., ma.., seasonal_ar.., seasonal_ma.., mean?]`
#[derive(Debug, Clone, Copy)]
struct Layout {
    p: usize,
    q: usize,
    sp: usize,
    sq: usize,
    period: usize,
    has_mean: bool,
}

impl Layout {
    fn len(&self) -> usize {
        self.p + self.q + self.sp + self.sq + usize::from(self.has_mean)
    }

    fn ar_lag(&self) -> usize {
        self.p + self.sp * self.period
    }

    fn ma_lag(&self) -> usize {
        self.q + self.sq * self.period
    }

    fn split<'a>(&self, params: &'a [f64]) -> (&'a [f64], &'a [f64], &'a [f64], &'a [f64], f64) {
        let (ar, rest) = params.split_at(self.p);
        let (ma, rest) = rest.split_at(self.q);
        let (sar, rest) = rest.split_at(self.sp);
        let (sma, rest) = rest.split_at(self.sq);
        let mean = if self.has_mean { rest[0] } else { 0.0 };
        (ar, ma, sar, sma, mean)
    }
}

/// Lag polynomial `1 - c1 B^step - c2 B^{2 step} - ...` (sign -1) or `1 + ...` (sign +1)
fn lag_polynomial(coefs: &[f64], step: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coefs.len() * step + 1];
    poly[0] = 1.0;
    for (i, &c) in coefs.iter().enumerate() {
        poly[(i + 1) * step] = sign * c;
    }
    poly
}

/// Full AR polynomial `phi(B) Phi(B^s)` and MA polynomial `theta(B) Theta(B^s)`
fn expand_parts(ar: &[f64], ma: &[f64], sar: &[f64], sma: &[f64], period: usize) -> (Vec<f64>, Vec<f64>) {
    let mut ar_poly = lag_polynomial(ar, 1, -1.0);
    let mut ma_poly = lag_polynomial(ma, 1, 1.0);
    if period > 0 {
        ar_poly = polymul(&ar_poly, &lag_polynomial(sar, period, -1.0));
        ma_poly = polymul(&ma_poly, &lag_polynomial(sma, period, 1.0));
    }
    (ar_poly, ma_poly)
}

fn expand(fitted: &FittedArima, period: usize) -> (Vec<f64>, Vec<f64>) {
    expand_parts(
        &fitted.ar,
        &fitted.ma,
        &fitted.seasonal_ar,
        &fitted.seasonal_ma,
        period,
    )
}

/// Conditional residuals: zero until `start`, then `a(B) z_t - sum_j m_j e_{t-j}`
fn conditional_residuals(z: &[f64], ar_poly: &[f64], ma_poly: &[f64], start: usize) -> Vec<f64> {
    let mut residuals = vec![0.0; z.len()];
    for t in start..z.len() {
        let mut e: f64 = ar_poly
            .iter()
            .enumerate()
            .filter(|(i, _)| *i <= t)
            .map(|(i, &c)| c * z[t - i])
            .sum();
        for (j, &c) in ma_poly.iter().enumerate().skip(1) {
            if j <= t {
                e -= c * residuals[t - j];
            }
        }
        residuals[t] = e;
    }
    residuals
}

/// MA(infinity) weights of the model `ar(B) y = ma(B) e`
fn psi_weights(ar_poly: &[f64], ma_poly: &[f64], horizon: usize) -> Vec<f64> {
    let mut psi = Vec::with_capacity(horizon);
    for j in 0..horizon {
        if j == 0 {
            psi.push(1.0);
            continue;
        }
        let mut value = ma_poly.get(j).copied().unwrap_or(0.0);
        for i in 1..=j.min(ar_poly.len().saturating_sub(1)) {
            value -= ar_poly[i] * psi[j - i];
        }
        psi.push(value);
    }
    psi
}

impl SeriesForecaster for ArimaModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, series: &DailySeries) -> Result<()> {
        let seasonal = self.seasonal.unwrap_or(SeasonalOrder::new(0, 0, 0, 0));
        if seasonal.is_active() && seasonal.period < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "Seasonal period must be at least 2, got {}",
                seasonal.period
            )));
        }

        let history = series.values().to_vec();
        let diff_poly = differencing_polynomial(self.order.d, seasonal.d, seasonal.period)?;
        let differenced = apply_polynomial(&history, &diff_poly);

        let layout = Layout {
            p: self.order.p,
            q: self.order.q,
            sp: seasonal.p,
            sq: seasonal.q,
            period: seasonal.period,
            has_mean: self.order.d == 0 && seasonal.d == 0,
        };
        let start = layout.ar_lag();
        let needed = start + layout.len() + 2;
        if differenced.len() < needed {
            return Err(ForecastError::fit_failure(
                &self.name,
                format!(
                    "need at least {} observations after differencing, have {}",
                    needed,
                    differenced.len()
                ),
            ));
        }
        let n_effective = differenced.len() - start;

        let css = |params: &[f64]| -> f64 {
            let (ar, ma, sar, sma, mean) = layout.split(params);
            let (ar_poly, ma_poly) = expand_parts(ar, ma, sar, sma, layout.period);
            let z: Vec<f64> = differenced.iter().map(|w| w - mean).collect();
            let residuals = conditional_residuals(&z, &ar_poly, &ma_poly, start);
            let sum: f64 = residuals[start..].iter().map(|e| e * e).sum();
            if sum.is_finite() {
                sum
            } else {
                f64::INFINITY
            }
        };

        let mut initial = vec![0.0; layout.len()];
        let mut bounds = vec![(-COEF_BOUND, COEF_BOUND); layout.len()];
        if layout.has_mean {
            let mean = differenced.iter().sum::<f64>() / differenced.len() as f64;
            let last = layout.len() - 1;
            initial[last] = mean;
            bounds[last] = (f64::NEG_INFINITY, f64::INFINITY);
        }

        let result = nelder_mead(css, &initial, Some(&bounds), &self.optimizer);
        if !result.optimal_value.is_finite() {
            return Err(ForecastError::fit_failure(
                &self.name,
                "conditional likelihood is not finite",
            ));
        }
        if !result.converged {
            warn!(
                model = %self.name,
                iterations = result.iterations,
                "Optimizer reached the iteration limit before converging"
            );
        }

        let sigma2 = (result.optimal_value / n_effective as f64).max(f64::MIN_POSITIVE);
        let log_likelihood = -0.5
            * n_effective as f64
            * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);

        let (ar, ma, sar, sma, mean) = layout.split(&result.optimal_point);
        let (ar_poly, ma_poly) = expand_parts(ar, ma, sar, sma, layout.period);
        let z: Vec<f64> = differenced.iter().map(|w| w - mean).collect();
        let residuals = conditional_residuals(&z, &ar_poly, &ma_poly, start);

        debug!(
            model = %self.name,
            sigma2,
            log_likelihood,
            iterations = result.iterations,
            "Fitted ARIMA"
        );

        self.fitted = Some(FittedArima {
            ar: ar.to_vec(),
            ma: ma.to_vec(),
            seasonal_ar: sar.to_vec(),
            seasonal_ma: sma.to_vec(),
            mean: layout.has_mean.then_some(mean),
            sigma2,
            log_likelihood,
            n_params: layout.len(),
            n_effective,
            history,
            differenced,
            residuals,
            diff_poly,
            converged: result.converged,
        });
        Ok(())
    }

    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let fitted = self.fitted()?;
        let values = self.point_forecast(fitted, horizon)?;
        ForecastResult::new(values, horizon)
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}
