//! Calendar, cyclical, lag and rolling-window features

use crate::error::{ForecastError, Result};
use crate::series::DailySeries;
use chrono::{Datelike, NaiveDate};
use forecast_math::rolling;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::f64::consts::PI;
use tracing::debug;

/// Names of the date-derived features, in column order
pub const CALENDAR_FEATURES: [&str; 11] = [
    "year",
    "month",
    "day",
    "dayofweek",
    "quarter",
    "is_month_start",
    "is_month_end",
    "month_sin",
    "month_cos",
    "day_sin",
    "day_cos",
];

/// Calendar attributes of a date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFeatures {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// Monday = 0
    pub day_of_week: u32,
    pub quarter: u32,
    pub is_month_start: bool,
    pub is_month_end: bool,
}

impl CalendarFeatures {
    pub fn from_date(date: NaiveDate) -> Self {
        let is_month_end = date
            .succ_opt()
            .map(|next| next.month() != date.month())
            .unwrap_or(true);

        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
            day_of_week: date.weekday().num_days_from_monday(),
            quarter: (date.month() - 1) / 3 + 1,
            is_month_start: date.day() == 1,
            is_month_end,
        }
    }
}

/// Sine/cosine encodings of month and day of week
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CyclicalFeatures {
    pub month_sin: f64,
    pub month_cos: f64,
    pub day_sin: f64,
    pub day_cos: f64,
}

impl CyclicalFeatures {
    pub fn from_calendar(calendar: &CalendarFeatures) -> Self {
        let month_angle = 2.0 * PI * calendar.month as f64 / 12.0;
        let day_angle = 2.0 * PI * calendar.day_of_week as f64 / 7.0;
        Self {
            month_sin: month_angle.sin(),
            month_cos: month_angle.cos(),
            day_sin: day_angle.sin(),
            day_cos: day_angle.cos(),
        }
    }
}

/// One fully defined training row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Period label
    pub date: NaiveDate,
    /// Sales total for the period
    pub target: f64,
    pub calendar: CalendarFeatures,
    pub cyclical: CyclicalFeatures,
    /// One value per configured lag depth
    pub lags: Vec<f64>,
    /// One value per configured window
    pub rolling_means: Vec<f64>,
    /// One value per configured window
    pub rolling_stds: Vec<f64>,
}

impl FeatureRow {
    /// Feature values in column order
    pub fn values(&self) -> Vec<f64> {
        let c = &self.calendar;
        let y = &self.cyclical;
        let mut out = vec![
            c.year as f64,
            c.month as f64,
            c.day as f64,
            c.day_of_week as f64,
            c.quarter as f64,
            if c.is_month_start { 1.0 } else { 0.0 },
            if c.is_month_end { 1.0 } else { 0.0 },
            y.month_sin,
            y.month_cos,
            y.day_sin,
            y.day_cos,
        ];
        out.extend_from_slice(&self.lags);
        for (mean, std) in self.rolling_means.iter().zip(self.rolling_stds.iter()) {
            out.push(*mean);
            out.push(*std);
        }
        out
    }
}

/// Feature rows sharing one column schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    feature_names: Vec<String>,
    rows: Vec<FeatureRow>,
}

impl FeatureSet {
    /// Assemble a set, checking every row matches the schema width
    pub fn new(feature_names: Vec<String>, rows: Vec<FeatureRow>) -> Result<Self> {
        if let Some(row) = rows.iter().find(|r| r.values().len() != feature_names.len()) {
            return Err(ForecastError::ValidationError(format!(
                "Row for {} has {} features, schema has {}",
                row.date,
                row.values().len(),
                feature_names.len()
            )));
        }
        Ok(Self {
            feature_names,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    pub fn targets(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.target).collect()
    }

    /// Targets as an ndarray vector
    pub fn target_array(&self) -> Array1<f64> {
        Array1::from(self.targets())
    }

    /// Design matrix with one row per feature row
    pub fn to_matrix(&self) -> Result<Array2<f64>> {
        let width = self.feature_names.len();
        let flat: Vec<f64> = self.rows.iter().flat_map(|r| r.values()).collect();
        Array2::from_shape_vec((self.rows.len(), width), flat)
            .map_err(|e| ForecastError::ValidationError(e.to_string()))
    }

    /// Values of a single named column
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.feature_names.iter().position(|n| n == name)?;
        Some(self.rows.iter().map(|r| r.values()[idx]).collect())
    }

    /// Rows dated before `date`, and the rest
    pub fn split_at_date(&self, date: NaiveDate) -> (FeatureSet, FeatureSet) {
        let (before, after): (Vec<FeatureRow>, Vec<FeatureRow>) =
            self.rows.iter().cloned().partition(|r| r.date < date);
        (
            Self {
                feature_names: self.feature_names.clone(),
                rows: before,
            },
            Self {
                feature_names: self.feature_names.clone(),
                rows: after,
            },
        )
    }
}

/// Derives [`FeatureRow`]s from a series
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDeriver {
    lag_depths: Vec<usize>,
    rolling_windows: Vec<usize>,
}

impl Default for FeatureDeriver {
    fn default() -> Self {
        Self {
            lag_depths: vec![1, 7, 14, 30],
            rolling_windows: vec![7, 30],
        }
    }
}

impl FeatureDeriver {
    pub fn new(lag_depths: Vec<usize>, rolling_windows: Vec<usize>) -> Result<Self> {
        if lag_depths.contains(&0) {
            return Err(ForecastError::InvalidParameter(
                "Lag depth must be at least 1".to_string(),
            ));
        }
        if let Some(w) = rolling_windows.iter().find(|&&w| w < 2) {
            return Err(ForecastError::InvalidParameter(format!(
                "Rolling window must be at least 2 for a sample standard deviation, got {}",
                w
            )));
        }
        if has_repeats(&lag_depths) || has_repeats(&rolling_windows) {
            return Err(ForecastError::InvalidParameter(
                "Lag depths and rolling windows must not repeat".to_string(),
            ));
        }

        Ok(Self {
            lag_depths,
            rolling_windows,
        })
    }

    pub fn lag_depths(&self) -> &[usize] {
        &self.lag_depths
    }

    pub fn rolling_windows(&self) -> &[usize] {
        &self.rolling_windows
    }

    /// Column names in the order [`FeatureRow::values`] produces them
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = CALENDAR_FEATURES.iter().map(|s| s.to_string()).collect();
        names.extend(self.lag_depths.iter().map(|k| format!("lag_{}", k)));
        for w in &self.rolling_windows {
            names.push(format!("rolling_mean_{}", w));
            names.push(format!("rolling_std_{}", w));
        }
        names
    }

    /// Rows needed before the first fully defined row
    pub fn warmup(&self) -> usize {
        let max_lag = self.lag_depths.iter().copied().max().unwrap_or(0);
        let max_window = self
            .rolling_windows
            .iter()
            .map(|w| w - 1)
            .max()
            .unwrap_or(0);
        max_lag.max(max_window)
    }

    /// Derive one row per period, dropping rows with any undefined feature
    pub fn derive(&self, series: &DailySeries) -> Result<FeatureSet> {
        let values = series.values();
        let dates = series.dates();

        let means = self
            .rolling_windows
            .iter()
            .map(|&w| rolling::rolling_mean(values, w))
            .collect::<forecast_math::Result<Vec<_>>>()?;
        let stds = self
            .rolling_windows
            .iter()
            .map(|&w| rolling::rolling_std(values, w))
            .collect::<forecast_math::Result<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(values.len().saturating_sub(self.warmup()));
        for t in 0..values.len() {
            let lags: Option<Vec<f64>> = self
                .lag_depths
                .iter()
                .map(|&k| t.checked_sub(k).map(|i| values[i]))
                .collect();
            let rolling_means: Option<Vec<f64>> = means.iter().map(|m| m[t]).collect();
            let rolling_stds: Option<Vec<f64>> = stds.iter().map(|s| s[t]).collect();

            let (lags, rolling_means, rolling_stds) = match (lags, rolling_means, rolling_stds) {
                (Some(l), Some(m), Some(s)) => (l, m, s),
                _ => continue,
            };

            let calendar = CalendarFeatures::from_date(dates[t]);
            rows.push(FeatureRow {
                date: dates[t],
                target: values[t],
                calendar,
                cyclical: CyclicalFeatures::from_calendar(&calendar),
                lags,
                rolling_means,
                rolling_stds,
            });
        }

        if rows.is_empty() {
            return Err(ForecastError::EmptySeriesError(format!(
                "Series of {} periods is too short for {} warm-up periods",
                values.len(),
                self.warmup()
            )));
        }

        debug!(
            rows = rows.len(),
            dropped = values.len() - rows.len(),
            "Derived features"
        );

        FeatureSet::new(self.feature_names(), rows)
    }
}

fn has_repeats(values: &[usize]) -> bool {
    let mut seen = HashSet::new();
    !values.iter().all(|v| seen.insert(*v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_calendar_month_end() {
        let cal = CalendarFeatures::from_date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert!(cal.is_month_end);
        assert!(!cal.is_month_start);
        assert_eq!(cal.quarter, 1);
        // Thursday
        assert_eq!(cal.day_of_week, 3);
    }

    #[test]
    fn test_cyclical_december_close_to_january() {
        let dec = CalendarFeatures::from_date(NaiveDate::from_ymd_opt(2023, 12, 15).unwrap());
        let jan = CalendarFeatures::from_date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        let a = CyclicalFeatures::from_calendar(&dec);
        let b = CyclicalFeatures::from_calendar(&jan);
        let dist = ((a.month_sin - b.month_sin).powi(2) + (a.month_cos - b.month_cos).powi(2)).sqrt();
        assert!(dist < 0.6);
        assert_relative_eq!(a.month_sin, 0.0, epsilon = 1e-12);
        assert_relative_eq!(a.month_cos, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_feature_names_order() {
        let deriver = FeatureDeriver::new(vec![1, 7], vec![3]).unwrap();
        let names = deriver.feature_names();
        assert_eq!(names.len(), 15);
        assert_eq!(names[11], "lag_1");
        assert_eq!(names[12], "lag_7");
        assert_eq!(names[13], "rolling_mean_3");
        assert_eq!(names[14], "rolling_std_3");
        assert_eq!(deriver.warmup(), 7);
    }
}
