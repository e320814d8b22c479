//! Regular time series built from transaction records

use crate::data::RawRecord;
use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate};
use forecast_math::stats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Aggregation frequency of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// One period per calendar day
    #[default]
    Daily,
    /// One period per ISO week, labelled by its Monday
    Weekly,
    /// One period per calendar month, labelled by its first day
    Monthly,
}

impl Frequency {
    /// The label of the period containing `date`
    pub fn truncate(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Frequency::Daily => date,
            Frequency::Weekly => {
                date - Duration::days(date.weekday().num_days_from_monday() as i64)
            }
            Frequency::Monthly => date.with_day(1).unwrap_or(date),
        }
    }

    /// The label of the period following the one labelled `date`
    pub fn next(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Frequency::Daily => date + Duration::days(1),
            Frequency::Weekly => date + Duration::days(7),
            Frequency::Monthly => {
                let (year, month) = if date.month() == 12 {
                    (date.year() + 1, 1)
                } else {
                    (date.year(), date.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
            }
        }
    }

    /// The period label `steps` periods after `date`
    pub fn advance(&self, date: NaiveDate, steps: usize) -> NaiveDate {
        (0..steps).fold(date, |d, _| self.next(d))
    }

    /// Number of periods in a year, used as the default seasonal period
    pub fn periods_per_year(&self) -> usize {
        match self {
            Frequency::Daily => 365,
            Frequency::Weekly => 52,
            Frequency::Monthly => 12,
        }
    }
}

/// A contiguous, strictly increasing series of per-period sales totals.
///
/// Every period between the first and last date is present; periods without
/// sales hold zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
    frequency: Frequency,
}

impl DailySeries {
    /// Build a series from aligned dates and values, checking contiguity
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>, frequency: Frequency) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::ValidationError(format!(
                "Dates length ({}) doesn't match values length ({})",
                dates.len(),
                values.len()
            )));
        }
        if dates.is_empty() {
            return Err(ForecastError::EmptySeriesError(
                "A series needs at least one period".to_string(),
            ));
        }
        if let Some(bad) = dates.iter().find(|d| frequency.truncate(**d) != **d) {
            return Err(ForecastError::ValidationError(format!(
                "Date {} is not a {:?} period label",
                bad, frequency
            )));
        }
        if let Some(pair) = dates.windows(2).find(|w| frequency.next(w[0]) != w[1]) {
            return Err(ForecastError::ValidationError(format!(
                "Series is not contiguous between {} and {}",
                pair[0], pair[1]
            )));
        }

        Ok(Self {
            dates,
            values,
            frequency,
        })
    }

    /// Number of periods
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false for a constructed series
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Period labels
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Per-period totals
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn first_date(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn last_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    pub fn last_value(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    /// Mean of the per-period totals
    pub fn mean(&self) -> f64 {
        stats::mean(&self.values).unwrap_or(0.0)
    }

    /// Total for the period labelled `date`
    pub fn value_at(&self, date: NaiveDate) -> Option<f64> {
        self.dates
            .binary_search(&date)
            .ok()
            .map(|idx| self.values[idx])
    }

    /// Iterate over `(date, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Split into the first `index` periods and the rest; both must be non-empty
    pub fn split_at(&self, index: usize) -> Result<(DailySeries, DailySeries)> {
        if index == 0 || index >= self.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Split index {} must fall inside a series of length {}",
                index,
                self.len()
            )));
        }

        let head = Self {
            dates: self.dates[..index].to_vec(),
            values: self.values[..index].to_vec(),
            frequency: self.frequency,
        };
        let tail = Self {
            dates: self.dates[index..].to_vec(),
            values: self.values[index..].to_vec(),
            frequency: self.frequency,
        };
        Ok((head, tail))
    }

    /// Hold out the last `test_ratio` share of periods
    pub fn train_test_split(&self, test_ratio: f64) -> Result<(DailySeries, DailySeries)> {
        if !(test_ratio > 0.0 && test_ratio < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Test ratio must be between 0 and 1, got {}",
                test_ratio
            )));
        }
        if self.len() < 2 {
            return Err(ForecastError::EmptySeriesError(
                "At least two periods are needed to hold out a test set".to_string(),
            ));
        }

        let test_size = ((self.len() as f64 * test_ratio).round() as usize).clamp(1, self.len() - 1);
        self.split_at(self.len() - test_size)
    }

    /// Labels of the `horizon` periods following the last observation
    pub fn future_dates(&self, horizon: usize) -> Vec<NaiveDate> {
        let mut dates = Vec::with_capacity(horizon);
        let mut current = self.last_date();
        for _ in 0..horizon {
            current = self.frequency.next(current);
            dates.push(current);
        }
        dates
    }
}

/// Aggregates transaction records into a [`DailySeries`]
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesBuilder {
    frequency: Frequency,
}

impl TimeSeriesBuilder {
    pub fn new(frequency: Frequency) -> Self {
        Self { frequency }
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Sum sales per order date period
    pub fn build(&self, records: &[RawRecord]) -> Result<DailySeries> {
        self.build_by(records, |r| r.order_date, |r| r.sales)
    }

    /// Sum `value_fn` per period of `date_fn`, filling empty periods with zero
    pub fn build_by<T, D, V>(&self, rows: &[T], date_fn: D, value_fn: V) -> Result<DailySeries>
    where
        D: Fn(&T) -> NaiveDate,
        V: Fn(&T) -> f64,
    {
        let totals = self.aggregate(rows.iter().map(|row| (date_fn(row), value_fn(row))));
        let (start, end) = match (totals.keys().next(), totals.keys().next_back()) {
            (Some(&start), Some(&end)) => (start, end),
            _ => {
                return Err(ForecastError::EmptySeriesError(
                    "No rows to aggregate".to_string(),
                ))
            }
        };

        let series = self.reindex(&totals, start, end)?;
        debug!(
            periods = series.len(),
            start = %series.first_date(),
            end = %series.last_date(),
            "Built series"
        );
        Ok(series)
    }

    /// Build one series per group, all spanning the same global date range.
    ///
    /// Records for which `key_fn` returns `None` are skipped.
    pub fn build_grouped<K>(
        &self,
        records: &[RawRecord],
        key_fn: K,
    ) -> Result<BTreeMap<String, DailySeries>>
    where
        K: Fn(&RawRecord) -> Option<String>,
    {
        let mut groups: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();
        for record in records {
            if let Some(key) = key_fn(record) {
                groups
                    .entry(key)
                    .or_default()
                    .push((record.order_date, record.sales));
            }
        }

        let all_dates = groups.values().flatten().map(|(d, _)| self.frequency.truncate(*d));
        let (start, end) = match (all_dates.clone().min(), all_dates.max()) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(ForecastError::EmptySeriesError(
                    "No records carry a group key".to_string(),
                ))
            }
        };

        groups
            .into_iter()
            .map(|(key, rows)| {
                let totals = self.aggregate(rows.into_iter());
                self.reindex(&totals, start, end).map(|series| (key, series))
            })
            .collect()
    }

    fn aggregate<I>(&self, points: I) -> BTreeMap<NaiveDate, f64>
    where
        I: Iterator<Item = (NaiveDate, f64)>,
    {
        let mut totals = BTreeMap::new();
        for (date, value) in points {
            *totals.entry(self.frequency.truncate(date)).or_insert(0.0) += value;
        }
        totals
    }

    fn reindex(
        &self,
        totals: &BTreeMap<NaiveDate, f64>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailySeries> {
        let mut dates = Vec::new();
        let mut values = Vec::new();
        let mut current = start;
        while current <= end {
            dates.push(current);
            values.push(totals.get(&current).copied().unwrap_or(0.0));
            current = self.frequency.next(current);
        }
        DailySeries::new(dates, values, self.frequency)
    }
}
