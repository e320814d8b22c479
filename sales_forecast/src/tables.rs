//! Tabular outputs consumed by dashboards and plotting scripts

use crate::error::{ForecastError, Result};
use crate::metrics::ModelComparison;
use crate::models::ForecastResult;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn format_dates(dates: &[NaiveDate]) -> Vec<String> {
    dates
        .iter()
        .map(|d| d.format(DATE_FORMAT).to_string())
        .collect()
}

/// Forecast dates, which must step one calendar day at a time
fn daily_dates<'a>(forecast: &'a ForecastResult, table: &str) -> Result<&'a [NaiveDate]> {
    let dates = forecast.dates().ok_or_else(|| {
        ForecastError::ValidationError(format!("{} table needs dated forecasts", table))
    })?;

    if let Some(pair) = dates.windows(2).find(|w| (w[1] - w[0]).num_days() != 1) {
        return Err(ForecastError::ValidationError(format!(
            "{} table needs daily forecasts, got {} followed by {}",
            table, pair[0], pair[1]
        )));
    }

    Ok(dates)
}

/// `Date, Predicted_Sales[, Lower_Bound, Upper_Bound]`, clipped at zero
pub fn daily_forecast_table(forecast: &ForecastResult) -> Result<DataFrame> {
    let dates = daily_dates(forecast, "Daily forecast")?;

    let predicted: Vec<f64> = forecast.values().iter().map(|v| v.max(0.0)).collect();
    let mut columns = vec![
        Series::new("Date", format_dates(dates)),
        Series::new("Predicted_Sales", predicted),
    ];

    if let Some(intervals) = forecast.intervals() {
        let lower: Vec<f64> = intervals.iter().map(|(lo, _)| lo.max(0.0)).collect();
        let upper: Vec<f64> = intervals.iter().map(|(_, hi)| hi.max(0.0)).collect();
        columns.push(Series::new("Lower_Bound", lower));
        columns.push(Series::new("Upper_Bound", upper));
    }

    Ok(DataFrame::new(columns)?)
}

/// `Category, Total Forecast, Avg Daily Sales, Proportion`, largest total first
pub fn category_forecast_table(forecasts: &BTreeMap<String, Vec<f64>>) -> Result<DataFrame> {
    let mut rows: Vec<(&str, f64, f64)> = forecasts
        .iter()
        .map(|(category, values)| {
            let total: f64 = values.iter().map(|v| v.max(0.0)).sum();
            let avg = if values.is_empty() {
                0.0
            } else {
                total / values.len() as f64
            };
            (category.as_str(), total, avg)
        })
        .collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1));

    let grand_total: f64 = rows.iter().map(|r| r.1).sum();
    let proportion: Vec<f64> = rows
        .iter()
        .map(|r| {
            if grand_total > 0.0 {
                r.1 / grand_total * 100.0
            } else {
                0.0
            }
        })
        .collect();

    Ok(DataFrame::new(vec![
        Series::new(
            "Category",
            rows.iter().map(|r| r.0.to_string()).collect::<Vec<_>>(),
        ),
        Series::new("Total Forecast", rows.iter().map(|r| r.1).collect::<Vec<_>>()),
        Series::new("Avg Daily Sales", rows.iter().map(|r| r.2).collect::<Vec<_>>()),
        Series::new("Proportion", proportion),
    ])?)
}

/// `Month, Predicted Sales, Avg Daily Sales, Days`, one row per calendar month
pub fn monthly_forecast_table(forecast: &ForecastResult) -> Result<DataFrame> {
    let dates = daily_dates(forecast, "Monthly forecast")?;

    let mut months: BTreeMap<(i32, u32), (f64, u32)> = BTreeMap::new();
    for (date, value) in dates.iter().zip(forecast.values()) {
        let entry = months.entry((date.year(), date.month())).or_insert((0.0, 0));
        entry.0 += value.max(0.0);
        entry.1 += 1;
    }

    let mut labels = Vec::with_capacity(months.len());
    let mut totals = Vec::with_capacity(months.len());
    let mut averages = Vec::with_capacity(months.len());
    let mut days = Vec::with_capacity(months.len());
    for ((year, month), (total, count)) in months {
        let label = NaiveDate::from_ymd_opt(year, month, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|| format!("{}-{:02}", year, month));
        labels.push(label);
        totals.push(total);
        averages.push(total / count as f64);
        days.push(count);
    }

    Ok(DataFrame::new(vec![
        Series::new("Month", labels),
        Series::new("Predicted Sales", totals),
        Series::new("Avg Daily Sales", averages),
        Series::new("Days", days),
    ])?)
}

/// `Model, RMSE, MAE, MAPE, R2`, best model first; undefined metrics are null
pub fn model_comparison_table(comparison: &ModelComparison) -> Result<DataFrame> {
    let ranking = comparison.ranking();
    Ok(DataFrame::new(vec![
        Series::new(
            "Model",
            ranking.iter().map(|b| b.model_name.clone()).collect::<Vec<_>>(),
        ),
        Series::new("RMSE", ranking.iter().map(|b| b.rmse).collect::<Vec<_>>()),
        Series::new("MAE", ranking.iter().map(|b| b.mae).collect::<Vec<_>>()),
        Series::new("MAPE", ranking.iter().map(|b| b.mape).collect::<Vec<_>>()),
        Series::new("R2", ranking.iter().map(|b| b.r2).collect::<Vec<_>>()),
    ])?)
}

/// `Date, Actual, Predicted` for held-out periods
pub fn test_predictions_table(
    dates: &[NaiveDate],
    actual: &[f64],
    predicted: &[f64],
) -> Result<DataFrame> {
    if dates.len() != actual.len() || actual.len() != predicted.len() {
        return Err(ForecastError::ValidationError(format!(
            "Dates ({}), actual ({}) and predicted ({}) lengths differ",
            dates.len(),
            actual.len(),
            predicted.len()
        )));
    }

    Ok(DataFrame::new(vec![
        Series::new("Date", format_dates(dates)),
        Series::new("Actual", actual.to_vec()),
        Series::new("Predicted", predicted.to_vec()),
    ])?)
}

/// Write a table as CSV with a header row
pub fn write_csv<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).has_header(true).finish(df)?;
    Ok(())
}
