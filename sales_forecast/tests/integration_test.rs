use chrono::{Duration, NaiveDate};
use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sales_forecast::config::PipelineConfig;
use sales_forecast::data::RawRow;
use sales_forecast::error::ForecastError;
use sales_forecast::models::ForestParams;
use sales_forecast::pipeline::ForecastPipeline;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

const CATEGORIES: [&str; 3] = ["Furniture", "Office Supplies", "Technology"];
const REGIONS: [&str; 4] = ["West", "East", "Central", "South"];

/// Two hundred days of orders with a weekly pattern, a few empty days and
/// some dirty rows
fn synthetic_rows() -> Vec<RawRow> {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let mut rows = Vec::new();

    for day in 0..200 {
        if day % 37 == 36 {
            continue;
        }
        let date = start + Duration::days(day);
        let weekday_boost = if day % 7 >= 5 { 1.5 } else { 1.0 };
        let orders = rng.gen_range(2..6);
        for _ in 0..orders {
            let sales = (50.0 + day as f64 * 0.3) * weekday_boost * rng.gen_range(0.8..1.2);
            rows.push(
                RawRow::new(date, (sales * 100.0).round() / 100.0)
                    .with_category(CATEGORIES[rng.gen_range(0..CATEGORIES.len())])
                    .with_region(REGIONS[rng.gen_range(0..REGIONS.len())]),
            );
        }
    }

    rows.push(rows[0].clone());
    rows.push(RawRow {
        order_date: None,
        sales: Some(12.0),
        category: None,
        region: None,
    });
    rows
}

fn small_config() -> PipelineConfig {
    PipelineConfig {
        forecast_horizon: 30,
        random_forest: ForestParams {
            n_estimators: 20,
            max_depth: Some(8),
            ..ForestParams::default()
        },
        ..PipelineConfig::default()
    }
}

#[test]
fn test_full_pipeline() {
    let pipeline = ForecastPipeline::new(small_config()).unwrap();
    let report = pipeline.run(synthetic_rows()).unwrap();

    assert_eq!(report.quality.duplicate_rows, 1);
    assert_eq!(report.quality.missing_order_date, 1);
    assert_eq!(report.series.len(), 200);
    assert_eq!(report.summary.categories.len(), 3);

    // Naive, Mean, ARIMA, Linear Regression, Random Forest
    assert_eq!(report.evaluation.len(), 5);
    assert_eq!(report.comparison.ranking().len(), 5);
    let ranking = report.comparison.ranking();
    assert!(ranking.windows(2).all(|w| w[0].rmse <= w[1].rmse));

    let best = report.best_test_predictions().unwrap();
    assert_eq!(best.model_name, report.comparison.best().unwrap().model_name);

    assert_eq!(report.forecast.values().len(), 30);
    let dates = report.forecast.dates().unwrap();
    assert_eq!(dates[0], report.series.last_date() + Duration::days(1));
    assert!(["Naive", "Mean", "ARIMA(1,1,1)"].contains(&report.forecast_model.as_str()));

    let importance = report.feature_importance.as_ref().unwrap();
    let total: f64 = importance.iter().map(|(_, v)| v).sum();
    assert!((total - 1.0).abs() < 1e-6);

    let categories = report.category_forecasts.as_ref().unwrap();
    assert_eq!(categories.len(), 3);
    assert!(categories.values().all(|v| v.len() == 30));
}

#[test]
fn test_pipeline_writes_tables() {
    let pipeline = ForecastPipeline::new(small_config()).unwrap();
    let report = pipeline.run(synthetic_rows()).unwrap();

    let dir = tempdir().unwrap();
    let out = dir.path().join("output");
    report.write_tables(&out).unwrap();

    for name in [
        "daily_forecast.csv",
        "monthly_forecast.csv",
        "model_comparison.csv",
        "test_predictions.csv",
        "category_forecast.csv",
    ] {
        assert!(out.join(name).exists(), "missing {}", name);
    }

    let daily = std::fs::read_to_string(out.join("daily_forecast.csv")).unwrap();
    assert!(daily.starts_with("Date,Predicted_Sales"));
    assert_eq!(daily.lines().count(), 31);

    let comparison = std::fs::read_to_string(out.join("model_comparison.csv")).unwrap();
    assert_eq!(comparison.lines().count(), 6);
}

#[test]
fn test_pipeline_from_csv() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Order Date,Sales,Region").unwrap();
    let start = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
    for day in 0..90 {
        let date = start + Duration::days(day);
        let sales = 100.0 + (day % 7) as f64 * 10.0;
        writeln!(file, "{},{:.2},West", date.format("%m/%d/%Y"), sales).unwrap();
    }

    let config = PipelineConfig {
        forecast_horizon: 14,
        include_random_forest: false,
        ..PipelineConfig::default()
    };
    let report = ForecastPipeline::new(config)
        .unwrap()
        .run_csv(file.path())
        .unwrap();

    assert_eq!(report.series.len(), 90);
    assert!(report.category_forecasts.is_none());
    assert!(report.feature_importance.is_none());
    assert_eq!(report.evaluation.len(), 4);
    assert_eq!(report.forecast.values().len(), 14);
}

#[test]
fn test_short_series_skips_regression() {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let rows: Vec<RawRow> = (0..25)
        .map(|d| RawRow::new(start + Duration::days(d), 10.0 + d as f64 + (d % 3) as f64))
        .collect();

    let config = PipelineConfig {
        forecast_horizon: 5,
        ..PipelineConfig::default()
    };
    let report = ForecastPipeline::new(config).unwrap().run(rows).unwrap();

    assert_eq!(report.evaluation.model_names(), vec!["Naive", "Mean", "ARIMA(1,1,1)"]);
    assert_eq!(report.forecast.values().len(), 5);
}

#[test]
fn test_no_usable_rows() {
    let rows = vec![RawRow {
        order_date: None,
        sales: None,
        category: None,
        region: None,
    }];
    let result = ForecastPipeline::new(PipelineConfig::default())
        .unwrap()
        .run(rows);
    assert!(matches!(result, Err(ForecastError::EmptySeriesError(_))));
}

#[test]
fn test_invalid_config_rejected() {
    let config = PipelineConfig {
        test_ratio: 0.0,
        ..PipelineConfig::default()
    };
    assert!(matches!(
        ForecastPipeline::new(config),
        Err(ForecastError::InvalidParameter(_))
    ));
}
