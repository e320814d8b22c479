use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use pretty_assertions::assert_eq;
use rstest::rstest;
use sales_forecast::error::ForecastError;
use sales_forecast::features::{FeatureDeriver, CALENDAR_FEATURES};
use sales_forecast::series::{DailySeries, Frequency};

fn series_of(values: Vec<f64>) -> DailySeries {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let dates = (0..values.len())
        .map(|i| start + Duration::days(i as i64))
        .collect();
    DailySeries::new(dates, values, Frequency::Daily).unwrap()
}

fn ramp(n: usize) -> DailySeries {
    series_of((0..n).map(|i| i as f64).collect())
}

#[test]
fn test_lags_are_never_undefined() {
    let series = ramp(60);
    let deriver = FeatureDeriver::default();
    let features = deriver.derive(&series).unwrap();

    // Max lag 30 dominates the 30-day window's 29 warm-up rows
    assert_eq!(deriver.warmup(), 30);
    assert_eq!(features.len(), 30);
    assert_eq!(features.rows()[0].date, series.dates()[30]);

    for row in features.rows() {
        let t = row.target;
        assert_eq!(row.lags, vec![t - 1.0, t - 7.0, t - 14.0, t - 30.0]);
        assert!(row.values().iter().all(|v| v.is_finite()));
    }
}

#[test]
fn test_first_k_rows_absent() {
    let series = ramp(10);
    let deriver = FeatureDeriver::new(vec![3], vec![]).unwrap();
    let features = deriver.derive(&series).unwrap();

    assert_eq!(features.len(), 7);
    assert_eq!(features.dates(), series.dates()[3..].to_vec());
    assert_eq!(features.targets(), series.values()[3..].to_vec());
    assert_eq!(features.rows()[0].lags, vec![0.0]);
}

#[test]
fn test_rolling_window_includes_current_point() {
    let series = series_of(vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
    let deriver = FeatureDeriver::new(vec![], vec![8]).unwrap();
    let features = deriver.derive(&series).unwrap();

    assert_eq!(features.len(), 1);
    let row = &features.rows()[0];
    assert_relative_eq!(row.rolling_means[0], 5.0);
    // Sum of squared deviations is 32; unbiased divisor 7
    assert_relative_eq!(row.rolling_stds[0], (32.0_f64 / 7.0).sqrt(), epsilon = 1e-12);
}

#[test]
fn test_rolling_rows_drop_first_w_minus_one() {
    let series = ramp(10);
    let deriver = FeatureDeriver::new(vec![], vec![4]).unwrap();
    let features = deriver.derive(&series).unwrap();

    assert_eq!(features.len(), 7);
    assert_eq!(features.rows()[0].date, series.dates()[3]);
    assert_relative_eq!(features.rows()[0].rolling_means[0], 1.5);
}

#[test]
fn test_output_is_chronological_with_consistent_width() {
    let series = ramp(45);
    let features = FeatureDeriver::default().derive(&series).unwrap();
    let width = features.feature_names().len();

    assert_eq!(width, CALENDAR_FEATURES.len() + 4 + 2 * 2);
    assert!(features.dates().windows(2).all(|w| w[0] < w[1]));
    assert!(features.rows().iter().all(|r| r.values().len() == width));

    let matrix = features.to_matrix().unwrap();
    assert_eq!(matrix.dim(), (features.len(), width));
}

#[test]
fn test_calendar_columns() {
    let series = ramp(5);
    let deriver = FeatureDeriver::new(vec![1], vec![]).unwrap();
    let features = deriver.derive(&series).unwrap();

    // 2023-01-02 is a Monday
    let row = &features.rows()[0];
    assert_eq!(row.calendar.day_of_week, 0);
    assert_eq!(row.calendar.quarter, 1);
    assert_eq!(features.column("day").unwrap(), vec![2.0, 3.0, 4.0, 5.0]);
    assert_eq!(features.column("lag_1").unwrap(), vec![0.0, 1.0, 2.0, 3.0]);
    assert!(features.column("lag_99").is_none());
}

#[test]
fn test_too_short_series_is_empty_error() {
    let series = ramp(20);
    let result = FeatureDeriver::default().derive(&series);
    assert!(matches!(result, Err(ForecastError::EmptySeriesError(_))));
}

#[rstest]
#[case(vec![0, 7], vec![7])]
#[case(vec![1], vec![1])]
#[case(vec![1, 1], vec![7])]
#[case(vec![1], vec![7, 7])]
fn test_invalid_parameters_rejected(#[case] lags: Vec<usize>, #[case] windows: Vec<usize>) {
    let result = FeatureDeriver::new(lags, windows);
    assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
}

#[test]
fn test_split_at_date() {
    let series = ramp(40);
    let features = FeatureDeriver::new(vec![1, 7], vec![7]).unwrap().derive(&series).unwrap();
    let cutoff = series.dates()[30];

    let (before, after) = features.split_at_date(cutoff);

    assert_eq!(before.len() + after.len(), features.len());
    assert!(before.dates().iter().all(|d| *d < cutoff));
    assert_eq!(after.dates()[0], cutoff);
    assert_eq!(before.feature_names(), after.feature_names());
}
