use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use sales_forecast::data::RawRecord;
use sales_forecast::error::ForecastError;
use sales_forecast::series::{DailySeries, Frequency, TimeSeriesBuilder};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn record(y: i32, m: u32, d: u32, sales: f64, category: Option<&str>) -> RawRecord {
    RawRecord {
        category: category.map(str::to_string),
        ..RawRecord::new(date(y, m, d), sales)
    }
}

#[test]
fn test_build_sums_and_fills_gaps() {
    let records = vec![
        record(2023, 1, 1, 100.0, None),
        record(2023, 1, 1, 50.0, None),
        record(2023, 1, 3, 80.0, None),
    ];

    let series = TimeSeriesBuilder::default().build(&records).unwrap();

    assert_eq!(
        series.dates(),
        &[date(2023, 1, 1), date(2023, 1, 2), date(2023, 1, 3)]
    );
    assert_eq!(series.values(), &[150.0, 0.0, 80.0]);
    assert_eq!(series.frequency(), Frequency::Daily);
}

#[test]
fn test_build_is_contiguous_and_unordered_input_is_fine() {
    let records = vec![
        record(2023, 3, 10, 5.0, None),
        record(2023, 2, 25, 1.0, None),
        record(2023, 3, 1, 2.0, None),
        record(2023, 3, 10, 3.0, None),
    ];

    let series = TimeSeriesBuilder::default().build(&records).unwrap();

    assert_eq!(series.first_date(), date(2023, 2, 25));
    assert_eq!(series.last_date(), date(2023, 3, 10));
    assert_eq!(series.len(), 14);
    for pair in series.dates().windows(2) {
        assert_eq!(pair[1], pair[0].succ_opt().unwrap());
    }
    assert_eq!(series.value_at(date(2023, 3, 10)), Some(8.0));
    assert_eq!(series.value_at(date(2023, 3, 5)), Some(0.0));
    assert_eq!(series.value_at(date(2023, 4, 1)), None);
}

#[test]
fn test_one_row_per_day_is_preserved() {
    let records: Vec<RawRecord> = (1..=10)
        .map(|d| record(2023, 5, d, d as f64 * 1.5, None))
        .collect();

    let series = TimeSeriesBuilder::default().build(&records).unwrap();

    let pairs: Vec<(NaiveDate, f64)> = series.iter().collect();
    let expected: Vec<(NaiveDate, f64)> =
        records.iter().map(|r| (r.order_date, r.sales)).collect();
    assert_eq!(pairs, expected);
}

#[test]
fn test_build_preserves_total_sales() {
    let records = vec![
        record(2023, 1, 1, 12.25, None),
        record(2023, 1, 9, 7.75, None),
        record(2023, 1, 9, 30.0, None),
        record(2023, 1, 20, 50.0, None),
    ];

    let series = TimeSeriesBuilder::default().build(&records).unwrap();
    let total: f64 = series.values().iter().sum();
    assert_eq!(total, 100.0);
}

#[test]
fn test_empty_records_fail() {
    let result = TimeSeriesBuilder::default().build(&[]);
    assert!(matches!(result, Err(ForecastError::EmptySeriesError(_))));
}

#[test]
fn test_monthly_build() {
    let records = vec![
        record(2023, 1, 15, 10.0, None),
        record(2023, 1, 31, 5.0, None),
        record(2023, 3, 2, 4.0, None),
    ];

    let series = TimeSeriesBuilder::new(Frequency::Monthly)
        .build(&records)
        .unwrap();

    assert_eq!(
        series.dates(),
        &[date(2023, 1, 1), date(2023, 2, 1), date(2023, 3, 1)]
    );
    assert_eq!(series.values(), &[15.0, 0.0, 4.0]);
}

#[test]
fn test_build_grouped_shares_global_range() {
    let records = vec![
        record(2023, 1, 1, 10.0, Some("Furniture")),
        record(2023, 1, 2, 20.0, Some("Technology")),
        record(2023, 1, 4, 5.0, Some("Furniture")),
        record(2023, 1, 3, 99.0, None),
    ];

    let groups = TimeSeriesBuilder::default()
        .build_grouped(&records, |r| r.category.clone())
        .unwrap();

    assert_eq!(groups.len(), 2);
    let furniture = &groups["Furniture"];
    let technology = &groups["Technology"];
    assert_eq!(furniture.dates(), technology.dates());
    assert_eq!(furniture.first_date(), date(2023, 1, 1));
    assert_eq!(furniture.last_date(), date(2023, 1, 4));
    assert_eq!(furniture.values(), &[10.0, 0.0, 0.0, 5.0]);
    assert_eq!(technology.values(), &[0.0, 20.0, 0.0, 0.0]);
}

#[test]
fn test_build_grouped_without_keys_fails() {
    let records = vec![record(2023, 1, 1, 10.0, None)];
    let result = TimeSeriesBuilder::default().build_grouped(&records, |r| r.category.clone());
    assert!(matches!(result, Err(ForecastError::EmptySeriesError(_))));
}

#[test]
fn test_train_test_split() {
    let dates: Vec<NaiveDate> = (1..=10).map(|d| date(2023, 1, d)).collect();
    let values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
    let series = DailySeries::new(dates, values, Frequency::Daily).unwrap();

    let (train, test) = series.train_test_split(0.2).unwrap();

    assert_eq!(train.len(), 8);
    assert_eq!(test.len(), 2);
    assert_eq!(train.last_date(), date(2023, 1, 8));
    assert_eq!(test.first_date(), date(2023, 1, 9));
    assert_eq!(test.values(), &[9.0, 10.0]);
}

#[test]
fn test_train_test_split_keeps_both_sides_non_empty() {
    let dates: Vec<NaiveDate> = (1..=3).map(|d| date(2023, 1, d)).collect();
    let series = DailySeries::new(dates, vec![1.0, 2.0, 3.0], Frequency::Daily).unwrap();

    let (train, test) = series.train_test_split(0.01).unwrap();
    assert_eq!((train.len(), test.len()), (2, 1));

    let (train, test) = series.train_test_split(0.99).unwrap();
    assert_eq!((train.len(), test.len()), (1, 2));

    assert!(matches!(
        series.train_test_split(1.0),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_split_at_bounds() {
    let dates: Vec<NaiveDate> = (1..=4).map(|d| date(2023, 1, d)).collect();
    let series = DailySeries::new(dates, vec![1.0; 4], Frequency::Daily).unwrap();

    assert!(series.split_at(0).is_err());
    assert!(series.split_at(4).is_err());
    let (head, tail) = series.split_at(1).unwrap();
    assert_eq!((head.len(), tail.len()), (1, 3));
}

#[test]
fn test_future_dates() {
    let series = DailySeries::new(
        vec![date(2023, 12, 30), date(2023, 12, 31)],
        vec![1.0, 2.0],
        Frequency::Daily,
    )
    .unwrap();

    assert_eq!(
        series.future_dates(3),
        vec![date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)]
    );
    assert!(series.future_dates(0).is_empty());
}

#[test]
fn test_new_rejects_mismatched_lengths() {
    let result = DailySeries::new(vec![date(2023, 1, 1)], vec![1.0, 2.0], Frequency::Daily);
    assert!(matches!(result, Err(ForecastError::ValidationError(_))));

    let result = DailySeries::new(vec![], vec![], Frequency::Daily);
    assert!(matches!(result, Err(ForecastError::EmptySeriesError(_))));
}

#[test]
fn test_new_rejects_unordered_dates() {
    let result = DailySeries::new(
        vec![date(2023, 1, 2), date(2023, 1, 1)],
        vec![1.0, 2.0],
        Frequency::Daily,
    );
    assert!(matches!(result, Err(ForecastError::ValidationError(_))));
}
