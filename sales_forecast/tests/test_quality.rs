use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use sales_forecast::data::{RawRecord, RawRow};
use sales_forecast::error::ForecastError;
use sales_forecast::quality::{summarize, DataQualityGate, QualityPolicy};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn messy_rows() -> Vec<RawRow> {
    vec![
        RawRow::new(date(2023, 1, 1), 100.0).with_category("Furniture"),
        RawRow::new(date(2023, 1, 1), 100.0).with_category("Furniture"),
        RawRow::new(date(2023, 1, 2), 40.0).with_category("Technology"),
        RawRow {
            order_date: None,
            sales: Some(10.0),
            category: None,
            region: None,
        },
        RawRow {
            order_date: Some(date(2023, 1, 3)),
            sales: None,
            category: None,
            region: None,
        },
        RawRow::new(date(2023, 1, 4), -5.0),
    ]
}

#[test]
fn test_report_counts() {
    let cleaned = DataQualityGate::default().clean(messy_rows());
    let report = cleaned.report;

    assert_eq!(report.total_rows, 6);
    assert_eq!(report.duplicate_rows, 1);
    assert_eq!(report.missing_order_date, 1);
    assert_eq!(report.missing_sales, 1);
    assert_eq!(report.invalid_sales, 1);
    // Duplicates are only reported by default
    assert_eq!(report.rows_kept, 3);
    assert_eq!(report.rows_dropped, 3);
    assert!(!report.is_clean());
}

#[test]
fn test_drop_duplicates_policy() {
    let gate = DataQualityGate::new(QualityPolicy {
        drop_duplicates: true,
    });
    let cleaned = gate.clean(messy_rows());

    assert_eq!(cleaned.report.duplicate_rows, 1);
    assert_eq!(cleaned.records.len(), 2);
    assert_eq!(cleaned.records[0].order_date, date(2023, 1, 1));
    assert_eq!(cleaned.records[1].sales, 40.0);
}

#[test]
fn test_rows_differing_in_one_field_are_not_duplicates() {
    let rows = vec![
        RawRow::new(date(2023, 1, 1), 100.0).with_region("West"),
        RawRow::new(date(2023, 1, 1), 100.0).with_region("East"),
    ];
    let cleaned = DataQualityGate::default().clean(rows);
    assert_eq!(cleaned.report.duplicate_rows, 0);
    assert_eq!(cleaned.records.len(), 2);
}

#[test]
fn test_clean_is_idempotent() {
    let gate = DataQualityGate::new(QualityPolicy {
        drop_duplicates: true,
    });
    let once = gate.clean(messy_rows());
    let twice = gate.clean(once.records.iter().map(RawRow::from).collect());

    assert_eq!(once.records, twice.records);
    assert_eq!(twice.report.rows_dropped, 0);
    assert!(twice.report.is_clean());
}

#[test]
fn test_clean_preserves_order() {
    let rows = vec![
        RawRow::new(date(2023, 3, 1), 1.0),
        RawRow::new(date(2023, 1, 1), 2.0),
        RawRow::new(date(2023, 2, 1), 3.0),
    ];
    let cleaned = DataQualityGate::default().clean(rows);
    let dates: Vec<NaiveDate> = cleaned.records.iter().map(|r| r.order_date).collect();
    assert_eq!(dates, vec![date(2023, 3, 1), date(2023, 1, 1), date(2023, 2, 1)]);
}

#[test]
fn test_summarize() {
    let records = vec![
        RawRecord {
            category: Some("Furniture".into()),
            ..RawRecord::new(date(2023, 1, 5), 10.0)
        },
        RawRecord {
            category: Some("Furniture".into()),
            ..RawRecord::new(date(2023, 1, 1), 30.0)
        },
        RawRecord::new(date(2023, 2, 1), 20.0),
    ];

    let summary = summarize(&records).unwrap();
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.first_date, date(2023, 1, 1));
    assert_eq!(summary.last_date, date(2023, 2, 1));
    assert_eq!(summary.sales.mean, 20.0);
    assert_eq!(summary.sales.min, 10.0);
    assert_eq!(summary.sales.max, 30.0);
    assert_eq!(summary.categories.get("Furniture"), Some(&2));
    assert!(summary.regions.is_empty());
}

#[test]
fn test_summarize_empty() {
    assert!(matches!(
        summarize(&[]),
        Err(ForecastError::EmptySeriesError(_))
    ));
}

#[test]
fn test_matching_orders_are_counted_but_kept_by_default() {
    let rows = vec![
        RawRow::new(date(2023, 1, 1), 25.0).with_region("West"),
        RawRow::new(date(2023, 1, 1), 25.0).with_region("West"),
    ];

    let kept = DataQualityGate::default().clean(rows.clone());
    assert_eq!(kept.report.duplicate_rows, 1);
    assert_eq!(kept.records.len(), 2);

    let dropped = DataQualityGate::new(QualityPolicy {
        drop_duplicates: true,
    })
    .clean(rows);
    assert_eq!(dropped.report.duplicate_rows, 1);
    assert_eq!(dropped.records.len(), 1);
}
