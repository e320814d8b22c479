//! Data quality gate: duplicate detection and missing-value policy

use crate::data::{RawRecord, RawRow};
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use forecast_math::stats::{self, Describe};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

/// What the gate does with suspicious rows.
///
/// Duplicates are matched on the parsed fields only: order date, sales,
/// category and region. Source columns outside those (order ids, row ids)
/// are not loaded, so two genuine orders that agree on all four fields are
/// indistinguishable from a repeated row. Counting them is harmless;
/// `drop_duplicates` will remove the second order as well.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityPolicy {
    /// Remove rows that repeat an earlier row across every field.
    /// When false (the default) duplicates are only counted.
    pub drop_duplicates: bool,
}

/// Diagnostics produced while cleaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QualityReport {
    /// Rows received
    pub total_rows: usize,
    /// Rows identical to an earlier row across all fields
    pub duplicate_rows: usize,
    /// Rows without an order date
    pub missing_order_date: usize,
    /// Rows without a sales amount
    pub missing_sales: usize,
    /// Rows whose amount is negative or not finite
    pub invalid_sales: usize,
    /// Rows removed for any reason
    pub rows_dropped: usize,
    /// Rows that passed the gate
    pub rows_kept: usize,
}

impl QualityReport {
    /// Whether the input passed without any finding
    pub fn is_clean(&self) -> bool {
        self.duplicate_rows == 0
            && self.missing_order_date == 0
            && self.missing_sales == 0
            && self.invalid_sales == 0
    }
}

impl std::fmt::Display for QualityReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Data Quality Report:")?;
        writeln!(f, "  Rows:              {}", self.total_rows)?;
        writeln!(f, "  Duplicate rows:    {}", self.duplicate_rows)?;
        writeln!(f, "  Missing date:      {}", self.missing_order_date)?;
        writeln!(f, "  Missing sales:     {}", self.missing_sales)?;
        writeln!(f, "  Invalid sales:     {}", self.invalid_sales)?;
        writeln!(f, "  Dropped / kept:    {} / {}", self.rows_dropped, self.rows_kept)?;
        Ok(())
    }
}

/// Output of the gate: validated records plus diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRows {
    /// Records that passed, in input order
    pub records: Vec<RawRecord>,
    /// What was found along the way
    pub report: QualityReport,
}

/// Validates raw rows before they reach the pipeline.
///
/// Rows missing an order date or a sales amount are dropped entirely; there
/// is no imputation.
#[derive(Debug, Clone, Default)]
pub struct DataQualityGate {
    policy: QualityPolicy,
}

type RowKey = (Option<NaiveDate>, Option<u64>, Option<String>, Option<String>);

fn row_key(row: &RawRow) -> RowKey {
    // 0.0 and -0.0 compare equal, so they must hash the same
    let sales = row
        .sales
        .map(|v| if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() });
    (row.order_date, sales, row.category.clone(), row.region.clone())
}

impl DataQualityGate {
    /// Create a gate with the given policy
    pub fn new(policy: QualityPolicy) -> Self {
        Self { policy }
    }

    /// The active policy
    pub fn policy(&self) -> QualityPolicy {
        self.policy
    }

    /// Clean a batch of rows
    pub fn clean(&self, rows: Vec<RawRow>) -> CleanRows {
        let mut report = QualityReport {
            total_rows: rows.len(),
            ..Default::default()
        };

        let mut seen: HashSet<RowKey> = HashSet::with_capacity(rows.len());
        let mut records = Vec::with_capacity(rows.len());

        for row in rows {
            let is_duplicate = !seen.insert(row_key(&row));
            if is_duplicate {
                report.duplicate_rows += 1;
                if self.policy.drop_duplicates {
                    continue;
                }
            }

            if row.order_date.is_none() {
                report.missing_order_date += 1;
            }
            if row.sales.is_none() {
                report.missing_sales += 1;
            }

            let (order_date, sales) = match (row.order_date, row.sales) {
                (Some(date), Some(sales)) => (date, sales),
                _ => continue,
            };

            if !sales.is_finite() || sales < 0.0 {
                report.invalid_sales += 1;
                continue;
            }

            records.push(RawRecord {
                order_date,
                sales,
                category: row.category,
                region: row.region,
            });
        }

        report.rows_kept = records.len();
        report.rows_dropped = report.total_rows - report.rows_kept;

        if report.duplicate_rows > 0 {
            warn!(
                duplicates = report.duplicate_rows,
                dropped = self.policy.drop_duplicates,
                "Found duplicate rows"
            );
        }
        if report.missing_order_date + report.missing_sales > 0 {
            warn!(
                missing_date = report.missing_order_date,
                missing_sales = report.missing_sales,
                "Dropped rows with missing values"
            );
        }
        if report.invalid_sales > 0 {
            warn!(invalid = report.invalid_sales, "Dropped rows with invalid amounts");
        }
        info!(
            kept = report.rows_kept,
            dropped = report.rows_dropped,
            "Data quality check completed"
        );

        CleanRows { records, report }
    }
}

/// Overview of a cleaned dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSummary {
    /// Number of records
    pub rows: usize,
    /// Earliest order date
    pub first_date: NaiveDate,
    /// Latest order date
    pub last_date: NaiveDate,
    /// Distribution of sales amounts
    pub sales: Describe,
    /// Record count per category
    pub categories: BTreeMap<String, usize>,
    /// Record count per region
    pub regions: BTreeMap<String, usize>,
}

/// Summarise cleaned records
pub fn summarize(records: &[RawRecord]) -> Result<DataSummary> {
    let amounts: Vec<f64> = records.iter().map(|r| r.sales).collect();
    let sales = stats::describe(&amounts)
        .ok_or_else(|| ForecastError::EmptySeriesError("No records to summarize".to_string()))?;

    let mut first_date = records[0].order_date;
    let mut last_date = records[0].order_date;
    let mut categories = BTreeMap::new();
    let mut regions = BTreeMap::new();

    for record in records {
        first_date = first_date.min(record.order_date);
        last_date = last_date.max(record.order_date);
        if let Some(category) = &record.category {
            *categories.entry(category.clone()).or_insert(0) += 1;
        }
        if let Some(region) = &record.region {
            *regions.entry(region.clone()).or_insert(0) += 1;
        }
    }

    Ok(DataSummary {
        rows: records.len(),
        first_date,
        last_date,
        sales,
        categories,
        regions,
    })
}
