//! Raw transaction data and CSV loading

use crate::config::ColumnConfig;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// One transaction row as read from the source, before quality checks.
///
/// Every field is optional: an empty cell in the source becomes `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    /// Order date (time of day is discarded)
    pub order_date: Option<NaiveDate>,
    /// Sales amount
    pub sales: Option<f64>,
    /// Product category
    pub category: Option<String>,
    /// Sales region
    pub region: Option<String>,
}

impl RawRow {
    /// Row with both required fields present and no categorical dimensions
    pub fn new(order_date: NaiveDate, sales: f64) -> Self {
        Self {
            order_date: Some(order_date),
            sales: Some(sales),
            category: None,
            region: None,
        }
    }

    /// Set the category
    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    /// Set the region
    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }
}

/// A validated transaction: order date and a non-negative sales amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Order date
    pub order_date: NaiveDate,
    /// Sales amount, finite and non-negative
    pub sales: f64,
    /// Product category
    pub category: Option<String>,
    /// Sales region
    pub region: Option<String>,
}

impl RawRecord {
    /// Create a record without categorical dimensions
    pub fn new(order_date: NaiveDate, sales: f64) -> Self {
        Self {
            order_date,
            sales,
            category: None,
            region: None,
        }
    }
}

impl From<&RawRecord> for RawRow {
    fn from(record: &RawRecord) -> Self {
        Self {
            order_date: Some(record.order_date),
            sales: Some(record.sales),
            category: record.category.clone(),
            region: record.region.clone(),
        }
    }
}

/// Text encoding the source was decoded with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    Utf8,
    Windows1252,
}

/// Rows loaded from a source together with the encoding that worked
#[derive(Debug, Clone)]
pub struct LoadedData {
    /// Parsed rows in source order
    pub rows: Vec<RawRow>,
    /// Encoding used to decode the source
    pub encoding: TextEncoding,
}

/// Loader for transaction-level CSV data
#[derive(Debug)]
pub struct DataLoader;

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

impl DataLoader {
    /// Load transaction rows from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P, columns: &ColumnConfig) -> Result<LoadedData> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ForecastError::DataLoadError(format!("Failed to open {}: {}", path.display(), e))
        })?;
        Self::from_reader(file, columns)
    }

    /// Load transaction rows from any reader
    pub fn from_reader<R: Read>(mut reader: R, columns: &ColumnConfig) -> Result<LoadedData> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes, columns)
    }

    /// Load transaction rows from raw CSV bytes
    pub fn from_bytes(bytes: &[u8], columns: &ColumnConfig) -> Result<LoadedData> {
        let (text, encoding) = Self::decode(bytes)?;
        let rows = Self::parse_rows(&text, columns)?;

        info!(
            rows = rows.len(),
            encoding = ?encoding,
            "Loaded transaction data"
        );

        Ok(LoadedData { rows, encoding })
    }

    /// Decode bytes as strict UTF-8, falling back to Windows-1252
    pub fn decode(bytes: &[u8]) -> Result<(Cow<'_, str>, TextEncoding)> {
        match std::str::from_utf8(bytes) {
            Ok(text) => Ok((
                Cow::Borrowed(text.strip_prefix('\u{feff}').unwrap_or(text)),
                TextEncoding::Utf8,
            )),
            Err(utf8_err) => {
                debug!(error = %utf8_err, "Input is not UTF-8, trying Windows-1252");
                let (text, had_errors) =
                    encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
                if had_errors {
                    return Err(ForecastError::DataLoadError(
                        "Input is neither valid UTF-8 nor Windows-1252 text".to_string(),
                    ));
                }
                Ok((text, TextEncoding::Windows1252))
            }
        }
    }

    /// Parse decoded CSV text into rows
    fn parse_rows(text: &str, columns: &ColumnConfig) -> Result<Vec<RawRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(ForecastError::DataLoadError(
                "No header row found in data".to_string(),
            ));
        }

        let date_idx = Self::find_column(&headers, &columns.date).ok_or_else(|| {
            ForecastError::DataLoadError(format!("Date column '{}' not found", columns.date))
        })?;
        let value_idx = Self::find_column(&headers, &columns.value).ok_or_else(|| {
            ForecastError::DataLoadError(format!("Value column '{}' not found", columns.value))
        })?;
        let category_idx = columns
            .category
            .as_deref()
            .and_then(|name| Self::find_column(&headers, name));
        let region_idx = columns
            .region
            .as_deref()
            .and_then(|name| Self::find_column(&headers, name));

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let line = i + 2;
            let record = record.map_err(|e| {
                ForecastError::DataLoadError(format!("Error reading line {}: {}", line, e))
            })?;

            let order_date = match non_empty(record.get(date_idx)) {
                Some(raw) => Some(parse_date(raw).ok_or_else(|| {
                    ForecastError::DataLoadError(format!(
                        "Invalid date '{}' at line {}",
                        raw, line
                    ))
                })?),
                None => None,
            };

            let sales = match non_empty(record.get(value_idx)) {
                Some(raw) => Some(parse_amount(raw).ok_or_else(|| {
                    ForecastError::DataLoadError(format!(
                        "Invalid amount '{}' at line {}",
                        raw, line
                    ))
                })?),
                None => None,
            };

            rows.push(RawRow {
                order_date,
                sales,
                category: category_idx
                    .and_then(|idx| non_empty(record.get(idx)))
                    .map(str::to_string),
                region: region_idx
                    .and_then(|idx| non_empty(record.get(idx)))
                    .map(str::to_string),
            });
        }

        Ok(rows)
    }

    /// Find a header by name, ignoring case and surrounding whitespace
    fn find_column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        headers
            .iter()
            .position(|h| h.trim().to_lowercase() == wanted)
    }
}

/// Cell contents conventionally used for a missing value
const MISSING_MARKERS: &[&str] = &[
    "na", "n/a", "#n/a", "#n/a n/a", "#na", "<na>", "nan", "-nan", "null", "none", "1.#ind",
    "-1.#ind", "1.#qnan", "-1.#qnan",
];

/// Trimmed cell contents, or `None` for blank cells and missing-value markers
fn non_empty(cell: Option<&str>) -> Option<&str> {
    cell.map(str::trim).filter(|s| {
        !s.is_empty()
            && !MISSING_MARKERS
                .iter()
                .any(|marker| s.eq_ignore_ascii_case(marker))
    })
}

/// Parse a calendar date, discarding any time of day
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
    }

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Parse a sales amount, tolerating a currency sign and thousands separators
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned.parse::<f64>().ok()
}
