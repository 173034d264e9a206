//! CSV data source.

use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use stratlab_core::error::DataError;
use stratlab_core::types::Bar;
use tracing::{debug, warn};

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(
        alias = "Date",
        alias = "date",
        alias = "timestamp",
        alias = "Timestamp",
        alias = "datetime",
        alias = "Datetime",
        alias = "DateTime",
        alias = "<DATE>"
    )]
    date: String,
    /// Time of day when the export splits date and time
    #[serde(alias = "Time", alias = "<TIME>", default)]
    time: Option<String>,
    #[serde(alias = "Open", alias = "<OPEN>")]
    open: f64,
    #[serde(alias = "High", alias = "<HIGH>")]
    high: f64,
    #[serde(alias = "Low", alias = "<LOW>")]
    low: f64,
    #[serde(alias = "Close", alias = "<CLOSE>")]
    close: f64,
    #[serde(alias = "Volume", alias = "tick_volume", alias = "<TICKVOL>", default)]
    volume: f64,
}

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y.%m.%d %H:%M:%S",
    "%Y.%m.%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];

/// Parse various timestamp formats into Unix milliseconds.
fn parse_timestamp(date_str: &str) -> Result<i64, DataError> {
    let date_str = date_str.trim();

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }
    for format in DATE_FORMATS {
        if let Some(dt) = NaiveDate::parse_from_str(date_str, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }

    if let Ok(ts) = date_str.parse::<i64>() {
        // Milliseconds past 10 digits
        return Ok(if ts > 10_000_000_000 { ts } else { ts * 1000 });
    }

    Err(DataError::ParseError(format!(
        "Could not parse date: {}",
        date_str
    )))
}

impl CsvRecord {
    fn timestamp(&self) -> Result<i64, DataError> {
        match self.time.as_deref().map(str::trim) {
            Some(time) if !time.is_empty() => parse_timestamp(&format!("{} {}", self.date.trim(), time)),
            _ => parse_timestamp(&self.date),
        }
    }

    fn is_consistent(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite())
            && self.high >= self.low
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
    }
}

/// CSV data source for historical data.
pub struct CsvDataSource {
    path: PathBuf,
}

impl CsvDataSource {
    /// Create a new CSV data source.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::NoDataAvailable);
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all bars from the file.
    pub fn load(&self) -> Result<Vec<Bar>, DataError> {
        let file = std::fs::File::open(&self.path)
            .map_err(|e| DataError::ParseError(format!("{}: {e}", self.path.display())))?;
        Self::from_reader(file)
    }

    /// Read bars from any CSV stream.
    ///
    /// Rows with impossible prices are skipped. The result is sorted by time
    /// with duplicate timestamps collapsed to the last row seen.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Bar>, DataError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut bars = Vec::new();
        let mut skipped = 0usize;

        for (line, result) in reader.deserialize().enumerate() {
            let record: CsvRecord = result.map_err(|e| DataError::ParseError(e.to_string()))?;

            if !record.is_consistent() {
                warn!(row = line + 1, date = %record.date, "skipping inconsistent candle");
                skipped += 1;
                continue;
            }

            bars.push(Bar::new(
                record.timestamp()?,
                record.open,
                record.high,
                record.low,
                record.close,
                record.volume,
            ));
        }

        // Stable sort keeps file order among equal timestamps
        bars.sort_by_key(|b| b.timestamp);
        let before = bars.len();
        bars.reverse();
        bars.dedup_by_key(|b| b.timestamp);
        bars.reverse();

        if bars.len() != before || skipped > 0 {
            debug!(
                duplicates = before - bars.len(),
                skipped,
                "cleaned candle data"
            );
        }

        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_MS: i64 = 86_400_000;

    #[test]
    fn test_parse_timestamp() {
        assert!(parse_timestamp("2024-01-15").is_ok());
        assert!(parse_timestamp("2024-01-15 10:30:00").is_ok());
        assert!(parse_timestamp("2024.01.15 10:30").is_ok());
        assert_eq!(parse_timestamp("1705312800000").unwrap(), 1_705_312_800_000);
        assert_eq!(parse_timestamp("1705312800").unwrap(), 1_705_312_800_000);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_lowercase_headers() {
        let data = "\
timestamp,open,high,low,close,volume
2024-01-02,1.1000,1.1050,1.0950,1.1020,1500
2024-01-01,1.0990,1.1010,1.0980,1.1000,1200
";
        let bars = CsvDataSource::from_reader(data.as_bytes()).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].timestamp - bars[0].timestamp, DAY_MS);
        assert_eq!(bars[0].close, 1.1000);
        assert_eq!(bars[1].volume, 1500.0);
    }

    #[test]
    fn test_metatrader_headers_with_split_time() {
        let data = "\
<DATE>,<TIME>,<OPEN>,<HIGH>,<LOW>,<CLOSE>,<TICKVOL>,<VOL>,<SPREAD>
2024.01.15,10:00:00,1.0950,1.0960,1.0940,1.0955,320,0,5
2024.01.15,11:00:00,1.0955,1.0970,1.0950,1.0965,410,0,5
";
        let bars = CsvDataSource::from_reader(data.as_bytes()).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].timestamp - bars[0].timestamp, 3_600_000);
        assert_eq!(bars[0].volume, 320.0);
    }

    #[test]
    fn test_missing_volume_defaults_to_zero() {
        let data = "Date,Open,High,Low,Close\n2024-01-15,1,2,0.5,1.5\n";
        let bars = CsvDataSource::from_reader(data.as_bytes()).unwrap();
        assert_eq!(bars[0].volume, 0.0);
    }

    #[test]
    fn test_inconsistent_rows_skipped_and_duplicates_collapsed() {
        let data = "\
date,open,high,low,close
2024-01-01,1.0,1.1,0.9,1.05
2024-01-02,1.0,0.8,0.9,1.05
2024-01-01,1.0,1.2,0.9,1.15
";
        let bars = CsvDataSource::from_reader(data.as_bytes()).unwrap();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 1.15);
    }

    #[test]
    fn test_bad_number_is_an_error() {
        let data = "date,open,high,low,close\n2024-01-01,abc,1,1,1\n";
        assert!(matches!(
            CsvDataSource::from_reader(data.as_bytes()),
            Err(DataError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            CsvDataSource::new("/nonexistent/EURUSD.csv"),
            Err(DataError::NoDataAvailable)
        ));
    }
}
