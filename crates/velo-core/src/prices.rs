use std::path::Path;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use thiserror::Error;

/// A single dated price, addressed by its position in the owning series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceObservation {
    pub index: usize,
    pub date: NaiveDate,
    pub price: f64,
}

/// Struct-of-Arrays price history for one instrument.
///
/// Both vectors are parallel and strictly ordered by date. The signal code
/// only ever looks at positions, so calendar gaps are invisible to it.
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    dates: Vec<NaiveDate>,
    prices: Vec<f64>,
}

impl PriceSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            dates: Vec::with_capacity(cap),
            prices: Vec::with_capacity(cap),
        }
    }

    /// Build a series with one observation per calendar day starting at `start`.
    pub fn daily(start: NaiveDate, prices: &[f64]) -> Self {
        let mut series = Self::with_capacity(prices.len());
        for (i, &p) in prices.iter().enumerate() {
            series.push(start + Duration::days(i as i64), p);
        }
        series
    }

    /// Append an observation. Callers are responsible for date ordering.
    pub fn push(&mut self, date: NaiveDate, price: f64) {
        self.dates.push(date);
        self.prices.push(price);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    #[inline]
    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    #[inline]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn observation(&self, index: usize) -> Option<PriceObservation> {
        Some(PriceObservation {
            index,
            date: *self.dates.get(index)?,
            price: *self.prices.get(index)?,
        })
    }

    pub fn first(&self) -> Option<PriceObservation> {
        self.observation(0)
    }

    pub fn last(&self) -> Option<PriceObservation> {
        self.len().checked_sub(1).and_then(|i| self.observation(i))
    }

    /// Restrict to observations dated within `[start, end]` (either bound optional).
    pub fn between(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> PriceSeries {
        let lo = match start {
            Some(s) => self.dates.partition_point(|d| *d < s),
            None => 0,
        };
        let hi = match end {
            Some(e) => self.dates.partition_point(|d| *d <= e),
            None => self.len(),
        };
        let hi = hi.max(lo);
        PriceSeries {
            dates: self.dates[lo..hi].to_vec(),
            prices: self.prices[lo..hi].to_vec(),
        }
    }

    /// Load a price history from a CSV file using memory-mapped I/O.
    ///
    /// The first column is the date (`YYYY-MM-DD`, or an ISO-8601 timestamp
    /// whose first 10 characters are the date). The price column is chosen
    /// from the header: `column` if given, then `adj close`, `close`, `price`,
    /// and finally the last column.
    pub fn from_csv(path: &Path, column: Option<&str>) -> Result<Self, CsvError> {
        let file = std::fs::File::open(path).map_err(|e| CsvError::Io(e.to_string()))?;
        let len = file
            .metadata()
            .map_err(|e| CsvError::Io(e.to_string()))?
            .len();
        if len == 0 {
            return Ok(Self::new());
        }
        let mmap =
            unsafe { memmap2::Mmap::map(&file) }.map_err(|e| CsvError::Io(e.to_string()))?;

        Self::parse_csv_bytes(&mmap[..], column)
    }

    /// Parse CSV from raw bytes (testable without files).
    pub fn parse_csv_bytes(data: &[u8], column: Option<&str>) -> Result<Self, CsvError> {
        let header_end = match memchr::memchr(b'\n', data) {
            Some(nl) => nl,
            None => return Ok(Self::new()),
        };
        let price_col = Self::select_column(trim_cr(&data[..header_end]), column)?;

        // Estimate row count for pre-allocation (avg ~40 bytes per row)
        let mut rows: Vec<(NaiveDate, f64)> = Vec::with_capacity(data.len() / 40);
        let len = data.len();
        let mut pos = header_end + 1;
        let mut line_no = 1usize;

        while pos < len {
            let line_end = memchr::memchr(b'\n', &data[pos..])
                .map(|i| pos + i)
                .unwrap_or(len);
            let line = trim_cr(&data[pos..line_end]);
            line_no += 1;

            if !line.is_empty() {
                rows.push(Self::parse_row(line, price_col, line_no)?);
            }

            pos = line_end + 1;
        }

        rows.sort_unstable_by_key(|&(date, _)| date);
        if let Some(pair) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(CsvError::Parse(format!("duplicate date {}", pair[0].0)));
        }

        let mut store = Self::with_capacity(rows.len());
        for (date, price) in rows {
            store.push(date, price);
        }
        Ok(store)
    }

    fn select_column(header: &[u8], preferred: Option<&str>) -> Result<usize, CsvError> {
        let header = std::str::from_utf8(header)
            .map_err(|_| CsvError::Parse("non-UTF8 header".into()))?;
        let names: Vec<String> = header
            .split(',')
            .map(|h| h.trim().trim_matches('"').to_ascii_lowercase())
            .collect();
        if names.len() < 2 {
            return Err(CsvError::Parse(format!(
                "expected a date column and at least one price column, got {}",
                names.len()
            )));
        }

        let find = |name: &str| names.iter().skip(1).position(|n| n == name).map(|i| i + 1);

        if let Some(want) = preferred {
            if let Some(i) = find(&want.to_ascii_lowercase()) {
                return Ok(i);
            }
        }
        Ok(["adj close", "close", "price"]
            .iter()
            .find_map(|name| find(name))
            .unwrap_or(names.len() - 1))
    }

    fn parse_row(line: &[u8], price_col: usize, line_no: usize) -> Result<(NaiveDate, f64), CsvError> {
        let date_bytes = nth_field(line, 0)
            .ok_or_else(|| CsvError::Parse(format!("line {}: missing date", line_no)))?;
        let price_bytes = nth_field(line, price_col).ok_or_else(|| {
            CsvError::Parse(format!("line {}: missing column {}", line_no, price_col + 1))
        })?;

        let date = Self::parse_date(date_bytes)
            .map_err(|e| CsvError::Parse(format!("line {}: {}", line_no, e)))?;
        let price: f64 = fast_float::parse(unquote(price_bytes))
            .map_err(|_| CsvError::Parse(format!("line {}: bad price", line_no)))?;
        if !price.is_finite() || price <= 0.0 {
            return Err(CsvError::Parse(format!(
                "line {}: price must be positive, got {}",
                line_no, price
            )));
        }

        Ok((date, price))
    }

    /// Parse `YYYY-MM-DD`, ignoring any time-of-day suffix.
    fn parse_date(bytes: &[u8]) -> Result<NaiveDate, String> {
        let s = std::str::from_utf8(unquote(bytes))
            .map_err(|_| "non-UTF8 date".to_string())?;
        let day = s
            .get(..10)
            .ok_or_else(|| format!("date too short: {}", s))?;
        NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| format!("bad date {}: {}", s, e))
    }
}

#[inline]
fn trim_cr(line: &[u8]) -> &[u8] {
    if line.last() == Some(&b'\r') {
        &line[..line.len() - 1]
    } else {
        line
    }
}

/// Field contents without surrounding whitespace or double quotes.
#[inline]
fn unquote(field: &[u8]) -> &[u8] {
    let field = field.trim_ascii();
    match field {
        [b'"', inner @ .., b'"'] => inner.trim_ascii(),
        _ => field,
    }
}

/// Zero-based field `n` of a comma-separated line.
fn nth_field(line: &[u8], n: usize) -> Option<&[u8]> {
    let mut start = 0;
    for _ in 0..n {
        start += memchr::memchr(b',', &line[start..])? + 1;
    }
    let end = memchr::memchr(b',', &line[start..])
        .map(|i| start + i)
        .unwrap_or(line.len());
    Some(&line[start..end])
}

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}
