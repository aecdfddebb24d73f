use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use crate::prices::{CsvError, PriceSeries};

/// Supplies time-ordered price history for a named instrument.
///
/// Implementations must be `Send + Sync` so a basket can be fetched from
/// several worker threads at once.
pub trait PriceSource: Send + Sync {
    /// History for `instrument` restricted to `[start, end]` (either bound optional).
    fn history(
        &self,
        instrument: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<PriceSeries, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no price history for '{0}'")]
    NotFound(String),
    #[error("price file {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: CsvError,
    },
}

/// Reads `<dir>/<instrument>.csv`, falling back to the upper-cased symbol.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
    column: Option<String>,
}

impl CsvDirSource {
    pub fn new(dir: impl Into<PathBuf>, column: Option<String>) -> Self {
        Self {
            dir: dir.into(),
            column,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn resolve(&self, instrument: &str) -> Option<PathBuf> {
        [instrument.to_string(), instrument.to_ascii_uppercase()]
            .iter()
            .map(|name| self.dir.join(format!("{}.csv", name)))
            .find(|path| path.is_file())
    }
}

impl PriceSource for CsvDirSource {
    fn history(
        &self,
        instrument: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<PriceSeries, SourceError> {
        let path = self
            .resolve(instrument)
            .ok_or_else(|| SourceError::NotFound(instrument.to_string()))?;
        let series = PriceSeries::from_csv(&path, self.column.as_deref())
            .map_err(|source| SourceError::Csv { path, source })?;
        Ok(series.between(start, end))
    }
}

/// In-memory price histories keyed by instrument.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    series: HashMap<String, PriceSeries>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instrument: impl Into<String>, series: PriceSeries) {
        self.series.insert(instrument.into(), series);
    }

    pub fn with(mut self, instrument: impl Into<String>, series: PriceSeries) -> Self {
        self.insert(instrument, series);
        self
    }
}

impl PriceSource for MemorySource {
    fn history(
        &self,
        instrument: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<PriceSeries, SourceError> {
        self.series
            .get(instrument)
            .map(|s| s.between(start, end))
            .ok_or_else(|| SourceError::NotFound(instrument.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_memory_source_filters_range() {
        let source = MemorySource::new().with(
            "ABC",
            PriceSeries::daily(date("2015-01-01"), &[1.0, 2.0, 3.0]),
        );
        let series = source
            .history("ABC", Some(date("2015-01-02")), None)
            .unwrap();
        assert_eq!(series.prices(), &[2.0, 3.0]);
    }

    #[test]
    fn test_memory_source_missing() {
        let source = MemorySource::new();
        assert!(matches!(
            source.history("XYZ", None, None),
            Err(SourceError::NotFound(name)) if name == "XYZ"
        ));
    }

    #[test]
    fn test_csv_dir_source_reads_upper_case_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ABC.csv"),
            "Date,Close,Adj Close\n2015-01-02,10,9\n2015-01-05,11,10\n",
        )
        .unwrap();

        let source = CsvDirSource::new(dir.path(), None);
        assert_eq!(source.dir(), dir.path());
        let series = source.history("abc", None, None).unwrap();
        assert_eq!(series.prices(), &[9.0, 10.0]);

        assert!(matches!(
            source.history("missing", None, None),
            Err(SourceError::NotFound(_))
        ));
    }

    #[test]
    fn test_csv_dir_source_reports_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("BAD.csv"), "Date,Close\n2015-01-02,-1\n").unwrap();

        let source = CsvDirSource::new(dir.path(), Some("close".to_string()));
        match source.history("BAD", None, None) {
            Err(SourceError::Csv { path, .. }) => assert_eq!(path, dir.path().join("BAD.csv")),
            other => panic!("expected csv error, got {:?}", other),
        }
    }
}
