use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options for opening a [`TableDocument`](crate::TableDocument)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookOptions {
    /// Skip rows whose cells are all empty while reading
    pub ignore_empty_rows: bool,
    /// Written to the `creator` property of new workbooks
    pub creator: String,
    /// How often `close` checks for writers that are still open
    pub writer_wait_attempts: u32,
    /// Pause between two checks, in milliseconds
    pub writer_wait_interval_ms: u64,
    /// Used when the collection turns out to be a CSV file
    pub csv: CsvOptions,
}

impl Default for BookOptions {
    fn default() -> Self {
        BookOptions {
            ignore_empty_rows: false,
            creator: "tablebook".to_string(),
            writer_wait_attempts: 5,
            writer_wait_interval_ms: 1000,
            csv: CsvOptions::default(),
        }
    }
}

impl BookOptions {
    /// Set whether empty rows are skipped while reading
    #[must_use]
    pub fn with_ignore_empty_rows(mut self, ignore_empty_rows: bool) -> Self {
        self.ignore_empty_rows = ignore_empty_rows;
        self
    }

    /// Set the creator stamped into written workbooks
    #[must_use]
    pub fn with_creator(mut self, creator: &str) -> Self {
        self.creator = creator.to_string();
        self
    }

    /// Set how long `close` waits for open writers
    #[must_use]
    pub fn with_writer_wait(mut self, attempts: u32, interval: Duration) -> Self {
        self.writer_wait_attempts = attempts;
        self.writer_wait_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the options for CSV collections
    #[must_use]
    pub fn with_csv(mut self, csv: CsvOptions) -> Self {
        self.csv = csv;
        self
    }

    pub(crate) fn writer_wait_interval(&self) -> Duration {
        Duration::from_millis(self.writer_wait_interval_ms)
    }
}

/// CSV reader/writer options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field delimiter. Overrides a `sep=` line; `None` uses the `sep=` line or ','
    pub delimiter: Option<u8>,
    /// Quote character (default: '"')
    pub quote: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            delimiter: None,
            quote: b'"',
        }
    }
}

impl CsvOptions {
    /// Default delimiter when neither the caller nor the file names one
    pub const DEFAULT_DELIMITER: u8 = b',';

    /// Set the delimiter
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }
}
