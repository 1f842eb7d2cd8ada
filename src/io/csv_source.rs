//! Site tables from CSV, read from a local path or an HTTP(S) URL

use std::fmt;
use std::fs;
use std::path::PathBuf;
use csv::{ReaderBuilder, Trim};
use log::{debug, info};

use crate::errors::{MapError, MapResult};
use crate::layer::{RecordTable, TableRow};

/// Where a site table comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteSource {
    Path(PathBuf),
    Url(String),
}

impl SiteSource {
    /// Classify a location string; `http://` and `https://` are URLs
    pub fn from_location(location: &str) -> MapResult<Self> {
        let location = location.trim();
        if location.is_empty() {
            return Err(MapError::ConfigError("Site table location is empty".to_string()));
        }
        let lower = location.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(SiteSource::Url(location.to_string()))
        } else {
            Ok(SiteSource::Path(PathBuf::from(location)))
        }
    }

    /// Fetch the raw text
    fn fetch(&self) -> MapResult<String> {
        match self {
            SiteSource::Path(path) => fs::read_to_string(path).map_err(|e| MapError::LoadError(format!(
                "Cannot read site table {}: {}", path.display(), e
            ))),
            SiteSource::Url(url) => {
                info!("Downloading site table from {}", url);
                let mut response = ureq::get(url.as_str())
                    .call()
                    .map_err(|e| MapError::LoadError(format!("Cannot fetch {}: {}", url, e)))?;
                response.body_mut()
                    .read_to_string()
                    .map_err(|e| MapError::LoadError(format!("Cannot read response from {}: {}", url, e)))
            },
        }
    }

    /// Read the table: one header row, then data rows
    ///
    /// Every row must have as many cells as the header. Line numbers are
    /// 1-based with the header on line 1.
    pub fn read_table(&self) -> MapResult<RecordTable> {
        let text = self.fetch()?;
        let table = parse_table(&text).map_err(|e| match e {
            MapError::LoadError(msg) => MapError::LoadError(format!("{}: {}", self, msg)),
            other => other,
        })?;
        info!("Read {} rows with columns [{}] from {}", table.rows.len(), table.headers.join(", "), self);
        Ok(table)
    }
}

impl fmt::Display for SiteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteSource::Path(path) => write!(f, "{}", path.display()),
            SiteSource::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Parse CSV text into a header plus rows
pub fn parse_table(text: &str) -> MapResult<RecordTable> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(MapError::LoadError("Site table has no header row".to_string()));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| MapError::LoadError(format!("Malformed row: {}", e)))?;
        let line = record.position().map(|p| p.line()).unwrap_or(rows.len() as u64 + 2);
        rows.push(TableRow { line, values: record.iter().map(|v| v.to_string()).collect() });
    }
    debug!("Parsed {} data rows", rows.len());

    Ok(RecordTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_classification() {
        assert_eq!(SiteSource::from_location("https://example.org/sites.csv").unwrap(),
                   SiteSource::Url("https://example.org/sites.csv".to_string()));
        assert_eq!(SiteSource::from_location("data/sites.csv").unwrap(),
                   SiteSource::Path(PathBuf::from("data/sites.csv")));
        assert!(SiteSource::from_location("  ").is_err());
    }

    #[test]
    fn test_parse_table_with_line_numbers() {
        let table = parse_table("Site,Latitude,Longitude\nA,48.835,-125.136\n B , 48.861 ,-125.201\n").unwrap();
        assert_eq!(table.headers, vec!["Site", "Latitude", "Longitude"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].line, 2);
        assert_eq!(table.rows[1].line, 3);
        assert_eq!(table.rows[1].values, vec!["B", "48.861", "-125.201"]);
    }

    #[test]
    fn test_ragged_row_is_error() {
        let err = parse_table("Site,Latitude,Longitude\nA,48.835\n").unwrap_err();
        assert!(matches!(err, MapError::LoadError(_)));
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(parse_table("").is_err());
    }

    #[test]
    fn test_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sites.csv");
        std::fs::write(&path, "\u{feff}Site,Latitude,Longitude\nA,48.835,-125.136\n").unwrap();

        let table = SiteSource::from_location(path.to_str().unwrap()).unwrap().read_table().unwrap();
        assert_eq!(table.headers[0], "Site");
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let source = SiteSource::Path(PathBuf::from("/nonexistent/sites.csv"));
        assert!(matches!(source.read_table(), Err(MapError::LoadError(_))));
    }
}
