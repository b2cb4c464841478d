//! Loader for the raw CSV exports.
//!
//! The exports mix encodings, so a file is decoded as UTF-8 first and as
//! Latin-1 (WHATWG windows-1252) second. A decoding only counts when the CSV
//! parser also accepts it; if neither does, loading fails with
//! [`EtlError::Decode`] naming the file.

use encoding_rs::WINDOWS_1252;
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::error::{EtlError, Result};

/// A raw table: header names plus string cells, empty cells as `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    /// Label of the encoding that decoded the file.
    pub encoding: &'static str,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Column lookup that logs when a column is absent; absent columns read as empty.
    pub fn column_or_empty(&self, name: &str) -> Option<usize> {
        let idx = self.column(name);
        if idx.is_none() {
            warn!(table = %self.name, column = name, "Column missing, treating as empty");
        }
        idx
    }

    pub fn cell(&self, row: usize, col: Option<usize>) -> Option<&str> {
        col.and_then(|c| self.rows[row].get(c))
            .and_then(|v| v.as_deref())
    }

    /// Iterates one column's cells; yields `None` for every row when the column is missing.
    pub fn column_cells<'a>(&'a self, col: Option<usize>) -> impl Iterator<Item = Option<&'a str>> + 'a {
        self.rows
            .iter()
            .map(move |row| col.and_then(|c| row.get(c)).and_then(|v| v.as_deref()))
    }

    pub fn parse(name: &str, content: &str, encoding: &'static str) -> std::result::Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let width = headers.len();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<Option<String>> = record
                .iter()
                .take(width)
                .map(|cell| {
                    if cell.is_empty() {
                        None
                    } else {
                        Some(cell.to_string())
                    }
                })
                .collect();
            row.resize(width, None);
            rows.push(row);
        }

        Ok(Self {
            name: name.to_string(),
            headers,
            rows,
            encoding,
        })
    }
}

fn decode_utf8(bytes: &[u8]) -> Option<Cow<'_, str>> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    std::str::from_utf8(bytes).ok().map(Cow::Borrowed)
}

fn decode_latin1(bytes: &[u8]) -> Option<Cow<'_, str>> {
    WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes)
}

type Decoder = fn(&[u8]) -> Option<Cow<'_, str>>;

const ENCODINGS: [(&str, Decoder); 2] = [("utf-8", decode_utf8), ("latin-1", decode_latin1)];

/// Reads a raw CSV table, trying each encoding in turn.
pub fn load_csv_with_fallback(name: &str, path: &Path) -> Result<RawTable> {
    let bytes = std::fs::read(path).map_err(|e| EtlError::Decode {
        path: path.to_path_buf(),
        attempts: vec![format!("read: {e}")],
    })?;

    let mut attempts = Vec::new();
    for (label, decode) in ENCODINGS {
        let Some(content) = decode(&bytes) else {
            attempts.push(format!("{label}: invalid byte sequence"));
            continue;
        };
        match RawTable::parse(name, &content, label) {
            Ok(table) => {
                debug!(table = name, encoding = label, rows = table.len(), "Loaded raw table");
                return Ok(table);
            }
            Err(e) => attempts.push(format!("{label}: {e}")),
        }
    }
    Err(EtlError::Decode {
        path: path.to_path_buf(),
        attempts,
    })
}

/// The five raw tables of one snapshot.
#[derive(Debug, Clone)]
pub struct RawInputs {
    pub movies: RawTable,
    pub credits: RawTable,
    pub keywords: RawTable,
    pub ratings: RawTable,
    pub links: RawTable,
}

impl RawInputs {
    pub fn tables(&self) -> [&RawTable; 5] {
        [&self.movies, &self.credits, &self.keywords, &self.ratings, &self.links]
    }
}

/// Loads every raw input named by the configuration. Any unreadable file aborts.
pub fn load_raw_inputs(config: &PipelineConfig) -> Result<RawInputs> {
    let inputs = &config.inputs;
    let load = |name: &str, file: &str| load_csv_with_fallback(name, &config.raw_path(file));
    Ok(RawInputs {
        movies: load("movies_metadata", &inputs.movies_metadata)?,
        credits: load("credits", &inputs.credits)?,
        keywords: load("keywords", &inputs.keywords)?,
        ratings: load("ratings_small", &inputs.ratings)?,
        links: load("links_small", &inputs.links)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_pads_short_rows_and_nulls_empty_cells() {
        let table = RawTable::parse("t", "id,title,budget\n1,Heat,\n2\n", "utf-8").unwrap();
        assert_eq!(table.headers, vec!["id", "title", "budget"]);
        assert_eq!(
            table.rows,
            vec![
                vec![Some("1".into()), Some("Heat".into()), None],
                vec![Some("2".into()), None, None],
            ]
        );
        assert_eq!(table.cell(0, table.column("title")), Some("Heat"));
        assert_eq!(table.cell(0, table.column("nope")), None);
    }

    #[test]
    fn test_latin1_fallback_decodes_non_utf8_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "Amélie" encoded as Latin-1
        std::fs::write(&path, b"id,title\n194,Am\xe9lie\n").unwrap();
        let table = load_csv_with_fallback("latin", &path).unwrap();
        assert_eq!(table.encoding, "latin-1");
        assert_eq!(table.cell(0, Some(1)), Some("Amélie"));
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.csv");
        let err = load_csv_with_fallback("absent", &path).unwrap_err();
        assert!(err.to_string().contains("absent.csv"));
    }
}
