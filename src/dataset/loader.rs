//! Delimited-file loading with encoding and delimiter detection.

use super::{Column, ColumnData, Dataset};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Cell values treated as missing.
const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A",
    "<NA>",
];

/// Errors raised while loading a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed delimited data: {0}")]
    Csv(#[from] csv::Error),

    #[error("Dataset has no header row")]
    Empty,

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),
}

/// Load a dataset from a delimited file.
pub fn load_dataset(path: &Path) -> Result<Dataset, DatasetError> {
    let bytes = std::fs::read(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let (content, encoding) = decode_bytes(&bytes);
    debug!("Decoded {} as {}", path.display(), encoding.name());

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());

    let mut dataset = parse_dataset(&name, &content)?;
    dataset.source = path.to_path_buf();

    info!(
        "Loaded {}: {} columns, {} rows ({} dropped for missing values)",
        path.display(),
        dataset.columns.len(),
        dataset.row_count,
        dataset.dropped_rows
    );

    Ok(dataset)
}

/// Decode raw bytes to text.
///
/// A byte-order mark wins; otherwise strict UTF-8 is tried before
/// falling back to Windows-1252 (common for spreadsheet exports).
pub fn decode_bytes(bytes: &[u8]) -> (String, &'static Encoding) {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return (text.into_owned(), encoding);
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), UTF_8),
        Err(_) => {
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            (text.into_owned(), WINDOWS_1252)
        }
    }
}

/// Parse delimited text into a dataset named `name`.
pub fn parse_dataset(name: &str, content: &str) -> Result<Dataset, DatasetError> {
    let delimiter = sniff_delimiter(content);
    debug!("Using delimiter {:?}", delimiter as char);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(DatasetError::Empty);
    }

    for (i, header) in headers.iter().enumerate() {
        if headers[..i].contains(header) {
            return Err(DatasetError::DuplicateColumn(header.clone()));
        }
    }

    // Cells per column; None marks a missing value.
    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    let mut total_rows = 0usize;

    for result in reader.records() {
        let record = result?;
        total_rows += 1;
        for (col_idx, column) in cells.iter_mut().enumerate() {
            let value = record
                .get(col_idx)
                .map(str::trim)
                .filter(|v| !is_missing(v))
                .map(String::from);
            column.push(value);
        }
    }

    // Kinds are inferred before rows are dropped.
    let numeric: Vec<bool> = cells.iter().map(|column| is_numeric_column(column)).collect();

    let keep: Vec<bool> = (0..total_rows)
        .map(|row| cells.iter().all(|column| column[row].is_some()))
        .collect();
    let row_count = keep.iter().filter(|k| **k).count();

    let columns = headers
        .into_iter()
        .zip(cells)
        .zip(numeric)
        .map(|((name, column), is_numeric)| {
            let kept = column
                .into_iter()
                .zip(&keep)
                .filter(|(_, keep)| **keep)
                .filter_map(|(value, _)| value);

            let data = if is_numeric {
                ColumnData::Numeric(kept.filter_map(|v| v.parse::<f64>().ok()).collect())
            } else {
                ColumnData::Text(kept.collect())
            };

            Column { name, data }
        })
        .collect();

    Ok(Dataset {
        name: name.to_string(),
        source: PathBuf::from(name),
        columns,
        row_count,
        dropped_rows: total_rows - row_count,
    })
}

fn is_missing(value: &str) -> bool {
    MISSING_TOKENS.contains(&value)
}

fn is_numeric_column(column: &[Option<String>]) -> bool {
    let mut present = column.iter().flatten().peekable();
    present.peek().is_some() && present.all(|v| v.parse::<f64>().is_ok())
}

const DELIMITER_CANDIDATES: [u8; 4] = [b'\t', b';', b',', b'|'];
const SNIFF_RECORDS: usize = 10;

/// Pick the delimiter whose leading records agree best with the header width.
///
/// Records are read with a real CSV reader so quoted fields spanning several
/// lines count once. A candidate scores `matching records * header width`;
/// candidates that split the header into a single field never win. Comma is
/// the fallback.
fn sniff_delimiter(content: &str) -> u8 {
    DELIMITER_CANDIDATES
        .iter()
        .filter_map(|&delimiter| {
            let widths = record_widths(content, delimiter);
            let header = *widths.first()?;
            if header < 2 {
                return None;
            }
            let matching = widths.iter().filter(|&&w| w == header).count();
            Some((delimiter, matching * header))
        })
        .fold((b',', 0), |best, candidate| {
            if candidate.1 > best.1 {
                candidate
            } else {
                best
            }
        })
        .0
}

/// Field counts of the first records parsed with `delimiter`.
fn record_widths(content: &str, delimiter: u8) -> Vec<usize> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes())
        .records()
        .take(SNIFF_RECORDS)
        .map_while(Result::ok)
        .map(|record| record.len())
        .collect()
}
