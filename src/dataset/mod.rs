//! Tabular dataset model and loading.
//!
//! A dataset is loaded once at the start of a run and is read-only
//! afterwards. Rows holding any missing value are dropped at load time.

pub mod loader;

pub use loader::{load_dataset, parse_dataset, DatasetError};

use std::path::PathBuf;

/// Values of a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }

    /// Returns the values if the column is numeric.
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match &self.data {
            ColumnData::Numeric(values) => Some(values),
            ColumnData::Text(_) => None,
        }
    }
}

/// An ordered collection of equally long columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Base name of the source file (without extension).
    pub name: String,
    /// Where the dataset was loaded from.
    pub source: PathBuf,
    pub columns: Vec<Column>,
    pub row_count: usize,
    /// Rows excluded because they held a missing value.
    pub dropped_rows: usize,
}

impl Dataset {
    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Numeric columns in dataset order.
    pub fn numeric_columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns
            .iter()
            .filter_map(|c| c.as_numeric().map(|values| (c.name.as_str(), values)))
    }

    pub fn numeric_column_names(&self) -> Vec<String> {
        self.numeric_columns()
            .map(|(name, _)| name.to_string())
            .collect()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}
