//! Output file layout derived from the dataset path.
//!
//! For `data/sales.csv` the charts are `data/sales_<col1>_<col2>.png` and
//! the report is `data/sales/README.md`.

use crate::models::ColumnPair;
use std::path::{Path, PathBuf};

/// Name of the report document inside the report directory.
pub const REPORT_FILE_NAME: &str = "README.md";

/// Deterministic output paths for one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    /// Directory that receives charts and the report directory.
    root: PathBuf,
    /// Dataset base name (file stem).
    base_name: String,
}

impl OutputLayout {
    /// Layout next to the dataset, or under `output_dir` when given.
    pub fn for_dataset(dataset_path: &Path, output_dir: Option<&Path>) -> Self {
        let base_name = dataset_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset".to_string());

        let root = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => dataset_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };

        Self { root, base_name }
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<base>_<col1>_<col2>.png`, with column names made file-safe.
    pub fn chart_file_name(&self, pair: &ColumnPair) -> String {
        format!(
            "{}_{}_{}.png",
            self.base_name,
            sanitize(&pair.first),
            sanitize(&pair.second)
        )
    }

    pub fn chart_path(&self, pair: &ColumnPair) -> PathBuf {
        self.root.join(self.chart_file_name(pair))
    }

    /// Directory holding the report document.
    pub fn report_dir(&self) -> PathBuf {
        self.root.join(&self.base_name)
    }

    pub fn report_path(&self) -> PathBuf {
        self.report_dir().join(REPORT_FILE_NAME)
    }

    /// Link to a chart as written inside the report document.
    ///
    /// Characters that would end a Markdown link destination are
    /// percent-encoded.
    pub fn chart_link(&self, chart_path: &Path) -> String {
        let file_name = chart_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("../{}", encode_link(&file_name))
    }
}

/// Replace anything outside `[A-Za-z0-9_-]` with `_`.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn encode_link(file_name: &str) -> String {
    let mut encoded = String::with_capacity(file_name.len());
    for c in file_name.chars() {
        match c {
            ' ' => encoded.push_str("%20"),
            '(' => encoded.push_str("%28"),
            ')' => encoded.push_str("%29"),
            '<' => encoded.push_str("%3C"),
            '>' => encoded.push_str("%3E"),
            '%' => encoded.push_str("%25"),
            _ => encoded.push(c),
        }
    }
    encoded
}
