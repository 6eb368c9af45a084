use crate::error::PipelineError;
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Header pandas-style exporters give an unnamed leading index column
pub const INDEX_ARTIFACT_HEADER: &str = "Unnamed: 0";

/// Cell spellings treated as a missing value (the usual data-frame NA set)
const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Inferred storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

/// A named, typed column. `None` cells are missing values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn kind(&self) -> ColumnKind {
        match self.data {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Text(_) => ColumnKind::Text,
        }
    }
}

/// The loaded product table.
///
/// Immutable once built: every aggregation borrows it read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl Dataset {
    /// Load a dataset from a CSV file on disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open CSV file '{}'", path.display()))?;
        Self::from_reader(file)
            .with_context(|| format!("Failed to load dataset from '{}'", path.display()))
    }

    /// Load a dataset from any CSV source (header row required)
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .context("Failed to read CSV header row")?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for (row_idx, record) in rdr.records().enumerate() {
            let record =
                record.with_context(|| format!("Failed to read CSV record {}", row_idx + 1))?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }

        Self::from_records(headers, rows)
    }

    /// Build a dataset from raw string cells.
    ///
    /// Drops the index artifact column, then infers a type per column.
    pub fn from_records(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                anyhow::bail!(
                    "Row {} has {} fields, expected {}",
                    row_idx + 1,
                    row.len(),
                    headers.len()
                );
            }
        }

        let row_count = rows.len();
        let mut columns = Vec::with_capacity(headers.len());

        for (col_idx, name) in headers.iter().enumerate() {
            if is_index_artifact(col_idx, name) {
                debug!("Dropping index artifact column '{}'", name);
                continue;
            }
            let cells: Vec<&str> = rows.iter().map(|r| r[col_idx].as_str()).collect();
            columns.push(Column {
                name: name.clone(),
                data: infer_column(&cells),
            });
        }

        Ok(Self { columns, row_count })
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// All numeric columns in dataset order
    pub fn numeric_columns(&self) -> Vec<(&str, &[Option<f64>])> {
        self.columns
            .iter()
            .filter_map(|c| match &c.data {
                ColumnData::Numeric(v) => Some((c.name.as_str(), v.as_slice())),
                ColumnData::Text(_) => None,
            })
            .collect()
    }

    /// Values of a column the caller needs as numbers.
    ///
    /// A text column with no values at all (e.g. zero rows) reads as an
    /// all-missing numeric column.
    pub fn numeric(
        &self,
        name: &str,
        stage: &'static str,
    ) -> Result<Cow<'_, [Option<f64>]>, PipelineError> {
        let column = self.require(name, stage)?;
        match &column.data {
            ColumnData::Numeric(v) => Ok(Cow::Borrowed(v.as_slice())),
            ColumnData::Text(v) if v.iter().all(|c| c.is_none()) => {
                Ok(Cow::Owned(vec![None; v.len()]))
            }
            ColumnData::Text(_) => Err(PipelineError::NonNumericColumn {
                column: name.to_string(),
                stage,
            }),
        }
    }

    /// Values of a column used as grouping labels
    pub fn labels(
        &self,
        name: &str,
        stage: &'static str,
    ) -> Result<Vec<Option<String>>, PipelineError> {
        let column = self.require(name, stage)?;
        Ok(match &column.data {
            ColumnData::Text(v) => v.clone(),
            ColumnData::Numeric(v) => v.iter().map(|c| c.map(|x| x.to_string())).collect(),
        })
    }

    fn require(&self, name: &str, stage: &'static str) -> Result<&Column, PipelineError> {
        self.column(name).ok_or_else(|| PipelineError::MissingColumn {
            column: name.to_string(),
            stage,
        })
    }
}

/// An unnamed leading column, or the explicit `Unnamed: 0` header
fn is_index_artifact(col_idx: usize, name: &str) -> bool {
    (col_idx == 0 && name.trim().is_empty()) || name == INDEX_ARTIFACT_HEADER
}

fn is_missing(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell.trim())
}

/// Parse a present cell. Any NaN spelling the float parser accepts is missing.
fn parse_number(cell: &str) -> Option<Option<f64>> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .map(|v| Some(v).filter(|v| !v.is_nan()))
}

/// Numeric when the table has rows and every present cell parses as a float
fn infer_column(cells: &[&str]) -> ColumnData {
    let parsed: Option<Vec<Option<f64>>> = if cells.is_empty() {
        None
    } else {
        cells
            .iter()
            .map(|cell| {
                if is_missing(cell) {
                    Some(None)
                } else {
                    parse_number(cell)
                }
            })
            .collect()
    };

    match parsed {
        Some(values) => ColumnData::Numeric(values),
        None => ColumnData::Text(
            cells
                .iter()
                .map(|cell| {
                    if is_missing(cell) {
                        None
                    } else {
                        Some(cell.to_string())
                    }
                })
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_dataset(headers: Vec<&str>, rows: Vec<Vec<&str>>) -> Dataset {
        Dataset::from_records(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    // from_reader tests

    #[test]
    fn test_from_reader_basic() {
        let csv = "category,rating\nA,4.2\nB,3.9\n";
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.column_names(), vec!["category", "rating"]);
        assert_eq!(ds.column("rating").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(ds.column("category").unwrap().kind(), ColumnKind::Text);
    }

    #[test]
    fn test_from_reader_quoted_fields() {
        let csv = "category,rating\n\"Home, Kitchen\",4\n";
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        let labels = ds.labels("category", "test").unwrap();
        assert_eq!(labels, vec![Some("Home, Kitchen".to_string())]);
    }

    #[test]
    fn test_from_reader_ragged_rows() {
        let csv = "a,b\n1,2\n3\n";
        assert!(Dataset::from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_from_reader_header_only() {
        let ds = Dataset::from_reader("rating,category\n".as_bytes()).unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.column("rating").unwrap().kind(), ColumnKind::Text);
        assert!(ds.numeric_columns().is_empty());
    }

    #[test]
    fn test_from_path_missing_file() {
        let result = Dataset::from_path("does/not/exist.csv");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to open"));
    }

    // index artifact tests

    #[test]
    fn test_drops_unnamed_leading_column() {
        let ds = make_dataset(vec!["", "rating"], vec![vec!["0", "4"], vec!["1", "5"]]);
        assert_eq!(ds.column_names(), vec!["rating"]);
    }

    #[test]
    fn test_drops_unnamed_zero_column() {
        let ds = make_dataset(vec!["rating", "Unnamed: 0"], vec![vec!["4", "0"]]);
        assert_eq!(ds.column_names(), vec!["rating"]);
    }

    #[test]
    fn test_keeps_other_columns() {
        let ds = make_dataset(vec!["rating", "Unnamed: 3"], vec![vec!["4", "0"]]);
        assert_eq!(ds.column_names(), vec!["rating", "Unnamed: 3"]);
    }

    // inference tests

    #[test]
    fn test_missing_cells_keep_column_numeric() {
        let ds = make_dataset(vec!["rating"], vec![vec!["4.1"], vec![""], vec!["NaN"]]);
        let col = ds.column("rating").unwrap();
        assert_eq!(col.kind(), ColumnKind::Numeric);
        assert_eq!(ds.numeric("rating", "test").unwrap().as_ref(), &[Some(4.1), None, None]);
    }

    #[test]
    fn test_mixed_cells_make_text() {
        let ds = make_dataset(vec!["rating"], vec![vec!["4.1"], vec!["|"]]);
        assert_eq!(ds.column("rating").unwrap().kind(), ColumnKind::Text);
        let err = ds.numeric("rating", "test").unwrap_err();
        assert!(matches!(err, PipelineError::NonNumericColumn { .. }));
    }

    #[test]
    fn test_numeric_missing_column() {
        let ds = make_dataset(vec!["a"], vec![vec!["1"]]);
        let err = ds.numeric("rating", "test").unwrap_err();
        assert_eq!(
            err,
            PipelineError::MissingColumn {
                column: "rating".to_string(),
                stage: "test"
            }
        );
    }

    #[test]
    fn test_labels_from_numeric_column() {
        let ds = make_dataset(vec!["code"], vec![vec!["10"], vec!["2.5"]]);
        let labels = ds.labels("code", "test").unwrap();
        assert_eq!(labels, vec![Some("10".to_string()), Some("2.5".to_string())]);
    }

    #[test]
    fn test_nan_spellings_are_missing() {
        let ds = make_dataset(
            vec!["rating"],
            vec![vec!["-nan"], vec!["NAN"], vec!["-NaN"], vec!["4"], vec!["inf"]],
        );
        assert_eq!(ds.column("rating").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(
            ds.numeric("rating", "test").unwrap().as_ref(),
            &[None, None, None, Some(4.0), Some(f64::INFINITY)]
        );
    }

    #[test]
    fn test_spreadsheet_na_markers_are_missing() {
        let ds = make_dataset(
            vec!["discounted_price"],
            vec![
                vec!["#N/A"],
                vec!["#N/A N/A"],
                vec!["#NA"],
                vec!["<NA>"],
                vec!["199"],
            ],
        );
        assert_eq!(
            ds.numeric("discounted_price", "test").unwrap().as_ref(),
            &[None, None, None, None, Some(199.0)]
        );
    }

    #[test]
    fn test_lowercase_na_markers_are_missing() {
        let ds = make_dataset(
            vec!["actual_price"],
            vec![vec!["n/a"], vec!["null"], vec!["nan"], vec!["1000"]],
        );
        assert_eq!(
            ds.numeric("actual_price", "test").unwrap().as_ref(),
            &[None, None, None, Some(1000.0)]
        );
    }

    #[test]
    fn test_c_runtime_nan_markers_are_missing() {
        let ds = make_dataset(
            vec!["rating"],
            vec![
                vec!["1.#IND"],
                vec!["1.#QNAN"],
                vec!["-1.#IND"],
                vec!["-1.#QNAN"],
                vec!["3.9"],
            ],
        );
        assert_eq!(
            ds.numeric("rating", "test").unwrap().as_ref(),
            &[None, None, None, None, Some(3.9)]
        );
    }

    #[test]
    fn test_na_markers_in_text_column() {
        let ds = make_dataset(vec!["category"], vec![vec!["Audio"], vec!["#N/A"], vec!["<NA>"]]);
        assert_eq!(
            ds.labels("category", "test").unwrap(),
            vec![Some("Audio".to_string()), None, None]
        );
    }
}
