use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::PipelineError;

/// Date cells are recognised (and written back) in ISO form.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Cell spellings read as a missing value.
const MISSING_TOKENS: [&str; 4] = ["", "NA", "NaN", "null"];

/// Type tag of a column, fixed when the column is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Date,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
    Date(Vec<Option<NaiveDate>>),
}

impl ColumnData {
    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Categorical(_) => ColumnKind::Categorical,
            ColumnData::Date(_) => ColumnKind::Date,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
            ColumnData::Date(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Numeric(v) => v[row].map_or(true, |x| !x.is_finite()),
            ColumnData::Categorical(v) => v[row].is_none(),
            ColumnData::Date(v) => v[row].is_none(),
        }
    }

    fn select_rows(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Categorical(v) => {
                ColumnData::Categorical(rows.iter().map(|&r| v[r].clone()).collect())
            }
            ColumnData::Date(v) => ColumnData::Date(rows.iter().map(|&r| v[r]).collect()),
        }
    }

    /// Text form of one cell, `NA` when missing.
    pub fn cell(&self, row: usize) -> String {
        match self {
            ColumnData::Numeric(v) => match v[row] {
                Some(x) if x.is_finite() => x.to_string(),
                _ => "NA".to_string(),
            },
            ColumnData::Categorical(v) => v[row].clone().unwrap_or_else(|| "NA".to_string()),
            ColumnData::Date(v) => v[row]
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_else(|| "NA".to_string()),
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// A fully observed numeric column.
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, ColumnData::Numeric(values.into_iter().map(Some).collect()))
    }

    pub fn categorical<S: Into<String>>(name: impl Into<String>, values: Vec<S>) -> Self {
        Self::new(
            name,
            ColumnData::Categorical(values.into_iter().map(|s| Some(s.into())).collect()),
        )
    }

    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Numeric values with missing cells as NaN; `None` for non-numeric columns.
    pub fn numeric_values(&self) -> Option<Vec<f64>> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v.iter().map(|x| x.unwrap_or(f64::NAN)).collect()),
            _ => None,
        }
    }

    /// Build a column from raw text cells, deciding its kind once.
    fn infer(name: String, cells: Vec<Option<String>>) -> Self {
        let present = || cells.iter().flatten();

        if present().all(|c| c.trim().parse::<f64>().is_ok()) {
            // inf and nan spellings parse, but count as missing
            let values = cells
                .iter()
                .map(|c| {
                    c.as_ref()
                        .and_then(|s| s.trim().parse::<f64>().ok())
                        .filter(|x| x.is_finite())
                })
                .collect();
            return Self::new(name, ColumnData::Numeric(values));
        }

        if present().all(|c| NaiveDate::parse_from_str(c.trim(), DATE_FORMAT).is_ok()) {
            let values = cells
                .iter()
                .map(|c| {
                    c.as_ref()
                        .and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok())
                })
                .collect();
            return Self::new(name, ColumnData::Date(values));
        }

        Self::new(name, ColumnData::Categorical(cells))
    }
}

/// An ordered collection of equally long, named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSet {
    pub columns: Vec<Column>,
}

impl DataSet {
    pub fn new(columns: Vec<Column>) -> crate::error::Result<Self> {
        if let Some(first) = columns.first() {
            let nrows = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != nrows) {
                return Err(PipelineError::validation(format!(
                    "column '{}' has {} rows, expected {}",
                    bad.name,
                    bad.len(),
                    nrows
                )));
            }
        }
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(PipelineError::validation(format!(
                    "duplicate column name '{}'",
                    col.name
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Read a TSV file into a DataSet
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_path(path, b'\t')
    }

    /// Read a comma separated file into a DataSet
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_path(path, b',')
    }

    pub fn from_path<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Self> {
        let file = File::open(&path)
            .map_err(|e| anyhow!("Failed to open {:?}: {}", path.as_ref(), e))?;
        Self::from_reader(file, delimiter)
            .map_err(|e| anyhow!("Failed to read {:?}: {}", path.as_ref(), e))
    }

    /// Parse delimited text with a header line.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| anyhow!("Error reading header: {}", e))?
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

        for (i, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| anyhow!("Error reading record {}: {}", i, e))?;
            for (col, field) in cells.iter_mut().zip(record.iter()) {
                let missing = MISSING_TOKENS.contains(&field.trim());
                col.push((!missing).then(|| field.to_string()));
            }
        }

        if cells.first().map_or(true, |c| c.is_empty()) {
            return Err(anyhow!("No data lines found"));
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, col)| Column::infer(name, col))
            .collect();

        Ok(Self::new(columns)?)
    }

    /// Write the DataSet as TSV with a header line.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut wtr = WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(&path)
            .map_err(|e| anyhow!("Failed to create {:?}: {}", path.as_ref(), e))?;

        wtr.write_record(self.names())?;
        for row in 0..self.nrows() {
            wtr.write_record(self.columns.iter().map(|c| c.data.cell(row)))?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn nrows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_all_numeric(&self) -> bool {
        self.columns.iter().all(|c| c.kind() == ColumnKind::Numeric)
    }

    /// Row indices holding at least one missing cell.
    pub fn rows_with_missing(&self) -> Vec<usize> {
        (0..self.nrows())
            .filter(|&r| self.columns.iter().any(|c| c.data.is_missing(r)))
            .collect()
    }

    /// Keep only the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> DataSet {
        DataSet {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.select_rows(rows)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "id\tsize\tcolour\twhen\n\
                          a\t1.5\tred\t2021-03-04\n\
                          b\tNA\tblue\t2022-01-01\n\
                          c\t3\t\t2020-12-31\n";

    #[test]
    fn test_kind_inference() {
        let ds = DataSet::from_reader(SAMPLE.as_bytes(), b'\t').unwrap();
        assert_eq!(ds.nrows(), 3);
        assert_eq!(ds.names(), vec!["id", "size", "colour", "when"]);
        assert_eq!(ds.column("id").unwrap().kind(), ColumnKind::Categorical);
        assert_eq!(ds.column("size").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(ds.column("colour").unwrap().kind(), ColumnKind::Categorical);
        assert_eq!(ds.column("when").unwrap().kind(), ColumnKind::Date);
    }

    #[test]
    fn test_missing_rows() {
        let ds = DataSet::from_reader(SAMPLE.as_bytes(), b'\t').unwrap();
        assert_eq!(ds.rows_with_missing(), vec![1, 2]);
        let kept = ds.select_rows(&[0]);
        assert_eq!(kept.nrows(), 1);
        assert!(kept.rows_with_missing().is_empty());
    }

    #[test]
    fn test_non_finite_cells_are_missing() {
        let text = "x\ty\n1\t2\ninf\t3\n4\t-inf\n5\tnan\n6\t7\n";
        let ds = DataSet::from_reader(text.as_bytes(), b'\t').unwrap();
        assert_eq!(ds.column("x").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(ds.column("y").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(ds.rows_with_missing(), vec![1, 2, 3]);

        let built = DataSet::new(vec![Column::numeric("z", vec![1.0, f64::INFINITY])]).unwrap();
        assert_eq!(built.rows_with_missing(), vec![1]);
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let err = DataSet::new(vec![
            Column::numeric("a", vec![1.0, 2.0]),
            Column::numeric("b", vec![1.0]),
        ])
        .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn test_empty_input() {
        assert!(DataSet::from_reader("a\tb\n".as_bytes(), b'\t').is_err());
    }
}
