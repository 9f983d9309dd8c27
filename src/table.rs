use ndarray::{Array2, Axis};

use crate::dataset::{Column, ColumnData, DataSet};
use crate::error::{PipelineError, Result};

/// Dense numeric matrix with column headers, the input of every numeric stage.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericTable {
    pub data: Array2<f64>,
    pub headers: Vec<String>,
}

impl NumericTable {
    pub fn new(data: Array2<f64>, headers: Vec<String>) -> Result<Self> {
        if data.ncols() != headers.len() {
            return Err(PipelineError::validation(format!(
                "{} headers for {} columns",
                headers.len(),
                data.ncols()
            )));
        }
        Ok(Self { data, headers })
    }

    /// Collect the numeric columns of a DataSet. Missing cells become NaN.
    pub fn from_dataset(ds: &DataSet) -> Result<Self> {
        let numeric: Vec<(&str, Vec<f64>)> = ds
            .columns
            .iter()
            .filter_map(|c| c.numeric_values().map(|v| (c.name.as_str(), v)))
            .collect();

        let mut data = Array2::<f64>::zeros((ds.nrows(), numeric.len()));
        for (j, (_, values)) in numeric.iter().enumerate() {
            for (i, &x) in values.iter().enumerate() {
                data[[i, j]] = x;
            }
        }
        let headers = numeric.iter().map(|(n, _)| n.to_string()).collect();
        Self::new(data, headers)
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn has_missing(&self) -> bool {
        self.data.iter().any(|x| !x.is_finite())
    }

    /// Back to named numeric columns.
    pub fn to_columns(&self) -> Vec<Column> {
        self.headers
            .iter()
            .zip(self.data.axis_iter(Axis(1)))
            .map(|(name, col)| Column::numeric(name.clone(), col.to_vec()))
            .collect()
    }
}

/// Role a column plays in the labeled output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    /// Kept out of distance computation and reattached first.
    Excluded,
    /// Consumed by clustering.
    Clustering,
    /// The fitted cluster label.
    Label,
}

/// Ordered `(name, role)` list that survives encoding, exclusion and reattachment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnLayout {
    entries: Vec<(String, ColumnRole)>,
}

impl ColumnLayout {
    pub fn push(&mut self, name: impl Into<String>, role: ColumnRole) {
        self.entries.push((name.into(), role));
    }

    pub fn entries(&self) -> &[(String, ColumnRole)] {
        &self.entries
    }

    pub fn names_with_role(&self, role: ColumnRole) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, r)| *r == role)
            .map(|(n, _)| n.as_str())
            .collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Label column name in every labeled dataset.
pub const LABEL_COLUMN: &str = "cluster";

/// The label column as stored in a labeled dataset.
pub fn label_column(labels: &[usize]) -> Column {
    Column::new(
        LABEL_COLUMN,
        ColumnData::Numeric(labels.iter().map(|&l| Some(l as f64)).collect()),
    )
}

/// Read the label column back as integers.
pub fn labels_of(ds: &DataSet) -> Result<Vec<usize>> {
    let values = ds
        .column(LABEL_COLUMN)
        .and_then(Column::numeric_values)
        .ok_or_else(|| {
            PipelineError::validation(format!("labeled dataset has no '{}' column", LABEL_COLUMN))
        })?;
    values
        .into_iter()
        .map(|x| {
            if x.is_finite() && x >= 1.0 && x.fract() == 0.0 {
                Ok(x as usize)
            } else {
                Err(PipelineError::validation(format!(
                    "'{}' holds {} which is not a cluster label",
                    LABEL_COLUMN, x
                )))
            }
        })
        .collect()
}
