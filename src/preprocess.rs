use ndarray::Axis;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::dataset::{ColumnKind, DataSet};
use crate::encode::{CategoricalEncoder, OneHotEncoder, OTHER_LEVEL};
use crate::error::{PipelineError, Result};
use crate::normalize::{fill_nan, MinMaxNormalizer, Normalizer};
use crate::table::{label_column, ColumnLayout, ColumnRole, NumericTable, LABEL_COLUMN};

/// Turns a raw dataset into a numeric clustering table plus the excluded
/// side table needed to rebuild the labeled output.
pub struct Preprocessor {
    pub drop_na: bool,
    pub exclude: Vec<String>,
    pub encode_categorical: bool,
    pub normalize: bool,
    pub nan_fill: f64,
    pub max_categories: usize,
    encoder: Box<dyn CategoricalEncoder + Send + Sync>,
    normalizer: Box<dyn Normalizer + Send + Sync>,
}

/// Result of [`Preprocessor::prepare`].
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    /// Clustering input: numeric, no missing values.
    pub numeric: NumericTable,
    /// Excluded columns in their original relative order, rows aligned with `numeric`.
    pub excluded: DataSet,
    /// Excluded columns first, then clustering columns.
    pub layout: ColumnLayout,
    /// Indices (in the input dataset) of rows removed for missing values.
    pub removed_rows: Vec<usize>,
}

impl Prepared {
    /// Rebuild the full table: excluded columns, clustering columns, then the label.
    pub fn labeled(&self, labels: &[usize]) -> Result<DataSet> {
        if labels.len() != self.numeric.nrows() {
            return Err(PipelineError::validation(format!(
                "{} labels for {} rows",
                labels.len(),
                self.numeric.nrows()
            )));
        }
        let mut columns = self.excluded.columns.clone();
        columns.extend(self.numeric.to_columns());
        columns.push(label_column(labels));
        DataSet::new(columns)
    }
}

impl Preprocessor {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            drop_na: config.drop_na,
            exclude: config.exclude.clone(),
            encode_categorical: config.encode_categorical,
            normalize: config.normalize,
            nan_fill: config.nan_fill,
            max_categories: config.max_categories,
            encoder: Box::new(OneHotEncoder::default()),
            normalizer: Box::new(MinMaxNormalizer),
        }
    }

    pub fn with_encoder(mut self, encoder: impl CategoricalEncoder + Send + Sync + 'static) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    pub fn with_normalizer(mut self, normalizer: impl Normalizer + Send + Sync + 'static) -> Self {
        self.normalizer = Box::new(normalizer);
        self
    }

    /// Validate, clean and split `ds`.
    ///
    /// Excluded columns are split off right after missing-value removal, ahead
    /// of encoding and normalization. They never reach a numeric computation
    /// and are reattached unscaled and unexpanded, under their original names.
    /// The clustering columns go through encode, then normalize.
    pub fn prepare(&self, ds: &DataSet) -> Result<Prepared> {
        if ds.column(LABEL_COLUMN).is_some() {
            return Err(PipelineError::configuration(format!(
                "input already has a '{}' column, which would clash with the fitted labels; \
                 rename or drop that column before clustering",
                LABEL_COLUMN
            )));
        }
        if let Some(missing) = self.exclude.iter().find(|n| ds.column(n).is_none()) {
            return Err(PipelineError::configuration(format!(
                "cannot exclude '{}': no such column (available: {})",
                missing,
                ds.names().join(", ")
            )));
        }

        let (ds, removed_rows) = self.remove_missing(ds)?;

        let (excluded, rest): (Vec<_>, Vec<_>) = ds
            .columns
            .into_iter()
            .partition(|c| self.exclude.contains(&c.name));
        if !excluded.is_empty() {
            info!(
                "Excluding {} column(s) from clustering: {}",
                excluded.len(),
                excluded.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ")
            );
        }
        let excluded = DataSet::new(excluded)?;
        let rest = self.to_numeric(DataSet::new(rest)?)?;

        let mut numeric = NumericTable::from_dataset(&rest)?;
        if numeric.ncols() == 0 {
            return Err(PipelineError::validation(
                "no numeric columns remain after preprocessing; enable encode_categorical or exclude fewer columns",
            ));
        }
        if self.normalize {
            self.normalize_columns(&mut numeric);
        }

        let mut layout = ColumnLayout::default();
        for c in &excluded.columns {
            layout.push(c.name.clone(), ColumnRole::Excluded);
        }
        for h in &numeric.headers {
            layout.push(h.clone(), ColumnRole::Clustering);
        }

        Ok(Prepared {
            numeric,
            excluded,
            layout,
            removed_rows,
        })
    }

    fn remove_missing(&self, ds: &DataSet) -> Result<(DataSet, Vec<usize>)> {
        let bad = ds.rows_with_missing();
        if bad.is_empty() {
            return Ok((ds.clone(), bad));
        }
        if !self.drop_na {
            return Err(PipelineError::validation(format!(
                "{} of {} rows contain missing values and no missing values may remain; \
                 set drop_na to remove these rows",
                bad.len(),
                ds.nrows()
            )));
        }
        if bad.len() == ds.nrows() {
            return Err(PipelineError::validation(
                "every row contains a missing value; nothing is left after drop_na",
            ));
        }
        let keep: Vec<usize> = (0..ds.nrows()).filter(|r| bad.binary_search(r).is_err()).collect();
        info!(
            "Removed {} row(s) with missing values, {} rows remain",
            bad.len(),
            keep.len()
        );
        Ok((ds.select_rows(&keep), bad))
    }

    fn to_numeric(&self, ds: DataSet) -> Result<DataSet> {
        if ds.is_all_numeric() {
            return Ok(ds);
        }
        if !self.encode_categorical {
            let (kept, dropped): (Vec<_>, Vec<_>) = ds
                .columns
                .into_iter()
                .partition(|c| c.kind() == ColumnKind::Numeric);
            warn!(
                "Dropped non-numeric column(s) {}; set encode_categorical to one-hot encode them",
                dropped.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ")
            );
            return DataSet::new(kept);
        }

        let before = ds.ncols();
        let encoded = self.encoder.encode(&ds, self.max_categories)?;
        if !encoded.expanded.is_empty() {
            info!(
                "Encoded {} into numeric columns ({} -> {} columns)",
                encoded.expanded.join(", "),
                before,
                encoded.dataset.ncols()
            );
        }
        if !encoded.lumped.is_empty() {
            warn!(
                "Merged levels beyond the {} most frequent of {} into '{}'; raise max_categories to keep them",
                self.max_categories,
                encoded.lumped.join(", "),
                OTHER_LEVEL
            );
        }
        Ok(encoded.dataset)
    }

    fn normalize_columns(&self, table: &mut NumericTable) {
        let mut filled = 0;
        for mut col in table.data.axis_iter_mut(Axis(1)) {
            let mut scaled = self.normalizer.normalize(&col.to_vec());
            filled += fill_nan(&mut scaled, self.nan_fill);
            for (dst, src) in col.iter_mut().zip(scaled) {
                *dst = src;
            }
        }
        info!("Normalized {} column(s) to [0, 1]", table.ncols());
        if filled > 0 {
            info!("Replaced {} unscalable value(s) with {}", filled, self.nan_fill);
        }
    }
}
