use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{s, Array1, Array2, Axis};
use tracing::info;

use crate::config::DEFAULT_VARIANCE_THRESHOLD;
use crate::dataset::{Column, DataSet};
use crate::error::{PipelineError, Result};
use crate::stats::{mean, variance};
use crate::table::{label_column, labels_of, LABEL_COLUMN};

/// The raw principal component decomposition, kept for reuse.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    /// Columns that entered the decomposition, in dataset order.
    pub features: Vec<String>,
    /// Numeric columns left out because their variance is zero.
    pub dropped_constant: Vec<String>,
    pub center: Array1<f64>,
    pub scale: Array1<f64>,
    /// Standard deviation of each component, descending.
    pub sdev: Array1<f64>,
    /// `features x components`; column `j` is the direction of component `j + 1`.
    pub loadings: Array2<f64>,
}

/// Component scores of the retained components, one row per labeled row.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTable {
    /// `PC1`, `PC2`, ... for the retained components.
    pub components: Vec<String>,
    pub scores: Array2<f64>,
    pub labels: Vec<usize>,
}

impl ScoredTable {
    /// Scores followed by the label column.
    pub fn to_dataset(&self) -> Result<DataSet> {
        let mut columns: Vec<Column> = self
            .components
            .iter()
            .zip(self.scores.axis_iter(Axis(1)))
            .map(|(name, col)| Column::numeric(name.clone(), col.to_vec()))
            .collect();
        columns.push(label_column(&self.labels));
        DataSet::new(columns)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionBundle {
    pub scored: ScoredTable,
    /// Percent of total variance per component, every component, rounded to 4 places.
    pub variance_explained: Vec<f64>,
    /// Running total of `variance_explained`, ending at 100.
    pub cumulative: Vec<f64>,
    pub decomposition: Decomposition,
}

impl ProjectionBundle {
    pub fn retained(&self) -> usize {
        self.scored.components.len()
    }
}

/// Principal component projection of a labeled dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    /// A component is kept when its variance explained (percent) is strictly above this.
    pub variance_threshold: f64,
}

impl Default for Projector {
    fn default() -> Self {
        Self {
            variance_threshold: DEFAULT_VARIANCE_THRESHOLD,
        }
    }
}

pub fn project(labeled: &DataSet) -> Result<ProjectionBundle> {
    Projector::default().project(labeled)
}

fn round4(x: f64) -> f64 {
    (x * 1e4).round() / 1e4
}

impl Projector {
    pub fn new(variance_threshold: f64) -> Self {
        Self { variance_threshold }
    }

    pub fn project(&self, labeled: &DataSet) -> Result<ProjectionBundle> {
        let labels = labels_of(labeled)?;
        let nrows = labeled.nrows();
        if nrows < 2 {
            return Err(PipelineError::validation(
                "principal components need at least 2 rows",
            ));
        }

        let mut features = Vec::new();
        let mut dropped_constant = Vec::new();
        let mut columns = Vec::new();
        for col in labeled.columns.iter().filter(|c| c.name != LABEL_COLUMN) {
            let Some(values) = col.numeric_values() else {
                continue;
            };
            let values = Array1::from(values);
            let var = variance(values.view());
            if var.is_finite() && var > 0.0 {
                features.push(col.name.clone());
                columns.push(values);
            } else {
                dropped_constant.push(col.name.clone());
            }
        }
        if !dropped_constant.is_empty() {
            info!(
                "Left constant column(s) out of PCA: {}",
                dropped_constant.join(", ")
            );
        }
        if features.is_empty() {
            return Err(PipelineError::validation(
                "no numeric column with non-zero variance is left for principal components",
            ));
        }

        let p = features.len();
        let mut center = Array1::<f64>::zeros(p);
        let mut scale = Array1::<f64>::zeros(p);
        let mut z = Array2::<f64>::zeros((nrows, p));
        for (j, values) in columns.iter().enumerate() {
            center[j] = mean(values.view());
            scale[j] = variance(values.view()).sqrt();
            z.column_mut(j)
                .assign(&values.mapv(|x| (x - center[j]) / scale[j]));
        }

        let corr = z.t().dot(&z) / (nrows as f64 - 1.0);
        let eig = SymmetricEigen::new(DMatrix::from_fn(p, p, |i, j| corr[[i, j]]));

        let mut order: Vec<usize> = (0..p).collect();
        order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));

        let eigenvalues: Vec<f64> = order.iter().map(|&i| eig.eigenvalues[i].max(0.0)).collect();
        let mut loadings = Array2::<f64>::zeros((p, p));
        for (c, &src) in order.iter().enumerate() {
            let mut v: Vec<f64> = (0..p).map(|r| eig.eigenvectors[(r, src)]).collect();
            // largest loading positive, so the sign is reproducible
            let pivot = v.iter().cloned().fold(0.0, |acc: f64, x| if x.abs() > acc.abs() { x } else { acc });
            if pivot < 0.0 {
                v.iter_mut().for_each(|x| *x = -*x);
            }
            loadings.column_mut(c).assign(&Array1::from(v));
        }

        let total: f64 = eigenvalues.iter().sum();
        let percents: Vec<f64> = eigenvalues.iter().map(|e| e / total * 100.0).collect();
        let variance_explained: Vec<f64> = percents.iter().map(|&x| round4(x)).collect();
        let cumulative: Vec<f64> = percents
            .iter()
            .scan(0.0, |acc, x| {
                *acc += x;
                Some(round4(*acc))
            })
            .collect();

        let retained = variance_explained
            .iter()
            .skip(1)
            .take_while(|&&v| v > self.variance_threshold)
            .count()
            + 1;
        info!(
            "Kept {} of {} principal components above {}% variance",
            retained, p, self.variance_threshold
        );

        let all_scores = z.dot(&loadings);
        let scored = ScoredTable {
            components: (1..=retained).map(|i| format!("PC{}", i)).collect(),
            scores: all_scores.slice(s![.., 0..retained]).to_owned(),
            labels,
        };

        Ok(ProjectionBundle {
            scored,
            variance_explained,
            cumulative,
            decomposition: Decomposition {
                features,
                dropped_constant,
                center,
                scale,
                sdev: eigenvalues.iter().map(|e| e.sqrt()).collect(),
                loadings,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn labeled() -> DataSet {
        DataSet::new(vec![
            Column::categorical("id", vec!["a", "b", "c", "d", "e", "f"]),
            Column::numeric("x", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            Column::numeric("y", vec![2.1, 3.9, 6.2, 7.8, 10.1, 12.0]),
            Column::numeric("z", vec![0.5, -1.0, 0.7, 0.1, -0.4, 0.3]),
            Column::numeric("flat", vec![1.0; 6]),
            label_column(&[1, 1, 1, 2, 2, 2]),
        ])
        .unwrap()
    }

    #[test]
    fn test_variance_conserved() {
        let bundle = project(&labeled()).unwrap();
        assert_eq!(bundle.variance_explained.len(), 3);
        let total: f64 = bundle.variance_explained.iter().sum();
        assert_abs_diff_eq!(total, 100.0, epsilon = 1e-3);
        assert_abs_diff_eq!(*bundle.cumulative.last().unwrap(), 100.0, epsilon = 1e-9);
        for w in bundle.variance_explained.windows(2) {
            assert!(w[0] >= w[1]);
        }
    }

    #[test]
    fn test_constant_and_label_left_out() {
        let bundle = project(&labeled()).unwrap();
        assert_eq!(bundle.decomposition.features, vec!["x", "y", "z"]);
        assert_eq!(bundle.decomposition.dropped_constant, vec!["flat"]);
        assert_eq!(bundle.scored.scores.nrows(), 6);
        assert_eq!(bundle.scored.labels, vec![1, 1, 1, 2, 2, 2]);
        let table = bundle.scored.to_dataset().unwrap();
        assert_eq!(table.names().last(), Some(&"cluster"));
    }

    #[test]
    fn test_retention_threshold() {
        // y is an exact multiple of x, so one component carries no variance
        let ds = DataSet::new(vec![
            Column::numeric("x", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            Column::numeric("y", vec![2.0, 4.0, 6.0, 8.0, 10.0]),
            Column::numeric("w", vec![3.0, 1.0, 4.0, 1.0, 5.0]),
            label_column(&[1, 1, 2, 2, 2]),
        ])
        .unwrap();
        let bundle = project(&ds).unwrap();
        assert_eq!(bundle.variance_explained.len(), 3);
        assert_abs_diff_eq!(bundle.variance_explained[2], 0.0, epsilon = 1e-4);
        assert_eq!(bundle.retained(), 2);
        assert_eq!(bundle.scored.components, vec!["PC1", "PC2"]);

        let strict = Projector::new(99.0).project(&ds).unwrap();
        assert_eq!(strict.retained(), 1);
    }

    #[test]
    fn test_scores_have_component_variance() {
        let bundle = project(&labeled()).unwrap();
        let pc1 = bundle.scored.scores.column(0);
        let sdev = bundle.decomposition.sdev[0];
        assert_abs_diff_eq!(variance(pc1), sdev * sdev, epsilon = 1e-9);
    }
}
