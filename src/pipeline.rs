use tracing::info;

use crate::config::PipelineConfig;
use crate::dataset::DataSet;
use crate::elbow::{elbow_curve, ElbowPoint};
use crate::error::{PipelineError, Result};
use crate::kmeans::{FitResult, KMeans};
use crate::pca::{ProjectionBundle, Projector};
use crate::preprocess::{Prepared, Preprocessor};
use crate::profile::{profile, ClusterProfile};
use crate::stats::{correlation_matrix, CorrelationMatrix};

/// Everything produced for a chosen `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringOutput {
    pub k: usize,
    /// Excluded columns, clustering columns, then `cluster`.
    pub labeled: DataSet,
    pub fit: FitResult,
    pub profile: ClusterProfile,
    /// Correlation between the clustering columns.
    pub correlation: CorrelationMatrix,
    pub projection: ProjectionBundle,
}

/// In-memory result bundle of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub prepared: Prepared,
    pub elbow: Vec<ElbowPoint>,
    /// `None` in elbow-only mode (no `k` given).
    pub clustering: Option<ClusteringOutput>,
}

pub struct Pipeline {
    config: PipelineConfig,
    preprocessor: Preprocessor,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let preprocessor = Preprocessor::from_config(&config);
        Self {
            config,
            preprocessor,
        }
    }

    /// Swap in a preprocessor with a different encoder or normalizer.
    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn check_config(&self) -> Result<()> {
        let c = &self.config;
        if c.k == Some(0) {
            return Err(PipelineError::validation("k must be at least 1"));
        }
        if !c.variance_threshold.is_finite() || c.variance_threshold < 0.0 {
            return Err(PipelineError::configuration(format!(
                "variance_threshold must be a non-negative percentage, got {}",
                c.variance_threshold
            )));
        }
        if !c.nan_fill.is_finite() {
            return Err(PipelineError::configuration("nan_fill must be a finite number"));
        }
        Ok(())
    }

    /// Preprocess, sweep the elbow curve and, when `k` is set, cluster,
    /// profile and project. Any failure aborts the run without partial output.
    pub fn run(&self, ds: &DataSet) -> Result<PipelineOutput> {
        self.check_config()?;

        let prepared = self.preprocessor.prepare(ds)?;
        info!(
            "Prepared {} rows x {} clustering columns",
            prepared.numeric.nrows(),
            prepared.numeric.ncols()
        );

        let template = KMeans::from_config(1, &self.config);
        let elbow = elbow_curve(&prepared.numeric, self.config.limit, &template)?;

        let clustering = match self.config.k {
            Some(k) => Some(self.cluster(&prepared, k)?),
            None => {
                info!("No k given; returning the elbow curve only");
                None
            }
        };

        Ok(PipelineOutput {
            prepared,
            elbow,
            clustering,
        })
    }

    fn cluster(&self, prepared: &Prepared, k: usize) -> Result<ClusteringOutput> {
        let fit = KMeans::from_config(k, &self.config).fit(&prepared.numeric)?;
        info!(
            "Fitted {} clusters, sizes {:?}, wss {:.4}",
            k, fit.sizes, fit.tot_withinss
        );

        let labeled = prepared.labeled(&fit.labels)?;
        let profile = profile(&labeled)?;
        let correlation = correlation_matrix(&prepared.numeric);
        let projection = Projector::new(self.config.variance_threshold).project(&labeled)?;

        Ok(ClusteringOutput {
            k,
            labeled,
            fit,
            profile,
            correlation,
            projection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    fn small() -> DataSet {
        DataSet::new(vec![
            Column::categorical("id", vec!["a", "b", "c", "d", "e", "f"]),
            Column::numeric("x", vec![0.0, 0.2, 0.1, 5.0, 5.2, 5.1]),
            Column::numeric("y", vec![1.0, 1.1, 0.9, 7.0, 7.3, 7.1]),
        ])
        .unwrap()
    }

    #[test]
    fn test_elbow_only() {
        let config = PipelineConfig::default().with_limit(4).with_exclude(["id"]);
        let out = Pipeline::new(config).run(&small()).unwrap();
        assert_eq!(out.elbow.len(), 4);
        assert!(out.clustering.is_none());
    }

    #[test]
    fn test_full_run() {
        let config = PipelineConfig::new(2).with_limit(3).with_exclude(["id"]);
        let out = Pipeline::new(config).run(&small()).unwrap();
        let c = out.clustering.unwrap();
        assert_eq!(c.labeled.names(), vec!["id", "x", "y", "cluster"]);
        assert_eq!(c.profile.rows.len(), 2);
        assert_eq!(c.profile.total_size(), 6);
        assert_eq!(c.correlation.names, vec!["x", "y"]);
        assert_eq!(c.projection.scored.scores.nrows(), 6);
    }

    #[test]
    fn test_bad_threshold() {
        let config = PipelineConfig::new(2).with_variance_threshold(-1.0);
        let err = Pipeline::new(config).run(&small()).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_k_above_rows() {
        let config = PipelineConfig::new(9).with_limit(2).with_exclude(["id"]);
        let err = Pipeline::new(config).run(&small()).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }
}
