//! Exploratory k-means over tabular data.
//!
//! A run prepares the table (missing values, one-hot encoding, min-max
//! scaling, excluded identifier columns), computes an elbow curve to help
//! pick `k`, fits k-means for the chosen `k`, profiles the clusters and
//! projects the labeled rows onto their principal components.

pub mod charts;
pub mod config;
pub mod dataset;
pub mod elbow;
pub mod encode;
pub mod error;
pub mod kmeans;
pub mod normalize;
pub mod pca;
pub mod pipeline;
pub mod preprocess;
pub mod profile;
pub mod stats;
pub mod table;

pub use config::PipelineConfig;
pub use dataset::{Column, ColumnData, ColumnKind, DataSet};
pub use elbow::{elbow_curve, ElbowPoint};
pub use error::PipelineError;
pub use kmeans::{fit, FitResult, KMeans};
pub use pca::{project, ProjectionBundle, Projector};
pub use pipeline::{ClusteringOutput, Pipeline, PipelineOutput};
pub use preprocess::{Prepared, Preprocessor};
pub use profile::{profile, ClusterProfile};
pub use table::{ColumnLayout, ColumnRole, NumericTable, LABEL_COLUMN};
