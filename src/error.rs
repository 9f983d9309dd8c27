use thiserror::Error;

/// Errors raised by the clustering pipeline.
///
/// All three kinds are fatal to the current run. The message names the
/// precondition that failed and, where there is one, the option that relaxes it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PipelineError {
    /// Malformed or infeasible input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The partitioning fit could not form the requested number of clusters.
    #[error("k-means did not converge: {0}")]
    Convergence(String),

    /// Options that contradict each other or the data.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl PipelineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn convergence(msg: impl Into<String>) -> Self {
        Self::Convergence(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
