/// Default upper bound of the elbow sweep.
pub const DEFAULT_LIMIT: usize = 20;
/// Default base seed.
pub const DEFAULT_SEED: u64 = 123;
/// A categorical column with more levels than this is not one-hot encoded.
pub const DEFAULT_MAX_CATEGORIES: usize = 8;
/// Percent of total variance a principal component must exceed to be kept.
pub const DEFAULT_VARIANCE_THRESHOLD: f64 = 0.1;

/// Options of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Number of clusters; `None` computes the elbow curve only.
    pub k: Option<usize>,

    /// Elbow curve covers cluster counts `1..=limit`.
    pub limit: usize,

    /// Base seed of every k-means fit.
    pub seed: u64,

    /// Remove rows with missing values instead of failing.
    pub drop_na: bool,

    /// Columns kept out of clustering and reattached in front of the output.
    pub exclude: Vec<String>,

    /// One-hot encode non-numeric columns; when false they are dropped.
    pub encode_categorical: bool,

    /// Min-max scale every clustering column to [0, 1].
    pub normalize: bool,

    /// Replacement for NaN produced by normalizing a constant column.
    pub nan_fill: f64,

    pub max_categories: usize,

    /// Retention threshold for principal components, in percent.
    pub variance_threshold: f64,

    /// Lloyd iterations per start.
    pub max_iter: usize,

    /// Seeded starts per fit; the lowest wss wins.
    pub n_init: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            k: None,
            limit: DEFAULT_LIMIT,
            seed: DEFAULT_SEED,
            drop_na: false,
            exclude: Vec::new(),
            encode_categorical: true,
            normalize: true,
            nan_fill: 0.0,
            max_categories: DEFAULT_MAX_CATEGORIES,
            variance_threshold: DEFAULT_VARIANCE_THRESHOLD,
            max_iter: 50,
            n_init: 10,
        }
    }
}

impl PipelineConfig {
    pub fn new(k: usize) -> Self {
        Self {
            k: Some(k),
            ..Default::default()
        }
    }

    pub fn with_k(mut self, k: Option<usize>) -> Self {
        self.k = k;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_drop_na(mut self, drop_na: bool) -> Self {
        self.drop_na = drop_na;
        self
    }

    pub fn with_exclude<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_encode_categorical(mut self, encode: bool) -> Self {
        self.encode_categorical = encode;
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_nan_fill(mut self, value: f64) -> Self {
        self.nan_fill = value;
        self
    }

    pub fn with_max_categories(mut self, max_categories: usize) -> Self {
        self.max_categories = max_categories;
        self
    }

    pub fn with_variance_threshold(mut self, percent: f64) -> Self {
        self.variance_threshold = percent;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }
}
