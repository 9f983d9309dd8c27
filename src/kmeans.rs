use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use tracing::debug;

use crate::config::{PipelineConfig, DEFAULT_SEED};
use crate::error::{PipelineError, Result};
use crate::stats::total_sum_of_squares;
use crate::table::NumericTable;

/// Outcome of one k-means fit. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub k: usize,
    /// Cluster label per row, in `1..=k`. Label numbers carry no meaning across fits.
    pub labels: Vec<usize>,
    /// One center per label; row `i` belongs to label `i + 1`.
    pub centers: Array2<f64>,
    pub sizes: Vec<usize>,
    /// Within-cluster sum of squares per label.
    pub withinss: Vec<f64>,
    pub tot_withinss: f64,
    pub totss: f64,
    pub betweenss: f64,
    /// Lloyd iterations of the winning start.
    pub iterations: usize,
    pub converged: bool,
}

/// Seeded Lloyd k-means with several starts.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeans {
    pub k: usize,
    pub max_iter: usize,
    pub n_init: usize,
    pub seed: u64,
}

struct Run {
    assignments: Vec<usize>,
    centers: Array2<f64>,
    withinss: Vec<f64>,
    iterations: usize,
    converged: bool,
}

impl Run {
    fn tot_withinss(&self) -> f64 {
        self.withinss.iter().sum()
    }
}

/// Fit `k` clusters with the default iteration settings.
pub fn fit(table: &NumericTable, k: usize, seed: u64) -> Result<FitResult> {
    KMeans::new(k).with_seed(seed).fit(table)
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 50,
            n_init: 10,
            seed: DEFAULT_SEED,
        }
    }

    pub fn from_config(k: usize, config: &PipelineConfig) -> Self {
        Self {
            k,
            max_iter: config.max_iter,
            n_init: config.n_init,
            seed: config.seed,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
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

    /// Squared Euclidean distance
    #[inline]
    fn sq_dist(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
    }

    pub fn fit(&self, table: &NumericTable) -> Result<FitResult> {
        let data = table.data.view();
        let nrows = data.nrows();
        let k = self.k;

        if k == 0 || k > nrows {
            return Err(PipelineError::validation(format!(
                "k must be between 1 and the number of rows ({}), got {}",
                nrows, k
            )));
        }
        if self.max_iter == 0 || self.n_init == 0 {
            return Err(PipelineError::configuration(
                "max_iter and n_init must both be at least 1",
            ));
        }
        if table.has_missing() {
            return Err(PipelineError::validation(
                "clustering input contains missing or non-finite values",
            ));
        }

        let distinct = Self::distinct_rows(data);
        if distinct.len() < k {
            return Err(PipelineError::convergence(format!(
                "only {} distinct data points for {} clusters",
                distinct.len(),
                k
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut best: Option<Run> = None;
        let mut last_err = None;

        for start in 0..self.n_init {
            let init: Vec<usize> = distinct.choose_multiple(&mut rng, k).cloned().collect();
            match self.lloyd(data, &init, &mut rng) {
                Ok(run) => {
                    debug!(
                        "k={} start {}: wss {:.6} after {} iterations",
                        k,
                        start,
                        run.tot_withinss(),
                        run.iterations
                    );
                    if best.as_ref().map_or(true, |b| run.tot_withinss() < b.tot_withinss()) {
                        best = Some(run);
                    }
                }
                Err(e) => last_err = Some(e),
            }
        }

        let run = match (best, last_err) {
            (Some(run), _) => run,
            (None, Some(e)) => return Err(e),
            (None, None) => {
                return Err(PipelineError::convergence(format!("no start produced {} clusters", k)))
            }
        };

        let tot_withinss = run.tot_withinss();
        let totss = total_sum_of_squares(&table.data);
        let mut sizes = vec![0usize; k];
        for &a in &run.assignments {
            sizes[a] += 1;
        }

        Ok(FitResult {
            k,
            labels: run.assignments.iter().map(|a| a + 1).collect(),
            centers: run.centers,
            sizes,
            withinss: run.withinss,
            tot_withinss,
            totss,
            betweenss: totss - tot_withinss,
            iterations: run.iterations,
            converged: run.converged,
        })
    }

    /// Index of the first occurrence of every distinct row.
    fn distinct_rows(data: ArrayView2<f64>) -> Vec<usize> {
        let mut seen = HashSet::new();
        data.outer_iter()
            .enumerate()
            .filter(|(_, row)| seen.insert(row.iter().map(|x| (x + 0.0).to_bits()).collect::<Vec<_>>()))
            .map(|(i, _)| i)
            .collect()
    }

    fn lloyd(&self, data: ArrayView2<f64>, init: &[usize], rng: &mut ChaCha8Rng) -> Result<Run> {
        let k = self.k;
        let nrows = data.nrows();
        let ncols = data.ncols();

        let mut centroids = Array2::<f64>::zeros((k, ncols));
        for (ci, &idx) in init.iter().enumerate() {
            centroids.row_mut(ci).assign(&data.row(idx));
        }

        // Each point's cluster assignment
        let mut assignments = vec![usize::MAX; nrows];
        let mut iterations = 0;
        let mut converged = false;

        for _ in 0..self.max_iter {
            iterations += 1;

            // Step 1: assign points to nearest centroid
            let mut changed = false;
            for (i, row) in data.outer_iter().enumerate() {
                let mut best_cluster = 0;
                let mut best_dist = f64::MAX;
                for (ci, c_row) in centroids.outer_iter().enumerate() {
                    let dist = Self::sq_dist(row, c_row);
                    if dist < best_dist {
                        best_dist = dist;
                        best_cluster = ci;
                    }
                }
                if assignments[i] != best_cluster {
                    assignments[i] = best_cluster;
                    changed = true;
                }
            }
            if !changed {
                converged = true;
                break;
            }

            // Step 2: update centroids as mean of assigned points
            let (mut new_centroids, counts) = Self::means(data, &assignments, k);
            for ci in 0..k {
                if counts[ci] == 0 {
                    // reinitialize empty cluster randomly
                    let idx = rng.gen_range(0..nrows);
                    new_centroids.row_mut(ci).assign(&data.row(idx));
                }
            }
            centroids = new_centroids;
        }

        if !converged {
            debug!("k={} stopped after {} iterations without converging", k, iterations);
        }

        let (centers, counts) = Self::means(data, &assignments, k);
        if let Some(empty) = counts.iter().position(|&c| c == 0) {
            return Err(PipelineError::convergence(format!(
                "cluster {} of {} is empty after {} iterations",
                empty + 1,
                k,
                iterations
            )));
        }

        let mut withinss = vec![0.0; k];
        for (row, &a) in data.outer_iter().zip(&assignments) {
            withinss[a] += Self::sq_dist(row, centers.row(a));
        }

        Ok(Run {
            assignments,
            centers,
            withinss,
            iterations,
            converged,
        })
    }

    fn means(data: ArrayView2<f64>, assignments: &[usize], k: usize) -> (Array2<f64>, Vec<usize>) {
        let mut sums = Array2::<f64>::zeros((k, data.ncols()));
        let mut counts = vec![0usize; k];
        for (row, &c) in data.outer_iter().zip(assignments) {
            let mut target = sums.row_mut(c);
            target += &row;
            counts[c] += 1;
        }
        for (ci, mut row) in sums.axis_iter_mut(Axis(0)).enumerate() {
            if counts[ci] > 0 {
                row.mapv_inplace(|x| x / counts[ci] as f64);
            }
        }
        (sums, counts)
    }
}
