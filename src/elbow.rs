use rayon::prelude::*;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::kmeans::KMeans;
use crate::stats::total_sum_of_squares;
use crate::table::NumericTable;

/// One point of the elbow curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElbowPoint {
    pub count: usize,
    /// Total within-cluster sum of squares.
    pub wss: f64,
}

/// Seed used for the fit with `count` clusters.
pub fn sweep_seed(base: u64, count: usize) -> u64 {
    base.wrapping_add(count as u64)
}

/// Total wss for every cluster count in `1..=limit`.
///
/// Count 1 is the total sum of squares, `sum(var(col)) * (R - 1)`. Every other
/// count is an independent fit seeded with [`sweep_seed`], so the curve does
/// not depend on how rayon schedules the fits. The first failing fit aborts
/// the whole sweep.
pub fn elbow_curve(table: &NumericTable, limit: usize, template: &KMeans) -> Result<Vec<ElbowPoint>> {
    let nrows = table.nrows();
    if limit == 0 || limit > nrows {
        return Err(PipelineError::validation(format!(
            "elbow limit must be between 1 and the number of rows ({}), got {}; lower limit",
            nrows, limit
        )));
    }
    if table.has_missing() {
        return Err(PipelineError::validation(
            "elbow input contains missing or non-finite values",
        ));
    }

    let first = ElbowPoint {
        count: 1,
        wss: total_sum_of_squares(&table.data),
    };

    let rest: Vec<ElbowPoint> = (2..=limit)
        .into_par_iter()
        .map(|count| -> Result<ElbowPoint> {
            let fit = KMeans {
                k: count,
                seed: sweep_seed(template.seed, count),
                ..template.clone()
            }
            .fit(table)?;
            Ok(ElbowPoint {
                count,
                wss: fit.tot_withinss,
            })
        })
        .collect::<Result<_>>()?;

    info!("Computed elbow curve for 1..={} clusters", limit);

    let mut curve = Vec::with_capacity(limit);
    curve.push(first);
    curve.extend(rest);
    Ok(curve)
}
