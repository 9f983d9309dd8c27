use ndarray::{Array2, ArrayView1, Axis};

use crate::table::NumericTable;

pub fn mean(values: ArrayView1<f64>) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sum() / values.len() as f64
}

/// Sample variance (denominator n - 1). NaN below two values.
pub fn variance(values: ArrayView1<f64>) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// Sum of squared deviations from the column means, i.e. the wss of a
/// single cluster holding every row. Equals `sum(var(col)) * (R - 1)`.
pub fn total_sum_of_squares(data: &Array2<f64>) -> f64 {
    data.axis_iter(Axis(1))
        .map(|col| {
            let m = mean(col);
            col.iter().map(|x| (x - m).powi(2)).sum::<f64>()
        })
        .sum()
}

/// Pairwise Pearson correlation between the columns of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    /// Symmetric, NaN wherever a constant column is involved.
    pub values: Array2<f64>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.values[[i, j]])
    }
}

pub fn correlation_matrix(table: &NumericTable) -> CorrelationMatrix {
    let p = table.ncols();
    let centered: Vec<Vec<f64>> = table
        .data
        .axis_iter(Axis(1))
        .map(|col| {
            let m = mean(col);
            col.iter().map(|x| x - m).collect()
        })
        .collect();
    let norms: Vec<f64> = centered
        .iter()
        .map(|c| c.iter().map(|x| x * x).sum::<f64>().sqrt())
        .collect();

    let mut values = Array2::<f64>::zeros((p, p));
    for i in 0..p {
        for j in i..p {
            let r = if norms[i] == 0.0 || norms[j] == 0.0 {
                f64::NAN
            } else {
                let dot: f64 = centered[i].iter().zip(&centered[j]).map(|(a, b)| a * b).sum();
                (dot / (norms[i] * norms[j])).clamp(-1.0, 1.0)
            };
            values[[i, j]] = r;
            values[[j, i]] = r;
        }
    }

    CorrelationMatrix {
        names: table.headers.clone(),
        values,
    }
}
