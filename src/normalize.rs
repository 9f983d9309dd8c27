/// Rescales one numeric column.
pub trait Normalizer {
    /// Output may contain NaN where the column cannot be scaled; callers
    /// sanitise it with [`fill_nan`].
    fn normalize(&self, column: &[f64]) -> Vec<f64>;
}

/// Min-max scaling to [0, 1]. A constant column yields NaN (0 / 0).
#[derive(Debug, Clone, Copy, Default)]
pub struct MinMaxNormalizer;

impl Normalizer for MinMaxNormalizer {
    fn normalize(&self, column: &[f64]) -> Vec<f64> {
        let min = column.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = column.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        column.iter().map(|x| (x - min) / range).collect()
    }
}

/// Replace every NaN with `value`. Returns how many cells were replaced.
pub fn fill_nan(column: &mut [f64], value: f64) -> usize {
    let mut replaced = 0;
    for x in column.iter_mut().filter(|x| x.is_nan()) {
        *x = value;
        replaced += 1;
    }
    replaced
}
