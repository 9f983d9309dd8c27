//! Data handed to an external chart renderer. Nothing here draws.

use std::collections::BTreeMap;

use crate::elbow::ElbowPoint;
use crate::pca::ProjectionBundle;

/// Line-and-point elbow diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct ElbowChart {
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(usize, f64)>,
    /// Y values as thousands-separated text, aligned with `points`.
    pub y_tick_labels: Vec<String>,
}

/// Cumulative variance explained per component, clamped to 0..=100 percent.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreeChart {
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(usize, f64)>,
    pub y_max: f64,
}

/// First two component scores grouped by cluster label.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterChart {
    pub x_label: String,
    pub y_label: String,
    pub groups: BTreeMap<usize, Vec<(f64, f64)>>,
}

/// `1234567.8` -> `"1,234,568"`.
pub fn format_thousands(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let rounded = value.round();
    let digits = format!("{}", rounded.abs() as u128);
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn elbow_chart(curve: &[ElbowPoint]) -> ElbowChart {
    ElbowChart {
        x_label: "Number of clusters".to_string(),
        y_label: "Total within-cluster sum of squares".to_string(),
        points: curve.iter().map(|p| (p.count, p.wss)).collect(),
        y_tick_labels: curve.iter().map(|p| format_thousands(p.wss)).collect(),
    }
}

pub fn scree_chart(bundle: &ProjectionBundle) -> ScreeChart {
    ScreeChart {
        x_label: "Principal component".to_string(),
        y_label: "Cumulative variance explained (%)".to_string(),
        points: bundle
            .cumulative
            .iter()
            .enumerate()
            .map(|(i, &v)| (i + 1, v.clamp(0.0, 100.0)))
            .collect(),
        y_max: 100.0,
    }
}

/// PC1 against PC2; PC2 is zero when only one component was retained.
pub fn scatter_chart(bundle: &ProjectionBundle) -> ScatterChart {
    let scores = &bundle.scored.scores;
    let label = |j: usize| match bundle.variance_explained.get(j) {
        Some(v) => format!("PC{} ({:.2}%)", j + 1, v),
        None => format!("PC{}", j + 1),
    };

    let mut groups: BTreeMap<usize, Vec<(f64, f64)>> = BTreeMap::new();
    for (row, &cluster) in bundle.scored.labels.iter().enumerate() {
        let x = scores[[row, 0]];
        let y = if scores.ncols() > 1 { scores[[row, 1]] } else { 0.0 };
        groups.entry(cluster).or_default().push((x, y));
    }

    ScatterChart {
        x_label: label(0),
        y_label: label(1),
        groups,
    }
}
