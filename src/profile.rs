use std::collections::BTreeMap;

use crate::dataset::{Column, DataSet};
use crate::error::Result;
use crate::table::{labels_of, LABEL_COLUMN};

/// Per-cluster means of every numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterProfile {
    /// Numeric columns summarised, in dataset order (label column left out).
    pub columns: Vec<String>,
    /// One row per label, ascending.
    pub rows: Vec<ProfileRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRow {
    pub label: usize,
    pub size: usize,
    pub means: Vec<f64>,
}

impl ClusterProfile {
    pub fn total_size(&self) -> usize {
        self.rows.iter().map(|r| r.size).sum()
    }

    pub fn mean(&self, label: usize, column: &str) -> Option<f64> {
        let j = self.columns.iter().position(|c| c == column)?;
        self.rows.iter().find(|r| r.label == label).map(|r| r.means[j])
    }

    /// Name of the size column: `size`, or `size_2`, `size_3`, ... when a
    /// feature already uses it.
    pub fn size_column(&self) -> String {
        let taken = |n: &str| self.columns.iter().any(|c| c == n);
        let mut name = "size".to_string();
        let mut i = 2;
        while taken(&name) {
            name = format!("size_{}", i);
            i += 1;
        }
        name
    }

    /// As a DataSet: label, size, then one column of means per feature.
    pub fn to_dataset(&self) -> Result<DataSet> {
        let mut columns = vec![
            Column::numeric(LABEL_COLUMN, self.rows.iter().map(|r| r.label as f64).collect()),
            Column::numeric(
                self.size_column(),
                self.rows.iter().map(|r| r.size as f64).collect(),
            ),
        ];
        for (j, name) in self.columns.iter().enumerate() {
            columns.push(Column::numeric(
                name.clone(),
                self.rows.iter().map(|r| r.means[j]).collect(),
            ));
        }
        DataSet::new(columns)
    }
}

/// Group a labeled dataset by its label column and average every numeric column.
pub fn profile(labeled: &DataSet) -> Result<ClusterProfile> {
    let labels = labels_of(labeled)?;

    let features: Vec<(String, Vec<f64>)> = labeled
        .columns
        .iter()
        .filter(|c| c.name != LABEL_COLUMN)
        .filter_map(|c| c.numeric_values().map(|v| (c.name.clone(), v)))
        .collect();

    let mut groups: BTreeMap<usize, (usize, Vec<f64>)> = BTreeMap::new();
    for (row, &label) in labels.iter().enumerate() {
        let (size, sums) = groups
            .entry(label)
            .or_insert_with(|| (0, vec![0.0; features.len()]));
        *size += 1;
        for (sum, (_, values)) in sums.iter_mut().zip(&features) {
            *sum += values[row];
        }
    }

    let rows = groups
        .into_iter()
        .map(|(label, (size, sums))| ProfileRow {
            label,
            size,
            means: sums.into_iter().map(|s| s / size as f64).collect(),
        })
        .collect();

    Ok(ClusterProfile {
        columns: features.into_iter().map(|(n, _)| n).collect(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::label_column;

    #[test]
    fn test_profile_means() {
        let ds = DataSet::new(vec![
            Column::categorical("id", vec!["a", "b", "c", "d", "e"]),
            Column::numeric("x", vec![1.0, 3.0, 10.0, 20.0, 30.0]),
            label_column(&[2, 2, 1, 1, 1]),
        ])
        .unwrap();
        let p = profile(&ds).unwrap();
        assert_eq!(p.columns, vec!["x"]);
        assert_eq!(p.rows.iter().map(|r| r.label).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(p.rows[0].size, 3);
        assert_eq!(p.mean(1, "x"), Some(20.0));
        assert_eq!(p.mean(2, "x"), Some(2.0));
        assert_eq!(p.total_size(), 5);

        let table = p.to_dataset().unwrap();
        assert_eq!(table.names(), vec!["cluster", "size", "x"]);
    }

    #[test]
    fn test_size_feature_does_not_clash() {
        let ds = DataSet::new(vec![
            Column::numeric("size", vec![1.5, 2.5, 4.0]),
            Column::numeric("size_2", vec![0.0, 1.0, 1.0]),
            label_column(&[1, 1, 2]),
        ])
        .unwrap();
        let p = profile(&ds).unwrap();
        assert_eq!(p.size_column(), "size_3");
        let table = p.to_dataset().unwrap();
        assert_eq!(table.names(), vec!["cluster", "size_3", "size", "size_2"]);
        assert_eq!(table.column("size_3").unwrap().numeric_values().unwrap(), vec![2.0, 1.0]);
        assert_eq!(table.column("size").unwrap().numeric_values().unwrap(), vec![2.0, 4.0]);
    }

    #[test]
    fn test_missing_label_column() {
        let ds = DataSet::new(vec![Column::numeric("x", vec![1.0])]).unwrap();
        assert!(profile(&ds).is_err());
    }
}
