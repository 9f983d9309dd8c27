use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};

use crate::dataset::{Column, ColumnData, DataSet};
use crate::error::Result;

/// Output of a categorical encoder: a dataset with numeric columns only.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    pub dataset: DataSet,
    /// Source columns that were expanded into indicator or date-part columns.
    pub expanded: Vec<String>,
    /// Source columns with more levels than the cap; their rarest levels were
    /// merged into [`OTHER_LEVEL`] before expansion.
    pub lumped: Vec<String>,
}

/// Level that collects everything beyond the `max_categories` most frequent levels.
pub const OTHER_LEVEL: &str = "OTHER";

/// Turns every non-numeric column into numeric columns.
pub trait CategoricalEncoder {
    fn encode(&self, ds: &DataSet, max_categories: usize) -> Result<Encoded>;
}

/// One-hot encoding. Levels are sorted; the first level is dropped as the
/// redundant indicator when `drop_first` is set. Dates become year, month
/// and day columns. A column with more than `max_categories` levels keeps
/// its most frequent levels (ties by name) and folds the rest into
/// [`OTHER_LEVEL`].
#[derive(Debug, Clone, Copy)]
pub struct OneHotEncoder {
    pub drop_first: bool,
}

impl Default for OneHotEncoder {
    fn default() -> Self {
        Self { drop_first: true }
    }
}

impl OneHotEncoder {
    /// Map every level outside the `max_categories` most frequent ones to [`OTHER_LEVEL`].
    fn lump(values: &[Option<String>], max_categories: usize) -> Option<Vec<Option<String>>> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for v in values.iter().flatten() {
            *counts.entry(v.as_str()).or_default() += 1;
        }
        if counts.len() <= max_categories {
            return None;
        }

        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        let kept: BTreeSet<&str> = ranked.iter().take(max_categories).map(|(l, _)| *l).collect();

        Some(
            values
                .iter()
                .map(|v| {
                    v.as_deref().map(|v| {
                        if kept.contains(v) {
                            v.to_string()
                        } else {
                            OTHER_LEVEL.to_string()
                        }
                    })
                })
                .collect(),
        )
    }

    fn indicators(&self, name: &str, values: &[Option<String>], levels: &BTreeSet<&str>) -> Vec<Column> {
        let skip = usize::from(self.drop_first);
        levels
            .iter()
            .skip(skip)
            .map(|level| {
                let data = values
                    .iter()
                    .map(|v| v.as_deref().map(|v| if v == *level { 1.0 } else { 0.0 }))
                    .collect();
                Column::new(format!("{}_{}", name, level), ColumnData::Numeric(data))
            })
            .collect()
    }
}

impl CategoricalEncoder for OneHotEncoder {
    fn encode(&self, ds: &DataSet, max_categories: usize) -> Result<Encoded> {
        let mut columns = Vec::new();
        let mut expanded = Vec::new();
        let mut lumped = Vec::new();

        for col in &ds.columns {
            match &col.data {
                ColumnData::Numeric(_) => columns.push(col.clone()),
                ColumnData::Date(values) => {
                    let part = |suffix: &str, f: fn(&NaiveDate) -> f64| {
                        Column::new(
                            format!("{}_{}", col.name, suffix),
                            ColumnData::Numeric(values.iter().map(|d| d.as_ref().map(f)).collect()),
                        )
                    };
                    columns.push(part("year", |d: &NaiveDate| d.year() as f64));
                    columns.push(part("month", |d: &NaiveDate| d.month() as f64));
                    columns.push(part("day", |d: &NaiveDate| d.day() as f64));
                    expanded.push(col.name.clone());
                }
                ColumnData::Categorical(values) => {
                    let merged = Self::lump(values, max_categories);
                    if merged.is_some() {
                        lumped.push(col.name.clone());
                    }
                    let values = merged.as_deref().unwrap_or(values);
                    let levels: BTreeSet<&str> = values.iter().flatten().map(String::as_str).collect();
                    columns.extend(self.indicators(&col.name, values, &levels));
                    expanded.push(col.name.clone());
                }
            }
        }

        Ok(Encoded {
            dataset: DataSet::new(columns)?,
            expanded,
            lumped,
        })
    }
}
