use approx::assert_abs_diff_eq;
use kmeans_pipeline::stats::variance;
use kmeans_pipeline::{
    Column, ColumnData, DataSet, Pipeline, PipelineConfig, PipelineError, Preprocessor, LABEL_COLUMN,
};
use ndarray::Array1;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// 150 rows, 4 numeric columns, three groups of 50 around distinct centers.
fn three_blobs() -> DataSet {
    let centers = [
        [5.0, 3.4, 1.5, 0.2],
        [5.9, 2.8, 4.3, 1.3],
        [6.6, 3.0, 5.6, 2.0],
    ];
    let names = ["sepal_length", "sepal_width", "petal_length", "petal_width"];
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let mut cols: Vec<Vec<f64>> = vec![Vec::new(); 4];
    for center in &centers {
        for _ in 0..50 {
            for (j, col) in cols.iter_mut().enumerate() {
                col.push(center[j] + rng.gen_range(-0.3..0.3));
            }
        }
    }
    DataSet::new(
        names
            .iter()
            .zip(cols)
            .map(|(n, v)| Column::numeric(*n, v))
            .collect(),
    )
    .unwrap()
}

#[test]
fn test_iris_like_scenario() {
    let ds = three_blobs();
    let config = PipelineConfig::new(3)
        .with_limit(10)
        .with_seed(123)
        .with_normalize(false);
    let out = Pipeline::new(config).run(&ds).unwrap();

    assert_eq!(out.elbow.len(), 10);
    let expected: f64 = ds
        .columns
        .iter()
        .map(|c| variance(Array1::from(c.numeric_values().unwrap()).view()))
        .sum::<f64>()
        * 149.0;
    assert_abs_diff_eq!(out.elbow[0].wss, expected, epsilon = 1e-6);
    assert!(out.elbow[0].wss >= out.elbow[1].wss);

    let c = out.clustering.unwrap();
    let mut labels = c.fit.labels.clone();
    labels.sort_unstable();
    labels.dedup();
    assert_eq!(labels, vec![1, 2, 3]);
    assert_eq!(c.fit.centers.nrows(), 3);

    assert_eq!(c.profile.rows.len(), 3);
    assert_eq!(c.profile.total_size(), 150);
    // well separated groups come back whole
    assert!(c.profile.rows.iter().all(|r| r.size == 50));

    let pct = &c.projection.variance_explained;
    assert!(pct.len() <= 4);
    assert!(pct.iter().all(|&v| pct[0] >= v));
    assert_abs_diff_eq!(pct.iter().sum::<f64>(), 100.0, epsilon = 1e-3);
    assert_eq!(c.projection.scored.scores.nrows(), 150);
}

#[test]
fn test_fit_is_deterministic() {
    let ds = three_blobs();
    let config = PipelineConfig::new(4).with_limit(5).with_seed(7);
    let a = Pipeline::new(config.clone()).run(&ds).unwrap();
    let b = Pipeline::new(config).run(&ds).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_categorical_expansion() {
    let mut ds = three_blobs();
    let species: Vec<&str> = (0..150)
        .map(|i| ["setosa", "versicolor", "virginica"][i / 50])
        .collect();
    ds.columns.push(Column::categorical("species", species));

    let config = PipelineConfig::default().with_normalize(false);
    let prepared = Preprocessor::from_config(&config).prepare(&ds).unwrap();
    assert_eq!(prepared.numeric.ncols(), 4 + 2);
    assert!(!prepared.numeric.headers.iter().any(|h| h == "species"));
    assert!(prepared.numeric.headers.iter().any(|h| h == "species_versicolor"));
    assert!(prepared.numeric.headers.iter().any(|h| h == "species_virginica"));
}

#[test]
fn test_excluded_columns_lead_in_original_order() {
    let ds = three_blobs();
    let mut columns = vec![Column::categorical(
        "sample",
        (0..150).map(|i| format!("s{}", i)).collect(),
    )];
    columns.extend(ds.columns.iter().take(2).cloned());
    columns.push(Column::numeric("batch", (0..150).map(|i| (i % 5) as f64).collect()));
    columns.extend(ds.columns.iter().skip(2).cloned());
    let ds = DataSet::new(columns).unwrap();

    let config = PipelineConfig::new(3)
        .with_limit(3)
        .with_exclude(["batch", "sample"]);
    let c = Pipeline::new(config).run(&ds).unwrap().clustering.unwrap();

    assert_eq!(
        c.labeled.names(),
        vec![
            "sample",
            "batch",
            "sepal_length",
            "sepal_width",
            "petal_length",
            "petal_width",
            LABEL_COLUMN
        ]
    );
    // excluded columns are carried as-is
    assert_eq!(c.labeled.columns[1], ds.columns[3]);
    assert!(!c.correlation.names.iter().any(|n| n == "batch"));
    assert!(c.profile.columns.iter().any(|n| n == "batch"));
}

#[test]
fn test_drop_na_row_count() {
    let mut ds = three_blobs();
    if let ColumnData::Numeric(values) = &mut ds.columns[2].data {
        values[3] = None;
        values[77] = None;
    }
    if let ColumnData::Numeric(values) = &mut ds.columns[0].data {
        values[77] = None;
        values[140] = None;
    }

    let strict = Pipeline::new(PipelineConfig::new(3).with_limit(3)).run(&ds);
    assert!(matches!(strict, Err(PipelineError::Validation(_))));

    let config = PipelineConfig::new(3).with_limit(3).with_drop_na(true);
    let out = Pipeline::new(config).run(&ds).unwrap();
    assert_eq!(out.prepared.numeric.nrows(), 147);
    assert!(!out.prepared.numeric.has_missing());
    assert_eq!(out.prepared.removed_rows, vec![3, 77, 140]);
}

#[test]
fn test_limit_above_rows_fails() {
    let ds = DataSet::new(vec![Column::numeric("x", vec![1.0, 2.0, 3.0])]).unwrap();
    let err = Pipeline::new(PipelineConfig::default()).run(&ds).unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));
}

#[test]
fn test_from_text() {
    let text = "id,colour,a,b\n\
                p1,red,1.0,1.1\n\
                p2,red,1.2,0.9\n\
                p3,blue,8.0,8.2\n\
                p4,blue,8.1,7.9\n\
                p5,NA,4.0,4.0\n";
    let ds = DataSet::from_reader(text.as_bytes(), b',').unwrap();
    let config = PipelineConfig::new(2)
        .with_limit(3)
        .with_drop_na(true)
        .with_exclude(["id"]);
    let c = Pipeline::new(config).run(&ds).unwrap().clustering.unwrap();
    assert_eq!(c.labeled.nrows(), 4);
    assert_eq!(c.labeled.names(), vec!["id", "colour_red", "a", "b", "cluster"]);
    let labels = &c.fit.labels;
    assert_eq!(labels[0], labels[1]);
    assert_eq!(labels[2], labels[3]);
    assert_ne!(labels[0], labels[2]);
}

#[test]
fn test_many_level_column_is_kept() {
    let shops = ["s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9"];
    let ds = DataSet::new(vec![
        Column::numeric("x", (0..20).map(f64::from).collect()),
        Column::categorical("shop", (0..20).map(|i| shops[i % 10]).collect()),
    ])
    .unwrap();
    let prepared = Preprocessor::from_config(&PipelineConfig::default())
        .prepare(&ds)
        .unwrap();
    // s0..s7 kept, s8 and s9 merged; OTHER sorts first and is the reference
    assert_eq!(prepared.numeric.ncols(), 1 + 8);
    assert!(prepared.numeric.headers.iter().any(|h| h == "shop_s7"));
    assert!(!prepared.numeric.headers.iter().any(|h| h == "shop_s8"));
}

#[test]
fn test_labeled_output_cannot_be_clustered_again() {
    let ds = three_blobs();
    let config = PipelineConfig::new(2).with_limit(3);
    let labeled = Pipeline::new(config.clone())
        .run(&ds)
        .unwrap()
        .clustering
        .unwrap()
        .labeled;
    let err = Pipeline::new(config).run(&labeled).unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(ref m) if m.contains(LABEL_COLUMN)));
}
