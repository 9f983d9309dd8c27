//main.rs
use anyhow::anyhow;
use clap::Parser;
use kmeans_pipeline::charts::elbow_chart;
use kmeans_pipeline::config::{DEFAULT_LIMIT, DEFAULT_SEED};
use kmeans_pipeline::{DataSet, Pipeline, PipelineConfig};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[clap(version = "0.3.0", author = "Stefan L. <stefan.lang@med.lu.se>")]
struct Opts {
    /// Input table with a header line
    #[clap(short, long)]
    file: String,

    /// Field delimiter of the input
    #[clap(short, long, default_value = "\t")]
    delimiter: char,

    /// Number of clusters; leave out to only print the elbow curve
    #[clap(short, long)]
    k: Option<usize>,

    /// Elbow curve covers 1..=limit clusters
    #[clap(short, long, default_value_t = DEFAULT_LIMIT)]
    limit: usize,

    #[clap(short, long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Columns kept out of clustering, comma separated
    #[clap(short, long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Remove rows with missing values instead of failing
    #[clap(long)]
    drop_na: bool,

    /// Drop non-numeric columns instead of one-hot encoding them
    #[clap(long)]
    no_encode: bool,

    /// Keep the original scale of the columns
    #[clap(long)]
    no_normalize: bool,

    /// Labeled table (TSV)
    #[clap(short, long)]
    outfile: Option<String>,

    /// Cluster profile (TSV)
    #[clap(long)]
    profile_out: Option<String>,

    /// Principal component scores (TSV)
    #[clap(long)]
    pca_out: Option<String>,
}

fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();

    if !opts.delimiter.is_ascii() {
        return Err(anyhow!("delimiter must be a single ASCII character"));
    }
    let ds = DataSet::from_path(&opts.file, opts.delimiter as u8)?;
    println!("Loaded {} rows × {} columns", ds.nrows(), ds.ncols());

    let config = PipelineConfig::default()
        .with_k(opts.k)
        .with_limit(opts.limit)
        .with_seed(opts.seed)
        .with_exclude(opts.exclude)
        .with_drop_na(opts.drop_na)
        .with_encode_categorical(!opts.no_encode)
        .with_normalize(!opts.no_normalize);

    let out = Pipeline::new(config).run(&ds)?;

    let chart = elbow_chart(&out.elbow);
    println!("clusters\twss");
    for ((count, _), label) in chart.points.iter().zip(&chart.y_tick_labels) {
        println!("{}\t{}", count, label);
    }

    let Some(clustering) = out.clustering else {
        return Ok(());
    };

    println!(
        "Assigned {} points into {} clusters (sizes {:?})",
        clustering.fit.labels.len(),
        clustering.k,
        clustering.fit.sizes
    );
    for (pc, pct) in clustering.projection.variance_explained.iter().enumerate() {
        println!("PC{}\t{:.4}%", pc + 1, pct);
    }

    if let Some(path) = &opts.outfile {
        clustering.labeled.to_tsv(path)?;
    }
    if let Some(path) = &opts.profile_out {
        clustering.profile.to_dataset()?.to_tsv(path)?;
    }
    if let Some(path) = &opts.pca_out {
        clustering.projection.scored.to_dataset()?.to_tsv(path)?;
    }

    Ok(())
}
