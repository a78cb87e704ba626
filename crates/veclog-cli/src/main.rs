//! `VeclogDB` CLI - thin shell over the engine.
//!
//! Usage:
//!   `veclog create ./docs.vlog --dimension 512`
//!   `veclog insert ./docs.vlog --id 1 --vector "[0.1, 0.2, 0.3]"`
//!   `veclog search ./docs.vlog --vector "[0.1, 0.2, 0.3]" --top-k 10`

mod vector_arg;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::Table;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use veclog_core::config::DEFAULT_DIMENSION;
use veclog_core::similarity::normalize;
use veclog_core::{DistanceMetric, SearchQuery, Store, StoreConfig, Vector};

#[derive(Parser)]
#[command(name = "veclog")]
#[command(author, version, about = "VeclogDB - embeddable vector database")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// CLI metric option.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum MetricArg {
    #[default]
    Cosine,
    #[value(alias = "dotproduct")]
    Dot,
    #[value(alias = "l2")]
    Euclidean,
}

impl From<MetricArg> for DistanceMetric {
    fn from(m: MetricArg) -> Self {
        match m {
            MetricArg::Cosine => DistanceMetric::Cosine,
            MetricArg::Dot => DistanceMetric::DotProduct,
            MetricArg::Euclidean => DistanceMetric::Euclidean,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new store
    Create {
        /// Path of the store file
        path: PathBuf,

        /// Vector dimension
        #[arg(short, long, default_value_t = DEFAULT_DIMENSION)]
        dimension: usize,

        /// Default similarity metric
        #[arg(short, long, value_enum, default_value_t = MetricArg::Cosine)]
        metric: MetricArg,

        /// Store name (defaults to the file stem)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Insert a vector
    Insert {
        /// Path of the store file
        path: PathBuf,

        /// Vector id
        #[arg(short, long)]
        id: u64,

        /// Vector data, e.g. "[0.1, 0.2, 0.3]" or "0.1,0.2,0.3"
        #[arg(short, long)]
        vector: String,
    },

    /// Fetch a vector by id
    Get {
        /// Path of the store file
        path: PathBuf,

        /// Vector id
        #[arg(short, long)]
        id: u64,
    },

    /// Delete a vector by id
    Delete {
        /// Path of the store file
        path: PathBuf,

        /// Vector id
        #[arg(short, long)]
        id: u64,
    },

    /// Search for the most similar vectors
    Search {
        /// Path of the store file
        path: PathBuf,

        /// Query vector, e.g. "[0.1, 0.2, 0.3]"
        #[arg(short, long)]
        vector: String,

        /// Number of results
        #[arg(short = 'k', long, default_value_t = 10)]
        top_k: usize,

        /// Similarity metric for this query
        #[arg(short, long, value_enum, default_value_t = MetricArg::Cosine)]
        metric: MetricArg,

        /// Minimum score to include (0 disables the filter)
        #[arg(long, default_value_t = 0.0)]
        min_similarity: f32,
    },

    /// Show store statistics
    Stats {
        /// Path of the store file
        path: PathBuf,
    },

    /// Insert random vectors for smoke testing
    Generate {
        /// Path of the store file
        path: PathBuf,

        /// How many vectors to insert
        #[arg(short, long)]
        count: u64,

        /// First id to use
        #[arg(long, default_value_t = 1)]
        start_id: u64,

        /// RNG seed for reproducible data
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Remove a store file
    Drop {
        /// Path of the store file
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Create {
            path,
            dimension,
            metric,
            name,
        } => create(&path, dimension, metric.into(), name),
        Commands::Insert { path, id, vector } => insert(&path, id, &vector),
        Commands::Get { path, id } => get(&path, id),
        Commands::Delete { path, id } => delete(&path, id),
        Commands::Search {
            path,
            vector,
            top_k,
            metric,
            min_similarity,
        } => search(&path, &vector, top_k, metric.into(), min_similarity),
        Commands::Stats { path } => stats(&path),
        Commands::Generate {
            path,
            count,
            start_id,
            seed,
        } => generate(&path, count, start_id, seed),
        Commands::Drop { path } => drop_store(&path),
    }
}

fn create(
    path: &PathBuf,
    dimension: usize,
    metric: DistanceMetric,
    name: Option<String>,
) -> anyhow::Result<()> {
    let name = name.unwrap_or_else(|| {
        path.file_stem()
            .map_or_else(|| "store".to_string(), |s| s.to_string_lossy().into_owned())
    });

    let config = StoreConfig::new(&name, path, dimension, metric);
    let store = Store::create(config).context("failed to create store")?;
    store.close().context("failed to close store")?;

    println!(
        "Created store '{name}' at {} (dimension {dimension}, metric {metric})",
        path.display()
    );
    Ok(())
}

fn insert(path: &PathBuf, id: u64, vector_str: &str) -> anyhow::Result<()> {
    let data = vector_arg::parse(vector_str)?;
    let store = Store::open(path).context("failed to open store")?;
    store.insert(&Vector::new(id, data)).context("insert failed")?;
    store.close()?;

    println!("Inserted vector {id}");
    Ok(())
}

fn get(path: &PathBuf, id: u64) -> anyhow::Result<()> {
    let store = Store::open(path).context("failed to open store")?;
    let vector = store.get(id).context("get failed")?;
    store.close()?;

    println!(
        "id={} dimension={} timestamp={}",
        vector.id,
        vector.dimension(),
        vector.timestamp
    );
    println!("{}", vector_arg::format(&vector.data));
    Ok(())
}

fn delete(path: &PathBuf, id: u64) -> anyhow::Result<()> {
    let store = Store::open(path).context("failed to open store")?;
    store.delete(id).context("delete failed")?;
    store.close()?;

    println!("Deleted vector {id}");
    Ok(())
}

fn search(
    path: &PathBuf,
    vector_str: &str,
    top_k: usize,
    metric: DistanceMetric,
    min_similarity: f32,
) -> anyhow::Result<()> {
    let data = vector_arg::parse(vector_str)?;
    let store = Store::open(path).context("failed to open store")?;

    let query = SearchQuery::new(data, top_k, metric).with_min_similarity(min_similarity);
    let results = store.search(&query).context("search failed")?;
    store.close()?;

    if results.is_empty() {
        println!("No results");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["rank", "id", "score"]);
    for (rank, result) in results.iter().enumerate() {
        table.add_row(vec![
            (rank + 1).to_string(),
            result.id.to_string(),
            format!("{:.6}", result.score),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn stats(path: &PathBuf) -> anyhow::Result<()> {
    let store = Store::open(path).context("failed to open store")?;
    let stats = store.stats().context("stats failed")?;
    store.close()?;

    let mut table = Table::new();
    table.set_header(vec!["field", "value"]);
    table.add_row(vec!["path".to_string(), stats.path.clone()]);
    table.add_row(vec!["live vectors".to_string(), stats.live_count.to_string()]);
    table.add_row(vec!["size (bytes)".to_string(), stats.size_bytes.to_string()]);
    table.add_row(vec!["dimension".to_string(), stats.dimension.to_string()]);
    table.add_row(vec!["metric".to_string(), stats.metric.to_string()]);
    table.add_row(vec![
        "hnsw nodes".to_string(),
        stats.hnsw.node_count.to_string(),
    ]);
    table.add_row(vec![
        "hnsw max level".to_string(),
        stats.hnsw.max_level.to_string(),
    ]);
    table.add_row(vec![
        "distance computations".to_string(),
        stats.hnsw.distance_computations.to_string(),
    ]);
    println!("{table}");
    Ok(())
}

fn generate(path: &PathBuf, count: u64, start_id: u64, seed: Option<u64>) -> anyhow::Result<()> {
    let store = Store::open(path).context("failed to open store")?;
    let dimension = store.config().dimension;
    let metric = store.config().metric;

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let vectors: Vec<Vector> = (0..count)
        .map(|i| {
            let mut data: Vec<f32> = (0..dimension).map(|_| rng.gen_range(-1.0..1.0)).collect();
            if metric == DistanceMetric::Cosine {
                normalize(&mut data);
            }
            Vector::new(start_id + i, data)
        })
        .collect();

    let inserted = store.insert_batch(&vectors).context("generate failed")?;
    store.close()?;

    println!("Inserted {inserted} random vectors starting at id {start_id}");
    Ok(())
}

fn drop_store(path: &PathBuf) -> anyhow::Result<()> {
    if !path.exists() {
        bail!("no store at {}", path.display());
    }
    Store::destroy(path).context("drop failed")?;
    println!("Dropped store at {}", path.display());
    Ok(())
}
