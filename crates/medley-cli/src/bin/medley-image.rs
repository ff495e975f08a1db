//! medley-image - Find the images most similar to a query image
//!
//! Usage:
//!   medley-image <dataset_dir> <query>
//!   medley-image --config medley.toml --limit 10 <dataset_dir> <query>

use anyhow::{Context, Result};
use clap::Parser;
use medley_cli::output::print_json_results;
use medley_cli::{init_logging, load_settings};
use medley_core::{ImageRetriever, Retriever, SimilarityMetric};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "medley-image")]
#[command(about = "Rank a directory of images by similarity to a query image", long_about = None)]
struct Args {
    /// Directory of images to index
    dataset_dir: PathBuf,

    /// Query image
    query: PathBuf,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of results
    #[arg(short, long)]
    limit: Option<usize>,

    /// Drop results farther than this distance
    #[arg(long)]
    max_distance: Option<f64>,

    /// Rank by cosine distance instead of euclidean
    #[arg(long)]
    cosine: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = load_settings(args.config.as_deref())?.image;
    if args.cosine {
        config.metric = SimilarityMetric::Cosine;
    }

    let retriever = ImageRetriever::new(config)?;

    let start = std::time::Instant::now();
    retriever
        .fit(&args.dataset_dir)
        .with_context(|| format!("Failed to index {}", args.dataset_dir.display()))?;
    log::info!(
        "Indexed {} images in {:.2}s",
        retriever.len(),
        start.elapsed().as_secs_f64()
    );

    let results = retriever
        .predict(&args.query, args.limit, args.max_distance)
        .with_context(|| format!("Failed to query {}", args.query.display()))?;

    print_json_results(&args.query.display().to_string(), &results);
    Ok(())
}
