//! medley-audio - Find the songs whose melody best matches a query
//!
//! Usage:
//!   medley-audio <dataset_dir> <query>
//!   medley-audio --threshold 0.7 --limit 5 <dataset_dir> <query>
//!   medley-audio --notes <query>    # Print the transcribed note sequence only

use anyhow::{Context, Result};
use clap::Parser;
use medley_cli::output::print_json_results;
use medley_cli::{init_logging, load_settings};
use medley_core::{transcribe_notes, AudioRetriever, Retriever};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "medley-audio")]
#[command(about = "Rank a directory of audio and MIDI files by melodic similarity", long_about = None)]
struct Args {
    /// Directory of audio and MIDI files to index (omit with --notes)
    #[arg(required_unless_present = "notes")]
    dataset_dir: Option<PathBuf>,

    /// Query audio or MIDI file
    query: Option<PathBuf>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of results
    #[arg(short, long)]
    limit: Option<usize>,

    /// Minimum cosine similarity for a result
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Transcribe the given file and print its notes as JSON
    #[arg(long, value_name = "FILE", conflicts_with_all = ["dataset_dir", "query"])]
    notes: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_settings(args.config.as_deref())?.audio;

    if let Some(path) = &args.notes {
        let notes = transcribe_notes(path, &config)
            .with_context(|| format!("Failed to transcribe {}", path.display()))?;
        println!("{}", serde_json::to_string(&notes)?);
        return Ok(());
    }

    let (Some(dataset_dir), Some(query)) = (&args.dataset_dir, &args.query) else {
        anyhow::bail!("Both <DATASET_DIR> and <QUERY> are required");
    };

    let retriever = AudioRetriever::new(config)?;

    let start = std::time::Instant::now();
    retriever
        .fit(dataset_dir)
        .with_context(|| format!("Failed to index {}", dataset_dir.display()))?;
    log::info!(
        "Indexed {} files in {:.2}s",
        retriever.len(),
        start.elapsed().as_secs_f64()
    );

    let results = retriever
        .predict(query, args.limit, args.threshold)
        .with_context(|| format!("Failed to query {}", query.display()))?;

    print_json_results(&query.display().to_string(), &results);
    Ok(())
}
