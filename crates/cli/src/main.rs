use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use organiser_core::config;
use organiser_core::config::AppConfig;
use organiser_core::pipeline;
use organiser_core::pipeline::OrganiseOptions;
use std::path::PathBuf;
use storage::labels::LabelStore;

mod console;

use console::ConsoleReviewer;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Organise {
            source,
            dest,
            threshold,
            dry_run,
            retrain,
            json,
        } => run_organise(cfg, source, dest, threshold, dry_run, retrain, json).await,
        Commands::Train => run_train(cfg).await,
        Commands::Distances { source, json } => run_distances(cfg, source, json).await,
        Commands::Labels { command } => run_labels(cfg, command),
    }
}

#[derive(Parser)]
#[command(name = "knn-organiser")]
#[command(about = "Semantic file organiser with human-in-the-loop labelling", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify files and move them into category folders
    Organise {
        /// Directory to organise; defaults to scan.source from config
        #[arg(long)]
        source: Option<PathBuf>,

        /// Destination root; defaults to organise.dest from config
        #[arg(long)]
        dest: Option<PathBuf>,

        /// Confidence threshold (mean neighbour distance); lower is stricter
        #[arg(long)]
        threshold: Option<f32>,

        /// Report what would happen without moving files or writing labels
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Retrain from the label store even if saved artifacts exist
        #[arg(long, default_value_t = false)]
        retrain: bool,

        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Retrain the classifier from the label store and save the model
    Train,
    /// Report each file's nearest training example and distance
    Distances {
        /// Directory to inspect; defaults to scan.source from config
        #[arg(long)]
        source: Option<PathBuf>,

        /// Output JSON rows
        #[arg(long)]
        json: bool,
    },
    /// Inspect or extend the label store
    Labels {
        #[command(subcommand)]
        command: LabelCommands,
    },
}

#[derive(Subcommand)]
enum LabelCommands {
    /// List accumulated and seed examples with their labels
    List,
    /// Append one labelled example to the seed set
    Add {
        /// Example text
        example: String,
        /// Category label
        label: String,
    },
}

async fn run_organise(
    cfg: AppConfig,
    source: Option<PathBuf>,
    dest: Option<PathBuf>,
    threshold: Option<f32>,
    dry_run: bool,
    retrain: bool,
    json: bool,
) -> Result<()> {
    let source = match source.or_else(|| cfg.scan.source.as_ref().map(PathBuf::from)) {
        Some(s) => s,
        None => bail!("no source directory: pass --source or set scan.source in config"),
    };
    if !source.is_dir() {
        bail!("source is not a directory: {}", source.display());
    }
    let opts = OrganiseOptions {
        source,
        dest: dest.unwrap_or_else(|| PathBuf::from(&cfg.organise.dest)),
        threshold: threshold.unwrap_or(cfg.classification.threshold),
        dry_run,
        retrain,
    };

    let registry = pipeline::build_registry(&cfg);
    let mut reviewer = ConsoleReviewer::new();
    let summary = pipeline::run_organise(&cfg, &opts, &registry, &mut reviewer).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "organise: scanned {}, confident {}, reviewed {}, uncategorised {}, moved {}, failed {}{}",
            summary.scanned,
            summary.confident,
            summary.reviewed,
            summary.uncategorised,
            summary.moved,
            summary.failed,
            if summary.dry_run { " (dry run)" } else { "" }
        );
    }
    Ok(())
}

async fn run_train(cfg: AppConfig) -> Result<()> {
    let registry = pipeline::build_registry(&cfg);
    let examples = pipeline::train_model(&cfg, &registry).await?;
    println!("trained on {} labelled examples", examples);
    Ok(())
}

async fn run_distances(cfg: AppConfig, source: Option<PathBuf>, json: bool) -> Result<()> {
    let source = match source.or_else(|| cfg.scan.source.as_ref().map(PathBuf::from)) {
        Some(s) => s,
        None => bail!("no source directory: pass --source or set scan.source in config"),
    };
    if !source.is_dir() {
        bail!("source is not a directory: {}", source.display());
    }

    let registry = pipeline::build_registry(&cfg);
    let rows = pipeline::nearest_report(&cfg, &registry, &source).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in &rows {
            println!(
                "{:.4}  {}  ->  {} ({})",
                row.distance,
                row.file.display(),
                row.label,
                row.example
            );
        }
        println!("{} files", rows.len());
    }
    Ok(())
}

fn run_labels(cfg: AppConfig, command: LabelCommands) -> Result<()> {
    let store = LabelStore::new(&PathBuf::from(&cfg.data.dir));
    match command {
        LabelCommands::List => {
            let training = store.load_or_initialize()?;
            if training.is_empty() {
                println!("label store is empty");
                return Ok(());
            }
            for (example, label) in training.examples.iter().zip(training.labels.iter()) {
                println!("{}  ->  {}", example, label);
            }
            println!(
                "{} examples across {} categories",
                training.len(),
                training.categories().len()
            );
        }
        LabelCommands::Add { example, label } => {
            // Authored examples are seed data; review corrections go to the
            // accumulated store, which takes precedence once it has entries.
            store.append_seed(&example, &label)?;
            println!("added '{}' -> {}", example.trim(), label.trim());
        }
    }
    Ok(())
}
