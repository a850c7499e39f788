//! CLI interface for the ranked index engine

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ranked_index::{EngineConfig, RankingEngine, Record, Value};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "ranked-index")]
#[command(about = "Ordered index, leaderboard and indexed store over a JSON record file", long_about = None)]
struct Cli {
    /// TOML engine configuration. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON array of records: [{"id": "H1", "attributes": {...}}, ...]
    #[arg(long)]
    records: PathBuf,

    /// Attribute mirrored into the ordered index (overrides the config)
    #[arg(long)]
    index_attribute: Option<String>,

    /// Attribute fed to the leaderboard, lower is better (overrides the config)
    #[arg(long)]
    leaderboard_attribute: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the best leaderboard standings
    Top {
        /// Number of standings to return
        #[arg(short, long, default_value = "5")]
        k: usize,
    },
    /// Show the leaderboard position of an id
    Rank {
        id: String,
    },
    /// List ordered-index entries with min <= metric <= max
    Range {
        min: f64,
        max: f64,
    },
    /// Show the k-th smallest ordered-index entry (1-indexed)
    Kth {
        k: usize,
    },
    /// Find ids whose attribute equals a value
    Find {
        attribute: String,
        /// Parsed as a number when possible, otherwise matched as text
        value: String,
    },
    /// Find ids whose numeric attribute lies in [min, max]
    Between {
        attribute: String,
        min: f64,
        max: f64,
    },
    /// Print a record as JSON
    Get {
        id: String,
    },
    /// Print engine statistics as JSON
    Stats,
}

fn load_records(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let records: Vec<Record> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(records)
}

fn parse_value(raw: &str) -> Value {
    match raw.parse::<f64>() {
        Ok(n) => Value::Number(n),
        Err(_) => Value::Text(raw.to_string()),
    }
}

fn print_ids(mut ids: Vec<String>) {
    if ids.is_empty() {
        println!("No matching records");
        return;
    }
    ids.sort();
    println!("Matching IDs ({} total):", ids.len());
    for id in ids {
        println!("  - {}", id);
    }
}

fn run(engine: &RankingEngine, command: Commands) -> Result<()> {
    match command {
        Commands::Top { k } => {
            let standings = engine.leaderboard().top_k(k);
            if standings.is_empty() {
                println!("Leaderboard is empty");
            } else {
                println!("Top {} standings:", standings.len());
                for (i, entry) in standings.iter().enumerate() {
                    println!("{}. {} ({:.4})", i + 1, entry.id, entry.metric);
                }
            }
        }
        Commands::Rank { id } => match engine.leaderboard().rank(&id) {
            Some(rank) => println!("{} is ranked {} of {}", id, rank, engine.leaderboard().len()),
            None => println!("{} is not on the leaderboard", id),
        },
        Commands::Range { min, max } => {
            let entries = engine.with_index(|idx| idx.range(min, max));
            if entries.is_empty() {
                println!("No entries in [{}, {}]", min, max);
            } else {
                println!("{} entries in [{}, {}]:", entries.len(), min, max);
                for entry in entries {
                    println!("  {} ({:.4})", entry.id, entry.metric);
                }
            }
        }
        Commands::Kth { k } => match engine.with_index(|idx| idx.kth_smallest(k)) {
            Some(entry) => println!("{}. {} ({:.4})", k, entry.id, entry.metric),
            None => println!("No entry at position {}", k),
        },
        Commands::Find { attribute, value } => {
            let ids = engine.store().find_by_attribute(&attribute, parse_value(&value));
            print_ids(ids.into_iter().collect());
        }
        Commands::Between { attribute, min, max } => {
            let ids = engine.store().find_by_attribute_range(&attribute, min, max);
            print_ids(ids.into_iter().collect());
        }
        Commands::Get { id } => match engine.store().get(&id) {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => anyhow::bail!("record {} not found", id),
        },
        Commands::Stats => {
            println!("{}", serde_json::to_string_pretty(&engine.stats())?);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ranked_index=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if cli.index_attribute.is_some() {
        config.index_attribute = cli.index_attribute.clone();
    }
    if cli.leaderboard_attribute.is_some() {
        config.leaderboard_attribute = cli.leaderboard_attribute.clone();
    }

    let engine = RankingEngine::new(config)?;
    let records = load_records(&cli.records)?;
    engine.upsert_bulk(records)?;

    run(&engine, cli.command)
}
