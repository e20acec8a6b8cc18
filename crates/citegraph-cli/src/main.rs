//! Citegraph CLI - Command-line interface for Citegraph
//!
//! Builds the citation graph from the configured corpus files and runs the
//! pair, component and PageRank analyses over it.

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use config::{AnalysisConfig, ConfigError, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "citegraph")]
#[command(author = "Citegraph Contributors")]
#[command(version)]
#[command(about = "Citation graph analysis for bibliographic corpora", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to read
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the corpus and paper filters.
#[derive(Args)]
struct CorpusArgs {
    /// Corpus file (repeatable); replaces the configured inputs
    #[arg(short, long = "input")]
    inputs: Vec<PathBuf>,

    /// Minimum citation count for a paper to qualify
    #[arg(long)]
    min_citations: Option<i64>,

    /// First publication year (inclusive)
    #[arg(long)]
    start_year: Option<i64>,

    /// Last publication year (inclusive)
    #[arg(long)]
    end_year: Option<i64>,

    /// Graph cache directory
    #[arg(long)]
    store: Option<PathBuf>,
}

impl CorpusArgs {
    fn apply(self, config: &mut AnalysisConfig) {
        if !self.inputs.is_empty() {
            config.inputs = self.inputs;
        }
        if let Some(min) = self.min_citations {
            config.min_citations = min;
        }
        if let Some(year) = self.start_year {
            config.start_year = year;
        }
        if let Some(year) = self.end_year {
            config.end_year = year;
        }
        if let Some(store) = self.store {
            config.store_path = store;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init,

    /// Build the citation graph and cache it
    Build {
        #[command(flatten)]
        corpus: CorpusArgs,

        /// Also write a snapshot file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Ignore the cached graph
        #[arg(long)]
        rebuild: bool,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Show graph size and component statistics
    Stats {
        #[command(flatten)]
        corpus: CorpusArgs,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Show the most co-cited and most coupled paper pairs
    Pairs {
        #[command(flatten)]
        corpus: CorpusArgs,

        /// Number of pairs to show
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Rank papers with PageRank across damping factors
    Pagerank {
        #[command(flatten)]
        corpus: CorpusArgs,

        /// Damping factor (repeatable); replaces the configured sweep
        #[arg(short, long = "damping")]
        damping: Vec<f64>,

        /// Number of papers to show per run
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Rank papers with PageRank personalized to title topics
    Topic {
        /// Topics to rank for (defaults to the configured topics)
        topics: Vec<String>,

        #[command(flatten)]
        corpus: CorpusArgs,

        /// Damping factor
        #[arg(short, long)]
        damping: Option<f64>,

        /// Number of papers to show per topic
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = cli.config;

    match cli.command {
        Commands::Init => commands::init(&config_path),
        Commands::Build {
            corpus,
            output,
            rebuild,
            json,
        } => {
            let config = load_config(&config_path, corpus)?;
            config.validate()?;
            commands::build(&config, output.as_deref(), rebuild, json)
        }
        Commands::Stats { corpus, json } => {
            let config = load_config(&config_path, corpus)?;
            config.validate()?;
            commands::stats(&config, json)
        }
        Commands::Pairs {
            corpus,
            top_k,
            json,
        } => {
            let config = load_config(&config_path, corpus)?;
            config.validate()?;
            commands::pairs(&config, top_k.unwrap_or(config.top_k), json)
        }
        Commands::Pagerank {
            corpus,
            damping,
            top_k,
            json,
        } => {
            let mut config = load_config(&config_path, corpus)?;
            if !damping.is_empty() {
                config.damping_sweep = damping;
            }
            config.validate()?;
            commands::pagerank(&config, top_k.unwrap_or(config.top_k), json)
        }
        Commands::Topic {
            topics,
            corpus,
            damping,
            top_k,
            json,
        } => {
            let mut config = load_config(&config_path, corpus)?;
            if let Some(d) = damping {
                config.damping = d;
            }
            config.validate()?;
            let topics = if topics.is_empty() {
                config.topics.clone()
            } else {
                topics
            };
            commands::topic(&config, &topics, top_k.unwrap_or(config.top_k), json)
        }
    }
}

/// Reads the config file, then layers command-line overrides on top.
fn load_config(path: &Path, corpus: CorpusArgs) -> Result<AnalysisConfig, ConfigError> {
    let mut config = AnalysisConfig::load(path)?;
    corpus.apply(&mut config);
    Ok(config)
}
