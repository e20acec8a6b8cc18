//! CLI command implementations.

use crate::config::AnalysisConfig;
use citegraph_graph::{
    bibliographic_coupling, co_citation, component_stats, damping_sweep, rank, snapshot,
    topic_personalization, BuildOutcome, BuildProgress, CitationGraph, GraphBuilder, GraphKey,
    GraphStore, Personalization, RankError, RankedPaper, RankedPair, SaveOutcome, ScanEvent,
};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Where an analysis graph came from.
enum GraphSource {
    Cache,
    Corpus(BuildProgress),
}

struct LoadedGraph {
    graph: CitationGraph,
    source: GraphSource,
}

/// Write the default config file.
pub fn init(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!(
            "{} Already initialized ({})",
            "✓".green(),
            config_path.display()
        );
        return Ok(());
    }

    AnalysisConfig::default().save(config_path)?;

    println!("{} Wrote {}", "✓".green(), config_path.display());
    println!("  Run {} to build the citation graph", "citegraph build".cyan());
    Ok(())
}

/// Build (or reload) the graph and report on it.
pub fn build(
    config: &AnalysisConfig,
    output: Option<&Path>,
    rebuild: bool,
    json: bool,
) -> Result<()> {
    let started = Instant::now();
    let loaded = match obtain_graph(config, rebuild)? {
        Ok(loaded) => loaded,
        Err(progress) => {
            if json {
                let report = serde_json::json!({
                    "status": "empty",
                    "progress": progress,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{} No papers matched: >= {} citations, years {}-{} ({} lines scanned)",
                    "⚠".yellow(),
                    config.min_citations,
                    config.start_year,
                    config.end_year,
                    progress.lines_scanned
                );
            }
            return Ok(());
        }
    };

    if let Some(path) = output {
        snapshot::save_to_file(&loaded.graph, path)?;
        info!("Snapshot written to {}", path.display());
    }

    let stats = loaded.graph.stats();
    if json {
        let progress = match &loaded.source {
            GraphSource::Cache => None,
            GraphSource::Corpus(progress) => Some(*progress),
        };
        let report = serde_json::json!({
            "status": "built",
            "cached": progress.is_none(),
            "progress": progress,
            "stats": stats,
            "snapshot": output.map(|p| p.display().to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match &loaded.source {
        GraphSource::Cache => println!("{} Loaded cached graph", "✓".green()),
        GraphSource::Corpus(progress) => {
            println!(
                "{} Scanned {} lines from {} files in {}ms",
                "✓".green(),
                progress.lines_scanned.to_string().cyan(),
                config.inputs.len(),
                started.elapsed().as_millis()
            );
            if progress.malformed_lines > 0 {
                println!(
                    "{} Skipped {} malformed lines",
                    "⚠".yellow(),
                    progress.malformed_lines
                );
            }
        }
    }
    println!(
        "  {} {}",
        "Papers:".dimmed(),
        stats.node_count.to_string().cyan()
    );
    println!(
        "  {} {}",
        "Citations:".dimmed(),
        stats.edge_count.to_string().cyan()
    );
    println!("  {} {}", "Uncited papers:".dimmed(), stats.dangling_count);
    println!("  {} {}", "Self-citations:".dimmed(), stats.self_citations);
    if let Some(path) = output {
        println!("{} Snapshot written to {}", "✓".green(), path.display());
    }
    Ok(())
}

/// Node/edge counts and component structure.
pub fn stats(config: &AnalysisConfig, json: bool) -> Result<()> {
    let graph = require_graph(config)?;
    let stats = graph.stats();
    let components = component_stats(&graph);

    if json {
        let report = serde_json::json!({
            "stats": stats,
            "components": components,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Citation Graph".cyan().bold());
    println!();
    println!("  {} {}", "Papers:".dimmed(), stats.node_count);
    println!("  {} {}", "Citations:".dimmed(), stats.edge_count);
    println!("  {} {}", "Uncited papers:".dimmed(), stats.dangling_count);
    println!("  {} {}", "Self-citations:".dimmed(), stats.self_citations);
    println!();
    for (label, summary) in [
        ("Weakly connected", components.weak),
        ("Strongly connected", components.strong),
    ] {
        println!("{}", label.yellow());
        println!("  {} {}", "Components:".dimmed(), summary.count);
        println!(
            "  {} {} papers, {} citations",
            "Largest:".dimmed(),
            summary.largest_nodes,
            summary.largest_edges
        );
    }
    Ok(())
}

/// Top co-cited and bibliographically coupled pairs.
pub fn pairs(config: &AnalysisConfig, top_k: usize, json: bool) -> Result<()> {
    let graph = require_graph(config)?;

    let cocited = co_citation(&graph).ranked(&graph, top_k);
    let coupled = bibliographic_coupling(&graph).ranked(&graph, top_k);

    if json {
        let report = serde_json::json!({
            "co_citation": cocited,
            "bibliographic_coupling": coupled,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_pairs("Most co-cited pairs", &cocited);
    println!();
    print_pairs("Most strongly coupled pairs", &coupled);
    Ok(())
}

/// Uniform PageRank across the configured damping factors.
pub fn pagerank(config: &AnalysisConfig, top_k: usize, json: bool) -> Result<()> {
    let graph = require_graph(config)?;
    let results = damping_sweep(&graph, &config.damping_sweep, &config.pagerank());

    if json {
        let report: Vec<_> = results
            .iter()
            .map(|(damping, result)| {
                serde_json::json!({
                    "damping": damping,
                    "iterations": result.iterations,
                    "converged": result.converged,
                    "top": result.top(&graph, top_k),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for (damping, result) in &results {
        let header = format!("PageRank (damping {:.2})", damping);
        println!("{}", header.cyan().bold());
        if !result.converged {
            println!(
                "  {} stopped after {} iterations without converging",
                "⚠".yellow(),
                result.iterations
            );
        }
        print_papers(&result.top(&graph, top_k));
        println!();
    }
    Ok(())
}

/// Topic-personalized PageRank, one run per topic.
pub fn topic(config: &AnalysisConfig, topics: &[String], top_k: usize, json: bool) -> Result<()> {
    let graph = require_graph(config)?;
    let pagerank = config.pagerank();

    let mut report = Vec::new();
    for topic in topics {
        let personalization = match topic_personalization(&graph, topic) {
            Ok(p) => p,
            Err(RankError::EmptyPersonalization { topic: Some(_) }) => {
                warn!("No titles mention '{}', skipping", topic);
                report.push(serde_json::json!({ "topic": topic, "matches": 0 }));
                if !json {
                    println!("{} No papers mention \"{}\"", "⚠".yellow(), topic);
                    println!();
                }
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let result = rank(&graph, &pagerank, Some(&personalization))?;
        let top = result.top(&graph, top_k);

        if json {
            report.push(serde_json::json!({
                "topic": topic,
                "matches": personalization.len(),
                "iterations": result.iterations,
                "converged": result.converged,
                "top": top,
            }));
        } else {
            print_topic_header(topic, &personalization);
            print_papers(&top);
            println!();
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn print_topic_header(topic: &str, personalization: &Personalization) {
    println!(
        "{} {}",
        format!("Topic \"{}\"", topic).cyan().bold(),
        format!("({} matching papers)", personalization.len()).dimmed()
    );
}

fn print_pairs(heading: &str, pairs: &[RankedPair]) {
    println!("{}", heading.cyan().bold());
    if pairs.is_empty() {
        println!("  {}", "none".dimmed());
        return;
    }
    for (i, pair) in pairs.iter().enumerate() {
        println!(
            "  {:>2}. {} {}",
            i + 1,
            pair.count.to_string().yellow(),
            format!("({} / {})", pair.a, pair.b).dimmed()
        );
        println!("      {}", pair.title_a);
        println!("      {}", pair.title_b);
    }
}

fn print_papers(papers: &[RankedPaper]) {
    for (i, paper) in papers.iter().enumerate() {
        println!(
            "  {:>2}. {} {} {}",
            i + 1,
            format!("{:.6}", paper.score).yellow(),
            paper.title,
            format!("[cited {}]", paper.in_degree).dimmed()
        );
    }
}

/// Loads the graph for an analytic command. An empty result is an error
/// here, since there is nothing to analyze.
fn require_graph(config: &AnalysisConfig) -> Result<CitationGraph> {
    match obtain_graph(config, false)? {
        Ok(loaded) => Ok(loaded.graph),
        Err(progress) => Err(format!(
            "no papers matched the filters ({} lines scanned); nothing to analyze",
            progress.lines_scanned
        )
        .into()),
    }
}

/// Loads the cached graph or builds it from the corpus.
///
/// The inner `Err` carries the build progress when no paper qualified.
fn obtain_graph(
    config: &AnalysisConfig,
    rebuild: bool,
) -> Result<std::result::Result<LoadedGraph, BuildProgress>> {
    let params = config.build_params();
    let key = GraphKey::new(&params, config.inputs.as_slice());

    let store = match GraphStore::open(&config.store_path) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(
                "Graph cache at {} unavailable: {}",
                config.store_path.display(),
                e
            );
            None
        }
    };

    if let (Some(store), false) = (&store, rebuild) {
        match store.load_graph(&key) {
            Ok(Some(graph)) => {
                info!(
                    "Loaded cached graph ({} nodes, {} edges)",
                    graph.node_count(),
                    graph.edge_count()
                );
                return Ok(Ok(LoadedGraph {
                    graph,
                    source: GraphSource::Cache,
                }));
            }
            Ok(None) => {}
            Err(e) => warn!("Cached graph unreadable, rebuilding: {}", e),
        }
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message("Scanning corpus...");

    let observer = spinner.clone();
    let builder = GraphBuilder::new(params).with_observer(move |event: &ScanEvent| {
        let name = event
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| event.file.display().to_string());
        observer.set_message(format!(
            "{}: {} ({} lines, {} found)",
            event.phase, name, event.lines, event.found
        ));
    });

    let outcome = builder.build(config.inputs.as_slice());
    spinner.finish_and_clear();

    let (graph, progress) = match outcome? {
        BuildOutcome::Built { graph, progress } => (graph, progress),
        BuildOutcome::Empty { progress } => return Ok(Err(progress)),
    };

    if let Some(store) = &store {
        if let SaveOutcome::Degraded(_) = store.save_best_effort(&key, &graph) {
            eprintln!(
                "{} Graph could not be cached; it will be rebuilt next run",
                "⚠".yellow()
            );
        }
    }

    Ok(Ok(LoadedGraph {
        graph,
        source: GraphSource::Corpus(progress),
    }))
}
