//! PageRank over the citation graph.
//!
//! Power iteration with a damping factor and an optional personalization
//! distribution. Each step computes, for every node `v`:
//!
//! ```text
//! new(v) = (1 - d) * t(v) + d * (sum over u -> v of s(u) / out(u) + D * t(v))
//! ```
//!
//! where `t` is the teleport distribution (uniform, or the personalization)
//! and `D` is the total score currently held by dangling nodes. Routing the
//! dangling mass through `t` keeps the scores summing to 1.
//!
//! The damping factor must lie in (0, 1) and the tolerance must be positive.
//! Callers validate these; other values give meaningless scores.

use crate::graph::{title_of, CitationGraph};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Damping factors swept by `damping_sweep` when none are given: 0.15 to 0.95 in steps of 0.1.
pub const DEFAULT_DAMPING_SWEEP: [f64; 9] = [0.15, 0.25, 0.35, 0.45, 0.55, 0.65, 0.75, 0.85, 0.95];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageRankConfig {
    pub damping: f64,
    pub max_iterations: usize,
    /// Convergence threshold on the L1 change between iterations.
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

impl PageRankConfig {
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RankError {
    /// The personalization puts no positive weight on any node of the graph.
    /// `topic` is set when it came from a topic search that matched nothing.
    #[error("{}", describe_empty(.topic))]
    EmptyPersonalization { topic: Option<String> },
}

fn describe_empty(topic: &Option<String>) -> String {
    match topic {
        Some(topic) => format!("no papers found for topic '{}'", topic),
        None => "personalization has no weight on any node in the graph".to_string(),
    }
}

/// Teleport weights per paper id. Weights need not sum to 1; they are
/// normalized over the ids present in the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Personalization {
    weights: HashMap<String, f64>,
}

impl Personalization {
    pub fn new(weights: HashMap<String, f64>) -> Self {
        Self { weights }
    }

    /// Equal weight on each given id.
    pub fn uniform<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            weights: ids.into_iter().map(|id| (id.into(), 1.0)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn weight(&self, id: &str) -> f64 {
        self.weights.get(id).copied().unwrap_or(0.0)
    }

    /// Teleport vector indexed by node. Negative and non-finite weights count as zero.
    fn teleport_vector(&self, graph: &CitationGraph) -> Result<Vec<f64>, RankError> {
        let mut teleport = vec![0.0; graph.node_count()];
        for (id, &weight) in &self.weights {
            if let Some(index) = graph.get_index(id) {
                if weight.is_finite() && weight > 0.0 {
                    teleport[index.index()] += weight;
                }
            }
        }

        let total: f64 = teleport.iter().sum();
        if total <= 0.0 {
            return Err(RankError::EmptyPersonalization { topic: None });
        }
        for value in &mut teleport {
            *value /= total;
        }
        Ok(teleport)
    }
}

/// Uniform personalization over papers whose title contains `topic`, ignoring case.
pub fn topic_personalization(
    graph: &CitationGraph,
    topic: &str,
) -> Result<Personalization, RankError> {
    let matches = graph.search_title(topic);
    if matches.is_empty() {
        return Err(RankError::EmptyPersonalization {
            topic: Some(topic.to_string()),
        });
    }
    Ok(Personalization::uniform(
        matches.into_iter().map(|idx| graph.graph[idx].id.clone()),
    ))
}

/// Scores from one PageRank run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRankResult {
    pub scores: HashMap<String, f64>,
    /// Iterations actually run.
    pub iterations: usize,
    /// Whether the tolerance was reached before the iteration cap.
    pub converged: bool,
}

/// A paper ranked by PageRank, with its in-graph citation count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPaper {
    pub id: String,
    pub title: String,
    pub score: f64,
    pub in_degree: usize,
}

impl PageRankResult {
    pub fn score(&self, id: &str) -> Option<f64> {
        self.scores.get(id).copied()
    }

    /// Sum of all scores; 1 up to rounding for a non-empty graph.
    pub fn total(&self) -> f64 {
        self.scores.values().sum()
    }

    /// The `k` best-scored papers, ties broken by id.
    pub fn top(&self, graph: &CitationGraph, k: usize) -> Vec<RankedPaper> {
        let mut entries: Vec<(&String, f64)> =
            self.scores.iter().map(|(id, &score)| (id, score)).collect();
        entries.sort_by(|(id_a, a), (id_b, b)| b.total_cmp(a).then_with(|| id_a.cmp(id_b)));

        entries
            .into_iter()
            .take(k)
            .map(|(id, score)| {
                let index = graph.get_index(id);
                RankedPaper {
                    id: id.clone(),
                    title: graph
                        .get_by_id(id)
                        .map(|attrs| title_of(attrs).to_string())
                        .unwrap_or_else(|| id.clone()),
                    score,
                    in_degree: index.map(|i| graph.in_degree(i)).unwrap_or(0),
                }
            })
            .collect()
    }
}

/// Runs PageRank, uniform or personalized.
pub fn rank(
    graph: &CitationGraph,
    config: &PageRankConfig,
    personalization: Option<&Personalization>,
) -> Result<PageRankResult, RankError> {
    match personalization {
        Some(p) => {
            let teleport = p.teleport_vector(graph)?;
            Ok(run(graph, config, &teleport))
        }
        None => Ok(rank_uniform(graph, config)),
    }
}

/// Uniform PageRank once per damping factor.
pub fn damping_sweep(
    graph: &CitationGraph,
    dampings: &[f64],
    config: &PageRankConfig,
) -> Vec<(f64, PageRankResult)> {
    dampings
        .iter()
        .map(|&damping| (damping, rank_uniform(graph, &config.with_damping(damping))))
        .collect()
}

fn rank_uniform(graph: &CitationGraph, config: &PageRankConfig) -> PageRankResult {
    let n = graph.node_count();
    run(graph, config, &vec![1.0 / n as f64; n])
}

fn run(graph: &CitationGraph, config: &PageRankConfig, teleport: &[f64]) -> PageRankResult {
    if graph.is_empty() {
        return PageRankResult {
            converged: true,
            ..PageRankResult::default()
        };
    }

    let (scores, iterations, converged) = power_iterate(graph, config, teleport);
    debug!(
        "PageRank d={} finished after {} iterations (converged: {})",
        config.damping, iterations, converged
    );

    PageRankResult {
        scores: graph
            .node_indexes()
            .map(|idx| (graph.graph[idx].id.clone(), scores[idx.index()]))
            .collect(),
        iterations,
        converged,
    }
}

fn power_iterate(
    graph: &CitationGraph,
    config: &PageRankConfig,
    teleport: &[f64],
) -> (Vec<f64>, usize, bool) {
    let n = graph.node_count();
    let damping = config.damping;

    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut out_degree = vec![0usize; n];
    for (source, target) in graph.edge_indexes() {
        incoming[target.index()].push(source.index());
        out_degree[source.index()] += 1;
    }
    let dangling: Vec<usize> = (0..n).filter(|&i| out_degree[i] == 0).collect();

    let mut scores = teleport.to_vec();
    let mut next = vec![0.0; n];
    let mut iterations = 0;

    while iterations < config.max_iterations {
        iterations += 1;

        let dangling_mass: f64 = dangling.iter().map(|&i| scores[i]).sum();
        let previous = &scores;
        next.par_iter_mut().enumerate().for_each(|(v, slot)| {
            let inflow: f64 = incoming[v]
                .iter()
                .map(|&u| previous[u] / out_degree[u] as f64)
                .sum();
            *slot = (1.0 - damping) * teleport[v] + damping * (inflow + dangling_mass * teleport[v]);
        });

        let change: f64 = scores
            .iter()
            .zip(next.iter())
            .map(|(old, new)| (old - new).abs())
            .sum();
        std::mem::swap(&mut scores, &mut next);

        if change < config.tolerance {
            return (scores, iterations, true);
        }
    }

    (scores, iterations, false)
}
