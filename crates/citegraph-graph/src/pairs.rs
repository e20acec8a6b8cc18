//! Co-citation and bibliographic-coupling pair counts.
//!
//! Both measures count, for an unordered pair of papers, how many times the
//! pair shows up together in one node's neighbor list:
//! - co-citation uses each paper's references (two papers cited together)
//! - bibliographic coupling uses each paper's citers (two papers sharing a reference)
//!
//! Nodes are processed in parallel. Each worker keeps its own counts plus
//! the position where it first saw every pair; merging sums the counts and
//! keeps the earliest position, which reproduces a sequential scan exactly.

use crate::graph::{title_of, CitationGraph, NodeId};
use petgraph::Direction;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of pairs reported when the caller does not choose.
pub const DEFAULT_TOP_K: usize = 10;

/// Which relationship a set of counts measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairKind {
    /// Papers cited together by the same paper.
    CoCitation,
    /// Papers citing the same paper.
    BibliographicCoupling,
}

impl PairKind {
    fn direction(self) -> Direction {
        match self {
            PairKind::CoCitation => Direction::Outgoing,
            PairKind::BibliographicCoupling => Direction::Incoming,
        }
    }
}

impl std::fmt::Display for PairKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CoCitation => "co-citation",
            Self::BibliographicCoupling => "bibliographic coupling",
        };
        write!(f, "{}", s)
    }
}

/// An unordered pair of distinct papers, stored with `a < b`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PaperPair {
    pub a: String,
    pub b: String,
}

impl PaperPair {
    /// Orders the two ids. Returns None when they are the same paper.
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Option<Self> {
        let (x, y) = (x.into(), y.into());
        match x.cmp(&y) {
            std::cmp::Ordering::Less => Some(Self { a: x, b: y }),
            std::cmp::Ordering::Greater => Some(Self { a: y, b: x }),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// A pair with its count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairScore {
    pub pair: PaperPair,
    pub count: u64,
}

/// A pair resolved against the graph for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPair {
    pub a: String,
    pub b: String,
    pub count: u64,
    pub title_a: String,
    pub title_b: String,
}

/// Pair counts ranked by count descending, ties in discovery order.
#[derive(Debug, Clone, Default)]
pub struct PairCounts {
    kind: Option<PairKind>,
    ranked: Vec<PairScore>,
    index: HashMap<PaperPair, usize>,
}

/// Where a pair was first generated: (node position, i, j).
type Discovery = (usize, usize, usize);

type Tally = HashMap<(NodeId, NodeId), (u64, Discovery)>;

impl PairCounts {
    pub fn kind(&self) -> Option<PairKind> {
        self.kind
    }

    /// Number of distinct pairs with a non-zero count.
    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// Count for a pair, in either order. Zero if never seen.
    pub fn get(&self, x: &str, y: &str) -> u64 {
        PaperPair::new(x, y)
            .and_then(|pair| self.index.get(&pair))
            .map(|&i| self.ranked[i].count)
            .unwrap_or(0)
    }

    /// All pairs in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &PairScore> {
        self.ranked.iter()
    }

    /// The `k` highest-ranked pairs.
    pub fn top_k(&self, k: usize) -> &[PairScore] {
        &self.ranked[..k.min(self.ranked.len())]
    }

    /// The `k` highest-ranked pairs with titles resolved from the graph.
    pub fn ranked(&self, graph: &CitationGraph, k: usize) -> Vec<RankedPair> {
        let resolve = |id: &str| {
            graph
                .get_by_id(id)
                .map(|attrs| title_of(attrs).to_string())
                .unwrap_or_else(|| id.to_string())
        };

        self.top_k(k)
            .iter()
            .map(|score| RankedPair {
                a: score.pair.a.clone(),
                b: score.pair.b.clone(),
                count: score.count,
                title_a: resolve(&score.pair.a),
                title_b: resolve(&score.pair.b),
            })
            .collect()
    }

    fn from_tally(kind: PairKind, graph: &CitationGraph, tally: Tally) -> Self {
        let mut entries: Vec<_> = tally.into_iter().collect();
        entries.sort_by(|(_, (count_a, seen_a)), (_, (count_b, seen_b))| {
            count_b.cmp(count_a).then_with(|| seen_a.cmp(seen_b))
        });

        let mut ranked = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());
        for ((a, b), (count, _)) in entries {
            let pair = PaperPair {
                a: graph.graph[a].id.clone(),
                b: graph.graph[b].id.clone(),
            };
            index.insert(pair.clone(), ranked.len());
            ranked.push(PairScore { pair, count });
        }

        Self {
            kind: Some(kind),
            ranked,
            index,
        }
    }
}

/// Counts how many papers cite both members of each pair.
pub fn co_citation(graph: &CitationGraph) -> PairCounts {
    count_pairs(graph, PairKind::CoCitation)
}

/// Counts how many references each pair of papers shares.
pub fn bibliographic_coupling(graph: &CitationGraph) -> PairCounts {
    count_pairs(graph, PairKind::BibliographicCoupling)
}

/// Counts pairs among the distinct neighbors of every node.
pub fn count_pairs(graph: &CitationGraph, kind: PairKind) -> PairCounts {
    let direction = kind.direction();
    let nodes: Vec<NodeId> = graph.node_indexes().collect();

    let tally = nodes
        .par_iter()
        .enumerate()
        .fold(Tally::new, |mut tally, (position, &node)| {
            let mut neighbors: Vec<NodeId> =
                graph.graph.neighbors_directed(node, direction).collect();
            if neighbors.len() < 2 {
                return tally;
            }
            neighbors.sort_by(|x, y| graph.graph[*x].id.cmp(&graph.graph[*y].id));
            neighbors.dedup();

            for i in 0..neighbors.len() {
                for j in (i + 1)..neighbors.len() {
                    let entry = tally
                        .entry((neighbors[i], neighbors[j]))
                        .or_insert((0, (position, i, j)));
                    entry.0 += 1;
                }
            }
            tally
        })
        .reduce(Tally::new, merge_tallies);

    PairCounts::from_tally(kind, graph, tally)
}

fn merge_tallies(mut left: Tally, right: Tally) -> Tally {
    if left.len() < right.len() {
        return merge_tallies(right, left);
    }
    for (pair, (count, seen)) in right {
        let entry = left.entry(pair).or_insert((0, seen));
        entry.0 += count;
        entry.1 = entry.1.min(seen);
    }
    left
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeAttributes;

    fn graph_from(ids: &[&str], edges: &[(&str, &str)]) -> CitationGraph {
        let mut graph = CitationGraph::new();
        for id in ids {
            graph.add_node(NodeAttributes::new(*id, Some(format!("Title {}", id))));
        }
        for (from, to) in edges {
            graph.add_citation(from, to);
        }
        graph
    }

    #[test]
    fn test_pair_ordering() {
        let pair = PaperPair::new("z", "a").unwrap();
        assert_eq!(pair.a, "a");
        assert_eq!(pair.b, "z");
        assert!(PaperPair::new("a", "a").is_none());
    }

    #[test]
    fn test_three_paper_scenario() {
        // A cites B and C, B cites C.
        let graph = graph_from(&["A", "B", "C"], &[("A", "B"), ("A", "C"), ("B", "C")]);

        let cocite = co_citation(&graph);
        assert_eq!(cocite.get("B", "C"), 1);
        assert_eq!(cocite.get("C", "B"), 1);
        assert_eq!(cocite.len(), 1);

        let coupling = bibliographic_coupling(&graph);
        assert_eq!(coupling.get("A", "B"), 1);
        assert_eq!(coupling.len(), 1);
    }

    #[test]
    fn test_counts_accumulate_across_citers() {
        // Three papers each cite both x and y; one also cites z.
        let graph = graph_from(
            &["p1", "p2", "p3", "x", "y", "z"],
            &[
                ("p1", "x"),
                ("p1", "y"),
                ("p2", "x"),
                ("p2", "y"),
                ("p3", "x"),
                ("p3", "y"),
                ("p3", "z"),
            ],
        );

        let cocite = co_citation(&graph);
        assert_eq!(cocite.get("x", "y"), 3);
        assert_eq!(cocite.get("x", "z"), 1);
        assert_eq!(cocite.get("y", "z"), 1);

        let top = cocite.top_k(1);
        assert_eq!(top[0].pair, PaperPair::new("x", "y").unwrap());
        assert_eq!(top[0].count, 3);

        let coupling = bibliographic_coupling(&graph);
        assert_eq!(coupling.get("p1", "p2"), 2);
        assert_eq!(coupling.get("p1", "p3"), 2);
        assert_eq!(coupling.get("p2", "p3"), 2);
    }

    #[test]
    fn test_ties_keep_discovery_order() {
        // s1 cites (c, d) first, s2 cites (a, b) later: equal counts, so
        // (c, d) must rank ahead even though (a, b) sorts first.
        let graph = graph_from(
            &["s1", "s2", "a", "b", "c", "d"],
            &[("s1", "c"), ("s1", "d"), ("s2", "a"), ("s2", "b")],
        );

        let counts = co_citation(&graph);
        let ranked: Vec<_> = counts.iter().map(|s| s.pair.clone()).collect();
        assert_eq!(
            ranked,
            vec![
                PaperPair::new("c", "d").unwrap(),
                PaperPair::new("a", "b").unwrap()
            ]
        );
    }

    #[test]
    fn test_never_reports_self_pairs() {
        // A self-citation puts the node in its own successor list.
        let graph = graph_from(&["a", "b"], &[("a", "a"), ("a", "b")]);

        let counts = co_citation(&graph);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get("a", "b"), 1);
        assert!(counts.iter().all(|s| s.pair.a < s.pair.b));
    }

    #[test]
    fn test_top_k_truncates_and_resolves_titles() {
        let graph = graph_from(&["s", "a", "b", "c"], &[("s", "a"), ("s", "b"), ("s", "c")]);

        let counts = co_citation(&graph);
        assert_eq!(counts.len(), 3);
        assert_eq!(counts.top_k(2).len(), 2);
        assert_eq!(counts.top_k(DEFAULT_TOP_K).len(), 3);

        let ranked = counts.ranked(&graph, 1);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].title_a, "Title a");
        assert_eq!(ranked[0].title_b, "Title b");
        assert_eq!(counts.kind(), Some(PairKind::CoCitation));
    }

    #[test]
    fn test_empty_graph_has_no_pairs() {
        let graph = CitationGraph::new();
        assert!(co_citation(&graph).is_empty());
        assert!(bibliographic_coupling(&graph).is_empty());
    }
}
