//! Core graph data structure.
//!
//! The CitationGraph wraps petgraph and adds an id index for fast lookups.
//! It's the central data structure every analysis works with. Once the
//! builder hands it out it is treated as read-only.

use crate::edge::GraphEdge;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a node in the graph.
pub type NodeId = NodeIndex;

/// Attributes stored on every paper node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAttributes {
    /// Corpus identifier of the paper.
    pub id: String,
    /// Display title. Falls back to the id when the corpus has none.
    pub title: String,
}

impl NodeAttributes {
    /// Creates attributes, substituting the id for a missing or empty title.
    pub fn new(id: impl Into<String>, title: Option<String>) -> Self {
        let id = id.into();
        let title = title.filter(|t| !t.is_empty()).unwrap_or_else(|| id.clone());
        Self { id, title }
    }
}

/// Returns the display title for a node: its title, or its id if the title is empty.
pub fn title_of(attrs: &NodeAttributes) -> &str {
    if attrs.title.is_empty() {
        &attrs.id
    } else {
        &attrs.title
    }
}

/// The citation graph.
///
/// Nodes are qualifying papers, and an edge `a -> b` means paper `a` cites
/// paper `b`. Edges form a set: the same ordered pair is stored at most once.
#[derive(Debug, Clone)]
pub struct CitationGraph {
    /// The underlying petgraph graph.
    pub(crate) graph: DiGraph<NodeAttributes, ()>,

    /// Maps paper ids to graph node indexes.
    id_index: HashMap<String, NodeId>,
}

impl Default for CitationGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl CitationGraph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            id_index: HashMap::new(),
        }
    }

    /// Adds a paper node.
    ///
    /// If a node with the same id already exists its attributes are replaced
    /// and the existing index is returned.
    pub fn add_node(&mut self, attrs: NodeAttributes) -> NodeId {
        if let Some(&index) = self.id_index.get(&attrs.id) {
            self.graph[index] = attrs;
            return index;
        }

        let id = attrs.id.clone();
        let index = self.graph.add_node(attrs);
        self.id_index.insert(id, index);
        index
    }

    /// Adds a citation edge. Returns false if the edge was already present.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> bool {
        if self.graph.find_edge(from, to).is_some() {
            return false;
        }
        self.graph.add_edge(from, to, ());
        true
    }

    /// Adds a citation edge between two ids. Returns false if either id is
    /// unknown or the edge already exists.
    pub fn add_citation(&mut self, from: &str, to: &str) -> bool {
        match (self.get_index(from), self.get_index(to)) {
            (Some(from), Some(to)) => self.add_edge(from, to),
            _ => false,
        }
    }

    /// Gets a node by its paper id.
    pub fn get_by_id(&self, id: &str) -> Option<&NodeAttributes> {
        let index = self.id_index.get(id)?;
        self.graph.node_weight(*index)
    }

    /// Gets a node by its graph index.
    pub fn get(&self, index: NodeId) -> Option<&NodeAttributes> {
        self.graph.node_weight(index)
    }

    /// Gets the node index for a paper id.
    pub fn get_index(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.id_index.contains_key(id)
    }

    /// Returns the display title of a paper, if it is in the graph.
    pub fn title(&self, id: &str) -> Option<&str> {
        self.get_by_id(id).map(title_of)
    }

    /// Whether `from` cites `to`.
    pub fn has_citation(&self, from: &str, to: &str) -> bool {
        match (self.get_index(from), self.get_index(to)) {
            (Some(from), Some(to)) => self.graph.find_edge(from, to).is_some(),
            _ => false,
        }
    }

    /// Papers cited by the given node.
    pub fn successors(&self, index: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.neighbors_directed(index, Direction::Outgoing)
    }

    /// Papers citing the given node.
    pub fn predecessors(&self, index: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.neighbors_directed(index, Direction::Incoming)
    }

    /// Number of references from this node that stayed inside the graph.
    pub fn out_degree(&self, index: NodeId) -> usize {
        self.successors(index).count()
    }

    /// Number of citations this node received from inside the graph.
    pub fn in_degree(&self, index: NodeId) -> usize {
        self.predecessors(index).count()
    }

    /// Searches for nodes whose title contains the query, ignoring case.
    pub fn search_title(&self, query: &str) -> Vec<NodeId> {
        let query_lower = query.to_lowercase();
        self.graph
            .node_indices()
            .filter(|&idx| title_of(&self.graph[idx]).to_lowercase().contains(&query_lower))
            .collect()
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Iterates over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeAttributes> {
        self.graph.node_weights()
    }

    /// Iterates over all node indexes in insertion order.
    pub fn node_indexes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }

    /// Iterates over all edges as `(source, target)` index pairs.
    pub fn edge_indexes(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.graph
            .edge_references()
            .map(|edge_ref| (edge_ref.source(), edge_ref.target()))
    }

    /// Returns all edges with source and target ids for export.
    pub fn export_edges(&self) -> Vec<GraphEdge> {
        self.edge_indexes()
            .map(|(source, target)| GraphEdge {
                source: self.graph[source].id.clone(),
                target: self.graph[target].id.clone(),
            })
            .collect()
    }
}

/// Graph statistics for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    /// Nodes with no outgoing edge inside the graph.
    pub dangling_count: usize,
    pub self_citations: usize,
}

impl CitationGraph {
    /// Returns graph statistics.
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            dangling_count: self
                .node_indexes()
                .filter(|&idx| self.out_degree(idx) == 0)
                .count(),
            self_citations: self.edge_indexes().filter(|(s, t)| s == t).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> NodeAttributes {
        NodeAttributes::new(id, Some(format!("Paper {}", id)))
    }

    #[test]
    fn test_title_defaults_to_id() {
        assert_eq!(NodeAttributes::new("p1", None).title, "p1");
        assert_eq!(NodeAttributes::new("p1", Some(String::new())).title, "p1");
        assert_eq!(NodeAttributes::new("p1", Some("T".into())).title, "T");

        let raw = NodeAttributes {
            id: "p2".into(),
            title: String::new(),
        };
        assert_eq!(title_of(&raw), "p2");
    }

    #[test]
    fn test_edges_are_a_set() {
        let mut graph = CitationGraph::new();
        let a = graph.add_node(node("a"));
        let b = graph.add_node(node("b"));

        assert!(graph.add_edge(a, b));
        assert!(!graph.add_edge(a, b));
        assert!(graph.add_edge(b, a));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_self_citation_preserved() {
        let mut graph = CitationGraph::new();
        let a = graph.add_node(node("a"));
        assert!(graph.add_edge(a, a));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.out_degree(a), 1);
        assert_eq!(graph.in_degree(a), 1);
        assert_eq!(graph.stats().self_citations, 1);
    }

    #[test]
    fn test_duplicate_id_replaces_attributes() {
        let mut graph = CitationGraph::new();
        let first = graph.add_node(node("a"));
        let second = graph.add_node(NodeAttributes::new("a", Some("Renamed".into())));

        assert_eq!(first, second);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.title("a"), Some("Renamed"));
    }

    #[test]
    fn test_add_citation_requires_both_nodes() {
        let mut graph = CitationGraph::new();
        graph.add_node(node("a"));
        assert!(!graph.add_citation("a", "missing"));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_search_title_case_insensitive() {
        let mut graph = CitationGraph::new();
        graph.add_node(NodeAttributes::new("a", Some("Secure Hashing".into())));
        graph.add_node(NodeAttributes::new("b", Some("Stream Joins".into())));

        let hits = graph.search_title("HASH");
        assert_eq!(hits.len(), 1);
        assert_eq!(graph.get(hits[0]).unwrap().id, "a");
    }

    #[test]
    fn test_stats_counts_dangling() {
        let mut graph = CitationGraph::new();
        let a = graph.add_node(node("a"));
        let b = graph.add_node(node("b"));
        graph.add_node(node("c"));
        graph.add_edge(a, b);

        let stats = graph.stats();
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.edge_count, 1);
        assert_eq!(stats.dangling_count, 2);

        let exported = graph.export_edges();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].source, "a");
        assert_eq!(exported[0].target, "b");
    }
}
