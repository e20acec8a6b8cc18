//! Connected-component analysis.
//!
//! Weak components ignore edge direction and are found with union-find.
//! Strong components respect direction and come from Tarjan's algorithm.

use crate::graph::{CitationGraph, NodeId};
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Summary of one kind of component partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSummary {
    /// Number of components.
    pub count: usize,
    /// Node count of the largest component.
    pub largest_nodes: usize,
    /// Edges with both endpoints inside the largest component.
    pub largest_edges: usize,
}

/// Weak and strong component statistics for a graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentStats {
    pub weak: ComponentSummary,
    pub strong: ComponentSummary,
}

/// Partitions nodes into weakly connected components.
///
/// Components are ordered by their lowest node index, and nodes inside a
/// component are in index order.
pub fn weakly_connected_components(graph: &CitationGraph) -> Vec<Vec<NodeId>> {
    let n = graph.node_count();
    let mut sets = UnionFind::<usize>::new(n);
    for (source, target) in graph.edge_indexes() {
        sets.union(source.index(), target.index());
    }

    let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
    let mut components: Vec<Vec<NodeId>> = Vec::new();
    for node in graph.node_indexes() {
        let root = sets.find_mut(node.index());
        let slot = *slot_of_root.entry(root).or_insert_with(|| {
            components.push(Vec::new());
            components.len() - 1
        });
        components[slot].push(node);
    }
    components
}

/// Partitions nodes into strongly connected components.
pub fn strongly_connected_components(graph: &CitationGraph) -> Vec<Vec<NodeId>> {
    petgraph::algo::tarjan_scc(&graph.graph)
}

/// Computes counts and largest-component sizes for both partitions.
pub fn component_stats(graph: &CitationGraph) -> ComponentStats {
    ComponentStats {
        weak: summarize(graph, &weakly_connected_components(graph)),
        strong: summarize(graph, &strongly_connected_components(graph)),
    }
}

fn summarize(graph: &CitationGraph, components: &[Vec<NodeId>]) -> ComponentSummary {
    let Some(largest) = largest_component(components) else {
        return ComponentSummary::default();
    };

    ComponentSummary {
        count: components.len(),
        largest_nodes: largest.len(),
        largest_edges: induced_edge_count(graph, largest),
    }
}

/// The biggest component by node count; the first one found wins ties.
pub fn largest_component(components: &[Vec<NodeId>]) -> Option<&Vec<NodeId>> {
    let mut best: Option<&Vec<NodeId>> = None;
    for component in components {
        if best.map_or(true, |b| component.len() > b.len()) {
            best = Some(component);
        }
    }
    best
}

/// Counts edges whose endpoints are both in `nodes`. Self-loops count.
pub fn induced_edge_count(graph: &CitationGraph, nodes: &[NodeId]) -> usize {
    let mut inside = vec![false; graph.node_count()];
    for node in nodes {
        inside[node.index()] = true;
    }
    graph
        .edge_indexes()
        .filter(|(s, t)| inside[s.index()] && inside[t.index()])
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeAttributes;

    fn graph_from(ids: &[&str], edges: &[(&str, &str)]) -> CitationGraph {
        let mut graph = CitationGraph::new();
        for id in ids {
            graph.add_node(NodeAttributes::new(*id, None));
        }
        for (from, to) in edges {
            graph.add_citation(from, to);
        }
        graph
    }

    #[test]
    fn test_two_weak_components() {
        // a -> b -> c and d -> e
        let graph = graph_from(
            &["a", "b", "c", "d", "e"],
            &[("a", "b"), ("b", "c"), ("d", "e")],
        );

        let stats = component_stats(&graph);
        assert_eq!(stats.weak.count, 2);
        assert_eq!(stats.weak.largest_nodes, 3);
        assert_eq!(stats.weak.largest_edges, 2);
    }

    #[test]
    fn test_weak_ignores_direction() {
        // a -> c <- b joins all three even though no path connects a and b.
        let graph = graph_from(&["a", "b", "c"], &[("a", "c"), ("b", "c")]);
        let components = weakly_connected_components(&graph);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].len(), 3);
    }

    #[test]
    fn test_strong_components_on_dag_are_singletons() {
        let graph = graph_from(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("a", "c")]);

        let stats = component_stats(&graph);
        assert_eq!(stats.strong.count, 3);
        assert_eq!(stats.strong.largest_nodes, 1);
        assert_eq!(stats.strong.largest_edges, 0);
    }

    #[test]
    fn test_strong_component_with_cycle() {
        // a -> b -> c -> a forms a cycle, d hangs off it.
        let graph = graph_from(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")],
        );

        let stats = component_stats(&graph);
        assert_eq!(stats.strong.count, 2);
        assert_eq!(stats.strong.largest_nodes, 3);
        assert_eq!(stats.strong.largest_edges, 3);
        assert_eq!(stats.weak.count, 1);
        assert_eq!(stats.weak.largest_edges, 4);
    }

    #[test]
    fn test_self_loop_counts_as_induced_edge() {
        let graph = graph_from(&["a", "b"], &[("a", "a")]);
        let stats = component_stats(&graph);
        assert_eq!(stats.weak.count, 2);
        assert_eq!(stats.weak.largest_nodes, 1);
        assert_eq!(stats.weak.largest_edges, 1);
    }

    #[test]
    fn test_largest_tie_takes_first() {
        let graph = graph_from(&["a", "b", "c", "d"], &[("a", "b"), ("c", "d")]);
        let components = weakly_connected_components(&graph);
        let largest = largest_component(&components).unwrap();
        assert_eq!(graph.get(largest[0]).unwrap().id, "a");
    }

    #[test]
    fn test_empty_graph() {
        let stats = component_stats(&CitationGraph::new());
        assert_eq!(stats, ComponentStats::default());
    }
}
