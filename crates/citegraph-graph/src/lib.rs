//! Citegraph Graph - Citation graph construction and analysis
//!
//! This crate builds a directed citation graph from corpus files and runs
//! the analyses on top of it: co-citation and bibliographic coupling,
//! connected components, and PageRank (global and topic-personalized).
//!
//! # Architecture
//!
//! The graph uses petgraph internally with an id index for lookups. It is
//! built once by the two-pass [`GraphBuilder`] and treated as read-only
//! afterwards. Snapshots let a built graph be persisted and reloaded
//! instead of rescanning the corpus.
//!
//! # Example
//!
//! ```no_run
//! use citegraph_graph::{co_citation, rank, BuildParams, GraphBuilder, PageRankConfig};
//!
//! let builder = GraphBuilder::new(BuildParams::default());
//! let outcome = builder.build(&["dblp-ref-0.json", "dblp-ref-1.json"])?;
//!
//! if let Some(graph) = outcome.into_graph() {
//!     let pairs = co_citation(&graph);
//!     let scores = rank(&graph, &PageRankConfig::default(), None)?;
//!     println!("{} pairs, top paper {:?}", pairs.len(), scores.top(&graph, 1));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod builder;
mod components;
mod edge;
mod graph;
mod pagerank;
mod pairs;
pub mod snapshot;
mod store;

pub use builder::{
    BuildError, BuildOutcome, BuildParams, BuildPhase, BuildProgress, GraphBuilder, ScanEvent,
};
pub use components::{
    component_stats, induced_edge_count, largest_component, strongly_connected_components,
    weakly_connected_components, ComponentStats, ComponentSummary,
};
pub use edge::GraphEdge;
pub use graph::{title_of, CitationGraph, GraphStats, NodeAttributes, NodeId};
pub use pagerank::{
    damping_sweep, rank, topic_personalization, PageRankConfig, PageRankResult, Personalization,
    RankError, RankedPaper, DEFAULT_DAMPING_SWEEP,
};
pub use pairs::{
    bibliographic_coupling, co_citation, count_pairs, PairCounts, PairKind, PairScore, PaperPair,
    RankedPair, DEFAULT_TOP_K,
};
pub use snapshot::{deserialize, serialize, SnapshotError};
pub use store::{GraphKey, GraphStore, SaveOutcome, StoreError};
