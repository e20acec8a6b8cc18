//! Binary snapshots of a citation graph.
//!
//! A snapshot holds the nodes in order and the edges as index pairs into
//! that node list, behind a magic tag and a format version. Decoding checks
//! all of it, so a corrupt or foreign blob is rejected instead of producing
//! a half-built graph.

use crate::graph::{CitationGraph, NodeAttributes};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

const SNAPSHOT_MAGIC: [u8; 4] = *b"CGPH";
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("not a citation graph snapshot")]
    BadMagic,
    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("snapshot edge refers to node {index}, but only {nodes} nodes exist")]
    DanglingEdge { index: u32, nodes: usize },
    #[error("snapshot contains node '{0}' more than once")]
    DuplicateNode(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize, Deserialize)]
struct GraphSnapshot {
    magic: [u8; 4],
    version: u32,
    nodes: Vec<NodeAttributes>,
    edges: Vec<(u32, u32)>,
}

/// Encodes a graph. Node order, edges and titles are preserved exactly.
pub fn serialize(graph: &CitationGraph) -> Result<Vec<u8>, SnapshotError> {
    let snapshot = GraphSnapshot {
        magic: SNAPSHOT_MAGIC,
        version: SNAPSHOT_VERSION,
        nodes: graph.nodes().cloned().collect(),
        edges: graph
            .edge_indexes()
            .map(|(s, t)| (s.index() as u32, t.index() as u32))
            .collect(),
    };
    Ok(bincode::serialize(&snapshot)?)
}

/// Decodes a graph produced by [`serialize`].
pub fn deserialize(bytes: &[u8]) -> Result<CitationGraph, SnapshotError> {
    let snapshot: GraphSnapshot = bincode::deserialize(bytes)?;
    if snapshot.magic != SNAPSHOT_MAGIC {
        return Err(SnapshotError::BadMagic);
    }
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: snapshot.version,
            expected: SNAPSHOT_VERSION,
        });
    }

    let mut seen = HashSet::with_capacity(snapshot.nodes.len());
    let mut graph = CitationGraph::new();
    let mut indexes = Vec::with_capacity(snapshot.nodes.len());
    for attrs in snapshot.nodes {
        if !seen.insert(attrs.id.clone()) {
            return Err(SnapshotError::DuplicateNode(attrs.id));
        }
        indexes.push(graph.add_node(attrs));
    }

    let lookup = |index: u32| {
        indexes
            .get(index as usize)
            .copied()
            .ok_or(SnapshotError::DanglingEdge {
                index,
                nodes: indexes.len(),
            })
    };
    for (source, target) in snapshot.edges {
        let (source, target) = (lookup(source)?, lookup(target)?);
        graph.add_edge(source, target);
    }

    Ok(graph)
}

/// Writes a snapshot file.
pub fn save_to_file(graph: &CitationGraph, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
    fs::write(path, serialize(graph)?)?;
    Ok(())
}

/// Reads a snapshot file.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<CitationGraph, SnapshotError> {
    deserialize(&fs::read(path)?)
}
