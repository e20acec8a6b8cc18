use crate::builder::BuildParams;
use crate::graph::CitationGraph;
use crate::snapshot::{self, SnapshotError};
use sled::Db;
use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sled(#[from] sled::Error),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Identifies a stored graph by the inputs that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphKey(String);

impl GraphKey {
    /// Key for a graph built from `inputs` (in order) with `params`.
    ///
    /// Each input contributes its path, length and modification time, so an
    /// edited or replaced corpus file maps to a fresh key.
    pub fn new<P: AsRef<Path>>(params: &BuildParams, inputs: &[P]) -> Self {
        let files = inputs
            .iter()
            .map(|p| fingerprint(p.as_ref()))
            .collect::<Vec<_>>()
            .join("|");
        Self(format!(
            "graph:{}:{}:{}:{}",
            params.min_citations, params.start_year, params.end_year, files
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn fingerprint(path: &Path) -> String {
    match fs::metadata(path) {
        Ok(meta) => {
            let modified = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_nanos())
                .unwrap_or(0);
            format!("{}@{}:{}", path.display(), meta.len(), modified)
        }
        Err(_) => format!("{}@missing", path.display()),
    }
}

/// Whether a best-effort save went through.
#[derive(Debug)]
pub enum SaveOutcome {
    Saved,
    /// The write failed; the graph in memory is still good to use.
    Degraded(StoreError),
}

pub struct GraphStore {
    db: Db,
}

impl GraphStore {
    /// Opens or creates a graph store at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Saves a graph snapshot under its key.
    pub fn save_graph(&self, key: &GraphKey, graph: &CitationGraph) -> Result<(), StoreError> {
        let bytes = snapshot::serialize(graph)?;
        self.db.insert(key.as_str(), bytes)?;
        self.db.flush()?;
        Ok(())
    }

    /// Saves a graph, reporting rather than propagating failure.
    pub fn save_best_effort(&self, key: &GraphKey, graph: &CitationGraph) -> SaveOutcome {
        match self.save_graph(key, graph) {
            Ok(()) => SaveOutcome::Saved,
            Err(e) => {
                warn!("Could not cache graph under {}: {}", key.as_str(), e);
                SaveOutcome::Degraded(e)
            }
        }
    }

    /// Loads the graph stored under a key, if any.
    ///
    /// A present but undecodable entry is an error; callers may rebuild.
    pub fn load_graph(&self, key: &GraphKey) -> Result<Option<CitationGraph>, StoreError> {
        match self.db.get(key.as_str())? {
            Some(bytes) => Ok(Some(snapshot::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Removes the graph stored under a key.
    pub fn clear(&self, key: &GraphKey) -> Result<(), StoreError> {
        self.db.remove(key.as_str())?;
        self.db.flush()?;
        Ok(())
    }
}
