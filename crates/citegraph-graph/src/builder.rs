//! Graph builder for constructing the citation graph from paper records.
//!
//! The builder streams the corpus twice:
//! 1. Qualify: select papers meeting the citation and year thresholds
//! 2. Link: add citations whose source and target both qualified
//!
//! Files are scanned in parallel and merged in input order, so the result
//! is the same as scanning them one after another.

use crate::graph::{CitationGraph, NodeAttributes, NodeId};
use citegraph_core::{PaperRecord, RecordError, RecordStream};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Filter thresholds for qualifying papers. Both year bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildParams {
    pub min_citations: i64,
    pub start_year: i64,
    pub end_year: i64,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            min_citations: 60,
            start_year: 2010,
            end_year: 2015,
        }
    }
}

impl BuildParams {
    /// Whether a record becomes a node.
    pub fn qualifies(&self, record: &PaperRecord) -> bool {
        record.key().is_some()
            && record.citation_count >= self.min_citations
            && (self.start_year..=self.end_year).contains(&record.year)
    }
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("missing input file(s): {}", display_paths(.paths))]
    MissingInput { paths: Vec<PathBuf> },

    #[error(transparent)]
    Read(#[from] RecordError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Running counters for a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProgress {
    /// File scans completed, counting both passes.
    pub files_scanned: usize,
    /// Lines read during the qualify pass.
    pub lines_scanned: usize,
    /// Malformed lines seen during the qualify pass.
    pub malformed_lines: usize,
    /// Distinct qualifying papers.
    pub qualifying: usize,
    /// Distinct citation edges added.
    pub edges_added: usize,
}

/// Which pass a scan event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Qualify,
    Link,
}

impl std::fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildPhase::Qualify => write!(f, "qualify"),
            BuildPhase::Link => write!(f, "link"),
        }
    }
}

/// Emitted once per file per pass, from whichever thread scanned it.
#[derive(Debug, Clone)]
pub struct ScanEvent {
    pub phase: BuildPhase,
    pub file: PathBuf,
    pub lines: usize,
    pub malformed: usize,
    /// Qualifying records (qualify pass) or citations kept (link pass).
    pub found: usize,
}

/// Result of a build that did not fail.
#[derive(Debug)]
pub enum BuildOutcome {
    /// A graph with at least one node.
    Built {
        graph: CitationGraph,
        progress: BuildProgress,
    },
    /// No record passed the filter. Callers decide whether that is fatal.
    Empty { progress: BuildProgress },
}

impl BuildOutcome {
    pub fn progress(&self) -> BuildProgress {
        match self {
            BuildOutcome::Built { progress, .. } | BuildOutcome::Empty { progress } => *progress,
        }
    }

    pub fn into_graph(self) -> Option<CitationGraph> {
        match self {
            BuildOutcome::Built { graph, .. } => Some(graph),
            BuildOutcome::Empty { .. } => None,
        }
    }
}

type Observer = Box<dyn Fn(&ScanEvent) + Send + Sync>;

/// Builds a CitationGraph from corpus files or in-memory records.
pub struct GraphBuilder {
    params: BuildParams,
    observer: Option<Observer>,
}

/// Qualifying papers in first-seen order, with last-seen titles.
#[derive(Default)]
struct QualifyingSet {
    order: Vec<String>,
    titles: HashMap<String, Option<String>>,
}

impl QualifyingSet {
    fn insert(&mut self, id: String, title: Option<String>) {
        match self.titles.entry(id) {
            Entry::Occupied(mut slot) => {
                slot.insert(title);
            }
            Entry::Vacant(slot) => {
                self.order.push(slot.key().clone());
                slot.insert(title);
            }
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn into_graph(mut self) -> CitationGraph {
        let mut graph = CitationGraph::new();
        for id in self.order {
            let title = self.titles.remove(&id).flatten();
            graph.add_node(NodeAttributes::new(id, title));
        }
        graph
    }
}

/// Output of scanning one file in one pass.
struct FileScan<T> {
    lines: usize,
    malformed: usize,
    items: Vec<T>,
}

impl GraphBuilder {
    /// Creates a new builder.
    pub fn new(params: BuildParams) -> Self {
        Self {
            params,
            observer: None,
        }
    }

    /// Registers a callback invoked after each file scan.
    pub fn with_observer(mut self, observer: impl Fn(&ScanEvent) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn params(&self) -> BuildParams {
        self.params
    }

    /// Builds the graph from corpus files.
    ///
    /// Every file must exist before any is read; otherwise the build fails
    /// with `BuildError::MissingInput` naming all of the missing paths.
    pub fn build<P: AsRef<Path> + Sync>(&self, files: &[P]) -> Result<BuildOutcome, BuildError> {
        let missing: Vec<PathBuf> = files
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| !p.exists())
            .map(Path::to_path_buf)
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::MissingInput { paths: missing });
        }

        info!(
            "Identifying qualified papers: >= {} citations, years {}-{}",
            self.params.min_citations, self.params.start_year, self.params.end_year
        );

        let scans = files
            .par_iter()
            .map(|file| self.scan_qualifying(file.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut progress = BuildProgress::default();
        let mut qualifying = QualifyingSet::default();
        for scan in scans {
            progress.files_scanned += 1;
            progress.lines_scanned += scan.lines;
            progress.malformed_lines += scan.malformed;
            for (id, title) in scan.items {
                qualifying.insert(id, title);
            }
        }
        progress.qualifying = qualifying.len();

        if qualifying.is_empty() {
            info!("No papers matched the criteria");
            return Ok(BuildOutcome::Empty { progress });
        }

        info!(
            "Found {} qualified papers out of {} lines",
            progress.qualifying, progress.lines_scanned
        );

        let mut graph = qualifying.into_graph();

        let links = files
            .par_iter()
            .map(|file| self.scan_citations(&graph, file.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        for scan in links {
            progress.files_scanned += 1;
            for (from, to) in scan.items {
                if graph.add_edge(from, to) {
                    progress.edges_added += 1;
                }
            }
        }

        info!(
            "Graph built with {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        Ok(BuildOutcome::Built { graph, progress })
    }

    /// Builds the graph from records already in memory, with the same
    /// semantics as `build`.
    pub fn build_from_records(&self, records: &[PaperRecord]) -> BuildOutcome {
        let mut qualifying = QualifyingSet::default();
        for record in records {
            if let Some((id, title)) = self.qualify(record) {
                qualifying.insert(id, title);
            }
        }

        let mut progress = BuildProgress {
            lines_scanned: records.len(),
            qualifying: qualifying.len(),
            ..BuildProgress::default()
        };
        if qualifying.is_empty() {
            return BuildOutcome::Empty { progress };
        }

        let mut graph = qualifying.into_graph();
        let mut edges = Vec::new();
        for record in records {
            Self::link(&graph, record, &mut edges);
        }
        for (from, to) in edges {
            if graph.add_edge(from, to) {
                progress.edges_added += 1;
            }
        }

        BuildOutcome::Built { graph, progress }
    }

    fn qualify(&self, record: &PaperRecord) -> Option<(String, Option<String>)> {
        if !self.params.qualifies(record) {
            return None;
        }
        let id = record.key()?.to_string();
        Some((id, record.title.clone()))
    }

    /// Collects the citations of a record that stay inside the graph.
    fn link(graph: &CitationGraph, record: &PaperRecord, out: &mut Vec<(NodeId, NodeId)>) {
        let Some(from) = record.key().and_then(|id| graph.get_index(id)) else {
            return;
        };
        for reference in &record.references {
            if let Some(to) = graph.get_index(reference) {
                out.push((from, to));
            }
        }
    }

    /// First pass over one file.
    fn scan_qualifying(&self, path: &Path) -> Result<FileScan<(String, Option<String>)>, BuildError> {
        debug!("Qualify pass: {}", path.display());
        let scan = Self::scan(path, |record, items| {
            if let Some(entry) = self.qualify(record) {
                items.push(entry);
            }
        })?;
        self.notify(BuildPhase::Qualify, path, &scan);
        Ok(scan)
    }

    /// Second pass over one file.
    fn scan_citations(
        &self,
        graph: &CitationGraph,
        path: &Path,
    ) -> Result<FileScan<(NodeId, NodeId)>, BuildError> {
        debug!("Link pass: {}", path.display());
        let scan = Self::scan(path, |record, items| Self::link(graph, record, items))?;
        self.notify(BuildPhase::Link, path, &scan);
        Ok(scan)
    }

    /// Streams a file, skipping malformed lines and stopping on read errors.
    fn scan<T>(
        path: &Path,
        mut visit: impl FnMut(&PaperRecord, &mut Vec<T>),
    ) -> Result<FileScan<T>, BuildError> {
        let mut stream = RecordStream::open(path)?;
        let mut items = Vec::new();

        for record in stream.by_ref() {
            match record {
                Ok(record) => visit(&record, &mut items),
                Err(e) if e.is_recoverable() => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let stats = stream.stats();
        Ok(FileScan {
            lines: stats.lines_seen,
            malformed: stats.malformed,
            items,
        })
    }

    fn notify<T>(&self, phase: BuildPhase, path: &Path, scan: &FileScan<T>) {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        if scan.malformed > 0 {
            info!(
                "[{}] {}: scanned {} lines with {} malformed, found {}",
                phase,
                file_name,
                scan.lines,
                scan.malformed,
                scan.items.len()
            );
        } else {
            info!(
                "[{}] {}: scanned {} lines, found {}",
                phase,
                file_name,
                scan.lines,
                scan.items.len()
            );
        }

        if let Some(observer) = &self.observer {
            observer(&ScanEvent {
                phase,
                file: path.to_path_buf(),
                lines: scan.lines,
                malformed: scan.malformed,
                found: scan.items.len(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::{tempdir, NamedTempFile};

    fn params() -> BuildParams {
        BuildParams {
            min_citations: 10,
            start_year: 2010,
            end_year: 2015,
        }
    }

    fn paper(id: &str, refs: &[&str]) -> PaperRecord {
        PaperRecord::new(id)
            .with_year(2012)
            .with_citations(50)
            .with_title(format!("Paper {}", id))
            .with_references(refs.iter().map(|r| r.to_string()).collect())
    }

    fn write_corpus(lines: &[String]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    fn json(record: &PaperRecord) -> String {
        serde_json::to_string(record).unwrap()
    }

    #[test]
    fn test_citation_threshold_inclusive() {
        let builder = GraphBuilder::new(params());
        let at = PaperRecord::new("at").with_year(2012).with_citations(10);
        let below = PaperRecord::new("below").with_year(2012).with_citations(9);

        let graph = builder
            .build_from_records(&[at, below])
            .into_graph()
            .unwrap();
        assert!(graph.contains("at"));
        assert!(!graph.contains("below"));
    }

    #[test]
    fn test_year_range_inclusive() {
        let builder = GraphBuilder::new(params());
        let records = vec![
            PaperRecord::new("start").with_year(2010).with_citations(10),
            PaperRecord::new("end").with_year(2015).with_citations(10),
            PaperRecord::new("early").with_year(2009).with_citations(10),
            PaperRecord::new("late").with_year(2016).with_citations(10),
        ];

        let graph = builder.build_from_records(&records).into_graph().unwrap();
        assert_eq!(graph.node_count(), 2);
        assert!(graph.contains("start"));
        assert!(graph.contains("end"));
    }

    #[test]
    fn test_references_to_unqualified_papers_dropped() {
        let builder = GraphBuilder::new(params());
        let records = vec![
            paper("a", &["b", "low", "unknown"]),
            paper("b", &[]),
            PaperRecord::new("low").with_year(2012).with_citations(1),
        ];

        let graph = builder.build_from_records(&records).into_graph().unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.has_citation("a", "b"));
    }

    #[test]
    fn test_unqualified_source_adds_no_edges() {
        let builder = GraphBuilder::new(params());
        let low = PaperRecord::new("low")
            .with_year(2012)
            .with_citations(1)
            .with_references(vec!["a".into()]);
        let records = vec![paper("a", &[]), low];

        let graph = builder.build_from_records(&records).into_graph().unwrap();
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_duplicate_records_last_title_wins() {
        let builder = GraphBuilder::new(params());
        let records = vec![
            paper("a", &[]).with_title("First"),
            paper("b", &[]),
            paper("a", &[]).with_title("Second"),
        ];

        let graph = builder.build_from_records(&records).into_graph().unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.title("a"), Some("Second"));
        // First occurrence fixes node order.
        assert_eq!(graph.nodes().next().unwrap().id, "a");
    }

    #[test]
    fn test_missing_title_falls_back_to_id() {
        let builder = GraphBuilder::new(params());
        let record = PaperRecord::new("untitled").with_year(2012).with_citations(10);

        let graph = builder.build_from_records(&[record]).into_graph().unwrap();
        assert_eq!(graph.title("untitled"), Some("untitled"));
    }

    #[test]
    fn test_parallel_citations_collapse_and_self_loops_kept() {
        let builder = GraphBuilder::new(params());
        let records = vec![paper("a", &["b", "b", "a"]), paper("b", &[])];

        let outcome = builder.build_from_records(&records);
        assert_eq!(outcome.progress().edges_added, 2);
        let graph = outcome.into_graph().unwrap();
        assert!(graph.has_citation("a", "b"));
        assert!(graph.has_citation("a", "a"));
    }

    #[test]
    fn test_no_qualifying_records_is_empty() {
        let builder = GraphBuilder::new(params());
        let records = vec![PaperRecord::new("old").with_year(1990).with_citations(500)];

        let outcome = builder.build_from_records(&records);
        assert!(matches!(outcome, BuildOutcome::Empty { .. }));
        assert_eq!(outcome.progress().qualifying, 0);
    }

    #[test]
    fn test_build_from_files_skips_malformed_lines() {
        let file = write_corpus(&[
            json(&paper("a", &["b", "c"])),
            "{not valid json".to_string(),
            String::new(),
            json(&paper("b", &["c"])),
        ]);
        let other = write_corpus(&[json(&paper("c", &[]))]);

        let builder = GraphBuilder::new(params());
        let outcome = builder.build(&[file.path(), other.path()]).unwrap();
        let progress = outcome.progress();

        assert_eq!(progress.lines_scanned, 5);
        assert_eq!(progress.malformed_lines, 1);
        assert_eq!(progress.qualifying, 3);
        assert_eq!(progress.edges_added, 3);
        assert_eq!(progress.files_scanned, 4);

        let graph = outcome.into_graph().unwrap();
        assert!(graph.has_citation("a", "b"));
        assert!(graph.has_citation("a", "c"));
        assert!(graph.has_citation("b", "c"));
    }

    #[test]
    fn test_later_file_overrides_title() {
        let first = write_corpus(&[json(&paper("a", &[]).with_title("Old"))]);
        let second = write_corpus(&[json(&paper("a", &[]).with_title("New"))]);

        let graph = GraphBuilder::new(params())
            .build(&[first.path(), second.path()])
            .unwrap()
            .into_graph()
            .unwrap();
        assert_eq!(graph.title("a"), Some("New"));
    }

    #[test]
    fn test_missing_input_fails_before_processing() {
        let dir = tempdir().unwrap();
        let present = write_corpus(&[json(&paper("a", &[]))]);
        let missing_a = dir.path().join("dblp-ref-8.json");
        let missing_b = dir.path().join("dblp-ref-9.json");

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let builder = GraphBuilder::new(params()).with_observer(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let files = vec![present.path().to_path_buf(), missing_a.clone(), missing_b.clone()];
        match builder.build(&files) {
            Err(BuildError::MissingInput { paths }) => {
                assert_eq!(paths, vec![missing_a, missing_b]);
            }
            other => panic!("expected missing input, got {:?}", other),
        }
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_observer_sees_both_passes() {
        let file = write_corpus(&[json(&paper("a", &["b"])), json(&paper("b", &[]))]);

        let events = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = events.clone();
        let builder = GraphBuilder::new(params()).with_observer(move |event| {
            sink.lock().unwrap().push((event.phase, event.found));
        });
        builder.build(&[file.path()]).unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![(BuildPhase::Qualify, 2), (BuildPhase::Link, 1)]
        );
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", json(&paper("a", &["b"]))).unwrap();
        file.write_all(b"{\"id\":\"x\",\"title\":\"caf\xe9\"}\n").unwrap();
        writeln!(file, "{}", json(&paper("b", &[]))).unwrap();

        let outcome = GraphBuilder::new(params()).build(&[file.path()]).unwrap();
        assert_eq!(outcome.progress().malformed_lines, 1);

        let graph = outcome.into_graph().unwrap();
        assert_eq!(graph.node_count(), 2);
        assert!(graph.has_citation("a", "b"));
    }
}
