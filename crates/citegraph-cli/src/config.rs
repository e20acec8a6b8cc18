//! Analysis configuration stored in `citegraph.json`.

use citegraph_graph::{BuildParams, PageRankConfig, DEFAULT_DAMPING_SWEEP, DEFAULT_TOP_K};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "citegraph.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no input files configured")]
    NoInputs,
    #[error("start_year {start} is after end_year {end}")]
    YearRange { start: i64, end: i64 },
    #[error("damping factor {0} must be strictly between 0 and 1")]
    Damping(f64),
    #[error("tolerance {0} must be positive")]
    Tolerance(f64),
    #[error("max_iterations must be at least 1")]
    NoIterations,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub inputs: Vec<PathBuf>,
    pub min_citations: i64,
    pub start_year: i64,
    pub end_year: i64,
    pub damping: f64,
    pub damping_sweep: Vec<f64>,
    pub top_k: usize,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub topics: Vec<String>,
    pub store_path: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let build = BuildParams::default();
        let rank = PageRankConfig::default();
        Self {
            inputs: (0..4)
                .map(|i| PathBuf::from(format!("dblp.v10/dblp-ref/dblp-ref-{}.json", i)))
                .collect(),
            min_citations: build.min_citations,
            start_year: build.start_year,
            end_year: build.end_year,
            damping: rank.damping,
            damping_sweep: DEFAULT_DAMPING_SWEEP.to_vec(),
            top_k: DEFAULT_TOP_K,
            tolerance: rank.tolerance,
            max_iterations: rank.max_iterations,
            topics: ["security", "hashing", "streaming", "timeseries", "search"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            store_path: PathBuf::from(".citegraph/store"),
        }
    }
}

impl AnalysisConfig {
    /// Loads a config file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the config as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, text).map_err(io_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inputs.is_empty() {
            return Err(ConfigError::NoInputs);
        }
        if self.start_year > self.end_year {
            return Err(ConfigError::YearRange {
                start: self.start_year,
                end: self.end_year,
            });
        }
        for &d in std::iter::once(&self.damping).chain(&self.damping_sweep) {
            if !(d > 0.0 && d < 1.0) {
                return Err(ConfigError::Damping(d));
            }
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(ConfigError::Tolerance(self.tolerance));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::NoIterations);
        }
        Ok(())
    }

    pub fn build_params(&self) -> BuildParams {
        BuildParams {
            min_citations: self.min_citations,
            start_year: self.start_year,
            end_year: self.end_year,
        }
    }

    pub fn pagerank(&self) -> PageRankConfig {
        PageRankConfig {
            damping: self.damping,
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
        }
    }
}
