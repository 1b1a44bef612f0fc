pub mod caret;
pub mod dot;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::graph::Graph;

pub use caret::{ALL_GRAPH, parse_architecture};
pub use dot::parse_dot;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("DOT syntax error on line {line}: {message}")]
    Dot { line: usize, message: String },
    #[error("invalid architecture file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("named path `{path}` not found (available: {})", .available.join(", "))]
    UnknownPath { path: String, available: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Dot,
    CaretYaml,
}

impl SourceFormat {
    /// `.dot` and `.gv` files are DOT; anything else is read as a CARET
    /// architecture file.
    pub fn from_path(path: &Path) -> Self {
        let is_dot = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "dot" | "gv"))
            .unwrap_or(false);
        if is_dot { Self::Dot } else { Self::CaretYaml }
    }
}

/// Reads a graph from `path`. `target_path` only applies to architecture
/// files.
pub fn load_graph(path: &Path, target_path: &str) -> Result<Graph, SourceError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let graph = match SourceFormat::from_path(path) {
        SourceFormat::Dot => parse_dot(&contents)?,
        SourceFormat::CaretYaml => parse_architecture(&contents, target_path)?,
    };
    log::info!(
        "loaded {} ({} nodes, {} edges)",
        path.display(),
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}
