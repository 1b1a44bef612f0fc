use thiserror::Error;

use crate::graph::RelabelError;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("failed to start layout program `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("layout program `{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("unexpected output from `{program}`: {line}")]
    MalformedOutput { program: String, line: String },
    #[error("layout engine returned no position for node `{node}`")]
    MissingNode { node: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Relabel(#[from] RelabelError),
}
