use std::path::PathBuf;

/// Errors raised by the parsing layers and external tool wrappers.
///
/// Pipeline stages wrap these with `anyhow::Context` to name the stage and the
/// table they were working on; only `main` decides to abort.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {source} ({path})")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("missing {what}: {path} does not exist")]
    MissingInput { what: &'static str, path: PathBuf },

    #[error("column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid source layout '{spec}': {reason}")]
    Layout { spec: String, reason: String },

    #[error("table error in {path}: {source}")]
    Table { source: csv::Error, path: PathBuf },

    #[error("FASTA error in {path}: {reason}")]
    Fasta { path: PathBuf, reason: String },

    #[error("{tool} failed ({status}): {stderr}")]
    ExternalTool {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("read {read_id} reached role ordering with {rows} selected transcripts, expected 2")]
    RoleConflict { read_id: String, rows: usize },

    #[error("no rows left after {stage}: {reason}")]
    Empty { stage: &'static str, reason: String },
}

impl Error {
    /// Convenience for wrapping an `io::Error` with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }

    pub fn table(source: csv::Error, path: impl Into<PathBuf>) -> Self {
        Self::Table {
            source,
            path: path.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
