use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
    #[error("Failed to write input file '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid parameter '{parameter}' for stage '{stage}': {reason}")]
    InvalidParameter {
        stage: String,
        parameter: &'static str,
        reason: String,
    },

    #[error("Stage name '{name}' is used more than once; each stage needs its own input file")]
    DuplicateStageName { name: String },

    #[error("Failed to format stage '{stage}': {source}")]
    Format {
        stage: String,
        #[source]
        source: std::io::Error,
    },
}
