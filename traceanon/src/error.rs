use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("{path}:{line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },

    #[error("invalid range: lower bound {lower} exceeds upper bound {upper}")]
    InvalidRange { lower: String, upper: String },
}
