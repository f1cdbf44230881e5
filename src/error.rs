use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed input '{input}': {message}")]
    Format { input: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),
}

impl MergeError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        MergeError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn format(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        MergeError::Format {
            input: path.as_ref().display().to_string(),
            message: message.into(),
        }
    }

    /// A required column is absent from an in-memory table.
    pub fn missing_column(table: &str, column: &str) -> Self {
        MergeError::Format {
            input: format!("{} table", table),
            message: format!("column '{}' not found", column),
        }
    }

    /// Maps a `csv` failure onto the taxonomy: underlying I/O stays `Io`,
    /// everything else is a `Format` problem with the input.
    pub fn from_csv(path: impl AsRef<Path>, err: csv::Error) -> Self {
        let path = path.as_ref();
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(source) => MergeError::io(path, source),
            _ => MergeError::format(path, message),
        }
    }
}

pub type Result<T> = std::result::Result<T, MergeError>;
