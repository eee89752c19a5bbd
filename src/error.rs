//! Error type shared by all components.
//!
//! Components never retry: the first failure is returned to the CLI boundary,
//! logged, and turned into a non-zero exit code.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("environment variable {0:?} not set")]
    MissingEnv(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to launch `{command}`: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// `code` is -1 when the process was terminated by a signal.
    #[error("`{command}` exited with code {code}")]
    CommandFailed { command: String, code: i32 },

    #[error("{0} is missing")]
    ToolNotFound(String),

    #[error("no {kind} found in proto file {}", .path.display())]
    MissingProtoDeclaration { kind: &'static str, path: PathBuf },

    #[error("unsupported architecture: {0}")]
    UnsupportedArchitecture(String),

    #[error("no support available for programming language {0:?}")]
    UnsupportedLanguage(String),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("no requirement on {0:?} found")]
    MissingRequirement(String),

    #[error("app manifest: {0}")]
    Manifest(String),

    #[error("variable {0:?} is not defined")]
    UnknownVariable(String),

    #[error("malformed line {line:?} in {}", .path.display())]
    MalformedLine { path: PathBuf, line: String },

    #[error("download of {uri} failed: {source}")]
    Download {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("download of {uri} returned HTTP {status}")]
    DownloadStatus { uri: String, status: u16 },
}

impl Error {
    /// Wraps an I/O error together with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
