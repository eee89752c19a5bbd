//! # contract: seams between the components and the outside world
//!
//! Every component talks to third-party tools (conan, cmake, protoc, pip, git)
//! and to remote servers through the two traits defined here. Production code
//! uses [`crate::process::SystemRunner`] and [`crate::download::HttpFetcher`];
//! tests use the `mockall` mocks generated from these traits.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`; the mocks are exported with the
//!   `test-export-mocks` feature so integration tests under `tests/` can use them.

use std::path::Path;

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::Result;
use crate::process::ToolCommand;

/// Runs external tools synchronously, one at a time.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait CommandRunner {
    /// Runs the command to completion; a non-zero exit is an error.
    fn run(&self, command: &ToolCommand) -> Result<()>;

    /// Runs the command and returns its stdout; a non-zero exit is an error.
    fn output(&self, command: &ToolCommand) -> Result<String>;
}

/// Downloads remote files (proto contracts, vspec files) to local paths.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Downloads `uri` to `local_path`, creating parent directories.
    async fn download(&self, uri: &str, local_path: &Path) -> Result<()>;
}
