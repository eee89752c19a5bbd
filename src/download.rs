use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::contract::{CommandRunner, Fetcher};
use crate::error::{Error, Result};
use crate::process::ToolCommand;
use crate::util;

/// Fetches files over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn download(&self, uri: &str, local_path: &Path) -> Result<()> {
        println!("Downloading file from {uri:?} to {local_path:?}");

        let response = self.client.get(uri).send().await.map_err(|e| {
            error!(error = ?e, uri, "Request failed");
            Error::Download {
                uri: uri.to_string(),
                source: e,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, uri, "Server returned error status");
            return Err(Error::DownloadStatus {
                uri: uri.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(parent) = local_path.parent() {
            util::create_dir_all(parent)?;
        }
        let mut file = tokio::fs::File::create(local_path)
            .await
            .map_err(|e| Error::io(local_path, e))?;

        let mut written = 0usize;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| Error::Download {
                uri: uri.to_string(),
                source: e,
            })?;
            written += chunk.len();
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io(local_path, e))?;
        }
        file.flush().await.map_err(|e| Error::io(local_path, e))?;

        info!(uri, path = %local_path.display(), bytes = written, "Downloaded file");
        Ok(())
    }
}

/// Clones `git_ref` of `git_url` into `output_dir`, removing whatever was
/// there before, and marks the clone as a safe directory for git.
pub fn force_clone_repo(
    runner: &dyn CommandRunner,
    git_url: &str,
    git_ref: &str,
    output_dir: &Path,
) -> Result<()> {
    if output_dir.exists() {
        util::remove_dir_if_exists(output_dir)?;
        debug!(path = %output_dir.display(), "Removed existing clone directory");
    }

    runner.run(
        &ToolCommand::new("git")
            .args(["clone", "--depth", "1", "-b", git_ref, git_url])
            .path_arg(output_dir)
            .quiet(),
    )?;
    info!(
        repo_url = git_url,
        reference = git_ref,
        path = %output_dir.display(),
        "Successfully cloned git repository"
    );

    runner.run(
        &ToolCommand::new("git")
            .args(["config", "--global", "--add", "safe.directory"])
            .path_arg(output_dir)
            .quiet(),
    )
}
