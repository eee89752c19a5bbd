//! Registers the additional Conan remotes listed in the workspace's
//! `.conanremotes` file, authenticating with values from `.credentials`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::VelocitasEnv;
use crate::contract::CommandRunner;
use crate::error::{Error, Result};
use crate::process::ToolCommand;
use crate::variables::ProjectVariables;

pub const REMOTES_FILE: &str = ".conanremotes";
pub const CREDENTIALS_FILE: &str = ".credentials";

/// One entry of `.conanremotes`. `user` and `token` may reference variables
/// such as `${{ CONAN_TOKEN }}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConanRemote {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Parses `KEY=VALUE` lines; keys and values are trimmed and blank lines
/// skipped.
pub fn parse_credentials(path: &Path, text: &str) -> Result<HashMap<String, String>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.split_once('=')
                .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
                .ok_or_else(|| Error::MalformedLine {
                    path: path.to_path_buf(),
                    line: line.to_string(),
                })
        })
        .collect()
}

pub fn read_credentials_file(workspace_dir: &Path) -> Result<HashMap<String, String>> {
    let path = workspace_dir.join(CREDENTIALS_FILE);
    if !path.exists() {
        return Err(Error::FileNotFound(path));
    }
    let text = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    parse_credentials(&path, &text)
}

pub fn conan_enable_revisions(runner: &dyn CommandRunner) -> Result<()> {
    runner.run(&ToolCommand::new("conan").args(["config", "set", "general.revisions_enabled=1"]))
}

/// Adds `remote` as the primary remote and logs in when a token is given.
pub fn setup_conan_remote(
    runner: &dyn CommandRunner,
    remote_id: &str,
    remote_url: &str,
    token: Option<&str>,
    user: Option<&str>,
) -> Result<()> {
    println!("Adding conan remote: {remote_id:?}");
    runner.run(
        &ToolCommand::new("conan").args(["remote", "add", "-f", remote_id, remote_url, "--insert", "0"]),
    )?;

    let Some(token) = token.filter(|t| !t.is_empty()) else {
        println!("Remote {remote_id:?} uses anonymous user");
        return Ok(());
    };

    let mut login = ToolCommand::new("conan").args(["user", "-p", token, "-r", remote_id]);
    if let Some(user) = user {
        login = login.arg(user);
    }
    runner.run(&login)?;
    println!("Remote {remote_id:?} uses user {:?}", user.unwrap_or_default());
    Ok(())
}

pub fn add_conan_remotes(
    env: &VelocitasEnv,
    runner: &dyn CommandRunner,
    remotes: &[ConanRemote],
) -> Result<()> {
    let mut variables = ProjectVariables::new(env.vars().clone());
    variables.extend(read_credentials_file(&env.workspace_dir()?)?);

    for remote in remotes {
        let user = remote
            .user
            .as_deref()
            .map(|u| variables.replace_occurrences(u))
            .transpose()?;
        let token = remote
            .token
            .as_deref()
            .map(|t| variables.replace_occurrences(t))
            .transpose()?;
        setup_conan_remote(runner, &remote.id, &remote.url, token.as_deref(), user.as_deref())?;
    }
    info!(count = remotes.len(), "Configured Conan remotes");
    Ok(())
}

/// Does nothing unless the workspace has a `.conanremotes` file.
pub fn run(env: &VelocitasEnv, runner: &dyn CommandRunner) -> Result<()> {
    let path = env.workspace_dir()?.join(REMOTES_FILE);
    if !path.exists() {
        debug!(path = %path.display(), "No additional Conan remotes");
        return Ok(());
    }

    let text = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    let remotes: Vec<ConanRemote> = serde_json::from_str(&text)?;

    conan_enable_revisions(runner)?;
    add_conan_remotes(env, runner, &remotes)
}
