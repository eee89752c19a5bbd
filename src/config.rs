use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::manifest::AppManifest;

pub const WORKSPACE_DIR: &str = "VELOCITAS_WORKSPACE_DIR";
pub const CACHE_DIR: &str = "VELOCITAS_CACHE_DIR";
pub const PACKAGE_DIR: &str = "VELOCITAS_PACKAGE_DIR";
pub const APP_MANIFEST: &str = "VELOCITAS_APP_MANIFEST";
pub const CACHE_DATA: &str = "VELOCITAS_CACHE_DATA";
pub const LANGUAGE: &str = "language";

/// Snapshot of the variables the `velocitas` CLI hands to a component.
///
/// Components receive everything through the environment: the well-known
/// `VELOCITAS_*` directories plus the component's own variables (`language`,
/// `sdkGitRepo`, `generatedModelPath`, ...). Taking a snapshot keeps the
/// components free of global state; tests build one with [`VelocitasEnv::from_vars`].
#[derive(Debug, Clone, Default)]
pub struct VelocitasEnv {
    vars: HashMap<String, String>,
}

impl VelocitasEnv {
    pub fn from_env() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_vars<K, V, I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns a copy with `name` set to `value`.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Value of `name`; empty values count as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| Error::MissingEnv(name.to_string()))
    }

    pub fn vars(&self) -> &HashMap<String, String> {
        &self.vars
    }

    pub fn workspace_dir(&self) -> Result<PathBuf> {
        self.require(WORKSPACE_DIR).map(|v| PathBuf::from(v.trim()))
    }

    /// Workspace directory, falling back to the current directory when the
    /// variable is not set (the build scripts may run outside the CLI).
    pub fn safe_workspace_dir(&self) -> PathBuf {
        match self.workspace_dir() {
            Ok(dir) => dir,
            Err(_) => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        self.require(CACHE_DIR).map(PathBuf::from)
    }

    pub fn package_dir(&self) -> Result<PathBuf> {
        self.require(PACKAGE_DIR).map(PathBuf::from)
    }

    pub fn programming_language(&self) -> Result<&str> {
        self.require(LANGUAGE)
    }

    pub fn app_manifest(&self) -> Result<AppManifest> {
        AppManifest::from_json(self.require(APP_MANIFEST)?)
    }

    /// Values previously written by components through the cache protocol.
    pub fn cache_data(&self) -> Result<Value> {
        Ok(serde_json::from_str(self.require(CACHE_DATA)?)?)
    }

    pub fn trace_loaded(&self) {
        info!(
            workspace_dir = self.get(WORKSPACE_DIR).unwrap_or("<unset>"),
            cache_dir = self.get(CACHE_DIR).unwrap_or("<unset>"),
            package_dir = self.get(PACKAGE_DIR).unwrap_or("<unset>"),
            language = self.get(LANGUAGE).unwrap_or("<unset>"),
            "Loaded Velocitas environment"
        );
        debug!(vars = self.vars.len(), "Environment snapshot size");
    }
}
