use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

fn package_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^package\s+([A-Za-z_][\w.]*)\s*;").expect("valid regex"))
}

fn service_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^service\s+([A-Za-z_]\w*)").expect("valid regex"))
}

/// A `.proto` service contract. Only the two scalars the generators need are
/// extracted; everything else is left to `protoc`.
#[derive(Debug, Clone)]
pub struct ProtoFile {
    path: PathBuf,
    contents: String,
}

impl ProtoFile {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        Ok(Self { path, contents })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the proto file, the default include path.
    pub fn parent_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Package declared by the top-level `package` statement.
    pub fn package(&self) -> Result<String> {
        self.capture(package_pattern(), "package")
    }

    /// Name of the first declared `service`.
    pub fn service_name(&self) -> Result<String> {
        self.capture(service_pattern(), "service")
    }

    fn capture(&self, pattern: &Regex, kind: &'static str) -> Result<String> {
        pattern
            .captures(&self.contents)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| Error::MissingProtoDeclaration {
                kind,
                path: self.path.clone(),
            })
    }
}
