//! Boilerplate files rendered into generated SDK packages.
//!
//! Templates use `${{ name }}` placeholders. They ship inside the binary so a
//! component works no matter where it was installed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::util;

/// A named, embedded directory of template files.
#[derive(Debug, Clone, Copy)]
pub struct TemplateSet {
    name: &'static str,
    files: &'static [(&'static str, &'static str)],
}

pub const CPP_TEMPLATES: TemplateSet = TemplateSet {
    name: "cpp",
    files: &[
        ("CMakeLists.txt", include_str!("../templates/cpp/CMakeLists.txt")),
        ("conanfile.py", include_str!("../templates/cpp/conanfile.py")),
        (
            "ServiceNameServiceClientFactory.h",
            include_str!("../templates/cpp/ServiceNameServiceClientFactory.h"),
        ),
        (
            "ServiceNameServiceClientFactory.cc",
            include_str!("../templates/cpp/ServiceNameServiceClientFactory.cc"),
        ),
        (
            "ServiceNameServiceServerFactory.h",
            include_str!("../templates/cpp/ServiceNameServiceServerFactory.h"),
        ),
        (
            "ServiceNameServiceServerFactory.cc",
            include_str!("../templates/cpp/ServiceNameServiceServerFactory.cc"),
        ),
        (
            "ServiceNameServiceImpl.h",
            include_str!("../templates/cpp/ServiceNameServiceImpl.h"),
        ),
        (
            "ServiceNameServiceImpl.cpp",
            include_str!("../templates/cpp/ServiceNameServiceImpl.cpp"),
        ),
    ],
};

pub const PYTHON_TEMPLATES: TemplateSet = TemplateSet {
    name: "python",
    files: &[
        ("pyproject.toml", include_str!("../templates/python/pyproject.toml")),
        (
            "ServiceNameServiceClientFactory.py",
            include_str!("../templates/python/ServiceNameServiceClientFactory.py"),
        ),
        (
            "ServiceNameServiceServerFactory.py",
            include_str!("../templates/python/ServiceNameServiceServerFactory.py"),
        ),
        (
            "service_name_service_impl.py",
            include_str!("../templates/python/service_name_service_impl.py"),
        ),
    ],
};

impl TemplateSet {
    pub fn get(&self, file: &str) -> Result<&'static str> {
        self.files
            .iter()
            .find(|(name, _)| *name == file)
            .map(|(_, contents)| *contents)
            .ok_or_else(|| Error::FileNotFound(Path::new(self.name).join(file)))
    }
}

/// Copy specification of a single template file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopySpec {
    pub source: String,
    pub target: Option<PathBuf>,
}

impl CopySpec {
    /// Copies `source` to the same relative path in the target directory.
    pub fn same(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: None,
        }
    }

    pub fn to(source: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: Some(target.into()),
        }
    }

    pub fn target(&self) -> PathBuf {
        self.target
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.source))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVariables(BTreeMap<String, String>);

impl TemplateVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Replaces every `${{ name }}` of a known variable; unknown
    /// placeholders are left as they are.
    pub fn render(&self, text: &str) -> String {
        self.0.iter().fold(text.to_string(), |acc, (name, value)| {
            acc.replace(&format!("${{{{ {name} }}}}"), value)
        })
    }
}

/// Renders every spec of `set` into `target_dir`.
pub fn copy_templates(
    set: &TemplateSet,
    target_dir: &Path,
    specs: &[CopySpec],
    variables: &TemplateVariables,
) -> Result<()> {
    for spec in specs {
        let template = set.get(&spec.source)?;
        let target = target_dir.join(spec.target());
        if let Some(parent) = target.parent() {
            util::create_dir_all(parent)?;
        }
        fs::write(&target, variables.render(template)).map_err(|e| Error::io(&target, e))?;
        debug!(template = %spec.source, set = set.name, target = %target.display(), "Rendered template");
    }
    Ok(())
}
