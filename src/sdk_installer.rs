//! # sdk_installer: installs the core SDK and additional packages from git
//!
//! A package is only installed when the app depends on it and the required
//! version is not installed yet. Installation clones the package's git
//! repository into the project cache and hands the checkout to the
//! language's package manager.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::VelocitasEnv;
use crate::conanfile;
use crate::contract::CommandRunner;
use crate::download::force_clone_repo;
use crate::error::{Error, Result};
use crate::process::ToolCommand;
use crate::variables::ProjectVariables;

pub const SUPPORTED_LANGUAGES: [&str; 2] = ["cpp", "python"];

/// Package manager of one programming language.
pub trait PackageManager {
    /// Whether `name` (in `version`, when given) is installed.
    fn is_package_installed(&self, name: &str, version: Option<&str>) -> Result<bool>;

    /// Version of `name` the app requires, `None` when it does not depend on it.
    fn required_package_version(&self, name: &str) -> Result<Option<String>>;

    /// Installs the package whose sources are at `path`.
    fn install_local_package(&self, path: &Path) -> Result<()>;
}

pub struct Conan<'a> {
    runner: &'a dyn CommandRunner,
    env: &'a VelocitasEnv,
}

impl<'a> Conan<'a> {
    pub fn new(runner: &'a dyn CommandRunner, env: &'a VelocitasEnv) -> Self {
        Self { runner, env }
    }
}

impl PackageManager for Conan<'_> {
    fn is_package_installed(&self, name: &str, version: Option<&str>) -> Result<bool> {
        let pattern = match version {
            Some(version) => format!("{name}@{version}"),
            None => name.to_string(),
        };
        let output = self
            .runner
            .output(&ToolCommand::new("conan").args(["search", pattern.as_str()]))?;
        Ok(output.contains("Existing package recipes:"))
    }

    fn required_package_version(&self, name: &str) -> Result<Option<String>> {
        conanfile::required_version_in_workspace(&self.env.workspace_dir()?, name)
    }

    fn install_local_package(&self, path: &Path) -> Result<()> {
        self.runner.run(
            &ToolCommand::new("conan")
                .args(["export", "."])
                .current_dir(path)
                .quiet(),
        )
    }
}

pub struct Pip<'a> {
    runner: &'a dyn CommandRunner,
    env: &'a VelocitasEnv,
}

impl<'a> Pip<'a> {
    pub fn new(runner: &'a dyn CommandRunner, env: &'a VelocitasEnv) -> Self {
        Self { runner, env }
    }
}

/// Whether `pip list` output names `name`, optionally in `version`. `-` and
/// `_` are treated as equal, as pip does.
pub fn pip_list_contains(output: &str, name: &str, version: Option<&str>) -> bool {
    let name = name.replace('-', "_");
    let mut found = false;
    for line in output.lines() {
        let mut columns = line.split_whitespace();
        let (Some(package), installed) = (columns.next(), columns.next()) else {
            continue;
        };
        if package.replace('-', "_").starts_with(&name) {
            found = match version {
                Some(version) => installed == Some(version),
                None => true,
            };
        }
    }
    found
}

/// Version pinned for `name` in a requirements file. `-` and `_` are treated
/// as equal; the last matching line wins.
pub fn pinned_version(requirements: &str, name: &str) -> Option<String> {
    let name = name.replace('-', "_");
    requirements
        .lines()
        .filter(|line| line.replace('-', "_").starts_with(&name))
        .filter_map(|line| line.split_once("=="))
        .map(|(_, version)| version.trim().to_string())
        .last()
}

impl PackageManager for Pip<'_> {
    fn is_package_installed(&self, name: &str, version: Option<&str>) -> Result<bool> {
        let output = self
            .runner
            .output(&ToolCommand::new("pip").args(["list", name]))?;
        Ok(pip_list_contains(&output, name, version))
    }

    fn required_package_version(&self, name: &str) -> Result<Option<String>> {
        let path = self
            .env
            .workspace_dir()?
            .join("app")
            .join("requirements-velocitas.txt");
        if !path.exists() {
            return Ok(None);
        }
        let requirements = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        Ok(pinned_version(&requirements, name))
    }

    fn install_local_package(&self, path: &Path) -> Result<()> {
        self.runner.run(
            &ToolCommand::new("python")
                .args(["-m", "pip", "install", "."])
                .current_dir(path)
                .quiet(),
        )
    }
}

pub fn package_manager<'a>(
    language: &str,
    runner: &'a dyn CommandRunner,
    env: &'a VelocitasEnv,
) -> Result<Box<dyn PackageManager + 'a>> {
    match language {
        "cpp" => Ok(Box::new(Conan::new(runner, env))),
        "python" => Ok(Box::new(Pip::new(runner, env))),
        other => Err(Error::UnsupportedLanguage(other.to_string())),
    }
}

/// Git ref of a release: `1.2.3` -> `v1.2.3`; branch names, SHAs and
/// already prefixed tags are returned unchanged.
pub fn tag_or_branch_name(git_ref: &str) -> String {
    static VERSION: OnceLock<Regex> = OnceLock::new();
    let pattern = VERSION.get_or_init(|| Regex::new(r"^[0-9]+(\.[0-9]+){0,2}$").expect("valid regex"));
    if pattern.is_match(git_ref) {
        format!("v{git_ref}")
    } else {
        git_ref.to_string()
    }
}

/// A package to install from a git repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSpec {
    pub id: String,
    pub git_repo: String,
    /// Branch, tag or SHA; `auto` derives a tag from the required version.
    pub git_ref: String,
    pub package_subdirectory: String,
}

/// What [`install_package_if_required`] ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    NotRequired,
    AlreadyInstalled,
    Installed { version: String },
}

pub fn install_package_if_required(
    env: &VelocitasEnv,
    runner: &dyn CommandRunner,
    manager: &dyn PackageManager,
    package: &PackageSpec,
    language: &str,
) -> Result<InstallOutcome> {
    let Some(version) = manager.required_package_version(&package.id)? else {
        println!(
            "No dependency on {:?} detected -> Skipping installation.",
            package.id
        );
        return Ok(InstallOutcome::NotRequired);
    };

    if manager.is_package_installed(&package.id, Some(&version))? {
        println!("Correct version of {:?} already installed!", package.id);
        return Ok(InstallOutcome::AlreadyInstalled);
    }

    let variables = ProjectVariables::new(env.vars().clone());
    let git_url = variables.replace_occurrences(&package.git_repo)?;
    let git_ref = match package.git_ref.as_str() {
        "auto" => tag_or_branch_name(&version),
        other => other.to_string(),
    };
    debug!(package = %package.id, %git_ref, "Resolved git ref");

    let clone_dir = env
        .cache_dir()?
        .join(format!("{}-{}", package.id, language));
    force_clone_repo(runner, &git_url, &git_ref, &clone_dir)?;

    println!("Installing package version {version:?} from {git_url:?}...");
    manager.install_local_package(&clone_dir.join(&package.package_subdirectory))?;
    info!(package = %package.id, %version, "Installed package");
    Ok(InstallOutcome::Installed { version })
}

/// Core SDK package of `language`.
pub fn core_sdk_spec(env: &VelocitasEnv, language: &str) -> Result<PackageSpec> {
    Ok(PackageSpec {
        id: match language {
            "cpp" => "vehicle-app-sdk",
            _ => "velocitas_sdk",
        }
        .to_string(),
        git_repo: env.require("sdkGitRepo")?.to_string(),
        git_ref: env.require("sdkGitRef")?.to_string(),
        package_subdirectory: env.require("sdkPackageSubdirectory")?.to_string(),
    })
}

/// Installs the `additionalPackages` and then the core SDK of the project's
/// language.
pub fn run(env: &VelocitasEnv, runner: &dyn CommandRunner) -> Result<()> {
    let language = env.programming_language()?;
    if !SUPPORTED_LANGUAGES.contains(&language) {
        println!("No core SDK available yet for programming language {language:?}");
        return Ok(());
    }

    let manager = package_manager(language, runner, env)?;
    let additional: Vec<PackageSpec> = serde_json::from_str(env.require("additionalPackages")?)?;
    for package in &additional {
        install_package_if_required(env, runner, manager.as_ref(), package, language)?;
    }

    let core = core_sdk_spec(env, language)?;
    install_package_if_required(env, runner, manager.as_ref(), &core, language)?;
    Ok(())
}
