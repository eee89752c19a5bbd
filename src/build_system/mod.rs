//! # build_system: CMake/Conan build of C++ vehicle apps
//!
//! `install_deps` resolves the app's Conan dependencies into the build folder,
//! `build` configures and builds the app with CMake and Ninja. Both support
//! cross compilation, either to another Linux architecture via the shipped
//! Conan profiles and CMake toolchain files, or through a custom toolchain
//! environment script (e.g. a Yocto SDK).

pub mod build;
pub mod install_deps;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::conanfile;
use crate::config::VelocitasEnv;
use crate::contract::CommandRunner;
use crate::error::{Error, Result};
use crate::process::ToolCommand;

/// Location of this component inside the package directory.
const COMPONENT_SRC: [&str; 3] = ["build-system", "cpp-cmake-conan", "src"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildVariant {
    #[default]
    Debug,
    Release,
}

impl BuildVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildVariant::Debug => "debug",
            BuildVariant::Release => "release",
        }
    }

    /// Variant selected by `-d/--debug` and `-r/--release`; `default` when
    /// neither or both are given.
    pub fn from_flags(debug: bool, release: bool, default: BuildVariant) -> Self {
        match (debug, release) {
            (true, false) => BuildVariant::Debug,
            (false, true) => BuildVariant::Release,
            _ => default,
        }
    }
}

impl fmt::Display for BuildVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `build` for native builds, `build_linux_<host>` when cross compiling.
pub fn build_folder(workspace_dir: &Path, build_arch: &str, host_arch: &str) -> PathBuf {
    if build_arch == host_arch {
        workspace_dir.join("build")
    } else {
        workspace_dir.join(format!("build_linux_{host_arch}"))
    }
}

/// Tool directories Conan recorded in the build folder, `;`-separated for CMake.
pub fn build_tools_path(build_folder: &Path) -> Result<String> {
    Ok(conanfile::build_info_paths(build_folder)?.join(";"))
}

/// `<package>/build-system/cpp-cmake-conan/src`.
pub fn component_src_dir(env: &VelocitasEnv) -> Result<PathBuf> {
    Ok(COMPONENT_SRC
        .iter()
        .fold(env.package_dir()?, |dir, part| dir.join(part)))
}

pub fn profiles_dir(env: &VelocitasEnv) -> Result<PathBuf> {
    Ok(component_src_dir(env)?.join(".conan").join("profiles"))
}

pub fn cmake_toolchains_dir(env: &VelocitasEnv) -> Result<PathBuf> {
    Ok(component_src_dir(env)?.join("cmake"))
}

/// Parses `env` output (`KEY=VALUE` per line) into a map.
pub fn parse_env_output(output: &str) -> BTreeMap<String, String> {
    output
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Environment a toolchain script sets up, obtained by sourcing it in a clean
/// shell. The result is passed to the tools instead of altering our own
/// environment.
pub fn load_toolchain(runner: &dyn CommandRunner, toolchain_file: &Path) -> Result<BTreeMap<String, String>> {
    if !toolchain_file.exists() {
        return Err(Error::FileNotFound(toolchain_file.to_path_buf()));
    }
    println!("Loading toolchain file {}", toolchain_file.display());

    let output = runner.output(&ToolCommand::new("env").args([
        "-i".to_string(),
        "bash".to_string(),
        "-c".to_string(),
        format!("source {} && env", toolchain_file.display()),
    ]))?;
    let vars = parse_env_output(&output);
    for (key, value) in &vars {
        debug!(%key, %value, "Toolchain variable");
    }
    Ok(vars)
}
