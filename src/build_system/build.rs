use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;

use super::{build_folder, build_tools_path, cmake_toolchains_dir, load_toolchain, BuildVariant};
use crate::arch;
use crate::config::VelocitasEnv;
use crate::contract::CommandRunner;
use crate::error::Result;
use crate::process::ToolCommand;
use crate::util;

pub const CMAKE_EXECUTABLE: &str = "cmake";
pub const CONAN_EXECUTABLE: &str = "conan";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub variant: BuildVariant,
    pub build_arch: String,
    pub host_arch: String,
    /// CMake target, `all` by default.
    pub target: String,
    pub static_build: bool,
    pub toolchain: Option<PathBuf>,
    pub coverage: bool,
}

/// `-g [--coverage] (-s -O3 | -O0)`.
pub fn cxx_flags(variant: BuildVariant, coverage: bool) -> String {
    let mut flags = vec!["-g"];
    if coverage {
        flags.push("--coverage");
    }
    match variant {
        BuildVariant::Release => flags.extend(["-s", "-O3"]),
        BuildVariant::Debug => flags.push("-O0"),
    }
    flags.join(" ")
}

/// Resolved build settings: where to build and how to configure CMake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub host_arch: String,
    pub build_folder: PathBuf,
    pub cxx_flags: String,
    pub cmake_toolchain: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

pub fn plan_build(
    env: &VelocitasEnv,
    options: &BuildOptions,
    toolchain_env: Option<&BTreeMap<String, String>>,
) -> Result<BuildPlan> {
    let workspace = env.safe_workspace_dir();

    let (host_arch, cxx, mut cmake_toolchain, extra_env) = match toolchain_env {
        Some(vars) => {
            let target = vars
                .get("OECORE_TARGET_ARCH")
                .map(|a| a.trim())
                .unwrap_or(options.build_arch.as_str());
            let toolchain = vars
                .get("CMAKE_TOOLCHAIN_FILE")
                .map(|f| PathBuf::from(f.trim()));
            (
                arch::valid_arch(target)?.to_string(),
                vars.get("CXXFLAGS").cloned().unwrap_or_default(),
                toolchain,
                vars.iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<Vec<_>>(),
            )
        }
        None => (
            options.host_arch.clone(),
            cxx_flags(options.variant, options.coverage),
            None,
            Vec::new(),
        ),
    };

    if options.build_arch != host_arch && cmake_toolchain.is_none() {
        cmake_toolchain = Some(
            cmake_toolchains_dir(env)?.join(format!("{}_to_{host_arch}.cmake", options.build_arch)),
        );
    }

    Ok(BuildPlan {
        build_folder: build_folder(&workspace, &options.build_arch, &host_arch),
        host_arch,
        cxx_flags: cxx,
        cmake_toolchain,
        env: extra_env,
    })
}

pub fn configure_command(
    workspace_dir: &Path,
    options: &BuildOptions,
    plan: &BuildPlan,
    tools_path: &str,
) -> ToolCommand {
    let mut command = ToolCommand::new(CMAKE_EXECUTABLE)
        .args([
            "--no-warn-unused-cli".to_string(),
            "-DCMAKE_EXPORT_COMPILE_COMMANDS:BOOL=TRUE".to_string(),
            format!("-DCMAKE_BUILD_TYPE:STRING={}", options.variant),
            format!("-DBUILD_TOOLS_PATH:STRING=\"{tools_path}\""),
            format!(
                "-DSTATIC_BUILD:BOOL={}",
                if options.static_build { "TRUE" } else { "FALSE" }
            ),
        ]);
    if let Some(toolchain) = &plan.cmake_toolchain {
        command = command.arg(format!("-DCMAKE_TOOLCHAIN_FILE={}", toolchain.display()));
    }
    command
        .arg("-S")
        .path_arg(workspace_dir)
        .args(["-B.", "-G", "Ninja"])
        .arg(format!("-DCMAKE_CXX_FLAGS={}", plan.cxx_flags))
        .envs(plan.env.iter().cloned())
        .current_dir(&plan.build_folder)
}

pub fn build_command(options: &BuildOptions, plan: &BuildPlan) -> ToolCommand {
    ToolCommand::new(CMAKE_EXECUTABLE)
        .args(["--build", ".", "--config", options.variant.as_str(), "--target"])
        .arg(&options.target)
        .envs(plan.env.iter().cloned())
        .current_dir(&plan.build_folder)
}

pub fn print_build_info(runner: &dyn CommandRunner, options: &BuildOptions) -> Result<()> {
    let cmake_version = runner.output(&ToolCommand::new(CMAKE_EXECUTABLE).arg("--version"))?;
    let conan_version = runner.output(&ToolCommand::new(CONAN_EXECUTABLE).arg("--version"))?;

    println!("CMake version      {}", cmake_version.trim());
    println!("Conan version      {}", conan_version.trim());
    println!("Build arch         {}", options.build_arch);
    println!("Host arch          {}", options.host_arch);
    println!("Build variant      {}", options.variant);
    println!("Build target       {}", options.target);
    println!(
        "Static build       {}",
        if options.static_build { "yes" } else { "no" }
    );
    Ok(())
}

/// Configures and builds the workspace. The build folder must already hold
/// the output of `install-deps`.
pub fn build(env: &VelocitasEnv, runner: &dyn CommandRunner, options: &BuildOptions) -> Result<()> {
    let toolchain_env = match &options.toolchain {
        Some(file) => Some(load_toolchain(runner, file)?),
        None => None,
    };
    let plan = plan_build(env, options, toolchain_env.as_ref())?;
    util::create_dir_all(&plan.build_folder)?;

    let tools_path = build_tools_path(&plan.build_folder)?;
    let workspace = env.safe_workspace_dir();
    runner.run(&configure_command(&workspace, options, &plan, &tools_path))?;
    runner.run(&build_command(options, &plan))?;
    info!(build_target = %options.target, folder = %plan.build_folder.display(), "Build finished");
    Ok(())
}

pub fn run(env: &VelocitasEnv, runner: &dyn CommandRunner, options: &BuildOptions) -> Result<()> {
    print_build_info(runner, options)?;
    build(env, runner, options)
}
