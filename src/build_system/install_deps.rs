use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::info;

use super::{build_folder, load_toolchain, profiles_dir, BuildVariant};
use crate::arch;
use crate::config::VelocitasEnv;
use crate::contract::CommandRunner;
use crate::error::Result;
use crate::process::ToolCommand;
use crate::util;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallDepsOptions {
    pub variant: BuildVariant,
    /// Rebuild every dependency from source instead of only missing binaries.
    pub build_all_deps: bool,
    pub toolchain: Option<PathBuf>,
    pub build_arch: String,
    pub host_arch: String,
}

/// Environment pointing CMake and the compilers at the GNU cross toolchain of
/// `host_arch`.
pub fn cross_compiler_env(host_arch: &str) -> Vec<(String, String)> {
    let toolchain = format!("/usr/bin/{host_arch}-linux-gnu");
    let build_host = format!("{host_arch}-linux-gnu");
    vec![
        ("CONAN_CMAKE_FIND_ROOT_PATH".into(), toolchain.clone()),
        ("CONAN_CMAKE_SYSROOT".into(), toolchain),
        ("CC".into(), format!("{build_host}-gcc")),
        ("CXX".into(), format!("{build_host}-g++")),
    ]
}

/// `conan install` of the workspace's dependencies into the build folder.
pub fn conan_install_command(
    env: &VelocitasEnv,
    options: &InstallDepsOptions,
    toolchain_env: Option<&BTreeMap<String, String>>,
) -> Result<ToolCommand> {
    let workspace = env.safe_workspace_dir();
    let profiles = profiles_dir(env)?;
    let variant = options.variant.as_str();
    let build_profile = profiles.join(arch::profile_name(&options.build_arch, variant)?);

    let (host_arch, host_config, extra_env) = match toolchain_env {
        Some(vars) => {
            let target = vars
                .get("OECORE_TARGET_ARCH")
                .map(|a| a.trim())
                .unwrap_or(options.build_arch.as_str());
            let host_arch = arch::valid_arch(target)?.to_string();
            let host_config = vec![
                "-s:h".to_string(),
                format!("arch={}", arch::conan_arch(&host_arch)?),
                "-s:h".to_string(),
                format!("arch_build={}", arch::conan_arch(&options.build_arch)?),
            ];
            let extra_env: Vec<(String, String)> =
                vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            (host_arch, host_config, extra_env)
        }
        None => {
            let host_profile = profiles.join(arch::profile_name(&options.host_arch, variant)?);
            let host_config = vec!["-pr:h".to_string(), host_profile.to_string_lossy().into_owned()];
            let extra_env = cross_compiler_env(&options.host_arch);
            (options.host_arch.clone(), host_config, extra_env)
        }
    };

    let deps_to_build = if options.build_all_deps { "*" } else { "missing" };
    Ok(ToolCommand::new("conan")
        .arg("install")
        .args(host_config)
        .arg("-pr:b")
        .path_arg(&build_profile)
        .args(["--build", deps_to_build])
        .path_arg(&workspace)
        .envs(extra_env)
        .current_dir(build_folder(&workspace, &options.build_arch, &host_arch)))
}

pub fn install_deps_via_conan(
    env: &VelocitasEnv,
    runner: &dyn CommandRunner,
    options: &InstallDepsOptions,
) -> Result<()> {
    let toolchain_env = match &options.toolchain {
        Some(file) => Some(load_toolchain(runner, file)?),
        None => None,
    };
    let command = conan_install_command(env, options, toolchain_env.as_ref())?;
    if let Some(dir) = &command.cwd {
        util::create_dir_all(dir)?;
    }
    runner.run(&command)?;
    info!(variant = %options.variant, host_arch = %options.host_arch, "Installed dependencies");
    Ok(())
}

pub fn run(env: &VelocitasEnv, runner: &dyn CommandRunner, options: &InstallDepsOptions) -> Result<()> {
    runner.run(&ToolCommand::new("conan").args(["config", "set", "general.revisions_enabled=1"]))?;
    install_deps_via_conan(env, runner, options)
}
