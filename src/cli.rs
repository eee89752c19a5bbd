use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::arch;
use crate::build_system::build::{self, BuildOptions};
use crate::build_system::install_deps::{self, InstallDepsOptions};
use crate::build_system::BuildVariant;
use crate::config::VelocitasEnv;
use crate::conan_setup;
use crate::download::HttpFetcher;
use crate::grpc;
use crate::process::SystemRunner;
use crate::sdk_installer;
use crate::vehicle_model;

/// Development environment components of Velocitas vehicle apps.
#[derive(Parser)]
#[clap(
    name = "velocitas-components",
    version,
    about = "SDK installation, gRPC service SDK generation, CMake/Conan builds and vehicle model lifecycle for Velocitas apps"
)]
pub struct Cli {
    /// Show the output of the invoked tools and debug logs
    #[clap(short, long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CrossArgs {
    /// File (absolute path) defining a custom toolchain environment
    #[clap(long)]
    pub toolchain: Option<PathBuf>,

    /// Cross-compile for the given target architecture
    #[clap(short = 'x', long)]
    pub cross: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the targets of a C++ project with CMake
    Build {
        /// Build in debug mode (default)
        #[clap(short, long)]
        debug: bool,
        /// Build in release mode
        #[clap(short, long)]
        release: bool,
        /// Build only the given target instead of all targets
        #[clap(short, long, default_value = "all")]
        target: String,
        /// Link all dependencies statically
        #[clap(short, long = "static")]
        static_build: bool,
        #[clap(flatten)]
        cross: CrossArgs,
    },

    /// Install the Conan dependencies of a C++ project
    InstallDeps {
        /// Install dependencies in debug mode
        #[clap(short, long)]
        debug: bool,
        /// Install dependencies in release mode (default)
        #[clap(short, long)]
        release: bool,
        /// Rebuild all dependencies from source
        #[clap(long)]
        build_all_deps: bool,
        #[clap(flatten)]
        cross: CrossArgs,
    },

    /// Register the Conan remotes of the workspace's .conanremotes file
    ConanSetup,

    /// Install the core SDK and additional packages the app depends on
    SdkInstall,

    /// Generate service SDKs for the app's gRPC interfaces
    GrpcInterface,

    /// Resolve the vehicle signal specification and store it in the cache
    DownloadVspec,

    /// Generate the vehicle model from the cached specification
    GenerateModel,

    /// Install the dependencies of the vehicle model generator
    InstallModelDeps,
}

/// Host architecture: the validated `--cross` target, else the build machine.
fn host_arch(cross: &CrossArgs, build_arch: &str) -> Result<String> {
    match &cross.cross {
        Some(target) => Ok(arch::valid_arch(target)?.to_string()),
        None => Ok(build_arch.to_string()),
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let env = VelocitasEnv::from_env();
    env.trace_loaded();
    let runner = SystemRunner::new(cli.verbose);

    match cli.command {
        Commands::Build {
            debug,
            release,
            target,
            static_build,
            cross,
        } => {
            let build_arch = arch::build_arch()?.to_string();
            let options = BuildOptions {
                variant: BuildVariant::from_flags(debug, release, BuildVariant::Debug),
                host_arch: host_arch(&cross, &build_arch)?,
                build_arch,
                target,
                static_build,
                toolchain: cross.toolchain,
                coverage: true,
            };
            build::run(&env, &runner, &options).context("build failed")
        }
        Commands::InstallDeps {
            debug,
            release,
            build_all_deps,
            cross,
        } => {
            let build_arch = arch::build_arch()?.to_string();
            let options = InstallDepsOptions {
                variant: BuildVariant::from_flags(debug, release, BuildVariant::Release),
                build_all_deps,
                toolchain: cross.toolchain.clone(),
                host_arch: host_arch(&cross, &build_arch)?,
                build_arch,
            };
            install_deps::run(&env, &runner, &options).context("installing dependencies failed")
        }
        Commands::ConanSetup => conan_setup::run(&env, &runner).context("conan setup failed"),
        Commands::SdkInstall => sdk_installer::run(&env, &runner).context("SDK installation failed"),
        Commands::GrpcInterface => grpc::generate_all(&env, &runner, &HttpFetcher::new())
            .await
            .context("gRPC service SDK generation failed"),
        Commands::DownloadVspec => {
            vehicle_model::download_vspec::run(&env, &HttpFetcher::new(), &mut io::stdout())
                .await
                .context("downloading vehicle signal specification failed")
        }
        Commands::GenerateModel => vehicle_model::generate_model::run(&env, &runner)
            .context("vehicle model generation failed"),
        Commands::InstallModelDeps => vehicle_model::install_deps::install_packages(&env, &runner)
            .context("installing model generator dependencies failed"),
    }
}
