//! # grpc: service SDK generation for `grpc-interface` interfaces
//!
//! For every `grpc-interface` entry of the app manifest the proto contract is
//! resolved (downloaded when it is a URI), compiled by the language's proto
//! compiler and wrapped into an installable package:
//!
//! - C++: a Conan package exported to the local cache and added to the
//!   workspace `conanfile.txt`.
//! - Python: a pip package installed into the current environment.
//!
//! Servers additionally get a service implementation skeleton in `app/src`
//! unless one already exists.

pub mod cpp;
pub mod generator;
pub mod python;

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::VelocitasEnv;
use crate::contract::{CommandRunner, Fetcher};
use crate::error::{Error, Result};
use crate::proto::ProtoFile;
use crate::util;

pub use cpp::CppGeneratorFactory;
pub use generator::{GeneratorFactory, ServiceContext, ServiceSdkGenerator};
pub use python::PythonGeneratorFactory;

pub const DEPENDENCY_TYPE_KEY: &str = "grpc-interface";

/// `config` object of a `grpc-interface` interface.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrpcInterfaceConfig {
    pub src: String,
    /// Present when the app consumes the service (client).
    #[serde(default)]
    pub required: Option<Value>,
    /// Present when the app implements the service (server).
    #[serde(default)]
    pub provided: Option<Value>,
    #[serde(default)]
    pub include_dir: Option<PathBuf>,
}

impl GrpcInterfaceConfig {
    pub fn from_value(config: &Value) -> Result<Self> {
        Ok(serde_json::from_value(config.clone())?)
    }

    pub fn is_client(&self) -> bool {
        self.required.is_some()
    }

    pub fn is_server(&self) -> bool {
        self.provided.is_some()
    }
}

/// Local path of the proto file `src` refers to. URIs are downloaded into
/// `<cache>/services/`; relative paths that do not exist as given are looked
/// up in the workspace.
pub async fn resolve_proto(env: &VelocitasEnv, fetcher: &dyn Fetcher, src: &str) -> Result<ProtoFile> {
    if !util::is_uri(src) {
        let path = Path::new(src);
        if path.is_file() {
            return ProtoFile::open(path);
        }
        let in_workspace = env.workspace_dir()?.join(src);
        if in_workspace.is_file() {
            return ProtoFile::open(in_workspace);
        }
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let cached = env
        .cache_dir()?
        .join("services")
        .join(util::file_name(src));
    fetcher.download(src, &cached).await?;
    ProtoFile::open(cached)
}

/// Empty `<cache>/services/<service lower>` directory for the service's SDK.
pub fn create_service_sdk_dir(env: &VelocitasEnv, proto: &ProtoFile) -> Result<PathBuf> {
    let dir = env
        .cache_dir()?
        .join("services")
        .join(proto.service_name()?.to_lowercase());
    util::remove_dir_if_exists(&dir)?;
    util::create_dir_all(&dir)?;
    Ok(dir)
}

pub async fn generate_single_service(
    env: &VelocitasEnv,
    fetcher: &dyn Fetcher,
    factory: &dyn GeneratorFactory,
    config: &GrpcInterfaceConfig,
) -> Result<()> {
    println!(
        "Generating service SDK for {:?}",
        util::create_truncated_string(&config.src, 100)
    );
    let proto = resolve_proto(env, fetcher, &config.src).await?;
    let sdk_dir = create_service_sdk_dir(env, &proto)?;
    let include_dir = config
        .include_dir
        .clone()
        .unwrap_or_else(|| proto.parent_dir());

    let generator = factory.create_service_generator(&sdk_dir, &proto, &include_dir)?;
    generator.generate_package(config.is_client(), config.is_server())?;
    generator.install_package()?;
    generator.update_package_references()?;
    if config.is_server() {
        generator.update_auto_generated_code()?;
    }
    info!(src = %config.src, path = %sdk_dir.display(), "Generated service SDK");
    Ok(())
}

/// Generates the SDKs of all `grpc-interface` interfaces of the app manifest.
pub async fn generate_all(env: &VelocitasEnv, runner: &dyn CommandRunner, fetcher: &dyn Fetcher) -> Result<()> {
    let manifest = env.app_manifest()?;
    let configs = manifest
        .interfaces_for_type(DEPENDENCY_TYPE_KEY)
        .map(|interface| GrpcInterfaceConfig::from_value(&interface.config))
        .collect::<Result<Vec<_>>>()?;

    if configs.is_empty() {
        debug!("No gRPC interfaces declared");
        return Ok(());
    }

    let language = env.programming_language()?;
    let mut factory: Box<dyn GeneratorFactory + '_> = match language {
        "cpp" => Box::new(CppGeneratorFactory::new(runner, env)),
        "python" => Box::new(PythonGeneratorFactory::new(runner, env)),
        other => {
            println!("gRPC interface not yet supported for programming language {other:?}");
            return Ok(());
        }
    };

    println!("Installing tooling...");
    factory.install_tooling()?;

    for config in &configs {
        generate_single_service(env, fetcher, factory.as_ref(), config).await?;
    }
    Ok(())
}
