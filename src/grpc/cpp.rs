use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};

use super::generator::{GeneratorFactory, ServiceContext, ServiceSdkGenerator};
use crate::conanfile::{self, CONANFILE_NAME};
use crate::config::VelocitasEnv;
use crate::contract::CommandRunner;
use crate::error::{Error, Result};
use crate::process::ToolCommand;
use crate::proto::ProtoFile;
use crate::templates::{copy_templates, CopySpec, TemplateVariables, CPP_TEMPLATES};
use crate::util;

pub const CONAN_PROFILE_NAME: &str = "host";
pub const CORE_SDK_PACKAGE: &str = "vehicle-app-sdk";
/// Version every generated Conan recipe declares.
pub const GENERATED_PACKAGE_VERSION: &str = "generated";

fn requirement_pattern(name: &str) -> Regex {
    Regex::new(&format!(r#""({}/[^"]*)""#, regex::escape(name))).expect("valid regex")
}

/// `grpc/...` and `c-ares/...` references the generated recipe builds against;
/// protoc and its gRPC plugin are installed in exactly those versions.
pub fn tooling_requirements(recipe: &str) -> Result<(String, Option<String>)> {
    static GRPC: OnceLock<Regex> = OnceLock::new();
    static CARES: OnceLock<Regex> = OnceLock::new();
    let find = |pattern: &Regex| {
        pattern
            .captures(recipe)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    };

    let grpc = find(GRPC.get_or_init(|| requirement_pattern("grpc")))
        .ok_or_else(|| Error::MissingRequirement("grpc".into()))?;
    let cares = find(CARES.get_or_init(|| requirement_pattern("c-ares")));
    Ok((grpc, cares))
}

/// Moves `*.h` from `generated_dir` into `output_dir/include_rel` and `*.cc`
/// into `output_dir/src_rel`; returns their new paths relative to `output_dir`.
pub fn move_generated_sources(
    generated_dir: &Path,
    output_dir: &Path,
    include_rel: &str,
    src_rel: &str,
) -> Result<(Vec<String>, Vec<String>)> {
    let relocate = |suffix: &str, rel: &str| -> Result<Vec<String>> {
        let mut moved = Vec::new();
        for file in util::files_with_suffix(generated_dir, suffix)? {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            util::move_file(&file, &output_dir.join(rel).join(&name))?;
            moved.push(format!("{rel}/{name}"));
        }
        Ok(moved)
    };
    let headers = relocate(".h", include_rel)?;
    let sources = relocate(".cc", src_rel)?;
    Ok((headers, sources))
}

pub struct CppGeneratorFactory<'r> {
    runner: &'r dyn CommandRunner,
    env: &'r VelocitasEnv,
    tool_dirs: Vec<PathBuf>,
}

impl<'r> CppGeneratorFactory<'r> {
    pub fn new(runner: &'r dyn CommandRunner, env: &'r VelocitasEnv) -> Self {
        Self {
            runner,
            env,
            tool_dirs: Vec::new(),
        }
    }

    /// Uses tools from `dirs` in addition to `PATH`, e.g. a preinstalled protoc.
    pub fn with_tool_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.tool_dirs = dirs;
        self
    }

    fn create_conan_profile(&self) -> Result<()> {
        self.runner.run(
            &ToolCommand::new("conan")
                .args(["profile", "new", CONAN_PROFILE_NAME, "--detect", "--force"])
                .quiet(),
        )?;
        self.runner.run(
            &ToolCommand::new("conan")
                .args([
                    "profile",
                    "update",
                    "settings.compiler.libcxx=libstdc++11",
                    CONAN_PROFILE_NAME,
                ])
                .quiet(),
        )
    }

    fn install_protoc_via_conan(&self, build_dir: &Path) -> Result<()> {
        let (grpc, cares) = tooling_requirements(CPP_TEMPLATES.get("conanfile.py")?)?;
        info!(%grpc, cares = cares.as_deref().unwrap_or("-"), "Installing gRPC tooling via Conan");

        let tooling_conanfile = build_dir.join(CONANFILE_NAME);
        let mut contents = format!("[requires]\n{grpc}\n");
        if let Some(cares) = cares {
            contents.push_str(&cares);
            contents.push('\n');
        }
        fs::write(&tooling_conanfile, contents).map_err(|e| Error::io(&tooling_conanfile, e))?;

        self.runner.run(
            &ToolCommand::new("conan")
                .args(["install", "-pr:h", CONAN_PROFILE_NAME, "--build", "missing"])
                .path_arg(&tooling_conanfile)
                .current_dir(build_dir)
                .env("CONAN_REVISIONS_ENABLED", "1")
                .quiet(),
        )
    }

    fn find_tool(&self, name: &str) -> Result<PathBuf> {
        util::find_executable(name, &self.tool_dirs).ok_or_else(|| Error::ToolNotFound(name.into()))
    }

    /// `PATH` with the tooling directories in front.
    fn tool_path(&self) -> Option<String> {
        let current = std::env::var_os("PATH").unwrap_or_default();
        let dirs = self
            .tool_dirs
            .iter()
            .cloned()
            .chain(std::env::split_paths(&current));
        std::env::join_paths(dirs)
            .ok()
            .map(|p| p.to_string_lossy().into_owned())
    }
}

impl GeneratorFactory for CppGeneratorFactory<'_> {
    fn install_tooling(&mut self) -> Result<()> {
        self.create_conan_profile()?;

        let dir = tempfile::tempdir().map_err(|e| Error::io(std::env::temp_dir(), e))?;
        self.install_protoc_via_conan(dir.path())?;
        let paths = conanfile::build_info_paths(dir.path())?;
        debug!(?paths, "Extending tool search path");
        self.tool_dirs.extend(paths.into_iter().map(PathBuf::from));
        Ok(())
    }

    fn create_service_generator<'a>(
        &'a self,
        output_dir: &Path,
        proto: &ProtoFile,
        include_dir: &Path,
    ) -> Result<Box<dyn ServiceSdkGenerator + 'a>> {
        Ok(Box::new(CppServiceGenerator {
            factory: self,
            ctx: ServiceContext::new(output_dir, proto, include_dir)?,
        }))
    }
}

pub struct CppServiceGenerator<'a> {
    factory: &'a CppGeneratorFactory<'a>,
    ctx: ServiceContext,
}

impl CppServiceGenerator<'_> {
    fn invoke_code_generator(&self) -> Result<()> {
        println!("Invoking gRPC code generator");
        let protoc = self.factory.find_tool("protoc")?;
        let plugin = self.factory.find_tool("grpc_cpp_plugin")?;
        let out = self.ctx.output_dir.display();

        let mut command = ToolCommand::new(protoc.to_string_lossy())
            .arg(format!("--plugin=protoc-gen-grpc={}", plugin.display()))
            .arg(format!("-I{}", self.ctx.include_dir.display()))
            .arg(format!("--cpp_out={out}"))
            .arg(format!("--grpc_out={out}"))
            .path_arg(&self.ctx.proto_path)
            .current_dir(&self.ctx.include_dir)
            .quiet();
        if let Some(path) = self.factory.tool_path() {
            command = command.env("PATH", path);
        }
        self.factory.runner.run(&command)
    }

    fn core_sdk_version(&self) -> Result<String> {
        let workspace = self.factory.env.workspace_dir()?;
        conanfile::required_version_in_workspace(&workspace, CORE_SDK_PACKAGE)?
            .ok_or_else(|| Error::MissingRequirement(CORE_SDK_PACKAGE.into()))
    }

    fn create_conan_project(&self, client: bool, server: bool) -> Result<()> {
        let lower = self.ctx.service_name_lower();
        let camel = self.ctx.service_name_camel_case();
        let service_include_dir = format!("services/{lower}");
        let include_rel = format!("include/{service_include_dir}");
        let src_rel = format!("src/services/{lower}");
        let out = &self.ctx.output_dir;

        let (mut headers, mut sources) = move_generated_sources(out, out, &include_rel, &src_rel)?;

        let mut specs = vec![CopySpec::same("CMakeLists.txt"), CopySpec::same("conanfile.py")];
        let mut factory = |kind: &str| {
            let header = format!("{include_rel}/{camel}Service{kind}Factory.h");
            let source = format!("{src_rel}/{camel}Service{kind}Factory.cc");
            specs.push(CopySpec::to(format!("ServiceNameService{kind}Factory.h"), &header));
            specs.push(CopySpec::to(format!("ServiceNameService{kind}Factory.cc"), &source));
            headers.push(header);
            sources.push(source);
        };
        if client {
            factory("Client");
        }
        if server {
            factory("Server");
        }

        let variables = TemplateVariables::new()
            .set("service_name", &self.ctx.service_name)
            .set("service_name_lower", &lower)
            .set("service_name_camel_case", &camel)
            .set("proto_name", &self.ctx.proto_name)
            .set("headers", headers.join("\n\t"))
            .set("sources", sources.join("\n\t"))
            .set("package_id", self.ctx.package.replace('.', "::"))
            .set("core_sdk_version", self.core_sdk_version()?)
            .set("service_include_dir", service_include_dir);

        copy_templates(&CPP_TEMPLATES, out, &specs, &variables)?;
        info!(service = %self.ctx.service_name, path = %out.display(), "Created Conan project");
        Ok(())
    }
}

impl ServiceSdkGenerator for CppServiceGenerator<'_> {
    fn generate_package(&self, client: bool, server: bool) -> Result<()> {
        self.invoke_code_generator()?;
        self.create_conan_project(client, server)
    }

    fn install_package(&self) -> Result<()> {
        println!("Exporting Conan project");
        self.factory.runner.run(
            &ToolCommand::new("conan")
                .args(["export", "."])
                .current_dir(&self.ctx.output_dir)
                .quiet(),
        )
    }

    fn update_package_references(&self) -> Result<()> {
        let workspace = self.factory.env.workspace_dir()?;
        conanfile::add_dependency_to_conanfile(
            &workspace,
            &format!("{}-service-sdk", self.ctx.service_name_lower()),
            GENERATED_PACKAGE_VERSION,
        )
    }

    fn update_auto_generated_code(&self) -> Result<()> {
        let app_src = self.factory.env.workspace_dir()?.join("app").join("src");
        let camel = self.ctx.service_name_camel_case();

        let specs: Vec<CopySpec> = [
            ("ServiceNameServiceImpl.h", format!("{camel}ServiceImpl.h")),
            ("ServiceNameServiceImpl.cpp", format!("{camel}ServiceImpl.cpp")),
        ]
        .into_iter()
        .filter(|(_, target)| !app_src.join(target).exists())
        .map(|(source, target)| CopySpec::to(source, target))
        .collect();

        if specs.is_empty() {
            debug!(service = %self.ctx.service_name, "Service implementation already present");
            return Ok(());
        }

        let variables = TemplateVariables::new()
            .set("service_name", &self.ctx.service_name)
            .set("service_name_lower", self.ctx.service_name_lower())
            .set("service_name_camel_case", &camel)
            .set("proto_name", &self.ctx.proto_name)
            .set("package_id", self.ctx.package.replace('.', "::"));
        copy_templates(&CPP_TEMPLATES, &app_src, &specs, &variables)
    }
}
