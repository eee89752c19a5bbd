use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::generator::{GeneratorFactory, ServiceContext, ServiceSdkGenerator};
use crate::config::VelocitasEnv;
use crate::contract::CommandRunner;
use crate::error::{Error, Result};
use crate::process::ToolCommand;
use crate::proto::ProtoFile;
use crate::templates::{copy_templates, CopySpec, TemplateVariables, PYTHON_TEMPLATES};
use crate::util;

pub const DEFAULT_CORE_SDK_VERSION: &str = "0.11.0";
const CORE_SDK_NAMES: [&str; 2] = ["velocitas-sdk", "vehicle-app-sdk"];

/// Core SDK version pinned in `requirements`, e.g. `velocitas-sdk==0.14.1`.
pub fn core_sdk_version_from_requirements(requirements: &str) -> Option<String> {
    requirements.lines().find_map(|line| {
        let line = line.trim();
        CORE_SDK_NAMES
            .iter()
            .any(|name| line.starts_with(name))
            .then(|| line.split_once("=="))
            .flatten()
            .map(|(_, version)| version.trim().to_string())
    })
}

pub fn module_name(service_name: &str) -> String {
    format!("{}_service_sdk", service_name.to_lowercase())
}

pub struct PythonGeneratorFactory<'r> {
    runner: &'r dyn CommandRunner,
    env: &'r VelocitasEnv,
}

impl<'r> PythonGeneratorFactory<'r> {
    pub fn new(runner: &'r dyn CommandRunner, env: &'r VelocitasEnv) -> Self {
        Self { runner, env }
    }
}

impl GeneratorFactory for PythonGeneratorFactory<'_> {
    fn install_tooling(&mut self) -> Result<()> {
        self.runner.run(
            &ToolCommand::new("python3")
                .args(["-m", "pip", "install", "grpcio-tools"])
                .quiet(),
        )
    }

    fn create_service_generator<'a>(
        &'a self,
        output_dir: &Path,
        proto: &ProtoFile,
        include_dir: &Path,
    ) -> Result<Box<dyn ServiceSdkGenerator + 'a>> {
        Ok(Box::new(PythonServiceGenerator {
            runner: self.runner,
            env: self.env,
            ctx: ServiceContext::new(output_dir, proto, include_dir)?,
        }))
    }
}

pub struct PythonServiceGenerator<'a> {
    runner: &'a dyn CommandRunner,
    env: &'a VelocitasEnv,
    ctx: ServiceContext,
}

impl PythonServiceGenerator<'_> {
    fn invoke_code_generator(&self) -> Result<()> {
        println!("Invoking gRPC code generator");
        let out = self.ctx.output_dir.display();
        self.runner.run(
            &ToolCommand::new("python3")
                .args(["-m", "grpc_tools.protoc"])
                .arg(format!("-I{}", self.ctx.include_dir.display()))
                .arg(format!("--python_out={out}"))
                .arg(format!("--pyi_out={out}"))
                .arg(format!("--grpc_python_out={out}"))
                .path_arg(&self.ctx.proto_path)
                .quiet(),
        )
    }

    fn core_sdk_version(&self) -> Result<String> {
        let path = self
            .env
            .workspace_dir()?
            .join("app")
            .join("requirements.txt");
        if !path.exists() {
            debug!(path = %path.display(), "No requirements file, using default core SDK version");
            return Ok(DEFAULT_CORE_SDK_VERSION.to_string());
        }
        let requirements = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        Ok(core_sdk_version_from_requirements(&requirements)
            .unwrap_or_else(|| DEFAULT_CORE_SDK_VERSION.to_string()))
    }

    fn variables(&self) -> Result<TemplateVariables> {
        Ok(TemplateVariables::new()
            .set("service_name", &self.ctx.service_name)
            .set("service_name_lower", self.ctx.service_name_lower())
            .set("service_name_camel_case", self.ctx.service_name_camel_case())
            .set("proto_name", &self.ctx.proto_name)
            .set("core_sdk_version", self.core_sdk_version()?))
    }

    fn create_python_package(&self, client: bool, server: bool) -> Result<()> {
        let out = &self.ctx.output_dir;
        let module = module_name(&self.ctx.service_name);
        let module_dir = out.join(&module);
        util::create_dir_all(&module_dir)?;

        let mut generated = util::files_with_suffix(out, ".py")?;
        generated.extend(util::files_with_suffix(out, ".pyi")?);
        for file in &generated {
            if let Some(name) = file.file_name() {
                util::move_file(file, &module_dir.join(name))?;
            }
        }

        let stub = format!("{}_pb2", self.ctx.proto_name);
        let grpc_module = module_dir.join(format!("{stub}_grpc.py"));
        if grpc_module.exists() {
            util::replace_in_file(
                &grpc_module,
                &format!("import {stub}"),
                &format!("import {module}.{stub}"),
            )?;
        }

        let init = module_dir.join("__init__.py");
        if !init.exists() {
            fs::write(&init, "").map_err(|e| Error::io(&init, e))?;
        }

        let name = &self.ctx.service_name;
        let mut specs = vec![CopySpec::same("pyproject.toml")];
        if client {
            specs.push(CopySpec::to(
                "ServiceNameServiceClientFactory.py",
                Path::new(&module).join(format!("{name}ServiceClientFactory.py")),
            ));
        }
        if server {
            specs.push(CopySpec::to(
                "ServiceNameServiceServerFactory.py",
                Path::new(&module).join(format!("{name}ServiceServerFactory.py")),
            ));
        }
        copy_templates(&PYTHON_TEMPLATES, out, &specs, &self.variables()?)?;
        info!(service = %name, module = %module, files = generated.len(), "Created Python package");
        Ok(())
    }
}

impl ServiceSdkGenerator for PythonServiceGenerator<'_> {
    fn generate_package(&self, client: bool, server: bool) -> Result<()> {
        self.invoke_code_generator()?;
        self.create_python_package(client, server)
    }

    fn install_package(&self) -> Result<()> {
        println!("Installing Python package");
        self.runner.run(
            &ToolCommand::new("python3")
                .args(["-m", "pip", "install"])
                .path_arg(&self.ctx.output_dir)
                .quiet(),
        )
    }

    fn update_package_references(&self) -> Result<()> {
        debug!(service = %self.ctx.service_name, "Package is referenced through its pip installation");
        Ok(())
    }

    fn update_auto_generated_code(&self) -> Result<()> {
        let app_src = self.env.workspace_dir()?.join("app").join("src");
        let target = format!("{}_service_impl.py", self.ctx.service_name_lower());
        if app_src.join(&target).exists() {
            debug!(service = %self.ctx.service_name, "Service implementation already present");
            return Ok(());
        }
        copy_templates(
            &PYTHON_TEMPLATES,
            &app_src,
            &[CopySpec::to("service_name_service_impl.py", target)],
            &self.variables()?,
        )
    }
}
