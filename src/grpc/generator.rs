use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::proto::ProtoFile;
use crate::util::to_camel_case;

/// Facts about one service, derived from its proto file, that every language
/// generator needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceContext {
    /// Directory the service SDK package is generated into.
    pub output_dir: PathBuf,
    pub proto_path: PathBuf,
    /// `-I` include root handed to the proto compiler.
    pub include_dir: PathBuf,
    pub service_name: String,
    pub package: String,
    /// File stem of the proto file; generated files are named after it.
    pub proto_name: String,
}

impl ServiceContext {
    pub fn new(output_dir: &Path, proto: &ProtoFile, include_dir: &Path) -> Result<Self> {
        let proto_name = proto
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            proto_path: proto.path().to_path_buf(),
            include_dir: include_dir.to_path_buf(),
            service_name: proto.service_name()?,
            package: proto.package()?,
            proto_name,
        })
    }

    pub fn service_name_lower(&self) -> String {
        self.service_name.to_lowercase()
    }

    pub fn service_name_camel_case(&self) -> String {
        to_camel_case(&self.service_name)
    }
}

/// Generates, installs and wires up the SDK package of a single service.
pub trait ServiceSdkGenerator {
    /// Generates the package with client and/or server support.
    fn generate_package(&self, client: bool, server: bool) -> Result<()>;

    /// Installs the generated package so the app build can find it.
    fn install_package(&self) -> Result<()>;

    /// Makes the app's dependency manifest reference the package.
    fn update_package_references(&self) -> Result<()>;

    /// Adds code the app needs to provide the service, leaving existing
    /// files alone.
    fn update_auto_generated_code(&self) -> Result<()>;
}

/// Per-language entry point.
pub trait GeneratorFactory {
    /// Installs whatever the generators of this language need; runs once.
    fn install_tooling(&mut self) -> Result<()>;

    fn create_service_generator<'a>(
        &'a self,
        output_dir: &Path,
        proto: &ProtoFile,
        include_dir: &Path,
    ) -> Result<Box<dyn ServiceSdkGenerator + 'a>>;
}
