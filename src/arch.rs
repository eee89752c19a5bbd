//! Normalisation of CPU architecture names between the names users type,
//! the names Linux toolchains use and the names Conan expects.

use crate::error::{Error, Result};

/// Maps any known alias onto the toolchain name: `amd64` -> `x86_64`,
/// `arm64` -> `aarch64`. Matching is by containment so that triples such as
/// `x86_64-linux-gnu` are accepted too.
pub fn valid_arch(arch: &str) -> Result<&'static str> {
    if arch.contains("x86_64") || arch.contains("amd64") {
        Ok("x86_64")
    } else if arch.contains("aarch64") || arch.contains("arm64") {
        Ok("aarch64")
    } else {
        Err(Error::UnsupportedArchitecture(arch.to_string()))
    }
}

/// Conan's name for `arch`.
pub fn conan_arch(arch: &str) -> Result<&'static str> {
    match arch {
        "x86_64" => Ok("x86_64"),
        "aarch64" | "armv8" | "arm64" => Ok("armv8"),
        "armv7" => Ok("armv7"),
        other => Err(Error::UnsupportedArchitecture(other.to_string())),
    }
}

/// Name of the shipped Conan profile for `arch` and `build_variant`.
pub fn profile_name(arch: &str, build_variant: &str) -> Result<String> {
    Ok(format!("linux_{}_{}", valid_arch(arch)?, build_variant))
}

/// Architecture of the machine running the component.
pub fn build_arch() -> Result<&'static str> {
    valid_arch(std::env::consts::ARCH)
}
