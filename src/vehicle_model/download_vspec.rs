use std::io::Write;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, info};

use super::resolve_in_workspace;
use crate::cache::write_cache_entry;
use crate::config::VelocitasEnv;
use crate::contract::Fetcher;
use crate::error::{Error, Result};
use crate::manifest::AppManifest;
use crate::util;

pub const INTERFACE_TYPE: &str = "vehicle-signal-interface";
pub const DEFAULT_VSPEC_URI: &str =
    "https://github.com/COVESA/vehicle_signal_specification/releases/download/v4.0/vss_rel_4.0.json";
pub const DEFAULT_UNITS_FILE: &str = "units.yaml";

pub const VSPEC_CACHE_KEY: &str = "vspec_file_path";
pub const UNITS_CACHE_KEY: &str = "unit_file_path_list";

/// Where the vehicle model's specification and unit files come from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VspecSources {
    pub src: String,
    #[serde(default)]
    pub unit_src: Vec<String>,
}

/// Sources declared by the manifest: its single `vehicle-signal-interface`,
/// else a pre-v3 vehicle model entry, else the default VSS release.
pub fn vspec_sources(manifest: &AppManifest) -> Result<VspecSources> {
    let interfaces: Vec<_> = manifest.interfaces_for_type(INTERFACE_TYPE).collect();
    match interfaces.as_slice() {
        [interface] => Ok(serde_json::from_value(interface.config.clone())?),
        [] => {
            let src = match manifest.legacy_model_src() {
                Ok(src) => src.to_string(),
                Err(_) => {
                    debug!("No vehicle model declared, using default VSS release");
                    DEFAULT_VSPEC_URI.to_string()
                }
            };
            Ok(VspecSources {
                src,
                unit_src: Vec::new(),
            })
        }
        _ => Err(Error::Manifest(format!(
            "only a single instance of {INTERFACE_TYPE:?} is allowed"
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVspec {
    pub vspec_file_path: PathBuf,
    pub unit_file_paths: Vec<PathBuf>,
}

/// Makes every source available locally: URIs are downloaded into the cache,
/// relative paths are resolved against the workspace.
pub async fn download_vspec(
    env: &VelocitasEnv,
    fetcher: &dyn Fetcher,
    sources: &VspecSources,
) -> Result<ResolvedVspec> {
    let workspace = env.workspace_dir()?;

    let vspec_file_path = if util::is_uri(&sources.src) {
        let local = env.cache_dir()?.join("vspec.json");
        fetcher.download(&sources.src, &local).await?;
        local
    } else {
        resolve_in_workspace(&workspace, &sources.src)
    };

    let mut unit_file_paths = Vec::with_capacity(sources.unit_src.len());
    for unit in &sources.unit_src {
        if util::is_uri(unit) {
            let local = env.cache_dir()?.join(util::file_name(unit));
            fetcher.download(unit, &local).await?;
            unit_file_paths.push(local);
        } else {
            unit_file_paths.push(resolve_in_workspace(&workspace, unit));
        }
    }
    if unit_file_paths.is_empty() {
        unit_file_paths.push(env.package_dir()?.join(DEFAULT_UNITS_FILE));
    }

    info!(
        vspec = %vspec_file_path.display(),
        units = unit_file_paths.len(),
        "Resolved vehicle signal specification"
    );
    Ok(ResolvedVspec {
        vspec_file_path,
        unit_file_paths,
    })
}

pub fn write_cache_entries<W: Write>(out: &mut W, resolved: &ResolvedVspec) -> Result<()> {
    let units: Vec<String> = resolved
        .unit_file_paths
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    let stdout_err = |e| Error::io("<stdout>", e);

    write_cache_entry(
        out,
        VSPEC_CACHE_KEY,
        &resolved.vspec_file_path.to_string_lossy(),
    )
    .map_err(stdout_err)?;
    write_cache_entry(out, UNITS_CACHE_KEY, &serde_json::to_string(&units)?).map_err(stdout_err)
}

pub async fn run<W: Write>(env: &VelocitasEnv, fetcher: &dyn Fetcher, out: &mut W) -> Result<()> {
    let manifest = env.app_manifest()?;
    let sources = vspec_sources(&manifest)?;
    let resolved = download_vspec(env, fetcher, &sources).await?;
    write_cache_entries(out, &resolved)
}
