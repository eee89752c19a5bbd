use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use super::download_vspec::{UNITS_CACHE_KEY, VSPEC_CACHE_KEY};
use super::resolve_in_workspace;
use crate::config::VelocitasEnv;
use crate::contract::CommandRunner;
use crate::error::Result;
use crate::process::ToolCommand;
use crate::util;

pub const OUTPUT_PATH_VAR: &str = "generatedModelPath";
const AUTO: &str = "auto";

/// `<cache>/vehicle_model`, unless `generatedModelPath` names another
/// directory; relative overrides are resolved against the workspace.
pub fn model_output_dir(env: &VelocitasEnv) -> Result<PathBuf> {
    match env.get(OUTPUT_PATH_VAR).unwrap_or(AUTO) {
        AUTO => Ok(env.cache_dir()?.join("vehicle_model")),
        path if Path::new(path).is_absolute() => Ok(PathBuf::from(path)),
        path => Ok(resolve_in_workspace(&env.workspace_dir()?, path)),
    }
}

/// Unit files recorded by `download-vspec`. The CLI may hand the list back
/// either as a JSON array or as the JSON text that was written.
pub fn unit_files_from_cache(cache: &Value) -> Result<Vec<String>> {
    match cache.get(UNITS_CACHE_KEY) {
        Some(Value::String(text)) => Ok(serde_json::from_str(text)?),
        Some(list @ Value::Array(_)) => Ok(serde_json::from_value(list.clone())?),
        _ => Ok(Vec::new()),
    }
}

pub fn generator_command(
    workspace_dir: &Path,
    vspec_file: &str,
    unit_files: &[String],
    language: &str,
    output_dir: &Path,
) -> ToolCommand {
    let mut command = ToolCommand::new("python3")
        .args(["-m", "sdv.model_generator.main", "-l", language, "-T"])
        .path_arg(output_dir);
    for unit in unit_files {
        command = command.args(["-u", unit.as_str()]);
    }
    command.arg(vspec_file).current_dir(workspace_dir)
}

pub fn remove_old_model(path: &Path) -> Result<()> {
    println!("Deleting old model at {:?}", path.display().to_string());
    util::remove_dir_if_exists(path)
}

pub fn install_model_if_required(runner: &dyn CommandRunner, language: &str, model_path: &Path) -> Result<()> {
    if language != "python" {
        debug!(%language, "Model needs no installation");
        return Ok(());
    }
    runner.run(
        &ToolCommand::new("python3")
            .args(["-m", "pip", "install"])
            .path_arg(model_path)
            .quiet(),
    )
}

/// Generates the model for the specification `download-vspec` cached. Does
/// nothing when no specification was cached.
pub fn run(env: &VelocitasEnv, runner: &dyn CommandRunner) -> Result<()> {
    let cache = env.cache_data()?;
    let Some(vspec_file) = cache.get(VSPEC_CACHE_KEY).and_then(Value::as_str) else {
        debug!("No vspec file in cache, nothing to generate");
        return Ok(());
    };
    let units = unit_files_from_cache(&cache)?;

    let language = env.programming_language()?;
    let output_dir = model_output_dir(env)?;
    remove_old_model(&output_dir)?;
    util::create_dir_all(&output_dir)?;

    println!("Invoking model generator for language {language} and file {vspec_file:?}");
    runner.run(&generator_command(
        &env.workspace_dir()?,
        vspec_file,
        &units,
        language,
        &output_dir,
    ))?;
    install_model_if_required(runner, language, &output_dir)?;
    info!(path = %output_dir.display(), %language, "Generated vehicle model");
    Ok(())
}
