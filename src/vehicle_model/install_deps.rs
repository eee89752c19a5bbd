use tracing::info;

use crate::config::VelocitasEnv;
use crate::contract::CommandRunner;
use crate::error::Result;
use crate::process::ToolCommand;

fn pip(args: Vec<String>) -> ToolCommand {
    ToolCommand::new("python3").args(["-m", "pip"]).args(args)
}

/// Whether `installModelGenerator` asks for the generator itself.
pub fn should_install_model_generator(env: &VelocitasEnv) -> bool {
    env.get("installModelGenerator").is_some()
}

/// Installs the Python requirements of the lifecycle scripts and, on request,
/// the model generator from its git repository.
pub fn install_packages(env: &VelocitasEnv, runner: &dyn CommandRunner) -> Result<()> {
    let requirements = env
        .package_dir()?
        .join("vehicle-model-lifecycle")
        .join("requirements.txt");
    runner.run(&pip(vec![
        "install".into(),
        "-r".into(),
        requirements.to_string_lossy().into_owned(),
    ]))?;

    if should_install_model_generator(env) {
        let repo = env.require("modelGeneratorGitRepo")?;
        let reference = env.require("modelGeneratorGitRef")?;
        runner.run(&pip(vec!["install".into(), format!("git+{repo}@{reference}")]))?;
        info!(%repo, %reference, "Installed model generator");
    }
    Ok(())
}
