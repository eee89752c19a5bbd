use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, error, info};

use crate::contract::CommandRunner;
use crate::error::{Error, Result};

/// An external tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Discard the tool's stdout unless verbose logging is enabled.
    pub quiet: bool,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends `path` as an argument, lossily converted to UTF-8.
    pub fn path_arg(self, path: &Path) -> Self {
        let arg = path.to_string_lossy().into_owned();
        self.arg(arg)
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Whether `args` contains `needle` verbatim; handy in test predicates.
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }

    /// `program` followed by its arguments: the words a shell user would type.
    pub fn words(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.words().join(" "))
    }
}

/// Executes commands on the host.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    verbose: bool,
}

impl SystemRunner {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn build(&self, command: &ToolCommand) -> Command {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }
        cmd.envs(command.env.iter().map(|(k, v)| (k, v)));
        cmd
    }
}

fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> Result<()> {
        debug!(command = %command, cwd = ?command.cwd, "Running command");
        let mut cmd = self.build(command);
        if command.quiet && !self.verbose {
            cmd.stdout(Stdio::null());
        }

        let status = cmd.status().map_err(|e| {
            error!(error = ?e, command = %command, "Failed to launch process");
            Error::CommandSpawn {
                command: command.to_string(),
                source: e,
            }
        })?;

        if status.success() {
            info!(command = %command.program, status = ?status, "Command succeeded");
            Ok(())
        } else {
            error!(command = %command, "Command exited with non-zero code: {}", status);
            Err(Error::CommandFailed {
                command: command.to_string(),
                code: exit_code(status),
            })
        }
    }

    fn output(&self, command: &ToolCommand) -> Result<String> {
        debug!(command = %command, cwd = ?command.cwd, "Capturing command output");
        let output = self
            .build(command)
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| Error::CommandSpawn {
                command: command.to_string(),
                source: e,
            })?;

        if !output.status.success() {
            error!(command = %command, "Command exited with non-zero code: {}", output.status);
            return Err(Error::CommandFailed {
                command: command.to_string(),
                code: exit_code(output.status),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
