use anyhow::{Context, Result, bail};
use std::{error::Error, fmt, path::Path, process::Command};
use tracing::{debug, info};

use crate::{aws::Credentials, shell};

/// A child command that already reported its own failure and exited nonzero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildExit {
    pub code: i32,
}

impl fmt::Display for ChildExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "command exited with status {}", self.code)
    }
}

impl Error for ChildExit {}

/// Build the command for `program` with the credential variables added to the inherited environment
fn build_command(
    program: &Path,
    name: &str,
    args: &[String],
    role: &str,
    creds: &Credentials,
) -> Command {
    let mut command = Command::new(program);
    command.args(args);
    command.envs(shell::credential_env(role, creds));

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.arg0(name);
    }
    #[cfg(not(unix))]
    let _ = name;

    command
}

/// Run `argv` with the credentials in its environment.
///
/// On Unix the current process is replaced and this only returns on failure.
pub fn exec_with_credentials(role: &str, creds: &Credentials, argv: &[String]) -> Result<()> {
    let Some((name, args)) = argv.split_first() else {
        bail!("No command given");
    };
    let program =
        which::which(name).with_context(|| format!("Failed to find command: {name}"))?;
    debug!("Resolved {} to {}", name, program.display());

    let command = build_command(&program, name, args, role, creds);
    info!("Executing {} with credentials for {}", program.display(), role);

    run(command, &program)
}

#[cfg(unix)]
fn run(mut command: Command, program: &Path) -> Result<()> {
    use std::os::unix::process::CommandExt;

    let err = command.exec();
    Err(err).with_context(|| format!("Failed to execute {}", program.display()))
}

#[cfg(not(unix))]
fn run(mut command: Command, program: &Path) -> Result<()> {
    let status = command
        .status()
        .with_context(|| format!("Failed to execute {}", program.display()))?;

    match status.code() {
        Some(0) => Ok(()),
        Some(code) => Err(ChildExit { code }.into()),
        None => Err(ChildExit { code: 1 }.into()),
    }
}
