//! External process execution.
//!
//! Every process gets an explicit environment and working directory; the
//! orchestrator's own environment and current directory are never changed.
//! Combined stdout and stderr go to the build log. An optional timeout kills
//! processes that hang.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use super::log::BuildLog;
use crate::env::EnvMap;

/// Errors that can occur while running an external process.
#[derive(Debug, Error)]
pub enum ProcessError {
  #[error("failed to open log {path}: {source}")]
  Log { path: String, source: std::io::Error },

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: std::io::Error },

  #[error("failed to launch {program}: {source}")]
  Spawn { program: String, source: std::io::Error },

  #[error("failed waiting for process: {0}")]
  Wait(#[source] std::io::Error),

  #[error("timed out after {secs}s")]
  TimedOut { secs: u64 },
}

/// Get the shell command and arguments used to run a command line.
///
/// # Arguments
///
/// * `override_shell` - Optional shell override from config
///
/// # Returns
///
/// A tuple of (shell_command, shell_arguments), where the last argument is
/// the flag that precedes the command line (e.g., "-c" for sh).
///
/// The default on Windows is `cmd.exe`, which understands `&&` chaining and
/// runs `.bat` environment scripts.
pub fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  if let Some(shell) = override_shell {
    let args = if shell.contains("powershell") || shell.contains("pwsh") {
      vec!["-NoProfile".to_string(), "-Command".to_string()]
    } else if shell.contains("cmd") {
      vec!["/C".to_string()]
    } else {
      // Assume Unix-style shell (bash, sh, zsh, etc.)
      vec!["-c".to_string()]
    };
    return (shell.to_string(), args);
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    ("cmd.exe".to_string(), vec!["/C".to_string()])
  }
}

/// Build a command that runs `line` through the shell.
pub fn shell_command(line: &str, override_shell: Option<&str>) -> Command {
  let (shell, args) = get_shell(override_shell);
  let mut command = Command::new(shell);
  command.args(&args);

  // cmd.exe does its own quote parsing; pass the line through untouched
  #[cfg(windows)]
  command.raw_arg(line);
  #[cfg(not(windows))]
  command.arg(line);

  command
}

/// Run `command` to completion with an explicit environment and working
/// directory, appending its combined output to `log`.
///
/// # Errors
///
/// Returns an error if the log cannot be opened, the process cannot be
/// spawned or waited on, or the timeout expires (the process is killed).
pub async fn run_logged(
  mut command: Command,
  env: &EnvMap,
  cwd: &Path,
  log: &BuildLog,
  timeout: Option<Duration>,
) -> Result<ExitStatus, ProcessError> {
  let (stdout, stderr) = log.sink().map_err(|source| ProcessError::Log {
    path: log.path().display().to_string(),
    source,
  })?;

  let program = command.as_std().get_program().to_string_lossy().into_owned();

  command
    .env_clear()
    .envs(env)
    .current_dir(cwd)
    .stdin(Stdio::null())
    .stdout(stdout)
    .stderr(stderr)
    .kill_on_drop(true);

  debug!(program = %program, cwd = ?cwd, "spawning process");

  let mut child = command
    .spawn()
    .map_err(|source| ProcessError::Spawn { program, source })?;

  match timeout {
    Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
      Ok(status) => status.map_err(ProcessError::Wait),
      Err(_) => {
        if let Err(e) = child.kill().await {
          warn!(error = %e, "failed to kill timed out process");
        }
        Err(ProcessError::TimedOut {
          secs: limit.as_secs(),
        })
      }
    },
    None => child.wait().await.map_err(ProcessError::Wait),
  }
}
