//! Test utilities for matrixbuild-lib.
//!
//! Cross-platform helpers for tests that spawn shells, plus unix helpers that
//! stand up fake compiler and executable scripts.

use std::path::{Path, PathBuf};

/// Returns the shell command and args to echo an environment variable.
#[cfg(unix)]
pub fn shell_echo_env(var: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), format!("echo \"${}\"", var)])
}

#[cfg(windows)]
pub fn shell_echo_env(var: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), format!("echo %{}%", var)])
}

/// Read a log file, or an empty string if it was never written.
pub fn read_log(path: &Path) -> String {
  std::fs::read_to_string(path).unwrap_or_default()
}

/// Write an executable shell script into `dir`.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
  use std::os::unix::fs::PermissionsExt;

  std::fs::create_dir_all(dir).unwrap();
  let path = dir.join(name);
  std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
  std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  path
}
