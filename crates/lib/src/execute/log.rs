//! Append-only build log, one per (compiler, platform) pair.
//!
//! The file is reopened in append mode for every write, and child processes
//! get their own append handles, so entries land in invocation order.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;

const RULE_WIDTH: usize = 80;

#[derive(Debug, Clone)]
pub struct BuildLog {
  path: PathBuf,
}

impl BuildLog {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn open(&self) -> io::Result<File> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(&self.path)
  }

  /// Append `text` verbatim.
  pub fn write(&self, text: &str) -> io::Result<()> {
    self.open()?.write_all(text.as_bytes())
  }

  /// Append a single line.
  pub fn line(&self, text: &str) -> io::Result<()> {
    self.write(&format!("{text}\n"))
  }

  /// Append a section header framed by rules.
  pub fn banner(&self, title: &str) -> io::Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    self.write(&format!("\n{rule}\n{title}\n{rule}\n"))
  }

  /// Handles for a child's stdout and stderr, both appending to this log.
  pub fn sink(&self) -> io::Result<(Stdio, Stdio)> {
    let stdout = self.open()?;
    let stderr = stdout.try_clone()?;
    Ok((Stdio::from(stdout), Stdio::from(stderr)))
  }
}
