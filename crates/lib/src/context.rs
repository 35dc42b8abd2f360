//! Per-iteration build context and the run's build identifier.
//!
//! A [`BuildContext`] names one (compiler, platform) coordinate of the build
//! matrix. Its coordinates are fixed at construction; output paths are
//! derived from them on every call rather than stored. The only mutable part
//! is the current environment, rebound once per project by the orchestrator.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use rand::Rng;
use serde::Serialize;

use crate::consts::BUILD_ID_SUFFIX_LEN;
use crate::env::EnvMap;

const SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Unique token naming one run: `{timestamp}_{branch}_{suffix}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BuildId(String);

impl BuildId {
  /// Assemble an id from its parts. Path separators in the branch name are
  /// replaced so the id is a single directory name.
  pub fn compose(timestamp: DateTime<Local>, branch: &str, suffix: &str) -> Self {
    Self(format!(
      "{}_{}_{}",
      timestamp.format("%Y%m%d_%H%M%S"),
      sanitize_branch(branch),
      suffix
    ))
  }

  /// Generate a fresh id for `branch` at the current time.
  pub fn generate(branch: &str) -> Self {
    Self::compose(Local::now(), branch, &random_suffix(BUILD_ID_SUFFIX_LEN))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<&str> for BuildId {
  /// Wrap an id chosen by the caller, e.g. one reused from a previous run.
  fn from(id: &str) -> Self {
    Self(id.to_string())
  }
}

impl fmt::Display for BuildId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Replace path separators so a branch like `feature/tls` fits in a file name.
pub fn sanitize_branch(branch: &str) -> String {
  branch.trim().replace(['/', '\\'], "_")
}

/// Uppercase alphanumeric suffix distinguishing same-second runs.
pub fn random_suffix(len: usize) -> String {
  let mut rng = rand::thread_rng();
  (0..len)
    .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
    .collect()
}

/// Run-wide layout shared by every context of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
  /// Repository root; the working directory of every spawned process.
  pub root: PathBuf,
  pub build_id: BuildId,
  /// `<root>/<output_root>/<build id>`
  pub output_base: PathBuf,
  /// Toolchain directory name under the output base (e.g. `DCC`).
  pub toolchain_tag: String,
  /// Intermediate-artifact directory name under the output directory (e.g. `DCU`).
  pub aux_dir: String,
}

/// One (compiler, platform) coordinate of the build matrix.
#[derive(Debug, Clone)]
pub struct BuildContext {
  layout: RunLayout,
  compiler_id: String,
  compiler_script: PathBuf,
  platform: String,
  profile: String,
  env: EnvMap,
}

impl BuildContext {
  pub fn new(layout: RunLayout, compiler_id: &str, compiler_script: PathBuf, platform: &str, profile: &str) -> Self {
    Self {
      layout,
      compiler_id: compiler_id.to_string(),
      compiler_script,
      platform: platform.to_string(),
      profile: profile.to_string(),
      env: EnvMap::new(),
    }
  }

  pub fn root_dir(&self) -> &Path {
    &self.layout.root
  }

  pub fn build_id(&self) -> &BuildId {
    &self.layout.build_id
  }

  pub fn compiler_id(&self) -> &str {
    &self.compiler_id
  }

  /// Environment-initialization script of the compiler.
  pub fn compiler_script(&self) -> &Path {
    &self.compiler_script
  }

  pub fn platform(&self) -> &str {
    &self.platform
  }

  pub fn profile(&self) -> &str {
    &self.profile
  }

  pub fn toolchain_tag(&self) -> &str {
    &self.layout.toolchain_tag
  }

  pub fn output_base(&self) -> &Path {
    &self.layout.output_base
  }

  /// `<output base>/<toolchain tag>/<platform>/<profile>`
  pub fn output_dir(&self) -> PathBuf {
    self
      .layout
      .output_base
      .join(&self.layout.toolchain_tag)
      .join(&self.platform)
      .join(&self.profile)
  }

  /// `<output dir>/<aux dir>`
  pub fn aux_output_dir(&self) -> PathBuf {
    self.output_dir().join(&self.layout.aux_dir)
  }

  /// `<output base>/build_<compiler>_<platform>.log`
  pub fn log_file(&self) -> PathBuf {
    self
      .layout
      .output_base
      .join(format!("build_{}_{}.log", self.compiler_id, self.platform))
  }

  /// The fully merged environment of the project in flight.
  pub fn env(&self) -> &EnvMap {
    &self.env
  }

  pub fn set_env(&mut self, env: EnvMap) {
    self.env = env;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn layout() -> RunLayout {
    RunLayout {
      root: PathBuf::from("/repo"),
      build_id: BuildId("20260101_120000_main_AB12".to_string()),
      output_base: PathBuf::from("/repo/_build/20260101_120000_main_AB12"),
      toolchain_tag: "DCC".to_string(),
      aux_dir: "DCU".to_string(),
    }
  }

  #[test]
  fn derived_paths() {
    let ctx = BuildContext::new(layout(), "12.0", PathBuf::from("/bds/rsvars.bat"), "Win64", "Debug");
    let base = PathBuf::from("/repo/_build/20260101_120000_main_AB12");

    assert_eq!(ctx.output_dir(), base.join("DCC").join("Win64").join("Debug"));
    assert_eq!(ctx.aux_output_dir(), base.join("DCC").join("Win64").join("Debug").join("DCU"));
    assert_eq!(ctx.log_file(), base.join("build_12.0_Win64.log"));
  }

  #[test]
  fn env_rebinding_leaves_coordinates_alone() {
    let mut ctx = BuildContext::new(layout(), "12.0", PathBuf::from("/bds/rsvars.bat"), "Win32", "Release");
    let before = ctx.output_dir();

    ctx.set_env(EnvMap::from([("A".to_string(), "1".to_string())]));
    assert_eq!(ctx.env().get("A").map(String::as_str), Some("1"));
    assert_eq!(ctx.output_dir(), before);
  }

  #[test]
  fn build_id_format() {
    let ts = Local.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
    let id = BuildId::compose(ts, "feature/tls\\v3", "X9Z0");
    assert_eq!(id.as_str(), "20260304_050607_feature_tls_v3_X9Z0");
  }

  #[test]
  fn suffix_is_uppercase_alphanumeric() {
    let suffix = random_suffix(BUILD_ID_SUFFIX_LEN);
    assert_eq!(suffix.len(), 4);
    assert!(suffix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
  }

  #[test]
  fn generated_ids_differ_within_one_second() {
    // 36^4 suffixes; a handful of draws colliding is vanishingly unlikely
    let ids: std::collections::HashSet<String> =
      (0..8).map(|_| BuildId::generate("main").to_string()).collect();
    assert!(ids.len() > 1);
  }
}
