//! Environment-variable scopes and path resolution.
//!
//! Build options declare environment overrides at three scopes: `common`,
//! the active profile, and the project. They are layered in that order onto
//! a snapshot of the process environment. Each value is resolved on its own
//! before it overwrites the previous layer, so a later toolchain macro can
//! shadow an earlier absolute path.
//!
//! The process environment itself is never modified; the merged map is
//! handed to each spawned process explicitly.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::config::{BuildOptions, OrderedMap, Project};
use crate::util::path::{absolutize, is_absolute, is_path_shaped};

/// An explicit environment for a child process.
pub type EnvMap = BTreeMap<String, String>;

/// How an override value is treated during merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
  /// Contains a toolchain variable reference (`$(...)` or `%...%`); kept verbatim
  /// so the toolchain can expand it.
  Opaque,
  /// Contains a directory separator; made absolute against the root.
  Path,
  /// Anything else; kept verbatim.
  Literal,
}

/// Classify an override value.
pub fn classify(value: &str) -> ValueKind {
  if value.contains("$(") || value.contains('%') {
    ValueKind::Opaque
  } else if is_path_shaped(value) {
    ValueKind::Path
  } else {
    ValueKind::Literal
  }
}

/// Resolve a single override value against `base`.
pub fn resolve_value(value: &str, base: &Path) -> String {
  match classify(value) {
    ValueKind::Path if !is_absolute(value) => absolutize(value, base),
    _ => value.to_string(),
  }
}

/// Resolve each override and write it into `target`, replacing same-named keys.
pub fn merge_and_resolve(target: &mut EnvMap, overrides: &OrderedMap<String>, base: &Path) {
  for (key, value) in overrides.iter() {
    target.insert(key.clone(), resolve_value(value, base));
  }
}

/// Snapshot the current process environment. Non-UTF-8 entries are dropped.
pub fn process_env() -> EnvMap {
  std::env::vars_os()
    .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
    .collect()
}

/// Layer the common and profile scopes onto `base_env`.
pub fn profile_env(base_env: &EnvMap, options: &BuildOptions, profile: &str, root: &Path) -> EnvMap {
  let mut env = base_env.clone();
  for scope in options.layers(profile) {
    merge_and_resolve(&mut env, &scope.env_vars, root);
  }
  env
}

/// Layer the project scope onto an already profile-merged environment.
pub fn project_env(profile_env: &EnvMap, project: &Project, root: &Path) -> EnvMap {
  let mut env = profile_env.clone();
  merge_and_resolve(&mut env, &project.env_vars, root);
  env
}

/// Keys explicitly overridden by any scope for `project`, sorted.
///
/// Build logs record these keys only, not the full environment.
pub fn override_keys(options: &BuildOptions, profile: &str, project: &Project) -> BTreeSet<String> {
  options
    .layers(profile)
    .into_iter()
    .flat_map(|scope| scope.env_vars.keys())
    .chain(project.env_vars.keys())
    .cloned()
    .collect()
}
