//! Which compilers and projects take part in a run.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::{CompilerDefinition, Configuration, OrderedMap, Project};
use crate::placeholder::{PlaceholderError, substitute};
use crate::util::path::normalize;

/// Why a project was left out of a (compiler, platform) iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
  /// The path template references a variable the compiler does not define.
  MissingVariable(String),
  /// The path template is malformed.
  InvalidTemplate(PlaceholderError),
  /// The resolved path does not exist.
  NotFound(PathBuf),
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SkipReason::MissingVariable(name) => write!(f, "missing variable '{name}'"),
      SkipReason::InvalidTemplate(err) => write!(f, "invalid path template: {err}"),
      SkipReason::NotFound(path) => write!(f, "file not found: {}", path.display()),
    }
  }
}

/// Outcome of resolving a project's path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
  Resolved(PathBuf),
  Skipped(SkipReason),
}

/// Resolve `project.path` with the compiler's variables and check it exists.
///
/// Relative paths are taken from `root`.
pub fn resolve_project(project: &Project, variables: &OrderedMap<String>, root: &Path) -> Resolution {
  let substituted = match substitute(&project.path, variables) {
    Ok(path) => path,
    Err(PlaceholderError::MissingVariable(name)) => return Resolution::Skipped(SkipReason::MissingVariable(name)),
    Err(other) => return Resolution::Skipped(SkipReason::InvalidTemplate(other)),
  };

  let path = root.join(normalize(&substituted));
  if path.exists() {
    Resolution::Resolved(path)
  } else {
    Resolution::Skipped(SkipReason::NotFound(path))
  }
}

/// A project takes part if no tags were requested or it carries one of them.
pub fn matches_tags(project: &Project, requested: &[String]) -> bool {
  requested.is_empty() || project.tags.iter().any(|tag| requested.contains(tag))
}

/// A compiler taking part in the run.
#[derive(Debug, Clone)]
pub struct SelectedCompiler<'a> {
  pub id: &'a str,
  pub definition: &'a CompilerDefinition,
  /// Absolute path of the environment-initialization script.
  pub script: PathBuf,
}

/// The compiler ids to consider, in run order.
///
/// Forced ids (from the command line) run regardless of `active`. Otherwise
/// `default_compilers` narrows the active set when given.
fn candidate_ids(config: &Configuration, forced: bool) -> Vec<&str> {
  if forced {
    return config.default_compilers.iter().map(String::as_str).collect();
  }

  let is_active = |id: &str| config.compilers.get(id).is_some_and(|c| c.active);
  if config.default_compilers.is_empty() {
    config
      .compilers
      .iter()
      .filter(|(_, c)| c.active)
      .map(|(id, _)| id.as_str())
      .collect()
  } else {
    config
      .default_compilers
      .iter()
      .map(String::as_str)
      .filter(|&id| !config.compilers.contains_key(id) || is_active(id))
      .collect()
  }
}

/// Select the compilers for this run.
///
/// Unknown ids and compilers whose environment script is missing are
/// skipped with a warning.
pub fn select_compilers<'a>(config: &'a Configuration, forced: bool, root: &Path) -> Vec<SelectedCompiler<'a>> {
  let mut selected = Vec::new();
  for id in candidate_ids(config, forced) {
    let Some((id, definition)) = config.compilers.iter().find(|(k, _)| k.as_str() == id) else {
      warn!(compiler = %id, "compiler not defined in configuration, skipping");
      continue;
    };

    let script = root.join(normalize(&definition.path));
    if !script.is_file() {
      warn!(compiler = %id, script = ?script, "environment script not found, skipping compiler");
      continue;
    }

    selected.push(SelectedCompiler {
      id: id.as_str(),
      definition,
      script,
    });
  }
  selected
}
