//! Configuration loading and resolution.
//!
//! Produces the effective configuration for a run by layering, later wins:
//! 1. Built-in defaults ([`Configuration::default`])
//! 2. The configuration file, if present (a malformed file is fatal)
//! 3. Command-line overrides ([`CliOverrides`])
//!
//! The repository root is resolved relative to the configuration file's
//! directory, so the same file works from any working directory.

mod scalar;
mod types;

use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::consts::DEFAULT_CONFIG_FILE;

pub use types::{
  BuildOptions, CompilerDefinition, Configuration, DependencyValue, MatrixSettings, ParamValue, Project, ProjectKind,
  ScopeOptions, ToolchainSettings,
};

/// A string-keyed map that iterates in document order.
///
/// Compilers run in the order they are declared and test parameters become
/// switches in the order they are written.
pub type OrderedMap<V> = IndexMap<String, V>;

/// Errors that can occur while resolving the configuration. All are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to parse config file {}: {source}", path.display())]
  Parse { path: PathBuf, source: serde_json::Error },

  #[error("invalid configuration: {}", .0.join("; "))]
  Invalid(Vec<String>),

  #[error("configured root directory does not exist: {}", .0.display())]
  RootNotFound(PathBuf),

  #[error("failed to resolve root directory {}: {source}", path.display())]
  Root { path: PathBuf, source: io::Error },

  #[error("failed to determine current directory: {0}")]
  CurrentDir(#[source] io::Error),
}

/// Values supplied on the command line. `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
  pub platforms: Option<Vec<String>>,
  /// Compiler ids to run; these bypass each compiler's `active` flag.
  pub compilers: Option<Vec<String>>,
  pub profile: Option<String>,
  /// Replaces `dependencies[matrix.versions_key]`.
  pub dependency_versions: Option<Vec<String>>,
  pub clean: Option<bool>,
}

impl CliOverrides {
  /// Apply these overrides on top of `config`.
  pub fn apply(&self, config: &mut Configuration) {
    if let Some(platforms) = &self.platforms {
      config.platforms = platforms.clone();
    }
    if let Some(compilers) = &self.compilers {
      config.default_compilers = compilers.clone();
    }
    if let Some(profile) = &self.profile {
      config.default_config = profile.clone();
    }
    if let Some(versions) = &self.dependency_versions {
      config.dependencies.insert(
        config.matrix.versions_key.clone(),
        DependencyValue::List(versions.clone()),
      );
    }
    if let Some(clean) = self.clean {
      config.clean_on_success = clean;
    }
  }

  /// True when the compiler list came from the command line.
  pub fn forces_compilers(&self) -> bool {
    self.compilers.as_ref().is_some_and(|ids| !ids.is_empty())
  }
}

/// The effective configuration for one run. Read-only once built.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
  pub config: Configuration,
  /// Absolute, canonical repository root.
  pub root: PathBuf,
  /// Whether the compiler list was forced from the command line.
  pub compilers_forced: bool,
}

impl ResolvedConfig {
  /// Absolute output root: `<root>/<output_root>`.
  pub fn output_root(&self) -> PathBuf {
    self.root.join(&self.config.output_root)
  }
}

/// Load a configuration file layered over the defaults.
///
/// Returns `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_file(path: &Path) -> Result<Option<Configuration>, ConfigError> {
  let content = match std::fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
    Err(source) => {
      return Err(ConfigError::Read {
        path: path.to_path_buf(),
        source,
      });
    }
  };

  let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
    path: path.to_path_buf(),
    source,
  })?;
  Ok(Some(config))
}

/// Resolve the effective configuration.
///
/// `config_path` defaults to [`DEFAULT_CONFIG_FILE`] in the current
/// directory. A missing file silently means built-in defaults.
///
/// # Errors
///
/// Fails if the file is unreadable or malformed, if validation finds any
/// violations, or if the resolved root does not exist.
pub fn resolve(config_path: Option<&Path>, overrides: &CliOverrides) -> Result<ResolvedConfig, ConfigError> {
  let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
  resolve_from(&cwd, config_path, overrides)
}

/// [`resolve`] with an explicit base for a relative `config_path`.
pub fn resolve_from(
  cwd: &Path,
  config_path: Option<&Path>,
  overrides: &CliOverrides,
) -> Result<ResolvedConfig, ConfigError> {
  let config_path = cwd.join(config_path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE)));

  let mut config = match load_file(&config_path)? {
    Some(config) => {
      info!(path = %config_path.display(), "loaded configuration");
      config
    }
    None => {
      debug!(path = %config_path.display(), "config file not found, using defaults");
      Configuration::default()
    }
  };

  overrides.apply(&mut config);

  let problems = config.violations();
  if !problems.is_empty() {
    return Err(ConfigError::Invalid(problems));
  }

  let config_dir = config_path.parent().unwrap_or(cwd);
  let root = config_dir.join(&config.root);
  let root = match dunce::canonicalize(&root) {
    Ok(root) => root,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ConfigError::RootNotFound(root)),
    Err(source) => return Err(ConfigError::Root { path: root, source }),
  };
  if !root.is_dir() {
    return Err(ConfigError::RootNotFound(root));
  }

  Ok(ResolvedConfig {
    config,
    root,
    compilers_forced: overrides.forces_compilers(),
  })
}
