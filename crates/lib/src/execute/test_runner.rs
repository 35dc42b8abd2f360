//! Test executable runner with dependency-version matrix expansion.
//!
//! A matrix project runs its executable once per configured dependency
//! version, each run with its own substitution context. Every version runs
//! even after an earlier one fails; the step passes only if all of them do.

use std::collections::BTreeMap;
use std::env::consts::EXE_SUFFIX;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use super::log::BuildLog;
use super::process::{ProcessError, run_logged};
use super::toolchain::log_failure;
use crate::config::{Configuration, DependencyValue, MatrixSettings, OrderedMap, ParamValue, Project};
use crate::context::BuildContext;
use crate::placeholder::substitute;
use crate::util::path::{absolutize, is_path_shaped, normalize};

/// One test run's position in the dependency-version matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSlot {
  Unversioned,
  Versioned(String),
}

impl VersionSlot {
  /// The raw version string, empty when unversioned.
  pub fn version(&self) -> &str {
    match self {
      VersionSlot::Unversioned => "",
      VersionSlot::Versioned(v) => v,
    }
  }

  /// `name` or `name_<version>`.
  pub fn qualified_name(&self, name: &str) -> String {
    match self {
      VersionSlot::Unversioned => name.to_string(),
      VersionSlot::Versioned(v) => format!("{name}_{v}"),
    }
  }
}

impl fmt::Display for VersionSlot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VersionSlot::Unversioned => f.write_str("unversioned"),
      VersionSlot::Versioned(v) => write!(f, "version {v}"),
    }
  }
}

/// The runs a project expands to.
///
/// Non-matrix projects and matrix projects with an empty version list get a
/// single unversioned run; the latter also logs a warning.
pub fn version_slots(
  project: &Project,
  matrix: &MatrixSettings,
  dependencies: &OrderedMap<DependencyValue>,
) -> Vec<VersionSlot> {
  if !project.matrix {
    return vec![VersionSlot::Unversioned];
  }

  let versions = matrix.versions(dependencies);
  if versions.is_empty() {
    warn!(
      project = %project.name,
      key = %matrix.versions_key,
      "matrix requested but the version list is empty, running once unversioned"
    );
    return vec![VersionSlot::Unversioned];
  }

  versions.iter().cloned().map(VersionSlot::Versioned).collect()
}

/// `<output dir>/<project file stem><EXE_SUFFIX>`
pub fn executable_path(output_dir: &Path, resolved_path: &Path) -> PathBuf {
  let stem = resolved_path
    .file_stem()
    .map(|s| s.to_string_lossy().into_owned())
    .unwrap_or_default();
  output_dir.join(format!("{stem}{EXE_SUFFIX}"))
}

/// Substitute a template and normalize the result if it looks like a path.
fn substitute_value(template: &str, vars: &BTreeMap<String, String>) -> Result<String, crate::placeholder::PlaceholderError> {
  let value = substitute(template, vars)?;
  Ok(if is_path_shaped(&value) { normalize(&value) } else { value })
}

/// Runs test executables produced by a successful build.
#[derive(Debug, Clone)]
pub struct TestRunner {
  matrix: MatrixSettings,
  timeout: Option<Duration>,
}

impl TestRunner {
  pub fn new(matrix: MatrixSettings, timeout: Option<Duration>) -> Self {
    Self { matrix, timeout }
  }

  pub fn from_config(config: &Configuration) -> Self {
    Self::new(config.matrix.clone(), config.process_timeout_secs.map(Duration::from_secs))
  }

  /// Variables available to dependency-path and parameter templates.
  pub fn substitution_context(
    &self,
    project: &Project,
    slot: &VersionSlot,
    exe_path: &Path,
    ctx: &BuildContext,
  ) -> BTreeMap<String, String> {
    let entries = [
      ("build_id", ctx.build_id().to_string()),
      ("platform", ctx.platform().to_string()),
      ("config", ctx.profile().to_string()),
      ("profile", ctx.profile().to_string()),
      ("compiler", ctx.compiler_id().to_string()),
      ("toolchain", ctx.toolchain_tag().to_string()),
      ("output_dir", ctx.output_dir().display().to_string()),
      ("exe_path", exe_path.display().to_string()),
      ("project_name", slot.qualified_name(&project.name)),
      ("version", slot.version().to_string()),
    ];
    entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
  }

  /// Resolve the dependency-path template to an absolute path.
  ///
  /// Returns `None` when no template is configured, or when it references
  /// an unknown variable (logged).
  pub fn dependency_path(
    &self,
    dependencies: &OrderedMap<DependencyValue>,
    vars: &BTreeMap<String, String>,
    root: &Path,
  ) -> Option<String> {
    let template = self.matrix.path_template(dependencies)?;
    if template.is_empty() {
      return None;
    }
    match substitute(template, vars) {
      Ok(path) => Some(absolutize(&path, root)),
      Err(e) => {
        warn!(template = %template, error = %e, "dependency path ignored");
        None
      }
    }
  }

  /// Assemble the argument list for one run.
  ///
  /// The dependency path switch comes first, then every parameter from
  /// `common_params` overlaid with the project's own `params`.
  pub fn arguments(
    &self,
    project: &Project,
    common_params: &OrderedMap<ParamValue>,
    dependency_path: Option<&str>,
    vars: &BTreeMap<String, String>,
  ) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(path) = dependency_path {
      args.push(format!("{}:{path}", self.matrix.path_switch));
    }

    // project switches replace common ones in place, new ones append
    let mut params = common_params.clone();
    params.extend(project.params.iter().map(|(k, v)| (k.clone(), v.clone())));

    for (switch, value) in params.iter() {
      match value.as_deref() {
        None | Some("") => args.push(switch.clone()),
        Some(template) => match substitute_value(template, vars) {
          Ok(value) => args.push(format!("{switch}:{value}")),
          Err(e) => {
            warn!(project = %project.name, switch = %switch, error = %e, "parameter left unsubstituted");
            args.push(format!("{switch}:{template}"));
          }
        },
      }
    }
    args
  }

  /// Run every version of `project`'s test executable.
  ///
  /// Returns true iff every run exited with status zero.
  pub async fn run(
    &self,
    project: &Project,
    resolved_path: &Path,
    common_params: &OrderedMap<ParamValue>,
    dependencies: &OrderedMap<DependencyValue>,
    ctx: &BuildContext,
  ) -> bool {
    let log = BuildLog::new(ctx.log_file());
    let exe_path = executable_path(&ctx.output_dir(), resolved_path);

    if !exe_path.is_file() {
      warn!(project = %project.name, exe = ?exe_path, "test executable missing");
      if let Err(e) = log.line(&format!("Test executable missing: {}", exe_path.display())) {
        warn!(error = %e, "failed to write build log");
      }
      return false;
    }

    let mut all_passed = true;
    for slot in version_slots(project, &self.matrix, dependencies) {
      info!(project = %project.name, slot = %slot, platform = ctx.platform(), "running tests");

      let vars = self.substitution_context(project, &slot, &exe_path, ctx);
      let dep_path = self.dependency_path(dependencies, &vars, ctx.root_dir());
      let args = self.arguments(project, common_params, dep_path.as_deref(), &vars);

      let passed = match self.run_one(&exe_path, &args, ctx, &log).await {
        Ok(passed) => passed,
        Err(e) => {
          log_failure(&log, &e);
          false
        }
      };

      if !passed {
        warn!(project = %project.name, slot = %slot, "test run failed");
        all_passed = false;
      }
    }
    all_passed
  }

  async fn run_one(&self, exe: &Path, args: &[String], ctx: &BuildContext, log: &BuildLog) -> Result<bool, ProcessError> {
    let log_err = |source| ProcessError::Log {
      path: log.path().display().to_string(),
      source,
    };

    let cmd_line = std::iter::once(exe.display().to_string())
      .chain(args.iter().cloned())
      .collect::<Vec<_>>()
      .join(" ");
    log.banner(&format!("CMD: {cmd_line}")).map_err(log_err)?;
    debug!(cmd = %cmd_line, "launching test executable");

    let mut command = Command::new(exe);
    command.args(args);
    let status = match run_logged(command, ctx.env(), ctx.root_dir(), log, self.timeout).await {
      Ok(status) => status,
      Err(ProcessError::Spawn { source, .. }) => {
        log.line(&format!("EXECUTION ERROR: {source}")).map_err(log_err)?;
        return Ok(false);
      }
      Err(e) => return Err(e),
    };

    let code = status.code().map_or_else(|| status.to_string(), |c| c.to_string());
    log.line(&format!("EXIT CODE: {code}")).map_err(log_err)?;
    Ok(status.success())
  }
}
