//! Compiler invocation.
//!
//! A toolchain turns one resolved project into one external build process.
//! The orchestrator only sees the boolean outcome; every failure to build,
//! launch, or log is caught here.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::log::BuildLog;
use super::process::{ProcessError, run_logged, shell_command};
use crate::config::{BuildOptions, Configuration, Project, ToolchainSettings};
use crate::context::BuildContext;
use crate::env::override_keys;
use crate::util::path::absolutize;

/// Builds a single project for one build context.
#[allow(async_fn_in_trait)]
pub trait Toolchain {
  /// Build `project` from `resolved_path`, returning true iff the build succeeded.
  ///
  /// Implementations never return errors; failures are logged and reported as false.
  async fn compile(&self, project: &Project, resolved_path: &Path, options: &BuildOptions, ctx: &BuildContext) -> bool;
}

/// MSBuild-style toolchain: an environment-initialization script chained to
/// a build driver that takes `/p:Name=value` property overrides.
#[derive(Debug, Clone)]
pub struct MsBuildToolchain {
  settings: ToolchainSettings,
  timeout: Option<Duration>,
}

impl MsBuildToolchain {
  pub fn new(settings: ToolchainSettings, timeout: Option<Duration>) -> Self {
    Self { settings, timeout }
  }

  pub fn from_config(config: &Configuration) -> Self {
    Self::new(
      config.toolchain.clone(),
      config.process_timeout_secs.map(Duration::from_secs),
    )
  }

  /// Compose the shell command line that builds `project_path`.
  ///
  /// Defines and search paths come from the common scope followed by the
  /// profile scope, and are placed ahead of the toolchain's own values.
  pub fn command_line(&self, project_path: &Path, options: &BuildOptions, ctx: &BuildContext) -> String {
    let s = &self.settings;
    let output_dir = ctx.output_dir();
    let aux_dir = ctx.aux_output_dir();

    let mut parts = vec![
      format!("\"{}\"", ctx.compiler_script().display()),
      "&&".to_string(),
      format!("\"{}\"", s.driver),
      format!("\"{}\"", project_path.display()),
    ];
    parts.extend(s.base_args.iter().cloned());
    parts.push(format!("/p:Config={}", ctx.profile()));
    parts.push(format!("/p:Platform={}", ctx.platform()));
    for property in &s.output_properties {
      parts.push(format!("/p:{property}=\"{}\"", output_dir.display()));
    }
    parts.push(format!("/p:{}=\"{}\"", s.aux_output_property, aux_dir.display()));

    let defines = options.defines(ctx.profile());
    if !defines.is_empty() {
      parts.push(prepend_property(&s.define_property, &defines.join(";")));
    }

    let search_paths: Vec<String> = options
      .search_paths(ctx.profile())
      .into_iter()
      .map(|p| absolutize(p, ctx.root_dir()))
      .collect();
    if !search_paths.is_empty() {
      let joined = search_paths.join(";");
      for property in &s.search_path_properties {
        parts.push(prepend_property(property, &joined));
      }
    }

    parts.join(" ")
  }

  async fn try_compile(
    &self,
    project: &Project,
    resolved_path: &Path,
    options: &BuildOptions,
    ctx: &BuildContext,
    log: &BuildLog,
  ) -> Result<bool, ProcessError> {
    let log_err = |source| ProcessError::Log {
      path: log.path().display().to_string(),
      source,
    };

    for dir in [ctx.output_dir(), ctx.aux_output_dir()] {
      if let Err(source) = tokio::fs::create_dir_all(&dir).await {
        return Err(ProcessError::CreateDir { path: dir, source });
      }
    }

    let line = self.command_line(resolved_path, options, ctx);

    log
      .banner(&format!("BUILDING: {} ({})", project.name, ctx.platform()))
      .map_err(log_err)?;
    for key in override_keys(options, ctx.profile(), project) {
      if let Some(value) = ctx.env().get(&key) {
        log.line(&format!("  [ENV] {key}={value}")).map_err(log_err)?;
      }
    }
    log.line(&format!("\n  [CMD] {line}")).map_err(log_err)?;

    debug!(project = %project.name, cmd = %line, "invoking toolchain");
    let command = shell_command(&line, self.settings.shell.as_deref());
    let status = run_logged(command, ctx.env(), ctx.root_dir(), log, self.timeout).await?;
    Ok(status.success())
  }
}

/// `/p:Name="values;$(Name)"`
fn prepend_property(name: &str, values: &str) -> String {
  format!("/p:{name}=\"{values};$({name})\"")
}

/// Record an invocation error in the build log.
pub(crate) fn log_failure(log: &BuildLog, err: &ProcessError) {
  let entry = match err {
    ProcessError::TimedOut { secs } => format!("  TIMED OUT after {secs}s"),
    other => format!("  [EXCEPTION] {other}"),
  };
  if let Err(e) = log.line(&entry) {
    warn!(log = ?log.path(), error = %e, "failed to write build log");
  }
}

impl Toolchain for MsBuildToolchain {
  async fn compile(&self, project: &Project, resolved_path: &Path, options: &BuildOptions, ctx: &BuildContext) -> bool {
    let log = BuildLog::new(ctx.log_file());
    info!(project = %project.name, platform = ctx.platform(), "building");

    match self.try_compile(project, resolved_path, options, ctx, &log).await {
      Ok(success) => success,
      Err(e) => {
        warn!(project = %project.name, error = %e, "toolchain invocation failed");
        log_failure(&log, &e);
        false
      }
    }
  }
}
