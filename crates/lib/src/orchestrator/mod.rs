//! The build matrix run.
//!
//! For each selected compiler and each platform, Phase 1 builds every
//! selected project. Phase 2 runs the test projects, but only when Phase 1
//! had no failures on that platform and the host can execute its binaries.
//! Everything is sequential; each external process finishes before the next
//! one starts.

pub mod report;
pub mod selection;

use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

pub use report::{Report, ReportEntry, StepKind, StepStatus};
pub use selection::{Resolution, SelectedCompiler, SkipReason, matches_tags, resolve_project, select_compilers};

use crate::config::{Project, ResolvedConfig};
use crate::context::{BuildContext, BuildId, RunLayout};
use crate::env::{EnvMap, process_env, profile_env, project_env};
use crate::execute::{TestRunner, Toolchain};
use crate::platform::HostPlatform;
use crate::vcs;

/// Per-run options not carried by the configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
  /// Only projects carrying one of these tags take part. Empty means all.
  pub tags: Vec<String>,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
  pub build_id: BuildId,
  pub output_base: PathBuf,
  pub report: Report,
  /// Whether the output directory was removed after a successful run.
  pub cleaned: bool,
}

impl RunOutcome {
  pub fn is_success(&self) -> bool {
    self.report.is_success()
  }
}

/// Drives one run of the build matrix.
pub struct Orchestrator<T: Toolchain> {
  resolved: ResolvedConfig,
  toolchain: T,
  test_runner: TestRunner,
  host: HostPlatform,
  base_env: EnvMap,
}

impl<T: Toolchain> Orchestrator<T> {
  /// Create an orchestrator over the current process environment.
  pub fn new(resolved: ResolvedConfig, toolchain: T) -> Self {
    let host = HostPlatform::detect(resolved.config.host_platform_marker.as_deref());
    let test_runner = TestRunner::from_config(&resolved.config);
    Self {
      resolved,
      toolchain,
      test_runner,
      host,
      base_env: process_env(),
    }
  }

  pub fn with_host(mut self, host: HostPlatform) -> Self {
    self.host = host;
    self
  }

  /// Replace the environment that scopes are layered onto.
  pub fn with_base_env(mut self, env: EnvMap) -> Self {
    self.base_env = env;
    self
  }

  /// Run the matrix under a freshly generated build id.
  pub async fn run(&self, options: &RunOptions) -> RunOutcome {
    let branch = vcs::branch_or_unknown(&self.resolved.config.git_path, &self.resolved.root).await;
    self.run_with_id(BuildId::generate(&branch), options).await
  }

  /// Run the matrix under `build_id`.
  pub async fn run_with_id(&self, build_id: BuildId, options: &RunOptions) -> RunOutcome {
    let config = &self.resolved.config;
    let root = &self.resolved.root;
    let profile = config.profile();
    let output_base = self.resolved.output_root().join(build_id.as_str());

    info!(build_id = %build_id, root = ?root, profile, "starting run");

    let layout = RunLayout {
      root: root.clone(),
      build_id: build_id.clone(),
      output_base: output_base.clone(),
      toolchain_tag: config.toolchain.tag.clone(),
      aux_dir: config.toolchain.aux_dir.clone(),
    };
    let profile_env = profile_env(&self.base_env, &config.build_options, profile, root);

    let mut report = Report::new();
    for compiler in select_compilers(config, self.resolved.compilers_forced, root) {
      info!(compiler = compiler.id, "processing compiler");
      for platform in &config.platforms {
        let mut ctx = BuildContext::new(layout.clone(), compiler.id, compiler.script.clone(), platform, profile);
        self
          .run_platform(&compiler, &mut ctx, &profile_env, options, &mut report)
          .await;
      }
    }

    let cleaned = if report.is_success() && config.clean_on_success {
      clean_output(&output_base).await
    } else {
      false
    };

    info!(passed = report.passed(), failed = report.failed(), "run complete");
    RunOutcome {
      build_id,
      output_base,
      report,
      cleaned,
    }
  }

  async fn run_platform(
    &self,
    compiler: &SelectedCompiler<'_>,
    ctx: &mut BuildContext,
    profile_env: &EnvMap,
    options: &RunOptions,
    report: &mut Report,
  ) {
    let config = &self.resolved.config;
    let root = &self.resolved.root;
    let platform = ctx.platform().to_string();

    info!(compiler = compiler.id, platform = %platform, "phase 1: building projects");
    let mut built: Vec<(&Project, PathBuf)> = Vec::new();
    let mut build_failed = false;

    for project in &config.projects {
      if !matches_tags(project, &options.tags) {
        continue;
      }

      let path = match resolve_project(project, &compiler.definition.variables, root) {
        Resolution::Resolved(path) => path,
        Resolution::Skipped(reason) => {
          warn!(project = %project.name, reason = %reason, "skipping project");
          continue;
        }
      };

      ctx.set_env(project_env(profile_env, project, root));
      let success = self.toolchain.compile(project, &path, &config.build_options, ctx).await;

      let status = if success {
        StepStatus::Passed
      } else {
        warn!(compiler = compiler.id, platform = %platform, project = %project.name, "build failed");
        build_failed = true;
        StepStatus::BuildFailed
      };
      report.push(ReportEntry::new(compiler.id, &platform, &project.name, StepKind::Build, status));

      if success {
        built.push((project, path));
      }
    }

    if build_failed {
      warn!(platform = %platform, "phase 2: skipping tests due to build failures");
      return;
    }

    let tests: Vec<_> = built.into_iter().filter(|(project, _)| project.is_test()).collect();
    if tests.is_empty() {
      return;
    }
    if !self.host.can_run(&platform) {
      info!(platform = %platform, "phase 2: skipping execution, platform not supported on this host");
      return;
    }

    info!(compiler = compiler.id, platform = %platform, "phase 2: running tests");
    for (project, path) in tests {
      ctx.set_env(project_env(profile_env, project, root));
      let passed = self
        .test_runner
        .run(project, &path, &config.common_params, &config.dependencies, ctx)
        .await;

      let status = if passed {
        StepStatus::Passed
      } else {
        warn!(compiler = compiler.id, platform = %platform, project = %project.name, "test failed");
        StepStatus::TestFailed
      };
      report.push(ReportEntry::new(compiler.id, &platform, &project.name, StepKind::Test, status));
    }
  }
}

/// Remove the run's output directory. Failures are logged, never raised.
async fn clean_output(output_base: &Path) -> bool {
  info!(path = ?output_base, "cleaning up");
  match tokio::fs::remove_dir_all(output_base).await {
    Ok(()) => true,
    Err(e) if e.kind() == io::ErrorKind::NotFound => true,
    Err(e) => {
      warn!(path = ?output_base, error = %e, "cleanup failed");
      false
    }
  }
}
