//! Implementation of a build matrix run.
//!
//! Resolves the configuration, runs every compiler × platform × project
//! combination, and prints the consolidated report.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use matrixbuild_lib::config::{self, CliOverrides};
use matrixbuild_lib::execute::MsBuildToolchain;
use matrixbuild_lib::orchestrator::{Orchestrator, Report, RunOptions};

use crate::output::{
  OutputFormat, format_duration, print_error, print_info, print_json, print_stat, print_success, print_warning,
};

pub struct RunArgs {
  pub config: PathBuf,
  pub overrides: CliOverrides,
  pub tags: Vec<String>,
  pub output: OutputFormat,
}

#[derive(Serialize)]
struct RunOutput<'a> {
  build_id: &'a str,
  output_dir: String,
  success: bool,
  cleaned: bool,
  passed: usize,
  failed: usize,
  elapsed_ms: u128,
  steps: &'a Report,
}

/// Execute a run.
///
/// Returns `Ok(false)` when any build or test step failed. Configuration
/// problems are errors.
pub fn cmd_run(args: RunArgs) -> Result<bool> {
  let started = Instant::now();

  let resolved = config::resolve(Some(&args.config), &args.overrides).context("Failed to resolve configuration")?;
  debug!(root = %resolved.root.display(), "resolved repository root");

  let toolchain = MsBuildToolchain::from_config(&resolved.config);
  let orchestrator = Orchestrator::new(resolved, toolchain);
  let options = RunOptions { tags: args.tags };

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let outcome = rt.block_on(orchestrator.run(&options));
  let elapsed = started.elapsed();
  let report = &outcome.report;

  if args.output.is_json() {
    print_json(&RunOutput {
      build_id: outcome.build_id.as_str(),
      output_dir: outcome.output_base.display().to_string(),
      success: outcome.is_success(),
      cleaned: outcome.cleaned,
      passed: report.passed(),
      failed: report.failed(),
      elapsed_ms: elapsed.as_millis(),
      steps: report,
    })?;
    return Ok(outcome.is_success());
  }

  print!("{}", report.render());
  if report.is_empty() {
    print_warning("No steps were run");
  }

  print_stat("Build id", outcome.build_id.as_str());
  print_stat("Output", &outcome.output_base.display().to_string());
  print_stat("Steps", &format!("{} passed, {} failed", report.passed(), report.failed()));
  print_stat("Elapsed", &format_duration(elapsed));
  if outcome.cleaned {
    print_info("Build output removed");
  }

  if outcome.is_success() {
    print_success("All steps passed");
  } else {
    print_error("One or more steps failed");
  }

  Ok(outcome.is_success())
}
