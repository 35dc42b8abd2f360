//! Run report: every attempted step and its terminal status.

use std::fmt;

use serde::Serialize;

const TABLE_WIDTH: usize = 80;
const STEP_COLUMN: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepStatus {
  #[serde(rename = "Build Failed")]
  BuildFailed,
  #[serde(rename = "Test Failed")]
  TestFailed,
  Passed,
}

impl StepStatus {
  pub fn is_failure(self) -> bool {
    self != StepStatus::Passed
  }
}

impl fmt::Display for StepStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      StepStatus::BuildFailed => "Build Failed",
      StepStatus::TestFailed => "Test Failed",
      StepStatus::Passed => "Passed",
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
  Build,
  Test,
}

impl fmt::Display for StepKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      StepKind::Build => "build",
      StepKind::Test => "test",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
  pub step: String,
  pub kind: StepKind,
  pub status: StepStatus,
}

impl ReportEntry {
  /// `<compiler> | <platform> | <project> (<kind>)`
  pub fn new(compiler: &str, platform: &str, project: &str, kind: StepKind, status: StepStatus) -> Self {
    Self {
      step: format!("{compiler} | {platform} | {project} ({kind})"),
      kind,
      status,
    }
  }
}

/// Steps in the order they were attempted. Skipped projects never appear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Report {
  entries: Vec<ReportEntry>,
}

impl Report {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, entry: ReportEntry) {
    self.entries.push(entry);
  }

  pub fn entries(&self) -> &[ReportEntry] {
    &self.entries
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// True iff no step failed. An empty report is a success.
  pub fn is_success(&self) -> bool {
    self.failed() == 0
  }

  pub fn passed(&self) -> usize {
    self.entries.iter().filter(|e| !e.status.is_failure()).count()
  }

  pub fn failed(&self) -> usize {
    self.entries.iter().filter(|e| e.status.is_failure()).count()
  }

  /// Fixed-width table of every step.
  pub fn render(&self) -> String {
    let heavy = "=".repeat(TABLE_WIDTH);
    let light = "-".repeat(TABLE_WIDTH);

    let mut out = format!("\n{heavy}\n{:<width$} | STATUS\n{light}\n", "STEP", width = STEP_COLUMN);
    for entry in &self.entries {
      out.push_str(&format!("{:<width$} | {}\n", entry.step, entry.status, width = STEP_COLUMN));
    }
    out.push_str(&heavy);
    out.push('\n');
    out
  }
}
