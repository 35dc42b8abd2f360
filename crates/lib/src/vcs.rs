//! Version-control collaborator.
//!
//! Queried once per run for the current branch name, which becomes part of
//! the build id. Any failure degrades to a placeholder branch.

use std::path::Path;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::consts::UNKNOWN_BRANCH;

/// Ask `git` for the branch checked out in `repo`.
///
/// Returns `None` if git is missing, `repo` is not a repository, or the
/// output is empty.
pub async fn current_branch(git: &str, repo: &Path) -> Option<String> {
  let output = Command::new(git)
    .args(["rev-parse", "--abbrev-ref", "HEAD"])
    .current_dir(repo)
    .output()
    .await;

  match output {
    Ok(output) if output.status.success() => {
      let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
      if branch.is_empty() { None } else { Some(branch) }
    }
    Ok(output) => {
      debug!(code = ?output.status.code(), "git rev-parse failed");
      None
    }
    Err(e) => {
      debug!(git = %git, error = %e, "failed to launch git");
      None
    }
  }
}

/// The current branch, or [`UNKNOWN_BRANCH`].
pub async fn branch_or_unknown(git: &str, repo: &Path) -> String {
  match current_branch(git, repo).await {
    Some(branch) => branch,
    None => {
      warn!("could not determine branch, using '{UNKNOWN_BRANCH}'");
      UNKNOWN_BRANCH.to_string()
    }
  }
}
