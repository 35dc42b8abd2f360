//! Host platform detection.
//!
//! Builds may target platforms the host cannot execute (cross compilation).
//! Test binaries only run for platforms in the host's family.

pub mod os;

use os::Os;

/// Decides which build platforms can execute on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
  marker: Option<String>,
}

impl HostPlatform {
  /// Use `configured` when given, else the running OS's marker.
  pub fn detect(configured: Option<&str>) -> Self {
    let marker = configured
      .map(str::to_string)
      .or_else(|| Os::current().map(|os| os.platform_marker().to_string()));
    Self { marker }
  }

  /// A host identified by an explicit marker.
  pub fn with_marker(marker: &str) -> Self {
    Self {
      marker: Some(marker.to_string()),
    }
  }

  pub fn marker(&self) -> Option<&str> {
    self.marker.as_deref()
  }

  /// Returns true if binaries built for `platform` can run here.
  pub fn can_run(&self, platform: &str) -> bool {
    self
      .marker
      .as_deref()
      .is_some_and(|marker| !marker.is_empty() && platform.contains(marker))
  }
}
