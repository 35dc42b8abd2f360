/// Host operating systems that can execute test binaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
  Linux,
  MacOs,
  Windows,
}

impl Os {
  /// Detect the current operating system at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::MacOs),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  /// Substring that build platform identifiers for this OS family carry
  /// (e.g. `Win32`, `Win64`, `Linux64`, `OSXARM64`)
  pub fn platform_marker(&self) -> &'static str {
    match self {
      Self::Linux => "Linux",
      Self::MacOs => "OSX",
      Self::Windows => "Win",
    }
  }
}
