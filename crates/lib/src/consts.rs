//! Names and defaults shared across the crate.

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "build_config.json";

/// Branch placeholder used when the version-control query fails.
pub const UNKNOWN_BRANCH: &str = "UnknownBranch";

/// Length of the random suffix appended to every build id.
pub const BUILD_ID_SUFFIX_LEN: usize = 4;

/// Scope name in `build_options` that applies to every profile.
pub const COMMON_SCOPE: &str = "common";
