//! Configuration schema.
//!
//! Every struct is `#[serde(default)]` over a `Default` impl that holds the
//! built-in defaults, so a configuration file replaces defaults key by key
//! and leaves unspecified keys at their default values.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{OrderedMap, scalar};
use crate::consts::COMMON_SCOPE;

/// A test parameter value. `None` or an empty string means the switch is
/// passed on its own as a flag.
pub type ParamValue = Option<String>;

/// The root configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
  /// Repository root, relative to the configuration file's directory.
  pub root: String,
  /// Output directory under the root; each run writes to `<output_root>/<build id>`.
  pub output_root: String,
  /// Version-control executable used to query the current branch.
  pub git_path: String,
  pub clean_on_success: bool,
  /// Build profile name (e.g. `Debug`, `Release`).
  pub default_config: String,
  /// Compiler ids to run when none are given on the command line.
  pub default_compilers: Vec<String>,
  #[serde(alias = "dcc")]
  pub compilers: OrderedMap<CompilerDefinition>,
  pub platforms: Vec<String>,
  pub projects: Vec<Project>,
  /// Parameters passed to every test executable; project params override by switch.
  #[serde(deserialize_with = "scalar::param_map")]
  pub common_params: OrderedMap<ParamValue>,
  pub dependencies: OrderedMap<DependencyValue>,
  pub build_options: BuildOptions,
  pub toolchain: ToolchainSettings,
  pub matrix: MatrixSettings,
  /// Substring identifying platforms whose binaries run on this host.
  pub host_platform_marker: Option<String>,
  /// Upper bound on any single external process, in seconds.
  pub process_timeout_secs: Option<u64>,
}

impl Default for Configuration {
  fn default() -> Self {
    Self {
      root: ".".to_string(),
      output_root: "_build".to_string(),
      git_path: "git".to_string(),
      clean_on_success: false,
      default_config: "Debug".to_string(),
      default_compilers: Vec::new(),
      compilers: OrderedMap::new(),
      platforms: vec!["Win64".to_string()],
      projects: Vec::new(),
      common_params: OrderedMap::new(),
      dependencies: OrderedMap::new(),
      build_options: BuildOptions::default(),
      toolchain: ToolchainSettings::default(),
      matrix: MatrixSettings::default(),
      host_platform_marker: None,
      process_timeout_secs: None,
    }
  }
}

impl Configuration {
  /// The active build profile.
  pub fn profile(&self) -> &str {
    &self.default_config
  }

  /// Check the configuration and return every violation found.
  ///
  /// An empty list means the configuration is usable.
  pub fn violations(&self) -> Vec<String> {
    let mut problems = Vec::new();

    if self.output_root.trim().is_empty() {
      problems.push("output_root must not be empty".to_string());
    }
    if self.default_config.trim().is_empty() {
      problems.push("default_config (build profile) must not be empty".to_string());
    }
    if self.platforms.is_empty() {
      problems.push("platforms must list at least one platform".to_string());
    }
    if self.platforms.iter().any(|p| p.trim().is_empty()) {
      problems.push("platforms must not contain empty identifiers".to_string());
    }

    if self.process_timeout_secs == Some(0) {
      problems.push("process_timeout_secs must be greater than zero; omit it for no limit".to_string());
    }

    for (id, compiler) in self.compilers.iter() {
      if compiler.path.trim().is_empty() {
        problems.push(format!("compiler '{id}': path must not be empty"));
      }
    }

    let mut seen = HashSet::new();
    for (index, project) in self.projects.iter().enumerate() {
      if project.name.trim().is_empty() {
        problems.push(format!("projects[{index}]: name must not be empty"));
      } else if !seen.insert(project.name.as_str()) {
        problems.push(format!("projects[{index}]: duplicate project name '{}'", project.name));
      }
      if project.path.trim().is_empty() {
        problems.push(format!("projects[{index}] '{}': path must not be empty", project.name));
      }
      if project.matrix && self.matrix.versions_key.trim().is_empty() {
        problems.push(format!(
          "projects[{index}] '{}': matrix is set but matrix.versions_key is empty",
          project.name
        ));
      }
    }

    problems
  }
}

/// A compiler toolchain installation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerDefinition {
  /// Path to the environment-initialization script.
  pub path: String,
  pub active: bool,
  /// Values for `{key}` templates in project paths.
  pub variables: OrderedMap<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
  #[default]
  Build,
  Test,
}

/// A project declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
  pub name: String,
  /// Path template; may reference compiler variables such as `{edition}`.
  pub path: String,
  pub tags: Vec<String>,
  #[serde(rename = "type")]
  pub kind: ProjectKind,
  /// Repeat the test once per configured dependency version.
  pub matrix: bool,
  #[serde(deserialize_with = "scalar::param_map")]
  pub params: OrderedMap<ParamValue>,
  #[serde(deserialize_with = "scalar::string_map")]
  pub env_vars: OrderedMap<String>,
}

impl Project {
  pub fn is_test(&self) -> bool {
    self.kind == ProjectKind::Test
  }
}

/// A `dependencies` entry: a version list, a path template, or anything
/// else another tool keeps in the same map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyValue {
  List(#[serde(deserialize_with = "scalar::string_list")] Vec<String>),
  Text(String),
  /// Ignored by matrix lookups.
  Other(serde_json::Value),
}

impl DependencyValue {
  pub fn as_list(&self) -> Option<&[String]> {
    match self {
      Self::List(items) => Some(items),
      Self::Text(_) | Self::Other(_) => None,
    }
  }

  pub fn as_text(&self) -> Option<&str> {
    match self {
      Self::Text(text) => Some(text),
      Self::List(_) | Self::Other(_) => None,
    }
  }
}

/// Overrides for one scope of `build_options`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeOptions {
  #[serde(deserialize_with = "scalar::string_map")]
  pub env_vars: OrderedMap<String>,
  pub defines: Vec<String>,
  pub search_paths: Vec<String>,
}

/// `build_options`, keyed by scope: `common` plus one entry per profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildOptions(pub OrderedMap<ScopeOptions>);

impl Default for BuildOptions {
  fn default() -> Self {
    let mut scopes = OrderedMap::new();
    scopes.insert(COMMON_SCOPE.to_string(), ScopeOptions::default());
    Self(scopes)
  }
}

impl BuildOptions {
  pub fn common(&self) -> Option<&ScopeOptions> {
    self.0.get(COMMON_SCOPE)
  }

  pub fn profile(&self, profile: &str) -> Option<&ScopeOptions> {
    self.0.get(profile)
  }

  /// The common scope then the profile scope, skipping absent ones.
  pub fn layers(&self, profile: &str) -> Vec<&ScopeOptions> {
    self.common().into_iter().chain(self.profile(profile)).collect()
  }

  /// Defines from the common scope followed by the profile scope.
  pub fn defines(&self, profile: &str) -> Vec<&str> {
    self
      .layers(profile)
      .into_iter()
      .flat_map(|scope| scope.defines.iter().map(String::as_str))
      .collect()
  }

  /// Search paths from the common scope followed by the profile scope.
  pub fn search_paths(&self, profile: &str) -> Vec<&str> {
    self
      .layers(profile)
      .into_iter()
      .flat_map(|scope| scope.search_paths.iter().map(String::as_str))
      .collect()
  }
}

/// How to drive the toolchain. Property names are passed through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
  /// Build driver invoked after the environment-initialization script.
  pub driver: String,
  /// Shell used to run the composed command line.
  pub shell: Option<String>,
  /// Directory name for this toolchain under the output base.
  pub tag: String,
  /// Directory name for intermediate artifacts under the output directory.
  pub aux_dir: String,
  pub base_args: Vec<String>,
  pub output_properties: Vec<String>,
  pub aux_output_property: String,
  pub define_property: String,
  pub search_path_properties: Vec<String>,
}

impl Default for ToolchainSettings {
  fn default() -> Self {
    Self {
      driver: "msbuild".to_string(),
      shell: None,
      tag: "DCC".to_string(),
      aux_dir: "DCU".to_string(),
      base_args: vec![
        "/t:Build".to_string(),
        "/v:minimal".to_string(),
        "/p:DCC_Hints=false".to_string(),
      ],
      output_properties: vec![
        "DCC_ExeOutput".to_string(),
        "DCC_BplOutput".to_string(),
        "DCC_DcpOutput".to_string(),
      ],
      aux_output_property: "DCC_DcuOutput".to_string(),
      define_property: "DCC_Define".to_string(),
      search_path_properties: vec!["DCC_SysLibPath".to_string(), "DCC_UnitSearchPath".to_string()],
    }
  }
}

/// Where matrix projects find their dependency versions and paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixSettings {
  /// `dependencies` key holding the version list.
  pub versions_key: String,
  /// `dependencies` keys tried in order for the dependency-path template.
  pub path_keys: Vec<String>,
  /// Switch used to pass the resolved dependency path to test executables.
  pub path_switch: String,
}

impl MatrixSettings {
  /// The version list stored under `versions_key`, empty if absent.
  pub fn versions<'a>(&self, dependencies: &'a OrderedMap<DependencyValue>) -> &'a [String] {
    dependencies
      .get(&self.versions_key)
      .and_then(DependencyValue::as_list)
      .unwrap_or(&[])
  }

  /// The first path template found under `path_keys`.
  pub fn path_template<'a>(&self, dependencies: &'a OrderedMap<DependencyValue>) -> Option<&'a str> {
    self
      .path_keys
      .iter()
      .find_map(|key| dependencies.get(key).and_then(DependencyValue::as_text))
  }
}

impl Default for MatrixSettings {
  fn default() -> Self {
    Self {
      versions_key: "openssl_versions".to_string(),
      path_keys: vec!["openssl_path".to_string(), "openssl_root".to_string()],
      path_switch: "-osp".to_string(),
    }
  }
}
