//! Shared test helpers for CLI integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::{Value, json};
use tempfile::TempDir;

/// Environment-init script; a no-op stand-in for rsvars.
const ENV_SCRIPT: &str = "#!/bin/sh\nexit 0\n";

/// Build driver stand-in.
///
/// Takes the project file first, then `/p:` properties. Projects whose name
/// contains `Broken` fail to build; every other project produces an
/// executable named after the project file in `DCC_ExeOutput`. Executables of
/// projects whose name contains `Failing` exit 1; all others append their
/// arguments to `$TEST_RECORD`.
const DRIVER_SCRIPT: &str = r#"#!/bin/sh
proj="$1"
shift
out=""
for arg in "$@"; do
  case "$arg" in
    /p:DCC_ExeOutput=*) out="${arg#/p:DCC_ExeOutput=}" ;;
  esac
done
name=$(basename "$proj" .dproj)
case "$name" in
  *Broken*) echo "error: $name does not compile"; exit 1 ;;
esac
mkdir -p "$out"
case "$name" in
  *Failing*) printf '#!/bin/sh\nexit 1\n' > "$out/$name" ;;
  *) printf '#!/bin/sh\necho "$0 $*" >> "$TEST_RECORD"\n' > "$out/$name" ;;
esac
chmod +x "$out/$name"
echo "built $name"
"#;

/// A repository with a scripted toolchain.
pub struct TestRepo {
  pub temp: TempDir,
  pub root: PathBuf,
}

impl TestRepo {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let root = dunce::canonicalize(temp.path()).unwrap();
    let repo = Self { temp, root };
    repo.write_executable("tools/rsvars.sh", ENV_SCRIPT);
    repo.write_executable("tools/msbuild.sh", DRIVER_SCRIPT);
    std::fs::create_dir_all(repo.root.join("out")).unwrap();
    repo
  }

  /// Write a file relative to the repository root.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.root.join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
  }

  #[cfg(unix)]
  fn write_executable(&self, relative_path: &str, content: &str) {
    use std::os::unix::fs::PermissionsExt;

    let path = self.write_file(relative_path, content);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  }

  #[cfg(not(unix))]
  fn write_executable(&self, relative_path: &str, content: &str) {
    self.write_file(relative_path, content);
  }

  /// A project declaration whose project file exists under `src/`.
  pub fn project(&self, name: &str, kind: &str) -> Value {
    let path = format!("src/{name}.dproj");
    self.write_file(&path, "<Project/>");
    json!({ "name": name, "path": path, "type": kind })
  }

  /// Configuration with one active compiler on `Win64` and a host marker
  /// that lets `Win` platforms run tests.
  pub fn config(&self, projects: Vec<Value>) -> Value {
    json!({
      "root": ".",
      "platforms": ["Win64"],
      "host_platform_marker": "Win",
      "dcc": {
        "12.0": { "path": "tools/rsvars.sh", "active": true, "variables": { "edition": "D12" } }
      },
      "toolchain": { "driver": self.root.join("tools/msbuild.sh").display().to_string() },
      "build_options": {
        "common": { "env_vars": { "TEST_RECORD": "out/records.txt" } }
      },
      "projects": projects
    })
  }

  pub fn write_config(&self, config: &Value) -> PathBuf {
    self.write_file("build_config.json", &serde_json::to_string_pretty(config).unwrap())
  }

  /// mbuild running in the repository root.
  pub fn cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("mbuild");
    cmd.current_dir(&self.root);
    cmd
  }

  /// Lines appended by test executables.
  pub fn records(&self) -> Vec<String> {
    std::fs::read_to_string(self.root.join("out/records.txt"))
      .unwrap_or_default()
      .lines()
      .map(str::to_string)
      .collect()
  }

  /// Build id directories under the output root.
  pub fn build_dirs(&self) -> Vec<PathBuf> {
    match std::fs::read_dir(self.root.join("_build")) {
      Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
      Err(_) => Vec::new(),
    }
  }

  /// Contents of the single build log for `compiler` and `platform`.
  pub fn build_log(&self, compiler: &str, platform: &str) -> String {
    let dirs = self.build_dirs();
    assert_eq!(dirs.len(), 1, "expected exactly one build directory");
    read(&dirs[0].join(format!("build_{compiler}_{platform}.log")))
  }
}

pub fn read(path: &Path) -> String {
  std::fs::read_to_string(path).unwrap_or_default()
}
