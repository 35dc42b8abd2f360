//! Full matrix runs with a scripted toolchain.

use predicates::prelude::*;
use serde_json::{Value, json};

use super::common::{TestRepo, read};

fn with_matrix(mut config: Value, versions: &[&str]) -> Value {
  config["dependencies"] = json!({
    "openssl_versions": versions,
    "openssl_path": "deps/openssl/{version}/{platform}"
  });
  config
}

#[test]
fn builds_then_tests_every_version() {
  let repo = TestRepo::new();
  let mut test = repo.project("CoreTest", "test");
  test["matrix"] = json!(true);
  test["params"] = json!({ "-r": "{project_name}.xml", "-exit": null });
  let config = with_matrix(repo.config(vec![repo.project("Core", "build"), test]), &["3.0", "3.3"]);
  repo.write_config(&config);

  repo
    .cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("12.0 | Win64 | Core (build)"))
    .stdout(predicate::str::contains("12.0 | Win64 | CoreTest (test)"))
    .stdout(predicate::str::contains("Failed").not());

  let records = repo.records();
  assert_eq!(records.len(), 2);
  let osp = repo.root.join("deps/openssl/3.0/Win64");
  assert!(records[0].contains(&format!("-osp:{}", osp.display())));
  assert!(records[0].contains("-r:CoreTest_3.0.xml -exit"));
  assert!(records[1].contains("-r:CoreTest_3.3.xml"));
}

#[test]
fn build_failure_skips_tests_and_exits_nonzero() {
  let repo = TestRepo::new();
  let config = repo.config(vec![repo.project("Broken", "build"), repo.project("CoreTest", "test")]);
  repo.write_config(&config);

  repo
    .cmd()
    .assert()
    .code(1)
    .stdout(predicate::str::contains("Build Failed"))
    .stdout(predicate::str::contains("(test)").not());

  assert!(repo.records().is_empty());
  let log = repo.build_log("12.0", "Win64");
  assert!(log.contains("BUILDING: Broken (Win64)"));
  assert!(log.contains("error: Broken does not compile"));
}

#[test]
fn failing_test_exits_nonzero() {
  let repo = TestRepo::new();
  let config = repo.config(vec![repo.project("FailingTest", "test")]);
  repo.write_config(&config);

  repo
    .cmd()
    .assert()
    .code(1)
    .stdout(predicate::str::contains("Test Failed"));

  assert!(repo.build_log("12.0", "Win64").contains("EXIT CODE: 1"));
}

#[test]
fn tags_filter_projects_silently() {
  let repo = TestRepo::new();
  let mut core = repo.project("Core", "build");
  core["tags"] = json!(["core"]);
  let config = repo.config(vec![core, repo.project("Ui", "build"), repo.project("Tools", "build")]);
  repo.write_config(&config);

  let output = repo.cmd().args(["--tags", "core", "--output", "json"]).output().unwrap();
  assert!(output.status.success());

  let json: Value = serde_json::from_slice(&output.stdout).unwrap();
  let steps = json["steps"].as_array().unwrap();
  assert_eq!(steps.len(), 1);
  assert_eq!(steps[0]["step"], "12.0 | Win64 | Core (build)");
  assert_eq!(steps[0]["status"], "Passed");
}

#[test]
fn cli_versions_replace_configured_versions() {
  let repo = TestRepo::new();
  let mut test = repo.project("CoreTest", "test");
  test["matrix"] = json!(true);
  let config = with_matrix(repo.config(vec![test]), &["3.0", "3.3"]);
  repo.write_config(&config);

  repo.cmd().args(["--dep-versions", "1.1"]).assert().success();

  let records = repo.records();
  assert_eq!(records.len(), 1);
  assert!(records[0].contains("openssl/1.1/Win64"));
}

#[test]
fn unresolvable_projects_are_skipped_not_failed() {
  let repo = TestRepo::new();
  let config = repo.config(vec![
    repo.project("Core", "build"),
    json!({ "name": "Legacy", "path": "src/{codename}/Legacy.dproj" }),
    json!({ "name": "Ghost", "path": "src/Ghost.dproj" }),
  ]);
  repo.write_config(&config);

  repo
    .cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("Legacy").not())
    .stdout(predicate::str::contains("Ghost").not())
    .stderr(predicate::str::contains("skipping project"));
}

#[test]
fn clean_removes_output_after_success() {
  let repo = TestRepo::new();
  let config = repo.config(vec![repo.project("CoreTest", "test")]);
  repo.write_config(&config);

  repo
    .cmd()
    .arg("--clean")
    .assert()
    .success()
    .stdout(predicate::str::contains("Build output removed"));
  assert!(repo.build_dirs().is_empty());

  repo.cmd().arg("--no-clean").assert().success();
  assert_eq!(repo.build_dirs().len(), 1);
}

#[test]
fn root_is_relative_to_config_file() {
  let repo = TestRepo::new();
  let config = repo.config(vec![repo.project("Core", "build")]);
  let config_path = repo.write_config(&config);
  let elsewhere = tempfile::TempDir::new().unwrap();

  repo
    .cmd()
    .current_dir(elsewhere.path())
    .arg("--config")
    .arg(&config_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("Core (build)"));

  assert_eq!(repo.build_dirs().len(), 1);
}

#[test]
fn build_log_records_overrides_and_command() {
  let repo = TestRepo::new();
  let config = repo.config(vec![repo.project("Core", "build")]);
  repo.write_config(&config);

  repo.cmd().assert().success();

  let log = repo.build_log("12.0", "Win64");
  let record = repo.root.join("out/records.txt");
  assert!(log.contains(&format!("  [ENV] TEST_RECORD={}", record.display())));
  assert!(log.contains("  [CMD] "));
  assert!(log.contains("/p:Config=Debug /p:Platform=Win64"));
  assert!(log.contains("built Core"));
  assert!(!log.contains("[ENV] PATH="));
}

#[test]
fn non_host_platforms_build_without_testing() {
  let repo = TestRepo::new();
  let mut config = repo.config(vec![repo.project("CoreTest", "test")]);
  config["platforms"] = json!(["Win64", "Android64"]);
  repo.write_config(&config);

  repo
    .cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("Android64 | CoreTest (build)"))
    .stdout(predicate::str::contains("Android64 | CoreTest (test)").not());

  assert_eq!(repo.records().len(), 1);
  assert!(!read(&repo.build_dirs()[0].join("build_12.0_Android64.log")).is_empty());
}
