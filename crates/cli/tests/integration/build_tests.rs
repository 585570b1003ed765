use std::path::Path;

use predicates::prelude::*;

use super::common::{TestEnv, stdout_json, unit_manifest};

fn project(env: &TestEnv) -> std::path::PathBuf {
  env.write_file("proj/lib/a.s", "echo a\n");
  env.write_file("proj/main.s", "# entry point\nrequire lib/a.s\n")
}

#[test]
fn build_without_extensions_succeeds() {
  let env = TestEnv::empty();
  let script = project(&env);

  env
    .cish_cmd()
    .arg("build")
    .arg(&script)
    .assert()
    .success()
    .stdout(predicate::str::contains("Built"))
    .stdout(predicate::str::contains("Scripts: 2"));

  assert!(env.cache_file().exists());
}

#[test]
fn second_build_is_up_to_date() {
  let env = TestEnv::empty();
  let script = project(&env);

  env.cish_cmd().arg("build").arg(&script).assert().success();

  env
    .cish_cmd()
    .arg("build")
    .arg(&script)
    .assert()
    .success()
    .stdout(predicate::str::contains("up to date"));
}

#[test]
fn editing_a_required_script_rebuilds() {
  let env = TestEnv::empty();
  let script = project(&env);
  env.cish_cmd().arg("build").arg(&script).assert().success();

  env.write_file("proj/lib/a.s", "echo changed\n");

  env
    .cish_cmd()
    .arg("build")
    .arg(&script)
    .assert()
    .success()
    .stdout(predicate::str::contains("Built"));
}

#[test]
fn build_stages_extension_artifacts() {
  let env = TestEnv::empty();
  let script = project(&env);
  let dep = env.write_artifact("gson.jar", "jar bytes");
  env.write_package(
    "github.cxt",
    &[unit_manifest("org.example.Github", &["org.example.Github"], &[dep.as_str()])],
  );

  let output = env
    .cish_cmd()
    .args(["build", "-o", "json"])
    .arg(&script)
    .output()
    .unwrap();
  assert!(output.status.success());

  let json = stdout_json(&output.stdout);
  assert_eq!(json["rebuild_required"], true);
  assert_eq!(json["imports"], serde_json::json!(["org.example.Github"]));

  let artifacts = json["artifacts"].as_array().unwrap();
  assert_eq!(artifacts.len(), 2);
  let output_dir = json["output_dir"].as_str().unwrap();
  for artifact in artifacts {
    let artifact = artifact.as_str().unwrap();
    assert!(Path::new(artifact).exists());
    assert!(Path::new(artifact).starts_with(Path::new(output_dir).join("lib")));
  }
}

#[test]
fn output_dir_flag_moves_outputs() {
  let env = TestEnv::empty();
  let script = project(&env);
  let out = env.temp.path().join("custom-out");

  let output = env
    .cish_cmd()
    .args(["build", "-o", "json", "--output-dir"])
    .arg(&out)
    .arg(&script)
    .output()
    .unwrap();
  assert!(output.status.success());

  let json = stdout_json(&output.stdout);
  assert!(Path::new(json["output_dir"].as_str().unwrap()).starts_with(&out));
}

#[test]
fn missing_artifact_fails_build() {
  let env = TestEnv::empty();
  let script = project(&env);
  let missing = format!("file://{}", env.temp.path().join("nope.jar").display());
  env.write_package(
    "broken.cxt",
    &[unit_manifest("org.example.Broken", &[], &[missing.as_str()])],
  );

  env
    .cish_cmd()
    .arg("build")
    .arg(&script)
    .assert()
    .failure()
    .stderr(predicate::str::contains("could not be fetched"));

  assert!(!env.cache_file().exists());
}

#[test]
fn missing_script_fails() {
  let env = TestEnv::empty();

  env
    .cish_cmd()
    .arg("build")
    .arg(env.temp.path().join("absent.s"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to build"));
}

#[test]
fn check_reports_rebuild_then_up_to_date() {
  let env = TestEnv::empty();
  let script = project(&env);

  let output = env
    .cish_cmd()
    .args(["check", "-o", "json"])
    .arg(&script)
    .output()
    .unwrap();
  let json = stdout_json(&output.stdout);
  assert_eq!(json["rebuild_required"], true);
  assert_eq!(json["scripts"], 2);

  env.cish_cmd().arg("build").arg(&script).assert().success();

  env
    .cish_cmd()
    .arg("check")
    .arg(&script)
    .assert()
    .success()
    .stdout(predicate::str::contains("is up to date"));
}
