use predicates::prelude::*;

use super::common::{TestEnv, stdout_json, unit_manifest};

#[test]
fn no_extensions_found() {
  let env = TestEnv::empty();

  env
    .cish_cmd()
    .arg("extensions")
    .assert()
    .success()
    .stdout(predicate::str::contains("No extension units found"));
}

#[test]
fn lists_loaded_units() {
  let env = TestEnv::empty();
  env.write_package(
    "tools.cxt",
    &[
      unit_manifest("org.example.Github", &["org.example.Github"], &[]),
      unit_manifest("org.example.Json", &["org.example.Json"], &[]),
    ],
  );

  env
    .cish_cmd()
    .arg("extensions")
    .assert()
    .success()
    .stdout(predicate::str::contains("2 extension unit(s) loaded"))
    .stdout(predicate::str::contains("org.example.Github@1.0"))
    .stdout(predicate::str::contains("org.example.Json@1.0"));
}

#[test]
fn capability_collision_is_reported() {
  let env = TestEnv::empty();
  env.write_package("a.cxt", &[unit_manifest("org.example.A", &["X"], &[])]);
  env.write_package("b.cxt", &[unit_manifest("org.example.B", &["X"], &[])]);

  let output = env
    .cish_cmd()
    .args(["extensions", "-o", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let json = stdout_json(&output.stdout);
  assert_eq!(json["units"].as_array().unwrap().len(), 2);
  assert_eq!(json["imports"], serde_json::json!(["X"]));
  let collisions = json["collisions"].as_array().unwrap();
  assert_eq!(collisions.len(), 1);
  assert_eq!(collisions[0]["kind"], "capability");
  assert_eq!(collisions[0]["capability"], "X");
}

#[test]
fn deny_collisions_fails() {
  let env = TestEnv::empty();
  env.write_package("a.cxt", &[unit_manifest("org.example.A", &["X"], &[])]);
  env.write_package("b.cxt", &[unit_manifest("org.example.B", &["X"], &[])]);

  env
    .cish_cmd()
    .args(["extensions", "--deny-collisions"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("extension conflict"));
}

#[test]
fn dir_flag_scans_only_that_directory() {
  let env = TestEnv::empty();
  env.write_package("a.cxt", &[unit_manifest("org.example.A", &[], &[])]);
  let other = env.temp.path().join("other");
  std::fs::create_dir_all(&other).unwrap();

  env
    .cish_cmd()
    .arg("extensions")
    .arg("--dir")
    .arg(&other)
    .assert()
    .success()
    .stdout(predicate::str::contains("No extension units found"));
}

#[test]
fn malformed_manifest_is_skipped() {
  let env = TestEnv::empty();
  env.write_package(
    "mixed.cxt",
    &["{ not json".to_string(), unit_manifest("org.example.Good", &[], &[])],
  );

  env
    .cish_cmd()
    .arg("extensions")
    .assert()
    .success()
    .stdout(predicate::str::contains("org.example.Good@1.0"));
}
