use predicates::prelude::*;

use super::common::{TestEnv, stdout_json};

fn built_env() -> (TestEnv, std::path::PathBuf) {
  let env = TestEnv::empty();
  let script = env.write_file("proj/main.s", "echo main\n");
  env.cish_cmd().arg("build").arg(&script).assert().success();
  (env, script)
}

#[test]
fn empty_cache_lists_nothing() {
  let env = TestEnv::empty();

  env
    .cish_cmd()
    .args(["cache", "list"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Build cache is empty"));
}

#[test]
fn list_shows_built_script() {
  let (env, script) = built_env();
  let canonical = dunce::canonicalize(&script).unwrap();

  let output = env
    .cish_cmd()
    .args(["cache", "list", "-o", "json"])
    .output()
    .unwrap();
  let json = stdout_json(&output.stdout);

  let entries = json["entries"].as_array().unwrap();
  assert_eq!(entries.len(), 1);
  assert_eq!(entries[0]["script"], canonical.display().to_string());
}

#[test]
fn remove_forces_rebuild() {
  let (env, script) = built_env();

  env
    .cish_cmd()
    .args(["cache", "remove"])
    .arg(&script)
    .assert()
    .success()
    .stdout(predicate::str::contains("Removed"));

  env
    .cish_cmd()
    .arg("check")
    .arg(&script)
    .assert()
    .success()
    .stdout(predicate::str::contains("needs to be rebuilt"));
}

#[test]
fn remove_unknown_script_warns() {
  let env = TestEnv::empty();

  env
    .cish_cmd()
    .args(["cache", "remove", "nowhere.s"])
    .assert()
    .success()
    .stderr(predicate::str::contains("not in the build cache"));
}

#[test]
fn clear_empties_cache() {
  let (env, _script) = built_env();

  env
    .cish_cmd()
    .args(["cache", "clear"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Entries removed: 1"));

  env
    .cish_cmd()
    .args(["cache", "list"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Build cache is empty"));
}
