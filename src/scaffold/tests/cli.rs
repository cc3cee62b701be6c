//! End-to-end tests for the `scaffold-cli` binary.

use assert_cmd::Command;
use std::path::{Path, PathBuf};

fn fixtures_dir() -> PathBuf {
    // scaffold is at src/scaffold, workspace root is two levels up
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("tests/fixtures")
}

/// The binary, run in `dir`, isolated from template settings in the
/// caller's environment.
fn scaffold_cli(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("scaffold-cli").unwrap();
    cmd.current_dir(dir)
        .env_remove("SCAFFOLD_PROJECT_TEMPLATE")
        .env_remove("SCAFFOLD_COMPONENT_TEMPLATE")
        .env_remove("RUST_LOG");
    cmd
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn no_arguments_prints_help() {
    let tmp = tempfile::tempdir().unwrap();
    let output = scaffold_cli(tmp.path()).output().unwrap();
    assert!(!output.status.success());
    assert!(stderr_of(&output).contains("Usage"), "{}", stderr_of(&output));
}

#[test]
fn init_creates_project() {
    let tmp = tempfile::tempdir().unwrap();
    scaffold_cli(tmp.path())
        .args(["init", "my-app"])
        .env("SCAFFOLD_PROJECT_TEMPLATE", fixtures_dir().join("project-template"))
        .assert()
        .success();

    let content = std::fs::read_to_string(tmp.path().join("my-app/package.json")).unwrap();
    let manifest: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(manifest["name"], "my-app");
    assert_eq!(manifest["description"], "my-app");
}

#[test]
fn init_component_uses_component_template_flag() {
    let tmp = tempfile::tempdir().unwrap();
    let template = fixtures_dir().join("component-template");
    scaffold_cli(tmp.path())
        .args(["init", "date-picker", "-c", "--component-template"])
        .arg(&template)
        .assert()
        .success();

    assert!(tmp.path().join("date-picker/src/index.js").is_file());
}

#[test]
fn init_rejects_bad_app_name() {
    let tmp = tempfile::tempdir().unwrap();
    let output = scaffold_cli(tmp.path())
        .args(["init", "1abc"])
        .env("SCAFFOLD_PROJECT_TEMPLATE", fixtures_dir().join("project-template"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("invalid app name"), "{}", stderr_of(&output));
    assert!(!tmp.path().join("1abc").exists());
}

#[test]
fn init_inside_project_fails() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("package.json"), "{}").unwrap();
    let output = scaffold_cli(tmp.path())
        .args(["init", "my-app"])
        .env("SCAFFOLD_PROJECT_TEMPLATE", fixtures_dir().join("project-template"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(!tmp.path().join("my-app").exists());
}

#[test]
fn init_over_existing_directory_without_terminal_is_cancelled() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir(tmp.path().join("my-app")).unwrap();
    std::fs::write(tmp.path().join("my-app/keep.txt"), "keep").unwrap();
    let output = scaffold_cli(tmp.path())
        .args(["init", "my-app"])
        .env("SCAFFOLD_PROJECT_TEMPLATE", fixtures_dir().join("project-template"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(tmp.path().join("my-app/keep.txt").is_file());
    assert!(!tmp.path().join("my-app/package.json").exists());
}

#[test]
fn init_with_yes_overwrites_existing_directory() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir(tmp.path().join("my-app")).unwrap();
    std::fs::write(tmp.path().join("my-app/keep.txt"), "keep").unwrap();
    scaffold_cli(tmp.path())
        .args(["init", "my-app", "--yes"])
        .env("SCAFFOLD_PROJECT_TEMPLATE", fixtures_dir().join("project-template"))
        .assert()
        .success();
    assert!(!tmp.path().join("my-app/keep.txt").exists());
    assert!(tmp.path().join("my-app/package.json").is_file());
}

#[test]
fn update_outside_project_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let output = scaffold_cli(tmp.path()).arg("update").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("package.json"), "{}", stderr_of(&output));
}

#[test]
fn update_then_update_again_succeeds() {
    let tmp = tempfile::tempdir().unwrap();
    let template = fixtures_dir().join("project-template");
    scaffold_cli(tmp.path())
        .args(["init", "my-app"])
        .env("SCAFFOLD_PROJECT_TEMPLATE", &template)
        .assert()
        .success();
    let project = tmp.path().join("my-app");
    std::fs::write(
        project.join("package.json"),
        r#"{ "name": "my-app", "dependencies": { "react": "^16.0.0" } }"#,
    )
    .unwrap();

    scaffold_cli(&project)
        .arg("update")
        .env("SCAFFOLD_PROJECT_TEMPLATE", &template)
        .assert()
        .success();
    let output = scaffold_cli(tmp.path())
        .args(["update", "--cwd"])
        .arg(&project)
        .env("SCAFFOLD_PROJECT_TEMPLATE", &template)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert!(
        String::from_utf8_lossy(&output.stdout).contains("nothing to update"),
        "{}",
        String::from_utf8_lossy(&output.stdout)
    );
    assert!(!project.join(".temp").exists());
}
