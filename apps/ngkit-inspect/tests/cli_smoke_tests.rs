//! CLI smoke tests for the ngkit-inspect binary

use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Run ngkit-inspect with an isolated home directory.
fn run_inspect(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ngkit-inspect"))
        .args(args)
        .env("HOME", home)
        .env_remove("NGKIT__ASSEMBLER__STRICT")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute ngkit-inspect")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_cli_help_command() {
    let home = TempDir::new().unwrap();
    let output = run_inspect(home.path(), &["--help"]);

    assert!(output.status.success(), "Help command should succeed");
    let out = stdout(&output);
    assert!(out.contains("Usage:"), "Should contain usage information");
    assert!(out.contains("plan"), "Should contain 'plan' subcommand");
    assert!(out.contains("check"), "Should contain 'check' subcommand");
    assert!(out.contains("--strict"), "Should mention strict option");
}

#[test]
fn test_cli_invalid_command() {
    let home = TempDir::new().unwrap();
    let output = run_inspect(home.path(), &["deploy"]);

    assert!(!output.status.success(), "Invalid command should fail");
    assert!(stderr(&output).contains("error"));
}

#[test]
fn test_plan_lists_registrations_in_order() {
    let home = TempDir::new().unwrap();
    let output = run_inspect(home.path(), &["--format", "json", "plan"]);

    assert!(output.status.success(), "plan failed: {}", stderr(&output));
    let plan: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let modules = plan.as_array().unwrap();
    assert_eq!(modules.len(), 2);

    assert_eq!(modules[0]["name"], "common");
    let common: Vec<_> = modules[0]["registrations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["kind"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        common,
        vec!["filter", "directive", "directive", "service", "constant"]
    );

    let showcase = &modules[1];
    assert_eq!(showcase["name"], "showcase");
    assert_eq!(showcase["requires"], serde_json::json!(["common", "ngSanitize"]));
    let user_card = &showcase["registrations"][0];
    assert_eq!(user_card["kind"], "component");
    assert_eq!(user_card["name"], "userCard");
    assert_eq!(user_card["options"]["controller"], "UserCard");
    assert_eq!(
        user_card["options"]["bindings"],
        serde_json::json!({ "compact": "<dense", "onSelect": "&select", "user": "<" })
    );
    assert_eq!(showcase["registrations"][2]["kind"], "provider");
    assert_eq!(showcase["registrations"][2]["get_inject"], serde_json::json!(["$http"]));
}

#[test]
fn test_plan_is_the_default_command() {
    let home = TempDir::new().unwrap();
    let output = run_inspect(home.path(), &[]);

    assert!(output.status.success(), "default run failed: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("name: common"));
    assert!(out.contains("name: showcase"));
}

#[test]
fn test_check_passes_for_declared_modules() {
    let home = TempDir::new().unwrap();
    let output = run_inspect(home.path(), &["check"]);

    assert!(output.status.success(), "check failed: {}", stderr(&output));
    assert!(stdout(&output).contains("OK: 2 modules, 11 registrations"));
}

#[test]
fn test_check_fails_on_skipped_entries() {
    let home = TempDir::new().unwrap();
    let output = run_inspect(home.path(), &["--with-drafts", "check"]);

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("2 entries skipped"), "unexpected stderr: {err}");
    assert!(err.contains("LegacyWidget"));
    assert!(err.contains("LegacyService"));
}

#[test]
fn test_lenient_plan_reports_diagnostics() {
    let home = TempDir::new().unwrap();
    let output = run_inspect(home.path(), &["--with-drafts", "--format", "json", "plan"]);

    assert!(output.status.success(), "plan failed: {}", stderr(&output));
    let plan: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let drafts = &plan[2];
    assert_eq!(drafts["name"], "drafts");
    assert_eq!(drafts["registrations"], serde_json::json!([]));
    assert_eq!(drafts["diagnostics"].as_array().unwrap().len(), 2);
}

#[test]
fn test_strict_flag_aborts_assembly() {
    let home = TempDir::new().unwrap();
    let output = run_inspect(home.path(), &["--strict", "--with-drafts", "plan"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("module 'drafts' has invalid entries"));
}

#[test]
fn test_strict_from_config_file() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("ngkit.yaml");
    std::fs::write(
        &config_path,
        format!(
            "home_dir: \"{}\"\nassembler:\n  strict: true\n",
            home.path().to_string_lossy().replace('\\', "/")
        ),
    )
    .unwrap();

    let output = run_inspect(
        home.path(),
        &["--config", config_path.to_str().unwrap(), "--with-drafts", "check"],
    );
    assert!(!output.status.success());
    assert!(stderr(&output).contains("invalid entries"));
}

#[test]
fn test_print_config() {
    let home = TempDir::new().unwrap();
    let output = run_inspect(home.path(), &["--strict", "--print-config"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("assembler:"));
    assert!(out.contains("strict: true"));
}

#[test]
fn test_missing_config_file() {
    let home = TempDir::new().unwrap();
    let output = run_inspect(home.path(), &["--config", "/nonexistent/ngkit.yaml", "check"]);

    assert!(!output.status.success(), "Should fail with missing config");
    assert!(stderr(&output).contains("config file not found"));
}

#[test]
fn test_invalid_yaml_config() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("invalid.yaml");
    std::fs::write(&config_path, "invalid: yaml: content: [unclosed").unwrap();

    let output = run_inspect(home.path(), &["--config", config_path.to_str().unwrap(), "check"]);
    assert!(!output.status.success(), "Should fail with invalid YAML");
    assert!(stderr(&output).contains("config"));
}
