//! Integration tests for the nilsafe CLI
//!
//! These tests invoke the actual nilsafe-cli binary and verify:
//! - Exit codes (0 = success, 1 = absent containers remain, 2 = error)
//! - stdout/stderr output
//! - JSON output format
//! - Environment fallbacks for tier and root

use std::path::PathBuf;
use std::process::Command;

// ── Helpers ───────────────────────────────────────────────

fn nilsafe_bin() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_BIN_EXE_nilsafe-cli"));
    if !path.exists() {
        path = PathBuf::from("target/debug/nilsafe-cli");
    }
    path
}

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join(format!("../../tests/fixtures/{}", name))
        .to_string_lossy()
        .into_owned()
}

fn command(args: &[&str]) -> Command {
    let mut cmd = Command::new(nilsafe_bin());
    cmd.args(args)
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .env_remove("NILSAFE_TIER")
        .env_remove("NILSAFE_ROOT")
        .env_remove("RUST_LOG");
    cmd
}

fn run_nilsafe(args: &[&str]) -> std::process::Output {
    command(args).output().expect("failed to execute nilsafe-cli")
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("should be valid JSON")
}

// ── Version ───────────────────────────────────────────────

#[test]
fn test_version_command() {
    let output = run_nilsafe(&["version"]);
    assert!(output.status.success(), "version should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("nilsafe"), "should contain 'nilsafe'");
    assert!(
        stdout.contains(env!("CARGO_PKG_VERSION")),
        "should contain version"
    );
}

#[test]
fn test_version_flag() {
    let output = run_nilsafe(&["--version"]);
    assert!(output.status.success(), "--version should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains(env!("CARGO_PKG_VERSION")),
        "should contain version"
    );
}

// ── Normalize ─────────────────────────────────────────────

#[test]
fn test_normalize_fills_absent_containers() {
    let output = run_nilsafe(&[
        "normalize",
        &fixture("schema.json"),
        &fixture("response.json"),
    ]);
    assert!(output.status.success(), "advanced tier should exit 0");
    let json = stdout_json(&output);
    assert_eq!(json["content"][0]["annotations"], serde_json::json!([]));
    assert_eq!(json["content"][0]["data"], serde_json::json!({}));
    assert_eq!(json["content"][1]["annotations"], serde_json::json!(["preview"]));
    assert_eq!(json["structured"], serde_json::json!({}));
    assert_eq!(json["meta"]["tags"], serde_json::json!([]));
    assert_eq!(json["meta"]["progress"], 0.5);
}

#[test]
fn test_normalize_recoverable_matches_advanced() {
    let advanced = run_nilsafe(&[
        "normalize",
        "--tier",
        "advanced",
        &fixture("schema.json"),
        &fixture("response.json"),
    ]);
    let recoverable = run_nilsafe(&[
        "normalize",
        "--tier",
        "recoverable",
        &fixture("schema.json"),
        &fixture("response.json"),
    ]);
    assert!(recoverable.status.success());
    assert_eq!(stdout_json(&advanced), stdout_json(&recoverable));
}

#[test]
fn test_normalize_basic_leaves_nested_absent() {
    let output = run_nilsafe(&[
        "normalize",
        "--tier",
        "basic",
        &fixture("schema.json"),
        &fixture("response.json"),
    ]);
    assert_eq!(
        output.status.code(),
        Some(1),
        "basic tier should leave element containers absent"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("$.content[0].annotations"), "should name the path");
}

#[test]
fn test_normalize_tier_from_env() {
    let output = command(&["normalize", &fixture("schema.json"), &fixture("response.json")])
        .env("NILSAFE_TIER", "basic")
        .output()
        .expect("failed to execute nilsafe-cli");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_normalize_unknown_tier_means_basic() {
    let output = run_nilsafe(&[
        "normalize",
        "--tier",
        "paranoid",
        &fixture("schema.json"),
        &fixture("response.json"),
    ]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_normalize_compact() {
    let output = run_nilsafe(&[
        "normalize",
        "--compact",
        &fixture("schema.json"),
        &fixture("clean.json"),
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim_end().lines().count(), 1, "compact output is one line");
}

#[test]
fn test_normalize_unknown_root() {
    let output = run_nilsafe(&[
        "normalize",
        "--root",
        "Nope",
        &fixture("schema.json"),
        &fixture("response.json"),
    ]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Nope"));
}

#[test]
fn test_normalize_root_from_env() {
    let output = command(&["normalize", &fixture("schema.json"), &fixture("clean.json")])
        .env("NILSAFE_ROOT", "Meta")
        .output()
        .expect("failed to execute nilsafe-cli");
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["tags"], serde_json::json!([]));
}

// ── Check ─────────────────────────────────────────────────

#[test]
fn test_check_lists_absent_paths() {
    let output = run_nilsafe(&["check", &fixture("schema.json"), &fixture("response.json")]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("$.content[0].annotations"));
    assert!(stdout.contains("$.structured"));
    assert!(stdout.contains("$.meta.tags"));
    assert!(!stdout.contains("$.content[1]"));
}

#[test]
fn test_check_clean_document() {
    let output = run_nilsafe(&["check", &fixture("schema.json"), &fixture("clean.json")]);
    assert!(output.status.success(), "clean document should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("no absent containers"));
}

#[test]
fn test_check_json_output() {
    let output = run_nilsafe(&[
        "check",
        "--json",
        &fixture("schema.json"),
        &fixture("response.json"),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["clean"], false);
    assert_eq!(json["absent"].as_array().map(Vec::len), Some(4));
}

// ── Hash ──────────────────────────────────────────────────

#[test]
fn test_hash_is_deterministic() {
    let schema = fixture("schema.json");
    let input = fixture("response.json");
    let first = run_nilsafe(&["hash", &schema, &input]);
    let second = run_nilsafe(&["hash", &schema, &input]);
    assert!(first.status.success());
    let hash = String::from_utf8_lossy(&first.stdout).trim().to_string();
    assert_eq!(hash.len(), 64, "SHA-256 hex digest");
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn test_hash_differs_by_tier_when_result_differs() {
    let basic = run_nilsafe(&[
        "hash",
        "--tier",
        "basic",
        &fixture("schema.json"),
        &fixture("response.json"),
    ]);
    let advanced = run_nilsafe(&[
        "hash",
        "--tier",
        "advanced",
        &fixture("schema.json"),
        &fixture("response.json"),
    ]);
    assert!(basic.status.success());
    assert!(advanced.status.success());
    assert_ne!(basic.stdout, advanced.stdout);
}

// ── Errors ────────────────────────────────────────────────

#[test]
fn test_nonexistent_file() {
    let output = run_nilsafe(&["normalize", &fixture("schema.json"), "nonexistent.json"]);
    assert_eq!(output.status.code(), Some(2), "missing file should exit 2");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"), "should mention error");
}

#[test]
fn test_malformed_input() {
    let output = run_nilsafe(&["check", &fixture("schema.json"), &fixture("malformed.json")]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_schema_with_unknown_type() {
    let output = run_nilsafe(&[
        "normalize",
        &fixture("schema-unknown-type.json"),
        &fixture("clean.json"),
    ]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Missing"));
}

#[test]
fn test_schema_with_oversized_array() {
    let output = run_nilsafe(&[
        "normalize",
        &fixture("schema-oversized.json"),
        &fixture("clean.json"),
    ]);
    assert_eq!(output.status.code(), Some(2), "should fail without aborting");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("array length exceeds"));
}

#[test]
fn test_decode_kind_mismatch() {
    let output = run_nilsafe(&["normalize", &fixture("schema.json"), &fixture("mismatch.json")]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("$.content[0].text"),
        "should name the failing path"
    );
    assert!(stderr.contains("expected String, found number"));
}
