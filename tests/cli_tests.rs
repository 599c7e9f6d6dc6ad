//! CLI smoke tests against the manifest fixtures.

mod common;

use common::{fixture, run_cli_case};

#[test]
fn run_passing_manifest_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let log = home.path().join("out.jsonl");
    let shapes = fixture("shapes.toml");
    let result = run_cli_case(
        "run_passing",
        home.path(),
        &["run", &shapes, "--log", log.to_str().unwrap()],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("RectangleFill(Default)"));
    assert!(result.stdout.contains("RectangleFill(Wide)"));
    assert!(result.stdout.contains("3 passed, 0 failed"));

    let transcript = std::fs::read_to_string(&log).unwrap();
    assert!(transcript.contains("\"event\":\"batch_summary\""));
}

#[test]
fn failing_scenarios_exit_one_with_evidence() {
    let home = tempfile::tempdir().unwrap();
    let failing = fixture("failing.toml");
    let result = run_cli_case("run_failing", home.path(), &["run", &failing, "--no-log"]);
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("Fill -- Act: Blue / Exp: Red [FAIL]"));
    assert!(result.stdout.contains("step NeverRuns: skipped"));
    assert!(result.stdout.contains("timed out waiting for signal TestFinished"));
    assert!(result.stderr.contains("2 of 2 scenario(s) did not pass"));
}

#[test]
fn json_report_is_machine_readable() {
    let home = tempfile::tempdir().unwrap();
    let shapes = fixture("shapes.toml");
    let failing = fixture("failing.toml");
    let result = run_cli_case(
        "run_json",
        home.path(),
        &["--json", "run", &shapes, &failing, "--no-log", "--area", "Shapes"],
    );
    assert_eq!(result.status.code(), Some(1));
    let payload: serde_json::Value = serde_json::from_str(result.stdout.trim()).unwrap();
    let report = &payload["report"];
    assert_eq!(report["selected"], 4);
    assert_eq!(report["passed"], 2);
    assert_eq!(report["failed"], 2);
    let timeout = report["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == "NoSignal")
        .unwrap();
    assert_eq!(timeout["outcome"]["cause"], "timeout");
}

#[test]
fn list_honors_priority_filter() {
    let home = tempfile::tempdir().unwrap();
    let shapes = fixture("shapes.toml");
    let failing = fixture("failing.toml");
    let result = run_cli_case(
        "list_priority",
        home.path(),
        &["--json", "list", &shapes, &failing, "--priority", "0"],
    );
    assert!(result.status.success());
    let payload: serde_json::Value = serde_json::from_str(result.stdout.trim()).unwrap();
    let names: Vec<&str> = payload["scenarios"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s["name"].as_str())
        .collect();
    assert_eq!(names, vec!["RectangleFill(Default)", "RectangleFill(Wide)"]);
}

#[test]
fn invalid_manifest_is_a_usage_error() {
    let home = tempfile::tempdir().unwrap();
    let invalid = fixture("invalid.toml");
    let result = run_cli_case("run_invalid", home.path(), &["run", &invalid]);
    assert_eq!(result.status.code(), Some(2));
    assert!(result.stderr.contains("DRT-2001"));
}

#[test]
fn config_validate_uses_file_and_env() {
    let home = tempfile::tempdir().unwrap();
    let cfg = home.path().join("drt.toml");
    std::fs::write(&cfg, "[runner]\ndefault_wait_timeout_ms = 250\n").unwrap();
    let result = run_cli_case(
        "config_show",
        home.path(),
        &["--json", "--config", cfg.to_str().unwrap(), "config", "show"],
    );
    assert!(result.status.success());
    let payload: serde_json::Value = serde_json::from_str(result.stdout.trim()).unwrap();
    assert_eq!(payload["config"]["runner"]["default_wait_timeout_ms"], 250);

    let missing = home.path().join("absent.toml");
    let result = run_cli_case(
        "config_missing",
        home.path(),
        &["--config", missing.to_str().unwrap(), "config", "validate"],
    );
    assert_eq!(result.status.code(), Some(2));
    assert!(result.stderr.contains("DRT-1002"));
}

#[test]
fn config_show_prints_effective_toml() {
    let home = tempfile::tempdir().unwrap();
    let cfg = home.path().join("drt.toml");
    std::fs::write(&cfg, "[verify]\ncolor_tolerance = 4\n").unwrap();
    let result = run_cli_case(
        "config_show_toml",
        home.path(),
        &["--config", cfg.to_str().unwrap(), "config", "show"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("[verify]"));
    assert!(result.stdout.contains("color_tolerance = 4"));
}
