// Tests for the wrsync binary: exit codes, offline commands, and a full
// run against a mocked wiki.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use httpmock::prelude::*;
use serde_json::json;

fn wrsync() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_wrsync"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("WRSYNC_CONFIG");
    cmd.env_remove("WRSYNC_WIKI_PASSWORD");
    cmd.env_remove("WRSYNC_SHEETS_TOKEN");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Config with state under `dir`, wiki at `api_url`, ss feed only.
fn write_config(dir: &Path, api_url: &str) -> PathBuf {
    let path = dir.join("config.toml");
    let toml = format!(
        r#"
[wiki]
api_url = '{api_url}'
username = "WRBot"
request_delay_ms = 0

[feeds.rta]
enabled = false

[paths]
baseline_dir = '{}'
report_dir = '{}'
"#,
        dir.join("baseline").display(),
        dir.join("logs").display(),
    );
    std::fs::write(&path, toml).unwrap();
    path
}

// ============================================================================
// Setup errors
// ============================================================================

#[test]
fn missing_explicit_config_is_config_error() {
    let output = wrsync()
        .args(["--config", "/nonexistent/wrsync.toml", "rules", "validate"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("error:"));
}

#[test]
fn run_without_sheets_token_is_missing_secret() {
    let tmp = tempfile::tempdir().unwrap();
    let config = write_config(tmp.path(), "https://wiki.invalid/api.php");
    let output = wrsync().arg("--config").arg(&config).arg("run").output().unwrap();
    assert_eq!(output.status.code(), Some(5), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("WRSYNC_SHEETS_TOKEN"));
}

#[test]
fn long_version_names_commit_and_target() {
    let output = wrsync().arg("--version").output().unwrap();
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains(env!("CARGO_PKG_VERSION")));
    assert!(out.contains("\ncommit: "), "{out}");
    assert!(out.contains("\ntarget: "), "{out}");
}

// ============================================================================
// rules validate
// ============================================================================

#[test]
fn builtin_rules_validate() {
    let tmp = tempfile::tempdir().unwrap();
    let config = write_config(tmp.path(), "https://wiki.invalid/api.php");
    let output = wrsync().arg("--config").arg(&config).args(["rules", "validate"]).output().unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("built-in rules: ok"));
}

#[test]
fn bad_regex_rule_fails_validation() {
    let tmp = tempfile::tempdir().unwrap();
    let config = write_config(tmp.path(), "https://wiki.invalid/api.php");
    let output = wrsync()
        .arg("--config")
        .arg(&config)
        .args(["rules", "validate"])
        .arg(fixtures().join("bad_rules.toml"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("(unclosed"));
}

// ============================================================================
// extract
// ============================================================================

#[test]
fn extract_from_rows_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let config = write_config(tmp.path(), "https://wiki.invalid/api.php");
    let output = wrsync()
        .arg("--config")
        .arg(&config)
        .args(["extract", "ss", "--json", "--rows-dir"])
        .arg(fixtures().join("rows"))
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let records: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["entity_id"], "Big Bob-omb on the Summit");
    assert_eq!(records[0]["link"], "https://youtu.be/bbos-new");
}

#[test]
fn extract_missing_feed_file_is_source_error() {
    let tmp = tempfile::tempdir().unwrap();
    let config = write_config(tmp.path(), "https://wiki.invalid/api.php");
    let output = wrsync()
        .arg("--config")
        .arg(&config)
        .args(["extract", "rta", "--rows-dir"])
        .arg(fixtures().join("rows"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(20));
    assert!(stderr(&output).contains("rta_rows.json"));
}

// ============================================================================
// patch
// ============================================================================

#[test]
fn patch_page_file_to_stdout() {
    let output = wrsync()
        .args(["patch", "tests/fixtures/star_page.wiki", "--feed", "ss", "--time", "14.20"])
        .args(["--link", "https://youtu.be/new"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("|ss_record=[https://youtu.be/new 14.20]\n"));
    assert!(out.contains("|rta_record=[https://youtu.be/oldrta 14.80]\n"));
    assert!(stderr(&output).contains("summary: Updated WR(s) '14.60' to '14.20'"));
}

#[test]
fn patch_slower_time_leaves_page() {
    let tmp = tempfile::tempdir().unwrap();
    let out_path = tmp.path().join("out.wiki");
    let output = wrsync()
        .args(["patch", "tests/fixtures/star_page.wiki", "--feed", "ss", "--time", "14.90"])
        .args(["--link", "https://youtu.be/slow", "--output"])
        .arg(&out_path)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(!out_path.exists());
    assert!(stderr(&output).contains("equal or faster"));
}

#[test]
fn patch_page_without_slot() {
    let output = wrsync()
        .args(["patch", "tests/fixtures/no_slot.wiki", "--feed", "rta", "--time", "9.52"])
        .args(["--link", "https://youtu.be/x"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(30));
    assert!(stderr(&output).contains("speedrun_infobox"));
}

#[test]
fn patch_malformed_time_is_usage_error() {
    let output = wrsync()
        .args(["patch", "tests/fixtures/star_page.wiki", "--feed", "ss", "--time", "soon"])
        .args(["--link", "https://youtu.be/x"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("malformed duration 'soon'"));
}

// ============================================================================
// run
// ============================================================================

#[test]
fn run_publishes_then_has_nothing_to_update() {
    let server = MockServer::start();
    let login_token = server.mock(|when, then| {
        when.method(GET).path("/api.php").query_param("type", "login");
        then.status(200).json_body(json!({ "query": { "tokens": { "logintoken": "lt" } } }));
    });
    let login = server.mock(|when, then| {
        when.method(POST).path("/api.php").query_param("action", "login");
        then.status(200).json_body(json!({ "login": { "result": "Success", "lgusername": "WRBot" } }));
    });
    let page_text = std::fs::read_to_string(fixtures().join("star_page.wiki")).unwrap();
    let read = server.mock(|when, then| {
        when.method(GET)
            .path("/api.php")
            .query_param("prop", "revisions")
            .query_param("titles", "RTA Guide/Big Bob-omb on the Summit");
        then.status(200).json_body(json!({
            "curtimestamp": "2026-10-16T12:00:05Z",
            "query": {
                "pages": [{
                    "title": "RTA Guide/Big Bob-omb on the Summit",
                    "revisions": [{
                        "timestamp": "2026-09-01T08:00:00Z",
                        "slots": { "main": { "content": page_text } }
                    }]
                }],
                "tokens": { "csrftoken": "csrf" }
            }
        }));
    });
    let edit = server.mock(|when, then| {
        when.method(POST).path("/api.php").query_param("action", "edit");
        then.status(200).json_body(json!({ "edit": { "result": "Success", "newrevid": 7 } }));
    });

    let tmp = tempfile::tempdir().unwrap();
    let config = write_config(tmp.path(), &server.url("/api.php"));
    let rows = fixtures().join("rows");

    let output = wrsync()
        .arg("--config")
        .arg(&config)
        .args(["run", "--feed", "ss", "--rows-dir"])
        .arg(&rows)
        .env("WRSYNC_WIKI_PASSWORD", "secret")
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("1 updated, 0 failed"));
    login_token.assert();
    login.assert();
    read.assert();
    edit.assert();

    let baseline = std::fs::read_to_string(tmp.path().join("baseline/last_saved_ss.json")).unwrap();
    assert!(baseline.contains("https://youtu.be/bbos-new"));
    let reports: Vec<_> = std::fs::read_dir(tmp.path().join("logs")).unwrap().collect();
    assert_eq!(reports.len(), 1);

    // Same rows again: baseline is current, no wiki traffic.
    let output = wrsync()
        .arg("--config")
        .arg(&config)
        .args(["run", "--feed", "ss", "--json", "--rows-dir"])
        .arg(&rows)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["nothing_to_update"], true);
    login.assert_hits(1);
    edit.assert_hits(1);
}

#[test]
fn dry_run_reads_but_does_not_edit_or_commit() {
    let server = MockServer::start();
    let page_text = std::fs::read_to_string(fixtures().join("star_page.wiki")).unwrap();
    let read = server.mock(|when, then| {
        when.method(GET).path("/api.php").query_param("prop", "revisions");
        then.status(200).json_body(json!({
            "curtimestamp": "2026-10-16T12:00:05Z",
            "query": {
                "pages": [{
                    "title": "RTA Guide/Big Bob-omb on the Summit",
                    "revisions": [{
                        "timestamp": "2026-09-01T08:00:00Z",
                        "slots": { "main": { "content": page_text } }
                    }]
                }]
            }
        }));
    });
    let edit = server.mock(|when, then| {
        when.method(POST).path("/api.php");
        then.status(500);
    });

    let tmp = tempfile::tempdir().unwrap();
    let config = write_config(tmp.path(), &server.url("/api.php"));
    let output = wrsync()
        .arg("--config")
        .arg(&config)
        .args(["run", "--feed", "ss", "--dry-run", "--rows-dir"])
        .arg(fixtures().join("rows"))
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("1 would be updated"));
    read.assert();
    edit.assert_hits(0);
    assert!(!tmp.path().join("baseline/last_saved_ss.json").exists());
}

#[test]
fn missing_rows_aborts_run() {
    let tmp = tempfile::tempdir().unwrap();
    let config = write_config(tmp.path(), "https://wiki.invalid/api.php");
    let output = wrsync()
        .arg("--config")
        .arg(&config)
        .args(["run", "--feed", "rta", "--rows-dir"])
        .arg(fixtures().join("rows"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(10));
    assert!(stderr(&output).contains("source 'rta' unavailable"));
}
