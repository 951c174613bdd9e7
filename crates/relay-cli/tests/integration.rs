#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Zero delays so plans drain in a handful of frames.
const FAST_CONFIG: &str = "\
timing:
  open_ms: 0
  select_tab_ms: 0
  select_row_ms: 0
  confirm_ms: 0
";

fn relay(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("relay").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("RELAY_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn fast_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("relay.yaml"), FAST_CONFIG).unwrap();
    dir
}

fn sheet_project() -> TempDir {
    let dir = fast_project();
    let mut yaml = FAST_CONFIG.to_string();
    yaml.push_str("catalog:\n  source: sheet\n  path: actions.yaml\n");
    std::fs::write(dir.path().join("relay.yaml"), yaml).unwrap();
    std::fs::write(
        dir.path().join("actions.yaml"),
        "\
- id: 5
  name: Alpha
  description: first
  cost: 100
- id: 9
  name: Beta
  cost: 200
- id: 11
  name: ''
",
    )
    .unwrap();
    dir
}

// ---------------------------------------------------------------------------
// relay actions / active
// ---------------------------------------------------------------------------

#[test]
fn actions_lists_builtin_catalog() {
    let dir = TempDir::new().unwrap();
    relay(&dir)
        .arg("actions")
        .assert()
        .success()
        .stdout(predicate::str::contains("In Control III"))
        .stdout(predicate::str::contains("A Man's Best Friend II"));
}

#[test]
fn actions_reads_sheet_and_skips_blank_rows() {
    let dir = sheet_project();
    let output = relay(&dir).args(["actions", "--json"]).output().unwrap();
    assert!(output.status.success());

    let actions: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<_> = actions
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Alpha", "Beta"]);
}

#[test]
fn active_is_empty_by_default() {
    let dir = TempDir::new().unwrap();
    relay(&dir)
        .arg("active")
        .assert()
        .success()
        .stdout(predicate::str::contains("No company actions are active."));
}

#[test]
fn active_reports_seeded_actions() {
    let dir = TempDir::new().unwrap();
    let output = relay(&dir)
        .args(["active", "--json", "--seed", "5:600", "--seed", "9"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let active: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(active[0]["id"], 5);
    assert_eq!(active[0]["slot_index"], 0);
    assert_eq!(active[0]["time_remaining"], 600);
    assert_eq!(active[1]["id"], 9);
}

// ---------------------------------------------------------------------------
// relay activate / deactivate
// ---------------------------------------------------------------------------

#[test]
fn activate_runs_the_panel_sequence() {
    let dir = sheet_project();
    let output = relay(&dir)
        .args(["activate", "5", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["intent"], "activate");
    assert_eq!(report["name"], "Alpha");

    let sent = report["sent"].as_array().unwrap();
    let panels: Vec<_> = sent
        .iter()
        .map(|c| c["panel"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(panels, vec!["FreeCompany", "FreeCompany", "SelectYesno"]);
    assert_eq!(sent[0]["event"]["kind"], 1);
    assert_eq!(sent[1]["event"]["kind"], 3);
    assert_eq!(sent[1]["event"]["values"][1]["type"], "u_int");
    assert_eq!(sent[1]["event"]["values"][1]["value"], 5);

    assert_eq!(report["active"][0]["id"], 5);
}

#[test]
fn activate_text_output_lists_sent_callbacks() {
    let dir = fast_project();
    relay(&dir)
        .args(["activate", "12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Activated What You See II [12]"))
        .stdout(predicate::str::contains("FreeCompany <- callback 3 [int(0), uint(12)]"))
        .stdout(predicate::str::contains("SelectYesno <- callback 1 [int(0)]"));
}

#[test]
fn activate_with_default_timing_still_completes() {
    let dir = TempDir::new().unwrap();
    relay(&dir)
        .args(["activate", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("The Heat of Battle"));
}

#[test]
fn activate_unknown_id_fails() {
    let dir = fast_project();
    relay(&dir)
        .args(["activate", "32"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("company action with id 32 not found"));
}

#[test]
fn activate_at_capacity_fails() {
    let dir = fast_project();
    relay(&dir)
        .args(["activate", "12", "--seed", "1", "--seed", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "a maximum of 2 company actions can be active at once",
        ));
}

#[test]
fn activate_already_active_fails() {
    let dir = fast_project();
    relay(&dir)
        .args(["activate", "5", "--seed", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("In Control III is already active"));
}

#[test]
fn deactivate_frees_the_slot() {
    let dir = fast_project();
    let output = relay(&dir)
        .args(["deactivate", "9", "--seed", "5", "--seed", "9", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let sent = report["sent"].as_array().unwrap();
    assert_eq!(sent.len(), 2, "deactivation has no confirm step");
    assert_eq!(sent[1]["event"]["kind"], 2);
    let active = report["active"].as_array().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["id"], 5);
}

#[test]
fn deactivate_inactive_fails() {
    let dir = fast_project();
    relay(&dir)
        .args(["deactivate", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("company action 9 is not currently active"));
}

#[test]
fn hook_logs_watched_traffic_when_verbose() {
    let dir = fast_project();
    relay(&dir)
        .args(["activate", "5", "--hook", "-v"])
        .assert()
        .success()
        .stderr(predicate::str::contains("callback hook installed"))
        .stderr(predicate::str::contains("callback intercepted"));
}

// ---------------------------------------------------------------------------
// relay plan
// ---------------------------------------------------------------------------

#[test]
fn plan_shows_cumulative_stage_times() {
    let dir = TempDir::new().unwrap();
    relay(&dir)
        .args(["plan", "activate", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("+0ms"))
        .stdout(predicate::str::contains("+250ms"))
        .stdout(predicate::str::contains("+400ms"))
        .stdout(predicate::str::contains("+500ms"))
        .stdout(predicate::str::contains("confirm_yes"));
}

#[test]
fn plan_deactivate_has_no_confirm() {
    let dir = TempDir::new().unwrap();
    relay(&dir)
        .args(["plan", "off", "9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("callback 2 [int(4), int(9)]"))
        .stdout(predicate::str::contains("confirm_yes").not());
}

// ---------------------------------------------------------------------------
// relay chat
// ---------------------------------------------------------------------------

#[test]
fn chat_commands_reply_in_order() {
    let dir = sheet_project();
    relay(&dir)
        .args(["chat", "/fca on 9", "/fca active", "/fca off 9", "/fca active"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Activating Beta..."))
        .stdout(predicate::str::contains("slot 1: Beta [9]"))
        .stdout(predicate::str::contains("Deactivating Beta..."))
        .stdout(predicate::str::contains("No company actions are active."));
}

#[test]
fn chat_errors_are_replies_not_failures() {
    let dir = fast_project();
    relay(&dir)
        .args(["chat", "on 99", "dance"])
        .assert()
        .success()
        .stdout(predicate::str::contains("company action with id 99 not found"))
        .stdout(predicate::str::contains("usage: list | active"));
}

// ---------------------------------------------------------------------------
// relay config
// ---------------------------------------------------------------------------

#[test]
fn config_validate_defaults_is_clean() {
    let dir = TempDir::new().unwrap();
    relay(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_reports_errors() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("relay.yaml"),
        "panels:\n  actions: ''\nhook:\n  watch:\n    - !regex '['\n",
    )
    .unwrap();
    relay(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("panels.actions is empty"))
        .stdout(predicate::str::contains("hook.watch"))
        .stderr(predicate::str::contains("config validation found errors"));
}

#[test]
fn config_validate_reports_missing_sheet() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("relay.yaml"),
        "catalog:\n  source: sheet\n  path: missing.yaml\n",
    )
    .unwrap();
    relay(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error] catalog:"));
}

#[test]
fn config_init_writes_loadable_defaults() {
    let dir = TempDir::new().unwrap();
    relay(&dir).args(["config", "init"]).assert().success();
    assert!(dir.path().join("relay.yaml").is_file());

    relay(&dir)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    relay(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SelectYesno"));
}

#[test]
fn explicit_config_flag_overrides_discovery() {
    let dir = fast_project();
    let other = dir.path().join("other.yaml");
    std::fs::write(&other, "timing:\n  select_tab_ms: 999\n").unwrap();

    let output = relay(&dir)
        .args(["config", "show", "--json", "--config"])
        .arg(&other)
        .output()
        .unwrap();
    assert!(output.status.success());
    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["timing"]["select_tab_ms"], 999);
    assert_eq!(config["timing"]["select_row_ms"], 150);
}
