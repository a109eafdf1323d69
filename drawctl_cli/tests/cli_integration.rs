use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{TempDir, tempdir};

// Minimal valid TOML config for the sim backend; daily logs go to the temp dir
fn write_config(dir: &TempDir, pulses_per_sec: f64, timeout_ms: u64) -> PathBuf {
    let toml = format!(
        r#"
[pins]
# pins are unused by the sim backend but must be present
valve_out = 17
flow_in = 6

[safety]
draw_timeout_ms = {timeout_ms}
poll_us = 500

[dispatch]
tick_ms = 10

[daily_log]
dir = {dir:?}

[sim]
pulses_per_sec = {pulses_per_sec:.1}
"#,
        dir = dir.path().display().to_string(),
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn drawctl(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("drawctl_cli").unwrap();
    cmd.arg("--config").arg(cfg);
    cmd
}

fn daily_logs(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("WH_Data_") && n.ends_with(".csv"))
        })
        .collect()
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "sim backend", "stdout")]
#[case(&["draw"], 2, "required", "stderr")]
#[case(&["draw", "--volume", "0"], 0, "draw complete: 0.00", "stdout")]
#[case(&["check-schedule"], 4, "no schedule given", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, 476.0, 2_000);
    let assert = drawctl(&cfg).args(args).assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn manual_draw_completes_and_is_logged() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, 952.0, 5_000);
    drawctl(&cfg)
        .args(["draw", "--volume", "0.25"])
        .assert()
        .success()
        .stdout(predicate::str::contains("draw complete"));

    let logs = daily_logs(dir.path());
    assert_eq!(logs.len(), 1, "expected one daily log, got {logs:?}");
    let text = fs::read_to_string(&logs[0]).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("Time,Draw Amount,Draw Duration"));
    let row: Vec<&str> = lines.next().unwrap().split(',').collect();
    assert_eq!(row.len(), 3);
    assert_eq!(row[0].len(), 8, "time column {:?}", row[0]);
    let volume: f64 = row[1].parse().unwrap();
    assert!((0.25..=0.27).contains(&volume), "volume {volume}");
    assert_eq!(row[2].split('.').nth(1).map(str::len), Some(2));
    assert_eq!(lines.next(), None);
}

#[rstest]
fn dry_line_draw_times_out_but_succeeds() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, 0.0, 200);
    let out = drawctl(&cfg)
        .args(["--json", "draw", "--volume", "1"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["timed_out"], true);
    assert_eq!(v["volume"], 0.0);
    assert_eq!(v["logged"], true);
    assert!(v["duration_s"].as_f64().unwrap() >= 0.2);
}

#[rstest]
fn shared_pins_are_a_config_error() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[pins]\nvalve_out = 6\nflow_in = 6\n").unwrap();
    drawctl(&cfg)
        .arg("self-check")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("must differ"));
}

#[rstest]
fn missing_config_reports_json_error() {
    let dir = tempdir().unwrap();
    let out = drawctl(&dir.path().join("nope.toml"))
        .args(["--json", "self-check"])
        .assert()
        .code(4)
        .get_output()
        .stderr
        .clone();
    let line = String::from_utf8(out).unwrap();
    let last = line.lines().last().unwrap();
    let v: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(v["reason"], "Config");
    assert_eq!(v["exit_code"], 4);
}

#[rstest]
fn check_schedule_summarizes() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, 476.0, 2_000);
    let schedule = dir.path().join("sched.csv");
    fs::write(
        &schedule,
        "Time,Volume\n06:30:00,0.75\n07:15,1.5\n07:15:00,0.5\n22:00:00,0\n",
    )
    .unwrap();
    let out = drawctl(&cfg)
        .arg("--json")
        .arg("check-schedule")
        .arg("--schedule")
        .arg(&schedule)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["entries"], 4);
    assert_eq!(v["distinct_times"], 3);
    assert_eq!(v["total_volume"], 1.25);
    assert_eq!(v["first"], "06:30:00");
    assert_eq!(v["last"], "22:00:00");
}

#[rstest]
fn malformed_schedule_names_the_row() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, 476.0, 2_000);
    let schedule = dir.path().join("sched.csv");
    fs::write(&schedule, "06:30:00,0.75\n25:00:00,1.0\n").unwrap();
    drawctl(&cfg)
        .arg("check-schedule")
        .arg("--schedule")
        .arg(&schedule)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("row 2"));
}

#[rstest]
fn expand_writes_a_loadable_schedule() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, 476.0, 2_000);
    let plan = dir.path().join("plan.csv");
    fs::write(
        &plan,
        "M_LU_time,M_LU_duration,M_S_time,M_S_duration,E_LU_time,E_LU_duration,E_S_time,E_S_duration\n\
         06:00,1,07:00,2,,,,\n",
    )
    .unwrap();
    let out = dir.path().join("sched.csv");
    drawctl(&cfg)
        .arg("expand")
        .arg("--plan")
        .arg(&plan)
        .arg("--out")
        .arg(&out)
        .args(["--interval-min", "15", "--load-up-volume", "0.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote 4 entries from 2 periods"));

    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        "06:00:00,0.5\n06:15:00,0.5\n06:30:00,0.5\n06:45:00,0.5\n"
    );
}

#[rstest]
fn run_stops_after_requested_ticks() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, 476.0, 2_000);
    let schedule = dir.path().join("sched.csv");
    // Degenerate volume: the only entry never draws
    fs::write(&schedule, "03:33:33,0\n").unwrap();
    drawctl(&cfg)
        .arg("run")
        .arg("--schedule")
        .arg(&schedule)
        .args(["--ticks", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stopped after 3 ticks: 0 draws"));

    // Each tick makes sure today's log exists
    assert_eq!(daily_logs(dir.path()).len(), 1);
}
