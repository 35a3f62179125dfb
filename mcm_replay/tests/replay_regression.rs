use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tempfile::tempdir;

#[derive(Debug, Deserialize)]
struct ReplayLog {
    entries: usize,
    ticks: usize,
    hardware_interface: Option<String>,
    calls: Vec<Value>,
}

impl ReplayLog {
    fn invocations<'a>(&'a self, target: &'a str, method: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.calls.iter().filter(move |call| {
            call["call"] == "invoke"
                && call["target"] == target
                && call["method"] == method
                && call["delivered"] == true
        })
    }

    fn key_events(&self) -> Vec<(i64, bool)> {
        self.invocations(CONTENT, "ProcessKeyEvent")
            .filter_map(|call| Some((call["args"][0].as_i64()?, call["args"][1].as_bool()?)))
            .collect()
    }

    fn user_events(&self) -> Vec<(String, bool)> {
        self.invocations(CONTENT, "ProcessUserEvent")
            .filter_map(|call| {
                Some((
                    call["args"][0].as_str()?.to_string(),
                    call["args"][1].as_bool()?,
                ))
            })
            .collect()
    }

    fn count(&self, target: &str, method: &str) -> usize {
        self.invocations(target, method).count()
    }

    fn method_count(&self, method: &str) -> usize {
        self.calls
            .iter()
            .filter(|call| call["method"] == method && call["delivered"] == true)
            .count()
    }
}

const CONTENT: &str = "root.mcm_loader.content";
const MCM_MENU: &str = "root.mcm_loader.content.mcmMenu";
const CONFIG_LIST: &str = "root.mcm_loader.content.mcmMenu.configPanel_mc.configList_mc";
const HELP_LIST: &str = "root.mcm_loader.content.mcmMenu.HelpPanel_mc.HelpList_mc";

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn run_replay(trace: &Path, config: Option<&Path>, out_dir: &Path, extra: &[&str]) -> Result<ReplayLog> {
    let log_path = out_dir.join(format!(
        "{}_log.json",
        trace
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("trace")
    ));
    let mut command = Command::new(env!("CARGO_BIN_EXE_mcm_replay"));
    command
        .arg("--trace")
        .arg(trace)
        .arg("--ui-fixture")
        .arg(fixtures_dir().join("menu_fixture.json"))
        .arg("--log-json")
        .arg(&log_path)
        .args(extra);
    if let Some(config) = config {
        command.arg("--config").arg(config);
    }
    let status = command.status().context("executing mcm_replay")?;
    assert!(status.success(), "mcm_replay exited with {status:?}");
    assert!(log_path.is_file(), "mcm_replay did not produce a replay log");

    let raw = fs::read_to_string(&log_path)
        .with_context(|| format!("reading {}", log_path.display()))?;
    serde_json::from_str(&raw).context("parsing replay log")
}

fn pairs(expected: &[(&str, bool)]) -> Vec<(String, bool)> {
    expected
        .iter()
        .map(|(control, down)| (control.to_string(), *down))
        .collect()
}

#[test]
fn engine_event_session_matches_expected_calls() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory for replay log")?;
    let log = run_replay(&fixtures_dir().join("engine_trace.json"), None, temp_dir.path(), &[])?;

    assert_eq!(log.entries, 18);
    assert!(log.hardware_interface.is_none());
    assert_eq!(
        log.key_events(),
        vec![(276, true), (276, false), (274, false), (274, false), (274, false)]
    );
    assert_eq!(
        log.user_events(),
        pairs(&[
            ("Accept", true),
            ("Accept", false),
            ("Right", false),
            ("Up", false),
            ("Down", false),
            ("LShoulder", false),
            ("Right", false),
            ("LShoulder", false),
            ("LShoulder", false),
            ("Cancel", true),
            ("Cancel", false),
        ])
    );

    // Press plus one repeat on the slider; the left stick never adjusts.
    assert_eq!(log.method_count("Increment"), 2);
    assert_eq!(log.method_count("Decrement"), 0);
    assert_eq!(log.count(CONFIG_LIST, "moveSelectionDown"), 1);
    assert_eq!(log.method_count("moveSelectionUp"), 0);

    // One accepted go-back from the submenu, one debounced, one from the root.
    assert_eq!(log.count(MCM_MENU, "LShoulderPressed"), 1);
    assert_eq!(log.count(CONFIG_LIST, "InvalidateData"), 1);
    assert_eq!(log.count(HELP_LIST, "InvalidateData"), 1);
    assert_eq!(log.count(MCM_MENU, "RShoulderPressed"), 1);
    let resets = log
        .calls
        .iter()
        .filter(|call| {
            call["call"] == "set_member"
                && call["target"] == CONFIG_LIST
                && call["member"] == "selectedIndex"
                && call["value"] == -1
        })
        .count();
    assert_eq!(resets, 1);
    Ok(())
}

#[test]
fn hardware_session_matches_expected_calls() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory for replay log")?;
    let fixtures = fixtures_dir();
    let log = run_replay(
        &fixtures.join("hardware_trace.json"),
        Some(&fixtures.join("hardware_config.json")),
        temp_dir.path(),
        &[],
    )?;

    assert_eq!(log.hardware_interface.as_deref(), Some("IVRSystem_022"));
    assert_eq!(log.ticks, 9);
    assert_eq!(
        log.key_events(),
        vec![(276, true), (276, false), (277, true), (277, false)]
    );
    assert_eq!(
        log.user_events(),
        pairs(&[
            ("Accept", true),
            ("Accept", false),
            ("Right", false),
            ("Cancel", true),
            ("Cancel", false),
        ])
    );
    assert_eq!(log.method_count("Increment"), 2);
    Ok(())
}

#[test]
fn recorded_capture_replays_identically() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory for capture")?;
    let fixtures = fixtures_dir();
    let config = fixtures.join("hardware_config.json");
    let capture = temp_dir.path().join("session.mcmt");
    let capture_arg = capture.to_str().context("capture path is not valid UTF-8")?;

    let recorded = run_replay(
        &fixtures.join("hardware_trace.json"),
        Some(&config),
        temp_dir.path(),
        &["--record-capture", capture_arg],
    )?;
    assert!(capture.is_file(), "mcm_replay did not write a capture");
    let bytes = fs::read(&capture).context("reading capture")?;
    assert_eq!(&bytes[..4], b"MCMT");

    let replayed = run_replay(&capture, Some(&config), temp_dir.path(), &[])?;
    assert_eq!(replayed.calls, recorded.calls);
    assert_eq!(replayed.ticks, recorded.ticks);
    Ok(())
}

#[test]
fn missing_fixture_fails_cleanly() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory")?;
    let output = Command::new(env!("CARGO_BIN_EXE_mcm_replay"))
        .arg("--trace")
        .arg(fixtures_dir().join("engine_trace.json"))
        .arg("--ui-fixture")
        .arg(temp_dir.path().join("absent.json"))
        .output()
        .context("executing mcm_replay")?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("loading ui fixture"), "stderr: {stderr}");
    Ok(())
}
