//! Import/export/status E2E tests against real store directories.

use serde_json::{Value, json};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const RULES: &str = r#"{"ignore":{"rules":["system.site:name","system.menu","webform.*"]}}"#;

static COUNTER: AtomicU64 = AtomicU64::new(0);

struct Workspace {
    root: PathBuf,
}

impl Workspace {
    fn new(label: &str) -> io::Result<Self> {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let sequence = COUNTER.fetch_add(1, Ordering::Relaxed);
        let root = std::env::temp_dir().join(format!(
            "cfgi-e2e-{label}-{}-{unique}-{sequence}",
            std::process::id()
        ));
        std::fs::create_dir_all(root.join("active"))?;
        std::fs::create_dir_all(root.join("sync"))?;
        Ok(Self { root })
    }

    fn active(&self) -> PathBuf {
        self.root.join("active")
    }

    fn sync(&self) -> PathBuf {
        self.root.join("sync")
    }

    fn run(&self, args: &[&str]) -> io::Result<Output> {
        self.run_with_env(args, &[])
    }

    fn run_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> io::Result<Output> {
        let active = self.active();
        let sync = self.sync();
        let mut command = Command::new(env!("CARGO_BIN_EXE_cfgi"));
        for (key, _) in std::env::vars().filter(|(key, _)| key.starts_with("CFGI_")) {
            command.env_remove(key);
        }
        command
            .args(args)
            .arg("--active")
            .arg(&active)
            .arg("--sync")
            .arg(&sync)
            .args(["--overrides-json", RULES, "--no-progress"])
            .envs(env.iter().copied())
            .output()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

fn write_object(dir: &Path, name: &str, data: &Value) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let encoded = serde_yaml_ng::to_string(data).map_err(io::Error::other)?;
    std::fs::write(dir.join(format!("{name}.yml")), encoded)
}

fn read_object(dir: &Path, name: &str) -> io::Result<Option<Value>> {
    match std::fs::read_to_string(dir.join(format!("{name}.yml"))) {
        Ok(text) => serde_yaml_ng::from_str(&text)
            .map(Some)
            .map_err(io::Error::other),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error),
    }
}

fn stdout_json(output: &Output) -> io::Result<Value> {
    serde_json::from_slice(&output.stdout).map_err(io::Error::other)
}

fn seed(workspace: &Workspace) -> io::Result<()> {
    let active = workspace.active();
    let sync = workspace.sync();
    write_object(
        &active,
        "system.site",
        &json!({"name": "Live", "slogan": "Live slogan"}),
    )?;
    write_object(&active, "system.menu", &json!({"label": "Live"}))?;
    write_object(
        &sync,
        "system.site",
        &json!({"name": "Sync", "slogan": "Sync slogan"}),
    )?;
    write_object(&sync, "system.menu", &json!({"label": "Sync"}))?;
    write_object(&sync, "webform.webform.contact", &json!({"id": "contact"}))?;
    write_object(&sync, "node.type.page", &json!({"type": "page"}))
}

#[test]
fn import_keeps_ignored_live_config() -> io::Result<()> {
    let workspace = Workspace::new("import")?;
    seed(&workspace)?;

    let output = workspace.run(&["import", "--output", "json"])?;
    assert!(output.status.success(), "import failed: {output:?}");

    let payload = stdout_json(&output)?;
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["direction"], "import");
    assert_eq!(payload["counts"]["replaced"], 1);
    assert_eq!(payload["counts"]["keysMerged"], 1);
    assert_eq!(payload["counts"]["deleted"], 1);

    let active = workspace.active();
    assert_eq!(
        read_object(&active, "system.site")?,
        Some(json!({"name": "Live", "slogan": "Sync slogan"}))
    );
    assert_eq!(
        read_object(&active, "system.menu")?,
        Some(json!({"label": "Live"}))
    );
    assert_eq!(read_object(&active, "webform.webform.contact")?, None);
    assert_eq!(
        read_object(&active, "node.type.page")?,
        Some(json!({"type": "page"}))
    );

    assert_eq!(
        read_object(&workspace.sync(), "system.menu")?,
        Some(json!({"label": "Sync"})),
        "import must not touch the sync directory"
    );
    Ok(())
}

#[test]
fn dry_run_import_writes_nothing() -> io::Result<()> {
    let workspace = Workspace::new("dry-run")?;
    seed(&workspace)?;

    let output = workspace.run(&["import", "--dry-run", "--output", "json"])?;
    assert!(output.status.success(), "import failed: {output:?}");

    let payload = stdout_json(&output)?;
    assert_eq!(payload["dryRun"], true);
    assert_eq!(payload["mirror"], Value::Null);
    assert_eq!(
        read_object(&workspace.active(), "node.type.page")?,
        None,
        "dry run must leave the active store alone"
    );
    Ok(())
}

#[test]
fn status_is_clean_after_import() -> io::Result<()> {
    let workspace = Workspace::new("status")?;
    seed(&workspace)?;

    let before = stdout_json(&workspace.run(&["status", "--output", "json"])?)?;
    assert_eq!(before["clean"], false);
    assert_eq!(before["counts"]["create"], 1);

    let import = workspace.run(&["import"])?;
    assert!(import.status.success(), "import failed: {import:?}");

    let after = stdout_json(&workspace.run(&["status", "--output", "json"])?)?;
    assert_eq!(after["clean"], true);
    Ok(())
}

#[test]
fn export_keeps_previous_snapshot_values() -> io::Result<()> {
    let workspace = Workspace::new("export")?;
    seed(&workspace)?;
    write_object(
        &workspace.active().join("language").join("fr"),
        "system.menu",
        &json!({"label": "Principal"}),
    )?;

    let output = workspace.run(&["export"])?;
    assert!(output.status.success(), "export failed: {output:?}");
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("direction: export"));

    let sync = workspace.sync();
    assert_eq!(
        read_object(&sync, "system.site")?,
        Some(json!({"name": "Sync", "slogan": "Live slogan"}))
    );
    assert_eq!(
        read_object(&sync, "system.menu")?,
        Some(json!({"label": "Sync"}))
    );
    assert_eq!(
        read_object(&sync.join("language").join("fr"), "system.menu")?,
        None,
        "whole-ignored objects absent from the previous snapshot are not exported"
    );
    assert_eq!(read_object(&sync, "node.type.page")?, None);
    Ok(())
}

#[test]
fn kill_switch_imports_raw_snapshot() -> io::Result<()> {
    let workspace = Workspace::new("kill-switch")?;
    seed(&workspace)?;

    let output = workspace.run_with_env(&["import"], &[("CFGI_IGNORE_DEACTIVATE", "true")])?;
    assert!(output.status.success(), "import failed: {output:?}");

    let active = workspace.active();
    assert_eq!(
        read_object(&active, "system.menu")?,
        Some(json!({"label": "Sync"}))
    );
    assert_eq!(
        read_object(&active, "webform.webform.contact")?,
        Some(json!({"id": "contact"}))
    );
    Ok(())
}

#[test]
fn invalid_rule_exits_with_invalid_input() -> io::Result<()> {
    let workspace = Workspace::new("bad-rule")?;
    seed(&workspace)?;

    let output = workspace.run_with_env(
        &["import", "--output", "ndjson"],
        &[("CFGI_IGNORE_RULES", "~system.*")],
    )?;

    assert_eq!(output.status.code(), Some(2));
    let payload = stdout_json(&output)?;
    assert_eq!(payload["type"], "error");
    assert_eq!(payload["error"]["code"]["namespace"], "config");
    assert_eq!(
        read_object(&workspace.active(), "system.menu")?,
        Some(json!({"label": "Live"}))
    );
    Ok(())
}

#[test]
fn ndjson_import_streams_actions_then_summary() -> io::Result<()> {
    let workspace = Workspace::new("ndjson")?;
    seed(&workspace)?;

    let output = workspace.run(&["import", "--agent"])?;
    assert!(output.status.success(), "import failed: {output:?}");

    let lines: Vec<Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).map_err(io::Error::other))
        .collect::<io::Result<_>>()?;
    let Some((summary, actions)) = lines.split_last() else {
        return Err(io::Error::other("expected ndjson output"));
    };
    assert_eq!(actions.len(), 3);
    assert!(actions.iter().all(|line| line["type"] == "action"));
    assert_eq!(summary["type"], "summary");
    assert_eq!(summary["kind"], "import");
    Ok(())
}
