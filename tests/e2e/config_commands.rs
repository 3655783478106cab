//! Config command E2E tests.

use serde_json::Value;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const CONFIG_TOML: &str = r#"
version = 1

[ignore]
rules = ["system.site:name", "  ", "webform.*"]

[stores]
activeDir = "/srv/config/active"
syncDir = "/srv/config/sync"
"#;

fn cfgi(args: &[&str], env: &[(&str, &str)]) -> io::Result<Output> {
    let mut command = Command::new(env!("CARGO_BIN_EXE_cfgi"));
    for (key, _) in std::env::vars().filter(|(key, _)| key.starts_with("CFGI_")) {
        command.env_remove(key);
    }
    command
        .args(args)
        .arg("--no-progress")
        .envs(env.iter().copied())
        .output()
}

fn temp_file(name: &str, contents: &str) -> io::Result<PathBuf> {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("cfgi-config-{}-{unique}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

fn stdout_json(output: &Output) -> io::Result<Value> {
    serde_json::from_slice(&output.stdout).map_err(io::Error::other)
}

#[test]
fn show_normalizes_rules_from_toml() -> io::Result<()> {
    let path = temp_file("config.toml", CONFIG_TOML)?;
    let path_arg = path.to_string_lossy();

    let output = cfgi(&["config", "show", "--path", &path_arg, "--output", "json"], &[])?;

    assert!(output.status.success(), "config show failed: {output:?}");
    let payload = stdout_json(&output)?;
    assert_eq!(
        payload["effectiveConfig"]["ignore"]["rules"],
        serde_json::json!(["system.site:name", "webform.*"])
    );
    assert_eq!(
        payload["effectiveConfig"]["stores"]["syncDir"],
        "/srv/config/sync"
    );
    Ok(())
}

#[test]
fn env_rules_replace_file_rules() -> io::Result<()> {
    let path = temp_file("config.toml", CONFIG_TOML)?;
    let path_arg = path.to_string_lossy();

    let output = cfgi(
        &["config", "show", "--path", &path_arg, "--output", "json"],
        &[("CFGI_IGNORE_RULES", "system.menu, ~system.site")],
    )?;

    assert!(output.status.success(), "config show failed: {output:?}");
    let payload = stdout_json(&output)?;
    assert_eq!(
        payload["effectiveConfig"]["ignore"]["rules"],
        serde_json::json!(["system.menu", "~system.site"])
    );
    Ok(())
}

#[test]
fn show_renders_toml_text() -> io::Result<()> {
    let output = cfgi(
        &[
            "config",
            "show",
            "--toml",
            "--overrides-json",
            r#"{"ignore":{"rules":["system.menu"]}}"#,
        ],
        &[],
    )?;

    assert!(output.status.success(), "config show failed: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("status: ok\nconfig:\n"));
    assert!(stdout.contains("[ignore]"));
    assert!(stdout.contains("system.menu"));
    Ok(())
}

#[test]
fn check_reports_rule_count() -> io::Result<()> {
    let path = temp_file("config.toml", CONFIG_TOML)?;
    let path_arg = path.to_string_lossy();

    let output = cfgi(&["config", "check", "--path", &path_arg], &[])?;

    assert!(output.status.success(), "config check failed: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("config: ok"));
    assert!(stdout.contains("rules: 2"));
    Ok(())
}

#[test]
fn check_rejects_invalid_rules() -> io::Result<()> {
    let output = cfgi(
        &[
            "config",
            "check",
            "--overrides-json",
            r#"{"ignore":{"rules":["system.site:"]}}"#,
            "--output",
            "json",
        ],
        &[],
    )?;

    assert_eq!(output.status.code(), Some(2));
    let payload = stdout_json(&output)?;
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error"]["code"]["code"], "invalid_rule");
    Ok(())
}

#[test]
fn check_rejects_unsupported_extension() -> io::Result<()> {
    let path = temp_file("config.yaml", "ignore: {}\n")?;
    let path_arg = path.to_string_lossy();

    let output = cfgi(&["config", "check", "--path", &path_arg], &[])?;

    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("config:unsupported_format"));
    Ok(())
}

#[test]
fn invalid_env_bool_is_reported() -> io::Result<()> {
    let output = cfgi(
        &["config", "check"],
        &[("CFGI_IGNORE_DEACTIVATE", "maybe")],
    )?;

    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("status: error"));
    assert!(stdout.contains("CFGI_IGNORE_DEACTIVATE"));
    Ok(())
}
