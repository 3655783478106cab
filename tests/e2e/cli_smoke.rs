//! CLI E2E smoke tests.

use std::io;
use std::process::{Command, Output};

fn cfgi(args: &[&str]) -> io::Result<Output> {
    let mut command = Command::new(env!("CARGO_BIN_EXE_cfgi"));
    for (key, _) in std::env::vars().filter(|(key, _)| key.starts_with("CFGI_")) {
        command.env_remove(key);
    }
    command.args(args).output()
}

#[test]
fn version_is_printed() -> io::Result<()> {
    let output = cfgi(&["--version"])?;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("cfgi "), "unexpected version output: {stdout}");
    Ok(())
}

#[test]
fn help_lists_every_command() -> io::Result<()> {
    let output = cfgi(&["--help"])?;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["import", "export", "status", "config"] {
        assert!(stdout.contains(command), "help is missing {command}");
    }
    Ok(())
}

#[test]
fn missing_store_directories_is_invalid_input() -> io::Result<()> {
    let output = cfgi(&["status", "--no-progress"])?;

    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("status: error"));
    assert!(stdout.contains("cli:missing_store_dir"));
    Ok(())
}

#[test]
fn missing_active_directory_is_reported_as_json() -> io::Result<()> {
    let root = std::env::temp_dir().join(format!("cfgi-smoke-missing-{}", std::process::id()));
    let active = root.join("does-not-exist");
    let sync = root.join("sync");
    let active_arg = active.to_string_lossy();
    let sync_arg = sync.to_string_lossy();

    let output = cfgi(&[
        "import",
        "--active",
        &active_arg,
        "--sync",
        &sync_arg,
        "--output",
        "json",
        "--no-progress",
    ])?;

    assert_eq!(output.status.code(), Some(2));
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).map_err(io::Error::other)?;
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error"]["code"]["code"], "missing_root");
    Ok(())
}

#[test]
fn unknown_command_fails() -> io::Result<()> {
    let output = cfgi(&["reindex"])?;
    assert!(!output.status.success());
    Ok(())
}
