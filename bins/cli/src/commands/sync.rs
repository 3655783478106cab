//! Import and export command handlers.

use super::{CommandContext, StoreArgs};
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output, format_ndjson_summary, log_info};
use config_ignore_adapters::{FileConfigStore, snapshot_store};
use config_ignore_app::{
    MirrorSummary, ReconcileReport, mirror_store, prepare_export, prepare_import,
};
use config_ignore_domain::SyncDirection;
use config_ignore_shared::ErrorEnvelope;
use std::collections::BTreeMap;

struct SyncOutcome {
    direction: SyncDirection,
    dry_run: bool,
    report: ReconcileReport,
    mirror: Option<MirrorSummary>,
}

/// Run the import command: protect ignored live config, then apply the
/// sync snapshot to the active directory.
pub fn run_import(
    mode: OutputMode,
    args: &StoreArgs,
    dry_run: bool,
    env: &BTreeMap<String, String>,
) -> Result<CliOutput, CliError> {
    match import(mode, args, dry_run, env) {
        Ok(outcome) => format_sync_output(mode, &outcome),
        Err(error) => Ok(format_error_output(mode, &error)),
    }
}

/// Run the export command: capture the active directory, keep ignored
/// values of the previous snapshot, then write the sync directory.
pub fn run_export(
    mode: OutputMode,
    args: &StoreArgs,
    dry_run: bool,
    env: &BTreeMap<String, String>,
) -> Result<CliOutput, CliError> {
    match export(mode, args, dry_run, env) {
        Ok(outcome) => format_sync_output(mode, &outcome),
        Err(error) => Ok(format_error_output(mode, &error)),
    }
}

fn import(
    mode: OutputMode,
    args: &StoreArgs,
    dry_run: bool,
    env: &BTreeMap<String, String>,
) -> Result<SyncOutcome, ErrorEnvelope> {
    let context = CommandContext::load(mode, "import", args, env)?;
    let active = FileConfigStore::open(&context.active_dir)?;
    let sync = FileConfigStore::open(&context.sync_dir)?;

    let incoming = snapshot_store(&sync)?;
    let report = prepare_import(&context.sync_deps(), &active, &incoming)?;
    let mirror = if dry_run {
        None
    } else {
        Some(mirror_store(&incoming, &active)?)
    };

    Ok(SyncOutcome {
        direction: SyncDirection::Import,
        dry_run,
        report,
        mirror,
    })
}

fn export(
    mode: OutputMode,
    args: &StoreArgs,
    dry_run: bool,
    env: &BTreeMap<String, String>,
) -> Result<SyncOutcome, ErrorEnvelope> {
    let context = CommandContext::load(mode, "export", args, env)?;
    let active = FileConfigStore::open(&context.active_dir)?;
    let previous = FileConfigStore::create(&context.sync_dir)?;

    let export = snapshot_store(&active)?;
    let report = prepare_export(&context.sync_deps(), &previous, &export)?;
    let mirror = if dry_run {
        None
    } else {
        Some(mirror_store(&export, &previous)?)
    };

    Ok(SyncOutcome {
        direction: SyncDirection::Export,
        dry_run,
        report,
        mirror,
    })
}

fn format_sync_output(mode: OutputMode, outcome: &SyncOutcome) -> Result<CliOutput, CliError> {
    let mut stderr = String::new();
    log_info(
        &mut stderr,
        &format!("{} completed", outcome.direction),
        mode.no_progress,
    );

    let stdout = if mode.is_ndjson() {
        format_sync_ndjson(outcome)?
    } else if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "direction": outcome.direction,
            "dryRun": outcome.dry_run,
            "counts": outcome.report.counts(),
            "report": outcome.report,
            "mirror": outcome.mirror,
        });
        let mut out = serde_json::to_string_pretty(&payload)?;
        out.push('\n');
        out
    } else {
        format_sync_text(outcome)
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}

fn format_sync_ndjson(outcome: &SyncOutcome) -> Result<String, CliError> {
    let mut out = String::new();
    for collection in &outcome.report.collections {
        for action in &collection.actions {
            let mut payload = serde_json::to_value(action)?;
            if let Some(map) = payload.as_object_mut() {
                map.insert("type".to_string(), serde_json::json!("action"));
                map.insert(
                    "collection".to_string(),
                    serde_json::json!(collection.collection),
                );
            }
            out.push_str(&serde_json::to_string(&payload)?);
            out.push('\n');
        }
    }
    out.push_str(&format_ndjson_summary(
        "ok",
        outcome.direction.as_str(),
        Some(serde_json::json!({
            "dryRun": outcome.dry_run,
            "counts": outcome.report.counts(),
            "mirror": outcome.mirror,
        })),
    ));
    Ok(out)
}

fn format_sync_text(outcome: &SyncOutcome) -> String {
    let counts = outcome.report.counts();
    let mut out = String::new();
    out.push_str("status: ok\n");
    out.push_str(&format!("direction: {}\n", outcome.direction));
    out.push_str(&format!("dryRun: {}\n", outcome.dry_run));
    out.push_str(&format!("replaced: {}\n", counts.replaced));
    out.push_str(&format!("keysMerged: {}\n", counts.keys_merged));
    out.push_str(&format!("skippedMissing: {}\n", counts.skipped_missing));
    out.push_str(&format!("deleted: {}\n", counts.deleted));
    out.push_str(&format!("keysStripped: {}\n", counts.keys_stripped));
    if let Some(mirror) = outcome.mirror {
        out.push_str(&format!("written: {}\n", mirror.written));
        out.push_str(&format!("removed: {}\n", mirror.deleted));
        out.push_str(&format!("unchanged: {}\n", mirror.unchanged));
    }
    for collection in &outcome.report.collections {
        for action in &collection.actions {
            out.push_str(&format!(
                "  {} {} {}\n",
                collection.collection,
                action.label(),
                action.name()
            ));
        }
    }
    out
}
