//! Status command handler.

use super::{CommandContext, StoreArgs};
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use crate::{CliOutput, format_error_output, format_ndjson_summary, log_info};
use config_ignore_adapters::FileConfigStore;
use config_ignore_app::{
    ChangeOp, CollectionDecisions, StoreComparison, compare_stores, preview_decisions,
};
use config_ignore_domain::{IgnoreDecision, Ruleset};
use config_ignore_shared::ErrorEnvelope;
use std::collections::BTreeMap;

struct StatusReport {
    deactivated: bool,
    comparison: StoreComparison,
    decisions: Option<Vec<CollectionDecisions>>,
}

/// Run the status command: what an import would change, after ignore rules.
pub fn run_status(
    mode: OutputMode,
    args: &StoreArgs,
    with_decisions: bool,
    env: &BTreeMap<String, String>,
) -> Result<CliOutput, CliError> {
    match read_status(mode, args, with_decisions, env) {
        Ok(report) => format_status_output(mode, &report),
        Err(error) => Ok(format_error_output(mode, &error)),
    }
}

fn read_status(
    mode: OutputMode,
    args: &StoreArgs,
    with_decisions: bool,
    env: &BTreeMap<String, String>,
) -> Result<StatusReport, ErrorEnvelope> {
    let context = CommandContext::load(mode, "status", args, env)?;
    let settings = context.settings();
    let active = FileConfigStore::open(&context.active_dir)?;
    let sync = FileConfigStore::open(&context.sync_dir)?;

    let comparison = compare_stores(&active, &sync, &settings)?;
    let decisions = if with_decisions {
        // Kill switch: every name previews as not ignored.
        let ruleset = if settings.deactivated {
            Ruleset::default()
        } else {
            settings.compile()?
        };
        Some(preview_decisions(&ruleset, &sync)?)
    } else {
        None
    };

    Ok(StatusReport {
        deactivated: settings.deactivated,
        comparison,
        decisions,
    })
}

fn format_status_output(mode: OutputMode, report: &StatusReport) -> Result<CliOutput, CliError> {
    let mut stderr = String::new();
    log_info(&mut stderr, "status completed", mode.no_progress);

    let stdout = if mode.is_ndjson() {
        format_status_ndjson(report)?
    } else if mode.is_json() {
        let payload = serde_json::json!({
            "status": "ok",
            "clean": report.comparison.is_clean(),
            "deactivated": report.deactivated,
            "counts": counts_json(&report.comparison),
            "changes": report.comparison.changes().collect::<Vec<_>>(),
            "decisions": report.decisions,
        });
        let mut out = serde_json::to_string_pretty(&payload)?;
        out.push('\n');
        out
    } else {
        format_status_text(report)
    };

    Ok(CliOutput {
        stdout,
        stderr,
        exit_code: ExitCode::Ok,
    })
}

fn format_status_ndjson(report: &StatusReport) -> Result<String, CliError> {
    let mut out = String::new();
    for entry in report.comparison.changes() {
        let payload = serde_json::json!({
            "type": "change",
            "collection": entry.collection,
            "name": entry.name,
            "op": entry.op,
            "decision": entry.decision.label(),
        });
        out.push_str(&serde_json::to_string(&payload)?);
        out.push('\n');
    }
    for collection in report.decisions.iter().flatten() {
        for (name, decision) in &collection.decisions {
            let payload = serde_json::json!({
                "type": "decision",
                "collection": collection.collection,
                "name": name,
                "decision": decision,
            });
            out.push_str(&serde_json::to_string(&payload)?);
            out.push('\n');
        }
    }
    out.push_str(&format_ndjson_summary(
        "ok",
        "status",
        Some(serde_json::json!({
            "clean": report.comparison.is_clean(),
            "deactivated": report.deactivated,
            "counts": counts_json(&report.comparison),
        })),
    ));
    Ok(out)
}

fn format_status_text(report: &StatusReport) -> String {
    let comparison = &report.comparison;
    let mut out = String::new();
    push_kv(&mut out, "status", "ok");
    push_kv(&mut out, "clean", bool_str(comparison.is_clean()));
    push_kv(&mut out, "deactivated", bool_str(report.deactivated));
    for op in [ChangeOp::Create, ChangeOp::Update, ChangeOp::Delete] {
        push_kv(&mut out, op.as_str(), &comparison.count(op).to_string());
    }
    for entry in comparison.changes() {
        out.push_str(&format!(
            "  {} {} {}\n",
            entry.op.as_str(),
            entry.collection,
            entry.name
        ));
    }

    if let Some(decisions) = report.decisions.as_ref() {
        out.push_str("decisions:\n");
        for collection in decisions {
            for (name, decision) in &collection.decisions {
                out.push_str(&format!(
                    "  {} {} {}\n",
                    collection.collection,
                    name,
                    decision_text(decision)
                ));
            }
        }
    }
    out
}

fn counts_json(comparison: &StoreComparison) -> serde_json::Value {
    serde_json::json!({
        "create": comparison.count(ChangeOp::Create),
        "update": comparison.count(ChangeOp::Update),
        "delete": comparison.count(ChangeOp::Delete),
        "unchanged": comparison.count(ChangeOp::Unchanged),
    })
}

fn decision_text(decision: &IgnoreDecision) -> String {
    match decision {
        IgnoreDecision::Keyed(keys) => {
            let keys: Vec<String> = keys.iter().map(ToString::to_string).collect();
            format!("keyed [{}]", keys.join(", "))
        },
        other => other.label().to_owned(),
    }
}

const fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

#[inline]
fn push_kv(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push_str(": ");
    out.push_str(value);
    out.push('\n');
}
