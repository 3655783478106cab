//! Import/export transform entry points and store mirroring.

use crate::reconcile::{ReconcileDeps, ReconcileReport, reconcile};
use crate::settings::IgnoreSettings;
use config_ignore_domain::{ConfigName, SyncDirection};
use config_ignore_ports::{ConfigStore, LogFields, LoggerPort, collections_union};
use config_ignore_shared::{ErrorCode, ErrorEnvelope, Result, ResultExt};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

/// Dependencies required by the import/export transforms.
#[derive(Clone, Default)]
pub struct SyncDeps {
    /// Current ignore settings.
    pub settings: IgnoreSettings,
    /// Optional logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
}

/// Protect ignored live configuration from an incoming snapshot.
///
/// `active` is the authority; `incoming` (usually an in-memory copy of the
/// sync directory) is rewritten so that applying it leaves ignored objects
/// and keys as they are live.
pub fn prepare_import(
    deps: &SyncDeps,
    active: &dyn ConfigStore,
    incoming: &dyn ConfigStore,
) -> Result<ReconcileReport> {
    transform(deps, SyncDirection::Import, active, incoming)
}

/// Keep ignored values of the previous snapshot in a new export.
///
/// `previous` is the authority; `export` is the fresh capture of the active
/// store about to be written out.
pub fn prepare_export(
    deps: &SyncDeps,
    previous: &dyn ConfigStore,
    export: &dyn ConfigStore,
) -> Result<ReconcileReport> {
    transform(deps, SyncDirection::Export, previous, export)
}

fn transform(
    deps: &SyncDeps,
    direction: SyncDirection,
    authority: &dyn ConfigStore,
    incoming: &dyn ConfigStore,
) -> Result<ReconcileReport> {
    let started_at = Instant::now();
    let logger = deps
        .logger
        .as_ref()
        .map(|logger| logger.child(log_fields_direction(direction)));

    if deps.settings.deactivated {
        if let Some(logger) = logger.as_ref() {
            logger.info(
                "configIgnore.transform.deactivated",
                "Ignore transform skipped: kill switch is set",
                None,
            );
        }
        return Ok(ReconcileReport::default());
    }

    if let Some(logger) = logger.as_ref() {
        logger.info(
            &event_name(direction, "start"),
            "Ignore transform started",
            Some(log_fields_rules(&deps.settings)),
        );
    }

    let result = deps.settings.compile().and_then(|ruleset| {
        let reconcile_deps = ReconcileDeps {
            logger: logger.as_ref().map(|logger| Arc::from(logger.child(LogFields::new()))),
        };
        reconcile(&reconcile_deps, authority, incoming, &ruleset)
    });

    match result {
        Ok(report) => {
            if let Some(logger) = logger.as_ref() {
                let mut fields = log_fields_duration(started_at);
                fields.insert(
                    "actions".to_owned().into_boxed_str(),
                    Value::from(report.counts().total()),
                );
                logger.info(
                    &event_name(direction, "completed"),
                    "Ignore transform completed",
                    Some(fields),
                );
            }
            Ok(report)
        },
        Err(error) => {
            let error = error.with_metadata("direction", direction.as_str());
            if let Some(logger) = logger.as_ref() {
                logger.failure(
                    &event_name(direction, "failed"),
                    "Ignore transform failed",
                    Some(log_fields_duration(started_at)),
                    &error,
                );
            }
            Err(error)
        },
    }
}

/// Outcome of [`mirror_store`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorSummary {
    /// Objects created or rewritten in the target.
    pub written: usize,
    /// Objects removed from the target.
    pub deleted: usize,
    /// Objects already identical.
    pub unchanged: usize,
}

/// Make `target` hold exactly what `source` holds, across every collection.
///
/// Identical objects are not rewritten.
pub fn mirror_store(source: &dyn ConfigStore, target: &dyn ConfigStore) -> Result<MirrorSummary> {
    let mut summary = MirrorSummary::default();
    for collection in collections_union(source, target)? {
        let source_c = source.scoped(&collection);
        let target_c = target.scoped(&collection);
        mirror_collection(source_c.as_ref(), target_c.as_ref(), &mut summary)
            .with_error_metadata("collection", collection.to_string())?;
    }
    Ok(summary)
}

fn mirror_collection(
    source: &dyn ConfigStore,
    target: &dyn ConfigStore,
    summary: &mut MirrorSummary,
) -> Result<()> {
    let source_names: BTreeSet<ConfigName> = source.list_all()?.into_iter().collect();

    for name in &source_names {
        let Some(data) = source.read(name)? else {
            return Err(ErrorEnvelope::invariant(
                ErrorCode::new("mirror", "listed_object_missing"),
                format!("source store listed {name} but could not read it"),
            )
            .with_metadata("name", name.as_str()));
        };
        if target.read(name)?.as_ref() == Some(&data) {
            summary.unchanged += 1;
            continue;
        }
        target
            .write(name, &data)
            .with_error_metadata("name", name.as_str())?;
        tracing::debug!(name = %name, collection = %target.collection(), "mirrored object");
        summary.written += 1;
    }

    for name in target.list_all()? {
        if source_names.contains(&name) {
            continue;
        }
        if target
            .delete(&name)
            .with_error_metadata("name", name.as_str())?
        {
            tracing::debug!(name = %name, collection = %target.collection(), "removed object");
            summary.deleted += 1;
        }
    }
    Ok(())
}

fn event_name(direction: SyncDirection, phase: &str) -> String {
    format!("configIgnore.{}.{phase}", direction.as_str())
}

fn duration_ms(started_at: Instant) -> u64 {
    u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn log_fields_direction(direction: SyncDirection) -> LogFields {
    let mut fields = LogFields::new();
    fields.insert(
        "direction".to_owned().into_boxed_str(),
        Value::String(direction.as_str().to_owned()),
    );
    fields
}

fn log_fields_rules(settings: &IgnoreSettings) -> LogFields {
    let mut fields = LogFields::new();
    fields.insert(
        "rules".to_owned().into_boxed_str(),
        Value::from(settings.rules.len()),
    );
    fields.insert(
        "hooks".to_owned().into_boxed_str(),
        Value::from(settings.hooks.len()),
    );
    fields
}

fn log_fields_duration(started_at: Instant) -> LogFields {
    let mut fields = LogFields::new();
    fields.insert(
        "durationMs".to_owned().into_boxed_str(),
        Value::from(duration_ms(started_at)),
    );
    fields
}
