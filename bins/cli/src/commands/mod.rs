//! CLI command handlers.

pub mod config;
pub mod status;
pub mod sync;

pub use config::{run_config_check, run_config_show};
pub use status::run_status;
pub use sync::{run_export, run_import};

use crate::format::OutputMode;
use clap::Args;
use config_ignore_adapters::{JsonLineLogger, StderrLogSink};
use config_ignore_app::{IgnoreSettings, SyncDeps};
use config_ignore_config::{IgnoreEnv, ValidatedIgnoreConfig, load_ignore_config_from_path};
use config_ignore_ports::{LogFields, LogLevel, LoggerPort};
use config_ignore_shared::{ErrorCode, ErrorEnvelope};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Store and config flags shared by the sync commands.
#[derive(Debug, Args)]
pub struct StoreArgs {
    /// Active configuration directory (overrides `stores.activeDir`).
    #[arg(long)]
    pub active: Option<PathBuf>,
    /// Sync snapshot directory (overrides `stores.syncDir`).
    #[arg(long)]
    pub sync: Option<PathBuf>,
    /// Optional config file path (JSON/TOML).
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Optional JSON overrides (partial config).
    #[arg(long)]
    pub overrides_json: Option<String>,
}

/// Effective config, store locations, and logger for one command run.
pub struct CommandContext {
    pub config: ValidatedIgnoreConfig,
    pub active_dir: PathBuf,
    pub sync_dir: PathBuf,
    pub logger: Option<Arc<dyn LoggerPort>>,
}

impl CommandContext {
    /// Resolve config and directories; flags win over config and env.
    pub fn load(
        mode: OutputMode,
        command: &str,
        args: &StoreArgs,
        env: &BTreeMap<String, String>,
    ) -> Result<Self, ErrorEnvelope> {
        let ignore_env = IgnoreEnv::from_map(env)?;
        let config = load_ignore_config_from_path(
            args.config.as_deref(),
            args.overrides_json.as_deref(),
            &ignore_env,
        )?;

        let active_dir = resolve_dir(
            args.active.as_deref(),
            config.stores.active_dir.as_deref(),
            "active",
        )?;
        let sync_dir = resolve_dir(
            args.sync.as_deref(),
            config.stores.sync_dir.as_deref(),
            "sync",
        )?;
        if active_dir == sync_dir {
            return Err(ErrorEnvelope::expected(
                ErrorCode::new("cli", "same_store_dir"),
                "active and sync directories must differ",
            )
            .with_metadata("path", active_dir.display().to_string()));
        }

        let logger = (!mode.no_progress).then(|| build_logger(&config, command));
        Ok(Self {
            config,
            active_dir,
            sync_dir,
            logger,
        })
    }

    /// Ignore settings from the effective config.
    pub fn settings(&self) -> IgnoreSettings {
        IgnoreSettings::with_rules(self.config.ignore.rules.iter().cloned())
            .deactivate(self.config.ignore.deactivate)
    }

    /// Dependencies for the sync transforms.
    pub fn sync_deps(&self) -> SyncDeps {
        SyncDeps {
            settings: self.settings(),
            logger: self.logger.clone(),
        }
    }
}

fn resolve_dir(
    flag: Option<&Path>,
    configured: Option<&Path>,
    label: &str,
) -> Result<PathBuf, ErrorEnvelope> {
    flag.or(configured).map(Path::to_path_buf).ok_or_else(|| {
        ErrorEnvelope::expected(
            ErrorCode::new("cli", "missing_store_dir"),
            format!("missing --{label} directory (flag, config, or env)"),
        )
        .with_metadata("store", label)
    })
}

fn build_logger(config: &ValidatedIgnoreConfig, command: &str) -> Arc<dyn LoggerPort> {
    let level = LogLevel::parse(&config.logging.level).unwrap_or(LogLevel::Info);
    let mut fields = LogFields::new();
    fields.insert(
        "command".to_owned().into_boxed_str(),
        serde_json::Value::String(command.to_owned()),
    );
    Arc::new(
        JsonLineLogger::new(Arc::new(StderrLogSink))
            .with_base_fields(fields)
            .with_min_level(level),
    )
}
