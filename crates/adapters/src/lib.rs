//! # config-ignore-adapters
//!
//! Adapter implementations for ports: config stores (in-memory and YAML
//! file tree) and the structured JSON line logger.
//! This crate depends on `ports`, `domain`, and `shared`.

pub mod file_store;
pub mod log_sink;
pub mod logger;
pub mod memory_store;

pub use file_store::{FileConfigStore, FileStoreError, OBJECT_EXTENSION};
pub use log_sink::{LogSink, MemoryLogSink, StderrLogSink};
pub use logger::JsonLineLogger;
pub use memory_store::{MemoryConfigStore, snapshot_store};

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_ignore_ports::ports_crate_version;
    use config_ignore_shared::shared_crate_version;

    fn workspace_deps() -> Vec<String> {
        let cargo_toml = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"));
        let mut deps = Vec::new();
        let mut in_deps = false;

        for raw_line in cargo_toml.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                in_deps = line == "[dependencies]" || line == "[dev-dependencies]";
                continue;
            }
            if in_deps && line.starts_with("config-ignore-") {
                let key = line.split('=').next().unwrap_or("").trim();
                let name = key.split('.').next().unwrap_or("").trim();
                deps.push(name.to_string());
            }
        }

        deps
    }

    #[test]
    fn adapters_do_not_depend_on_app_or_config() {
        let forbidden = ["config-ignore-app", "config-ignore-config"];
        for dep in workspace_deps() {
            assert!(
                !forbidden.contains(&dep.as_str()),
                "forbidden dependency found: {dep}"
            );
        }
    }

    #[test]
    fn adapters_can_use_ports_and_shared() {
        assert!(!adapters_crate_version().is_empty());
        assert!(!ports_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
