//! # config-ignore-app
//!
//! Application use cases: ignore-aware import/export transforms, the
//! read-time filter, and ignore-annotated comparison.
//! This crate depends on `ports`, `domain`, and `shared`.

pub mod compare;
pub mod read_filter;
pub mod reconcile;
pub mod settings;
pub mod sync;

pub use compare::{
    ChangeOp, CollectionDecisions, ComparisonEntry, StoreComparison, compare_stores,
    preview_decisions,
};
pub use read_filter::ReadFilter;
pub use reconcile::{
    ActionCounts, CollectionReport, ReconcileAction, ReconcileDeps, ReconcileReport, reconcile,
    resolve_store,
};
pub use settings::IgnoreSettings;
pub use sync::{MirrorSummary, SyncDeps, mirror_store, prepare_export, prepare_import};

/// Returns the app crate version.
#[must_use]
pub const fn app_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_ignore_domain::domain_crate_version;
    use config_ignore_ports::ports_crate_version;
    use config_ignore_shared::shared_crate_version;

    #[test]
    fn app_crate_compiles() {
        let version = app_crate_version();
        assert!(!version.is_empty());
    }

    #[test]
    fn app_can_use_ports_domain_shared() {
        let ports_version = ports_crate_version();
        let domain_version = domain_crate_version();
        let shared_version = shared_crate_version();

        assert!(!ports_version.is_empty());
        assert!(!domain_version.is_empty());
        assert!(!shared_version.is_empty());
    }
}
