//! # config-ignore-ports
//!
//! Port traits for the config-ignore hexagonal architecture.
//!
//! This crate defines the interfaces between the ignore engine and the host:
//! configuration stores, rule-alter hooks, and structured logging. It depends
//! only on `domain` and `shared`.

/// Returns the ports crate version.
#[must_use]
pub const fn ports_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub mod logger;
pub mod rule_hook;
pub mod store;

pub use logger::*;
pub use rule_hook::*;
pub use store::*;

// Re-export selected domain types used in port signatures, so adapter crates
// can implement ports without directly depending on `config-ignore-domain`.
pub use config_ignore_domain::{CollectionId, ConfigName, ConfigTree};

#[cfg(test)]
mod tests {
    use super::*;
    use config_ignore_domain::domain_crate_version;
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
    fn ports_depends_only_on_domain_and_shared() {
        let deps = workspace_deps();
        let allowed = ["config-ignore-domain", "config-ignore-shared"];

        for dep in &deps {
            assert!(
                allowed.contains(&dep.as_str()),
                "unexpected dependency found: {dep}"
            );
        }

        for expected in allowed {
            assert!(
                deps.iter().any(|dep| dep == expected),
                "missing dependency: {expected}"
            );
        }
    }

    #[test]
    fn ports_can_use_domain_and_shared() {
        assert!(!ports_crate_version().is_empty());
        assert!(!domain_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }

    struct AppendHook(&'static str);

    impl RuleAlterHook for AppendHook {
        fn name(&self) -> &str {
            "append"
        }

        fn alter(&self, rules: &mut Vec<String>) {
            rules.push(self.0.to_owned());
        }
    }

    struct DropHook(&'static str);

    impl RuleAlterHook for DropHook {
        fn name(&self) -> &str {
            "drop"
        }

        fn alter(&self, rules: &mut Vec<String>) {
            rules.retain(|rule| rule != self.0);
        }
    }

    #[test]
    fn rule_hooks_run_in_registration_order() {
        let rules = vec!["system.site".to_owned()];
        let hooks: Vec<std::sync::Arc<dyn RuleAlterHook>> = vec![
            std::sync::Arc::new(AppendHook("node.type.*")),
            std::sync::Arc::new(DropHook("system.site")),
        ];

        let altered = apply_rule_hooks(&rules, &hooks);
        assert_eq!(altered, ["node.type.*"]);
        assert_eq!(rules, ["system.site"]);
    }
}
