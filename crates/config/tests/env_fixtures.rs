//! Integration tests for env parsing and env-to-config merging.

use config_ignore_config::{EnvParseError, IgnoreConfig, IgnoreEnv, apply_env_overrides};
use config_ignore_shared::ErrorCode;
use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::Path;

fn read_env_map(relative: &str) -> Result<BTreeMap<String, String>, Box<dyn Error>> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative);
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[test]
fn env_fixtures_merge_into_effective_config() -> Result<(), Box<dyn Error>> {
    let env_map = read_env_map("env/ignore-env.valid.json")?;
    let env = IgnoreEnv::from_map(&env_map)?;

    let config = apply_env_overrides(IgnoreConfig::default(), &env)?;

    assert_eq!(
        config.ignore.rules,
        ["system.*", "~system.site", "node.type.*:help"]
    );
    assert!(config.ignore.deactivate);
    assert_eq!(
        config.stores.active_dir.as_deref(),
        Some(Path::new("/srv/config/active"))
    );
    assert_eq!(
        config.stores.sync_dir.as_deref(),
        Some(Path::new("/srv/config/sync"))
    );
    assert_eq!(&*config.logging.level, "warn");
    Ok(())
}

#[test]
fn invalid_env_fixture_fails_fast() -> Result<(), Box<dyn Error>> {
    let env_map = read_env_map("env/ignore-env.invalid.json")?;
    let error = IgnoreEnv::from_map(&env_map)
        .err()
        .ok_or_else(|| std::io::Error::other("expected env error"))?;
    assert!(matches!(error, EnvParseError::InvalidBool { .. }));

    let envelope: config_ignore_shared::ErrorEnvelope = error.into();
    assert_eq!(envelope.code, ErrorCode::new("config", "invalid_env_bool"));
    Ok(())
}

#[test]
fn env_rule_conflict_surfaces_at_merge() -> Result<(), Box<dyn Error>> {
    let mut env_map = BTreeMap::new();
    env_map.insert("CFGI_IGNORE_RULES".to_owned(), "~system.*".to_owned());
    let env = IgnoreEnv::from_map(&env_map)?;

    let error = apply_env_overrides(IgnoreConfig::default(), &env)
        .err()
        .ok_or_else(|| std::io::Error::other("expected rule error"))?;
    assert_eq!(error.code, ErrorCode::new("config", "invalid_rule"));
    Ok(())
}
