use mixpool_core::domain::{OutPoint, PoolRole};
use mixpool_core::infrastructure::config::{load_app_config_from_path, load_config, AppConfig, CONFIG_FILE_NAME};
use mixpool_core::infrastructure::identity::coordinator_identity_from_config;
use std::sync::Mutex;

static ENV_LOCK: Mutex<()> = Mutex::new(());

const COORDINATOR_TOML: &str = r#"
[pool]
role = "coordinator"
max_pool_transactions = 4
queue_timeout_secs = 45

[runtime]
peer_id = "mn-test"
tick_interval_ms = 250

[identity]
secret_key_hex = "0101010101010101010101010101010101010101010101010101010101010101"
collateral_outpoint = "1111111111111111111111111111111111111111111111111111111111111111:1"
"#;

#[test]
fn test_load_config_when_file_missing_then_defaults() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let dir = tempfile::tempdir().expect("tempdir");
    let config = load_config(dir.path()).expect("load defaults");
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_load_config_when_toml_present_then_values_and_identity() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), COORDINATOR_TOML).expect("write config");

    let config = load_config(dir.path()).expect("load");
    assert_eq!(config.pool.role, PoolRole::Coordinator);
    assert_eq!(config.pool.max_pool_transactions, 4);
    assert_eq!(config.pool.queue_timeout_secs, 45);
    assert_eq!(config.pool.signing_timeout_secs, AppConfig::default().pool.signing_timeout_secs);
    assert_eq!(config.runtime.peer_id, "mn-test");
    assert!(config.validate().is_ok());

    let identity = coordinator_identity_from_config(&config.identity).expect("identity");
    let expected: OutPoint = "1111111111111111111111111111111111111111111111111111111111111111:1".parse().expect("outpoint");
    assert_eq!(identity.id.outpoint(), &expected);
}

#[test]
fn test_load_config_when_env_set_then_overrides_file() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), COORDINATOR_TOML).expect("write config");

    std::env::set_var("MIXPOOL_POOL__MAX_POOL_TRANSACTIONS", "5");
    std::env::set_var("MIXPOOL_RUNTIME__PEER_ID", "mn-env");
    let loaded = load_config(dir.path());
    std::env::remove_var("MIXPOOL_POOL__MAX_POOL_TRANSACTIONS");
    std::env::remove_var("MIXPOOL_RUNTIME__PEER_ID");

    let config = loaded.expect("load");
    assert_eq!(config.pool.max_pool_transactions, 5);
    assert_eq!(config.runtime.peer_id, "mn-env");
    assert_eq!(config.pool.queue_timeout_secs, 45);
}

#[test]
fn test_load_app_config_when_coordinator_lacks_identity_then_validation_error() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "[pool]\nrole = \"coordinator\"\n").expect("write config");

    let err = load_app_config_from_path(&path).expect_err("identity missing");
    assert!(err.to_string().contains("secret_key_hex"));
}
