//! Tests for loading `EngineConfig` from the process environment.
//!
//! These mutate process-wide environment variables, so every test is
//! `#[serial]`.

use kubepipe::security::SecurityMode;
use kubepipe::types::config::env;
use kubepipe::types::EngineConfig;
use serial_test::serial;
use std::time::Duration;

const ALL_VARS: &[&str] = &[
    env::TIMEOUT,
    env::MAX_OUTPUT,
    env::NAMESPACE,
    env::CONTEXT,
    env::SECURITY_MODE,
    env::SECURITY_CONFIG,
    env::MAX_CONCURRENT,
];

fn clear_env() {
    for name in ALL_VARS {
        std::env::remove_var(name);
    }
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();
    let config = EngineConfig::from_env().unwrap();
    assert_eq!(config.default_timeout, Duration::from_secs(300));
    assert_eq!(config.namespace, "default");
    assert_eq!(config.security_mode, SecurityMode::Strict);
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    std::env::set_var(env::TIMEOUT, "45");
    std::env::set_var(env::NAMESPACE, "payments");
    std::env::set_var(env::SECURITY_MODE, "permissive");
    std::env::set_var(env::MAX_CONCURRENT, "0");

    let config = EngineConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.default_timeout, Duration::from_secs(45));
    assert_eq!(config.namespace, "payments");
    assert_eq!(config.security_mode, SecurityMode::Permissive);
    assert!(config.max_concurrent.is_none());
    assert_eq!(config.context().namespace, "payments");
}

#[test]
#[serial]
fn test_from_env_rejects_garbage() {
    clear_env();
    std::env::set_var(env::MAX_OUTPUT, "lots");
    let err = EngineConfig::from_env().unwrap_err();
    clear_env();

    assert!(err.to_string().contains("K8S_MCP_MAX_OUTPUT"));
}

#[test]
#[serial]
fn test_explicit_security_config_path_wins() {
    clear_env();
    std::env::set_var(env::SECURITY_CONFIG, "/etc/kubepipe/rules.yaml");
    let config = EngineConfig::from_env().unwrap();
    clear_env();

    assert_eq!(
        config.security_config.as_deref(),
        Some(std::path::Path::new("/etc/kubepipe/rules.yaml"))
    );
}
