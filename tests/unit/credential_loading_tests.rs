//! Engine API token loading: keychain first, environment fallback.
//!
//! These tests mutate process-global env vars and must run serially.

use entry_bridge::config::{GlobalConfig, API_TOKEN_ENV};

fn make_config() -> GlobalConfig {
    GlobalConfig::from_toml_str(
        r#"
[engine]
base_url = "http://localhost:8080"
application = "census.pff"
"#,
    )
    .expect("config parses")
}

#[tokio::test]
#[serial_test::serial]
#[allow(unsafe_code)]
async fn env_var_supplies_token_when_keychain_is_empty() {
    let mut config = make_config();
    unsafe {
        std::env::set_var(API_TOKEN_ENV, "env-token");
    }

    config.load_credentials().await;

    assert_eq!(config.engine.api_token.as_deref(), Some("env-token"));
    unsafe {
        std::env::remove_var(API_TOKEN_ENV);
    }
}

#[tokio::test]
#[serial_test::serial]
#[allow(unsafe_code)]
async fn missing_token_is_not_an_error() {
    let mut config = make_config();
    unsafe {
        std::env::remove_var(API_TOKEN_ENV);
    }

    config.load_credentials().await;

    assert!(config.engine.api_token.is_none());
}

#[tokio::test]
#[serial_test::serial]
#[allow(unsafe_code)]
async fn empty_env_var_is_ignored() {
    let mut config = make_config();
    unsafe {
        std::env::set_var(API_TOKEN_ENV, "");
    }

    config.load_credentials().await;

    assert!(config.engine.api_token.is_none());
    unsafe {
        std::env::remove_var(API_TOKEN_ENV);
    }
}
