//! Integration tests for the layered configuration system

use starkline::config::{ConfigLoader, ConfigSources, RuntimeConfig, WORKSPACE_CONFIG_FILE};
use starkline::ApiError;
use std::collections::HashMap;
use tempfile::TempDir;

#[test]
fn test_workspace_file_configures_runtime() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join(WORKSPACE_CONFIG_FILE),
        r#"
[context]
inbox_capacity = 64

[pool]
hashing_workers = 3

[prover]
chunk_size = 128
constraint_fragments = 4

[logging]
level = "debug"
format = "json"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_with(ConfigSources {
        global_file: None,
        workspace_root: Some(temp_dir.path().to_path_buf()),
        environment: Some(HashMap::new()),
    })
    .unwrap();

    assert_eq!(config.context.inbox_capacity, 64);
    assert_eq!(config.context.max_pending, 1024);
    assert_eq!(config.pool.hashing_workers, Some(3));
    assert_eq!(config.pool.constraint_workers, None);
    assert_eq!(config.prover.chunk_size, 128);
    assert_eq!(config.prover.constraint_fragments, 4);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
    assert!(config.validate().is_ok());
}

#[test]
fn test_layer_precedence() {
    let temp_dir = TempDir::new().unwrap();
    let global = temp_dir.path().join("global.toml");
    std::fs::write(&global, "[prover]\nchunk_size = 16\nconstraint_fragments = 2\n").unwrap();
    let workspace = temp_dir.path().join("ws");
    std::fs::create_dir(&workspace).unwrap();
    std::fs::write(
        workspace.join(WORKSPACE_CONFIG_FILE),
        "[prover]\nchunk_size = 32\n",
    )
    .unwrap();

    let mut environment = HashMap::new();
    environment.insert(
        "STARKLINE__PROVER__CONSTRAINT_FRAGMENTS".to_string(),
        "6".to_string(),
    );

    let config = ConfigLoader::load_with(ConfigSources {
        global_file: Some(global),
        workspace_root: Some(workspace),
        environment: Some(environment),
    })
    .unwrap();

    assert_eq!(config.prover.chunk_size, 32);
    assert_eq!(config.prover.constraint_fragments, 6);
}

#[test]
fn test_missing_layers_fall_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = ConfigLoader::load_with(ConfigSources {
        global_file: Some(temp_dir.path().join("absent.toml")),
        workspace_root: Some(temp_dir.path().to_path_buf()),
        environment: Some(HashMap::new()),
    })
    .unwrap();
    assert_eq!(config, RuntimeConfig::default());
}

#[test]
fn test_invalid_values_fail_validation() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("config.toml");
    std::fs::write(
        &config_file,
        "[prover]\nchunk_size = 0\n\n[logging]\nformat = \"xml\"\n",
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(matches!(config.ensure_valid(), Err(ApiError::ConfigError(_))));
}

#[test]
fn test_malformed_file_is_a_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("config.toml");
    std::fs::write(&config_file, "[prover\nchunk_size = ").unwrap();
    assert!(matches!(
        ConfigLoader::load_from_file(&config_file),
        Err(ApiError::ConfigError(_))
    ));
}
