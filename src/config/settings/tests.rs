use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::load(TempDir::new().expect("should create temp dir").path())
        .expect("should load defaults");
    assert_eq!(config.embedding.model, "nomic-embed-text");
    assert_eq!(config.embedding.dimension, 768);
    assert_eq!(config.generation.primary_model, "llama3-70b-8192");
    assert_eq!(config.generation.fallback_model, None);
    assert_eq!(config.package, PackageTier::Standard);
    assert_eq!(config.chunking.chunk_size, 1000);
    assert_eq!(config.chunking.overlap, 200);
}

#[test]
fn config_validation() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::load(temp_dir.path()).expect("should load defaults");
    assert!(config.validate().is_ok());

    let mut invalid_config = config.clone();
    invalid_config.embedding.base_url = "not a url".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.batch_size = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.dimension = 63;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.generation.temperature = 3.0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.chunking.overlap = 1000;
    assert!(invalid_config.validate().is_err());
}

#[test]
fn package_tier_quotas() {
    assert_eq!(PackageTier::Basic.max_docs(), Some(1));
    assert_eq!(PackageTier::Standard.max_docs(), Some(3));
    assert_eq!(PackageTier::Premium.max_docs(), None);
}

#[test]
fn toml_round_trip() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config::load(temp_dir.path()).expect("should load defaults");
    config.embedding.dimension = 1024;
    config.generation.fallback_model = Some("gemma2-9b-it".to_string());
    config.package = PackageTier::Premium;
    config.save().expect("should save config");

    let reloaded = Config::load(temp_dir.path()).expect("should reload config");
    assert_eq!(config, reloaded);
}

#[test]
fn missing_config_file_uses_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::load(temp_dir.path()).expect("should load defaults");
    assert_eq!(config.base_dir, temp_dir.path());
    assert!(!config.config_file_path().exists());
}

#[test]
fn storage_paths_are_tenant_rooted() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::load(temp_dir.path()).expect("should load defaults");
    assert_eq!(config.vector_db_path(), temp_dir.path().join("vector_db"));
    assert_eq!(config.businesses_path(), temp_dir.path().join("businesses"));
}

#[test]
fn missing_api_key_is_a_config_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config::load(temp_dir.path()).expect("should load defaults");
    config.generation.api_key_env = "DOC_CHAT_TEST_KEY_THAT_DOES_NOT_EXIST".to_string();

    let err = config
        .validate_secrets()
        .expect_err("missing key should fail");
    assert!(matches!(err, ConfigError::MissingApiKey(_)));
}
