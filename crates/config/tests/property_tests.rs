//! Property-style checks for the configuration system

use duelrank_config::{Config, ConfigManager};
use tempfile::TempDir;

#[test]
fn property_serialization_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let toml_string = toml::to_string(&config)?;
    let deserialized: Config = toml::from_str(&toml_string)?;
    assert_eq!(config, deserialized);
    Ok(())
}

#[test]
fn property_load_save_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;

    manager.save(&Config::default())?;
    let loaded = manager.load()?;
    manager.save(&loaded)?;
    assert_eq!(loaded, manager.load()?);
    Ok(())
}

#[test]
fn property_validation_deterministic() {
    let mut config = Config::default();
    config.remote.request_timeout_secs = 0;

    let result1 = config.validate();
    let result2 = config.validate();
    assert_eq!(result1, result2);
}

#[test]
fn property_merge_preserves_validity() {
    let mut base = Config::default();
    base.merge(Config::default());
    assert!(base.validate().is_ok());
}

#[test]
fn property_all_valid_thresholds_persist() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;

    for threshold in 1..=100u32 {
        let mut config = Config::default();
        config.remote.failure_threshold = threshold;
        manager.save(&config)?;
        assert_eq!(manager.load()?.remote.failure_threshold, threshold);
    }
    Ok(())
}

#[test]
fn property_reorder_tuning_survives_toml() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::default();
    for step in [1.5e-6, 1e-5, 3.3e-5, 1e-3] {
        config.reorder.cascade_step = step;
        let parsed: Config = toml::from_str(&toml::to_string(&config)?)?;
        assert_eq!(parsed.reorder.tuning().cascade_step, step);
        assert!(parsed.validate().is_ok());
    }
    Ok(())
}
