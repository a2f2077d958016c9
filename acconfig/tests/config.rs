use std::fs;

use acconfig::{Config, PlayerBackendKind};

fn load(dir: &tempfile::TempDir) -> Config {
    Config::load_config(dir.path().to_str().unwrap()).unwrap()
}

#[test]
fn test_defaults_from_embedded_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = load(&dir);

    assert_eq!(config.get_poll_interval_ms().unwrap(), 1000);
    assert_eq!(
        config.get_player_backend().unwrap(),
        PlayerBackendKind::Simulated
    );
    assert_eq!(config.get_catalog_manifest().unwrap(), None);
    assert_eq!(config.get_media_dir().unwrap(), dir.path().join("media"));
    assert_eq!(config.get_log_min_level().unwrap(), "INFO");
    assert!(config.get_log_enable_console().unwrap());

    // The merged configuration is written back next to the defaults
    assert!(dir.path().join("config.yaml").exists());
}

#[test]
fn test_config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("config.yaml"),
        "Player:\n  Backend: rodio\n  poll_interval_ms: 250\ncatalog:\n  manifest: books.json\n",
    )
    .unwrap();

    let config = load(&dir);

    assert_eq!(config.get_poll_interval_ms().unwrap(), 250);
    assert_eq!(config.get_player_backend().unwrap(), PlayerBackendKind::Rodio);
    assert_eq!(
        config.get_catalog_manifest().unwrap(),
        Some(dir.path().join("books.json"))
    );
    // Untouched keys keep their default value
    assert_eq!(config.get_log_min_level().unwrap(), "INFO");
}

#[test]
fn test_setters_are_persisted() {
    let dir = tempfile::tempdir().unwrap();
    {
        let config = load(&dir);
        config.set_poll_interval_ms(40).unwrap();
        config.set_player_backend(PlayerBackendKind::Rodio).unwrap();
        config
            .set_catalog_manifest(Some("/srv/books.json".to_string()))
            .unwrap();
    }

    let reloaded = load(&dir);
    assert_eq!(reloaded.get_poll_interval_ms().unwrap(), 40);
    assert_eq!(
        reloaded.get_player_backend().unwrap(),
        PlayerBackendKind::Rodio
    );
    assert_eq!(
        reloaded.get_catalog_manifest().unwrap(),
        Some("/srv/books.json".into())
    );

    reloaded.set_catalog_manifest(None).unwrap();
    assert_eq!(reloaded.get_catalog_manifest().unwrap(), None);
}

#[test]
fn test_unknown_backend_falls_back_to_simulated() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.yaml"), "player:\n  backend: exoplayer\n").unwrap();

    let config = load(&dir);
    assert_eq!(
        config.get_player_backend().unwrap(),
        PlayerBackendKind::Simulated
    );
}

#[test]
fn test_env_override() {
    let dir = tempfile::tempdir().unwrap();
    std::env::set_var("AUDIOCLOUD_CONFIG__TESTSUITE__ENV_FLAG", "true");

    let config = load(&dir);
    assert_eq!(
        config.get_value(&["testsuite", "env_flag"]).unwrap(),
        serde_yaml::Value::Bool(true)
    );

    std::env::remove_var("AUDIOCLOUD_CONFIG__TESTSUITE__ENV_FLAG");
}

#[test]
fn test_missing_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = load(&dir);
    assert!(config.get_value(&["player", "does_not_exist"]).is_err());
}
