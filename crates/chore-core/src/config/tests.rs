use super::*;

#[test]
fn test_defaults_when_sections_missing() {
    let cfg: Config = toml::from_str("").unwrap();
    assert_eq!(cfg.chorehub.name, "ChoreHub");
    assert_eq!(cfg.store.db_path, "~/.chorehub/data/chorehub.db");
    assert_eq!(cfg.api.port, 5050);
    assert!(cfg.api.api_key.is_empty());
    assert_eq!(cfg.stats.timeliness_limit, 5);
    assert!(cfg.stats.utc_offset_minutes.is_none());
}

#[test]
fn test_config_from_toml() {
    let toml_str = r#"
        [chorehub]
        log_level = "debug"

        [api]
        host = "0.0.0.0"
        port = 8080
        api_key = "secret"

        [stats]
        timeliness_limit = 10
        utc_offset_minutes = 120
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(cfg.chorehub.log_level, "debug");
    assert_eq!(cfg.chorehub.data_dir, "~/.chorehub");
    assert_eq!(cfg.api.host, "0.0.0.0");
    assert_eq!(cfg.api.port, 8080);
    assert_eq!(cfg.api.api_key, "secret");
    assert_eq!(cfg.stats.timeliness_limit, 10);
    assert_eq!(
        cfg.stats.offset().unwrap(),
        FixedOffset::east_opt(7200).unwrap()
    );
}

#[test]
fn test_offset_out_of_range() {
    let stats = StatsConfig {
        timeliness_limit: 5,
        utc_offset_minutes: Some(24 * 60),
    };
    assert!(matches!(stats.offset(), Err(ChoreError::Config(_))));
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let cfg = load("/nonexistent/__chorehub_test__/config.toml").unwrap();
    assert_eq!(cfg.api.port, 5050);
}

#[test]
fn test_load_rejects_bad_toml() {
    let tmp = std::env::temp_dir().join("__chorehub_test_bad_config__.toml");
    std::fs::write(&tmp, "[api\nport = ").unwrap();
    let result = load(tmp.to_str().unwrap());
    assert!(matches!(result, Err(ChoreError::Config(_))));
    let _ = std::fs::remove_file(&tmp);
}

#[test]
fn test_shellexpand_home() {
    let expanded = shellexpand("~/.chorehub");
    if std::env::var_os("HOME").is_some() {
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/.chorehub"));
    }
    assert_eq!(shellexpand("/abs/path"), "/abs/path");
}
