//! Effective config built from files on disk
//!
//! Covers mixed-format layering, stage selection through the environment,
//! settings discovery and provenance.

use layerconf::config::{
    ConfigError, MergeSettings, SettingsError, SettingsOverrides, SourceError, SourceFormat,
    SETTINGS_FILE,
};
use layerconf::merge::StaticEnvironment;
use layerconf::EffectiveConfig;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// Defaults in JSON, project overrides in TOML, stages in YAML.
fn layered_sources(dir: &TempDir) -> Vec<PathBuf> {
    let defaults = write(
        dir,
        "defaults.json",
        r#"{
            "log_level": "info",
            "services": {
                "_instances": true,
                "*": {"replicas": 1, "ports": [80]},
                "api": {"ports": [8080]}
            }
        }"#,
    );
    let project = write(
        dir,
        "project.toml",
        r#"
log_level = "warn"

[services."*"]
ports = [443]

[services.worker]
replicas = 4
"#,
    );
    let stages = write(
        dir,
        "stages.yaml",
        r#"
_preprocess: stages
prod:
  hosts: [web-01]
  env: production
  config:
    log_level: error
dev:
  hosts: [laptop]
  env: development
  config:
    log_level: debug
    services:
      "*":
        replicas: 0
"#,
    );
    vec![defaults, project, stages]
}

// =============================================================================
// Layering
// =============================================================================

mod layering_tests {
    use super::*;

    #[test]
    fn test_mixed_formats_merge_in_order() {
        let dir = TempDir::new().unwrap();
        let paths = layered_sources(&dir);
        let env = StaticEnvironment::new().with_hostname("web-01");

        let config = EffectiveConfig::build(&paths, &MergeSettings::default(), &env).unwrap();

        assert_eq!(
            config.config,
            json!({
                "log_level": "error",
                "services": {
                    "api": {"replicas": 1, "ports": [80, 8080, 443]},
                    "worker": {"replicas": 4, "ports": [80, 443]}
                }
            })
        );
    }

    #[test]
    fn test_stage_selected_by_env_variable() {
        let dir = TempDir::new().unwrap();
        let paths = layered_sources(&dir);
        let env = StaticEnvironment::new()
            .with_hostname("ci-runner")
            .with_var("APP_ENV", "development");

        let config = EffectiveConfig::build(&paths, &MergeSettings::default(), &env).unwrap();

        assert_eq!(config.get_str("log_level"), Some("debug"));
        assert_eq!(config.get_u64("services.api.replicas"), Some(0));
        assert_eq!(config.get_u64("services.worker.replicas"), Some(0));
        assert_eq!(config.stage.stage_value.as_deref(), Some("development"));
    }

    #[test]
    fn test_accessor_indexes_arrays() {
        let dir = TempDir::new().unwrap();
        let paths = layered_sources(&dir);
        let env = StaticEnvironment::new().with_hostname("web-01");

        let config = EffectiveConfig::build(&paths, &MergeSettings::default(), &env).unwrap();

        assert_eq!(config.get_u64("services.api.ports.1"), Some(8080));
        assert_eq!(config.get("services.api.ports.3"), None);
    }

    #[test]
    fn test_no_sources_yields_empty_object() {
        let paths: Vec<PathBuf> = Vec::new();
        let config = EffectiveConfig::build(
            &paths,
            &MergeSettings::default(),
            &StaticEnvironment::new(),
        )
        .unwrap();

        assert_eq!(config.config, json!({}));
        assert!(config.sources.is_empty());
    }
}

// =============================================================================
// Settings
// =============================================================================

mod settings_tests {
    use super::*;

    #[test]
    fn test_discovered_settings_change_wildcard() {
        let dir = TempDir::new().unwrap();
        write(&dir, SETTINGS_FILE, "[merge]\nwildcard = \"_default\"\n");
        let source = write(
            &dir,
            "layer.json",
            r#"{"pools": {"_instances": true, "_default": {"size": 2}, "db": {}}}"#,
        );

        let settings = MergeSettings::discover(None, dir.path()).unwrap();
        let config =
            EffectiveConfig::build(&[source], &settings, &StaticEnvironment::new()).unwrap();

        assert_eq!(config.config, json!({"pools": {"db": {"size": 2}}}));
        assert_eq!(config.settings.wildcard, "_default");
    }

    #[test]
    fn test_keep_null_renders_deleted_values() {
        let dir = TempDir::new().unwrap();
        let base = write(&dir, "base.json", r#"{"cache": {"dir": "/tmp"}, "name": "svc"}"#);
        let over = write(&dir, "over.json", r#"{"cache": {"_strategy": "delete"}}"#);

        let settings = MergeSettings::from_toml("[merge]\ndelete_null_values = false\n").unwrap();
        let config =
            EffectiveConfig::build(&[base, over], &settings, &StaticEnvironment::new()).unwrap();

        assert_eq!(config.config, json!({"cache": null, "name": "svc"}));
    }

    #[test]
    fn test_resolve_applies_settings_file_and_overrides() {
        let dir = TempDir::new().unwrap();
        write(&dir, SETTINGS_FILE, "[merge]\nwildcard = \"_default\"\n");
        let base = write(&dir, "base.json", r#"{"cache": {"dir": "/tmp"}}"#);
        let over = write(&dir, "over.json", r#"{"cache": {"_strategy": "delete"}}"#);

        let overrides = SettingsOverrides {
            keep_null: true,
            ..SettingsOverrides::default()
        };
        let config = EffectiveConfig::resolve(
            &[base, over],
            None,
            dir.path(),
            &overrides,
            &StaticEnvironment::new(),
        )
        .unwrap();

        assert_eq!(config.settings.wildcard, "_default");
        assert!(!config.settings.delete_null_values);
        assert_eq!(config.config, json!({"cache": null}));
    }

    #[test]
    fn test_resolve_reports_settings_errors() {
        let dir = TempDir::new().unwrap();
        let source = write(&dir, "layer.json", "{}");
        let missing = dir.path().join("missing.toml");

        let result = EffectiveConfig::resolve(
            &[source.clone()],
            Some(missing.as_path()),
            dir.path(),
            &SettingsOverrides::default(),
            &StaticEnvironment::new(),
        );
        assert!(matches!(
            result,
            Err(ConfigError::Settings(SettingsError::Io { .. }))
        ));

        let overrides = SettingsOverrides {
            wildcard: Some(String::new()),
            ..SettingsOverrides::default()
        };
        let result = EffectiveConfig::resolve(
            &[source],
            None,
            dir.path(),
            &overrides,
            &StaticEnvironment::new(),
        );
        assert!(matches!(
            result,
            Err(ConfigError::Settings(SettingsError::Invalid(_)))
        ));
    }
}

// =============================================================================
// Provenance and errors
// =============================================================================

mod provenance_tests {
    use super::*;

    #[test]
    fn test_sources_tracked_with_digests() {
        let dir = TempDir::new().unwrap();
        let paths = layered_sources(&dir);

        let config =
            EffectiveConfig::build(&paths, &MergeSettings::default(), &StaticEnvironment::new())
                .unwrap();

        assert_eq!(config.sources.len(), 3);
        let formats: Vec<SourceFormat> = config.sources.iter().map(|s| s.format).collect();
        assert_eq!(
            formats,
            vec![SourceFormat::Json, SourceFormat::Toml, SourceFormat::Yaml]
        );
        assert!(config.sources.iter().all(|s| s.digest.len() == 64));
        assert_ne!(config.sources[0].digest, config.sources[1].digest);
    }

    #[test]
    fn test_root_delete_reported() {
        let dir = TempDir::new().unwrap();
        let base = write(&dir, "base.json", r#"{"a": 1}"#);
        let wipe = write(&dir, "wipe.yml", "_strategy: delete\n");

        let config =
            EffectiveConfig::build(&[base, wipe], &MergeSettings::default(), &StaticEnvironment::new())
                .unwrap();

        assert!(config.root_deleted);
        let rendered: serde_json::Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(rendered["config"], serde_json::Value::Null);
        assert_eq!(rendered["root_deleted"], true);
    }

    #[test]
    fn test_parse_error_stops_build() {
        let dir = TempDir::new().unwrap();
        let good = write(&dir, "good.json", "{}");
        let bad = write(&dir, "bad.toml", "key = ");

        let result =
            EffectiveConfig::build(&[good, bad], &MergeSettings::default(), &StaticEnvironment::new());

        match result {
            Err(ConfigError::Source(SourceError::Toml { path, .. })) => {
                assert!(path.ends_with("bad.toml"));
            }
            other => panic!("expected TOML error, got {:?}", other.map(|c| c.config)),
        }
    }
}
