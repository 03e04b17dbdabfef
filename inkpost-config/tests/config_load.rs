use inkpost_config::{InkpostConfigLoader, PlatformDetails};
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn loads_a_full_file_with_defaults_filled_in() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
version: "0.1"
browser:
  headless: true
batch:
  posts_dir: content/posts
  login_timeout_secs: 120
platforms:
  - id: csdn
    platform: csdn
    enabled: true
    config:
      tags: ["rust", "automation"]
  - id: zhihu
    platform: zhihu
    config:
      per_char_typing: true
"#;
    let p = write_yaml(&tmp, "inkpost.yaml", file_yaml);

    let config = InkpostConfigLoader::new()
        .with_file(p)
        .load()
        .expect("load config");

    assert!(config.browser.headless);
    assert_eq!(config.browser.webdriver_url, "http://localhost:9515");
    assert_eq!(config.batch.posts_dir, "content/posts");
    assert_eq!(config.batch.login_timeout_secs, 120);
    assert_eq!(config.batch.pacing.success_min_secs, 300);
    assert_eq!(config.platforms.len(), 2);
    match &config.platforms[0].details {
        PlatformDetails::Csdn { config } => assert_eq!(config.tags, ["rust", "automation"]),
        other => panic!("expected csdn, got {other:?}"),
    }
}

#[test]
#[serial]
fn env_placeholders_resolve_inside_the_file() {
    let tmp = TempDir::new().unwrap();
    let file_yaml = r#"
platforms: []
browser:
  user_data_dir: "${INKPOST_TEST_PROFILE}/chrome"
"#;
    let p = write_yaml(&tmp, "inkpost.yaml", file_yaml);

    temp_env::with_var("INKPOST_TEST_PROFILE", Some("/srv/inkpost"), || {
        let config = InkpostConfigLoader::new().with_file(&p).load().unwrap();
        assert_eq!(
            config.browser.user_data_dir.as_deref(),
            Some("/srv/inkpost/chrome")
        );
    });
}

#[test]
#[serial]
fn disabled_platforms_are_not_selectable() {
    let config = InkpostConfigLoader::new()
        .with_yaml_str(
            r#"
platforms:
  - id: csdn
    platform: csdn
    enabled: false
  - id: zhihu
    platform: zhihu
"#,
        )
        .load()
        .unwrap();

    assert!(config.platform("csdn").is_none());
    assert!(config.platform("zhihu").is_some());
    assert!(config.platform("medium").is_none());
}

#[test]
#[serial]
fn missing_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let err = InkpostConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(err.is_err());
}
