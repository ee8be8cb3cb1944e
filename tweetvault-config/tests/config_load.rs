use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;
use tweetvault_config::VaultConfigLoader;

fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn loads_file_and_expands_credentials() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
version: "1"
archivers:
  - id: session
    kind: twitter_session
    config:
      username: "${TV_TEST_USER}"
      password: "${TV_TEST_PASS}"
      email: "${TV_TEST_EMAIL}"
  - id: extractor
    kind: twitter_extractor
storage:
  media_dir: "/srv/tweets"
"#;
    let p = write_yaml(&tmp, "tweetvault.yaml", file_yaml);

    temp_env::with_vars(
        [
            ("TV_TEST_USER", Some("archivist")),
            ("TV_TEST_PASS", Some("hunter2")),
            ("TV_TEST_EMAIL", Some("a@example.com")),
        ],
        || {
            let config = VaultConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load config");

            let session = config.session().expect("session archiver");
            assert_eq!(session.username.as_deref(), Some("archivist"));
            assert_eq!(session.password.as_deref(), Some("hunter2"));
            assert_eq!(session.email.as_deref(), Some("a@example.com"));
            assert!(config.extractor().is_some());
            assert_eq!(config.storage.media_dir, PathBuf::from("/srv/tweets"));
        },
    );
}

#[test]
#[serial]
fn environment_overrides_storage() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "tweetvault.yaml", "storage:\n  media_dir: \"/from/file\"\n");

    temp_env::with_var("TWEETVAULT__STORAGE__MEDIA_DIR", Some("/from/env"), || {
        let config = VaultConfigLoader::new().with_file(&p).load().unwrap();
        assert_eq!(config.storage.media_dir, PathBuf::from("/from/env"));
    });
}

#[test]
#[serial]
fn optional_file_may_be_missing() {
    let tmp = TempDir::new().unwrap();
    let config = VaultConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .unwrap();
    assert!(config.archivers.is_empty());
}

#[test]
#[serial]
fn required_file_must_exist() {
    let tmp = TempDir::new().unwrap();
    let err = VaultConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(err.is_err());
}
