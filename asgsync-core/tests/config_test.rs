mod common;

use asgsync_core::config::{ConfigFile, DiskConfig, AUTOSCALE, RAX_AUTOSCALER};
use asgsync_core::{Credentials, Error};
use tempfile::TempDir;

use common::{write_config, FULL_CONFIG};

#[test]
fn test_full_config_validates() {
    let dir = TempDir::new().unwrap();
    let config = ConfigFile::load(write_config(dir.path(), FULL_CONFIG)).unwrap();
    let settings = config.settings().unwrap();

    assert_eq!(settings.group.name, "web");
    assert_eq!(settings.group.id, None);
    assert_eq!(settings.group.scale_up, 2);
    assert_eq!(settings.launch.disk_config, DiskConfig::Auto);
    assert_eq!(settings.launch.networks, vec!["net-a"]);
    assert_eq!(settings.launch.cloud_init, None);
    assert!(settings.launch.config_drive);
    assert_eq!(settings.launch.kind, "launch_server");
    assert!(settings.launch.metadata.is_empty());
    assert_eq!(settings.autoscaler.load_balancers, vec![1234, 1234, 5678]);
    assert_eq!(settings.autoscaler.num_static_servers, Some(1));
}

#[test]
fn test_default_metadata_when_absent() {
    let dir = TempDir::new().unwrap();
    let content = FULL_CONFIG.replace("metadata = {}\n", "");
    let config = ConfigFile::load(write_config(dir.path(), &content)).unwrap();
    let settings = config.settings().unwrap();
    assert_eq!(
        settings.launch.metadata.get("rax-autoscaler-setup").map(String::as_str),
        Some("1.0")
    );
    assert!(settings.launch.metadata.contains_key("build_config"));
}

#[test]
fn test_unknown_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    let content = FULL_CONFIG.replace("cooldown = 60", "cooldown = 60\nwarmup = 5");
    let config = ConfigFile::load(write_config(dir.path(), &content)).unwrap();
    let err = config.settings().unwrap_err();
    assert!(err.to_string().contains("warmup"), "{}", err);
}

#[test]
fn test_missing_key_names_section() {
    let dir = TempDir::new().unwrap();
    let content = FULL_CONFIG.replace("flavor = \"general1-1\"\n", "");
    let config = ConfigFile::load(write_config(dir.path(), &content)).unwrap();
    match config.settings() {
        Err(Error::MissingKey { section, key }) => {
            assert_eq!(section, "launch-configuration");
            assert_eq!(key, "flavor");
        }
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_cloud_init_requires_key_and_admin_server() {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("cloud-init.yml");
    std::fs::write(&template, "#cloud-config\n").unwrap();
    let content = FULL_CONFIG.replace(
        "cloud_init = \"\"",
        &format!("cloud_init = '{}'", template.display()),
    );
    let config = ConfigFile::load(write_config(dir.path(), &content)).unwrap();
    assert!(matches!(
        config.settings(),
        Err(Error::MissingKey { key, .. }) if key == "private_key"
    ));

    let key = dir.path().join("id_rsa");
    std::fs::write(&key, "KEY").unwrap();
    let content = content.replace(
        "num_static_servers = 1",
        &format!(
            "num_static_servers = 1\nprivate_key = '{}'\nadmin_server = '10.0.0.5'",
            key.display()
        ),
    );
    let config = ConfigFile::load(write_config(dir.path(), &content)).unwrap();
    let settings = config.settings().unwrap();
    assert_eq!(settings.launch.cloud_init, Some(template));
    assert!(settings.launch.config_drive);
}

#[test]
fn test_explicit_config_drive_false_kept_with_cloud_init() {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("cloud-init.yml");
    std::fs::write(&template, "#cloud-config\n").unwrap();
    let key = dir.path().join("id_rsa");
    std::fs::write(&key, "KEY").unwrap();
    let content = FULL_CONFIG
        .replace(
            "cloud_init = \"\"",
            &format!("cloud_init = '{}'\nconfig_drive = false", template.display()),
        )
        .replace(
            "num_static_servers = 1",
            &format!(
                "num_static_servers = 1\nprivate_key = '{}'\nadmin_server = '10.0.0.5'",
                key.display()
            ),
        );
    let config = ConfigFile::load(write_config(dir.path(), &content)).unwrap();
    let settings = config.settings().unwrap();
    assert_eq!(settings.launch.cloud_init, Some(template));
    assert!(!settings.launch.config_drive);
}

#[test]
fn test_unreadable_cloud_init() {
    let dir = TempDir::new().unwrap();
    let content = FULL_CONFIG.replace("cloud_init = \"\"", "cloud_init = '/nonexistent/cloud-init.yml'");
    let config = ConfigFile::load(write_config(dir.path(), &content)).unwrap();
    assert!(matches!(config.settings(), Err(Error::UnreadableFile(_))));
}

#[test]
fn test_set_option_persists_and_keeps_credentials() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), FULL_CONFIG);
    let mut config = ConfigFile::load(&path).unwrap();

    config.set_option(AUTOSCALE, "id", "group-42").unwrap();
    config
        .set_option(RAX_AUTOSCALER, "scale_up_policy", "policy-1")
        .unwrap();
    config.set_option("new-section", "flag", true).unwrap();

    let reread = ConfigFile::load(&path).unwrap();
    assert_eq!(reread.settings().unwrap().group.id.as_deref(), Some("group-42"));
    assert_eq!(
        reread.get(RAX_AUTOSCALER, "scale_up_policy").and_then(|v| v.as_str()),
        Some("policy-1")
    );
    assert_eq!(reread.get("new-section", "flag").and_then(|v| v.as_bool()), Some(true));

    let credentials = Credentials::from_config(&reread).unwrap();
    assert_eq!(credentials.username, "alice");
    assert_eq!(credentials.region.as_deref(), Some("DFW"));
}

#[test]
fn test_keys_of_section() {
    let dir = TempDir::new().unwrap();
    let config = ConfigFile::load(write_config(dir.path(), FULL_CONFIG)).unwrap();
    let keys = config.keys(RAX_AUTOSCALER);
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&"load_balancers".to_string()));
    assert!(config.keys("missing").is_empty());
}

#[test]
fn test_unreadable_config_file() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        ConfigFile::load(dir.path().join("absent.toml")),
        Err(Error::ConfigUnreadable { .. })
    ));
}
