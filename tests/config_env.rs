// tests/config_env.rs
use std::path::PathBuf;
use std::{env, fs};

use tech_watch::config::app::{ENV_BIND, ENV_CONFIG_PATH};
use tech_watch::config::AppConfig;

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // isolate CWD so the repo's own config/ is not read
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var(ENV_CONFIG_PATH);
    env::remove_var(ENV_BIND);

    // 1) nothing on disk → built-in defaults
    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.server.bind, "127.0.0.1:8080");
    assert_eq!(cfg.fetch.timeout_secs, 20);

    // 2) ./config/techwatch.toml
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(
        tmp.path().join("config/techwatch.toml"),
        "[data]\nentries_path = \"snap/e.json\"\n",
    )
    .unwrap();
    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.data.entries_path, PathBuf::from("snap/e.json"));
    assert_eq!(cfg.data.feeds_path, PathBuf::from("data/feeds.json"));

    // 3) env path wins over the default file
    let p_env = tmp.path().join("other.toml");
    fs::write(&p_env, "[fetch]\nproxy = \"https://proxy.test/raw\"\n").unwrap();
    env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.fetch.proxy.as_deref(), Some("https://proxy.test/raw"));
    assert_eq!(cfg.data.entries_path, PathBuf::from("data/entries.json"));

    // 4) env path must exist
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("nope.toml").display().to_string());
    assert!(AppConfig::load_default().is_err());
    env::remove_var(ENV_CONFIG_PATH);

    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn bind_override_from_env() {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var(ENV_CONFIG_PATH);

    env::set_var(ENV_BIND, " 0.0.0.0:3000 ");
    assert_eq!(AppConfig::load_default().unwrap().server.bind, "0.0.0.0:3000");

    env::set_var(ENV_BIND, "   ");
    assert_eq!(AppConfig::load_default().unwrap().server.bind, "127.0.0.1:8080");
    env::remove_var(ENV_BIND);

    env::set_current_dir(&old).unwrap();
}
