use std::io::Write;
use std::time::Duration;

use gridserve::config::{CONFIG_ENV, Config};
use serial_test::serial;

fn clear_env() {
    unsafe {
        std::env::remove_var("LISTEN");
        std::env::remove_var(CONFIG_ENV);
    }
}

#[test]
#[serial]
fn test_config_default_address() {
    clear_env();
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
}

#[test]
#[serial]
fn test_config_custom_address_from_env() {
    clear_env();
    unsafe {
        std::env::set_var("LISTEN", "0.0.0.0:3000");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:3000");
    clear_env();
}

#[test]
#[serial]
fn test_config_file_with_listen_override() {
    clear_env();
    let path = std::env::temp_dir().join(format!("gridserve-test-{}.yaml", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "server:\n  listen_addr: \"127.0.0.1:9000\"\n  read_timeout_secs: 5").unwrap();

    unsafe {
        std::env::set_var(CONFIG_ENV, &path);
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:9000");
    assert_eq!(cfg.server.read_timeout_secs, 5);

    unsafe {
        std::env::set_var("LISTEN", "0.0.0.0:5000");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "0.0.0.0:5000");

    clear_env();
    std::fs::remove_file(&path).unwrap();
}

#[test]
#[serial]
fn test_missing_config_file_is_an_error() {
    clear_env();
    unsafe {
        std::env::set_var(CONFIG_ENV, "/nonexistent/gridserve.yaml");
    }
    assert!(Config::load().is_err());
    clear_env();
}

#[test]
fn test_yaml_defaults_fill_missing_fields() {
    let cfg = Config::from_yaml("server:\n  max_headers: 10\n").unwrap();

    assert_eq!(cfg.server.max_headers, 10);
    assert_eq!(cfg.server.max_line_length, 8192);
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
}

#[test]
fn test_invalid_values_are_rejected() {
    assert!(Config::from_yaml("server:\n  read_timeout_secs: 0\n").is_err());
    assert!(Config::from_yaml("server:\n  max_line_length: 0\n").is_err());
    assert!(Config::from_yaml("server: [not, a, map]\n").is_err());
}

#[test]
fn test_settings_conversion() {
    let cfg = Config::from_yaml("server:\n  header_timeout_secs: 3\n  keep_alive_timeout_secs: 7\n").unwrap();
    let settings = cfg.server.settings();

    assert_eq!(settings.header_timeout, Duration::from_secs(3));
    assert_eq!(settings.read_timeout, Duration::from_secs(30));
    assert_eq!(settings.keep_alive_timeout, Duration::from_secs(7));
    assert_eq!(settings.limits.max_headers, 100);
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::default();
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1.server.listen_addr, cfg2.server.listen_addr);
}
