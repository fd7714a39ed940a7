use std::fs;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{AppConfig, ConfigError, ConfigUpdate};
use crate::session::SessionParams;
use crate::test::mock::unique_temp_dir;

#[test]
fn defaults_match_documented_values() {
    let cfg = AppConfig::default();
    assert_eq!(cfg.local_addr, Ipv4Addr::new(1, 1, 1, 1));
    assert_eq!(cfg.peer_addr, Ipv4Addr::new(1, 1, 1, 1));
    assert_eq!((cfg.local_port, cfg.peer_port), (10_000, 10_000));
    assert_eq!(cfg.timeout_secs, 5);
    assert_eq!(cfg.base_seq, 1000);
    assert!(!cfg.verbose);
    assert_eq!(cfg.capture_window_ms, 1000);
    assert!(!cfg.dedup_captures);
    assert_eq!(cfg.log_dir, PathBuf::from("logs"));
}

#[test]
fn missing_file_yields_defaults() {
    let dir = unique_temp_dir("cfg-missing");
    let cfg = AppConfig::load(&dir.join("absent.json")).expect("load");
    assert_eq!(cfg, AppConfig::default());
}

#[test]
fn saved_config_loads_back() {
    let dir = unique_temp_dir("cfg-save");
    let path = dir.join("config.json");
    let mut cfg = AppConfig::default();
    cfg.peer_addr = Ipv4Addr::new(192, 168, 1, 20);
    cfg.peer_port = 8080;
    cfg.dedup_captures = true;

    cfg.save(&path).expect("save");
    let raw = fs::read_to_string(&path).expect("read back");
    assert!(raw.contains("\"peer_addr\": \"192.168.1.20\""), "{raw}");
    assert_eq!(AppConfig::load(&path).expect("load"), cfg);
}

#[test]
fn partial_file_fills_in_defaults() {
    let dir = unique_temp_dir("cfg-partial");
    let path = dir.join("config.json");
    fs::write(&path, r#"{ "peer_addr": "10.1.2.3", "base_seq": 42 }"#).expect("write");

    let cfg = AppConfig::load(&path).expect("load");
    assert_eq!(cfg.peer_addr, Ipv4Addr::new(10, 1, 2, 3));
    assert_eq!(cfg.base_seq, 42);
    assert_eq!(cfg.timeout_secs, 5);
    assert_eq!(cfg.local_port, 10_000);
}

#[test]
fn malformed_file_is_a_parse_error() {
    let dir = unique_temp_dir("cfg-bad");
    let path = dir.join("config.json");
    fs::write(&path, "{ peer_addr: nope").expect("write");

    let err = AppConfig::load(&path).expect_err("malformed");
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("config.json"));
}

#[test]
fn update_only_touches_given_fields() {
    let mut cfg = AppConfig::default();
    cfg.apply(&ConfigUpdate {
        peer_port: Some(7),
        timeout_secs: Some(2),
        verbose: Some(true),
        ..ConfigUpdate::default()
    });
    assert_eq!(cfg.peer_port, 7);
    assert_eq!(cfg.timeout_secs, 2);
    assert!(cfg.verbose);
    assert_eq!(cfg.local_port, 10_000);
    assert_eq!(cfg.base_seq, 1000);
}

#[test]
fn session_params_follow_config_units() {
    let mut cfg = AppConfig::default();
    cfg.timeout_secs = 3;
    cfg.capture_window_ms = 250;
    cfg.base_seq = 9;

    let params = SessionParams::from(&cfg);
    assert_eq!(params.timeout, Duration::from_secs(3));
    assert_eq!(params.capture_window, Duration::from_millis(250));
    assert_eq!(params.base_seq, 9);
    assert_eq!(params.peer_addr, cfg.peer_addr);
}
