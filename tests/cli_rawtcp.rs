use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "rawtcp-cli-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

#[test]
fn config_without_file_prints_defaults() {
    let dir = unique_temp_dir("defaults");
    let cfg_path = dir.join("config.json");

    let output = Command::new(env!("CARGO_BIN_EXE_rawtcp"))
        .args(["--config", cfg_path.to_str().unwrap(), "config"])
        .output()
        .expect("run rawtcp");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("peer_addr:         1.1.1.1"), "{stdout}");
    assert!(stdout.contains("base_seq:          1000"), "{stdout}");
    assert!(!cfg_path.exists(), "config must not be written without --save");
}

#[test]
fn config_save_writes_updated_json() {
    let dir = unique_temp_dir("save");
    let cfg_path = dir.join("config.json");

    let output = Command::new(env!("CARGO_BIN_EXE_rawtcp"))
        .args([
            "--config",
            cfg_path.to_str().unwrap(),
            "config",
            "--peer-addr",
            "10.9.8.7",
            "--peer-port",
            "8080",
            "--base-seq",
            "77",
            "--save",
        ])
        .output()
        .expect("run rawtcp");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("configuration saved to"), "{stdout}");

    let raw = fs::read_to_string(&cfg_path).expect("read saved config");
    let v: Value = serde_json::from_str(&raw).expect("parse saved config");
    assert_eq!(v["peer_addr"], "10.9.8.7");
    assert_eq!(v["peer_port"], 8080);
    assert_eq!(v["base_seq"], 77);
    assert_eq!(v["timeout_secs"], 5);

    // 再次读取时沿用已保存的值
    let output = Command::new(env!("CARGO_BIN_EXE_rawtcp"))
        .args(["--config", cfg_path.to_str().unwrap(), "config"])
        .output()
        .expect("run rawtcp");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("peer_port:         8080"));
}

#[test]
fn malformed_config_fails() {
    let dir = unique_temp_dir("malformed");
    let cfg_path = dir.join("config.json");
    fs::write(&cfg_path, "{ not json").expect("write config");

    let output = Command::new(env!("CARGO_BIN_EXE_rawtcp"))
        .args(["--config", cfg_path.to_str().unwrap(), "config"])
        .output()
        .expect("run rawtcp");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to parse config file"));
}
