//! ---
//! bridge_section: "01-core-functionality"
//! bridge_subsection: "module"
//! bridge_type: "source"
//! bridge_scope: "code"
//! bridge_description: "Shared primitives and utilities for the bridge runtime."
//! bridge_version: "v0.0.0-prealpha"
//! bridge_owner: "tbd"
//! ---
use std::fs;
use std::path::PathBuf;

use bridge_common::config::BridgeConfig;
use bridge_common::LogFormat;
use tempfile::tempdir;

const SAMPLE: &str = r#"
name = "living-room-bridge"
namespace = "/bridge"

[network]
stream_listen = "127.0.0.1:9090"
multicast_port = 1901

[registry]
maintenance_interval = 5
max_devices = 64

[link.endpoints.upstairs]
callback = "http://192.168.1.20:9090/bridge"

[logging]
format = "pretty"
"#;

#[test]
fn loads_first_existing_candidate() {
    let temp = tempdir().expect("tempdir");
    let missing = temp.path().join("missing.toml");
    let present = temp.path().join("bridge.toml");
    fs::write(&present, SAMPLE).expect("write config");

    let loaded = BridgeConfig::load_with_source(&[missing, present.clone()]).expect("config loads");
    assert_eq!(loaded.source, present);
    assert_eq!(loaded.config.name, "living-room-bridge");
    assert_eq!(loaded.config.namespace, "/bridge");
    assert_eq!(loaded.config.network.stream_listen.port(), 9090);
    assert_eq!(loaded.config.network.multicast_port, 1901);
    assert_eq!(loaded.config.registry.max_devices, Some(64));
    assert_eq!(loaded.config.registry.maintenance_interval.as_secs(), 5);
    assert_eq!(
        loaded.config.link.endpoints["upstairs"].callback,
        "http://192.168.1.20:9090/bridge"
    );
    assert_eq!(loaded.config.logging.format, LogFormat::Pretty);
}

#[test]
fn reports_every_inspected_path_when_nothing_exists() {
    let temp = tempdir().expect("tempdir");
    let first = temp.path().join("a.toml");
    let second = temp.path().join("b.toml");
    let err = BridgeConfig::load(&[first.clone(), second.clone()]).unwrap_err();
    let message = err.to_string();
    assert!(message.contains(&first.display().to_string()));
    assert!(message.contains(&second.display().to_string()));
}

#[test]
fn invalid_file_is_rejected_with_validation_error() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("bad.toml");
    fs::write(&path, "[link.endpoints.broken]\ncallback = \"  \"\n").expect("write config");
    let err = BridgeConfig::load(&[path]).unwrap_err();
    assert!(err.to_string().contains("broken"));
}

#[test]
fn malformed_toml_carries_path_context() {
    let temp = tempdir().expect("tempdir");
    let path: PathBuf = temp.path().join("garbled.toml");
    fs::write(&path, "namespace = ").expect("write config");
    let err = BridgeConfig::load(&[path.clone()]).unwrap_err();
    assert!(err.to_string().contains("failed to parse config file"));
}
