use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;
use tmslink_core::protocol::DEFAULT_BAUD_RATE;
use tmslink_core::{LinkConfig, ProtocolError, StimulatorConfig};

#[test]
fn test_link_config_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{ "port_name": "/dev/ttyUSB1", "reply_timeout_ms": 250, "history_len": 4 }}"#
    )
    .unwrap();

    let config = LinkConfig::from_file(file.path()).unwrap();
    assert_eq!(config.port_name, "/dev/ttyUSB1");
    assert_eq!(config.reply_timeout_ms, 250);
    assert_eq!(config.history_len, 4);
    assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
    assert!(config.validate().is_ok());
}

#[test]
fn test_link_config_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = LinkConfig::from_file(dir.path().join("missing.json"));
    assert!(result.is_err());
}

#[test]
fn test_link_config_malformed() {
    assert!(matches!(
        LinkConfig::from_json("{ not json"),
        Err(ProtocolError::Config(_))
    ));
    assert!(matches!(
        LinkConfig::from_json(r#"{ "baud_rate": "fast" }"#),
        Err(ProtocolError::Config(_))
    ));
}

#[test]
fn test_keepalive_shorter_than_poll_rejected() {
    let config = LinkConfig {
        poll_interval_ms: 100,
        keepalive_interval_ms: 50,
        ..LinkConfig::for_port("COM3")
    };
    assert!(matches!(config.validate(), Err(ProtocolError::Config(_))));
}

#[test]
fn test_stimulator_config_flattens_link() {
    let config: StimulatorConfig = serde_json::from_str(
        r#"{ "port_name": "COM3", "baud_rate": 19200, "simultaneous_discharge": false }"#,
    )
    .unwrap();
    assert_eq!(config.link.port_name, "COM3");
    assert_eq!(config.link.baud_rate, 19200);
    assert!(!config.simultaneous_discharge);

    let defaults: StimulatorConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(defaults, StimulatorConfig::default());
    assert!(defaults.simultaneous_discharge);
}

#[test]
fn test_stimulator_config_round_trips_through_json() {
    let config = StimulatorConfig {
        link: LinkConfig::for_port("/dev/ttyACM0"),
        simultaneous_discharge: false,
    };
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"port_name\":\"/dev/ttyACM0\""));
    let parsed: StimulatorConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}
