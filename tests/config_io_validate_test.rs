use std::collections::HashMap;
use std::fs;
use wallwatch::config::Config;
use wallwatch::status::StationStatus;

fn with_numbers(mut cfg: Config) -> Config {
    cfg.signal.own_number = "+4917600000000".to_string();
    cfg.signal.recipients = vec!["+4915100000001".to_string()];
    cfg
}

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.modbus.host = "10.0.0.5".to_string();
    cfg.signal.recipients = vec!["+4915100000001".to_string()];
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.modbus.host, "10.0.0.5");
    assert_eq!(loaded.signal.recipients, cfg.signal.recipients);
    assert_eq!(loaded.logging.file, cfg.logging.file);
}

#[test]
fn partial_yaml_keeps_defaults() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");
    fs::write(
        &path,
        r#"
modbus:
  host: wallbox.lan
stations:
  - name: garage
  - name: carport
    host: 10.0.0.9
    unit_id: 2
session:
  start_status: preparing
signal:
  own_number: "+4917600000000"
  recipients: ["+4915100000001"]
registers:
  status:
    address: 1000
    length: 1
"#,
    )
    .unwrap();

    let cfg = Config::from_file(&path).unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.modbus.port, 502);
    assert_eq!(cfg.registers.status.address, 1000);
    assert_eq!(cfg.registers.total_energy.length, 2);
    assert_eq!(cfg.session.start_status, StationStatus::Preparing);
    assert_eq!(cfg.session.end_status, StationStatus::Available);

    let stations = cfg.resolved_stations();
    assert_eq!(stations[0].host, "wallbox.lan");
    assert_eq!(stations[0].unit_id, 1);
    assert_eq!(stations[1].host, "10.0.0.9");
    assert_eq!(stations[1].unit_id, 2);
}

#[test]
fn environment_overrides_file_values() {
    let mut cfg = Config::default();
    let vars = env(&[
        ("MODBUS_HOST", "192.168.2.10"),
        ("MODBUS_PORT", "5020"),
        ("MODBUS_REGISTER", "1200"),
        ("SIGNAL_HOST", "signal"),
        ("SIGNAL_PORT", "9922"),
        ("SIGNAL_OWN_NUMBER", "+4917600000000"),
        ("SIGNAL_SEND_NUMBER", "+4915100000001, +4915100000002,"),
        ("FREQUENCY", "60"),
        ("LOG_LEVEL", "debug"),
    ]);
    cfg.apply_overrides(|key| vars.get(key).cloned()).unwrap();

    assert_eq!(cfg.modbus.host, "192.168.2.10");
    assert_eq!(cfg.modbus.port, 5020);
    assert_eq!(cfg.registers.status.address, 1200);
    assert_eq!(cfg.signal.host, "signal");
    assert_eq!(cfg.signal.port, 9922);
    assert_eq!(cfg.signal.own_number, "+4917600000000");
    assert_eq!(
        cfg.signal.recipients,
        vec!["+4915100000001".to_string(), "+4915100000002".to_string()]
    );
    assert_eq!(cfg.poll_interval_secs, 60);
    assert_eq!(cfg.logging.level, "debug");
    cfg.validate().unwrap();
}

#[test]
fn unparsable_override_is_rejected() {
    let mut cfg = Config::default();
    let vars = env(&[("MODBUS_PORT", "five-oh-two")]);
    assert!(cfg.apply_overrides(|key| vars.get(key).cloned()).is_err());

    let vars = env(&[("FREQUENCY", "-1")]);
    assert!(cfg.apply_overrides(|key| vars.get(key).cloned()).is_err());
}

#[test]
fn config_validation_errors() {
    let mut cfg = with_numbers(Config::default());

    cfg.modbus.host.clear();
    assert!(cfg.validate().is_err());

    cfg = with_numbers(Config::default());
    cfg.modbus.port = 0;
    assert!(cfg.validate().is_err());

    cfg = with_numbers(Config::default());
    cfg.stations.clear();
    assert!(cfg.validate().is_err());

    cfg = with_numbers(Config::default());
    cfg.registers.charged_energy.length = 3;
    assert!(cfg.validate().is_err());

    cfg = with_numbers(Config::default());
    cfg.registers.idtag[4].length = 0;
    assert!(cfg.validate().is_err());

    cfg = with_numbers(Config::default());
    cfg.session.start_status = StationStatus::Available;
    assert!(cfg.validate().is_err());

    cfg = with_numbers(Config::default());
    cfg.locale.decimal_separator = ",,".to_string();
    assert!(cfg.validate().is_err());

    cfg = with_numbers(Config::default());
    cfg.locale.timezone = "Mars/Olympus".to_string();
    assert!(cfg.validate().is_err());

    cfg = with_numbers(Config::default());
    cfg.logging.level = "LOUD".to_string();
    assert!(cfg.validate().is_err());

    cfg = with_numbers(Config::default());
    cfg.poll_interval_secs = 0;
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.signal.recipients = vec!["+4915100000001".to_string()];
    assert!(cfg.validate().is_err());

    cfg = with_numbers(Config::default());
    cfg.signal.recipients.clear();
    assert!(cfg.validate().is_err());

    cfg = with_numbers(Config::default());
    cfg.session_log.date_format = "%d.%m.%Q".to_string();
    assert!(cfg.validate().is_err());

    cfg = with_numbers(Config::default());
    cfg.session_log.time_format = "%H:%M:%".to_string();
    assert!(cfg.validate().is_err());

    assert!(with_numbers(Config::default()).validate().is_ok());
}

#[test]
fn example_config_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/wallwatch.example.yaml");
    let cfg = Config::from_file(path).unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.resolved_stations().len(), 2);
    assert_eq!(cfg.registers.idtag[4].address, 308);
}
