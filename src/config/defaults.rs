use super::*;

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.100".to_string(),
            port: 502,
            unit_id: 1,
            connect_timeout_ms: 5000,
            operation_timeout_ms: 2000,
            read_delay_ms: 0,
        }
    }
}

impl Default for RegistersConfig {
    fn default() -> Self {
        let tag = |address| RegisterSpec { address, length: 2 };
        Self {
            status: RegisterSpec {
                address: 100,
                length: 1,
            },
            total_energy: RegisterSpec {
                address: 200,
                length: 2,
            },
            charged_energy: RegisterSpec {
                address: 210,
                length: 2,
            },
            idtag: [tag(300), tag(302), tag(304), tag(306), tag(308)],
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        let triggers = SessionTriggers::default();
        Self {
            start_status: triggers.start,
            end_status: triggers.end,
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            own_number: String::new(),
            recipients: Vec::new(),
            timeout_ms: 10_000,
        }
    }
}

impl Default for SessionLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: "/data/wallwatch".to_string(),
            delimiter: ";".to_string(),
            date_format: "%d.%m.%Y".to_string(),
            time_format: "%H:%M:%S".to_string(),
            header: true,
        }
    }
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            decimal_separator: ",".to_string(),
            timezone: "Europe/Berlin".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/wallwatch.log".to_string(),
            console_output: true,
            json_format: false,
            backup_count: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modbus: ModbusConfig::default(),
            stations: vec![StationConfig {
                name: "wallbox".to_string(),
                host: None,
                port: None,
                unit_id: None,
            }],
            registers: RegistersConfig::default(),
            session: SessionConfig::default(),
            signal: SignalConfig::default(),
            session_log: SessionLogConfig::default(),
            locale: LocaleConfig::default(),
            logging: LoggingConfig::default(),
            poll_interval_secs: 30,
        }
    }
}
