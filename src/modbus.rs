//! Modbus TCP transport for the charging station controller
//!
//! A [`ModbusClient`] wraps one `tokio-modbus` TCP context. The poll loop
//! never talks to it directly; it goes through the [`Connector`] and
//! [`RegisterTransport`] seams so a connection is opened and closed once
//! per iteration and tests can script register contents.

use crate::config::{ModbusConfig, ResolvedStation};
use crate::error::{Result, WallwatchError};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_modbus::client::tcp;
use tokio_modbus::prelude::*;

#[cfg(test)]
pub(crate) mod mock;

/// Holding-register access over an open connection
#[async_trait::async_trait]
pub trait RegisterTransport: Send {
    async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>>;

    /// Release the connection. Must be safe to call more than once.
    async fn close(&mut self);
}

/// Opens a fresh transport for one poll iteration
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn RegisterTransport>>;

    /// Human readable endpoint for diagnostics
    fn endpoint(&self) -> String;
}

/// Timing parameters shared by every client of a station
#[derive(Debug, Clone, Copy)]
pub struct ModbusTimings {
    pub connect_timeout: Duration,
    pub operation_timeout: Duration,
    pub read_delay: Duration,
}

impl From<&ModbusConfig> for ModbusTimings {
    fn from(config: &ModbusConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            operation_timeout: Duration::from_millis(config.operation_timeout_ms),
            read_delay: Duration::from_millis(config.read_delay_ms),
        }
    }
}

/// Modbus TCP client for a single station
pub struct ModbusClient {
    /// Modbus TCP client connection
    client: Option<tokio_modbus::client::Context>,

    station: ResolvedStation,

    timings: ModbusTimings,

    logger: StructuredLogger,
}

impl ModbusClient {
    /// Create a new, unconnected Modbus client
    pub fn new(station: &ResolvedStation, timings: ModbusTimings) -> Self {
        let logger = get_logger_with_context(LogContext::new("modbus").with_station(&station.name));
        Self {
            client: None,
            station: station.clone(),
            timings,
            logger,
        }
    }

    fn address(&self) -> String {
        format!("{}:{}", self.station.host, self.station.port)
    }

    async fn resolve(address: String) -> Result<SocketAddr> {
        let mut addrs = tokio::net::lookup_host(address.as_str())
            .await
            .map_err(|e| WallwatchError::connect(format!("Invalid socket address {}: {}", address, e)))?;
        addrs
            .next()
            .ok_or_else(|| WallwatchError::connect(format!("Invalid socket address {}", address)))
    }

    /// Connect to the Modbus server
    pub async fn connect(&mut self) -> Result<()> {
        let socket_addr = Self::resolve(self.address()).await?;
        self.logger
            .debug(&format!("Connecting to Modbus server at {}", socket_addr));

        let slave = Slave(self.station.unit_id);
        match timeout(
            self.timings.connect_timeout,
            tcp::connect_slave(socket_addr, slave),
        )
        .await
        {
            Ok(Ok(client)) => {
                self.client = Some(client);
                self.logger.debug("Connected to Modbus server");
                Ok(())
            }
            Ok(Err(e)) => Err(WallwatchError::connect(format!(
                "Failed to connect to Modbus server at {}: {}",
                socket_addr, e
            ))),
            Err(_) => Err(WallwatchError::timeout(format!(
                "Connection to {} timed out",
                socket_addr
            ))),
        }
    }

    /// Disconnect from the Modbus server
    pub async fn disconnect(&mut self) {
        if let Some(mut client) = self.client.take() {
            self.logger.debug("Disconnecting from Modbus server");
            if let Err(e) = client.disconnect().await {
                self.logger
                    .debug(&format!("Ignoring error while disconnecting: {}", e));
            }
        }
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Read holding registers
    pub async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        let operation_timeout = self.timings.operation_timeout;
        let read_delay = self.timings.read_delay;

        self.logger.trace(&format!(
            "Reading {} registers from address {}",
            count, address
        ));

        if !read_delay.is_zero() {
            sleep(read_delay).await;
        }

        let client = self.get_client()?;
        let request = client.read_holding_registers(address, count);

        match timeout(operation_timeout, request).await {
            Ok(Ok(Ok(response))) => {
                self.logger
                    .trace(&format!("Read {} registers: {:?}", response.len(), response));
                Ok(response)
            }
            Ok(Ok(Err(exception))) => Err(WallwatchError::read(format!(
                "Exception response reading {}+{}: {}",
                address, count, exception
            ))),
            Ok(Err(e)) => Err(WallwatchError::read(format!(
                "Failed to read holding registers {}+{}: {}",
                address, count, e
            ))),
            Err(_) => Err(WallwatchError::timeout(format!(
                "Read of {}+{} timed out",
                address, count
            ))),
        }
    }

    /// Get client reference or error if not connected
    fn get_client(&mut self) -> Result<&mut tokio_modbus::client::Context> {
        self.client
            .as_mut()
            .ok_or_else(|| WallwatchError::read("Not connected to Modbus server"))
    }
}

#[async_trait::async_trait]
impl RegisterTransport for ModbusClient {
    async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>> {
        ModbusClient::read_holding_registers(self, address, count).await
    }

    async fn close(&mut self) {
        self.disconnect().await;
    }
}

/// Connector producing one [`ModbusClient`] per call
pub struct ModbusConnector {
    station: ResolvedStation,
    timings: ModbusTimings,
}

impl ModbusConnector {
    pub fn new(station: ResolvedStation, timings: ModbusTimings) -> Self {
        Self { station, timings }
    }
}

#[async_trait::async_trait]
impl Connector for ModbusConnector {
    async fn connect(&self) -> Result<Box<dyn RegisterTransport>> {
        let mut client = ModbusClient::new(&self.station, self.timings);
        client.connect().await?;
        Ok(Box::new(client))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}:{} (unit {})",
            self.station.host, self.station.port, self.station.unit_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(host: &str) -> ResolvedStation {
        ResolvedStation {
            name: "garage".to_string(),
            host: host.to_string(),
            port: 502,
            unit_id: 1,
        }
    }

    #[test]
    fn test_modbus_client_creation() {
        let timings = ModbusTimings::from(&ModbusConfig::default());
        let client = ModbusClient::new(&station("127.0.0.1"), timings);
        assert!(!client.is_connected());
        assert_eq!(timings.operation_timeout, Duration::from_secs(2));
        assert!(timings.read_delay.is_zero());
    }

    #[tokio::test]
    async fn test_read_without_connect_fails() {
        let timings = ModbusTimings::from(&ModbusConfig::default());
        let mut client = ModbusClient::new(&station("127.0.0.1"), timings);
        let err = client.read_holding_registers(100, 1).await.unwrap_err();
        assert!(err.to_string().contains("Not connected"));
        // Closing an unconnected client is a no-op
        RegisterTransport::close(&mut client).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_delay_precedes_every_read() {
        let config = ModbusConfig {
            read_delay_ms: 250,
            ..Default::default()
        };
        let mut client = ModbusClient::new(&station("127.0.0.1"), ModbusTimings::from(&config));

        let start = tokio::time::Instant::now();
        assert!(client.read_holding_registers(100, 1).await.is_err());
        assert_eq!(start.elapsed(), Duration::from_millis(250));
        assert!(client.read_holding_registers(200, 2).await.is_err());
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_read_delay_does_not_sleep() {
        let timings = ModbusTimings::from(&ModbusConfig::default());
        let mut client = ModbusClient::new(&station("127.0.0.1"), timings);

        let start = tokio::time::Instant::now();
        assert!(client.read_holding_registers(100, 1).await.is_err());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_connect_invalid_address_errors() {
        let timings = ModbusTimings::from(&ModbusConfig::default());
        let mut client = ModbusClient::new(&station("bad host"), timings);
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, WallwatchError::Connect { .. }));
    }

    #[tokio::test]
    async fn test_connect_refused_is_connect_error() {
        // Grab a free port and release it so nothing listens there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut st = station("127.0.0.1");
        st.port = port;
        let connector = ModbusConnector::new(st, ModbusTimings::from(&ModbusConfig::default()));
        let err = match connector.connect().await {
            Ok(_) => panic!("connect to closed port succeeded"),
            Err(e) => e,
        };
        assert!(err.is_transport_error());
        assert!(connector.endpoint().contains(&port.to_string()));
    }
}
