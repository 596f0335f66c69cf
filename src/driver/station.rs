use crate::config::RegisterSpec;
use crate::error::Result;
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::modbus::{Connector, RegisterTransport};
use crate::registers::RegisterReader;
use crate::session::{SessionEvent, SessionTracker};

/// One station: how to reach it and what it last reported
pub struct StationPoller {
    connector: Box<dyn Connector>,
    tracker: SessionTracker,
    status_register: RegisterSpec,
    logger: StructuredLogger,
}

impl StationPoller {
    pub fn new(
        connector: Box<dyn Connector>,
        tracker: SessionTracker,
        status_register: RegisterSpec,
    ) -> Self {
        let logger = get_logger_with_context(
            LogContext::new("poll")
                .with_station(tracker.station())
                .with_field("endpoint", connector.endpoint()),
        );
        Self {
            connector,
            tracker,
            status_register,
            logger,
        }
    }

    pub fn name(&self) -> &str {
        self.tracker.station()
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Open and immediately release a connection
    pub async fn probe(&self) -> Result<()> {
        let mut transport = self.connector.connect().await?;
        transport.close().await;
        self.logger
            .info(&format!("Station reachable at {}", self.connector.endpoint()));
        Ok(())
    }

    /// Connect, read, run the session logic and release the connection.
    ///
    /// The connection is closed on every path once it was opened.
    pub async fn poll(&mut self) -> Result<Option<SessionEvent>> {
        self.logger.debug("Connecting");
        let mut transport = self.connector.connect().await?;
        let result = self.poll_connected(transport.as_mut()).await;
        transport.close().await;
        result
    }

    async fn poll_connected(
        &mut self,
        transport: &mut dyn RegisterTransport,
    ) -> Result<Option<SessionEvent>> {
        let mut reader = RegisterReader::new(transport);
        let code = reader.read_spec(self.status_register).await?;
        self.logger.debug(&format!(
            "Got {} from status register {}",
            code, self.status_register.address
        ));
        Ok(self.tracker.on_status(code, &mut reader).await)
    }
}
