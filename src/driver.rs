//! Poll loop for Wallwatch
//!
//! Each iteration visits every station in turn: connect, read the status,
//! let the session tracker decide what changed, release the connection,
//! then notify and log. Iterations never overlap and are separated by a
//! fixed sleep. Failures are logged and end only the current station's
//! turn.

use crate::config::Config;
use crate::error::{Result, WallwatchError};
use crate::logging::{StructuredLogger, get_logger};
use crate::modbus::{ModbusConnector, ModbusTimings};
use crate::notifier::{Notifier, SignalNotifier};
use crate::session::{SessionTracker, TrackerSettings};
use crate::session_log::{CsvSessionLog, NullSessionLog, SessionLog};
use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, sleep};

mod station;

pub use station::StationPoller;

/// Lifecycle of the watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherState {
    Initializing,
    Running,
    ShuttingDown,
}

/// Requests a graceful stop; the loop notices it between iterations
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl ShutdownHandle {
    pub fn request(&self) {
        self.tx.send(()).ok();
    }
}

/// What one iteration did, mainly for diagnostics and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub stations_polled: usize,
    pub connect_failures: usize,
    pub read_failures: usize,
    pub notifications_sent: usize,
    pub notify_failures: usize,
    pub records_written: usize,
}

/// Owns every station and the outbound sinks
pub struct Watcher {
    stations: Vec<StationPoller>,
    notifier: Box<dyn Notifier>,
    session_log: Box<dyn SessionLog>,
    poll_interval: Duration,
    state: watch::Sender<WatcherState>,
    shutdown_tx: mpsc::UnboundedSender<()>,
    shutdown_rx: mpsc::UnboundedReceiver<()>,
    logger: StructuredLogger,
}

impl Watcher {
    pub fn new(
        stations: Vec<StationPoller>,
        notifier: Box<dyn Notifier>,
        session_log: Box<dyn SessionLog>,
        poll_interval: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(WatcherState::Initializing);
        Self {
            stations,
            notifier,
            session_log,
            poll_interval,
            state,
            shutdown_tx,
            shutdown_rx,
            logger: get_logger("watcher"),
        }
    }

    /// Build the production wiring from a validated configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let timings = ModbusTimings::from(&config.modbus);
        let resolved = config.resolved_stations();
        let show_station = resolved.len() > 1;

        let stations = resolved
            .into_iter()
            .map(|station| {
                let tracker = SessionTracker::new(TrackerSettings {
                    station: station.name.clone(),
                    show_station,
                    triggers: config.session_triggers(),
                    decimal_separator: config.decimal_separator(),
                    registers: config.registers.clone(),
                });
                StationPoller::new(
                    Box::new(ModbusConnector::new(station, timings)),
                    tracker,
                    config.registers.status,
                )
            })
            .collect();

        let notifier = Box::new(SignalNotifier::new(&config.signal)?);
        let session_log: Box<dyn SessionLog> = if config.session_log.enabled {
            Box::new(CsvSessionLog::new(
                &config.session_log,
                &config.locale.timezone,
            )?)
        } else {
            Box::new(NullSessionLog)
        };

        Ok(Self::new(
            stations,
            notifier,
            session_log,
            Duration::from_secs(config.poll_interval_secs),
        ))
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    pub fn get_state(&self) -> WatcherState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<WatcherState> {
        self.state.subscribe()
    }

    pub fn stations(&self) -> &[StationPoller] {
        &self.stations
    }

    /// Every station must accept a connection before polling starts
    pub async fn probe(&self) -> Result<()> {
        for station in &self.stations {
            if let Err(e) = station.probe().await {
                return Err(WallwatchError::connect(format!(
                    "Station '{}' is unreachable: {}",
                    station.name(),
                    e
                )));
            }
        }
        Ok(())
    }

    /// Run the watcher until a shutdown is requested
    pub async fn run(&mut self) -> Result<()> {
        self.logger.info(&format!(
            "Starting wallwatch {} for {} station(s), polling every {}s",
            crate::VERSION,
            self.stations.len(),
            self.poll_interval.as_secs()
        ));

        self.probe().await?;
        self.state.send_replace(WatcherState::Running);

        loop {
            if self.shutdown_rx.try_recv().is_ok() {
                self.logger.info("Shutdown signal received");
                break;
            }

            let report = self.poll_cycle().await;
            self.logger.debug(&format!(
                "Loop iteration complete ({:?}), sleeping for {} seconds",
                report,
                self.poll_interval.as_secs()
            ));

            tokio::select! {
                _ = sleep(self.poll_interval) => {}
                _ = self.shutdown_rx.recv() => {
                    self.logger.info("Shutdown signal received");
                    break;
                }
            }
        }

        self.state.send_replace(WatcherState::ShuttingDown);
        self.shutdown().await;
        Ok(())
    }

    /// One pass over all stations. Never fails; problems are counted.
    pub async fn poll_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        for station in &mut self.stations {
            report.stations_polled += 1;
            let event = match station.poll().await {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    if e.is_transport_error() {
                        report.connect_failures += 1;
                        self.logger.error(&format!(
                            "Failed to reach station '{}': {}",
                            station.name(),
                            e
                        ));
                    } else {
                        report.read_failures += 1;
                        self.logger.error(&format!(
                            "Failed to read status of station '{}': {}",
                            station.name(),
                            e
                        ));
                    }
                    continue;
                }
            };

            match self.notifier.send(&event.message).await {
                Ok(()) => report.notifications_sent += 1,
                Err(e) => {
                    report.notify_failures += 1;
                    self.logger
                        .error(&format!("Failed to send message: {}", e));
                }
            }

            if let Some(record) = event.record {
                match self.session_log.append(&record).await {
                    Ok(()) => report.records_written += 1,
                    Err(e) => self.logger.error(&format!(
                        "Failed to append session record for '{}': {}",
                        record.station, e
                    )),
                }
            }
        }

        report
    }

    async fn shutdown(&mut self) {
        // Connections are released at the end of every iteration, so only
        // the tracker state is left to report
        for station in &self.stations {
            let last = station
                .tracker()
                .state()
                .last_status
                .map_or("none", |s| s.name());
            self.logger.info(&format!(
                "Station '{}' last status: {}",
                station.name(),
                last
            ));
        }
        self.logger.info("Watcher shutdown complete");
    }
}
