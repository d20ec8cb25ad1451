//! Incubator client for monitoring and controlling the controller over WebSocket

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::debug;

use crate::config::DeviceConfig;
use crate::connection::{schedule_connect, SharedConnectionState};
use crate::display::{ConnectionStatus, DisplayState};
use crate::error::{IncubatorError, Result};
use crate::events::ClientEvent;
use crate::io::{ConnectionFactory, WsConnectionFactory};
use crate::protocol::Command;

/// Telemetry/command client for one incubator controller
///
/// Construct once, call [`start`](Self::start) to begin connecting and
/// [`stop`](Self::stop) to shut down. While running, a closed connection
/// is retried after the configured reconnect delay.
pub struct IncubatorClient {
    config: DeviceConfig,
    shared: SharedConnectionState,
}

impl std::fmt::Debug for IncubatorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncubatorClient")
            .field("url", &self.config.url())
            .field("running", &self.is_running())
            .finish()
    }
}

impl IncubatorClient {
    /// Create a new client using WebSocket connections
    pub fn new(config: DeviceConfig) -> Self {
        Self::with_connection_factory(config, Arc::new(WsConnectionFactory::new()))
    }

    /// Create a new client with a custom connection factory
    ///
    /// This is useful for testing with mock connections.
    pub fn with_connection_factory(
        config: DeviceConfig,
        connection_factory: Arc<dyn ConnectionFactory>,
    ) -> Self {
        Self {
            config,
            shared: SharedConnectionState::with_factory(connection_factory),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Start connecting to the controller
    ///
    /// The first attempt is made immediately. Calling `start` on a running
    /// client does nothing.
    pub async fn start(&self) {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            debug!("Incubator client already running");
            return;
        }
        debug!("Starting incubator client for {}", self.config.url());
        schedule_connect(self.config.clone(), self.shared.clone(), true).await;
    }

    /// Stop the client
    ///
    /// Cancels any pending reconnect, closes the socket and leaves the
    /// status disconnected. The client can be started again afterwards.
    pub async fn stop(&self) {
        debug!("Stopping incubator client");
        self.shared.shutdown().await;
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Whether the socket is currently open
    pub async fn is_connected(&self) -> bool {
        self.shared.is_open().await
    }

    /// Whether a connect or reconnect attempt is scheduled or in progress
    pub fn is_reconnecting(&self) -> bool {
        self.shared.is_connect_pending()
    }

    /// Current status indicator
    pub async fn status(&self) -> ConnectionStatus {
        self.shared.status().await
    }

    /// Snapshot of the display state
    pub async fn display(&self) -> DisplayState {
        self.shared.display.read().await.clone()
    }

    /// Subscribe to client events
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.shared.event_sender.subscribe()
    }

    /// Wait until the socket is open
    pub async fn wait_connected(&self, timeout: Duration) -> Result<()> {
        let mut events = self.subscribe();
        if self.is_connected().await {
            return Ok(());
        }

        let wait = async {
            loop {
                match events.recv().await {
                    Ok(ClientEvent::StatusChanged(ConnectionStatus::Connected)) => return Ok(()),
                    Ok(ClientEvent::ReconnectFailed { reason }) => {
                        return Err(IncubatorError::ConnectionFailed(reason))
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        if self.is_connected().await {
                            return Ok(());
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(IncubatorError::NotConnected)
                    }
                }
            }
        };

        tokio::time::timeout(timeout, wait).await.map_err(|_| {
            IncubatorError::Timeout(format!(
                "No connection to {} within {:?}",
                self.config.url(),
                timeout
            ))
        })?
    }

    /// Send a command to the controller
    ///
    /// Fire-and-forget: when the socket is not open the command is logged
    /// and dropped.
    pub async fn send_command(&self, command: Command) {
        self.shared.send_command(command).await;
    }

    /// Set the target temperature
    pub async fn set_setpoint(&self, celsius: f64) {
        self.send_command(Command::SetSetpoint(celsius)).await;
    }

    /// Set the target temperature from user text, ignoring non-numeric input
    pub async fn set_setpoint_from_input(&self, input: &str) {
        match Command::setpoint_from_input(input) {
            Some(command) => self.send_command(command).await,
            None => debug!("Ignoring non-numeric setpoint input: {:?}", input),
        }
    }

    pub async fn toggle_heater(&self) {
        self.send_command(Command::ToggleHeater).await;
    }

    /// Set the fan speed from a 0-100 % value
    pub async fn set_fan_percent(&self, percent: f64) {
        self.send_command(Command::fan_percent(percent)).await;
    }

    pub async fn start_counter(&self) {
        self.send_command(Command::StartCounter).await;
    }

    pub async fn reset_counter(&self) {
        self.send_command(Command::ResetCounter).await;
    }
}
