//! Connection management for the incubator client
//!
//! This module owns the connect/reconnect state machine, the reader task
//! that dispatches inbound telemetry, and the forced-close path used when
//! the transport fails.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, Notify, RwLock};
use tracing::{debug, info, warn};

use crate::config::DeviceConfig;
use crate::display::{ConnectionStatus, DisplayState};
use crate::error::Result;
use crate::events::ClientEvent;
use crate::io::{ConnectionFactory, ConnectionPair, FrameReader, FrameWriter};
#[cfg(test)]
use crate::io::WsConnectionFactory;
use crate::protocol::Command;
use crate::telemetry::TelemetryFrame;

/// Shared state for connection management
///
/// Cloned into the client, the reader task and the connect task.
#[derive(Clone)]
pub(crate) struct SharedConnectionState {
    pub display: Arc<RwLock<DisplayState>>,
    pub writer: Arc<Mutex<Option<Box<dyn FrameWriter>>>>,
    pub event_sender: broadcast::Sender<ClientEvent>,
    pub reader_handle: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
    pub connect_handle: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
    /// Signals the reader of the current socket to close it
    pub close_signal: Arc<Mutex<Option<Arc<Notify>>>>,
    pub running: Arc<AtomicBool>,
    pub connect_pending: Arc<AtomicBool>,
    pub stop_connect: Arc<Notify>,
    pub connection_factory: Arc<dyn ConnectionFactory>,
}

impl SharedConnectionState {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::with_factory(Arc::new(WsConnectionFactory::new()))
    }

    pub fn with_factory(connection_factory: Arc<dyn ConnectionFactory>) -> Self {
        let (event_sender, _) = broadcast::channel(100);
        Self {
            display: Arc::new(RwLock::new(DisplayState::default())),
            writer: Arc::new(Mutex::new(None)),
            event_sender,
            reader_handle: Arc::new(Mutex::new(None)),
            connect_handle: Arc::new(Mutex::new(None)),
            close_signal: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            connect_pending: Arc::new(AtomicBool::new(false)),
            stop_connect: Arc::new(Notify::new()),
            connection_factory,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_connect_pending(&self) -> bool {
        self.connect_pending.load(Ordering::SeqCst)
    }

    /// Transport-level readiness: a socket is open and its writer is held
    pub async fn is_open(&self) -> bool {
        self.writer.lock().await.is_some()
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.display.read().await.status
    }

    /// Update the status indicator, broadcasting only real transitions
    pub async fn set_status(&self, status: ConnectionStatus) {
        let changed = {
            let mut display = self.display.write().await;
            let changed = display.status != status;
            display.status = status;
            changed
        };
        if changed {
            debug!("Connection status: {}", status);
            let _ = self.event_sender.send(ClientEvent::StatusChanged(status));
        }
    }

    /// Decode one inbound text message and project it onto the display
    ///
    /// Frames that fail to decode are logged and dropped without touching
    /// the display state.
    pub async fn handle_message(&self, text: &str) {
        match TelemetryFrame::parse(text) {
            Ok(frame) => {
                debug!("Telemetry received: {:?}", frame);
                self.display.write().await.apply(&frame);
                let _ = self.event_sender.send(ClientEvent::Telemetry(frame));
            }
            Err(e) => {
                warn!("Failed to parse telemetry frame: {}", e);
                let _ = self.event_sender.send(ClientEvent::FrameRejected {
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Send a command if the socket is open, otherwise drop it
    pub async fn send_command(&self, command: Command) {
        let payload = match command.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize command {}: {}", command, e);
                return;
            }
        };

        let write_result = {
            let mut writer_guard = self.writer.lock().await;
            match writer_guard.as_mut() {
                Some(writer) => writer.write_text(&payload).await,
                None => {
                    warn!("Not connected, command {} not sent", command);
                    let _ = self.event_sender.send(ClientEvent::CommandDropped(command));
                    return;
                }
            }
        };

        match write_result {
            Ok(()) => {
                info!("Command sent: {}", payload);
                let _ = self.event_sender.send(ClientEvent::CommandSent(command));
            }
            Err(e) => {
                warn!("Failed to send command {}: {}", command, e);
                let _ = self.event_sender.send(ClientEvent::CommandDropped(command));
                self.force_close().await;
            }
        }
    }

    /// Close the current socket after a transport error
    ///
    /// The reader task observes the signal and runs the regular close path.
    pub async fn force_close(&self) {
        debug!("Forcing connection close");
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.close().await;
        }
        if let Some(signal) = self.close_signal.lock().await.take() {
            signal.notify_one();
        }
    }

    /// Tear down the current socket and any pending connect task
    pub async fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stop_connect.notify_waiters();

        if let Some(handle) = self.connect_handle.lock().await.take() {
            handle.abort();
        }
        self.connect_pending.store(false, Ordering::SeqCst);

        if let Some(handle) = self.reader_handle.lock().await.take() {
            handle.abort();
        }
        self.close_signal.lock().await.take();

        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.close().await;
        }

        self.set_status(ConnectionStatus::Disconnected).await;
    }

    /// Store a freshly opened connection and start reading from it
    async fn install_connection(&self, pair: ConnectionPair, config: DeviceConfig) {
        {
            let mut writer_guard = self.writer.lock().await;
            *writer_guard = Some(pair.writer);
        }

        let signal = Arc::new(Notify::new());
        {
            let mut signal_guard = self.close_signal.lock().await;
            *signal_guard = Some(signal.clone());
        }

        self.set_status(ConnectionStatus::Connected).await;

        let reader_handle = spawn_reader_task(pair.reader, signal, config, self.clone());
        let mut handle = self.reader_handle.lock().await;
        *handle = Some(reader_handle);
    }
}

/// Schedule a connect task unless one is already pending
///
/// With `immediate` the first attempt starts right away, otherwise every
/// attempt waits the reconnect delay first.
pub(crate) async fn schedule_connect(
    config: DeviceConfig,
    shared: SharedConnectionState,
    immediate: bool,
) {
    if !shared.is_running() {
        debug!("Client stopped, not scheduling a connection attempt");
        return;
    }
    if shared.connect_pending.swap(true, Ordering::SeqCst) {
        debug!("Connection attempt already pending");
        return;
    }

    let task = spawn_connect_task(config, shared.clone(), immediate);
    let mut handle = shared.connect_handle.lock().await;
    *handle = Some(task);
}

/// Spawn a task that connects to the controller, retrying on failure
fn spawn_connect_task(
    config: DeviceConfig,
    shared: SharedConnectionState,
    immediate: bool,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let url = config.url();
        let delay = config.reconnect.delay();
        let timeout = config.connection_timeout();
        let max_retries = config.reconnect.max_retries;
        let mut attempt = 0u32;

        let failure = loop {
            attempt += 1;

            if let Some(max) = max_retries {
                if attempt > max {
                    warn!("Reconnection failed: max retries ({}) exceeded", max);
                    break Some(format!("Max retries ({}) exceeded", max));
                }
            }

            if attempt > 1 || !immediate {
                debug!("Waiting {:?} before connecting", delay);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shared.stop_connect.notified() => {
                        debug!("Connection attempts stopped");
                        break None;
                    }
                }
            }

            if !shared.is_running() {
                break None;
            }

            if attempt > 1 || !immediate {
                info!("Reconnecting to {} (attempt {})", url, attempt);
                let _ = shared.event_sender.send(ClientEvent::Reconnecting {
                    attempt,
                    max_attempts: max_retries,
                });
            }

            match open_connection(&shared, &url, timeout).await {
                Ok(pair) => {
                    if !shared.is_running() {
                        let mut writer = pair.writer;
                        let _ = writer.close().await;
                        break None;
                    }
                    info!("Connected to incubator at {}", url);
                    // Clear before the reader starts so its close can schedule again
                    shared.connect_pending.store(false, Ordering::SeqCst);
                    shared.install_connection(pair, config.clone()).await;
                    return;
                }
                Err(e) => {
                    warn!("Connection attempt {} to {} failed: {}", attempt, url, e);
                    shared.set_status(ConnectionStatus::Disconnected).await;
                    if !config.reconnect.enabled {
                        break Some("Auto-reconnect disabled".to_string());
                    }
                }
            }
        };

        shared.connect_pending.store(false, Ordering::SeqCst);
        if let Some(reason) = failure {
            let _ = shared
                .event_sender
                .send(ClientEvent::ReconnectFailed { reason });
        }
    })
}

async fn open_connection(
    shared: &SharedConnectionState,
    url: &str,
    timeout: std::time::Duration,
) -> Result<ConnectionPair> {
    debug!("Opening WebSocket to {}", url);
    shared.connection_factory.connect(url, timeout).await
}

/// Spawn a reader task that dispatches messages until the socket closes
pub(crate) fn spawn_reader_task(
    mut reader: Box<dyn FrameReader>,
    close_signal: Arc<Notify>,
    config: DeviceConfig,
    shared: SharedConnectionState,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let disconnect_reason = loop {
            let result = tokio::select! {
                result = reader.read_text() => Some(result),
                _ = close_signal.notified() => None,
            };
            match result {
                Some(Ok(Some(text))) => {
                    if text.is_empty() {
                        continue;
                    }
                    debug!("Received from incubator: {}", text);
                    shared.handle_message(&text).await;
                }
                Some(Ok(None)) => {
                    debug!("Incubator connection closed");
                    break "Connection closed by remote".to_string();
                }
                Some(Err(e)) => {
                    warn!("Transport error: {}", e);
                    break format!("Transport error: {}", e);
                }
                None => break "Connection closed after send failure".to_string(),
            }
        };

        // Errors and remote closes share one path: close the socket, then retry
        {
            let mut writer_guard = shared.writer.lock().await;
            if let Some(mut w) = writer_guard.take() {
                let _ = w.close().await;
            }
        }
        shared.close_signal.lock().await.take();

        shared.set_status(ConnectionStatus::Disconnected).await;
        warn!("Incubator connection lost: {}", disconnect_reason);
        let _ = shared.event_sender.send(ClientEvent::ConnectionLost {
            reason: disconnect_reason,
        });

        if config.reconnect.enabled {
            info!("Reconnecting in {:?}", config.reconnect.delay());
            schedule_connect(config, shared, false).await;
        }
    })
}
