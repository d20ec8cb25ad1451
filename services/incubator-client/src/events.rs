//! Client events broadcast to subscribers

use crate::display::ConnectionStatus;
use crate::protocol::Command;
use crate::telemetry::TelemetryFrame;

/// Notification emitted by the client
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Connection status indicator changed
    StatusChanged(ConnectionStatus),

    /// A telemetry frame was decoded and applied to the display state
    Telemetry(TelemetryFrame),

    /// A text message could not be decoded and was dropped
    FrameRejected { reason: String },

    /// A command frame was written to the socket
    CommandSent(Command),

    /// A command was dropped because the socket is not open
    CommandDropped(Command),

    /// The connection closed, a reconnect is scheduled if enabled
    ConnectionLost { reason: String },

    /// A reconnect attempt is about to start
    Reconnecting {
        attempt: u32,
        max_attempts: Option<u32>,
    },

    /// Reconnection gave up
    ReconnectFailed { reason: String },
}

impl std::fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientEvent::StatusChanged(status) => write!(f, "status: {}", status),
            ClientEvent::Telemetry(frame) => write!(
                f,
                "telemetry: {:.1} °C, {:.0} %, setpoint {:.1}",
                frame.temperature, frame.humidity, frame.setpoint
            ),
            ClientEvent::FrameRejected { reason } => write!(f, "frame rejected: {}", reason),
            ClientEvent::CommandSent(command) => write!(f, "command sent: {}", command),
            ClientEvent::CommandDropped(command) => write!(f, "command dropped: {}", command),
            ClientEvent::ConnectionLost { reason } => write!(f, "connection lost: {}", reason),
            ClientEvent::Reconnecting {
                attempt,
                max_attempts,
            } => match max_attempts {
                Some(max) => write!(f, "reconnecting (attempt {}/{})", attempt, max),
                None => write!(f, "reconnecting (attempt {})", attempt),
            },
            ClientEvent::ReconnectFailed { reason } => write!(f, "reconnect failed: {}", reason),
        }
    }
}
