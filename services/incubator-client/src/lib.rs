//! Incubator Client Library
//!
//! This crate provides a Rust client for ESP32-based incubator controllers
//! that publish telemetry and accept commands as JSON over a WebSocket on
//! port 81.

pub mod client;
pub mod config;
pub(crate) mod connection;
pub mod display;
pub mod error;
pub mod events;
pub mod io;
pub mod protocol;
pub mod telemetry;

pub use client::IncubatorClient;
pub use config::{load_config, Config, DeviceConfig, ReconnectConfig};
pub use display::{Badge, BadgeKind, ConnectionStatus, DisplayState, ElapsedDisplay};
pub use error::{IncubatorError, Result};
pub use events::ClientEvent;
pub use protocol::{parse_setpoint, percent_to_pwm, pwm_to_percent, Command, CommandFrame};
pub use telemetry::{Elapsed, TelemetryFrame};
