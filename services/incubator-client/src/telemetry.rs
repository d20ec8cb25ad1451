//! Telemetry frames sent by the incubator controller

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Elapsed incubation time as reported by the firmware
///
/// Depending on the firmware build the counter is either reported as a
/// day/hour/minute/second tuple or as a single preformatted string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Elapsed {
    Counter {
        #[serde(rename = "counterDays")]
        days: u32,
        #[serde(rename = "counterHours")]
        hours: u32,
        #[serde(rename = "counterMins")]
        minutes: u32,
        #[serde(rename = "counterSecs")]
        seconds: u32,
    },
    Formatted {
        #[serde(rename = "elapsedTime")]
        elapsed_time: String,
    },
}

/// A complete telemetry frame
///
/// Every field is required. A frame missing any of them fails to decode as
/// a whole so the display never shows a half-applied update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryFrame {
    /// Chamber temperature in °C
    pub temperature: f64,
    /// Relative humidity in %
    pub humidity: f64,
    /// Target temperature in °C
    pub setpoint: f64,
    #[serde(flatten)]
    pub elapsed: Elapsed,
    pub heater_status: bool,
    /// Fan speed in %
    pub fan_speed: f64,
    /// Separate fan on/off flag, only sent by some firmware builds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fan_status: Option<bool>,
}

impl TelemetryFrame {
    /// Decode a text message received from the controller
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
