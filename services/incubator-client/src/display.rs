//! Display state projected from telemetry frames
//!
//! Holds the text shown for each quantity on the control panel. Formatting
//! is per field: temperature and setpoint with one decimal, humidity as a
//! whole percentage, fan speed as reported.

use serde::Serialize;

use crate::telemetry::{Elapsed, TelemetryFrame};

/// Text shown before the first frame arrives
pub const PLACEHOLDER: &str = "--";

/// Connection status indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connected => "connected",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Semantic kind of an on/off indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BadgeKind {
    Active,
    Inactive,
    Unknown,
}

/// On/off indicator for an actuator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub text: String,
    pub kind: BadgeKind,
}

impl Badge {
    pub fn from_flag(on: bool) -> Self {
        if on {
            Self {
                text: "ON".to_string(),
                kind: BadgeKind::Active,
            }
        } else {
            Self {
                text: "OFF".to_string(),
                kind: BadgeKind::Inactive,
            }
        }
    }
}

impl Default for Badge {
    fn default() -> Self {
        Self {
            text: PLACEHOLDER.to_string(),
            kind: BadgeKind::Unknown,
        }
    }
}

/// Elapsed incubation time as displayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ElapsedDisplay {
    Counter {
        days: String,
        hours: String,
        minutes: String,
        seconds: String,
    },
    Formatted(String),
}

impl Default for ElapsedDisplay {
    fn default() -> Self {
        ElapsedDisplay::Counter {
            days: PLACEHOLDER.to_string(),
            hours: PLACEHOLDER.to_string(),
            minutes: PLACEHOLDER.to_string(),
            seconds: PLACEHOLDER.to_string(),
        }
    }
}

impl From<&Elapsed> for ElapsedDisplay {
    fn from(elapsed: &Elapsed) -> Self {
        match elapsed {
            Elapsed::Counter {
                days,
                hours,
                minutes,
                seconds,
            } => ElapsedDisplay::Counter {
                days: days.to_string(),
                hours: hours.to_string(),
                minutes: minutes.to_string(),
                seconds: seconds.to_string(),
            },
            Elapsed::Formatted { elapsed_time } => ElapsedDisplay::Formatted(elapsed_time.clone()),
        }
    }
}

impl std::fmt::Display for ElapsedDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElapsedDisplay::Counter {
                days,
                hours,
                minutes,
                seconds,
            } => write!(f, "{}d {}h {}m {}s", days, hours, minutes, seconds),
            ElapsedDisplay::Formatted(text) => write!(f, "{}", text),
        }
    }
}

/// Everything the control panel shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayState {
    pub status: ConnectionStatus,
    pub temperature: String,
    pub humidity: String,
    pub setpoint: String,
    pub elapsed: ElapsedDisplay,
    pub heater: Badge,
    pub fan: String,
    /// Number of telemetry frames applied so far
    pub frames: u64,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::default(),
            temperature: PLACEHOLDER.to_string(),
            humidity: PLACEHOLDER.to_string(),
            setpoint: PLACEHOLDER.to_string(),
            elapsed: ElapsedDisplay::default(),
            heater: Badge::default(),
            fan: PLACEHOLDER.to_string(),
            frames: 0,
        }
    }
}

impl DisplayState {
    /// Project a decoded frame onto every displayed field
    pub fn apply(&mut self, frame: &TelemetryFrame) {
        self.temperature = format_temperature(frame.temperature);
        self.humidity = format_humidity(frame.humidity);
        self.setpoint = format_setpoint(frame.setpoint);
        self.elapsed = ElapsedDisplay::from(&frame.elapsed);
        self.heater = Badge::from_flag(frame.heater_status);
        self.fan = format_fan(frame.fan_speed, frame.fan_status);
        self.frames += 1;
    }
}

impl std::fmt::Display for DisplayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Connection:  {}", self.status)?;
        writeln!(f, "Temperature: {}", self.temperature)?;
        writeln!(f, "Humidity:    {}", self.humidity)?;
        writeln!(f, "Setpoint:    {}", self.setpoint)?;
        writeln!(f, "Elapsed:     {}", self.elapsed)?;
        writeln!(f, "Heater:      {}", self.heater.text)?;
        write!(f, "Fan:         {}", self.fan)
    }
}

/// Round to `decimals` places with ties away from zero
///
/// `format!` rounds ties to even, which would show 56.5 % as "56 %".
fn round_half_away(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

pub fn format_temperature(celsius: f64) -> String {
    format!("{:.1} °C", round_half_away(celsius, 1))
}

pub fn format_humidity(percent: f64) -> String {
    format!("{:.0} %", round_half_away(percent, 0))
}

pub fn format_setpoint(celsius: f64) -> String {
    format!("{:.1}", round_half_away(celsius, 1))
}

/// Fan speed as sent by the device, or OFF when the firmware reports the
/// fan switched off
pub fn format_fan(speed: f64, on: Option<bool>) -> String {
    match on {
        Some(false) => "OFF".to_string(),
        _ => format!("{}%", speed),
    }
}
