//! Command frames sent from the client to the incubator controller

use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::error::{IncubatorError, Result};

/// Maximum PWM duty value accepted by the fan driver
pub const PWM_MAX: u8 = 255;

/// A user command for the incubator controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Set the target temperature in °C
    SetSetpoint(f64),
    ToggleHeater,
    /// Set the fan PWM duty (0-255)
    SetFan(u8),
    /// Start the incubation counter
    StartCounter,
    /// Reset the incubation counter, discarding elapsed time
    ResetCounter,
}

impl Command {
    /// Wire name of the command
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetSetpoint(_) => "setSetpoint",
            Command::ToggleHeater => "toggleHeater",
            Command::SetFan(_) => "setFan",
            Command::StartCounter => "startCounter",
            Command::ResetCounter => "resetCounter",
        }
    }

    /// Build a `setFan` command from a 0-100 % slider value
    pub fn fan_percent(percent: f64) -> Self {
        Command::SetFan(percent_to_pwm(percent))
    }

    /// Build a `setSetpoint` command from user text input
    ///
    /// Returns `None` when the input is not a finite number, in which case
    /// nothing should be sent.
    pub fn setpoint_from_input(input: &str) -> Option<Self> {
        parse_setpoint(input).map(Command::SetSetpoint)
    }

    /// Whether the command discards or starts counter progress on the device
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, Command::StartCounter | Command::ResetCounter)
    }

    /// Serialize the command into a JSON text frame
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&CommandFrame::from(self))?)
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::SetSetpoint(value) => write!(f, "{}({})", self.name(), value),
            Command::SetFan(pwm) => write!(f, "{}({})", self.name(), pwm),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Command frame as it appears on the wire
///
/// `value` is always serialized, as `null` for commands without one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandFrame {
    pub command: String,
    #[serde(default)]
    pub value: Option<Number>,
}

impl From<&Command> for CommandFrame {
    fn from(command: &Command) -> Self {
        let value = match command {
            // Non-finite setpoints serialize as null
            Command::SetSetpoint(value) => Number::from_f64(*value),
            Command::SetFan(pwm) => Some(Number::from(*pwm)),
            Command::ToggleHeater | Command::StartCounter | Command::ResetCounter => None,
        };
        Self {
            command: command.name().to_string(),
            value,
        }
    }
}

impl TryFrom<CommandFrame> for Command {
    type Error = IncubatorError;

    fn try_from(frame: CommandFrame) -> Result<Self> {
        let number = |frame: &CommandFrame| {
            frame.value.as_ref().and_then(Number::as_f64).ok_or_else(|| {
                IncubatorError::SendError(format!("'{}' requires a numeric value", frame.command))
            })
        };
        match frame.command.as_str() {
            "setSetpoint" => Ok(Command::SetSetpoint(number(&frame)?)),
            "setFan" => {
                let pwm = number(&frame)?;
                if !(0.0..=f64::from(PWM_MAX)).contains(&pwm) {
                    return Err(IncubatorError::SendError(format!(
                        "fan PWM out of range: {}",
                        pwm
                    )));
                }
                Ok(Command::SetFan(pwm.round() as u8))
            }
            "toggleHeater" => Ok(Command::ToggleHeater),
            "startCounter" => Ok(Command::StartCounter),
            "resetCounter" => Ok(Command::ResetCounter),
            other => Err(IncubatorError::SendError(format!(
                "Unknown command: {}",
                other
            ))),
        }
    }
}

/// Convert a 0-100 % value to a 0-255 PWM duty
///
/// Rounds rather than truncates so that 100 % maps to exactly 255. Inputs
/// outside 0-100 are clamped, NaN maps to 0.
pub fn percent_to_pwm(percent: f64) -> u8 {
    if percent.is_nan() {
        return 0;
    }
    let percent = percent.clamp(0.0, 100.0);
    (percent * 2.55).round() as u8
}

/// Convert a PWM duty back to a whole percentage
pub fn pwm_to_percent(pwm: u8) -> u8 {
    (f64::from(pwm) / 2.55).round() as u8
}

/// Parse a setpoint typed by the user
pub fn parse_setpoint(input: &str) -> Option<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
