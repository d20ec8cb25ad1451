//! Mock incubator controller for testing
//!
//! Serves the controller's WebSocket protocol: pushes one telemetry frame
//! per second to every client and applies received commands to a simulated
//! chamber.
//!
//! Usage:
//!   mock_incubator [--port PORT] [--formatted-time]
//!
//! The port can also be set via the MOCK_INCUBATOR_PORT environment variable.
//! Command line argument takes precedence over environment variable.
//! Default port is 81 (same as the firmware).

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use incubator_client::{pwm_to_percent, Command, CommandFrame, Elapsed, TelemetryFrame};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn, Level};

#[derive(Parser)]
#[command(name = "mock_incubator")]
#[command(about = "Mock ESP32 incubator controller")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "MOCK_INCUBATOR_PORT", default_value = "81")]
    port: u16,

    /// Report elapsed time as a single string instead of counter fields
    #[arg(long)]
    formatted_time: bool,

    /// Log level
    #[arg(short, long, default_value = "info", value_parser = clap::value_parser!(Level))]
    log_level: Level,
}

/// Simulated chamber state
#[derive(Debug, Clone)]
struct Chamber {
    temperature: f64,
    humidity: f64,
    setpoint: f64,
    heater_on: bool,
    fan_pwm: u8,
    counter_running: bool,
    elapsed_seconds: u64,
}

impl Default for Chamber {
    fn default() -> Self {
        Self {
            temperature: 25.0,
            humidity: 55.0,
            setpoint: 37.5,
            heater_on: false,
            fan_pwm: 0,
            counter_running: false,
            elapsed_seconds: 0,
        }
    }
}

impl Chamber {
    fn tick(&mut self) {
        if self.heater_on && self.temperature < self.setpoint {
            self.temperature += 0.2;
        } else if self.temperature > 25.0 {
            self.temperature -= 0.1;
        }
        let cooling = f64::from(self.fan_pwm) / 255.0;
        self.humidity = (self.humidity - cooling * 0.1).max(30.0);
        if self.counter_running {
            self.elapsed_seconds += 1;
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::SetSetpoint(value) => self.setpoint = value,
            Command::ToggleHeater => self.heater_on = !self.heater_on,
            Command::SetFan(pwm) => self.fan_pwm = pwm,
            Command::StartCounter => self.counter_running = true,
            Command::ResetCounter => {
                self.counter_running = false;
                self.elapsed_seconds = 0;
            }
        }
    }

    fn frame(&self, formatted_time: bool) -> TelemetryFrame {
        let secs = self.elapsed_seconds;
        let (days, hours, minutes, seconds) = (
            (secs / 86_400) as u32,
            ((secs % 86_400) / 3600) as u32,
            ((secs % 3600) / 60) as u32,
            (secs % 60) as u32,
        );
        let elapsed = if formatted_time {
            Elapsed::Formatted {
                elapsed_time: format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds),
            }
        } else {
            Elapsed::Counter {
                days,
                hours,
                minutes,
                seconds,
            }
        };
        TelemetryFrame {
            temperature: self.temperature,
            humidity: self.humidity,
            setpoint: self.setpoint,
            elapsed,
            heater_status: self.heater_on,
            fan_speed: f64::from(pwm_to_percent(self.fan_pwm)),
            fan_status: if formatted_time {
                Some(self.fan_pwm > 0)
            } else {
                None
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let listener = TcpListener::bind(format!("0.0.0.0:{}", args.port)).await?;
    info!("Mock incubator listening on port {}", args.port);

    let chamber = Arc::new(Mutex::new(Chamber::default()));

    let ticker = chamber.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            ticker.lock().await.tick();
        }
    });

    loop {
        let (stream, addr) = listener.accept().await?;
        info!("Connection from {}", addr);
        let chamber = chamber.clone();
        let formatted_time = args.formatted_time;
        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, chamber, formatted_time).await {
                warn!("Client {} error: {}", addr, e);
            }
            info!("Client {} disconnected", addr);
        });
    }
}

async fn handle_client(
    stream: TcpStream,
    chamber: Arc<Mutex<Chamber>>,
    formatted_time: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut source) = ws.split();
    let mut interval = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let frame = chamber.lock().await.frame(formatted_time);
                let json = serde_json::to_string(&frame)?;
                debug!("Sending: {}", json);
                sink.send(Message::Text(json.into())).await?;
            }
            message = source.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        debug!("Received: {}", text.as_str());
                        match serde_json::from_str::<CommandFrame>(text.as_str())
                            .map_err(incubator_client::IncubatorError::from)
                            .and_then(Command::try_from)
                        {
                            Ok(command) => {
                                info!("Applying command {}", command);
                                chamber.lock().await.apply(command);
                            }
                            Err(e) => warn!("Rejected command frame: {}", e),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                }
            }
        }
    }
}
