use clap::{Parser, Subcommand};
use incubator_client::{
    load_config, percent_to_pwm, ClientEvent, Command, DeviceConfig, IncubatorClient,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn, Level};

#[derive(Parser)]
#[command(name = "incubator-client")]
#[command(about = "Monitor and control an ESP32 incubator over WebSocket")]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Controller IP address
    #[arg(long, default_value = "192.168.1.8")]
    host: String,

    /// Controller WebSocket port
    #[arg(long, default_value = "81")]
    port: u16,

    /// Log level
    #[arg(short, long, default_value = "info", value_parser = clap::value_parser!(Level))]
    log_level: Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stay connected and log status changes and telemetry
    Monitor,

    /// Connect, wait for one telemetry frame and print the display state
    Status,

    /// Set the target temperature in °C
    SetSetpoint {
        /// Target temperature
        value: String,
    },

    /// Toggle the heater
    ToggleHeater,

    /// Set the fan speed
    SetFan {
        /// Fan speed in percent (0-100)
        percent: f64,
    },

    /// Start the incubation counter
    StartCounter {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Reset the incubation counter
    ResetCounter {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    debug!(
        "Parsed command line arguments: host={}, port={}, log_level={:?}",
        args.host, args.port, args.log_level
    );

    let device_config = if let Some(config_path) = &args.config {
        debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?.device
    } else {
        let config = DeviceConfig {
            host: args.host,
            port: args.port,
            ..Default::default()
        };
        config.validate()?;
        config
    };

    let client = IncubatorClient::new(device_config);

    match args.command {
        Commands::Monitor => run_monitor(&client).await?,
        Commands::Status => run_status(&client).await?,
        Commands::SetSetpoint { value } => match Command::setpoint_from_input(&value) {
            Some(command) => run_command(&client, command).await?,
            None => return Err(format!("Invalid setpoint: {}", value).into()),
        },
        Commands::ToggleHeater => run_command(&client, Command::ToggleHeater).await?,
        Commands::SetFan { percent } => {
            info!("Fan {}% -> PWM {}", percent, percent_to_pwm(percent));
            run_command(&client, Command::fan_percent(percent)).await?
        }
        Commands::StartCounter { yes } => {
            run_confirmed(
                &client,
                Command::StartCounter,
                yes,
                "Start the incubation timer? This cannot be undone without a reset.",
            )
            .await?
        }
        Commands::ResetCounter { yes } => {
            run_confirmed(
                &client,
                Command::ResetCounter,
                yes,
                "WARNING: reset the incubation timer? All elapsed time will be lost.",
            )
            .await?
        }
    }

    Ok(())
}

/// Ask a yes/no question on stdin
fn confirm(question: &str) -> Result<bool, Box<dyn std::error::Error>> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    let confirmed = matches!(answer.trim().to_lowercase().as_str(), "y" | "yes");
    if !confirmed {
        info!("Cancelled");
    }
    Ok(confirmed)
}

async fn run_monitor(client: &IncubatorClient) -> Result<(), Box<dyn std::error::Error>> {
    let mut receiver = client.subscribe();

    info!("Connecting to {}...", client.config().url());
    client.start().await;

    info!("Monitoring incubator (press Ctrl+C to stop)...");

    loop {
        tokio::select! {
            event = receiver.recv() => {
                match event {
                    Ok(event) => print_event(&event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Missed {} events", skipped);
                    }
                    Err(e) => {
                        debug!("Event receiver error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                break;
            }
        }
    }

    client.stop().await;
    Ok(())
}

fn print_event(event: &ClientEvent) {
    match event {
        ClientEvent::Telemetry(frame) => {
            info!(
                "Telemetry: {:.1} °C, {:.0} % RH, setpoint {:.1} °C, heater {}, fan {}%",
                frame.temperature,
                frame.humidity,
                frame.setpoint,
                if frame.heater_status { "ON" } else { "OFF" },
                frame.fan_speed
            );
        }
        ClientEvent::FrameRejected { .. } | ClientEvent::ReconnectFailed { .. } => {
            warn!("{}", event);
        }
        _ => info!("{}", event),
    }
}

async fn run_status(client: &IncubatorClient) -> Result<(), Box<dyn std::error::Error>> {
    let mut receiver = client.subscribe();
    let timeout = client.config().connection_timeout();

    info!("Connecting to {}...", client.config().url());
    client.start().await;
    client.wait_connected(timeout).await?;

    let first_frame = tokio::time::timeout(timeout, async {
        loop {
            match receiver.recv().await {
                Ok(ClientEvent::Telemetry(_)) => return true,
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(_) => return false,
            }
        }
    })
    .await
    .unwrap_or(false);

    if !first_frame {
        warn!("No telemetry received within {:?}", timeout);
    }

    println!("{}", client.display().await);

    client.stop().await;
    Ok(())
}

/// Send a command that changes counter progress, asking first unless `yes`
async fn run_confirmed(
    client: &IncubatorClient,
    command: Command,
    yes: bool,
    question: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if command.needs_confirmation() && !yes && !confirm(question)? {
        return Ok(());
    }
    run_command(client, command).await
}

async fn run_command(
    client: &IncubatorClient,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Connecting to {}...", client.config().url());
    client.start().await;
    client.wait_connected(client.config().connection_timeout()).await?;

    client.send_command(command).await;

    client.stop().await;
    Ok(())
}
