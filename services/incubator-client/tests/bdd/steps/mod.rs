mod command_steps;
mod connection_steps;
mod telemetry_steps;
