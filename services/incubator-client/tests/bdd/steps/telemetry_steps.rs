//! Step definitions for telemetry.feature

use crate::world::IncubatorWorld;
use cucumber::{then, when};

#[when(expr = "the device reports {float} °C, {float} % humidity and fan {int} %")]
async fn device_reports(world: &mut IncubatorWorld, temperature: f64, humidity: f64, fan: u32) {
    let frames = world.client().display().await.frames;
    let frame = format!(
        r#"{{"temperature":{},"humidity":{},"setpoint":37.5,"counterDays":0,"counterHours":0,"counterMins":0,"counterSecs":0,"heaterStatus":true,"fanSpeed":{}}}"#,
        temperature, humidity, fan
    );
    let _ = world.current_device().tx.send(Some(frame));
    world.wait_for_frames(frames + 1).await;
}

#[when(expr = "the device sends the text {string}")]
async fn device_sends_text(world: &mut IncubatorWorld, text: String) {
    let _ = world.current_device().tx.send(Some(text));
    // Give the reader a chance to process it
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
}

#[then(expr = "the temperature should show {string}")]
async fn temperature_shows(world: &mut IncubatorWorld, expected: String) {
    assert_eq!(world.client().display().await.temperature, expected);
}

#[then(expr = "the humidity should show {string}")]
async fn humidity_shows(world: &mut IncubatorWorld, expected: String) {
    assert_eq!(world.client().display().await.humidity, expected);
}

#[then(expr = "the fan should show {string}")]
async fn fan_shows(world: &mut IncubatorWorld, expected: String) {
    assert_eq!(world.client().display().await.fan, expected);
}

#[then("the client should still be connected")]
async fn still_connected(world: &mut IncubatorWorld) {
    assert!(world.client().is_connected().await);
}
