//! Step definitions for commands.feature

use crate::world::IncubatorWorld;
use cucumber::{then, when};

#[when(expr = "the user sets the setpoint to {string}")]
async fn user_sets_setpoint(world: &mut IncubatorWorld, input: String) {
    world.client().set_setpoint_from_input(&input).await;
}

#[when(expr = "the user sets the fan to {float} %")]
async fn user_sets_fan(world: &mut IncubatorWorld, percent: f64) {
    world.client().set_fan_percent(percent).await;
}

#[when("the user toggles the heater")]
async fn user_toggles_heater(world: &mut IncubatorWorld) {
    world.client().toggle_heater().await;
}

#[then(expr = "the device should have received exactly {int} frame(s)")]
fn device_received_count(world: &mut IncubatorWorld, count: usize) {
    let total: usize = world
        .devices
        .iter()
        .map(|device| device.sent.lock().unwrap().len())
        .sum();
    assert_eq!(total, count);
}

#[then(expr = "the last frame should be {string}")]
fn last_frame(world: &mut IncubatorWorld, expected: String) {
    let sent = world.current_device().sent.lock().unwrap().clone();
    assert_eq!(sent.last(), Some(&expected));
}
