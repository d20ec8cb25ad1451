//! Step definitions for connection_lifecycle.feature

use std::time::Duration;

use crate::world::{IncubatorWorld, RECONNECT_DELAY_MS};
use cucumber::{given, then, when};
use incubator_client::ConnectionStatus;

fn parse_status(status: &str) -> ConnectionStatus {
    match status {
        "connected" => ConnectionStatus::Connected,
        "disconnected" => ConnectionStatus::Disconnected,
        other => panic!("unknown status {}", other),
    }
}

// ============================================================================
// Given steps
// ============================================================================

#[given(expr = "an incubator client with {int} available connection(s)")]
fn client_with_connections(world: &mut IncubatorWorld, connections: usize) {
    world.build_client(connections);
}

#[given("a connected incubator client")]
async fn connected_client(world: &mut IncubatorWorld) {
    world.build_client(1);
    world.client().start().await;
    world.wait_for_status(ConnectionStatus::Connected).await;
}

// ============================================================================
// When steps
// ============================================================================

#[when("the client starts")]
async fn client_starts(world: &mut IncubatorWorld) {
    world.client().start().await;
}

#[when("the client stops")]
async fn client_stops(world: &mut IncubatorWorld) {
    world.client().stop().await;
}

#[when("the device closes the connection")]
fn device_closes(world: &mut IncubatorWorld) {
    let _ = world.current_device().tx.send(None);
}

#[when("the reconnect delay passes")]
async fn reconnect_delay_passes(_world: &mut IncubatorWorld) {
    tokio::time::sleep(Duration::from_millis(RECONNECT_DELAY_MS * 3)).await;
}

// ============================================================================
// Then steps
// ============================================================================

#[then(expr = "the status indicator should show {string}")]
async fn status_shows(world: &mut IncubatorWorld, status: String) {
    world.wait_for_status(parse_status(&status)).await;
}

#[then(expr = "the status history should be {string}")]
fn status_history(world: &mut IncubatorWorld, history: String) {
    let expected: Vec<ConnectionStatus> = history
        .split(',')
        .map(|s| parse_status(s.trim()))
        .collect();
    assert_eq!(world.status_history, expected);
}

#[then(expr = "exactly {int} connection attempt(s) should have been made")]
fn connection_attempts(world: &mut IncubatorWorld, attempts: u32) {
    assert_eq!(world.factory.attempts(), attempts);
}
