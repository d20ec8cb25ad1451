//! World struct for incubator client BDD tests

use std::sync::Arc;
use std::time::Duration;

use cucumber::World;
use incubator_client::{ConnectionStatus, DeviceConfig, IncubatorClient, ReconnectConfig};

#[path = "mock_connection.rs"]
pub mod mock_connection;

use mock_connection::{DeviceEnd, ScriptedFactory};

/// Reconnect delay used by every scenario
pub const RECONNECT_DELAY_MS: u64 = 100;

#[derive(Debug, Default, World)]
pub struct IncubatorWorld {
    pub factory: Arc<ScriptedFactory>,
    pub client: Option<IncubatorClient>,
    pub devices: Vec<DeviceEnd>,
    pub status_history: Vec<ConnectionStatus>,
}

impl IncubatorWorld {
    /// Build a client that will be served the given number of connections
    pub fn build_client(&mut self, connections: usize) {
        self.devices = (0..connections)
            .map(|_| self.factory.add_connection())
            .collect();
        let config = DeviceConfig {
            host: "127.0.0.1".to_string(),
            reconnect: ReconnectConfig {
                delay_ms: RECONNECT_DELAY_MS,
                // Bounded so clients left behind by a finished scenario stop retrying
                max_retries: Some(5),
                ..Default::default()
            },
            ..Default::default()
        };
        self.client = Some(IncubatorClient::with_connection_factory(
            config,
            self.factory.clone(),
        ));
    }

    pub fn client(&self) -> &IncubatorClient {
        self.client.as_ref().expect("client not created")
    }

    /// Device end of the connection currently in use
    pub fn current_device(&self) -> &DeviceEnd {
        let index = (self.factory.attempts() as usize).saturating_sub(1);
        &self.devices[index]
    }

    pub async fn wait_for_status(&mut self, status: ConnectionStatus) {
        let client = self.client.as_ref().expect("client not created");
        tokio::time::timeout(Duration::from_secs(2), async {
            while client.status().await != status {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("status never became {}", status));
        self.status_history.push(status);
    }

    pub async fn wait_for_frames(&self, frames: u64) {
        let client = self.client();
        tokio::time::timeout(Duration::from_secs(2), async {
            while client.display().await.frames < frames {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("telemetry never applied");
    }
}
