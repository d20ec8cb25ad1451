//! Scripted connections for BDD tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use incubator_client::io::{ConnectionFactory, ConnectionPair, FrameReader, FrameWriter};
use incubator_client::{IncubatorError, Result};
use tokio::sync::mpsc;

pub struct ChannelReader {
    rx: mpsc::UnboundedReceiver<Option<String>>,
}

#[async_trait]
impl FrameReader for ChannelReader {
    async fn read_text(&mut self) -> Result<Option<String>> {
        Ok(self.rx.recv().await.flatten())
    }
}

pub struct RecordingWriter {
    sent: Arc<StdMutex<Vec<String>>>,
}

#[async_trait]
impl FrameWriter for RecordingWriter {
    async fn write_text(&mut self, message: &str) -> Result<()> {
        self.sent.lock().unwrap().push(message.to_string());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Device side of a scripted connection
///
/// Sending `None` closes the connection from the device end.
#[derive(Debug, Clone)]
pub struct DeviceEnd {
    pub tx: mpsc::UnboundedSender<Option<String>>,
    pub sent: Arc<StdMutex<Vec<String>>>,
}

#[derive(Debug, Default)]
pub struct ScriptedFactory {
    pending: StdMutex<VecDeque<(mpsc::UnboundedReceiver<Option<String>>, Arc<StdMutex<Vec<String>>>)>>,
    attempts: StdMutex<u32>,
}

impl ScriptedFactory {
    pub fn add_connection(&self) -> DeviceEnd {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(StdMutex::new(Vec::new()));
        self.pending.lock().unwrap().push_back((rx, sent.clone()));
        DeviceEnd { tx, sent }
    }

    pub fn attempts(&self) -> u32 {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl ConnectionFactory for ScriptedFactory {
    async fn connect(&self, _url: &str, _timeout: Duration) -> Result<ConnectionPair> {
        *self.attempts.lock().unwrap() += 1;
        match self.pending.lock().unwrap().pop_front() {
            Some((rx, sent)) => Ok(ConnectionPair {
                reader: Box::new(ChannelReader { rx }),
                writer: Box::new(RecordingWriter { sent }),
            }),
            None => Err(IncubatorError::ConnectionFailed(
                "device unreachable".to_string(),
            )),
        }
    }
}
