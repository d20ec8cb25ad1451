//! I/O traits and WebSocket implementations for the incubator client
//!
//! The connection logic only talks to these traits, so tests can drive it
//! with scripted readers and recording writers instead of a real socket.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::{IncubatorError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection pair containing a reader and writer
pub struct ConnectionPair {
    /// Reader for receiving telemetry text frames
    pub reader: Box<dyn FrameReader>,
    /// Writer for sending command text frames
    pub writer: Box<dyn FrameWriter>,
}

// ============================================================================
// FrameReader trait and implementations
// ============================================================================

/// Trait for reading text messages from a connection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait FrameReader: Send {
    /// Read the next text message
    ///
    /// Returns `Ok(Some(text))` for a text message, `Ok(None)` once the
    /// connection is closed, or an error if the transport failed.
    async fn read_text(&mut self) -> Result<Option<String>>;
}

/// WebSocket implementation of FrameReader
pub struct WsFrameReader {
    stream: SplitStream<WsStream>,
}

impl WsFrameReader {
    pub fn new(stream: SplitStream<WsStream>) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl FrameReader for WsFrameReader {
    async fn read_text(&mut self) -> Result<Option<String>> {
        loop {
            match self.stream.next().await {
                None => return Ok(None),
                Some(Err(e)) => return Err(IncubatorError::WebSocket(e)),
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_string())),
                Some(Ok(Message::Close(frame))) => {
                    debug!("Close frame received: {:?}", frame);
                    return Ok(None);
                }
                // Ping/pong are answered by tungstenite, binary is not part of the protocol
                Some(Ok(other)) => {
                    debug!("Ignoring non-text message: {:?}", other);
                }
            }
        }
    }
}

// ============================================================================
// FrameWriter trait and implementations
// ============================================================================

/// Trait for writing text messages to a connection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait FrameWriter: Send {
    /// Write a text message and flush it
    async fn write_text(&mut self, message: &str) -> Result<()>;

    /// Close the connection
    async fn close(&mut self) -> Result<()>;
}

/// WebSocket implementation of FrameWriter
pub struct WsFrameWriter {
    sink: SplitSink<WsStream, Message>,
}

impl WsFrameWriter {
    pub fn new(sink: SplitSink<WsStream, Message>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl FrameWriter for WsFrameWriter {
    async fn write_text(&mut self, message: &str) -> Result<()> {
        self.sink
            .send(Message::Text(message.to_string().into()))
            .await
            .map_err(|e| IncubatorError::SendError(e.to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        self.sink.close().await.map_err(IncubatorError::WebSocket)
    }
}

// ============================================================================
// ConnectionFactory trait and implementations
// ============================================================================

/// Trait for opening connections to the controller
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait ConnectionFactory: Send + Sync {
    /// Open a new connection to `url`, giving up after `timeout`
    async fn connect(&self, url: &str, timeout: Duration) -> Result<ConnectionPair>;
}

/// WebSocket implementation of ConnectionFactory
#[derive(Default, Clone)]
pub struct WsConnectionFactory;

impl WsConnectionFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ConnectionFactory for WsConnectionFactory {
    async fn connect(&self, url: &str, timeout: Duration) -> Result<ConnectionPair> {
        debug!("Connecting to {} with timeout {:?}", url, timeout);

        let (stream, response) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| IncubatorError::Timeout(format!("Connection to {} timed out", url)))?
            .map_err(|e| {
                IncubatorError::ConnectionFailed(format!("Failed to connect to {}: {}", url, e))
            })?;

        debug!(
            "WebSocket handshake with {} completed ({})",
            url,
            response.status()
        );

        let (sink, stream) = stream.split();

        Ok(ConnectionPair {
            reader: Box::new(WsFrameReader::new(stream)),
            writer: Box::new(WsFrameWriter::new(sink)),
        })
    }
}
