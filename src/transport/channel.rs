//! WebSocket channel to the document server.
//!
//! [`connect`] performs the handshake and splits the stream into two
//! independently owned halves:
//!
//! | Half | Trait | Used by |
//! |------|-------|---------|
//! | [`WsSink`] | [`MessageSink`] | Producer loop (requests out) |
//! | [`WsSource`] | [`MessageSource`] | Consumer loop (replies in) |
//!
//! The traits are the engine's only view of the transport, so tests
//! drive the loops over in-memory channels instead of sockets. One
//! unit of the protocol is one text frame; everything else on the wire
//! (binary, ping, pong) is transport noise and skipped.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// The concrete stream produced by the client handshake.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// Channel Traits
// ============================================================================

/// Outbound half of a message channel.
#[async_trait]
pub trait MessageSink: Send {
    /// Sends one unit of text.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelClosed`] if the channel was already closed
    /// - [`Error::WebSocket`] on transport failure
    async fn send(&mut self, text: String) -> Result<()>;

    /// Closes the channel. Idempotent.
    async fn close(&mut self) -> Result<()>;
}

/// Inbound half of a message channel.
#[async_trait]
pub trait MessageSource: Send {
    /// Receives the next unit of text.
    ///
    /// Returns `Ok(None)` once the channel has ended; callers treat
    /// that as end-of-stream, not as an error.
    ///
    /// # Errors
    ///
    /// - [`Error::WebSocket`] on transport failure
    async fn receive(&mut self) -> Result<Option<String>>;
}

// ============================================================================
// Connect
// ============================================================================

/// Connects to the document server and splits the channel.
///
/// # Errors
///
/// - [`Error::Connect`] if the server is unreachable or the handshake
///   fails
pub async fn connect(url: &Url) -> Result<(WsSink, WsSource)> {
    debug!(%url, "Connecting to document server");

    let (stream, _response) = connect_async(url.as_str())
        .await
        .map_err(|error| Error::connect(error.to_string()))?;

    let (writer, reader) = stream.split();

    debug!(%url, "Channel established");

    Ok((
        WsSink {
            writer,
            closed: false,
        },
        WsSource { reader },
    ))
}

// ============================================================================
// WsSink
// ============================================================================

/// Outbound WebSocket half.
#[derive(Debug)]
pub struct WsSink {
    writer: SplitSink<WsStream, Message>,
    closed: bool,
}

#[async_trait]
impl MessageSink for WsSink {
    async fn send(&mut self, text: String) -> Result<()> {
        if self.closed {
            return Err(Error::ChannelClosed);
        }

        self.writer.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // A failed close handshake is not worth failing a finished
        // traversal over; the remote end may already be gone.
        if let Err(error) = self.writer.close().await {
            debug!(%error, "Close handshake did not complete cleanly");
        }

        Ok(())
    }
}

// ============================================================================
// WsSource
// ============================================================================

/// Inbound WebSocket half.
#[derive(Debug)]
pub struct WsSource {
    reader: SplitStream<WsStream>,
}

#[async_trait]
impl MessageSource for WsSource {
    async fn receive(&mut self) -> Result<Option<String>> {
        while let Some(message) = self.reader.next().await {
            match message? {
                Message::Text(text) => return Ok(Some(text.to_string())),

                Message::Close(_) => {
                    debug!("Channel closed by remote");
                    return Ok(None);
                }

                // Binary, Ping, Pong, raw frames
                other => trace!(kind = ?other, "Skipping non-text unit"),
            }
        }

        Ok(None)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    use super::*;

    /// Binds an ephemeral echo server and returns its ws:// URL.
    ///
    /// The server keeps reading after a close frame so the close
    /// handshake can complete.
    async fn spawn_echo_server() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("handshake");

            while let Some(message) = ws.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if ws.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
        });

        Url::parse(&format!("ws://{addr}")).expect("server url")
    }

    #[tokio::test]
    async fn test_connect_and_round_trip() {
        let url = spawn_echo_server().await;
        let (mut sink, mut source) = connect(&url).await.expect("connect");

        sink.send(r#"{"probe": 1}"#.to_string()).await.expect("send");

        let echoed = source.receive().await.expect("receive");
        assert_eq!(echoed.as_deref(), Some(r#"{"probe": 1}"#));

        sink.close().await.expect("close");
    }

    #[tokio::test]
    async fn test_receive_returns_none_after_close() {
        let url = spawn_echo_server().await;
        let (mut sink, mut source) = connect(&url).await.expect("connect");

        sink.close().await.expect("close");

        // The remote answers the close handshake; the stream then ends.
        assert_eq!(source.receive().await.expect("receive"), None);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let url = spawn_echo_server().await;
        let (mut sink, _source) = connect(&url).await.expect("connect");

        sink.close().await.expect("first close");
        sink.close().await.expect("second close");
    }

    #[tokio::test]
    async fn test_close_succeeds_after_peer_is_gone() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        // Accept the handshake, then drop the socket without a close
        // handshake of its own.
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let ws = accept_async(stream).await.expect("handshake");
            drop(ws);
        });

        let url = Url::parse(&format!("ws://{addr}")).expect("server url");
        let (mut sink, _source) = connect(&url).await.expect("connect");
        server.await.expect("server task");

        // Whatever the transport does with the close frame now, the
        // sink reports success: a finished traversal keeps its results.
        sink.close().await.expect("close never fails");
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let url = spawn_echo_server().await;
        let (mut sink, _source) = connect(&url).await.expect("connect");

        sink.close().await.expect("close");

        let error = sink
            .send("too late".to_string())
            .await
            .expect_err("send after close");
        assert!(matches!(error, Error::ChannelClosed));
    }

    #[tokio::test]
    async fn test_receive_skips_binary_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("handshake");

            ws.send(Message::Binary(vec![1, 2, 3].into()))
                .await
                .expect("send binary");
            ws.send(Message::Text("after binary".into()))
                .await
                .expect("send text");

            // Serve the close handshake before dropping the socket.
            while let Some(message) = ws.next().await {
                if message.is_err() {
                    break;
                }
            }
        });

        let url = Url::parse(&format!("ws://{addr}")).expect("server url");
        let (mut sink, mut source) = connect(&url).await.expect("connect");

        let received = source.receive().await.expect("receive");
        assert_eq!(received.as_deref(), Some("after binary"));

        sink.close().await.expect("close");
    }

    #[tokio::test]
    async fn test_connect_to_unreachable_server_fails() {
        // Bind and immediately drop to find a port with no listener.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let url = Url::parse(&format!("ws://{addr}")).expect("url");
        let error = connect(&url).await.expect_err("nothing listening");

        assert!(matches!(error, Error::Connect { .. }));
        assert!(error.is_connection_error());
    }
}
