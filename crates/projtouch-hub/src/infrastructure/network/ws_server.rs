//! WebSocket fan-out server.
//!
//! Accepts client connections, registers each as a subscriber, and keeps the
//! session open until the peer leaves. The hub never consumes client input:
//! inbound frames are drained and discarded so keep-alives work, but only the
//! write half carries traffic.
//!
//! The accept loop polls a shared `running` flag between short accept
//! timeouts, so clearing the flag stops the server within one poll interval.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures_util::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use super::registry::{SubscriberRegistry, WsMessageSink};

/// How long each accept attempt waits before re-checking the running flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Binds `bind_addr` and serves WebSocket subscribers until `running` is
/// cleared.
pub async fn run_server(
    bind_addr: &str,
    registry: Arc<SubscriberRegistry>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind websocket listener on {bind_addr}"))?;
    tracing::info!(%bind_addr, "websocket server listening");
    serve(listener, registry, running).await
}

/// Accept loop over an already-bound listener.
///
/// Split out from [`run_server`] so tests can bind port 0 and learn the
/// actual address before serving.
pub async fn serve(
    listener: TcpListener,
    registry: Arc<SubscriberRegistry>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    while running.load(Ordering::Relaxed) {
        match tokio::time::timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
            Ok(Ok((stream, peer))) => {
                let registry = Arc::clone(&registry);
                tokio::spawn(handle_session(stream, peer, registry));
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "failed to accept connection");
            }
            Err(_) => {
                // Timeout; loop around and re-check the running flag.
            }
        }
    }
    tracing::info!("websocket server stopped accepting connections");
    Ok(())
}

/// One subscriber session, from handshake to disconnect.
async fn handle_session(stream: TcpStream, peer: SocketAddr, registry: Arc<SubscriberRegistry>) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            tracing::warn!(%peer, error = %err, "websocket handshake failed");
            return;
        }
    };
    let (writer, mut reader) = ws.split();
    let subscriber_id = registry.connect(Arc::new(WsMessageSink::new(writer))).await;
    tracing::info!(%peer, %subscriber_id, "subscriber session open");

    while let Some(frame) = reader.next().await {
        match frame {
            Ok(Message::Close(_)) => break,
            // Inbound payloads carry no meaning for the hub; drop them.
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(%peer, error = %err, "websocket read error");
                break;
            }
        }
    }

    registry.disconnect(subscriber_id).await;
    tracing::info!(%peer, %subscriber_id, "subscriber session closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio_test::assert_ok;

    async fn bind_local() -> (TcpListener, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind failed");
        let addr = listener.local_addr().expect("no local addr");
        (listener, addr)
    }

    #[tokio::test]
    async fn test_serve_exits_when_running_flag_cleared() {
        // Arrange
        let (listener, _addr) = bind_local().await;
        let registry = Arc::new(SubscriberRegistry::new());
        let running = Arc::new(AtomicBool::new(true));
        let server = tokio::spawn(serve(listener, registry, Arc::clone(&running)));

        // Act
        tokio::time::sleep(Duration::from_millis(50)).await;
        running.store(false, Ordering::Relaxed);
        let result = tokio::time::timeout(Duration::from_secs(2), server).await;

        // Assert: the accept loop noticed the flag within its poll interval.
        let joined = result.expect("server did not stop in time");
        tokio_test::assert_ok!(joined.expect("server task panicked"));
    }

    #[tokio::test]
    async fn test_failed_handshake_registers_no_subscriber() {
        // Arrange
        let (listener, addr) = bind_local().await;
        let registry = Arc::new(SubscriberRegistry::new());
        let running = Arc::new(AtomicBool::new(true));
        let server = tokio::spawn(serve(listener, Arc::clone(&registry), Arc::clone(&running)));

        // Act: speak garbage instead of a websocket handshake.
        let mut raw = TcpStream::connect(addr).await.expect("connect failed");
        raw.write_all(b"definitely not http\r\n\r\n")
            .await
            .expect("write failed");
        drop(raw);
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Assert
        assert_eq!(registry.subscriber_count().await, 0);
        running.store(false, Ordering::Relaxed);
        let _ = tokio::time::timeout(Duration::from_secs(2), server).await;
    }

    #[tokio::test]
    async fn test_run_server_rejects_unbindable_address() {
        let registry = Arc::new(SubscriberRegistry::new());
        let running = Arc::new(AtomicBool::new(true));

        let result = run_server("256.256.256.256:99999", registry, running).await;

        assert!(result.is_err());
    }
}
