//! Integration tests for the WebSocket fan-out, using real client
//! connections.
//!
//! # Purpose
//!
//! The event-flow tests stub the subscriber side; these tests do not. A real
//! listener is bound on port 0, real `tokio-tungstenite` clients connect, and
//! assertions run against the JSON text frames that cross the wire. They
//! verify:
//!
//! - Every connected client receives every broadcast as a JSON text frame
//!   with the documented shape.
//! - A client that closes its connection is unregistered and stops counting
//!   as a subscriber.
//! - The whole hub, sensing worker to wire, produces mapped detection frames
//!   a display client can consume directly.
//!
//! ```text
//! registry.broadcast ─> WsMessageSink ─> tcp ─> client.next()
//!                                               └─ serde_json::from_str
//! ```

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use projtouch_core::OutboundMessage;
use projtouch_hub::application::calibrate::CalibrationService;
use projtouch_hub::application::manage_sensing::SensingController;
use projtouch_hub::domain::config::HubConfig;
use projtouch_hub::infrastructure::network::registry::SubscriberRegistry;
use projtouch_hub::infrastructure::network::ws_server::serve;
use projtouch_hub::infrastructure::sensing::mock::SyntheticBackend;
use projtouch_hub::infrastructure::storage::calibration::CalibrationStore;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ── Helpers ───────────────────────────────────────────────────────────────────

async fn start_server() -> (
    SocketAddr,
    Arc<SubscriberRegistry>,
    Arc<AtomicBool>,
    JoinHandle<anyhow::Result<()>>,
) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().expect("no local addr");
    let registry = Arc::new(SubscriberRegistry::new());
    let running = Arc::new(AtomicBool::new(true));
    let server = tokio::spawn(serve(listener, Arc::clone(&registry), Arc::clone(&running)));
    (addr, registry, running, server)
}

async fn connect_client(addr: SocketAddr) -> Client {
    let (client, _response) = connect_async(format!("ws://{addr}"))
        .await
        .expect("client connect failed");
    client
}

/// Reads frames until the next text frame, then parses it as JSON.
async fn next_json(client: &mut Client) -> serde_json::Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).expect("frame is not json");
        }
    }
}

async fn wait_for_subscribers(registry: &SubscriberRegistry, count: usize) {
    let start = Instant::now();
    while registry.subscriber_count().await != count {
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "subscriber count never reached {count}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn make_tap() -> OutboundMessage {
    OutboundMessage::Tap {
        x: 0.2,
        y: 0.5,
        source: "test".to_string(),
    }
}

// ── Broadcast shape on the wire ───────────────────────────────────────────────

/// Two connected clients each receive every broadcast as JSON text with the
/// documented keys, nothing more.
#[tokio::test]
async fn test_connected_clients_receive_broadcasts_as_json() {
    // Arrange
    let (addr, registry, running, server) = start_server().await;
    let mut first = connect_client(addr).await;
    let mut second = connect_client(addr).await;
    wait_for_subscribers(&registry, 2).await;

    // Act
    registry.broadcast(&make_tap()).await;
    registry.broadcast(&OutboundMessage::Unknown).await;

    // Assert: both clients, both messages, in order.
    for client in [&mut first, &mut second] {
        let tap = next_json(client).await;
        assert_eq!(tap["type"], "tap");
        assert_eq!(tap["x"], 0.2);
        assert_eq!(tap["y"], 0.5);
        assert_eq!(tap["source"], "test");
        assert_eq!(tap.as_object().expect("not an object").len(), 4);

        let unknown = next_json(client).await;
        assert_eq!(unknown["type"], "unknown");
        assert_eq!(unknown.as_object().expect("not an object").len(), 1);
    }

    running.store(false, Ordering::Relaxed);
    let _ = tokio::time::timeout(Duration::from_secs(2), server).await;
}

/// Closing a client unregisters it; the survivor keeps receiving.
#[tokio::test]
async fn test_closed_client_is_unregistered() {
    // Arrange
    let (addr, registry, running, server) = start_server().await;
    let mut leaver = connect_client(addr).await;
    let mut stayer = connect_client(addr).await;
    wait_for_subscribers(&registry, 2).await;

    // Act
    leaver.close(None).await.expect("close failed");
    wait_for_subscribers(&registry, 1).await;
    registry.broadcast(&make_tap()).await;

    // Assert
    let received = next_json(&mut stayer).await;
    assert_eq!(received["type"], "tap");

    running.store(false, Ordering::Relaxed);
    let _ = tokio::time::timeout(Duration::from_secs(2), server).await;
}

// ── Full hub to wire ──────────────────────────────────────────────────────────

/// The whole pipeline against a real socket: synthetic camera, live
/// calibration, and a client that receives display-ready detection frames.
#[tokio::test]
async fn test_calibrated_detections_arrive_over_the_wire() {
    // Arrange: calibrate against the rectangular camera quad.
    let calibration_path = std::env::temp_dir().join(format!(
        "projtouch_ws_integration_{}.json",
        Uuid::new_v4()
    ));
    let calibration = CalibrationService::new(CalibrationStore::new(&calibration_path));
    calibration
        .set_points(&[
            (100.0, 100.0),
            (500.0, 100.0),
            (500.0, 400.0),
            (100.0, 400.0),
        ])
        .await
        .expect("calibration failed");

    let (addr, registry, running, server) = start_server().await;
    let mut controller = SensingController::new(calibration.transform(), Arc::clone(&registry));
    let mut client = connect_client(addr).await;
    wait_for_subscribers(&registry, 1).await;

    let mut config = HubConfig::default();
    config.detection.target_fps = 50.0;
    controller.start_all(&config, Arc::new(SyntheticBackend::default()));

    // Act: first detections frame off the wire.
    let frame = loop {
        let value = next_json(&mut client).await;
        if value["type"] == "detections" {
            break value;
        }
    };

    // Assert: raw boxes plus display-space centers for the synthetic box.
    assert_eq!(frame["source"], "synthetic");
    assert_eq!(frame["frame_size"]["w"], 640);
    assert_eq!(frame["frame_size"]["h"], 480);
    assert_eq!(frame["projector_mapped"], true);
    let objects = frame["objects"].as_array().expect("objects missing");
    assert_eq!(objects.len(), 1);
    let mapped = frame["objects_mapped"].as_array().expect("mapped missing");
    assert_eq!(mapped.len(), 1);
    let cx = mapped[0]["cx"].as_f64().expect("cx not a number");
    let cy = mapped[0]["cy"].as_f64().expect("cy not a number");
    assert!((cx - 0.55).abs() < 1e-9);
    assert!((cy - 7.0 / 15.0).abs() < 1e-9);

    controller.shutdown();
    running.store(false, Ordering::Relaxed);
    let _ = tokio::time::timeout(Duration::from_secs(2), server).await;
    std::fs::remove_file(&calibration_path).ok();
}
