//! Event normalization.
//!
//! A single task owns the inbound sensor queue and converts each event into
//! exactly one outbound message, in arrival order. Detection batches pick up
//! display-space centers when a calibration is active; events nobody
//! recognizes become `unknown` rather than disappearing, so queue cardinality
//! is observable end to end.

use std::sync::Arc;

use projtouch_core::{
    DetectionBatch, FrameSize, Homography, MappedObject, OutboundMessage, SensorEvent, TapEvent,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::application::calibrate::SharedTransform;
use crate::infrastructure::network::registry::SubscriberRegistry;

/// Converts one sensor event into its outbound message.
///
/// Pure: the transform snapshot passed in is the one used for the whole
/// event, even if the live calibration changes mid-batch.
pub fn normalize_event(event: SensorEvent, transform: Option<&Homography>) -> OutboundMessage {
    match event {
        SensorEvent::Tap(tap) => normalize_tap(tap),
        SensorEvent::Detections(batch) => normalize_detections(batch, transform),
        SensorEvent::Raw(value) => {
            tracing::debug!(payload = %value, "unrecognized sensor event");
            OutboundMessage::Unknown
        }
    }
}

/// Taps are already display-normalized by their producer; they pass through
/// untouched whether or not a calibration is active.
fn normalize_tap(tap: TapEvent) -> OutboundMessage {
    OutboundMessage::Tap {
        x: tap.x,
        y: tap.y,
        source: tap.source,
    }
}

fn normalize_detections(batch: DetectionBatch, transform: Option<&Homography>) -> OutboundMessage {
    let objects_mapped = transform.map(|homography| {
        batch
            .objects
            .iter()
            .map(|object| {
                let (px, py) = object.center_px(batch.frame_width, batch.frame_height);
                let (cx, cy) = homography.apply(px, py);
                MappedObject {
                    label: object.label.clone(),
                    confidence: object.confidence,
                    cx,
                    cy,
                }
            })
            .collect()
    });
    OutboundMessage::Detections {
        source: batch.source,
        frame_size: FrameSize {
            w: batch.frame_width,
            h: batch.frame_height,
        },
        objects: batch.objects,
        objects_mapped,
        projector_mapped: transform.is_some().then_some(true),
    }
}

/// Spawns the sole consumer of the sensor event queue.
///
/// Runs until every sender is dropped or the task is aborted. Each event is
/// normalized against the transform as it stands at that moment, then handed
/// to the registry for fan-out before the next event is taken.
pub fn spawn_normalizer(
    mut events: mpsc::UnboundedReceiver<SensorEvent>,
    transform: SharedTransform,
    registry: Arc<SubscriberRegistry>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("event normalizer started");
        while let Some(event) = events.recv().await {
            let snapshot = *transform.read().await;
            let message = normalize_event(event, snapshot.as_ref());
            registry.broadcast(&message).await;
        }
        tracing::info!("event normalizer stopped");
    })
}
