use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Changes a gallery UI re-renders on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GalleryEvent {
    /// The projection replaced its working set with a fresh store listing
    ProjectionReloaded { count: usize },
    /// A captured image is waiting for confirmation
    ImageCaptured { uri: String },
    /// The pending image was committed as a record
    ImageCommitted { id: i64 },
    /// The pending image was dropped without being saved
    ImageDiscarded,
}

impl GalleryEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            GalleryEvent::ProjectionReloaded { count } => {
                format!("Projection reloaded with {} records", count)
            }
            GalleryEvent::ImageCaptured { uri } => format!("Image captured: {}", uri),
            GalleryEvent::ImageCommitted { id } => format!("Image committed as record {}", id),
            GalleryEvent::ImageDiscarded => "Pending image discarded".to_string(),
        }
    }
}

/// Broadcast bus for gallery events
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GalleryEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GalleryEvent> {
        self.sender.subscribe()
    }

    /// Publish to all subscribers. Having no subscribers is not an error;
    /// returns how many received the event.
    pub fn publish(&self, event: GalleryEvent) -> usize {
        debug!("Publishing event: {}", event.description());

        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!("No subscribers for gallery event");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
