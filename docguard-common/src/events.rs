//! Event types and the broadcast EventBus
//!
//! Events are emitted by the classification pipeline and batch processor and
//! forwarded to SSE clients. Emission is lossy: nobody listening is not an
//! error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// DocGuard event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DocGuardEvent {
    /// A document was stored and its content extracted
    DocumentUploaded {
        doc_id: Uuid,
        filename: String,
        page_count: usize,
        image_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A classification finished (single or batch)
    ClassificationCompleted {
        doc_id: Uuid,
        final_category: String,
        confidence: f64,
        requires_review: bool,
        dual_llm_agreement: Option<f64>,
        timestamp: DateTime<Utc>,
    },

    /// A document was placed on the human review queue
    ReviewQueued {
        doc_id: Uuid,
        priority: String,
        triggers: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A reviewer overrode a classification
    ReviewResolved {
        doc_id: Uuid,
        reviewer: String,
        new_label: String,
        timestamp: DateTime<Utc>,
    },

    /// Per-document progress inside a batch job
    JobProgress {
        job_id: Uuid,
        doc_id: Uuid,
        status: String,
        progress: f64,
        timestamp: DateTime<Utc>,
    },

    /// A batch job reached a terminal state
    JobFinished {
        job_id: Uuid,
        status: String,
        completed: usize,
        failed: usize,
        timestamp: DateTime<Utc>,
    },
}

impl DocGuardEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            DocGuardEvent::DocumentUploaded { .. } => "DocumentUploaded",
            DocGuardEvent::ClassificationCompleted { .. } => "ClassificationCompleted",
            DocGuardEvent::ReviewQueued { .. } => "ReviewQueued",
            DocGuardEvent::ReviewResolved { .. } => "ReviewResolved",
            DocGuardEvent::JobProgress { .. } => "JobProgress",
            DocGuardEvent::JobFinished { .. } => "JobFinished",
        }
    }
}

/// Broadcast bus for DocGuardEvent
///
/// Cloning is cheap; all clones share one channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DocGuardEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering `capacity` events per subscriber
    ///
    /// ```
    /// use docguard_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// let _rx = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<DocGuardEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: DocGuardEvent) {
        let _ = self.tx.send(event);
    }

    /// Connected SSE clients and other listeners
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
