//! Batch progress events and the in-process bus that distributes them.
//!
//! The bus decouples fetch pipelines from whatever forwards progress to
//! observers (an SSE layer, a CLI spinner, a log sink). Publishing never
//! blocks: a subscriber that falls further behind than the bus capacity
//! loses its oldest buffered events and is marked as having missed some,
//! while well-behaved subscribers see everything.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::entities::{FetchStage, SourceId};

/// Identifier of one orchestrator batch. Every event on a bus carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One progress event.
///
/// Events for a given job are published in pipeline order; there is no
/// ordering guarantee across jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub batch_id: BatchId,
    #[serde(flatten)]
    pub payload: ProgressPayload,
}

/// Event payload, tagged for the transport collaborator's
/// `{event_name, structured_payload}` record shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressPayload {
    /// The batch started; `total` identifiers will be processed.
    FetchStarted { total: usize },
    /// One pipeline stage finished for one job. `position` is the 1-based
    /// stage index out of `total` stages.
    JobProgress {
        id: SourceId,
        stage: FetchStage,
        position: usize,
        total: usize,
    },
    /// A job reached a terminal state.
    JobComplete { id: SourceId, success: bool },
    /// A job failed; `message` describes the terminal cause.
    Error { id: SourceId, message: String },
    /// The batch finished.
    FetchComplete { succeeded: usize, failed: usize },
}

impl ProgressPayload {
    /// Stable event name for textual event records.
    pub fn event_name(&self) -> &'static str {
        match self {
            ProgressPayload::FetchStarted { .. } => "fetch_started",
            ProgressPayload::JobProgress { .. } => "job_progress",
            ProgressPayload::JobComplete { .. } => "job_complete",
            ProgressPayload::Error { .. } => "error",
            ProgressPayload::FetchComplete { .. } => "fetch_complete",
        }
    }
}

/// Publish side of the bus. Scoped to one batch.
#[derive(Debug, Clone)]
pub struct ProgressBus {
    batch_id: BatchId,
    tx: broadcast::Sender<ProgressEvent>,
}

impl ProgressBus {
    /// `capacity` bounds how many events a subscriber may fall behind
    /// before its oldest events are dropped.
    pub fn new(batch_id: BatchId, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { batch_id, tx }
    }

    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    /// Publish an event. Never blocks; with no live subscribers the event
    /// is discarded.
    pub fn publish(&self, payload: ProgressPayload) {
        let event = ProgressEvent {
            batch_id: self.batch_id,
            payload,
        };
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> ProgressSubscriber {
        ProgressSubscriber {
            rx: self.tx.subscribe(),
            missed_events: false,
        }
    }
}

/// Receive side of the bus. Yields every event published after
/// subscription, except those dropped because this subscriber lagged.
pub struct ProgressSubscriber {
    rx: broadcast::Receiver<ProgressEvent>,
    missed_events: bool,
}

impl ProgressSubscriber {
    /// Next event, or `None` once the bus is dropped and the buffer is
    /// drained.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "progress subscriber lagged, dropped oldest events");
                    self.missed_events = true;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant for polling consumers. `None` means no event
    /// is currently buffered (or the bus is closed and drained).
    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "progress subscriber lagged, dropped oldest events");
                    self.missed_events = true;
                }
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => return None,
            }
        }
    }

    /// Whether this subscriber has lost events to overflow.
    pub fn missed_events(&self) -> bool {
        self.missed_events
    }
}
