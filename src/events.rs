//! Typed event surface from the recording pipeline to the consumer
//!
//! The pipeline is one-directional: the session, capture loop, model manager
//! and transcription listener all push `SessionEvent`s into an unbounded
//! channel, and a single consumer (UI or logger) drains them. Each event is
//! delivered at most once. Prediction events arrive in window order;
//! transcription events are an independent stream with no ordering
//! relationship to predictions.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// A notification emitted by the recording pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Classification result for one completed audio window.
    Prediction { label: String },

    /// Decoded speech for one utterance. The consumer appends the text to its
    /// running transcript; an empty string signals a transcript reset.
    Transcription { text: String },

    /// Test score of a newly activated model, in [0, 1].
    Score { value: f32 },
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Create the event channel connecting a session to its consumer.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Send an event, ignoring a disconnected consumer.
///
/// The pipeline never stops because the consumer went away; a closed channel
/// just means nobody is watching anymore.
pub(crate) fn emit(sender: &EventSender, event: SessionEvent) {
    let _ = sender.send(event);
}
