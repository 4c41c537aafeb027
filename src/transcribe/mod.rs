pub mod engine;
pub mod service;

pub use engine::{CommandEngine, DisabledEngine, RecognizeError, TranscriptionEngine};
pub use service::{ListenerConfig, ListenerHandle, TranscriptionService};
