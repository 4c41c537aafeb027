use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Duration of each capture window. Also the bound on how long `stop()`
    /// may block waiting for the in-flight window.
    pub window: Duration,

    /// Sample rate for capture windows
    pub sample_rate: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("live-{}", uuid::Uuid::new_v4()),
            window: Duration::from_millis(500),
            sample_rate: 44100,
        }
    }
}
