pub mod audio;
pub mod config;
pub mod events;
pub mod features;
pub mod model;
pub mod session;
pub mod transcribe;

pub use audio::{
    AudioInput, AudioSource, AudioWindow, FileInput, Microphone, MicrophoneInput, WavFile,
};
pub use config::Config;
pub use events::{event_channel, EventReceiver, EventSender, SessionEvent};
pub use features::extract_mfccs;
pub use model::{
    ClassifierAdapter, DatasetFile, DatasetProvider, DatasetRow, EstimatorKind,
    JsonDatasetProvider, MemoryDatasetProvider, ModelConfiguration, ModelManager, ModelStrategy,
    TabularDataset, DISFLUENCY_LABELS,
};
pub use session::{RecordingSession, SessionConfig, SessionStats};
pub use transcribe::{
    CommandEngine, DisabledEngine, ListenerConfig, ListenerHandle, RecognizeError,
    TranscriptionEngine, TranscriptionService,
};
