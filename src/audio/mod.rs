pub mod device;
pub mod file;
pub mod input;

pub use device::{Microphone, MicrophoneInput};
pub use file::{FileInput, WavFile};
pub use input::{AudioInput, AudioSource, AudioWindow};
