// Voice capture for the Askbar chat client.

pub mod audio;
pub mod clip;
pub mod recorder;

pub use audio::{AudioConfig, AudioError, CaptureDevice, CpalDevice};
pub use clip::AudioClip;
pub use recorder::{RecorderState, VoiceRecorder};
