pub mod backend;
pub mod capture;
pub mod playback;

pub use backend::{AudioFrame, CaptureBackend, MicrophoneBackend};
pub use capture::{AudioSegment, SegmentRecorder};
pub use playback::{NullSink, PlaybackSink, RodioSink};
