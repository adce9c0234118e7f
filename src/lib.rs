pub mod audio;
pub mod config;
pub mod control;
pub mod dialogue;
pub mod error;
pub mod http;
pub mod report;
pub mod session;
pub mod store;
pub mod stt;
pub mod tts;

pub use audio::{
    AudioFrame, AudioSegment, CaptureBackend, MicrophoneBackend, NullSink, PlaybackSink,
    RodioSink, SegmentRecorder,
};
pub use config::Config;
pub use control::OperatorControl;
pub use dialogue::{interviewer_prompt, DialogueEngine, DialogueService, HttpDialogueService};
pub use error::{SessionError, SessionResult};
pub use http::{create_router, AppState};
pub use session::{
    ConversationTurn, EndReason, Phase, Role, SessionConfig, SessionOrchestrator, SessionOutcome,
};
pub use store::{session_id_now, ArtifactStore};
pub use stt::{HttpTranscriber, SpeechToText};
pub use tts::{HttpSpeechService, SpeechSynthesizer, TtsService};
