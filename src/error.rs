//! Error types for the interview session pipeline

use thiserror::Error;

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur while running an interview session
#[derive(Error, Debug)]
pub enum SessionError {
    /// Opening or reading the capture stream failed. Aborts the current
    /// segment; no partial file is written.
    #[error("audio I/O error: {0}")]
    AudioIo(String),

    /// The speech-to-text boundary failed. Session-fatal: the orchestrator
    /// has no candidate input to proceed with.
    #[error("transcription error: {0}")]
    Transcription(String),

    /// The dialogue-generation boundary failed. Session-fatal; no automated
    /// retry, since resending a partially-applied conversation risks
    /// duplicate turns.
    #[error("dialogue service error: {0}")]
    Dialogue(String),

    /// Speech synthesis or playback failed, possibly mid-stream.
    /// Session-fatal: the candidate would otherwise hear silence with no
    /// indication the interview continues.
    #[error("speech synthesis error: {0}")]
    Synthesis(String),

    /// Writing session artifacts failed. Reported to the caller as a
    /// distinct failure; the in-memory turn history stays valid for a
    /// manual retry.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::Persistence(err.to_string())
    }
}

impl From<hound::Error> for SessionError {
    fn from(err: hound::Error) -> Self {
        SessionError::Persistence(err.to_string())
    }
}

impl From<cpal::BuildStreamError> for SessionError {
    fn from(err: cpal::BuildStreamError) -> Self {
        SessionError::AudioIo(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for SessionError {
    fn from(err: cpal::PlayStreamError) -> Self {
        SessionError::AudioIo(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for SessionError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        SessionError::AudioIo(err.to_string())
    }
}
