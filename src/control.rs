//! Operator signal surface
//!
//! Two booleans shared between the operator's UI thread (writer) and the
//! session task (reader). This is the only state that crosses the thread
//! boundary; everything else is exclusively owned by the session task.

use std::sync::atomic::{AtomicBool, Ordering};

/// Thread-safe holder for the three operator intents: begin-speaking,
/// stop-speaking, and end-session. Nothing here blocks.
#[derive(Debug, Default)]
pub struct OperatorControl {
    /// True while the candidate should be recorded
    speaking: AtomicBool,

    /// True once the operator has asked for the session to end
    ended: AtomicBool,
}

impl OperatorControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operator pressed "speak": open the candidate's recording window.
    pub fn begin_speaking(&self) {
        self.speaking.store(true, Ordering::SeqCst);
    }

    /// Operator pressed "stop": close the recording window, the captured
    /// segment proceeds to transcription.
    pub fn stop_speaking(&self) {
        self.speaking.store(false, Ordering::SeqCst);
    }

    /// Operator asked to end the session. Honored at the next phase
    /// boundary, after any in-flight blocking operation returns.
    pub fn end_session(&self) {
        self.ended.store(true, Ordering::SeqCst);
        self.speaking.store(false, Ordering::SeqCst);
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }
}
