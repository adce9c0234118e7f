use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Document-priming content injected before the first real turn
    System,
    /// The automated interviewer
    Interviewer,
    /// The human candidate
    Candidate,
}

impl Role {
    /// Label used in the rendered report.
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "System",
            Role::Interviewer => "Interviewer",
            Role::Candidate => "Candidate",
        }
    }
}

/// One utterance plus its bookkeeping metadata. Turns are append-only and
/// never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who spoke
    pub role: Role,

    /// Full utterance text, never truncated
    pub content: String,

    /// Persisted recording for candidate turns, if any
    pub audio: Option<PathBuf>,

    /// Monotonically increasing position in the conversation
    pub sequence: u32,

    /// When the turn was appended
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>, sequence: u32) -> Self {
        Self {
            role,
            content: content.into(),
            audio: None,
            sequence,
            timestamp: Utc::now(),
        }
    }

    pub fn with_audio(mut self, path: PathBuf) -> Self {
        self.audio = Some(path);
        self
    }
}
