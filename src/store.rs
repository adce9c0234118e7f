//! Session artifact persistence
//!
//! Fixed per-session layout, created lazily and idempotently:
//!
//! ```text
//! data/interviews/{sessionId}/
//!   audio/audio_{n}_{sessionId}.wav
//!   joblib/conversation.joblib
//!   pdfs/conversation.pdf
//!   outcome/
//! ```

use crate::audio::AudioSegment;
use crate::error::{SessionError, SessionResult};
use crate::report;
use crate::session::ConversationTurn;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Derive a new session identifier from the session-start time.
pub fn session_id_now() -> String {
    Utc::now().timestamp().to_string()
}

/// Persists per-turn audio, the serialized turn list, and the rendered
/// transcript report for one session.
pub struct ArtifactStore {
    session_id: String,
    session_dir: PathBuf,
}

impl ArtifactStore {
    /// Point the store at `{data_root}/interviews/{session_id}`. No
    /// directories are touched until `ensure_directories`.
    pub fn new(data_root: impl AsRef<Path>, session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        let session_dir = data_root.as_ref().join("interviews").join(&session_id);
        Self {
            session_id,
            session_dir,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    fn audio_dir(&self) -> PathBuf {
        self.session_dir.join("audio")
    }

    fn joblib_dir(&self) -> PathBuf {
        self.session_dir.join("joblib")
    }

    fn pdf_dir(&self) -> PathBuf {
        self.session_dir.join("pdfs")
    }

    fn outcome_dir(&self) -> PathBuf {
        self.session_dir.join("outcome")
    }

    /// Create the session layout. Safe to call more than once.
    pub fn ensure_directories(&self) -> SessionResult<()> {
        for dir in [
            self.audio_dir(),
            self.joblib_dir(),
            self.pdf_dir(),
            self.outcome_dir(),
        ] {
            fs::create_dir_all(&dir)
                .map_err(|e| SessionError::Persistence(format!("{}: {}", dir.display(), e)))?;
        }
        info!("Session directories ready: {}", self.session_dir.display());
        Ok(())
    }

    /// Write one candidate segment as
    /// `audio/audio_{n}_{sessionId}.wav` (n = 1-based turn index).
    /// Ownership of the buffer transfers here; capture discards it after.
    pub fn persist_audio_segment(&self, segment: &AudioSegment) -> SessionResult<PathBuf> {
        let path = self
            .audio_dir()
            .join(format!("audio_{}_{}.wav", segment.index, self.session_id));

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: segment.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(&path, spec)
            .map_err(|e| SessionError::Persistence(format!("{}: {}", path.display(), e)))?;
        for &sample in &segment.samples {
            writer
                .write_sample(sample)
                .map_err(|e| SessionError::Persistence(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| SessionError::Persistence(e.to_string()))?;

        info!(
            "Persisted segment {}: {} ({:.2}s)",
            segment.index,
            path.display(),
            segment.duration_secs()
        );

        Ok(path)
    }

    /// Serialize the full ordered turn list (priming pair included) to
    /// `joblib/conversation.joblib`.
    pub fn persist_transcript(&self, turns: &[ConversationTurn]) -> SessionResult<PathBuf> {
        let path = self.joblib_dir().join("conversation.joblib");
        let json = serde_json::to_vec_pretty(turns)
            .map_err(|e| SessionError::Persistence(e.to_string()))?;
        fs::write(&path, json)
            .map_err(|e| SessionError::Persistence(format!("{}: {}", path.display(), e)))?;

        info!("Persisted transcript: {} ({} turns)", path.display(), turns.len());
        Ok(path)
    }

    /// Render the human-readable transcript report to
    /// `pdfs/conversation.pdf`: one section per turn after the priming
    /// pair, role label then full turn text.
    pub fn render_report(&self, turns: &[ConversationTurn]) -> SessionResult<PathBuf> {
        let path = self.pdf_dir().join("conversation.pdf");
        report::render(&path, turns)?;
        info!("Rendered report: {}", path.display());
        Ok(path)
    }

    /// Count of audio files persisted so far, for post-run checks.
    pub fn persisted_segment_count(&self) -> SessionResult<usize> {
        let mut count = 0;
        for entry in fs::read_dir(self.audio_dir())
            .map_err(|e| SessionError::Persistence(e.to_string()))?
        {
            let entry = entry.map_err(|e| SessionError::Persistence(e.to_string()))?;
            if entry.path().extension().map(|e| e == "wav").unwrap_or(false) {
                count += 1;
            }
        }
        Ok(count)
    }
}
