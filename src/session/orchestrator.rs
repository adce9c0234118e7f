use super::{ConversationTurn, SessionConfig};
use crate::audio::SegmentRecorder;
use crate::control::OperatorControl;
use crate::dialogue::DialogueEngine;
use crate::error::{SessionError, SessionResult};
use crate::store::ArtifactStore;
use crate::stt::SpeechToText;
use crate::tts::SpeechSynthesizer;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

/// How often the idle loop samples the operator signals.
const SIGNAL_POLL: Duration = Duration::from_millis(100);

/// Where the session currently is. Exactly one of the four working phases
/// is ever active; the session task never overlaps them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Recording,
    Transcribing,
    Generating,
    Speaking,
    Ended,
}

impl Phase {
    /// Display hint for the operator surface: the candidate may only be
    /// invited to speak while the session sits in `Idle`.
    pub fn speaking_enabled(&self) -> bool {
        matches!(self, Phase::Idle)
    }
}

/// Why the session reached `Ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The operator pressed end-session
    OperatorEnded,
    /// The interviewer's utterance contained the termination marker
    TerminationPhraseDetected,
    /// An unrecoverable error in one of the working phases
    Error,
}

/// Everything the caller gets back once the session has ended. Completed
/// turns survive every ending, including errors; a persistence failure is
/// reported separately so the in-memory history can be retried manually.
pub struct SessionOutcome {
    pub session_id: String,
    pub turns: Vec<ConversationTurn>,
    pub reason: EndReason,
    pub error: Option<SessionError>,
    pub persistence_error: Option<SessionError>,
    pub segments_recorded: u32,
}

/// Drives one interview: Idle → Recording → Transcribing → Generating →
/// Speaking, around and around, until the operator ends it, the dialogue
/// engine utters the termination phrase, or something breaks.
///
/// All boundary objects are owned here and only ever invoked from the one
/// session task, so no two external-service calls or audio operations can
/// overlap. The end-session signal is polled at phase boundaries only;
/// cancellation latency equals the in-flight operation's duration.
pub struct SessionOrchestrator {
    config: SessionConfig,
    control: Arc<OperatorControl>,
    recorder: SegmentRecorder,
    transcriber: Box<dyn SpeechToText>,
    engine: DialogueEngine,
    synthesizer: SpeechSynthesizer,
    store: ArtifactStore,
    phase_tx: watch::Sender<Phase>,
}

impl SessionOrchestrator {
    /// Wire up a session. Creates the artifact layout up front; a failure
    /// here aborts session creation with nothing persisted.
    ///
    /// Returns the orchestrator plus a phase watch for the operator
    /// surface's display hint.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SessionConfig,
        control: Arc<OperatorControl>,
        recorder: SegmentRecorder,
        transcriber: Box<dyn SpeechToText>,
        engine: DialogueEngine,
        synthesizer: SpeechSynthesizer,
        store: ArtifactStore,
    ) -> SessionResult<(Self, watch::Receiver<Phase>)> {
        store.ensure_directories()?;
        let (phase_tx, phase_rx) = watch::channel(Phase::Idle);

        Ok((
            Self {
                config,
                control,
                recorder,
                transcriber,
                engine,
                synthesizer,
                store,
                phase_tx,
            },
            phase_rx,
        ))
    }

    fn set_phase(&self, phase: Phase) {
        self.phase_tx.send_replace(phase);
    }

    fn operator_ended(&self) -> bool {
        self.control.is_ended()
    }

    /// Run the interview to completion and persist its artifacts.
    pub async fn run(mut self) -> SessionOutcome {
        info!(
            "Interview session {} started ({} / {})",
            self.store.session_id(),
            self.config.candidate_skill,
            self.config.job_role
        );

        let (reason, run_error) = self.turn_loop().await;
        self.set_phase(Phase::Ended);

        match reason {
            EndReason::OperatorEnded => info!("Session ended by operator"),
            EndReason::TerminationPhraseDetected => {
                info!("Session ended: interviewer closed the screen")
            }
            EndReason::Error => {
                if let Some(e) = &run_error {
                    error!("Session ended on error: {}", e);
                }
            }
        }

        let SessionOrchestrator {
            recorder,
            engine,
            store,
            ..
        } = self;

        let segments_recorded = recorder.segments_recorded();
        let session_id = store.session_id().to_string();
        let turns = engine.into_turns();

        // Whatever turns were completed are persisted regardless of how the
        // session ended. A failure here does not undo `Ended`.
        let mut persistence_error = None;
        if let Err(e) = store.persist_transcript(&turns) {
            persistence_error = Some(e);
        }
        if let Err(e) = store.render_report(&turns) {
            if persistence_error.is_none() {
                persistence_error = Some(e);
            }
        }

        SessionOutcome {
            session_id,
            turns,
            reason,
            error: run_error,
            persistence_error,
            segments_recorded,
        }
    }

    /// The turn loop proper. Returns the reason the session ended and the
    /// fatal error, if that reason was `Error`.
    async fn turn_loop(&mut self) -> (EndReason, Option<SessionError>) {
        loop {
            self.set_phase(Phase::Idle);

            // Idle: wait for the operator to open the candidate's window.
            while !self.control.is_speaking() {
                if self.operator_ended() {
                    return (EndReason::OperatorEnded, None);
                }
                tokio::time::sleep(SIGNAL_POLL).await;
            }

            self.set_phase(Phase::Recording);
            let segment = match self.recorder.capture_until_stopped(&self.control).await {
                Ok(segment) => segment,
                Err(e) => return (EndReason::Error, Some(e)),
            };

            // The segment is persisted as capture closes, before the end
            // signal is consulted: an operator ending the session mid-answer
            // still leaves the recording on disk.
            let audio_path = match self.store.persist_audio_segment(&segment) {
                Ok(path) => path,
                Err(e) => return (EndReason::Error, Some(e)),
            };
            if self.operator_ended() {
                return (EndReason::OperatorEnded, None);
            }

            self.set_phase(Phase::Transcribing);
            let utterance = match self
                .transcriber
                .transcribe(&segment, &self.config.language)
                .await
            {
                Ok(text) => text,
                Err(e) => return (EndReason::Error, Some(e)),
            };
            info!("Candidate: {}", utterance);
            if self.operator_ended() {
                return (EndReason::OperatorEnded, None);
            }

            self.set_phase(Phase::Generating);
            let reply = match self.engine.respond(&utterance, Some(audio_path)).await {
                Ok(reply) => reply,
                Err(e) => return (EndReason::Error, Some(e)),
            };
            info!("Interviewer: {}", reply);

            // Checked before playback so the closing utterance is still
            // spoken, then the session ends.
            let phrase_detected = reply
                .to_lowercase()
                .contains(&self.config.termination_phrase.to_lowercase());

            if self.operator_ended() {
                return (EndReason::OperatorEnded, None);
            }

            self.set_phase(Phase::Speaking);
            if let Err(e) = self
                .synthesizer
                .speak(&reply, self.config.speaking_speed)
                .await
            {
                return (EndReason::Error, Some(e));
            }

            if phrase_detected {
                return (EndReason::TerminationPhraseDetected, None);
            }
            if self.operator_ended() {
                return (EndReason::OperatorEnded, None);
            }
        }
    }
}
