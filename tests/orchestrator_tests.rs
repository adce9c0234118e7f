// Integration tests for the session orchestrator
//
// These drive full sessions through scripted boundary fakes: a capture
// backend that emits a fixed number of frames and then releases the
// operator's speak signal, canned transcription/dialogue/synthesis services,
// and a null playback sink. The fakes share a flight counter that fails the
// test if any two boundary operations ever overlap.

use screenvox::tts::PcmChunkStream;
use screenvox::{
    ArtifactStore, AudioFrame, AudioSegment, CaptureBackend, ConversationTurn, DialogueEngine,
    DialogueService, EndReason, NullSink, OperatorControl, Phase, Role, SegmentRecorder,
    SessionConfig, SessionError, SessionOrchestrator, SessionOutcome, SessionResult,
    SpeechSynthesizer, SpeechToText, TtsService,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

const SESSION_ID: &str = "1700000000";

/// Shared counter asserting the single-flight contract: every boundary fake
/// checks that no other capture/transcription/generation/synthesis operation
/// is in progress when it starts.
#[derive(Clone, Default)]
struct FlightCheck(Arc<AtomicUsize>);

impl FlightCheck {
    fn enter(&self) {
        let previous = self.0.fetch_add(1, Ordering::SeqCst);
        assert_eq!(previous, 0, "two boundary operations overlapped");
    }

    fn exit(&self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Scripted fakes
// ============================================================================

/// Emits `frames_per_segment` chunks per capture, then clears the operator's
/// speak signal, standing in for the candidate finishing an answer and the
/// operator pressing stop (or end, when `end_after_segment` is set).
struct ScriptedCapture {
    control: Arc<OperatorControl>,
    frames_per_segment: usize,
    end_after_segment: bool,
    flight: FlightCheck,
}

#[async_trait::async_trait]
impl CaptureBackend for ScriptedCapture {
    async fn start(
        &mut self,
        sample_rate: u32,
        chunk_size: u32,
    ) -> SessionResult<mpsc::UnboundedReceiver<AudioFrame>> {
        self.flight.enter();
        let (tx, rx) = mpsc::unbounded_channel();
        let control = Arc::clone(&self.control);
        let frames = self.frames_per_segment;
        let end_after = self.end_after_segment;

        tokio::spawn(async move {
            for _ in 0..frames {
                let frame = AudioFrame {
                    samples: vec![0i16; chunk_size as usize],
                    sample_rate,
                };
                if tx.send(frame).is_err() {
                    return;
                }
            }
            // Signal before the channel closes, so the recorder observes a
            // released window rather than a dead stream.
            if end_after {
                control.end_session();
            } else {
                control.stop_speaking();
            }
        });

        Ok(rx)
    }

    async fn stop(&mut self) -> SessionResult<()> {
        self.flight.exit();
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted-capture"
    }
}

/// Returns utterances from a fixed script, in order.
struct ScriptedStt {
    utterances: Vec<String>,
    calls: AtomicUsize,
    flight: FlightCheck,
}

#[async_trait::async_trait]
impl SpeechToText for ScriptedStt {
    async fn transcribe(&self, _segment: &AudioSegment, _language: &str) -> SessionResult<String> {
        self.flight.enter();
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let text = self.utterances[call.min(self.utterances.len() - 1)].clone();
        self.flight.exit();
        Ok(text)
    }
}

/// Always fails, standing in for an unreachable STT host.
struct FailingStt;

#[async_trait::async_trait]
impl SpeechToText for FailingStt {
    async fn transcribe(&self, _segment: &AudioSegment, _language: &str) -> SessionResult<String> {
        Err(SessionError::Transcription("host unreachable".to_string()))
    }
}

/// Replies from a fixed script; optionally flips end-session mid-call to
/// exercise cooperative cancellation inside a blocking boundary.
struct ScriptedDialogue {
    replies: Vec<String>,
    calls: AtomicUsize,
    end_mid_call: Option<Arc<OperatorControl>>,
    flight: FlightCheck,
}

impl ScriptedDialogue {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: replies.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
            end_mid_call: None,
            flight: FlightCheck::default(),
        }
    }
}

#[async_trait::async_trait]
impl DialogueService for ScriptedDialogue {
    async fn generate(
        &self,
        _system_prompt: &str,
        turns: &[ConversationTurn],
    ) -> SessionResult<String> {
        self.flight.enter();

        // The boundary is stateless per call: the full history, priming
        // pair included, arrives every time.
        assert_eq!(turns[0].role, Role::System);
        assert!(turns.len() >= 3);

        if let Some(control) = &self.end_mid_call {
            // The operator presses end while generation is in flight; the
            // call still completes normally.
            control.end_session();
        }

        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies[call.min(self.replies.len() - 1)].clone();
        self.flight.exit();
        Ok(reply)
    }
}

/// Produces a short PCM stream and counts utterances spoken.
struct CountingTts {
    spoken: Arc<AtomicUsize>,
    flight: FlightCheck,
}

#[async_trait::async_trait]
impl TtsService for CountingTts {
    async fn synthesize(&self, _text: &str) -> SessionResult<PcmChunkStream> {
        self.flight.enter();
        self.spoken.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            let _ = tx.send(Ok(vec![0u8; 2048])).await;
        });
        self.flight.exit();
        Ok(rx)
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    control: Arc<OperatorControl>,
    spoken: Arc<AtomicUsize>,
    _temp: TempDir,
    data_root: std::path::PathBuf,
}

impl Harness {
    fn config() -> SessionConfig {
        SessionConfig {
            termination_phrase: "thank you for your time".to_string(),
            ..SessionConfig::default()
        }
    }

    /// Build an orchestrator around the scripted fakes and spawn an
    /// operator task that presses "speak" every time the session goes idle.
    ///
    /// `stt_script` is the transcription sequence; `None` wires an STT
    /// boundary that always fails.
    fn run_session(
        stt_script: Option<Vec<&str>>,
        make_dialogue: impl FnOnce(&Arc<OperatorControl>) -> ScriptedDialogue,
        end_capture_after_segment: bool,
    ) -> (Self, impl std::future::Future<Output = SessionOutcome>) {
        let temp = TempDir::new().unwrap();
        let data_root = temp.path().to_path_buf();
        let control = Arc::new(OperatorControl::new());
        let spoken = Arc::new(AtomicUsize::new(0));
        let flight = FlightCheck::default();

        let config = Self::config();
        let capture = ScriptedCapture {
            control: Arc::clone(&control),
            frames_per_segment: 4,
            end_after_segment: end_capture_after_segment,
            flight: flight.clone(),
        };
        let recorder =
            SegmentRecorder::new(Box::new(capture), config.sample_rate, config.chunk_size);

        let stt: Box<dyn SpeechToText> = match stt_script {
            Some(script) => Box::new(ScriptedStt {
                utterances: script.iter().map(|s| s.to_string()).collect(),
                calls: AtomicUsize::new(0),
                flight: flight.clone(),
            }),
            None => Box::new(FailingStt),
        };

        let mut dialogue = make_dialogue(&control);
        dialogue.flight = flight.clone();
        let engine = DialogueEngine::new(Box::new(dialogue), "persona", "CV: ten years of Rust");

        let synthesizer = SpeechSynthesizer::new(
            Box::new(CountingTts {
                spoken: Arc::clone(&spoken),
                flight,
            }),
            Arc::new(NullSink),
        );
        let store = ArtifactStore::new(&data_root, SESSION_ID);

        let (orchestrator, phase_rx) = SessionOrchestrator::new(
            config,
            Arc::clone(&control),
            recorder,
            stt,
            engine,
            synthesizer,
            store,
        )
        .unwrap();

        // Operator stand-in: open the candidate's window whenever idle.
        let operator_control = Arc::clone(&control);
        let mut rx = phase_rx;
        tokio::spawn(async move {
            loop {
                if *rx.borrow_and_update() == Phase::Idle && !operator_control.is_ended() {
                    operator_control.begin_speaking();
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        });

        let harness = Self {
            control,
            spoken,
            _temp: temp,
            data_root,
        };
        (harness, orchestrator.run())
    }

    fn audio_files(&self) -> usize {
        let dir = self
            .data_root
            .join("interviews")
            .join(SESSION_ID)
            .join("audio");
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    fn artifact(&self, rel: &str) -> std::path::PathBuf {
        self.data_root.join("interviews").join(SESSION_ID).join(rel)
    }
}

fn candidate_turns(outcome: &SessionOutcome) -> Vec<&ConversationTurn> {
    outcome
        .turns
        .iter()
        .filter(|t| t.role == Role::Candidate)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn termination_phrase_ends_session_after_playback() {
    let (harness, session) = Harness::run_session(
        Some(vec!["Hello!", "I have shipped Rust services."]),
        |_| {
            ScriptedDialogue::new(&[
                "Tell me about your Rust experience.",
                "Great. Thank you for your time; you'll receive word soon.",
            ])
        },
        false,
    );

    let outcome = session.await;

    assert_eq!(outcome.reason, EndReason::TerminationPhraseDetected);
    assert!(outcome.error.is_none());
    // Priming pair + 2 full exchanges, and nothing after the closing turn.
    assert_eq!(outcome.turns.len(), 6);
    // The closing utterance was still played.
    assert_eq!(harness.spoken.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn turns_alternate_after_priming_pair() {
    let (harness, session) = Harness::run_session(
        Some(vec!["Hi.", "I like Rust.", "At my last job."]),
        |_| {
            ScriptedDialogue::new(&[
                "What drew you to this role?",
                "How have you used it in production?",
                "Thank you for your time.",
            ])
        },
        false,
    );

    let outcome = session.await;

    let turns = &outcome.turns;
    assert_eq!(turns[0].role, Role::System);
    assert_eq!(turns[1].role, Role::Interviewer);
    for pair in turns[2..].chunks(2) {
        assert_eq!(pair[0].role, Role::Candidate);
        assert_eq!(pair[1].role, Role::Interviewer);
    }
    // No two consecutive turns share a role after the pair.
    for window in turns[2..].windows(2) {
        assert_ne!(window[0].role, window[1].role);
    }
    // Sequence numbers are unique and strictly increasing.
    for window in turns.windows(2) {
        assert!(window[1].sequence > window[0].sequence);
    }

    // One persisted segment per candidate turn, each referenced by its turn.
    assert_eq!(harness.audio_files(), candidate_turns(&outcome).len());
    for turn in candidate_turns(&outcome) {
        assert!(turn.audio.is_some());
    }
}

#[tokio::test]
async fn operator_end_during_capture_keeps_the_segment() {
    let (harness, session) = Harness::run_session(
        Some(vec!["unused"]),
        |_| ScriptedDialogue::new(&["unused"]),
        true, // capture fake presses end-session instead of stop-speaking
    );

    let outcome = session.await;

    assert_eq!(outcome.reason, EndReason::OperatorEnded);
    // The in-flight capture completed and its segment was persisted, but no
    // candidate turn was formed from it.
    assert_eq!(outcome.segments_recorded, 1);
    assert_eq!(harness.audio_files(), 1);
    assert_eq!(outcome.turns.len(), 2);
    assert_eq!(harness.spoken.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn operator_end_during_generation_completes_the_turn() {
    let (harness, session) = Harness::run_session(
        Some(vec!["I know Rust."]),
        |control| {
            let mut dialogue = ScriptedDialogue::new(&["And what about lifetimes?"]);
            dialogue.end_mid_call = Some(Arc::clone(control));
            dialogue
        },
        false,
    );

    let outcome = session.await;

    assert_eq!(outcome.reason, EndReason::OperatorEnded);
    assert!(harness.control.is_ended());
    // The generation call completed: both the candidate and the interviewer
    // turn exist even though the end signal was raised mid-call.
    assert_eq!(outcome.turns.len(), 4);
    assert_eq!(outcome.turns[2].role, Role::Candidate);
    assert_eq!(outcome.turns[3].role, Role::Interviewer);
    // Playback never started: the signal was honored at the next boundary.
    assert_eq!(harness.spoken.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_transcription_is_a_valid_utterance() {
    let (harness, session) = Harness::run_session(
        Some(vec![""]),
        |_| ScriptedDialogue::new(&["Could you elaborate? Thank you for your time."]),
        false,
    );

    let outcome = session.await;

    assert_eq!(outcome.reason, EndReason::TerminationPhraseDetected);
    assert!(outcome.error.is_none());
    // The empty utterance reached the dialogue engine unchanged and the
    // session did not abort on it.
    let candidates = candidate_turns(&outcome);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].content, "");
    assert_eq!(harness.spoken.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transcription_failure_ends_session_with_error_and_persists() {
    let (harness, session) =
        Harness::run_session(None, |_| ScriptedDialogue::new(&["unused"]), false);

    let outcome = session.await;

    assert_eq!(outcome.reason, EndReason::Error);
    assert!(matches!(
        outcome.error,
        Some(SessionError::Transcription(_))
    ));
    // The completed turns (here, just the priming pair) were still
    // persisted, and persistence itself succeeded.
    assert!(outcome.persistence_error.is_none());
    assert!(harness.artifact("joblib/conversation.joblib").exists());
    assert!(harness.artifact("pdfs/conversation.pdf").exists());
}

#[tokio::test]
async fn immediate_end_session_persists_empty_conversation() {
    let temp = TempDir::new().unwrap();
    let control = Arc::new(OperatorControl::new());
    control.end_session();

    let config = Harness::config();
    let capture = ScriptedCapture {
        control: Arc::clone(&control),
        frames_per_segment: 1,
        end_after_segment: false,
        flight: FlightCheck::default(),
    };
    let recorder = SegmentRecorder::new(Box::new(capture), config.sample_rate, config.chunk_size);
    let engine = DialogueEngine::new(
        Box::new(ScriptedDialogue::new(&["unused"])),
        "persona",
        "CV",
    );
    let synthesizer = SpeechSynthesizer::new(
        Box::new(CountingTts {
            spoken: Arc::new(AtomicUsize::new(0)),
            flight: FlightCheck::default(),
        }),
        Arc::new(NullSink),
    );
    let store = ArtifactStore::new(temp.path(), "1700000001");

    let (orchestrator, _phase_rx) = SessionOrchestrator::new(
        config,
        control,
        recorder,
        Box::new(FailingStt),
        engine,
        synthesizer,
        store,
    )
    .unwrap();

    let outcome = orchestrator.run().await;

    assert_eq!(outcome.reason, EndReason::OperatorEnded);
    assert_eq!(outcome.segments_recorded, 0);
    assert_eq!(outcome.turns.len(), 2);
    assert!(temp
        .path()
        .join("interviews/1700000001/joblib/conversation.joblib")
        .exists());
}
