use anyhow::{Context, Result};
use clap::Parser;
use screenvox::{
    create_router, interviewer_prompt, session_id_now, AppState, ArtifactStore, Config,
    DialogueEngine, EndReason, HttpDialogueService, HttpSpeechService, HttpTranscriber,
    MicrophoneBackend, OperatorControl, RodioSink, SegmentRecorder, SessionOrchestrator,
    SpeechSynthesizer,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Automated spoken phone-screen interviews
#[derive(Debug, Parser)]
#[command(name = "screenvox", version)]
struct Args {
    /// Config file (without extension), passed to the config loader
    #[arg(long, default_value = "config/screenvox")]
    config: String,

    /// Override the CV text file used as priming context
    #[arg(long)]
    cv: Option<PathBuf>,

    /// Override the artifact data root
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Reuse a fixed session id instead of deriving one from the start time
    #[arg(long)]
    session_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config).context("Failed to load config")?;

    // Setup-time failures abort before anything is persisted.
    let cv_path = args.cv.unwrap_or_else(|| cfg.interview.cv_path.clone());
    let priming_context = std::fs::read_to_string(&cv_path)
        .with_context(|| format!("No reference document at {}", cv_path.display()))?;
    MicrophoneBackend::probe().context("No capture device")?;

    let session_config = cfg.session_config();
    let session_id = args.session_id.unwrap_or_else(session_id_now);
    let data_root = args.data_dir.unwrap_or_else(|| cfg.audio.data_path.clone());

    info!("screenvox v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Screening for {} {} (session {})",
        session_config.candidate_skill, session_config.job_role, session_id
    );

    let control = Arc::new(OperatorControl::new());
    let store = ArtifactStore::new(&data_root, &session_id);
    let recorder = SegmentRecorder::new(
        Box::new(MicrophoneBackend::new()),
        session_config.sample_rate,
        session_config.chunk_size,
    );
    let transcriber = HttpTranscriber::from_env().context("Speech-to-text setup failed")?;
    let dialogue = HttpDialogueService::from_env().context("Dialogue service setup failed")?;
    let engine = DialogueEngine::new(
        Box::new(dialogue),
        interviewer_prompt(&session_config),
        &priming_context,
    );
    let synthesizer = SpeechSynthesizer::new(
        Box::new(HttpSpeechService::from_env().context("Speech synthesis setup failed")?),
        Arc::new(RodioSink::new()),
    );

    let (orchestrator, phase_rx) = SessionOrchestrator::new(
        session_config,
        Arc::clone(&control),
        recorder,
        Box::new(transcriber),
        engine,
        synthesizer,
        store,
    )
    .context("Failed to create session")?;

    // Operator surface: handlers only flip signals, so it can outlive the
    // session loop and simply report `ended` afterwards.
    let state = AppState::new(Arc::clone(&control), phase_rx, session_id.clone());
    let addr = format!("{}:{}", cfg.http.bind, cfg.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind operator surface on {}", addr))?;
    info!("Operator surface listening on {}", addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, create_router(state)).await {
            error!("Operator surface failed: {}", e);
        }
    });

    let outcome = orchestrator.run().await;

    info!(
        "Session {} over: {} turns, {} segments",
        outcome.session_id,
        outcome.turns.len(),
        outcome.segments_recorded
    );
    match outcome.reason {
        EndReason::OperatorEnded => info!("Termination: operator ended the session"),
        EndReason::TerminationPhraseDetected => info!("Termination: closing phrase detected"),
        EndReason::Error => {
            if let Some(e) = &outcome.error {
                error!("Termination: session error: {}", e);
            }
        }
    }

    if let Some(e) = outcome.persistence_error {
        // The session itself is over; surface the persistence failure
        // distinctly so the artifacts can be retried from the turn history.
        warn!("Artifacts incomplete for session {}", outcome.session_id);
        return Err(e).context("Failed to persist session artifacts");
    }

    Ok(())
}
