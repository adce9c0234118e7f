//! Speech synthesis boundary and blocking playback
//!
//! `SpeechSynthesizer::speak` is the producer/consumer handoff the turn loop
//! depends on: a synthesis stream produces PCM chunks, a playback sink
//! consumes them on a short-lived blocking thread, and the call returns only
//! after the sink reports completion. Capture for the next turn must not
//! start while speech is still audible.

use crate::audio::PlaybackSink;
use crate::error::{SessionError, SessionResult};
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Sample rate of the PCM the synthesis boundary emits.
pub const SYNTH_PCM_RATE: u32 = 24_000;

/// Stream of raw PCM chunks (s16le mono) from the synthesis boundary.
/// An `Err` item means the stream failed mid-way.
pub type PcmChunkStream = mpsc::Receiver<SessionResult<Vec<u8>>>;

/// Boundary for turning interviewer text into a stream of audio chunks.
#[async_trait::async_trait]
pub trait TtsService: Send + Sync {
    /// Start synthesis and return the chunk stream. May fail up front or
    /// mid-stream.
    async fn synthesize(&self, text: &str) -> SessionResult<PcmChunkStream>;
}

/// OpenAI-compatible speech client (`POST {base}/audio/speech`,
/// `response_format: "pcm"`, which is 24 kHz mono s16le).
#[derive(Debug, Clone)]
pub struct HttpSpeechService {
    base_url: String,
    api_key: String,
    model: String,
    voice: String,
    client: reqwest::Client,
}

impl HttpSpeechService {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
    ) -> SessionResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| SessionError::Synthesis(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            voice: voice.into(),
            client,
        })
    }

    /// Build from the environment: TTS_API_KEY plus optional TTS_API_URL,
    /// TTS_MODEL, and TTS_VOICE overrides.
    pub fn from_env() -> SessionResult<Self> {
        let base_url = std::env::var("TTS_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("TTS_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| {
                SessionError::Synthesis("TTS_API_KEY or OPENAI_API_KEY not set".to_string())
            })?;
        let model = std::env::var("TTS_MODEL").unwrap_or_else(|_| "tts-1".to_string());
        let voice = std::env::var("TTS_VOICE").unwrap_or_else(|_| "nova".to_string());
        Self::new(base_url, api_key, model, voice)
    }
}

#[async_trait::async_trait]
impl TtsService for HttpSpeechService {
    async fn synthesize(&self, text: &str) -> SessionResult<PcmChunkStream> {
        let url = format!("{}/audio/speech", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "input": text,
            "voice": self.voice,
            "response_format": "pcm",
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SessionError::Synthesis(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::Synthesis(format!(
                "TTS API error {}: {}",
                status, body
            )));
        }

        let (chunk_tx, chunk_rx) = mpsc::channel(32);
        let mut byte_stream = response.bytes_stream();

        tokio::spawn(async move {
            while let Some(item) = byte_stream.next().await {
                let forwarded = match item {
                    Ok(bytes) => chunk_tx.send(Ok(bytes.to_vec())).await,
                    Err(e) => {
                        let _ = chunk_tx
                            .send(Err(SessionError::Synthesis(format!(
                                "TTS stream failed mid-way: {}",
                                e
                            ))))
                            .await;
                        break;
                    }
                };
                if forwarded.is_err() {
                    // Consumer bailed; stop pulling from the network.
                    break;
                }
            }
        });

        Ok(chunk_rx)
    }
}

/// Decode s16le bytes into samples, carrying a split byte across chunk
/// boundaries.
fn bytes_to_samples(carry: &mut Option<u8>, bytes: &[u8]) -> Vec<i16> {
    let mut samples = Vec::with_capacity((bytes.len() + 1) / 2);
    let mut iter = bytes.iter().copied();

    if let Some(low) = carry.take() {
        if let Some(high) = iter.next() {
            samples.push(i16::from_le_bytes([low, high]));
        } else {
            *carry = Some(low);
            return samples;
        }
    }

    loop {
        match (iter.next(), iter.next()) {
            (Some(low), Some(high)) => samples.push(i16::from_le_bytes([low, high])),
            (Some(low), None) => {
                *carry = Some(low);
                break;
            }
            _ => break,
        }
    }

    samples
}

/// Drives one utterance through synthesis and playback, blocking the session
/// task until the audio has fully played.
pub struct SpeechSynthesizer {
    service: Box<dyn TtsService>,
    sink: Arc<dyn PlaybackSink>,
}

impl SpeechSynthesizer {
    pub fn new(service: Box<dyn TtsService>, sink: Arc<dyn PlaybackSink>) -> Self {
        Self { service, sink }
    }

    /// Synthesize and play `text`, returning once the playback sink signals
    /// completion. The speed multiplier is applied by adjusting the playback
    /// rate of the synthesized PCM.
    pub async fn speak(&self, text: &str, speaking_speed: f32) -> SessionResult<()> {
        if text.trim().is_empty() {
            return Ok(());
        }

        let mut chunks = self.service.synthesize(text).await?;
        let playback_rate = (SYNTH_PCM_RATE as f32 * speaking_speed).round() as u32;

        let (sample_tx, sample_rx) = std::sync::mpsc::channel::<Vec<i16>>();
        let sink = Arc::clone(&self.sink);
        let playback = tokio::task::spawn_blocking(move || sink.play(playback_rate, sample_rx));

        debug!("Speaking ({} chars at {} Hz)", text.len(), playback_rate);

        let mut carry: Option<u8> = None;
        let mut stream_error: Option<SessionError> = None;

        while let Some(item) = chunks.recv().await {
            match item {
                Ok(bytes) => {
                    let samples = bytes_to_samples(&mut carry, &bytes);
                    if sample_tx.send(samples).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    stream_error = Some(e);
                    break;
                }
            }
        }

        // Closing the channel lets the sink drain what it already has; the
        // thread is always joined before this call returns.
        drop(sample_tx);
        let played = playback
            .await
            .map_err(|e| SessionError::Synthesis(format!("playback thread panicked: {}", e)))?;

        if let Some(e) = stream_error {
            return Err(e);
        }
        played?;

        info!("Playback finished");
        Ok(())
    }
}
