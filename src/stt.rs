//! Speech-to-text boundary
//!
//! Converts a recorded segment into candidate text. An empty or
//! whitespace-only transcription is a valid (if unhelpful) utterance, not an
//! error; the orchestrator never re-prompts.

use crate::audio::AudioSegment;
use crate::error::{SessionError, SessionResult};
use std::io::Cursor;
use std::time::Duration;
use tracing::debug;

/// Boundary for converting one recorded segment to text.
#[async_trait::async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe one segment. Returns the raw text, which may be empty.
    async fn transcribe(&self, segment: &AudioSegment, language: &str) -> SessionResult<String>;
}

/// Encode a segment as WAV bytes for upload.
fn segment_to_wav(segment: &AudioSegment) -> SessionResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: segment.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| SessionError::Transcription(format!("WAV encode: {}", e)))?;
        for &sample in &segment.samples {
            writer
                .write_sample(sample)
                .map_err(|e| SessionError::Transcription(format!("WAV encode: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| SessionError::Transcription(format!("WAV encode: {}", e)))?;
    }
    Ok(cursor.into_inner())
}

/// OpenAI-compatible transcription client (`POST {base}/audio/transcriptions`,
/// multipart WAV upload). Works against OpenAI Whisper and compatible hosts.
#[derive(Debug, Clone)]
pub struct HttpTranscriber {
    /// Base URL without trailing slash (e.g. https://api.openai.com/v1)
    base_url: String,
    api_key: String,
    /// Model id, e.g. whisper-1
    model: String,
    client: reqwest::Client,
}

impl HttpTranscriber {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> SessionResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| SessionError::Transcription(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }

    /// Build from the environment: STT_API_KEY plus optional STT_API_URL
    /// and STT_MODEL overrides.
    pub fn from_env() -> SessionResult<Self> {
        let base_url = std::env::var("STT_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("STT_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .map_err(|_| {
                SessionError::Transcription("STT_API_KEY or OPENAI_API_KEY not set".to_string())
            })?;
        let model = std::env::var("STT_MODEL").unwrap_or_else(|_| "whisper-1".to_string());
        Self::new(base_url, api_key, model)
    }
}

#[async_trait::async_trait]
impl SpeechToText for HttpTranscriber {
    async fn transcribe(&self, segment: &AudioSegment, language: &str) -> SessionResult<String> {
        let wav = segment_to_wav(segment)?;
        debug!(
            "Uploading segment {} for transcription ({} bytes)",
            segment.index,
            wav.len()
        );

        let url = format!(
            "{}/audio/transcriptions",
            self.base_url.trim_end_matches('/')
        );
        let part = reqwest::multipart::Part::bytes(wav)
            .file_name(format!("segment_{}.wav", segment.index))
            .mime_str("audio/wav")
            .map_err(|e| SessionError::Transcription(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", language.to_string());

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SessionError::Transcription(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::Transcription(format!(
                "STT API error {}: {}",
                status, body
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SessionError::Transcription(e.to_string()))?;
        let text = json
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .to_string();

        Ok(text)
    }
}
