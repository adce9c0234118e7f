use crate::error::{SessionError, SessionResult};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};
use std::sync::mpsc::Receiver;
use tracing::info;

/// Consumes PCM chunks from a channel and plays them, returning only after
/// everything received has actually been heard.
///
/// `play` runs on the short-lived playback thread inside the synthesizer's
/// blocking call; implementations must not return while audio is still
/// audible, since capture for the next turn starts as soon as the caller
/// resumes.
pub trait PlaybackSink: Send + Sync {
    /// Play mono i16 PCM chunks at `sample_rate` until the channel closes,
    /// then block until the queue has drained.
    fn play(&self, sample_rate: u32, chunks: Receiver<Vec<i16>>) -> SessionResult<()>;
}

/// Default output device playback via rodio.
#[derive(Debug, Default)]
pub struct RodioSink;

impl RodioSink {
    pub fn new() -> Self {
        Self
    }
}

impl PlaybackSink for RodioSink {
    fn play(&self, sample_rate: u32, chunks: Receiver<Vec<i16>>) -> SessionResult<()> {
        // The output stream is not Send, so it lives and dies on this thread.
        let (_stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| SessionError::Synthesis(format!("output device: {}", e)))?;
        let sink = Sink::try_new(&stream_handle)
            .map_err(|e| SessionError::Synthesis(format!("playback sink: {}", e)))?;

        let mut chunks_played = 0usize;
        while let Ok(samples) = chunks.recv() {
            if samples.is_empty() {
                continue;
            }
            sink.append(SamplesBuffer::new(1, sample_rate, samples));
            chunks_played += 1;
        }

        // Producer finished; wait for the sink, not just the queue handoff.
        sink.sleep_until_end();
        info!("Playback complete ({} chunks)", chunks_played);
        Ok(())
    }
}

/// Discards audio after draining the channel. Used where no output device
/// exists (tests, headless smoke runs); preserves the blocking contract.
#[derive(Debug, Default)]
pub struct NullSink;

impl PlaybackSink for NullSink {
    fn play(&self, _sample_rate: u32, chunks: Receiver<Vec<i16>>) -> SessionResult<()> {
        while chunks.recv().is_ok() {}
        Ok(())
    }
}
