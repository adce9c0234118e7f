use super::backend::CaptureBackend;
use crate::control::OperatorControl;
use crate::error::{SessionError, SessionResult};
use std::time::Duration;
use tracing::{info, warn};

/// One continuous recording corresponding to a single candidate turn.
/// Owned by the recorder until handed to the artifact store.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// Accumulated samples (i16 PCM, mono)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// 1-based candidate turn index
    pub index: u32,
}

impl AudioSegment {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Records one finite segment per candidate turn, pacing the blocking
/// capture loop off the operator's stop signal.
pub struct SegmentRecorder {
    backend: Box<dyn CaptureBackend>,
    sample_rate: u32,
    chunk_size: u32,
    segments_recorded: u32,
}

impl SegmentRecorder {
    pub fn new(backend: Box<dyn CaptureBackend>, sample_rate: u32, chunk_size: u32) -> Self {
        Self {
            backend,
            sample_rate,
            chunk_size,
            segments_recorded: 0,
        }
    }

    /// Number of segments completed so far.
    pub fn segments_recorded(&self) -> u32 {
        self.segments_recorded
    }

    /// Open the input stream, accumulate fixed-size frames until the
    /// operator stop signal is observed, then return the finite segment.
    ///
    /// Stream-open failure aborts the segment with no partial data. Frames
    /// lost to overflow inside the backend are logged there, not fatal.
    pub async fn capture_until_stopped(
        &mut self,
        control: &OperatorControl,
    ) -> SessionResult<AudioSegment> {
        let mut frame_rx = self.backend.start(self.sample_rate, self.chunk_size).await?;

        info!(
            "Recording segment {} ({} Hz, {}-sample chunks)",
            self.segments_recorded + 1,
            self.sample_rate,
            self.chunk_size
        );

        let mut samples: Vec<i16> = Vec::new();
        let poll = Duration::from_millis(50);

        loop {
            match tokio::time::timeout(poll, frame_rx.recv()).await {
                Ok(Some(frame)) => {
                    samples.extend_from_slice(&frame.samples);
                }
                Ok(None) => {
                    // The capture thread only closes the channel on stop;
                    // an early close means the stream died under us.
                    if control.is_speaking() {
                        self.backend.stop().await.ok();
                        return Err(SessionError::AudioIo(
                            "capture stream closed mid-segment".to_string(),
                        ));
                    }
                    break;
                }
                Err(_) => {
                    // No frame inside the poll window; fall through to the
                    // signal check either way.
                }
            }

            if !control.is_speaking() {
                break;
            }
        }

        self.backend.stop().await?;

        // Drain anything the backend queued before it observed the stop.
        while let Ok(frame) = frame_rx.try_recv() {
            samples.extend_from_slice(&frame.samples);
        }

        if samples.is_empty() {
            warn!("Segment closed with no captured samples");
        }

        self.segments_recorded += 1;
        let segment = AudioSegment {
            samples,
            sample_rate: self.sample_rate,
            index: self.segments_recorded,
        };

        info!(
            "Segment {} complete: {:.2}s, {} samples",
            segment.index,
            segment.duration_secs(),
            segment.samples.len()
        );

        Ok(segment)
    }
}
