use crate::error::{SessionError, SessionResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// A block of captured samples (16-bit PCM, mono)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

/// Capture backend trait
///
/// `start` opens the input stream and returns a channel receiver that will
/// receive fixed-size audio frames until `stop` is called. Implementations:
/// - cpal microphone input (production)
/// - scripted frame sources (tests)
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Start capturing audio at the given sample rate, delivering
    /// `chunk_size` samples per frame.
    async fn start(
        &mut self,
        sample_rate: u32,
        chunk_size: u32,
    ) -> SessionResult<mpsc::UnboundedReceiver<AudioFrame>>;

    /// Stop capturing and release the input device.
    async fn stop(&mut self) -> SessionResult<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Microphone capture via cpal.
///
/// cpal streams are not `Send`, so the stream lives on a dedicated thread
/// that forwards frames over the channel and exits when the stop flag is set.
pub struct MicrophoneBackend {
    stop_flag: Arc<AtomicBool>,
    capture_thread: Option<std::thread::JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new() -> Self {
        Self {
            stop_flag: Arc::new(AtomicBool::new(false)),
            capture_thread: None,
        }
    }

    /// Probe for a usable input device without opening a stream. Lets
    /// session setup fail before any directories are created.
    pub fn probe() -> SessionResult<String> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| SessionError::AudioIo("no input device available".to_string()))?;
        let name = device
            .name()
            .unwrap_or_else(|_| "unknown input device".to_string());
        info!("Capture device: {}", name);
        Ok(name)
    }
}

impl Default for MicrophoneBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(
        &mut self,
        sample_rate: u32,
        chunk_size: u32,
    ) -> SessionResult<mpsc::UnboundedReceiver<AudioFrame>> {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<SessionResult<()>>();

        self.stop_flag.store(false, Ordering::SeqCst);
        let stop_flag = Arc::clone(&self.stop_flag);

        let handle = std::thread::spawn(move || {
            let device = match cpal::default_host().default_input_device() {
                Some(d) => d,
                None => {
                    let _ = ready_tx.send(Err(SessionError::AudioIo(
                        "no input device available".to_string(),
                    )));
                    return;
                }
            };

            let stream_config = cpal::StreamConfig {
                channels: 1,
                sample_rate: cpal::SampleRate(sample_rate),
                buffer_size: cpal::BufferSize::Default,
            };

            let chunk = chunk_size as usize;
            let mut pending: Vec<i16> = Vec::with_capacity(chunk);
            let tx = frame_tx.clone();

            let stream = device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    for &sample in data {
                        let clamped = sample.clamp(-1.0, 1.0);
                        pending.push((clamped * i16::MAX as f32) as i16);

                        if pending.len() >= chunk {
                            let frame = AudioFrame {
                                samples: std::mem::replace(
                                    &mut pending,
                                    Vec::with_capacity(chunk),
                                ),
                                sample_rate,
                            };
                            if tx.send(frame).is_err() {
                                // Receiver gone; the stop flag will end the thread shortly.
                                warn!("Capture receiver dropped, frame discarded");
                            }
                        }
                    }
                },
                move |err| {
                    // Overflow and transient stream faults lose at most part
                    // of a chunk; the segment continues.
                    warn!("Input stream error: {}", err);
                },
                None,
            );

            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.into()));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(e.into()));
                return;
            }

            let _ = ready_tx.send(Ok(()));

            while !stop_flag.load(Ordering::SeqCst) {
                std::thread::sleep(std::time::Duration::from_millis(20));
            }

            // Dropping the stream closes the device; the channel closes with
            // the last sender clone below.
            drop(stream);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("Microphone capture started ({} Hz)", sample_rate);
                self.capture_thread = Some(handle);
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(SessionError::AudioIo(
                    "capture thread exited before the stream opened".to_string(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> SessionResult<()> {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.capture_thread.take() {
            if handle.join().is_err() {
                warn!("Capture thread panicked during shutdown");
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}
