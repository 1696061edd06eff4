use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No input device available")]
    NoInputDevice,

    #[error("Audio device error: {0}")]
    DeviceError(String),

    #[error("Audio stream error: {0}")]
    StreamError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 1,
        }
    }
}

/// A platform audio-capture device.
///
/// `start` acquires the device and begins delivering interleaved `f32`
/// sample chunks on `chunks`.  `stop` releases the device; once it returns,
/// the device must have dropped its sender so the receiving side observes
/// end-of-stream.  `stop` on an idle device is a no-op.
pub trait CaptureDevice: Send {
    fn config(&self) -> AudioConfig;

    fn start(&mut self, chunks: mpsc::UnboundedSender<Vec<f32>>) -> Result<(), AudioError>;

    fn stop(&mut self);
}

/// Default microphone via cpal.
///
/// The cpal stream is owned by a dedicated thread (streams are not `Send` on
/// every platform) that holds it until told to stop, then drops it, which
/// releases the device and the chunk sender.
pub struct CpalDevice {
    config: AudioConfig,
    worker: Option<(std_mpsc::Sender<()>, JoinHandle<()>)>,
}

impl CpalDevice {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config,
            worker: None,
        }
    }
}

impl Default for CpalDevice {
    fn default() -> Self {
        Self::new(AudioConfig::default())
    }
}

impl CaptureDevice for CpalDevice {
    fn config(&self) -> AudioConfig {
        self.config
    }

    fn start(&mut self, chunks: mpsc::UnboundedSender<Vec<f32>>) -> Result<(), AudioError> {
        self.stop();

        let config = self.config;
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), AudioError>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();

        let handle = std::thread::Builder::new()
            .name("askbar-capture".into())
            .spawn(move || {
                let stream = match open_input_stream(config, chunks) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                // Returns on an explicit stop or when the sender is dropped.
                let _ = stop_rx.recv();
                drop(stream);
                debug!("Audio capture stream released");
            })
            .map_err(|e| AudioError::DeviceError(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.worker = Some((stop_tx, handle));
                debug!("Audio capture started");
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(AudioError::DeviceError("capture thread exited".into()))
            }
        }
    }

    fn stop(&mut self) {
        if let Some((stop_tx, handle)) = self.worker.take() {
            let _ = stop_tx.send(());
            if handle.join().is_err() {
                error!("Audio capture thread panicked");
            }
            debug!("Audio capture stopped");
        }
    }
}

impl Drop for CpalDevice {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_input_stream(
    config: AudioConfig,
    chunks: mpsc::UnboundedSender<Vec<f32>>,
) -> Result<cpal::Stream, AudioError> {
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(AudioError::NoInputDevice)?;

    info!(device = ?device.name(), "Using input device");

    let stream_config = cpal::StreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                if !data.is_empty() {
                    let _ = chunks.send(data.to_vec());
                }
            },
            move |err| {
                error!("Audio input error: {err}");
            },
            None,
        )
        .map_err(|e| AudioError::StreamError(e.to_string()))?;

    stream
        .play()
        .map_err(|e| AudioError::StreamError(e.to_string()))?;

    Ok(stream)
}
