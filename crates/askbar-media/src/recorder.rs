//! Voice recording lifecycle: `Idle -> Recording -> Finalizing -> Idle`.
//!
//! [`VoiceRecorder`] wraps a [`CaptureDevice`], a one-second elapsed-time
//! timer and the assembly of captured chunks into a single [`AudioClip`].
//! It must be driven from inside a tokio runtime.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audio::{CaptureDevice, CpalDevice};
use crate::clip::AudioClip;

const TICK: Duration = Duration::from_millis(1000);

type TimeCallback = Arc<dyn Fn(u32) + Send + Sync>;
type CompleteCallback = Arc<dyn Fn(&AudioClip) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    Finalizing,
}

pub struct VoiceRecorder<D: CaptureDevice = CpalDevice> {
    device: D,
    state: RecorderState,
    seconds: Arc<AtomicU32>,
    timer: Option<JoinHandle<()>>,
    assembled: Option<oneshot::Receiver<AudioClip>>,
    on_time_update: TimeCallback,
    on_complete: CompleteCallback,
}

impl<D: CaptureDevice> VoiceRecorder<D> {
    /// `on_time_update` receives the elapsed whole seconds once per second
    /// while recording; `on_complete` receives the assembled clip.
    pub fn new(
        device: D,
        on_time_update: impl Fn(u32) + Send + Sync + 'static,
        on_complete: impl Fn(&AudioClip) + Send + Sync + 'static,
    ) -> Self {
        Self {
            device,
            state: RecorderState::Idle,
            seconds: Arc::new(AtomicU32::new(0)),
            timer: None,
            assembled: None,
            on_time_update: Arc::new(on_time_update),
            on_complete: Arc::new(on_complete),
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.seconds.load(Ordering::Relaxed)
    }

    /// Acquire the device and start buffering.
    ///
    /// Returns `false` instead of an error when the device cannot be
    /// acquired (permission denied, no microphone) or a recording is already
    /// in progress.
    pub fn start_recording(&mut self) -> bool {
        if self.state != RecorderState::Idle {
            warn!(state = ?self.state, "Recording already in progress");
            return false;
        }

        let (chunk_tx, mut chunk_rx) = mpsc::unbounded_channel::<Vec<f32>>();
        if let Err(e) = self.device.start(chunk_tx) {
            warn!(error = %e, "Could not start recording");
            return false;
        }

        let config = self.device.config();
        let on_complete = self.on_complete.clone();
        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(async move {
            let mut chunks = Vec::new();
            while let Some(chunk) = chunk_rx.recv().await {
                if !chunk.is_empty() {
                    debug!(samples = chunk.len(), "Received audio chunk");
                    chunks.push(chunk);
                }
            }
            if done_tx.is_closed() {
                debug!("Recording discarded");
                return;
            }
            let clip = AudioClip::from_chunks(config, chunks);
            info!(samples = clip.samples.len(), "Recording assembled");
            on_complete(&clip);
            let _ = done_tx.send(clip);
        });

        self.seconds.store(0, Ordering::Relaxed);
        let seconds = self.seconds.clone();
        let on_time_update = self.on_time_update.clone();
        self.timer = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + TICK, TICK);
            loop {
                interval.tick().await;
                let elapsed = seconds.fetch_add(1, Ordering::Relaxed) + 1;
                on_time_update(elapsed);
            }
        }));

        self.assembled = Some(done_rx);
        self.state = RecorderState::Recording;
        info!("Recording started");
        true
    }

    /// Stop the device and wait for the buffered chunks to be assembled.
    ///
    /// Resolves with the same clip passed to the completion callback, or
    /// `None` when nothing was being recorded.
    pub async fn stop_recording(&mut self) -> Option<AudioClip> {
        if self.state != RecorderState::Recording {
            return None;
        }

        self.state = RecorderState::Finalizing;
        self.device.stop();
        self.cancel_timer();

        let clip = match self.assembled.take() {
            Some(rx) => rx.await.ok(),
            None => None,
        };
        self.state = RecorderState::Idle;
        clip
    }

    /// Release the timer and the device unconditionally.  Safe to call any
    /// number of times; a pending recording is discarded.
    pub fn cleanup(&mut self) {
        self.assembled = None;
        self.cancel_timer();
        self.device.stop();
        self.state = RecorderState::Idle;
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl<D: CaptureDevice> Drop for VoiceRecorder<D> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioConfig, AudioError};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Device that replays fixed chunks and counts releases.
    struct ScriptedDevice {
        chunks: Vec<Vec<f32>>,
        available: bool,
        sender: Option<mpsc::UnboundedSender<Vec<f32>>>,
        releases: Arc<AtomicUsize>,
    }

    impl ScriptedDevice {
        fn new(chunks: Vec<Vec<f32>>) -> Self {
            Self {
                chunks,
                available: true,
                sender: None,
                releases: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn unavailable() -> Self {
            Self {
                available: false,
                ..Self::new(Vec::new())
            }
        }
    }

    impl CaptureDevice for ScriptedDevice {
        fn config(&self) -> AudioConfig {
            AudioConfig::default()
        }

        fn start(&mut self, chunks: mpsc::UnboundedSender<Vec<f32>>) -> Result<(), AudioError> {
            if !self.available {
                return Err(AudioError::NoInputDevice);
            }
            for chunk in &self.chunks {
                let _ = chunks.send(chunk.clone());
            }
            self.sender = Some(chunks);
            Ok(())
        }

        fn stop(&mut self) {
            if self.sender.take().is_some() {
                self.releases.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn recorder(device: ScriptedDevice) -> VoiceRecorder<ScriptedDevice> {
        VoiceRecorder::new(device, |_| {}, |_| {})
    }

    #[tokio::test]
    async fn test_unavailable_device_returns_false() {
        let mut rec = recorder(ScriptedDevice::unavailable());
        assert!(!rec.start_recording());
        assert_eq!(rec.state(), RecorderState::Idle);
        assert!(rec.stop_recording().await.is_none());
    }

    #[tokio::test]
    async fn test_stop_assembles_non_empty_chunks() {
        let completed = Arc::new(Mutex::new(None));
        let sink = completed.clone();
        let device = ScriptedDevice::new(vec![vec![0.1, 0.2], Vec::new(), vec![0.3]]);
        let mut rec = VoiceRecorder::new(device, |_| {}, move |clip: &AudioClip| {
            *sink.lock().unwrap() = Some(clip.clone());
        });

        assert!(rec.start_recording());
        assert_eq!(rec.state(), RecorderState::Recording);

        let clip = rec.stop_recording().await.expect("clip");
        assert_eq!(clip.samples, vec![0.1, 0.2, 0.3]);
        assert_eq!(completed.lock().unwrap().as_ref(), Some(&clip));
        assert_eq!(rec.state(), RecorderState::Idle);
    }

    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let mut rec = recorder(ScriptedDevice::new(vec![vec![0.5]]));
        assert!(rec.start_recording());
        assert!(!rec.start_recording());
        assert!(rec.stop_recording().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_reports_elapsed_seconds() {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let sink = ticks.clone();
        let mut rec = VoiceRecorder::new(
            ScriptedDevice::new(Vec::new()),
            move |secs| sink.lock().unwrap().push(secs),
            |_| {},
        );

        assert!(rec.start_recording());
        tokio::time::sleep(Duration::from_millis(3500)).await;

        assert_eq!(*ticks.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(rec.elapsed_seconds(), 3);

        rec.stop_recording().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let device = ScriptedDevice::new(vec![vec![0.5]]);
        let releases = device.releases.clone();
        let mut rec = recorder(device);

        assert!(rec.start_recording());
        rec.cleanup();
        rec.cleanup();

        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert_eq!(rec.state(), RecorderState::Idle);
        assert!(rec.stop_recording().await.is_none());
    }

    #[tokio::test]
    async fn test_restart_resets_elapsed() {
        let mut rec = recorder(ScriptedDevice::new(vec![vec![0.5]]));
        assert!(rec.start_recording());
        rec.seconds.store(7, Ordering::Relaxed);
        rec.stop_recording().await;

        assert!(rec.start_recording());
        assert_eq!(rec.elapsed_seconds(), 0);
        rec.cleanup();
    }
}
