use super::debounce::Debouncer;
use crate::capture::{CaptureRegion, ScreenGrabber};
use crate::error::ScanError;
use crate::result::AnalysisResult;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use image::DynamicImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How long `stop` waits for an in-flight tick to finish
pub const STOP_TIMEOUT: Duration = Duration::from_secs(2);

pub const MIN_INTERVAL: Duration = Duration::from_millis(500);
pub const MAX_INTERVAL: Duration = Duration::from_secs(10);
pub const MIN_SENSITIVITY: u32 = 1;
pub const MAX_SENSITIVITY: u32 = 5;
pub const MIN_CONFIDENCE_THRESHOLD: f32 = 0.1;
pub const MAX_CONFIDENCE_THRESHOLD: f32 = 1.0;

/// Runtime settings read by the loop at the start of every tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSettings {
    pub region: Option<CaptureRegion>,
    pub interval: Duration,
    /// Consecutive identical ticks required to confirm a detection
    pub sensitivity: u32,
    pub confidence_threshold: f32,
    pub max_entities: usize,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            region: None,
            interval: Duration::from_secs(2),
            sensitivity: 2,
            confidence_threshold: 0.6,
            max_entities: 1,
        }
    }
}

impl LoopSettings {
    pub fn set_interval_secs(&mut self, secs: f64) {
        let secs = if secs.is_finite() { secs } else { MIN_INTERVAL.as_secs_f64() };
        self.interval = Duration::from_secs_f64(
            secs.clamp(MIN_INTERVAL.as_secs_f64(), MAX_INTERVAL.as_secs_f64()),
        );
    }

    pub fn set_sensitivity(&mut self, sensitivity: u32) {
        self.sensitivity = sensitivity.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY);
    }

    pub fn set_confidence_threshold(&mut self, threshold: f32) {
        self.confidence_threshold = clamp_confidence_threshold(threshold);
    }

    pub fn set_max_entities(&mut self, max_entities: usize) {
        self.max_entities = clamp_max_entities(max_entities);
    }
}

pub fn clamp_confidence_threshold(threshold: f32) -> f32 {
    if threshold.is_nan() {
        MIN_CONFIDENCE_THRESHOLD
    } else {
        threshold.clamp(MIN_CONFIDENCE_THRESHOLD, MAX_CONFIDENCE_THRESHOLD)
    }
}

pub fn clamp_max_entities(max_entities: usize) -> usize {
    max_entities.clamp(1, crate::resolver::MAX_ENTITIES)
}

/// Identifies the entities in a captured image
pub trait Analyzer: Send + Sync {
    fn analyze(&self, image: &DynamicImage, max_entities: usize, confidence_threshold: f32) -> AnalysisResult;
}

/// A detection seen on enough consecutive ticks
#[derive(Debug, Clone)]
pub struct ConfirmedDetection {
    pub key: String,
    pub result: AnalysisResult,
    pub image: DynamicImage,
    pub tick: u64,
}

/// Receives confirmed detections on the loop thread.
///
/// Implementations must return quickly; the next tick waits for them.
pub trait DetectionConsumer: Send {
    fn on_detection(&mut self, detection: ConfirmedDetection);
}

impl<F> DetectionConsumer for F
where
    F: FnMut(ConfirmedDetection) + Send,
{
    fn on_detection(&mut self, detection: ConfirmedDetection) {
        self(detection)
    }
}

/// Single-slot channel consumer; a detection arriving while the slot is
/// still full is dropped
pub struct ChannelConsumer {
    sender: Sender<ConfirmedDetection>,
}

impl DetectionConsumer for ChannelConsumer {
    fn on_detection(&mut self, detection: ConfirmedDetection) {
        match self.sender.try_send(detection) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                tracing::warn!("Detection '{}' dropped: previous one not yet consumed", dropped.key);
            }
            Err(TrySendError::Disconnected(dropped)) => {
                tracing::warn!("Detection '{}' dropped: receiver is gone", dropped.key);
            }
        }
    }
}

/// A [`ChannelConsumer`] and the receiving end of its slot
pub fn detection_channel() -> (ChannelConsumer, Receiver<ConfirmedDetection>) {
    let (sender, receiver) = crossbeam_channel::bounded(1);
    (ChannelConsumer { sender }, receiver)
}

/// A running live capture loop
pub struct CaptureLoop {
    running: Arc<AtomicBool>,
    shutdown: Sender<()>,
    done: Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureLoop {
    /// Start the loop thread
    pub fn spawn(
        analyzer: Arc<dyn Analyzer>,
        grabber: Arc<dyn ScreenGrabber>,
        settings: Arc<RwLock<LoopSettings>>,
        mut consumer: Box<dyn DetectionConsumer>,
    ) -> Result<Self, ScanError> {
        let running = Arc::new(AtomicBool::new(true));
        let (shutdown, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let (done_tx, done) = crossbeam_channel::bounded::<()>(1);

        let flag = Arc::clone(&running);
        let handle = std::thread::Builder::new()
            .name("capture-loop".to_string())
            .spawn(move || {
                tracing::info!("Capture loop started");
                let mut debouncer = Debouncer::new();
                let mut tick: u64 = 0;

                while flag.load(Ordering::SeqCst) {
                    tick += 1;
                    let started = Instant::now();
                    let current = read_settings(&settings);

                    run_tick(
                        tick,
                        &flag,
                        &current,
                        analyzer.as_ref(),
                        grabber.as_ref(),
                        &mut debouncer,
                        consumer.as_mut(),
                    );

                    let remaining = current.interval.saturating_sub(started.elapsed());
                    match shutdown_rx.recv_timeout(remaining) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                flag.store(false, Ordering::SeqCst);
                tracing::info!("Capture loop stopped after {} ticks", tick);
                let _ = done_tx.send(());
            })
            .map_err(|e| ScanError::Internal(format!("Failed to spawn capture loop: {}", e)))?;

        Ok(Self {
            running,
            shutdown,
            done,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the loop to stop and wait up to [`STOP_TIMEOUT`] for it.
    ///
    /// Returns false if the loop did not finish in time. The thread then
    /// exits after its current tick without notifying the consumer, and a
    /// later `stop` call waits for it again.
    pub fn stop(&mut self) -> bool {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.shutdown.try_send(());

        match self.done.recv_timeout(STOP_TIMEOUT) {
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    "Capture loop did not stop within {:?}; a tick is still in flight",
                    STOP_TIMEOUT
                );
                false
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        tracing::error!("Capture loop thread panicked");
                    }
                }
                true
            }
        }
    }
}

fn read_settings(settings: &RwLock<LoopSettings>) -> LoopSettings {
    *settings.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn run_tick(
    tick: u64,
    running: &AtomicBool,
    settings: &LoopSettings,
    analyzer: &dyn Analyzer,
    grabber: &dyn ScreenGrabber,
    debouncer: &mut Debouncer,
    consumer: &mut dyn DetectionConsumer,
) {
    let Some(region) = settings.region else {
        tracing::warn!("Tick {}: no capture region set", tick);
        return;
    };

    let image = match grabber.grab(&region) {
        Ok(image) => image,
        Err(e) => {
            tracing::warn!("Tick {}: capture failed: {}", tick, e);
            return;
        }
    };

    let started = Instant::now();
    let result = analyzer.analyze(&image, settings.max_entities, settings.confidence_threshold);
    let key = result.detection_key();
    tracing::debug!(
        "Tick {}: {} in {}ms",
        tick,
        key.as_deref().unwrap_or("no detection"),
        started.elapsed().as_millis()
    );

    if let Some(key) = debouncer.observe(key.as_deref(), settings.sensitivity) {
        if !running.load(Ordering::SeqCst) {
            tracing::info!("Tick {}: '{}' discarded, loop is stopping", tick, key);
            return;
        }
        tracing::info!("Confirmed '{}' at tick {}", key, tick);
        consumer.on_detection(ConfirmedDetection {
            key,
            result,
            image,
            tick,
        });
    }
}
