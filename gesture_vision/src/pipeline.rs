// THEORY:
// The `pipeline` module is the top-level API of the engine: a two-state
// (Idle / Running) detection loop that ties the collaborators together.
//
//     video frame -> estimator -> classifier -> session (message, confidence)
//                        \-------------------> overlay renderer -> surface
//
// Key architectural principles:
// 1.  **Explicit loop, not callbacks**: `start` spawns one task that ticks at
//     the configured period and runs each cycle to completion before waiting
//     for the next tick. A tick that fires while a cycle is still waiting on
//     the estimator is skipped, so at most one estimator call is ever in flight
//     and results are applied in order.
// 2.  **Cooperative cancellation**: every run has a `CancelToken`. The token is
//     checked before any result is applied, and the session writer re-checks
//     it under its own lock. `stop` cancels the token, aborts the task, and
//     waits for it to finish, so once `stop` returns no cycle can start and no
//     stale result can land.
// 3.  **Failures stay local**: a load failure leaves the pipeline Idle with a
//     message for the user; a failed estimate is logged and treated as "no
//     hand"; a video source that is not ready yet makes the cycle a no-op. A
//     cycle that panics is logged and counted, and the loop keeps ticking.

use crate::config::DetectorConfig;
use crate::core_modules::classifier::{GestureClassifier, reported_match};
use crate::core_modules::estimator::{EstimatorLoader, LandmarkEstimator, VideoSource, first_hand};
use crate::core_modules::gesture_descriptor::GestureCatalogue;
use crate::core_modules::overlay::{DrawingSurface, OverlayRenderer, OverlayStyle};
use crate::core_modules::session::{CycleHandle, CycleOutcome, LOAD_FAILED_MESSAGE, SessionReader, SessionWriter};
use crate::error::{DetectionError, Result};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// The drawing surface shared between the loop and whoever displays it.
pub type SharedSurface = Arc<Mutex<dyn DrawingSurface + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
}

/// Counters of what the loop has done since the pipeline was created.
#[derive(Debug, Default)]
pub struct CycleStats {
    /// Cycles that ran the estimator and rendered.
    pub(crate) completed: AtomicU64,
    /// Cycles skipped because the video was not ready.
    pub(crate) skipped: AtomicU64,
    /// Estimate calls that failed and were treated as "no hand".
    pub(crate) estimator_failures: AtomicU64,
    /// Cycle results thrown away because their run had been cancelled.
    pub(crate) discarded: AtomicU64,
    /// Cycles that panicked and were abandoned.
    pub(crate) panicked: AtomicU64,
}

impl CycleStats {
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::SeqCst)
    }

    pub fn estimator_failures(&self) -> u64 {
        self.estimator_failures.load(Ordering::SeqCst)
    }

    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::SeqCst)
    }

    pub fn panicked(&self) -> u64 {
        self.panicked.load(Ordering::SeqCst)
    }
}

/// A one-shot cancellation flag that can also be awaited.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<(AtomicBool, Notify)>,
}

impl CancelToken {
    pub fn cancel(&self) {
        self.inner.0.store(true, Ordering::SeqCst);
        self.inner.1.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.0.load(Ordering::SeqCst)
    }

    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.1.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

struct RunningLoop {
    run_id: u64,
    token: CancelToken,
    task: JoinHandle<()>,
}

/// Everything one run's task needs, moved into the task at `start`.
struct CycleContext {
    video: Arc<dyn VideoSource>,
    surface: SharedSurface,
    estimator: Arc<dyn LandmarkEstimator>,
    classifier: Arc<GestureClassifier>,
    renderer: OverlayRenderer,
    session: CycleHandle,
    report_threshold: f32,
    stats: Arc<CycleStats>,
    token: CancelToken,
}

impl CycleContext {
    async fn run(self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                outcome = AssertUnwindSafe(self.cycle()).catch_unwind() => {
                    if outcome.is_err() {
                        error!(run = self.session.run_id(), "detection cycle panicked, skipping it");
                        self.stats.panicked.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        }
        debug!(run = self.session.run_id(), "detection loop exited");
    }

    async fn cycle(&self) {
        if !self.video.is_ready() {
            self.stats.skipped.fetch_add(1, Ordering::SeqCst);
            return;
        }
        let Some(frame) = self.video.frame() else {
            self.stats.skipped.fetch_add(1, Ordering::SeqCst);
            return;
        };

        let (width, height) = self.video.resolution();
        self.surface.lock().unwrap_or_else(PoisonError::into_inner).resize(width, height);

        let landmarks = match self.estimator.estimate(&frame).await {
            Ok(detections) => first_hand(detections),
            Err(e) => {
                warn!(error = %e, "landmark estimation failed, treating cycle as no hand");
                self.stats.estimator_failures.fetch_add(1, Ordering::SeqCst);
                None
            }
        };

        if self.token.is_cancelled() {
            self.stats.discarded.fetch_add(1, Ordering::SeqCst);
            return;
        }

        if let Some(hand) = landmarks.as_ref() {
            let matches = self.classifier.classify(Some(hand));
            let outcome = match reported_match(&matches, self.report_threshold) {
                Some(winner) => {
                    debug!(gesture = %winner.name, score = winner.score, "gesture detected");
                    CycleOutcome::detected(&winner.name, winner.score)
                }
                None => CycleOutcome::unrecognized(),
            };
            let token = &self.token;
            if !self.session.apply(outcome, || !token.is_cancelled()) {
                self.stats.discarded.fetch_add(1, Ordering::SeqCst);
                return;
            }
        }

        let mut surface = self.surface.lock().unwrap_or_else(PoisonError::into_inner);
        if self.token.is_cancelled() {
            self.stats.discarded.fetch_add(1, Ordering::SeqCst);
            return;
        }
        self.renderer.render(landmarks.as_ref(), &mut *surface);
        self.stats.completed.fetch_add(1, Ordering::SeqCst);
    }
}

/// The detection scheduler: owns the collaborators, the session writer, and
/// the running loop.
pub struct DetectionPipeline {
    config: DetectorConfig,
    classifier: Arc<GestureClassifier>,
    renderer: OverlayRenderer,
    video: Arc<dyn VideoSource>,
    surface: SharedSurface,
    loader: Arc<dyn EstimatorLoader>,
    session: SessionWriter,
    stats: Arc<CycleStats>,
    running: Option<RunningLoop>,
}

impl DetectionPipeline {
    pub fn new(
        config: DetectorConfig,
        video: Arc<dyn VideoSource>,
        surface: SharedSurface,
        loader: Arc<dyn EstimatorLoader>,
    ) -> Result<Self> {
        config.validate()?;
        let classifier = GestureClassifier::new(GestureCatalogue::default(), config.classifier.clone());
        Ok(Self {
            config,
            classifier: Arc::new(classifier),
            renderer: OverlayRenderer::default(),
            video,
            surface,
            loader,
            session: SessionWriter::new(),
            stats: Arc::new(CycleStats::default()),
            running: None,
        })
    }

    /// Replaces the gesture catalogue. Takes effect on the next `start`.
    pub fn with_catalogue(mut self, catalogue: GestureCatalogue) -> Self {
        self.classifier = Arc::new(GestureClassifier::new(catalogue, self.config.classifier.clone()));
        self
    }

    pub fn with_overlay_style(mut self, style: OverlayStyle) -> Self {
        self.renderer = OverlayRenderer::new(style);
        self
    }

    pub fn state(&self) -> PipelineState {
        if self.running.is_some() { PipelineState::Running } else { PipelineState::Idle }
    }

    pub fn session(&self) -> SessionReader {
        self.session.reader()
    }

    pub fn surface(&self) -> SharedSurface {
        Arc::clone(&self.surface)
    }

    pub fn stats(&self) -> Arc<CycleStats> {
        Arc::clone(&self.stats)
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Acquires the estimator and starts the periodic loop. Only valid while
    /// Idle. On a load failure the pipeline stays Idle and the session shows
    /// "Failed to load model"; the caller may simply try again.
    pub async fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(DetectionError::AlreadyRunning);
        }

        info!("loading landmark estimator");
        let estimator = match self.loader.load().await {
            Ok(estimator) => estimator,
            Err(e) => {
                error!(error = %e, "failed to load landmark estimator");
                self.session.publish_message(LOAD_FAILED_MESSAGE);
                return Err(e);
            }
        };

        let run_id = self.session.begin_run();
        let token = CancelToken::default();
        let context = CycleContext {
            video: Arc::clone(&self.video),
            surface: Arc::clone(&self.surface),
            estimator,
            classifier: Arc::clone(&self.classifier),
            renderer: self.renderer.clone(),
            session: self.session.cycle_handle(run_id),
            report_threshold: self.config.report_threshold,
            stats: Arc::clone(&self.stats),
            token: token.clone(),
        };
        let task = tokio::spawn(context.run(self.config.cycle_period()));
        self.running = Some(RunningLoop { run_id, token, task });

        info!(run = run_id, period_ms = self.config.cycle_period_ms, "detection started");
        Ok(())
    }

    /// Stops the loop. Returns `false` (and does nothing) when already Idle.
    /// Once this returns, no cycle runs and no in-flight result is applied.
    pub async fn stop(&mut self) -> bool {
        let Some(running) = self.running.take() else {
            debug!("stop requested while idle");
            return false;
        };
        running.token.cancel();
        running.task.abort();
        if let Err(e) = running.task.await {
            if e.is_panic() {
                error!(run = running.run_id, "detection loop panicked: {e}");
            }
        }
        self.session.end_run();
        info!(run = running.run_id, "detection stopped");
        true
    }

    /// Starts when Idle, stops when Running. Returns the new state.
    pub async fn toggle(&mut self) -> Result<PipelineState> {
        match self.state() {
            PipelineState::Idle => self.start().await?,
            PipelineState::Running => {
                self.stop().await;
            }
        }
        Ok(self.state())
    }
}

impl Drop for DetectionPipeline {
    fn drop(&mut self) {
        // Never leave a loop ticking against a surface nobody owns.
        if let Some(running) = self.running.take() {
            running.token.cancel();
            running.task.abort();
        }
    }
}
