// THEORY:
// The session is the one piece of state shared between the detection loop and
// the presentation layer. Ownership is explicit:
//
// - `SessionWriter` is the single writer. It is owned by the pipeline, which
//   mutates the state from `start`, `stop`, and cycle completion.
// - `SessionReader` is a cheap, cloneable read handle for the UI.
//
// Both sides sit on a `tokio::sync::watch` channel, so readers can either
// sample the latest state or await the next change.
//
// Cycle results carry the id of the run that produced them. They are applied
// through a conditional update that runs under the channel's lock and rejects
// results from a run that is no longer current (or a session that is no longer
// active). The current run id only changes under that same lock, so a result
// that arrives after `stop`, or after a stop and a fresh `start`, can never be
// applied.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Run id meaning "no run is live".
const NO_RUN: u64 = 0;

pub const IDLE_MESSAGE: &str = "idle";
pub const STARTED_MESSAGE: &str = "Detection Started!";
pub const STOPPED_MESSAGE: &str = "Detection Stopped!";
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load model";

/// What the UI shows about detection.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSessionState {
    pub active: bool,
    pub message: Option<String>,
    /// Score of the reported gesture, in [0, 1].
    pub confidence: f32,
}

impl Default for DetectionSessionState {
    fn default() -> Self {
        Self { active: false, message: Some(IDLE_MESSAGE.to_string()), confidence: 0.0 }
    }
}

/// Outcome of one cycle that saw a hand.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub message: Option<String>,
    pub confidence: f32,
}

impl CycleOutcome {
    pub fn detected(name: &str, confidence: f32) -> Self {
        Self { message: Some(format!("{name} Detected!")), confidence }
    }

    pub fn unrecognized() -> Self {
        Self { message: None, confidence: 0.0 }
    }
}

pub struct SessionWriter {
    sender: watch::Sender<DetectionSessionState>,
    /// Id of the most recent run.
    last_run: u64,
    /// Id of the live run, or `NO_RUN`. Written only under the channel lock.
    live_run: Arc<AtomicU64>,
}

impl SessionWriter {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(DetectionSessionState::default());
        Self { sender, last_run: NO_RUN, live_run: Arc::new(AtomicU64::new(NO_RUN)) }
    }

    pub fn reader(&self) -> SessionReader {
        SessionReader { receiver: self.sender.subscribe() }
    }

    pub fn snapshot(&self) -> DetectionSessionState {
        self.sender.borrow().clone()
    }

    /// Marks the session active and returns the id of the new run.
    pub fn begin_run(&mut self) -> u64 {
        self.last_run += 1;
        let run_id = self.last_run;
        let live_run = &self.live_run;
        self.sender.send_modify(|state| {
            live_run.store(run_id, Ordering::SeqCst);
            *state = DetectionSessionState {
                active: true,
                message: Some(STARTED_MESSAGE.to_string()),
                confidence: 0.0,
            };
        });
        run_id
    }

    /// Closes the current run; results still in flight are rejected from now on.
    pub fn end_run(&mut self) {
        let live_run = &self.live_run;
        self.sender.send_modify(|state| {
            live_run.store(NO_RUN, Ordering::SeqCst);
            *state = DetectionSessionState {
                active: false,
                message: Some(STOPPED_MESSAGE.to_string()),
                confidence: 0.0,
            };
        });
    }

    pub fn publish_message(&self, message: &str) {
        self.sender.send_modify(|state| state.message = Some(message.to_string()));
    }

    /// A handle the cycle task uses to apply results of run `run_id`.
    pub fn cycle_handle(&self, run_id: u64) -> CycleHandle {
        CycleHandle { sender: self.sender.clone(), live_run: Arc::clone(&self.live_run), run_id }
    }
}

impl Default for SessionWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies one run's cycle results.
pub struct CycleHandle {
    sender: watch::Sender<DetectionSessionState>,
    live_run: Arc<AtomicU64>,
    run_id: u64,
}

impl CycleHandle {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Applies `outcome` if the session is active, this handle's run is the
    /// live one, and `still_wanted()` holds, all checked under the channel
    /// lock. Returns whether the outcome was accepted.
    pub fn apply(&self, outcome: CycleOutcome, still_wanted: impl FnOnce() -> bool) -> bool {
        let mut applied = false;
        self.sender.send_if_modified(|state| {
            if !state.active || self.live_run.load(Ordering::SeqCst) != self.run_id || !still_wanted() {
                return false;
            }
            let changed = state.message != outcome.message || state.confidence != outcome.confidence;
            state.message = outcome.message;
            state.confidence = outcome.confidence;
            applied = true;
            changed
        });
        applied
    }
}

/// Read-only view of the session.
#[derive(Clone)]
pub struct SessionReader {
    receiver: watch::Receiver<DetectionSessionState>,
}

impl SessionReader {
    pub fn current(&self) -> DetectionSessionState {
        self.receiver.borrow().clone()
    }

    /// Waits for the next change and returns the new state. `None` once the
    /// writer is gone.
    pub async fn changed(&mut self) -> Option<DetectionSessionState> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let writer = SessionWriter::new();
        assert_eq!(
            writer.reader().current(),
            DetectionSessionState { active: false, message: Some("idle".into()), confidence: 0.0 }
        );
    }

    #[test]
    fn outcome_messages() {
        assert_eq!(CycleOutcome::detected("ThumbsUpGesture", 1.0).message.as_deref(), Some("ThumbsUpGesture Detected!"));
        assert_eq!(CycleOutcome::unrecognized(), CycleOutcome { message: None, confidence: 0.0 });
    }

    #[test]
    fn results_apply_only_to_the_live_run() {
        let mut writer = SessionWriter::new();
        let run = writer.begin_run();
        let handle = writer.cycle_handle(run);

        assert!(handle.apply(CycleOutcome::detected("VictoryGesture", 0.95), || true));
        assert_eq!(writer.snapshot().confidence, 0.95);

        writer.end_run();
        assert!(!handle.apply(CycleOutcome::detected("VictoryGesture", 1.0), || true));
        let state = writer.snapshot();
        assert!(!state.active);
        assert_eq!(state.confidence, 0.0);
        assert_eq!(state.message.as_deref(), Some(STOPPED_MESSAGE));
    }

    #[test]
    fn cancelled_run_is_rejected_even_while_active() {
        let mut writer = SessionWriter::new();
        let run = writer.begin_run();
        let handle = writer.cycle_handle(run);
        assert!(!handle.apply(CycleOutcome::detected("VictoryGesture", 1.0), || false));
        assert_eq!(writer.snapshot().message.as_deref(), Some(STARTED_MESSAGE));
    }

    #[test]
    fn handle_from_a_previous_run_is_rejected_after_restart() {
        let mut writer = SessionWriter::new();
        let first_run = writer.begin_run();
        let first = writer.cycle_handle(first_run);
        writer.end_run();
        let second_run = writer.begin_run();
        let second = writer.cycle_handle(second_run);
        assert_eq!(second.run_id(), second_run);

        assert!(!first.apply(CycleOutcome::detected("VictoryGesture", 1.0), || true));
        assert_eq!(writer.snapshot().message.as_deref(), Some(STARTED_MESSAGE));
        assert!(second.apply(CycleOutcome::detected("ThumbsUpGesture", 0.97), || true));
        assert_eq!(writer.snapshot().message.as_deref(), Some("ThumbsUpGesture Detected!"));
    }

    #[tokio::test]
    async fn readers_observe_changes() {
        let mut writer = SessionWriter::new();
        let mut reader = writer.reader();
        writer.begin_run();
        let state = reader.changed().await.unwrap();
        assert!(state.active);
        drop(writer);
        assert!(reader.changed().await.is_none());
    }
}
