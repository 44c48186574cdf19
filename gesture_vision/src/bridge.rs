// THEORY:
// The `UiBridge` is the presentation layer's only door into the engine. It
// exposes a read-only projection of the session and a single command, `toggle`.
// It holds no business logic: confidence maps to a fill percentage and to one
// of two tones around the 0.9 line, and the toggle label mirrors the pipeline
// state.

use crate::core_modules::session::{DetectionSessionState, SessionReader};
use crate::error::Result;
use crate::pipeline::{DetectionPipeline, PipelineState};

const HIGH_CONFIDENCE: f32 = 0.9;

/// Visual treatment of the confidence bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceTone {
    /// Confidence strictly above 0.9.
    High,
    /// Confidence at or below 0.9.
    Low,
}

/// Everything a UI needs to draw the detection controls.
#[derive(Debug, Clone, PartialEq)]
pub struct UiView {
    pub message: Option<String>,
    /// Width of the confidence bar, 0 to 100.
    pub confidence_fill_percent: f32,
    pub confidence_tone: ConfidenceTone,
    pub active: bool,
    pub toggle_label: &'static str,
}

impl From<&DetectionSessionState> for UiView {
    fn from(state: &DetectionSessionState) -> Self {
        let confidence = state.confidence.clamp(0.0, 1.0);
        Self {
            message: state.message.clone(),
            confidence_fill_percent: confidence * 100.0,
            confidence_tone: if confidence > HIGH_CONFIDENCE { ConfidenceTone::High } else { ConfidenceTone::Low },
            active: state.active,
            toggle_label: if state.active { "Stop Detection" } else { "Start Detection" },
        }
    }
}

pub struct UiBridge {
    pipeline: DetectionPipeline,
    reader: SessionReader,
}

impl UiBridge {
    pub fn new(pipeline: DetectionPipeline) -> Self {
        let reader = pipeline.session();
        Self { pipeline, reader }
    }

    /// The user's start/stop control.
    pub async fn toggle(&mut self) -> Result<PipelineState> {
        self.pipeline.toggle().await
    }

    pub fn view(&self) -> UiView {
        UiView::from(&self.reader.current())
    }

    /// Waits for the session to change and returns the new view. `None` once
    /// the pipeline is gone.
    pub async fn changed(&mut self) -> Option<UiView> {
        self.reader.changed().await.map(|state| UiView::from(&state))
    }

    pub fn pipeline(&self) -> &DetectionPipeline {
        &self.pipeline
    }

    /// Stops detection (if running) and hands the pipeline back.
    pub async fn shutdown(mut self) -> DetectionPipeline {
        self.pipeline.stop().await;
        self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(active: bool, message: Option<&str>, confidence: f32) -> DetectionSessionState {
        DetectionSessionState { active, message: message.map(str::to_string), confidence }
    }

    #[test]
    fn idle_view() {
        let view = UiView::from(&DetectionSessionState::default());
        assert_eq!(view.message.as_deref(), Some("idle"));
        assert_eq!(view.confidence_fill_percent, 0.0);
        assert_eq!(view.confidence_tone, ConfidenceTone::Low);
        assert_eq!(view.toggle_label, "Start Detection");
    }

    #[test]
    fn confidence_maps_to_fill_and_tone() {
        let view = UiView::from(&state(true, Some("ThumbsUpGesture Detected!"), 0.95));
        assert!((view.confidence_fill_percent - 95.0).abs() < 1e-4);
        assert_eq!(view.confidence_tone, ConfidenceTone::High);
        assert_eq!(view.toggle_label, "Stop Detection");

        let view = UiView::from(&state(true, None, 0.9));
        assert_eq!(view.confidence_tone, ConfidenceTone::Low);
        assert!(view.message.is_none());
    }

    #[test]
    fn fill_is_clamped() {
        assert_eq!(UiView::from(&state(true, None, 1.7)).confidence_fill_percent, 100.0);
        assert_eq!(UiView::from(&state(true, None, -0.2)).confidence_fill_percent, 0.0);
    }
}
