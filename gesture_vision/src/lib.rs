// THEORY:
// This file is the main entry point for the `gesture_vision` library crate.
// It defines the public API exposed to consumers (the `gesture_tester` replay
// tool, or any UI that wants to show live gesture feedback).
//
// The high-level interface is the `DetectionPipeline` (the start/stop detection
// loop) and the `UiBridge` that projects its session state for presentation.
// The geometric building blocks (`core_modules`) are public as well, so callers
// can classify a single landmark set or render an overlay without running the
// periodic loop.

pub mod bridge;
pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use bridge::{ConfidenceTone, UiBridge, UiView};
pub use config::{ClassifierConfig, DetectorConfig};
pub use error::{DetectionError, Result};
pub use pipeline::{DetectionPipeline, PipelineState};
