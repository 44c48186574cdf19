// THEORY:
// Replay collaborators stand in for a live camera and a real landmark model.
// A recording is a JSON-lines file: one line per estimator call, each line
// either `null` (no hand that cycle) or an array of 21 `[x, y, z]` points.
//
// `ReplayEstimator` hands the recorded cycles out in order and loops at the
// end; `StillVideo` serves one (replaceable) frame at its native resolution.
// Together they let the full detection loop run headless and deterministic.

use crate::core_modules::estimator::{EstimatorLoader, HandDetection, LandmarkEstimator, VideoFrame, VideoSource};
use crate::core_modules::landmark::LandmarkSet;
use crate::error::{DetectionError, Result};
use futures::future::BoxFuture;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Reads a JSON-lines landmark recording. Blank lines are skipped.
pub fn read_recording(path: impl AsRef<Path>) -> Result<Vec<Option<LandmarkSet>>> {
    let file = std::fs::File::open(path)?;
    let mut frames = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: Option<LandmarkSet> = serde_json::from_str(&line)
            .map_err(|e| DetectionError::Replay(format!("line {}: {e}", line_no + 1)))?;
        frames.push(frame);
    }
    if frames.is_empty() {
        return Err(DetectionError::Replay("recording has no frames".into()));
    }
    Ok(frames)
}

pub fn write_recording(path: impl AsRef<Path>, frames: &[Option<LandmarkSet>]) -> Result<()> {
    let mut out = BufWriter::new(std::fs::File::create(path)?);
    for frame in frames {
        serde_json::to_writer(&mut out, frame)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Serves recorded hands one cycle at a time, looping forever.
pub struct ReplayEstimator {
    frames: Vec<Option<LandmarkSet>>,
    cursor: AtomicUsize,
}

impl ReplayEstimator {
    pub fn new(frames: Vec<Option<LandmarkSet>>) -> Self {
        Self { frames, cursor: AtomicUsize::new(0) }
    }

    /// Number of estimate calls served so far.
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

impl LandmarkEstimator for ReplayEstimator {
    fn estimate<'a>(&'a self, _frame: &'a VideoFrame) -> BoxFuture<'a, Result<Vec<HandDetection>>> {
        Box::pin(async move {
            if self.frames.is_empty() {
                return Ok(Vec::new());
            }
            let i = self.cursor.fetch_add(1, Ordering::SeqCst) % self.frames.len();
            Ok(self.frames[i].clone().map(|l| HandDetection::new(l, 1.0)).into_iter().collect())
        })
    }
}

/// Loads a shared `ReplayEstimator`, optionally after a simulated delay.
pub struct ReplayLoader {
    estimator: Arc<ReplayEstimator>,
    delay: Duration,
}

impl ReplayLoader {
    pub fn new(frames: Vec<Option<LandmarkSet>>) -> Self {
        Self { estimator: Arc::new(ReplayEstimator::new(frames)), delay: Duration::ZERO }
    }

    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn estimator(&self) -> Arc<ReplayEstimator> {
        Arc::clone(&self.estimator)
    }
}

impl EstimatorLoader for ReplayLoader {
    fn load(&self) -> BoxFuture<'_, Result<Arc<dyn LandmarkEstimator>>> {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            debug!(frames = self.estimator.frames.len(), "replay estimator loaded");
            let estimator: Arc<dyn LandmarkEstimator> = self.estimator.clone();
            Ok(estimator)
        })
    }
}

/// A video source showing one still frame. The frame (and with it the
/// resolution) can be swapped at any time.
pub struct StillVideo {
    frame: Mutex<VideoFrame>,
    ready: AtomicBool,
}

impl StillVideo {
    pub fn new(frame: VideoFrame) -> Self {
        Self { frame: Mutex::new(frame), ready: AtomicBool::new(true) }
    }

    /// An opaque black frame.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(VideoFrame::from_pixel(width, height, image::Rgba([0, 0, 0, 255])))
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn set_frame(&self, frame: VideoFrame) {
        *self.frame.lock().unwrap_or_else(|e| e.into_inner()) = frame;
    }
}

impl VideoSource for StillVideo {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn resolution(&self) -> (u32, u32) {
        self.frame.lock().unwrap_or_else(|e| e.into_inner()).dimensions()
    }

    fn frame(&self) -> Option<VideoFrame> {
        Some(self.frame.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::synthetic::HandBuilder;

    #[tokio::test]
    async fn replay_loops_over_recording() {
        let hand = HandBuilder::victory(10.0, 10.0).build().unwrap();
        let loader = ReplayLoader::new(vec![Some(hand.clone()), None]);
        let estimator = loader.load().await.unwrap();
        let frame = VideoFrame::new(1, 1);

        let first = estimator.estimate(&frame).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].landmarks, hand);
        assert!(estimator.estimate(&frame).await.unwrap().is_empty());
        assert_eq!(estimator.estimate(&frame).await.unwrap().len(), 1);
        assert_eq!(loader.estimator().calls(), 3);
    }

    #[test]
    fn recording_survives_disk() {
        let frames = vec![Some(HandBuilder::thumbs_up(5.0, 6.0).build().unwrap()), None];
        let path = std::env::temp_dir().join(format!("gesture_vision_replay_{}.jsonl", std::process::id()));
        write_recording(&path, &frames).unwrap();
        let loaded = read_recording(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.len(), 2);
        assert!(loaded[1].is_none());
        let a = loaded[0].as_ref().unwrap().points();
        let b = frames[0].as_ref().unwrap().points();
        for (p, q) in a.iter().zip(b.iter()) {
            assert!((p.x - q.x).abs() < 1e-4 && (p.y - q.y).abs() < 1e-4);
        }
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let path = std::env::temp_dir().join(format!("gesture_vision_bad_{}.jsonl", std::process::id()));
        std::fs::write(&path, "null\n[[1,2,3]]\n").unwrap();
        let err = read_recording(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn still_video_tracks_frame_size() {
        let video = StillVideo::blank(640, 480);
        assert!(video.is_ready());
        assert_eq!(video.resolution(), (640, 480));
        video.set_frame(VideoFrame::new(320, 240));
        assert_eq!(video.resolution(), (320, 240));
        video.set_ready(false);
        assert!(!video.is_ready());
    }
}
