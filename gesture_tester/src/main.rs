use anyhow::Context;
use gesture_vision::core_modules::gesture_descriptor::GestureCatalogue;
use gesture_vision::core_modules::landmark::LandmarkSet;
use gesture_vision::core_modules::overlay::Canvas;
use gesture_vision::core_modules::replay::{self, ReplayLoader, StillVideo};
use gesture_vision::core_modules::synthetic::HandBuilder;
use gesture_vision::core_modules::utils::image_helper;
use gesture_vision::{DetectionPipeline, DetectorConfig, UiBridge, UiView};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

const DEMO_WIDTH: u32 = 640;
const DEMO_HEIGHT: u32 = 480;

/// Hand held still for a few cycles per pose, with gaps where the hand leaves
/// the frame.
fn demo_recording() -> gesture_vision::Result<Vec<Option<LandmarkSet>>> {
    let poses = [
        HandBuilder::new(320.0, 360.0).build()?,
        HandBuilder::victory(320.0, 360.0).build()?,
        HandBuilder::thumbs_up(300.0, 300.0).build()?,
    ];
    let mut frames = Vec::new();
    for pose in poses {
        frames.extend(std::iter::repeat_n(Some(pose), 5));
        frames.extend(std::iter::repeat_n(None, 2));
    }
    Ok(frames)
}

fn print_view(view: &UiView) {
    let bar_len = (view.confidence_fill_percent / 5.0).round() as usize;
    println!(
        "[{}] {:<28} |{:<20}| {:>5.1}% {:?}",
        if view.active { "on " } else { "off" },
        view.message.as_deref().unwrap_or(""),
        "#".repeat(bar_len),
        view.confidence_fill_percent,
        view.confidence_tone,
    );
}

fn save_snapshot(dir: &Path, index: usize, video: &StillVideo, canvas: &Mutex<Canvas>) -> anyhow::Result<PathBuf> {
    use gesture_vision::core_modules::estimator::VideoSource;

    let mut frame = video.frame().context("video has no frame")?;
    {
        let canvas = canvas.lock().unwrap_or_else(|e| e.into_inner());
        image_helper::composite(&mut frame, canvas.image());
    }
    let path = dir.join(format!("snapshot_{index:03}.png"));
    image_helper::save(&path, &frame)?;
    Ok(path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gesture_tester=info,gesture_vision=info".into()),
        )
        .init();

    // --- 1. Argument Parsing & Setup ---
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("Usage: gesture_tester <output_dir> [recording.jsonl] [background.png]");
        println!("Without a recording a built-in demo (open palm, victory, thumbs up) is replayed.");
        return Ok(());
    }
    let output_dir = PathBuf::from(&args[1]);
    std::fs::create_dir_all(&output_dir).with_context(|| format!("creating {}", output_dir.display()))?;

    let config = match env::var("GV_CONFIG") {
        Ok(path) if !path.is_empty() => DetectorConfig::from_file(&path)?.with_env_overrides()?,
        _ => DetectorConfig::from_env()?,
    };

    // --- 2. Replay Collaborators ---
    let frames = match args.get(2) {
        Some(path) => replay::read_recording(path).with_context(|| format!("reading {path}"))?,
        None => {
            let frames = demo_recording()?;
            let path = output_dir.join("demo.jsonl");
            replay::write_recording(&path, &frames)?;
            info!(path = %path.display(), "wrote demo recording");
            frames
        }
    };
    let video = Arc::new(match args.get(3) {
        Some(path) => StillVideo::new(image::open(path).with_context(|| format!("opening {path}"))?.to_rgba8()),
        None => StillVideo::blank(DEMO_WIDTH, DEMO_HEIGHT),
    });
    let canvas = Arc::new(Mutex::new(Canvas::default()));
    let cycles = frames.len();
    let loader = Arc::new(ReplayLoader::new(frames));

    // --- 3. Detection Pipeline ---
    let mut pipeline = DetectionPipeline::new(config.clone(), video.clone(), canvas.clone(), loader)?;
    if let Ok(path) = env::var("GV_CATALOGUE") {
        pipeline = pipeline.with_catalogue(GestureCatalogue::from_file(&path)?);
    }
    let mut bridge = UiBridge::new(pipeline);
    print_view(&bridge.view());

    // --- 4. Replay Loop ---
    bridge.toggle().await?;
    let run_for = config.cycle_period() * (cycles as u32 + 1);
    let deadline = tokio::time::Instant::now() + run_for;
    let mut snapshots = 0;
    loop {
        let Ok(Some(view)) = tokio::time::timeout_at(deadline, bridge.changed()).await else {
            break;
        };
        print_view(&view);
        if view.message.as_deref().is_some_and(|m| m.ends_with("Detected!")) {
            match save_snapshot(&output_dir, snapshots, &video, &canvas) {
                Ok(path) => info!(path = %path.display(), "saved snapshot"),
                Err(e) => warn!(error = %e, "could not save snapshot"),
            }
            snapshots += 1;
        }
    }

    // --- 5. Shutdown ---
    bridge.toggle().await?;
    print_view(&bridge.view());
    let stats = bridge.pipeline().stats();
    println!(
        "Replay complete: {} cycles, {} skipped, {} estimator failures, {} snapshots in {}",
        stats.completed(),
        stats.skipped(),
        stats.estimator_failures(),
        snapshots,
        output_dir.display()
    );
    Ok(())
}
