//! focusd - Focus Kernel daemon
//!
//! This daemon:
//! 1. Opens the configured camera (synthetic stub or still image)
//! 2. Runs the inference backend on every frame
//! 3. Decodes detections and measures DCT sharpness
//! 4. Drives the lens with the hill-climb autofocus controller
//! 5. Logs frames that pass the capture gate (trigger present, focus locked)
//!
//! Typing `f` followed by Enter on stdin restarts the autofocus sweep.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use focus_kernel::{
    Camera, ClassList, FocusPipeline, FocusdConfig, FrameReport, FrameSource, InferenceBackend,
    ModelResolution, StubBackend,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Stop after this many frames (runs until Ctrl-C when omitted).
    #[arg(long)]
    max_frames: Option<u64>,
    /// Class shown by the stub backend when no model path is configured.
    #[arg(long, default_value_t = 0)]
    subject_class: usize,
    /// First frame on which the stub subject appears.
    #[arg(long, default_value_t = 1)]
    subject_from: u64,
    /// Frame on which the stub subject disappears.
    #[arg(long, default_value_t = u64::MAX)]
    subject_until: u64,
    /// Process frames as fast as possible instead of pacing to target_fps.
    #[arg(long)]
    no_pacing: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = FocusdConfig::load()?;

    let mut camera = Camera::open(&config.camera_config())?;
    let mut backend = open_backend(&config, &args)?;
    backend.warm_up()?;
    let mut pipeline = FocusPipeline::new(config.decoder_config(), config.autofocus)?;
    pipeline.start(&mut camera)?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))
        .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;
    let refocus_requested = spawn_refocus_listener();

    log::info!(
        "focusd running. camera={} backend={} model={}x{} classes={}",
        config.camera.url,
        backend.name(),
        config.model.width,
        config.model.height,
        config.model.class_count
    );

    let frame_interval = Duration::from_secs_f64(1.0 / config.camera.target_fps as f64);
    let mut processed = 0u64;
    let mut skipped = 0u64;
    let mut captures = 0u64;
    let mut last_health_log = Instant::now();

    while running.load(Ordering::SeqCst) {
        if args.max_frames.is_some_and(|max| processed + skipped >= max) {
            break;
        }
        let tick = Instant::now();

        if refocus_requested.swap(false, Ordering::SeqCst) {
            log::info!("manual refocus requested");
            if let Err(e) = pipeline.refocus(&mut camera) {
                log::warn!("manual refocus failed: {}", e);
            }
        }

        let frame = camera.next_frame()?;
        let output = match backend.infer(&frame) {
            Ok(output) => output,
            Err(e) => {
                log::warn!("frame {} skipped: inference failed: {}", frame.sequence, e);
                skipped += 1;
                continue;
            }
        };
        log::debug!(
            "frame {}: inference took {:.1} ms",
            frame.sequence,
            output.elapsed.as_secs_f64() * 1000.0
        );

        let report = match pipeline.process(&frame, &output.tensor, &mut camera) {
            Ok(report) => report,
            Err(e) => {
                log::warn!("frame {} skipped: {}", frame.sequence, e);
                skipped += 1;
                continue;
            }
        };
        processed += 1;
        log_report(&report, config.model.classes.as_ref());
        if report.capture {
            captures += 1;
        }

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            log::info!(
                "health: processed={} skipped={} captures={} episode={} lens={:.3}",
                processed,
                skipped,
                captures,
                pipeline.controller().episode(),
                pipeline.controller().lens_position()
            );
            last_health_log = Instant::now();
        }

        if !args.no_pacing {
            if let Some(remaining) = frame_interval.checked_sub(tick.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
    }

    log::info!(
        "focusd stopped. processed={} skipped={} captures={}",
        processed,
        skipped,
        captures
    );
    Ok(())
}

/// Watch stdin for `f` lines and raise the returned flag for each one.
fn spawn_refocus_listener() -> Arc<AtomicBool> {
    let requested = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&requested);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().eq_ignore_ascii_case("f") {
                flag.store(true, Ordering::SeqCst);
            }
        }
    });
    requested
}

fn open_backend(config: &FocusdConfig, args: &Args) -> Result<Box<dyn InferenceBackend>> {
    let resolution = ModelResolution::from_dims(config.model.width, config.model.height)?;
    match &config.model.path {
        #[cfg(feature = "backend-tract")]
        Some(path) => Ok(Box::new(focus_kernel::detect::TractBackend::new(
            path,
            resolution,
            config.model.class_count,
        )?)),
        #[cfg(not(feature = "backend-tract"))]
        Some(path) => Err(anyhow!(
            "model {} configured but focusd was built without the backend-tract feature",
            path.display()
        )),
        None => {
            log::warn!("no model path configured, using the stub backend");
            let backend = StubBackend::new(resolution, config.model.class_count)
                .with_subject(args.subject_class, args.subject_from..args.subject_until);
            Ok(Box::new(backend))
        }
    }
}

fn log_report(report: &FrameReport, classes: Option<&ClassList>) {
    if report.refocused {
        log::info!(
            "frame {}: trigger object appeared, autofocus restarted",
            report.sequence
        );
    }
    for detection in &report.batch.detections {
        let label = match classes {
            Some(classes) => classes.label(detection),
            None => format!("class{}:{:.2}", detection.class_id, detection.confidence),
        };
        log::debug!(
            "frame {}: {} at ({}, {}, {}x{})",
            report.sequence,
            label,
            detection.bbox.left,
            detection.bbox.top,
            detection.bbox.width,
            detection.bbox.height
        );
    }
    log::debug!(
        "frame {}: sharpness={:.4} command={:?} phase={:?}",
        report.sequence,
        report.sharpness,
        report.command,
        report.phase
    );
    if report.capture {
        log::info!(
            "frame {}: capture ({} detections, sharpness {:.4})",
            report.sequence,
            report.batch.len(),
            report.sharpness
        );
    }
}
