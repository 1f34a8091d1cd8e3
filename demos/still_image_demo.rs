//! Still-image vigil pipeline demo
//!
//! Replays one image as a camera stream and drives the whole pipeline:
//! 1. Frames from a `FrameSource`, streamed with `frame_stream`
//! 2. Frame skipping and realtime analysis with the fast model
//! 3. A precise capture halfway through, which pauses analysis
//! 4. Detections mapped into a display of the requested size
//!
//! Usage:
//!   RUST_LOG=info cargo run --bin still_image_demo -- \
//!       --model models/yolo11n.onnx --image street.jpg

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tokio_stream::StreamExt;
use vigil_analyzer::{Analyzer, AnalyzerConfig, AnalyzerEvent, FrameDisposition, RunKind};
use vigil_camera::{frame_stream, Frame, IterSource, PixelFormat, Rotation};
use vigil_detect::{to_display_rect, DisplayTransform, PerformanceLogging};

#[derive(Parser)]
struct CliArgs {
    /// Fast (realtime) ONNX model
    #[arg(long)]
    model: String,

    /// Precise ONNX model; defaults to --model
    #[arg(long)]
    precise_model: Option<String>,

    #[arg(long)]
    image: String,

    #[arg(long, default_value = "24")]
    num_frames: usize,

    #[arg(long, default_value = "5")]
    frames_to_skip: u32,

    /// Clockwise sensor rotation in degrees
    #[arg(long, default_value = "0")]
    rotation: i32,

    #[arg(long, default_value = "1080")]
    view_width: u32,

    #[arg(long, default_value = "1920")]
    view_height: u32,

    #[arg(long)]
    verbose_metrics: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = CliArgs::parse();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(args))
}

async fn run(args: CliArgs) -> Result<()> {
    let fast_model = std::fs::read(&args.model).with_context(|| format!("reading {}", args.model))?;
    let precise_model = match &args.precise_model {
        Some(path) => std::fs::read(path).with_context(|| format!("reading {}", path))?,
        None => fast_model.clone(),
    };

    let rgba = image::open(&args.image)
        .with_context(|| format!("opening {}", args.image))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    let rotation = Rotation::from_degrees(args.rotation)?;
    log::info!("replaying {} ({}x{}, rotated {}°)", args.image, width, height, rotation.degrees());

    let config = AnalyzerConfig {
        frames_to_skip: args.frames_to_skip,
        performance_logging: if args.verbose_metrics {
            PerformanceLogging::Verbose
        } else {
            PerformanceLogging::Basic
        },
        ..Default::default()
    };
    let analyzer = Analyzer::start(config, fast_model, precise_model).await?;

    let frames = (0..args.num_frames)
        .map(|i| {
            Frame::new(rgba.as_raw().clone(), PixelFormat::Rgba8, width, height).map(|f| {
                f.with_rotation(rotation)
                    .with_pts(Duration::from_millis(33 * i as u64))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let stream = frame_stream(IterSource::new(frames.into_iter()));
    tokio::pin!(stream);

    let mut display: Option<DisplayTransform> = None;
    let mut index = 0;
    while let Some(frame) = stream.next().await {
        if index == args.num_frames / 2 && analyzer.switch_to_precise() {
            println!("▶ precise capture requested at frame {}", index);
        }
        match analyzer.submit(frame?) {
            FrameDisposition::Dispatched(kind) => log::debug!("frame {} -> {:?}", index, kind),
            other => log::trace!("frame {} {:?}", index, other),
        }
        index += 1;

        // pace like a 30 fps camera
        tokio::time::sleep(Duration::from_millis(33)).await;
        drain(&analyzer, &args, &mut display)?;
    }

    tokio::time::sleep(Duration::from_millis(500)).await;
    drain(&analyzer, &args, &mut display)?;
    Ok(())
}

fn drain(analyzer: &Analyzer, args: &CliArgs, display: &mut Option<DisplayTransform>) -> Result<()> {
    for event in analyzer.events().try_iter() {
        match event {
            AnalyzerEvent::CameraResolution { width, height } => {
                println!("📷 camera {}x{}", width, height);
                *display = Some(DisplayTransform::fill_center(
                    args.view_width,
                    args.view_height,
                    width,
                    height,
                )?);
            }
            AnalyzerEvent::Result { kind, result } => {
                println!("✅ {:?}: {} detections", kind, result.detections.len());
                for d in &result.detections {
                    let rect = match display.as_ref() {
                        Some(t) => format!("{:?}", to_display_rect(d, &result.letterbox, t)?),
                        None => "-".into(),
                    };
                    println!("   class {:>3} score {:.2} display {}", d.class_index(), d.score(), rect);
                }
                for stage in result.metrics.iter().flatten() {
                    println!("   {:<20} {:?}", stage.stage, stage.duration);
                }
                if let (Some(image), Some(t)) = (&result.image, display.as_ref()) {
                    println!("   frozen background at {:?}", t.background_rect(image.width(), image.height()));
                }
                if kind == RunKind::Precise {
                    analyzer.resume();
                }
            }
            AnalyzerEvent::Failure(msg) => eprintln!("❌ analysis failed: {}", msg),
            AnalyzerEvent::Resumed => println!("▶ resumed"),
        }
    }
    Ok(())
}
