//! dialtrack CLI — dial pointer tracking and percent-open measurement.

mod sequence;

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use dialtrack::{
    calibrate_with_images, measure_image, CenterConfig, ColorMarkerConfig, FrameReport,
    FrameStatus, LineFitConfig, LoopControl, Measurement, NoPicker, Point2, PointerStrategy,
    ReferenceCalibration, Roi, SmoothingMode, Tracker, TrackerConfig,
};

use sequence::ImageSequence;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "dialtrack")]
#[command(about = "Measure dial/damper pointer rotation and map it to percent open")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive center and reference angles from open/closed reference images.
    Calibrate(CliCalibrateArgs),

    /// Measure one image against known reference angles.
    Measure(CliMeasureArgs),

    /// Track a directory of frames and emit one JSON report per frame.
    Track(CliTrackArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct CliCenterArgs {
    /// Manual center x (pixels). Requires --center-y.
    #[arg(long, requires = "center_y")]
    center_x: Option<f64>,

    /// Manual center y (pixels). Requires --center-x.
    #[arg(long, requires = "center_x")]
    center_y: Option<f64>,
}

impl CliCenterArgs {
    fn manual(&self) -> Option<Point2> {
        Some(Point2::new(self.center_x?, self.center_y?))
    }
}

#[derive(Debug, Clone, Args)]
struct CliCalibrateArgs {
    /// Reference image with the damper fully open.
    #[arg(long)]
    open: PathBuf,

    /// Reference image with the damper fully closed.
    #[arg(long)]
    closed: PathBuf,

    /// Path to write the calibration (JSON). Printed to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Tracker configuration (JSON); its marker settings are used.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    center: CliCenterArgs,
}

#[derive(Debug, Clone, Args)]
struct CliMeasureArgs {
    /// Image to measure.
    #[arg(long)]
    image: PathBuf,

    /// Closed reference angle (degrees).
    #[arg(long, allow_hyphen_values = true)]
    closed_angle: f64,

    /// Open reference angle (degrees).
    #[arg(long, allow_hyphen_values = true)]
    open_angle: f64,

    /// Tracker configuration (JSON); its marker settings are used.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Center; detected from the image when omitted.
    #[command(flatten)]
    center: CliCenterArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    ColorMarker,
    LineFit,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SmoothingArg {
    Circular,
    Linear,
}

impl SmoothingArg {
    fn to_core(self) -> SmoothingMode {
        match self {
            Self::Circular => SmoothingMode::Circular,
            Self::Linear => SmoothingMode::Linear,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct CliTrackArgs {
    /// Directory of frame images, processed in file-name order.
    #[arg(long)]
    frames: PathBuf,

    /// Region to track as x,y,width,height. Whole frame when omitted.
    #[arg(long, value_parser = parse_roi)]
    roi: Option<Roi>,

    /// Tracker configuration (JSON). Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pointer detection strategy.
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Angle smoothing mode (linear is the legacy non-circular average).
    #[arg(long, value_enum)]
    smoothing: Option<SmoothingArg>,

    /// Smoothing coefficient in (0, 1].
    #[arg(long)]
    alpha: Option<f64>,

    /// Closed reference angle (degrees).
    #[arg(long, allow_hyphen_values = true)]
    closed_angle: Option<f64>,

    /// Open reference angle (degrees).
    #[arg(long, allow_hyphen_values = true)]
    open_angle: Option<f64>,

    /// Path to write frame reports (JSON lines). Stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    center: CliCenterArgs,
}

impl CliTrackArgs {
    fn to_config(&self) -> CliResult<TrackerConfig> {
        let mut config = load_config(self.config.as_deref())?;
        match self.strategy {
            Some(StrategyArg::ColorMarker)
                if !matches!(config.pointer, PointerStrategy::ColorMarker(_)) =>
            {
                config.pointer = PointerStrategy::ColorMarker(ColorMarkerConfig::default());
            }
            Some(StrategyArg::LineFit)
                if !matches!(config.pointer, PointerStrategy::LineFit(_)) =>
            {
                config.pointer = PointerStrategy::LineFit(LineFitConfig::default());
            }
            _ => {}
        }
        if let Some(mode) = self.smoothing {
            config.smoothing.mode = mode.to_core();
        }
        if let Some(alpha) = self.alpha {
            config.smoothing.alpha = alpha;
        }
        if let Some(c) = self.center.manual() {
            config.center.manual_center = Some(c);
        }
        config.validate()?;
        Ok(config)
    }

    /// Tracker with the merged config and any preset reference angles.
    fn build_tracker(&self) -> CliResult<Tracker> {
        let mut tracker = Tracker::new(self.to_config()?);
        if let Some(a) = self.closed_angle {
            tracker.calibration_mut().set_closed(a);
        }
        if let Some(a) = self.open_angle {
            tracker.calibration_mut().set_open(a);
        }
        Ok(tracker)
    }

    /// Fixed `--roi`, else the whole frame.
    fn selector(&self) -> impl FnMut(&image::RgbImage) -> Option<Roi> {
        let fixed_roi = self.roi;
        move |frame: &image::RgbImage| Some(fixed_roi.unwrap_or_else(|| Roi::full(frame)))
    }
}

fn parse_roi(s: &str) -> Result<Roi, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid ROI '{}': {}", s, e))?;
    match parts[..] {
        [x, y, w, h] if w > 0 && h > 0 => Ok(Roi::new(x, y, w, h)),
        _ => Err(format!(
            "invalid ROI '{}': expected x,y,width,height with non-zero size",
            s
        )),
    }
}

fn load_config(path: Option<&Path>) -> CliResult<TrackerConfig> {
    match path {
        Some(p) => {
            tracing::info!("Loading config: {}", p.display());
            Ok(TrackerConfig::from_json_file(p)?)
        }
        None => Ok(TrackerConfig::default()),
    }
}

fn marker_config(config: &TrackerConfig) -> ColorMarkerConfig {
    match &config.pointer {
        PointerStrategy::ColorMarker(m) => m.clone(),
        PointerStrategy::LineFit(_) => ColorMarkerConfig::default(),
    }
}

fn open_rgb(path: &Path) -> CliResult<image::RgbImage> {
    let img = image::open(path).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", path.display(), e).into()
    })?;
    Ok(img.to_rgb8())
}

fn write_json_out(out: Option<&Path>, json: &str) -> CliResult<()> {
    match out {
        Some(p) => {
            std::fs::write(p, json)?;
            tracing::info!("Results written to {}", p.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Calibrate(args) => run_calibrate(&args),
        Commands::Measure(args) => run_measure(&args),
        Commands::Track(args) => run_track(&args),
    }
}

// ── calibrate ──────────────────────────────────────────────────────────

fn run_calibrate(args: &CliCalibrateArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref())?;
    let open = open_rgb(&args.open)?;
    let closed = open_rgb(&args.closed)?;

    let center_config = CenterConfig {
        manual_center: args.center.manual(),
        ..CenterConfig::for_reference_images()
    };
    let calib = calibrate_with_images(&open, &closed, &center_config, &marker_config(&config))?;

    let json = serde_json::to_string_pretty(&calib)?;
    write_json_out(args.out.as_deref(), &json)
}

// ── measure ────────────────────────────────────────────────────────────

#[derive(serde::Serialize)]
struct MeasureOutput<'a> {
    image: &'a Path,
    #[serde(flatten)]
    measurement: Measurement,
}

fn run_measure(args: &CliMeasureArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref())?;
    let img = open_rgb(&args.image)?;
    let (w, h) = img.dimensions();
    tracing::info!("Image size: {}x{}", w, h);

    let center = match args.center.manual() {
        Some(c) => c,
        None => match dialtrack::detect_center(
            &dialtrack::to_gray(&img),
            &CenterConfig::for_reference_images(),
        ) {
            Ok(dial) => dial.center,
            Err(e) => {
                let mid = Point2::new(w as f64 / 2.0, h as f64 / 2.0);
                tracing::warn!("{}; using image midpoint ({}, {})", e, mid.x, mid.y);
                mid
            }
        },
    };

    let calib = ReferenceCalibration {
        center,
        angle_closed: args.closed_angle,
        angle_open: args.open_angle,
    };
    let measurement = measure_image(&img, &calib, &marker_config(&config));
    match (measurement.angle, measurement.percent_open) {
        (Some(a), Some(p)) => tracing::info!("Angle {:.2}°, {:.1}% open", a, p),
        (Some(a), None) => tracing::warn!("Angle {:.2}°, calibration invalid", a),
        _ => tracing::warn!("Marker not found"),
    }

    let out = MeasureOutput {
        image: &args.image,
        measurement,
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

// ── track ──────────────────────────────────────────────────────────────

fn run_track(args: &CliTrackArgs) -> CliResult<()> {
    let mut tracker = args.build_tracker()?;
    tracing::info!("Pointer strategy: {}", tracker.config().pointer.name());

    let mut source = ImageSequence::from_dir(&args.frames)?;
    if source.is_empty() {
        return Err(format!("no image files in {}", args.frames.display()).into());
    }

    let mut writer: Box<dyn Write> = match &args.out {
        Some(p) => Box::new(std::io::BufWriter::new(std::fs::File::create(p)?)),
        None => Box::new(std::io::stdout().lock()),
    };

    let mut selector = args.selector();
    let mut write_err: Option<CliError> = None;

    let summary = tracker.run(&mut source, &mut selector, &mut NoPicker, |report: &FrameReport| {
        log_report(report);
        let line = serde_json::to_string(report)
            .map_err(CliError::from)
            .and_then(|json| writeln!(writer, "{}", json).map_err(CliError::from));
        match line {
            Ok(()) => LoopControl::Continue,
            Err(e) => {
                write_err = Some(e);
                LoopControl::Stop
            }
        }
    })?;
    if let Some(e) = write_err {
        return Err(e);
    }
    writer.flush()?;

    tracing::info!(
        "Tracked {} frames, {} measured{}",
        summary.frames,
        summary.measured,
        if summary.stopped { " (stopped)" } else { "" }
    );
    Ok(())
}

fn log_report(report: &FrameReport) {
    match (report.status, report.smoothed_angle, report.percent_open) {
        (FrameStatus::Ok, Some(a), Some(p)) => {
            tracing::debug!("frame {}: {:.2}° {:.1}%", report.frame_index, a, p)
        }
        (FrameStatus::CenterNotFound, _, _) => {
            tracing::warn!("frame {}: dial center not found", report.frame_index)
        }
        (status, angle, _) => {
            tracing::debug!("frame {}: {:?} angle={:?}", report.frame_index, status, angle)
        }
    }
}
