//! Presence Monitor
//!
//! Replays a directory of frames through a tracking session and prints one
//! JSON snapshot per line on stdout. Logs go to stderr.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use camera_capture::{CameraConfig, ReplayCamera};
use clap::{Parser, ValueEnum};
use engagement::{
    ChannelSink, EngagementEngine, EngagementSnapshot, EngineConfig, SessionSummary,
    TrackingSession,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Snapshots buffered between the tick loop and the printer
const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

/// Built-in configuration presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    Default,
    Responsive,
    Steady,
}

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "presence-monitor", version, about = "Replay frames through the presence engine")]
pub struct MonitorArgs {
    /// Directory of frame images (png, jpg, bmp), replayed in name order
    pub frames: PathBuf,

    /// Engine configuration file (TOML, YAML or JSON)
    #[arg(short, long, conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Built-in configuration preset
    #[arg(short, long, value_enum)]
    pub preset: Option<Preset>,

    /// Replay rate; also sets the tick interval
    #[arg(long, default_value_t = 10)]
    pub fps: u32,

    /// Resize frames to this width (requires --height)
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Resize frames to this height (requires --width)
    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Print the session summary as JSON after the last snapshot
    #[arg(long)]
    pub summary: bool,
}

/// Initialize logging; `RUST_LOG` overrides the default `info` level
pub fn init_logging(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow!("failed to install tracing subscriber: {}", e))
}

/// Engine configuration for the given arguments
pub fn resolve_config(args: &MonitorArgs) -> Result<EngineConfig> {
    let mut config = match (&args.config, args.preset) {
        (Some(path), _) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        (None, Some(Preset::Responsive)) => EngineConfig::responsive(),
        (None, Some(Preset::Steady)) => EngineConfig::steady(),
        (None, Some(Preset::Default) | None) => EngineConfig::default(),
    };

    if args.fps == 0 {
        return Err(anyhow!("--fps must be at least 1"));
    }
    config.tick_interval_ms = camera_config(args).frame_interval_ms().max(1);
    let needed = config.observations_per_window();
    if config.stabilizer.observation_capacity < needed {
        debug!(needed, "Growing observation capacity to cover the window");
        config.stabilizer.observation_capacity = needed;
    }
    config.validate().context("invalid engine configuration")?;
    Ok(config)
}

/// Capture settings for the replayed directory; frames keep their size
/// unless both dimensions are given
pub fn camera_config(args: &MonitorArgs) -> CameraConfig {
    CameraConfig {
        device: args.frames.to_string_lossy().into_owned(),
        fps: args.fps,
        width: args.width.unwrap_or(0),
        height: args.height.unwrap_or(0),
        ..Default::default()
    }
}

/// Replay the frame directory and stream snapshots to `out`
pub async fn run<W>(args: &MonitorArgs, out: W) -> Result<SessionSummary>
where
    W: Write + Send + 'static,
{
    let config = resolve_config(args)?;
    let engine = EngagementEngine::new(config, None).context("failed to build engine")?;
    let camera = ReplayCamera::from_config(&camera_config(args))
        .with_context(|| format!("failed to open frame directory {}", args.frames.display()))?;

    let (tx, rx) = mpsc::channel(SNAPSHOT_CHANNEL_CAPACITY);
    let session = TrackingSession::start(engine, camera, ChannelSink::new(tx))
        .await
        .context("failed to start tracking")?;
    info!(session_id = %session.id(), frames = %args.frames.display(), "Replay started");

    let cancel = session.cancellation();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping tracking");
            cancel.cancel();
        }
    });

    let printer = tokio::spawn(print_snapshots(rx, out));
    let summary = session.wait().await.context("tracking session failed")?;
    interrupt.abort();

    let printed = printer.await.context("snapshot printer failed")??;
    if printed != summary.snapshots {
        warn!(printed, delivered = summary.snapshots, "Some snapshots were not printed");
    }
    Ok(summary)
}

async fn print_snapshots<W: Write>(
    mut rx: mpsc::Receiver<EngagementSnapshot>,
    mut out: W,
) -> Result<u64> {
    let mut printed = 0;
    while let Some(snapshot) = rx.recv().await {
        let line = serde_json::to_string(&snapshot).context("failed to encode snapshot")?;
        writeln!(out, "{}", line).context("failed to write snapshot")?;
        printed += 1;
    }
    out.flush().context("failed to flush output")?;
    Ok(printed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Shared in-memory writer
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn args(extra: &[&str]) -> MonitorArgs {
        let mut argv = vec!["presence-monitor", "frames"];
        argv.extend_from_slice(extra);
        MonitorArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_fps_sets_tick_interval() {
        let config = resolve_config(&args(&["--fps", "20"])).unwrap();
        assert_eq!(config.tick_interval_ms, 50);
    }

    #[test]
    fn test_high_fps_grows_observation_capacity() {
        let config = resolve_config(&args(&["--fps", "100"])).unwrap();
        assert_eq!(config.tick_interval_ms, 10);
        assert_eq!(config.stabilizer.observation_capacity, 200);
    }

    #[test]
    fn test_preset_selection() {
        let config = resolve_config(&args(&["--preset", "steady"])).unwrap();
        assert!(!config.stabilizer.lenient_reentry);
    }

    #[test]
    fn test_config_and_preset_conflict() {
        let result = MonitorArgs::try_parse_from([
            "presence-monitor",
            "frames",
            "--config",
            "a.toml",
            "--preset",
            "steady",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_camera_config_size() {
        let native = camera_config(&args(&[]));
        assert_eq!((native.width, native.height), (0, 0));
        assert_eq!(native.device, "frames");

        let sized = camera_config(&args(&["--width", "320", "--height", "240"]));
        assert_eq!((sized.width, sized.height), (320, 240));
        assert!(MonitorArgs::try_parse_from(["presence-monitor", "frames", "--width", "320"]).is_err());
    }

    #[test]
    fn test_zero_fps_rejected() {
        assert!(resolve_config(&args(&["--fps", "0"])).is_err());
    }

    #[tokio::test]
    async fn test_replays_directory_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..3u32 {
            let img = image::RgbImage::from_fn(48, 36, |x, y| {
                let v = if ((x + i) / 4 + y / 4) % 2 == 0 { 50 } else { 200 };
                image::Rgb([v, v, v])
            });
            img.save(dir.path().join(format!("frame_{:03}.png", i))).unwrap();
        }

        let args = MonitorArgs::try_parse_from([
            "presence-monitor",
            dir.path().to_str().unwrap(),
            "--fps",
            "50",
        ])
        .unwrap();
        let out = Captured::default();
        let summary = run(&args, out.clone()).await.unwrap();

        assert_eq!(summary.snapshots, 3);
        let text = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["timestamp"], 0);
        assert!(first.get("focusScore").is_some());
    }

    #[tokio::test]
    async fn test_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let args = MonitorArgs::try_parse_from([
            "presence-monitor",
            dir.path().join("nope").to_str().unwrap(),
        ])
        .unwrap();
        assert!(run(&args, Captured::default()).await.is_err());
    }
}
