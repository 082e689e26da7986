//! Driver Monitor - Main Entry Point

use alerting::{AlertEscalator, SoundWorker, TerminalBell};
use clap::Parser;
use monitor::{init_logging, run_replay, MonitorConfig, MonitoringSession, ReplaySource};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Replay face/eye detections through the drowsiness pipeline
#[derive(Parser)]
#[command(name = "dms-monitor")]
#[command(version)]
#[command(about = "Driver drowsiness monitor", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Detection stream, NDJSON (use - for stdin)
    #[arg(short, long, default_value = "-")]
    input: PathBuf,

    /// Calibrate on the first seconds of input
    #[arg(long)]
    calibrate: bool,

    /// Replay at the pace of the recorded timestamps
    #[arg(long)]
    realtime: bool,

    /// Disable audible alerts
    #[arg(long)]
    no_sound: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = MonitorConfig::load(cli.config.as_deref())?;
    config.perform_calibration |= cli.calibrate;
    if cli.no_sound {
        config.alert.sound_enabled = false;
    }

    init_logging(&config.logging)?;
    info!("=== Driver Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let (escalator, sound_worker) = if config.alert.sound_enabled {
        let (tx, handle) =
            SoundWorker::new(Arc::new(TerminalBell), &config.alert).spawn(config.alert.queue_depth);
        (AlertEscalator::new(tx), Some(handle))
    } else {
        (AlertEscalator::silent(), None)
    };

    let mut session = MonitoringSession::new(&config.dms, escalator)?;
    let mut source = ReplaySource::open(&cli.input, cli.realtime)?;
    let calibrate = config.perform_calibration;

    // The frame loop is synchronous; keep it off the runtime's worker threads
    let summary = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        run_replay(&mut session, &mut source, calibrate, &mut out)
    })
    .await??;

    // The session (and its sender) is gone, so the worker drains and exits
    if let Some(handle) = sound_worker {
        handle.await?;
    }

    info!(
        "Processed {} frames ({} without face), {} audible alerts",
        summary.frames, summary.frames_without_face, summary.notifications
    );
    Ok(())
}
