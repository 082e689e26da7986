//! Driver Monitor
//!
//! Wires the detection source, drowsiness pipeline and alert escalator into a
//! monitoring session, and provides configuration loading and logging setup
//! for the `dms-monitor` binary.

pub mod config;
pub mod replay;
pub mod session;

pub use config::{LoggingConfig, MonitorConfig};
pub use replay::{ExternalAlert, ReplayRecord, ReplaySource};
pub use session::{FrameReport, MonitoringSession, SessionSummary};

use dms::{CalibrationResult, DetectionSource, DmsError};
use serde::Serialize;
use std::io::{BufRead, Write};
use thiserror::Error;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

/// Monitor error types
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("DMS error: {0}")]
    Dms(#[from] DmsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown log level '{0}'")]
    LogLevel(String),

    #[error("Failed to set tracing subscriber: {0}")]
    Logging(#[from] SetGlobalDefaultError),
}

/// One NDJSON output line
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputRecord<'a> {
    Calibration(&'a CalibrationResult),
    Frame(&'a FrameReport),
    Summary(&'a SessionSummary),
}

/// Initialize logging. Logs go to stderr; stdout carries results.
pub fn init_logging(config: &LoggingConfig) -> Result<(), MonitorError> {
    let level = config.max_level()?;
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn write_record<W: Write>(out: &mut W, record: &OutputRecord<'_>) -> Result<(), MonitorError> {
    serde_json::to_writer(&mut *out, record)?;
    out.write_all(b"\n")?;
    Ok(())
}

/// Run a session over a replayed detection stream, writing NDJSON to `out`
pub fn run_replay<R: BufRead, W: Write>(
    session: &mut MonitoringSession,
    source: &mut ReplaySource<R>,
    calibrate: bool,
    out: &mut W,
) -> Result<SessionSummary, MonitorError> {
    let mut pending = None;
    if calibrate {
        let outcome = session.calibrate_stream(source);
        match &outcome.result {
            Some(result) => write_record(out, &OutputRecord::Calibration(result))?,
            None => warn!("Keeping EAR threshold {:.3}", session.ear_threshold()),
        }
        pending = outcome.next_frame;
    }

    loop {
        let next = match pending.take() {
            Some(observation) => Ok(Some(observation)),
            None => source.next_observation(),
        };
        let observation = match next {
            Ok(Some(observation)) => observation,
            Ok(None) => break,
            Err(e) => {
                warn!("Skipping input: {}", e);
                continue;
            }
        };

        for external in source.take_external_alerts() {
            session.trigger_external(external.label, external.level);
        }

        match session.process(&observation) {
            Ok(report) => write_record(out, &OutputRecord::Frame(&report))?,
            Err(e) => warn!("Rejected frame at {:.3}s: {}", observation.timestamp, e),
        }
        out.flush()?;
    }

    for external in source.take_external_alerts() {
        session.trigger_external(external.label, external.level);
    }

    let summary = session.summary();
    write_record(out, &OutputRecord::Summary(&summary))?;
    out.flush()?;

    info!(
        "Session {} finished: {} frames, peak level {}",
        summary.session_id,
        summary.frames,
        summary.peak_level.as_u8()
    );
    Ok(summary)
}
