//! NDJSON detection replay
//!
//! Each input line is one detector record:
//!
//! ```text
//! {"timestamp": 12.40, "face_box": {"x": 210, "y": 120, "width": 180, "height": 180}, "eye_count": 2}
//! {"timestamp": 12.47, "eye_count": 0}
//! {"timestamp": 12.50, "external": {"label": "low_pulse", "level": 3}}
//! ```
//!
//! A record without `face_box` is a frame with no face. A record with
//! `external` injects an alert from an auxiliary sensor instead of a frame.

use crate::MonitorError;
use dms::{AlertLevel, DetectionSource, DmsError, FaceBox, FrameObservation};
use serde::{Deserialize, Serialize};
use signal_filter::TemporalFilter;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Eye-count smoothing applied by the detector
const EYE_COUNT_FILTER_SIZE: usize = 5;

/// Alert raised by a source outside the vision pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalAlert {
    pub label: String,
    pub level: AlertLevel,
}

/// One input line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    pub timestamp: f64,
    #[serde(default)]
    pub face_box: Option<FaceBox>,
    #[serde(default)]
    pub eye_count: u32,
    #[serde(default)]
    pub external: Option<ExternalAlert>,
}

/// Detection source backed by a recorded NDJSON stream
pub struct ReplaySource<R> {
    lines: Lines<R>,
    line_no: usize,
    eye_filter: TemporalFilter,
    pending_external: Vec<ExternalAlert>,
    realtime: bool,
    /// (first record timestamp, wall clock at first record)
    clock_origin: Option<(f64, Instant)>,
    finished: bool,
}

impl ReplaySource<Box<dyn BufRead + Send>> {
    /// Open a file, or stdin for `-`
    pub fn open(path: &Path, realtime: bool) -> Result<Self, MonitorError> {
        let reader: Box<dyn BufRead + Send> = if path == Path::new("-") {
            info!("Replaying detections from stdin");
            Box::new(BufReader::new(std::io::stdin()))
        } else {
            info!("Replaying detections from {}", path.display());
            Box::new(BufReader::new(File::open(path)?))
        };
        Ok(Self::new(reader, realtime))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn new(reader: R, realtime: bool) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            eye_filter: TemporalFilter::new(EYE_COUNT_FILTER_SIZE),
            pending_external: Vec::new(),
            realtime,
            clock_origin: None,
            finished: false,
        }
    }

    /// External alerts read since the last call
    pub fn take_external_alerts(&mut self) -> Vec<ExternalAlert> {
        std::mem::take(&mut self.pending_external)
    }

    fn observe(&mut self, record: ReplayRecord) -> FrameObservation {
        match record.face_box {
            Some(face_box) => {
                let filtered = self.eye_filter.update(record.eye_count as f64);
                FrameObservation::with_face(record.timestamp, face_box, record.eye_count, filtered)
            }
            None => FrameObservation::no_face(record.timestamp),
        }
    }

    /// Sleep until the record's timestamp, relative to the first record
    fn pace(&mut self, timestamp: f64) {
        if !self.realtime {
            return;
        }
        let (origin_ts, origin_wall) = *self.clock_origin.get_or_insert((timestamp, Instant::now()));
        let target = Duration::try_from_secs_f64(timestamp - origin_ts).unwrap_or(Duration::ZERO);
        let elapsed = origin_wall.elapsed();
        if target > elapsed {
            std::thread::sleep(target - elapsed);
        }
    }
}

impl<R: BufRead> DetectionSource for ReplaySource<R> {
    fn next_observation(&mut self) -> Result<Option<FrameObservation>, DmsError> {
        while !self.finished {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.finished = true;
                    return Err(DmsError::Detection(format!("read failed: {e}")));
                }
                None => {
                    self.finished = true;
                    break;
                }
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            let record: ReplayRecord = serde_json::from_str(&line)
                .map_err(|e| DmsError::Detection(format!("line {}: {}", self.line_no, e)))?;

            if let Some(external) = record.external {
                debug!("External alert '{}' on line {}", external.label, self.line_no);
                self.pending_external.push(external);
                continue;
            }

            self.pace(record.timestamp);
            return Ok(Some(self.observe(record)));
        }
        Ok(None)
    }
}
