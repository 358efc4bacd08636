//! Periodic fleet telemetry as append-only text lines.
//!
//! Line layout is a contract with downstream analysis tools:
//!
//! ```text
//! # elapsed_ms;id,company,status,flight_time_h,miles,soc_pct,charger,charge_time_h,faults,charge_sessions
//! 300000;0,0,0,0.0833,10.000,97.50,0,0.0000,0,0;1,1,1,...
//! ```
//!
//! Company and status are numeric codes, charger is 0 when none is assigned.

use crate::fleet::AircraftSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

pub const HEADER: &str =
    "# elapsed_ms;id,company,status,flight_time_h,miles,soc_pct,charger,charge_time_h,faults,charge_sessions";

pub trait TelemetrySink: Send {
    fn append_line(&mut self, line: &str) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Buffered append-mode file sink.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TelemetrySink for FileSink {
    fn append_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// In-memory sink. Clones share the same line buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl TelemetrySink for MemorySink {
    fn append_line(&mut self, line: &str) -> io::Result<()> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_owned());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn append_line(&mut self, _line: &str) -> io::Result<()> {
        Ok(())
    }
}

/// One sample of the whole fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    pub elapsed_ms: u64,
    pub aircraft: Vec<AircraftSnapshot>,
}

impl TelemetryFrame {
    pub fn new(elapsed_ms: u64, aircraft: Vec<AircraftSnapshot>) -> Self {
        Self { elapsed_ms, aircraft }
    }
}

impl fmt::Display for TelemetryFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.elapsed_ms)?;
        for a in &self.aircraft {
            write!(
                f,
                ";{},{},{},{:.4},{:.3},{:.2},{},{:.4},{},{}",
                a.id.0,
                a.company.code(),
                a.status.code(),
                a.flight_time_hours,
                a.miles_flown,
                a.battery_soc,
                a.assigned_charger.map_or(0, |c| c.get()),
                a.charge_time_hours,
                a.fault_count,
                a.charge_sessions,
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    pub frames_written: u32,
    pub write_errors: u32,
    pub last_elapsed_ms: u64,
}

/// Writes frames to a sink. I/O failures are logged and counted, never
/// propagated.
pub struct TelemetryRecorder {
    sink: Box<dyn TelemetrySink>,
    header_written: bool,
    stats: TelemetryStats,
}

impl TelemetryRecorder {
    pub fn new(sink: Box<dyn TelemetrySink>) -> Self {
        Self {
            sink,
            header_written: false,
            stats: TelemetryStats::default(),
        }
    }

    pub fn record(&mut self, frame: &TelemetryFrame) -> bool {
        if !self.header_written {
            if let Err(e) = self.sink.append_line(HEADER) {
                self.stats.write_errors += 1;
                warn!("Failed to write telemetry header: {}", e);
                return false;
            }
            self.header_written = true;
        }

        match self.sink.append_line(&frame.to_string()) {
            Ok(()) => {
                self.stats.frames_written += 1;
                self.stats.last_elapsed_ms = frame.elapsed_ms;
                debug!(elapsed_ms = frame.elapsed_ms, aircraft = frame.aircraft.len(), "telemetry frame written");
                true
            }
            Err(e) => {
                self.stats.write_errors += 1;
                warn!(elapsed_ms = frame.elapsed_ms, "Failed to write telemetry frame: {}", e);
                false
            }
        }
    }

    pub fn flush(&mut self) {
        if let Err(e) = self.sink.flush() {
            self.stats.write_errors += 1;
            warn!("Failed to flush telemetry: {}", e);
        }
    }

    pub fn stats(&self) -> &TelemetryStats {
        &self.stats
    }
}

impl fmt::Debug for TelemetryRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryRecorder")
            .field("header_written", &self.header_written)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{AircraftId, AircraftStatus, ChargerId, Company};

    fn snapshot(id: usize) -> AircraftSnapshot {
        AircraftSnapshot {
            id: AircraftId(id),
            company: Company::Charlie,
            passengers: 3,
            status: AircraftStatus::Charging,
            prev_status: None,
            battery_soc: 9.5,
            flight_time_hours: 1.25,
            miles_flown: 200.0,
            charge_time_hours: 0.5,
            completed_charge_time_hours: 0.25,
            fault_count: 2,
            assigned_charger: ChargerId::new(3),
            flights: 2,
            charge_sessions: 1,
        }
    }

    struct FailingSink;

    impl TelemetrySink for FailingSink {
        fn append_line(&mut self, _line: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
    }

    #[test]
    fn test_frame_line_layout() {
        let frame = TelemetryFrame::new(300_000, vec![snapshot(0), snapshot(1)]);
        assert_eq!(
            frame.to_string(),
            "300000;0,2,2,1.2500,200.000,9.50,3,0.5000,2,1;1,2,2,1.2500,200.000,9.50,3,0.5000,2,1"
        );
    }

    #[test]
    fn test_unassigned_charger_is_zero() {
        let mut idle = snapshot(4);
        idle.assigned_charger = None;
        idle.status = AircraftStatus::InFlight;
        let line = TelemetryFrame::new(0, vec![idle]).to_string();
        let fields: Vec<_> = line.split(';').nth(1).unwrap().split(',').collect();
        assert_eq!(fields[2], "0");
        assert_eq!(fields[6], "0");
    }

    #[test]
    fn test_header_written_once() {
        let sink = MemorySink::new();
        let mut recorder = TelemetryRecorder::new(Box::new(sink.clone()));
        recorder.record(&TelemetryFrame::new(0, vec![snapshot(0)]));
        recorder.record(&TelemetryFrame::new(5000, vec![snapshot(0)]));

        let lines = sink.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert!(lines[2].starts_with("5000;"));
        assert_eq!(recorder.stats().frames_written, 2);
        assert_eq!(recorder.stats().last_elapsed_ms, 5000);
    }

    #[test]
    fn test_write_errors_are_counted_not_raised() {
        let mut recorder = TelemetryRecorder::new(Box::new(FailingSink));
        assert!(!recorder.record(&TelemetryFrame::new(0, vec![snapshot(0)])));
        assert!(!recorder.record(&TelemetryFrame::new(1, vec![snapshot(0)])));
        recorder.flush();
        assert_eq!(recorder.stats().write_errors, 2);
        assert_eq!(recorder.stats().frames_written, 0);
    }

    #[test]
    fn test_null_sink_accepts_everything() {
        let mut recorder = TelemetryRecorder::new(Box::new(NullSink));
        assert!(recorder.record(&TelemetryFrame::new(10, Vec::new())));
        assert_eq!(recorder.stats().frames_written, 1);
    }
}
