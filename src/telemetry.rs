//! Per-tick diagnostic records.
//!
//! Each tick produces one line: the time since the previous tick, then the
//! raw, corrected, filtered and mapped poses (24 pose columns). The header
//! is written once when the worker starts.

use crate::types::{Axis, Pose};
use crossbeam_channel::{Receiver, Sender};
use std::io::Write;
use std::time::Instant;

/// Pipeline stages recorded per line, in column order.
pub const STAGES: [&str; 4] = ["raw", "corrected", "filtered", "mapped"];

/// Column-oriented logger, one line per tick.
pub trait TrackLogger: Send {
    fn write(&mut self, s: &str);

    fn write_value(&mut self, v: f64);

    fn write_pose(&mut self, pose: &Pose) {
        for v in pose.0 {
            self.write_value(v);
        }
    }

    /// Write the seconds elapsed since the last [`TrackLogger::reset_dt`].
    fn write_dt(&mut self);

    fn reset_dt(&mut self);

    fn next_line(&mut self);
}

/// Write the `dt, rawTX, ..., mappedRoll` header line.
pub fn write_header(logger: &mut dyn TrackLogger) {
    logger.write("dt");
    for stage in STAGES {
        for axis in Axis::ALL {
            logger.write(&format!("{}{}", stage, axis.name()));
        }
    }
    logger.next_line();
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl TrackLogger for NullLogger {
    fn write(&mut self, _s: &str) {}
    fn write_value(&mut self, _v: f64) {}
    fn write_dt(&mut self) {}
    fn reset_dt(&mut self) {}
    fn next_line(&mut self) {}
}

/// Comma-separated lines to any writer.
///
/// The first I/O error is logged and the logger goes quiet afterwards; a
/// broken sink never stops the pipeline.
pub struct CsvLogger<W: Write + Send> {
    out: W,
    line: Vec<String>,
    since: Instant,
    failed: bool,
}

impl<W: Write + Send> CsvLogger<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            line: Vec::with_capacity(25),
            since: Instant::now(),
            failed: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn flush_line(&mut self) -> crate::Result<()> {
        writeln!(self.out, "{}", self.line.join(","))?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> TrackLogger for CsvLogger<W> {
    fn write(&mut self, s: &str) {
        self.line.push(s.to_string());
    }

    fn write_value(&mut self, v: f64) {
        self.line.push(v.to_string());
    }

    fn write_dt(&mut self) {
        let dt = self.since.elapsed().as_secs_f64();
        self.write_value(dt);
    }

    fn reset_dt(&mut self) {
        self.since = Instant::now();
    }

    fn next_line(&mut self) {
        if !self.failed {
            if let Err(e) = self.flush_line() {
                log::warn!("{}, disabling CSV telemetry", e);
                self.failed = true;
            }
        }
        self.line.clear();
    }
}

/// One column of a [`LogLine`].
#[derive(Debug, Clone, PartialEq)]
pub enum LogField {
    Text(String),
    Value(f64),
}

/// A complete telemetry line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogLine {
    pub fields: Vec<LogField>,
}

impl LogLine {
    /// Numeric columns only, in order.
    pub fn values(&self) -> Vec<f64> {
        self.fields
            .iter()
            .filter_map(|f| match f {
                LogField::Value(v) => Some(*v),
                LogField::Text(_) => None,
            })
            .collect()
    }
}

/// Sends each finished line over a bounded channel.
///
/// Lines are dropped when the receiver falls behind, so a slow consumer
/// cannot stall the tick loop.
pub struct ChannelLogger {
    sender: Sender<LogLine>,
    line: LogLine,
    since: Instant,
    disconnected: bool,
}

impl ChannelLogger {
    pub fn bounded(capacity: usize) -> (ChannelLogger, Receiver<LogLine>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        let logger = ChannelLogger {
            sender,
            line: LogLine::default(),
            since: Instant::now(),
            disconnected: false,
        };
        (logger, receiver)
    }
}

impl TrackLogger for ChannelLogger {
    fn write(&mut self, s: &str) {
        self.line.fields.push(LogField::Text(s.to_string()));
    }

    fn write_value(&mut self, v: f64) {
        self.line.fields.push(LogField::Value(v));
    }

    fn write_dt(&mut self) {
        let dt = self.since.elapsed().as_secs_f64();
        self.write_value(dt);
    }

    fn reset_dt(&mut self) {
        self.since = Instant::now();
    }

    fn next_line(&mut self) {
        let line = std::mem::take(&mut self.line);
        if self.disconnected {
            return;
        }
        if let Err(e) = self.sender.try_send(line) {
            match e {
                crossbeam_channel::TrySendError::Full(_) => {
                    log::trace!("telemetry channel full, dropping line");
                }
                crossbeam_channel::TrySendError::Disconnected(_) => {
                    log::info!("telemetry channel disconnected, no more lines will be sent");
                    self.disconnected = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_columns() {
        let mut csv = CsvLogger::new(Vec::new());
        write_header(&mut csv);
        let text = String::from_utf8(csv.into_inner()).unwrap();
        let cols: Vec<&str> = text.trim_end().split(',').collect();
        assert_eq!(cols.len(), 25);
        assert_eq!(cols[0], "dt");
        assert_eq!(cols[1], "rawTX");
        assert_eq!(cols[12], "correctedRoll");
        assert_eq!(cols[24], "mappedRoll");
    }

    #[test]
    fn test_csv_line() {
        let mut csv = CsvLogger::new(Vec::new());
        csv.write_pose(&Pose::new(1.0, 2.5, -3.0, 0.0, 0.0, 90.0));
        csv.next_line();
        let text = String::from_utf8(csv.into_inner()).unwrap();
        assert_eq!(text, "1,2.5,-3,0,0,90\n");
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk gone"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_csv_write_failure_is_contained() {
        let mut csv = CsvLogger::new(Broken);
        csv.write_value(1.0);
        csv.next_line();
        csv.write_value(2.0);
        csv.next_line();
        assert!(csv.failed);
        assert!(csv.line.is_empty());
    }

    #[test]
    fn test_channel_logger_lines() {
        let (mut logger, rx) = ChannelLogger::bounded(4);
        logger.write_dt();
        logger.write_pose(&Pose::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0));
        logger.next_line();

        let line = rx.try_recv().unwrap();
        let values = line.values();
        assert_eq!(values.len(), 7);
        assert!(values[0] >= 0.0);
        assert_eq!(&values[1..], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_channel_logger_drops_when_full() {
        let (mut logger, rx) = ChannelLogger::bounded(1);
        for i in 0..3 {
            logger.write_value(i as f64);
            logger.next_line();
        }
        assert_eq!(rx.try_recv().unwrap().values(), vec![0.0]);
        assert!(rx.try_recv().is_err());

        drop(rx);
        logger.write_value(9.0);
        logger.next_line();
        assert!(logger.disconnected);
    }
}
