//! One append-only CSV file per calendar day.
//!
//! Files are named `{prefix}{month}-{day}-{year}.csv` (month and day not
//! zero-padded) and start with the header `Time,Draw Amount,Draw Duration`.
//! Rows carry the matched time of day and the draw's volume and duration,
//! both with two decimals. Existing files are appended to, never truncated.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use eyre::WrapErr;
use time::{Date, Time};

use crate::config::DailyLogCfg;
use crate::error::{DrawError, Result};
use crate::session::DrawResult;

pub const HEADER: [&str; 3] = ["Time", "Draw Amount", "Draw Duration"];

/// One completed (or timed-out) draw as written to the day's file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRecord {
    pub time_of_day: Time,
    pub volume: f64,
    pub duration_seconds: f64,
}

impl LogRecord {
    pub fn from_result(time_of_day: Time, result: &DrawResult) -> Self {
        Self {
            time_of_day,
            volume: result.volume,
            duration_seconds: result.duration_seconds,
        }
    }

    fn fields(&self) -> [String; 3] {
        [
            drawctl_config::format_time_of_day(self.time_of_day),
            format!("{:.2}", self.volume),
            format!("{:.2}", self.duration_seconds),
        ]
    }
}

#[derive(Debug)]
pub struct DailyLog {
    cfg: DailyLogCfg,
    /// Last date whose file is known to exist with a header.
    current: Option<Date>,
}

impl DailyLog {
    pub fn new(cfg: DailyLogCfg) -> Self {
        Self { cfg, current: None }
    }

    pub fn file_name(&self, date: Date) -> String {
        format!(
            "{}{}-{}-{}.csv",
            self.cfg.prefix,
            u8::from(date.month()),
            date.day(),
            date.year()
        )
    }

    pub fn path_for(&self, date: Date) -> PathBuf {
        self.cfg.dir.join(self.file_name(date))
    }

    /// Make sure `date`'s file exists and has its header. Returns its path.
    pub fn ensure_file(&mut self, date: Date) -> Result<PathBuf> {
        let path = self.path_for(date);
        if self.current == Some(date) && path.exists() {
            return Ok(path);
        }
        let file = open_append(&path)?;
        let empty = file
            .metadata()
            .map(|m| m.len() == 0)
            .map_err(|e| eyre::Report::new(DrawError::Io(e.to_string())))
            .wrap_err_with(|| format!("stat daily log {}", path.display()))?;
        if empty {
            let mut w = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(file);
            w.write_record(HEADER)
                .and_then(|()| w.flush().map_err(csv::Error::from))
                .map_err(|e| eyre::Report::new(DrawError::Io(e.to_string())))
                .wrap_err_with(|| format!("write header to {}", path.display()))?;
            tracing::info!(path = %path.display(), "created daily log");
        }
        self.current = Some(date);
        Ok(path)
    }

    /// Append one row to `date`'s file, creating it first if needed.
    pub fn append(&mut self, date: Date, record: &LogRecord) -> Result<()> {
        let path = self.ensure_file(date)?;
        let file = open_append(&path)?;
        let mut w = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        w.write_record(record.fields())
            .and_then(|()| w.flush().map_err(csv::Error::from))
            .map_err(|e| eyre::Report::new(DrawError::Io(e.to_string())))
            .wrap_err_with(|| format!("append to daily log {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            time_of_day = %drawctl_config::format_time_of_day(record.time_of_day),
            volume = record.volume,
            duration_s = record.duration_seconds,
            "logged draw"
        );
        Ok(())
    }
}

fn open_append(path: &std::path::Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| eyre::Report::new(DrawError::Io(e.to_string())))
        .wrap_err_with(|| format!("open daily log {}", path.display()))
}
