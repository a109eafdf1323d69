//! Draw schedule table: one `(time of day, target volume)` pair per row.
//!
//! Expected rows (no header required):
//! 06:30:00,0.75
//! 07:15,1.5
//!
//! A first row whose time column does not parse is treated as a header.
use std::io::Read;
use std::path::Path;

use time::Time;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

const HMS: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]:[second]");
const TIME_OF_DAY: &[BorrowedFormatItem<'static>] =
    format_description!("[hour padding:none]:[minute][optional [:[second]]]");

/// One scheduled draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleEntry {
    /// Second-resolution time of day the draw fires at
    pub time_of_day: Time,
    /// Volume to draw; zero or negative entries never fire
    pub target_volume: f64,
}

/// Parse `HH:MM:SS` or `HH:MM` (seconds default to 0). Whitespace is trimmed.
pub fn parse_time_of_day(s: &str) -> eyre::Result<Time> {
    use time::error::{Parse, ParseFromDescription};

    let s = s.trim();
    Time::parse(s, TIME_OF_DAY).map_err(|e| match e {
        Parse::ParseFromDescription(ParseFromDescription::InvalidComponent(name)) => {
            eyre::eyre!("time of day {s:?}: {name} is missing or out of range")
        }
        other => eyre::eyre!("time of day {s:?} must be HH:MM or HH:MM:SS: {other}"),
    })
}

/// Render a time of day as zero-padded `HH:MM:SS`.
pub fn format_time_of_day(t: Time) -> String {
    t.format(HMS)
        .unwrap_or_else(|_| format!("{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second()))
}

/// Read schedule rows from any CSV source.
pub fn read_schedule<R: Read>(src: R) -> eyre::Result<Vec<ScheduleEntry>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(src);

    let mut entries = Vec::new();
    for (idx, rec) in rdr.records().enumerate() {
        let row = idx + 1;
        let rec = rec.map_err(|e| eyre::eyre!("invalid schedule row {row}: {e}"))?;
        let (Some(time_s), Some(volume_s)) = (rec.get(0), rec.get(1)) else {
            eyre::bail!("invalid schedule row {row}: expected time,volume");
        };
        let time_of_day = match parse_time_of_day(time_s) {
            Ok(t) => t,
            Err(_) if idx == 0 => {
                tracing::debug!(header = %time_s, "skipping schedule header row");
                continue;
            }
            Err(e) => eyre::bail!("invalid schedule row {row}: {e}"),
        };
        let target_volume: f64 = volume_s
            .parse()
            .map_err(|e| eyre::eyre!("invalid schedule row {row}: volume {volume_s:?}: {e}"))?;
        if !target_volume.is_finite() {
            eyre::bail!("invalid schedule row {row}: volume must be finite");
        }
        entries.push(ScheduleEntry {
            time_of_day,
            target_volume,
        });
    }
    Ok(entries)
}

pub fn load_schedule_csv(path: &Path) -> eyre::Result<Vec<ScheduleEntry>> {
    let file = std::fs::File::open(path)
        .map_err(|e| eyre::eyre!("open schedule CSV {:?}: {}", path, e))?;
    let entries = read_schedule(file).map_err(|e| eyre::eyre!("{}: {}", path.display(), e))?;
    if entries.is_empty() {
        tracing::warn!(path = %path.display(), "schedule is empty; no draws will fire");
    }
    Ok(entries)
}

/// Write entries as headerless `HH:MM:SS,volume` rows.
pub fn write_schedule_csv(path: &Path, entries: &[ScheduleEntry]) -> eyre::Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| eyre::eyre!("create schedule CSV {:?}: {}", path, e))?;
    for e in entries {
        wtr.write_record([
            format_time_of_day(e.time_of_day),
            e.target_volume.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
