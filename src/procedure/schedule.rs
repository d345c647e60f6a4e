//! Draw schedule parsing.
//!
//! One row per draw event: `HH:MM, volume_gallons, flow_rate_gpm`. The
//! time is elapsed from test start, converted to seconds. Entries are
//! assumed ascending by time; this is not enforced.

use crate::error::{BenchError, BenchResult};
use std::io::Read;
use std::path::Path;

/// One scheduled draw event. Immutable after load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleEntry {
    /// Seconds from test start at which the draw is dispatched.
    pub at_secs: f64,
    /// Target volume in gallons.
    pub volume_gal: f64,
    /// Target flow rate in gallons per minute.
    pub rate_gpm: f64,
}

/// Reads the draw schedule from a file.
pub fn parse_schedule(path: &Path) -> BenchResult<Vec<ScheduleEntry>> {
    let file = std::fs::File::open(path)
        .map_err(|e| BenchError::Schedule(format!("cannot open {}: {e}", path.display())))?;
    parse_schedule_from(file)
}

/// Reads a schedule from any CSV source.
pub fn parse_schedule_from<R: Read>(reader: R) -> BenchResult<Vec<ScheduleEntry>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut entries = Vec::new();
    for (line, record) in csv_reader.records().enumerate() {
        let record = record?;
        entries.push(parse_entry(&record).map_err(|e| {
            BenchError::Schedule(format!("row {}: {e}", line + 1))
        })?);
    }
    Ok(entries)
}

fn parse_entry(record: &csv::StringRecord) -> Result<ScheduleEntry, String> {
    if record.len() != 3 {
        return Err(format!("expected 3 fields, got {}", record.len()));
    }
    let (hours, minutes) = record[0]
        .split_once(':')
        .ok_or_else(|| format!("bad time '{}'", &record[0]))?;
    let hours: u32 = hours
        .trim()
        .parse()
        .map_err(|_| format!("bad hours '{hours}'"))?;
    let minutes: u32 = minutes
        .trim()
        .parse()
        .map_err(|_| format!("bad minutes '{minutes}'"))?;
    let volume_gal: f64 = record[1]
        .parse()
        .map_err(|_| format!("bad volume '{}'", &record[1]))?;
    let rate_gpm: f64 = record[2]
        .parse()
        .map_err(|_| format!("bad rate '{}'", &record[2]))?;
    Ok(ScheduleEntry {
        at_secs: f64::from(hours * 3600 + minutes * 60),
        volume_gal,
        rate_gpm,
    })
}
