//! Output formatting and persistence for insights.
//!
//! Supports pretty-printing, JSON files, and CSV timelines.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::insights::TimelineDay;
use chrono::NaiveDate;
use csv::WriterBuilder;
use std::fs::File;
use std::path::Path;

/// Logs any serializable value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Serializes a value to a JSON file, creating parent directories.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), "JSON written");
    Ok(())
}

/// One CSV line of a timeline.
#[derive(Debug, Serialize)]
struct TimelineRow<'a> {
    group: &'a str,
    date: NaiveDate,
    no_scans: usize,
    in_progress: usize,
    received: usize,
    reached_gps: usize,
    reached_and_received: usize,
    validated: usize,
    total: usize,
}

/// Writes timelines as CSV, one row per group and day.
pub fn write_timeline_csv<'a, I>(path: &str, timelines: I) -> Result<()>
where
    I: IntoIterator<Item = (&'a str, &'a [TimelineDay])>,
{
    let file = File::create(path).with_context(|| format!("Failed to create {path}"))?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    let mut rows = 0usize;
    for (group, days) in timelines {
        for day in days {
            let r = &day.repartition;
            writer.serialize(TimelineRow {
                group,
                date: day.date,
                no_scans: r.no_scans,
                in_progress: r.in_progress,
                received: r.received,
                reached_gps: r.reached_gps,
                reached_and_received: r.reached_and_received,
                validated: r.validated,
                total: r.total,
            })?;
            rows += 1;
        }
    }

    writer.flush()?;
    info!(path, rows, "Timeline CSV written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::Repartition;

    #[test]
    fn test_write_timeline_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timeline.csv");
        let path = path.to_str().unwrap();

        let days = vec![
            TimelineDay {
                date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
                repartition: Repartition {
                    no_scans: 1,
                    total: 1,
                    ..Default::default()
                },
            },
            TimelineDay {
                date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
                repartition: Repartition {
                    validated: 1,
                    total: 1,
                    ..Default::default()
                },
            },
        ];

        write_timeline_csv(path, [("P1", days.as_slice())]).unwrap();

        let written = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(
            lines[0],
            "group,date,no_scans,in_progress,received,reached_gps,reached_and_received,validated,total"
        );
        assert_eq!(lines[1], "P1,2024-03-09,1,0,0,0,0,0,1");
        assert_eq!(lines[2], "P1,2024-03-10,0,0,0,0,0,1,1");
    }

    #[test]
    fn test_write_json_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.json");
        write_json(&path, &Repartition::default()).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["total"], 0);
    }
}
