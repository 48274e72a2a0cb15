//! Loading and saving box collections.
//!
//! A dataset is a JSON document `{"boxes": [...]}`, optionally
//! gzip-compressed. Scans can also be imported from CSV, one row per scan.

use crate::model::{DeliveryBox, Location, NewScan, ScanCoords};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use tracing::{debug, info};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub boxes: Vec<DeliveryBox>,
}

/// Decodes a dataset from raw bytes, inflating them first if gzip-compressed.
pub fn parse_dataset(bytes: &[u8]) -> Result<Dataset> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut json = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut json)
            .context("Failed to inflate gzip dataset")?;
        return Ok(serde_json::from_slice(&json)?);
    }
    Ok(serde_json::from_slice(bytes)?)
}

/// Reads a dataset file.
pub fn load(path: &str) -> Result<Dataset> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read dataset {path}"))?;
    let dataset = parse_dataset(&bytes).with_context(|| format!("Invalid dataset {path}"))?;
    info!(path, boxes = dataset.boxes.len(), "Dataset loaded");
    Ok(dataset)
}

/// Writes a dataset file, gzip-compressed when `gzip` is set.
pub fn save(path: &str, dataset: &Dataset, gzip: bool) -> Result<()> {
    let json = serde_json::to_vec_pretty(dataset)?;
    let body = if gzip {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        encoder.finish()?
    } else {
        json
    };
    std::fs::write(path, body).with_context(|| format!("Failed to write dataset {path}"))?;
    info!(path, boxes = dataset.boxes.len(), gzip, "Dataset saved");
    Ok(())
}

/// A single row of a scan import CSV.
#[derive(Debug, Deserialize)]
pub(crate) struct ScanRow {
    pub(crate) id: String,
    pub(crate) box_id: String,
    /// Epoch milliseconds.
    pub(crate) time: i64,
    pub(crate) latitude: Option<f64>,
    pub(crate) longitude: Option<f64>,
    pub(crate) accuracy: Option<f64>,
    #[serde(default)]
    pub(crate) marked_as_received: bool,
    pub(crate) comment: Option<String>,
    pub(crate) operator_id: Option<String>,
}

impl ScanRow {
    pub(crate) fn into_new_scan(self) -> Result<NewScan> {
        let time = DateTime::<Utc>::from_timestamp_millis(self.time)
            .with_context(|| format!("scan {} has out-of-range time {}", self.id, self.time))?;

        let location = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Location {
                coords: ScanCoords {
                    latitude,
                    longitude,
                    accuracy: self.accuracy,
                },
                timestamp: None,
            }),
            _ => None,
        };

        Ok(NewScan {
            id: self.id,
            box_id: self.box_id,
            time,
            location,
            marked_as_received: self.marked_as_received,
            comment: self.comment.filter(|c| !c.is_empty()),
            operator_id: self.operator_id.filter(|o| !o.is_empty()),
        })
    }
}

/// Reads scans from a CSV reader with a header row.
pub fn read_scan_rows<R: Read>(reader: R) -> Result<Vec<NewScan>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut scans = Vec::new();

    for result in rdr.deserialize() {
        let row: ScanRow = result?;
        scans.push(row.into_new_scan()?);
    }

    debug!(rows = scans.len(), "Scan rows parsed");
    Ok(scans)
}

/// Reads scans from a CSV file.
pub fn load_scan_rows(path: &str) -> Result<Vec<NewScan>> {
    let file = File::open(path).with_context(|| format!("Failed to open scan file {path}"))?;
    read_scan_rows(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &str = r#"{
        "boxes": [
            {
                "id": "b1",
                "project": "P1",
                "district": "Gasabo",
                "school": "GS Kacyiru",
                "destination": {"latitude": -1.94, "longitude": 30.06},
                "content": {"books": 40},
                "scans": [
                    {
                        "id": "s1",
                        "boxId": "b1",
                        "time": 1700000000000,
                        "location": {"coords": {"latitude": -1.94, "longitude": 30.06, "accuracy": 4.0}},
                        "markedAsReceived": true,
                        "finalDestination": true
                    }
                ],
                "statusChanges": {"validated": {"scan": "s1", "time": 1700000000000}},
                "progress": "validated"
            }
        ]
    }"#;

    #[test]
    fn test_parse_plain_json() {
        let dataset = parse_dataset(DATASET.as_bytes()).unwrap();
        let b = &dataset.boxes[0];
        assert_eq!(b.scans.len(), 1);
        assert!(b.scans[0].final_destination);
        assert!(b.is_validated());
        assert_eq!(b.progress, crate::model::Stage::Validated);
    }

    #[test]
    fn test_parse_gzip_json() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(DATASET.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();

        let dataset = parse_dataset(&compressed).unwrap();
        assert_eq!(dataset.boxes[0].id, "b1");
    }

    #[test]
    fn test_parse_invalid_bytes() {
        assert!(parse_dataset(b"{not json").is_err());
        assert!(parse_dataset(&[0x1f, 0x8b, 0x00, 0x01]).is_err());
    }

    #[test]
    fn test_save_and_load_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boxes.json.gz");
        let path = path.to_str().unwrap();

        let dataset = parse_dataset(DATASET.as_bytes()).unwrap();
        save(path, &dataset, true).unwrap();

        let raw = std::fs::read(path).unwrap();
        assert!(raw.starts_with(&GZIP_MAGIC));
        assert_eq!(load(path).unwrap().boxes, dataset.boxes);
    }

    #[test]
    fn test_read_scan_rows() {
        let csv = "\
id,box_id,time,latitude,longitude,accuracy,marked_as_received,comment,operator_id
s1,b1,1700000000000,-1.94,30.06,5.0,false,,op-1
s2,b1,1700000100000,,,,true,left at gate,
";
        let scans = read_scan_rows(csv.as_bytes()).unwrap();
        assert_eq!(scans.len(), 2);

        assert_eq!(scans[0].location.as_ref().unwrap().coords.accuracy, Some(5.0));
        assert_eq!(scans[0].comment, None);
        assert_eq!(scans[0].operator_id.as_deref(), Some("op-1"));

        assert!(scans[1].location.is_none());
        assert!(scans[1].marked_as_received);
        assert_eq!(scans[1].comment.as_deref(), Some("left at gate"));
        assert_eq!(scans[1].time.timestamp_millis(), 1_700_000_100_000);
    }
}
