//! Box, scan and status records.
//!
//! JSON field names follow the camelCase layout the surrounding service
//! stores (`statusChanges`, `markedAsReceived`, ...). Instants are UTC and
//! serialized as epoch milliseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Destination coordinates of a box (the school).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// `0,0` is what an unfilled destination looks like in imported data.
    pub fn is_unset(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

/// Position reported by the scanning device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanCoords {
    pub latitude: f64,
    pub longitude: f64,
    /// Reported accuracy radius in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl ScanCoords {
    pub fn point(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub coords: ScanCoords,
    /// When the device took the fix, as opposed to when the scan was ingested.
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A scan as it arrives from the ingestion endpoint, before classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScan {
    pub id: String,
    pub box_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub marked_as_received: bool,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub operator_id: Option<String>,
}

/// A stored, classified scan.
///
/// Everything except `final_destination` is immutable once written; that bit
/// is recomputed when the destination of the box is corrected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scan {
    pub id: String,
    pub box_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub marked_as_received: bool,
    #[serde(default)]
    pub final_destination: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_id: Option<String>,
}

impl Scan {
    pub fn coords(&self) -> Option<&ScanCoords> {
        self.location.as_ref().map(|l| &l.coords)
    }
}

/// Delivery stage of a box, declared in precedence order.
///
/// The derived `Ord` is the precedence rank used by progress resolution.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    #[default]
    NoScans,
    InProgress,
    Received,
    ReachedGps,
    ReachedAndReceived,
    Validated,
}

impl Stage {
    /// The stages a [`StatusRecord`] can hold, in precedence order.
    pub const RECORDED: [Stage; 5] = [
        Stage::InProgress,
        Stage::Received,
        Stage::ReachedGps,
        Stage::ReachedAndReceived,
        Stage::Validated,
    ];

    /// Every stage including `NoScans`, in precedence order.
    pub const ALL: [Stage; 6] = [
        Stage::NoScans,
        Stage::InProgress,
        Stage::Received,
        Stage::ReachedGps,
        Stage::ReachedAndReceived,
        Stage::Validated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::NoScans => "noScans",
            Stage::InProgress => "inProgress",
            Stage::Received => "received",
            Stage::ReachedGps => "reachedGps",
            Stage::ReachedAndReceived => "reachedAndReceived",
            Stage::Validated => "validated",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The scan that moved a box into a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub scan: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub time: DateTime<Utc>,
}

impl StatusChange {
    pub fn of(scan: &Scan) -> Self {
        Self {
            scan: scan.id.clone(),
            time: scan.time,
        }
    }
}

/// First qualifying scan for each recordable stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    #[serde(default)]
    pub in_progress: Option<StatusChange>,
    #[serde(default)]
    pub received: Option<StatusChange>,
    #[serde(default)]
    pub reached_gps: Option<StatusChange>,
    #[serde(default)]
    pub reached_and_received: Option<StatusChange>,
    #[serde(default)]
    pub validated: Option<StatusChange>,
}

impl StatusRecord {
    /// Returns the change recorded for `stage`. `NoScans` is never recorded.
    pub fn get(&self, stage: Stage) -> Option<&StatusChange> {
        match stage {
            Stage::NoScans => None,
            Stage::InProgress => self.in_progress.as_ref(),
            Stage::Received => self.received.as_ref(),
            Stage::ReachedGps => self.reached_gps.as_ref(),
            Stage::ReachedAndReceived => self.reached_and_received.as_ref(),
            Stage::Validated => self.validated.as_ref(),
        }
    }

    pub fn is_set(&self, stage: Stage) -> bool {
        self.get(stage).is_some()
    }

    pub fn is_empty(&self) -> bool {
        Stage::RECORDED.iter().all(|s| !self.is_set(*s))
    }

    /// Fills `stage` unless it already holds a change. Returns whether it was filled.
    pub(crate) fn set_if_absent(&mut self, stage: Stage, change: StatusChange) -> bool {
        let slot = match stage {
            Stage::NoScans => return false,
            Stage::InProgress => &mut self.in_progress,
            Stage::Received => &mut self.received,
            Stage::ReachedGps => &mut self.reached_gps,
            Stage::ReachedAndReceived => &mut self.reached_and_received,
            Stage::Validated => &mut self.validated,
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(change);
        true
    }

    /// Recorded changes in precedence order.
    pub fn changes(&self) -> impl Iterator<Item = (Stage, &StatusChange)> {
        Stage::RECORDED
            .into_iter()
            .filter_map(move |stage| self.get(stage).map(|change| (stage, change)))
    }
}

/// A tracked box and everything derived from its scans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryBox {
    pub id: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub destination: Option<Coordinates>,
    /// Item type to quantity packed in the box.
    #[serde(default)]
    pub content: BTreeMap<String, u64>,
    #[serde(default)]
    pub scans: Vec<Scan>,
    #[serde(default)]
    pub status_changes: StatusRecord,
    /// Cached result of resolving `status_changes` at the last write.
    #[serde(default)]
    pub progress: Stage,
    #[serde(default)]
    pub last_scan: Option<StatusChange>,
}

impl DeliveryBox {
    pub fn new(id: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            project: project.into(),
            district: String::new(),
            school: String::new(),
            destination: None,
            content: BTreeMap::new(),
            scans: Vec::new(),
            status_changes: StatusRecord::default(),
            progress: Stage::NoScans,
            last_scan: None,
        }
    }

    pub fn with_destination(mut self, latitude: f64, longitude: f64) -> Self {
        self.destination = Some(Coordinates::new(latitude, longitude));
        self
    }

    pub fn with_school(mut self, district: &str, school: &str) -> Self {
        self.district = district.to_string();
        self.school = school.to_string();
        self
    }

    pub fn with_item(mut self, item: &str, quantity: u64) -> Self {
        let slot = self.content.entry(item.to_string()).or_default();
        *slot = slot.saturating_add(quantity);
        self
    }

    pub fn is_validated(&self) -> bool {
        self.status_changes.validated.is_some()
    }
}
