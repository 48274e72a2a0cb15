//! Destination coordinate corrections.
//!
//! When a school's coordinates are fixed after scans were recorded, every
//! scan of the affected boxes is re-classified and any box whose
//! `final_destination` bits changed is fully reindexed.

use crate::geofence::Geofence;
use crate::model::{Coordinates, DeliveryBox};
use crate::status::reindex_box;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// New coordinates for every box delivered to one school.
///
/// Stored as a JSON array on disk:
/// ```json
/// [
///   { "district": "Gasabo", "school": "GS Kacyiru", "latitude": -1.94, "longitude": 30.06 }
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateCorrection {
    pub district: String,
    pub school: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl CoordinateCorrection {
    fn matches(&self, delivery_box: &DeliveryBox) -> bool {
        self.school == delivery_box.school && self.district == delivery_box.district
    }

    fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CorrectionSummary {
    /// Boxes matching at least one correction.
    pub matched: usize,
    /// Boxes whose destination actually changed.
    pub updated: usize,
    /// Boxes with at least one scan re-classified, hence reindexed.
    pub recalculated: usize,
}

/// Loads corrections from a JSON file at `path`.
pub fn load_corrections(path: &str) -> Result<Vec<CoordinateCorrection>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corrections {path}"))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid corrections {path}"))
}

/// Applies `corrections` to `boxes`. The last matching correction wins.
pub fn apply_corrections(
    boxes: &mut [DeliveryBox],
    corrections: &[CoordinateCorrection],
    geofence: &Geofence,
    now: DateTime<Utc>,
) -> CorrectionSummary {
    let mut summary = CorrectionSummary::default();

    for delivery_box in boxes.iter_mut() {
        let Some(correction) = corrections.iter().rev().find(|c| c.matches(delivery_box)) else {
            continue;
        };
        summary.matched += 1;

        let destination = correction.coordinates();
        if delivery_box.destination == Some(destination) {
            continue;
        }
        delivery_box.destination = Some(destination);
        summary.updated += 1;

        if reclassify_scans(delivery_box, geofence) > 0 {
            reindex_box(delivery_box, now);
            summary.recalculated += 1;
        }
    }

    info!(
        matched = summary.matched,
        updated = summary.updated,
        recalculated = summary.recalculated,
        "Coordinate corrections applied"
    );
    summary
}

/// Recomputes `final_destination` on every located scan. Returns how many flipped.
fn reclassify_scans(delivery_box: &mut DeliveryBox, geofence: &Geofence) -> usize {
    let destination = delivery_box.destination;
    let mut flipped = 0;

    for scan in delivery_box.scans.iter_mut() {
        let Some(coords) = scan.coords() else {
            continue;
        };
        let final_destination = geofence.classify(destination, coords);
        if final_destination != scan.final_destination {
            scan.final_destination = final_destination;
            flipped += 1;
        }
    }

    if flipped > 0 {
        debug!(box_id = %delivery_box.id, flipped, "Scans re-classified");
    }
    flipped
}
