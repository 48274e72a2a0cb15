//! Live ingestion of a single scan into its box.
//!
//! The box is taken by `&mut`, so a caller can only ever have one write in
//! flight per box.

use crate::error::{Result, TrackError};
use crate::geofence::Geofence;
use crate::model::{DeliveryBox, NewScan, Stage, StatusChange};
use crate::status::{apply_scan, last_scan_matching, next_stage, reindex_box, resolve};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

/// What a single ingestion did to the box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub scan_id: String,
    pub final_destination: bool,
    /// Stage filled by this scan, if any.
    pub stage_set: Option<Stage>,
    pub progress: Stage,
    /// True when the scan predates the box's history and a full reindex ran.
    pub reindexed: bool,
}

/// Classifies `scan` against the box's destination and folds it in.
///
/// Scans arriving in `(time, id)` order are applied incrementally. A scan
/// sorting before the latest stored one would make the incremental record
/// disagree with a replay, so the box is reindexed instead.
pub fn ingest_scan(
    delivery_box: &mut DeliveryBox,
    scan: NewScan,
    geofence: &Geofence,
    now: DateTime<Utc>,
) -> Result<IngestOutcome> {
    if scan.box_id != delivery_box.id {
        return Err(TrackError::InvalidInput(format!(
            "scan {} belongs to box {}, not {}",
            scan.id, scan.box_id, delivery_box.id
        )));
    }
    if delivery_box.scans.iter().any(|s| s.id == scan.id) {
        return Err(TrackError::InvalidInput(format!(
            "scan {} already recorded on box {}",
            scan.id, delivery_box.id
        )));
    }

    let scan = geofence.classify_scan(delivery_box.destination, scan)?;
    let out_of_order = last_scan_matching(&delivery_box.scans, |_| true)
        .is_some_and(|last| (scan.time, &scan.id) < (last.time, &last.id));

    let scan_id = scan.id.clone();
    let final_destination = scan.final_destination;

    if out_of_order {
        warn!(
            box_id = %delivery_box.id,
            scan_id = %scan_id,
            "Scan older than box history, reindexing"
        );
        let before = delivery_box.status_changes.clone();
        delivery_box.scans.push(scan);
        reindex_box(delivery_box, now);

        let stage_set = Stage::RECORDED
            .into_iter()
            .find(|stage| before.get(*stage) != delivery_box.status_changes.get(*stage));

        return Ok(IngestOutcome {
            scan_id,
            final_destination,
            stage_set,
            progress: delivery_box.progress,
            reindexed: true,
        });
    }

    let stage_set = next_stage(&delivery_box.status_changes, &scan);
    let record = apply_scan(&delivery_box.status_changes, &scan);

    delivery_box.progress = resolve(&record, now);
    delivery_box.status_changes = record;
    delivery_box.last_scan = Some(StatusChange::of(&scan));
    delivery_box.scans.push(scan);

    debug!(
        box_id = %delivery_box.id,
        scan_id = %scan_id,
        final_destination,
        stage_set = ?stage_set,
        progress = %delivery_box.progress,
        "Scan ingested"
    );

    Ok(IngestOutcome {
        scan_id,
        final_destination,
        stage_set,
        progress: delivery_box.progress,
        reindexed: false,
    })
}
