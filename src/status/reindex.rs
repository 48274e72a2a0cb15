use crate::model::{DeliveryBox, Scan, StatusChange, StatusRecord};
use crate::status::{apply_scan, resolve};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Ascending by time, ties broken by id so the result does not depend on
/// input order.
fn chronological(a: &Scan, b: &Scan) -> std::cmp::Ordering {
    a.time.cmp(&b.time).then_with(|| a.id.cmp(&b.id))
}

/// Rebuilds a status record from a complete scan history.
pub fn reindex(scans: &[Scan]) -> StatusRecord {
    let mut ordered: Vec<&Scan> = scans.iter().collect();
    ordered.sort_by(|a, b| chronological(a, b));

    ordered
        .into_iter()
        .fold(StatusRecord::default(), |record, scan| apply_scan(&record, scan))
}

/// Latest scan satisfying `predicate`, if any.
pub fn last_scan_matching<F>(scans: &[Scan], predicate: F) -> Option<&Scan>
where
    F: Fn(&Scan) -> bool,
{
    scans
        .iter()
        .filter(|s| predicate(s))
        .max_by(|a, b| chronological(a, b))
}

/// Recomputes everything derived from a box's scans.
///
/// Sorts `scans` in place and refreshes `status_changes`, `progress` (as of
/// `now`) and `last_scan`. Returns whether the status record changed.
pub fn reindex_box(delivery_box: &mut DeliveryBox, now: DateTime<Utc>) -> bool {
    delivery_box.scans.sort_by(chronological);

    let record = reindex(&delivery_box.scans);
    let changed = record != delivery_box.status_changes;

    delivery_box.progress = resolve(&record, now);
    delivery_box.status_changes = record;
    delivery_box.last_scan = delivery_box.scans.last().map(StatusChange::of);

    debug!(
        box_id = %delivery_box.id,
        scans = delivery_box.scans.len(),
        progress = %delivery_box.progress,
        changed,
        "Box reindexed"
    );

    changed
}
