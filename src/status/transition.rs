use crate::model::{Scan, Stage, StatusChange, StatusRecord};

/// Picks the stage a scan moves the record into, if any.
///
/// Rules, first match wins:
///
/// | Scan                                | Stage filled                                   |
/// |-------------------------------------|------------------------------------------------|
/// | at destination and marked received  | `validated`                                    |
/// | at destination                      | `reachedAndReceived` if `received`, else `reachedGps` |
/// | marked received                     | `reachedAndReceived` if `reachedGps`, else `received` |
/// | anything else, empty record         | `inProgress`                                   |
///
/// A stage that is already filled is never picked.
pub fn next_stage(record: &StatusRecord, scan: &Scan) -> Option<Stage> {
    let unset = |stage| !record.is_set(stage);

    if scan.final_destination && scan.marked_as_received {
        return unset(Stage::Validated).then_some(Stage::Validated);
    }

    if scan.final_destination {
        return if record.is_set(Stage::Received) && unset(Stage::ReachedAndReceived) {
            Some(Stage::ReachedAndReceived)
        } else if unset(Stage::ReachedGps) {
            Some(Stage::ReachedGps)
        } else {
            None
        };
    }

    if scan.marked_as_received {
        return if record.is_set(Stage::ReachedGps) && unset(Stage::ReachedAndReceived) {
            Some(Stage::ReachedAndReceived)
        } else if unset(Stage::Received) {
            Some(Stage::Received)
        } else {
            None
        };
    }

    record.is_empty().then_some(Stage::InProgress)
}

/// Returns a copy of `record` with `scan` applied.
///
/// A scan matching no rule leaves the record unchanged.
pub fn apply_scan(record: &StatusRecord, scan: &Scan) -> StatusRecord {
    let mut next = record.clone();
    if let Some(stage) = next_stage(record, scan) {
        next.set_if_absent(stage, StatusChange::of(scan));
    }
    next
}
