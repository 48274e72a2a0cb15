use crate::model::{Stage, StatusRecord};
use chrono::{DateTime, Utc};

/// Current stage of a record as of `cutoff`.
///
/// This is a precedence query, not a most-recent-event query: among the
/// stages whose change happened at or before `cutoff`, the one declared last
/// in [`Stage::RECORDED`] wins, whatever the chronological order of the
/// changes. A record with nothing at or before `cutoff` is `NoScans`.
pub fn resolve(record: &StatusRecord, cutoff: DateTime<Utc>) -> Stage {
    record
        .changes()
        .filter(|(_, change)| change.time <= cutoff)
        .map(|(stage, _)| stage)
        .last()
        .unwrap_or(Stage::NoScans)
}
