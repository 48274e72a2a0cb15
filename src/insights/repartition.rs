use crate::insights::types::Repartition;
use crate::model::DeliveryBox;
use crate::status::resolve;
use chrono::{DateTime, Utc};

/// Counts boxes per stage as of `cutoff`.
///
/// Stages are resolved from each box's status record, never from its cached
/// `progress`, so historical cutoffs are answered correctly.
pub fn repartition<'a, I>(boxes: I, cutoff: DateTime<Utc>) -> Repartition
where
    I: IntoIterator<Item = &'a DeliveryBox>,
{
    let mut counts = Repartition::default();
    for delivery_box in boxes {
        counts.record(resolve(&delivery_box.status_changes, cutoff));
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Stage, StatusChange};
    use chrono::TimeZone;

    fn at(t: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(t).unwrap()
    }

    fn boxed(id: usize, stage: Option<Stage>, t: i64) -> DeliveryBox {
        let mut b = DeliveryBox::new(format!("b{id}"), "P1");
        let change = StatusChange {
            scan: format!("s{id}"),
            time: at(t),
        };
        match stage {
            Some(Stage::Validated) => b.status_changes.validated = Some(change),
            Some(Stage::ReachedGps) => b.status_changes.reached_gps = Some(change),
            Some(Stage::InProgress) => b.status_changes.in_progress = Some(change),
            _ => {}
        }
        b
    }

    #[test]
    fn test_counts_per_stage() {
        let mut boxes = Vec::new();
        boxes.extend((0..3).map(|i| boxed(i, Some(Stage::Validated), 100)));
        boxes.extend((3..5).map(|i| boxed(i, Some(Stage::ReachedGps), 100)));
        boxes.extend((5..10).map(|i| boxed(i, None, 100)));

        let r = repartition(&boxes, at(1_000));
        assert_eq!(
            r,
            Repartition {
                no_scans: 5,
                reached_gps: 2,
                validated: 3,
                total: 10,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_past_cutoff_sees_earlier_stages() {
        let mut b = boxed(0, Some(Stage::InProgress), 100);
        b.status_changes.validated = Some(StatusChange {
            scan: "late".into(),
            time: at(500),
        });
        b.progress = Stage::Validated;

        assert_eq!(repartition([&b], at(50)).no_scans, 1);
        assert_eq!(repartition([&b], at(200)).in_progress, 1);
        assert_eq!(repartition([&b], at(500)).validated, 1);
    }

    #[test]
    fn test_empty_collection() {
        let r = repartition(std::iter::empty(), at(0));
        assert_eq!(r, Repartition::default());
    }
}
