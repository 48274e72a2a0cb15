use crate::insights::repartition::repartition;
use crate::insights::types::TimelineDay;
use crate::model::DeliveryBox;
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Last millisecond of a UTC day.
fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .map(|t| t.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Daily repartitions spanning the recorded status changes.
///
/// The window runs from the day before the earliest change to the day after
/// the latest one, clipped to the trailing `max_days` (plus one day of lead
/// in). Each day is evaluated at its last millisecond. No recorded change
/// means an empty timeline. Bounds past chrono's range are clamped to it.
pub fn timeline<'a, I>(boxes: I, max_days: i64) -> Vec<TimelineDay>
where
    I: IntoIterator<Item = &'a DeliveryBox>,
{
    let boxes: Vec<&DeliveryBox> = boxes.into_iter().collect();

    let bounds = boxes
        .iter()
        .flat_map(|b| b.status_changes.changes().map(|(_, change)| change.time))
        .fold(None, |acc: Option<(DateTime<Utc>, DateTime<Utc>)>, t| match acc {
            None => Some((t, t)),
            Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
        });

    let Some((earliest, latest)) = bounds else {
        return Vec::new();
    };

    let one_day = Duration::days(1);
    let window_end = latest
        .checked_add_signed(one_day)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let cap = Duration::try_days(max_days.max(0))
        .and_then(|span| window_end.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let window_start = earliest
        .max(cap)
        .checked_sub_signed(one_day)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let last_day = window_end.date_naive();

    window_start
        .date_naive()
        .iter_days()
        .take_while(|day| *day <= last_day)
        .map(|date| TimelineDay {
            date,
            repartition: repartition(boxes.iter().copied(), end_of_day(date)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Stage, StatusChange};
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn box_with(id: &str, changes: &[(Stage, DateTime<Utc>)]) -> DeliveryBox {
        let mut b = DeliveryBox::new(id, "P1");
        for (stage, time) in changes {
            let change = StatusChange {
                scan: format!("{id}-{stage}"),
                time: *time,
            };
            b.status_changes.set_if_absent(*stage, change);
        }
        b
    }

    #[test]
    fn test_no_events_gives_empty_timeline() {
        let boxes = vec![DeliveryBox::new("b1", "P1"), DeliveryBox::new("b2", "P1")];
        assert!(timeline(&boxes, 182).is_empty());
        assert!(timeline(&Vec::<DeliveryBox>::new(), 182).is_empty());
    }

    #[test]
    fn test_single_event_window() {
        let boxes = vec![box_with("b1", &[(Stage::InProgress, at(2024, 3, 10, 9))])];
        let days = timeline(&boxes, 182);

        let dates: Vec<NaiveDate> = days.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![day(2024, 3, 9), day(2024, 3, 10), day(2024, 3, 11)]);

        assert_eq!(days[0].repartition.no_scans, 1);
        assert_eq!(days[1].repartition.in_progress, 1);
        assert_eq!(days[2].repartition.in_progress, 1);
        assert!(days.iter().all(|d| d.repartition.total == 1));
    }

    #[test]
    fn test_event_late_in_day_counts_that_day() {
        let late = Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).unwrap();
        let boxes = vec![box_with("b1", &[(Stage::Validated, late)])];
        let days = timeline(&boxes, 182);
        assert_eq!(days[1].date, day(2024, 3, 10));
        assert_eq!(days[1].repartition.validated, 1);
    }

    #[test]
    fn test_progression_over_days() {
        let boxes = vec![
            box_with(
                "b1",
                &[
                    (Stage::InProgress, at(2024, 1, 1, 8)),
                    (Stage::ReachedGps, at(2024, 1, 3, 8)),
                    (Stage::ReachedAndReceived, at(2024, 1, 4, 8)),
                ],
            ),
            box_with("b2", &[(Stage::Validated, at(2024, 1, 2, 12))]),
        ];
        let days = timeline(&boxes, 182);

        assert_eq!(days.first().unwrap().date, day(2023, 12, 31));
        assert_eq!(days.last().unwrap().date, day(2024, 1, 5));
        assert_eq!(days.len(), 6);

        let jan2 = &days[2].repartition;
        assert_eq!(jan2.in_progress, 1);
        assert_eq!(jan2.validated, 1);

        let jan4 = &days[4].repartition;
        assert_eq!(jan4.reached_and_received, 1);
        assert_eq!(jan4.validated, 1);
    }

    #[test]
    fn test_window_is_capped() {
        let boxes = vec![
            box_with("old", &[(Stage::InProgress, at(2022, 1, 1, 12))]),
            box_with("new", &[(Stage::InProgress, at(2024, 6, 1, 12))]),
        ];
        let days = timeline(&boxes, 182);

        // window end is June 2nd; start is 182 days earlier minus one day.
        assert_eq!(days.last().unwrap().date, day(2024, 6, 2));
        assert_eq!(days.first().unwrap().date, day(2023, 12, 2));
        assert_eq!(days.len(), 184);
        assert_eq!(days[0].repartition.in_progress, 1);

        let short = timeline(&boxes, 10);
        assert_eq!(short.len(), 12);
    }

    #[test]
    fn test_end_of_day() {
        let eod = end_of_day(day(2024, 2, 29));
        assert_eq!(eod, Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap() + Duration::milliseconds(999));
    }

    #[test]
    fn test_huge_cap_keeps_full_window() {
        let boxes = vec![box_with("b1", &[(Stage::InProgress, at(2023, 6, 1, 12))])];
        let days = timeline(&boxes, 100_000_000);

        let dates: Vec<NaiveDate> = days.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![day(2023, 5, 31), day(2023, 6, 1), day(2023, 6, 2)]);
    }

    #[test]
    fn test_event_at_end_of_time_does_not_panic() {
        let boxes = vec![box_with("b1", &[(Stage::Validated, DateTime::<Utc>::MAX_UTC)])];
        let days = timeline(&boxes, 182);

        assert!(!days.is_empty());
        assert!(days.iter().all(|d| d.repartition.total == 1));
    }
}
