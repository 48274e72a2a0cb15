//! Data types produced by the aggregation pipeline.

use crate::model::Stage;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Number of boxes in each stage at a cutoff.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Repartition {
    pub no_scans: usize,
    pub in_progress: usize,
    pub received: usize,
    pub reached_gps: usize,
    pub reached_and_received: usize,
    pub validated: usize,
    pub total: usize,
}

impl Repartition {
    pub fn count(&self, stage: Stage) -> usize {
        match stage {
            Stage::NoScans => self.no_scans,
            Stage::InProgress => self.in_progress,
            Stage::Received => self.received,
            Stage::ReachedGps => self.reached_gps,
            Stage::ReachedAndReceived => self.reached_and_received,
            Stage::Validated => self.validated,
        }
    }

    pub(crate) fn record(&mut self, stage: Stage) {
        let slot = match stage {
            Stage::NoScans => &mut self.no_scans,
            Stage::InProgress => &mut self.in_progress,
            Stage::Received => &mut self.received,
            Stage::ReachedGps => &mut self.reached_gps,
            Stage::ReachedAndReceived => &mut self.reached_and_received,
            Stage::Validated => &mut self.validated,
        };
        *slot += 1;
        self.total += 1;
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Percentage of boxes in `stage`.
    pub fn share(&self, stage: Stage) -> f64 {
        Self::pct(self.count(stage), self.total)
    }
}

/// Repartition at the end of one UTC day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineDay {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub repartition: Repartition,
}

/// Quantity of one item type delivered versus packed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContentTally {
    pub validated: u64,
    pub total: u64,
}

/// Everything computed for one sample of boxes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub timeline: Vec<TimelineDay>,
    pub repartition: Repartition,
    pub content: BTreeMap<String, ContentTally>,
}

/// Insights for a whole collection, or per group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InsightsReport {
    Grouped(BTreeMap<String, Insights>),
    Flat(Insights),
}

impl InsightsReport {
    pub fn is_empty(&self) -> bool {
        match self {
            InsightsReport::Grouped(groups) => groups.is_empty(),
            InsightsReport::Flat(insights) => insights.repartition.total == 0,
        }
    }
}

/// Summary entry for the project index listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectIndexEntry {
    pub project: String,
    pub total: usize,
    pub validated: usize,
    pub validated_percent: f64,
}

/// Top-level index of all analyzed groups, written as `index.json`.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectIndex {
    pub generated_at: DateTime<Utc>,
    pub projects: Vec<ProjectIndexEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(Repartition::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(Repartition::pct(50, 100), 50.0);
        assert_eq!(Repartition::pct(1, 4), 25.0);
    }

    #[test]
    fn test_record_tracks_total() {
        let mut r = Repartition::default();
        r.record(Stage::Validated);
        r.record(Stage::Validated);
        r.record(Stage::NoScans);
        r.record(Stage::ReachedGps);

        assert_eq!(r.count(Stage::Validated), 2);
        assert_eq!(r.total, 4);
        assert_eq!(r.share(Stage::Validated), 50.0);
        assert_eq!(r.share(Stage::Received), 0.0);
    }

    #[test]
    fn test_timeline_day_flattens_counts() {
        let day = TimelineDay {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            repartition: Repartition {
                validated: 2,
                total: 2,
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&day).unwrap();
        assert_eq!(json["date"], "2024-03-01");
        assert_eq!(json["validated"], 2);
        assert_eq!(json["noScans"], 0);
    }
}
