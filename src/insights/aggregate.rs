use crate::config::Settings;
use crate::insights::content::content_delivery;
use crate::insights::repartition::repartition;
use crate::insights::timeline::timeline;
use crate::insights::types::{Insights, InsightsReport};
use crate::model::DeliveryBox;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// How a collection is split before aggregating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightsOptions {
    /// Aggregate each project separately.
    pub grouped: bool,
    /// Restrict aggregation to these projects.
    pub only: Option<Vec<String>>,
}

impl Default for InsightsOptions {
    fn default() -> Self {
        Self {
            grouped: true,
            only: None,
        }
    }
}

impl InsightsOptions {
    pub fn selects(&self, key: &str) -> bool {
        self.only
            .as_ref()
            .is_none_or(|only| only.iter().any(|k| k == key))
    }
}

/// Partitions boxes by `key`.
pub fn group_by<'a, I, K, F>(boxes: I, key: F) -> BTreeMap<K, Vec<&'a DeliveryBox>>
where
    I: IntoIterator<Item = &'a DeliveryBox>,
    K: Ord,
    F: Fn(&DeliveryBox) -> K,
{
    let mut groups: BTreeMap<K, Vec<&'a DeliveryBox>> = BTreeMap::new();
    for delivery_box in boxes {
        groups.entry(key(delivery_box)).or_default().push(delivery_box);
    }
    groups
}

/// Repartition as of `now`, timeline and content delivery for one sample.
pub fn insights_for<'a, I>(boxes: I, settings: &Settings, now: DateTime<Utc>) -> Insights
where
    I: IntoIterator<Item = &'a DeliveryBox>,
{
    let sample: Vec<&DeliveryBox> = boxes.into_iter().collect();
    Insights {
        timeline: timeline(sample.iter().copied(), settings.timeline_max_days),
        repartition: repartition(sample.iter().copied(), now),
        content: content_delivery(sample.iter().copied()),
    }
}

/// Computes insights for `boxes`, per project or for the whole selection.
///
/// An empty collection yields an empty grouped report.
pub fn compute_insights(
    boxes: &[DeliveryBox],
    options: &InsightsOptions,
    settings: &Settings,
    now: DateTime<Utc>,
) -> InsightsReport {
    if boxes.is_empty() {
        return InsightsReport::Grouped(BTreeMap::new());
    }

    if !options.grouped {
        let selected = boxes.iter().filter(|b| options.selects(&b.project));
        return InsightsReport::Flat(insights_for(selected, settings, now));
    }

    let groups = group_by(boxes, |b| b.project.clone())
        .into_iter()
        .filter(|(project, _)| options.selects(project))
        .map(|(project, sample)| (project, insights_for(sample, settings, now)))
        .collect();

    InsightsReport::Grouped(groups)
}
