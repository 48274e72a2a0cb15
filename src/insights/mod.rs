//! Portfolio analytics over a collection of boxes.
//!
//! This module turns boxes into a stage repartition (optionally as of a past
//! cutoff), a daily timeline of repartitions, and a per-item delivery
//! summary, either for the whole collection or grouped by a key such as the
//! project name.

pub mod aggregate;
pub mod analyzer;
pub mod content;
pub mod repartition;
pub mod timeline;
pub mod types;

pub use aggregate::{InsightsOptions, compute_insights, group_by, insights_for};
pub use content::content_delivery;
pub use repartition::repartition;
pub use timeline::timeline;
pub use types::{ContentTally, Insights, InsightsReport, Repartition, TimelineDay};
