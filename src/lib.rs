//! Delivery tracking for boxes shipped to schools.
//!
//! Scans are classified against the destination geofence, folded into a
//! per-box status record, and aggregated into portfolio insights.

pub mod config;
pub mod correction;
pub mod dataset;
pub mod error;
pub mod geofence;
pub mod ingest;
pub mod insights;
pub mod model;
pub mod output;
pub mod status;
