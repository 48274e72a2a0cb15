//! Delivery status derivation.
//!
//! A box's [`StatusRecord`](crate::model::StatusRecord) is folded from its
//! scans one at a time by [`transition::apply_scan`]; [`reindex`] replays a
//! full scan history from scratch, and [`progress::resolve`] turns a record
//! into the single current stage as of a cutoff.

pub mod progress;
pub mod reindex;
pub mod transition;

pub use progress::resolve;
pub use reindex::{last_scan_matching, reindex, reindex_box};
pub use transition::{apply_scan, next_stage};
