//! Tunable constants of the engine.
//!
//! Defaults can be overridden from the environment (a `.env` file is honoured
//! by the binary through `dotenvy`):
//!
//! | Variable                      | Default |
//! |-------------------------------|---------|
//! | `BOXTRACK_GEOFENCE_RADIUS_M`  | 50.0    |
//! | `BOXTRACK_TIMELINE_MAX_DAYS`  | 182     |

use crate::error::{Result, TrackError};
use crate::geofence::Geofence;
use std::str::FromStr;

pub const DEFAULT_GEOFENCE_RADIUS_M: f64 = 50.0;
pub const DEFAULT_TIMELINE_MAX_DAYS: i64 = 182;
/// Upper bound accepted for `BOXTRACK_TIMELINE_MAX_DAYS` (about a century).
pub const MAX_TIMELINE_MAX_DAYS: i64 = 36_500;

const GEOFENCE_RADIUS_VAR: &str = "BOXTRACK_GEOFENCE_RADIUS_M";
const TIMELINE_MAX_DAYS_VAR: &str = "BOXTRACK_TIMELINE_MAX_DAYS";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    /// Distance in meters under which a scan counts as "at destination".
    pub geofence_radius_m: f64,
    /// Trailing number of days kept in a timeline.
    pub timeline_max_days: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            geofence_radius_m: DEFAULT_GEOFENCE_RADIUS_M,
            timeline_max_days: DEFAULT_TIMELINE_MAX_DAYS,
        }
    }
}

impl Settings {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup, falling back to defaults
    /// for absent keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let settings = Self {
            geofence_radius_m: parse_or(&lookup, GEOFENCE_RADIUS_VAR, defaults.geofence_radius_m)?,
            timeline_max_days: parse_or(&lookup, TIMELINE_MAX_DAYS_VAR, defaults.timeline_max_days)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.geofence_radius_m.is_finite() || self.geofence_radius_m <= 0.0 {
            return Err(TrackError::Config(format!(
                "{GEOFENCE_RADIUS_VAR} must be a positive number, got {}",
                self.geofence_radius_m
            )));
        }
        if !(1..=MAX_TIMELINE_MAX_DAYS).contains(&self.timeline_max_days) {
            return Err(TrackError::Config(format!(
                "{TIMELINE_MAX_DAYS_VAR} must be between 1 and {MAX_TIMELINE_MAX_DAYS}, got {}",
                self.timeline_max_days
            )));
        }
        Ok(())
    }

    pub fn geofence(&self) -> Geofence {
        Geofence::new(self.geofence_radius_m)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| TrackError::Config(format!("{key}={raw:?}: {e}"))),
        _ => Ok(default),
    }
}
