//! Destination geofence.
//!
//! Decides whether a scan was taken at the box's final destination by
//! comparing the great-circle distance between the two points with a fixed
//! radius.

use crate::error::{Result, TrackError};
use crate::model::{Coordinates, NewScan, Scan, ScanCoords};

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine distance between two points in meters.
pub fn haversine_meters(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();
    EARTH_RADIUS_METERS * c
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    radius_m: f64,
}

impl Geofence {
    pub fn new(radius_m: f64) -> Self {
        Self { radius_m }
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Distance from the destination, or `None` when the destination is unset.
    pub fn distance_m(&self, destination: Option<Coordinates>, coords: &ScanCoords) -> Option<f64> {
        let destination = destination.filter(|d| !d.is_unset())?;
        Some(haversine_meters(destination, coords.point()))
    }

    /// True when `coords` lies within the radius of `destination`.
    ///
    /// An unset destination (`None` or `0,0`) never matches.
    pub fn classify(&self, destination: Option<Coordinates>, coords: &ScanCoords) -> bool {
        self.distance_m(destination, coords)
            .is_some_and(|d| d <= self.radius_m)
    }

    /// Turns an incoming scan into a stored one, computing `final_destination`.
    ///
    /// A scan without location can only be stored when it is marked as
    /// received; it is then never at destination.
    pub fn classify_scan(&self, destination: Option<Coordinates>, scan: NewScan) -> Result<Scan> {
        let final_destination = match scan.location.as_ref() {
            Some(location) => {
                let coords = &location.coords;
                if !coords.latitude.is_finite() || !coords.longitude.is_finite() {
                    return Err(TrackError::InvalidInput(format!(
                        "scan {} has non-finite coordinates",
                        scan.id
                    )));
                }
                self.classify(destination, coords)
            }
            None if scan.marked_as_received => false,
            None => {
                return Err(TrackError::InvalidInput(format!(
                    "scan {} has no location and is not marked as received",
                    scan.id
                )));
            }
        };

        Ok(Scan {
            id: scan.id,
            box_id: scan.box_id,
            time: scan.time,
            location: scan.location,
            marked_as_received: scan.marked_as_received,
            final_destination,
            comment: scan.comment,
            operator_id: scan.operator_id,
        })
    }
}
