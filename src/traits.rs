//! Provider interfaces.
//!
//! Each routing API client implements the subset it supports. Analysis
//! functions are generic over these traits so they can run against any
//! provider, or against test doubles.

use chrono::NaiveDateTime;
use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::mode::TravelMode;
use crate::trip::{RouteRequest, TripLeg};

/// Computes the best route for a request.
pub trait RouteProvider {
    /// Returns trip rows, or an empty vector when no route exists.
    fn route(&self, request: &RouteRequest) -> Result<Vec<TripLeg>>;
}

/// A reachable area for one travel-time cutoff.
#[derive(Debug, Clone, PartialEq)]
pub struct Isochrone {
    pub cutoff_secs: u32,
    pub geometry: MultiPolygon<f64>,
}

/// Converts an isochrone break to seconds, saturating at `u32::MAX`.
pub(crate) fn cutoff_secs(minutes: u32) -> u32 {
    minutes.saturating_mul(60)
}

/// Computes isochrones (catchments) around an origin.
pub trait ServiceAreaProvider {
    fn isochrones(
        &self,
        origin: (f64, f64),
        mode: TravelMode,
        breaks_minutes: &[u32],
        departure: NaiveDateTime,
    ) -> Result<Vec<Isochrone>>;
}

/// Row-major travel times and distances between two location sets.
///
/// `None` marks pairs with no route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TravelMatrix {
    pub origins: usize,
    pub destinations: usize,
    /// Seconds.
    pub durations: Vec<Option<f64>>,
    /// Metres.
    pub distances: Vec<Option<f64>>,
}

impl TravelMatrix {
    fn index(&self, origin: usize, destination: usize) -> Option<usize> {
        if origin >= self.origins || destination >= self.destinations {
            return None;
        }
        Some(origin * self.destinations + destination)
    }

    pub fn duration(&self, origin: usize, destination: usize) -> Option<f64> {
        let index = self.index(origin, destination)?;
        self.durations.get(index).copied().flatten()
    }

    pub fn distance(&self, origin: usize, destination: usize) -> Option<f64> {
        let index = self.index(origin, destination)?;
        self.distances.get(index).copied().flatten()
    }
}

/// Provides an origin-destination travel matrix.
pub trait TravelTimeMatrix {
    fn matrix_for(
        &self,
        origins: &[(f64, f64)],
        destinations: &[(f64, f64)],
        mode: TravelMode,
        departure: NaiveDateTime,
    ) -> Result<TravelMatrix>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> TravelMatrix {
        TravelMatrix {
            origins: 2,
            destinations: 2,
            durations: vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
            distances: vec![Some(10.0), None, Some(30.0), Some(40.0)],
        }
    }

    #[test]
    fn lookup_is_row_major() {
        let matrix = two_by_two();
        assert_eq!(matrix.duration(0, 1), Some(2.0));
        assert_eq!(matrix.duration(1, 0), Some(3.0));
        assert_eq!(matrix.distance(1, 1), Some(40.0));
        assert_eq!(matrix.distance(0, 1), None);
    }

    #[test]
    fn out_of_range_pairs_are_none() {
        let matrix = two_by_two();
        // (0, 2) would otherwise wrap into row 1.
        assert_eq!(matrix.duration(0, 2), None);
        assert_eq!(matrix.distance(0, 2), None);
        assert_eq!(matrix.duration(2, 0), None);
        assert_eq!(TravelMatrix::default().duration(0, 0), None);
    }

    #[test]
    fn cutoff_saturates() {
        assert_eq!(cutoff_secs(15), 900);
        assert_eq!(cutoff_secs(u32::MAX), u32::MAX);
    }
}
