//! Haversine travel matrix (fallback when no routing API is available).
//!
//! Uses great-circle distance and an assumed speed to estimate travel time.
//! Ignores the network entirely, so it is only a rough screen for OD work.

use chrono::NaiveDateTime;
use rayon::prelude::*;

use crate::error::Result;
use crate::mode::TravelMode;
use crate::traits::{TravelMatrix, TravelTimeMatrix};

/// Average travel speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone)]
pub struct HaversineMatrix {
    /// Assumed average speed in km/h, applied to every mode.
    pub speed_kmh: f64,
}

impl Default for HaversineMatrix {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineMatrix {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Great-circle distance between two (lat, lng) points in kilometers.
    pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
        let (lat1, lng1) = from;
        let (lat2, lng2) = to;

        let lat1_rad = lat1.to_radians();
        let lat2_rad = lat2.to_radians();
        let delta_lat = (lat2 - lat1).to_radians();
        let delta_lng = (lng2 - lng1).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }

    fn km_to_seconds(&self, km: f64) -> f64 {
        (km / self.speed_kmh * 3600.0).round()
    }
}

impl TravelTimeMatrix for HaversineMatrix {
    fn matrix_for(
        &self,
        origins: &[(f64, f64)],
        destinations: &[(f64, f64)],
        _mode: TravelMode,
        _departure: NaiveDateTime,
    ) -> Result<TravelMatrix> {
        let kilometres: Vec<f64> = origins
            .par_iter()
            .flat_map_iter(|from| destinations.iter().map(move |to| Self::haversine_km(*from, *to)))
            .collect();

        Ok(TravelMatrix {
            origins: origins.len(),
            destinations: destinations.len(),
            durations: kilometres
                .iter()
                .map(|km| Some(self.km_to_seconds(*km)))
                .collect(),
            distances: kilometres.iter().map(|km| Some(km * 1000.0)).collect(),
        })
    }
}
