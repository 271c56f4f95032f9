//! Sydney locations and census zones for realistic test fixtures.
//!
//! Coordinates are approximate public landmarks in WGS84.

use geo::{polygon, MultiPolygon};

use transport_analyst::{Location, Zone};

/// A named location with coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Landmark {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Landmark {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn location(&self) -> Location {
        Location::new(self.name, self.lat, self.lng)
    }
}

// ============================================================================
// Transport hubs (origins)
// ============================================================================

pub const HUBS: &[Landmark] = &[
    Landmark::new("Central Station", -33.8832, 151.2070),
    Landmark::new("Town Hall", -33.8731, 151.2066),
    Landmark::new("Circular Quay", -33.8615, 151.2111),
    Landmark::new("Parramatta Station", -33.8174, 151.0051),
];

// ============================================================================
// Destinations
// ============================================================================

pub const DESTINATIONS: &[Landmark] = &[
    Landmark::new("Bondi Beach", -33.8908, 151.2743),
    Landmark::new("Sydney Opera House", -33.8568, 151.2153),
    Landmark::new("Taronga Zoo", -33.8434, 151.2411),
    Landmark::new("Manly Wharf", -33.8003, 151.2843),
    Landmark::new("UNSW Kensington", -33.9173, 151.2313),
];

pub fn locations(landmarks: &[Landmark]) -> Vec<Location> {
    landmarks.iter().map(Landmark::location).collect()
}

/// Axis-aligned square in (lng, lat) space.
pub fn square(lng: f64, lat: f64, size: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon![
        (x: lng, y: lat),
        (x: lng + size, y: lat),
        (x: lng + size, y: lat + size),
        (x: lng, y: lat + size),
        (x: lng, y: lat),
    ]])
}

/// A 3x3 grid of 0.01 degree census zones starting at (151.20, -33.90).
///
/// Zone `r{row}c{col}` has `pop = 100 * (row * 3 + col + 1)` and
/// `jobs = 10` everywhere.
pub fn census_grid() -> Vec<Zone> {
    let mut zones = Vec::new();
    for row in 0..3 {
        for col in 0..3 {
            let lng = 151.20 + col as f64 * 0.01;
            let lat = -33.90 + row as f64 * 0.01;
            zones.push(
                Zone::new(format!("r{}c{}", row, col), square(lng, lat, 0.01))
                    .with_value("pop", 100.0 * (row * 3 + col + 1) as f64)
                    .with_value("jobs", 10.0),
            );
        }
    }
    zones
}
