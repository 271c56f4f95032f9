//! Locations and census zones.
//!
//! All coordinates are WGS84. Points are handled as `(lat, lng)` tuples at
//! the API boundary and converted to `geo` types (x = lng, y = lat) for
//! area and overlay work.

use std::collections::BTreeMap;

use geo::{Centroid, MultiPolygon, Point};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A named WGS84 point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lng,
        }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }

    pub fn point(&self) -> Point<f64> {
        to_point(self.coords())
    }

    pub fn validate(&self) -> Result<()> {
        validate_coords(self.coords())
    }
}

/// Checks that `(lat, lng)` is a finite WGS84 coordinate.
pub fn validate_coords((lat, lng): (f64, f64)) -> Result<()> {
    let in_range = lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng);
    if in_range {
        Ok(())
    } else {
        Err(Error::InvalidCoordinate { lat, lng })
    }
}

pub fn to_point((lat, lng): (f64, f64)) -> Point<f64> {
    Point::new(lng, lat)
}

pub fn from_point(point: Point<f64>) -> (f64, f64) {
    (point.y(), point.x())
}

/// A census zone carrying numeric attributes such as population or jobs.
#[derive(Debug, Clone)]
pub struct Zone {
    pub id: String,
    pub geometry: MultiPolygon<f64>,
    pub values: BTreeMap<String, f64>,
}

impl Zone {
    pub fn new(id: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            id: id.into(),
            geometry,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, field: impl Into<String>, value: f64) -> Self {
        self.values.insert(field.into(), value);
        self
    }

    pub fn value(&self, field: &str) -> Result<f64> {
        self.values
            .get(field)
            .copied()
            .ok_or_else(|| Error::MissingField {
                zone: self.id.clone(),
                field: field.to_string(),
            })
    }

    /// Zone centroid as a location named after the zone.
    pub fn centroid(&self) -> Option<Location> {
        self.geometry.centroid().map(|point| {
            let (lat, lng) = from_point(point);
            Location::new(self.id.clone(), lat, lng)
        })
    }
}
