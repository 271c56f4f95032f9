//! Polyline representation for route geometries.
//!
//! Routes arrive from Google and OpenTripPlanner as encoded polylines and
//! from HERE as `"lat,lng"` strings. Both are decoded here into plain
//! coordinate sequences.

use geo::{Coord, LineString};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Precision used by Google and OpenTripPlanner encoded polylines.
pub const DEFAULT_PRECISION: u32 = 5;

/// A polyline representing a route geometry as decoded coordinates.
///
/// Each point is a (latitude, longitude) tuple.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<(f64, f64)>,
}

impl Polyline {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn into_points(self) -> Vec<(f64, f64)> {
        self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Decodes an encoded polyline string.
    pub fn decode(encoded: &str, precision: u32) -> Result<Self> {
        let factor = 10f64.powi(precision as i32);
        let bytes = encoded.as_bytes();
        let mut points = Vec::new();
        let mut index = 0;
        let mut lat: i64 = 0;
        let mut lng: i64 = 0;

        while index < bytes.len() {
            lat += next_value(bytes, &mut index)?;
            lng += next_value(bytes, &mut index)?;
            points.push((lat as f64 / factor, lng as f64 / factor));
        }

        Ok(Self { points })
    }

    pub fn encode(&self, precision: u32) -> String {
        let factor = 10f64.powi(precision as i32);
        let mut out = String::new();
        let mut prev = (0i64, 0i64);
        for &(lat, lng) in &self.points {
            let lat = (lat * factor).round() as i64;
            let lng = (lng * factor).round() as i64;
            push_value(lat - prev.0, &mut out);
            push_value(lng - prev.1, &mut out);
            prev = (lat, lng);
        }
        out
    }

    /// Parses HERE style shape points, e.g. `["52.5,13.4", ...]`.
    pub fn from_lat_lng_strings<S: AsRef<str>>(shape: &[S]) -> Result<Self> {
        shape
            .iter()
            .map(|pair| parse_lat_lng(pair.as_ref()))
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    /// Joins polylines end to end, dropping a point repeated at a joint.
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a Polyline>) -> Self {
        let mut points: Vec<(f64, f64)> = Vec::new();
        for part in parts {
            let joint = !points.is_empty() && points.last() == part.points.first();
            points.extend_from_slice(&part.points[usize::from(joint)..]);
        }
        Self { points }
    }

    pub fn to_line_string(&self) -> LineString<f64> {
        self.points
            .iter()
            .map(|&(lat, lng)| Coord { x: lng, y: lat })
            .collect()
    }
}

pub(crate) fn parse_lat_lng(pair: &str) -> Result<(f64, f64)> {
    let mut parts = pair.split(',').map(|part| part.trim().parse::<f64>());
    match (parts.next(), parts.next()) {
        (Some(Ok(lat)), Some(Ok(lng))) => Ok((lat, lng)),
        _ => Err(Error::InvalidInput(format!("bad coordinate pair {:?}", pair))),
    }
}

fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;
    loop {
        let byte = *bytes
            .get(*index)
            .ok_or_else(|| Error::InvalidInput("truncated polyline".to_string()))?;
        *index += 1;
        let chunk = i64::from(byte)
            .checked_sub(63)
            .filter(|chunk| (0..64).contains(chunk))
            .ok_or_else(|| Error::InvalidInput(format!("bad polyline byte {}", byte)))?;
        if shift > 60 {
            return Err(Error::InvalidInput("polyline value overflow".to_string()));
        }
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }

    Ok(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}

fn push_value(value: i64, out: &mut String) {
    let mut value = if value < 0 { !(value << 1) } else { value << 1 };
    while value >= 0x20 {
        out.push(char::from((0x20 | (value & 0x1f)) as u8 + 63));
        value >>= 5;
    }
    out.push(char::from(value as u8 + 63));
}
