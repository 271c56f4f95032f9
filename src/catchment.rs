//! Catchments (service areas) and the census totals they cover.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use geo::{Area, BooleanOps, BoundingRect, MultiPolygon, Rect};
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::geometry::{Location, Zone};
use crate::mode::TravelMode;
use crate::traits::ServiceAreaProvider;

/// Catchments overlaid per progress step.
const BATCH_SIZE: usize = 10;

/// An isochrone tagged with the origin it was computed for.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceArea {
    pub name: String,
    pub cutoff_secs: u32,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatchmentTotals {
    pub name: String,
    pub cutoff_secs: u32,
    pub totals: BTreeMap<String, f64>,
}

/// Computes one isochrone per break for every origin.
pub fn service_areas<P: ServiceAreaProvider + ?Sized>(
    provider: &P,
    origins: &[Location],
    mode: TravelMode,
    breaks_minutes: &[u32],
    departure: NaiveDateTime,
) -> Result<Vec<ServiceArea>> {
    let mut areas = Vec::new();
    for origin in origins {
        origin.validate()?;
        let isochrones = provider.isochrones(origin.coords(), mode, breaks_minutes, departure)?;
        areas.extend(isochrones.into_iter().map(|isochrone| ServiceArea {
            name: origin.name.clone(),
            cutoff_secs: isochrone.cutoff_secs,
            geometry: isochrone.geometry,
        }));
    }
    Ok(areas)
}

struct PreparedZone<'a> {
    zone: &'a Zone,
    area: f64,
    bounds: Option<Rect<f64>>,
}

/// Census zones prepared once for repeated catchment overlays.
pub struct CensusOverlay<'a> {
    zones: Vec<PreparedZone<'a>>,
    fields: &'a [String],
}

impl<'a> CensusOverlay<'a> {
    /// Fails when any zone lacks one of `fields`.
    pub fn new(census: &'a [Zone], fields: &'a [String]) -> Result<Self> {
        for zone in census {
            for field in fields {
                zone.value(field)?;
            }
        }

        let zones = census
            .par_iter()
            .map(|zone| PreparedZone {
                zone,
                area: zone.geometry.unsigned_area(),
                bounds: zone.geometry.bounding_rect(),
            })
            .collect();

        Ok(Self { zones, fields })
    }

    /// Every zone contributes `value * area(zone ∩ catchment) / area(zone)`.
    pub fn totals(&self, catchment: &ServiceArea) -> CatchmentTotals {
        let mut totals: BTreeMap<String, f64> = self
            .fields
            .iter()
            .map(|field| (field.clone(), 0.0))
            .collect();
        let bounds = catchment.geometry.bounding_rect();

        for prepared in &self.zones {
            if prepared.area <= 0.0 || !rects_overlap(bounds, prepared.bounds) {
                continue;
            }
            let covered = catchment
                .geometry
                .intersection(&prepared.zone.geometry)
                .unsigned_area();
            if covered <= 0.0 {
                continue;
            }
            let share = covered / prepared.area;
            for (field, total) in totals.iter_mut() {
                *total += prepared.zone.values.get(field).copied().unwrap_or_default() * share;
            }
        }

        CatchmentTotals {
            name: catchment.name.clone(),
            cutoff_secs: catchment.cutoff_secs,
            totals,
        }
    }
}

/// Sums area-weighted census fields inside each catchment.
///
/// Catchments are overlaid in parallel batches; output order matches input.
pub fn catchment_pop(
    catchments: &[ServiceArea],
    census: &[Zone],
    fields: &[String],
) -> Result<Vec<CatchmentTotals>> {
    let overlay = CensusOverlay::new(census, fields)?;

    let total = catchments.len();
    let mut results = Vec::with_capacity(total);
    for (batch_index, batch) in catchments.chunks(BATCH_SIZE).enumerate() {
        let batch_totals: Vec<CatchmentTotals> = batch
            .par_iter()
            .map(|catchment| overlay.totals(catchment))
            .collect();
        results.extend(batch_totals);

        let done = ((batch_index + 1) * BATCH_SIZE).min(total);
        info!(progress = progress_percent(done, total), "catchment overlay");
    }

    Ok(results)
}

fn rects_overlap(a: Option<Rect<f64>>, b: Option<Rect<f64>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            a.min().x <= b.max().x
                && b.min().x <= a.max().x
                && a.min().y <= b.max().y
                && b.min().y <= a.max().y
        }
        _ => false,
    }
}

/// Percentage rounded to one decimal, capped at 100.
pub(crate) fn progress_percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let percent = (done as f64 / total as f64 * 1000.0).round() / 10.0;
    percent.min(100.0)
}

pub(crate) fn require_fields(fields: &[String]) -> Result<()> {
    if fields.is_empty() {
        return Err(Error::InvalidInput("at least one census field is required".to_string()));
    }
    Ok(())
}
