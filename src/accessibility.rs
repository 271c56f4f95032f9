//! Zone accessibility: census totals reachable from each zone within a
//! travel-time budget.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};

use crate::catchment::{progress_percent, require_fields, CensusOverlay, ServiceArea};
use crate::error::Result;
use crate::geometry::Zone;
use crate::mode::TravelMode;
use crate::traits::ServiceAreaProvider;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneAccessibility {
    pub zone_id: String,
    /// Keyed `{mode}_{YYYYmmdd_HHMM}_{field}`.
    pub values: BTreeMap<String, f64>,
}

pub fn column_name(mode: TravelMode, departure: NaiveDateTime, field: &str) -> String {
    format!("{}_{}_{}", mode, departure.format("%Y%m%d_%H%M"), field)
}

/// For every zone, sums `fields` over the census reachable from the zone
/// centroid within `travel_time_minutes`.
pub fn accessibility<P: ServiceAreaProvider + ?Sized>(
    provider: &P,
    census: &[Zone],
    fields: &[String],
    mode: TravelMode,
    travel_time_minutes: u32,
    departure: NaiveDateTime,
) -> Result<Vec<ZoneAccessibility>> {
    require_fields(fields)?;
    let overlay = CensusOverlay::new(census, fields)?;

    let columns: Vec<String> = fields
        .iter()
        .map(|field| column_name(mode, departure, field))
        .collect();
    let total = census.len();
    let mut last_logged_decile = 0;
    let mut results = Vec::with_capacity(total);

    for (index, zone) in census.iter().enumerate() {
        let isochrone = match zone.centroid() {
            Some(centroid) => provider
                .isochrones(centroid.coords(), mode, &[travel_time_minutes], departure)?
                .into_iter()
                .next(),
            None => {
                warn!(zone = %zone.id, "zone has no centroid");
                None
            }
        };

        let reachable: Vec<f64> = match isochrone {
            Some(isochrone) => {
                let catchment = ServiceArea {
                    name: zone.id.clone(),
                    cutoff_secs: isochrone.cutoff_secs,
                    geometry: isochrone.geometry,
                };
                let totals = overlay.totals(&catchment).totals;
                fields
                    .iter()
                    .map(|field| totals.get(field).copied().unwrap_or_default())
                    .collect()
            }
            None => vec![0.0; fields.len()],
        };

        results.push(ZoneAccessibility {
            zone_id: zone.id.clone(),
            values: columns.iter().cloned().zip(reachable).collect(),
        });

        let progress = progress_percent(index + 1, total);
        let decile = (progress / 10.0).floor() as usize;
        if decile > last_logged_decile {
            last_logged_decile = decile;
            info!(progress, "accessibility");
        }
    }

    Ok(results)
}
