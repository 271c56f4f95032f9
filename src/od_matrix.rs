//! Origin-destination batch routing.

use std::time::Instant;

use chrono::{Local, NaiveDateTime};
use geo::Intersects;
use tracing::info;

use crate::error::Result;
use crate::geometry::Location;
use crate::mode::TravelMode;
use crate::traits::{RouteProvider, ServiceAreaProvider};
use crate::trip::{RouteRequest, TripLeg};

#[derive(Debug, Clone)]
pub struct OdOptions {
    pub mode: TravelMode,
    /// Only destinations inside the origin's isochrone for this many
    /// minutes are routed. `None` routes every pair.
    pub max_travel_time: Option<u32>,
    pub departure: NaiveDateTime,
}

impl OdOptions {
    pub fn new(mode: TravelMode) -> Self {
        Self {
            mode,
            max_travel_time: Some(60),
            departure: Local::now().naive_local(),
        }
    }
}

/// Routes every origin to the destinations it can reach.
///
/// Trip rows are named `from {origin} to {destination}` and returned in
/// origin order, then destination order.
pub fn od_matrix<R, S>(
    router: &R,
    areas: &S,
    origins: &[Location],
    destinations: &[Location],
    options: &OdOptions,
) -> Result<Vec<TripLeg>>
where
    R: RouteProvider + ?Sized,
    S: ServiceAreaProvider + ?Sized,
{
    origins.iter().try_for_each(Location::validate)?;
    destinations.iter().try_for_each(Location::validate)?;

    let started = Instant::now();
    info!(origins = origins.len(), destinations = destinations.len(), "od analysis started");

    let mut rows = Vec::new();
    for (done, origin) in origins.iter().enumerate() {
        let reachable: Vec<&Location> = match options.max_travel_time {
            Some(minutes) => {
                let isochrones = areas.isochrones(
                    origin.coords(),
                    options.mode,
                    &[minutes],
                    options.departure,
                )?;
                destinations
                    .iter()
                    .filter(|destination| {
                        let point = destination.point();
                        isochrones
                            .iter()
                            .any(|isochrone| isochrone.geometry.intersects(&point))
                    })
                    .collect()
            }
            None => destinations.iter().collect(),
        };

        for destination in &reachable {
            let request = RouteRequest::new(origin.clone(), (*destination).clone(), options.mode)
                .departure(options.departure)
                .trip_name(format!("from {} to {}", origin.name, destination.name));
            rows.extend(router.route(&request)?);
        }

        let elapsed = started.elapsed();
        let remaining_origins = origins.len() - done - 1;
        let eta = elapsed.mul_f64(remaining_origins as f64 / (done + 1) as f64);
        info!(
            origin = %origin.name,
            destinations = reachable.len(),
            remaining_origins,
            eta_secs = eta.as_secs(),
            "od origin routed"
        );
    }

    info!(elapsed_secs = started.elapsed().as_secs_f64(), rows = rows.len(), "od analysis finished");
    Ok(rows)
}
