//! Trip records returned by every routing provider.

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::Location;
use crate::mode::TravelMode;
use crate::polyline::Polyline;

/// How much of a route to report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteDetail {
    /// One row per step (maneuver, or transit leg for OpenTripPlanner).
    #[default]
    Detailed,
    /// One row per leg between consecutive requested locations.
    Simple,
}

/// One row of a trip: a step of a leg, or a whole leg in simple output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripLeg {
    pub trip_name: String,
    pub leg_id: usize,
    pub step_id: usize,
    /// Provider's mode name for the step, or the requested mode for summaries.
    pub mode: String,
    /// (lat, lng)
    pub from: Option<(f64, f64)>,
    pub from_name: String,
    pub to: Option<(f64, f64)>,
    pub to_name: String,
    pub route_id: String,
    pub trip_id: String,
    /// Metres.
    pub distance: Option<f64>,
    /// Seconds.
    pub duration: Option<f64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds.
    pub wait_time: Option<f64>,
    pub geometry: Polyline,
}

#[derive(Debug, Clone)]
pub struct RouteRequest {
    /// Origin first, destination last; anything between is a waypoint.
    pub locations: Vec<Location>,
    pub mode: TravelMode,
    /// Departure wall-clock time; now when unset.
    pub departure: Option<NaiveDateTime>,
    pub trip_name: String,
    pub detail: RouteDetail,
}

impl RouteRequest {
    pub fn new(origin: Location, destination: Location, mode: TravelMode) -> Self {
        Self {
            locations: vec![origin, destination],
            mode,
            departure: None,
            trip_name: String::new(),
            detail: RouteDetail::default(),
        }
    }

    pub fn departure(mut self, departure: NaiveDateTime) -> Self {
        self.departure = Some(departure);
        self
    }

    pub fn trip_name(mut self, name: impl Into<String>) -> Self {
        self.trip_name = name.into();
        self
    }

    pub fn detail(mut self, detail: RouteDetail) -> Self {
        self.detail = detail;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.check_endpoints()?;
        self.locations.iter().try_for_each(Location::validate)
    }

    fn check_endpoints(&self) -> Result<()> {
        if self.locations.len() < 2 {
            return Err(Error::InvalidInput(format!(
                "a route needs an origin and a destination, got {} location(s)",
                self.locations.len()
            )));
        }
        Ok(())
    }

    pub fn origin(&self) -> Result<&Location> {
        self.check_endpoints()?;
        self.locations
            .first()
            .ok_or_else(|| Error::InvalidInput("a route needs an origin".to_string()))
    }

    pub fn destination(&self) -> Result<&Location> {
        self.check_endpoints()?;
        self.locations
            .last()
            .ok_or_else(|| Error::InvalidInput("a route needs a destination".to_string()))
    }

    /// Locations between the origin and the destination, empty when there are none.
    pub fn waypoints(&self) -> &[Location] {
        let end = self.locations.len().saturating_sub(1);
        self.locations.get(1..end).unwrap_or_default()
    }

    pub fn departure_or_now(&self) -> NaiveDateTime {
        self.departure
            .unwrap_or_else(|| Local::now().naive_local())
    }

    /// Applies the requested detail level to provider step rows.
    pub fn finish(&self, steps: Vec<TripLeg>) -> Vec<TripLeg> {
        match self.detail {
            RouteDetail::Detailed => steps,
            RouteDetail::Simple => summarize(&steps, self.mode),
        }
    }
}

/// Collapses step rows into one row per `leg_id`.
pub fn summarize(steps: &[TripLeg], mode: TravelMode) -> Vec<TripLeg> {
    let mut legs: Vec<TripLeg> = Vec::new();
    let mut start = 0;
    while start < steps.len() {
        let leg_id = steps[start].leg_id;
        let end = steps[start..]
            .iter()
            .position(|step| step.leg_id != leg_id)
            .map_or(steps.len(), |offset| start + offset);
        legs.push(summarize_leg(&steps[start..end], mode));
        start = end;
    }
    legs
}

fn summarize_leg(steps: &[TripLeg], mode: TravelMode) -> TripLeg {
    let first = &steps[0];
    let last = &steps[steps.len() - 1];

    TripLeg {
        trip_name: first.trip_name.clone(),
        leg_id: first.leg_id,
        step_id: 0,
        mode: mode.to_string(),
        from: first.from,
        from_name: first.from_name.clone(),
        to: last.to,
        to_name: last.to_name.clone(),
        route_id: join_distinct(steps.iter().map(|step| step.route_id.as_str())),
        trip_id: join_distinct(steps.iter().map(|step| step.trip_id.as_str())),
        distance: sum_present(steps.iter().map(|step| step.distance)),
        duration: sum_present(steps.iter().map(|step| step.duration)),
        start_time: first.start_time,
        end_time: last.end_time,
        wait_time: sum_present(steps.iter().map(|step| step.wait_time)),
        geometry: Polyline::concat(steps.iter().map(|step| &step.geometry)),
    }
}

fn sum_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().fold(None, |acc, value| Some(acc.unwrap_or(0.0) + value))
}

fn join_distinct<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for value in values {
        if !value.is_empty() && !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen.join(",")
}

/// Index of the candidate with the least duration; earlier wins ties.
pub fn fastest<T>(candidates: &[T], duration: impl Fn(&T) -> f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let value = duration(candidate);
        match best {
            Some((_, best_value)) if best_value <= value => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, _)| index)
}

/// Converts provider epoch timestamps.
pub(crate) fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

pub(crate) fn from_epoch_secs(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}
