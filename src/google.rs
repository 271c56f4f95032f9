//! Google Maps Platform adapter (Directions and Distance Matrix APIs).

use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeZone};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::mode::TravelMode;
use crate::polyline::{Polyline, DEFAULT_PRECISION};
use crate::traits::{RouteProvider, TravelMatrix, TravelTimeMatrix};
use crate::trip::{fastest, from_epoch_secs, RouteRequest, TripLeg};

const PROVIDER: &str = "google";

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com".to_string(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

impl GoogleConfig {
    /// Reads the key from `GOOGLE_MAPS_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GOOGLE_MAPS_API_KEY")
            .map_err(|_| Error::InvalidInput("GOOGLE_MAPS_API_KEY is not set".to_string()))?;
        Ok(Self {
            api_key,
            ..Self::default()
        })
    }
}

#[derive(Debug, Clone)]
pub struct GoogleClient {
    config: GoogleConfig,
    client: reqwest::blocking::Client,
}

impl GoogleClient {
    pub fn new(config: GoogleConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        mut params: Vec<(&'static str, String)>,
    ) -> Result<T> {
        let url = format!("{}{}", self.config.base_url, path);
        debug!(%url, ?params, "google request");
        params.push(("key", self.config.api_key.clone()));

        let body = self
            .client
            .get(url)
            .query(&params)
            .send()
            .map_err(Error::http)?
            .error_for_status()
            .map_err(Error::http)?
            .json::<T>()
            .map_err(Error::http)?;
        Ok(body)
    }
}

impl RouteProvider for GoogleClient {
    fn route(&self, request: &RouteRequest) -> Result<Vec<TripLeg>> {
        request.validate()?;
        let mode = request.mode.google()?;

        let mut params = vec![
            ("origin", lat_lng(request.origin()?.coords())),
            ("destination", lat_lng(request.destination()?.coords())),
            ("mode", mode.to_string()),
            ("departure_time", unix_secs(request.departure_or_now()).to_string()),
            ("alternatives", "true".to_string()),
        ];
        if !request.waypoints().is_empty() {
            let waypoints = request
                .waypoints()
                .iter()
                .map(|location| lat_lng(location.coords()))
                .collect::<Vec<_>>()
                .join("|");
            params.push(("waypoints", waypoints));
        }

        let body: DirectionsResponse = self.get("/maps/api/directions/json", params)?;
        match body.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" | "NOT_FOUND" => {
                warn!(trip = %request.trip_name, status = %body.status, "google found no route");
                return Ok(Vec::new());
            }
            _ => {
                return Err(Error::Api {
                    provider: PROVIDER,
                    status: body.status,
                    message: body.error_message.unwrap_or_default(),
                });
            }
        }

        let Some(best) = fastest(&body.routes, GoogleRoute::total_duration) else {
            return Ok(Vec::new());
        };

        let steps = route_steps(&body.routes[best], &request.trip_name)?;
        Ok(request.finish(steps))
    }
}

fn route_steps(route: &GoogleRoute, trip_name: &str) -> Result<Vec<TripLeg>> {
    let mut rows = Vec::new();
    for (leg_id, leg) in route.legs.iter().enumerate() {
        for (step_id, step) in leg.steps.iter().enumerate() {
            let transit = step.transit_details.as_ref();
            let geometry = match &step.polyline {
                Some(encoded) => Polyline::decode(&encoded.points, DEFAULT_PRECISION)?,
                None => Polyline::default(),
            };

            rows.push(TripLeg {
                trip_name: trip_name.to_string(),
                leg_id,
                step_id,
                mode: step.travel_mode.clone(),
                from: Some(step.start_location.coords()),
                from_name: transit
                    .and_then(|details| details.departure_stop.as_ref())
                    .map_or_else(|| leg.start_address.clone(), |stop| stop.name.clone()),
                to: Some(step.end_location.coords()),
                to_name: transit
                    .and_then(|details| details.arrival_stop.as_ref())
                    .map_or_else(|| leg.end_address.clone(), |stop| stop.name.clone()),
                route_id: transit
                    .and_then(|details| details.line.as_ref())
                    .and_then(TransitLine::label)
                    .unwrap_or_default(),
                distance: step.distance.as_ref().map(|d| d.value),
                duration: step.duration.as_ref().map(|d| d.value),
                start_time: transit
                    .and_then(|details| details.departure_time.as_ref())
                    .and_then(|t| from_epoch_secs(t.value)),
                end_time: transit
                    .and_then(|details| details.arrival_time.as_ref())
                    .and_then(|t| from_epoch_secs(t.value)),
                geometry,
                ..TripLeg::default()
            });
        }
    }
    Ok(rows)
}

impl TravelTimeMatrix for GoogleClient {
    fn matrix_for(
        &self,
        origins: &[(f64, f64)],
        destinations: &[(f64, f64)],
        mode: TravelMode,
        departure: NaiveDateTime,
    ) -> Result<TravelMatrix> {
        if origins.is_empty() || destinations.is_empty() {
            return Ok(TravelMatrix::default());
        }
        let google_mode = mode.google()?;

        let mut params = vec![
            ("origins", join_coords(origins)),
            ("destinations", join_coords(destinations)),
            ("mode", google_mode.to_string()),
            ("departure_time", unix_secs(departure).to_string()),
            ("language", "en-AU".to_string()),
            ("units", "metric".to_string()),
        ];
        if mode == TravelMode::CarInTraffic {
            params.push(("traffic_model", "optimistic".to_string()));
        }

        let body: DistanceMatrixResponse = self.get("/maps/api/distancematrix/json", params)?;
        if body.status != "OK" {
            return Err(Error::Api {
                provider: PROVIDER,
                status: body.status,
                message: body.error_message.unwrap_or_default(),
            });
        }

        let mut matrix = TravelMatrix {
            origins: origins.len(),
            destinations: destinations.len(),
            durations: Vec::with_capacity(origins.len() * destinations.len()),
            distances: Vec::with_capacity(origins.len() * destinations.len()),
        };
        for row_index in 0..origins.len() {
            let elements = body
                .rows
                .get(row_index)
                .map(|row| row.elements.as_slice())
                .unwrap_or_default();
            for column in 0..destinations.len() {
                let element = elements.get(column).filter(|e| e.status == "OK");
                matrix.durations.push(element.and_then(|e| {
                    e.duration_in_traffic
                        .as_ref()
                        .or(e.duration.as_ref())
                        .map(|d| d.value)
                }));
                matrix
                    .distances
                    .push(element.and_then(|e| e.distance.as_ref().map(|d| d.value)));
            }
        }
        Ok(matrix)
    }
}

fn lat_lng((lat, lng): (f64, f64)) -> String {
    format!("{:.6},{:.6}", lat, lng)
}

fn join_coords(coords: &[(f64, f64)]) -> String {
    coords.iter().map(|c| lat_lng(*c)).collect::<Vec<_>>().join("|")
}

/// Interprets a naive departure as local wall-clock time.
fn unix_secs(departure: NaiveDateTime) -> i64 {
    Local
        .from_local_datetime(&departure)
        .earliest()
        .map(|local| local.timestamp())
        .unwrap_or_else(|| departure.and_utc().timestamp())
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<GoogleRoute>,
}

#[derive(Debug, Deserialize)]
struct GoogleRoute {
    #[serde(default)]
    legs: Vec<GoogleLeg>,
}

impl GoogleRoute {
    fn total_duration(&self) -> f64 {
        self.legs
            .iter()
            .filter_map(|leg| leg.duration.as_ref())
            .map(|d| d.value)
            .sum()
    }
}

#[derive(Debug, Deserialize)]
struct GoogleLeg {
    #[serde(default)]
    start_address: String,
    #[serde(default)]
    end_address: String,
    duration: Option<ValueField>,
    #[serde(default)]
    steps: Vec<GoogleStep>,
}

#[derive(Debug, Deserialize)]
struct GoogleStep {
    #[serde(default)]
    travel_mode: String,
    start_location: LatLngField,
    end_location: LatLngField,
    distance: Option<ValueField>,
    duration: Option<ValueField>,
    polyline: Option<EncodedPolyline>,
    transit_details: Option<TransitDetails>,
}

#[derive(Debug, Deserialize)]
struct LatLngField {
    lat: f64,
    lng: f64,
}

impl LatLngField {
    fn coords(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }
}

#[derive(Debug, Deserialize)]
struct ValueField {
    value: f64,
}

#[derive(Debug, Deserialize)]
struct TimeField {
    value: i64,
}

#[derive(Debug, Deserialize)]
struct EncodedPolyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct TransitDetails {
    line: Option<TransitLine>,
    departure_stop: Option<TransitStop>,
    arrival_stop: Option<TransitStop>,
    departure_time: Option<TimeField>,
    arrival_time: Option<TimeField>,
}

#[derive(Debug, Deserialize)]
struct TransitLine {
    short_name: Option<String>,
    name: Option<String>,
}

impl TransitLine {
    fn label(&self) -> Option<String> {
        self.short_name.clone().or_else(|| self.name.clone())
    }
}

#[derive(Debug, Deserialize)]
struct TransitStop {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    duration: Option<ValueField>,
    duration_in_traffic: Option<ValueField>,
    distance: Option<ValueField>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transit_step_uses_stop_names_and_line() {
        let route: GoogleRoute = serde_json::from_value(serde_json::json!({
            "legs": [{
                "start_address": "Town Hall",
                "end_address": "Bondi",
                "duration": {"value": 900},
                "steps": [
                    {
                        "travel_mode": "WALKING",
                        "start_location": {"lat": -33.87, "lng": 151.2},
                        "end_location": {"lat": -33.871, "lng": 151.201},
                        "distance": {"value": 120},
                        "duration": {"value": 90},
                        "polyline": {"points": "_p~iF~ps|U_ulLnnqC"}
                    },
                    {
                        "travel_mode": "TRANSIT",
                        "start_location": {"lat": -33.871, "lng": 151.201},
                        "end_location": {"lat": -33.89, "lng": 151.27},
                        "distance": {"value": 7000},
                        "duration": {"value": 810},
                        "transit_details": {
                            "line": {"short_name": "333", "name": "Bondi Beach"},
                            "departure_stop": {"name": "Elizabeth St"},
                            "arrival_stop": {"name": "Bondi Beach"},
                            "departure_time": {"value": 1700000000},
                            "arrival_time": {"value": 1700000810}
                        }
                    }
                ]
            }]
        }))
        .unwrap();

        let rows = route_steps(&route, "commute").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].from_name, "Town Hall");
        assert_eq!(rows[0].geometry.points().len(), 2);
        assert_eq!(rows[1].step_id, 1);
        assert_eq!(rows[1].route_id, "333");
        assert_eq!(rows[1].from_name, "Elizabeth St");
        assert_eq!(rows[1].distance, Some(7000.0));
        assert_eq!(rows[1].end_time.unwrap().timestamp(), 1_700_000_810);
        assert_eq!(route.total_duration(), 900.0);
    }

    #[test]
    fn coords_are_lat_first() {
        assert_eq!(lat_lng((-33.5, 151.25)), "-33.500000,151.250000");
        assert_eq!(
            join_coords(&[(1.0, 2.0), (3.0, 4.0)]),
            "1.000000,2.000000|3.000000,4.000000"
        );
    }
}
