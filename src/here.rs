//! HERE Routing 7.2 adapter (calculateroute and calculateisoline).

use std::time::Duration;

use chrono::NaiveDateTime;
use geo::{LineString, MultiPolygon, Polygon};
use reqwest::blocking::Response;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::mode::TravelMode;
use crate::polyline::{parse_lat_lng, Polyline};
use crate::traits::{cutoff_secs, Isochrone, RouteProvider, ServiceAreaProvider};
use crate::trip::{RouteRequest, TripLeg};

#[derive(Debug, Clone)]
pub struct HereConfig {
    pub route_url: String,
    pub isoline_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for HereConfig {
    fn default() -> Self {
        Self {
            route_url: "https://route.ls.hereapi.com".to_string(),
            isoline_url: "https://isoline.route.ls.hereapi.com".to_string(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

impl HereConfig {
    /// Reads the key from `HERE_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("HERE_API_KEY")
            .map_err(|_| Error::InvalidInput("HERE_API_KEY is not set".to_string()))?;
        Ok(Self {
            api_key,
            ..Self::default()
        })
    }
}

#[derive(Debug, Clone)]
pub struct HereClient {
    config: HereConfig,
    client: reqwest::blocking::Client,
}

impl HereClient {
    pub fn new(config: HereConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn send(&self, url: String, mut params: Vec<(String, String)>) -> Result<Response> {
        debug!(%url, ?params, "here request");
        params.push(("apiKey".to_string(), self.config.api_key.clone()));

        self.client
            .get(url)
            .query(&params)
            .send()
            .map_err(Error::http)
    }

    fn get<T: for<'de> Deserialize<'de>>(
        &self,
        url: String,
        params: Vec<(String, String)>,
    ) -> Result<T> {
        read_json(self.send(url, params)?)
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T> {
    response
        .error_for_status()
        .map_err(Error::http)?
        .json::<T>()
        .map_err(Error::http)
}

fn departure_param(departure: NaiveDateTime) -> String {
    departure.format("%Y-%m-%dT%H:%M:00").to_string()
}

fn lat_lng((lat, lng): (f64, f64)) -> String {
    format!("{},{}", lat, lng)
}

impl RouteProvider for HereClient {
    fn route(&self, request: &RouteRequest) -> Result<Vec<TripLeg>> {
        request.validate()?;

        let mut params = vec![
            ("mode".to_string(), request.mode.here()?.to_string()),
            ("departure".to_string(), departure_param(request.departure_or_now())),
            ("representation".to_string(), "display".to_string()),
        ];
        for (index, location) in request.locations.iter().enumerate() {
            params.push((format!("waypoint{}", index), lat_lng(location.coords())));
        }

        let url = format!("{}/routing/7.2/calculateroute.json", self.config.route_url);
        let response = self.send(url, params)?;
        if response.status() == StatusCode::BAD_REQUEST {
            let text = response.text().map_err(Error::http)?;
            let error: HereError = serde_json::from_str(&text).unwrap_or_default();
            if error.subtype.as_deref() == Some("NoRouteFound") {
                warn!(trip = %request.trip_name, details = ?error.details, "here found no route");
                return Ok(Vec::new());
            }
            return Err(Error::Api {
                provider: "here",
                status: error.subtype.unwrap_or_else(|| StatusCode::BAD_REQUEST.to_string()),
                message: error.details.unwrap_or(text),
            });
        }
        let body: RouteEnvelope = read_json(response)?;

        let Some(route) = body.response.route.into_iter().next() else {
            warn!(trip = %request.trip_name, "here returned no route");
            return Ok(Vec::new());
        };

        let steps = maneuver_steps(&route, request)?;
        Ok(request.finish(steps))
    }
}

fn maneuver_steps(route: &HereRoute, request: &RouteRequest) -> Result<Vec<TripLeg>> {
    let mut rows = Vec::new();
    for (leg_id, leg) in route.leg.iter().enumerate() {
        let leg_end = leg.end.as_ref().map(|waypoint| waypoint.mapped_position.coords());
        let from_name = request
            .locations
            .get(leg_id)
            .map(|location| location.name.clone())
            .unwrap_or_default();
        let to_name = request
            .locations
            .get(leg_id + 1)
            .map(|location| location.name.clone())
            .unwrap_or_default();

        for (step_id, maneuver) in leg.maneuver.iter().enumerate() {
            let to = leg
                .maneuver
                .get(step_id + 1)
                .map(|next| next.position.coords())
                .or(leg_end);

            rows.push(TripLeg {
                trip_name: request.trip_name.clone(),
                leg_id,
                step_id,
                mode: request.mode.here()?.to_string(),
                from: Some(maneuver.position.coords()),
                from_name: from_name.clone(),
                to,
                to_name: to_name.clone(),
                distance: maneuver.length,
                duration: maneuver.travel_time,
                geometry: Polyline::from_lat_lng_strings(&maneuver.shape)?,
                ..TripLeg::default()
            });
        }
    }
    Ok(rows)
}

impl ServiceAreaProvider for HereClient {
    fn isochrones(
        &self,
        origin: (f64, f64),
        mode: TravelMode,
        breaks_minutes: &[u32],
        departure: NaiveDateTime,
    ) -> Result<Vec<Isochrone>> {
        crate::geometry::validate_coords(origin)?;
        if breaks_minutes.is_empty() {
            return Ok(Vec::new());
        }

        let range = breaks_minutes
            .iter()
            .map(|&minutes| cutoff_secs(minutes).to_string())
            .collect::<Vec<_>>()
            .join(",");
        let params = vec![
            ("mode".to_string(), mode.here()?.to_string()),
            ("start".to_string(), lat_lng(origin)),
            ("departure".to_string(), departure_param(departure)),
            ("rangetype".to_string(), "time".to_string()),
            ("range".to_string(), range),
        ];

        let url = format!("{}/routing/7.2/calculateisoline.json", self.config.isoline_url);
        let body: IsolineEnvelope = self.get(url, params)?;
        let Some(isolines) = body.response.isoline else {
            warn!(?origin, "here returned no isoline");
            return Ok(Vec::new());
        };

        isolines.iter().map(isoline_to_isochrone).collect()
    }
}

fn isoline_to_isochrone(isoline: &HereIsoline) -> Result<Isochrone> {
    let polygons = isoline
        .component
        .iter()
        .map(|component| {
            let exterior = component
                .shape
                .iter()
                .map(|pair| parse_lat_lng(pair).map(|(lat, lng)| (lng, lat)))
                .collect::<Result<Vec<_>>>()?;
            Ok(Polygon::new(LineString::from(exterior), Vec::new()))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Isochrone {
        cutoff_secs: isoline.range,
        geometry: MultiPolygon::new(polygons),
    })
}

/// Body of a HERE 4xx response.
#[derive(Debug, Default, Deserialize)]
struct HereError {
    subtype: Option<String>,
    details: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RouteEnvelope {
    response: RouteBody,
}

#[derive(Debug, Deserialize)]
struct RouteBody {
    #[serde(default)]
    route: Vec<HereRoute>,
}

#[derive(Debug, Deserialize)]
struct HereRoute {
    #[serde(default)]
    leg: Vec<HereLeg>,
}

#[derive(Debug, Deserialize)]
struct HereLeg {
    end: Option<HereWaypoint>,
    #[serde(default)]
    maneuver: Vec<HereManeuver>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HereWaypoint {
    mapped_position: HerePosition,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HereManeuver {
    position: HerePosition,
    length: Option<f64>,
    travel_time: Option<f64>,
    #[serde(default)]
    shape: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct HerePosition {
    latitude: f64,
    longitude: f64,
}

impl HerePosition {
    fn coords(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

#[derive(Debug, Deserialize)]
struct IsolineEnvelope {
    response: IsolineBody,
}

#[derive(Debug, Deserialize)]
struct IsolineBody {
    isoline: Option<Vec<HereIsoline>>,
}

#[derive(Debug, Deserialize)]
struct HereIsoline {
    range: u32,
    #[serde(default)]
    component: Vec<HereComponent>,
}

#[derive(Debug, Deserialize)]
struct HereComponent {
    #[serde(default)]
    shape: Vec<String>,
}
