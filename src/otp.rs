//! OpenTripPlanner (1.x REST) adapter for trip plans and isochrones.

use std::time::Duration;

use chrono::NaiveDateTime;
use geo::{LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::mode::TravelMode;
use crate::polyline::{Polyline, DEFAULT_PRECISION};
use crate::traits::{cutoff_secs, Isochrone, RouteProvider, ServiceAreaProvider};
use crate::trip::{fastest, from_epoch_millis, RouteRequest, TripLeg};

#[derive(Debug, Clone)]
pub struct OtpConfig {
    /// Router root, e.g. `http://localhost:8080/otp/routers/default`.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/otp/routers/default".to_string(),
            timeout_secs: 30,
        }
    }
}

impl OtpConfig {
    /// Uses `OTP_BASE_URL` when set, the local default otherwise.
    pub fn from_env() -> Self {
        match std::env::var("OTP_BASE_URL") {
            Ok(base_url) => Self {
                base_url,
                ..Self::default()
            },
            Err(_) => Self::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OtpClient {
    config: OtpConfig,
    client: reqwest::blocking::Client,
}

impl OtpClient {
    pub fn new(config: OtpConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

fn place((lat, lng): (f64, f64)) -> String {
    format!("{}, {}", lat, lng)
}

fn time_param(departure: NaiveDateTime) -> String {
    departure.format("%I:%M%P").to_string()
}

fn date_param(departure: NaiveDateTime) -> String {
    departure.format("%m-%d-%Y").to_string()
}

/// The isochrone endpoint takes dates as `YYYY/MM/DD`.
fn isochrone_date_param(departure: NaiveDateTime) -> String {
    departure.format("%Y/%m/%d").to_string()
}

impl RouteProvider for OtpClient {
    fn route(&self, request: &RouteRequest) -> Result<Vec<TripLeg>> {
        request.validate()?;
        let departure = request.departure_or_now();

        let params = [
            ("fromPlace", place(request.origin()?.coords())),
            ("toPlace", place(request.destination()?.coords())),
            ("time", time_param(departure)),
            ("date", date_param(departure)),
            ("mode", request.mode.otp()?.to_string()),
        ];
        let url = format!("{}/plan", self.config.base_url);
        debug!(%url, ?params, "otp plan request");

        let body = self
            .client
            .get(url)
            .query(&params)
            .send()
            .map_err(Error::http)?
            .error_for_status()
            .map_err(Error::http)?
            .json::<PlanResponse>()
            .map_err(Error::http)?;

        if let Some(error) = body.error {
            warn!(trip = %request.trip_name, %error, "otp returned a plan error");
            return Ok(Vec::new());
        }
        let itineraries = body.plan.map(|plan| plan.itineraries).unwrap_or_default();
        let Some(best) = fastest(&itineraries, |itinerary| itinerary.duration) else {
            return Ok(Vec::new());
        };

        let steps = itinerary_steps(&itineraries[best], &request.trip_name)?;
        Ok(request.finish(steps))
    }
}

fn itinerary_steps(itinerary: &Itinerary, trip_name: &str) -> Result<Vec<TripLeg>> {
    let mut rows = Vec::with_capacity(itinerary.legs.len());
    for (step_id, leg) in itinerary.legs.iter().enumerate() {
        let wait_time = itinerary
            .legs
            .get(step_id + 1)
            .map(|next| (next.start_time - leg.end_time) as f64 / 1000.0);
        let geometry = match &leg.leg_geometry {
            Some(encoded) => Polyline::decode(&encoded.points, DEFAULT_PRECISION)?,
            None => Polyline::default(),
        };

        rows.push(TripLeg {
            trip_name: trip_name.to_string(),
            leg_id: 0,
            step_id,
            mode: leg.mode.clone(),
            from: Some(leg.from.coords()),
            from_name: leg.from.label(),
            to: Some(leg.to.coords()),
            to_name: leg.to.label(),
            route_id: leg.route_id.as_ref().map(id_string).unwrap_or_default(),
            trip_id: leg.trip_id.as_ref().map(id_string).unwrap_or_default(),
            distance: leg.distance,
            duration: leg.duration,
            start_time: from_epoch_millis(leg.start_time),
            end_time: from_epoch_millis(leg.end_time),
            wait_time,
            geometry,
        });
    }
    Ok(rows)
}

impl ServiceAreaProvider for OtpClient {
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

        let mut params = vec![
            ("fromPlace", place(origin)),
            ("date", isochrone_date_param(departure)),
            ("time", time_param(departure)),
            ("mode", mode.otp()?.to_string()),
        ];
        for &minutes in breaks_minutes {
            params.push(("cutoffSec", cutoff_secs(minutes).to_string()));
        }
        let url = format!("{}/isochrone", self.config.base_url);
        debug!(%url, ?params, "otp isochrone request");

        let response = self.client.get(url).query(&params).send().map_err(Error::http)?;
        if response.status() == reqwest::StatusCode::INTERNAL_SERVER_ERROR {
            warn!(?origin, "otp isochrone failed with a server error");
            return Ok(Vec::new());
        }
        let response = response.error_for_status().map_err(Error::http)?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if content_type.contains("zip") {
            return Err(Error::UnsupportedFormat(content_type));
        }

        let collection = response.json::<FeatureCollection>().map_err(Error::http)?;
        features_to_isochrones(collection, breaks_minutes)
    }
}

fn features_to_isochrones(
    collection: FeatureCollection,
    breaks_minutes: &[u32],
) -> Result<Vec<Isochrone>> {
    let mut isochrones = Vec::new();
    for (index, feature) in collection.features.into_iter().enumerate() {
        let Some(geometry) = feature.geometry else {
            continue;
        };
        let cutoff = feature
            .properties
            .as_ref()
            .and_then(|properties| properties.get("time"))
            .and_then(value_as_u32)
            .or_else(|| breaks_minutes.get(index).map(|&minutes| cutoff_secs(minutes)))
            .unwrap_or_default();

        isochrones.push(Isochrone {
            cutoff_secs: cutoff,
            geometry: geometry.to_multi_polygon()?,
        });
    }
    Ok(isochrones)
}

fn value_as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number.as_f64().map(|n| n.round() as u32),
        Value::String(text) => text.trim().parse::<f64>().ok().map(|n| n.round() as u32),
        _ => None,
    }
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct PlanResponse {
    plan: Option<Plan>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Plan {
    #[serde(default)]
    itineraries: Vec<Itinerary>,
}

#[derive(Debug, Deserialize)]
struct Itinerary {
    duration: f64,
    #[serde(default)]
    legs: Vec<OtpLeg>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtpLeg {
    mode: String,
    route_id: Option<Value>,
    trip_id: Option<Value>,
    distance: Option<f64>,
    duration: Option<f64>,
    start_time: i64,
    end_time: i64,
    from: OtpPlace,
    to: OtpPlace,
    leg_geometry: Option<EncodedPolyline>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OtpPlace {
    name: Option<String>,
    stop_id: Option<Value>,
    lat: f64,
    lon: f64,
}

impl OtpPlace {
    fn coords(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }

    fn label(&self) -> String {
        self.stop_id
            .as_ref()
            .map(id_string)
            .or_else(|| self.name.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct EncodedPolyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<GeoJsonGeometry>,
    properties: Option<serde_json::Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct GeoJsonGeometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Value,
}

type Ring = Vec<[f64; 2]>;

impl GeoJsonGeometry {
    fn to_multi_polygon(&self) -> Result<MultiPolygon<f64>> {
        match self.kind.as_str() {
            "Polygon" => {
                let rings: Vec<Ring> = serde_json::from_value(self.coordinates.clone())?;
                Ok(MultiPolygon::new(vec![rings_to_polygon(rings)]))
            }
            "MultiPolygon" => {
                let polygons: Vec<Vec<Ring>> = serde_json::from_value(self.coordinates.clone())?;
                Ok(MultiPolygon::new(
                    polygons.into_iter().map(rings_to_polygon).collect(),
                ))
            }
            other => Err(Error::UnsupportedFormat(format!(
                "isochrone geometry type {}",
                other
            ))),
        }
    }
}

fn rings_to_polygon(rings: Vec<Ring>) -> Polygon<f64> {
    let mut rings = rings
        .into_iter()
        .map(|ring| ring.into_iter().map(|[x, y]| (x, y)).collect::<LineString<f64>>());
    let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
    Polygon::new(exterior, rings.collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn leg(mode: &str, start: i64, end: i64, stop_id: Option<&str>) -> Value {
        let route_id = (mode == "BUS").then_some("1:333");
        serde_json::json!({
            "mode": mode,
            "routeId": route_id,
            "distance": 500.0,
            "duration": ((end - start) / 1000) as f64,
            "startTime": start,
            "endTime": end,
            "from": {"name": "Origin", "stopId": stop_id, "lat": -33.87, "lon": 151.2},
            "to": {"name": "Destination", "lat": -33.88, "lon": 151.21},
            "legGeometry": {"points": "_p~iF~ps|U_ulLnnqC"}
        })
    }

    #[test]
    fn wait_time_is_gap_to_next_leg() {
        let itinerary: Itinerary = serde_json::from_value(serde_json::json!({
            "duration": 1500,
            "legs": [
                leg("WALK", 1_000_000, 1_300_000, None),
                leg("BUS", 1_420_000, 2_500_000, Some("1:2000")),
            ]
        }))
        .unwrap();

        let rows = itinerary_steps(&itinerary, "trip").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].wait_time, Some(120.0));
        assert_eq!(rows[1].wait_time, None);
        assert_eq!(rows[0].from_name, "Origin");
        assert_eq!(rows[1].from_name, "1:2000");
        assert_eq!(rows[1].route_id, "1:333");
        assert_eq!(rows[0].route_id, "");
        assert_eq!(rows[1].step_id, 1);
        assert_eq!(rows[1].leg_id, 0);
    }

    #[test]
    fn otp_time_and_date_formats() {
        let departure = NaiveDate::from_ymd_opt(2020, 3, 2)
            .unwrap()
            .and_hms_opt(17, 5, 0)
            .unwrap();
        assert_eq!(time_param(departure), "05:05pm");
        assert_eq!(date_param(departure), "03-02-2020");
        assert_eq!(isochrone_date_param(departure), "2020/03/02");
        assert_eq!(place((-33.5, 151.25)), "-33.5, 151.25");
    }

    #[test]
    fn features_skip_null_geometry() {
        let collection: FeatureCollection = serde_json::from_value(serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": null, "properties": {"time": 600}},
                {
                    "type": "Feature",
                    "properties": {"time": "1200"},
                    "geometry": {
                        "type": "MultiPolygon",
                        "coordinates": [[[[151.0, -34.0], [151.1, -34.0], [151.1, -33.9], [151.0, -34.0]]]]
                    }
                }
            ]
        }))
        .unwrap();

        let isochrones = features_to_isochrones(collection, &[10, 20]).unwrap();
        assert_eq!(isochrones.len(), 1);
        assert_eq!(isochrones[0].cutoff_secs, 1200);
        assert_eq!(isochrones[0].geometry.0.len(), 1);
    }

    #[test]
    fn features_without_time_use_the_break() {
        let collection: FeatureCollection = serde_json::from_value(serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[151.0, -34.0], [151.1, -34.0], [151.1, -33.9], [151.0, -34.0]]]
                }
            }]
        }))
        .unwrap();

        let isochrones = features_to_isochrones(collection, &[u32::MAX]).unwrap();
        assert_eq!(isochrones[0].cutoff_secs, u32::MAX);
    }

    #[test]
    fn unsupported_geometry_type() {
        let geometry = GeoJsonGeometry {
            kind: "Point".to_string(),
            coordinates: serde_json::json!([151.0, -34.0]),
        };
        assert!(matches!(
            geometry.to_multi_polygon(),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
