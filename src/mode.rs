//! Travel modes and their names in each routing API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    PublicTransport,
    CarInTraffic,
    CarFreeFlow,
    Walk,
    Cycle,
    Truck,
}

impl TravelMode {
    pub const ALL: [TravelMode; 6] = [
        TravelMode::PublicTransport,
        TravelMode::CarInTraffic,
        TravelMode::CarFreeFlow,
        TravelMode::Walk,
        TravelMode::Cycle,
        TravelMode::Truck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::PublicTransport => "public_transport",
            TravelMode::CarInTraffic => "car_in_traffic",
            TravelMode::CarFreeFlow => "car_free_flow",
            TravelMode::Walk => "walk",
            TravelMode::Cycle => "cycle",
            TravelMode::Truck => "truck",
        }
    }

    /// Google Maps `mode` parameter.
    pub fn google(&self) -> Result<&'static str> {
        match self {
            TravelMode::PublicTransport => Ok("transit"),
            TravelMode::CarInTraffic => Ok("driving"),
            TravelMode::Walk => Ok("walking"),
            TravelMode::Cycle => Ok("bicycling"),
            _ => Err(self.unsupported("google")),
        }
    }

    /// HERE routing 7.2 mode string (`type;transportMode[;trafficMode]`).
    pub fn here(&self) -> Result<&'static str> {
        Ok(match self {
            TravelMode::PublicTransport => "fastest;publicTransport",
            TravelMode::CarInTraffic => "fastest;car;traffic:enabled",
            TravelMode::CarFreeFlow => "fastest;car;traffic:disabled",
            TravelMode::Walk => "fastest;pedestrian",
            TravelMode::Cycle => "fastest;bicycle",
            TravelMode::Truck => "fastest;truck",
        })
    }

    /// OpenTripPlanner `mode` parameter.
    pub fn otp(&self) -> Result<&'static str> {
        match self {
            TravelMode::PublicTransport => Ok("TRANSIT,WALK"),
            TravelMode::CarFreeFlow => Ok("CAR"),
            TravelMode::Walk => Ok("WALK"),
            TravelMode::Cycle => Ok("BICYCLE"),
            _ => Err(self.unsupported("otp")),
        }
    }

    fn unsupported(&self, provider: &'static str) -> Error {
        Error::InvalidMode {
            provider,
            mode: self.as_str().to_string(),
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TravelMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("{} is an invalid travel mode", s)))
    }
}
