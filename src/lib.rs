//! transport-analyst: routing and accessibility tools for transport planners.
//!
//! Clients for Google Maps, HERE and OpenTripPlanner share the provider
//! traits in [`traits`]; the analysis modules build OD matrices, catchment
//! totals and zone accessibility on top of them.

pub mod accessibility;
pub mod catchment;
pub mod error;
pub mod geometry;
pub mod google;
pub mod here;
pub mod matrix;
pub mod mode;
pub mod od_matrix;
pub mod otp;
pub mod polyline;
pub mod traits;
pub mod trip;

pub use error::{Error, Result};
pub use geometry::{Location, Zone};
pub use mode::TravelMode;
pub use trip::{RouteDetail, RouteRequest, TripLeg};
