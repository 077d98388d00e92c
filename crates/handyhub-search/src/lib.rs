//! Proximity search over service-provider candidates.
//!
//! Everything here is pure: no I/O, no shared state. Callers fetch a
//! candidate snapshot from the store and run [`search`] against it as often
//! as they like.

pub mod coordinate;
pub mod distance;
pub mod engine;
pub mod geolocation;

pub use coordinate::parse_coordinate;
pub use distance::{distance_km, EARTH_RADIUS_KM};
pub use engine::{search, search_with_distance, SearchHit, SearchQuery};
pub use geolocation::{
    resolve_origin, DeviceLocation, GeolocationError, LocationProvider, OriginError,
    OriginRequest,
};
