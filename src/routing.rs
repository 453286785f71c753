//! Road-following geometry from an OSRM driving-directions service.
//!
//! A matched road is drawn along the route OSRM finds between its two
//! endpoints. Every failure (transport error, non-success HTTP status,
//! a result code other than `Ok`, an empty route) degrades to the straight
//! line between the endpoints: single attempt, no retry.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{LonLat, RoadRecord};

/// Public OSRM demo server.
pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for routing operations.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Request could not be sent or the body could not be read.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Service answered with a non-success status.
    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),
    /// Service answered but found no usable route.
    #[error("no route found (code {0})")]
    NoRoute(String),
}

/// Source of road-following geometry between two points.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Returns the route geometry from `start` to `end`.
    async fn route(&self, start: LonLat, end: LonLat) -> Result<Vec<LonLat>, RoutingError>;
}

/// Where a drawn geometry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometrySource {
    /// Raw dataset coordinates.
    Dataset,
    /// Route returned by the routing service.
    Routed,
    /// Straight line substituted after a routing failure.
    Fallback,
}

/// Geometry ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadGeometry {
    pub path: Vec<LonLat>,
    pub source: GeometrySource,
}

impl RoadGeometry {
    /// The record's own coordinates.
    pub fn from_dataset(record: &RoadRecord) -> Self {
        Self {
            path: record.coordinates.clone(),
            source: GeometrySource::Dataset,
        }
    }

    /// Two-point line between the endpoints.
    pub fn straight(start: LonLat, end: LonLat) -> Self {
        Self {
            path: vec![start, end],
            source: GeometrySource::Fallback,
        }
    }
}

/// Asks `provider` for a route and substitutes the straight line on any
/// error.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use ruas_map::domain::LonLat;
/// use ruas_map::routing::{route_or_straight, GeometrySource, RouteProvider, RoutingError};
///
/// struct Unreachable;
///
/// #[async_trait]
/// impl RouteProvider for Unreachable {
///     async fn route(&self, _: LonLat, _: LonLat) -> Result<Vec<LonLat>, RoutingError> {
///         Err(RoutingError::NoRoute("NoSegment".into()))
///     }
/// }
///
/// # tokio_test_block(async {
/// let start = LonLat::new(110.15, -7.85);
/// let end = LonLat::new(110.16, -7.84);
/// let geometry = route_or_straight(&Unreachable, start, end).await;
/// assert_eq!(geometry.path, vec![start, end]);
/// assert_eq!(geometry.source, GeometrySource::Fallback);
/// # });
/// # fn tokio_test_block(f: impl std::future::Future<Output = ()>) {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
pub async fn route_or_straight<P: RouteProvider + ?Sized>(provider: &P, start: LonLat, end: LonLat) -> RoadGeometry {
    match provider.route(start, end).await {
        Ok(path) if path.len() >= 2 => {
            debug!(points = path.len(), "OSRM: route found");
            RoadGeometry {
                path,
                source: GeometrySource::Routed,
            }
        }
        Ok(path) => {
            warn!(points = path.len(), "OSRM: route too short, using straight line");
            RoadGeometry::straight(start, end)
        }
        Err(e) => {
            warn!("OSRM error: {}, using straight line", e);
            RoadGeometry::straight(start, end)
        }
    }
}

/// Routes one record between its start and end point.
pub async fn route_record<'a, P: RouteProvider + ?Sized>(
    provider: &P,
    record: &'a RoadRecord,
) -> (&'a RoadRecord, RoadGeometry) {
    let geometry = route_or_straight(provider, record.start(), record.end()).await;
    (record, geometry)
}

/// HTTP client for the OSRM `route` service.
pub struct OsrmClient {
    client: reqwest::Client,
    base_url: String,
}

impl OsrmClient {
    /// Creates a client for the given server URL.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RoutingError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(concat!("ruas-map/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// URL of a full-overview GeoJSON driving route between two points.
    ///
    /// ```
    /// use std::time::Duration;
    /// use ruas_map::domain::LonLat;
    /// use ruas_map::routing::OsrmClient;
    ///
    /// let client = OsrmClient::new("https://router.project-osrm.org/", Duration::from_secs(5)).unwrap();
    /// assert_eq!(
    ///     client.route_url(LonLat::new(110.15, -7.85), LonLat::new(110.16, -7.84)),
    ///     "https://router.project-osrm.org/route/v1/driving/110.15,-7.85;110.16,-7.84?overview=full&geometries=geojson"
    /// );
    /// ```
    pub fn route_url(&self, start: LonLat, end: LonLat) -> String {
        format!(
            "{}/route/v1/driving/{},{};{},{}?overview=full&geometries=geojson",
            self.base_url, start.lon, start.lat, end.lon, end.lat
        )
    }
}

#[async_trait]
impl RouteProvider for OsrmClient {
    async fn route(&self, start: LonLat, end: LonLat) -> Result<Vec<LonLat>, RoutingError> {
        let url = self.route_url(start, end);
        debug!(%url, "Requesting OSRM route");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(RoutingError::Status(response.status()));
        }

        let body: OsrmResponse = response.json().await?;
        body.into_path()
    }
}

// ============================================================================
// OSRM Response Structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

impl OsrmResponse {
    /// Geometry of the first route, if the service reported success.
    fn into_path(self) -> Result<Vec<LonLat>, RoutingError> {
        if self.code != "Ok" {
            return Err(RoutingError::NoRoute(self.code));
        }
        let route = self
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| RoutingError::NoRoute(self.code.clone()))?;

        let path: Vec<LonLat> = route
            .geometry
            .coordinates
            .into_iter()
            .map(|[lon, lat]| LonLat::new(lon, lat))
            .collect();

        if path.len() < 2 {
            return Err(RoutingError::NoRoute(self.code));
        }
        Ok(path)
    }
}
