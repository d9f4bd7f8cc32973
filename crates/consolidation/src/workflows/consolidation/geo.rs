//! Geospatial collaborator: travel distance and duration between two points.
//!
//! Providers may report a degraded estimate (`DistanceStatus::Fallback`) instead of failing;
//! the engine treats those as valid inputs. Hard failures surface as [`GeoError`] and are
//! recovered by the impact estimator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::Coordinates;

pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const DEFAULT_FALLBACK_SPEED_KMH: f64 = 30.0;

pub const OSRM_ROUTE_API_PATH: &str = "/route/v1/driving/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DistanceStatus {
    Ok,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteEstimate {
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub status: DistanceStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("no route between the requested points")]
    NoRoute,

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait GeoDistance: Send + Sync {
    async fn distance(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteEstimate, GeoError>;
}

/// Great-circle distance in kilometres.
pub fn haversine_km(origin: Coordinates, destination: Coordinates) -> f64 {
    let lat1 = origin.latitude.to_radians();
    let lat2 = destination.latitude.to_radians();
    let d_lat = (destination.latitude - origin.latitude).to_radians();
    let d_lon = (destination.longitude - origin.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Local estimate: straight-line distance at a fixed average speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HaversineDistance {
    pub speed_kmh: f64,
}

impl Default for HaversineDistance {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_FALLBACK_SPEED_KMH,
        }
    }
}

impl HaversineDistance {
    pub fn new(speed_kmh: f64) -> Self {
        let speed_kmh = if speed_kmh.is_finite() && speed_kmh > 0.0 {
            speed_kmh
        } else {
            DEFAULT_FALLBACK_SPEED_KMH
        };
        Self { speed_kmh }
    }

    pub fn estimate(&self, origin: Coordinates, destination: Coordinates) -> RouteEstimate {
        let distance_km = haversine_km(origin, destination);
        RouteEstimate {
            distance_km,
            duration_minutes: distance_km / self.speed_kmh * 60.0,
            status: DistanceStatus::Fallback,
        }
    }
}

#[async_trait]
impl GeoDistance for HaversineDistance {
    async fn distance(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteEstimate, GeoError> {
        Ok(self.estimate(origin, destination))
    }
}

#[derive(Deserialize)]
struct OsrmRouteResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    /// Metres
    distance: f64,
    /// Seconds
    duration: f64,
}

pub struct OsrmDistanceClientParams {
    pub osrm_url: String,
}

/// Road-network distances from an OSRM `route` service.
pub struct OsrmDistanceClient {
    params: OsrmDistanceClientParams,
    client: reqwest::Client,
}

impl OsrmDistanceClient {
    pub fn new(params: OsrmDistanceClientParams) -> Self {
        Self {
            params,
            client: reqwest::Client::new(),
        }
    }

    fn route_url(&self, origin: Coordinates, destination: Coordinates) -> String {
        let mut url = self.params.osrm_url.trim_end_matches('/').to_string();
        url.push_str(OSRM_ROUTE_API_PATH);
        url.push_str(&format!(
            "{},{};{},{}",
            origin.longitude, origin.latitude, destination.longitude, destination.latitude
        ));
        url
    }
}

#[async_trait]
impl GeoDistance for OsrmDistanceClient {
    async fn distance(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteEstimate, GeoError> {
        let response = self
            .client
            .get(self.route_url(origin, destination))
            .query(&[("overview", "false")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() && status != reqwest::StatusCode::BAD_REQUEST {
            let message = response.text().await.unwrap_or_default();
            return Err(GeoError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: OsrmRouteResponse = response.json().await?;
        if body.code != "Ok" {
            if body.code == "NoRoute" {
                return Err(GeoError::NoRoute);
            }
            return Err(GeoError::Api {
                status: status.as_u16(),
                message: body.message.unwrap_or(body.code),
            });
        }

        let route = body.routes.first().ok_or(GeoError::NoRoute)?;
        if !route.distance.is_finite() || !route.duration.is_finite() {
            return Err(GeoError::InvalidResponse(
                "route distance or duration is not a number".to_string(),
            ));
        }

        Ok(RouteEstimate {
            distance_km: route.distance / 1000.0,
            duration_minutes: route.duration / 60.0,
            status: DistanceStatus::Ok,
        })
    }
}

/// Provider selected at start-up.
pub enum GeoProvider {
    Osrm(OsrmDistanceClient),
    Haversine(HaversineDistance),
}

impl GeoProvider {
    pub fn from_url(url: Option<&str>) -> Self {
        match url {
            Some(osrm_url) => GeoProvider::Osrm(OsrmDistanceClient::new(
                OsrmDistanceClientParams {
                    osrm_url: osrm_url.to_string(),
                },
            )),
            None => GeoProvider::Haversine(HaversineDistance::default()),
        }
    }
}

#[async_trait]
impl GeoDistance for GeoProvider {
    async fn distance(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<RouteEstimate, GeoError> {
        match self {
            GeoProvider::Osrm(client) => client.distance(origin, destination).await,
            GeoProvider::Haversine(estimator) => estimator.distance(origin, destination).await,
        }
    }
}
