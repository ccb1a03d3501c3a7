use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Information about a single satellite from TLE
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SatelliteInfo {
    pub name: String,
    pub norad_id: u32,
    pub tle_source: String,
    pub epoch: DateTime<Utc>,
}

/// One above-horizon sample of a pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct TrackPoint {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

/// A predicted satellite pass
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Pass {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub max_elevation_deg: f64,
    pub max_elevation_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub track: Vec<TrackPoint>,
    /// Set when the pass was still open at the end of the window.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}
