use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::predict::error::PredictError;

// WGS-84
const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6378.137;
const EARTH_ECCENTRICITY_SQ: f64 = 0.00669437999014;

/// Geodetic position of a ground observer. Longitude is East-positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ObserverLocation {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    #[serde(default)]
    pub altitude_m: f64,
}

impl ObserverLocation {
    /// Builds a validated location. A missing altitude is taken as 0 m.
    pub fn new(
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_m: Option<f64>,
    ) -> Result<Self, PredictError> {
        let location = Self {
            latitude_deg,
            longitude_deg,
            altitude_m: altitude_m.unwrap_or(0.0),
        };
        location.validate()?;
        Ok(location)
    }

    /// Parses `"lat,lon"`.
    pub fn from_coordinates(coordinates: &str, altitude_m: Option<f64>) -> Option<Self> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() < 2 {
            return None;
        }
        let lat = parts[0].parse().ok()?;
        let lon = parts[1].parse().ok()?;
        Self::new(lat, lon, altitude_m).ok()
    }

    pub fn validate(&self) -> Result<(), PredictError> {
        if !(-90.0..=90.0).contains(&self.latitude_deg) {
            return Err(PredictError::InvalidLocation(format!(
                "latitude {} outside [-90, 90]",
                self.latitude_deg
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude_deg) {
            return Err(PredictError::InvalidLocation(format!(
                "longitude {} outside [-180, 180]",
                self.longitude_deg
            )));
        }
        if !self.altitude_m.is_finite() {
            return Err(PredictError::InvalidLocation(format!(
                "altitude {} is not a finite number",
                self.altitude_m
            )));
        }
        Ok(())
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn altitude_km(&self) -> f64 {
        self.altitude_m / 1000.0
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let n = EARTH_EQUATORIAL_RADIUS_KM / (1.0 - EARTH_ECCENTRICITY_SQ * sin_lat * sin_lat).sqrt();
        let alt_km = self.altitude_km();
        let x = (n + alt_km) * cos_lat * lon.cos();
        let y = (n + alt_km) * cos_lat * lon.sin();
        let z = (n * (1.0 - EARTH_ECCENTRICITY_SQ) + alt_km) * sin_lat;
        [x, y, z]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_latitude() {
        let err = ObserverLocation::new(95.0, 0.0, None).unwrap_err();
        assert!(matches!(err, PredictError::InvalidLocation(_)));
    }

    #[test]
    fn rejects_out_of_range_longitude() {
        let err = ObserverLocation::new(10.0, -180.5, Some(0.0)).unwrap_err();
        assert!(matches!(err, PredictError::InvalidLocation(_)));
    }

    #[test]
    fn accepts_negative_altitude_and_defaults_missing_altitude() {
        let below = ObserverLocation::new(31.5, 35.5, Some(-430.0)).unwrap();
        assert_eq!(below.altitude_m, -430.0);

        let unknown = ObserverLocation::new(51.5, -0.12, None).unwrap();
        assert_eq!(unknown.altitude_m, 0.0);
    }

    #[test]
    fn parses_coordinate_string() {
        let loc = ObserverLocation::from_coordinates("51.5074, -0.1278", Some(35.0)).unwrap();
        assert_eq!(loc.latitude_deg, 51.5074);
        assert_eq!(loc.longitude_deg, -0.1278);
        assert_eq!(loc.altitude_m, 35.0);

        assert!(ObserverLocation::from_coordinates("51.5", None).is_none());
        assert!(ObserverLocation::from_coordinates("91,0", None).is_none());
    }

    #[test]
    fn ecef_on_equator_and_pole() {
        let equator = ObserverLocation::new(0.0, 0.0, None).unwrap();
        let [x, y, z] = equator.position_ecef_km();
        assert!((x - EARTH_EQUATORIAL_RADIUS_KM).abs() < 1e-9);
        assert!(y.abs() < 1e-9);
        assert!(z.abs() < 1e-9);

        let pole = ObserverLocation::new(90.0, 0.0, Some(1000.0)).unwrap();
        let [x, _, z] = pole.position_ecef_km();
        assert!(x.abs() < 1e-6);
        // polar radius plus one kilometre
        assert!((z - 6356.752_314_2 - 1.0).abs() < 1e-3);
    }
}
