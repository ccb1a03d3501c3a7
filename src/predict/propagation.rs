use chrono::{DateTime, Utc};
use sgp4::{Constants, Elements};

use crate::predict::error::{PredictError, PropagationFailure};
use crate::predict::observer::ObserverLocation;
use crate::predict::tle_loader::check_tle_line;

/// Topocentric direction from an observer to a satellite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngles {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

/// Satellite position in the Earth-fixed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatellitePosition {
    pub timestamp: DateTime<Utc>,
    pub ecef_km: [f64; 3],
}

/// Maps an absolute time to where the satellite appears from an observer.
///
/// Implementations are called once per scan step and must be deterministic
/// for the scan to be reproducible.
pub trait Propagator {
    fn look_angles(
        &self,
        observer: &ObserverLocation,
        timestamp: DateTime<Utc>,
    ) -> Result<LookAngles, PropagationFailure>;
}

impl<F> Propagator for F
where
    F: Fn(&ObserverLocation, DateTime<Utc>) -> Result<LookAngles, PropagationFailure>,
{
    fn look_angles(
        &self,
        observer: &ObserverLocation,
        timestamp: DateTime<Utc>,
    ) -> Result<LookAngles, PropagationFailure> {
        self(observer, timestamp)
    }
}

/// A parsed two-line element set ready for SGP4 propagation.
pub struct OrbitalElements {
    elements: Elements,
    constants: Constants,
}

impl std::fmt::Debug for OrbitalElements {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrbitalElements")
            .field("norad_id", &self.elements.norad_id)
            .field("name", &self.elements.object_name)
            .field("epoch", &self.elements.datetime)
            .finish()
    }
}

impl OrbitalElements {
    pub fn from_lines(
        name: Option<String>,
        line1: &str,
        line2: &str,
    ) -> Result<Self, PredictError> {
        let line1 = check_tle_line(line1, 1)?;
        let line2 = check_tle_line(line2, 2)?;

        let elements = Elements::from_tle(name, line1.as_bytes(), line2.as_bytes())
            .map_err(|e| PredictError::MalformedElements(e.to_string()))?;
        let constants = Constants::from_elements(&elements)
            .map_err(|e| PredictError::MalformedElements(e.to_string()))?;

        Ok(Self {
            elements,
            constants,
        })
    }

    pub fn norad_id(&self) -> u32 {
        self.elements.norad_id as u32
    }

    pub fn name(&self) -> Option<&str> {
        self.elements.object_name.as_deref()
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.elements.datetime.and_utc()
    }

    /// SGP4 position at `timestamp`, rotated from TEME into the Earth-fixed frame.
    pub fn propagate(
        &self,
        timestamp: DateTime<Utc>,
    ) -> Result<SatellitePosition, PropagationFailure> {
        let naive = timestamp.naive_utc();
        let minutes = self
            .elements
            .datetime_to_minutes_since_epoch(&naive)
            .map_err(|e| PropagationFailure::new(timestamp, e.to_string()))?;

        let prediction = self
            .constants
            .propagate(minutes)
            .map_err(|e| PropagationFailure::new(timestamp, e.to_string()))?;

        if prediction.position.iter().any(|c| !c.is_finite()) {
            return Err(PropagationFailure::new(timestamp, "non-finite position"));
        }

        let sidereal = sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&naive));

        Ok(SatellitePosition {
            timestamp,
            ecef_km: teme_to_ecef_position(prediction.position, sidereal),
        })
    }
}

impl Propagator for OrbitalElements {
    fn look_angles(
        &self,
        observer: &ObserverLocation,
        timestamp: DateTime<Utc>,
    ) -> Result<LookAngles, PropagationFailure> {
        let position = self.propagate(timestamp)?;
        Ok(to_look_angles(observer, &position))
    }
}

pub fn to_look_angles(observer: &ObserverLocation, position: &SatellitePosition) -> LookAngles {
    let sta_ecef = observer.position_ecef_km();
    let sat_ecef = position.ecef_km;

    let dr = [
        sat_ecef[0] - sta_ecef[0],
        sat_ecef[1] - sta_ecef[1],
        sat_ecef[2] - sta_ecef[2],
    ];
    let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();

    let (east, north, up) = ecef_to_enu(dr, observer.lat_rad(), observer.lon_rad());
    let elevation_deg = if range_km > 0.0 {
        (up / range_km).clamp(-1.0, 1.0).asin().to_degrees()
    } else {
        0.0
    };

    LookAngles {
        azimuth_deg: normalize_azimuth(east.atan2(north).to_degrees()),
        elevation_deg,
    }
}

/// Wraps an azimuth into `[0, 360)`.
pub fn normalize_azimuth(azimuth_deg: f64) -> f64 {
    let wrapped = azimuth_deg.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}
