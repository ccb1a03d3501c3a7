use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::Serialize;
use strum_macros::Display;
use utoipa::ToSchema;

const CIVIL_TWILIGHT_DEG: f64 = -6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Daylight {
    Day,
    Twilight,
    Night,
}

/// Approximate solar elevation in degrees. Good to a couple of degrees,
/// enough to tell day from night; ignores the equation of time.
pub fn sun_elevation_deg(timestamp: DateTime<Utc>, latitude_deg: f64, longitude_deg: f64) -> f64 {
    let day_of_year = timestamp.ordinal() as f64;
    let declination = -23.45 * (360.0 / 365.0 * (day_of_year + 10.0)).to_radians().cos();
    let hours = timestamp.hour() as f64 + timestamp.minute() as f64 / 60.0;
    let hour_angle = (hours - 12.0) * 15.0 + longitude_deg;

    let lat = latitude_deg.to_radians();
    let dec = declination.to_radians();
    let sin_elevation = lat.sin() * dec.sin() + lat.cos() * dec.cos() * hour_angle.to_radians().cos();
    sin_elevation.clamp(-1.0, 1.0).asin().to_degrees()
}

pub fn daylight(timestamp: DateTime<Utc>, latitude_deg: f64, longitude_deg: f64) -> Daylight {
    let elevation = sun_elevation_deg(timestamp, latitude_deg, longitude_deg);
    if elevation > 0.0 {
        Daylight::Day
    } else if elevation > CIVIL_TWILIGHT_DEG {
        Daylight::Twilight
    } else {
        Daylight::Night
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn equinox_noon_on_equator_is_near_zenith() {
        let noon = Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap();
        let elevation = sun_elevation_deg(noon, 0.0, 0.0);
        assert!(elevation > 85.0, "elevation {elevation}");
        assert_eq!(daylight(noon, 0.0, 0.0), Daylight::Day);
    }

    #[test]
    fn midnight_is_night() {
        let midnight = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(daylight(midnight, 0.0, 0.0), Daylight::Night);
    }

    #[test]
    fn london_winter_dusk_is_twilight() {
        // sunset in London around 15:55 UTC on the solstice
        let dusk = Utc.with_ymd_and_hms(2025, 12, 21, 16, 20, 0).unwrap();
        let elevation = sun_elevation_deg(dusk, 51.5, -0.13);
        assert!((-6.0..0.0).contains(&elevation), "elevation {elevation}");
        assert_eq!(daylight(dusk, 51.5, -0.13), Daylight::Twilight);
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(Daylight::Twilight.to_string(), "twilight");
    }
}
