mod filter;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use utoipa::ToSchema;

use crate::predict::{
    daylight, Daylight, ObserverLocation, Pass, PassFinder, PredictError, TleCatalog, TleEntry,
};

pub use filter::{next_pass, NextPass, PassFilter};

const EXCELLENT_ELEVATION_DEG: f64 = 45.0;
const GOOD_ELEVATION_DEG: f64 = 25.0;

/// A satellite the site tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SatelliteTarget {
    pub norad_id: u32,
    pub name: String,
    #[serde(default)]
    pub frequency: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Quality {
    Excellent,
    Good,
    Fair,
}

impl Quality {
    pub fn from_elevation(max_elevation_deg: f64) -> Self {
        if max_elevation_deg >= EXCELLENT_ELEVATION_DEG {
            Quality::Excellent
        } else if max_elevation_deg >= GOOD_ELEVATION_DEG {
            Quality::Good
        } else {
            Quality::Fair
        }
    }
}

/// A pass as published to the site: angles rounded to 0.1 degrees.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PassSummary {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub max_elevation: f64,
    pub max_elevation_time: DateTime<Utc>,
    /// Minutes
    pub duration: i64,
    /// `[azimuth, elevation]` pairs in degrees
    #[schema(value_type = Vec<Vec<f64>>)]
    pub track: Vec<[f64; 2]>,
    pub quality: Quality,
    pub daylight: Daylight,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl PassSummary {
    pub fn from_pass(pass: &Pass, location: &ObserverLocation) -> Self {
        Self {
            start: pass.start,
            end: pass.end,
            max_elevation: round1(pass.max_elevation_deg),
            max_elevation_time: pass.max_elevation_time,
            duration: pass.duration_minutes,
            track: pass
                .track
                .iter()
                .map(|p| [round1(p.azimuth_deg), round1(p.elevation_deg)])
                .collect(),
            quality: Quality::from_elevation(pass.max_elevation_deg),
            daylight: daylight(pass.start, location.latitude_deg, location.longitude_deg),
            truncated: pass.truncated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SatelliteReport {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    pub passes: Vec<PassSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LocationSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PassReport {
    pub success: bool,
    pub location: LocationSummary,
    /// Keyed by NORAD id
    pub satellites: BTreeMap<u32, SatelliteReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_pass: Option<NextPass>,
    /// Reference time for `next_pass`
    pub window_start: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
}

impl PassReport {
    pub fn assemble(
        location: &ObserverLocation,
        location_name: Option<&str>,
        satellites: impl IntoIterator<Item = (u32, SatelliteReport)>,
        window_start: DateTime<Utc>,
    ) -> Self {
        let mut report = Self {
            success: true,
            location: LocationSummary {
                name: location_name.map(String::from),
                lat: location.latitude_deg,
                lon: location.longitude_deg,
                alt: location.altitude_m,
            },
            satellites: satellites.into_iter().collect(),
            next_pass: None,
            window_start,
            generated_at: Utc::now(),
        };
        report.next_pass = next_pass(&report, window_start);
        report
    }

    pub fn pass_count(&self) -> usize {
        self.satellites.values().map(|s| s.passes.len()).sum()
    }
}

/// Predict one satellite. Missing elements or a failed prediction are
/// recorded in the report entry instead of failing the whole run.
pub fn predict_satellite(
    finder: &PassFinder,
    target: &SatelliteTarget,
    entry: Option<&TleEntry>,
    location: &ObserverLocation,
    start: DateTime<Utc>,
    days: i64,
) -> SatelliteReport {
    let mut report = SatelliteReport {
        name: target.name.clone(),
        frequency: target.frequency.clone(),
        passes: Vec::new(),
        error: None,
    };

    let Some(entry) = entry else {
        log::warn!("No orbital elements loaded for {} ({})", target.name, target.norad_id);
        report.error = Some(format!(
            "no orbital elements loaded for NORAD {}",
            target.norad_id
        ));
        return report;
    };

    match finder.find_passes(&entry.elements, location, start, days) {
        Ok(passes) => {
            log::debug!("{}: {} passes", target.name, passes.len());
            report.passes = passes
                .iter()
                .map(|p| PassSummary::from_pass(p, location))
                .collect();
        }
        Err(e) => {
            log::warn!("Failed to predict passes for {}: {}", target.name, e);
            report.error = Some(e.to_string());
        }
    }
    report
}

/// Predict every target sequentially for one location.
pub fn build_report(
    finder: &PassFinder,
    catalog: &TleCatalog,
    targets: &[SatelliteTarget],
    location: &ObserverLocation,
    location_name: Option<&str>,
    start: DateTime<Utc>,
    days: i64,
) -> Result<PassReport, PredictError> {
    validate_request(finder, location, days)?;

    let satellites = targets.iter().map(|target| {
        let entry = catalog.get(target.norad_id);
        let report = predict_satellite(finder, target, entry.as_deref(), location, start, days);
        (target.norad_id, report)
    });

    Ok(PassReport::assemble(location, location_name, satellites, start))
}

/// Argument checks shared by every report entry point, so that bad input
/// surfaces as an error rather than as per-satellite failures.
pub fn validate_request(
    finder: &PassFinder,
    location: &ObserverLocation,
    days: i64,
) -> Result<(), PredictError> {
    location.validate()?;
    if days <= 0 {
        return Err(PredictError::InvalidArgument(format!(
            "days must be positive, got {}",
            days
        )));
    }
    finder.settings().validate()
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::TrackPoint;
    use chrono::{Duration, TimeZone};

    const ISS_TLE: &str = "ISS (ZARYA)
1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992
2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008
";

    fn london() -> ObserverLocation {
        ObserverLocation::new(51.5074, -0.1278, None).unwrap()
    }

    fn targets() -> Vec<SatelliteTarget> {
        vec![
            SatelliteTarget {
                norad_id: 25544,
                name: "ISS".into(),
                frequency: Some("145.800 MHz FM".into()),
            },
            SatelliteTarget {
                norad_id: 57166,
                name: "Meteor-M N2-3".into(),
                frequency: Some("137.9 MHz LRPT".into()),
            },
        ]
    }

    #[test]
    fn quality_thresholds() {
        assert_eq!(Quality::from_elevation(45.0), Quality::Excellent);
        assert_eq!(Quality::from_elevation(44.9), Quality::Good);
        assert_eq!(Quality::from_elevation(25.0), Quality::Good);
        assert_eq!(Quality::from_elevation(24.9), Quality::Fair);
        assert_eq!(Quality::Excellent.to_string(), "excellent");
    }

    #[test]
    fn summary_rounds_to_one_decimal() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 2, 0, 0).unwrap();
        let pass = Pass {
            start,
            end: start + Duration::minutes(12),
            max_elevation_deg: 47.26,
            max_elevation_time: start + Duration::minutes(6),
            duration_minutes: 12,
            track: vec![TrackPoint {
                azimuth_deg: 123.456,
                elevation_deg: 0.04,
            }],
            truncated: false,
        };
        let summary = PassSummary::from_pass(&pass, &london());
        assert_eq!(summary.max_elevation, 47.3);
        assert_eq!(summary.track, vec![[123.5, 0.0]]);
        assert_eq!(summary.quality, Quality::Excellent);
        assert_eq!(summary.daylight, Daylight::Night);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["duration"], 12);
        assert_eq!(json["quality"], "excellent");
        assert_eq!(json["daylight"], "night");
        assert!(json.get("truncated").is_none());
    }

    #[test]
    fn report_records_missing_elements_per_satellite() {
        let mut catalog = TleCatalog::new(None);
        catalog.insert_text(ISS_TLE, "inline").unwrap();
        let start = catalog.get(25544).unwrap().info.epoch;
        let before = Utc::now();

        let report = build_report(
            &PassFinder::default(),
            &catalog,
            &targets(),
            &london(),
            Some("London"),
            start,
            2,
        )
        .unwrap();

        assert!(report.success);
        assert_eq!(report.window_start, start);
        assert!(report.generated_at >= before);
        let iss = &report.satellites[&25544];
        assert!(iss.error.is_none());
        assert!(!iss.passes.is_empty());
        assert_eq!(report.pass_count(), iss.passes.len());

        let meteor = &report.satellites[&57166];
        assert!(meteor.passes.is_empty());
        assert!(meteor.error.as_deref().unwrap().contains("57166"));

        let next = report.next_pass.as_ref().unwrap();
        let upcoming = iss
            .passes
            .iter()
            .find(|p| p.start > report.window_start)
            .unwrap();
        assert_eq!(next.norad_id, 25544);
        assert_eq!(&next.pass, upcoming);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["location"]["name"], "London");
        assert_eq!(json["satellites"]["25544"]["frequency"], "145.800 MHz FM");
    }

    #[test]
    fn invalid_request_fails_the_whole_report() {
        let catalog = TleCatalog::new(None);
        let start = Utc::now();
        let bad = ObserverLocation {
            latitude_deg: 95.0,
            longitude_deg: 0.0,
            altitude_m: 0.0,
        };
        assert!(matches!(
            build_report(&PassFinder::default(), &catalog, &targets(), &bad, None, start, 7),
            Err(PredictError::InvalidLocation(_))
        ));
        assert!(matches!(
            build_report(&PassFinder::default(), &catalog, &targets(), &london(), None, start, 0),
            Err(PredictError::InvalidArgument(_))
        ));
    }
}
