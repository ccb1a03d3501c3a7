use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::{PassReport, PassSummary};

/// Selects the passes worth showing: not yet over and peaking at or above
/// `min_elevation`.
#[derive(Debug, Clone, PartialEq)]
pub struct PassFilter {
    pub now: DateTime<Utc>,
    pub min_elevation: f64,
}

impl PassFilter {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            min_elevation: 0.0,
        }
    }

    pub fn matches(&self, pass: &PassSummary) -> bool {
        pass.end > self.now && pass.max_elevation >= self.min_elevation
    }

    pub fn apply(&self, report: &PassReport) -> PassReport {
        let mut filtered = report.clone();
        for satellite in filtered.satellites.values_mut() {
            satellite.passes.retain(|p| self.matches(p));
        }
        filtered.next_pass = next_pass(&filtered, self.now);
        filtered
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct NextPass {
    pub norad_id: u32,
    pub satellite: String,
    pub pass: PassSummary,
}

/// The earliest pass over all satellites that starts after `now`.
pub fn next_pass(report: &PassReport, now: DateTime<Utc>) -> Option<NextPass> {
    report
        .satellites
        .iter()
        .flat_map(|(norad_id, sat)| sat.passes.iter().map(move |p| (*norad_id, sat, p)))
        .filter(|(_, _, p)| p.start > now)
        .min_by_key(|(_, _, p)| p.start)
        .map(|(norad_id, sat, p)| NextPass {
            norad_id,
            satellite: sat.name.clone(),
            pass: p.clone(),
        })
}
