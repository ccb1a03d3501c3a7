use chrono::{DateTime, Duration, Utc};

use crate::predict::error::PredictError;
use crate::predict::observer::ObserverLocation;
use crate::predict::propagation::{normalize_azimuth, Propagator};
use crate::predict::types::{Pass, TrackPoint};

pub const DEFAULT_STEP_SECONDS: i64 = 60;
pub const DEFAULT_MAX_TRACK_POINTS: usize = 30;
pub const MAX_STEP_SECONDS: i64 = 86_400;
const HORIZON_ELEVATION: f64 = 0.0;

/// Tuning knobs for the horizon scan
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSettings {
    /// Sampling interval; bounds the timing precision of start, end and peak.
    pub step: Duration,
    /// Upper bound on the plotted track length of each pass.
    pub max_track_points: usize,
    /// Emit passes still above the horizon when the window closes.
    pub include_truncated_passes: bool,
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            step: Duration::seconds(DEFAULT_STEP_SECONDS),
            max_track_points: DEFAULT_MAX_TRACK_POINTS,
            include_truncated_passes: false,
        }
    }
}

impl PredictionSettings {
    pub fn validate(&self) -> Result<(), PredictError> {
        if self.step <= Duration::zero() {
            return Err(PredictError::InvalidArgument(format!(
                "step must be positive, got {}s",
                self.step.num_seconds()
            )));
        }
        if self.step > Duration::seconds(MAX_STEP_SECONDS) {
            return Err(PredictError::InvalidArgument(format!(
                "step must be at most {}s, got {}s",
                MAX_STEP_SECONDS,
                self.step.num_seconds()
            )));
        }
        if self.max_track_points == 0 {
            return Err(PredictError::InvalidArgument(
                "max_track_points must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Running state of a pass that has risen but not yet set.
struct OpenPass {
    start: DateTime<Utc>,
    max_elevation_deg: f64,
    max_elevation_time: DateTime<Utc>,
    track: Vec<TrackPoint>,
}

impl OpenPass {
    fn rise(timestamp: DateTime<Utc>, point: TrackPoint) -> Self {
        Self {
            start: timestamp,
            max_elevation_deg: point.elevation_deg,
            max_elevation_time: timestamp,
            track: vec![point],
        }
    }

    fn observe(&mut self, timestamp: DateTime<Utc>, point: TrackPoint) {
        // strict comparison keeps the earliest time on ties
        if point.elevation_deg > self.max_elevation_deg {
            self.max_elevation_deg = point.elevation_deg;
            self.max_elevation_time = timestamp;
        }
        self.track.push(point);
    }

    fn close(self, end: DateTime<Utc>, max_track_points: usize, truncated: bool) -> Pass {
        Pass {
            start: self.start,
            end,
            max_elevation_deg: self.max_elevation_deg,
            max_elevation_time: self.max_elevation_time,
            duration_minutes: duration_minutes(self.start, end),
            track: downsample_track(self.track, max_track_points),
            truncated,
        }
    }
}

enum ScanState {
    Idle,
    InPass(OpenPass),
}

pub struct PassFinder {
    settings: PredictionSettings,
}

impl Default for PassFinder {
    fn default() -> Self {
        Self::new(PredictionSettings::default())
    }
}

impl PassFinder {
    pub fn new(settings: PredictionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PredictionSettings {
        &self.settings
    }

    /// Find all passes of one satellite over `observer` in
    /// `[window_start, window_start + window_days)`.
    pub fn find_passes<P: Propagator + ?Sized>(
        &self,
        propagator: &P,
        observer: &ObserverLocation,
        window_start: DateTime<Utc>,
        window_days: i64,
    ) -> Result<Vec<Pass>, PredictError> {
        observer.validate()?;
        if window_days <= 0 {
            return Err(PredictError::InvalidArgument(format!(
                "window_days must be positive, got {}",
                window_days
            )));
        }
        self.settings.validate()?;

        let window_end = Duration::try_days(window_days)
            .and_then(|d| window_start.checked_add_signed(d))
            .ok_or_else(|| {
                PredictError::InvalidArgument(format!("window of {} days overflows", window_days))
            })?;

        let mut passes = Vec::new();
        let mut state = ScanState::Idle;
        let mut samples = 0usize;
        let mut failures = 0usize;
        let mut cursor = window_start;

        while cursor < window_end {
            samples += 1;
            let sample = match propagator.look_angles(observer, cursor) {
                Ok(angles) => Some(angles),
                Err(e) => {
                    log::debug!("Treating sample as below horizon: {}", e);
                    failures += 1;
                    None
                }
            };

            let above = sample
                .filter(|s| s.elevation_deg > HORIZON_ELEVATION)
                .map(|s| TrackPoint {
                    azimuth_deg: normalize_azimuth(s.azimuth_deg),
                    elevation_deg: s.elevation_deg,
                });

            state = match (state, above) {
                (ScanState::Idle, Some(point)) => ScanState::InPass(OpenPass::rise(cursor, point)),
                (ScanState::InPass(mut open), Some(point)) => {
                    open.observe(cursor, point);
                    ScanState::InPass(open)
                }
                (ScanState::InPass(open), None) => {
                    passes.push(open.close(cursor, self.settings.max_track_points, false));
                    ScanState::Idle
                }
                (ScanState::Idle, None) => ScanState::Idle,
            };

            // overflow past chrono's last date is necessarily beyond window_end
            match cursor.checked_add_signed(self.settings.step) {
                Some(next) => cursor = next,
                None => break,
            }
        }

        if let ScanState::InPass(open) = state {
            if self.settings.include_truncated_passes {
                passes.push(open.close(window_end, self.settings.max_track_points, true));
            } else {
                log::debug!(
                    "Discarding pass still in progress at window end (rose at {})",
                    open.start
                );
            }
        }

        if samples > 0 && failures == samples {
            log::warn!(
                "Propagation failed for all {} samples starting {}; no passes predicted",
                samples,
                window_start
            );
        }

        Ok(passes)
    }
}

/// Find all passes with the default 60 s step and 30-point tracks
pub fn predict_passes<P: Propagator + ?Sized>(
    propagator: &P,
    observer: &ObserverLocation,
    window_start: DateTime<Utc>,
    window_days: i64,
) -> Result<Vec<Pass>, PredictError> {
    PassFinder::default().find_passes(propagator, observer, window_start, window_days)
}

/// Index-uniform selection of at most `max_points` samples: index
/// `floor(i * n / max_points)` for each `i`. Not uniform in time or arc length.
pub fn downsample_track(track: Vec<TrackPoint>, max_points: usize) -> Vec<TrackPoint> {
    let n = track.len();
    if n <= max_points {
        return track;
    }
    (0..max_points).map(|i| track[i * n / max_points]).collect()
}

fn duration_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    ((end - start).num_milliseconds() as f64 / 60_000.0).round() as i64
}
