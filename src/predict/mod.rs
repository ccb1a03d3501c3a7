mod error;
mod observer;
mod pass_finder;
mod propagation;
mod sun;
mod tle_fetch;
mod tle_loader;
mod types;

pub use error::{PredictError, PropagationFailure};
pub use observer::ObserverLocation;
pub use pass_finder::{
    downsample_track, predict_passes, PassFinder, PredictionSettings, DEFAULT_MAX_TRACK_POINTS,
    DEFAULT_STEP_SECONDS,
};
pub use propagation::{to_look_angles, LookAngles, OrbitalElements, Propagator, SatellitePosition};
pub use sun::{daylight, sun_elevation_deg, Daylight};
pub use tle_fetch::{TleFetcher, CELESTRAK_GP_TEMPLATE};
pub use tle_loader::{parse_tle_text, TleCatalog, TleEntry};
pub use types::{Pass, SatelliteInfo, TrackPoint};
