use chrono::{DateTime, Duration, TimeZone, Utc};

use skypass::predict::{
    predict_passes, LookAngles, ObserverLocation, OrbitalElements, PredictError,
    PropagationFailure,
};

const ISS_LINE1: &str = "1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992";
const ISS_LINE2: &str = "2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008";

#[test]
fn fail_fast_errors() {
    let start = Utc.with_ymd_and_hms(2020, 7, 13, 0, 0, 0).unwrap();
    let elements = OrbitalElements::from_lines(None, ISS_LINE1, ISS_LINE2).unwrap();
    let london = ObserverLocation::new(51.5074, -0.1278, None).unwrap();

    assert!(matches!(
        predict_passes(&elements, &london, start, 0),
        Err(PredictError::InvalidArgument(_))
    ));
    assert!(matches!(
        ObserverLocation::new(95.0, 0.0, None),
        Err(PredictError::InvalidLocation(_))
    ));
    assert!(matches!(
        OrbitalElements::from_lines(None, &ISS_LINE1[1..], ISS_LINE2),
        Err(PredictError::MalformedElements(_))
    ));
}

#[test]
fn stub_propagator_through_public_api() {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    // above the horizon for the first ten minutes of every hour
    let hourly = move |_: &ObserverLocation, t: DateTime<Utc>| -> Result<LookAngles, PropagationFailure> {
        let minute = (t - start).num_minutes() % 60;
        Ok(LookAngles {
            azimuth_deg: 180.0,
            elevation_deg: if minute < 10 { 5.0 + minute as f64 } else { -5.0 },
        })
    };
    let observer = ObserverLocation::new(0.0, 0.0, None).unwrap();
    let passes = predict_passes(&hourly, &observer, start, 1).unwrap();

    assert_eq!(passes.len(), 24);
    for (hour, pass) in passes.iter().enumerate() {
        assert_eq!(pass.start, start + Duration::hours(hour as i64));
        assert_eq!(pass.duration_minutes, 10);
        assert_eq!(pass.max_elevation_deg, 14.0);
        assert_eq!(pass.max_elevation_time, pass.start + Duration::minutes(9));
    }
}
