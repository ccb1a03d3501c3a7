use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::task::JoinSet;
use utoipa::ToSchema;

use crate::predict::{ObserverLocation, SatelliteInfo};
use crate::report::{predict_satellite, validate_request, PassFilter, PassReport};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::server::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PassesQuery {
    /// Slug of a configured location; takes precedence over coordinates
    pub location: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: Option<f64>,
    pub days: Option<i64>,
    /// RFC3339, defaults to now
    pub start: Option<String>,
    pub min_elevation: Option<f64>,
}

#[utoipa::path(
    get,
    path = "/api/passes",
    tag = "passes",
    params(
        ("location" = Option<String>, Query, description = "Configured location slug"),
        ("lat" = Option<f64>, Query, description = "Observer latitude (degrees)"),
        ("lon" = Option<f64>, Query, description = "Observer longitude (degrees, East positive)"),
        ("alt" = Option<f64>, Query, description = "Observer altitude (meters)"),
        ("days" = Option<i64>, Query, description = "Prediction window length in days"),
        ("start" = Option<String>, Query, description = "Window start (RFC3339), defaults to now"),
        ("min_elevation" = Option<f64>, Query, description = "Minimum peak elevation filter (degrees)")
    ),
    responses(
        (status = 200, description = "Pass predictions", body = PassReport),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 404, description = "Unknown location", body = ErrorResponse)
    )
)]
pub async fn list_passes(
    State(state): State<AppState>,
    Query(query): Query<PassesQuery>,
) -> ApiResult<Json<PassReport>> {
    let (location, location_name) = resolve_location(&state, &query)?;
    let days = query.days.unwrap_or(state.config.prediction.days);
    if days > state.config.prediction.max_days {
        return Err(ApiError::Validation(format!(
            "days must be at most {}, got {}",
            state.config.prediction.max_days, days
        )));
    }
    let start = match query.start.as_deref() {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| ApiError::Validation(format!("start: {}", e)))?,
        None => Utc::now(),
    };

    validate_request(&state.finder, &location, days)?;

    let jobs: Vec<_> = {
        let catalog = state.catalog.read().await;
        state
            .config
            .satellites
            .iter()
            .map(|target| (target.clone(), catalog.get(target.norad_id)))
            .collect()
    };

    // each satellite is an independent unit of work
    let mut tasks = JoinSet::new();
    for (target, entry) in jobs {
        let finder = state.finder.clone();
        tasks.spawn_blocking(move || {
            let report =
                predict_satellite(&finder, &target, entry.as_deref(), &location, start, days);
            (target.norad_id, report)
        });
    }

    let mut satellites = Vec::new();
    while let Some(result) = tasks.join_next().await {
        let entry = result.map_err(|e| ApiError::Internal(format!("prediction task: {}", e)))?;
        satellites.push(entry);
    }

    let report = PassReport::assemble(&location, location_name.as_deref(), satellites, start);
    log::info!(
        "Predicted {} passes for {} over {} days",
        report.pass_count(),
        location_name.as_deref().unwrap_or("custom location"),
        days
    );

    let report = match query.min_elevation {
        Some(min_elevation) => PassFilter {
            min_elevation,
            ..PassFilter::new(start)
        }
        .apply(&report),
        None => report,
    };

    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/api/satellites",
    tag = "passes",
    responses(
        (status = 200, description = "Satellites with loaded orbital elements", body = Vec<SatelliteInfo>)
    )
)]
pub async fn list_satellites(State(state): State<AppState>) -> Json<Vec<SatelliteInfo>> {
    let catalog = state.catalog.read().await;
    Json(
        catalog
            .satellites()
            .iter()
            .map(|entry| entry.info.clone())
            .collect(),
    )
}

fn resolve_location(
    state: &AppState,
    query: &PassesQuery,
) -> ApiResult<(ObserverLocation, Option<String>)> {
    if let Some(slug) = query.location.as_deref() {
        let site = state
            .config
            .find_location(slug)
            .ok_or_else(|| ApiError::NotFound(format!("unknown location '{}'", slug)))?;
        let observer = ObserverLocation::new(site.lat, site.lon, Some(site.alt_m))?;
        return Ok((observer, Some(site.name.clone())));
    }

    match (query.lat, query.lon) {
        (Some(lat), Some(lon)) => Ok((ObserverLocation::new(lat, lon, query.alt)?, None)),
        (None, None) => {
            let site = state.config.locations.first().ok_or_else(|| {
                ApiError::Validation("lat and lon are required when no location is configured".into())
            })?;
            let observer = ObserverLocation::new(site.lat, site.lon, Some(site.alt_m))?;
            Ok((observer, Some(site.name.clone())))
        }
        _ => Err(ApiError::Validation(
            "lat and lon must be given together".into(),
        )),
    }
}
