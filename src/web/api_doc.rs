use utoipa::OpenApi;

use super::api::error::ErrorResponse;
use super::api::passes::PassesQuery;
use crate::predict::{Daylight, SatelliteInfo};
use crate::report::{
    LocationSummary, NextPass, PassReport, PassSummary, Quality, SatelliteReport,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::passes::list_passes,
        super::api::passes::list_satellites,
    ),
    components(
        schemas(
            PassReport,
            SatelliteReport,
            PassSummary,
            LocationSummary,
            NextPass,
            Quality,
            Daylight,
            SatelliteInfo,
            PassesQuery,
            ErrorResponse,
        )
    ),
    info(
        title = "Skypass API",
        description = "Satellite pass predictions for fixed and custom observing sites",
        version = "0.1.0"
    ),
    tags(
        (name = "passes", description = "Pass prediction")
    )
)]
pub struct ApiDoc;
