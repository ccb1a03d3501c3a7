use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::predict::{PassFinder, TleCatalog};

use super::api::passes as pass_handlers;
use super::api_doc::ApiDoc;
use super::config::{Config, ConfigError};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<RwLock<TleCatalog>>,
    pub finder: Arc<PassFinder>,
}

impl AppState {
    pub fn new(config: Config, catalog: TleCatalog) -> Result<Self, ConfigError> {
        let finder = PassFinder::new(config.prediction.settings()?);
        Ok(Self {
            config: Arc::new(config),
            catalog: Arc::new(RwLock::new(catalog)),
            finder: Arc::new(finder),
        })
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/passes", get(pass_handlers::list_passes))
        .route("/api/satellites", get(pass_handlers::list_satellites))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config) -> std::io::Result<()> {
    let bind_addr = config.web.bind.clone();

    let mut catalog = TleCatalog::new(Some(config.tle_folder.clone()));
    if let Err(e) = catalog.load_all() {
        log::warn!("Failed to initialize TLE catalog: {}", e);
    }

    let fetcher = config
        .tle_fetch
        .fetcher()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    if let Some(fetcher) = fetcher {
        let ids: Vec<u32> = config.satellites.iter().map(|s| s.norad_id).collect();
        catalog.refresh(&fetcher, &ids).await;
    }

    let state = AppState::new(config, catalog)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, router(state)).await
}
