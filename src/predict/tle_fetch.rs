use std::fs;
use std::sync::Arc;
use std::time::Duration;

use crate::predict::error::PredictError;
use crate::predict::tle_loader::TleCatalog;

/// Celestrak GP query for a single catalog number, in three-line TLE format.
pub const CELESTRAK_GP_TEMPLATE: &str =
    "https://celestrak.org/NORAD/elements/gp.php?CATNR={norad}&FORMAT=TLE";

const NORAD_PLACEHOLDER: &str = "{norad}";

/// Downloads element sets by NORAD id, trying each source URL in order.
///
/// Sources are URL templates where `{norad}` is replaced by the catalog
/// number, so a mirror or proxy can follow the primary source.
pub struct TleFetcher {
    client: reqwest::Client,
    sources: Vec<String>,
}

impl TleFetcher {
    pub fn new(sources: Vec<String>, timeout: Duration) -> Result<Self, PredictError> {
        if sources.is_empty() {
            return Err(PredictError::InvalidArgument(
                "at least one TLE source is required".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PredictError::Fetch(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client, sources })
    }

    /// Celestrak only, with a 10 s timeout
    pub fn celestrak() -> Result<Self, PredictError> {
        Self::new(vec![CELESTRAK_GP_TEMPLATE.to_string()], Duration::from_secs(10))
    }

    /// Returns the URL that answered and the response body.
    pub async fn fetch(&self, norad_id: u32) -> Result<(String, String), PredictError> {
        let mut failures = Vec::new();
        for template in &self.sources {
            let url = template.replace(NORAD_PLACEHOLDER, &norad_id.to_string());
            match self.try_download(&url).await {
                Ok(text) => return Ok((url, text)),
                Err(e) => {
                    log::debug!("TLE source {} failed: {}", url, e);
                    failures.push(format!("{}: {}", url, e));
                }
            }
        }
        Err(PredictError::Fetch(failures.join("; ")))
    }

    async fn try_download(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

impl TleCatalog {
    /// Replace the elements of `norad_ids` with freshly downloaded ones.
    ///
    /// A satellite whose download or parse fails keeps whatever was loaded
    /// from the TLE folder. Fresh element sets are written back to the folder
    /// as `<norad_id>.tle`. Returns how many satellites were refreshed.
    pub async fn refresh(&mut self, fetcher: &TleFetcher, norad_ids: &[u32]) -> usize {
        let mut refreshed = 0;
        for &norad_id in norad_ids {
            match self.refresh_one(fetcher, norad_id).await {
                Ok(()) => refreshed += 1,
                Err(e) if self.get(norad_id).is_some() => {
                    log::warn!("Keeping cached elements for {}: {}", norad_id, e)
                }
                Err(e) => log::warn!("No elements available for {}: {}", norad_id, e),
            }
        }
        log::info!(
            "Refreshed {} of {} satellites",
            refreshed,
            norad_ids.len()
        );
        refreshed
    }

    async fn refresh_one(&mut self, fetcher: &TleFetcher, norad_id: u32) -> Result<(), PredictError> {
        let (url, text) = fetcher.fetch(norad_id).await?;

        let mut fetched = TleCatalog::new(None);
        fetched.insert_text(&text, &url)?;
        let entry = fetched.get(norad_id).ok_or_else(|| {
            PredictError::MalformedElements(format!("{} returned no elements for {}", url, norad_id))
        })?;

        if let Some(dir) = self.tle_dir() {
            let path = dir.join(format!("{}.tle", norad_id));
            if let Err(e) = fs::create_dir_all(dir).and_then(|_| fs::write(&path, &text)) {
                log::warn!("Failed to cache {}: {}", path.display(), e);
            }
        }

        log::debug!("Fetched elements for {} from {}", entry.info.name, url);
        self.insert_entry(Arc::clone(&entry));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::propagation::tests::{ISS_LINE1, ISS_LINE2};
    use axum::{extract::Query, http::StatusCode, routing::get, Router};
    use std::collections::HashMap;
    use std::net::SocketAddr;

    fn iss_tle() -> String {
        format!("ISS (ZARYA)\n{}\n{}\n", ISS_LINE1, ISS_LINE2)
    }

    async fn gp(Query(params): Query<HashMap<String, String>>) -> (StatusCode, String) {
        match params.get("CATNR").map(String::as_str) {
            Some("25544") => (StatusCode::OK, iss_tle()),
            _ => (StatusCode::OK, "No GP data found".to_string()),
        }
    }

    async fn serve_gp() -> SocketAddr {
        let app = Router::new()
            .route("/gp", get(gp))
            .route("/down", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }

    fn fetcher(addr: SocketAddr, paths: &[&str]) -> TleFetcher {
        let sources = paths
            .iter()
            .map(|p| format!("http://{}/{}?CATNR={{norad}}&FORMAT=TLE", addr, p))
            .collect();
        TleFetcher::new(sources, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn falls_through_to_the_next_source_and_caches() {
        let addr = serve_gp().await;
        let dir = std::env::temp_dir().join(format!("skypass-fetch-{}", std::process::id()));

        let mut catalog = TleCatalog::new(Some(dir.clone()));
        let refreshed = catalog
            .refresh(&fetcher(addr, &["down", "gp"]), &[25544, 57166])
            .await;
        assert_eq!(refreshed, 1);

        let fetched = catalog.get(25544).unwrap();
        assert_eq!(fetched.info.name, "ISS (ZARYA)");
        assert!(fetched.info.tle_source.contains("/gp?CATNR=25544"));
        assert!(catalog.get(57166).is_none());

        // same elements as loading the text directly
        let mut direct = TleCatalog::new(None);
        direct.insert_text(&iss_tle(), "inline").unwrap();
        assert_eq!(fetched.info.epoch, direct.get(25544).unwrap().info.epoch);

        let mut reloaded = TleCatalog::new(Some(dir.clone()));
        let loaded = reloaded.load_all().unwrap();
        fs::remove_dir_all(&dir).unwrap();
        assert_eq!(loaded, 1);
        assert!(reloaded.get(25544).is_some());
    }

    #[tokio::test]
    async fn failed_download_keeps_cached_elements() {
        let addr = serve_gp().await;
        let mut catalog = TleCatalog::new(None);
        catalog.insert_text(&iss_tle(), "stations.tle").unwrap();

        let refreshed = catalog.refresh(&fetcher(addr, &["down"]), &[25544]).await;
        assert_eq!(refreshed, 0);
        assert_eq!(catalog.get(25544).unwrap().info.tle_source, "stations.tle");
    }

    #[tokio::test]
    async fn every_source_failing_is_a_fetch_error() {
        let addr = serve_gp().await;
        let err = fetcher(addr, &["down", "missing"])
            .fetch(25544)
            .await
            .unwrap_err();
        assert!(matches!(err, PredictError::Fetch(_)));
        assert!(err.to_string().contains("/down"));
        assert!(err.to_string().contains("/missing"));
    }

    #[test]
    fn requires_a_source() {
        assert!(TleFetcher::new(Vec::new(), Duration::from_secs(1)).is_err());
    }
}
