use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::models::{RegionQuery, ResultItem};
use crate::services::RegionBackend;

/// Errors that can occur when calling a regional search backend
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Region backend returned error: {0}")]
    Api(String),

    #[error("No endpoint configured for region: {0}")]
    UnknownRegion(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// HTTP client for regional search backends
///
/// Each region exposes `GET {endpoint}/search` returning
/// `{"results": [ResultItem, ...]}`.
pub struct HttpRegionBackend {
    endpoints: HashMap<String, String>,
    client: Client,
}

impl HttpRegionBackend {
    /// Create a backend client from a region id -> base URL map
    pub fn new(endpoints: HashMap<String, String>, request_timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self { endpoints, client })
    }

    fn search_url(&self, query: &RegionQuery) -> Result<String, BackendError> {
        let base = self
            .endpoints
            .get(&query.region_id)
            .ok_or_else(|| BackendError::UnknownRegion(query.region_id.clone()))?;

        let mut params = Vec::new();
        if let Some(q) = &query.query {
            params.push(format!("q={}", urlencoding::encode(q)));
        }
        if let Some(destination) = &query.destination {
            params.push(format!("destination={}", urlencoding::encode(destination)));
        }
        if let Some(country) = &query.country {
            params.push(format!("country={}", urlencoding::encode(country)));
        }
        if let Some(device) = &query.device {
            params.push(format!("device={}", urlencoding::encode(device)));
        }
        if let Some(bbox) = &query.bounding_box {
            let bbox_param = format!("{},{},{},{}", bbox.min_lat, bbox.min_lon, bbox.max_lat, bbox.max_lon);
            params.push(format!("bbox={}", urlencoding::encode(&bbox_param)));
        }

        Ok(format!(
            "{}/search?{}",
            base.trim_end_matches('/'),
            params.join("&")
        ))
    }
}

#[async_trait]
impl RegionBackend for HttpRegionBackend {
    async fn search(&self, query: &RegionQuery) -> Result<Vec<ResultItem>, BackendError> {
        let url = self.search_url(query)?;

        tracing::debug!("Searching region {}: {}", query.region_id, url);

        let response = self
            .client
            .get(&url)
            .header("X-Region-Id", &query.region_id)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::warn!("Region {} search failed: {} - {}", query.region_id, status, body);
            return Err(BackendError::Api(format!("Search failed with status {}", status)));
        }

        let json: Value = response.json().await?;

        let results = json
            .get("results")
            .and_then(|r| r.as_array())
            .ok_or_else(|| BackendError::InvalidResponse("Missing results array".into()))?;

        let items: Vec<ResultItem> = results
            .iter()
            .filter_map(|doc| serde_json::from_value(doc.clone()).ok())
            .collect();

        if items.len() < results.len() {
            tracing::debug!(
                "Region {} returned {} unparseable results",
                query.region_id,
                results.len() - items.len()
            );
        }

        Ok(items)
    }
}
