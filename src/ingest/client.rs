//! HTTP ingestion client
//!
//! POSTs JSON to three endpoints under `base_url`: object batches,
//! classification suggestions and raw radar points. The request timeout
//! comes from [`IngestConfig::request_timeout_secs`].

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;

use crate::core::config::IngestConfig;
use crate::core::error::{DeliveryError, Result, SimError};
use crate::ingest::{ClassificationSuggestion, IngestBatch, IngestSink, RadarPoint};

/// Longest response body kept in a [`DeliveryError::Status`]
const MAX_ERROR_BODY: usize = 512;

pub struct HttpIngestClient {
    client: Client,
    objects_url: String,
    classify_url: String,
    radar_point_url: String,
}

impl HttpIngestClient {
    pub fn new(config: &IngestConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SimError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            objects_url: config.objects_url(),
            classify_url: config.classify_url(),
            radar_point_url: config.radar_point_url(),
        })
    }

    /// One POST. Non-2xx and unparseable JSON bodies are failures.
    async fn post_json<T: Serialize + Sync>(&self, url: &str, body: &T) -> std::result::Result<(), DeliveryError> {
        let response = self.client.post(url).json(body).send().await.map_err(classify)?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("json"));
        let mut text = response.text().await.map_err(classify)?;

        if !status.is_success() {
            if text.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                text.truncate(cut);
            }
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        if is_json && !text.trim().is_empty() {
            serde_json::from_str::<serde_json::Value>(&text)
                .map_err(|e| DeliveryError::MalformedResponse(e.to_string()))?;
        }
        Ok(())
    }
}

fn classify(err: reqwest::Error) -> DeliveryError {
    if err.is_timeout() {
        DeliveryError::Timeout
    } else if err.is_connect() {
        DeliveryError::Unreachable(err.to_string())
    } else {
        DeliveryError::Request(err.to_string())
    }
}

#[async_trait]
impl IngestSink for HttpIngestClient {
    async fn send(&self, batch: &IngestBatch) -> std::result::Result<(), DeliveryError> {
        self.post_json(&self.objects_url, batch).await
    }

    async fn suggest(&self, suggestion: &ClassificationSuggestion) -> std::result::Result<(), DeliveryError> {
        self.post_json(&self.classify_url, suggestion).await
    }

    async fn radar_point(&self, point: &RadarPoint) -> std::result::Result<(), DeliveryError> {
        self.post_json(&self.radar_point_url, point).await
    }
}
