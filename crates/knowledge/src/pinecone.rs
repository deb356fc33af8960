//! Pinecone vector index client.
//!
//! Two planes are involved: the control plane describes an index and
//! tells us its data-plane host, the data plane answers queries.
//! Pinecone API: https://docs.pinecone.io/reference/api/introduction

use crate::vector_index::{ScoredMatch, VectorIndex};
use medassist_core::config::VectorSettings;
use medassist_core::{AppError, AppResult, ServiceFailure};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Pinecone control plane URL.
pub const DEFAULT_CONTROL_PLANE_URL: &str = "https://api.pinecone.io";

/// API version sent with every request.
pub const PINECONE_API_VERSION: &str = "2024-07";

#[derive(Debug, Deserialize)]
struct DescribeIndexResponse {
    host: String,
    #[serde(default)]
    dimension: Option<usize>,
    #[serde(default)]
    status: Option<IndexStatus>,
}

#[derive(Debug, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Client bound to one Pinecone index.
pub struct PineconeIndex {
    client: reqwest::Client,
    host_url: String,
    api_key: String,
    namespace: String,
    text_key: String,
    dimension: Option<usize>,
}

fn http_client(timeout: Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to create HTTP client for Pinecone: {}", e)))
}

/// Hosts come back without a scheme; HTTPS is implied.
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

impl PineconeIndex {
    /// Resolve the index host through the control plane.
    pub async fn connect(settings: &VectorSettings, timeout: Duration) -> AppResult<Self> {
        let api_key = settings
            .api_key
            .as_ref()
            .map(|k| k.expose().to_string())
            .ok_or_else(|| AppError::Config("PINECONE_API_KEY not found in environment".to_string()))?;

        let client = http_client(timeout)?;
        let control_plane = settings
            .control_plane_url
            .as_deref()
            .unwrap_or(DEFAULT_CONTROL_PLANE_URL)
            .trim_end_matches('/');
        let url = format!("{}/indexes/{}", control_plane, settings.index_name);

        tracing::debug!(index = %settings.index_name, "Describing Pinecone index");

        let response = client
            .get(&url)
            .header("Api-Key", &api_key)
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .send()
            .await
            .map_err(|e| {
                AppError::Retrieval(ServiceFailure::from_reqwest(
                    "Failed to reach Pinecone control plane",
                    &e,
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Retrieval(ServiceFailure::from_status(
                "Pinecone",
                status,
                &format!("index '{}': {}", settings.index_name, error_text),
            )));
        }

        let description: DescribeIndexResponse = response.json().await.map_err(|e| {
            AppError::Retrieval(ServiceFailure::from_reqwest("Failed to read Pinecone index description", &e))
        })?;

        if let Some(status) = description.status.as_ref().filter(|s| !s.ready) {
            tracing::warn!(index = %settings.index_name, ready = status.ready, "Pinecone index is not ready");
        }

        let mut index = Self::with_host(
            &description.host,
            api_key,
            settings.namespace.clone(),
            settings.text_key.clone(),
            timeout,
        )?;
        index.dimension = description.dimension;

        tracing::info!(
            index = %settings.index_name,
            host = %index.host_url,
            dimension = ?index.dimension,
            "Connected to Pinecone index"
        );

        Ok(index)
    }

    /// Build a client for a known data-plane host.
    pub fn with_host(
        host: &str,
        api_key: impl Into<String>,
        namespace: impl Into<String>,
        text_key: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            host_url: normalize_host(host),
            api_key: api_key.into(),
            namespace: namespace.into(),
            text_key: text_key.into(),
            dimension: None,
        })
    }

    /// Keep matches that carry the text key; skip the rest.
    fn extract_matches(&self, matches: Vec<QueryMatch>) -> Vec<ScoredMatch> {
        matches
            .into_iter()
            .filter_map(|m| {
                let text = m
                    .metadata
                    .as_ref()
                    .and_then(|meta| meta.get(&self.text_key))
                    .and_then(|value| value.as_str())
                    .map(str::to_string);

                match text {
                    Some(text) => Some(ScoredMatch {
                        id: m.id,
                        score: m.score,
                        text,
                    }),
                    None => {
                        tracing::warn!(
                            id = %m.id,
                            text_key = %self.text_key,
                            "Pinecone match has no text metadata, skipping"
                        );
                        None
                    }
                }
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl VectorIndex for PineconeIndex {
    fn backend_name(&self) -> &str {
        "pinecone"
    }

    fn dimensions(&self) -> Option<usize> {
        self.dimension
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> AppResult<Vec<ScoredMatch>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: Some(self.namespace.as_str()).filter(|ns| !ns.is_empty()),
        };

        let response = self
            .client
            .post(format!("{}/query", self.host_url))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AppError::Retrieval(ServiceFailure::from_reqwest(
                    "Failed to send query to Pinecone",
                    &e,
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Retrieval(ServiceFailure::from_status(
                "Pinecone",
                status,
                &error_text,
            )));
        }

        let body: QueryResponse = response.json().await.map_err(|e| {
            AppError::Retrieval(ServiceFailure::from_reqwest("Failed to read Pinecone query response", &e))
        })?;

        let returned = body.matches.len();
        let matches = self.extract_matches(body.matches);
        tracing::debug!(top_k, returned, kept = matches.len(), "Pinecone query");

        Ok(matches)
    }
}
