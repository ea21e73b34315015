//! Model hub queries.
//!
//! Only one query is needed: "which models are tagged with this task?", used
//! to pick a vision model before transcribing (`image-to-text`,
//! `image-text-to-text`, …). The endpoint follows the hub's `HF_ENDPOINT`
//! override so mirrors work unchanged.

use crate::error::Pdf2TexError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Public hub used when `HF_ENDPOINT` is unset.
pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

/// Environment variable overriding the hub base URL.
pub const ENDPOINT_ENV: &str = "HF_ENDPOINT";

/// One entry of the hub's model listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubModel {
    pub id: String,
    #[serde(default)]
    pub pipeline_tag: Option<String>,
    #[serde(default)]
    pub downloads: Option<u64>,
    #[serde(default)]
    pub likes: Option<u64>,
}

/// Hub base URL: `$HF_ENDPOINT` or [`DEFAULT_ENDPOINT`].
pub fn endpoint() -> String {
    std::env::var(ENDPOINT_ENV)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
}

/// Build the listing URL for `task`.
pub fn models_url(endpoint: &str, task: &str, limit: usize) -> Result<reqwest::Url, Pdf2TexError> {
    let base = format!("{}/api/models", endpoint.trim_end_matches('/'));
    let limit = limit.to_string();
    reqwest::Url::parse_with_params(&base, &[("pipeline_tag", task), ("limit", limit.as_str())])
        .map_err(|e| Pdf2TexError::InvalidConfig(format!("Bad hub endpoint '{endpoint}': {e}")))
}

/// Parse a listing response body.
pub fn parse_models(body: &[u8]) -> Result<Vec<HubModel>, Pdf2TexError> {
    Ok(serde_json::from_slice(body)?)
}

/// List models tagged with `task`, most relevant first as ranked by the hub.
pub async fn list_models(
    task: &str,
    limit: usize,
    timeout_secs: u64,
) -> Result<Vec<HubModel>, Pdf2TexError> {
    let url = models_url(&endpoint(), task, limit)?;
    info!("Listing hub models for task '{}'", task);

    let request_err = |reason: String| Pdf2TexError::HubRequestFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("edgequake-pdf2tex/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| request_err(e.to_string()))?;

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| request_err(e.to_string()))?;

    if !response.status().is_success() {
        return Err(request_err(format!("HTTP {}", response.status())));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| request_err(e.to_string()))?;
    let models = parse_models(&body)?;
    debug!("Hub returned {} models", models.len());
    Ok(models)
}
