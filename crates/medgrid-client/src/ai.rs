//! AI inference service: read-only job listing.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use medgrid_core::{RemoteError, TokenRefresh};

use crate::token::TokenSource;
use crate::transport::ApiClient;

/// A submitted inference job.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceJob {
    pub id: String,
    pub name: String,
}

/// Job operations on an inference endpoint.
#[async_trait]
pub trait InferenceJobs: TokenRefresh {
    async fn list_jobs(&self) -> Result<Vec<InferenceJob>, RemoteError>;
}

/// Inference service client for one endpoint.
pub struct AiInferenceClient {
    api: ApiClient,
    tokens: Arc<TokenSource>,
}

impl AiInferenceClient {
    pub fn new(api: ApiClient, tokens: Arc<TokenSource>) -> Self {
        Self { api, tokens }
    }

    pub fn tokens(&self) -> &TokenSource {
        &self.tokens
    }
}

#[async_trait]
impl TokenRefresh for AiInferenceClient {
    async fn refresh_token(&self) -> Result<(), RemoteError> {
        self.tokens.refresh().await
    }
}

#[derive(Debug, Deserialize)]
struct JobBundle {
    #[serde(default)]
    entry: Vec<InferenceJob>,
}

#[async_trait]
impl InferenceJobs for AiInferenceClient {
    async fn list_jobs(&self) -> Result<Vec<InferenceJob>, RemoteError> {
        let bundle: JobBundle = self.api.get_json("analyze/inference/Job", &[]).await?;
        Ok(bundle.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_bundle_decodes() {
        let bundle: JobBundle = serde_json::from_str(
            r#"{"total":2,"entry":[{"id":"job-1","name":"segmentation"},{"id":"job-2","name":"triage"}]}"#,
        )
        .unwrap();
        assert_eq!(bundle.entry.len(), 2);
        assert_eq!(bundle.entry[1].name, "triage");
    }

    #[test]
    fn empty_bundle_decodes() {
        let bundle: JobBundle = serde_json::from_str(r#"{"total":0}"#).unwrap();
        assert!(bundle.entry.is_empty());
    }
}
