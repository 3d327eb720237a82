//! DICOM store configuration: the per-organization notification setting.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use medgrid_core::{RemoteError, TokenRefresh};

use crate::token::TokenSource;
use crate::transport::ApiClient;

/// Notification configuration for an organization's DICOM store. There is at
/// most one per organization; the platform exposes no removal endpoint, so
/// teardown disables it instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub enabled: bool,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_organization_id: String,
}

/// Notification operations on a DICOM config endpoint.
#[async_trait]
pub trait NotificationConfig: TokenRefresh {
    async fn create_notification(
        &self,
        notification: &Notification,
        organization_id: &str,
    ) -> Result<Notification, RemoteError>;
    async fn get_notification(&self, organization_id: &str) -> Result<Notification, RemoteError>;
}

/// DICOM config client for one config URL.
#[derive(Debug)]
pub struct DicomClient {
    api: ApiClient,
    tokens: Arc<TokenSource>,
}

impl DicomClient {
    pub fn new(api: ApiClient, tokens: Arc<TokenSource>) -> Self {
        Self { api, tokens }
    }

    pub fn tokens(&self) -> &TokenSource {
        &self.tokens
    }
}

#[async_trait]
impl TokenRefresh for DicomClient {
    async fn refresh_token(&self) -> Result<(), RemoteError> {
        self.tokens.refresh().await
    }
}

#[async_trait]
impl NotificationConfig for DicomClient {
    async fn create_notification(
        &self,
        notification: &Notification,
        organization_id: &str,
    ) -> Result<Notification, RemoteError> {
        self.api
            .post_json(
                "notification",
                &[("organizationId", organization_id)],
                notification,
            )
            .await
    }

    async fn get_notification(&self, organization_id: &str) -> Result<Notification, RemoteError> {
        self.api
            .get_json("notification", &[("organizationId", organization_id)])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_wire_shape() {
        let notification = Notification {
            id: String::new(),
            enabled: true,
            endpoint: "https://hooks.example.com/dicom".into(),
            default_organization_id: "org-1".into(),
        };
        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["enabled"], true);
        assert_eq!(json["endpoint"], "https://hooks.example.com/dicom");
        assert_eq!(json["defaultOrganizationId"], "org-1");
        assert!(json.get("id").is_none());
    }

    #[test]
    fn notification_decodes_with_defaults() {
        let parsed: Notification = serde_json::from_str(
            r#"{"id":"not-1","endpoint":"https://hooks.example.com/dicom"}"#,
        )
        .unwrap();
        assert_eq!(parsed.id, "not-1");
        assert!(!parsed.enabled);
        assert!(parsed.default_organization_id.is_empty());
    }
}
