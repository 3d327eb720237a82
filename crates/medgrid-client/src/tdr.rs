//! Telemetry data repository: contracts describing stored data types.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use medgrid_core::{RemoteError, TokenRefresh};

use crate::token::TokenSource;
use crate::transport::ApiClient;

/// The `system|code` pair identifying a contract's data type. The pair is
/// also the contract's natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataType {
    pub system: String,
    pub code: String,
}

impl DataType {
    /// Composite key as the platform stores it in the contract identity.
    pub fn key(&self) -> String {
        format!("{}|{}", self.system, self.code)
    }
}

/// Retention policy applied when stored items age out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePolicy {
    pub duration: i64,
    pub unit: String,
}

/// A data contract in the telemetry data repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub organization: String,
    pub data_type: DataType,
    #[serde(default)]
    pub send_notifications: bool,
    pub delete_policy: DeletePolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
}

/// Filter for [`Contracts::get_contracts`].
#[derive(Debug, Clone, Default)]
pub struct ContractsQuery {
    pub organization: Option<String>,
    pub data_type: Option<String>,
    pub count: Option<u32>,
}

/// Contract operations on a TDR endpoint.
#[async_trait]
pub trait Contracts: TokenRefresh {
    async fn create_contract(&self, contract: &Contract) -> Result<Contract, RemoteError>;
    async fn get_contracts(&self, query: &ContractsQuery) -> Result<Vec<Contract>, RemoteError>;
}

/// TDR service client for one endpoint.
pub struct TdrClient {
    api: ApiClient,
    tokens: Arc<TokenSource>,
}

impl TdrClient {
    pub fn new(api: ApiClient, tokens: Arc<TokenSource>) -> Self {
        Self { api, tokens }
    }

    pub fn tokens(&self) -> &TokenSource {
        &self.tokens
    }
}

#[async_trait]
impl TokenRefresh for TdrClient {
    async fn refresh_token(&self) -> Result<(), RemoteError> {
        self.tokens.refresh().await
    }
}

#[derive(Debug, Deserialize)]
struct ContractBundle {
    #[serde(default)]
    entry: Vec<Contract>,
}

#[async_trait]
impl Contracts for TdrClient {
    async fn create_contract(&self, contract: &Contract) -> Result<Contract, RemoteError> {
        self.api.post_json("store/tdr/Contract", &[], contract).await
    }

    async fn get_contracts(&self, query: &ContractsQuery) -> Result<Vec<Contract>, RemoteError> {
        let count;
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(organization) = query.organization.as_deref() {
            params.push(("organization", organization));
        }
        if let Some(data_type) = query.data_type.as_deref() {
            params.push(("dataType", data_type));
        }
        if let Some(n) = query.count {
            count = n.to_string();
            params.push(("_count", count.as_str()));
        }
        let bundle: ContractBundle = self.api.get_json("store/tdr/Contract", &params).await?;
        Ok(bundle.entry)
    }
}
