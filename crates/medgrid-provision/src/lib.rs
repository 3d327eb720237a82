//! Resource provisioning against the medgrid platform.
//!
//! Each resource module consumes a [`ResourceSpec`] plus a service client and
//! produces a [`ResolvedResource`] (the durable identity plus attributes) or
//! a classified failure. Creation runs under the bounded retry executor and
//! reconciles conflicts: an equivalent pre-existing resource is adopted, a
//! diverging one is a hard mismatch.
//!
//! [`Provisioner`] is the caller-facing entry point: it owns the provider
//! context, resolves per-service endpoints from the spec or the provider
//! configuration, and dispatches to the per-resource modules.

pub mod application;
pub mod contract;
pub mod inference_jobs;
pub mod notification;

use thiserror::Error;

use medgrid_config::{ConfigError, ProviderConfig, ProviderContext};
use medgrid_core::{RemoteError, ResolvedResource, ResourceSpec, RetryPolicy, SpecError};

pub use inference_jobs::InferenceJobList;

/// Terminal error of a provisioning operation.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid value for '{field}': {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("unexpected identity mismatch: '{actual}' != '{expected}'")]
    IdentityMismatch { expected: String, actual: String },
}

/// Caller-facing facade over the per-resource operations.
///
/// The provisioner assumes the caller serializes operations against the same
/// logical resource; it provides no internal locking.
pub struct Provisioner {
    ctx: ProviderContext,
    policy: RetryPolicy,
}

impl Provisioner {
    pub fn new(config: ProviderConfig) -> Result<Self, ProvisionError> {
        Ok(Self {
            ctx: ProviderContext::new(config)?,
            policy: RetryPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn context(&self) -> &ProviderContext {
        &self.ctx
    }

    // --- IAM applications ---

    pub async fn create_application(
        &self,
        spec: &ResourceSpec,
    ) -> Result<ResolvedResource, ProvisionError> {
        let client = self.ctx.iam_client()?;
        application::create(&client, &self.policy, spec).await
    }

    pub async fn read_application(
        &self,
        id: &str,
    ) -> Result<Option<ResolvedResource>, ProvisionError> {
        let client = self.ctx.iam_client()?;
        application::read(&client, id).await
    }

    pub async fn delete_application(&self, id: &str) -> Result<(), ProvisionError> {
        let client = self.ctx.iam_client()?;
        application::delete(&client, id).await
    }

    // --- TDR contracts ---

    pub async fn create_contract(
        &self,
        spec: &ResourceSpec,
    ) -> Result<ResolvedResource, ProvisionError> {
        let client = self.ctx.tdr_client(self.tdr_endpoint(spec)?)?;
        contract::create(&client, &self.policy, spec).await
    }

    pub async fn read_contract(
        &self,
        spec: &ResourceSpec,
    ) -> Result<Option<ResolvedResource>, ProvisionError> {
        let client = self.ctx.tdr_client(self.tdr_endpoint(spec)?)?;
        contract::read(&client, spec).await
    }

    // --- DICOM notifications ---

    pub async fn create_notification(
        &self,
        spec: &ResourceSpec,
    ) -> Result<ResolvedResource, ProvisionError> {
        let client = self.ctx.dicom_client(self.dicom_config_url(spec)?)?;
        notification::create(&client, &self.policy, spec).await
    }

    pub async fn read_notification(
        &self,
        spec: &ResourceSpec,
    ) -> Result<Option<ResolvedResource>, ProvisionError> {
        let client = self.ctx.dicom_client(self.dicom_config_url(spec)?)?;
        notification::read(&client, &self.policy, spec.get_str("organization_id")?).await
    }

    pub async fn delete_notification(
        &self,
        spec: &ResourceSpec,
        id: &str,
    ) -> Result<(), ProvisionError> {
        let client = self.ctx.dicom_client(self.dicom_config_url(spec)?)?;
        notification::delete(
            &client,
            &self.policy,
            spec.get_str("organization_id")?,
            id,
        )
        .await
    }

    // --- AI inference jobs ---

    pub async fn list_inference_jobs(
        &self,
        endpoint: Option<&str>,
    ) -> Result<InferenceJobList, ProvisionError> {
        let endpoint = resolve_endpoint(
            endpoint,
            self.ctx.config().ai_inference_endpoint.as_deref(),
            "ai_inference_endpoint",
        )?;
        let client = self.ctx.ai_inference_client(endpoint)?;
        inference_jobs::read(&client).await
    }

    fn tdr_endpoint<'a>(&'a self, spec: &'a ResourceSpec) -> Result<&'a str, ProvisionError> {
        resolve_endpoint(
            spec.opt_str("tdr_endpoint")?,
            self.ctx.config().tdr_endpoint.as_deref(),
            "tdr_endpoint",
        )
    }

    fn dicom_config_url<'a>(&'a self, spec: &'a ResourceSpec) -> Result<&'a str, ProvisionError> {
        resolve_endpoint(
            spec.opt_str("config_url")?,
            self.ctx.config().dicom_config_url.as_deref(),
            "config_url",
        )
    }
}

/// Spec-supplied endpoints win over the provider configuration; having
/// neither is a validation error.
fn resolve_endpoint<'a>(
    spec_value: Option<&'a str>,
    config_value: Option<&'a str>,
    field: &'static str,
) -> Result<&'a str, ProvisionError> {
    spec_value
        .or(config_value)
        .filter(|value| !value.is_empty())
        .ok_or(ProvisionError::Validation {
            field,
            reason: "no endpoint in the spec or the provider configuration".into(),
        })
}
