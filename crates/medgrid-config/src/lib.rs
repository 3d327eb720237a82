//! Provider configuration for the medgrid platform SDK.
//!
//! Credentials and endpoints load from a TOML file, with `MEDGRID_*`
//! environment variables taking precedence, and are handed to every
//! operation as an explicit [`ProviderContext`] rather than ambient global
//! state. The context owns the single [`TokenSource`] all service clients
//! share, so a token refreshed by one retry loop is immediately visible to
//! the rest.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use medgrid_client::{
    AiInferenceClient, ApiClient, Credentials, DicomClient, IamClient, TdrClient, TokenSource,
};

/// Error raised while loading or validating provider configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("missing required setting '{0}'")]
    Missing(&'static str),

    #[error("invalid URL in '{field}': {source}")]
    InvalidUrl {
        field: &'static str,
        source: url::ParseError,
    },
}

/// Static provider configuration: where the platform lives and which service
/// account provisions against it.
#[derive(Clone, Default, Deserialize)]
pub struct ProviderConfig {
    /// IAM base URL; hosts the OAuth2 token endpoint.
    #[serde(default)]
    pub iam_url: String,
    /// IDM base URL; hosts the identity resources (applications).
    #[serde(default)]
    pub idm_url: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,

    #[serde(default)]
    pub oauth2_client_id: String,
    #[serde(default)]
    pub oauth2_password: String,
    #[serde(default)]
    pub org_admin_username: String,
    #[serde(default)]
    pub org_admin_password: String,
    #[serde(default)]
    pub shared_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Per-service endpoints; a resource spec may override these per
    /// operation.
    #[serde(default)]
    pub tdr_endpoint: Option<String>,
    #[serde(default)]
    pub dicom_config_url: Option<String>,
    #[serde(default)]
    pub ai_inference_endpoint: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("iam_url", &self.iam_url)
            .field("idm_url", &self.idm_url)
            .field("region", &self.region)
            .field("environment", &self.environment)
            .field("oauth2_client_id", &self.oauth2_client_id)
            .field("oauth2_password", &"***")
            .field("org_admin_username", &self.org_admin_username)
            .field("org_admin_password", &"***")
            .field("shared_key", &self.shared_key.as_ref().map(|_| "***"))
            .field("secret_key", &self.secret_key.as_ref().map(|_| "***"))
            .field("tdr_endpoint", &self.tdr_endpoint)
            .field("dicom_config_url", &self.dicom_config_url)
            .field("ai_inference_endpoint", &self.ai_inference_endpoint)
            .finish()
    }
}

impl ProviderConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reads and parses a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Loads the file (when given), then applies `MEDGRID_*` environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Applies overrides from a lookup, typically the process environment.
    /// A present variable wins over the file value.
    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        let set = |name: &str, target: &mut String| {
            if let Some(value) = get(name) {
                *target = value;
            }
        };
        set("MEDGRID_IAM_URL", &mut self.iam_url);
        set("MEDGRID_IDM_URL", &mut self.idm_url);
        set("MEDGRID_OAUTH2_CLIENT_ID", &mut self.oauth2_client_id);
        set("MEDGRID_OAUTH2_PASSWORD", &mut self.oauth2_password);
        set("MEDGRID_ORG_ADMIN_USERNAME", &mut self.org_admin_username);
        set("MEDGRID_ORG_ADMIN_PASSWORD", &mut self.org_admin_password);

        let set_opt = |name: &str, target: &mut Option<String>| {
            if let Some(value) = get(name) {
                *target = Some(value);
            }
        };
        set_opt("MEDGRID_REGION", &mut self.region);
        set_opt("MEDGRID_ENVIRONMENT", &mut self.environment);
        set_opt("MEDGRID_SHARED_KEY", &mut self.shared_key);
        set_opt("MEDGRID_SECRET_KEY", &mut self.secret_key);
        set_opt("MEDGRID_TDR_ENDPOINT", &mut self.tdr_endpoint);
        set_opt("MEDGRID_DICOM_CONFIG_URL", &mut self.dicom_config_url);
        set_opt(
            "MEDGRID_AI_INFERENCE_ENDPOINT",
            &mut self.ai_inference_endpoint,
        );
    }

    /// Checks that every setting needed to reach the platform is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required: [(&'static str, &str); 5] = [
            ("iam_url", &self.iam_url),
            ("idm_url", &self.idm_url),
            ("oauth2_client_id", &self.oauth2_client_id),
            ("org_admin_username", &self.org_admin_username),
            ("org_admin_password", &self.org_admin_password),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }
        Ok(())
    }

    /// Service-account credentials for the token grant.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            oauth2_client_id: self.oauth2_client_id.clone(),
            oauth2_password: self.oauth2_password.clone(),
            username: self.org_admin_username.clone(),
            password: self.org_admin_password.clone(),
        }
    }
}

/// Validated configuration plus the token source every service client
/// shares. One context is built per provider instance and passed explicitly
/// into each operation.
#[derive(Debug)]
pub struct ProviderContext {
    config: ProviderConfig,
    tokens: Arc<TokenSource>,
}

impl ProviderContext {
    pub fn new(config: ProviderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let iam_url = parse_url("iam_url", &config.iam_url)?;
        let tokens = TokenSource::new(&iam_url, config.credentials())
            .map_err(|source| ConfigError::InvalidUrl {
                field: "iam_url",
                source,
            })?;
        debug!(iam_url = %iam_url, "provider context initialized");
        Ok(Self {
            config,
            tokens: Arc::new(tokens),
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn tokens(&self) -> Arc<TokenSource> {
        Arc::clone(&self.tokens)
    }

    /// IAM client: identity resources live under the IDM URL while tokens
    /// come from the IAM URL.
    pub fn iam_client(&self) -> Result<IamClient, ConfigError> {
        let api = self.api("idm_url", &self.config.idm_url, "1")?;
        Ok(IamClient::new(api, self.tokens()))
    }

    pub fn tdr_client(&self, endpoint: &str) -> Result<TdrClient, ConfigError> {
        let api = self.api("tdr_endpoint", endpoint, "5")?;
        Ok(TdrClient::new(api, self.tokens()))
    }

    pub fn dicom_client(&self, config_url: &str) -> Result<DicomClient, ConfigError> {
        let api = self.api("dicom_config_url", config_url, "1")?;
        Ok(DicomClient::new(api, self.tokens()))
    }

    pub fn ai_inference_client(&self, endpoint: &str) -> Result<AiInferenceClient, ConfigError> {
        let api = self.api("ai_inference_endpoint", endpoint, "1")?;
        Ok(AiInferenceClient::new(api, self.tokens()))
    }

    fn api(
        &self,
        field: &'static str,
        raw: &str,
        api_version: &str,
    ) -> Result<ApiClient, ConfigError> {
        if raw.is_empty() {
            return Err(ConfigError::Missing(field));
        }
        let url = parse_url(field, raw)?;
        Ok(ApiClient::new(url, self.tokens.cell(), api_version))
    }
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { field, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const FULL_TOML: &str = r#"
        iam_url = "https://iam.example.com"
        idm_url = "https://idm.example.com"
        region = "eu-west"
        oauth2_client_id = "provisioner"
        oauth2_password = "grant-secret"
        org_admin_username = "admin@org"
        org_admin_password = "admin-secret"
        tdr_endpoint = "https://tdr.example.com"
    "#;

    #[test]
    fn parses_a_full_profile() {
        let config = ProviderConfig::from_toml_str(FULL_TOML).unwrap();
        assert_eq!(config.iam_url, "https://iam.example.com");
        assert_eq!(config.region.as_deref(), Some("eu-west"));
        assert_eq!(config.tdr_endpoint.as_deref(), Some("https://tdr.example.com"));
        assert!(config.dicom_config_url.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn reads_from_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL_TOML.as_bytes()).unwrap();
        let config = ProviderConfig::from_file(file.path()).unwrap();
        assert_eq!(config.idm_url, "https://idm.example.com");
    }

    #[test]
    fn overrides_beat_file_values() {
        let mut config = ProviderConfig::from_toml_str(FULL_TOML).unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("MEDGRID_IAM_URL", "https://iam.staging.example.com"),
            ("MEDGRID_SECRET_KEY", "sk-1"),
        ]);
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.iam_url, "https://iam.staging.example.com");
        assert_eq!(config.secret_key.as_deref(), Some("sk-1"));
        // Untouched settings keep their file values.
        assert_eq!(config.idm_url, "https://idm.example.com");
    }

    #[test]
    fn missing_required_setting_is_reported() {
        let config = ProviderConfig::from_toml_str(
            r#"
            iam_url = "https://iam.example.com"
            idm_url = "https://idm.example.com"
            "#,
        )
        .unwrap();
        match config.validate() {
            Err(ConfigError::Missing(field)) => assert_eq!(field, "oauth2_client_id"),
            other => panic!("expected missing setting, got {other:?}"),
        }
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = ProviderConfig::from_toml_str(FULL_TOML).unwrap();
        config.secret_key = Some("sk-super-secret".into());
        let debugged = format!("{config:?}");
        assert!(debugged.contains("provisioner"));
        assert!(!debugged.contains("grant-secret"));
        assert!(!debugged.contains("admin-secret"));
        assert!(!debugged.contains("sk-super-secret"));
    }

    #[test]
    fn context_rejects_a_bad_url() {
        let mut config = ProviderConfig::from_toml_str(FULL_TOML).unwrap();
        config.iam_url = "not a url".into();
        match ProviderContext::new(config) {
            Err(ConfigError::InvalidUrl { field, .. }) => assert_eq!(field, "iam_url"),
            other => panic!("expected invalid URL, got {other:?}"),
        }
    }

    #[test]
    fn context_builds_service_clients() {
        let config = ProviderConfig::from_toml_str(FULL_TOML).unwrap();
        let ctx = ProviderContext::new(config).unwrap();
        ctx.iam_client().unwrap();
        ctx.tdr_client("https://tdr.example.com").unwrap();
        ctx.dicom_client("https://dicom.example.com/config").unwrap();
        ctx.ai_inference_client("https://inference.example.com").unwrap();
        match ctx.dicom_client("") {
            Err(ConfigError::Missing(field)) => assert_eq!(field, "dicom_config_url"),
            other => panic!("expected missing endpoint, got {other:?}"),
        }
    }
}
