//! IAM token grant and the shared bearer-token state.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use medgrid_core::{RemoteError, TokenRefresh};

use crate::transport::{TokenCell, decode, ensure_trailing_slash, from_reqwest, token_cell};

/// Service-account credentials for the OAuth2 password grant against the IAM
/// token endpoint.
#[derive(Clone)]
pub struct Credentials {
    pub oauth2_client_id: String,
    pub oauth2_password: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("oauth2_client_id", &self.oauth2_client_id)
            .field("oauth2_password", &"***")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Runs the password grant and swaps the shared bearer token.
///
/// This is the credential-refresh side effect the retry executor triggers
/// when a call comes back 403. The swap is safe to perform repeatedly; the
/// context serializes operations per logical resource, so no further
/// synchronization happens here.
#[derive(Debug)]
pub struct TokenSource {
    http: reqwest::Client,
    token_url: Url,
    credentials: Credentials,
    token: TokenCell,
    expires_at: RwLock<Option<OffsetDateTime>>,
}

impl TokenSource {
    pub fn new(iam_url: &Url, credentials: Credentials) -> Result<Self, url::ParseError> {
        let mut base = iam_url.clone();
        ensure_trailing_slash(&mut base);
        Ok(Self {
            http: reqwest::Client::new(),
            token_url: base.join("authorize/oauth2/token")?,
            credentials,
            token: token_cell(),
            expires_at: RwLock::new(None),
        })
    }

    /// The bearer-token cell shared with every [`crate::transport::ApiClient`].
    pub fn cell(&self) -> TokenCell {
        Arc::clone(&self.token)
    }

    pub async fn current(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Whether the token's reported lifetime has elapsed. Unknown lifetimes
    /// count as expired so the first 403 forces a grant.
    pub async fn is_expired(&self) -> bool {
        match *self.expires_at.read().await {
            Some(expires_at) => OffsetDateTime::now_utc() >= expires_at,
            None => true,
        }
    }

    /// Re-runs the password grant and swaps the stored token.
    pub async fn refresh(&self) -> Result<(), RemoteError> {
        debug!(url = %self.token_url, "refreshing IAM access token");
        let resp = self
            .http
            .post(self.token_url.clone())
            .basic_auth(
                &self.credentials.oauth2_client_id,
                Some(&self.credentials.oauth2_password),
            )
            .header("Accept", "application/json")
            .header("Api-Version", "2")
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(from_reqwest)?;
        let granted: TokenResponse = decode(resp).await?;

        *self.token.write().await = Some(granted.access_token);
        *self.expires_at.write().await = granted
            .expires_in
            .map(|secs| OffsetDateTime::now_utc() + time::Duration::seconds(secs as i64));
        Ok(())
    }
}

#[async_trait]
impl TokenRefresh for TokenSource {
    async fn refresh_token(&self) -> Result<(), RemoteError> {
        self.refresh().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> Credentials {
        Credentials {
            oauth2_client_id: "client".into(),
            oauth2_password: "client-secret".into(),
            username: "admin@org".into(),
            password: "hunter2".into(),
        }
    }

    #[tokio::test]
    async fn grant_swaps_the_shared_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authorize/oauth2/token"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("username=admin%40org"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"access_token":"tok-fresh","expires_in":1799,"token_type":"Bearer"}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let source =
            TokenSource::new(&Url::parse(&server.uri()).unwrap(), credentials()).unwrap();
        assert!(source.is_expired().await);
        assert_eq!(source.current().await, None);

        source.refresh().await.unwrap();

        assert_eq!(source.current().await.as_deref(), Some("tok-fresh"));
        assert!(!source.is_expired().await);
        // The cell handed to transports sees the same token.
        assert_eq!(source.cell().read().await.as_deref(), Some("tok-fresh"));
    }

    #[tokio::test]
    async fn failed_grant_keeps_the_old_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authorize/oauth2/token"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
            .mount(&server)
            .await;

        let source =
            TokenSource::new(&Url::parse(&server.uri()).unwrap(), credentials()).unwrap();
        *source.cell().write().await = Some("tok-old".to_string());

        let err = source.refresh().await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(source.current().await.as_deref(), Some("tok-old"));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let debugged = format!("{:?}", credentials());
        assert!(debugged.contains("client"));
        assert!(!debugged.contains("client-secret"));
        assert!(!debugged.contains("hunter2"));
    }
}
