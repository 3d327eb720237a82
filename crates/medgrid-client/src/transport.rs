use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use url::Url;

use medgrid_core::RemoteError;

/// Shared bearer-token cell, swapped by [`crate::token::TokenSource`] on
/// refresh. Every service client built from the same provider context holds
/// the same cell, so a refresh triggered by one retry loop is visible to all.
pub type TokenCell = Arc<RwLock<Option<String>>>;

/// Fresh, empty token cell.
pub fn token_cell() -> TokenCell {
    Arc::new(RwLock::new(None))
}

/// Thin JSON transport over the platform's resource APIs.
///
/// Failures map into [`RemoteError`]: an error status keeps the server's
/// body text verbatim, and a call that dies before any response exists
/// becomes a status-less transport failure (classified permanent).
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: TokenCell,
    api_version: String,
}

impl ApiClient {
    pub fn new(mut base_url: Url, token: TokenCell, api_version: impl Into<String>) -> Self {
        ensure_trailing_slash(&mut base_url);
        Self {
            http: reqwest::Client::new(),
            base_url,
            token,
            api_version: api_version.into(),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        let req = self.request(Method::GET, path, query).await?;
        let resp = req.send().await.map_err(from_reqwest)?;
        decode(resp).await
    }

    pub async fn post_json<B, T>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.request(Method::POST, path, query).await?;
        let resp = req.json(body).send().await.map_err(from_reqwest)?;
        decode(resp).await
    }

    pub async fn put_json<B, T>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &B,
    ) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = self.request(Method::PUT, path, query).await?;
        let resp = req.json(body).send().await.map_err(from_reqwest)?;
        decode(resp).await
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::RequestBuilder, RemoteError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| RemoteError::transport(format!("invalid endpoint path '{path}': {e}")))?;
        let mut req = self
            .http
            .request(method, url)
            .header("Accept", "application/json")
            .header("Api-Version", &self.api_version);
        if !query.is_empty() {
            req = req.query(query);
        }
        let token = self.token.read().await.clone();
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        Ok(req)
    }
}

pub(crate) fn ensure_trailing_slash(url: &mut Url) {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
}

/// Maps a reqwest failure into the classified error model. A failure carrying
/// a status keeps it; one that never reached a response is status-less.
pub(crate) fn from_reqwest(err: reqwest::Error) -> RemoteError {
    match err.status() {
        Some(status) => RemoteError::api(status.as_u16(), err.to_string()),
        None => RemoteError::transport(err.to_string()),
    }
}

/// Reads the response body, keeping the server's error text verbatim on
/// non-success statuses.
pub(crate) async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, RemoteError> {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(RemoteError::api(status.as_u16(), body));
    }
    serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))
}
