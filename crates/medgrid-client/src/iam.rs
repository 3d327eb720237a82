//! IAM identity service: applications registered under a proposition.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use medgrid_core::{RemoteError, TokenRefresh};

use crate::token::TokenSource;
use crate::transport::ApiClient;

/// An IAM application. `name` and `proposition_id` form the natural key;
/// the platform assigns `id` on creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub proposition_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub global_reference_id: String,
}

/// Natural-key filter for [`Applications::get_applications`].
#[derive(Debug, Clone, Default)]
pub struct ApplicationsQuery {
    pub name: Option<String>,
    pub proposition_id: Option<String>,
}

/// Application operations on the IAM service.
#[async_trait]
pub trait Applications: TokenRefresh {
    async fn create_application(&self, app: &Application) -> Result<Application, RemoteError>;
    async fn get_application_by_id(&self, id: &str) -> Result<Application, RemoteError>;
    async fn get_applications(
        &self,
        query: &ApplicationsQuery,
    ) -> Result<Vec<Application>, RemoteError>;
}

/// IAM service client. Resources live under the IDM base URL; the token
/// grant runs against the separate IAM URL via the shared [`TokenSource`].
pub struct IamClient {
    api: ApiClient,
    tokens: Arc<TokenSource>,
}

impl IamClient {
    pub fn new(api: ApiClient, tokens: Arc<TokenSource>) -> Self {
        Self { api, tokens }
    }

    pub fn tokens(&self) -> &TokenSource {
        &self.tokens
    }
}

#[async_trait]
impl TokenRefresh for IamClient {
    async fn refresh_token(&self) -> Result<(), RemoteError> {
        self.tokens.refresh().await
    }
}

#[derive(Debug, Deserialize)]
struct ApplicationBundle {
    #[serde(default)]
    entry: Vec<Application>,
}

#[async_trait]
impl Applications for IamClient {
    async fn create_application(&self, app: &Application) -> Result<Application, RemoteError> {
        self.api
            .post_json("authorize/identity/Application", &[], app)
            .await
    }

    async fn get_application_by_id(&self, id: &str) -> Result<Application, RemoteError> {
        self.api
            .get_json(&format!("authorize/identity/Application/{id}"), &[])
            .await
    }

    async fn get_applications(
        &self,
        query: &ApplicationsQuery,
    ) -> Result<Vec<Application>, RemoteError> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(name) = query.name.as_deref() {
            params.push(("name", name));
        }
        if let Some(proposition_id) = query.proposition_id.as_deref() {
            params.push(("propositionId", proposition_id));
        }
        let bundle: ApplicationBundle = self
            .api
            .get_json("authorize/identity/Application", &params)
            .await?;
        Ok(bundle.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::token_cell;
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> IamClient {
        let tokens = Arc::new(
            TokenSource::new(
                &Url::parse(&server.uri()).unwrap(),
                crate::token::Credentials {
                    oauth2_client_id: "client".into(),
                    oauth2_password: "secret".into(),
                    username: "admin".into(),
                    password: "pw".into(),
                },
            )
            .unwrap(),
        );
        let api = ApiClient::new(Url::parse(&server.uri()).unwrap(), token_cell(), "1");
        IamClient::new(api, tokens)
    }

    #[test]
    fn application_wire_shape() {
        let app = Application {
            id: String::new(),
            name: "CDS".into(),
            description: "clinical data store".into(),
            proposition_id: "prop-1".into(),
            global_reference_id: "ref-1".into(),
        };
        let json = serde_json::to_value(&app).unwrap();
        assert_eq!(json["name"], "CDS");
        assert_eq!(json["propositionId"], "prop-1");
        assert_eq!(json["globalReferenceId"], "ref-1");
        // Unassigned ids stay off the wire.
        assert!(json.get("id").is_none());
    }

    #[tokio::test]
    async fn list_unwraps_the_bundle() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/authorize/identity/Application"))
            .and(query_param("name", "CDS"))
            .and(query_param("propositionId", "prop-1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"total":1,"entry":[{"id":"app-1","name":"CDS","description":"clinical data store","propositionId":"prop-1","globalReferenceId":"ref-1"}]}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let apps = client
            .get_applications(&ApplicationsQuery {
                name: Some("CDS".into()),
                proposition_id: Some("prop-1".into()),
            })
            .await
            .unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].id, "app-1");
    }

    #[tokio::test]
    async fn create_posts_and_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authorize/identity/Application"))
            .respond_with(ResponseTemplate::new(201).set_body_raw(
                r#"{"id":"app-9","name":"CDS","description":"clinical data store","propositionId":"prop-1","globalReferenceId":"ref-1"}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let created = client
            .create_application(&Application {
                id: String::new(),
                name: "CDS".into(),
                description: "clinical data store".into(),
                proposition_id: "prop-1".into(),
                global_reference_id: "ref-1".into(),
            })
            .await
            .unwrap();
        assert_eq!(created.id, "app-9");
    }
}
