//! reqwest implementation of [`RecipeGateway`] against the Cookidoo mobile API.

use std::time::Duration;

use async_trait::async_trait;
use cookido_shared::{CookidoError, CookidooSettings, Result};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use url::Url;

use crate::RecipeGateway;
use crate::model::{CreatedCollection, ListPage, PageCount, RecipeDetail, RemoteCollection};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("CookidoAgent/", env!("CARGO_PKG_VERSION"));

/// Default timeout in seconds for a single API call.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of response body characters quoted in error messages.
const ERROR_BODY_LIMIT: usize = 200;

const TOKEN_PATH: &str = "ciam/auth/token";

/// Which collection listing to query.
#[derive(Debug, Clone, Copy)]
enum ListKind {
    Managed,
    Custom,
}

impl ListKind {
    fn segment(self) -> &'static str {
        match self {
            Self::Managed => "managed-list",
            Self::Custom => "custom-list",
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Cookidoo API client holding the bearer token of the logged-in account.
pub struct CookidooClient {
    settings: CookidooSettings,
    http: Client,
    token: RwLock<Option<String>>,
}

impl CookidooClient {
    /// Create a client for the given account and region.
    pub fn new(settings: CookidooSettings) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| CookidoError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            settings,
            http,
            token: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.settings
            .api_endpoint
            .join(path)
            .map_err(|e| CookidoError::config(format!("invalid API path '{path}': {e}")))
    }

    fn list_path(&self, kind: ListKind) -> String {
        format!(
            "organize/{}/api/{}",
            self.settings.region.language,
            kind.segment()
        )
    }

    fn custom_list_path(&self, collection_id: &str) -> String {
        format!("{}/{collection_id}", self.list_path(ListKind::Custom))
    }

    /// Build an authenticated request.
    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self
            .token
            .read()
            .await
            .clone()
            .ok_or_else(|| CookidoError::config("not logged in to Cookidoo"))?;
        let url = self.url(path)?;
        debug!(%method, %url, "cookidoo request");
        Ok(self
            .http
            .request(method, url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json"))
    }

    async fn list_page(&self, kind: ListKind, page: u32) -> Result<ListPage> {
        let path = self.list_path(kind);
        let request = self.request(Method::GET, &path).await?.query(&[("page", page)]);
        let response = send(request, &path).await?;
        decode_json(response, &path).await
    }
}

// ---------------------------------------------------------------------------
// Trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl RecipeGateway for CookidooClient {
    #[instrument(skip_all, fields(region = self.settings.region.code))]
    async fn login(&self) -> Result<()> {
        let url = self.url(TOKEN_PATH)?;
        let request = self.http.post(url).form(&[
            ("grant_type", "password"),
            ("username", self.settings.email.as_str()),
            ("password", self.settings.password.as_str()),
            ("client_id", self.settings.client_id.as_str()),
        ]);

        let response = send(request, TOKEN_PATH).await?;
        let token: TokenResponse = decode_json(response, TOKEN_PATH).await?;
        debug!(token_type = token.token_type.as_deref().unwrap_or("bearer"), "token received");

        *self.token.write().await = Some(token.access_token);
        info!("logged in to Cookidoo");
        Ok(())
    }

    async fn count_managed_collections(&self) -> Result<PageCount> {
        Ok(self.list_page(ListKind::Managed, 0).await?.page_count())
    }

    async fn get_managed_collections(&self, page: u32) -> Result<Vec<RemoteCollection>> {
        Ok(self.list_page(ListKind::Managed, page).await?.lists)
    }

    async fn count_custom_collections(&self) -> Result<PageCount> {
        Ok(self.list_page(ListKind::Custom, 0).await?.page_count())
    }

    async fn get_custom_collections(&self, page: u32) -> Result<Vec<RemoteCollection>> {
        Ok(self.list_page(ListKind::Custom, page).await?.lists)
    }

    async fn add_custom_collection(&self, name: &str) -> Result<RemoteCollection> {
        let path = self.list_path(ListKind::Custom);
        let request = self
            .request(Method::POST, &path)
            .await?
            .json(&serde_json::json!({ "title": name }));
        let response = send(request, &path).await?;
        let created: CreatedCollection = decode_json(response, &path).await?;
        Ok(created.into_inner())
    }

    async fn remove_custom_collection(&self, collection_id: &str) -> Result<()> {
        let path = self.custom_list_path(collection_id);
        send(self.request(Method::DELETE, &path).await?, &path).await?;
        Ok(())
    }

    async fn add_recipes_to_custom_collection(
        &self,
        collection_id: &str,
        recipe_ids: &[String],
    ) -> Result<()> {
        let path = self.custom_list_path(collection_id);
        let request = self
            .request(Method::PUT, &path)
            .await?
            .json(&serde_json::json!({ "recipeIDs": recipe_ids }));
        send(request, &path).await?;
        Ok(())
    }

    async fn remove_recipe_from_custom_collection(
        &self,
        collection_id: &str,
        recipe_id: &str,
    ) -> Result<()> {
        let path = format!("{}/recipes/{recipe_id}", self.custom_list_path(collection_id));
        send(self.request(Method::DELETE, &path).await?, &path).await?;
        Ok(())
    }

    async fn get_recipe_details(&self, recipe_id: &str) -> Result<RecipeDetail> {
        let path = format!(
            "recipes/recipe/{}/{recipe_id}",
            self.settings.region.language
        );
        let response = send(self.request(Method::GET, &path).await?, &path).await?;
        decode_json(response, &path).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Send a request, mapping transport failures and non-2xx statuses to errors.
async fn send(request: RequestBuilder, path: &str) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| CookidoError::Network(format!("{path}: {e}")))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    Err(CookidoError::Api {
        status: status.as_u16(),
        message: format!("{path}: {snippet}"),
    })
}

async fn decode_json<T: DeserializeOwned>(response: Response, path: &str) -> Result<T> {
    let body = response
        .text()
        .await
        .map_err(|e| CookidoError::Network(format!("{path}: failed to read body: {e}")))?;
    serde_json::from_str(&body)
        .map_err(|e| CookidoError::parse(format!("{path}: unexpected response shape: {e}")))
}

#[cfg(test)]
mod tests {
    use cookido_shared::{AppConfig, Region};
    use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::fetch_all_custom_collections;

    fn settings(server: &MockServer) -> CookidooSettings {
        let mut config = AppConfig::default();
        config.cookidoo.api_endpoint = Some(server.uri());
        CookidooSettings::new(
            &config,
            Region::lookup("es").unwrap(),
            "cook@example.com".into(),
            "hunter2".into(),
        )
        .unwrap()
    }

    async fn logged_in_client(server: &MockServer) -> CookidooClient {
        Mock::given(method("POST"))
            .and(path("/ciam/auth/token"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("username=cook%40example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-123",
                "token_type": "bearer",
                "expires_in": 43200
            })))
            .mount(server)
            .await;

        let client = CookidooClient::new(settings(server)).unwrap();
        client.login().await.unwrap();
        client
    }

    #[tokio::test]
    async fn calls_before_login_are_rejected() {
        let server = MockServer::start().await;
        let client = CookidooClient::new(settings(&server)).unwrap();
        let err = client.get_custom_collections(0).await.unwrap_err();
        assert!(matches!(err, CookidoError::Config { .. }));
    }

    #[tokio::test]
    async fn login_failure_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ciam/auth/token"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let client = CookidooClient::new(settings(&server)).unwrap();
        match client.login().await.unwrap_err() {
            CookidoError::Api { status, message } => {
                assert_eq!(status, 401);
                assert!(message.contains("invalid_grant"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetches_every_page_of_custom_collections() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server).await;

        Mock::given(method("GET"))
            .and(path("/organize/es-ES/api/custom-list"))
            .and(query_param("page", "0"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "customlists": [
                    {"id": "c1", "title": "Cenas", "chapters": [{"recipes": [{"id": "r1"}]}]}
                ],
                "page": {"totalPages": 2, "totalElements": 2}
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/organize/es-ES/api/custom-list"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "customlists": [{"id": "c2", "title": "Postres"}],
                "page": {"totalPages": 2, "totalElements": 2}
            })))
            .mount(&server)
            .await;

        let all = fetch_all_custom_collections(&client).await.unwrap();
        let names: Vec<_> = all.iter().filter_map(|c| c.display_name()).collect();
        assert_eq!(names, vec!["Cenas", "Postres"]);
        assert_eq!(all[0].recipe_ids(), vec!["r1"]);
    }

    #[tokio::test]
    async fn creates_collection_and_adds_recipes() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server).await;

        Mock::given(method("POST"))
            .and(path("/organize/es-ES/api/custom-list"))
            .and(body_json(serde_json::json!({"title": "Seafood"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": {"id": "new-1", "title": "Seafood", "chapters": []}
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/organize/es-ES/api/custom-list/new-1"))
            .and(body_json(serde_json::json!({"recipeIDs": ["r1", "r2"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let created = client.add_custom_collection("Seafood").await.unwrap();
        assert_eq!(created.id.as_deref(), Some("new-1"));

        client
            .add_recipes_to_custom_collection("new-1", &["r1".into(), "r2".into()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn removes_recipe_and_collection() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server).await;

        Mock::given(method("DELETE"))
            .and(path("/organize/es-ES/api/custom-list/c9/recipes/r7"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/organize/es-ES/api/custom-list/c9"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client.remove_recipe_from_custom_collection("c9", "r7").await.unwrap();
        client.remove_custom_collection("c9").await.unwrap();
    }

    #[tokio::test]
    async fn recipe_detail_decodes_and_errors_surface() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server).await;

        Mock::given(method("GET"))
            .and(path("/recipes/recipe/es-ES/r1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "r1",
                "title": "Crema de calabaza",
                "recipeIngredientGroups": [
                    {"recipeIngredients": [{"ingredientNotation": "500 g calabaza, en trozos"}]}
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/recipes/recipe/es-ES/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let detail = client.get_recipe_details("r1").await.unwrap();
        assert_eq!(detail.display_name(), Some("Crema de calabaza"));
        assert_eq!(detail.ingredient_groups.len(), 1);

        let err = client.get_recipe_details("missing").await.unwrap_err();
        assert!(matches!(err, CookidoError::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        let client = logged_in_client(&server).await;

        Mock::given(method("GET"))
            .and(path("/organize/es-ES/api/managed-list"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = client.count_managed_collections().await.unwrap_err();
        assert!(matches!(err, CookidoError::Parse { .. }));
    }
}
