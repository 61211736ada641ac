//! HTTP implementations of the remote collaborators.
//!
//! One client serves both the document store and the expansion service;
//! configuration comes from the environment:
//! - `MINDGRAPH_URL` — base URL (default `http://localhost:7010/api/v1`)
//! - `MINDGRAPH_TOKEN` — bearer credential (optional; without it the store
//!   endpoints refuse locally and only expansion is attempted)

use chrono::Utc;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::{MapError, MapResult};
use crate::models::Node;
use crate::remote::{DocumentStore, Expander, StaticToken, TokenProvider};

const DEFAULT_URL: &str = "http://localhost:7010/api/v1";

pub struct HttpClient {
    base_url: String,
    tokens: Box<dyn TokenProvider>,
    client: Client,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, tokens: Box<dyn TokenProvider>) -> Self {
        Self {
            base_url: base_url.into(),
            tokens,
            client: Client::new(),
        }
    }

    /// Client from environment variables.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("MINDGRAPH_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        let token = std::env::var("MINDGRAPH_TOKEN").ok();
        Self::new(base_url, Box::new(StaticToken(token)))
    }

    pub fn has_credential(&self) -> bool {
        self.tokens.token().is_some()
    }

    /// Build a request carrying the bearer credential when one is cached.
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(token) = self.tokens.token() {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Like [`HttpClient::request`] but refuses up front without a
    /// credential; the store endpoints all require one.
    fn authed(&self, method: Method, path: &str) -> MapResult<reqwest::RequestBuilder> {
        if !self.has_credential() {
            return Err(MapError::Auth(
                "no credential cached; sign in first".to_string(),
            ));
        }
        Ok(self.request(method, path))
    }

    async fn handle<T: DeserializeOwned>(&self, response: reqwest::Response) -> MapResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        Err(Self::status_error(status, response.text().await.unwrap_or_default()))
    }

    async fn handle_empty(&self, response: reqwest::Response) -> MapResult<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(Self::status_error(status, response.text().await.unwrap_or_default()))
    }

    fn status_error(status: StatusCode, body: String) -> MapError {
        match status {
            StatusCode::NOT_FOUND => MapError::NotFound(body),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => MapError::Auth(body),
            _ => MapError::Server {
                status: status.as_u16(),
                body,
            },
        }
    }
}

impl DocumentStore for HttpClient {
    async fn create(&self, doc: &Value) -> MapResult<String> {
        let response = self
            .authed(Method::POST, "/maps")?
            .json(doc)
            .send()
            .await?;
        let created: Value = self.handle(response).await?;
        created
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| MapError::Malformed("create response carries no id".to_string()))
    }

    async fn update(&self, id: &str, doc: &Value) -> MapResult<()> {
        let response = self
            .authed(Method::PUT, &format!("/maps/{id}"))?
            .json(doc)
            .send()
            .await?;
        self.handle_empty(response).await
    }

    async fn update_content(&self, id: &str, doc: &Value) -> MapResult<()> {
        let response = self
            .authed(Method::POST, &format!("/maps/{id}/content"))?
            .json(doc)
            .send()
            .await?;
        self.handle_empty(response).await
    }

    async fn rename(&self, id: &str, name: &str) -> MapResult<()> {
        let body = json!({ "name": name, "lastUpdated": Utc::now().to_rfc3339() });
        let response = self
            .authed(Method::PUT, &format!("/maps/{id}/name"))?
            .json(&body)
            .send()
            .await?;
        self.handle_empty(response).await
    }

    async fn get(&self, id: &str) -> MapResult<Value> {
        let response = self
            .authed(Method::GET, &format!("/maps/{id}"))?
            .send()
            .await?;
        self.handle(response).await
    }

    async fn delete(&self, id: &str) -> MapResult<()> {
        let response = self
            .authed(Method::DELETE, &format!("/maps/{id}"))?
            .send()
            .await?;
        self.handle_empty(response).await
    }

    async fn list(&self) -> MapResult<Vec<Value>> {
        let response = self.authed(Method::GET, "/maps")?.send().await?;
        self.handle(response).await
    }
}

impl Expander for HttpClient {
    async fn generate(&self, topic: &str, emojis: bool) -> MapResult<Node> {
        let body = json!({ "topic": topic, "emojisEnabled": emojis });
        let response = self
            .request(Method::POST, "/generate-map")
            .json(&body)
            .send()
            .await?;
        self.handle(response).await
    }

    async fn expand(&self, path: &[String], emojis: bool) -> MapResult<Vec<Node>> {
        let body = json!({ "path": path, "emojisEnabled": emojis });
        let response = self
            .request(Method::POST, "/expand-node")
            .json(&body)
            .send()
            .await?;
        self.handle(response).await
    }
}
