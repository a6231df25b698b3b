//! HTTP client for the hosted backend's REST surfaces

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::{ClientConfig, ClientError, ClientResult};

/// Thin REST client: adds the `apikey` header and a bearer token to every call
///
/// The bearer defaults to the API key; user-scoped calls pass their own.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestClient {
    /// Create a new client from configuration, authenticating with the anon key
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        Self::from_parts(&config.base_url, &config.anon_key, config.request_timeout())
    }

    pub fn from_parts(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> ClientResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        let token = bearer.unwrap_or(self.api_key.as_str());
        self.client
            .request(method, self.url(path))
            .header("apikey", &self.api_key)
            .header(AUTHORIZATION, format!("Bearer {}", token))
    }

    /// Make a GET request with query parameters
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ClientResult<T> {
        let response = self
            .request(Method::GET, path, None)
            .query(query)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> ClientResult<T> {
        let response = self
            .request(Method::POST, path, None)
            .query(query)
            .json(body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// POST that only cares about success, authenticated as `bearer`
    pub async fn post_as<B: Serialize + ?Sized>(
        &self,
        path: &str,
        bearer: &str,
        body: &B,
    ) -> ClientResult<()> {
        let response = self
            .request(Method::POST, path, Some(bearer))
            .json(body)
            .send()
            .await?;
        Self::handle_empty(response).await
    }

    /// PATCH rows and return the representation of the rows it touched
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> ClientResult<T> {
        let response = self
            .request(Method::PATCH, path, None)
            .header("Prefer", HeaderValue::from_static("return=representation"))
            .query(query)
            .json(body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Make a PUT request with JSON body
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let response = self
            .request(Method::PUT, path, None)
            .json(body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn check_status(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = %status, body = %body, "backend returned error status");
        Err(ClientError::Status { status, body })
    }

    /// Handle the HTTP response
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return serde_json::from_slice(b"null").map_err(|_| {
                ClientError::InvalidResponse("empty body where content was expected".to_string())
            });
        }
        serde_json::from_slice(&bytes).map_err(Into::into)
    }

    async fn handle_empty(response: reqwest::Response) -> ClientResult<()> {
        Self::check_status(response).await.map(|_| ())
    }
}
