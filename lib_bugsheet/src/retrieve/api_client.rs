//! # HTTP Retrieval Utilities
//!
//! An asynchronous API client wrapper around `reqwest`, with middleware-based
//! exponential backoff retries and standardized JSON response handling.

use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Failures raised by [`ApiClient`].
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// The base URL or a joined path is not a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request failed after retries, or the middleware rejected it.
    #[error("Request failed: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// The response body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request body could not be serialized.
    #[error("Failed to serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A success response did not deserialize into the expected type.
    #[error("Failed to decode response body: {0}")]
    Decode(String),
}

/// A standardized container for API responses.
///
/// Wraps the deserialized data along with metadata about the HTTP
/// transaction.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The deserialized response body on success.
    pub data: Option<T>,
    /// The raw body returned by the server when the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
    /// The headers returned by the server.
    pub headers: HeaderMap,
}

/// A flexible asynchronous HTTP client.
///
/// Handles the base URL, Bearer authentication and automatic retries of
/// transient failures.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: ClientWithMiddleware,
    base_url: Url,
    auth_token: Option<String>,
}

impl ApiClient {
    /// Creates a client rooted at `base_url`, retrying transient failures
    /// up to 3 times.
    ///
    /// A trailing `/` is added to the base path when missing, so relative
    /// paths always join below it.
    ///
    /// # Errors
    /// Returns [`RetrieveError::InvalidUrl`] if `base_url` is not absolute.
    pub fn new(base_url: &str, auth_token: Option<String>) -> Result<Self, RetrieveError> {
        let mut url = Url::parse(base_url)?;
        if url.cannot_be_a_base() {
            return Err(RetrieveError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let client = ClientBuilder::new(reqwest::Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            inner: client,
            base_url: url,
            auth_token,
        })
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Performs a request and decodes a JSON response.
    ///
    /// Non-2xx responses are not errors: they come back with `success ==
    /// false` and the raw body in `error_body`, leaving the status policy to
    /// the caller.
    ///
    /// # Arguments
    /// * `method` - The HTTP verb.
    /// * `path` - Path relative to the base URL.
    /// * `query` - Query pairs, appended in order. Keys may repeat.
    /// * `headers` - Extra headers for this request.
    /// * `body` - Serialized as the JSON request body when present.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        headers: Option<HeaderMap>,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, RetrieveError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let full_url = self.base_url.join(path)?;
        log::debug!("{} {}", method, full_url);
        let mut req = self.inner.request(method, full_url);

        if !query.is_empty() {
            req = req.query(query);
        }

        if let Some(h) = headers {
            req = req.headers(h);
        }

        if let Some(token) = &self.auth_token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        if let Some(b) = body {
            let json_body = serde_json::to_string(b)?;
            req = req.header(CONTENT_TYPE, "application/json").body(json_body);
        }

        let response = req.send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        if status.is_success() {
            let text = response.text().await?;
            let data = serde_json::from_str::<T>(&text)
                .map_err(|e| RetrieveError::Decode(e.to_string()))?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
                headers,
            })
        } else {
            let error_body = response.text().await.ok();
            Ok(ApiResponse {
                data: None,
                error_body,
                status: status.as_u16(),
                success: false,
                headers,
            })
        }
    }

    /// `GET path?query`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<ApiResponse<T>, RetrieveError> {
        self.request::<T, ()>(Method::GET, path, query, None, None)
            .await
    }

    /// `PUT path` with a JSON body.
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, RetrieveError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, path, &[], None, Some(body)).await
    }
}
