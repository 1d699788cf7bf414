//! HTTP client for provider APIs
//!
//! Thin wrapper over reqwest that turns non-success statuses into
//! [`HttpError::Status`] and lets callers treat 404 as "absent".

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::config::defaults;
use crate::error::HttpError;

/// Maximum number of response body bytes kept in error messages
const MAX_ERROR_BODY: usize = 512;

/// HTTP client shared by the providers
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a client with the default timeouts and user agent
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(defaults::HTTP_REQUEST_TIMEOUT_SECS))
                .connect_timeout(Duration::from_secs(defaults::HTTP_CONNECT_TIMEOUT_SECS))
                .user_agent(defaults::USER_AGENT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Get the underlying reqwest client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Send a request and decode a JSON body
    pub async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, HttpError> {
        let response = self.send(request).await?;
        decode_json(response).await
    }

    /// Send a request and decode a JSON body, mapping 404 to `None`
    pub async fn optional_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<T>, HttpError> {
        match self.send(request).await {
            Ok(response) => decode_json(response).await.map(Some),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Send a request and read a text body, mapping 404 to `None`
    pub async fn optional_text(&self, request: RequestBuilder) -> Result<Option<String>, HttpError> {
        match self.send(request).await {
            Ok(response) => {
                let url = response.url().to_string();
                response
                    .text()
                    .await
                    .map(Some)
                    .map_err(|e| HttpError::Request {
                        url,
                        error: e.to_string(),
                    })
            }
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Send a request and discard the body
    pub async fn empty(&self, request: RequestBuilder) -> Result<(), HttpError> {
        self.send(request).await.map(|_| ())
    }

    /// Send a request, failing on any non-success status
    async fn send(&self, request: RequestBuilder) -> Result<Response, HttpError> {
        let request = request.build().map_err(|e| HttpError::Request {
            url: e.url().map(ToString::to_string).unwrap_or_default(),
            error: e.to_string(),
        })?;
        let url = request.url().to_string();
        tracing::debug!("{} {}", request.method(), url);

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| HttpError::Request {
                url: url.clone(),
                error: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(HttpError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, HttpError> {
    let url = response.url().to_string();
    let bytes = response.bytes().await.map_err(|e| HttpError::Request {
        url: url.clone(),
        error: e.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| HttpError::Decode {
        url,
        error: e.to_string(),
    })
}

fn is_not_found(error: &HttpError) -> bool {
    error.status() == Some(StatusCode::NOT_FOUND.as_u16())
}

/// Append path segments to a base URL, percent-encoding each one
///
/// A segment containing `/` is encoded as a single segment (`%2F`); split
/// the path first when the slashes must be preserved.
pub fn endpoint<S: AsRef<str>>(base: &str, segments: &[S]) -> Result<Url, HttpError> {
    let mut url = Url::parse(base).map_err(|e| HttpError::InvalidUrl {
        url: base.to_string(),
        error: e.to_string(),
    })?;

    url.path_segments_mut()
        .map_err(|()| HttpError::InvalidUrl {
            url: base.to_string(),
            error: "URL cannot be a base".to_string(),
        })?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}

/// Split a repository file path into URL segments
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
