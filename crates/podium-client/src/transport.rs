//! JSON request/response transport against the interaction backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::wire::BackendInfo;

/// Thin JSON transport: one call contract for every backend endpoint.
///
/// Relative paths resolve against the configured base endpoint, absolute
/// URLs are used as-is. Every request carries the configured timeout, and
/// every failure mode is folded into [`Error`] so a calling widget never
/// sees a panic.
pub struct Transport {
    http: reqwest::Client,
    base: Url,
    timeout: Duration,
    requests_sent: AtomicU64,
}

impl Transport {
    /// Build a transport for the configured base endpoint.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| Error::NetworkUnavailable(err.to_string()))?;
        Ok(Self {
            http,
            base: config.base_url.clone(),
            timeout: config.request_timeout,
            requests_sent: AtomicU64::new(0),
        })
    }

    /// Number of HTTP calls attempted so far (including failed ones).
    pub fn requests_sent(&self) -> u64 {
        self.requests_sent.load(Ordering::Relaxed)
    }

    /// GET a JSON document.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(Method::GET, path, None::<&()>).await?;
        Self::decode(response).await
    }

    /// POST a JSON body and decode a JSON response.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send(Method::POST, path, Some(body)).await?;
        Self::decode(response).await
    }

    /// POST a JSON body, ignoring the response beyond its status
    /// (fire-and-forget submissions).
    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        self.send(Method::POST, path, Some(body)).await?;
        Ok(())
    }

    /// Ask the backend for its advertised address (`GET ipsocket`).
    pub async fn backend_info(&self) -> Result<BackendInfo> {
        self.get_json("ipsocket").await
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        let url = self.resolve(path)?;
        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.requests_sent.fetch_add(1, Ordering::Relaxed);

        let response = request.send().await.map_err(|err| self.classify(err))?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::debug!(%status, path, "backend rejected request");
            return Err(Error::RemoteRejected { status: status.as_u16(), message });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|err| Error::NetworkUnavailable(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| Error::MalformedResponse(err.to_string()))
    }

    fn resolve(&self, path: &str) -> Result<Url> {
        if let Ok(url) = Url::parse(path) {
            return Ok(url);
        }
        self.base
            .join(path)
            .map_err(|err| Error::InvalidEndpoint(format!("{path}: {err}")))
    }

    fn classify(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::TimedOut(self.timeout)
        } else {
            Error::NetworkUnavailable(err.to_string())
        }
    }
}
