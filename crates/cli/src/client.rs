// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated HTTP client for the hotel API.
//!
//! Every request gets `Authorization: Bearer <access>` from the shared
//! [`SessionStore`] unless the caller set the header. A 401 triggers one
//! coalesced credential refresh and exactly one resubmission with the fresh
//! credential; a second 401 is terminal.

use std::sync::{Arc, Once};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::api::ApiResponse;
use crate::config::ClientConfig;
use crate::error::{AuthError, ClientError};
use crate::refresh::CredentialRefresher;
use crate::session::SessionStore;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
///
/// Every HTTP client in this crate is built after calling this. Safe to call
/// multiple times; only the first call has effect, and a provider installed
/// by the embedding application is left in place.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Plain HTTP client with a request timeout and the crypto provider in place.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    ensure_crypto();
    reqwest::Client::builder().timeout(timeout).build().unwrap_or_default()
}

/// An outbound request that has not received a response yet.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl PendingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), headers: HeaderMap::new(), body: None }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Bearer credential currently on the request, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    /// Set (or replace) the bearer credential.
    pub fn set_bearer(&mut self, token: &str) -> Result<(), ClientError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ClientError::InvalidRequest(format!("authorization header: {e}")))?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// A request travelling through the interceptor, with its single-retry marker.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub request: PendingRequest,
    pub already_retried: bool,
}

impl Attempt {
    pub fn new(request: PendingRequest) -> Self {
        Self { request, already_retried: false }
    }
}

/// HTTP client that attaches session credentials and recovers from 401 once.
///
/// Cheap to clone; clones share the connection pool and the session store.
#[derive(Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<SessionStore>,
    refresher: CredentialRefresher,
}

impl AuthClient {
    pub fn new(config: &ClientConfig, store: Arc<SessionStore>) -> Self {
        let http = http_client(config.request_timeout);
        let base_url = config.api_url.trim_end_matches('/').to_owned();
        let refresher = CredentialRefresher::new(
            http.clone(),
            &base_url,
            Arc::clone(&store),
            config.refresh_timeout,
        );
        Self { http, base_url, store, refresher }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a request. Any non-401 response is returned as-is, whatever its status.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: Option<HeaderMap>,
    ) -> Result<Response, ClientError> {
        let mut request = PendingRequest::new(method, path);
        if let Some(body) = body {
            request = request.with_body(body);
        }
        if let Some(headers) = headers {
            request = request.with_headers(headers);
        }
        self.execute(request).await
    }

    /// Send `request` through the credential interceptor.
    ///
    /// A request that arrives with its own `Authorization` header is sent as
    /// is; a 401 on it is returned as `Unauthenticated` without touching the
    /// session.
    pub async fn execute(&self, request: PendingRequest) -> Result<Response, ClientError> {
        let mut attempt = Attempt::new(request);
        let caller_credential = attempt.request.headers.contains_key(AUTHORIZATION);
        self.attach_credential(&mut attempt.request)?;

        loop {
            let resp = self.send(&attempt.request).await?;
            if resp.status() != StatusCode::UNAUTHORIZED {
                return Ok(resp);
            }

            let path = attempt.request.path.as_str();
            if caller_credential {
                debug!(path, "401 on caller-supplied credential");
                return Err(unauthorized(AuthError::Unauthenticated, resp).await);
            }
            if attempt.already_retried {
                debug!(path, "401 after retry, giving up");
                return Err(unauthorized(AuthError::RetryExhausted, resp).await);
            }
            attempt.already_retried = true;

            let used = attempt.request.bearer_token().map(str::to_owned);
            if used.is_none() && !self.store.is_signed_in() {
                debug!(path, "401 without a session");
                return Err(unauthorized(AuthError::Unauthenticated, resp).await);
            }

            debug!(path, "401 received, refreshing credentials");
            match self.refresher.refresh_after(used.as_deref()).await {
                Ok(pair) => {
                    attempt.request.set_bearer(&pair.access_token)?;
                    debug!(path = %attempt.request.path, "retrying with refreshed credentials");
                }
                Err(cause) => return Err(unauthorized(cause, resp).await),
            }
        }
    }

    /// GET `path` and decode the envelope.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<ApiResponse<T>, ClientError> {
        self.call_json(Method::GET, path, None).await
    }

    /// POST `body` to `path` and decode the envelope.
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>, ClientError> {
        self.call_json(Method::POST, path, Some(to_value(body)?)).await
    }

    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>, ClientError> {
        self.call_json(Method::PUT, path, Some(to_value(body)?)).await
    }

    pub async fn patch_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse<T>, ClientError> {
        self.call_json(Method::PATCH, path, Some(to_value(body)?)).await
    }

    pub async fn delete_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<ApiResponse<T>, ClientError> {
        self.call_json(Method::DELETE, path, None).await
    }

    /// Send `body` (if any) with `method` and decode the envelope. Non-2xx
    /// responses become [`ClientError::Status`].
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse<T>, ClientError> {
        let resp = self.request(method, path, body, None).await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status { status, body: text });
        }
        serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
    }

    fn attach_credential(&self, request: &mut PendingRequest) -> Result<(), ClientError> {
        if request.headers.contains_key(AUTHORIZATION) {
            return Ok(());
        }
        match self.store.access_token() {
            Some(token) => request.set_bearer(&token),
            None => Ok(()),
        }
    }

    async fn send(&self, request: &PendingRequest) -> Result<Response, ClientError> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path))
            .headers(request.headers.clone());
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn to_value<B: Serialize>(body: &B) -> Result<Value, ClientError> {
    serde_json::to_value(body).map_err(|e| ClientError::InvalidRequest(format!("body: {e}")))
}

async fn unauthorized(cause: AuthError, resp: Response) -> ClientError {
    let body = resp.text().await.unwrap_or_default();
    ClientError::Unauthorized { cause, body }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
