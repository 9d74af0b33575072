// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Account endpoints (`/auth/register`, `/auth/login`, `/auth/me`) and the
//! sign-in / sign-out flows that populate the [`SessionStore`].
//!
//! These calls never go through the credential interceptor. Failures come
//! back as envelopes with `success = false` rather than errors, so callers
//! can show the server's message.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::api::{ApiResponse, AuthPayload, User};
use crate::client::http_client;
use crate::config::ClientConfig;
use crate::session::{Identity, Session, SessionStore};

const GENERIC_FAILURE: &str = "Something went wrong";

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Client for the unauthenticated account endpoints.
#[derive(Clone)]
pub struct AuthService {
    http: reqwest::Client,
    api_url: String,
}

impl AuthService {
    pub fn new(config: &ClientConfig) -> Self {
        let http = http_client(config.request_timeout);
        Self { http, api_url: config.api_url.trim_end_matches('/').to_owned() }
    }

    pub async fn register(&self, request: &RegisterRequest) -> ApiResponse<Option<AuthPayload>> {
        let url = format!("{}/auth/register", self.api_url);
        envelope(self.http.post(url).json(request).send().await, "register").await
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResponse<Option<AuthPayload>> {
        let url = format!("{}/auth/login", self.api_url);
        let body = LoginRequest { email, password };
        envelope(self.http.post(url).json(&body).send().await, "login").await
    }

    /// Fetch the user that owns `access_token`.
    pub async fn me(&self, access_token: &str) -> ApiResponse<Option<User>> {
        let url = format!("{}/auth/me", self.api_url);
        envelope(self.http.get(url).bearer_auth(access_token).send().await, "me").await
    }
}

/// Decode an account-endpoint response, folding every failure into a
/// `success = false` envelope.
async fn envelope<T: DeserializeOwned>(
    sent: Result<reqwest::Response, reqwest::Error>,
    op: &'static str,
) -> ApiResponse<Option<T>> {
    let resp = match sent {
        Ok(resp) => resp,
        Err(e) => {
            debug!(op, err = %e, "auth request failed");
            return ApiResponse::failure(GENERIC_FAILURE);
        }
    };
    let status = resp.status();
    let body = match resp.text().await {
        Ok(body) => body,
        Err(e) => {
            debug!(op, err = %e, "auth response unreadable");
            return ApiResponse::failure(GENERIC_FAILURE);
        }
    };

    match serde_json::from_str::<ApiResponse<Option<T>>>(&body) {
        Ok(mut parsed) => {
            if !status.is_success() {
                debug!(op, %status, message = %parsed.message, "auth request rejected");
                parsed.success = false;
                parsed.payload = None;
            }
            parsed
        }
        Err(e) => {
            debug!(op, %status, err = %e, "auth response not an envelope");
            let trimmed = body.trim();
            if !status.is_success() && !trimmed.is_empty() && trimmed.len() <= 200 {
                ApiResponse::failure(trimmed)
            } else {
                ApiResponse::failure(GENERIC_FAILURE)
            }
        }
    }
}

fn session_from(payload: AuthPayload) -> Session {
    Session {
        identity: Identity::from(payload.user),
        access_token: payload.token,
        refresh_token: Some(payload.refresh_token).filter(|t| !t.is_empty()),
    }
}

/// Log in and start a session in `store`.
pub async fn sign_in(
    auth: &AuthService,
    store: &SessionStore,
    email: &str,
    password: &str,
) -> anyhow::Result<Identity> {
    if email.is_empty() || password.is_empty() {
        anyhow::bail!("email and password are required");
    }
    let resp = auth.login(email, password).await;
    match resp.payload {
        Some(payload) if resp.success && !payload.token.is_empty() => {
            let session = session_from(payload);
            let identity = session.identity.clone();
            store.sign_in(session);
            Ok(identity)
        }
        _ => anyhow::bail!("sign-in failed: {}", resp.message),
    }
}

/// Register an account; if the server returns credentials, start a session.
///
/// Returns the new identity and whether a session was started.
pub async fn sign_up(
    auth: &AuthService,
    store: &SessionStore,
    request: &RegisterRequest,
) -> anyhow::Result<(Identity, bool)> {
    let resp = auth.register(request).await;
    let payload = match resp.payload {
        Some(payload) if resp.success => payload,
        _ => anyhow::bail!("registration failed: {}", resp.message),
    };
    if payload.token.is_empty() {
        info!(user_id = %payload.user.id, "registered without credentials");
        return Ok((Identity::from(payload.user), false));
    }
    let session = session_from(payload);
    let identity = session.identity.clone();
    store.sign_in(session);
    Ok((identity, true))
}

/// End the current session, if any.
pub fn sign_out(store: &SessionStore) {
    store.terminate("sign-out");
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
