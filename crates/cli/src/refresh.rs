// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential refresh: exchange the session's refresh credential for a new
//! access/refresh pair.
//!
//! Concurrent callers sharing a [`SessionStore`] coalesce onto one in-flight
//! exchange through the store's [`RefreshGate`]. Every failure path ends the
//! session the refresh started from and resolves to an [`AuthError`]; nothing
//! escapes as a panic or an untyped error.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::api::{ApiResponse, RefreshPayload, RefreshRequest};
use crate::error::AuthError;
use crate::session::{SessionStore, SessionUpdate, TokenPair};

type RefreshOutcome = Result<TokenPair, AuthError>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Single-flight slot holding the in-flight refresh of one session.
#[derive(Default)]
pub struct RefreshGate {
    inflight: Mutex<Option<SharedRefresh>>,
}

enum Joined {
    /// The credential the caller used was already rotated; use these.
    Current(TokenPair),
    Wait(SharedRefresh),
}

impl RefreshGate {
    /// Whether a refresh is currently pending.
    pub fn in_flight(&self) -> bool {
        self.inflight.lock().as_ref().is_some_and(|f| f.peek().is_none())
    }

    fn join(
        &self,
        store: &SessionStore,
        used: Option<&str>,
        start: impl FnOnce() -> BoxFuture<'static, RefreshOutcome>,
    ) -> Joined {
        let mut slot = self.inflight.lock();
        if let Some(pending) = slot.as_ref().filter(|f| f.peek().is_none()) {
            return Joined::Wait(pending.clone());
        }

        // The session moved on (refresh or new sign-in) after the caller's
        // request went out.
        if let Some(current) = store.get() {
            if used != Some(current.access_token.as_str()) {
                return Joined::Current(current.token_pair());
            }
        }

        let fut = start().shared();
        *slot = Some(fut.clone());
        Joined::Wait(fut)
    }

    fn release(&self, fut: &SharedRefresh) {
        let mut slot = self.inflight.lock();
        if slot.as_ref().is_some_and(|f| f.ptr_eq(fut)) {
            *slot = None;
        }
    }
}

/// Performs `POST /auth/refresh` on behalf of a session.
#[derive(Clone)]
pub struct CredentialRefresher {
    http: reqwest::Client,
    refresh_url: String,
    store: Arc<SessionStore>,
    timeout: Duration,
}

impl CredentialRefresher {
    pub fn new(
        http: reqwest::Client,
        api_url: &str,
        store: Arc<SessionStore>,
        timeout: Duration,
    ) -> Self {
        let refresh_url = format!("{}/auth/refresh", api_url.trim_end_matches('/'));
        Self { http, refresh_url, store, timeout }
    }

    /// Refresh, coalesced with any refresh already in flight for this session.
    ///
    /// `used` is the access credential carried by the request that got a 401.
    /// If the session has moved past it, the current pair is returned without
    /// calling the endpoint.
    pub async fn refresh_after(&self, used: Option<&str>) -> RefreshOutcome {
        let gate = self.store.refresh_gate();
        let this = self.clone();
        let fut = match gate.join(&self.store, used, move || {
            async move { this.refresh().await }.boxed()
        }) {
            Joined::Current(pair) => {
                debug!("credential already rotated, skipping refresh");
                return Ok(pair);
            }
            Joined::Wait(fut) => fut,
        };

        let outcome = fut.clone().await;
        gate.release(&fut);
        outcome
    }

    /// Perform one refresh exchange and apply it to the session.
    ///
    /// The outcome only touches the session it started from. If that session
    /// was replaced meanwhile, the replacement is left alone and its
    /// credentials are returned.
    ///
    /// Not coalesced; use [`Self::refresh_after`] from request paths.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Some(started) = self.store.get() else {
            debug!("no session to refresh");
            return Err(AuthError::MissingCredential);
        };
        let Some(refresh_token) = started.refresh_token.clone() else {
            warn!("no refresh credential available, signing out");
            self.store.terminate_if_current(&started, "missing refresh credential");
            return Err(AuthError::MissingCredential);
        };

        let result = match tokio::time::timeout(self.timeout, self.exchange(&refresh_token)).await
        {
            Ok(result) => result,
            Err(_) => Err(RefreshFailure(format!("timed out after {:?}", self.timeout))),
        };

        let pair = match result {
            Ok(pair) => pair,
            Err(e) => {
                warn!(err = %e, "credential refresh failed");
                if self.store.terminate_if_current(&started, "refresh failed") {
                    return Err(AuthError::RefreshFailed);
                }
                return self.superseded();
            }
        };

        if !self.store.update_if_current(&started, SessionUpdate::tokens(&pair)) {
            return self.superseded();
        }

        info!("credentials refreshed");
        Ok(pair)
    }

    /// Outcome for a refresh whose session is no longer current.
    fn superseded(&self) -> RefreshOutcome {
        match self.store.get() {
            Some(current) => {
                debug!("session replaced during refresh, keeping the replacement");
                Ok(current.token_pair())
            }
            None => {
                debug!("session cleared during refresh, discarding new credentials");
                Err(AuthError::RefreshFailed)
            }
        }
    }

    async fn exchange(&self, refresh_token: &str) -> Result<TokenPair, RefreshFailure> {
        let resp = self
            .http
            .post(&self.refresh_url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| RefreshFailure(format!("HTTP error: {e}")))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| RefreshFailure(format!("read body: {e}")))?;

        if !status.is_success() {
            return Err(RefreshFailure(format!("HTTP {status}: {body}")));
        }

        let envelope: ApiResponse<Option<RefreshPayload>> = serde_json::from_str(&body)
            .map_err(|e| RefreshFailure(format!("parse response: {e}")))?;

        let payload = match envelope.payload {
            Some(p) if envelope.success && !p.access_token.is_empty() => p,
            _ => return Err(RefreshFailure("invalid response format".to_owned())),
        };

        Ok(TokenPair {
            access_token: payload.access_token,
            refresh_token: Some(payload.refresh_token.unwrap_or_else(|| refresh_token.to_owned())),
        })
    }
}

/// Why a refresh exchange failed. Logged, then collapsed into
/// [`AuthError::RefreshFailed`].
#[derive(Debug)]
struct RefreshFailure(String);

impl fmt::Display for RefreshFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
