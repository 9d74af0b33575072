// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end credential scenarios.
//!
//! Runs the `staydesk` client against the in-process mock API and offers
//! helpers for inspecting what the server saw.

use std::sync::Arc;
use std::time::Duration;

use staydesk::test_support::{mock_session, MockApi, MockApiBuilder};
use staydesk::{AuthClient, ClientConfig, SessionStore};

pub use staydesk::client::ensure_crypto;

/// A mock API plus one signed-in client.
pub struct Harness {
    pub api: MockApi,
    pub store: Arc<SessionStore>,
    pub client: AuthClient,
}

impl Harness {
    /// Start a default mock API and sign in with its current credentials.
    pub async fn start() -> anyhow::Result<Self> {
        Self::with(MockApi::builder(), Duration::from_secs(5)).await
    }

    /// Start from a configured mock and a refresh timeout.
    pub async fn with(builder: MockApiBuilder, refresh_timeout: Duration) -> anyhow::Result<Self> {
        ensure_crypto();
        let api = builder.start().await?;
        let store = SessionStore::with_session(mock_session(
            &api.valid_access_token(),
            Some(&api.valid_refresh_token()),
        ));
        let config = ClientConfig::new(api.url()).with_refresh_timeout(refresh_timeout);
        let client = AuthClient::new(&config, Arc::clone(&store));
        Ok(Self { api, store, client })
    }

    /// Make the server reject the session's current access credential.
    pub fn expire(&self) {
        self.api.expire_access_token();
    }

    /// How many protected calls carried `Bearer <token>`.
    pub fn calls_with(&self, token: &str) -> usize {
        let expected = format!("Bearer {token}");
        self.api.seen_auth().iter().filter(|h| h.as_deref() == Some(expected.as_str())).count()
    }
}
