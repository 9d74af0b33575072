// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-side session: identity plus the access/refresh credential pair.
//!
//! [`SessionStore`] is the single source of truth for the current session.
//! Clients hold an `Arc` to it, read credentials on every request, and ask it
//! to rotate or clear them. It also owns the per-session refresh gate so that
//! every client sharing a store coalesces onto one in-flight refresh.

pub mod persist;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::api::User;
use crate::refresh::RefreshGate;

/// Who the session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Self { id: user.id, name: user.name, email: user.email, role: user.role }
    }
}

/// A signed-in session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub identity: Identity,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Session {
    /// The session's current credentials.
    pub fn token_pair(&self) -> TokenPair {
        TokenPair {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }

    /// Whether `other` is the same sign-in holding the same refresh credential.
    fn same_grant(&self, other: &Session) -> bool {
        self.identity.id == other.identity.id && self.refresh_token == other.refresh_token
    }
}

/// Credentials a request should carry after a refresh.
///
/// `refresh_token` is `None` only when handing back a session that never had
/// one.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenPair { .. }")
    }
}

/// Partial session update; `None` fields are left as they are.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub identity: Option<Identity>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl SessionUpdate {
    /// Update that rotates both credentials.
    pub fn tokens(pair: &TokenPair) -> Self {
        Self {
            identity: None,
            access_token: Some(pair.access_token.clone()),
            refresh_token: pair.refresh_token.clone(),
        }
    }
}

/// Events emitted by the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    SignedIn { user_id: String },
    /// Credentials were rotated in place.
    Refreshed { user_id: String },
    /// The session was cleared (sign-out or unrecoverable refresh failure).
    Terminated { reason: String },
}

/// Shared handle to the current session.
pub struct SessionStore {
    session: RwLock<Option<Session>>,
    persist_path: Option<PathBuf>,
    event_tx: broadcast::Sender<SessionEvent>,
    gate: RefreshGate,
}

impl SessionStore {
    /// In-memory store with no session.
    pub fn new() -> Arc<Self> {
        Self::build(None, None)
    }

    /// In-memory store seeded with `session`.
    pub fn with_session(session: Session) -> Arc<Self> {
        Self::build(Some(session), None)
    }

    /// Store backed by a JSON file. A missing file means no session.
    pub fn open(path: PathBuf) -> anyhow::Result<Arc<Self>> {
        let session = if path.exists() { Some(persist::load(&path)?) } else { None };
        if session.is_some() {
            debug!(path = %path.display(), "loaded persisted session");
        }
        Ok(Self::build(session, Some(path)))
    }

    fn build(session: Option<Session>, persist_path: Option<PathBuf>) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            session: RwLock::new(session),
            persist_path,
            event_tx,
            gate: RefreshGate::default(),
        })
    }

    /// Current session, if signed in.
    pub fn get(&self) -> Option<Session> {
        self.session.read().clone()
    }

    /// Current access credential, if signed in.
    pub fn access_token(&self) -> Option<String> {
        self.session.read().as_ref().map(|s| s.access_token.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.read().is_some()
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Replace any current session with `session`.
    pub fn sign_in(&self, session: Session) {
        let user_id = session.identity.id.clone();
        {
            let mut slot = self.session.write();
            self.persist(&session);
            *slot = Some(session);
        }
        info!(user = %user_id, "signed in");
        let _ = self.event_tx.send(SessionEvent::SignedIn { user_id });
    }

    /// Merge `update` into the current session.
    ///
    /// Returns `false` (and changes nothing) when there is no session.
    pub fn update(&self, update: SessionUpdate) -> bool {
        self.update_if(|_| true, update)
    }

    /// Merge `update` only if the current session is still the same sign-in
    /// as `expected` (same user, same refresh credential).
    pub fn update_if_current(&self, expected: &Session, update: SessionUpdate) -> bool {
        self.update_if(|s| s.same_grant(expected), update)
    }

    fn update_if(&self, matches: impl FnOnce(&Session) -> bool, update: SessionUpdate) -> bool {
        let user_id = {
            let mut slot = self.session.write();
            let Some(session) = slot.as_mut().filter(|s| matches(s)) else {
                return false;
            };
            if let Some(identity) = update.identity {
                session.identity = identity;
            }
            let rotated = update.access_token.is_some() || update.refresh_token.is_some();
            if let Some(access) = update.access_token {
                session.access_token = access;
            }
            if let Some(refresh) = update.refresh_token {
                session.refresh_token = Some(refresh);
            }
            self.persist(session);
            rotated.then(|| session.identity.id.clone())
        };
        if let Some(user_id) = user_id {
            let _ = self.event_tx.send(SessionEvent::Refreshed { user_id });
        }
        true
    }

    /// Clear the session. No-op (and no event) when already signed out.
    pub fn terminate(&self, reason: &str) {
        self.terminate_if(|_| true, reason);
    }

    /// Clear the session only if it is still the same sign-in as `expected`.
    /// Returns whether it was cleared.
    pub fn terminate_if_current(&self, expected: &Session, reason: &str) -> bool {
        self.terminate_if(|s| s.same_grant(expected), reason)
    }

    fn terminate_if(&self, matches: impl FnOnce(&Session) -> bool, reason: &str) -> bool {
        let previous = {
            let mut slot = self.session.write();
            if !slot.as_ref().is_some_and(matches) {
                return false;
            }
            slot.take()
        };
        let Some(previous) = previous else {
            return false;
        };
        if let Some(ref path) = self.persist_path {
            if let Err(e) = persist::remove(path) {
                warn!(path = %path.display(), err = %e, "failed to remove session file");
            }
        }
        info!(user = %previous.identity.id, reason, "session terminated");
        let _ = self.event_tx.send(SessionEvent::Terminated { reason: reason.to_owned() });
        true
    }

    pub(crate) fn refresh_gate(&self) -> &RefreshGate {
        &self.gate
    }

    fn persist(&self, session: &Session) {
        if let Some(ref path) = self.persist_path {
            if let Err(e) = persist::save(path, session) {
                warn!(path = %path.display(), err = %e, "failed to persist session");
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
