// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use reqwest::StatusCode;

/// Why an authenticated request could not be recovered after a 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No session credential was used (signed out, or the caller supplied
    /// its own `Authorization`), so no refresh was tried.
    Unauthenticated,
    /// The refresh endpoint failed, timed out, or returned a malformed body.
    RefreshFailed,
    /// The session holds no refresh credential.
    MissingCredential,
    /// The request was already retried once and still got a 401.
    RetryExhausted,
}

impl AuthError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::RefreshFailed => "REFRESH_FAILED",
            Self::MissingCredential => "MISSING_CREDENTIAL",
            Self::RetryExhausted => "RETRY_EXHAUSTED",
        }
    }

    /// Whether this failure ends the session (caller should send the user to sign-in).
    pub fn terminates_session(&self) -> bool {
        matches!(self, Self::RefreshFailed | Self::MissingCredential)
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for AuthError {}

/// Errors surfaced by [`crate::client::AuthClient`].
#[derive(Debug)]
pub enum ClientError {
    /// No response was received (connect, timeout, body read).
    Network(reqwest::Error),
    /// The API answered 401 and the client could not recover.
    ///
    /// `body` is the body of the 401 the caller would have seen without the
    /// interceptor; `cause` says why no (further) retry happened.
    Unauthorized { cause: AuthError, body: String },
    /// Non-success status from one of the typed JSON helpers.
    Status { status: StatusCode, body: String },
    /// Response body did not match the expected envelope.
    Decode(String),
    /// Request could not be built (bad header value, unserializable body).
    InvalidRequest(String),
}

impl ClientError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network(_) => "NETWORK",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::Status { .. } => "STATUS",
            Self::Decode(_) => "DECODE",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }

    /// HTTP status associated with the failure, if a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Network(e) => e.status(),
            Self::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            Self::Status { status, .. } => Some(*status),
            Self::Decode(_) | Self::InvalidRequest(_) => None,
        }
    }

    /// The authentication cause, for `Unauthorized` errors.
    pub fn auth_cause(&self) -> Option<AuthError> {
        match self {
            Self::Unauthorized { cause, .. } => Some(*cause),
            _ => None,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(e) => write!(f, "network error: {e}"),
            Self::Unauthorized { cause, body } if body.is_empty() => {
                write!(f, "401 Unauthorized ({cause})")
            }
            Self::Unauthorized { cause, body } => write!(f, "401 Unauthorized ({cause}): {body}"),
            Self::Status { status, body } => write!(f, "HTTP {status}: {body}"),
            Self::Decode(msg) => write!(f, "decode error: {msg}"),
            Self::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Network(e) => Some(e),
            Self::Unauthorized { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
