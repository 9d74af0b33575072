// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";
/// Default bound on a credential refresh, in milliseconds.
pub const DEFAULT_REFRESH_TIMEOUT_MS: u64 = 10_000;
/// Default bound on an ordinary request, in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Command-line client for the Staydesk hotel API.
#[derive(Debug, Parser)]
#[command(name = "staydesk", version, about)]
pub struct Config {
    /// API base URL.
    #[arg(long, env = "STAYDESK_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Session file (default: $STAYDESK_STATE_DIR/session.json).
    #[arg(long, env = "STAYDESK_SESSION_FILE")]
    pub session_file: Option<PathBuf>,

    /// Credential refresh timeout in ms.
    #[arg(long, env = "STAYDESK_REFRESH_TIMEOUT_MS")]
    pub refresh_timeout_ms: Option<u64>,

    /// Request timeout in ms.
    #[arg(long, env = "STAYDESK_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,

    /// Log format (json or text).
    #[arg(long, env = "STAYDESK_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "STAYDESK_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "STAYDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "STAYDESK_PASSWORD", hide_env_values = true)]
        password: String,
        /// CUSTOMER, TRAVEL_COMPANY, CLERK or MANAGER
        #[arg(long, default_value = "CUSTOMER")]
        role: String,
    },
    /// Show the signed-in user
    Whoami,
    /// Sign out and forget the session
    Logout,
    /// Send an authenticated request and print the response body
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: String,
        /// Path relative to the API URL, e.g. /reservations
        path: String,
        /// JSON request body
        #[arg(long)]
        data: Option<String>,
    },
}

macro_rules! duration_field {
    ($method:ident, $field:ident, $default:expr) => {
        pub fn $method(&self) -> Duration {
            Duration::from_millis(self.$field.unwrap_or($default))
        }
    };
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!("--api-url must be an http:// or https:// URL");
        }
        if self.refresh_timeout_ms == Some(0) {
            anyhow::bail!("--refresh-timeout-ms must be greater than zero");
        }
        if self.request_timeout_ms == Some(0) {
            anyhow::bail!("--request-timeout-ms must be greater than zero");
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        if let Command::Request { ref method, ref data, .. } = self.command {
            method.to_uppercase().parse::<reqwest::Method>()?;
            if let Some(data) = data {
                serde_json::from_str::<serde_json::Value>(data)
                    .map_err(|e| anyhow::anyhow!("--data is not valid JSON: {e}"))?;
            }
        }
        Ok(())
    }

    duration_field!(refresh_timeout, refresh_timeout_ms, DEFAULT_REFRESH_TIMEOUT_MS);
    duration_field!(request_timeout, request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);

    /// Where the session is persisted.
    pub fn session_path(&self) -> PathBuf {
        match self.session_file {
            Some(ref path) => path.clone(),
            None => state_dir().join("session.json"),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_url: self.api_url.clone(),
            request_timeout: self.request_timeout(),
            refresh_timeout: self.refresh_timeout(),
        }
    }
}

/// Resolve the state directory for client data.
///
/// Checks `STAYDESK_STATE_DIR`, then `$XDG_STATE_HOME/staydesk`,
/// then `$HOME/.local/state/staydesk`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("STAYDESK_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("staydesk");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local/state/staydesk");
    }
    PathBuf::from(".staydesk")
}

/// Settings for [`crate::client::AuthClient`], independent of the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub request_timeout: Duration,
    pub refresh_timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            refresh_timeout: Duration::from_millis(DEFAULT_REFRESH_TIMEOUT_MS),
        }
    }

    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
