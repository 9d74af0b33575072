// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod api;
pub mod auth;
pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod hotel;
pub mod refresh;
pub mod session;
pub mod test_support;

pub use client::{AuthClient, PendingRequest};
pub use config::ClientConfig;
pub use error::{AuthError, ClientError};
pub use hotel::HotelApi;
pub use session::{Session, SessionStore, SessionUpdate};
