// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `staydesk` subcommands.

use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use crate::api::User;
use crate::auth::{self, AuthService, RegisterRequest};
use crate::client::AuthClient;
use crate::config::{Command, Config};
use crate::session::SessionStore;

/// Run the parsed command. Returns the process exit code.
pub async fn run(config: Config) -> anyhow::Result<i32> {
    let path = config.session_path();
    debug!(path = %path.display(), "opening session");
    let store = SessionStore::open(path)?;
    let client_config = config.client_config();

    let code = match config.command {
        Command::Login { email, password } => {
            let auth = AuthService::new(&client_config);
            match auth::sign_in(&auth, &store, &email, &password).await {
                Ok(identity) => {
                    println!("{}", json!({ "signed_in": true, "user": identity }));
                    0
                }
                Err(e) => {
                    eprintln!("error: {e}");
                    1
                }
            }
        }

        Command::Register { name, email, password, role } => {
            let auth = AuthService::new(&client_config);
            let request = RegisterRequest { name, email, password, role };
            match auth::sign_up(&auth, &store, &request).await {
                Ok((identity, signed_in)) => {
                    println!("{}", json!({ "signed_in": signed_in, "user": identity }));
                    0
                }
                Err(e) => {
                    eprintln!("error: {e}");
                    1
                }
            }
        }

        Command::Whoami => {
            if !store.is_signed_in() {
                eprintln!("error: not signed in");
                return Ok(1);
            }
            let client = AuthClient::new(&client_config, Arc::clone(&store));
            match client.get_json::<Option<User>>("/auth/me").await {
                Ok(resp) => match resp.payload {
                    Some(user) if resp.success => {
                        println!("{}", serde_json::to_string(&user)?);
                        0
                    }
                    _ => {
                        eprintln!("error: {}", resp.message);
                        1
                    }
                },
                Err(e) => {
                    eprintln!("error: {e}");
                    1
                }
            }
        }

        Command::Logout => {
            auth::sign_out(&store);
            println!("{}", json!({ "signed_in": false }));
            0
        }

        Command::Request { method, path, data } => {
            let method: Method = method.to_uppercase().parse()?;
            let body = data.map(|d| serde_json::from_str::<Value>(&d)).transpose()?;
            let client = AuthClient::new(&client_config, Arc::clone(&store));
            match client.request(method, &path, body, None).await {
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await?;
                    println!("{text}");
                    if status.is_success() {
                        0
                    } else {
                        eprintln!("error: HTTP {status}");
                        1
                    }
                }
                Err(e) => {
                    eprintln!("error: {e}");
                    1
                }
            }
        }
    };

    Ok(code)
}
