// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: an in-process mock of the hotel REST API.
//!
//! The mock keeps one valid access/refresh pair. Protected routes (anything
//! outside `/auth/*`) answer 401 unless the bearer matches the valid access
//! token. `/auth/refresh` rotates the pair, either statefully or from a
//! scripted list of responses. Authenticated requests are echoed back unless
//! a fixture payload is registered for their method and target.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::api::User;
use crate::session::{Identity, Session};

/// Default login email accepted by the mock.
pub const MOCK_EMAIL: &str = "ada@example.com";
/// Default login password accepted by the mock.
pub const MOCK_PASSWORD: &str = "hunter2";

/// The user the mock signs in.
pub fn mock_user() -> User {
    User {
        id: "u-1".to_owned(),
        name: "Ada Lovelace".to_owned(),
        email: MOCK_EMAIL.to_owned(),
        role: "CUSTOMER".to_owned(),
        created_at: Some("2025-01-01T00:00:00Z".to_owned()),
        updated_at: None,
    }
}

/// Session for [`mock_user`] with the given credentials.
pub fn mock_session(access: &str, refresh: Option<&str>) -> Session {
    Session {
        identity: Identity::from(mock_user()),
        access_token: access.to_owned(),
        refresh_token: refresh.map(str::to_owned),
    }
}

/// Envelope body for a successful `/auth/refresh`.
pub fn refresh_success_body(access: &str, refresh: &str) -> String {
    json!({
        "success": true,
        "message": "Token refreshed",
        "payload": { "access_token": access, "refresh_token": refresh }
    })
    .to_string()
}

/// Envelope body for a failed call.
pub fn failure_body(message: &str) -> String {
    json!({ "success": false, "message": message, "payload": null }).to_string()
}

/// Builder for [`MockApi`].
pub struct MockApiBuilder {
    access_token: String,
    refresh_token: String,
    refresh_script: Vec<(u16, String)>,
    refresh_delay: Duration,
    always_unauthorized: bool,
    fixtures: HashMap<(String, String), (u16, Value)>,
}

impl Default for MockApiBuilder {
    fn default() -> Self {
        Self {
            access_token: "access-0".to_owned(),
            refresh_token: "refresh-0".to_owned(),
            refresh_script: Vec::new(),
            refresh_delay: Duration::ZERO,
            always_unauthorized: false,
            fixtures: HashMap::new(),
        }
    }
}

impl MockApiBuilder {
    /// Credentials the server currently accepts.
    pub fn tokens(mut self, access: &str, refresh: &str) -> Self {
        self.access_token = access.to_owned();
        self.refresh_token = refresh.to_owned();
        self
    }

    /// Scripted `(status, body)` responses for `/auth/refresh`, in call order.
    /// The last entry repeats once the script runs out.
    pub fn refresh_responses(mut self, responses: Vec<(u16, String)>) -> Self {
        self.refresh_script = responses;
        self
    }

    /// Delay before `/auth/refresh` answers.
    pub fn refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    /// Protected routes answer 401 regardless of the bearer.
    pub fn always_unauthorized(mut self) -> Self {
        self.always_unauthorized = true;
        self
    }

    /// Answer authenticated `method target` with a success envelope around
    /// `payload`. `target` is the path, optionally with its query string.
    pub fn respond(self, method: &str, target: &str, payload: Value) -> Self {
        self.respond_with(method, target, 200, payload)
    }

    /// Like [`Self::respond`], with an explicit status. Non-2xx statuses wrap
    /// `payload` in a failure envelope.
    pub fn respond_with(
        mut self,
        method: &str,
        target: &str,
        status: u16,
        payload: Value,
    ) -> Self {
        self.fixtures.insert((method.to_uppercase(), target.to_owned()), (status, payload));
        self
    }

    /// Bind to an ephemeral port and serve in the background.
    pub async fn start(self) -> anyhow::Result<MockApi> {
        crate::client::ensure_crypto();
        let state = Arc::new(MockState {
            tokens: Mutex::new((self.access_token, self.refresh_token)),
            refresh_script: self.refresh_script,
            refresh_delay: self.refresh_delay,
            always_unauthorized: self.always_unauthorized,
            fixtures: self.fixtures,
            requests: Mutex::new(Vec::new()),
            refresh_calls: AtomicU32::new(0),
            protected_calls: AtomicU32::new(0),
            issued: AtomicU32::new(0),
            seen_auth: Mutex::new(Vec::new()),
            registered: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/auth/refresh", post(refresh))
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route("/auth/me", get(me))
            .fallback(protected)
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(MockApi { addr, state })
    }
}

/// Handle to a running mock API.
pub struct MockApi {
    addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockApi {
    pub fn builder() -> MockApiBuilder {
        MockApiBuilder::default()
    }

    /// Start with default tokens (`access-0` / `refresh-0`).
    pub async fn start() -> anyhow::Result<Self> {
        Self::builder().start().await
    }

    /// Base URL, e.g. `http://127.0.0.1:41234`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of `/auth/refresh` calls received.
    pub fn refresh_calls(&self) -> u32 {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    /// Number of protected-route calls received.
    pub fn protected_calls(&self) -> u32 {
        self.state.protected_calls.load(Ordering::SeqCst)
    }

    /// `Authorization` headers seen on protected routes, in arrival order.
    pub fn seen_auth(&self) -> Vec<Option<String>> {
        self.state.seen_auth.lock().clone()
    }

    pub fn valid_access_token(&self) -> String {
        self.state.tokens.lock().0.clone()
    }

    pub fn valid_refresh_token(&self) -> String {
        self.state.tokens.lock().1.clone()
    }

    /// Invalidate the current access token (the refresh token stays valid).
    pub fn expire_access_token(&self) {
        let mut tokens = self.state.tokens.lock();
        tokens.0 = format!("{}-expired", tokens.0);
    }

    /// Authenticated data-route requests as `(method, target, body)`.
    pub fn requests(&self) -> Vec<(String, String, Value)> {
        self.state.requests.lock().clone()
    }

    /// Emails registered through `/auth/register`.
    pub fn registered(&self) -> Vec<String> {
        self.state.registered.lock().clone()
    }
}

struct MockState {
    /// Currently valid (access, refresh).
    tokens: Mutex<(String, String)>,
    refresh_script: Vec<(u16, String)>,
    refresh_delay: Duration,
    always_unauthorized: bool,
    fixtures: HashMap<(String, String), (u16, Value)>,
    requests: Mutex<Vec<(String, String, Value)>>,
    refresh_calls: AtomicU32,
    protected_calls: AtomicU32,
    issued: AtomicU32,
    seen_auth: Mutex<Vec<Option<String>>>,
    registered: Mutex<Vec<String>>,
}

impl MockState {
    fn issue(&self) -> (String, String) {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let pair = (format!("access-{n}"), format!("refresh-{n}"));
        *self.tokens.lock() = pair.clone();
        pair
    }

    fn is_valid_access(&self, headers: &HeaderMap) -> bool {
        bearer(headers).is_some_and(|t| t == self.tokens.lock().0)
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

fn reply(status: u16, body: String) -> Response {
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

fn auth_payload_body(user: &User, access: &str, refresh: &str) -> String {
    json!({
        "success": true,
        "message": "Authenticated",
        "payload": { "token": access, "refreshToken": refresh, "user": user }
    })
    .to_string()
}

async fn refresh(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let idx = state.refresh_calls.fetch_add(1, Ordering::SeqCst) as usize;
    if !state.refresh_delay.is_zero() {
        tokio::time::sleep(state.refresh_delay).await;
    }

    if !state.refresh_script.is_empty() {
        let (status, body) = state
            .refresh_script
            .get(idx)
            .or_else(|| state.refresh_script.last())
            .cloned()
            .unwrap_or((500, String::new()));
        if status == 200 {
            let parsed: Option<Value> = serde_json::from_str(&body).ok();
            let payload = parsed.as_ref().map(|v| &v["payload"]);
            if let Some(access) = payload.and_then(|p| p["access_token"].as_str()) {
                let mut tokens = state.tokens.lock();
                tokens.0 = access.to_owned();
                if let Some(refresh) = payload.and_then(|p| p["refresh_token"].as_str()) {
                    tokens.1 = refresh.to_owned();
                }
            }
        }
        return reply(status, body);
    }

    let presented = body["refresh_token"].as_str().unwrap_or_default().to_owned();
    if presented.is_empty() || presented != state.tokens.lock().1 {
        return reply(401, failure_body("Invalid refresh token"));
    }
    let (access, refresh) = state.issue();
    reply(200, refresh_success_body(&access, &refresh))
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    if email != MOCK_EMAIL || password != MOCK_PASSWORD {
        return reply(401, failure_body("Invalid credentials"));
    }
    let (access, refresh) = state.issue();
    reply(200, auth_payload_body(&mock_user(), &access, &refresh))
}

async fn register(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_owned();
    if email == MOCK_EMAIL || state.registered.lock().contains(&email) {
        return reply(409, failure_body("Email already registered"));
    }
    let user = User {
        id: format!("u-{}", state.registered.lock().len() + 2),
        name: body["name"].as_str().unwrap_or_default().to_owned(),
        email: email.clone(),
        role: body["role"].as_str().unwrap_or("CUSTOMER").to_owned(),
        created_at: None,
        updated_at: None,
    };
    state.registered.lock().push(email);
    let (access, refresh) = state.issue();
    reply(201, auth_payload_body(&user, &access, &refresh))
}

async fn me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !state.is_valid_access(&headers) {
        return reply(401, failure_body("Unauthorized"));
    }
    let body = json!({ "success": true, "message": "ok", "payload": mock_user() });
    reply(200, body.to_string())
}

/// Any route outside `/auth/*`: echoes the request when the bearer is valid.
///
/// `/status/{code}` answers with that status after authentication passes.
async fn protected(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    state.protected_calls.fetch_add(1, Ordering::SeqCst);
    state.seen_auth.lock().push(
        headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_owned),
    );

    if state.always_unauthorized || !state.is_valid_access(&headers) {
        return reply(401, failure_body("Unauthorized"));
    }

    let path = uri.path().to_owned();
    if let Some(code) = path.strip_prefix("/status/").and_then(|c| c.parse::<u16>().ok()) {
        return reply(code, failure_body("scripted status"));
    }

    let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let target = uri.path_and_query().map_or(path.clone(), |pq| pq.as_str().to_owned());
    state.requests.lock().push((method.to_string(), target.clone(), body.clone()));

    let fixture = state
        .fixtures
        .get(&(method.to_string(), target))
        .or_else(|| state.fixtures.get(&(method.to_string(), path.clone())));
    if let Some((status, payload)) = fixture {
        let envelope = if (200..300).contains(status) {
            json!({ "success": true, "message": "ok", "payload": payload })
        } else {
            json!({ "success": false, "message": "fixture error", "payload": payload })
        };
        return reply(*status, envelope.to_string());
    }

    let echo = json!({
        "success": true,
        "message": "ok",
        "payload": { "method": method.as_str(), "path": path, "body": body }
    });
    reply(200, echo.to_string())
}

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
