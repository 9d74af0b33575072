// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use super::*;
use crate::client::http_client;
use crate::session::SessionEvent;
use crate::test_support::{failure_body, mock_session, refresh_success_body, MockApi};

fn refresher(api: &MockApi, store: &Arc<SessionStore>) -> CredentialRefresher {
    CredentialRefresher::new(
        http_client(Duration::from_secs(30)),
        &api.url(),
        Arc::clone(store),
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn refresh_rotates_session_in_place() -> anyhow::Result<()> {
    let api = MockApi::start().await?;
    let store = SessionStore::with_session(mock_session("stale", Some("refresh-0")));
    let mut rx = store.subscribe();

    let pair = refresher(&api, &store).refresh().await?;

    assert_eq!(pair.access_token, "access-1");
    assert_eq!(pair.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(api.refresh_calls(), 1);
    let session = store.get().ok_or_else(|| anyhow::anyhow!("session cleared"))?;
    assert_eq!(session.access_token, "access-1");
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-1"));
    assert_eq!(rx.try_recv().ok(), Some(SessionEvent::Refreshed { user_id: "u-1".to_owned() }));
    Ok(())
}

#[tokio::test]
async fn missing_refresh_credential_signs_out_without_calling_endpoint() -> anyhow::Result<()> {
    let api = MockApi::start().await?;
    let store = SessionStore::with_session(mock_session("stale", None));
    let mut rx = store.subscribe();

    let result = refresher(&api, &store).refresh().await;

    assert_eq!(result, Err(AuthError::MissingCredential));
    assert_eq!(api.refresh_calls(), 0);
    assert!(!store.is_signed_in());
    assert_eq!(
        rx.try_recv().ok(),
        Some(SessionEvent::Terminated { reason: "missing refresh credential".to_owned() })
    );
    Ok(())
}

#[tokio::test]
async fn missing_session_is_a_missing_credential() -> anyhow::Result<()> {
    let api = MockApi::start().await?;
    let store = SessionStore::new();
    let result = refresher(&api, &store).refresh().await;
    assert_eq!(result, Err(AuthError::MissingCredential));
    assert_eq!(api.refresh_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn rejected_refresh_signs_out() -> anyhow::Result<()> {
    let api = MockApi::start().await?;
    let store = SessionStore::with_session(mock_session("stale", Some("revoked")));

    let result = refresher(&api, &store).refresh().await;

    assert_eq!(result, Err(AuthError::RefreshFailed));
    assert_eq!(api.refresh_calls(), 1);
    assert!(!store.is_signed_in());
    Ok(())
}

#[tokio::test]
async fn malformed_or_failed_responses_are_refresh_failed() -> anyhow::Result<()> {
    let cases: Vec<(&str, u16, String)> = vec![
        ("server_error", 500, failure_body("boom")),
        ("not_json", 200, "<html>gateway</html>".to_owned()),
        ("success_false", 200, r#"{"success":false,"message":"nope","payload":null}"#.to_owned()),
        (
            "legacy_token_field",
            200,
            r#"{"success":true,"message":"ok","payload":{"token":"a2","refresh_token":"r2"}}"#
                .to_owned(),
        ),
        ("empty_access_token", 200, refresh_success_body("", "r2")),
    ];

    for (name, status, body) in cases {
        let api = MockApi::builder().refresh_responses(vec![(status, body)]).start().await?;
        let store = SessionStore::with_session(mock_session("stale", Some("refresh-0")));

        let result = refresher(&api, &store).refresh().await;

        assert_eq!(result, Err(AuthError::RefreshFailed), "case {name}");
        assert!(!store.is_signed_in(), "case {name}: session should be terminated");
    }
    Ok(())
}

#[tokio::test]
async fn missing_rotated_refresh_token_keeps_current_one() -> anyhow::Result<()> {
    let body = r#"{"success":true,"message":"ok","payload":{"access_token":"a2"}}"#.to_owned();
    let api = MockApi::builder().refresh_responses(vec![(200, body)]).start().await?;
    let store = SessionStore::with_session(mock_session("stale", Some("keep-me")));

    let pair = refresher(&api, &store).refresh().await?;

    assert_eq!(pair.access_token, "a2");
    assert_eq!(pair.refresh_token.as_deref(), Some("keep-me"));
    assert_eq!(store.get().and_then(|s| s.refresh_token).as_deref(), Some("keep-me"));
    Ok(())
}

#[tokio::test]
async fn unreachable_endpoint_is_refresh_failed() -> anyhow::Result<()> {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        listener.local_addr()?.port()
    };
    let store = SessionStore::with_session(mock_session("stale", Some("refresh-0")));
    let refresher = CredentialRefresher::new(
        http_client(Duration::from_secs(30)),
        &format!("http://127.0.0.1:{port}"),
        Arc::clone(&store),
        Duration::from_secs(5),
    );

    assert_eq!(refresher.refresh().await, Err(AuthError::RefreshFailed));
    assert!(!store.is_signed_in());
    Ok(())
}

#[tokio::test]
async fn hung_refresh_times_out_and_fails_all_waiters() -> anyhow::Result<()> {
    let api = MockApi::builder().refresh_delay(Duration::from_secs(5)).start().await?;
    let store = SessionStore::with_session(mock_session("stale", Some("refresh-0")));
    let refresher = CredentialRefresher::new(
        http_client(Duration::from_secs(30)),
        &api.url(),
        Arc::clone(&store),
        Duration::from_millis(100),
    );

    let (a, b) = tokio::join!(
        refresher.refresh_after(Some("stale")),
        refresher.refresh_after(Some("stale")),
    );

    assert_eq!(a, Err(AuthError::RefreshFailed));
    assert_eq!(b, Err(AuthError::RefreshFailed));
    assert_eq!(api.refresh_calls(), 1);
    assert!(!store.is_signed_in());
    Ok(())
}

#[tokio::test]
async fn concurrent_callers_share_one_refresh() -> anyhow::Result<()> {
    let api = MockApi::builder().refresh_delay(Duration::from_millis(100)).start().await?;
    let store = SessionStore::with_session(mock_session("stale", Some("refresh-0")));
    let refresher = refresher(&api, &store);

    let outcomes = futures_util::future::join_all(
        (0..8).map(|_| refresher.refresh_after(Some("stale"))).collect::<Vec<_>>(),
    )
    .await;

    assert_eq!(api.refresh_calls(), 1);
    for outcome in outcomes {
        assert_eq!(outcome.map(|p| p.access_token), Ok("access-1".to_owned()));
    }
    assert!(!store.refresh_gate().in_flight());
    Ok(())
}

#[tokio::test]
async fn rotated_credential_skips_refresh() -> anyhow::Result<()> {
    let api = MockApi::start().await?;
    let store = SessionStore::with_session(mock_session("access-9", Some("refresh-9")));

    // The failing request carried a credential the session has since replaced.
    let pair = refresher(&api, &store).refresh_after(Some("access-8")).await?;

    assert_eq!(pair.access_token, "access-9");
    assert_eq!(pair.refresh_token.as_deref(), Some("refresh-9"));
    assert_eq!(api.refresh_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn sequential_failures_refresh_again() -> anyhow::Result<()> {
    let api = MockApi::start().await?;
    let store = SessionStore::with_session(mock_session("stale", Some("refresh-0")));
    let refresher = refresher(&api, &store);

    let first = refresher.refresh_after(Some("stale")).await?;
    let second = refresher.refresh_after(Some(&first.access_token)).await?;

    assert_eq!(api.refresh_calls(), 2);
    assert_eq!(second.access_token, "access-2");
    assert_eq!(store.access_token().as_deref(), Some("access-2"));
    Ok(())
}

#[tokio::test]
async fn refresh_url_tolerates_trailing_slash() -> anyhow::Result<()> {
    let api = MockApi::start().await?;
    let store = SessionStore::with_session(mock_session("stale", Some("refresh-0")));
    let refresher = CredentialRefresher::new(
        http_client(Duration::from_secs(30)),
        &format!("{}/", api.url()),
        Arc::clone(&store),
        Duration::from_secs(5),
    );
    refresher.refresh().await?;
    assert_eq!(api.refresh_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn newer_session_without_refresh_credential_is_used_as_is() -> anyhow::Result<()> {
    let api = MockApi::start().await?;
    let store = SessionStore::with_session(mock_session("access-new", None));
    let mut rx = store.subscribe();

    // A late 401 for a credential from before the current sign-in.
    let pair = refresher(&api, &store).refresh_after(Some("access-old")).await?;

    assert_eq!(pair.access_token, "access-new");
    assert_eq!(pair.refresh_token, None);
    assert_eq!(api.refresh_calls(), 0);
    assert_eq!(store.access_token().as_deref(), Some("access-new"));
    assert!(rx.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn session_replaced_mid_refresh_is_not_overwritten() -> anyhow::Result<()> {
    let api = MockApi::builder().refresh_delay(Duration::from_millis(200)).start().await?;
    let store = SessionStore::with_session(mock_session("stale", Some("refresh-0")));
    let refresher = refresher(&api, &store);

    let pending = tokio::spawn({
        let refresher = refresher.clone();
        async move { refresher.refresh_after(Some("stale")).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    store.sign_in(mock_session("fresh", Some("refresh-fresh")));

    let pair = pending.await??;

    assert_eq!(api.refresh_calls(), 1);
    assert_eq!(pair.access_token, "fresh");
    let session = store.get().ok_or_else(|| anyhow::anyhow!("session cleared"))?;
    assert_eq!(session.access_token, "fresh");
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-fresh"));
    Ok(())
}

#[tokio::test]
async fn failed_refresh_keeps_replacement_session() -> anyhow::Result<()> {
    let api = MockApi::builder()
        .refresh_responses(vec![(401, failure_body("Invalid refresh token"))])
        .refresh_delay(Duration::from_millis(200))
        .start()
        .await?;
    let store = SessionStore::with_session(mock_session("stale", Some("refresh-0")));
    let refresher = refresher(&api, &store);

    let pending = tokio::spawn({
        let refresher = refresher.clone();
        async move { refresher.refresh_after(Some("stale")).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    store.sign_in(mock_session("fresh", None));

    let outcome = pending.await?;

    assert_eq!(outcome.map(|p| p.access_token), Ok("fresh".to_owned()));
    assert_eq!(store.access_token().as_deref(), Some("fresh"));
    Ok(())
}

#[tokio::test]
async fn session_cleared_mid_refresh_stays_signed_out() -> anyhow::Result<()> {
    let api = MockApi::builder().refresh_delay(Duration::from_millis(200)).start().await?;
    let store = SessionStore::with_session(mock_session("stale", Some("refresh-0")));
    let refresher = refresher(&api, &store);

    let pending = tokio::spawn({
        let refresher = refresher.clone();
        async move { refresher.refresh_after(Some("stale")).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    store.terminate("sign-out");

    assert_eq!(pending.await?, Err(AuthError::RefreshFailed));
    assert!(!store.is_signed_in());
    Ok(())
}
