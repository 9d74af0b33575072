// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end credential refresh scenarios: a client, its session store, and
//! the mock API, with the server's view checked after each exchange.

use std::time::Duration;

use reqwest::{Method, StatusCode};

use staydesk::session::SessionEvent;
use staydesk::test_support::{failure_body, refresh_success_body, MockApi};
use staydesk::{AuthError, ClientError};
use staydesk_specs::Harness;

// -- Single request ------------------------------------------------------------

#[tokio::test]
async fn single_401_then_successful_refresh() -> anyhow::Result<()> {
    let h = Harness::start().await?;
    h.expire();

    let resp = h.client.request(Method::GET, "/reservations", None, None).await?;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(h.api.refresh_calls(), 1);
    assert_eq!(h.api.protected_calls(), 2);
    assert_eq!(h.store.access_token(), Some(h.api.valid_access_token()));
    Ok(())
}

#[tokio::test]
async fn single_401_then_failed_refresh() -> anyhow::Result<()> {
    let builder = MockApi::builder().refresh_responses(vec![(500, failure_body("down"))]);
    let h = Harness::with(builder, Duration::from_secs(5)).await?;
    let mut events = h.store.subscribe();
    h.expire();

    let result = h.client.request(Method::GET, "/rooms", None, None).await;

    match result {
        Err(ClientError::Unauthorized { cause, body }) => {
            assert_eq!(cause, AuthError::RefreshFailed);
            assert!(body.contains("Unauthorized"), "original 401 body: {body}");
        }
        other => anyhow::bail!("expected Unauthorized, got {other:?}"),
    }
    assert_eq!(h.api.protected_calls(), 1);
    assert!(!h.store.is_signed_in());
    assert!(matches!(events.try_recv(), Ok(SessionEvent::Terminated { .. })));
    Ok(())
}

#[tokio::test]
async fn retried_request_is_never_retried_again() -> anyhow::Result<()> {
    let h = Harness::with(MockApi::builder().always_unauthorized(), Duration::from_secs(5)).await?;

    let result = h.client.request(Method::GET, "/reports/revenue", None, None).await;

    assert_eq!(result.err().and_then(|e| e.auth_cause()), Some(AuthError::RetryExhausted));
    assert_eq!(h.api.refresh_calls(), 1);
    assert_eq!(h.api.protected_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn rotated_pair_is_used_by_retry_and_later_requests() -> anyhow::Result<()> {
    let builder =
        MockApi::builder().refresh_responses(vec![(200, refresh_success_body("A2", "R2"))]);
    let h = Harness::with(builder, Duration::from_secs(5)).await?;
    h.expire();

    h.client.request(Method::GET, "/reservations", None, None).await?;
    h.client.request(Method::GET, "/billing", None, None).await?;

    assert_eq!(h.calls_with("A2"), 2);
    let session = h.store.get().ok_or_else(|| anyhow::anyhow!("session cleared"))?;
    assert_eq!(session.access_token, "A2");
    assert_eq!(session.refresh_token.as_deref(), Some("R2"));
    assert_eq!(h.api.refresh_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn hung_refresh_is_bounded_by_timeout() -> anyhow::Result<()> {
    let builder = MockApi::builder().refresh_delay(Duration::from_secs(10));
    let h = Harness::with(builder, Duration::from_millis(200)).await?;
    h.expire();

    let started = tokio::time::Instant::now();
    let result = h.client.request(Method::GET, "/rooms", None, None).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(result.err().and_then(|e| e.auth_cause()), Some(AuthError::RefreshFailed));
    assert!(!h.store.is_signed_in());
    Ok(())
}

// -- Concurrency ---------------------------------------------------------------

#[tokio::test]
async fn two_concurrent_401s_share_one_refresh() -> anyhow::Result<()> {
    let builder = MockApi::builder().refresh_delay(Duration::from_millis(100));
    let h = Harness::with(builder, Duration::from_secs(5)).await?;
    h.expire();

    let (a, b) = tokio::join!(
        h.client.request(Method::GET, "/rooms", None, None),
        h.client.request(Method::GET, "/reservations", None, None),
    );

    assert_eq!(a?.status(), StatusCode::OK);
    assert_eq!(b?.status(), StatusCode::OK);
    assert_eq!(h.api.refresh_calls(), 1);
    assert_eq!(h.calls_with(&h.api.valid_access_token()), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_401s_share_one_refresh() -> anyhow::Result<()> {
    let builder = MockApi::builder().refresh_delay(Duration::from_millis(100));
    let h = Harness::with(builder, Duration::from_secs(5)).await?;
    h.expire();

    let handles: Vec<_> = (0..25)
        .map(|i| {
            let client = h.client.clone();
            tokio::spawn(async move {
                client.request(Method::GET, &format!("/rooms/{i}"), None, None).await
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await??.status(), StatusCode::OK);
    }

    assert_eq!(h.api.refresh_calls(), 1);
    assert_eq!(h.store.access_token(), Some(h.api.valid_access_token()));
    Ok(())
}

#[tokio::test]
async fn concurrent_401s_with_failed_refresh_all_fail_once() -> anyhow::Result<()> {
    let builder = MockApi::builder()
        .refresh_delay(Duration::from_millis(100))
        .refresh_responses(vec![(401, failure_body("revoked"))]);
    let h = Harness::with(builder, Duration::from_secs(5)).await?;
    h.expire();

    let results = futures_util::future::join_all(
        (0..5).map(|_| h.client.request(Method::GET, "/rooms", None, None)),
    )
    .await;

    for result in results {
        assert_eq!(result.err().and_then(|e| e.auth_cause()), Some(AuthError::RefreshFailed));
    }
    assert_eq!(h.api.refresh_calls(), 1);
    assert!(!h.store.is_signed_in());
    Ok(())
}
