mod common;

use std::sync::Arc;

use chrono::TimeDelta;
use tonic::{Code, Request};

use common::{CountingHandler, PROTECTED_METHOD, bearer_request, from_peer, test_config, test_state};
use schoolrpc::middleware::timing::RESPONSE_TIME_KEY;
use schoolrpc::rate_limiter::RateLimiter;
use schoolrpc_auth::Role;
use schoolrpc_config::{AppConfig, RateLimitConfig, RateLimitScope};
use schoolrpc_core::ManualClock;

fn limited_config(threshold: u32, window_seconds: u64, scope: RateLimitScope) -> AppConfig {
    AppConfig {
        rate_limit: RateLimitConfig {
            enabled: true,
            threshold,
            window_seconds,
            scope,
        },
        ..test_config()
    }
}

#[tokio::test]
async fn test_threshold_then_resource_exhausted() {
    let (state, _clock) = test_state(limited_config(3, 60, RateLimitScope::Peer));
    let handler = CountingHandler::new();
    let token = state.codec.issue_default("1", "jdoe", Role::User).unwrap();
    let pipeline = state.pipeline();

    for _ in 0..3 {
        let request = from_peer(bearer_request(&token), "10.0.0.1");
        pipeline
            .run(PROTECTED_METHOD, request, handler.service())
            .await
            .unwrap();
    }

    let request = from_peer(bearer_request(&token), "10.0.0.1");
    let status = pipeline
        .run(PROTECTED_METHOD, request, handler.service())
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::ResourceExhausted);
    assert_eq!(handler.count(), 3);
    assert!(status.metadata().get(RESPONSE_TIME_KEY).is_none());
}

#[tokio::test]
async fn test_window_resets_after_elapsed() {
    let (state, clock) = test_state(limited_config(2, 60, RateLimitScope::Peer));
    let handler = CountingHandler::new();
    let pipeline = state.pipeline();
    let login = "/school.ExecsService/Login";

    for _ in 0..2 {
        let request = from_peer(Request::new(()), "10.0.0.1");
        assert!(pipeline.run(login, request, handler.service()).await.is_ok());
    }
    let request = from_peer(Request::new(()), "10.0.0.1");
    assert!(pipeline.run(login, request, handler.service()).await.is_err());

    clock.advance(TimeDelta::seconds(60));

    let request = from_peer(Request::new(()), "10.0.0.1");
    assert!(pipeline.run(login, request, handler.service()).await.is_ok());
    assert_eq!(handler.count(), 3);
}

#[tokio::test]
async fn test_rate_limit_runs_before_auth() {
    let (state, _clock) = test_state(limited_config(1, 60, RateLimitScope::Global));
    let handler = CountingHandler::new();
    let pipeline = state.pipeline();

    // An unauthenticated call still spends the budget.
    let status = pipeline
        .run(PROTECTED_METHOD, Request::new(()), handler.service())
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);

    let token = state.codec.issue_default("1", "jdoe", Role::User).unwrap();
    let status = pipeline
        .run(PROTECTED_METHOD, bearer_request(&token), handler.service())
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::ResourceExhausted);
    assert_eq!(handler.count(), 0);
}

#[tokio::test]
async fn test_peer_scope_separates_callers() {
    let (state, _clock) = test_state(limited_config(1, 60, RateLimitScope::Peer));
    let handler = CountingHandler::new();
    let pipeline = state.pipeline();
    let login = "/school.ExecsService/Login";

    let first = from_peer(Request::new(()), "10.0.0.1");
    let second = from_peer(Request::new(()), "10.0.0.2");
    assert!(pipeline.run(login, first, handler.service()).await.is_ok());
    assert!(pipeline.run(login, second, handler.service()).await.is_ok());

    let again = from_peer(Request::new(()), "10.0.0.1");
    assert!(pipeline.run(login, again, handler.service()).await.is_err());
}

#[tokio::test]
async fn test_global_scope_shares_one_budget() {
    let (state, _clock) = test_state(limited_config(1, 60, RateLimitScope::Global));
    let handler = CountingHandler::new();
    let pipeline = state.pipeline();
    let login = "/school.ExecsService/Login";

    let first = from_peer(Request::new(()), "10.0.0.1");
    let second = from_peer(Request::new(()), "10.0.0.2");
    assert!(pipeline.run(login, first, handler.service()).await.is_ok());

    let status = pipeline
        .run(login, second, handler.service())
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::ResourceExhausted);
}

#[tokio::test]
async fn test_disabled_rate_limit_passes_everything() {
    let mut config = limited_config(1, 60, RateLimitScope::Global);
    config.rate_limit.enabled = false;
    let (state, _clock) = test_state(config);
    let handler = CountingHandler::new();
    let pipeline = state.pipeline();

    for _ in 0..20 {
        assert!(
            pipeline
                .run("/school.ExecsService/Login", Request::new(()), handler.service())
                .await
                .is_ok()
        );
    }
    assert_eq!(handler.count(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_callers_never_exceed_threshold() {
    const CALLERS: usize = 16;
    const CALLS_EACH: usize = 25;
    let threshold = (CALLERS * CALLS_EACH - 1) as u32;

    let clock = ManualClock::starting_now();
    let limiter = Arc::new(RateLimiter::new(threshold, TimeDelta::seconds(60), clock.shared()));

    let mut handles = Vec::new();
    for _ in 0..CALLERS {
        let limiter = limiter.clone();
        handles.push(tokio::spawn(async move {
            let mut allowed = 0usize;
            for _ in 0..CALLS_EACH {
                if limiter.allow("global").await {
                    allowed += 1;
                }
            }
            allowed
        }));
    }

    let mut allowed = 0;
    for handle in handles {
        allowed += handle.await.unwrap();
    }

    assert_eq!(allowed, CALLERS * CALLS_EACH - 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_calls_through_pipeline() {
    const CALLERS: usize = 8;
    const CALLS_EACH: usize = 10;
    let threshold = (CALLERS * CALLS_EACH - 1) as u32;

    let (state, _clock) = test_state(limited_config(threshold, 60, RateLimitScope::Global));
    let handler = CountingHandler::new();
    let pipeline = state.pipeline();
    let token = state.codec.issue_default("1", "jdoe", Role::User).unwrap();

    let mut handles = Vec::new();
    for _ in 0..CALLERS {
        let pipeline = pipeline.clone();
        let service = handler.service();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            let mut rejected = 0usize;
            for _ in 0..CALLS_EACH {
                let result = pipeline
                    .run(PROTECTED_METHOD, bearer_request(&token), service.clone())
                    .await;
                if let Err(status) = result {
                    assert_eq!(status.code(), Code::ResourceExhausted);
                    rejected += 1;
                }
            }
            rejected
        }));
    }

    let mut rejected = 0;
    for handle in handles {
        rejected += handle.await.unwrap();
    }

    assert_eq!(rejected, 1);
    assert_eq!(handler.count(), CALLERS * CALLS_EACH - 1);
}
