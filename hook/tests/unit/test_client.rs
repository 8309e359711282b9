//! Render client tests against an in-process fake API

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use render_api::ServiceFilter;
use renderhook::deploy::fsm::MonitorState;
use renderhook::errors::ApiError;
use renderhook::http::client::RenderClient;
use renderhook::http::deploys::PollOptions;
use secrecy::SecretString;

use common::{start_fake_render, API_KEY, DEPLOY_ID, SERVICE_ID};

fn key() -> SecretString {
    SecretString::from(API_KEY.to_string())
}

fn poll(max_attempts: u32) -> PollOptions {
    PollOptions {
        max_attempts,
        interval: Duration::from_millis(50),
    }
}

/// Sleep stand-in that counts calls and returns at once
fn counting_sleep(counter: Arc<AtomicUsize>) -> impl Fn(Duration) -> std::future::Ready<()> {
    move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        std::future::ready(())
    }
}

#[tokio::test]
async fn test_list_services_with_filter() {
    let (fake, base_url) = start_fake_render().await;
    let client = RenderClient::new(&base_url).unwrap();

    let services = client
        .list_services(&key(), ServiceFilter::ActiveOnly)
        .await
        .unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].id.as_deref(), Some(SERVICE_ID));

    let query = fake.last_services_query.lock().unwrap().clone();
    assert_eq!(query.get("suspended").map(String::as_str), Some("not_suspended"));
    assert_eq!(query.get("limit").map(String::as_str), Some("100"));

    client.list_services(&key(), ServiceFilter::All).await.unwrap();
    let query = fake.last_services_query.lock().unwrap().clone();
    assert!(!query.contains_key("suspended"));
}

#[tokio::test]
async fn test_list_services_reports_status_and_body() {
    let (_fake, base_url) = start_fake_render().await;
    let client = RenderClient::new(&base_url).unwrap();

    let wrong_key = SecretString::from("nope".to_string());
    match client.list_services(&wrong_key, ServiceFilter::All).await {
        Err(ApiError::Status { status, body }) => {
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert!(body.contains("unauthorized"));
        }
        other => panic!("expected Status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_api_is_a_transport_error() {
    let client = RenderClient::new("http://127.0.0.1:1/v1").unwrap();
    let result = client.list_services(&key(), ServiceFilter::All).await;
    assert!(matches!(result, Err(ApiError::Transport(_))));
}

#[tokio::test]
async fn test_trigger_deploy_requires_created() {
    let (fake, base_url) = start_fake_render().await;
    let client = RenderClient::new(&base_url).unwrap();

    let deploy = client.trigger_deploy(SERVICE_ID, &key()).await.unwrap();
    assert_eq!(deploy.id, DEPLOY_ID);

    *fake.trigger_status.lock().unwrap() = StatusCode::OK;
    let err = client.trigger_deploy(SERVICE_ID, &key()).await.unwrap_err();
    assert_eq!(err.http_status(), Some(StatusCode::OK));

    *fake.trigger_status.lock().unwrap() = StatusCode::INTERNAL_SERVER_ERROR;
    let err = client.trigger_deploy(SERVICE_ID, &key()).await.unwrap_err();
    assert_eq!(err.http_status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(fake.triggers(), 3);
}

#[tokio::test]
async fn test_poll_reaches_live_after_three_checks() {
    let (fake, base_url) = start_fake_render().await;
    fake.script_statuses(&["queued", "build_in_progress", "live"]);
    let client = RenderClient::new(&base_url).unwrap();

    let sleeps = Arc::new(AtomicUsize::new(0));
    let outcome = client
        .poll_deploy_status_with(SERVICE_ID, DEPLOY_ID, &key(), poll(5), counting_sleep(sleeps.clone()))
        .await;

    assert_eq!(outcome.state, MonitorState::Live);
    assert!(outcome.is_success());
    assert_eq!(outcome.checks, 3);
    assert_eq!(sleeps.load(Ordering::SeqCst), 2);
    assert_eq!(fake.polls(), 3);
    assert_eq!(
        outcome.finished_at.unwrap().to_rfc3339(),
        "2024-11-04T02:35:40+00:00"
    );
}

#[tokio::test]
async fn test_poll_waits_between_checks() {
    let (fake, base_url) = start_fake_render().await;
    fake.script_statuses(&["queued", "build_in_progress", "live"]);
    let client = RenderClient::new(&base_url).unwrap();

    let started = Instant::now();
    let outcome = client
        .poll_deploy_status(SERVICE_ID, DEPLOY_ID, &key(), poll(5))
        .await;

    assert_eq!(outcome.state, MonitorState::Live);
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_poll_times_out_without_terminal_status() {
    let (fake, base_url) = start_fake_render().await;
    fake.script_statuses(&["queued"]);
    let client = RenderClient::new(&base_url).unwrap();

    let sleeps = Arc::new(AtomicUsize::new(0));
    let outcome = client
        .poll_deploy_status_with(SERVICE_ID, DEPLOY_ID, &key(), poll(5), counting_sleep(sleeps.clone()))
        .await;

    assert_eq!(outcome.state, MonitorState::TimedOut);
    assert!(!outcome.is_success());
    assert_eq!(outcome.checks, 5);
    assert_eq!(fake.polls(), 5);
    assert_eq!(sleeps.load(Ordering::SeqCst), 4);
    assert!(outcome.finished_at.is_none());
}

#[tokio::test]
async fn test_unknown_status_is_not_terminal() {
    let (fake, base_url) = start_fake_render().await;
    fake.script_statuses(&["pre_deploy_paused"]);
    let client = RenderClient::new(&base_url).unwrap();

    let sleeps = Arc::new(AtomicUsize::new(0));
    let outcome = client
        .poll_deploy_status_with(SERVICE_ID, DEPLOY_ID, &key(), poll(3), counting_sleep(sleeps))
        .await;
    assert_eq!(outcome.state, MonitorState::TimedOut);
    assert_eq!(fake.polls(), 3);
}

#[tokio::test]
async fn test_failure_statuses_carry_reason() {
    let (fake, base_url) = start_fake_render().await;
    let client = RenderClient::new(&base_url).unwrap();
    let sleeps = Arc::new(AtomicUsize::new(0));

    for (status, state) in [
        ("failed", MonitorState::Failed),
        ("canceled", MonitorState::Cancelled),
        ("cancelled", MonitorState::Cancelled),
        ("deactivated", MonitorState::Deactivated),
    ] {
        fake.script_statuses(&["build_in_progress", status]);
        let outcome = client
            .poll_deploy_status_with(SERVICE_ID, DEPLOY_ID, &key(), poll(5), counting_sleep(sleeps.clone()))
            .await;
        assert_eq!(outcome.state, state, "status {}", status);
        assert_eq!(outcome.checks, 2);
        assert!(outcome.reason.is_some());
    }
}

#[tokio::test]
async fn test_failed_check_aborts_polling() {
    let (fake, base_url) = start_fake_render().await;
    fake.fail_polls.store(true, Ordering::SeqCst);
    let client = RenderClient::new(&base_url).unwrap();

    let sleeps = Arc::new(AtomicUsize::new(0));
    let outcome = client
        .poll_deploy_status_with(SERVICE_ID, DEPLOY_ID, &key(), poll(5), counting_sleep(sleeps.clone()))
        .await;

    assert_eq!(outcome.state, MonitorState::TimedOut);
    assert_eq!(outcome.checks, 1);
    assert_eq!(fake.polls(), 1);
    assert_eq!(sleeps.load(Ordering::SeqCst), 0);
    assert!(outcome.reason.unwrap().contains("502"));
}

#[tokio::test]
async fn test_zero_attempts_times_out_immediately() {
    let (fake, base_url) = start_fake_render().await;
    let client = RenderClient::new(&base_url).unwrap();

    let outcome = client
        .poll_deploy_status(SERVICE_ID, DEPLOY_ID, &key(), poll(0))
        .await;
    assert_eq!(outcome.state, MonitorState::TimedOut);
    assert_eq!(outcome.checks, 0);
    assert_eq!(fake.polls(), 0);
}

#[tokio::test]
async fn test_resolve_urls_keeps_verified_domains_in_order() {
    let (_fake, base_url) = start_fake_render().await;
    let client = RenderClient::new(&base_url).unwrap();

    let urls = client.resolve_service_urls(SERVICE_ID, &key()).await.unwrap();
    assert_eq!(urls.default_url.as_deref(), Some("https://demo-web.onrender.com"));
    assert_eq!(
        urls.custom_domains,
        vec!["https://demo.example.com", "https://www.example.com"]
    );
}

#[tokio::test]
async fn test_resolve_urls_for_unknown_service() {
    let (_fake, base_url) = start_fake_render().await;
    let client = RenderClient::new(&base_url).unwrap();
    assert!(client.resolve_service_urls("srv-missing", &key()).await.is_none());

    let wrong_key = SecretString::from("nope".to_string());
    assert!(client.resolve_service_urls(SERVICE_ID, &wrong_key).await.is_none());
}

#[tokio::test]
async fn test_resolve_urls_survives_custom_domain_failure() {
    let (fake, base_url) = start_fake_render().await;
    fake.fail_custom_domains.store(true, Ordering::SeqCst);
    let client = RenderClient::new(&base_url).unwrap();

    let urls = client.resolve_service_urls(SERVICE_ID, &key()).await.unwrap();
    assert_eq!(urls.default_url.as_deref(), Some("https://demo-web.onrender.com"));
    assert!(urls.custom_domains.is_empty());
}
