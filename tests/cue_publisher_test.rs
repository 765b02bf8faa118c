//! Remote publisher tests against a mock REST server

use chrono::NaiveDate;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ez_redirect::cue::{CuePublisher, PublishError, PublishOutcome};
use ez_redirect::models::{CuePayload, RemoteConfig};

const KEY: &str = "service-key";

fn publisher() -> CuePublisher {
    CuePublisher::new(Duration::from_secs(5)).unwrap()
}

fn remote(server: &MockServer) -> RemoteConfig {
    RemoteConfig::new(format!("{}/", server.uri()), KEY)
}

fn sunday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 2).unwrap()
}

#[tokio::test]
async fn test_publish_cue_posts_record_with_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/cues"))
        .and(header("apikey", KEY))
        .and(header("authorization", format!("Bearer {KEY}").as_str()))
        .and(body_json(json!({
            "event_id": "2024-06-02",
            "cue_type": "Giving Tuesday",
            "headline": "Give today",
            "body_text": "",
            "button_text": "Give",
            "button_url": "https://give.example",
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let payload = CuePayload {
        headline: "Give today".to_string(),
        button_text: "Give".to_string(),
        button_url: "https://give.example".to_string(),
        ..Default::default()
    };
    let outcome = publisher()
        .publish_cue(&remote(&server), "Giving Tuesday", Some(&payload), sunday())
        .await;

    assert_eq!(
        outcome,
        PublishOutcome::Delivered {
            event_id: "2024-06-02".to_string(),
            status: 201,
        }
    );
}

#[tokio::test]
async fn test_publish_cue_without_payload_posts_empty_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/cues"))
        .and(body_json(json!({
            "event_id": "2024-06-02",
            "cue_type": "Welcome",
            "headline": "",
            "body_text": "",
            "button_text": "",
            "button_url": "",
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = publisher()
        .publish_cue(&remote(&server), "Welcome", None, sunday())
        .await;
    assert!(outcome.is_delivered());
}

#[tokio::test]
async fn test_publish_cue_rejection_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/cues"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad cue"))
        .mount(&server)
        .await;

    let outcome = publisher()
        .publish_cue(&remote(&server), "Welcome", None, sunday())
        .await;

    let error = outcome.error().cloned().unwrap();
    assert_eq!(
        error,
        PublishError::Rejected {
            status: 400,
            body: "bad cue".to_string(),
        }
    );
    assert!(!error.is_recoverable());
    assert_eq!(error.to_string(), "HTTP 400: bad cue");
}

#[tokio::test]
async fn test_create_event_then_records_start_time() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/create_event"))
        .and(body_json(json!({ "p_event_id": "2024-06-02" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/events"))
        .and(query_param("event_id", "eq.2024-06-02"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let start = sunday().and_hms_opt(10, 0, 0).unwrap();
    let outcome = publisher()
        .create_event(&remote(&server), "2024-06-02", Some(start))
        .await;
    assert_eq!(outcome.into_result().unwrap(), "2024-06-02");
}

#[tokio::test]
async fn test_create_event_start_time_failure_is_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/create_event"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/events"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let start = sunday().and_hms_opt(10, 0, 0).unwrap();
    let outcome = publisher()
        .create_event(&remote(&server), "2024-06-02", Some(start))
        .await;
    assert!(outcome.is_delivered());
}

#[tokio::test]
async fn test_create_event_without_start_time_skips_patch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/create_event"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = publisher()
        .create_event(&remote(&server), "2024-06-02", None)
        .await;
    assert!(outcome.is_delivered());
}

#[tokio::test]
async fn test_create_event_server_error_is_recoverable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/create_event"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&server)
        .await;

    let outcome = publisher()
        .create_event(&remote(&server), "2024-06-02", None)
        .await;
    let error = outcome.into_result().unwrap_err();
    assert!(error.is_recoverable());
}

#[tokio::test]
async fn test_connection_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/events"))
        .and(query_param("limit", "1"))
        .and(header("apikey", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert!(publisher().test_connection(&remote(&server)).await.is_ok());

    let wrong_key = RemoteConfig::new(server.uri(), "other-key");
    let err = publisher().test_connection(&wrong_key).await.unwrap_err();
    assert!(matches!(err, PublishError::Rejected { status: 404, .. }));
}

#[tokio::test]
async fn test_unconfigured_remote_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let blank_key = RemoteConfig::new(server.uri(), "  ");
    let outcome = publisher()
        .publish_cue(&blank_key, "Welcome", None, sunday())
        .await;
    assert_eq!(outcome.error(), Some(&PublishError::NotConfigured));
}
