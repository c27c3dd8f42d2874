use std::time::Duration;

use buddhi_core::{
    ChatMessage, Endpoint, EndpointError, HttpEndpoint, Session, ERROR_REPLY, FALLBACK_REPLY,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn endpoint_for(server: &MockServer) -> HttpEndpoint {
    HttpEndpoint::new(&format!("{}/api/gemini", server.uri()), Duration::from_secs(2)).unwrap()
}

fn drain(session: &mut Session) {
    while session.step().is_some() {}
}

#[tokio::test]
async fn test_posts_question_and_reads_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/gemini"))
        .and(body_json(json!({ "question": "Hi" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reply": "Hello!" })))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = endpoint_for(&server);
    assert_eq!(endpoint.ask("Hi").await.unwrap(), "Hello!");
}

#[tokio::test]
async fn test_missing_reply_reads_as_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let endpoint = endpoint_for(&server);
    assert_eq!(endpoint.ask("Hi").await.unwrap(), "");

    let mut session = Session::new();
    session.ask(&endpoint, "Hi").await.unwrap();
    drain(&mut session);
    assert_eq!(session.messages()[1], ChatMessage::assistant(FALLBACK_REPLY));
}

#[tokio::test]
async fn test_error_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "boom" })))
        .mount(&server)
        .await;

    let endpoint = endpoint_for(&server);
    let err = endpoint.ask("Hi").await.unwrap_err();
    assert!(matches!(err, EndpointError::Status(s) if s.as_u16() == 500));
}

#[tokio::test]
async fn test_malformed_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let endpoint = endpoint_for(&server);
    let err = endpoint.ask("Hi").await.unwrap_err();
    assert!(matches!(err, EndpointError::Body(_)));
}

#[tokio::test]
async fn test_timeout_folds_into_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "reply": "too late" }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let endpoint = HttpEndpoint::new(
        &format!("{}/api/gemini", server.uri()),
        Duration::from_millis(50),
    )
    .unwrap();

    let mut session = Session::new();
    session.ask(&endpoint, "Hi").await.unwrap();

    assert_eq!(
        session.messages(),
        &[ChatMessage::user("Hi"), ChatMessage::assistant(ERROR_REPLY)]
    );
    assert!(!session.in_flight());
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    // Nothing listens on the discard port
    let endpoint = HttpEndpoint::new("http://127.0.0.1:9/api/gemini", Duration::from_secs(2)).unwrap();
    let err = endpoint.ask("Hi").await.unwrap_err();
    assert!(matches!(err, EndpointError::Transport { .. }));
}

#[tokio::test]
async fn test_full_exchange_against_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/gemini"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reply": "Namaste" })))
        .mount(&server)
        .await;

    let endpoint = endpoint_for(&server);
    let mut session = Session::new();
    session.ask(&endpoint, "Hi").await.unwrap();

    let done = session
        .reveal_paced(Duration::from_millis(1), |_, _| {})
        .await
        .unwrap();

    assert_eq!(done.text, "Namaste");
    assert_eq!(
        session.messages(),
        &[ChatMessage::user("Hi"), ChatMessage::assistant("Namaste")]
    );
}
