// HTTP contract of the AI gateway client, exercised against a wiremock
// server: request body shape, success decoding, and upstream failure modes.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use parley_backend::config::Config;
use parley_backend::errors::AppError;
use parley_backend::llm::{AiGateway, ApiChatMessage, ApiRole, HttpAiGateway};
use parley_backend::models::chats::Persona;

fn config_for(base_url: &str, timeout_secs: u64) -> Config {
    Config {
        database_url: None,
        port: 3000,
        app_env: "test".to_string(),
        jwt_secret: None,
        jwt_expires_in_hours: 24,
        ai_service_url: base_url.to_string(),
        ai_request_timeout_secs: timeout_secs,
        ai_max_idle_connections: 4,
        history_window: 14,
        max_title_len: 40,
    }
}

fn sample_history() -> Vec<ApiChatMessage> {
    vec![
        ApiChatMessage::new(ApiRole::User, "what is a trait"),
        ApiChatMessage::new(ApiRole::Assistant, "an interface-like abstraction"),
        ApiChatMessage::new(ApiRole::User, "give an example"),
    ]
}

#[tokio::test]
async fn converse_posts_expected_body_and_returns_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_partial_json(json!({
            "messages": [
                { "role": "user", "content": "what is a trait" },
                { "role": "assistant", "content": "an interface-like abstraction" },
                { "role": "user", "content": "give an example" }
            ],
            "persona": "reviewer",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": "impl Display for Point"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpAiGateway::new(&config_for(&server.uri(), 5)).unwrap();
    let reply = gateway
        .converse(&sample_history(), Persona::Reviewer)
        .await
        .unwrap();

    assert_eq!(reply, "impl Display for Point");
}

#[tokio::test]
async fn trailing_slash_in_base_url_is_tolerated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "content": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let base = format!("{}/", server.uri());
    let gateway = HttpAiGateway::new(&config_for(&base, 5)).unwrap();
    let reply = gateway
        .converse(&sample_history(), Persona::Assistant)
        .await
        .unwrap();
    assert_eq!(reply, "ok");
}

#[tokio::test]
async fn non_success_status_maps_to_ai_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let gateway = HttpAiGateway::new(&config_for(&server.uri(), 5)).unwrap();
    let err = gateway
        .converse(&sample_history(), Persona::Assistant)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AiUpstream(_)));
    assert_eq!(err.code(), "AI_UPSTREAM_ERROR");
}

#[tokio::test]
async fn malformed_body_maps_to_ai_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "unexpected": "shape" })),
        )
        .mount(&server)
        .await;

    let gateway = HttpAiGateway::new(&config_for(&server.uri(), 5)).unwrap();
    let err = gateway
        .converse(&sample_history(), Persona::Assistant)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AiUpstream(_)));
}

#[tokio::test]
async fn slow_upstream_times_out_as_ai_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "content": "too late" }))
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let gateway = HttpAiGateway::new(&config_for(&server.uri(), 1)).unwrap();
    let err = gateway
        .converse(&sample_history(), Persona::Assistant)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AiUpstream(_)));
}

#[tokio::test]
async fn connection_refused_maps_to_ai_upstream() {
    // Nothing listens on this port.
    let gateway = HttpAiGateway::new(&config_for("http://127.0.0.1:9", 2)).unwrap();
    let err = gateway
        .converse(&sample_history(), Persona::Assistant)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AiUpstream(_)));
}
