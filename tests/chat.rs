mod common;

use agrostudio_lib::chat::{ChatQuery, DEFAULT_CHAT_MODEL};
use agrostudio_lib::error::ChatError;
use common::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_path() -> String {
    format!("/models/{DEFAULT_CHAT_MODEL}:generateContent")
}

#[tokio::test]
async fn ask_returns_reply_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(chat_path()))
        .and(header("x-goog-api-key", API_KEY))
        .and(body_partial_json(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "What should I plant in sandy soil?" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(
            "Try Valley Gold Soybean with GreenCompost Organic Blend.",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let chat = ChatQuery::new(client(&server), DEFAULT_CHAT_MODEL);
    let reply = chat.ask("What should I plant in sandy soil?").await.unwrap();
    assert_eq!(reply, "Try Valley Gold Soybean with GreenCompost Organic Blend.");
}

#[tokio::test]
async fn every_call_carries_the_catalog_instruction() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(chat_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("ok")))
        .mount(&server)
        .await;

    let chat = ChatQuery::new(client(&server), DEFAULT_CHAT_MODEL);
    chat.ask("first").await.unwrap();
    chat.ask("second").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    for req in &requests {
        let body: serde_json::Value = req.body_json().unwrap();
        let instruction = body["systemInstruction"]["parts"][0]["text"].as_str().unwrap();
        assert!(instruction.contains("GF-418 Hybrid Maize"));
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
    }
}

#[tokio::test]
async fn empty_reply_is_empty_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(chat_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("")))
        .mount(&server)
        .await;

    let chat = ChatQuery::new(client(&server), DEFAULT_CHAT_MODEL);
    let err = chat.ask("").await.unwrap_err();
    assert!(matches!(err, ChatError::EmptyResponse), "got {err:?}");
}

#[tokio::test]
async fn missing_candidates_is_empty_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(chat_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let chat = ChatQuery::new(client(&server), DEFAULT_CHAT_MODEL);
    assert!(matches!(
        chat.ask("hello").await,
        Err(ChatError::EmptyResponse)
    ));
}

#[tokio::test]
async fn auth_failure_is_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(chat_path()))
        .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
        .mount(&server)
        .await;

    let chat = ChatQuery::new(client(&server), DEFAULT_CHAT_MODEL);
    match chat.ask("hello").await {
        Err(ChatError::Provider(api)) => {
            assert_eq!(api.status().map(|s| s.as_u16()), Some(403));
        }
        other => panic!("expected Provider error, got {other:?}"),
    }
}
