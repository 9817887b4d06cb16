mod harness;

use harness::backend::{ScriptedBackend, claude_text};
use harness::config::ConfigBuilder;
use harness::server::TestServer;
use serde_json::{Value, json};

fn hello() -> Value {
    json!({"model": "", "messages": [{"role": "user", "content": "Hello!"}]})
}

#[tokio::test]
async fn missing_key_is_401_and_never_invokes() {
    let backend = ScriptedBackend::new();
    backend.push_response(Ok(claude_text("unreachable")));
    let server = TestServer::start(ConfigBuilder::new().build(), backend.clone())
        .await
        .unwrap();

    let resp = server
        .client()
        .post(server.url("/v1/chat/completions"))
        .json(&hello())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["kind"], "Unauthorized");
    assert_eq!(body["error"]["code"], 401);
    assert!(backend.invocations().is_empty());
}

#[tokio::test]
async fn wrong_key_is_401() {
    let backend = ScriptedBackend::new();
    let server = TestServer::start(ConfigBuilder::new().build(), backend.clone())
        .await
        .unwrap();

    let resp = server
        .client()
        .post(server.url("/v1/chat/completions"))
        .bearer_auth("sk-wrong")
        .json(&hello())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert!(backend.invocations().is_empty());
}

#[tokio::test]
async fn non_bearer_scheme_is_401() {
    let server = TestServer::start(ConfigBuilder::new().build(), ScriptedBackend::new())
        .await
        .unwrap();

    let resp = server
        .client()
        .get(server.url("/v1/models"))
        .basic_auth("user", Some(harness::config::API_KEY))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn every_api_route_requires_the_key() {
    let server = TestServer::start(ConfigBuilder::new().build(), ScriptedBackend::new())
        .await
        .unwrap();

    for path in ["/v1/models", "/api/v1/models", "/v1/models/cohere.embed-english-v3"] {
        let resp = server.client().get(server.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 401, "{path}");
    }

    let resp = server
        .client()
        .post(server.url("/v1/embeddings"))
        .json(&json!({"input": "hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}
