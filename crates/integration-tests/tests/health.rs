mod harness;

use harness::backend::ScriptedBackend;
use harness::config::ConfigBuilder;
use harness::server::TestServer;

#[tokio::test]
async fn health_is_public() {
    let server = TestServer::start(ConfigBuilder::new().build(), ScriptedBackend::new())
        .await
        .unwrap();

    let resp = server.client().get(server.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn disabled_health_is_not_routed() {
    let config = ConfigBuilder::new().without_health().build();
    let server = TestServer::start(config, ScriptedBackend::new()).await.unwrap();

    // No longer public: an anonymous probe is refused before routing
    let anonymous = server.client().get(server.url("/health")).send().await.unwrap();
    assert_eq!(anonymous.status(), 401);

    let authed = server.get("/health").send().await.unwrap();
    assert_eq!(authed.status(), 404);
}
