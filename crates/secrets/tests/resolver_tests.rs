//! End-to-end resolution tests against a mocked secret server
//!
//! Tests cover:
//! - Local hits never reaching the server
//! - Remote fallback addressing and authentication
//! - Status classification (200 vs everything else)
//! - Size enforcement on both tiers
//! - Store and transport failures

use async_trait::async_trait;
use keyward_secrets::{
    AUTH_HEADER, MAX_SECRET_SIZE, MemoryStore, ResolverConfig, SecretError, SecretErrorKind,
    SecretPayload, SecretResolver, SecretStore, StoreError,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "build-token-123";

/// Store that fails every lookup with an I/O error
struct FailingStore;

#[async_trait]
impl SecretStore for FailingStore {
    fn store_name(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, _id: &str) -> Result<SecretPayload, StoreError> {
        Err(StoreError::Io {
            path: "/run/secrets".into(),
            source: std::io::Error::other("corrupted"),
        })
    }
}

fn local_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::from_map(HashMap::from([(
        "db-pass".to_string(),
        b"twelve-bytes".to_vec(),
    )])))
}

fn resolver_for(server: &MockServer, store: Arc<dyn SecretStore>) -> SecretResolver {
    let config = ResolverConfig::new(server.uri(), TOKEN);
    SecretResolver::new(store, &config).unwrap()
}

/// Mount a mock answering `GET /api/v0/secrets/{id}` and expecting `calls` hits
async fn mock_secret(server: &MockServer, id: &str, response: ResponseTemplate, calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v0/secrets/{id}")))
        .and(header(AUTH_HEADER, TOKEN))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn local_hit_does_not_contact_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("wrong"))
        .expect(0)
        .mount(&server)
        .await;

    let resolver = resolver_for(&server, local_store());
    let payload = resolver.resolve("db-pass").await.unwrap();

    assert_eq!(payload.expose(), b"twelve-bytes");
    assert_eq!(payload.len(), 12);
    server.verify().await;
}

#[tokio::test]
async fn local_miss_falls_back_to_server() {
    let server = MockServer::start().await;
    mock_secret(
        &server,
        "api-key",
        ResponseTemplate::new(200).set_body_string("s3cr3t"),
        1,
    )
    .await;

    let resolver = resolver_for(&server, local_store());
    let payload = resolver.resolve("api-key").await.unwrap();

    assert_eq!(payload.expose(), b"s3cr3t");
    server.verify().await;
}

#[tokio::test]
async fn remote_request_carries_auth_header() {
    let server = MockServer::start().await;
    mock_secret(
        &server,
        "api-key",
        ResponseTemplate::new(200).set_body_string("s3cr3t"),
        1,
    )
    .await;

    let resolver = resolver_for(&server, local_store());
    resolver.resolve("api-key").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), "/api/v0/secrets/api-key");
    assert_eq!(
        requests[0].headers.get(AUTH_HEADER).unwrap().to_str().unwrap(),
        TOKEN
    );
}

#[tokio::test]
async fn remote_binary_payload_is_returned_untouched() {
    let server = MockServer::start().await;
    let body = vec![0u8, 1, 2, 254, 255];
    mock_secret(
        &server,
        "cert",
        ResponseTemplate::new(200).set_body_bytes(body.clone()),
        1,
    )
    .await;

    let resolver = resolver_for(&server, local_store());
    let payload = resolver.resolve("cert").await.unwrap();
    assert_eq!(payload.expose(), body.as_slice());
}

#[tokio::test]
async fn remote_404_is_not_found() {
    let server = MockServer::start().await;
    mock_secret(&server, "api-key", ResponseTemplate::new(404), 1).await;

    let resolver = resolver_for(&server, local_store());
    let err = resolver.resolve("api-key").await.unwrap_err();

    assert!(matches!(err, SecretError::NotFound { .. }));
    assert!(err.kind().is_not_found());
}

#[tokio::test]
async fn every_non_200_status_is_not_found() {
    for status in [201, 202, 400, 401, 403, 429, 500, 503] {
        let server = MockServer::start().await;
        mock_secret(
            &server,
            "api-key",
            ResponseTemplate::new(status).set_body_string("body"),
            1,
        )
        .await;

        let resolver = resolver_for(&server, local_store());
        let err = resolver.resolve("api-key").await.unwrap_err();
        assert_eq!(err.kind(), SecretErrorKind::NotFound, "status {status}");
    }
}

#[tokio::test]
async fn each_resolution_makes_a_fresh_request() {
    let server = MockServer::start().await;
    mock_secret(
        &server,
        "api-key",
        ResponseTemplate::new(200).set_body_string("s3cr3t"),
        3,
    )
    .await;

    let resolver = resolver_for(&server, local_store());
    for _ in 0..3 {
        resolver.resolve("api-key").await.unwrap();
    }
    server.verify().await;
}

#[tokio::test]
async fn oversized_remote_payload_is_rejected() {
    let server = MockServer::start().await;
    mock_secret(
        &server,
        "api-key",
        ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 600 * 1024]),
        1,
    )
    .await;

    let resolver = resolver_for(&server, local_store());
    let err = resolver.resolve("api-key").await.unwrap_err();

    match err {
        SecretError::InvalidSize { size, max, .. } => {
            assert_eq!(size, 614_400);
            assert_eq!(max, MAX_SECRET_SIZE);
        }
        other => panic!("Expected InvalidSize, got {other:?}"),
    }
}

#[tokio::test]
async fn remote_payload_at_limit_is_accepted() {
    let server = MockServer::start().await;
    mock_secret(
        &server,
        "api-key",
        ResponseTemplate::new(200).set_body_bytes(vec![b'x'; MAX_SECRET_SIZE]),
        1,
    )
    .await;

    let resolver = resolver_for(&server, local_store());
    let payload = resolver.resolve("api-key").await.unwrap();
    assert_eq!(payload.len(), MAX_SECRET_SIZE);
}

#[tokio::test]
async fn oversized_local_payload_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::from_map(HashMap::from([(
        "big".to_string(),
        vec![0u8; 600 * 1024],
    )])));
    let resolver = resolver_for(&server, store);
    let err = resolver.resolve("big").await.unwrap_err();

    assert!(matches!(err, SecretError::InvalidSize { size: 614_400, .. }));
    server.verify().await;
}

#[tokio::test]
async fn store_failure_does_not_contact_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("s3cr3t"))
        .expect(0)
        .mount(&server)
        .await;

    let resolver = resolver_for(&server, Arc::new(FailingStore));
    let err = resolver.resolve("api-key").await.unwrap_err();

    assert_eq!(err.kind(), SecretErrorKind::Store);
    assert!(err.to_string().contains("corrupted"));
    server.verify().await;
}

#[tokio::test]
async fn disabled_remote_returns_not_found() {
    let store: Arc<dyn SecretStore> = local_store();
    let resolver = SecretResolver::new(store, &ResolverConfig::local_only()).unwrap();

    assert!(!resolver.has_remote());
    let err = resolver.resolve("api-key").await.unwrap_err();
    assert_eq!(err.kind(), SecretErrorKind::NotFound);
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    // Bind then drop a listener to get a port nothing is listening on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ResolverConfig::new(format!("http://{addr}"), TOKEN);
    let resolver = SecretResolver::new(local_store(), &config).unwrap();
    let err = resolver.resolve("api-key").await.unwrap_err();

    assert_eq!(err.kind(), SecretErrorKind::Transport);
    assert!(std::error::Error::source(&err).is_some());
}

#[tokio::test]
async fn identifier_with_query_is_request_construction_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let resolver = resolver_for(&server, local_store());
    let err = resolver.resolve("api-key?admin=true").await.unwrap_err();

    assert_eq!(err.kind(), SecretErrorKind::RequestConstruction);
    server.verify().await;
}

#[tokio::test]
async fn identifier_leaving_secrets_path_sends_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("admin-data"))
        .expect(0)
        .mount(&server)
        .await;

    let resolver = resolver_for(&server, local_store());
    for id in [
        "../x",
        "../../../admin/users",
        "%2e%2e/x",
        "%2e%2e/%2e%2e/other",
        "a\\..\\x",
        "team/../../x",
    ] {
        let err = resolver.resolve(id).await.unwrap_err();
        assert_eq!(
            err.kind(),
            SecretErrorKind::RequestConstruction,
            "identifier {id:?}"
        );
    }
    server.verify().await;
}

#[tokio::test]
async fn nested_identifier_reaches_secrets_path() {
    let server = MockServer::start().await;
    mock_secret(
        &server,
        "team/db.pass",
        ResponseTemplate::new(200).set_body_string("nested"),
        1,
    )
    .await;

    let resolver = resolver_for(&server, local_store());
    let payload = resolver.resolve("team/db.pass").await.unwrap();
    assert_eq!(payload.expose(), b"nested");
    server.verify().await;
}

#[tokio::test]
async fn slow_server_times_out_as_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v0/secrets/api-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("s3cr3t")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config =
        ResolverConfig::new(server.uri(), TOKEN).with_timeout(Duration::from_millis(200));
    let resolver = SecretResolver::new(local_store(), &config).unwrap();
    let err = resolver.resolve("api-key").await.unwrap_err();

    assert_eq!(err.kind(), SecretErrorKind::Transport);
    assert!(std::error::Error::source(&err).is_some());
}

#[tokio::test]
async fn redirect_is_not_followed() {
    let server = MockServer::start().await;
    mock_secret(
        &server,
        "api-key",
        ResponseTemplate::new(302)
            .insert_header("location", format!("{}/elsewhere", server.uri()).as_str()),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/elsewhere"))
        .respond_with(ResponseTemplate::new(200).set_body_string("s3cr3t"))
        .expect(0)
        .mount(&server)
        .await;

    let resolver = resolver_for(&server, local_store());
    let err = resolver.resolve("api-key").await.unwrap_err();

    assert_eq!(err.kind(), SecretErrorKind::NotFound);
    server.verify().await;
}

#[tokio::test]
async fn batch_mixes_local_and_remote() {
    let server = MockServer::start().await;
    mock_secret(
        &server,
        "api-key",
        ResponseTemplate::new(200).set_body_string("s3cr3t"),
        1,
    )
    .await;

    let resolver = resolver_for(&server, local_store());
    let batch = resolver.resolve_batch(["db-pass", "api-key"]).await.unwrap();

    assert_eq!(batch.ids().collect::<Vec<_>>(), vec!["api-key", "db-pass"]);
    assert_eq!(batch.get("api-key").unwrap().expose(), b"s3cr3t");
    assert_eq!(batch.get("db-pass").unwrap().expose(), b"twelve-bytes");
}

#[tokio::test]
async fn concurrent_resolutions_share_one_resolver() {
    let server = MockServer::start().await;
    mock_secret(
        &server,
        "api-key",
        ResponseTemplate::new(200).set_body_string("s3cr3t"),
        8,
    )
    .await;

    let resolver = Arc::new(resolver_for(&server, local_store()));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            tokio::spawn(async move { resolver.resolve("api-key").await })
        })
        .collect();

    for handle in handles {
        let payload = handle.await.unwrap().unwrap();
        assert_eq!(payload.expose(), b"s3cr3t");
    }
    server.verify().await;
}
