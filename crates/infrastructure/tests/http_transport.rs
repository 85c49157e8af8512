//! Transport and client tests against a local mock server.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use photox_application::ports::{HttpTransport, KeyValueStore, TransportError};
use photox_application::{ApiClient, ClientError, ImageService, ImageUpload, SessionStore};
use photox_domain::{ApiRequest, AuthError, SessionEvent};
use photox_infrastructure::{MemoryKeyValueStore, ReqwestTransport};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn transport(server: &MockServer) -> ReqwestTransport {
    ReqwestTransport::with_client(reqwest::Client::new(), &server.uri(), 2_000).unwrap()
}

async fn client(
    server: &MockServer,
    entries: &[(&str, &str)],
) -> (ApiClient, Arc<MemoryKeyValueStore>) {
    let store = Arc::new(MemoryKeyValueStore::new());
    for (key, value) in entries {
        store.set(key, value).await.unwrap();
    }
    let session = SessionStore::load(store.clone()).await.unwrap();
    (ApiClient::new(Arc::new(transport(server)), session), store)
}

#[tokio::test]
async fn test_transport_sends_headers_query_and_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/albums/"))
        .and(query_param("page", "1"))
        .and(header("authorization", "Bearer A"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"title": "Holidays"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let request = ApiRequest::post("/albums/")
        .query("page", "1")
        .json(json!({"title": "Holidays"}))
        .with_bearer("A");
    let response = transport(&server).send(&request).await.unwrap();

    assert_eq!(response.status.as_u16(), 201);
    assert_eq!(response.json_value().unwrap(), json!({"id": 1}));
    assert_eq!(response.header("Content-Type"), Some("application/json"));
}

#[tokio::test]
async fn test_transport_returns_error_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
        .mount(&server)
        .await;

    let response = transport(&server)
        .send(&ApiRequest::get("/images/"))
        .await
        .unwrap();

    assert!(response.is_unauthorized());
}

#[tokio::test]
async fn test_transport_reports_connection_failure() {
    // Bound then released, so nothing listens on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let transport = ReqwestTransport::with_client(reqwest::Client::new(), &uri, 2_000).unwrap();
    let err = transport.send(&ApiRequest::get("/images/")).await.unwrap_err();

    assert!(matches!(err, TransportError::ConnectionFailed(_)));
}

#[tokio::test]
async fn test_upload_is_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/images/upload/"))
        .and(header_exists("content-type"))
        .respond_with(|request: &Request| {
            let content_type = request
                .headers
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            let body = String::from_utf8_lossy(&request.body);
            if content_type.starts_with("multipart/form-data; boundary=")
                && body.contains("name=\"image\"; filename=\"cat.png\"")
                && body.contains("name=\"title\"")
            {
                ResponseTemplate::new(201)
                    .set_body_json(json!({"id": 9, "image_url": "/media/cat.png"}))
            } else {
                ResponseTemplate::new(400)
            }
        })
        .mount(&server)
        .await;

    let (client, _) = client(&server, &[("token", "A"), ("refresh_token", "R")]).await;
    let image = ImageService::new(client)
        .upload(ImageUpload::new("cat.png", vec![0x89, b'P', b'N', b'G']).title("Cat"))
        .await
        .unwrap();

    assert_eq!(image["id"], 9);
}

#[tokio::test]
async fn test_expired_token_is_refreshed_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/images/"))
        .and(header("authorization", "Bearer expiredA"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/token/refresh/"))
        .and(body_json(json!({"refresh": "R"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "B"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/images/"))
        .and(header("authorization", "Bearer B"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .mount(&server)
        .await;

    let (client, store) =
        client(&server, &[("token", "expiredA"), ("refresh_token", "R")]).await;
    let mut events = client.subscribe();

    let (first, second) = tokio::join!(
        client.request(ApiRequest::get("/images/")),
        client.request(ApiRequest::get("/images/")),
    );

    assert_eq!(first.unwrap().json_value().unwrap(), json!({"results": []}));
    assert_eq!(second.unwrap().json_value().unwrap(), json!({"results": []}));
    assert_eq!(store.get("token").await.unwrap().as_deref(), Some("B"));
    assert_eq!(events.try_recv().unwrap(), SessionEvent::TokenRefreshed);
}

#[tokio::test]
async fn test_missing_refresh_token_signals_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/albums/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let (client, store) = client(&server, &[("token", "expiredA")]).await;
    let mut events = client.subscribe();

    let err = client.request(ApiRequest::get("/albums/")).await.unwrap_err();

    assert!(matches!(err, ClientError::Auth(AuthError::MissingRefreshToken)));
    assert!(store.is_empty());
    assert!(events.try_recv().unwrap().is_invalidated());

    let received = server.received_requests().await.unwrap();
    assert!(received.iter().all(|r| r.url.path() == "/albums/"));
}
