//! End-to-end server tests
//!
//! Drive the full router against mocked upstream media servers, covering the
//! provider routes and the error-to-HTTP mapping.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use medley::config::{Config, ProviderConfig};
use medley::filter::FilterConfig;
use medley::providers::ProviderKind;
use medley::server::{create_router, AppContext};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn context_with_jellyfin(server: &MockServer) -> AppContext {
    let addr = server.address();
    let config = Config {
        providers: vec![ProviderConfig {
            name: "living-room".to_string(),
            kind: ProviderKind::Jellyfin,
            hostname: addr.ip().to_string(),
            port: addr.port(),
            api_key: "server-test-key".to_string(),
            insecure: true,
            accept_invalid_certs: false,
            enabled: true,
            retry_max_retries: 0,
            retry_base_delay_ms: 1,
            filters: FilterConfig::default(),
        }],
        ..Config::default()
    };
    AppContext::new(config).unwrap()
}

async fn body_to_json(body: Body) -> serde_json::Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_endpoint_returns_probed_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/System/Info/Public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ServerName": "Den",
            "Version": "10.9.2",
            "Id": "srv-1"
        })))
        .mount(&server)
        .await;

    let app = create_router(context_with_jellyfin(&server));
    let response = app
        .oneshot(
            Request::post("/api/providers/living-room/test")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["name"], "Den");
    assert_eq!(json["version"], "10.9.2");
    assert_eq!(json["id"], "srv-1");
}

#[tokio::test]
async fn upstream_auth_failure_maps_to_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Items"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let app = create_router(context_with_jellyfin(&server));
    let response = app
        .oneshot(
            Request::get("/api/providers/living-room/media")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
    assert_eq!(json["http_status"], 401);
}

#[tokio::test]
async fn quality_facets_over_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Library/MediaFolders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [{ "Id": "L1", "Name": "Movies" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Items": [
                {
                    "Id": "1", "Name": "Heat", "Type": "Movie",
                    "MediaSources": [{ "MediaStreams": [{ "Type": "Video", "Height": 1080 }] }]
                },
                {
                    "Id": "2", "Name": "Ran", "Type": "Movie",
                    "MediaSources": [{ "MediaStreams": [{ "Type": "Video", "Height": 2160 }] }]
                },
                {
                    "Id": "3", "Name": "Stalker", "Type": "Movie",
                    "MediaSources": [{ "MediaStreams": [{ "Type": "Video", "Height": 576 }] }]
                }
            ]
        })))
        .mount(&server)
        .await;

    let app = create_router(context_with_jellyfin(&server));
    let response = app
        .oneshot(
            Request::get("/api/providers/living-room/facets/qualities")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    // Standard labels in canonical order; zero-count buckets omitted.
    assert_eq!(
        json,
        json!([
            { "value": "SD", "count": 1 },
            { "value": "1080p", "count": 1 },
            { "value": "4K", "count": 1 }
        ])
    );
}

#[tokio::test]
async fn media_requests_record_ledger_cells() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Items": [] })))
        .mount(&server)
        .await;

    let ctx = context_with_jellyfin(&server);
    let metrics = ctx.metrics.clone();
    let app = create_router(ctx);

    let response = app
        .oneshot(
            Request::get("/api/providers/living-room/media")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cell = metrics.operation("jellyfin", "fetch_media").unwrap();
    assert_eq!(cell.total, 1);
    assert_eq!(cell.errors, 0);
}
