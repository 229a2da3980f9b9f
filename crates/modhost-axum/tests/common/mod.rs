//! Shared fixtures for modhost-axum integration tests.

#![allow(dead_code)]

pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use http_body_util::BodyExt;
use modhost_axum::{AppState, bootstrap, create_router};
use modhost_core::{Config, ConfigPaths, ConfigStore, ServiceDescriptor, ServiceSettings};
use serde_json::Value;
use tower::ServiceExt;

/// Configuration listing every catalog entry as enabled.
pub fn config_for(catalog: &[ServiceDescriptor]) -> Config {
    catalog.iter().fold(Config::default(), |config, d| {
        config.with_service(
            modhost_core::canonical_service_name(d.name),
            ServiceSettings::default(),
        )
    })
}

pub fn state_with(config: Config, catalog: Vec<ServiceDescriptor>) -> AppState {
    let store = Arc::new(ConfigStore::from_config(ConfigPaths::default(), config));
    bootstrap(store, catalog)
}

/// Router over the test catalog with everything enabled.
pub fn test_app() -> Router {
    let catalog = services::catalog();
    create_router(state_with(config_for(&catalog), catalog))
}

pub fn post_json(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Send one request and collect the whole body.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

pub fn json(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap()
}

/// Split an SSE body into the JSON payload of each `data:` frame.
pub fn sse_payloads(body: &Bytes) -> Vec<Value> {
    std::str::from_utf8(body)
        .unwrap()
        .split("\n\n")
        .filter(|frame| !frame.is_empty())
        .map(|frame| {
            let data = frame.strip_prefix("data: ").expect("frame starts with data:");
            serde_json::from_str(data).unwrap()
        })
        .collect()
}
