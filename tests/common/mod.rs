//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use event_api::config::AppConfig;
use event_api::http::HttpServer;

pub const PASSWORD: &str = "secret123";
pub const ADMIN: &str = "root";

/// Default config with password hashing cheap enough for tests. `root`
/// registers as an admin.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.password_memory_kib = 64;
    config.auth.password_time_cost = 1;
    config.auth.admin_usernames = vec![ADMIN.to_string()];
    config
}

/// A fresh, empty directory under the system temp dir.
pub fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("event-api-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

pub fn server() -> HttpServer {
    HttpServer::new(test_config())
}

pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible")
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable")
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("JSON body")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn json_request(method: Method, uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn authed(method: Method, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={username}&password={password}")))
        .unwrap()
}

pub async fn register(router: &Router, username: &str) -> Response {
    let body = json!({
        "username": username,
        "email": format!("{username}@example.com"),
        "password": PASSWORD,
    });
    send(router, json_request(Method::POST, "/auth/register", &body, None)).await
}

/// Register `username` and log in, returning the bearer token.
pub async fn token_for(router: &Router, username: &str) -> String {
    let response = register(router, username).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(router, login_request(username, PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["access_token"]
        .as_str()
        .expect("token string")
        .to_string()
}

pub fn event_body(title: &str, start: &str, end: &str) -> Value {
    json!({
        "title": title,
        "description": "Quarterly meetup",
        "location": "Berlin",
        "start_time": start,
        "end_time": end,
        "capacity": 2,
    })
}

/// Create an event and return its id.
pub async fn create_event(router: &Router, token: &str, title: &str, start: &str) -> u64 {
    let body = event_body(title, start, "2030-12-31T23:00:00Z");
    let response = send(router, json_request(Method::POST, "/events", &body, Some(token))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_u64().expect("event id")
}
