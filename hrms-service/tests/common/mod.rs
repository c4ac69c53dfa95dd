#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use hrms_service::{
    build_router,
    config::HrmsConfig,
    models::{Node, NodeKind},
    services::InMemoryNodeRepository,
    AppState,
};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

/// Router over an empty in-memory store.
pub fn test_app() -> Router {
    app_with(Vec::new())
}

/// Router over a store seeded with `nodes` exactly as given.
pub fn app_with(nodes: Vec<Node>) -> Router {
    let repo = Arc::new(InMemoryNodeRepository::with_nodes(nodes));
    build_router(AppState::new(HrmsConfig::in_memory(), repo))
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn patch(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::PATCH, uri, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::DELETE, uri, None).await
}

/// Create a node through the API and return its id.
pub async fn create(app: &Router, kind: &str, name: &str, parent_id: Option<Uuid>) -> Uuid {
    let (status, body) = post(
        app,
        &format!("/api/{}", kind),
        serde_json::json!({ "name": name, "parent_id": parent_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create {} failed: {}", name, body);
    id_of(&body)
}

pub fn id_of(node: &Value) -> Uuid {
    node["id"].as_str().unwrap().parse().unwrap()
}

/// (name, order_index) pairs of a JSON node array, in array order.
pub fn ordering(nodes: &Value) -> Vec<(String, i64)> {
    nodes
        .as_array()
        .unwrap()
        .iter()
        .map(|n| {
            (
                n["name"].as_str().unwrap().to_string(),
                n["order_index"].as_i64().unwrap(),
            )
        })
        .collect()
}

pub fn node(kind: NodeKind, name: &str, parent_id: Option<Uuid>, order_index: i32) -> Node {
    Node::new(kind, name.to_string(), parent_id, order_index)
}
