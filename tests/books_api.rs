use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use bookstore_app::modules::register_all;
use bookstore_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn app() -> Router {
    let settings = Settings::default();
    let mut registry = ModuleRegistry::new();
    register_all(&mut registry, &settings).unwrap();
    registry
        .init_all(&InitCtx {
            settings: &settings,
        })
        .await
        .unwrap();
    bookstore_http::build_router(&registry, &settings)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn catalog_lifecycle_through_the_full_router() {
    let app = app().await;

    let (status, created) = send(
        &app,
        "POST",
        "/api/books",
        Some(json!({
            "title": "Dune",
            "author": "Frank Herbert",
            "isbn": "9780441172719",
            "price": 10.99,
            "genre": "Science Fiction"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], 1);
    assert_eq!(created["language"], "English");
    assert_eq!(created["in_stock"], true);

    let (status, found) = send(&app, "GET", "/api/books/isbn/9780441172719", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["title"], "Dune");

    let (status, hits) = send(&app, "GET", "/api/books/search/author?author=herb", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits.as_array().unwrap().len(), 1);

    let (status, updated) = send(
        &app,
        "PUT",
        "/api/books/1",
        Some(json!({"price": 12.5, "genre": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], 12.5);
    assert!(updated["genre"].is_null());
    assert_eq!(updated["title"], "Dune");

    let (status, deleted) = send(&app, "DELETE", "/api/books/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({"deleted": true, "id": 1}));

    let (status, body) = send(&app, "GET", "/api/books/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
    assert!(body["error"]["trace_id"].is_string());
}

#[tokio::test]
async fn malformed_requests_use_the_error_envelope() {
    let app = app().await;

    let (status, body) = send(&app, "GET", "/api/books/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].is_string());

    let (status, body) = send(&app, "GET", "/api/books/search/title", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["code"].is_string());

    let (status, body) = send(&app, "POST", "/api/books", Some(json!({"title": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn ambient_endpoints_are_served() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let (status, spec) = send(&app, "GET", "/docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(spec["paths"]["/api/books"]["post"].is_object());
    assert!(spec["paths"]["/api/books/search/genre"]["get"].is_object());
}
