use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookstore_db::RowId;
use bookstore_http::error::AppError;

use super::models::{
    AuthorQuery, Book, CreateBook, DeleteResponse, GenreQuery, TitleQuery, UpdateBook,
};
use super::store::BookCatalog;

type Catalog = State<Arc<BookCatalog>>;

/// HTTP routes for the catalog, relative to the module mount point.
pub fn router(catalog: Arc<BookCatalog>) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/isbn/{isbn}", get(get_book_by_isbn))
        .route("/search/author", get(search_by_author))
        .route("/search/title", get(search_by_title))
        .route("/search/genre", get(search_by_genre))
        .with_state(catalog)
}

async fn list_books(State(catalog): Catalog) -> Json<Vec<Book>> {
    Json(catalog.list().await)
}

async fn get_book(
    State(catalog): Catalog,
    id: Result<Path<RowId>, PathRejection>,
) -> Result<Json<Book>, AppError> {
    let Path(id) = id?;
    Ok(Json(catalog.get_by_id(id).await?))
}

async fn get_book_by_isbn(
    State(catalog): Catalog,
    Path(isbn): Path<String>,
) -> Result<Json<Book>, AppError> {
    Ok(Json(catalog.get_by_isbn(&isbn).await?))
}

async fn create_book(
    State(catalog): Catalog,
    payload: Result<Json<CreateBook>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(request) = payload?;
    let book = catalog.create(request).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn update_book(
    State(catalog): Catalog,
    id: Result<Path<RowId>, PathRejection>,
    payload: Result<Json<UpdateBook>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    Ok(Json(catalog.update(id, patch).await?))
}

async fn delete_book(
    State(catalog): Catalog,
    id: Result<Path<RowId>, PathRejection>,
) -> Result<Json<DeleteResponse>, AppError> {
    let Path(id) = id?;
    let book = catalog.delete(id).await?;
    Ok(Json(DeleteResponse {
        deleted: true,
        id: book.id,
    }))
}

async fn search_by_author(
    State(catalog): Catalog,
    query: Result<Query<AuthorQuery>, QueryRejection>,
) -> Result<Json<Vec<Book>>, AppError> {
    let Query(query) = query?;
    Ok(Json(catalog.search_by_author(&query.author).await))
}

async fn search_by_title(
    State(catalog): Catalog,
    query: Result<Query<TitleQuery>, QueryRejection>,
) -> Result<Json<Vec<Book>>, AppError> {
    let Query(query) = query?;
    Ok(Json(catalog.search_by_title(&query.title).await))
}

async fn search_by_genre(
    State(catalog): Catalog,
    query: Result<Query<GenreQuery>, QueryRejection>,
) -> Result<Json<Vec<Book>>, AppError> {
    let Query(query) = query?;
    Ok(Json(catalog.search_by_genre(&query.genre).await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(router: &Router, request: Request<Body>) -> Response {
        router.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn books_router() -> Router {
        router(Arc::new(BookCatalog::new()))
    }

    #[tokio::test]
    async fn create_returns_201_with_defaults() {
        let router = books_router();
        let response = send(
            &router,
            json_request(
                "POST",
                "/",
                json!({"title": "Foo", "author": "Bar", "isbn": "1112223334445", "price": 9.99}),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert!(body["id"].is_i64());
        assert_eq!(body["language"], "English");
        assert_eq!(body["in_stock"], true);
    }

    #[tokio::test]
    async fn bad_input_maps_to_400() {
        let router = books_router();

        let missing = send(&router, json_request("POST", "/", json!({"title": "Foo"}))).await;
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        let body = json_body(missing).await;
        assert_eq!(body["error"]["code"], "validation_error");
        assert_eq!(body["error"]["details"].as_array().unwrap().len(), 3);

        let malformed = send(
            &router,
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

        let bad_id = send(&router, get("/abc")).await;
        assert_eq!(bad_id.status(), StatusCode::BAD_REQUEST);

        let no_query = send(&router, get("/search/author")).await;
        assert_eq!(no_query.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_isbn_maps_to_409() {
        let router = books_router();
        let payload = json!({"title": "Foo", "author": "Bar", "isbn": "1112223334445", "price": 9.99});

        send(&router, json_request("POST", "/", payload.clone())).await;
        let response = send(&router, json_request("POST", "/", payload)).await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let list = json_body(send(&router, get("/")).await).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn put_merges_and_delete_removes() {
        let router = books_router();
        let created = json_body(
            send(
                &router,
                json_request(
                    "POST",
                    "/",
                    json!({"title": "Foo", "author": "Bar", "isbn": "1112223334445", "price": 9.99, "genre": "Fantasy"}),
                ),
            )
            .await,
        )
        .await;
        let id = created["id"].as_i64().unwrap();

        let response = send(
            &router,
            json_request("PUT", &format!("/{id}"), json!({"price": 24.99})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated = json_body(response).await;
        assert_eq!(updated["price"], 24.99);
        assert_eq!(updated["genre"], "Fantasy");
        assert_eq!(updated["title"], "Foo");

        let by_isbn = json_body(send(&router, get("/isbn/1112223334445")).await).await;
        assert_eq!(by_isbn, updated);

        let response = send(
            &router,
            Request::builder()
                .method("DELETE")
                .uri(format!("/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"deleted": true, "id": id}));

        let gone = send(&router, get(&format!("/{id}"))).await;
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);
        let gone = send(&router, get("/isbn/1112223334445")).await;
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn search_endpoints_filter_by_substring() {
        let router = books_router();
        for (title, author, isbn, genre) in [
            ("The Hobbit", "J.R.R. Tolkien", "9780547928227", "Fantasy"),
            ("Beloved", "Toni Morrison", "9781400033416", "Fiction"),
            ("The Silmarillion", "J.R.R. Tolkien", "9780618391110", "Fantasy"),
        ] {
            send(
                &router,
                json_request(
                    "POST",
                    "/",
                    json!({"title": title, "author": author, "isbn": isbn, "price": 10.0, "genre": genre}),
                ),
            )
            .await;
        }

        let titles = |body: Value| -> Vec<String> {
            body.as_array()
                .unwrap()
                .iter()
                .map(|b| b["title"].as_str().unwrap().to_string())
                .collect()
        };

        let fantasy = json_body(send(&router, get("/search/genre?genre=Fantasy")).await).await;
        assert_eq!(titles(fantasy), vec!["The Hobbit", "The Silmarillion"]);

        let tolkien = json_body(send(&router, get("/search/author?author=tolkien")).await).await;
        assert_eq!(tolkien.as_array().unwrap().len(), 2);

        let the = json_body(send(&router, get("/search/title?title=the%20s")).await).await;
        assert_eq!(titles(the), vec!["The Silmarillion"]);
    }
}
