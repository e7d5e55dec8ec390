//! Drop-in replacements for axum's `Path`, `Query` and `Json` request
//! extractors. Their rejections render through [`AppError`], so malformed
//! ids, query strings and bodies get the usual `{"error": ...}` body.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);

/// Request body only; responses keep using `axum::Json`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        routing::{get, post},
        Router,
    };
    use serde::Deserialize;
    use tower::ServiceExt;
    use uuid::Uuid;

    #[derive(Debug, Deserialize)]
    struct Paging {
        page: Option<i64>,
    }

    #[derive(Debug, Deserialize)]
    struct Note {
        text: String,
    }

    fn app() -> Router {
        Router::new()
            .route(
                "/items/:id",
                get(|Path(id): Path<Uuid>| async move { id.to_string() }),
            )
            .route(
                "/items",
                get(|Query(q): Query<Paging>| async move { format!("{:?}", q.page) })
                    .post(|JsonBody(note): JsonBody<Note>| async move { note.text }),
            )
    }

    async fn error_of(req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app().oneshot(req).await.unwrap();
        let status = res.status();
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json");
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn bad_query_renders_json_error() {
        let (status, body) =
            error_of(Request::get("/items?page=abc").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("query string"));
    }

    #[tokio::test]
    async fn bad_path_renders_json_error() {
        let (status, body) =
            error_of(Request::get("/items/not-a-uuid").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn bad_json_renders_json_error() {
        let (status, body) = error_of(
            Request::post("/items")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"text":"#))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn well_formed_requests_pass_through() {
        let res = app()
            .oneshot(Request::get("/items?page=2").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Some(2)");
    }
}
