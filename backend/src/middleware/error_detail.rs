//! Development-only error detail
//!
//! Server errors always leave the handler with a generic message. When this
//! layer is installed the body is swapped for the one carrying the
//! underlying error text.

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ErrorDetail;

/// Replace a 5xx body with its `ErrorDetail`, if the error attached one
pub async fn expose_error_details(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if !response.status().is_server_error() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    match parts.extensions.remove::<ErrorDetail>() {
        Some(ErrorDetail(detail)) => {
            parts.headers.remove(header::CONTENT_LENGTH);
            let body = Json(detail).into_response().into_body();
            Response::from_parts(parts, body)
        }
        None => Response::from_parts(parts, body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use axum::{
        body::{to_bytes, Body},
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn failing() -> Result<(), AppError> {
        Err(AppError::Internal("migration table missing".into()))
    }

    async fn missing() -> Result<(), AppError> {
        Err(AppError::NotFound("Sale".into()))
    }

    fn app(detailed: bool) -> Router {
        let router = Router::new()
            .route("/fail", get(failing))
            .route("/missing", get(missing));
        if detailed {
            router.layer(axum::middleware::from_fn(expose_error_details))
        } else {
            router
        }
    }

    async fn body_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(HttpRequest::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn detail_shown_when_layer_installed() {
        let (status, json) = body_json(app(true), "/fail").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], "INTERNAL_ERROR");
        assert_eq!(json["message"], "migration table missing");
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn detail_hidden_without_layer() {
        let (status, json) = body_json(app(false), "/fail").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "An internal server error occurred");
    }

    #[tokio::test]
    async fn client_errors_untouched() {
        let (status, json) = body_json(app(true), "/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Sale not found");
    }
}
